use std::path::PathBuf;

use clap::Parser;
use reqif_bridge::{
    ProcessedValueSet,
    domain::{ReferenceData, ValueSet},
    reconcile::CellRow,
};
use tracing::instrument;
use uuid::Uuid;

use super::{read_json, write_json};

#[derive(Debug, Parser)]
pub struct Reconcile {
    /// The persisted value-set (JSON)
    value_set: PathBuf,

    /// Rows of cell values, one per component (JSON)
    rows: PathBuf,

    /// The reference data holding the parameter type (JSON)
    #[arg(short, long)]
    reference_data: PathBuf,

    /// The parameter type of the value-set
    #[arg(short, long)]
    parameter_type: Uuid,

    /// Where to write the updated value-set (JSON). Defaults to stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl Reconcile {
    #[instrument]
    pub fn run(self) -> anyhow::Result<()> {
        let value_set: ValueSet = read_json(&self.value_set)?;
        let rows: Vec<CellRow> = read_json(&self.rows)?;
        let reference_data: ReferenceData = read_json(&self.reference_data)?;

        let parameter_type = reference_data
            .parameter_type(self.parameter_type)
            .ok_or_else(|| anyhow::anyhow!("Parameter type {} not found", self.parameter_type))?;

        let mut processed = ProcessedValueSet::new(value_set);
        for (component, row) in rows.iter().enumerate() {
            processed.reconcile(component, parameter_type, row)?;
        }

        match processed.into_clone() {
            Some(updated) => write_json(&updated, self.output.as_deref()),
            None => {
                println!("No changes");
                Ok(())
            }
        }
    }
}
