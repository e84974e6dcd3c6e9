use std::path::PathBuf;

use clap::Parser;
use reqif_bridge::{ImportMappingConfiguration, ReqIf, domain::ReferenceData};
use tracing::instrument;

use super::read_json;

#[derive(Debug, Parser)]
pub struct InferMapping {
    /// The interchange document (JSON)
    document: PathBuf,

    /// The reference data to map onto (JSON)
    #[arg(short, long)]
    reference_data: PathBuf,

    /// Where to save the mapping
    #[arg(short, long, default_value = "mapping.json")]
    output: PathBuf,
}

impl InferMapping {
    #[instrument]
    pub fn run(self) -> anyhow::Result<()> {
        let document: ReqIf = read_json(&self.document)?;
        let reference_data: ReferenceData = read_json(&self.reference_data)?;

        let mapping = ImportMappingConfiguration::infer(&document, &reference_data);
        mapping.save(&self.output)?;

        println!(
            "Mapped {} datatypes and {} spec-types to {}",
            mapping.datatypes.len(),
            mapping.spec_types.len(),
            self.output.display()
        );
        Ok(())
    }
}
