use std::path::PathBuf;

use clap::Parser;
use reqif_bridge::{Config, ImportMappingConfiguration, ReqIf, ThingFactory, domain::ReferenceData};
use tracing::instrument;

use super::{read_json, write_json};

#[derive(Debug, Parser)]
pub struct Import {
    /// The interchange document (JSON)
    document: PathBuf,

    /// The reference data to map onto (JSON)
    #[arg(short, long)]
    reference_data: PathBuf,

    /// A saved import mapping. Inferred from the document if omitted.
    #[arg(short, long)]
    mapping: Option<PathBuf>,

    /// Where to write the imported things (JSON). Defaults to stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl Import {
    #[instrument(skip(config))]
    pub fn run(self, config: &Config) -> anyhow::Result<()> {
        let document: ReqIf = read_json(&self.document)?;
        let reference_data: ReferenceData = read_json(&self.reference_data)?;

        let mapping = match &self.mapping {
            Some(path) => ImportMappingConfiguration::load(path)?,
            None => ImportMappingConfiguration::infer(&document, &reference_data),
        };

        let things = ThingFactory::new(config, &mapping, &reference_data).compute(&document)?;
        write_json(&things, self.output.as_deref())
    }
}
