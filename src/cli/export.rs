use std::path::PathBuf;

use clap::Parser;
use reqif_bridge::{
    Config, ReqIfBuilder, RequirementsModel, Session,
    export::{AbortOnViolation, IgnoreViolations},
};
use tracing::instrument;

use super::{read_json, write_json};

#[derive(Debug, Parser)]
pub struct Export {
    /// The requirements model (JSON)
    model: PathBuf,

    /// Where to write the document (JSON). Defaults to stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// The URI of the data source the model was read from.
    ///
    /// Defaults to the path of the model file.
    #[arg(long)]
    data_source: Option<String>,

    /// Report model validation failures instead of aborting on the first
    #[arg(long)]
    ignore_violations: bool,
}

impl Export {
    #[instrument(skip(config))]
    pub fn run(self, config: &Config) -> anyhow::Result<()> {
        let model: RequirementsModel = read_json(&self.model)?;
        let data_source = self
            .data_source
            .unwrap_or_else(|| self.model.display().to_string());
        let session = Session::new(data_source, model.store);

        let builder = ReqIfBuilder::new(config);
        let output = if self.ignore_violations || config.ignore_validation_failures {
            builder.build(&session, &model, &mut IgnoreViolations)?
        } else {
            builder.build(&session, &model, &mut AbortOnViolation)?
        };

        for violation in &output.ignored_violations {
            eprintln!("warning: {violation}");
        }
        write_json(&output.document, self.output.as_deref())
    }
}
