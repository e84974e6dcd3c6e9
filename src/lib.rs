//! Requirements interchange
//!
//! Maps a hierarchical requirements model to ReqIF interchange documents and
//! back, and reconciles externally edited parameter values with stored
//! value-sets.

pub mod domain;
pub use domain::{Config, RequirementsModel, Session};

pub mod reqif;
pub use reqif::ReqIf;

/// Type and datatype correspondences used when importing documents.
pub mod mapping;
pub use mapping::ImportMappingConfiguration;

/// Conversions between parameter types and interchange datatypes.
pub mod datatype;

pub mod export;
pub use export::{BuildError, BuildOutput, ReqIfBuilder};

pub mod import;
pub use import::{ImportError, ImportedThings, ThingFactory};

pub mod reconcile;
pub use reconcile::{CellValue, ProcessedValueSet, ReconcileError};
