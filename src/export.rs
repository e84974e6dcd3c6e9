//! Building interchange documents from a requirements model.
//!
//! [`ReqIfBuilder`] walks a [`RequirementsModel`](crate::RequirementsModel)
//! and produces a complete [`ReqIf`](crate::ReqIf) document. Spec-types are
//! shared between nodes of the same kind carrying the same set of
//! parameterized-category rules (see [`TypeRegistry`]).

mod builder;
mod context;
mod registry;
mod validation;

pub use builder::{BuildOutput, ReqIfBuilder};
pub use context::ExportContext;
pub use registry::{NodeKind, TypeRegistry};
use thiserror::Error;
use uuid::Uuid;
pub use validation::{AbortOnViolation, IgnoreViolations, ValidationDecision, ValidationFailureHandler};

use crate::{
    datatype::ValueError,
    reqif::{DatatypeDefinition, DatatypeKind, Identifiable},
};

/// Prefix of the long-name of group spec-types and group spec-objects.
pub const GROUP_NAME_PREFIX: &str = "[Group]";

/// Long-name of the attribute holding a thing's short-name.
pub const SHORT_NAME_ATTRIBUTE: &str = "Short-Name";

/// Long-name of the attribute holding a thing's name.
pub const NAME_ATTRIBUTE: &str = "Name";

/// Long-name of the attribute holding a thing's category short-names.
pub const CATEGORIES_ATTRIBUTE: &str = "Categories";

/// Long-name of the attribute holding a requirement's text.
pub const REQUIREMENT_TEXT_ATTRIBUTE: &str = "Requirement Text";

/// Long-name of the attribute holding the deprecation flag.
pub const IS_DEPRECATED_ATTRIBUTE: &str = "IsDeprecated";

/// Identifier of the built-in text datatype.
pub const TEXT_DATATYPE_ID: &str = "a0788043-3c29-4cdc-b656-816a1a9e111d";

/// Identifier of the built-in boolean datatype.
pub const BOOLEAN_DATATYPE_ID: &str = "cf78e807-a8af-4816-aa0f-c7b9e7ec1520";

/// The datatype of short-names, names, categories and requirement text.
#[must_use]
pub fn text_datatype() -> DatatypeDefinition {
    DatatypeDefinition {
        identity: Identifiable::new(TEXT_DATATYPE_ID, "String", "A string datatype"),
        kind: DatatypeKind::String,
    }
}

/// The datatype of deprecation flags.
#[must_use]
pub fn boolean_datatype() -> DatatypeDefinition {
    DatatypeDefinition {
        identity: Identifiable::new(BOOLEAN_DATATYPE_ID, "Boolean", "A boolean datatype"),
        kind: DatatypeKind::Boolean,
    }
}

/// Errors raised while building a document.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The model was not loaded through the given session.
    #[error("model {model} is not attached to the session's store {store}")]
    DetachedModel {
        /// Identifier of the model iteration.
        model: Uuid,
        /// The store the session reads.
        store: Uuid,
    },

    /// A model validation failure the handler refused to ignore.
    #[error("model validation failed: {0}")]
    ModelValidation(String),

    /// A parameter value could not be converted.
    #[error("invalid value of '{thing}'")]
    Value {
        /// Name of the thing carrying the value.
        thing: String,
        /// The conversion failure.
        #[source]
        source: ValueError,
    },
}
