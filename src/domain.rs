//! Domain models for requirements exchange.
//!
//! This module contains the requirements model (specifications, groups,
//! requirements and relationships), the reference data it draws on, the
//! value-sets reconciled against external input, and configuration.

mod config;
pub use config::Config;

mod parameter_type;
pub use parameter_type::{
    Component, EnumerationValueDefinition, MeasurementScale, ParameterType, ParameterTypeKind,
};

/// Categories, rules and other shared reference data.
pub mod reference_data;
pub use reference_data::{Category, ParameterizedCategoryRule, ReferenceData};

/// The requirements model itself.
pub mod requirements;
pub use requirements::{
    BinaryRelationship, Definition, ModelError, ModelSetup, ParameterValue, Requirement,
    RequirementsGroup, RequirementsModel, RequirementsSpecification, Session, ThingRef,
};

/// Value-sets backing parameter values.
pub mod value_set;
pub use value_set::{ParameterValueSet, SubscriptionValueSet, SwitchKind, ValueSet};
