use std::{collections::BTreeMap, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::{
    domain::ReferenceData,
    export::{GROUP_NAME_PREFIX, NAME_ATTRIBUTE, REQUIREMENT_TEXT_ATTRIBUTE, SHORT_NAME_ATTRIBUTE},
    reqif::{DatatypeDefinition, ReqIf, SpecType, SpecTypeKind},
};

/// What an imported attribute value becomes on the created thing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttributeDefinitionMapKind {
    /// The attribute is ignored.
    #[default]
    None,
    /// The value becomes the name.
    Name,
    /// The value becomes the short-name.
    #[serde(rename = "SHORTNAME")]
    ShortName,
    /// The value becomes the first definition.
    FirstDefinition,
    /// The value becomes a parameter value of the datatype's parameter type.
    ParameterValue,
}

/// How instances of a spec-type are imported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SpecTypeMapKind {
    /// Specifications become requirements specifications.
    Specification,
    /// Spec-objects become requirements or groups.
    SpecObject {
        /// Whether childless instances become requirements rather than groups.
        is_requirement: bool,
    },
    /// Spec-relations become relationships between requirements.
    SpecRelation,
    /// Relation groups become relationships between specifications.
    RelationGroup,
}

impl SpecTypeMapKind {
    /// Whether spec-objects of this type become requirements.
    #[must_use]
    pub const fn is_requirement(self) -> bool {
        matches!(self, Self::SpecObject { is_requirement: true })
    }
}

impl From<SpecTypeKind> for SpecTypeMapKind {
    fn from(kind: SpecTypeKind) -> Self {
        match kind {
            SpecTypeKind::Specification => Self::Specification,
            SpecTypeKind::SpecObject => Self::SpecObject {
                is_requirement: true,
            },
            SpecTypeKind::SpecRelation => Self::SpecRelation,
            SpecTypeKind::RelationGroup => Self::RelationGroup,
        }
    }
}

/// The import mapping of one spec-type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecTypeMap {
    /// What instances of the spec-type become.
    #[serde(flatten)]
    pub kind: SpecTypeMapKind,
    /// Categories given to every imported instance.
    #[serde(default)]
    pub categories: Vec<Uuid>,
    /// Parameterized-category rules instances are expected to satisfy.
    ///
    /// The categories of these rules are given to imported instances too.
    #[serde(default)]
    pub rules: Vec<Uuid>,
    /// Mapping of each attribute definition, keyed by its identifier.
    ///
    /// Attribute definitions without an entry are ignored.
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeDefinitionMapKind>,
}

impl SpecTypeMap {
    /// Creates a mapping that assigns no categories and ignores every
    /// attribute.
    #[must_use]
    pub const fn new(kind: SpecTypeMapKind) -> Self {
        Self {
            kind,
            categories: Vec::new(),
            rules: Vec::new(),
            attributes: BTreeMap::new(),
        }
    }

    /// How the given attribute definition is mapped.
    #[must_use]
    pub fn attribute(&self, definition: &str) -> AttributeDefinitionMapKind {
        self.attributes.get(definition).copied().unwrap_or_default()
    }

    /// The categories imported instances receive: the mapped categories
    /// followed by the categories of the mapped rules, without duplicates.
    #[must_use]
    pub fn effective_categories(&self, reference_data: &ReferenceData) -> Vec<Uuid> {
        let mut categories = self.categories.clone();
        let rule_categories = self
            .rules
            .iter()
            .filter_map(|&iid| reference_data.rule(iid))
            .map(|rule| rule.category);
        for category in rule_categories {
            if !categories.contains(&category) {
                categories.push(category);
            }
        }
        categories
    }
}

/// The import mapping of one datatype definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatatypeDefinitionMap {
    /// Parameter type values of this datatype become, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter_type: Option<Uuid>,
    /// Enumeration literal each enum value corresponds to, keyed by the enum
    /// value's identifier.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub enum_values: BTreeMap<String, Uuid>,
}

/// Errors raised when reading or writing a mapping file.
#[derive(Debug, Error)]
pub enum MappingFileError {
    /// The file could not be read or written.
    #[error("failed to access mapping file: {0}")]
    Io(#[from] std::io::Error),
    /// The file content is not a valid mapping.
    #[error("invalid mapping file: {0}")]
    Json(#[from] serde_json::Error),
}

/// A complete, user-confirmed import mapping for one family of documents.
///
/// Datatype and spec-type mappings are keyed by identifier, so a mapping can
/// be saved and reused for later imports of documents sharing those
/// identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportMappingConfiguration {
    /// Datatype mappings keyed by datatype identifier.
    #[serde(default)]
    pub datatypes: BTreeMap<String, DatatypeDefinitionMap>,
    /// Spec-type mappings keyed by spec-type identifier.
    ///
    /// Instances of spec-types without an entry are not imported.
    #[serde(default)]
    pub spec_types: BTreeMap<String, SpecTypeMap>,
}

impl ImportMappingConfiguration {
    /// Looks up the mapping of a datatype.
    #[must_use]
    pub fn datatype(&self, identifier: &str) -> Option<&DatatypeDefinitionMap> {
        self.datatypes.get(identifier)
    }

    /// Looks up the mapping of a spec-type.
    #[must_use]
    pub fn spec_type(&self, identifier: &str) -> Option<&SpecTypeMap> {
        self.spec_types.get(identifier)
    }

    /// Loads a mapping from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or does not hold a valid
    /// mapping.
    pub fn load(path: &Path) -> Result<Self, MappingFileError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Saves the mapping to a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), MappingFileError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Infers the mapping of a document written by [`crate::ReqIfBuilder`].
    ///
    /// Datatypes whose identifier is a known parameter type map back to it,
    /// with enum values matched to literals by short-name. Spec-types regain
    /// the rules named in their long-name, and the well-known attributes map
    /// to short-name, name and first definition. Attributes typed by a mapped
    /// datatype become parameter values; anything else is ignored.
    #[must_use]
    pub fn infer(document: &ReqIf, reference_data: &ReferenceData) -> Self {
        let mut mapping = Self::default();
        let Some(content) = &document.core_content else {
            return mapping;
        };

        for datatype in &content.datatypes {
            mapping.datatypes.insert(
                datatype.identifier().to_string(),
                infer_datatype(datatype, reference_data),
            );
        }

        for spec_type in &content.spec_types {
            let map = mapping.infer_spec_type(spec_type, reference_data);
            mapping
                .spec_types
                .insert(spec_type.identifier().to_string(), map);
        }

        debug!(
            datatypes = mapping.datatypes.len(),
            spec_types = mapping.spec_types.len(),
            "inferred import mapping"
        );
        mapping
    }

    fn infer_spec_type(&self, spec_type: &SpecType, reference_data: &ReferenceData) -> SpecTypeMap {
        let long_name = &spec_type.identity.long_name;
        let is_group = long_name.starts_with(GROUP_NAME_PREFIX);
        let kind = match spec_type.kind {
            SpecTypeKind::SpecObject => SpecTypeMapKind::SpecObject {
                is_requirement: !is_group,
            },
            other => other.into(),
        };

        let rule_names = long_name.trim_start_matches(GROUP_NAME_PREFIX);
        let rules: Vec<_> = rule_names
            .split(", ")
            .filter_map(|name| reference_data.rules.iter().find(|r| r.short_name == name))
            .collect();

        let mut map = SpecTypeMap::new(kind);
        map.rules = rules.iter().map(|r| r.iid).collect();
        map.categories = map.effective_categories(reference_data);

        for attribute in &spec_type.attributes {
            let attribute_kind = match attribute.identity.long_name.as_str() {
                SHORT_NAME_ATTRIBUTE => AttributeDefinitionMapKind::ShortName,
                NAME_ATTRIBUTE => AttributeDefinitionMapKind::Name,
                REQUIREMENT_TEXT_ATTRIBUTE => AttributeDefinitionMapKind::FirstDefinition,
                _ if self
                    .datatype(&attribute.datatype)
                    .is_some_and(|d| d.parameter_type.is_some()) =>
                {
                    AttributeDefinitionMapKind::ParameterValue
                }
                _ => AttributeDefinitionMapKind::None,
            };
            map.attributes
                .insert(attribute.identity.identifier.clone(), attribute_kind);
        }

        map
    }
}

fn infer_datatype(datatype: &DatatypeDefinition, reference_data: &ReferenceData) -> DatatypeDefinitionMap {
    let Some(parameter_type) = datatype
        .identifier()
        .parse::<Uuid>()
        .ok()
        .and_then(|iid| reference_data.parameter_type(iid))
    else {
        return DatatypeDefinitionMap::default();
    };

    let enum_values = match (datatype.enum_values(), parameter_type.enumeration_values()) {
        (Some(values), Some(literals)) => values
            .iter()
            .filter_map(|value| {
                literals
                    .iter()
                    .find(|literal| literal.short_name == value.other_content)
                    .map(|literal| (value.identity.identifier.clone(), literal.iid))
            })
            .collect(),
        _ => BTreeMap::new(),
    };

    DatatypeDefinitionMap {
        parameter_type: Some(parameter_type.iid),
        enum_values,
    }
}
