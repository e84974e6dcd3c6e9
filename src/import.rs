//! Reconstructing requirements-model things from an interchange document.
//!
//! [`ThingFactory`] walks each specification's hierarchy and creates
//! specifications, groups and requirements according to an
//! [`ImportMappingConfiguration`]. Spec-objects that no hierarchy reaches are
//! collected into a separate specification, and relations are resolved last
//! against the things created before them.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::{
    Config,
    datatype::{self, ValueError},
    domain::{
        BinaryRelationship, Definition, ParameterValue, ReferenceData, Requirement,
        RequirementsGroup, RequirementsSpecification, ThingRef,
    },
    mapping::{
        AttributeDefinitionMapKind, DatatypeDefinitionMap, ImportMappingConfiguration, SpecTypeMap,
    },
    reqif::{
        AttributeValue, RelationGroup, ReqIf, ReqIfContent, SpecHierarchy, SpecObject,
        SpecRelation, Specification,
    },
};

/// Short-name prefix of imported specifications.
pub const SPECIFICATION_PREFIX: &str = "SPEC_";

/// Short-name prefix of imported requirements.
pub const REQUIREMENT_PREFIX: &str = "REQ_";

/// Short-name prefix of imported groups.
pub const GROUP_PREFIX: &str = "GRP_";

/// Short-name and name of the specification holding requirements no
/// hierarchy reaches.
pub const UNRESOLVED_SPECIFICATION: &str = "UnresolvedSpec";

/// Errors raised while importing a document.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The document has no core content.
    #[error("the document has no core content")]
    MissingCoreContent,

    /// An attribute is mapped to a parameter value but its datatype has no
    /// parameter type.
    #[error("attribute definition '{attribute}' is mapped to a parameter value but its datatype has no parameter type")]
    MappingIncomplete {
        /// Identifier of the attribute definition.
        attribute: String,
    },

    /// An attribute value could not be read.
    #[error("invalid value in '{element}'")]
    Value {
        /// Identifier of the element carrying the value.
        element: String,
        /// The conversion failure.
        #[source]
        source: ValueError,
    },

    /// A relation references something that was not imported.
    #[error("the source or target of '{relation}' was not imported; verify that the mapping is consistent")]
    InvalidOperation {
        /// Identifier of the relation or relation group.
        relation: String,
    },

    /// A hierarchy references a spec-object missing from the document.
    #[error("hierarchy references unknown spec-object '{0}'")]
    UnknownObject(String),

    /// A spec-object is placed more than once in the hierarchies.
    #[error("spec-object '{0}' is placed more than once in the hierarchies")]
    DuplicateObject(String),
}

/// The things created by an import, with the correspondence from document
/// identifiers to the identifiers of the created things.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ImportedThings {
    /// Created specifications, with their groups and requirements.
    pub specifications: Vec<RequirementsSpecification>,
    /// Created relationships.
    pub relationships: Vec<BinaryRelationship>,
    /// Specification identifier to created specification.
    pub specification_map: BTreeMap<String, Uuid>,
    /// Spec-object identifier to created requirement.
    pub requirement_map: BTreeMap<String, Uuid>,
    /// Spec-object identifier to created group.
    pub group_map: BTreeMap<String, Uuid>,
    /// Spec-relation identifier to created relationship.
    pub relation_map: BTreeMap<String, Uuid>,
    /// Relation group identifier to created relationship.
    pub relation_group_map: BTreeMap<String, Uuid>,
}

impl ImportedThings {
    /// All created requirements.
    pub fn requirements(&self) -> impl Iterator<Item = &Requirement> {
        self.specifications.iter().flat_map(|s| &s.requirements)
    }
}

/// Creates requirements-model things from interchange documents.
#[derive(Debug)]
pub struct ThingFactory<'a> {
    lang: String,
    short_name_digits: usize,
    mapping: &'a ImportMappingConfiguration,
    reference_data: &'a ReferenceData,
}

impl<'a> ThingFactory<'a> {
    /// Creates a factory importing with `mapping`.
    #[must_use]
    pub fn new(
        config: &Config,
        mapping: &'a ImportMappingConfiguration,
        reference_data: &'a ReferenceData,
    ) -> Self {
        Self {
            lang: config.lang().to_string(),
            short_name_digits: config.short_name_digits(),
            mapping,
            reference_data,
        }
    }

    /// Creates the things described by `document`.
    ///
    /// Generated short-names are numbered from 1 in each call.
    ///
    /// # Errors
    ///
    /// Fails if the document has no core content, if a hierarchy references
    /// an unknown spec-object or places one twice, if a value cannot be read or mapped, or if a
    /// relation references something that was not imported.
    #[instrument(level = "debug", skip_all)]
    pub fn compute(&self, document: &ReqIf) -> Result<ImportedThings, ImportError> {
        let content = document
            .core_content
            .as_ref()
            .ok_or(ImportError::MissingCoreContent)?;

        let mut run = Run::new(self, content);
        for specification in &content.specifications {
            run.import_specification(specification)?;
        }
        run.import_orphans()?;
        for relation in &content.spec_relations {
            run.import_relation(relation)?;
        }
        for group in &content.spec_relation_groups {
            run.import_relation_group(group)?;
        }

        let things = run.things;
        info!(
            "Imported {} specifications, {} requirements and {} relationships",
            things.specifications.len(),
            things.requirements().count(),
            things.relationships.len()
        );
        Ok(things)
    }

    fn short_name(&self, prefix: &str, number: usize) -> String {
        format!("{prefix}{number:0width$}", width = self.short_name_digits)
    }
}

/// Values mapped onto the identity, definitions and parameters of a thing.
#[derive(Debug, Default)]
struct MappedValues {
    short_name: Option<String>,
    name: Option<String>,
    definitions: Vec<Definition>,
    parameter_values: Vec<ParameterValue>,
}

/// The state of one import.
struct Run<'f, 'd> {
    factory: &'f ThingFactory<'f>,
    content: &'d ReqIfContent,
    things: ImportedThings,
    consumed: BTreeSet<&'d str>,
    specification_count: usize,
    requirement_count: usize,
    group_count: usize,
}

impl<'f, 'd> Run<'f, 'd> {
    fn new(factory: &'f ThingFactory<'f>, content: &'d ReqIfContent) -> Self {
        Self {
            factory,
            content,
            things: ImportedThings::default(),
            consumed: BTreeSet::new(),
            specification_count: 0,
            requirement_count: 0,
            group_count: 0,
        }
    }

    fn import_specification(&mut self, specification: &'d Specification) -> Result<(), ImportError> {
        self.specification_count += 1;
        let short_name = self
            .factory
            .short_name(SPECIFICATION_PREFIX, self.specification_count);
        let name = if specification.identity.long_name.trim().is_empty() {
            short_name.clone()
        } else {
            specification.identity.long_name.clone()
        };
        let mut spec = RequirementsSpecification::new(short_name, name);

        match self.factory.mapping.spec_type(&specification.spec_type) {
            Some(type_map) => {
                let mapped = self.mapped_values(
                    &specification.identity.identifier,
                    &specification.values,
                    type_map,
                )?;
                spec.categories = type_map.effective_categories(self.factory.reference_data);
                apply(
                    mapped,
                    &mut spec.short_name,
                    &mut spec.name,
                    &mut spec.definitions,
                    &mut spec.parameter_values,
                );
            }
            None => debug!(
                "Specification '{}' has an unmapped type; no attribute is imported",
                specification.identity.identifier
            ),
        }

        let mut requirements = Vec::new();
        spec.groups = self.walk(&specification.children, None, &mut requirements)?;
        spec.requirements = requirements;

        self.things
            .specification_map
            .insert(specification.identity.identifier.clone(), spec.iid);
        self.things.specifications.push(spec);
        Ok(())
    }

    /// Imports the things below one level of a hierarchy.
    ///
    /// Requirements are appended to `requirements` and assigned to `group`;
    /// the groups created at this level are returned.
    fn walk(
        &mut self,
        nodes: &'d [SpecHierarchy],
        group: Option<Uuid>,
        requirements: &mut Vec<Requirement>,
    ) -> Result<Vec<RequirementsGroup>, ImportError> {
        let mut groups = Vec::new();

        let content = self.content;
        let mapping = self.factory.mapping;

        for node in nodes {
            let object = content
                .spec_object(&node.object)
                .ok_or_else(|| ImportError::UnknownObject(node.object.clone()))?;

            let Some(type_map) = mapping.spec_type(&object.spec_type) else {
                debug!(
                    "Skipping '{}' and its children: type '{}' is not mapped",
                    object.identity.identifier, object.spec_type
                );
                continue;
            };
            if !self.consumed.insert(object.identity.identifier.as_str()) {
                return Err(ImportError::DuplicateObject(
                    object.identity.identifier.clone(),
                ));
            }

            if !node.children.is_empty() {
                let mut created = self.create_group(object, type_map)?;
                created.groups = self.walk(&node.children, Some(created.iid), requirements)?;
                groups.push(created);
            } else if type_map.kind.is_requirement() {
                let mut requirement = self.create_requirement(object, type_map)?;
                requirement.group = group;
                requirements.push(requirement);
            } else {
                groups.push(self.create_group(object, type_map)?);
            }
        }

        Ok(groups)
    }

    fn create_group(
        &mut self,
        object: &SpecObject,
        type_map: &SpecTypeMap,
    ) -> Result<RequirementsGroup, ImportError> {
        self.group_count += 1;
        let short_name = self.factory.short_name(GROUP_PREFIX, self.group_count);
        let name = if object.identity.long_name.trim().is_empty() {
            short_name.clone()
        } else {
            object.identity.long_name.clone()
        };
        let mut group = RequirementsGroup::new(short_name, name);
        group.categories = type_map.effective_categories(self.factory.reference_data);

        let mapped = self.mapped_values(&object.identity.identifier, &object.values, type_map)?;
        apply(
            mapped,
            &mut group.short_name,
            &mut group.name,
            &mut group.definitions,
            &mut group.parameter_values,
        );

        self.things
            .group_map
            .insert(object.identity.identifier.clone(), group.iid);
        Ok(group)
    }

    fn create_requirement(
        &mut self,
        object: &SpecObject,
        type_map: &SpecTypeMap,
    ) -> Result<Requirement, ImportError> {
        self.requirement_count += 1;
        let short_name = self
            .factory
            .short_name(REQUIREMENT_PREFIX, self.requirement_count);
        let mut requirement = Requirement::new(short_name, object.identity.long_name.clone());
        requirement.categories = type_map.effective_categories(self.factory.reference_data);

        let mapped = self.mapped_values(&object.identity.identifier, &object.values, type_map)?;
        apply(
            mapped,
            &mut requirement.short_name,
            &mut requirement.name,
            &mut requirement.definitions,
            &mut requirement.parameter_values,
        );

        self.things
            .requirement_map
            .insert(object.identity.identifier.clone(), requirement.iid);
        Ok(requirement)
    }

    /// Collects spec-objects no hierarchy reached into one specification.
    fn import_orphans(&mut self) -> Result<(), ImportError> {
        let content = self.content;
        let mapping = self.factory.mapping;
        let mut requirements = Vec::new();

        for object in &content.spec_objects {
            if self.consumed.contains(object.identity.identifier.as_str()) {
                continue;
            }
            let Some(type_map) = mapping.spec_type(&object.spec_type) else {
                continue;
            };
            if type_map.kind.is_requirement() {
                requirements.push(self.create_requirement(object, type_map)?);
            }
        }

        if requirements.is_empty() {
            return Ok(());
        }

        debug!(
            "{} requirements are not part of any specification",
            requirements.len()
        );
        let mut spec =
            RequirementsSpecification::new(UNRESOLVED_SPECIFICATION, UNRESOLVED_SPECIFICATION);
        spec.requirements = requirements;
        self.things.specifications.push(spec);
        Ok(())
    }

    fn import_relation(&mut self, relation: &SpecRelation) -> Result<(), ImportError> {
        let Some(type_map) = self.factory.mapping.spec_type(&relation.spec_type) else {
            debug!(
                "Skipping relation '{}': type '{}' is not mapped",
                relation.identity.identifier, relation.spec_type
            );
            return Ok(());
        };

        let map = &self.things.requirement_map;
        let (Some(&source), Some(&target)) = (map.get(&relation.source), map.get(&relation.target))
        else {
            return Err(ImportError::InvalidOperation {
                relation: relation.identity.identifier.clone(),
            });
        };

        let mut relationship = BinaryRelationship::new(
            ThingRef::Requirement(source),
            ThingRef::Requirement(target),
        );
        relationship.categories = type_map.effective_categories(self.factory.reference_data);
        relationship.parameter_values =
            self.parameter_values(&relation.identity.identifier, &relation.values, type_map)?;

        self.things
            .relation_map
            .insert(relation.identity.identifier.clone(), relationship.iid);
        self.things.relationships.push(relationship);
        Ok(())
    }

    fn import_relation_group(&mut self, group: &RelationGroup) -> Result<(), ImportError> {
        let Some(type_map) = self.factory.mapping.spec_type(&group.spec_type) else {
            debug!(
                "Skipping relation group '{}': type '{}' is not mapped",
                group.identity.identifier, group.spec_type
            );
            return Ok(());
        };

        let map = &self.things.specification_map;
        let (Some(&source), Some(&target)) = (
            map.get(&group.source_specification),
            map.get(&group.target_specification),
        ) else {
            return Err(ImportError::InvalidOperation {
                relation: group.identity.identifier.clone(),
            });
        };

        let mut relationship = BinaryRelationship::new(
            ThingRef::Specification(source),
            ThingRef::Specification(target),
        );
        relationship.categories = type_map.effective_categories(self.factory.reference_data);
        relationship.parameter_values =
            self.parameter_values(&group.identity.identifier, &group.values, type_map)?;

        self.things
            .relation_group_map
            .insert(group.identity.identifier.clone(), relationship.iid);
        self.things.relationships.push(relationship);
        Ok(())
    }

    fn mapped_values(
        &self,
        element: &str,
        values: &[AttributeValue],
        type_map: &SpecTypeMap,
    ) -> Result<MappedValues, ImportError> {
        let mut mapped = MappedValues::default();

        for value in values {
            match type_map.attribute(value.definition()) {
                AttributeDefinitionMapKind::None => {}
                AttributeDefinitionMapKind::Name => mapped.name = Some(self.text(element, value)?),
                AttributeDefinitionMapKind::ShortName => {
                    mapped.short_name = Some(self.text(element, value)?);
                }
                AttributeDefinitionMapKind::FirstDefinition => mapped.definitions.push(Definition {
                    content: self.text(element, value)?,
                    language_code: self.factory.lang.clone(),
                }),
                AttributeDefinitionMapKind::ParameterValue => {
                    mapped
                        .parameter_values
                        .push(self.parameter_value(element, value)?);
                }
            }
        }

        Ok(mapped)
    }

    /// Reads only the values mapped to parameter values.
    fn parameter_values(
        &self,
        element: &str,
        values: &[AttributeValue],
        type_map: &SpecTypeMap,
    ) -> Result<Vec<ParameterValue>, ImportError> {
        values
            .iter()
            .filter(|v| type_map.attribute(v.definition()) == AttributeDefinitionMapKind::ParameterValue)
            .map(|v| self.parameter_value(element, v))
            .collect()
    }

    fn parameter_value(
        &self,
        element: &str,
        value: &AttributeValue,
    ) -> Result<ParameterValue, ImportError> {
        let incomplete = || ImportError::MappingIncomplete {
            attribute: value.definition().to_string(),
        };
        let parameter_type = self
            .datatype_map(value)
            .and_then(|map| map.parameter_type)
            .and_then(|iid| self.factory.reference_data.parameter_type(iid))
            .ok_or_else(incomplete)?;

        let text = self.text(element, value)?;
        Ok(ParameterValue {
            parameter_type: parameter_type.iid,
            value: datatype::to_value_array(parameter_type, &text),
            scale: None,
        })
    }

    fn text(&self, element: &str, value: &AttributeValue) -> Result<String, ImportError> {
        datatype::attribute_value_to_string(
            value,
            self.datatype_map(value),
            self.factory.reference_data,
        )
        .map_err(|source| ImportError::Value {
            element: element.to_string(),
            source,
        })
    }

    fn datatype_map(&self, value: &AttributeValue) -> Option<&'f DatatypeDefinitionMap> {
        let definition = self.content.attribute_definition(value.definition())?;
        self.factory.mapping.datatype(&definition.datatype)
    }
}

fn apply(
    mapped: MappedValues,
    short_name: &mut String,
    name: &mut String,
    definitions: &mut Vec<Definition>,
    parameter_values: &mut Vec<ParameterValue>,
) {
    if let Some(value) = mapped.short_name {
        *short_name = value;
    }
    if let Some(value) = mapped.name {
        *name = value;
    }
    definitions.extend(mapped.definitions);
    parameter_values.extend(mapped.parameter_values);
}
