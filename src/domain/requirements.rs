//! The hierarchical requirements model.
//!
//! A [`RequirementsModel`] is a forest of [`RequirementsSpecification`]s. Each
//! specification owns a tree of [`RequirementsGroup`]s and a flat list of
//! [`Requirement`]s; a requirement may be assigned to one group of its own
//! specification. [`BinaryRelationship`]s connect requirements or
//! specifications.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::ReferenceData;

/// A textual definition in a given language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Definition {
    /// The definition text.
    pub content: String,
    /// Language code of the text, e.g. `en`.
    pub language_code: String,
}

/// A parameter value attached to a model object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterValue {
    /// The parameter type of the value.
    pub parameter_type: Uuid,
    /// String-encoded value, one slot per component of the parameter type.
    pub value: Vec<String>,
    /// Scale the value is expressed in, for quantities.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<Uuid>,
}

impl ParameterValue {
    /// Creates a single-slot value without a scale.
    #[must_use]
    pub fn new(parameter_type: Uuid, value: impl Into<String>) -> Self {
        Self {
            parameter_type,
            value: vec![value.into()],
            scale: None,
        }
    }
}

/// A single requirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    /// Unique identifier.
    pub iid: Uuid,
    /// Short-name.
    pub short_name: String,
    /// Human-readable name.
    pub name: String,
    /// Definitions; the first one holds the requirement text.
    #[serde(default)]
    pub definitions: Vec<Definition>,
    /// Categories the requirement is a member of.
    #[serde(default)]
    pub categories: Vec<Uuid>,
    /// Parameter values.
    #[serde(default)]
    pub parameter_values: Vec<ParameterValue>,
    /// Deprecated requirements are never exported.
    #[serde(default)]
    pub is_deprecated: bool,
    /// The group of the owning specification this requirement belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<Uuid>,
}

impl Requirement {
    /// Creates an ungrouped requirement with a fresh identifier.
    #[must_use]
    pub fn new(short_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            iid: Uuid::new_v4(),
            short_name: short_name.into(),
            name: name.into(),
            definitions: Vec::new(),
            categories: Vec::new(),
            parameter_values: Vec::new(),
            is_deprecated: false,
            group: None,
        }
    }

    /// The requirement text, i.e. the content of the first definition.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.definitions.first().map(|d| d.content.as_str())
    }
}

/// A group of requirements, possibly containing further groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementsGroup {
    /// Unique identifier.
    pub iid: Uuid,
    /// Short-name.
    pub short_name: String,
    /// Human-readable name.
    pub name: String,
    /// Definitions.
    #[serde(default)]
    pub definitions: Vec<Definition>,
    /// Categories the group is a member of.
    #[serde(default)]
    pub categories: Vec<Uuid>,
    /// Parameter values.
    #[serde(default)]
    pub parameter_values: Vec<ParameterValue>,
    /// Nested groups, in order.
    #[serde(default)]
    pub groups: Vec<RequirementsGroup>,
}

impl RequirementsGroup {
    /// Creates an empty group with a fresh identifier.
    #[must_use]
    pub fn new(short_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            iid: Uuid::new_v4(),
            short_name: short_name.into(),
            name: name.into(),
            definitions: Vec::new(),
            categories: Vec::new(),
            parameter_values: Vec::new(),
            groups: Vec::new(),
        }
    }

    fn collect<'a>(&'a self, out: &mut Vec<&'a Self>) {
        out.push(self);
        for group in &self.groups {
            group.collect(out);
        }
    }
}

/// A requirements specification: the root of a requirements hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementsSpecification {
    /// Unique identifier.
    pub iid: Uuid,
    /// Short-name.
    pub short_name: String,
    /// Human-readable name.
    pub name: String,
    /// Definitions.
    #[serde(default)]
    pub definitions: Vec<Definition>,
    /// Categories the specification is a member of.
    #[serde(default)]
    pub categories: Vec<Uuid>,
    /// Parameter values.
    #[serde(default)]
    pub parameter_values: Vec<ParameterValue>,
    /// Deprecated specifications are never exported.
    #[serde(default)]
    pub is_deprecated: bool,
    /// Top-level groups, in order.
    #[serde(default)]
    pub groups: Vec<RequirementsGroup>,
    /// All requirements of the specification, grouped or not.
    #[serde(default)]
    pub requirements: Vec<Requirement>,
}

/// Errors raised when editing a requirements model.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    /// The requirement is not owned by the specification.
    #[error("requirement {0} is not part of specification {1}")]
    RequirementNotFound(Uuid, Uuid),
    /// The group is not owned by the specification.
    #[error("group {0} does not belong to specification {1}")]
    ForeignGroup(Uuid, Uuid),
}

impl RequirementsSpecification {
    /// Creates an empty specification with a fresh identifier.
    #[must_use]
    pub fn new(short_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            iid: Uuid::new_v4(),
            short_name: short_name.into(),
            name: name.into(),
            definitions: Vec::new(),
            categories: Vec::new(),
            parameter_values: Vec::new(),
            is_deprecated: false,
            groups: Vec::new(),
            requirements: Vec::new(),
        }
    }

    /// Every group of the specification, depth first, parents before children.
    #[must_use]
    pub fn all_groups(&self) -> Vec<&RequirementsGroup> {
        let mut groups = Vec::new();
        for group in &self.groups {
            group.collect(&mut groups);
        }
        groups
    }

    /// Whether the group belongs to this specification at any depth.
    #[must_use]
    pub fn contains_group(&self, iid: Uuid) -> bool {
        self.all_groups().iter().any(|g| g.iid == iid)
    }

    /// Assigns a requirement of this specification to one of its groups.
    ///
    /// # Errors
    ///
    /// Fails if the requirement is not owned by this specification or if the
    /// group belongs to another specification.
    pub fn assign_to_group(&mut self, requirement: Uuid, group: Uuid) -> Result<(), ModelError> {
        if !self.contains_group(group) {
            return Err(ModelError::ForeignGroup(group, self.iid));
        }
        let spec = self.iid;
        let requirement = self
            .requirements
            .iter_mut()
            .find(|r| r.iid == requirement)
            .ok_or(ModelError::RequirementNotFound(requirement, spec))?;
        requirement.group = Some(group);
        Ok(())
    }

    /// Non-deprecated requirements placed directly under the specification.
    ///
    /// These are the requirements without a group and those assigned to a
    /// group this specification does not own.
    pub fn top_level_requirements(&self) -> impl Iterator<Item = &Requirement> {
        let groups: Vec<_> = self.all_groups().iter().map(|g| g.iid).collect();
        self.requirements
            .iter()
            .filter(move |r| !r.is_deprecated && r.group.is_none_or(|g| !groups.contains(&g)))
    }

    /// Non-deprecated requirements assigned to `group`.
    pub fn requirements_in_group(&self, group: Uuid) -> impl Iterator<Item = &Requirement> {
        self.requirements
            .iter()
            .filter(move |r| !r.is_deprecated && r.group == Some(group))
    }
}

/// One end of a [`BinaryRelationship`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "iid", rename_all = "snake_case")]
pub enum ThingRef {
    /// A requirement.
    Requirement(Uuid),
    /// A requirements specification.
    Specification(Uuid),
}

/// A directed, categorised relationship between two model objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryRelationship {
    /// Unique identifier.
    pub iid: Uuid,
    /// Categories the relationship is a member of.
    #[serde(default)]
    pub categories: Vec<Uuid>,
    /// Parameter values.
    #[serde(default)]
    pub parameter_values: Vec<ParameterValue>,
    /// The source of the relationship.
    pub source: ThingRef,
    /// The target of the relationship.
    pub target: ThingRef,
}

impl BinaryRelationship {
    /// Creates an uncategorised relationship with a fresh identifier.
    #[must_use]
    pub fn new(source: ThingRef, target: ThingRef) -> Self {
        Self {
            iid: Uuid::new_v4(),
            categories: Vec::new(),
            parameter_values: Vec::new(),
            source,
            target,
        }
    }

    /// The source and target requirement, if this relates two requirements.
    #[must_use]
    pub const fn requirement_ends(&self) -> Option<(Uuid, Uuid)> {
        match (self.source, self.target) {
            (ThingRef::Requirement(source), ThingRef::Requirement(target)) => {
                Some((source, target))
            }
            _ => None,
        }
    }

    /// The source and target specification, if this relates two
    /// specifications.
    #[must_use]
    pub const fn specification_ends(&self) -> Option<(Uuid, Uuid)> {
        match (self.source, self.target) {
            (ThingRef::Specification(source), ThingRef::Specification(target)) => {
                Some((source, target))
            }
            _ => None,
        }
    }
}

/// Descriptive information about the model being exchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSetup {
    /// Short-name of the model.
    pub short_name: String,
    /// Human-readable name of the model.
    pub name: String,
    /// Definitions of the model.
    #[serde(default)]
    pub definitions: Vec<Definition>,
}

/// The connection a model was loaded through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Where the data comes from, reported as the document's repository id.
    pub data_source_uri: String,
    /// Identity of the backing store the session reads.
    pub store: Uuid,
}

impl Session {
    /// Creates a session for the given data-source and store.
    #[must_use]
    pub fn new(data_source_uri: impl Into<String>, store: Uuid) -> Self {
        Self {
            data_source_uri: data_source_uri.into(),
            store,
        }
    }
}

/// One iteration of a requirements model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementsModel {
    /// Identifier of the iteration.
    pub iid: Uuid,
    /// The backing store this model was materialised from.
    pub store: Uuid,
    /// Descriptive model information.
    #[serde(default)]
    pub setup: ModelSetup,
    /// Reference data (categories, rules, parameter types).
    #[serde(default)]
    pub reference_data: ReferenceData,
    /// The specifications of the model.
    #[serde(default)]
    pub specifications: Vec<RequirementsSpecification>,
    /// Relationships between model objects.
    #[serde(default)]
    pub relationships: Vec<BinaryRelationship>,
}

impl RequirementsModel {
    /// Creates an empty model attached to `store`.
    #[must_use]
    pub fn new(store: Uuid, setup: ModelSetup, reference_data: ReferenceData) -> Self {
        Self {
            iid: Uuid::new_v4(),
            store,
            setup,
            reference_data,
            specifications: Vec::new(),
            relationships: Vec::new(),
        }
    }

    /// Whether the model was materialised from the session's store.
    #[must_use]
    pub fn is_attached_to(&self, session: &Session) -> bool {
        self.store == session.store
    }

    /// Looks up a specification by identifier.
    #[must_use]
    pub fn specification(&self, iid: Uuid) -> Option<&RequirementsSpecification> {
        self.specifications.iter().find(|s| s.iid == iid)
    }

    /// Looks up a requirement and its owning specification.
    #[must_use]
    pub fn requirement(&self, iid: Uuid) -> Option<(&RequirementsSpecification, &Requirement)> {
        self.specifications.iter().find_map(|spec| {
            spec.requirements
                .iter()
                .find(|r| r.iid == iid)
                .map(|r| (spec, r))
        })
    }

    /// Relationships between two requirements.
    pub fn requirement_relationships(&self) -> impl Iterator<Item = &BinaryRelationship> {
        self.relationships
            .iter()
            .filter(|r| r.requirement_ends().is_some())
    }

    /// Relationships between two specifications.
    pub fn specification_relationships(&self) -> impl Iterator<Item = &BinaryRelationship> {
        self.relationships
            .iter()
            .filter(|r| r.specification_ends().is_some())
    }
}
