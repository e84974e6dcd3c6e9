use std::collections::BTreeSet;

use tracing::debug;
use uuid::Uuid;

use super::{
    BOOLEAN_DATATYPE_ID, CATEGORIES_ATTRIBUTE, GROUP_NAME_PREFIX, IS_DEPRECATED_ATTRIBUTE,
    NAME_ATTRIBUTE, REQUIREMENT_TEXT_ATTRIBUTE, SHORT_NAME_ATTRIBUTE, TEXT_DATATYPE_ID,
};
use crate::{
    domain::ParameterizedCategoryRule,
    reqif::{AttributeDefinition, Identifiable, SpecType, SpecTypeKind},
};

/// The kind of model node a spec-type is created for.
///
/// Requirements and groups both become spec-objects but never share a
/// spec-type, even when the same rules apply to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// A requirements specification.
    Specification,
    /// A requirement.
    Requirement,
    /// A requirements group.
    Group,
    /// A relationship between two requirements.
    RequirementRelationship,
    /// A relationship between two specifications.
    SpecificationRelationship,
}

impl NodeKind {
    /// What spec-types for this kind of node type.
    #[must_use]
    pub const fn spec_type_kind(self) -> SpecTypeKind {
        match self {
            Self::Specification => SpecTypeKind::Specification,
            Self::Requirement | Self::Group => SpecTypeKind::SpecObject,
            Self::RequirementRelationship => SpecTypeKind::SpecRelation,
            Self::SpecificationRelationship => SpecTypeKind::RelationGroup,
        }
    }

    /// The name of the model class, used to name spec-types with no rules.
    #[must_use]
    pub const fn class_name(self) -> &'static str {
        match self {
            Self::Specification => "RequirementsSpecification",
            Self::Requirement => "Requirement",
            Self::Group => "RequirementsGroup",
            Self::RequirementRelationship | Self::SpecificationRelationship => {
                "BinaryRelationship"
            }
        }
    }
}

#[derive(Debug)]
struct Entry {
    kind: NodeKind,
    rules: BTreeSet<Uuid>,
    spec_type: SpecType,
}

/// Spec-types created during one build, keyed by node kind and rule set.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    entries: Vec<Entry>,
}

impl TypeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The spec-type registered for `kind` and exactly this set of rules.
    #[must_use]
    pub fn find(&self, kind: NodeKind, rules: &[&ParameterizedCategoryRule]) -> Option<&SpecType> {
        let key = rule_key(rules);
        self.entries
            .iter()
            .find(|e| e.kind == kind && e.rules == key)
            .map(|e| &e.spec_type)
    }

    /// Looks up a registered spec-type by identifier.
    #[must_use]
    pub fn get(&self, identifier: &str) -> Option<&SpecType> {
        self.entries
            .iter()
            .map(|e| &e.spec_type)
            .find(|t| t.identity.identifier == identifier)
    }

    /// Returns the spec-type for `kind` and `rules`, creating it if needed.
    ///
    /// The returned flag is `true` if the spec-type was created by this call.
    /// A new spec-type is named after its rules (or the node's class when no
    /// rule applies) and declares the common attributes, the attributes
    /// specific to `kind`, and `rule_attributes`.
    pub fn find_or_create<F>(
        &mut self,
        kind: NodeKind,
        rules: &[&ParameterizedCategoryRule],
        rule_attributes: F,
    ) -> (&SpecType, bool)
    where
        F: FnOnce() -> Vec<AttributeDefinition>,
    {
        let key = rule_key(rules);
        if let Some(index) = self
            .entries
            .iter()
            .position(|e| e.kind == kind && e.rules == key)
        {
            return (&self.entries[index].spec_type, false);
        }

        let spec_type = new_spec_type(kind, rules, rule_attributes());
        debug!(
            "Created spec-type '{}' for {:?}",
            spec_type.identity.long_name, kind
        );
        self.entries.push(Entry {
            kind,
            rules: key,
            spec_type,
        });
        let created = &self.entries[self.entries.len() - 1].spec_type;
        (created, true)
    }

    /// The number of registered spec-types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no spec-type has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The registered spec-types, in creation order.
    #[must_use]
    pub fn into_spec_types(self) -> Vec<SpecType> {
        self.entries.into_iter().map(|e| e.spec_type).collect()
    }
}

fn rule_key(rules: &[&ParameterizedCategoryRule]) -> BTreeSet<Uuid> {
    rules.iter().map(|r| r.iid).collect()
}

fn new_spec_type(
    kind: NodeKind,
    rules: &[&ParameterizedCategoryRule],
    rule_attributes: Vec<AttributeDefinition>,
) -> SpecType {
    let (long_name, description) = if rules.is_empty() {
        (kind.class_name().to_string(), kind.class_name().to_string())
    } else {
        (
            rules.iter().map(|r| r.short_name.as_str()).collect::<Vec<_>>().join(", "),
            rules.iter().map(|r| r.name.as_str()).collect::<Vec<_>>().join(", "),
        )
    };
    let long_name = match kind {
        NodeKind::Group => format!("{GROUP_NAME_PREFIX}{long_name}"),
        _ => long_name,
    };

    let mut attributes = vec![
        builtin_attribute(SHORT_NAME_ATTRIBUTE, "The Short-Name Attribute", TEXT_DATATYPE_ID),
        builtin_attribute(NAME_ATTRIBUTE, "The Name Attribute", TEXT_DATATYPE_ID),
        builtin_attribute(CATEGORIES_ATTRIBUTE, "The Categories Attribute", TEXT_DATATYPE_ID),
    ];
    if kind == NodeKind::Requirement {
        attributes.push(builtin_attribute(
            REQUIREMENT_TEXT_ATTRIBUTE,
            "The Requirement Text Attribute Definition",
            TEXT_DATATYPE_ID,
        ));
    }
    if matches!(kind, NodeKind::Requirement | NodeKind::Specification) {
        attributes.push(builtin_attribute(
            IS_DEPRECATED_ATTRIBUTE,
            "The IsDeprecated Attribute Definition",
            BOOLEAN_DATATYPE_ID,
        ));
    }
    attributes.extend(rule_attributes);

    SpecType {
        identity: Identifiable::generated(long_name, description),
        kind: kind.spec_type_kind(),
        attributes,
    }
}

fn builtin_attribute(long_name: &str, description: &str, datatype: &str) -> AttributeDefinition {
    AttributeDefinition {
        identity: Identifiable::generated(long_name, description),
        datatype: datatype.to_string(),
        multi_valued: false,
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    fn rules() -> (ParameterizedCategoryRule, ParameterizedCategoryRule) {
        (
            ParameterizedCategoryRule::new("R1", "rule one", Uuid::new_v4(), vec![]),
            ParameterizedCategoryRule::new("R2", "rule two", Uuid::new_v4(), vec![]),
        )
    }

    fn long_names(spec_type: &SpecType) -> Vec<&str> {
        spec_type
            .attributes
            .iter()
            .map(|a| a.identity.long_name.as_str())
            .collect()
    }

    #[test]
    fn equal_rule_sets_share_a_spec_type() {
        let (r1, r2) = rules();
        let mut registry = TypeRegistry::new();

        let (first, created) = registry.find_or_create(NodeKind::Requirement, &[&r1, &r2], Vec::new);
        let first = first.identity.identifier.clone();
        assert!(created);

        let (second, created) =
            registry.find_or_create(NodeKind::Requirement, &[&r2, &r1], || {
                panic!("attributes are not rebuilt for a reused spec-type")
            });
        assert!(!created);
        assert_eq!(second.identity.identifier, first);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn different_rule_sets_get_their_own_spec_type() {
        let (r1, r2) = rules();
        let mut registry = TypeRegistry::new();

        registry.find_or_create(NodeKind::Requirement, &[&r1], Vec::new);
        let (_, created) = registry.find_or_create(NodeKind::Requirement, &[&r1, &r2], Vec::new);

        assert!(created);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn groups_and_requirements_never_share() {
        let (r1, _) = rules();
        let mut registry = TypeRegistry::new();

        registry.find_or_create(NodeKind::Requirement, &[&r1], Vec::new);
        let (group_type, created) = registry.find_or_create(NodeKind::Group, &[&r1], Vec::new);

        assert!(created);
        assert_eq!(group_type.identity.long_name, "[Group]R1");
        assert_eq!(group_type.kind, SpecTypeKind::SpecObject);
        assert!(registry.find(NodeKind::Group, &[&r1]).is_some());
        assert!(registry.find(NodeKind::Group, &[]).is_none());
    }

    #[test]
    fn names_come_from_rules_or_class() {
        let (r1, r2) = rules();
        let mut registry = TypeRegistry::new();

        let (named, _) = registry.find_or_create(NodeKind::Specification, &[&r1, &r2], Vec::new);
        assert_eq!(named.identity.long_name, "R1, R2");
        assert_eq!(named.identity.description, "rule one, rule two");

        let (plain, _) = registry.find_or_create(NodeKind::Specification, &[], Vec::new);
        assert_eq!(plain.identity.long_name, "RequirementsSpecification");
    }

    #[test_case(NodeKind::Specification => vec!["Short-Name", "Name", "Categories", "IsDeprecated"]; "specification")]
    #[test_case(NodeKind::Requirement => vec!["Short-Name", "Name", "Categories", "Requirement Text", "IsDeprecated"]; "requirement")]
    #[test_case(NodeKind::Group => vec!["Short-Name", "Name", "Categories"]; "group")]
    #[test_case(NodeKind::RequirementRelationship => vec!["Short-Name", "Name", "Categories"]; "relation")]
    fn builtin_attributes(kind: NodeKind) -> Vec<String> {
        let mut registry = TypeRegistry::new();
        let (spec_type, _) = registry.find_or_create(kind, &[], Vec::new);
        long_names(spec_type).into_iter().map(String::from).collect()
    }

    #[test]
    fn rule_attributes_follow_builtins() {
        let (r1, _) = rules();
        let mut registry = TypeRegistry::new();
        let extra = builtin_attribute("mass", "-", "mass-datatype");

        let (spec_type, _) =
            registry.find_or_create(NodeKind::RequirementRelationship, &[&r1], || vec![extra]);

        assert_eq!(long_names(spec_type).last(), Some(&"mass"));
        assert_eq!(spec_type.kind, SpecTypeKind::SpecRelation);
    }
}
