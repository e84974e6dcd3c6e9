//! In-memory ReqIF interchange documents.
//!
//! The types here mirror the structure of a ReqIF document: datatype
//! definitions, spec-types owning attribute definitions, spec-objects,
//! specifications with their hierarchy, spec-relations and relation groups.
//! Cross references are held as identifiers and resolved through
//! [`ReqIfContent`].
//!
//! Reading and writing the XML form is left to an external serializer; the
//! types derive `serde` so they can be exchanged as JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Properties shared by every identifiable element of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identifiable {
    /// Document-wide unique identifier.
    pub identifier: String,
    /// Display name.
    #[serde(default)]
    pub long_name: String,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// When the element was last changed.
    pub last_change: DateTime<Utc>,
}

impl Identifiable {
    /// Creates the identity of an element changed now.
    #[must_use]
    pub fn new(
        identifier: impl Into<String>,
        long_name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            long_name: long_name.into(),
            description: description.into(),
            last_change: Utc::now(),
        }
    }

    /// Creates an identity with a fresh random identifier.
    #[must_use]
    pub fn generated(long_name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(Uuid::new_v4().to_string(), long_name, description)
    }
}

/// One value of an enumeration datatype.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumValue {
    /// Identity of the value.
    #[serde(flatten)]
    pub identity: Identifiable,
    /// Position of the value in its datatype.
    pub key: usize,
    /// The external key of the value.
    pub other_content: String,
}

/// The primitive shape of a [`DatatypeDefinition`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "datatype", rename_all = "snake_case")]
pub enum DatatypeKind {
    /// Free text.
    String,
    /// `true` / `false`.
    Boolean,
    /// A date-time.
    Date,
    /// A choice among [`EnumValue`]s.
    Enumeration {
        /// The values in declaration order.
        specified_values: Vec<EnumValue>,
    },
}

/// A datatype attribute definitions refer to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatatypeDefinition {
    /// Identity of the datatype.
    #[serde(flatten)]
    pub identity: Identifiable,
    /// The primitive shape of the datatype.
    #[serde(flatten)]
    pub kind: DatatypeKind,
}

impl DatatypeDefinition {
    /// Identifier of the datatype.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identity.identifier
    }

    /// The specified values, if this is an enumeration.
    #[must_use]
    pub fn enum_values(&self) -> Option<&[EnumValue]> {
        match &self.kind {
            DatatypeKind::Enumeration { specified_values } => Some(specified_values),
            _ => None,
        }
    }
}

/// What a [`SpecType`] types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecTypeKind {
    /// Types [`Specification`]s.
    Specification,
    /// Types [`SpecObject`]s.
    SpecObject,
    /// Types [`SpecRelation`]s.
    SpecRelation,
    /// Types [`RelationGroup`]s.
    RelationGroup,
}

/// An attribute a [`SpecType`] declares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDefinition {
    /// Identity of the attribute definition.
    #[serde(flatten)]
    pub identity: Identifiable,
    /// Identifier of the attribute's datatype.
    pub datatype: String,
    /// Whether several enumeration values may be selected.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub multi_valued: bool,
}

/// The type of a specification, spec-object, spec-relation or relation group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecType {
    /// Identity of the spec-type.
    #[serde(flatten)]
    pub identity: Identifiable,
    /// What the spec-type types.
    pub kind: SpecTypeKind,
    /// Declared attributes, in order.
    #[serde(default)]
    pub attributes: Vec<AttributeDefinition>,
}

impl SpecType {
    /// Identifier of the spec-type.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identity.identifier
    }

    /// Finds the attribute definition with the given long-name and datatype.
    #[must_use]
    pub fn attribute(&self, long_name: &str, datatype: &str) -> Option<&AttributeDefinition> {
        self.attributes
            .iter()
            .find(|a| a.identity.long_name == long_name && a.datatype == datatype)
    }

    /// Finds the attribute definition typed by the given datatype.
    #[must_use]
    pub fn attribute_for_datatype(&self, datatype: &str) -> Option<&AttributeDefinition> {
        self.attributes.iter().find(|a| a.datatype == datatype)
    }
}

/// The value of one attribute of an element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AttributeValue {
    /// A text value.
    String {
        /// Identifier of the attribute definition.
        definition: String,
        /// The text.
        value: String,
    },
    /// A boolean value.
    Boolean {
        /// Identifier of the attribute definition.
        definition: String,
        /// The flag.
        value: bool,
    },
    /// A date value.
    Date {
        /// Identifier of the attribute definition.
        definition: String,
        /// The date-time.
        value: DateTime<Utc>,
    },
    /// An enumeration value.
    Enumeration {
        /// Identifier of the attribute definition.
        definition: String,
        /// Identifiers of the selected [`EnumValue`]s.
        values: Vec<String>,
    },
}

impl AttributeValue {
    /// Identifier of the attribute definition this value is for.
    #[must_use]
    pub fn definition(&self) -> &str {
        match self {
            Self::String { definition, .. }
            | Self::Boolean { definition, .. }
            | Self::Date { definition, .. }
            | Self::Enumeration { definition, .. } => definition,
        }
    }
}

/// Common access to elements that carry a type and attribute values.
pub trait SpecElement {
    /// Identity of the element.
    fn identity(&self) -> &Identifiable;

    /// Identifier of the element's spec-type.
    fn spec_type(&self) -> &str;

    /// Attribute values of the element.
    fn values(&self) -> &[AttributeValue];

    /// Mutable attribute values of the element.
    fn values_mut(&mut self) -> &mut Vec<AttributeValue>;

    /// Identifier of the element.
    fn identifier(&self) -> &str {
        &self.identity().identifier
    }
}

macro_rules! spec_element {
    ($ty:ty) => {
        impl SpecElement for $ty {
            fn identity(&self) -> &Identifiable {
                &self.identity
            }

            fn spec_type(&self) -> &str {
                &self.spec_type
            }

            fn values(&self) -> &[AttributeValue] {
                &self.values
            }

            fn values_mut(&mut self) -> &mut Vec<AttributeValue> {
                &mut self.values
            }
        }
    };
}

/// A requirement-like object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecObject {
    /// Identity of the object.
    #[serde(flatten)]
    pub identity: Identifiable,
    /// Identifier of the object's spec-type.
    pub spec_type: String,
    /// Attribute values.
    #[serde(default)]
    pub values: Vec<AttributeValue>,
}

/// A node of a specification's hierarchy, pointing at a [`SpecObject`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecHierarchy {
    /// Identifier of the node.
    pub identifier: String,
    /// When the node was last changed.
    pub last_change: DateTime<Utc>,
    /// Identifier of the spec-object the node places.
    pub object: String,
    /// Child nodes, in order.
    #[serde(default)]
    pub children: Vec<SpecHierarchy>,
}

impl SpecHierarchy {
    /// Creates a childless node for `object` with a fresh identifier.
    #[must_use]
    pub fn new(object: impl Into<String>) -> Self {
        Self {
            identifier: Uuid::new_v4().to_string(),
            last_change: Utc::now(),
            object: object.into(),
            children: Vec::new(),
        }
    }

    fn collect_objects<'a>(&'a self, out: &mut Vec<&'a str>) {
        out.push(&self.object);
        for child in &self.children {
            child.collect_objects(out);
        }
    }
}

/// A specification: a typed, attributed tree of spec-objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Specification {
    /// Identity of the specification.
    #[serde(flatten)]
    pub identity: Identifiable,
    /// Identifier of the specification's spec-type.
    pub spec_type: String,
    /// Attribute values.
    #[serde(default)]
    pub values: Vec<AttributeValue>,
    /// Top-level hierarchy nodes, in order.
    #[serde(default)]
    pub children: Vec<SpecHierarchy>,
}

impl Specification {
    /// Every spec-object placed in the hierarchy, depth first.
    #[must_use]
    pub fn hierarchy_objects(&self) -> Vec<&str> {
        let mut objects = Vec::new();
        for child in &self.children {
            child.collect_objects(&mut objects);
        }
        objects
    }
}

/// A directed relation between two spec-objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecRelation {
    /// Identity of the relation.
    #[serde(flatten)]
    pub identity: Identifiable,
    /// Identifier of the relation's spec-type.
    pub spec_type: String,
    /// Attribute values.
    #[serde(default)]
    pub values: Vec<AttributeValue>,
    /// Identifier of the source spec-object.
    pub source: String,
    /// Identifier of the target spec-object.
    pub target: String,
}

/// A group of spec-relations running between two specifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationGroup {
    /// Identity of the relation group.
    #[serde(flatten)]
    pub identity: Identifiable,
    /// Identifier of the group's spec-type.
    pub spec_type: String,
    /// Attribute values.
    #[serde(default)]
    pub values: Vec<AttributeValue>,
    /// Identifier of the source specification.
    pub source_specification: String,
    /// Identifier of the target specification.
    pub target_specification: String,
    /// Identifiers of the grouped spec-relations.
    #[serde(default)]
    pub spec_relations: Vec<String>,
}

spec_element!(SpecObject);
spec_element!(Specification);
spec_element!(SpecRelation);
spec_element!(RelationGroup);

/// Metadata describing where a document comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReqIfHeader {
    /// Identifier of the document.
    pub identifier: String,
    /// When the document was created.
    pub creation_time: DateTime<Utc>,
    /// Title of the document.
    pub title: String,
    /// Free-text comment.
    #[serde(default)]
    pub comment: String,
    /// Tool that wrote the document.
    pub req_if_tool_id: String,
    /// Repository the content was taken from.
    pub repository_id: String,
    /// Tool the content originates from.
    pub source_tool_id: String,
}

/// The exchanged content of a document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReqIfContent {
    /// Datatype definitions.
    #[serde(default)]
    pub datatypes: Vec<DatatypeDefinition>,
    /// Spec-types.
    #[serde(default)]
    pub spec_types: Vec<SpecType>,
    /// Spec-objects.
    #[serde(default)]
    pub spec_objects: Vec<SpecObject>,
    /// Specifications.
    #[serde(default)]
    pub specifications: Vec<Specification>,
    /// Spec-relations.
    #[serde(default)]
    pub spec_relations: Vec<SpecRelation>,
    /// Relation groups.
    #[serde(default)]
    pub spec_relation_groups: Vec<RelationGroup>,
}

impl ReqIfContent {
    /// Looks up a datatype by identifier.
    #[must_use]
    pub fn datatype(&self, identifier: &str) -> Option<&DatatypeDefinition> {
        self.datatypes
            .iter()
            .find(|d| d.identity.identifier == identifier)
    }

    /// Looks up a spec-type by identifier.
    #[must_use]
    pub fn spec_type(&self, identifier: &str) -> Option<&SpecType> {
        self.spec_types
            .iter()
            .find(|t| t.identity.identifier == identifier)
    }

    /// Looks up a spec-object by identifier.
    #[must_use]
    pub fn spec_object(&self, identifier: &str) -> Option<&SpecObject> {
        self.spec_objects
            .iter()
            .find(|o| o.identity.identifier == identifier)
    }

    /// Looks up an attribute definition, searching every spec-type.
    #[must_use]
    pub fn attribute_definition(&self, identifier: &str) -> Option<&AttributeDefinition> {
        self.spec_types
            .iter()
            .flat_map(|t| &t.attributes)
            .find(|a| a.identity.identifier == identifier)
    }
}

/// A ReqIF interchange document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReqIf {
    /// Language of the document's text.
    pub lang: String,
    /// Document header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<ReqIfHeader>,
    /// Exchanged content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub core_content: Option<ReqIfContent>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hierarchy_objects_are_depth_first() {
        let mut group = SpecHierarchy::new("group");
        group.children.push(SpecHierarchy::new("nested"));

        let specification = Specification {
            identity: Identifiable::generated("spec", ""),
            spec_type: "type".to_string(),
            values: Vec::new(),
            children: vec![group, SpecHierarchy::new("loose")],
        };

        assert_eq!(specification.hierarchy_objects(), ["group", "nested", "loose"]);
    }

    #[test]
    fn attribute_definition_is_found_across_spec_types() {
        let attribute = AttributeDefinition {
            identity: Identifiable::new("attr", "Name", ""),
            datatype: "text".to_string(),
            multi_valued: false,
        };
        let content = ReqIfContent {
            spec_types: vec![
                SpecType {
                    identity: Identifiable::generated("empty", ""),
                    kind: SpecTypeKind::Specification,
                    attributes: Vec::new(),
                },
                SpecType {
                    identity: Identifiable::generated("typed", ""),
                    kind: SpecTypeKind::SpecObject,
                    attributes: vec![attribute.clone()],
                },
            ],
            ..ReqIfContent::default()
        };

        assert_eq!(content.attribute_definition("attr"), Some(&attribute));
        assert!(content.attribute_definition("missing").is_none());
    }

    #[test]
    fn document_survives_json() {
        let datatype = DatatypeDefinition {
            identity: Identifiable::new("dt", "Level", ""),
            kind: DatatypeKind::Enumeration {
                specified_values: vec![EnumValue {
                    identity: Identifiable::new("v1", "low", "low"),
                    key: 0,
                    other_content: "LOW".to_string(),
                }],
            },
        };
        let document = ReqIf {
            lang: "en".to_string(),
            header: None,
            core_content: Some(ReqIfContent {
                datatypes: vec![datatype],
                ..ReqIfContent::default()
            }),
        };

        let json = serde_json::to_string(&document).unwrap();
        let back: ReqIf = serde_json::from_str(&json).unwrap();
        assert_eq!(back, document);
    }
}
