use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A measurement scale a quantity (or compound component) is expressed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasurementScale {
    /// Unique identifier of the scale.
    pub iid: Uuid,
    /// Short symbol of the scale, e.g. `m` or `kg`.
    pub short_name: String,
    /// Human-readable name of the scale.
    pub name: String,
}

impl MeasurementScale {
    /// Creates a new scale with a fresh identifier.
    #[must_use]
    pub fn new(short_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            iid: Uuid::new_v4(),
            short_name: short_name.into(),
            name: name.into(),
        }
    }
}

/// One literal of an enumeration parameter type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumerationValueDefinition {
    /// Unique identifier of the literal.
    pub iid: Uuid,
    /// Short-name of the literal. Value arrays reference literals by this key.
    pub short_name: String,
    /// Human-readable name of the literal.
    pub name: String,
}

impl EnumerationValueDefinition {
    /// Creates a new literal with a fresh identifier.
    #[must_use]
    pub fn new(short_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            iid: Uuid::new_v4(),
            short_name: short_name.into(),
            name: name.into(),
        }
    }
}

/// One component of a compound parameter type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    /// Short-name of the component, used as its label in formatted values.
    pub short_name: String,
    /// Scale of the component, if it is a quantity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<MeasurementScale>,
}

/// The kind of value a [`ParameterType`] carries.
///
/// This is a closed set: every conversion in the crate matches on it
/// exhaustively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParameterTypeKind {
    /// `true` / `false`.
    Boolean,
    /// A calendar date.
    Date,
    /// A date and time of day.
    DateTime,
    /// A time of day.
    TimeOfDay,
    /// Free text.
    Text,
    /// A choice among predefined literals.
    Enumeration {
        /// Literals in declaration order.
        values: Vec<EnumerationValueDefinition>,
        /// Whether several literals may be selected at once.
        #[serde(default)]
        allow_multi_select: bool,
    },
    /// A numeric quantity expressed in a scale.
    Quantity {
        /// Scale used when a value does not name one.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default_scale: Option<MeasurementScale>,
    },
    /// An ordered tuple of components.
    Compound {
        /// Components in declaration order.
        components: Vec<Component>,
    },
}

/// A value-type that parameters of requirements-model objects may carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterType {
    /// Unique identifier of the parameter type.
    pub iid: Uuid,
    /// Short-name of the parameter type.
    pub short_name: String,
    /// Human-readable name of the parameter type.
    pub name: String,
    /// Optional textual definition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
    /// What kind of value the parameter type carries.
    #[serde(flatten)]
    pub kind: ParameterTypeKind,
}

impl ParameterType {
    /// Creates a new parameter type with a fresh identifier.
    #[must_use]
    pub fn new(short_name: impl Into<String>, name: impl Into<String>, kind: ParameterTypeKind) -> Self {
        Self {
            iid: Uuid::new_v4(),
            short_name: short_name.into(),
            name: name.into(),
            definition: None,
            kind,
        }
    }

    /// The number of slots a value-set of this type holds.
    ///
    /// Compound types hold one slot per component, everything else holds one.
    #[must_use]
    pub fn number_of_values(&self) -> usize {
        match &self.kind {
            ParameterTypeKind::Compound { components } => components.len(),
            _ => 1,
        }
    }

    /// Whether this is a date, date-time or time-of-day type.
    #[must_use]
    pub const fn is_date_family(&self) -> bool {
        matches!(
            self.kind,
            ParameterTypeKind::Date | ParameterTypeKind::DateTime | ParameterTypeKind::TimeOfDay
        )
    }

    /// The enumeration literals of this type, if it is an enumeration.
    #[must_use]
    pub fn enumeration_values(&self) -> Option<&[EnumerationValueDefinition]> {
        match &self.kind {
            ParameterTypeKind::Enumeration { values, .. } => Some(values),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compound_has_one_slot_per_component() {
        let compound = ParameterType::new(
            "pos",
            "position",
            ParameterTypeKind::Compound {
                components: vec![
                    Component {
                        short_name: "x".to_string(),
                        scale: None,
                    },
                    Component {
                        short_name: "y".to_string(),
                        scale: None,
                    },
                ],
            },
        );
        assert_eq!(compound.number_of_values(), 2);

        let text = ParameterType::new("t", "text", ParameterTypeKind::Text);
        assert_eq!(text.number_of_values(), 1);
    }

    #[test]
    fn kind_is_flattened_into_json() {
        let pt = ParameterType::new("b", "flag", ParameterTypeKind::Boolean);
        let json = serde_json::to_value(&pt).unwrap();
        assert_eq!(json["kind"], "boolean");

        let back: ParameterType = serde_json::from_value(json).unwrap();
        assert_eq!(back, pt);
    }
}
