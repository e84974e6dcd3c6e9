use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Placeholder stored in a value-set slot that holds no value.
pub const EMPTY_VALUE: &str = "-";

/// Which slot of a value-set is authoritative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SwitchKind {
    /// The manually entered value.
    #[default]
    Manual,
    /// The computed value.
    Computed,
    /// The reference value.
    Reference,
}

/// The value-set of a parameter or a parameter override.
///
/// Each array holds one slot per component of the parameter type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterValueSet {
    /// Unique identifier.
    pub iid: Uuid,
    /// Manually entered values.
    pub manual: Vec<String>,
    /// Computed values.
    pub computed: Vec<String>,
    /// Reference values.
    pub reference: Vec<String>,
    /// Formulas.
    pub formula: Vec<String>,
    /// The authoritative slot.
    pub value_switch: SwitchKind,
}

impl ParameterValueSet {
    /// Creates a value-set with `slots` empty slots in every array.
    #[must_use]
    pub fn new(slots: usize) -> Self {
        Self {
            iid: Uuid::new_v4(),
            manual: empty_slots(slots),
            computed: empty_slots(slots),
            reference: empty_slots(slots),
            formula: empty_slots(slots),
            value_switch: SwitchKind::default(),
        }
    }
}

/// The value-set of a parameter subscription.
///
/// Subscriptions only carry their own manual value and switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionValueSet {
    /// Unique identifier.
    pub iid: Uuid,
    /// Manually entered values.
    pub manual: Vec<String>,
    /// The authoritative slot.
    pub value_switch: SwitchKind,
}

impl SubscriptionValueSet {
    /// Creates a subscription value-set with `slots` empty manual slots.
    #[must_use]
    pub fn new(slots: usize) -> Self {
        Self {
            iid: Uuid::new_v4(),
            manual: empty_slots(slots),
            value_switch: SwitchKind::default(),
        }
    }
}

/// Any value-set whose values can be reconciled against external input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "class", rename_all = "snake_case")]
pub enum ValueSet {
    /// The value-set of a parameter.
    Parameter(ParameterValueSet),
    /// The value-set of a parameter override.
    ParameterOverride(ParameterValueSet),
    /// The value-set of a parameter subscription.
    ParameterSubscription(SubscriptionValueSet),
}

impl ValueSet {
    /// Identifier of the value-set.
    #[must_use]
    pub const fn iid(&self) -> Uuid {
        match self {
            Self::Parameter(set) | Self::ParameterOverride(set) => set.iid,
            Self::ParameterSubscription(set) => set.iid,
        }
    }

    /// Manually entered values.
    #[must_use]
    pub fn manual(&self) -> &[String] {
        match self {
            Self::Parameter(set) | Self::ParameterOverride(set) => &set.manual,
            Self::ParameterSubscription(set) => &set.manual,
        }
    }

    /// The authoritative slot.
    #[must_use]
    pub const fn value_switch(&self) -> SwitchKind {
        match self {
            Self::Parameter(set) | Self::ParameterOverride(set) => set.value_switch,
            Self::ParameterSubscription(set) => set.value_switch,
        }
    }

    /// The computed, reference and formula arrays, absent for subscriptions.
    #[must_use]
    pub const fn parameter_values(&self) -> Option<&ParameterValueSet> {
        match self {
            Self::Parameter(set) | Self::ParameterOverride(set) => Some(set),
            Self::ParameterSubscription(_) => None,
        }
    }
}

/// An array of `slots` empty values.
#[must_use]
pub fn empty_slots(slots: usize) -> Vec<String> {
    vec![EMPTY_VALUE.to_string(); slots]
}
