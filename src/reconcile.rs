//! Reconciling value-sets against externally edited cell values.
//!
//! A [`ProcessedValueSet`] wraps a persisted value-set. Rows of cell values
//! read from an external source are compared slot by slot with it; the first
//! difference clones the value-set and every difference is written to that
//! clone, leaving the original untouched for the caller to diff or discard.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::{
    datatype::DATE_TIME_FORMAT,
    domain::{
        ParameterType, ParameterTypeKind, ParameterValueSet, SwitchKind, ValueSet,
        value_set::EMPTY_VALUE,
    },
};

/// Errors raised while reconciling a value-set.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReconcileError {
    /// A clone was queried before any value was written to it.
    #[error("the value-set has not been cloned; update it first")]
    NoClone,

    /// The component index lies outside the parameter type.
    #[error("component {index} is out of range for a parameter type with {components} components")]
    ComponentOutOfRange {
        /// The requested component.
        index: usize,
        /// The number of components of the parameter type.
        components: usize,
    },
}

/// A raw value read from an external cell.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    /// No value.
    #[default]
    Empty,
    /// A boolean.
    Bool(bool),
    /// A number.
    Number(f64),
    /// A date and time.
    DateTime(NaiveDateTime),
    /// Anything else, kept verbatim.
    Text(String),
}

impl CellValue {
    /// Encodes the cell the way value-sets of `parameter_type` store it.
    ///
    /// Numbers use their shortest round-trip decimal form with at least one
    /// fractional digit, so `1` becomes `"1.0"`. Dates are formatted to
    /// match the date, date-time or time-of-day kind of the parameter type.
    #[must_use]
    pub fn to_value_set_string(&self, parameter_type: &ParameterType) -> String {
        match self {
            Self::Empty => EMPTY_VALUE.to_string(),
            Self::Bool(value) => value.to_string(),
            Self::Number(value) => format!("{value:?}"),
            Self::DateTime(value) => {
                let format = match parameter_type.kind {
                    ParameterTypeKind::Date => "%Y-%m-%d",
                    ParameterTypeKind::TimeOfDay => "%H:%M:%S",
                    _ => DATE_TIME_FORMAT,
                };
                value.format(format).to_string()
            }
            Self::Text(value) => value.clone(),
        }
    }
}

/// One row of external cell values for a single component of a value-set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CellRow {
    /// The authoritative slot.
    #[serde(default)]
    pub switch: SwitchKind,
    /// The manual value.
    #[serde(default)]
    pub manual: CellValue,
    /// The computed value. Ignored for subscriptions.
    #[serde(default)]
    pub computed: CellValue,
    /// The reference value. Ignored for subscriptions.
    #[serde(default)]
    pub reference: CellValue,
    /// The formula, verbatim. Ignored for subscriptions.
    #[serde(default = "empty_formula")]
    pub formula: String,
}

fn empty_formula() -> String {
    EMPTY_VALUE.to_string()
}

/// Canonical values to write to one component of a value-set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueSetValues {
    /// The component written.
    pub component_index: usize,
    /// The number of components of the parameter type.
    pub components: usize,
    /// The authoritative slot.
    pub switch: SwitchKind,
    /// The manual value.
    pub manual: String,
    /// The computed value; absent for subscriptions.
    pub computed: Option<String>,
    /// The reference value; absent for subscriptions.
    pub reference: Option<String>,
    /// The formula; absent for subscriptions.
    pub formula: Option<String>,
}

/// A value-set together with the clone holding its pending changes.
#[derive(Debug, Clone)]
pub struct ProcessedValueSet {
    original: ValueSet,
    clone: Option<ValueSet>,
}

impl ProcessedValueSet {
    /// Wraps a persisted value-set.
    #[must_use]
    pub const fn new(original: ValueSet) -> Self {
        Self {
            original,
            clone: None,
        }
    }

    /// The persisted value-set.
    #[must_use]
    pub const fn original(&self) -> &ValueSet {
        &self.original
    }

    /// The clone holding pending changes, once a change was written.
    #[must_use]
    pub const fn cloned(&self) -> Option<&ValueSet> {
        self.clone.as_ref()
    }

    /// Consumes the wrapper, returning the clone if anything changed.
    #[must_use]
    pub fn into_clone(self) -> Option<ValueSet> {
        self.clone
    }

    /// Compares a row of cell values with one component of the persisted
    /// value-set.
    ///
    /// Returns the canonical values to write when any slot or the switch
    /// differs. A value-set whose arrays are too short to hold the component
    /// is always dirty.
    #[must_use]
    pub fn is_dirty(
        &self,
        component_index: usize,
        parameter_type: &ParameterType,
        row: &CellRow,
    ) -> Option<ValueSetValues> {
        dirty_values(&self.original, component_index, parameter_type, row)
    }

    /// Writes `values` to the clone, cloning the original first if needed.
    ///
    /// Arrays too short to hold the component are resized to the number of
    /// components of the parameter type before writing.
    ///
    /// # Errors
    ///
    /// Fails if the component lies outside the parameter type.
    pub fn update_clone(&mut self, values: &ValueSetValues) -> Result<(), ReconcileError> {
        if values.component_index >= values.components {
            return Err(ReconcileError::ComponentOutOfRange {
                index: values.component_index,
                components: values.components,
            });
        }

        let clone = self.clone.get_or_insert_with(|| self.original.clone());
        let write = |array: &mut Vec<String>, value: &str| {
            if array.len() <= values.component_index {
                debug!(
                    "Resizing value array of {} slots to {}",
                    array.len(),
                    values.components
                );
                array.resize(values.components, EMPTY_VALUE.to_string());
            }
            array[values.component_index] = value.to_string();
        };

        match clone {
            ValueSet::Parameter(set) | ValueSet::ParameterOverride(set) => {
                write(&mut set.manual, &values.manual);
                if let Some(computed) = &values.computed {
                    write(&mut set.computed, computed);
                }
                if let Some(reference) = &values.reference {
                    write(&mut set.reference, reference);
                }
                if let Some(formula) = &values.formula {
                    write(&mut set.formula, formula);
                }
                set.value_switch = values.switch;
            }
            ValueSet::ParameterSubscription(set) => {
                write(&mut set.manual, &values.manual);
                set.value_switch = values.switch;
            }
        }

        Ok(())
    }

    /// Compares a row with the pending state and writes it if it differs.
    ///
    /// The pending state is the clone once one exists, the original before
    /// that, so applying the same row twice changes nothing the second time.
    /// Returns whether anything was written.
    ///
    /// # Errors
    ///
    /// Fails if the component lies outside the parameter type.
    pub fn reconcile(
        &mut self,
        component_index: usize,
        parameter_type: &ParameterType,
        row: &CellRow,
    ) -> Result<bool, ReconcileError> {
        let current = self.clone.as_ref().unwrap_or(&self.original);
        match dirty_values(current, component_index, parameter_type, row) {
            Some(values) => {
                self.update_clone(&values)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Whether the clone's manual value of a component differs from the
    /// original.
    ///
    /// # Errors
    ///
    /// Fails if nothing was written to the clone yet.
    pub fn is_manual_value_dirty(&self, component_index: usize) -> Result<bool, ReconcileError> {
        let clone = self.clone.as_ref().ok_or(ReconcileError::NoClone)?;
        Ok(slot_differs(
            self.original.manual(),
            clone.manual(),
            component_index,
        ))
    }

    /// Whether the clone's computed value of a component differs from the
    /// original. Always `false` for subscriptions.
    ///
    /// # Errors
    ///
    /// Fails if nothing was written to the clone yet.
    pub fn is_computed_value_dirty(&self, component_index: usize) -> Result<bool, ReconcileError> {
        self.parameter_slot_differs(component_index, |set| &set.computed)
    }

    /// Whether the clone's reference value of a component differs from the
    /// original. Always `false` for subscriptions.
    ///
    /// # Errors
    ///
    /// Fails if nothing was written to the clone yet.
    pub fn is_reference_value_dirty(&self, component_index: usize) -> Result<bool, ReconcileError> {
        self.parameter_slot_differs(component_index, |set| &set.reference)
    }

    /// Whether the clone's formula of a component differs from the original.
    /// Always `false` for subscriptions.
    ///
    /// # Errors
    ///
    /// Fails if nothing was written to the clone yet.
    pub fn is_formula_value_dirty(&self, component_index: usize) -> Result<bool, ReconcileError> {
        self.parameter_slot_differs(component_index, |set| &set.formula)
    }

    /// Whether the clone's switch differs from the original.
    ///
    /// # Errors
    ///
    /// Fails if nothing was written to the clone yet.
    pub fn is_value_switch_dirty(&self) -> Result<bool, ReconcileError> {
        let clone = self.clone.as_ref().ok_or(ReconcileError::NoClone)?;
        Ok(self.original.value_switch() != clone.value_switch())
    }

    fn parameter_slot_differs(
        &self,
        component_index: usize,
        array: impl Fn(&ParameterValueSet) -> &Vec<String>,
    ) -> Result<bool, ReconcileError> {
        let clone = self.clone.as_ref().ok_or(ReconcileError::NoClone)?;
        match (self.original.parameter_values(), clone.parameter_values()) {
            (Some(original), Some(clone)) => Ok(slot_differs(
                array(original),
                array(clone),
                component_index,
            )),
            _ => Ok(false),
        }
    }
}

fn dirty_values(
    current: &ValueSet,
    component_index: usize,
    parameter_type: &ParameterType,
    row: &CellRow,
) -> Option<ValueSetValues> {
    let manual = row.manual.to_value_set_string(parameter_type);
    let mut values = ValueSetValues {
        component_index,
        components: parameter_type.number_of_values(),
        switch: row.switch,
        manual,
        computed: None,
        reference: None,
        formula: None,
    };

    let mut dirty = current.value_switch() != row.switch
        || slot_differs_from(current.manual(), component_index, &values.manual);

    if let Some(set) = current.parameter_values() {
        let computed = row.computed.to_value_set_string(parameter_type);
        let reference = row.reference.to_value_set_string(parameter_type);
        dirty = dirty
            || slot_differs_from(&set.computed, component_index, &computed)
            || slot_differs_from(&set.reference, component_index, &reference)
            || slot_differs_from(&set.formula, component_index, &row.formula);
        values.computed = Some(computed);
        values.reference = Some(reference);
        values.formula = Some(row.formula.clone());
    }

    dirty.then_some(values)
}

fn slot_differs_from(array: &[String], index: usize, value: &str) -> bool {
    array.get(index).is_none_or(|slot| slot != value)
}

fn slot_differs(original: &[String], clone: &[String], index: usize) -> bool {
    match (original.get(index), clone.get(index)) {
        (Some(original), Some(clone)) => original != clone,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use test_case::test_case;

    use super::*;
    use crate::domain::{Component, SubscriptionValueSet};

    fn number_type() -> ParameterType {
        ParameterType::new("m", "mass", ParameterTypeKind::Quantity {
            default_scale: None,
        })
    }

    fn parameter_value_set(manual: &str) -> ParameterValueSet {
        let mut set = ParameterValueSet::new(1);
        set.manual = vec![manual.to_string()];
        set
    }

    fn manual_row(value: f64) -> CellRow {
        CellRow {
            manual: CellValue::Number(value),
            formula: empty_formula(),
            ..CellRow::default()
        }
    }

    #[test]
    fn equal_value_is_not_dirty() {
        let processed = ProcessedValueSet::new(ValueSet::Parameter(parameter_value_set("1.0")));

        assert_eq!(processed.is_dirty(0, &number_type(), &manual_row(1.0)), None);
    }

    #[test]
    fn changed_value_is_written_to_a_clone() {
        let original = parameter_value_set("1.0");
        let mut processed = ProcessedValueSet::new(ValueSet::Parameter(original.clone()));

        let values = processed
            .is_dirty(0, &number_type(), &manual_row(2.0))
            .unwrap();
        assert_eq!(values.manual, "2.0");
        processed.update_clone(&values).unwrap();

        let Some(ValueSet::Parameter(clone)) = processed.cloned() else {
            panic!("expected a parameter value-set clone");
        };
        assert_eq!(clone.manual, ["2.0"]);
        assert_eq!(clone.computed, original.computed);
        assert_eq!(clone.reference, original.reference);
        assert_eq!(clone.formula, original.formula);
        assert_eq!(processed.original(), &ValueSet::Parameter(original));

        assert!(processed.is_manual_value_dirty(0).unwrap());
        assert!(!processed.is_computed_value_dirty(0).unwrap());
        assert!(!processed.is_value_switch_dirty().unwrap());
    }

    #[test]
    fn reconciling_twice_changes_nothing_the_second_time() {
        let mut processed = ProcessedValueSet::new(ValueSet::Parameter(parameter_value_set("1.0")));
        let row = manual_row(3.5);

        assert!(processed.reconcile(0, &number_type(), &row).unwrap());
        assert!(!processed.reconcile(0, &number_type(), &row).unwrap());
    }

    #[test]
    fn undersized_arrays_are_dirty_and_resized() {
        let compound = ParameterType::new("pos", "position", ParameterTypeKind::Compound {
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
        });
        let mut processed = ProcessedValueSet::new(ValueSet::Parameter(ParameterValueSet::new(1)));
        let row = CellRow {
            formula: empty_formula(),
            ..CellRow::default()
        };

        let values = processed.is_dirty(1, &compound, &row).unwrap();
        processed.update_clone(&values).unwrap();

        let Some(ValueSet::Parameter(clone)) = processed.cloned() else {
            panic!("expected a parameter value-set clone");
        };
        assert_eq!(clone.manual.len(), 2);
        assert_eq!(clone.formula.len(), 2);
        assert!(processed.is_manual_value_dirty(1).unwrap());
    }

    #[test]
    fn component_outside_the_type_is_an_error() {
        let mut processed = ProcessedValueSet::new(ValueSet::Parameter(ParameterValueSet::new(1)));

        let values = processed.is_dirty(3, &number_type(), &manual_row(1.0)).unwrap();
        assert_eq!(
            processed.update_clone(&values),
            Err(ReconcileError::ComponentOutOfRange {
                index: 3,
                components: 1
            })
        );
        assert!(processed.cloned().is_none());
    }

    #[test]
    fn subscriptions_compare_manual_value_and_switch_only() {
        let mut subscription = SubscriptionValueSet::new(1);
        subscription.manual = vec!["1.0".to_string()];
        let mut processed = ProcessedValueSet::new(ValueSet::ParameterSubscription(subscription));

        let row = CellRow {
            manual: CellValue::Number(1.0),
            computed: CellValue::Number(9.0),
            formula: "=A1".to_string(),
            ..CellRow::default()
        };
        assert_eq!(processed.is_dirty(0, &number_type(), &row), None);

        let row = CellRow {
            switch: SwitchKind::Reference,
            ..row
        };
        assert!(processed.reconcile(0, &number_type(), &row).unwrap());
        assert!(processed.is_value_switch_dirty().unwrap());
        assert!(!processed.is_manual_value_dirty(0).unwrap());
        assert!(!processed.is_formula_value_dirty(0).unwrap());
    }

    #[test]
    fn dirty_queries_need_a_clone() {
        let processed = ProcessedValueSet::new(ValueSet::ParameterOverride(ParameterValueSet::new(1)));

        assert_eq!(processed.is_manual_value_dirty(0), Err(ReconcileError::NoClone));
        assert_eq!(processed.is_reference_value_dirty(0), Err(ReconcileError::NoClone));
        assert_eq!(processed.is_value_switch_dirty(), Err(ReconcileError::NoClone));
    }

    fn date_time() -> CellValue {
        CellValue::DateTime(
            NaiveDate::from_ymd_opt(2024, 3, 1)
                .unwrap()
                .and_hms_opt(13, 45, 0)
                .unwrap(),
        )
    }

    #[test_case(CellValue::Empty, ParameterTypeKind::Text => "-"; "empty")]
    #[test_case(CellValue::Bool(true), ParameterTypeKind::Boolean => "true"; "boolean")]
    #[test_case(CellValue::Number(1.0), ParameterTypeKind::Text => "1.0"; "whole number")]
    #[test_case(CellValue::Number(2.5), ParameterTypeKind::Text => "2.5"; "fraction")]
    #[test_case(CellValue::Text("abc".to_string()), ParameterTypeKind::Text => "abc"; "text")]
    #[test_case(date_time(), ParameterTypeKind::Date => "2024-03-01"; "date")]
    #[test_case(date_time(), ParameterTypeKind::DateTime => "2024-03-01T13:45:00"; "date time")]
    #[test_case(date_time(), ParameterTypeKind::TimeOfDay => "13:45:00"; "time of day")]
    fn canonical_cell_encoding(cell: CellValue, kind: ParameterTypeKind) -> String {
        cell.to_value_set_string(&ParameterType::new("p", "p", kind))
    }

    #[test]
    fn rows_deserialize_from_plain_json() {
        let row: CellRow = serde_json::from_str(
            r#"{ "switch": "COMPUTED", "manual": 1.5, "computed": "2024-03-01T13:45:00", "reference": null }"#,
        )
        .unwrap();

        assert_eq!(row.switch, SwitchKind::Computed);
        assert_eq!(row.manual, CellValue::Number(1.5));
        assert_eq!(row.computed, date_time());
        assert_eq!(row.reference, CellValue::Empty);
        assert_eq!(row.formula, "-");
    }
}
