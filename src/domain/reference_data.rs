//! Reference data shared by every object of a requirements model.
//!
//! Categories, parameterized-category rules, parameter types and scales are
//! defined once here and referenced by identifier from the model.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{MeasurementScale, ParameterType};

/// A category that requirements-model objects can be members of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Unique identifier of the category.
    pub iid: Uuid,
    /// Short-name of the category.
    pub short_name: String,
    /// Human-readable name of the category.
    pub name: String,
    /// Direct super-categories.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub super_categories: Vec<Uuid>,
}

impl Category {
    /// Creates a new category with a fresh identifier and no super-categories.
    #[must_use]
    pub fn new(short_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            iid: Uuid::new_v4(),
            short_name: short_name.into(),
            name: name.into(),
            super_categories: Vec::new(),
        }
    }
}

/// A rule stating which parameter types members of a category may carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterizedCategoryRule {
    /// Unique identifier of the rule.
    pub iid: Uuid,
    /// Short-name of the rule.
    pub short_name: String,
    /// Human-readable name of the rule.
    pub name: String,
    /// The category the rule applies to.
    pub category: Uuid,
    /// Parameter types permitted for members of the category.
    #[serde(default)]
    pub parameter_types: Vec<Uuid>,
}

impl ParameterizedCategoryRule {
    /// Creates a new rule with a fresh identifier.
    #[must_use]
    pub fn new(
        short_name: impl Into<String>,
        name: impl Into<String>,
        category: Uuid,
        parameter_types: Vec<Uuid>,
    ) -> Self {
        Self {
            iid: Uuid::new_v4(),
            short_name: short_name.into(),
            name: name.into(),
            category,
            parameter_types,
        }
    }
}

/// The reference data libraries a model draws on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceData {
    /// Known categories.
    #[serde(default)]
    pub categories: Vec<Category>,
    /// Known parameterized-category rules.
    #[serde(default)]
    pub rules: Vec<ParameterizedCategoryRule>,
    /// Known parameter types.
    #[serde(default)]
    pub parameter_types: Vec<ParameterType>,
    /// Known measurement scales.
    #[serde(default)]
    pub scales: Vec<MeasurementScale>,
}

impl ReferenceData {
    /// Looks up a category by identifier.
    #[must_use]
    pub fn category(&self, iid: Uuid) -> Option<&Category> {
        self.categories.iter().find(|c| c.iid == iid)
    }

    /// Looks up a rule by identifier.
    #[must_use]
    pub fn rule(&self, iid: Uuid) -> Option<&ParameterizedCategoryRule> {
        self.rules.iter().find(|r| r.iid == iid)
    }

    /// Looks up a parameter type by identifier.
    #[must_use]
    pub fn parameter_type(&self, iid: Uuid) -> Option<&ParameterType> {
        self.parameter_types.iter().find(|p| p.iid == iid)
    }

    /// Looks up a scale by identifier.
    #[must_use]
    pub fn scale(&self, iid: Uuid) -> Option<&MeasurementScale> {
        self.scales.iter().find(|s| s.iid == iid)
    }

    /// The category together with all of its transitive super-categories.
    ///
    /// Unknown identifiers are included as-is; cycles in the super-category
    /// graph are tolerated.
    #[must_use]
    pub fn category_closure(&self, iid: Uuid) -> BTreeSet<Uuid> {
        let mut closure = BTreeSet::new();
        let mut pending = vec![iid];

        while let Some(next) = pending.pop() {
            if !closure.insert(next) {
                continue;
            }
            if let Some(category) = self.category(next) {
                pending.extend(category.super_categories.iter().copied());
            }
        }

        closure
    }

    /// Whether an object carrying `categories` is a member of `category`.
    ///
    /// Membership holds when the object carries the category directly or
    /// carries one of its sub-categories.
    #[must_use]
    pub fn is_member_of_category(&self, categories: &[Uuid], category: Uuid) -> bool {
        categories
            .iter()
            .any(|&c| self.category_closure(c).contains(&category))
    }

    /// The rules whose category an object carrying `categories` is a member of.
    ///
    /// Rules are returned in their declaration order.
    #[must_use]
    pub fn applied_rules(&self, categories: &[Uuid]) -> Vec<&ParameterizedCategoryRule> {
        self.rules
            .iter()
            .filter(|rule| self.is_member_of_category(categories, rule.category))
            .collect()
    }

    /// Distinct parameter types referenced by `rules`, in first-seen order.
    #[must_use]
    pub fn rule_parameter_types(&self, rules: &[&ParameterizedCategoryRule]) -> Vec<Uuid> {
        let mut seen = HashSet::new();
        rules
            .iter()
            .flat_map(|rule| rule.parameter_types.iter().copied())
            .filter(|iid| seen.insert(*iid))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_data() -> (ReferenceData, Category, Category) {
        let parent = Category::new("FUNC", "functional");
        let mut child = Category::new("PERF", "performance");
        child.super_categories.push(parent.iid);

        let data = ReferenceData {
            categories: vec![parent.clone(), child.clone()],
            ..ReferenceData::default()
        };
        (data, parent, child)
    }

    #[test]
    fn membership_follows_super_categories() {
        let (data, parent, child) = reference_data();

        assert!(data.is_member_of_category(&[child.iid], parent.iid));
        assert!(data.is_member_of_category(&[child.iid], child.iid));
        assert!(!data.is_member_of_category(&[parent.iid], child.iid));
        assert!(!data.is_member_of_category(&[], parent.iid));
    }

    #[test]
    fn closure_tolerates_cycles() {
        let mut a = Category::new("A", "a");
        let mut b = Category::new("B", "b");
        a.super_categories.push(b.iid);
        b.super_categories.push(a.iid);
        let data = ReferenceData {
            categories: vec![a.clone(), b.clone()],
            ..ReferenceData::default()
        };

        let closure = data.category_closure(a.iid);
        assert_eq!(closure.len(), 2);
        assert!(closure.contains(&b.iid));
    }

    #[test]
    fn applied_rules_keep_declaration_order() {
        let (mut data, parent, child) = reference_data();
        let first = ParameterizedCategoryRule::new("R1", "rule one", parent.iid, vec![]);
        let second = ParameterizedCategoryRule::new("R2", "rule two", child.iid, vec![]);
        data.rules = vec![first.clone(), second.clone()];

        let applied = data.applied_rules(&[child.iid]);
        let names: Vec<_> = applied.iter().map(|r| r.short_name.as_str()).collect();
        assert_eq!(names, ["R1", "R2"]);

        assert_eq!(data.applied_rules(&[parent.iid]).len(), 1);
    }
}
