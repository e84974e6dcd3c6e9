use std::collections::BTreeMap;

use tracing::debug;
use uuid::Uuid;

use super::{
    BuildError, NodeKind, TypeRegistry, ValidationDecision, ValidationFailureHandler,
    boolean_datatype, text_datatype,
};
use crate::{
    datatype,
    domain::{ParameterType, ParameterizedCategoryRule, RequirementsModel},
    reqif::{
        AttributeDefinition, DatatypeDefinition, RelationGroup, ReqIfContent, SpecObject,
        SpecRelation, SpecType, Specification,
    },
};

/// Everything one build accumulates, threaded through its phases.
///
/// Each phase reads what earlier phases produced and adds its own output:
/// datatypes, spec-types, then specifications, spec-objects, spec-relations
/// and relation groups, each indexed by the identifier of the model thing it
/// was built from.
#[derive(Debug)]
pub struct ExportContext<'m> {
    model: &'m RequirementsModel,
    registry: TypeRegistry,
    datatypes: Vec<DatatypeDefinition>,
    datatype_index: BTreeMap<Uuid, usize>,
    specifications: Vec<Specification>,
    specification_index: BTreeMap<Uuid, usize>,
    spec_objects: Vec<SpecObject>,
    requirement_index: BTreeMap<Uuid, usize>,
    group_index: BTreeMap<Uuid, usize>,
    spec_relations: Vec<SpecRelation>,
    relation_index: BTreeMap<Uuid, usize>,
    relation_groups: Vec<RelationGroup>,
    relation_group_index: BTreeMap<Uuid, usize>,
    ignored_violations: Vec<String>,
}

impl<'m> ExportContext<'m> {
    /// Creates an empty context for exporting `model`.
    #[must_use]
    pub fn new(model: &'m RequirementsModel) -> Self {
        Self {
            model,
            registry: TypeRegistry::new(),
            datatypes: Vec::new(),
            datatype_index: BTreeMap::new(),
            specifications: Vec::new(),
            specification_index: BTreeMap::new(),
            spec_objects: Vec::new(),
            requirement_index: BTreeMap::new(),
            group_index: BTreeMap::new(),
            spec_relations: Vec::new(),
            relation_index: BTreeMap::new(),
            relation_groups: Vec::new(),
            relation_group_index: BTreeMap::new(),
            ignored_violations: Vec::new(),
        }
    }

    /// The model being exported.
    #[must_use]
    pub const fn model(&self) -> &'m RequirementsModel {
        self.model
    }

    /// Adds the datatype of a parameter type, unless already present.
    pub fn add_datatype(&mut self, parameter_type: &ParameterType) {
        if self.datatype_index.contains_key(&parameter_type.iid) {
            return;
        }
        self.datatype_index
            .insert(parameter_type.iid, self.datatypes.len());
        self.datatypes
            .push(datatype::to_datatype_definition(parameter_type));
    }

    /// The datatype values of a parameter type are exchanged as.
    #[must_use]
    pub fn datatype(&self, parameter_type: Uuid) -> Option<&DatatypeDefinition> {
        self.datatype_index
            .get(&parameter_type)
            .map(|&i| &self.datatypes[i])
    }

    /// Returns the identifier of the spec-type for `kind` and `rules`,
    /// creating the spec-type on first use, and whether it was created.
    ///
    /// A new spec-type declares one attribute per distinct parameter type of
    /// `rules` that has a datatype in this context.
    pub fn find_or_create_spec_type(
        &mut self,
        kind: NodeKind,
        rules: &[&ParameterizedCategoryRule],
    ) -> (String, bool) {
        let model = self.model;
        let reference_data = &model.reference_data;
        let datatypes = &self.datatypes;
        let index = &self.datatype_index;

        let (spec_type, created) = self.registry.find_or_create(kind, rules, || {
            reference_data
                .rule_parameter_types(rules)
                .into_iter()
                .filter_map(|iid| {
                    let parameter_type = reference_data.parameter_type(iid)?;
                    let datatype = &datatypes[*index.get(&iid)?];
                    Some(datatype::to_attribute_definition(parameter_type, datatype))
                })
                .collect::<Vec<AttributeDefinition>>()
        });
        (spec_type.identity.identifier.clone(), created)
    }

    /// Looks up a spec-type created during this build.
    #[must_use]
    pub fn spec_type(&self, identifier: &str) -> Option<&SpecType> {
        self.registry.get(identifier)
    }

    /// Records the specification built for a model specification.
    pub fn insert_specification(&mut self, iid: Uuid, specification: Specification) {
        self.specification_index
            .insert(iid, self.specifications.len());
        self.specifications.push(specification);
    }

    /// The specification built for a model specification.
    pub fn specification_mut(&mut self, iid: Uuid) -> Option<&mut Specification> {
        self.specification_index
            .get(&iid)
            .map(|&i| &mut self.specifications[i])
    }

    /// Whether a model specification was exported.
    #[must_use]
    pub fn has_specification(&self, iid: Uuid) -> bool {
        self.specification_index.contains_key(&iid)
    }

    /// Records the spec-object built for a requirement.
    pub fn insert_requirement(&mut self, iid: Uuid, object: SpecObject) {
        self.requirement_index.insert(iid, self.spec_objects.len());
        self.spec_objects.push(object);
    }

    /// Whether a requirement was exported.
    #[must_use]
    pub fn has_requirement(&self, iid: Uuid) -> bool {
        self.requirement_index.contains_key(&iid)
    }

    /// Records the spec-object built for a group.
    pub fn insert_group(&mut self, iid: Uuid, object: SpecObject) {
        self.group_index.insert(iid, self.spec_objects.len());
        self.spec_objects.push(object);
    }

    /// Whether a group was exported.
    #[must_use]
    pub fn has_group(&self, iid: Uuid) -> bool {
        self.group_index.contains_key(&iid)
    }

    /// Records the spec-relation built for a requirement relationship.
    pub fn insert_relation(&mut self, iid: Uuid, relation: SpecRelation) {
        self.relation_index.insert(iid, self.spec_relations.len());
        self.spec_relations.push(relation);
    }

    /// Whether a requirement relationship was exported.
    #[must_use]
    pub fn has_relation(&self, iid: Uuid) -> bool {
        self.relation_index.contains_key(&iid)
    }

    /// Records the relation group built for a specification relationship.
    pub fn insert_relation_group(&mut self, iid: Uuid, group: RelationGroup) {
        self.relation_group_index
            .insert(iid, self.relation_groups.len());
        self.relation_groups.push(group);
    }

    /// Passes a validation failure to `handler`.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::ModelValidation`] if the handler aborts.
    pub fn report(
        &mut self,
        handler: &mut impl ValidationFailureHandler,
        message: String,
    ) -> Result<(), BuildError> {
        match handler.on_failure(&message) {
            ValidationDecision::Ignore => {
                debug!("Ignoring validation failure: {message}");
                self.ignored_violations.push(message);
                Ok(())
            }
            ValidationDecision::Abort => Err(BuildError::ModelValidation(message)),
        }
    }

    /// Assembles the document content, returning it with the ignored
    /// validation failures.
    ///
    /// Datatypes of parameter types come first, followed by the built-in
    /// text and boolean datatypes.
    #[must_use]
    pub fn finish(self) -> (ReqIfContent, Vec<String>) {
        let mut datatypes = self.datatypes;
        datatypes.extend([text_datatype(), boolean_datatype()]);

        let content = ReqIfContent {
            datatypes,
            spec_types: self.registry.into_spec_types(),
            spec_objects: self.spec_objects,
            specifications: self.specifications,
            spec_relations: self.spec_relations,
            spec_relation_groups: self.relation_groups,
        };
        (content, self.ignored_violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{Category, ModelSetup, ParameterTypeKind, ReferenceData},
        export::{AbortOnViolation, BOOLEAN_DATATYPE_ID, IgnoreViolations, TEXT_DATATYPE_ID},
    };

    fn model_with_rule() -> (RequirementsModel, ParameterType, ParameterizedCategoryRule) {
        let category = Category::new("FUNC", "functional");
        let mass = ParameterType::new("m", "mass", ParameterTypeKind::Quantity {
            default_scale: None,
        });
        let orphan = ParameterType::new("x", "unexported", ParameterTypeKind::Text);
        let rule = ParameterizedCategoryRule::new(
            "FR",
            "functional rule",
            category.iid,
            vec![mass.iid, orphan.iid, mass.iid],
        );
        let reference_data = ReferenceData {
            categories: vec![category],
            rules: vec![rule.clone()],
            parameter_types: vec![mass.clone(), orphan],
            scales: Vec::new(),
        };
        let model = RequirementsModel::new(Uuid::new_v4(), ModelSetup::default(), reference_data);
        (model, mass, rule)
    }

    #[test]
    fn datatypes_are_added_once() {
        let (model, mass, _) = model_with_rule();
        let mut context = ExportContext::new(&model);

        context.add_datatype(&mass);
        context.add_datatype(&mass);

        let (content, _) = context.finish();
        let identifiers: Vec<_> = content.datatypes.iter().map(|d| d.identifier()).collect();
        assert_eq!(
            identifiers,
            [mass.iid.to_string().as_str(), TEXT_DATATYPE_ID, BOOLEAN_DATATYPE_ID]
        );
    }

    #[test]
    fn rule_attributes_only_cover_known_datatypes() {
        let (model, mass, rule) = model_with_rule();
        let mut context = ExportContext::new(&model);
        context.add_datatype(&mass);

        let (identifier, created) = context.find_or_create_spec_type(NodeKind::Requirement, &[&rule]);
        assert!(created);

        let spec_type = context.spec_type(&identifier).unwrap();
        let typed: Vec<_> = spec_type
            .attributes
            .iter()
            .filter(|a| a.datatype == mass.iid.to_string())
            .collect();
        assert_eq!(typed.len(), 1);
        assert_eq!(spec_type.attributes.len(), 6);
    }

    #[test]
    fn ignored_failures_are_collected() {
        let (model, _, _) = model_with_rule();
        let mut context = ExportContext::new(&model);

        context
            .report(&mut IgnoreViolations, "first".to_string())
            .unwrap();
        let error = context
            .report(&mut AbortOnViolation, "second".to_string())
            .unwrap_err();
        assert!(matches!(error, BuildError::ModelValidation(message) if message == "second"));

        let (_, ignored) = context.finish();
        assert_eq!(ignored, ["first"]);
    }
}
