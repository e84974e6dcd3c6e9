use chrono::Utc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::{
    BOOLEAN_DATATYPE_ID, BuildError, CATEGORIES_ATTRIBUTE, ExportContext, GROUP_NAME_PREFIX,
    IS_DEPRECATED_ATTRIBUTE, NAME_ATTRIBUTE, NodeKind, REQUIREMENT_TEXT_ATTRIBUTE,
    SHORT_NAME_ATTRIBUTE, TEXT_DATATYPE_ID, ValidationFailureHandler,
};
use crate::{
    Config, datatype,
    domain::{
        ParameterValue, Requirement, RequirementsGroup, RequirementsModel,
        RequirementsSpecification, Session, value_set::EMPTY_VALUE,
    },
    reqif::{
        AttributeValue, Identifiable, RelationGroup, ReqIf, ReqIfHeader, SpecHierarchy,
        SpecObject, SpecRelation, Specification,
    },
};

/// A successfully built document.
#[derive(Debug)]
pub struct BuildOutput {
    /// The document.
    pub document: ReqIf,
    /// Validation failures the handler chose to ignore, in the order found.
    pub ignored_violations: Vec<String>,
}

/// Builds interchange documents from requirements models.
#[derive(Debug, Clone)]
pub struct ReqIfBuilder {
    lang: String,
    tool_id: String,
}

impl Default for ReqIfBuilder {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

impl ReqIfBuilder {
    /// Creates a builder writing the configured language and tool id.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            lang: config.lang().to_string(),
            tool_id: config.tool_id().to_string(),
        }
    }

    /// Builds the document for `model`.
    ///
    /// Datatypes are collected first, then specifications, requirements,
    /// groups, requirement relationships and specification relationships are
    /// exported in that order, and finally each specification's hierarchy is
    /// assembled. Deprecated specifications and requirements are left out,
    /// as is every relationship with an end that was left out.
    ///
    /// Model validation failures are passed to `handler`, which decides
    /// whether the build goes on.
    ///
    /// # Errors
    ///
    /// Fails if the model was not loaded through `session`, if the handler
    /// aborts on a validation failure, or if a parameter value cannot be
    /// converted.
    #[instrument(level = "debug", skip_all, fields(model = %model.iid))]
    pub fn build(
        &self,
        session: &Session,
        model: &RequirementsModel,
        handler: &mut impl ValidationFailureHandler,
    ) -> Result<BuildOutput, BuildError> {
        if !model.is_attached_to(session) {
            return Err(BuildError::DetachedModel {
                model: model.iid,
                store: session.store,
            });
        }

        let mut context = ExportContext::new(model);

        collect_datatypes(&mut context, handler)?;
        export_specifications(&mut context, handler)?;
        export_requirements(&mut context, handler)?;
        export_groups(&mut context, handler)?;
        export_requirement_relationships(&mut context, handler)?;
        export_specification_relationships(&mut context, handler)?;
        build_hierarchies(&mut context);

        let (content, ignored_violations) = context.finish();

        info!(
            "Built document with {} specifications, {} spec-objects and {} spec-relations",
            content.specifications.len(),
            content.spec_objects.len(),
            content.spec_relations.len()
        );
        for violation in &ignored_violations {
            warn!("Ignored model validation failure: {violation}");
        }

        let document = ReqIf {
            lang: self.lang.clone(),
            header: Some(self.header(session, model)),
            core_content: Some(content),
        };

        Ok(BuildOutput {
            document,
            ignored_violations,
        })
    }

    fn header(&self, session: &Session, model: &RequirementsModel) -> ReqIfHeader {
        ReqIfHeader {
            identifier: model.iid.to_string(),
            creation_time: Utc::now(),
            title: format!("{} ({})", model.setup.name, model.setup.short_name),
            comment: model
                .setup
                .definitions
                .first()
                .map(|d| d.content.clone())
                .unwrap_or_default(),
            req_if_tool_id: self.tool_id.clone(),
            repository_id: session.data_source_uri.clone(),
            source_tool_id: self.tool_id.clone(),
        }
    }
}

/// The parts of a model thing every exported element carries.
struct Thing<'a> {
    class: &'static str,
    short_name: String,
    name: String,
    categories: &'a [Uuid],
    parameter_values: &'a [ParameterValue],
}

impl<'a> Thing<'a> {
    fn specification(spec: &'a RequirementsSpecification) -> Self {
        Self {
            class: NodeKind::Specification.class_name(),
            short_name: spec.short_name.clone(),
            name: spec.name.clone(),
            categories: &spec.categories,
            parameter_values: &spec.parameter_values,
        }
    }

    fn requirement(requirement: &'a Requirement) -> Self {
        Self {
            class: NodeKind::Requirement.class_name(),
            short_name: requirement.short_name.clone(),
            name: requirement.name.clone(),
            categories: &requirement.categories,
            parameter_values: &requirement.parameter_values,
        }
    }

    fn group(group: &'a RequirementsGroup) -> Self {
        Self {
            class: NodeKind::Group.class_name(),
            short_name: group.short_name.clone(),
            name: group.name.clone(),
            categories: &group.categories,
            parameter_values: &group.parameter_values,
        }
    }

    fn relationship(
        categories: &'a [Uuid],
        parameter_values: &'a [ParameterValue],
        source: &str,
        target: &str,
    ) -> Self {
        Self {
            class: NodeKind::RequirementRelationship.class_name(),
            short_name: String::new(),
            name: format!("{source} -> {target}"),
            categories,
            parameter_values,
        }
    }
}

fn exported_specifications(
    model: &RequirementsModel,
) -> impl Iterator<Item = &RequirementsSpecification> {
    model.specifications.iter().filter(|s| !s.is_deprecated)
}

fn exported_requirements(
    model: &RequirementsModel,
) -> impl Iterator<Item = (&RequirementsSpecification, &Requirement)> {
    exported_specifications(model).flat_map(|spec| {
        spec.requirements
            .iter()
            .filter(|r| !r.is_deprecated)
            .map(move |r| (spec, r))
    })
}

fn exported_groups(model: &RequirementsModel) -> impl Iterator<Item = &RequirementsGroup> {
    exported_specifications(model).flat_map(RequirementsSpecification::all_groups)
}

/// A requirement that is exported, with its specification.
fn exported_requirement(
    model: &RequirementsModel,
    iid: Uuid,
) -> Option<(&RequirementsSpecification, &Requirement)> {
    model
        .requirement(iid)
        .filter(|(spec, requirement)| !spec.is_deprecated && !requirement.is_deprecated)
}

fn collect_datatypes(
    context: &mut ExportContext<'_>,
    handler: &mut impl ValidationFailureHandler,
) -> Result<(), BuildError> {
    let model = context.model();
    let reference_data = &model.reference_data;

    for rule in &reference_data.rules {
        if reference_data.category(rule.category).is_none() {
            context.report(
                handler,
                format!(
                    "Category {} of parameterized category rule '{}' is not defined",
                    rule.category, rule.short_name
                ),
            )?;
        }
    }

    let requirement_relationships = model.requirement_relationships().filter(|r| {
        r.requirement_ends().is_some_and(|(source, target)| {
            exported_requirement(model, source).is_some()
                && exported_requirement(model, target).is_some()
        })
    });
    let specification_relationships = model.specification_relationships().filter(|r| {
        r.specification_ends().is_some_and(|(source, target)| {
            model.specification(source).is_some_and(|s| !s.is_deprecated)
                && model.specification(target).is_some_and(|s| !s.is_deprecated)
        })
    });

    let mut things: Vec<(&[Uuid], &[ParameterValue])> = Vec::new();
    things.extend(
        requirement_relationships
            .chain(specification_relationships)
            .map(|r| (r.categories.as_slice(), r.parameter_values.as_slice())),
    );
    things.extend(
        exported_specifications(model)
            .map(|s| (s.categories.as_slice(), s.parameter_values.as_slice())),
    );
    things.extend(
        exported_groups(model).map(|g| (g.categories.as_slice(), g.parameter_values.as_slice())),
    );
    things.extend(
        exported_requirements(model)
            .map(|(_, r)| (r.categories.as_slice(), r.parameter_values.as_slice())),
    );

    let mut parameter_types: Vec<Uuid> = Vec::new();
    for (categories, parameter_values) in things {
        let rules = reference_data.applied_rules(categories);
        let referenced = parameter_values
            .iter()
            .map(|pv| pv.parameter_type)
            .chain(reference_data.rule_parameter_types(&rules));
        for iid in referenced {
            if !parameter_types.contains(&iid) {
                parameter_types.push(iid);
            }
        }
    }

    for iid in parameter_types {
        match reference_data.parameter_type(iid) {
            Some(parameter_type) => context.add_datatype(parameter_type),
            None => context.report(
                handler,
                format!("Parameter type {iid} is not defined in the reference data"),
            )?,
        }
    }

    Ok(())
}

/// The attribute values of an element typed by `spec_type`.
///
/// Parameter values whose type has no attribute definition in the spec-type
/// are skipped and described in `failures`.
fn element_values(
    context: &ExportContext<'_>,
    spec_type: &str,
    thing: &Thing<'_>,
    failures: &mut Vec<String>,
) -> Result<Vec<AttributeValue>, BuildError> {
    let reference_data = &context.model().reference_data;
    let attributes = context
        .spec_type(spec_type)
        .map_or(&[][..], |t| t.attributes.as_slice());

    let categories: Vec<_> = thing
        .categories
        .iter()
        .filter_map(|&c| reference_data.category(c))
        .map(|c| c.short_name.as_str())
        .collect();
    let categories = if categories.is_empty() {
        EMPTY_VALUE.to_string()
    } else {
        categories.join(", ")
    };

    let mut values: Vec<_> = [
        (SHORT_NAME_ATTRIBUTE, thing.short_name.clone()),
        (NAME_ATTRIBUTE, thing.name.clone()),
        (CATEGORIES_ATTRIBUTE, categories),
    ]
    .into_iter()
    .filter_map(|(long_name, value)| text_value(context, spec_type, long_name, value))
    .collect();

    for parameter_value in thing.parameter_values {
        let iid = parameter_value.parameter_type;
        // Unknown parameter types were reported while collecting datatypes.
        let (Some(parameter_type), Some(datatype)) =
            (reference_data.parameter_type(iid), context.datatype(iid))
        else {
            continue;
        };

        let identifier = iid.to_string();
        let Some(definition) = attributes.iter().find(|a| a.datatype == identifier) else {
            failures.push(format!(
                "Parameter type '{}' should be part of a parameterized category rule whose \
                 category should be applied to {} '{}'",
                parameter_type.name, thing.class, thing.name
            ));
            continue;
        };

        let scale = parameter_value.scale.and_then(|s| reference_data.scale(s));
        let value = datatype::to_attribute_value(
            parameter_type,
            definition,
            datatype,
            &parameter_value.value,
            scale,
        )
        .map_err(|source| BuildError::Value {
            thing: thing.name.clone(),
            source,
        })?;
        values.push(value);
    }

    Ok(values)
}

fn builtin_definition(
    context: &ExportContext<'_>,
    spec_type: &str,
    long_name: &str,
    datatype: &str,
) -> Option<String> {
    context
        .spec_type(spec_type)?
        .attribute(long_name, datatype)
        .map(|a| a.identity.identifier.clone())
}

fn text_value(
    context: &ExportContext<'_>,
    spec_type: &str,
    long_name: &str,
    value: String,
) -> Option<AttributeValue> {
    builtin_definition(context, spec_type, long_name, TEXT_DATATYPE_ID)
        .map(|definition| AttributeValue::String { definition, value })
}

fn is_deprecated_value(
    context: &ExportContext<'_>,
    spec_type: &str,
    value: bool,
) -> Option<AttributeValue> {
    builtin_definition(context, spec_type, IS_DEPRECATED_ATTRIBUTE, BOOLEAN_DATATYPE_ID)
        .map(|definition| AttributeValue::Boolean { definition, value })
}

fn report_all(
    context: &mut ExportContext<'_>,
    handler: &mut impl ValidationFailureHandler,
    failures: Vec<String>,
) -> Result<(), BuildError> {
    for failure in failures {
        context.report(handler, failure)?;
    }
    Ok(())
}

fn export_specifications(
    context: &mut ExportContext<'_>,
    handler: &mut impl ValidationFailureHandler,
) -> Result<(), BuildError> {
    let model = context.model();

    for spec in exported_specifications(model) {
        let rules = model.reference_data.applied_rules(&spec.categories);
        let (spec_type, _) = context.find_or_create_spec_type(NodeKind::Specification, &rules);

        let mut failures = Vec::new();
        let mut values = element_values(context, &spec_type, &Thing::specification(spec), &mut failures)?;
        values.extend(is_deprecated_value(context, &spec_type, spec.is_deprecated));
        report_all(context, handler, failures)?;

        context.insert_specification(
            spec.iid,
            Specification {
                identity: Identifiable::new(
                    spec.iid.to_string(),
                    spec.short_name.clone(),
                    spec.name.clone(),
                ),
                spec_type,
                values,
                children: Vec::new(),
            },
        );
    }

    Ok(())
}

fn export_requirements(
    context: &mut ExportContext<'_>,
    handler: &mut impl ValidationFailureHandler,
) -> Result<(), BuildError> {
    let model = context.model();

    for (spec, requirement) in exported_requirements(model) {
        let mut failures = Vec::new();
        if let Some(group) = requirement.group.filter(|&g| !spec.contains_group(g)) {
            failures.push(format!(
                "Requirement '{}' belongs to group {group} outside its specification '{}'",
                requirement.name, spec.name
            ));
        }

        let rules = model.reference_data.applied_rules(&requirement.categories);
        let (spec_type, _) = context.find_or_create_spec_type(NodeKind::Requirement, &rules);

        let mut values = element_values(
            context,
            &spec_type,
            &Thing::requirement(requirement),
            &mut failures,
        )?;
        if let Some(text) = requirement.text() {
            values.extend(text_value(
                context,
                &spec_type,
                REQUIREMENT_TEXT_ATTRIBUTE,
                text.to_string(),
            ));
        }
        values.extend(is_deprecated_value(
            context,
            &spec_type,
            requirement.is_deprecated,
        ));
        report_all(context, handler, failures)?;

        context.insert_requirement(
            requirement.iid,
            SpecObject {
                identity: Identifiable::new(
                    requirement.iid.to_string(),
                    requirement.short_name.clone(),
                    requirement.name.clone(),
                ),
                spec_type,
                values,
            },
        );
    }

    Ok(())
}

fn export_groups(
    context: &mut ExportContext<'_>,
    handler: &mut impl ValidationFailureHandler,
) -> Result<(), BuildError> {
    let model = context.model();

    for group in exported_groups(model) {
        let rules = model.reference_data.applied_rules(&group.categories);
        let (spec_type, _) = context.find_or_create_spec_type(NodeKind::Group, &rules);

        let mut failures = Vec::new();
        let values = element_values(context, &spec_type, &Thing::group(group), &mut failures)?;
        report_all(context, handler, failures)?;

        context.insert_group(
            group.iid,
            SpecObject {
                identity: Identifiable::new(
                    group.iid.to_string(),
                    format!("{GROUP_NAME_PREFIX}{}", group.short_name),
                    group.name.clone(),
                ),
                spec_type,
                values,
            },
        );
    }

    Ok(())
}

fn export_requirement_relationships(
    context: &mut ExportContext<'_>,
    handler: &mut impl ValidationFailureHandler,
) -> Result<(), BuildError> {
    let model = context.model();

    for relationship in model.requirement_relationships() {
        let Some((source, target)) = relationship.requirement_ends() else {
            continue;
        };
        if !context.has_requirement(source) || !context.has_requirement(target) {
            debug!(
                "Skipping relationship {}: an end was not exported",
                relationship.iid
            );
            continue;
        }
        let (Some((_, source)), Some((_, target))) =
            (model.requirement(source), model.requirement(target))
        else {
            continue;
        };

        let rules = model.reference_data.applied_rules(&relationship.categories);
        let (spec_type, _) =
            context.find_or_create_spec_type(NodeKind::RequirementRelationship, &rules);

        let thing = Thing::relationship(
            &relationship.categories,
            &relationship.parameter_values,
            &source.short_name,
            &target.short_name,
        );
        let mut failures = Vec::new();
        let values = element_values(context, &spec_type, &thing, &mut failures)?;
        report_all(context, handler, failures)?;

        context.insert_relation(
            relationship.iid,
            SpecRelation {
                identity: Identifiable::new(relationship.iid.to_string(), thing.name, ""),
                spec_type,
                values,
                source: source.iid.to_string(),
                target: target.iid.to_string(),
            },
        );
    }

    Ok(())
}

fn export_specification_relationships(
    context: &mut ExportContext<'_>,
    handler: &mut impl ValidationFailureHandler,
) -> Result<(), BuildError> {
    let model = context.model();

    for relationship in model.specification_relationships() {
        let Some((source, target)) = relationship.specification_ends() else {
            continue;
        };
        if !context.has_specification(source) || !context.has_specification(target) {
            debug!(
                "Skipping relationship {}: an end was not exported",
                relationship.iid
            );
            continue;
        }
        let (Some(source), Some(target)) =
            (model.specification(source), model.specification(target))
        else {
            continue;
        };

        let rules = model.reference_data.applied_rules(&relationship.categories);
        let (spec_type, _) =
            context.find_or_create_spec_type(NodeKind::SpecificationRelationship, &rules);

        let thing = Thing::relationship(
            &relationship.categories,
            &relationship.parameter_values,
            &source.short_name,
            &target.short_name,
        );
        let mut failures = Vec::new();
        let values = element_values(context, &spec_type, &thing, &mut failures)?;
        report_all(context, handler, failures)?;

        let spec_relations = model
            .requirement_relationships()
            .filter(|r| context.has_relation(r.iid))
            .filter(|r| {
                r.requirement_ends().is_some_and(|(from, to)| {
                    model.requirement(from).is_some_and(|(s, _)| s.iid == source.iid)
                        && model.requirement(to).is_some_and(|(s, _)| s.iid == target.iid)
                })
            })
            .map(|r| r.iid.to_string())
            .collect();

        context.insert_relation_group(
            relationship.iid,
            RelationGroup {
                identity: Identifiable::new(relationship.iid.to_string(), thing.name, ""),
                spec_type,
                values,
                source_specification: source.iid.to_string(),
                target_specification: target.iid.to_string(),
                spec_relations,
            },
        );
    }

    Ok(())
}

fn build_hierarchies(context: &mut ExportContext<'_>) {
    let model = context.model();

    for spec in exported_specifications(model) {
        let mut children: Vec<_> = spec
            .groups
            .iter()
            .filter(|g| context.has_group(g.iid))
            .map(|group| group_hierarchy(spec, group))
            .collect();

        children.extend(
            spec.top_level_requirements()
                .map(|r| SpecHierarchy::new(r.iid.to_string())),
        );

        if let Some(specification) = context.specification_mut(spec.iid) {
            specification.children = children;
        }
    }
}

fn group_hierarchy(spec: &RequirementsSpecification, group: &RequirementsGroup) -> SpecHierarchy {
    let mut node = SpecHierarchy::new(group.iid.to_string());
    node.children
        .extend(group.groups.iter().map(|g| group_hierarchy(spec, g)));
    node.children.extend(
        spec.requirements_in_group(group.iid)
            .map(|r| SpecHierarchy::new(r.iid.to_string())),
    );
    node
}
