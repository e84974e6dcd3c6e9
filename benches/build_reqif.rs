//! This bench builds an interchange document from a generated model with
//! many grouped, categorised and related requirements.

#![allow(missing_docs)]

use criterion::{Criterion, criterion_group, criterion_main};
use reqif_bridge::{
    ReqIfBuilder, RequirementsModel, Session,
    domain::{
        BinaryRelationship, Category, ModelSetup, ParameterType, ParameterTypeKind,
        ParameterValue, ParameterizedCategoryRule, ReferenceData, Requirement, RequirementsGroup,
        RequirementsSpecification, ThingRef,
    },
    export::AbortOnViolation,
};
use uuid::Uuid;

/// Generates a model of 10 specifications, each with 10 groups of 20
/// requirements chained by relationships.
fn generate_model() -> (Session, RequirementsModel) {
    let store = Uuid::new_v4();
    let mass = ParameterType::new("m", "mass", ParameterTypeKind::Quantity {
        default_scale: None,
    });
    let category = Category::new("PHYS", "physical");
    let rule = ParameterizedCategoryRule::new("PR", "physical rule", category.iid, vec![mass.iid]);
    let reference_data = ReferenceData {
        categories: vec![category.clone()],
        rules: vec![rule],
        parameter_types: vec![mass.clone()],
        scales: Vec::new(),
    };

    let mut model = RequirementsModel::new(store, ModelSetup::default(), reference_data);
    for s in 0..10 {
        let mut spec = RequirementsSpecification::new(format!("S{s}"), format!("spec {s}"));
        let mut previous: Option<Uuid> = None;
        for g in 0..10 {
            let group = RequirementsGroup::new(format!("G{s}.{g}"), format!("group {g}"));
            for r in 0..20 {
                let mut requirement =
                    Requirement::new(format!("R{s}.{g}.{r}"), format!("requirement {r}"));
                requirement.group = Some(group.iid);
                requirement.categories.push(category.iid);
                requirement
                    .parameter_values
                    .push(ParameterValue::new(mass.iid, format!("{r}")));
                if let Some(previous) = previous {
                    model.relationships.push(BinaryRelationship::new(
                        ThingRef::Requirement(previous),
                        ThingRef::Requirement(requirement.iid),
                    ));
                }
                previous = Some(requirement.iid);
                spec.requirements.push(requirement);
            }
            spec.groups.push(group);
        }
        model.specifications.push(spec);
    }

    (Session::new("bench", store), model)
}

fn build_reqif(c: &mut Criterion) {
    let (session, model) = generate_model();
    let builder = ReqIfBuilder::default();

    c.bench_function("build reqif", |b| {
        b.iter(|| {
            builder
                .build(&session, &model, &mut AbortOnViolation)
                .unwrap()
        });
    });
}

criterion_group!(benches, build_reqif);
criterion_main!(benches);
