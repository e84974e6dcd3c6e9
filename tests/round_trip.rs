//! Exporting a model and importing the resulting document with the inferred
//! mapping reproduces the model's structure.

use reqif_bridge::{
    Config, ImportMappingConfiguration, ImportedThings, ReqIf, ReqIfBuilder, RequirementsModel,
    Session, ThingFactory,
    domain::{
        BinaryRelationship, Category, Definition, EnumerationValueDefinition, ModelSetup,
        ParameterType, ParameterTypeKind, ParameterValue, ParameterizedCategoryRule,
        ReferenceData, Requirement, RequirementsGroup, RequirementsSpecification, ThingRef,
    },
    export::AbortOnViolation,
};
use uuid::Uuid;

struct Fixture {
    session: Session,
    model: RequirementsModel,
    colour: ParameterType,
    mass: ParameterType,
    category: Category,
}

fn fixture() -> Fixture {
    let red = EnumerationValueDefinition::new("red", "Red");
    let blue = EnumerationValueDefinition::new("blue", "Blue");
    let colour = ParameterType::new("colour", "colour", ParameterTypeKind::Enumeration {
        values: vec![red, blue],
        allow_multi_select: false,
    });
    let mass = ParameterType::new("mass", "mass", ParameterTypeKind::Quantity {
        default_scale: None,
    });
    let category = Category::new("PHYS", "physical");
    let rule = ParameterizedCategoryRule::new(
        "PR",
        "physical rule",
        category.iid,
        vec![colour.iid, mass.iid],
    );
    let reference_data = ReferenceData {
        categories: vec![category.clone()],
        rules: vec![rule],
        parameter_types: vec![colour.clone(), mass.clone()],
        scales: Vec::new(),
    };

    let store = Uuid::new_v4();
    let mut model = RequirementsModel::new(store, ModelSetup::default(), reference_data);

    let mut spec = RequirementsSpecification::new("SPEC", "system specification");
    let group = RequirementsGroup::new("G1", "power");

    let mut first = Requirement::new("R1", "first");
    first.definitions.push(Definition {
        content: "The system shall fly".to_string(),
        language_code: "en".to_string(),
    });
    first.categories.push(category.iid);
    first
        .parameter_values
        .push(ParameterValue::new(colour.iid, "blue"));
    first
        .parameter_values
        .push(ParameterValue::new(mass.iid, "12"));

    let second = Requirement::new("R2", "second");
    let mut grouped = Requirement::new("R3", "grouped");
    grouped.group = Some(group.iid);

    model.relationships.push(BinaryRelationship::new(
        ThingRef::Requirement(first.iid),
        ThingRef::Requirement(second.iid),
    ));
    spec.groups.push(group);
    spec.requirements.extend([first, second, grouped]);
    model.specifications.push(spec);

    Fixture {
        session: Session::new("file://model.json", store),
        model,
        colour,
        mass,
        category,
    }
}

fn export(fixture: &Fixture) -> ReqIf {
    ReqIfBuilder::default()
        .build(&fixture.session, &fixture.model, &mut AbortOnViolation)
        .unwrap()
        .document
}

fn import(fixture: &Fixture, document: &ReqIf) -> ImportedThings {
    let reference_data = &fixture.model.reference_data;
    let mapping = ImportMappingConfiguration::infer(document, reference_data);
    ThingFactory::new(&Config::default(), &mapping, reference_data)
        .compute(document)
        .unwrap()
}

#[test]
fn structure_survives_a_round_trip() {
    let fixture = fixture();
    let things = import(&fixture, &export(&fixture));

    assert_eq!(things.specifications.len(), 1);
    assert_eq!(things.requirements().count(), 3);
    assert_eq!(things.relationships.len(), 1);

    let spec = &things.specifications[0];
    assert_eq!(spec.short_name, "SPEC");
    assert_eq!(spec.name, "system specification");

    assert_eq!(spec.groups.len(), 1);
    let group = &spec.groups[0];
    assert_eq!(group.short_name, "G1");
    assert_eq!(group.name, "power");

    let short_names: Vec<_> = spec.requirements.iter().map(|r| r.short_name.as_str()).collect();
    assert_eq!(short_names, ["R3", "R1", "R2"]);
    assert_eq!(spec.requirements[0].group, Some(group.iid));
}

#[test]
fn values_survive_a_round_trip() {
    let fixture = fixture();
    let things = import(&fixture, &export(&fixture));

    let first = things
        .requirements()
        .find(|r| r.short_name == "R1")
        .unwrap();
    assert_eq!(first.name, "first");
    assert_eq!(first.text(), Some("The system shall fly"));
    assert_eq!(first.categories, [fixture.category.iid]);
    assert_eq!(
        first.parameter_values,
        [
            ParameterValue::new(fixture.colour.iid, "blue"),
            ParameterValue::new(fixture.mass.iid, "12"),
        ]
    );
}

#[test]
fn relationships_survive_a_round_trip() {
    let fixture = fixture();
    let things = import(&fixture, &export(&fixture));

    let short_name = |end: ThingRef| {
        let ThingRef::Requirement(iid) = end else {
            panic!("expected a requirement end");
        };
        things
            .requirements()
            .find(|r| r.iid == iid)
            .map(|r| r.short_name.clone())
            .unwrap()
    };

    let relationship = &things.relationships[0];
    assert_eq!(short_name(relationship.source), "R1");
    assert_eq!(short_name(relationship.target), "R2");
}

#[test]
fn documents_survive_json() {
    let fixture = fixture();
    let document = export(&fixture);

    let json = serde_json::to_string(&document).unwrap();
    let parsed: ReqIf = serde_json::from_str(&json).unwrap();

    let things = import(&fixture, &parsed);
    assert_eq!(things.requirements().count(), 3);
}
