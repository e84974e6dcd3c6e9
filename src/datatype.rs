use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use thiserror::Error;
use tracing::debug;

use crate::{
    domain::{
        Component, MeasurementScale, ParameterType, ParameterTypeKind, ReferenceData,
        value_set::{EMPTY_VALUE, empty_slots},
    },
    mapping::DatatypeDefinitionMap,
    reqif::{
        AttributeDefinition, AttributeValue, DatatypeDefinition, DatatypeKind, EnumValue,
        Identifiable,
    },
};

/// Separates selected literals in an enumeration parameter value.
pub const ENUM_SEPARATOR: char = '|';

/// Written in place of a compound value whose slot count does not match its
/// type.
pub const COMPOUND_PARSE_ERROR: &str = "Error: The value could not be parsed.";

/// Format of dates produced on import.
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Errors raised when converting a single value.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValueError {
    /// The value cannot be parsed as the expected kind.
    #[error("'{value}' is not a valid {expected}")]
    Format {
        /// The offending value.
        value: String,
        /// What the value was expected to be.
        expected: &'static str,
    },

    /// An enumeration token or value has no corresponding literal.
    #[error("'{token}' does not correspond to any literal of '{parameter_type}'")]
    UnmappedLiteral {
        /// The unresolved token.
        token: String,
        /// Short-name of the parameter type, or identifier of the datatype.
        parameter_type: String,
    },

    /// A value array holds no value at all.
    #[error("no value given for parameter type '{0}'")]
    EmptyValue(String),
}

/// Converts a parameter type into the datatype its values are exchanged as.
///
/// Enumerations keep their literals in declaration order, date-family types
/// become dates, booleans stay booleans and everything else is exchanged as
/// text. The datatype takes over the identity of the parameter type.
#[must_use]
pub fn to_datatype_definition(parameter_type: &ParameterType) -> DatatypeDefinition {
    let kind = match &parameter_type.kind {
        ParameterTypeKind::Enumeration { values, .. } => DatatypeKind::Enumeration {
            specified_values: values
                .iter()
                .enumerate()
                .map(|(key, literal)| EnumValue {
                    identity: Identifiable::new(
                        literal.iid.to_string(),
                        literal.name.clone(),
                        literal.name.clone(),
                    ),
                    key,
                    other_content: literal.short_name.clone(),
                })
                .collect(),
        },
        ParameterTypeKind::Date | ParameterTypeKind::DateTime | ParameterTypeKind::TimeOfDay => {
            DatatypeKind::Date
        }
        ParameterTypeKind::Boolean => DatatypeKind::Boolean,
        ParameterTypeKind::Text
        | ParameterTypeKind::Quantity { .. }
        | ParameterTypeKind::Compound { .. } => DatatypeKind::String,
    };

    DatatypeDefinition {
        identity: Identifiable::new(
            parameter_type.iid.to_string(),
            parameter_type.short_name.clone(),
            parameter_type.name.clone(),
        ),
        kind,
    }
}

/// Creates a fresh attribute definition for values of `parameter_type`.
#[must_use]
pub fn to_attribute_definition(
    parameter_type: &ParameterType,
    datatype: &DatatypeDefinition,
) -> AttributeDefinition {
    let multi_valued = matches!(
        parameter_type.kind,
        ParameterTypeKind::Enumeration {
            allow_multi_select: true,
            ..
        }
    );

    AttributeDefinition {
        identity: Identifiable::generated(
            parameter_type.short_name.clone(),
            parameter_type
                .definition
                .clone()
                .unwrap_or_else(|| EMPTY_VALUE.to_string()),
        ),
        datatype: datatype.identifier().to_string(),
        multi_valued,
    }
}

/// Converts the string-encoded value array of a parameter value into an
/// attribute value.
///
/// # Errors
///
/// Fails when the array is empty where a value is required, when a date or
/// boolean cannot be parsed, or when an enumeration token names no literal.
/// Compound arrays of the wrong length do not fail; they are written as
/// [`COMPOUND_PARSE_ERROR`].
pub fn to_attribute_value(
    parameter_type: &ParameterType,
    definition: &AttributeDefinition,
    datatype: &DatatypeDefinition,
    values: &[String],
    scale: Option<&MeasurementScale>,
) -> Result<AttributeValue, ValueError> {
    let definition = definition.identity.identifier.clone();
    let single = || {
        values
            .first()
            .map(String::as_str)
            .ok_or_else(|| ValueError::EmptyValue(parameter_type.short_name.clone()))
    };

    let value = match &parameter_type.kind {
        ParameterTypeKind::Enumeration { .. } => AttributeValue::Enumeration {
            definition,
            values: resolve_enum_tokens(parameter_type, datatype, single()?)?,
        },
        ParameterTypeKind::Date | ParameterTypeKind::DateTime | ParameterTypeKind::TimeOfDay => {
            AttributeValue::Date {
                definition,
                value: parse_date(single()?)?,
            }
        }
        ParameterTypeKind::Boolean => AttributeValue::Boolean {
            definition,
            value: parse_bool(single()?)?,
        },
        ParameterTypeKind::Text => AttributeValue::String {
            definition,
            value: single()?.to_string(),
        },
        ParameterTypeKind::Quantity { default_scale } => AttributeValue::String {
            definition,
            value: format_quantity(single()?, scale.or(default_scale.as_ref())),
        },
        ParameterTypeKind::Compound { components } => AttributeValue::String {
            definition,
            value: format_compound(components, values),
        },
    };

    Ok(value)
}

fn resolve_enum_tokens(
    parameter_type: &ParameterType,
    datatype: &DatatypeDefinition,
    value: &str,
) -> Result<Vec<String>, ValueError> {
    let unmapped = |token: &str| ValueError::UnmappedLiteral {
        token: token.to_string(),
        parameter_type: parameter_type.short_name.clone(),
    };
    let specified = datatype.enum_values().ok_or_else(|| unmapped(value))?;

    value
        .split(ENUM_SEPARATOR)
        .map(str::trim)
        .filter(|token| !token.is_empty() && *token != EMPTY_VALUE)
        .map(|token| {
            specified
                .iter()
                .find(|v| v.other_content == token)
                .map(|v| v.identity.identifier.clone())
                .ok_or_else(|| unmapped(token))
        })
        .collect()
}

/// Formats a quantity as `"{value} [{scale}]"`, with `-` for no scale.
#[must_use]
pub fn format_quantity(value: &str, scale: Option<&MeasurementScale>) -> String {
    let scale = scale.map_or(EMPTY_VALUE, |s| s.short_name.as_str());
    format!("{value} [{scale}]")
}

/// Formats the slots of a compound value as
/// `"{ c1: v1 [s1], c2: v2 [s2] }"`.
///
/// Returns [`COMPOUND_PARSE_ERROR`] unless there is exactly one value per
/// component.
#[must_use]
pub fn format_compound(components: &[Component], values: &[String]) -> String {
    if components.len() != values.len() {
        return COMPOUND_PARSE_ERROR.to_string();
    }

    let parts: Vec<_> = components
        .iter()
        .zip(values)
        .map(|(component, value)| {
            format!(
                "{}: {}",
                component.short_name,
                format_quantity(value, component.scale.as_ref())
            )
        })
        .collect();

    format!("{{ {} }}", parts.join(", "))
}

/// Parses text produced by [`format_compound`] back into one value per
/// component.
///
/// Each value runs up to the label of the next component, so values may
/// themselves contain `", "`. A value containing `", {next label}: "` is
/// split there and does not parse back.
///
/// Returns `None` if the text is malformed, names the components in a
/// different order, or misses a component.
#[must_use]
pub fn parse_compound(components: &[Component], text: &str) -> Option<Vec<String>> {
    let mut rest = text.trim().strip_prefix('{')?.strip_suffix('}')?.trim();
    let mut values = Vec::with_capacity(components.len());

    for (index, component) in components.iter().enumerate() {
        rest = rest
            .strip_prefix(component.short_name.as_str())?
            .strip_prefix(": ")?;
        let end = match components.get(index + 1) {
            Some(next) => rest.find(&format!(", {}: ", next.short_name))?,
            None => rest.len(),
        };
        let (value, remainder) = rest.split_at(end);
        values.push(quantity_token(value).to_string());
        rest = remainder.strip_prefix(", ").unwrap_or(remainder);
    }

    rest.is_empty().then_some(values)
}

/// The numeric token of a formatted quantity, i.e. everything before the
/// bracketed scale.
fn quantity_token(text: &str) -> &str {
    text.rsplit_once(" [")
        .filter(|(_, scale)| scale.ends_with(']'))
        .map_or(text, |(value, _)| value)
        .trim()
}

/// Parses a date, date-time or time of day into a UTC date-time.
///
/// Values without an offset are taken as UTC; a bare date is taken at
/// midnight and a bare time on the Unix epoch date.
///
/// # Errors
///
/// Fails if the value matches none of the accepted ISO 8601 shapes.
pub fn parse_date(value: &str) -> Result<DateTime<Utc>, ValueError> {
    let value = value.trim();

    if let Ok(date_time) = DateTime::parse_from_rfc3339(value) {
        return Ok(date_time.with_timezone(&Utc));
    }

    let naive = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .map(|date| date.and_time(NaiveTime::MIN))
        })
        .or_else(|| {
            NaiveTime::parse_from_str(value, "%H:%M:%S%.f")
                .ok()
                .map(|time| DateTime::<Utc>::UNIX_EPOCH.date_naive().and_time(time))
        });

    naive.map(|n| n.and_utc()).ok_or_else(|| ValueError::Format {
        value: value.to_string(),
        expected: "date",
    })
}

/// Parses `true` or `false`, ignoring case.
///
/// # Errors
///
/// Fails on any other text.
pub fn parse_bool(value: &str) -> Result<bool, ValueError> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if value.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(ValueError::Format {
            value: value.to_string(),
            expected: "boolean",
        })
    }
}

/// Reads an attribute value as text, the way imported things store it.
///
/// Text that reads as a date is normalised to [`DATE_TIME_FORMAT`] and text
/// that reads as a number to its shortest decimal form. Enumeration values
/// become the short-names of their mapped literals joined by `" | "`.
///
/// # Errors
///
/// Fails if an enumeration value has no mapped literal.
pub fn attribute_value_to_string(
    value: &AttributeValue,
    datatype_map: Option<&DatatypeDefinitionMap>,
    reference_data: &ReferenceData,
) -> Result<String, ValueError> {
    match value {
        AttributeValue::String { value, .. } => Ok(canonical_text(value)),
        AttributeValue::Boolean { value, .. } => Ok(value.to_string()),
        AttributeValue::Date { value, .. } => Ok(value.format(DATE_TIME_FORMAT).to_string()),
        AttributeValue::Enumeration { definition, values } => {
            let literals = values
                .iter()
                .map(|enum_value| {
                    enum_literal_short_name(enum_value, datatype_map, reference_data).ok_or_else(
                        || ValueError::UnmappedLiteral {
                            token: enum_value.clone(),
                            parameter_type: definition.clone(),
                        },
                    )
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(literals.join(" | "))
        }
    }
}

fn enum_literal_short_name<'a>(
    enum_value: &str,
    datatype_map: Option<&DatatypeDefinitionMap>,
    reference_data: &'a ReferenceData,
) -> Option<&'a str> {
    let datatype_map = datatype_map?;
    let literal = *datatype_map.enum_values.get(enum_value)?;
    let parameter_type = reference_data.parameter_type(datatype_map.parameter_type?)?;
    parameter_type
        .enumeration_values()?
        .iter()
        .find(|l| l.iid == literal)
        .map(|l| l.short_name.as_str())
}

fn canonical_text(text: &str) -> String {
    if let Ok(date) = parse_date(text) {
        return date.format(DATE_TIME_FORMAT).to_string();
    }
    match text.trim().parse::<f64>() {
        Ok(number) if number.is_finite() => number.to_string(),
        _ => text.to_string(),
    }
}

/// Splits imported text into the value array of a parameter of
/// `parameter_type`.
///
/// Quantities keep only their numeric token. Compound text is parsed back
/// into one slot per component; if it cannot be parsed every slot is left
/// empty.
#[must_use]
pub fn to_value_array(parameter_type: &ParameterType, text: &str) -> Vec<String> {
    match &parameter_type.kind {
        ParameterTypeKind::Quantity { .. } => vec![quantity_token(text).to_string()],
        ParameterTypeKind::Compound { components } => parse_compound(components, text)
            .unwrap_or_else(|| {
                debug!(
                    parameter_type = %parameter_type.short_name,
                    text, "compound value could not be parsed"
                );
                empty_slots(components.len())
            }),
        _ => vec![text.to_string()],
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::TimeZone;
    use test_case::test_case;

    use super::*;
    use crate::domain::EnumerationValueDefinition;

    fn component(short_name: &str, scale: Option<&str>) -> Component {
        Component {
            short_name: short_name.to_string(),
            scale: scale.map(|s| MeasurementScale::new(s, s)),
        }
    }

    fn position() -> Vec<Component> {
        vec![component("x", Some("m")), component("y", None)]
    }

    fn level() -> ParameterType {
        ParameterType::new(
            "lvl",
            "level",
            ParameterTypeKind::Enumeration {
                values: vec![
                    EnumerationValueDefinition::new("LOW", "low"),
                    EnumerationValueDefinition::new("MID", "medium"),
                    EnumerationValueDefinition::new("HIGH", "high"),
                ],
                allow_multi_select: true,
            },
        )
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test_case(ParameterTypeKind::Boolean => matches DatatypeKind::Boolean; "boolean")]
    #[test_case(ParameterTypeKind::Date => matches DatatypeKind::Date; "date")]
    #[test_case(ParameterTypeKind::DateTime => matches DatatypeKind::Date; "date time")]
    #[test_case(ParameterTypeKind::TimeOfDay => matches DatatypeKind::Date; "time of day")]
    #[test_case(ParameterTypeKind::Text => matches DatatypeKind::String; "text")]
    #[test_case(ParameterTypeKind::Quantity { default_scale: None } => matches DatatypeKind::String; "quantity")]
    #[test_case(ParameterTypeKind::Compound { components: vec![] } => matches DatatypeKind::String; "compound")]
    fn datatype_kind(kind: ParameterTypeKind) -> DatatypeKind {
        to_datatype_definition(&ParameterType::new("pt", "parameter type", kind)).kind
    }

    #[test]
    fn enumeration_datatype_keeps_literal_order() {
        let level = level();
        let datatype = to_datatype_definition(&level);

        assert_eq!(datatype.identifier(), level.iid.to_string());
        assert_eq!(datatype.identity.long_name, "lvl");
        assert_eq!(datatype.identity.description, "level");

        let values = datatype.enum_values().unwrap();
        let keys: Vec<_> = values.iter().map(|v| (v.key, v.other_content.as_str())).collect();
        assert_eq!(keys, [(0, "LOW"), (1, "MID"), (2, "HIGH")]);
    }

    #[test]
    fn attribute_definition_uses_definition_or_placeholder() {
        let mut level = level();
        let datatype = to_datatype_definition(&level);

        let definition = to_attribute_definition(&level, &datatype);
        assert_eq!(definition.identity.description, "-");
        assert_eq!(definition.datatype, level.iid.to_string());
        assert!(definition.multi_valued);

        level.definition = Some("How bad it is".to_string());
        let definition = to_attribute_definition(&level, &datatype);
        assert_eq!(definition.identity.description, "How bad it is");
    }

    #[test]
    fn enumeration_value_resolves_each_token() {
        let level = level();
        let datatype = to_datatype_definition(&level);
        let definition = to_attribute_definition(&level, &datatype);
        let literals = level.enumeration_values().unwrap();

        let value = to_attribute_value(
            &level,
            &definition,
            &datatype,
            &strings(&["LOW | HIGH"]),
            None,
        )
        .unwrap();

        let AttributeValue::Enumeration { values, .. } = value else {
            panic!("expected an enumeration value");
        };
        assert_eq!(values, [literals[0].iid.to_string(), literals[2].iid.to_string()]);
    }

    #[test]
    fn unknown_enumeration_token_is_rejected() {
        let level = level();
        let datatype = to_datatype_definition(&level);
        let definition = to_attribute_definition(&level, &datatype);

        let error = to_attribute_value(&level, &definition, &datatype, &strings(&["SEVERE"]), None)
            .unwrap_err();
        assert!(matches!(error, ValueError::UnmappedLiteral { token, .. } if token == "SEVERE"));
    }

    #[test]
    fn enumeration_without_literals_is_rejected() {
        let level = level();
        let definition = to_attribute_definition(&level, &to_datatype_definition(&level));
        let text = DatatypeDefinition {
            identity: Identifiable::generated("text", ""),
            kind: DatatypeKind::String,
        };

        let error =
            to_attribute_value(&level, &definition, &text, &strings(&["LOW"]), None).unwrap_err();
        assert!(matches!(error, ValueError::UnmappedLiteral { .. }));
    }

    #[test_case("true" => Ok(true))]
    #[test_case("FALSE" => Ok(false))]
    #[test_case(" True " => Ok(true))]
    #[test_case("yes" => matches Err(ValueError::Format { .. }))]
    fn booleans(value: &str) -> Result<bool, ValueError> {
        parse_bool(value)
    }

    #[test_case("2024-03-01T12:30:00Z", (2024, 3, 1, 12, 30, 0); "rfc3339")]
    #[test_case("2024-03-01T14:30:00+02:00", (2024, 3, 1, 12, 30, 0); "offset")]
    #[test_case("2024-03-01T12:30:00", (2024, 3, 1, 12, 30, 0); "naive date time")]
    #[test_case("2024-03-01", (2024, 3, 1, 0, 0, 0); "date only")]
    #[test_case("12:30:00", (1970, 1, 1, 12, 30, 0); "time only")]
    fn dates(value: &str, expected: (i32, u32, u32, u32, u32, u32)) {
        let (y, mo, d, h, mi, s) = expected;
        let expected = Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap();
        assert_eq!(parse_date(value).unwrap(), expected);
    }

    #[test]
    fn unparseable_date_is_a_format_error() {
        assert_eq!(
            parse_date("next tuesday"),
            Err(ValueError::Format {
                value: "next tuesday".to_string(),
                expected: "date",
            })
        );
    }

    #[test]
    fn quantity_is_formatted_with_scale() {
        let metre = MeasurementScale::new("m", "metre");
        assert_eq!(format_quantity("10", Some(&metre)), "10 [m]");
        assert_eq!(format_quantity("10", None), "10 [-]");
    }

    #[test]
    fn quantity_falls_back_to_default_scale() {
        let quantity = ParameterType::new(
            "len",
            "length",
            ParameterTypeKind::Quantity {
                default_scale: Some(MeasurementScale::new("mm", "millimetre")),
            },
        );
        let datatype = to_datatype_definition(&quantity);
        let definition = to_attribute_definition(&quantity, &datatype);

        let value =
            to_attribute_value(&quantity, &definition, &datatype, &strings(&["3"]), None).unwrap();
        assert!(matches!(value, AttributeValue::String { value, .. } if value == "3 [mm]"));
    }

    #[test]
    fn compound_is_formatted_per_component() {
        assert_eq!(
            format_compound(&position(), &strings(&["1", "2"])),
            "{ x: 1 [m], y: 2 [-] }"
        );
    }

    #[test]
    fn compound_with_wrong_count_degrades_to_marker() {
        assert_eq!(
            format_compound(&position(), &strings(&["1"])),
            COMPOUND_PARSE_ERROR
        );
    }

    #[test_case(&["1", "2"]; "numbers")]
    #[test_case(&["-", "-"]; "empty slots")]
    #[test_case(&["1.5e3", "abc"]; "mixed")]
    #[test_case(&["1, 2", "a, b"]; "values containing separators")]
    fn compound_format_parses_back(values: &[&str]) {
        let values = strings(values);
        let text = format_compound(&position(), &values);
        assert_eq!(parse_compound(&position(), &text), Some(values));
    }

    #[test_case("{ y: 1 [m], x: 2 [-] }"; "wrong order")]
    #[test_case("{ x: 1 [m] }"; "missing component")]
    #[test_case("x: 1 [m], y: 2 [-]"; "no braces")]
    fn malformed_compound_is_not_parsed(text: &str) {
        assert_eq!(parse_compound(&position(), text), None);
    }

    #[test]
    fn value_array_splits_compound_and_quantity() {
        let compound = ParameterType::new(
            "pos",
            "position",
            ParameterTypeKind::Compound {
                components: position(),
            },
        );
        assert_eq!(
            to_value_array(&compound, "{ x: 1 [m], y: 2 [-] }"),
            strings(&["1", "2"])
        );
        assert_eq!(
            to_value_array(&compound, COMPOUND_PARSE_ERROR),
            strings(&["-", "-"])
        );

        let quantity = ParameterType::new("len", "length", ParameterTypeKind::Quantity {
            default_scale: None,
        });
        assert_eq!(to_value_array(&quantity, "10.5 [m]"), strings(&["10.5"]));
    }

    #[test_case("hello" => "hello"; "text")]
    #[test_case("1.50" => "1.5"; "number")]
    #[test_case("2024-03-01" => "2024-03-01T00:00:00"; "date")]
    #[test_case("10 [m]" => "10 [m]"; "quantity")]
    fn string_values_are_canonicalised(text: &str) -> String {
        let value = AttributeValue::String {
            definition: "def".to_string(),
            value: text.to_string(),
        };
        attribute_value_to_string(&value, None, &ReferenceData::default()).unwrap()
    }

    #[test]
    fn enumeration_values_become_literal_short_names() {
        let level = level();
        let literals = level.enumeration_values().unwrap().to_vec();
        let reference_data = ReferenceData {
            parameter_types: vec![level.clone()],
            ..ReferenceData::default()
        };
        let datatype_map = DatatypeDefinitionMap {
            parameter_type: Some(level.iid),
            enum_values: BTreeMap::from([
                ("v-low".to_string(), literals[0].iid),
                ("v-high".to_string(), literals[2].iid),
            ]),
        };
        let value = AttributeValue::Enumeration {
            definition: "def".to_string(),
            values: strings(&["v-low", "v-high"]),
        };

        assert_eq!(
            attribute_value_to_string(&value, Some(&datatype_map), &reference_data).unwrap(),
            "LOW | HIGH"
        );

        let unmapped = AttributeValue::Enumeration {
            definition: "def".to_string(),
            values: strings(&["v-mid"]),
        };
        assert!(matches!(
            attribute_value_to_string(&unmapped, Some(&datatype_map), &reference_data),
            Err(ValueError::UnmappedLiteral { .. })
        ));
    }
}
