//! Type and name mapping for generated Rust code

use crate::ir::{is_primitive_type, Property, TypeRegistry};
use heck::{ToShoutySnakeCase, ToSnakeCase, ToUpperCamelCase};

/// Datatypes `ferrum-models` ships hand-written.
pub const BUILTIN_DATATYPES: &[&str] = &[
    "Annotation",
    "CodeableConcept",
    "Coding",
    "Extension",
    "HumanName",
    "Identifier",
    "Meta",
    "Narrative",
    "Period",
    "Quantity",
    "Reference",
];

/// Map a FHIR type code to the Rust type of one value
pub fn map_fhir_type_to_rust(code: &str, registry: &TypeRegistry, models_path: &str) -> String {
    match code {
        "boolean" => "bool".to_string(),
        "integer" | "unsignedInt" | "positiveInt" => "i32".to_string(),
        "decimal" => format!("{}::__private::serde_json::Number", models_path),
        // integer64 travels as a JSON string
        _ if is_primitive_type(code) => "String".to_string(),
        _ if registry.is_struct(code) => code.to_string(),
        _ if BUILTIN_DATATYPES.contains(&code) => format!("{}::datatypes::{}", models_path, code),
        _ => format!("{}::__private::Value", models_path),
    }
}

/// Argument type of a typed-builder setter for one value
pub fn setter_arg_type(code: &str, registry: &TypeRegistry, models_path: &str) -> String {
    match map_fhir_type_to_rust(code, registry, models_path).as_str() {
        "String" => "&str".to_string(),
        other => other.to_string(),
    }
}

/// Rust type of one value stored in a field of `owner`, boxed when the
/// value's type leads back to `owner` through single-valued fields.
pub fn value_type(
    code: &str,
    owner: &str,
    boxable: bool,
    registry: &TypeRegistry,
    models_path: &str,
) -> String {
    let rust = map_fhir_type_to_rust(code, registry, models_path);
    if boxable && registry.is_struct(code) && registry.reaches_through_scalars(code, owner) {
        format!("Box<{}>", rust)
    } else {
        rust
    }
}

/// Complete field type for a non-choice property
pub fn field_type(
    property: &Property,
    owner: &str,
    registry: &TypeRegistry,
    models_path: &str,
) -> String {
    let code = property.type_code().unwrap_or("Resource");
    if property.cardinality.is_array() {
        let item = map_fhir_type_to_rust(code, registry, models_path);
        // `null` holds the place of a value that only has extensions in `_name`
        if is_primitive_type(code) {
            format!("Option<Vec<Option<{}>>>", item)
        } else {
            format!("Option<Vec<{}>>", item)
        }
    } else {
        format!("Option<{}>", value_type(code, owner, true, registry, models_path))
    }
}

/// Field type of the `_ext` companion of a primitive property
pub fn shadow_field_type(property: &Property) -> &'static str {
    if property.cardinality.is_array() {
        "Option<Vec<Option<Element>>>"
    } else {
        "Option<Element>"
    }
}

/// Sanitize a field name to be a valid Rust identifier
pub fn sanitize_field_name(name: &str) -> String {
    let snake = name.to_snake_case();

    if matches!(snake.as_str(), "self" | "super" | "crate") {
        // not usable as raw identifiers
        format!("{}_", snake)
    } else if is_rust_keyword(&snake) {
        format!("r#{}", snake)
    } else {
        snake
    }
}

/// `r#type` -> `type_ext`
pub fn shadow_field_name(field: &str) -> String {
    format!("{}_ext", field.trim_start_matches("r#").trim_end_matches('_'))
}

/// `Patient` + `deceased` -> `PatientDeceased`
pub fn choice_enum_name(owner: &str, base: &str) -> String {
    format!("{}{}", owner, base.to_upper_camel_case())
}

/// `dateTime` -> `DateTime`
pub fn variant_name(type_code: &str) -> String {
    type_code.to_upper_camel_case()
}

/// `PatientContact` -> `PATIENT_CONTACT`
pub fn const_prefix(type_name: &str) -> String {
    type_name.to_shouty_snake_case()
}

/// Check if a string is a Rust keyword
fn is_rust_keyword(s: &str) -> bool {
    matches!(
        s,
        "as" | "break"
            | "const"
            | "continue"
            | "else"
            | "enum"
            | "extern"
            | "false"
            | "fn"
            | "for"
            | "if"
            | "impl"
            | "in"
            | "let"
            | "loop"
            | "match"
            | "mod"
            | "move"
            | "mut"
            | "pub"
            | "ref"
            | "return"
            | "static"
            | "struct"
            | "trait"
            | "true"
            | "type"
            | "unsafe"
            | "use"
            | "where"
            | "while"
            | "async"
            | "await"
            | "dyn"
            | "abstract"
            | "become"
            | "box"
            | "do"
            | "final"
            | "macro"
            | "override"
            | "priv"
            | "typeof"
            | "unsized"
            | "virtual"
            | "yield"
            | "try"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_names() {
        assert_eq!(sanitize_field_name("birthDate"), "birth_date");
        assert_eq!(sanitize_field_name("type"), "r#type");
        assert_eq!(sanitize_field_name("self"), "self_");
        assert_eq!(shadow_field_name("r#type"), "type_ext");
        assert_eq!(shadow_field_name("birth_date"), "birth_date_ext");
        assert_eq!(shadow_field_name("self_"), "self_ext");
    }

    #[test]
    fn test_type_names() {
        assert_eq!(choice_enum_name("Patient", "deceased"), "PatientDeceased");
        assert_eq!(variant_name("dateTime"), "DateTime");
        assert_eq!(variant_name("CodeableConcept"), "CodeableConcept");
        assert_eq!(const_prefix("PatientContact"), "PATIENT_CONTACT");
    }

    #[test]
    fn test_type_mapping() {
        let registry = TypeRegistry::new();
        let map = |code| map_fhir_type_to_rust(code, &registry, "ferrum_models");
        assert_eq!(map("boolean"), "bool");
        assert_eq!(map("positiveInt"), "i32");
        assert_eq!(map("decimal"), "ferrum_models::__private::serde_json::Number");
        assert_eq!(map("dateTime"), "String");
        assert_eq!(map("HumanName"), "ferrum_models::datatypes::HumanName");
        assert_eq!(map("Resource"), "ferrum_models::__private::Value");
        assert_eq!(setter_arg_type("code", &registry, "crate"), "&str");
    }
}
