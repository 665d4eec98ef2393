//! Rust code generator for FHIR types
//!
//! Emits one module per structured type following the template of the
//! hand-written models: `choice_type!` enums, a static property table, the
//! struct with `_ext` shadows, the `FhirModel` impl, the serde bridge and,
//! for resources, a typed builder.

mod types;

pub use types::{map_fhir_type_to_rust, sanitize_field_name, BUILTIN_DATATYPES};

use crate::generators::{Generator, GeneratorConfig};
use crate::ir::{is_primitive_type, Property, TypeDefinition, TypeKind, TypeRegistry};
use anyhow::Result;
use ferrum_models::{EnvelopeKind, PropertyKind, PropertyTable};
use heck::ToSnakeCase;
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Output of the Rust generator
#[derive(Debug, Default)]
pub struct RustOutput {
    /// Generated modules indexed by file name, `mod.rs` included
    pub modules: BTreeMap<String, String>,
}

/// Rust code generator
pub struct RustGenerator {
    config: GeneratorConfig,
}

impl RustGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    pub fn new_default() -> Self {
        Self::new(GeneratorConfig::default())
    }
}

impl Generator for RustGenerator {
    type Output = RustOutput;

    fn generate(&self, registry: &TypeRegistry) -> Result<Self::Output> {
        let mut modules = BTreeMap::new();

        for type_def in registry.structured_types() {
            let code = self.generate_type_module(type_def, registry);
            modules.insert(module_file(&type_def.name), code);
        }

        modules.insert("mod.rs".to_string(), self.generate_mod_rs(registry));
        tracing::debug!(modules = modules.len(), "generated rust modules");

        Ok(RustOutput { modules })
    }
}

/// One generated struct: a type or one of its backbone elements.
struct Shape<'a> {
    name: &'a str,
    envelope: EnvelopeKind,
    doc: String,
    properties: &'a [Property],
    table: PropertyTable,
}

/// A struct field and the table keys it is read from.
enum Field {
    Plain {
        ident: String,
        rust_type: String,
        key: String,
        shadow: Option<(String, &'static str)>,
    },
    Choice {
        ident: String,
        enum_name: String,
        shadow: Option<String>,
    },
}

impl<'a> Shape<'a> {
    fn of_type(type_def: &'a TypeDefinition) -> Self {
        Self {
            name: &type_def.name,
            envelope: type_def.envelope(),
            doc: type_def
                .description
                .clone()
                .unwrap_or_else(|| type_def.name.clone()),
            properties: &type_def.properties,
            table: type_def.property_table(),
        }
    }

    fn of_backbone(type_def: &'a TypeDefinition, index: usize) -> Self {
        let backbone = &type_def.backbone_elements[index];
        Self {
            name: &backbone.name,
            envelope: backbone.envelope(),
            doc: backbone.path.clone(),
            properties: &backbone.properties,
            table: backbone.property_table(),
        }
    }

    /// Name and type of the envelope field.
    fn envelope_field(&self, fields: &[Field]) -> (&'static str, &'static str) {
        let (name, ty) = envelope_parts(self.envelope);
        let taken = fields.iter().any(|f| match f {
            Field::Plain { ident, .. } | Field::Choice { ident, .. } => ident == name,
        });
        if taken {
            ("base", ty)
        } else {
            (name, ty)
        }
    }
}

fn envelope_parts(envelope: EnvelopeKind) -> (&'static str, &'static str) {
    match envelope {
        EnvelopeKind::Resource => ("resource", "DomainResource"),
        EnvelopeKind::Backbone => ("backbone", "BackboneElement"),
        EnvelopeKind::Element => ("element", "Element"),
    }
}

fn module_file(type_name: &str) -> String {
    format!("{}.rs", type_name.to_snake_case())
}

/// Setter names the typed builder macro defines itself.
const RESERVED_SETTERS: &[&str] = &[
    "new",
    "id",
    "add_extension",
    "into_inner",
    "build",
    "build_validated",
];

impl RustGenerator {
    fn models(&self) -> &str {
        &self.config.models_path
    }

    /// Generate a complete module for a single type
    fn generate_type_module(&self, type_def: &TypeDefinition, registry: &TypeRegistry) -> String {
        let mut shapes = vec![Shape::of_type(type_def)];
        for index in 0..type_def.backbone_elements.len() {
            shapes.push(Shape::of_backbone(type_def, index));
        }

        let mut code = String::new();
        let _ = writeln!(code, "//! {}", type_def.name);
        if let Some(url) = &type_def.url {
            let _ = writeln!(code, "//!\n//! Generated from {}", url);
        }
        code.push('\n');
        code.push_str(&self.generate_imports(type_def, &shapes, registry));

        for shape in &shapes {
            let fields = self.fields(shape, registry);
            code.push('\n');
            for property in shape.properties.iter().filter(|p| p.is_choice()) {
                code.push_str(&self.generate_choice_enum(shape.name, property, registry));
                code.push('\n');
            }
            code.push_str(&self.generate_table(shape));
            code.push('\n');
            code.push_str(&self.generate_struct(shape, &fields));
            code.push('\n');
            code.push_str(&self.generate_model_impl(shape, &fields));
            code.push('\n');
            let _ = writeln!(code, "{}::impl_model_serde!({});", self.models(), shape.name);
        }

        if self.config.generate_builders && type_def.kind == TypeKind::Resource {
            code.push('\n');
            code.push_str(&self.generate_builder(type_def, registry));
        }

        code
    }

    fn generate_imports(
        &self,
        type_def: &TypeDefinition,
        shapes: &[Shape<'_>],
        registry: &TypeRegistry,
    ) -> String {
        let models = self.models();
        let mut envelopes: Vec<&str> = Vec::new();
        for shape in shapes {
            let (_, ty) = envelope_parts(shape.envelope);
            if !envelopes.contains(&ty) {
                envelopes.push(ty);
            }
        }
        // choice shadows are `ChoiceShadow`, only plain shadows need `Element`
        let has_shadow = shapes.iter().any(|s| {
            s.table.canonical_order().any(|name| {
                name.strip_prefix('_')
                    .is_some_and(|base| s.table.choice_group_of(base).is_none())
            })
        });
        if has_shadow && !envelopes.contains(&"Element") {
            envelopes.push("Element");
        }
        envelopes.sort_unstable();

        let mut code = String::new();
        if !registry.get_dependencies(type_def).is_empty() {
            code.push_str("use super::*;\n");
        }
        let _ = writeln!(code, "use {}::bag::PropertyBag;", models);
        if envelopes.len() == 1 {
            let _ = writeln!(code, "use {}::envelope::{};", models, envelopes[0]);
        } else {
            let _ = writeln!(code, "use {}::envelope::{{{}}};", models, envelopes.join(", "));
        }
        let _ = writeln!(
            code,
            "use {}::table::{{EnvelopeKind, PropertyDef, PropertyTable}};",
            models
        );
        let _ = writeln!(code, "use {}::{{FhirModel, Result}};", models);
        code
    }

    fn fields(&self, shape: &Shape<'_>, registry: &TypeRegistry) -> Vec<Field> {
        let mut fields = Vec::new();
        for property in shape.properties {
            let ident = types::sanitize_field_name(property.base_name());
            if property.is_choice() {
                let has_shadow = property.types.iter().any(|t| is_primitive_type(&t.code));
                fields.push(Field::Choice {
                    shadow: has_shadow.then(|| types::shadow_field_name(&ident)),
                    enum_name: types::choice_enum_name(shape.name, property.base_name()),
                    ident,
                });
                continue;
            }

            let Some(code) = property.type_code() else {
                continue;
            };
            let shadow = is_primitive_type(code).then(|| {
                (
                    types::shadow_field_name(&ident),
                    types::shadow_field_type(property),
                )
            });
            fields.push(Field::Plain {
                rust_type: types::field_type(property, shape.name, registry, self.models()),
                key: property.name.clone(),
                ident,
                shadow,
            });
        }
        fields
    }

    fn generate_choice_enum(&self, owner: &str, property: &Property, registry: &TypeRegistry) -> String {
        let enum_name = types::choice_enum_name(owner, property.base_name());
        let mut code = String::new();
        let _ = writeln!(code, "{}::choice_type! {{", self.models());
        if self.config.generate_docs {
            let _ = writeln!(code, "    /// {}", property.path);
        }
        let _ = writeln!(
            code,
            "    pub enum {}(\"{}\") {{",
            enum_name,
            property.base_name()
        );
        for (key, type_code) in property.choice_variants() {
            let value = types::value_type(type_code, owner, true, registry, self.models());
            let _ = write!(
                code,
                "        {}({}) => \"{}\"",
                types::variant_name(type_code),
                value,
                key
            );
            if is_primitive_type(type_code) {
                let _ = write!(code, ", shadow \"_{}\"", key);
            }
            code.push_str(";\n");
        }
        code.push_str("    }\n}\n");
        code
    }

    fn generate_table(&self, shape: &Shape<'_>) -> String {
        let prefix = types::const_prefix(shape.name);
        let mut code = String::new();
        let _ = writeln!(code, "const {}_PROPERTIES: &[PropertyDef] = &[", prefix);
        for name in shape.table.canonical_order() {
            let Some(def) = shape.table.get(name) else {
                continue;
            };
            let type_code = def.type_code.as_deref().unwrap_or("Element");
            let line = match def.kind {
                PropertyKind::Shadow => format!("PropertyDef::shadow(\"{}\")", name),
                PropertyKind::Choice => format!(
                    "PropertyDef::choice(\"{}\", \"{}\", \"{}\")",
                    name,
                    def.choice_of.as_deref().unwrap_or_default(),
                    type_code
                ),
                PropertyKind::Scalar if def.required => {
                    format!("PropertyDef::required_scalar(\"{}\", \"{}\")", name, type_code)
                }
                PropertyKind::Scalar => format!("PropertyDef::scalar(\"{}\", \"{}\")", name, type_code),
                PropertyKind::Array if def.required => {
                    format!("PropertyDef::required_array(\"{}\", \"{}\")", name, type_code)
                }
                PropertyKind::Array => format!("PropertyDef::array(\"{}\", \"{}\")", name, type_code),
            };
            let _ = writeln!(code, "    {},", line);
        }
        code.push_str("];\n\n");
        let _ = writeln!(
            code,
            "static {prefix}_TABLE: PropertyTable =\n    PropertyTable::new(\"{}\", EnvelopeKind::{:?}, {prefix}_PROPERTIES);",
            shape.name, shape.envelope
        );
        code
    }

    fn generate_struct(&self, shape: &Shape<'_>, fields: &[Field]) -> String {
        let (envelope_name, envelope_type) = shape.envelope_field(fields);
        let mut code = String::new();
        if self.config.generate_docs {
            for line in shape.doc.lines().map(str::trim).filter(|l| !l.is_empty()) {
                let _ = writeln!(code, "/// {}", line);
            }
        }
        code.push_str("#[derive(Debug, Clone, Default, PartialEq)]\n");
        let _ = writeln!(code, "pub struct {} {{", shape.name);
        let _ = writeln!(code, "    pub {}: {},", envelope_name, envelope_type);
        for field in fields {
            match field {
                Field::Plain {
                    ident,
                    rust_type,
                    shadow,
                    ..
                } => {
                    let _ = writeln!(code, "    pub {}: {},", ident, rust_type);
                    if let Some((shadow_ident, shadow_type)) = shadow {
                        let _ = writeln!(code, "    pub {}: {},", shadow_ident, shadow_type);
                    }
                }
                Field::Choice {
                    ident,
                    enum_name,
                    shadow,
                } => {
                    let _ = writeln!(code, "    pub {}: Option<{}>,", ident, enum_name);
                    if let Some(shadow_ident) = shadow {
                        let _ = writeln!(
                            code,
                            "    pub {}: Option<{}::ChoiceShadow>,",
                            shadow_ident,
                            self.models()
                        );
                    }
                }
            }
        }
        code.push_str("}\n");
        code
    }

    fn generate_model_impl(&self, shape: &Shape<'_>, fields: &[Field]) -> String {
        let (envelope_name, envelope_type) = shape.envelope_field(fields);
        let prefix = types::const_prefix(shape.name);
        let bag = if fields.is_empty() { "_bag" } else { "bag" };

        let mut code = String::new();
        let _ = writeln!(code, "impl FhirModel for {} {{", shape.name);
        let _ = writeln!(code, "    type Envelope = {};\n", envelope_type);
        let _ = writeln!(
            code,
            "    fn table() -> &'static PropertyTable {{\n        &{}_TABLE\n    }}\n",
            prefix
        );
        let _ = writeln!(
            code,
            "    fn envelope(&self) -> &{t} {{\n        &self.{n}\n    }}\n",
            t = envelope_type,
            n = envelope_name
        );
        let _ = writeln!(
            code,
            "    fn envelope_mut(&mut self) -> &mut {t} {{\n        &mut self.{n}\n    }}\n",
            t = envelope_type,
            n = envelope_name
        );

        // read_properties
        let _ = writeln!(
            code,
            "    fn read_properties({}: {}, {}: &mut PropertyBag) -> Result<Self> {{",
            envelope_name, envelope_type, bag
        );
        for field in fields {
            if let Field::Choice {
                ident, enum_name, ..
            } = field
            {
                let _ = writeln!(
                    code,
                    "        let {} = bag.take_choice::<{}>()?;",
                    ident, enum_name
                );
            }
        }
        code.push_str("        Ok(Self {\n");
        let _ = writeln!(code, "            {},", envelope_name);
        for field in fields {
            match field {
                Field::Plain {
                    ident, key, shadow, ..
                } => {
                    let _ = writeln!(code, "            {}: bag.take(\"{}\")?,", ident, key);
                    if let Some((shadow_ident, _)) = shadow {
                        let _ = writeln!(
                            code,
                            "            {}: bag.take(\"_{}\")?,",
                            shadow_ident, key
                        );
                    }
                }
                Field::Choice { ident, shadow, .. } => {
                    if let Some(shadow_ident) = shadow {
                        let _ = writeln!(
                            code,
                            "            {}: bag.take_choice_shadow({}.as_ref())?,",
                            shadow_ident, ident
                        );
                    }
                    let _ = writeln!(code, "            {},", ident);
                }
            }
        }
        code.push_str("        })\n    }\n\n");

        // write_properties
        let _ = writeln!(
            code,
            "    fn write_properties(&self, {}: &mut PropertyBag) -> Result<()> {{",
            bag
        );
        for field in fields {
            match field {
                Field::Plain {
                    ident, key, shadow, ..
                } => {
                    let _ = writeln!(code, "        bag.put(\"{}\", &self.{})?;", key, ident);
                    if let Some((shadow_ident, _)) = shadow {
                        let _ = writeln!(
                            code,
                            "        bag.put(\"_{}\", &self.{})?;",
                            key, shadow_ident
                        );
                    }
                }
                Field::Choice { ident, shadow, .. } => match shadow {
                    Some(shadow_ident) => {
                        let _ = writeln!(
                            code,
                            "        bag.put_choice(&self.{}, &self.{})?;",
                            ident, shadow_ident
                        );
                    }
                    None => {
                        let _ = writeln!(
                            code,
                            "        bag.put_choice(&self.{}, &None)?;",
                            ident
                        );
                    }
                },
            }
        }
        code.push_str("        Ok(())\n    }\n}\n");
        code
    }

    fn generate_builder(&self, type_def: &TypeDefinition, registry: &TypeRegistry) -> String {
        let models = self.models();
        let mut code = String::new();
        let _ = writeln!(code, "{}::typed_builder! {{", models);
        if self.config.generate_docs {
            let _ = writeln!(
                code,
                "    /// Named setters over `ModelBuilder<{}>`.",
                type_def.name
            );
        }
        let _ = writeln!(
            code,
            "    pub struct {}Builder for {} {{",
            type_def.name, type_def.name
        );
        for property in &type_def.properties {
            let ident = types::sanitize_field_name(property.base_name());
            let plain = ident.trim_start_matches("r#");
            if property.is_choice() {
                if RESERVED_SETTERS.contains(&plain) {
                    continue;
                }
                let enum_name = types::choice_enum_name(&type_def.name, property.base_name());
                let _ = writeln!(
                    code,
                    "        choice {}({}) => \"{}\";",
                    ident,
                    enum_name,
                    property.base_name()
                );
                continue;
            }

            let Some(type_code) = property.type_code() else {
                continue;
            };
            let arg = types::setter_arg_type(type_code, registry, models);
            if property.cardinality.is_array() {
                let method = format!("add_{}", plain.trim_end_matches('_'));
                if RESERVED_SETTERS.contains(&method.as_str()) {
                    continue;
                }
                let _ = writeln!(
                    code,
                    "        push {}({}) => \"{}\";",
                    method, arg, property.name
                );
            } else {
                if RESERVED_SETTERS.contains(&plain) {
                    continue;
                }
                let _ = writeln!(
                    code,
                    "        set {}({}) => \"{}\";",
                    ident, arg, property.name
                );
            }
        }
        code.push_str("    }\n}\n");
        code
    }

    fn generate_mod_rs(&self, registry: &TypeRegistry) -> String {
        let models = self.models();
        let mut code = String::new();
        code.push_str("//! Generated FHIR models\n\n");

        for type_def in registry.structured_types() {
            let _ = writeln!(code, "pub mod {};", type_def.name.to_snake_case());
        }
        code.push('\n');
        for type_def in registry.structured_types() {
            let _ = writeln!(code, "pub use {}::*;", type_def.name.to_snake_case());
        }

        code.push_str("\n/// Property tables of every generated type.\n");
        let _ = writeln!(
            code,
            "pub fn tables() -> Vec<&'static {}::PropertyTable> {{",
            models
        );
        let _ = writeln!(code, "    use {}::FhirModel;\n", models);
        code.push_str("    vec![\n");
        for type_def in registry.structured_types() {
            let _ = writeln!(code, "        {}::table(),", type_def.name);
            for backbone in &type_def.backbone_elements {
                let _ = writeln!(code, "        {}::table(),", backbone.name);
            }
        }
        code.push_str("    ]\n}\n");
        code
    }
}
