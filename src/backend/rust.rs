//! Rust backend: one module per class, parent embedded by composition.
//!
//! Each struct gets `Default` (the initializer), `marshal`, `unmarshal`,
//! `marshalled_size` and a field-by-field `PartialEq`. Wire order is big-endian
//! through `byteorder`. A dynamic length field keeps its stored value but is
//! written from the live list length, and has an accessor returning that length.
//!
//! Byte arrays flagged `couldBeString` also get `<field>_str` and
//! `set_<field>_str` text accessors.
//!
//! Configuration keys: `derives` (extra derives), `imports` (extra `use` paths),
//! `doc` (first line of the generated `mod.rs`).

use super::{to_pascal_case, to_snake_case, Backend, CodeWriter};
use crate::ast::{BackendConfig, Literal, PrimitiveType};
use crate::contract::{
    ClassPlan, EqualityTerm, FieldInit, FieldPlan, GenError, InitStep, Layout, SizeTerm, WireStep,
};
use std::collections::BTreeSet;
use std::path::PathBuf;

const KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum", "extern", "false",
    "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub", "ref", "return",
    "self", "Self", "static", "struct", "super", "trait", "true", "type", "unsafe", "use", "where", "while",
    // reserved
    "abstract", "become", "box", "do", "final", "macro", "override", "priv", "try", "typeof", "unsized",
    "virtual", "yield",
];

/// Method names every generated struct defines.
const RESERVED_METHODS: [&str; 5] = ["marshal", "unmarshal", "marshalled_size", "marshal_to_vec", "default"];

#[derive(Debug, Default, Clone, Copy)]
pub struct RustBackend;

impl Backend for RustBackend {
    fn name(&self) -> &'static str {
        "rust"
    }

    fn file_path(&self, class: &str, _config: &BackendConfig) -> PathBuf {
        PathBuf::from(format!("{}.rs", module_name(class)))
    }

    fn render(&self, plan: &ClassPlan, config: &BackendConfig) -> Result<String, GenError> {
        let size_terms = plan.size_terms()?;
        let names = field_names(plan)?;
        let ty = type_name(&plan.name);
        let mut w = CodeWriter::new("    ");

        w.line("// Generated by pdugen. Do not edit.");
        w.blank();
        render_imports(&mut w, plan, config);
        w.blank();

        // Struct
        if let Some(c) = &plan.comment {
            w.line(format!("/// {}", c));
        }
        let mut derives = vec!["Debug".to_string(), "Clone".to_string()];
        derives.extend(config.list("derives").into_iter().map(str::to_string));
        w.line(format!("#[derive({})]", derives.join(", ")));
        w.open(format!("pub struct {} {{", ty));
        if let Some(p) = &plan.parent {
            w.line(format!("pub parent: {},", type_name(p)));
        }
        for (f, name) in plan.fields.iter().zip(&names) {
            if let Some(c) = &f.comment {
                w.line(format!("/// {}", c));
            }
            w.line(format!("pub {}: {},", name, field_type(&f.layout)));
        }
        w.close("}");
        w.blank();

        render_default(&mut w, plan, &names);
        w.blank();

        w.open(format!("impl {} {{", ty));
        for (f, name) in plan.fields.iter().zip(&names) {
            if let Layout::LengthOf { list, .. } = &f.layout {
                w.line(format!("/// Live length of `{}`; this is what goes on the wire.", list));
                w.open(format!("pub fn {}(&self) -> usize {{", name));
                w.line(format!("self.{}.len()", field_name(list)));
                w.close("}");
                w.blank();
            }
        }
        for f in &plan.fields {
            if let Some(ty) = string_element(f) {
                render_string_accessors(&mut w, f, ty);
            }
        }
        render_marshal(&mut w, plan, &names);
        w.blank();
        render_unmarshal(&mut w, plan, &names);
        w.blank();
        render_size(&mut w, plan, &size_terms, &names);
        if plan.xml_root_element {
            w.blank();
            w.open("pub fn marshal_to_vec(&self) -> io::Result<Vec<u8>> {");
            w.line("let mut buf = Vec::with_capacity(self.marshalled_size());");
            w.line("self.marshal(&mut buf)?;");
            w.line("Ok(buf)");
            w.close("}");
        }
        w.close("}");
        w.blank();

        render_eq(&mut w, plan, &names);
        Ok(w.finish())
    }

    fn index(&self, classes: &[&str], config: &BackendConfig) -> Option<(PathBuf, String)> {
        let mut w = CodeWriter::new("    ");
        w.line(format!("//! {}", config.get_or("doc", "Generated protocol data units.")));
        w.line("// Generated by pdugen. Do not edit.");
        w.blank();
        for c in classes {
            w.line(format!("pub mod {};", module_name(c)));
        }
        w.blank();
        for c in classes {
            w.line(format!("pub use {}::{};", module_name(c), type_name(c)));
        }
        Some((PathBuf::from("mod.rs"), w.finish()))
    }
}

pub fn module_name(class: &str) -> String {
    escape(&to_snake_case(class))
}

pub fn type_name(class: &str) -> String {
    to_pascal_case(class)
}

pub fn field_name(field: &str) -> String {
    escape(&to_snake_case(field))
}

fn escape(s: &str) -> String {
    if KEYWORDS.contains(&s) {
        format!("{}_", s)
    } else {
        s.to_string()
    }
}

/// Rust identifiers of own fields, checked for collisions with each other and
/// with the methods generated for them.
fn field_names(plan: &ClassPlan) -> Result<Vec<String>, GenError> {
    let collision = |f: &FieldPlan, name: String| GenError::NameCollision {
        class: plan.name.clone(),
        field: f.name.clone(),
        name,
    };
    let mut names: Vec<String> = Vec::with_capacity(plan.fields.len());
    let mut methods: Vec<String> = RESERVED_METHODS.iter().map(|m| m.to_string()).collect();
    for f in &plan.fields {
        let name = field_name(&f.name);
        if names.contains(&name) || (plan.parent.is_some() && name == "parent") {
            return Err(collision(f, name));
        }
        let mut own_methods = Vec::new();
        if matches!(f.layout, Layout::LengthOf { .. }) {
            own_methods.push(name.clone());
        }
        if string_element(f).is_some() {
            let (get, set) = string_accessor_names(f);
            own_methods.push(get);
            own_methods.push(set);
        }
        for m in own_methods {
            if methods.contains(&m) {
                return Err(collision(f, m));
            }
            methods.push(m);
        }
        names.push(name);
    }
    Ok(names)
}

/// Element type of a fixed byte array flagged as text.
fn string_element(f: &FieldPlan) -> Option<PrimitiveType> {
    match f.layout {
        Layout::FixedScalars { ty: ty @ (PrimitiveType::U8 | PrimitiveType::I8), .. } if f.could_be_string => Some(ty),
        _ => None,
    }
}

fn string_accessor_names(f: &FieldPlan) -> (String, String) {
    let base = to_snake_case(&f.name);
    (format!("{}_str", base), format!("set_{}_str", base))
}

fn render_string_accessors(w: &mut CodeWriter, f: &FieldPlan, ty: PrimitiveType) {
    let field = field_name(&f.name);
    let (get, set) = string_accessor_names(f);
    let signed = ty == PrimitiveType::I8;
    w.line(format!("/// `{}` as text, up to the first NUL.", f.name));
    w.open(format!("pub fn {}(&self) -> String {{", get));
    w.line(format!(
        "let bytes: Vec<u8> = self.{}.iter(){}.take_while(|b| *b != 0).collect();",
        field,
        if signed { ".map(|b| *b as u8)" } else { ".copied()" }
    ));
    w.line("String::from_utf8_lossy(&bytes).into_owned()");
    w.close("}");
    w.blank();
    w.line(format!("/// Copy `text` into `{}`, truncating or padding with NUL.", f.name));
    w.open(format!("pub fn {}(&mut self, text: &str) {{", set));
    w.line("let bytes = text.as_bytes();");
    w.open(format!("for (i, slot) in self.{}.iter_mut().enumerate() {{", field));
    w.line(format!(
        "*slot = bytes.get(i).copied().unwrap_or(0){};",
        if signed { " as i8" } else { "" }
    ));
    w.close("}");
    w.close("}");
    w.blank();
}

fn render_imports(w: &mut CodeWriter, plan: &ClassPlan, config: &BackendConfig) {
    let scalars: Vec<PrimitiveType> = plan.fields.iter().filter_map(|f| f.layout.scalar_type()).collect();
    if !scalars.is_empty() {
        if scalars.iter().any(|t| t.width() > 1) {
            w.line("use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};");
        } else {
            w.line("use byteorder::{ReadBytesExt, WriteBytesExt};");
        }
    }
    w.line("use std::io::{self, Read, Write};");
    let mut nested: BTreeSet<&str> = BTreeSet::new();
    if let Some(p) = &plan.parent {
        nested.insert(p);
    }
    for f in &plan.fields {
        if let Some(c) = f.layout.class_name() {
            if c != plan.name {
                nested.insert(c);
            }
        }
    }
    for c in nested {
        w.line(format!("use super::{}::{};", module_name(c), type_name(c)));
    }
    for path in config.list("imports") {
        w.line(format!("use {};", path));
    }
}

fn field_type(layout: &Layout) -> String {
    match layout {
        Layout::Scalar(ty) | Layout::LengthOf { ty, .. } => scalar(*ty).to_string(),
        Layout::Nested { class } => type_name(class),
        Layout::FixedScalars { ty, length } => format!("[{}; {}]", scalar(*ty), length),
        Layout::FixedNested { class, length } => format!("[{}; {}]", type_name(class), length),
        Layout::ScalarList { ty, .. } => format!("Vec<{}>", scalar(*ty)),
        Layout::NestedList { class, .. } => format!("Vec<{}>", type_name(class)),
    }
}

fn scalar(ty: PrimitiveType) -> &'static str {
    match ty {
        PrimitiveType::U8 => "u8",
        PrimitiveType::U16 => "u16",
        PrimitiveType::U32 => "u32",
        PrimitiveType::U64 => "u64",
        PrimitiveType::I8 => "i8",
        PrimitiveType::I16 => "i16",
        PrimitiveType::I32 => "i32",
        PrimitiveType::I64 => "i64",
        PrimitiveType::F32 => "f32",
        PrimitiveType::F64 => "f64",
    }
}

fn literal(ty: PrimitiveType, lit: &Literal) -> String {
    match (lit, ty.is_float()) {
        (Literal::Int(n), false) => n.to_string(),
        _ => format!("{:?}", lit.as_f64()),
    }
}

fn zero(ty: PrimitiveType) -> &'static str {
    if ty.is_float() {
        "0.0"
    } else {
        "0"
    }
}

fn render_default(w: &mut CodeWriter, plan: &ClassPlan, names: &[String]) {
    let ty = type_name(&plan.name);
    w.open(format!("impl Default for {} {{", ty));
    w.open("fn default() -> Self {");
    let assigns = !plan.assignments.is_empty();
    w.open(if assigns { "let mut s = Self {" } else { "Self {" });
    let mut field_names = names.iter();
    for step in plan.init_steps() {
        let value = match step {
            InitStep::Parent(p) => {
                w.line(format!("parent: {}::default(),", type_name(p)));
                continue;
            }
            InitStep::Field(_, init) => match init {
                FieldInit::Zero(ty) => zero(ty).to_string(),
                FieldInit::Default(ty, lit) => literal(ty, &lit),
                FieldInit::Construct(c) => format!("{}::default()", type_name(&c)),
                FieldInit::ConstructSlots { class, .. } => {
                    format!("std::array::from_fn(|_| {}::default())", type_name(&class))
                }
                FieldInit::ZeroFill { ty, length } => format!("[{}; {}]", zero(ty), length),
                FieldInit::EmptyList => "Vec::new()".to_string(),
            },
            InitStep::Assign(_) => continue,
        };
        if let Some(name) = field_names.next() {
            w.line(format!("{}: {},", name, value));
        }
    }
    if assigns {
        w.close("};");
        for a in &plan.assignments {
            w.line(format!(
                "s{}.{} = {};",
                ".parent".repeat(a.depth),
                field_name(&a.field),
                literal(a.ty, &a.value)
            ));
        }
        w.line("s");
    } else {
        w.close("}");
    }
    w.close("}");
    w.close("}");
}

fn write_call(ty: PrimitiveType, expr: &str) -> String {
    match ty {
        PrimitiveType::U8 => format!("w.write_u8({})?;", expr),
        PrimitiveType::I8 => format!("w.write_i8({})?;", expr),
        _ => format!("w.write_{}::<BigEndian>({})?;", scalar(ty), expr),
    }
}

fn read_call(ty: PrimitiveType) -> String {
    match ty {
        PrimitiveType::U8 => "r.read_u8()?".to_string(),
        PrimitiveType::I8 => "r.read_i8()?".to_string(),
        _ => format!("r.read_{}::<BigEndian>()?", scalar(ty)),
    }
}

fn render_marshal(w: &mut CodeWriter, plan: &ClassPlan, names: &[String]) {
    let steps = plan.wire_steps();
    let param = if steps.is_empty() { "_w" } else { "w" };
    w.open(format!("pub fn marshal<W: Write>(&self, {}: &mut W) -> io::Result<()> {{", param));
    let mut field_names = names.iter();
    for step in steps {
        let f = match step {
            WireStep::Parent(_) => {
                w.line("self.parent.marshal(w)?;");
                continue;
            }
            WireStep::Field(f) => f,
        };
        let Some(name) = field_names.next() else { break };
        match &f.layout {
            Layout::Scalar(ty) => {
                w.line(write_call(*ty, &format!("self.{}", name)));
            }
            Layout::LengthOf { ty, list } => {
                w.open(format!("let len = {}::try_from(self.{}.len()).map_err(|_| {{", scalar(*ty), field_name(list)));
                w.line(format!(
                    "io::Error::new(io::ErrorKind::InvalidInput, \"{}.{}: list too long\")",
                    plan.name, f.name
                ));
                w.close("})?;");
                w.line(write_call(*ty, "len"));
            }
            Layout::Nested { .. } => {
                w.line(format!("self.{}.marshal(w)?;", name));
            }
            Layout::FixedScalars { ty, .. } | Layout::ScalarList { ty, .. } => {
                w.open(format!("for x in self.{}.iter() {{", name));
                w.line(write_call(*ty, "*x"));
                w.close("}");
            }
            Layout::FixedNested { .. } | Layout::NestedList { .. } => {
                w.open(format!("for x in self.{}.iter() {{", name));
                w.line("x.marshal(w)?;");
                w.close("}");
            }
        }
    }
    w.line("Ok(())");
    w.close("}");
}

fn count_expr(plan: &ClassPlan, f: &FieldPlan) -> Option<(String, String)> {
    let count = match &f.layout {
        Layout::ScalarList { count, .. } | Layout::NestedList { count, .. } => count,
        _ => return None,
    };
    let path = format!("self{}.{}", ".parent".repeat(count.depth), field_name(&count.field));
    let message = format!("{}.{}: invalid element count", plan.name, f.name);
    Some((path, message))
}

fn render_unmarshal(w: &mut CodeWriter, plan: &ClassPlan, names: &[String]) {
    let steps = plan.wire_steps();
    let param = if steps.is_empty() { "_r" } else { "r" };
    w.open(format!("pub fn unmarshal<R: Read>(&mut self, {}: &mut R) -> io::Result<()> {{", param));
    let mut field_names = names.iter();
    for step in steps {
        let f = match step {
            WireStep::Parent(_) => {
                w.line("self.parent.unmarshal(r)?;");
                continue;
            }
            WireStep::Field(f) => f,
        };
        let Some(name) = field_names.next() else { break };
        match &f.layout {
            Layout::Scalar(ty) | Layout::LengthOf { ty, .. } => {
                w.line(format!("self.{} = {};", name, read_call(*ty)));
            }
            Layout::Nested { .. } => {
                w.line(format!("self.{}.unmarshal(r)?;", name));
            }
            Layout::FixedScalars { ty, .. } => {
                w.open(format!("for x in self.{}.iter_mut() {{", name));
                w.line(format!("*x = {};", read_call(*ty)));
                w.close("}");
            }
            Layout::FixedNested { .. } => {
                w.open(format!("for x in self.{}.iter_mut() {{", name));
                w.line("x.unmarshal(r)?;");
                w.close("}");
            }
            Layout::ScalarList { .. } | Layout::NestedList { .. } => {
                let Some((count, message)) = count_expr(plan, f) else { continue };
                w.open(format!("let n = usize::try_from({}).map_err(|_| {{", count));
                w.line(format!("io::Error::new(io::ErrorKind::InvalidData, \"{}\")", message));
                w.close("})?;");
                w.line(format!("self.{}.clear();", name));
                w.open("for _ in 0..n {");
                match &f.layout {
                    Layout::NestedList { class, .. } => {
                        w.line(format!("let mut x = {}::default();", type_name(class)));
                        w.line("x.unmarshal(r)?;");
                        w.line(format!("self.{}.push(x);", name));
                    }
                    Layout::ScalarList { ty, .. } => {
                        w.line(format!("self.{}.push({});", name, read_call(*ty)));
                    }
                    _ => {}
                }
                w.close("}");
            }
        }
    }
    w.line("Ok(())");
    w.close("}");
}

fn render_size(w: &mut CodeWriter, plan: &ClassPlan, terms: &[SizeTerm<'_>], names: &[String]) {
    let name_of = |field: &str| -> String {
        plan.fields
            .iter()
            .position(|f| f.name == field)
            .map(|i| names[i].clone())
            .unwrap_or_else(|| field_name(field))
    };
    w.open("pub fn marshalled_size(&self) -> usize {");
    if terms.is_empty() {
        w.line("0");
        w.close("}");
        return;
    }
    w.line("let mut size = 0;");
    for term in terms {
        match term {
            SizeTerm::Parent(_) => w.line("size += self.parent.marshalled_size();"),
            SizeTerm::Bytes { field, bytes } => w.line(format!("size += {}; // {}", bytes, name_of(*field))),
            SizeTerm::Nested { field, .. } => w.line(format!("size += self.{}.marshalled_size();", name_of(*field))),
            SizeTerm::PerElement { field, width } => {
                w.line(format!("size += self.{}.len() * {};", name_of(*field), width))
            }
            SizeTerm::ElementSum { field, .. } => w.line(format!(
                "size += self.{}.iter().map(|x| x.marshalled_size()).sum::<usize>();",
                name_of(*field)
            )),
        };
    }
    w.line("size");
    w.close("}");
}

fn render_eq(w: &mut CodeWriter, plan: &ClassPlan, names: &[String]) {
    let terms = plan.equality_terms();
    w.open(format!("impl PartialEq for {} {{", type_name(&plan.name)));
    if terms.is_empty() {
        w.open("fn eq(&self, _other: &Self) -> bool {");
        w.line("true");
        w.close("}");
        w.close("}");
        return;
    }
    w.open("fn eq(&self, other: &Self) -> bool {");
    w.line("let mut eq = true;");
    let mut field_names = names.iter();
    for term in terms {
        let f = match term {
            EqualityTerm::Parent(_) => {
                w.line("eq &= self.parent == other.parent;");
                continue;
            }
            EqualityTerm::Value(f) | EqualityTerm::Elements(f) => f,
        };
        let Some(name) = field_names.next() else { break };
        match &f.layout {
            Layout::LengthOf { list, .. } => {
                let list = field_name(list);
                w.line(format!("eq &= self.{0}.len() == other.{0}.len();", list));
            }
            _ => {
                w.line(format!("eq &= self.{0} == other.{0};", name));
            }
        }
    }
    w.line("eq");
    w.close("}");
    w.close("}");
}
