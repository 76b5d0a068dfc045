//! Java backend: one class per file, inheritance through `extends`.
//!
//! Unsigned wire types widen to the next signed Java type (`unsigned byte`
//! becomes `short`, `unsigned int` becomes `long`); `unsigned long` stays a
//! `long` and carries the same bits.
//!
//! Byte arrays flagged `couldBeString` get `get<Field>AsString` and
//! `setByString<Field>`. Root classes (`xmlRootElement`) also get a
//! `byte[] marshal()` convenience method.
//!
//! Configuration keys: `package` (default `pdugen.generated`) and `imports`.

use super::{capitalize, to_pascal_case, Backend, CodeWriter};
use crate::ast::{BackendConfig, Literal, PrimitiveType};
use crate::contract::{
    ClassPlan, CountSource, EqualityTerm, FieldInit, FieldPlan, GenError, InitStep, Layout, SizeTerm, WireStep,
};
use std::path::PathBuf;

const DEFAULT_PACKAGE: &str = "pdugen.generated";

const KEYWORDS: &[&str] = &[
    "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class", "const", "continue",
    "default", "do", "double", "else", "enum", "extends", "final", "finally", "float", "for", "goto", "if",
    "implements", "import", "instanceof", "int", "interface", "long", "native", "new", "package", "private",
    "protected", "public", "return", "short", "static", "strictfp", "super", "switch", "synchronized", "this",
    "throw", "throws", "transient", "try", "void", "volatile", "while", "true", "false", "null",
];

/// Members and locals every generated class already uses.
const RESERVED: [&str; 11] = [
    "marshalledSize", "marshal", "unmarshal", "equalsImpl", "dos", "dis", "obj", "rhs", "ivarsEqual", "marshalSize",
    "idx",
];

#[derive(Debug, Default, Clone, Copy)]
pub struct JavaBackend;

impl Backend for JavaBackend {
    fn name(&self) -> &'static str {
        "java"
    }

    fn file_path(&self, class: &str, config: &BackendConfig) -> PathBuf {
        let mut path: PathBuf = package(config).split('.').filter(|p| !p.is_empty()).collect();
        path.push(format!("{}.java", class_name(class)));
        path
    }

    fn render(&self, plan: &ClassPlan, config: &BackendConfig) -> Result<String, GenError> {
        let size_terms = plan.size_terms()?;
        let names = field_names(plan)?;
        let class = class_name(&plan.name);
        let mut w = CodeWriter::new("    ");

        w.line("// Generated by pdugen. Do not edit.");
        w.line(format!("package {};", package(config)));
        w.blank();
        if plan.xml_root_element {
            w.line("import java.io.ByteArrayOutputStream;");
        }
        w.line("import java.io.DataInputStream;");
        w.line("import java.io.DataOutputStream;");
        w.line("import java.io.IOException;");
        if plan.fields.iter().any(|f| f.layout.is_variable_list()) {
            w.line("import java.util.ArrayList;");
            w.line("import java.util.List;");
        }
        if plan
            .fields
            .iter()
            .any(|f| matches!(f.layout, Layout::FixedScalars { .. } | Layout::FixedNested { .. }))
        {
            w.line("import java.util.Arrays;");
        }
        if plan.fields.iter().any(|f| string_element(f).is_some()) {
            w.line("import java.nio.charset.StandardCharsets;");
        }
        for path in config.list("imports") {
            w.line(format!("import {};", path));
        }
        w.blank();

        if let Some(c) = &plan.comment {
            w.line("/**");
            w.line(format!(" * {}", c));
            w.line(" */");
        }
        match &plan.parent {
            Some(p) => w.open(format!("public class {} extends {} {{", class, class_name(p))),
            None => w.open(format!("public class {} {{", class)),
        };

        render_fields(&mut w, plan, &names);
        render_constructor(&mut w, plan, &names);
        render_size(&mut w, plan, &size_terms, &names);
        render_accessors(&mut w, plan, &names);
        render_marshal(&mut w, plan, &names);
        render_unmarshal(&mut w, plan, &names);
        render_equals(&mut w, plan, &names);

        w.close("}");
        Ok(w.finish())
    }
}

fn package(config: &BackendConfig) -> &str {
    config.get_or("package", DEFAULT_PACKAGE)
}

pub fn class_name(class: &str) -> String {
    to_pascal_case(class)
}

pub fn field_name(field: &str) -> String {
    if KEYWORDS.contains(&field) {
        format!("{}_", field)
    } else {
        field.to_string()
    }
}

fn field_names(plan: &ClassPlan) -> Result<Vec<String>, GenError> {
    let collision = |f: &FieldPlan, name: String| GenError::NameCollision {
        class: plan.name.clone(),
        field: f.name.clone(),
        name,
    };
    let mut names: Vec<String> = Vec::with_capacity(plan.fields.len());
    let mut methods: Vec<String> = Vec::new();
    for f in &plan.fields {
        let name = field_name(&f.name);
        if names.contains(&name) || RESERVED.contains(&name.as_str()) {
            return Err(collision(f, name));
        }
        let suffix = capitalize(&name);
        let mut own_methods = vec![format!("get{}", suffix), format!("set{}", suffix)];
        if string_element(f).is_some() {
            own_methods.push(format!("get{}AsString", suffix));
            own_methods.push(format!("setByString{}", suffix));
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

fn scalar(ty: PrimitiveType) -> &'static str {
    match ty {
        PrimitiveType::I8 => "byte",
        PrimitiveType::U8 | PrimitiveType::I16 => "short",
        PrimitiveType::U16 | PrimitiveType::I32 => "int",
        PrimitiveType::U32 | PrimitiveType::I64 | PrimitiveType::U64 => "long",
        PrimitiveType::F32 => "float",
        PrimitiveType::F64 => "double",
    }
}

fn boxed(ty: PrimitiveType) -> &'static str {
    match scalar(ty) {
        "byte" => "Byte",
        "short" => "Short",
        "int" => "Integer",
        "long" => "Long",
        "float" => "Float",
        _ => "Double",
    }
}

fn field_type(layout: &Layout) -> String {
    match layout {
        Layout::Scalar(ty) | Layout::LengthOf { ty, .. } => scalar(*ty).to_string(),
        Layout::Nested { class } => class_name(class),
        Layout::FixedScalars { ty, .. } => format!("{}[]", scalar(*ty)),
        Layout::FixedNested { class, .. } => format!("{}[]", class_name(class)),
        Layout::ScalarList { ty, .. } => format!("List<{}>", boxed(*ty)),
        Layout::NestedList { class, .. } => format!("List<{}>", class_name(class)),
    }
}

/// Literal typed for a field of `ty`, with the cast or suffix Java needs.
fn literal(ty: PrimitiveType, lit: &Literal) -> String {
    match ty {
        PrimitiveType::F32 => format!("{:?}f", lit.as_f64() as f32),
        PrimitiveType::F64 => format!("{:?}", lit.as_f64()),
        _ => {
            let n = lit.as_i128().unwrap_or(0);
            match scalar(ty) {
                "byte" => format!("(byte) {}", n),
                "short" => format!("(short) {}", n),
                "int" => n.to_string(),
                // unsigned long keeps its bit pattern
                _ => format!("{}L", n as u64 as i64),
            }
        }
    }
}

fn zero(ty: PrimitiveType) -> String {
    literal(ty, &Literal::Int(0))
}

fn write_call(ty: PrimitiveType, expr: &str, boxed: bool) -> String {
    match ty {
        PrimitiveType::U8 | PrimitiveType::I8 => format!("dos.writeByte({});", expr),
        PrimitiveType::U16 | PrimitiveType::I16 => format!("dos.writeShort({});", expr),
        PrimitiveType::I32 => format!("dos.writeInt({});", expr),
        PrimitiveType::U32 if boxed => format!("dos.writeInt({}.intValue());", expr),
        PrimitiveType::U32 => format!("dos.writeInt((int) {});", expr),
        PrimitiveType::U64 | PrimitiveType::I64 => format!("dos.writeLong({});", expr),
        PrimitiveType::F32 => format!("dos.writeFloat({});", expr),
        PrimitiveType::F64 => format!("dos.writeDouble({});", expr),
    }
}

fn read_call(ty: PrimitiveType) -> &'static str {
    match ty {
        PrimitiveType::U8 => "(short) dis.readUnsignedByte()",
        PrimitiveType::I8 => "dis.readByte()",
        PrimitiveType::U16 => "dis.readUnsignedShort()",
        PrimitiveType::I16 => "dis.readShort()",
        PrimitiveType::U32 => "dis.readInt() & 0xFFFFFFFFL",
        PrimitiveType::I32 => "dis.readInt()",
        PrimitiveType::U64 | PrimitiveType::I64 => "dis.readLong()",
        PrimitiveType::F32 => "dis.readFloat()",
        PrimitiveType::F64 => "dis.readDouble()",
    }
}

fn render_fields(w: &mut CodeWriter, plan: &ClassPlan, names: &[String]) {
    let mut names = names.iter();
    for step in plan.init_steps() {
        let InitStep::Field(f, init) = step else { continue };
        let Some(name) = names.next() else { break };
        let value = match init {
            FieldInit::Zero(ty) => zero(ty),
            FieldInit::Default(ty, lit) => literal(ty, &lit),
            FieldInit::Construct(c) => format!("new {}()", class_name(&c)),
            FieldInit::ConstructSlots { class, length } => format!("new {}[{}]", class_name(&class), length),
            FieldInit::ZeroFill { ty, length } => format!("new {}[{}]", scalar(ty), length),
            FieldInit::EmptyList => match &f.layout {
                Layout::ScalarList { ty, .. } => format!("new ArrayList<{}>()", boxed(*ty)),
                Layout::NestedList { class, .. } => format!("new ArrayList<{}>()", class_name(class)),
                _ => "null".to_string(),
            },
        };
        if let Some(c) = &f.comment {
            w.line(format!("/** {} */", c));
        }
        w.line(format!("protected {} {} = {};", field_type(&f.layout), name, value));
        w.blank();
    }
}

fn render_constructor(w: &mut CodeWriter, plan: &ClassPlan, names: &[String]) {
    w.open(format!("public {}() {{", class_name(&plan.name)));
    for (f, name) in plan.fields.iter().zip(names) {
        if let Layout::FixedNested { class, .. } = &f.layout {
            w.open(format!("for (int idx = 0; idx < {}.length; idx++) {{", name));
            w.line(format!("{}[idx] = new {}();", name, class_name(class)));
            w.close("}");
        }
    }
    for step in plan.init_steps() {
        if let InitStep::Assign(a) = step {
            w.line(format!(
                "set{}({});",
                capitalize(&field_name(&a.field)),
                literal(a.ty, &a.value)
            ));
        }
    }
    w.close("}");
    w.blank();
}

fn render_size(w: &mut CodeWriter, plan: &ClassPlan, terms: &[SizeTerm<'_>], names: &[String]) {
    let name_of = |field: &str| -> String {
        plan.fields
            .iter()
            .position(|f| f.name == field)
            .map(|i| names[i].clone())
            .unwrap_or_else(|| field_name(field))
    };
    w.open("public int getMarshalledSize() {");
    w.line("int marshalSize = 0;");
    for term in terms {
        match term {
            SizeTerm::Parent(_) => w.line("marshalSize += super.getMarshalledSize();"),
            SizeTerm::Bytes { field, bytes } => w.line(format!("marshalSize += {}; // {}", bytes, name_of(*field))),
            SizeTerm::Nested { field, .. } => {
                w.line(format!("marshalSize += {}.getMarshalledSize();", name_of(*field)))
            }
            SizeTerm::PerElement { field, width } => {
                w.line(format!("marshalSize += {}.size() * {};", name_of(*field), width))
            }
            SizeTerm::ElementSum { field, class } => {
                let name = name_of(*field);
                w.open(format!("for ({} x : {}) {{", class_name(class), name));
                w.line("marshalSize += x.getMarshalledSize();");
                w.close("}")
            }
        };
    }
    w.line("return marshalSize;");
    w.close("}");
    w.blank();
}

fn render_accessors(w: &mut CodeWriter, plan: &ClassPlan, names: &[String]) {
    for (f, name) in plan.fields.iter().zip(names) {
        let ty = field_type(&f.layout);
        let suffix = capitalize(name);
        w.open(format!("public {} get{}() {{", ty, suffix));
        match &f.layout {
            Layout::LengthOf { ty, list } => {
                w.line(format!("return ({}) {}.size();", scalar(*ty), field_name(list)));
            }
            _ => {
                w.line(format!("return {};", name));
            }
        }
        w.close("}");
        w.blank();
        w.open(format!("public void set{}({} value) {{", suffix, ty));
        w.line(format!("this.{} = value;", name));
        w.close("}");
        w.blank();
        if let Some(elem) = string_element(f) {
            render_string_accessors(w, name, elem);
        }
    }
}

fn render_string_accessors(w: &mut CodeWriter, name: &str, elem: PrimitiveType) {
    let suffix = capitalize(name);
    w.open(format!("public String get{}AsString() {{", suffix));
    w.line("int len = 0;");
    w.open(format!("while (len < this.{0}.length && this.{0}[len] != 0) {{", name));
    w.line("len++;");
    w.close("}");
    w.line("byte[] bytes = new byte[len];");
    w.open("for (int idx = 0; idx < len; idx++) {");
    w.line(format!("bytes[idx] = (byte) this.{}[idx];", name));
    w.close("}");
    w.line("return new String(bytes, StandardCharsets.UTF_8);");
    w.close("}");
    w.blank();
    let byte = if elem == PrimitiveType::U8 {
        "(short) (bytes[idx] & 0xFF)"
    } else {
        "bytes[idx]"
    };
    w.open(format!("public void setByString{}(String value) {{", suffix));
    w.line("byte[] bytes = value.getBytes(StandardCharsets.UTF_8);");
    w.open(format!("for (int idx = 0; idx < this.{}.length; idx++) {{", name));
    w.line(format!("this.{}[idx] = idx < bytes.length ? {} : 0;", name, byte));
    w.close("}");
    w.close("}");
    w.blank();
}

fn render_marshal(w: &mut CodeWriter, plan: &ClassPlan, names: &[String]) {
    w.open("public void marshal(DataOutputStream dos) throws IOException {");
    let mut names = names.iter();
    for step in plan.wire_steps() {
        let f = match step {
            WireStep::Parent(_) => {
                w.line("super.marshal(dos);");
                continue;
            }
            WireStep::Field(f) => f,
        };
        let Some(name) = names.next() else { break };
        match &f.layout {
            Layout::Scalar(ty) => {
                w.line(write_call(*ty, name, false));
            }
            Layout::LengthOf { ty, list } => {
                let expr = format!("{}.size()", field_name(list));
                w.line(write_call(*ty, &expr, false));
            }
            Layout::Nested { .. } => {
                w.line(format!("{}.marshal(dos);", name));
            }
            Layout::FixedScalars { ty, .. } => {
                w.open(format!("for (int idx = 0; idx < {}.length; idx++) {{", name));
                w.line(write_call(*ty, &format!("{}[idx]", name), false));
                w.close("}");
            }
            Layout::ScalarList { ty, .. } => {
                w.open(format!("for ({} x : {}) {{", boxed(*ty), name));
                w.line(write_call(*ty, "x", true));
                w.close("}");
            }
            Layout::FixedNested { class, .. } | Layout::NestedList { class, .. } => {
                w.open(format!("for ({} x : {}) {{", class_name(class), name));
                w.line("x.marshal(dos);");
                w.close("}");
            }
        }
    }
    w.close("}");
    w.blank();
    if plan.xml_root_element {
        w.open("public byte[] marshal() throws IOException {");
        w.line("ByteArrayOutputStream baos = new ByteArrayOutputStream(getMarshalledSize());");
        w.line("marshal(new DataOutputStream(baos));");
        w.line("return baos.toByteArray();");
        w.close("}");
        w.blank();
    }
}

fn count_field(f: &FieldPlan) -> Option<&CountSource> {
    match &f.layout {
        Layout::ScalarList { count, .. } | Layout::NestedList { count, .. } => Some(count),
        _ => None,
    }
}

/// Clear the list and open the read loop. Counts that can arrive negative in
/// Java (signed types, `unsigned long` with the top bit set) are rejected first.
fn open_list_read(w: &mut CodeWriter, plan: &ClassPlan, f: &FieldPlan, name: &str) {
    let Some(count) = count_field(f) else { return };
    let count_name = field_name(&count.field);
    if count.ty.is_signed() || count.ty == PrimitiveType::U64 {
        w.line(format!(
            "if ({} < 0) throw new IOException(\"{}.{}: invalid element count\");",
            count_name, plan.name, f.name
        ));
    }
    w.line(format!("{}.clear();", name));
    w.open(format!("for (int idx = 0; idx < {}; idx++) {{", count_name));
}

fn render_unmarshal(w: &mut CodeWriter, plan: &ClassPlan, names: &[String]) {
    w.open("public void unmarshal(DataInputStream dis) throws IOException {");
    let mut names = names.iter();
    for step in plan.wire_steps() {
        let f = match step {
            WireStep::Parent(_) => {
                w.line("super.unmarshal(dis);");
                continue;
            }
            WireStep::Field(f) => f,
        };
        let Some(name) = names.next() else { break };
        match &f.layout {
            Layout::Scalar(ty) | Layout::LengthOf { ty, .. } => {
                w.line(format!("{} = {};", name, read_call(*ty)));
            }
            Layout::Nested { .. } => {
                w.line(format!("{}.unmarshal(dis);", name));
            }
            Layout::FixedScalars { ty, .. } => {
                w.open(format!("for (int idx = 0; idx < {}.length; idx++) {{", name));
                w.line(format!("{}[idx] = {};", name, read_call(*ty)));
                w.close("}");
            }
            Layout::FixedNested { .. } => {
                w.open(format!("for (int idx = 0; idx < {}.length; idx++) {{", name));
                w.line(format!("{}[idx].unmarshal(dis);", name));
                w.close("}");
            }
            Layout::ScalarList { ty, .. } => {
                open_list_read(w, plan, f, name);
                w.line(format!("{}.add({});", name, read_call(*ty)));
                w.close("}");
            }
            Layout::NestedList { class, .. } => {
                open_list_read(w, plan, f, name);
                let class = class_name(class);
                w.line(format!("{} x = new {}();", class, class));
                w.line("x.unmarshal(dis);");
                w.line(format!("this.{}.add(x);", name));
                w.close("}");
            }
        }
    }
    w.close("}");
    w.blank();
}

fn render_equals(w: &mut CodeWriter, plan: &ClassPlan, names: &[String]) {
    let class = class_name(&plan.name);
    w.line("@Override");
    w.open("public boolean equals(Object obj) {");
    w.line("if (this == obj) return true;");
    w.line("if (obj == null || getClass() != obj.getClass()) return false;");
    w.line("return equalsImpl(obj);");
    w.close("}");
    w.blank();

    if plan.parent.is_some() {
        w.line("@Override");
    }
    w.open("public boolean equalsImpl(Object obj) {");
    w.line("boolean ivarsEqual = true;");
    w.line(format!("final {} rhs = ({}) obj;", class, class));
    let mut names = names.iter();
    for term in plan.equality_terms() {
        let (f, elements) = match term {
            EqualityTerm::Parent(_) => {
                w.line("if (!super.equalsImpl(rhs)) ivarsEqual = false;");
                continue;
            }
            EqualityTerm::Value(f) => (f, false),
            EqualityTerm::Elements(f) => (f, true),
        };
        let Some(name) = names.next() else { break };
        let test = match &f.layout {
            Layout::LengthOf { list, .. } => {
                let list = field_name(list);
                format!("{0}.size() == rhs.{0}.size()", list)
            }
            Layout::Nested { .. } => format!("{0}.equals(rhs.{0})", name),
            Layout::FixedScalars { .. } | Layout::FixedNested { .. } => format!("Arrays.equals({0}, rhs.{0})", name),
            _ if elements => format!("{0}.equals(rhs.{0})", name),
            _ => format!("{0} == rhs.{0}", name),
        };
        w.line(format!("if (!({})) ivarsEqual = false;", test));
    }
    w.line("return ivarsEqual;");
    w.close("}");
}
