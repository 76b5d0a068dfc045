//! Schema model: classes, fields, initial values, and the class registry.

use std::collections::{BTreeMap, HashMap};

/// Parent name meaning "no parent".
pub const ROOT_CLASS: &str = "root";

/// Everything the loader produces: class registry plus per-backend configuration.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub registry: ClassRegistry,
    pub backends: BTreeMap<String, BackendConfig>,
}

impl Schema {
    /// Configuration block for `backend` (any case), or an empty one.
    pub fn backend_config(&self, backend: &str) -> BackendConfig {
        self.backends
            .get(&backend.to_ascii_lowercase())
            .cloned()
            .unwrap_or_default()
    }
}

/// One message type.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaClass {
    pub name: String,
    /// Parent class name; [`ROOT_CLASS`] when the class has none.
    pub parent: String,
    pub comment: Option<String>,
    pub xml_root_element: bool,
    /// Declaration order is wire order.
    pub fields: Vec<FieldDef>,
    pub initial_values: Vec<InitialValue>,
}

impl SchemaClass {
    pub fn new(name: impl Into<String>) -> Self {
        SchemaClass {
            name: name.into(),
            parent: ROOT_CLASS.to_string(),
            comment: None,
            xml_root_element: false,
            fields: Vec::new(),
            initial_values: Vec::new(),
        }
    }

    pub fn parent_name(&self) -> Option<&str> {
        if self.parent.eq_ignore_ascii_case(ROOT_CLASS) {
            None
        } else {
            Some(&self.parent)
        }
    }

    pub fn has_parent(&self) -> bool {
        self.parent_name().is_some()
    }

    /// Own field by name, with its index.
    pub fn field(&self, name: &str) -> Option<(usize, &FieldDef)> {
        self.fields.iter().enumerate().find(|(_, f)| f.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub comment: Option<String>,
    pub kind: FieldKind,
}

impl FieldDef {
    pub fn primitive(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        FieldDef {
            name: name.into(),
            comment: None,
            kind: FieldKind::Primitive(PrimitiveField {
                type_name: type_name.into(),
                default_value: None,
                counted_list: None,
            }),
        }
    }

    pub fn as_primitive(&self) -> Option<&PrimitiveField> {
        match &self.kind {
            FieldKind::Primitive(p) => Some(p),
            _ => None,
        }
    }

    pub fn is_dynamic_length(&self) -> bool {
        self.as_primitive().map(PrimitiveField::is_dynamic_length).unwrap_or(false)
    }
}

/// Field type.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Primitive(PrimitiveField),
    ClassRef {
        class_name: String,
    },
    FixedList {
        element: ElementType,
        length: usize,
        could_be_string: bool,
    },
    VariableList {
        element: ElementType,
        count_field: String,
        could_be_string: bool,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveField {
    /// Type as written in the schema, e.g. `unsigned short`.
    pub type_name: String,
    pub default_value: Option<String>,
    /// Index of the same-class variable list whose length this field carries.
    pub counted_list: Option<usize>,
}

impl PrimitiveField {
    pub fn primitive_type(&self) -> Option<PrimitiveType> {
        PrimitiveType::from_schema_name(&self.type_name)
    }

    pub fn is_dynamic_length(&self) -> bool {
        self.counted_list.is_some()
    }
}

/// Element type of a fixed or variable list.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementType {
    Primitive(String),
    Class(String),
}

impl ElementType {
    pub fn type_name(&self) -> &str {
        match self {
            ElementType::Primitive(s) | ElementType::Class(s) => s,
        }
    }

    pub fn is_class(&self) -> bool {
        matches!(self, ElementType::Class(_))
    }
}

/// Constructor-time assignment of a literal to a field of this class or an ancestor.
#[derive(Debug, Clone, PartialEq)]
pub struct InitialValue {
    pub field: String,
    pub value: String,
}

/// Closed set of wire primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
}

impl PrimitiveType {
    pub const ALL: [PrimitiveType; 10] = [
        PrimitiveType::I8,
        PrimitiveType::U8,
        PrimitiveType::I16,
        PrimitiveType::U16,
        PrimitiveType::I32,
        PrimitiveType::U32,
        PrimitiveType::I64,
        PrimitiveType::U64,
        PrimitiveType::F32,
        PrimitiveType::F64,
    ];

    pub fn from_schema_name(s: &str) -> Option<Self> {
        match s.trim() {
            "byte" => Some(PrimitiveType::I8),
            "unsigned byte" => Some(PrimitiveType::U8),
            "short" => Some(PrimitiveType::I16),
            "unsigned short" => Some(PrimitiveType::U16),
            "int" => Some(PrimitiveType::I32),
            "unsigned int" => Some(PrimitiveType::U32),
            "long" => Some(PrimitiveType::I64),
            "unsigned long" => Some(PrimitiveType::U64),
            "float" => Some(PrimitiveType::F32),
            "double" => Some(PrimitiveType::F64),
            _ => None,
        }
    }

    pub fn schema_name(self) -> &'static str {
        match self {
            PrimitiveType::I8 => "byte",
            PrimitiveType::U8 => "unsigned byte",
            PrimitiveType::I16 => "short",
            PrimitiveType::U16 => "unsigned short",
            PrimitiveType::I32 => "int",
            PrimitiveType::U32 => "unsigned int",
            PrimitiveType::I64 => "long",
            PrimitiveType::U64 => "unsigned long",
            PrimitiveType::F32 => "float",
            PrimitiveType::F64 => "double",
        }
    }

    /// Bytes on the wire.
    pub fn width(self) -> usize {
        match self {
            PrimitiveType::U8 | PrimitiveType::I8 => 1,
            PrimitiveType::U16 | PrimitiveType::I16 => 2,
            PrimitiveType::U32 | PrimitiveType::I32 | PrimitiveType::F32 => 4,
            PrimitiveType::U64 | PrimitiveType::I64 | PrimitiveType::F64 => 8,
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, PrimitiveType::F32 | PrimitiveType::F64)
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            PrimitiveType::I8 | PrimitiveType::I16 | PrimitiveType::I32 | PrimitiveType::I64
        )
    }

    /// Inclusive integer range; `None` for floating types.
    pub fn int_range(self) -> Option<(i128, i128)> {
        Some(match self {
            PrimitiveType::U8 => (0, u8::MAX as i128),
            PrimitiveType::U16 => (0, u16::MAX as i128),
            PrimitiveType::U32 => (0, u32::MAX as i128),
            PrimitiveType::U64 => (0, u64::MAX as i128),
            PrimitiveType::I8 => (i8::MIN as i128, i8::MAX as i128),
            PrimitiveType::I16 => (i16::MIN as i128, i16::MAX as i128),
            PrimitiveType::I32 => (i32::MIN as i128, i32::MAX as i128),
            PrimitiveType::I64 => (i64::MIN as i128, i64::MAX as i128),
            PrimitiveType::F32 | PrimitiveType::F64 => return None,
        })
    }
}

/// Literal text from `defaultValue` / `initialValue`, parsed.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i128),
    Float(f64),
}

impl Literal {
    pub fn parse(s: &str) -> Option<Literal> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };
        if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
            let n = i128::from_str_radix(hex, 16).ok()?;
            return Some(Literal::Int(if negative { -n } else { n }));
        }
        if let Ok(n) = s.parse::<i128>() {
            return Some(Literal::Int(n));
        }
        // Accept C-style float suffixes such as `1.5f`.
        let float_text = s.trim_end_matches(['f', 'F', 'd', 'D']);
        float_text.parse::<f64>().ok().filter(|f| f.is_finite()).map(Literal::Float)
    }

    /// True when the literal is representable in `ty` without loss of range.
    pub fn fits(&self, ty: PrimitiveType) -> bool {
        match (self, ty.int_range()) {
            (Literal::Int(n), Some((min, max))) => *n >= min && *n <= max,
            (_, None) if ty == PrimitiveType::F32 => self.as_f64().abs() <= f32::MAX as f64,
            (_, None) => true,
            (Literal::Float(_), Some(_)) => false,
        }
    }

    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Literal::Int(n) => Some(*n),
            Literal::Float(_) => None,
        }
    }

    pub fn as_f64(&self) -> f64 {
        match self {
            Literal::Int(n) => *n as f64,
            Literal::Float(f) => *f,
        }
    }
}

/// Flat key/value configuration for one backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendConfig {
    values: BTreeMap<String, String>,
}

impl BackendConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// Comma- or whitespace-separated list value; empty when absent.
    pub fn list(&self, key: &str) -> Vec<&str> {
        self.get(key)
            .map(|v| {
                v.split(|c: char| c == ',' || c.is_whitespace())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Classes by name, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct ClassRegistry {
    classes: Vec<SchemaClass>,
    by_name: HashMap<String, usize>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a class; returns it back if the name is already taken.
    pub fn insert(&mut self, class: SchemaClass) -> Result<(), SchemaClass> {
        if self.by_name.contains_key(&class.name) {
            return Err(class);
        }
        self.by_name.insert(class.name.clone(), self.classes.len());
        self.classes.push(class);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&SchemaClass> {
        self.by_name.get(name).map(|&i| &self.classes[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SchemaClass> {
        self.classes.iter()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn parent_of(&self, class: &SchemaClass) -> Option<&SchemaClass> {
        class.parent_name().and_then(|p| self.get(p))
    }

    /// `class` followed by its ancestors, leaf first. Stops at the first
    /// missing parent and never yields a class twice.
    pub fn lineage<'a>(&'a self, class: &'a SchemaClass) -> Lineage<'a> {
        Lineage {
            registry: self,
            next: Some(class),
            seen: Vec::new(),
        }
    }

    /// Ancestors only (parent first), excluding `class`.
    pub fn ancestors<'a>(&'a self, class: &'a SchemaClass) -> impl Iterator<Item = &'a SchemaClass> {
        self.lineage(class).skip(1)
    }

    /// Find `field` on `class` or an ancestor: (owning class, field, ancestor depth).
    pub fn resolve_field<'a>(
        &'a self,
        class: &'a SchemaClass,
        field: &str,
    ) -> Option<(&'a SchemaClass, &'a FieldDef, usize)> {
        self.lineage(class).enumerate().find_map(|(depth, c)| {
            c.field(field).map(|(_, f)| (c, f, depth))
        })
    }
}

/// Iterator returned by [`ClassRegistry::lineage`].
pub struct Lineage<'a> {
    registry: &'a ClassRegistry,
    next: Option<&'a SchemaClass>,
    seen: Vec<&'a str>,
}

impl<'a> Iterator for Lineage<'a> {
    type Item = &'a SchemaClass;

    fn next(&mut self) -> Option<&'a SchemaClass> {
        let current = self.next.take()?;
        if self.seen.contains(&current.name.as_str()) {
            return None;
        }
        self.seen.push(&current.name);
        self.next = self.registry.parent_of(current);
        Some(current)
    }
}
