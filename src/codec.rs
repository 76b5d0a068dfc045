//! Execute class plans on dynamic [`Object`]s.
//!
//! This is the generation contract run directly instead of rendered: the same
//! [`ClassPlan`] step lists drive `instantiate`, `marshal`, `unmarshal`,
//! `marshalled_size` and equality. Generated code must agree with it byte for byte.

use crate::ast::{ClassRegistry, PrimitiveType};
use crate::contract::{ClassPlan, EqualityTerm, FieldInit, GenError, InitStep, Layout, SizeTerm, WireStep};
use crate::value::{Object, Value};
use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};
use std::collections::HashMap;
use std::io::{Cursor, Write};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Endianness {
    Big,
    Little,
}

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Plan(#[from] GenError),
    #[error("Unknown class: {0}")]
    UnknownClass(String),
    #[error("{class}.{field}: missing from object")]
    UnknownField { class: String, field: String },
    #[error("{class}.{field}: expected {expected}")]
    TypeMismatch {
        class: String,
        field: String,
        expected: String,
    },
    #[error("{class}.{field}: fixed list holds {found} elements, expected {expected}")]
    LengthMismatch {
        class: String,
        field: String,
        expected: usize,
        found: usize,
    },
    #[error("{class}.{field}: length {len} does not fit `{type_name}`")]
    LengthOverflow {
        class: String,
        field: String,
        len: usize,
        type_name: &'static str,
    },
    #[error("{class}.{field}: count {count} is not a valid element count")]
    InvalidCount {
        class: String,
        field: String,
        count: String,
    },
}

/// Plan interpreter over one registry.
#[derive(Debug)]
pub struct Codec<'a> {
    pub endianness: Endianness,
    registry: &'a ClassRegistry,
    plans: HashMap<String, Result<ClassPlan, GenError>>,
}

impl<'a> Codec<'a> {
    pub fn new(registry: &'a ClassRegistry, endianness: Endianness) -> Self {
        let plans = registry
            .iter()
            .map(|c| (c.name.clone(), ClassPlan::build(registry, c)))
            .collect();
        Codec {
            endianness,
            registry,
            plans,
        }
    }

    pub fn registry(&self) -> &'a ClassRegistry {
        self.registry
    }

    pub fn plan(&self, class: &str) -> Result<&ClassPlan, CodecError> {
        match self.plans.get(class) {
            Some(Ok(plan)) => Ok(plan),
            Some(Err(e)) => Err(CodecError::Plan(e.clone())),
            None => Err(CodecError::UnknownClass(class.to_string())),
        }
    }

    /// Default instance: parent part, field starting values, then initial values.
    pub fn instantiate(&self, class: &str) -> Result<Object, CodecError> {
        let plan = self.plan(class)?;
        let mut obj = Object::new(class);
        for step in plan.init_steps() {
            match step {
                InitStep::Parent(p) => obj.parent = Some(Box::new(self.instantiate(p)?)),
                InitStep::Field(f, init) => {
                    let value = match init {
                        FieldInit::Zero(ty) => Value::zero(ty),
                        FieldInit::Default(ty, lit) => {
                            Value::from_literal(ty, &lit).ok_or_else(|| mismatch(class, &f.name, ty.schema_name()))?
                        }
                        FieldInit::Construct(c) => Value::Object(self.instantiate(&c)?),
                        FieldInit::ConstructSlots { class: c, length } => Value::List(
                            (0..length)
                                .map(|_| self.instantiate(&c).map(Value::Object))
                                .collect::<Result<_, _>>()?,
                        ),
                        FieldInit::ZeroFill { ty, length } => Value::List(vec![Value::zero(ty); length]),
                        FieldInit::EmptyList => Value::List(Vec::new()),
                    };
                    obj.fields.push((f.name.clone(), value));
                }
                InitStep::Assign(a) => {
                    let value = Value::from_literal(a.ty, &a.value)
                        .ok_or_else(|| mismatch(class, &a.field, a.ty.schema_name()))?;
                    let slot = obj
                        .at_depth_mut(a.depth)
                        .and_then(|o| o.own_mut(&a.field))
                        .ok_or_else(|| missing(class, &a.field))?;
                    *slot = value;
                }
            }
        }
        Ok(obj)
    }

    /// Encode an object; dynamic length fields carry the live list length.
    pub fn marshal(&self, obj: &Object) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::new();
        self.marshal_object(&mut out, obj)?;
        Ok(out)
    }

    /// Decode `class` from the start of `bytes` into a default instance.
    pub fn unmarshal(&self, class: &str, bytes: &[u8]) -> Result<Object, CodecError> {
        let mut obj = self.instantiate(class)?;
        self.unmarshal_into(&mut obj, bytes)?;
        Ok(obj)
    }

    /// Decode into an existing object; returns bytes consumed.
    pub fn unmarshal_into(&self, obj: &mut Object, bytes: &[u8]) -> Result<usize, CodecError> {
        let mut cursor = Cursor::new(bytes);
        self.unmarshal_object(&mut cursor, obj)?;
        Ok(cursor.position() as usize)
    }

    pub fn marshalled_size(&self, obj: &Object) -> Result<usize, CodecError> {
        let plan = self.plan(&obj.class)?;
        let mut total = 0usize;
        for term in plan.size_terms()? {
            total += match term {
                SizeTerm::Parent(_) => self.marshalled_size(parent(obj)?)?,
                SizeTerm::Bytes { bytes, .. } => bytes,
                SizeTerm::Nested { field, .. } => self.marshalled_size(own_object(obj, field)?)?,
                SizeTerm::PerElement { field, width } => own_list(obj, field)?.len() * width,
                SizeTerm::ElementSum { field, class } => {
                    let mut sum = 0;
                    for v in own_list(obj, field)? {
                        let o = v.as_object().ok_or_else(|| mismatch(&obj.class, field, class))?;
                        sum += self.marshalled_size(o)?;
                    }
                    sum
                }
            };
        }
        Ok(total)
    }

    pub fn equals(&self, a: &Object, b: &Object) -> Result<bool, CodecError> {
        Ok(self.mismatches(a, b)?.is_empty())
    }

    /// Every differing field path; parent fields are reported unqualified.
    pub fn mismatches(&self, a: &Object, b: &Object) -> Result<Vec<String>, CodecError> {
        let mut out = Vec::new();
        self.collect_mismatches(a, b, "", &mut out)?;
        Ok(out)
    }

    fn collect_mismatches(&self, a: &Object, b: &Object, prefix: &str, out: &mut Vec<String>) -> Result<(), CodecError> {
        if a.class != b.class {
            out.push(format!("{}<class>", prefix));
            return Ok(());
        }
        let plan = self.plan(&a.class)?;
        for term in plan.equality_terms() {
            match term {
                EqualityTerm::Parent(_) => self.collect_mismatches(parent(a)?, parent(b)?, prefix, out)?,
                EqualityTerm::Value(f) => {
                    let path = format!("{}{}", prefix, f.name);
                    match &f.layout {
                        Layout::LengthOf { list, .. } => {
                            if own_list(a, list)?.len() != own_list(b, list)?.len() {
                                out.push(path);
                            }
                        }
                        Layout::Nested { .. } => {
                            let nested = format!("{}.", path);
                            self.collect_mismatches(own_object(a, &f.name)?, own_object(b, &f.name)?, &nested, out)?;
                        }
                        _ => {
                            if own(a, &f.name)? != own(b, &f.name)? {
                                out.push(path);
                            }
                        }
                    }
                }
                EqualityTerm::Elements(f) => {
                    let path = format!("{}{}", prefix, f.name);
                    let (xs, ys) = (own_list(a, &f.name)?, own_list(b, &f.name)?);
                    if xs.len() != ys.len() {
                        out.push(format!("{}.len", path));
                        continue;
                    }
                    for (i, (x, y)) in xs.iter().zip(ys).enumerate() {
                        match (x.as_object(), y.as_object()) {
                            (Some(xo), Some(yo)) => {
                                self.collect_mismatches(xo, yo, &format!("{}[{}].", path, i), out)?
                            }
                            _ => {
                                if x != y {
                                    out.push(format!("{}[{}]", path, i));
                                }
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn marshal_object(&self, w: &mut Vec<u8>, obj: &Object) -> Result<(), CodecError> {
        let plan = self.plan(&obj.class)?;
        for step in plan.wire_steps() {
            let f = match step {
                WireStep::Parent(_) => {
                    self.marshal_object(w, parent(obj)?)?;
                    continue;
                }
                WireStep::Field(f) => f,
            };
            let class = obj.class.as_str();
            match &f.layout {
                Layout::Scalar(ty) => self.write_scalar(w, *ty, own(obj, &f.name)?, class, &f.name)?,
                Layout::LengthOf { ty, list } => {
                    let len = own_list(obj, list)?.len();
                    let v = Value::from_int(*ty, len as i128).ok_or_else(|| CodecError::LengthOverflow {
                        class: class.to_string(),
                        field: f.name.clone(),
                        len,
                        type_name: ty.schema_name(),
                    })?;
                    self.write_scalar(w, *ty, &v, class, &f.name)?;
                }
                Layout::Nested { class: nested } => {
                    let o = own_object(obj, &f.name)?;
                    if &o.class != nested {
                        return Err(mismatch(class, &f.name, nested));
                    }
                    self.marshal_object(w, o)?;
                }
                Layout::FixedScalars { ty, length } => {
                    let xs = fixed_list(obj, &f.name, *length)?;
                    for x in xs {
                        self.write_scalar(w, *ty, x, class, &f.name)?;
                    }
                }
                Layout::FixedNested { class: nested, length } => {
                    for x in fixed_list(obj, &f.name, *length)? {
                        let o = x.as_object().ok_or_else(|| mismatch(class, &f.name, nested))?;
                        self.marshal_object(w, o)?;
                    }
                }
                Layout::ScalarList { ty, .. } => {
                    for x in own_list(obj, &f.name)? {
                        self.write_scalar(w, *ty, x, class, &f.name)?;
                    }
                }
                Layout::NestedList { class: nested, .. } => {
                    for x in own_list(obj, &f.name)? {
                        let o = x.as_object().ok_or_else(|| mismatch(class, &f.name, nested))?;
                        self.marshal_object(w, o)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn unmarshal_object(&self, r: &mut Cursor<&[u8]>, obj: &mut Object) -> Result<(), CodecError> {
        let plan = self.plan(&obj.class)?;
        let class = obj.class.clone();
        for step in plan.wire_steps() {
            let f = match step {
                WireStep::Parent(_) => {
                    let p = obj.parent.as_deref_mut().ok_or_else(|| missing(&class, "parent"))?;
                    self.unmarshal_object(r, p)?;
                    continue;
                }
                WireStep::Field(f) => f,
            };
            let value = match &f.layout {
                Layout::Scalar(ty) | Layout::LengthOf { ty, .. } => self.read_scalar(r, *ty)?,
                Layout::Nested { .. } => {
                    let o = own_mut(obj, &class, &f.name)?
                        .as_object_mut()
                        .ok_or_else(|| missing(&class, &f.name))?;
                    self.unmarshal_object(r, o)?;
                    continue;
                }
                Layout::FixedScalars { ty, length } => {
                    Value::List((0..*length).map(|_| self.read_scalar(r, *ty)).collect::<Result<_, _>>()?)
                }
                Layout::FixedNested { class: nested, length } => {
                    let mut xs = Vec::new();
                    for _ in 0..*length {
                        let mut o = self.instantiate(nested)?;
                        self.unmarshal_object(r, &mut o)?;
                        xs.push(Value::Object(o));
                    }
                    Value::List(xs)
                }
                Layout::ScalarList { ty, count } => {
                    let n = element_count(obj, &class, &f.name, count.depth, &count.field)?;
                    let remaining = r.get_ref().len().saturating_sub(r.position() as usize);
                    if n.saturating_mul(ty.width()) > remaining {
                        return Err(CodecError::Io(std::io::Error::new(
                            std::io::ErrorKind::UnexpectedEof,
                            format!("{}.{}: {} elements exceed remaining input", class, f.name, n),
                        )));
                    }
                    let mut xs = Vec::with_capacity(n);
                    for _ in 0..n {
                        xs.push(self.read_scalar(r, *ty)?);
                    }
                    Value::List(xs)
                }
                Layout::NestedList { class: nested, count } => {
                    let n = element_count(obj, &class, &f.name, count.depth, &count.field)?;
                    let mut xs = Vec::new();
                    for _ in 0..n {
                        let mut o = self.instantiate(nested)?;
                        self.unmarshal_object(r, &mut o)?;
                        xs.push(Value::Object(o));
                    }
                    Value::List(xs)
                }
            };
            *own_mut(obj, &class, &f.name)? = value;
        }
        Ok(())
    }

    fn read_scalar(&self, r: &mut Cursor<&[u8]>, ty: PrimitiveType) -> Result<Value, CodecError> {
        Ok(match ty {
            PrimitiveType::U8 => Value::U8(r.read_u8()?),
            PrimitiveType::I8 => Value::I8(r.read_i8()?),
            PrimitiveType::U16 => Value::U16(match self.endianness {
                Endianness::Big => r.read_u16::<BigEndian>()?,
                Endianness::Little => r.read_u16::<LittleEndian>()?,
            }),
            PrimitiveType::I16 => Value::I16(match self.endianness {
                Endianness::Big => r.read_i16::<BigEndian>()?,
                Endianness::Little => r.read_i16::<LittleEndian>()?,
            }),
            PrimitiveType::U32 => Value::U32(match self.endianness {
                Endianness::Big => r.read_u32::<BigEndian>()?,
                Endianness::Little => r.read_u32::<LittleEndian>()?,
            }),
            PrimitiveType::I32 => Value::I32(match self.endianness {
                Endianness::Big => r.read_i32::<BigEndian>()?,
                Endianness::Little => r.read_i32::<LittleEndian>()?,
            }),
            PrimitiveType::U64 => Value::U64(match self.endianness {
                Endianness::Big => r.read_u64::<BigEndian>()?,
                Endianness::Little => r.read_u64::<LittleEndian>()?,
            }),
            PrimitiveType::I64 => Value::I64(match self.endianness {
                Endianness::Big => r.read_i64::<BigEndian>()?,
                Endianness::Little => r.read_i64::<LittleEndian>()?,
            }),
            PrimitiveType::F32 => Value::Float(match self.endianness {
                Endianness::Big => r.read_f32::<BigEndian>()?,
                Endianness::Little => r.read_f32::<LittleEndian>()?,
            }),
            PrimitiveType::F64 => Value::Double(match self.endianness {
                Endianness::Big => r.read_f64::<BigEndian>()?,
                Endianness::Little => r.read_f64::<LittleEndian>()?,
            }),
        })
    }

    fn write_scalar<W: Write>(
        &self,
        w: &mut W,
        ty: PrimitiveType,
        v: &Value,
        class: &str,
        field: &str,
    ) -> Result<(), CodecError> {
        if v.primitive_type() != Some(ty) {
            return Err(mismatch(class, field, ty.schema_name()));
        }
        let big = self.endianness == Endianness::Big;
        match *v {
            Value::U8(x) => w.write_u8(x)?,
            Value::I8(x) => w.write_i8(x)?,
            Value::U16(x) if big => w.write_u16::<BigEndian>(x)?,
            Value::U16(x) => w.write_u16::<LittleEndian>(x)?,
            Value::I16(x) if big => w.write_i16::<BigEndian>(x)?,
            Value::I16(x) => w.write_i16::<LittleEndian>(x)?,
            Value::U32(x) if big => w.write_u32::<BigEndian>(x)?,
            Value::U32(x) => w.write_u32::<LittleEndian>(x)?,
            Value::I32(x) if big => w.write_i32::<BigEndian>(x)?,
            Value::I32(x) => w.write_i32::<LittleEndian>(x)?,
            Value::U64(x) if big => w.write_u64::<BigEndian>(x)?,
            Value::U64(x) => w.write_u64::<LittleEndian>(x)?,
            Value::I64(x) if big => w.write_i64::<BigEndian>(x)?,
            Value::I64(x) => w.write_i64::<LittleEndian>(x)?,
            Value::Float(x) if big => w.write_f32::<BigEndian>(x)?,
            Value::Float(x) => w.write_f32::<LittleEndian>(x)?,
            Value::Double(x) if big => w.write_f64::<BigEndian>(x)?,
            Value::Double(x) => w.write_f64::<LittleEndian>(x)?,
            Value::Object(_) | Value::List(_) => return Err(mismatch(class, field, ty.schema_name())),
        }
        Ok(())
    }
}

/// Count for a variable list, read from the object part at `depth`.
fn element_count(obj: &Object, class: &str, list: &str, depth: usize, field: &str) -> Result<usize, CodecError> {
    let v = obj
        .at_depth(depth)
        .and_then(|o| o.own(field))
        .ok_or_else(|| missing(class, field))?;
    v.as_u64()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| CodecError::InvalidCount {
            class: class.to_string(),
            field: list.to_string(),
            count: format!("{:?}", v),
        })
}

fn parent(obj: &Object) -> Result<&Object, CodecError> {
    obj.parent.as_deref().ok_or_else(|| missing(&obj.class, "parent"))
}

fn own<'o>(obj: &'o Object, field: &str) -> Result<&'o Value, CodecError> {
    obj.own(field).ok_or_else(|| missing(&obj.class, field))
}

fn own_mut<'o>(obj: &'o mut Object, class: &str, field: &str) -> Result<&'o mut Value, CodecError> {
    obj.own_mut(field).ok_or_else(|| missing(class, field))
}

fn own_object<'o>(obj: &'o Object, field: &str) -> Result<&'o Object, CodecError> {
    own(obj, field)?
        .as_object()
        .ok_or_else(|| mismatch(&obj.class, field, "object"))
}

fn own_list<'o>(obj: &'o Object, field: &str) -> Result<&'o [Value], CodecError> {
    own(obj, field)?
        .as_list()
        .ok_or_else(|| mismatch(&obj.class, field, "list"))
}

fn fixed_list<'o>(obj: &'o Object, field: &str, length: usize) -> Result<&'o [Value], CodecError> {
    let xs = own_list(obj, field)?;
    if xs.len() != length {
        return Err(CodecError::LengthMismatch {
            class: obj.class.clone(),
            field: field.to_string(),
            expected: length,
            found: xs.len(),
        });
    }
    Ok(xs)
}

fn missing(class: &str, field: &str) -> CodecError {
    CodecError::UnknownField {
        class: class.to_string(),
        field: field.to_string(),
    }
}

fn mismatch(class: &str, field: &str, expected: &str) -> CodecError {
    CodecError::TypeMismatch {
        class: class.to_string(),
        field: field.to_string(),
        expected: expected.to_string(),
    }
}
