//! Runtime values for the plan interpreter.

use crate::ast::{Literal, PrimitiveType};

/// A single field value (scalar, nested object or list).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    Float(f32),
    Double(f64),
    Object(Object),
    List(Vec<Value>),
}

impl Value {
    /// Typed zero.
    pub fn zero(ty: PrimitiveType) -> Value {
        match ty {
            PrimitiveType::U8 => Value::U8(0),
            PrimitiveType::U16 => Value::U16(0),
            PrimitiveType::U32 => Value::U32(0),
            PrimitiveType::U64 => Value::U64(0),
            PrimitiveType::I8 => Value::I8(0),
            PrimitiveType::I16 => Value::I16(0),
            PrimitiveType::I32 => Value::I32(0),
            PrimitiveType::I64 => Value::I64(0),
            PrimitiveType::F32 => Value::Float(0.0),
            PrimitiveType::F64 => Value::Double(0.0),
        }
    }

    /// Integer of type `ty`, or `None` when out of range (or `ty` is floating).
    pub fn from_int(ty: PrimitiveType, n: i128) -> Option<Value> {
        Some(match ty {
            PrimitiveType::U8 => Value::U8(u8::try_from(n).ok()?),
            PrimitiveType::U16 => Value::U16(u16::try_from(n).ok()?),
            PrimitiveType::U32 => Value::U32(u32::try_from(n).ok()?),
            PrimitiveType::U64 => Value::U64(u64::try_from(n).ok()?),
            PrimitiveType::I8 => Value::I8(i8::try_from(n).ok()?),
            PrimitiveType::I16 => Value::I16(i16::try_from(n).ok()?),
            PrimitiveType::I32 => Value::I32(i32::try_from(n).ok()?),
            PrimitiveType::I64 => Value::I64(i64::try_from(n).ok()?),
            PrimitiveType::F32 | PrimitiveType::F64 => return None,
        })
    }

    /// Literal converted to `ty`; `None` if it does not fit.
    pub fn from_literal(ty: PrimitiveType, lit: &Literal) -> Option<Value> {
        match ty {
            PrimitiveType::F32 => Some(Value::Float(lit.as_f64() as f32)),
            PrimitiveType::F64 => Some(Value::Double(lit.as_f64())),
            _ => Value::from_int(ty, lit.as_i128()?),
        }
    }

    /// Primitive type of a scalar value.
    pub fn primitive_type(&self) -> Option<PrimitiveType> {
        Some(match self {
            Value::U8(_) => PrimitiveType::U8,
            Value::U16(_) => PrimitiveType::U16,
            Value::U32(_) => PrimitiveType::U32,
            Value::U64(_) => PrimitiveType::U64,
            Value::I8(_) => PrimitiveType::I8,
            Value::I16(_) => PrimitiveType::I16,
            Value::I32(_) => PrimitiveType::I32,
            Value::I64(_) => PrimitiveType::I64,
            Value::Float(_) => PrimitiveType::F32,
            Value::Double(_) => PrimitiveType::F64,
            Value::Object(_) | Value::List(_) => return None,
        })
    }

    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Value::U8(x) => Some(*x as i128),
            Value::U16(x) => Some(*x as i128),
            Value::U32(x) => Some(*x as i128),
            Value::U64(x) => Some(*x as i128),
            Value::I8(x) => Some(*x as i128),
            Value::I16(x) => Some(*x as i128),
            Value::I32(x) => Some(*x as i128),
            Value::I64(x) => Some(*x as i128),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        self.as_i128().and_then(|n| u64::try_from(n).ok())
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(x) => Some(*x as f64),
            Value::Double(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::List(v) => Some(v),
            _ => None,
        }
    }
}

/// Instance of a schema class. The parent part is held by composition.
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    pub class: String,
    pub parent: Option<Box<Object>>,
    /// Own fields in declaration order.
    pub fields: Vec<(String, Value)>,
}

impl Object {
    pub fn new(class: impl Into<String>) -> Self {
        Object {
            class: class.into(),
            parent: None,
            fields: Vec::new(),
        }
    }

    pub fn own(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn own_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.fields.iter_mut().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Field of this object or the nearest ancestor part declaring it.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.own(name)
            .or_else(|| self.parent.as_deref().and_then(|p| p.get(name)))
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        if self.own(name).is_some() {
            return self.own_mut(name);
        }
        self.parent.as_deref_mut().and_then(|p| p.get_mut(name))
    }

    /// Replace a field value. Returns false if no part declares `name`.
    pub fn set(&mut self, name: &str, value: Value) -> bool {
        match self.get_mut(name) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Append to a list field. Returns false if `name` is not a list.
    pub fn push(&mut self, name: &str, value: Value) -> bool {
        match self.get_mut(name).and_then(Value::as_list_mut) {
            Some(list) => {
                list.push(value);
                true
            }
            None => false,
        }
    }

    pub fn list(&self, name: &str) -> Option<&[Value]> {
        self.get(name).and_then(Value::as_list)
    }

    /// 0 is this object, 1 its parent part, and so on.
    pub fn at_depth(&self, depth: usize) -> Option<&Object> {
        match depth {
            0 => Some(self),
            _ => self.parent.as_deref()?.at_depth(depth - 1),
        }
    }

    pub fn at_depth_mut(&mut self, depth: usize) -> Option<&mut Object> {
        match depth {
            0 => Some(self),
            _ => self.parent.as_deref_mut()?.at_depth_mut(depth - 1),
        }
    }
}
