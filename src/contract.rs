//! Generation contract: one backend-neutral plan per class.
//!
//! A [`ClassPlan`] resolves every own field of a class against the registry
//! (primitive widths, nested classes, count sources up the ancestor chain,
//! typed literals) and exposes the five operations as ordered step lists:
//!
//! | Operation        | Method                         |
//! |------------------|--------------------------------|
//! | Initializer      | [`ClassPlan::init_steps`]      |
//! | Marshal          | [`ClassPlan::wire_steps`]      |
//! | Unmarshal        | [`ClassPlan::wire_steps`]      |
//! | Marshalled size  | [`ClassPlan::size_terms`]      |
//! | Equality         | [`ClassPlan::equality_terms`]  |
//!
//! Every list starts with the parent (when there is one), so ancestor fields
//! always precede own fields. Backends render these steps and nothing else,
//! which keeps field order, wire layout and edge cases identical across them.

use crate::ast::{ClassRegistry, ElementType, FieldKind, Literal, PrimitiveType, SchemaClass};
use std::collections::HashSet;

/// Per-class generation failure. Fatal for that class only.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GenError {
    #[error("{class}.{field}: unsupported layout: {reason}")]
    UnsupportedLayout {
        class: String,
        field: String,
        reason: String,
    },
    #[error("{class}.{field}: unknown class `{name}`")]
    UnknownClass {
        class: String,
        field: String,
        name: String,
    },
    #[error("{class}.{field}: field not found in class or ancestors")]
    UnknownField { class: String, field: String },
    #[error("{class}.{field}: unknown primitive type `{type_name}`")]
    UnknownPrimitive {
        class: String,
        field: String,
        type_name: String,
    },
    #[error("{class}.{field}: literal `{value}` is not a valid `{type_name}`")]
    InvalidLiteral {
        class: String,
        field: String,
        value: String,
        type_name: String,
    },
    #[error("{class}.{field}: generated name `{name}` collides with another member")]
    NameCollision {
        class: String,
        field: String,
        name: String,
    },
    #[error("{class}: inheritance chain is cyclic")]
    InheritanceCycle { class: String },
}

/// Where a variable list finds its element count at unmarshal time.
#[derive(Debug, Clone, PartialEq)]
pub struct CountSource {
    pub field: String,
    /// Class declaring the count field.
    pub owner: String,
    /// 0 for an own field, 1 for the parent, and so on.
    pub depth: usize,
    pub ty: PrimitiveType,
}

/// Resolved wire layout of one field.
#[derive(Debug, Clone, PartialEq)]
pub enum Layout {
    Scalar(PrimitiveType),
    /// Dynamic length field: written as the live length of `list`.
    LengthOf { ty: PrimitiveType, list: String },
    Nested { class: String },
    FixedScalars { ty: PrimitiveType, length: usize },
    FixedNested { class: String, length: usize },
    ScalarList { ty: PrimitiveType, count: CountSource },
    NestedList { class: String, count: CountSource },
}

impl Layout {
    /// Scalar type of the field or its elements.
    pub fn scalar_type(&self) -> Option<PrimitiveType> {
        match self {
            Layout::Scalar(t)
            | Layout::LengthOf { ty: t, .. }
            | Layout::FixedScalars { ty: t, .. }
            | Layout::ScalarList { ty: t, .. } => Some(*t),
            _ => None,
        }
    }

    /// Nested class of the field or its elements.
    pub fn class_name(&self) -> Option<&str> {
        match self {
            Layout::Nested { class } | Layout::FixedNested { class, .. } | Layout::NestedList { class, .. } => {
                Some(class)
            }
            _ => None,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(
            self,
            Layout::FixedScalars { .. } | Layout::FixedNested { .. } | Layout::ScalarList { .. } | Layout::NestedList { .. }
        )
    }

    pub fn is_variable_list(&self) -> bool {
        matches!(self, Layout::ScalarList { .. } | Layout::NestedList { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldPlan {
    pub name: String,
    pub comment: Option<String>,
    pub layout: Layout,
    /// Parsed `defaultValue`, already range-checked.
    pub default: Option<Literal>,
    pub could_be_string: bool,
}

/// Initial value assignment, typed against its target field.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub field: String,
    pub owner: String,
    pub depth: usize,
    pub ty: PrimitiveType,
    pub value: Literal,
}

/// Starting value of one field before assignments run.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldInit {
    Zero(PrimitiveType),
    Default(PrimitiveType, Literal),
    Construct(String),
    ConstructSlots { class: String, length: usize },
    ZeroFill { ty: PrimitiveType, length: usize },
    EmptyList,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InitStep<'a> {
    /// Default-construct the parent part.
    Parent(&'a str),
    Field(&'a FieldPlan, FieldInit),
    Assign(&'a Assignment),
}

#[derive(Debug, Clone, PartialEq)]
pub enum WireStep<'a> {
    Parent(&'a str),
    Field(&'a FieldPlan),
}

/// One addend of the marshalled size.
#[derive(Debug, Clone, PartialEq)]
pub enum SizeTerm<'a> {
    Parent(&'a str),
    /// Constant bytes: a scalar or a fixed list of scalars.
    Bytes { field: &'a str, bytes: usize },
    Nested { field: &'a str, class: &'a str },
    /// Element count times element width.
    PerElement { field: &'a str, width: usize },
    /// Sum of element sizes.
    ElementSum { field: &'a str, class: &'a str },
}

#[derive(Debug, Clone, PartialEq)]
pub enum EqualityTerm<'a> {
    Parent(&'a str),
    /// Scalars and nested objects by value; a dynamic length field compares live lengths.
    Value(&'a FieldPlan),
    /// Same length and equal at every index.
    Elements(&'a FieldPlan),
}

/// Everything a backend needs to render one class.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassPlan {
    pub name: String,
    pub parent: Option<String>,
    pub comment: Option<String>,
    pub xml_root_element: bool,
    pub fields: Vec<FieldPlan>,
    pub assignments: Vec<Assignment>,
}

impl ClassPlan {
    pub fn build(registry: &ClassRegistry, class: &SchemaClass) -> Result<ClassPlan, GenError> {
        let parent = match class.parent_name() {
            None => None,
            Some(p) => {
                if !registry.contains(p) {
                    return Err(GenError::UnknownClass {
                        class: class.name.clone(),
                        field: "inheritsFrom".to_string(),
                        name: p.to_string(),
                    });
                }
                Some(p.to_string())
            }
        };
        check_inheritance(registry, class)?;

        let fields = (0..class.fields.len())
            .map(|index| plan_field(registry, class, index))
            .collect::<Result<Vec<_>, _>>()?;
        check_embedding(registry, class)?;

        let mut assignments = Vec::with_capacity(class.initial_values.len());
        for iv in &class.initial_values {
            let (owner, field, depth) = registry
                .resolve_field(class, &iv.field)
                .ok_or_else(|| GenError::UnknownField {
                    class: class.name.clone(),
                    field: iv.field.clone(),
                })?;
            let invalid = || GenError::InvalidLiteral {
                class: class.name.clone(),
                field: iv.field.clone(),
                value: iv.value.clone(),
                type_name: field
                    .as_primitive()
                    .map(|p| p.type_name.clone())
                    .unwrap_or_else(|| "non-primitive".to_string()),
            };
            let ty = field
                .as_primitive()
                .and_then(|p| p.primitive_type())
                .ok_or_else(invalid)?;
            let value = typed_literal(&iv.value, ty).ok_or_else(invalid)?;
            assignments.push(Assignment {
                field: iv.field.clone(),
                owner: owner.name.clone(),
                depth,
                ty,
                value,
            });
        }

        Ok(ClassPlan {
            name: class.name.clone(),
            parent,
            comment: class.comment.clone(),
            xml_root_element: class.xml_root_element,
            fields,
            assignments,
        })
    }

    /// Plan the class called `name`.
    pub fn for_name(registry: &ClassRegistry, name: &str) -> Result<ClassPlan, GenError> {
        let class = registry.get(name).ok_or_else(|| GenError::UnknownClass {
            class: name.to_string(),
            field: String::new(),
            name: name.to_string(),
        })?;
        ClassPlan::build(registry, class)
    }

    pub fn field(&self, name: &str) -> Option<&FieldPlan> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Parent part, own field starting values in order, then assignments in order.
    pub fn init_steps(&self) -> Vec<InitStep<'_>> {
        let mut steps = Vec::with_capacity(self.fields.len() + self.assignments.len() + 1);
        if let Some(p) = &self.parent {
            steps.push(InitStep::Parent(p));
        }
        for f in &self.fields {
            let init = match &f.layout {
                Layout::Scalar(ty) | Layout::LengthOf { ty, .. } => match &f.default {
                    Some(lit) => FieldInit::Default(*ty, lit.clone()),
                    None => FieldInit::Zero(*ty),
                },
                Layout::Nested { class } => FieldInit::Construct(class.clone()),
                Layout::FixedScalars { ty, length } => FieldInit::ZeroFill { ty: *ty, length: *length },
                Layout::FixedNested { class, length } => FieldInit::ConstructSlots {
                    class: class.clone(),
                    length: *length,
                },
                Layout::ScalarList { .. } | Layout::NestedList { .. } => FieldInit::EmptyList,
            };
            steps.push(InitStep::Field(f, init));
        }
        steps.extend(self.assignments.iter().map(InitStep::Assign));
        steps
    }

    /// Marshal and unmarshal order: parent, then own fields as declared.
    pub fn wire_steps(&self) -> Vec<WireStep<'_>> {
        let mut steps = Vec::with_capacity(self.fields.len() + 1);
        if let Some(p) = &self.parent {
            steps.push(WireStep::Parent(p));
        }
        steps.extend(self.fields.iter().map(WireStep::Field));
        steps
    }

    /// Addends of the marshalled size. Fixed lists of classes have no size rule.
    pub fn size_terms(&self) -> Result<Vec<SizeTerm<'_>>, GenError> {
        let mut terms = Vec::with_capacity(self.fields.len() + 1);
        if let Some(p) = &self.parent {
            terms.push(SizeTerm::Parent(p));
        }
        for f in &self.fields {
            let term = match &f.layout {
                Layout::Scalar(ty) | Layout::LengthOf { ty, .. } => SizeTerm::Bytes {
                    field: &f.name,
                    bytes: ty.width(),
                },
                Layout::Nested { class } => SizeTerm::Nested { field: &f.name, class },
                Layout::FixedScalars { ty, length } => SizeTerm::Bytes {
                    field: &f.name,
                    bytes: length * ty.width(),
                },
                Layout::FixedNested { class, .. } => {
                    return Err(GenError::UnsupportedLayout {
                        class: self.name.clone(),
                        field: f.name.clone(),
                        reason: format!("marshalled size of a fixed list of class `{}`", class),
                    })
                }
                Layout::ScalarList { ty, .. } => SizeTerm::PerElement {
                    field: &f.name,
                    width: ty.width(),
                },
                Layout::NestedList { class, .. } => SizeTerm::ElementSum { field: &f.name, class },
            };
            terms.push(term);
        }
        Ok(terms)
    }

    /// Parent first; every term is evaluated even after a mismatch.
    pub fn equality_terms(&self) -> Vec<EqualityTerm<'_>> {
        let mut terms = Vec::with_capacity(self.fields.len() + 1);
        if let Some(p) = &self.parent {
            terms.push(EqualityTerm::Parent(p));
        }
        for f in &self.fields {
            terms.push(if f.layout.is_list() {
                EqualityTerm::Elements(f)
            } else {
                EqualityTerm::Value(f)
            });
        }
        terms
    }

    /// Sum of constant addends, when the class has no nested or variable parts of its own.
    pub fn own_fixed_size(&self) -> Option<usize> {
        let terms = self.size_terms().ok()?;
        terms.iter().try_fold(0usize, |acc, t| match t {
            SizeTerm::Bytes { bytes, .. } => Some(acc + bytes),
            SizeTerm::Parent(_) => Some(acc),
            _ => None,
        })
    }
}

/// Plan every class in declaration order.
pub fn plan_all(registry: &ClassRegistry) -> Vec<(String, Result<ClassPlan, GenError>)> {
    registry
        .iter()
        .map(|c| (c.name.clone(), ClassPlan::build(registry, c)))
        .collect()
}

fn plan_field(registry: &ClassRegistry, class: &SchemaClass, index: usize) -> Result<FieldPlan, GenError> {
    let field = &class.fields[index];
    let primitive = |type_name: &str| {
        PrimitiveType::from_schema_name(type_name).ok_or_else(|| GenError::UnknownPrimitive {
            class: class.name.clone(),
            field: field.name.clone(),
            type_name: type_name.to_string(),
        })
    };
    let known_class = |name: &str| {
        if registry.contains(name) {
            Ok(name.to_string())
        } else {
            Err(GenError::UnknownClass {
                class: class.name.clone(),
                field: field.name.clone(),
                name: name.to_string(),
            })
        }
    };

    let mut default = None;
    let mut could_be_string = false;
    let layout = match &field.kind {
        FieldKind::Primitive(p) => {
            let ty = primitive(&p.type_name)?;
            if let Some(text) = &p.default_value {
                default = Some(typed_literal(text, ty).ok_or_else(|| GenError::InvalidLiteral {
                    class: class.name.clone(),
                    field: field.name.clone(),
                    value: text.clone(),
                    type_name: p.type_name.clone(),
                })?);
            }
            match p.counted_list {
                None => Layout::Scalar(ty),
                Some(list_index) => {
                    let list = class
                        .fields
                        .get(list_index)
                        .filter(|l| matches!(l.kind, FieldKind::VariableList { .. }))
                        .ok_or_else(|| GenError::UnsupportedLayout {
                            class: class.name.clone(),
                            field: field.name.clone(),
                            reason: "dynamic length field is not linked to a variable list".to_string(),
                        })?;
                    Layout::LengthOf {
                        ty,
                        list: list.name.clone(),
                    }
                }
            }
        }
        FieldKind::ClassRef { class_name } => Layout::Nested {
            class: known_class(class_name)?,
        },
        FieldKind::FixedList {
            element,
            length,
            could_be_string: cbs,
        } => {
            could_be_string = *cbs;
            match element {
                ElementType::Primitive(t) => Layout::FixedScalars {
                    ty: primitive(t)?,
                    length: *length,
                },
                ElementType::Class(c) => Layout::FixedNested {
                    class: known_class(c)?,
                    length: *length,
                },
            }
        }
        FieldKind::VariableList {
            element,
            count_field,
            could_be_string: cbs,
        } => {
            could_be_string = *cbs;
            let count = count_source(registry, class, index, count_field)?;
            match element {
                ElementType::Primitive(t) => Layout::ScalarList {
                    ty: primitive(t)?,
                    count,
                },
                ElementType::Class(c) => Layout::NestedList {
                    class: known_class(c)?,
                    count,
                },
            }
        }
    };
    Ok(FieldPlan {
        name: field.name.clone(),
        comment: field.comment.clone(),
        layout,
        default,
        could_be_string,
    })
}

fn count_source(
    registry: &ClassRegistry,
    class: &SchemaClass,
    list_index: usize,
    count_field: &str,
) -> Result<CountSource, GenError> {
    let list_name = &class.fields[list_index].name;
    let layout_error = |reason: String| GenError::UnsupportedLayout {
        class: class.name.clone(),
        field: list_name.clone(),
        reason,
    };
    let (owner, field, depth) = registry
        .resolve_field(class, count_field)
        .ok_or_else(|| GenError::UnknownField {
            class: class.name.clone(),
            field: count_field.to_string(),
        })?;
    if depth == 0 {
        if let Some((i, _)) = class.field(count_field) {
            if i > list_index {
                return Err(layout_error(format!(
                    "count field `{}` is declared after the list",
                    count_field
                )));
            }
        }
    }
    let ty = field
        .as_primitive()
        .and_then(|p| p.primitive_type())
        .filter(|t| !t.is_float())
        .ok_or_else(|| layout_error(format!("count field `{}` is not an integer primitive", count_field)))?;
    Ok(CountSource {
        field: count_field.to_string(),
        owner: owner.name.clone(),
        depth,
        ty,
    })
}

fn check_inheritance(registry: &ClassRegistry, class: &SchemaClass) -> Result<(), GenError> {
    let mut seen = HashSet::new();
    seen.insert(class.name.as_str());
    let mut current = registry.parent_of(class);
    while let Some(c) = current {
        if !seen.insert(c.name.as_str()) {
            return Err(GenError::InheritanceCycle {
                class: class.name.clone(),
            });
        }
        current = registry.parent_of(c);
    }
    Ok(())
}

/// A class that embeds itself (through its parent, class references or fixed
/// lists, but not variable lists) has no finite wire layout.
fn check_embedding(registry: &ClassRegistry, class: &SchemaClass) -> Result<(), GenError> {
    let mut stack: Vec<(&str, String)> = embedded(class)
        .into_iter()
        .map(|(field, target)| (target, field.to_string()))
        .collect();
    let mut visited: HashSet<&str> = HashSet::new();
    while let Some((name, via)) = stack.pop() {
        if name == class.name {
            return Err(GenError::UnsupportedLayout {
                class: class.name.clone(),
                field: via,
                reason: format!("`{}` embeds itself without an intervening variable list", class.name),
            });
        }
        if !visited.insert(name) {
            continue;
        }
        if let Some(next) = registry.get(name) {
            stack.extend(embedded(next).into_iter().map(|(_, target)| (target, via.clone())));
        }
    }
    Ok(())
}

/// (field, class) pairs embedded by value in `class`; the parent counts as `inheritsFrom`.
fn embedded(class: &SchemaClass) -> Vec<(&str, &str)> {
    let mut out = Vec::new();
    if let Some(p) = class.parent_name() {
        out.push(("inheritsFrom", p));
    }
    for f in &class.fields {
        match &f.kind {
            FieldKind::ClassRef { class_name } => out.push((f.name.as_str(), class_name.as_str())),
            FieldKind::FixedList {
                element: ElementType::Class(c),
                ..
            } => out.push((f.name.as_str(), c.as_str())),
            _ => {}
        }
    }
    out
}

/// Parse and range-check literal text for `ty`. Integers are accepted for float types.
pub fn typed_literal(text: &str, ty: PrimitiveType) -> Option<Literal> {
    let lit = Literal::parse(text)?;
    if !lit.fits(ty) {
        return None;
    }
    Some(if ty.is_float() {
        Literal::Float(lit.as_f64())
    } else {
        lit
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_schema;

    const SCHEMA: &str = r#"<classes>
<class name="Pdu">
  <attribute name="kind"><primitive type="unsigned byte"/></attribute>
  <attribute name="length"><primitive type="unsigned short"/></attribute>
</class>
<class name="Vec3">
  <attribute name="x"><primitive type="float"/></attribute>
  <attribute name="y"><primitive type="float"/></attribute>
  <attribute name="z"><primitive type="float"/></attribute>
</class>
<class name="Entity" inheritsFrom="Pdu">
  <initialValue name="kind" value="1"/>
  <attribute name="position"><classRef name="Vec3"/></attribute>
  <attribute name="marking"><list type="fixed" length="4" couldBeString="true"><primitive type="byte"/></list></attribute>
  <attribute name="partCount"><primitive type="unsigned byte" defaultValue="0"/></attribute>
  <attribute name="parts"><list type="variable" countFieldName="partCount"><classRef name="Vec3"/></list></attribute>
  <attribute name="extra"><list type="variable" countFieldName="length"><primitive type="unsigned int"/></list></attribute>
</class>
<class name="Grid">
  <attribute name="cells"><list type="fixed" length="2"><classRef name="Vec3"/></list></attribute>
</class>
</classes>"#;

    fn registry() -> ClassRegistry {
        load_schema(SCHEMA).expect("load").schema.registry
    }

    #[test]
    fn resolves_layouts_and_count_sources() {
        let plan = ClassPlan::for_name(&registry(), "Entity").expect("plan");
        assert_eq!(plan.parent.as_deref(), Some("Pdu"));
        let layouts: Vec<&Layout> = plan.fields.iter().map(|f| &f.layout).collect();
        assert_eq!(layouts[0], &Layout::Nested { class: "Vec3".into() });
        assert_eq!(layouts[1], &Layout::FixedScalars { ty: PrimitiveType::I8, length: 4 });
        assert_eq!(
            layouts[2],
            &Layout::LengthOf {
                ty: PrimitiveType::U8,
                list: "parts".into()
            }
        );
        match layouts[4] {
            Layout::ScalarList { ty, count } => {
                assert_eq!(*ty, PrimitiveType::U32);
                assert_eq!(count.owner, "Pdu");
                assert_eq!(count.depth, 1);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(plan.fields[1].could_be_string);
        assert_eq!(plan.assignments.len(), 1);
        assert_eq!(plan.assignments[0].owner, "Pdu");
        assert_eq!(plan.assignments[0].ty, PrimitiveType::U8);
    }

    #[test]
    fn steps_start_with_parent() {
        let plan = ClassPlan::for_name(&registry(), "Entity").expect("plan");
        assert_eq!(plan.wire_steps()[0], WireStep::Parent("Pdu"));
        assert_eq!(plan.wire_steps().len(), 6);
        assert_eq!(plan.equality_terms()[0], EqualityTerm::Parent("Pdu"));
        let init = plan.init_steps();
        assert_eq!(init[0], InitStep::Parent("Pdu"));
        assert!(matches!(init.last(), Some(InitStep::Assign(a)) if a.field == "kind"));
        assert!(matches!(init[3], InitStep::Field(_, FieldInit::Default(PrimitiveType::U8, Literal::Int(0)))));
        let terms = plan.size_terms().expect("size");
        assert_eq!(terms[0], SizeTerm::Parent("Pdu"));
        assert_eq!(terms[2], SizeTerm::Bytes { field: "marking", bytes: 4 });
        assert_eq!(terms[5], SizeTerm::PerElement { field: "extra", width: 4 });
    }

    #[test]
    fn fixed_list_of_classes_has_no_size() {
        let plan = ClassPlan::for_name(&registry(), "Grid").expect("plan");
        assert!(matches!(
            plan.size_terms(),
            Err(GenError::UnsupportedLayout { ref field, .. }) if field == "cells"
        ));
        assert_eq!(plan.wire_steps().len(), 1);
    }

    #[test]
    fn own_fixed_size() {
        let r = registry();
        assert_eq!(ClassPlan::for_name(&r, "Vec3").expect("plan").own_fixed_size(), Some(12));
        assert_eq!(ClassPlan::for_name(&r, "Entity").expect("plan").own_fixed_size(), None);
    }

    #[test]
    fn self_embedding_is_rejected_but_lists_break_cycles() {
        let src = r#"<c>
<class name="A"><attribute name="b"><classRef name="B"/></attribute></class>
<class name="B"><attribute name="a"><classRef name="A"/></attribute></class>
<class name="Tree">
  <attribute name="n"><primitive type="unsigned short"/></attribute>
  <attribute name="children"><list type="variable" countFieldName="n"><classRef name="Tree"/></list></attribute>
</class>
<class name="Base"><attribute name="child"><classRef name="Derived"/></attribute></class>
<class name="Derived" inheritsFrom="Base"/>
</c>"#;
        let r = load_schema(src).expect("load").schema.registry;
        assert!(matches!(ClassPlan::for_name(&r, "A"), Err(GenError::UnsupportedLayout { .. })));
        assert!(ClassPlan::for_name(&r, "Tree").is_ok());
        assert!(matches!(ClassPlan::for_name(&r, "Derived"), Err(GenError::UnsupportedLayout { ref field, .. }) if field == "inheritsFrom"));
    }

    #[test]
    fn reference_errors_carry_context() {
        let src = r#"<c>
<class name="A">
  <attribute name="x"><primitive type="unsigned short" defaultValue="70000"/></attribute>
</class>
<class name="B"><initialValue name="ghost" value="1"/></class>
<class name="C"><attribute name="r"><classRef name="Nope"/></attribute></class>
</c>"#;
        let r = load_schema(src).expect("load").schema.registry;
        let err = ClassPlan::for_name(&r, "A").unwrap_err();
        assert_eq!(err.to_string(), "A.x: literal `70000` is not a valid `unsigned short`");
        assert!(matches!(ClassPlan::for_name(&r, "B"), Err(GenError::UnknownField { .. })));
        assert!(matches!(ClassPlan::for_name(&r, "C"), Err(GenError::UnknownClass { .. })));
    }

    #[test]
    fn typed_literals() {
        assert_eq!(typed_literal("3", PrimitiveType::F32), Some(Literal::Float(3.0)));
        assert_eq!(typed_literal("0xFF", PrimitiveType::U8), Some(Literal::Int(255)));
        assert_eq!(typed_literal("-1", PrimitiveType::U32), None);
        assert_eq!(typed_literal("1e100", PrimitiveType::F32), None);
        assert_eq!(typed_literal("1e100", PrimitiveType::F64), Some(Literal::Float(1e100)));
    }
}
