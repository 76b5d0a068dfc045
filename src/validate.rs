//! Whole-schema consistency checks, run after loading and before generation.
//!
//! ## Checks
//!
//! - **Types**: primitive fields and primitive list elements use a known primitive;
//!   class references and class-typed list elements name a registered class.
//! - **Inheritance**: parents exist and chains end at `root` without cycles.
//! - **Initial values**: each target resolves on the class or an ancestor, targets a
//!   primitive, and the literal fits that primitive. `defaultValue` literals likewise.
//! - **Lists**: fixed lengths are positive; fixed lists hold primitives only;
//!   count fields resolve, are integer primitives and precede the list they count.
//! - **Fields**: names are unique within a class.
//!
//! Every check runs over every class; nothing stops at the first finding.
//! Diagnostics come out in class declaration order.

use crate::ast::{ClassRegistry, ElementType, FieldDef, FieldKind, Literal, PrimitiveType, SchemaClass};
use std::fmt;

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }
}

/// Identifies which check produced the diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    UnknownPrimitiveType,
    UnknownClassReference,
    UnresolvedInitialValue,
    UnknownParentClass,
    InheritanceCycle,
    /// List count field not found. A warning from the loader (same class only),
    /// an error from the validator (class and ancestors).
    UnresolvedCountFieldLink,
    CountFieldAfterList,
    InvalidCountField,
    InvalidListLength,
    InvalidLiteral,
    /// Fixed list of class-typed elements; its size cannot be generated.
    UnsupportedLayout,
    DuplicateField,
}

impl DiagnosticKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticKind::UnknownPrimitiveType => "UnknownPrimitiveType",
            DiagnosticKind::UnknownClassReference => "UnknownClassReference",
            DiagnosticKind::UnresolvedInitialValue => "UnresolvedInitialValue",
            DiagnosticKind::UnknownParentClass => "UnknownParentClass",
            DiagnosticKind::InheritanceCycle => "InheritanceCycle",
            DiagnosticKind::UnresolvedCountFieldLink => "UnresolvedCountFieldLink",
            DiagnosticKind::CountFieldAfterList => "CountFieldAfterList",
            DiagnosticKind::InvalidCountField => "InvalidCountField",
            DiagnosticKind::InvalidListLength => "InvalidListLength",
            DiagnosticKind::InvalidLiteral => "InvalidLiteral",
            DiagnosticKind::UnsupportedLayout => "UnsupportedLayout",
            DiagnosticKind::DuplicateField => "DuplicateField",
        }
    }
}

/// A single finding with class and field context.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub class: String,
    pub field: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn error(kind: DiagnosticKind, class: &str, field: Option<&str>, message: impl Into<String>) -> Self {
        Diagnostic {
            kind,
            severity: Severity::Error,
            class: class.to_string(),
            field: field.map(str::to_string),
            message: message.into(),
        }
    }

    pub fn warning(kind: DiagnosticKind, class: &str, field: Option<&str>, message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            ..Diagnostic::error(kind, class, field, message)
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// `class.field` or just `class`.
    pub fn location(&self) -> String {
        match &self.field {
            Some(f) => format!("{}.{}", self.class, f),
            None => self.class.clone(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} [{}] ({})",
            self.severity.as_str(),
            self.message,
            self.kind.as_str(),
            self.location()
        )
    }
}

/// True if any diagnostic is build-stopping.
pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}

/// Run every check over every class.
pub fn validate(registry: &ClassRegistry) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    for class in registry.iter() {
        check_inheritance(registry, class, &mut out);
        check_fields(registry, class, &mut out);
        check_lists(registry, class, &mut out);
        // Broken chains still resolve as far as they reach.
        check_initial_values(registry, class, &mut out);
    }
    out
}

fn check_inheritance(registry: &ClassRegistry, class: &SchemaClass, out: &mut Vec<Diagnostic>) {
    let Some(parent) = class.parent_name() else {
        return;
    };
    if !registry.contains(parent) {
        out.push(Diagnostic::error(
            DiagnosticKind::UnknownParentClass,
            &class.name,
            None,
            format!("parent class `{}` is not defined", parent),
        ));
        return;
    }
    let mut seen: Vec<&str> = vec![&class.name];
    let mut current = registry.parent_of(class);
    while let Some(c) = current {
        if seen.contains(&c.name.as_str()) {
            out.push(Diagnostic::error(
                DiagnosticKind::InheritanceCycle,
                &class.name,
                None,
                format!("inheritance chain loops back to `{}`", c.name),
            ));
            return;
        }
        seen.push(&c.name);
        current = registry.parent_of(c);
    }
}

fn check_fields(registry: &ClassRegistry, class: &SchemaClass, out: &mut Vec<Diagnostic>) {
    for (i, field) in class.fields.iter().enumerate() {
        if class.fields[..i].iter().any(|f| f.name == field.name) {
            out.push(Diagnostic::error(
                DiagnosticKind::DuplicateField,
                &class.name,
                Some(&field.name),
                format!("field `{}` is declared more than once", field.name),
            ));
        }
        match &field.kind {
            FieldKind::Primitive(p) => match p.primitive_type() {
                None => out.push(unknown_primitive(class, field, &p.type_name)),
                Some(ty) => {
                    if let Some(default) = &p.default_value {
                        if let Some(message) = literal_problem(default, ty) {
                            out.push(Diagnostic::error(
                                DiagnosticKind::InvalidLiteral,
                                &class.name,
                                Some(&field.name),
                                format!("defaultValue {}", message),
                            ));
                        }
                    }
                }
            },
            FieldKind::ClassRef { class_name } => {
                if !registry.contains(class_name) {
                    out.push(unknown_class(class, field, class_name));
                }
            }
            FieldKind::FixedList { element, .. } | FieldKind::VariableList { element, .. } => match element {
                ElementType::Primitive(t) => {
                    if PrimitiveType::from_schema_name(t).is_none() {
                        out.push(unknown_primitive(class, field, t));
                    }
                }
                ElementType::Class(c) => {
                    if !registry.contains(c) {
                        out.push(unknown_class(class, field, c));
                    }
                }
            },
        }
    }
}

fn check_lists(registry: &ClassRegistry, class: &SchemaClass, out: &mut Vec<Diagnostic>) {
    for (index, field) in class.fields.iter().enumerate() {
        match &field.kind {
            FieldKind::FixedList { element, length, .. } => {
                if *length == 0 {
                    out.push(Diagnostic::error(
                        DiagnosticKind::InvalidListLength,
                        &class.name,
                        Some(&field.name),
                        "fixed list length must be a positive integer",
                    ));
                }
                if let ElementType::Class(c) = element {
                    out.push(Diagnostic::error(
                        DiagnosticKind::UnsupportedLayout,
                        &class.name,
                        Some(&field.name),
                        format!("fixed list of class `{}` is not supported; use a variable list", c),
                    ));
                }
            }
            FieldKind::VariableList { count_field, .. } => {
                check_count_field(registry, class, index, field, count_field, out);
            }
            _ => {}
        }
    }
}

fn check_count_field(
    registry: &ClassRegistry,
    class: &SchemaClass,
    list_index: usize,
    list: &FieldDef,
    count_field: &str,
    out: &mut Vec<Diagnostic>,
) {
    let resolved = match class.field(count_field) {
        Some((i, _)) if i > list_index => {
            out.push(Diagnostic::error(
                DiagnosticKind::CountFieldAfterList,
                &class.name,
                Some(&list.name),
                format!("count field `{}` is declared after the list it counts", count_field),
            ));
            return;
        }
        Some((i, f)) => Some((f, Some(i))),
        None => registry
            .ancestors(class)
            .find_map(|c| c.field(count_field))
            .map(|(_, f)| (f, None)),
    };
    let Some((counter, own_index)) = resolved else {
        out.push(Diagnostic::error(
            DiagnosticKind::UnresolvedCountFieldLink,
            &class.name,
            Some(&list.name),
            format!("count field `{}` not found in class or its ancestors", count_field),
        ));
        return;
    };
    let integer = counter
        .as_primitive()
        .and_then(|p| p.primitive_type())
        .map(|t| !t.is_float())
        .unwrap_or(false);
    if !integer {
        out.push(Diagnostic::error(
            DiagnosticKind::InvalidCountField,
            &class.name,
            Some(&list.name),
            format!("count field `{}` must be an integer primitive", count_field),
        ));
        return;
    }
    if own_index.is_some() {
        if let Some(linked) = counter.as_primitive().and_then(|p| p.counted_list) {
            if linked != list_index {
                out.push(Diagnostic::error(
                    DiagnosticKind::InvalidCountField,
                    &class.name,
                    Some(&list.name),
                    format!("count field `{}` already counts another list", count_field),
                ));
            }
        }
    }
}

fn check_initial_values(registry: &ClassRegistry, class: &SchemaClass, out: &mut Vec<Diagnostic>) {
    for iv in &class.initial_values {
        let Some((_, field, _)) = registry.resolve_field(class, &iv.field) else {
            out.push(Diagnostic::error(
                DiagnosticKind::UnresolvedInitialValue,
                &class.name,
                Some(&iv.field),
                format!("initial value target `{}` not found in class or its ancestors", iv.field),
            ));
            continue;
        };
        let Some(p) = field.as_primitive() else {
            out.push(Diagnostic::error(
                DiagnosticKind::InvalidLiteral,
                &class.name,
                Some(&iv.field),
                "initial value targets a non-primitive field",
            ));
            continue;
        };
        // Unknown primitive types are reported on the owning field.
        if let Some(ty) = p.primitive_type() {
            if let Some(message) = literal_problem(&iv.value, ty) {
                out.push(Diagnostic::error(
                    DiagnosticKind::InvalidLiteral,
                    &class.name,
                    Some(&iv.field),
                    format!("initial value {}", message),
                ));
            }
        }
    }
}

fn literal_problem(text: &str, ty: PrimitiveType) -> Option<String> {
    match Literal::parse(text) {
        None => Some(format!("`{}` is not a numeric literal", text)),
        Some(lit) if !lit.fits(ty) => Some(format!("`{}` does not fit `{}`", text, ty.schema_name())),
        Some(_) => None,
    }
}

fn unknown_primitive(class: &SchemaClass, field: &FieldDef, type_name: &str) -> Diagnostic {
    Diagnostic::error(
        DiagnosticKind::UnknownPrimitiveType,
        &class.name,
        Some(&field.name),
        format!("unknown primitive type `{}`", type_name),
    )
}

fn unknown_class(class: &SchemaClass, field: &FieldDef, referenced: &str) -> Diagnostic {
    Diagnostic::error(
        DiagnosticKind::UnknownClassReference,
        &class.name,
        Some(&field.name),
        format!("class `{}` is not defined", referenced),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_schema;

    fn kinds(src: &str) -> Vec<DiagnosticKind> {
        let loaded = load_schema(src).expect("load");
        validate(&loaded.schema.registry).into_iter().map(|d| d.kind).collect()
    }

    #[test]
    fn clean_schema_has_no_findings() {
        let src = r#"<classes>
<class name="Header" inheritsFrom="root">
  <attribute name="kind"><primitive type="unsigned byte"/></attribute>
</class>
<class name="Body" inheritsFrom="Header">
  <initialValue name="kind" value="3"/>
  <attribute name="n"><primitive type="unsigned short"/></attribute>
  <attribute name="xs"><list type="variable" countFieldName="n"><primitive type="int"/></list></attribute>
</class>
</classes>"#;
        assert!(kinds(src).is_empty());
    }

    #[test]
    fn reports_every_reference_problem() {
        let src = r#"<classes>
<class name="X" inheritsFrom="root">
  <attribute name="a"><classRef name="Y"/></attribute>
  <attribute name="b"><primitive type="quad"/></attribute>
  <attribute name="c"><list type="variable" countFieldName="a"><classRef name="Z"/></list></attribute>
  <initialValue name="nope" value="1"/>
</class>
</classes>"#;
        let k = kinds(src);
        assert_eq!(
            k,
            vec![
                DiagnosticKind::UnknownClassReference,
                DiagnosticKind::UnknownPrimitiveType,
                DiagnosticKind::UnknownClassReference,
                DiagnosticKind::InvalidCountField,
                DiagnosticKind::UnresolvedInitialValue,
            ]
        );
    }

    #[test]
    fn rejects_fixed_list_of_classes_and_zero_length() {
        let src = r#"<classes>
<class name="P" inheritsFrom="root">
  <attribute name="v"><primitive type="float"/></attribute>
</class>
<class name="Q" inheritsFrom="root">
  <attribute name="ps"><list type="fixed" length="2"><classRef name="P"/></list></attribute>
  <attribute name="zs"><list type="fixed" length="0"><primitive type="byte"/></list></attribute>
</class>
</classes>"#;
        assert_eq!(
            kinds(src),
            vec![DiagnosticKind::UnsupportedLayout, DiagnosticKind::InvalidListLength]
        );
    }

    #[test]
    fn inherited_count_field_is_accepted() {
        let src = r#"<classes>
<class name="A" inheritsFrom="root">
  <attribute name="n"><primitive type="unsigned int"/></attribute>
</class>
<class name="B" inheritsFrom="A">
  <attribute name="xs"><list type="variable" countFieldName="n"><primitive type="double"/></list></attribute>
</class>
</classes>"#;
        assert!(kinds(src).is_empty());
    }

    #[test]
    fn count_field_after_list_and_float_count() {
        let src = r#"<classes>
<class name="A" inheritsFrom="root">
  <attribute name="xs"><list type="variable" countFieldName="n"><primitive type="byte"/></list></attribute>
  <attribute name="n"><primitive type="unsigned int"/></attribute>
  <attribute name="f"><primitive type="float"/></attribute>
  <attribute name="ys"><list type="variable" countFieldName="f"><primitive type="byte"/></list></attribute>
</class>
</classes>"#;
        assert_eq!(
            kinds(src),
            vec![DiagnosticKind::CountFieldAfterList, DiagnosticKind::InvalidCountField]
        );
    }

    #[test]
    fn float_defaults_must_fit_single_precision() {
        let src = r#"<classes>
<class name="Big" inheritsFrom="root">
  <attribute name="f"><primitive type="float" defaultValue="1e100"/></attribute>
  <attribute name="g"><primitive type="float" defaultValue="3.0e38"/></attribute>
  <attribute name="d"><primitive type="double" defaultValue="1e100"/></attribute>
  <initialValue name="g" value="-4e38"/>
</class>
</classes>"#;
        let diags = validate(&load_schema(src).expect("load").schema.registry);
        let found: Vec<_> = diags.iter().map(|d| (d.kind, d.location())).collect();
        assert_eq!(
            found,
            vec![
                (DiagnosticKind::InvalidLiteral, "Big.f".to_string()),
                (DiagnosticKind::InvalidLiteral, "Big.g".to_string()),
            ]
        );
    }

    #[test]
    fn parent_problems_and_literals() {
        let src = r#"<classes>
<class name="A" inheritsFrom="B"><attribute name="x"><primitive type="byte" defaultValue="300"/></attribute></class>
<class name="B" inheritsFrom="A"/>
<class name="C" inheritsFrom="Missing"/>
<class name="D" inheritsFrom="root">
  <attribute name="x"><primitive type="short"/></attribute>
  <attribute name="x"><primitive type="short"/></attribute>
  <initialValue name="x" value="1.5"/>
</class>
</classes>"#;
        let diags = validate(&load_schema(src).expect("load").schema.registry);
        let k: Vec<_> = diags.iter().map(|d| d.kind).collect();
        assert_eq!(
            k,
            vec![
                DiagnosticKind::InheritanceCycle,
                DiagnosticKind::InvalidLiteral,
                DiagnosticKind::InheritanceCycle,
                DiagnosticKind::UnknownParentClass,
                DiagnosticKind::DuplicateField,
                DiagnosticKind::InvalidLiteral,
            ]
        );
        assert!(has_errors(&diags));
        assert_eq!(diags[1].location(), "A.x");
        assert!(diags[1].to_string().starts_with("error: defaultValue `300` does not fit `byte`"));
    }
}
