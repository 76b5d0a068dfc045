//! Loader and validator behaviour on whole documents.

use pdugen::ast::{ElementType, FieldKind};
use pdugen::validate::{has_errors, validate};
use pdugen::{load_schema, DiagnosticKind, LoadError, Severity};

const CLEAN: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!-- sample -->
<classes>
  <java package="edu.nps.dis"/>
  <rust derives="Hash, Eq" imports="crate::util::Marking"/>
  <class name="PduHeader" comment="Common header &amp; type">
    <attribute name="protocolVersion"><primitive type="unsigned byte" defaultValue="7"/></attribute>
    <attribute name="pduType"><primitive type="unsigned byte"/></attribute>
  </class>
  <class name="Fire" inheritsFrom="PduHeader" xmlRootElement="true">
    <initialValue name="pduType" value="2"/>
    <attribute name="range"><primitive type="float" defaultValue="1.5"/></attribute>
    <attribute name="n"><primitive type="unsigned short"/></attribute>
    <attribute name="shots">
      <list type="variable" countFieldName="n"><classRef name="PduHeader"/></list>
    </attribute>
    <attribute name="marking"><list type="fixed" length="11" couldBeString="true"><primitive type="byte"/></list></attribute>
  </class>
</classes>"#;

#[test]
fn loads_complete_document() {
    let loaded = load_schema(CLEAN).expect("load");
    assert!(loaded.diagnostics.is_empty());
    let reg = &loaded.schema.registry;
    assert_eq!(reg.len(), 2);
    let names: Vec<&str> = reg.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["PduHeader", "Fire"]);

    let header = reg.get("PduHeader").unwrap();
    assert_eq!(header.comment.as_deref(), Some("Common header & type"));
    assert!(!header.has_parent());

    let fire = reg.get("Fire").unwrap();
    assert_eq!(fire.parent_name(), Some("PduHeader"));
    assert!(fire.xml_root_element);
    assert_eq!(fire.initial_values.len(), 1);
    assert!(fire.fields[1].is_dynamic_length());
    match &fire.fields[2].kind {
        FieldKind::VariableList { element, count_field, .. } => {
            assert_eq!(element, &ElementType::Class("PduHeader".into()));
            assert_eq!(count_field, "n");
        }
        other => panic!("unexpected {:?}", other),
    }
    match &fire.fields[3].kind {
        FieldKind::FixedList { length, could_be_string, .. } => {
            assert_eq!(*length, 11);
            assert!(*could_be_string);
        }
        other => panic!("unexpected {:?}", other),
    }

    let rust = loaded.schema.backend_config("rust");
    assert_eq!(rust.list("derives"), vec!["Hash", "Eq"]);
    assert_eq!(loaded.schema.backend_config("JAVA").get("package"), Some("edu.nps.dis"));

    assert!(validate(reg).is_empty());
}

#[test]
fn structural_errors_stop_loading() {
    let cases: Vec<(&str, fn(&LoadError) -> bool)> = vec![
        (
            r#"<c><class name="A"><attribute name="x"/></class></c>"#,
            |e| matches!(e, LoadError::MissingFieldType { .. }),
        ),
        (
            r#"<c><class name="A"><attribute name="x"><primitive type="int"/><primitive type="int"/></attribute></class></c>"#,
            |e| matches!(e, LoadError::MultipleFieldTypes { .. }),
        ),
        (
            r#"<c><class name="A"/><class name="A"/></c>"#,
            |e| matches!(e, LoadError::DuplicateClass { .. }),
        ),
        (
            r#"<c><class><attribute name="x"><primitive type="int"/></attribute></class></c>"#,
            |e| matches!(e, LoadError::MissingAttribute { .. }),
        ),
        (
            r#"<c><class name="A"><attribute name="x"><list type="sparse"><primitive type="int"/></list></attribute></class></c>"#,
            |e| matches!(e, LoadError::InvalidListType { .. }),
        ),
        (
            r#"<c><class name="A" xmlRootElement="yes"/></c>"#,
            |e| matches!(e, LoadError::InvalidBoolean { .. }),
        ),
        (
            r#"<c><class name="A"><primitive type="int"/></class></c>"#,
            |e| matches!(e, LoadError::UnexpectedElement { .. }),
        ),
        (r#"<c><class name="A"></c>"#, |e| matches!(e, LoadError::Markup(_))),
    ];
    for (src, check) in cases {
        let err = load_schema(src).unwrap_err();
        assert!(check(&err), "{} -> {:?}", src, err);
    }
}

#[test]
fn unknown_elements_are_ignored() {
    let src = r#"<c>
<class name="A">
  <documentation>free text</documentation>
  <attribute name="x"><primitive type="int"/><note/></attribute>
</class>
</c>"#;
    let loaded = load_schema(src).expect("load");
    assert_eq!(loaded.schema.registry.get("A").unwrap().fields.len(), 1);
}

#[test]
fn inherited_count_field_warns_at_load_and_validates() {
    let src = r#"<c>
<class name="Base"><attribute name="n"><primitive type="unsigned byte"/></attribute></class>
<class name="Derived" inheritsFrom="Base">
  <attribute name="xs"><list type="variable" countFieldName="n"><primitive type="int"/></list></attribute>
</class>
</c>"#;
    let loaded = load_schema(src).expect("load");
    assert_eq!(loaded.diagnostics.len(), 1);
    assert_eq!(loaded.diagnostics[0].severity, Severity::Warning);
    assert_eq!(loaded.diagnostics[0].kind, DiagnosticKind::UnresolvedCountFieldLink);
    assert!(validate(&loaded.schema.registry).is_empty());
}

#[test]
fn validator_reports_every_problem() {
    let src = r#"<c>
<class name="Orphan" inheritsFrom="Missing"/>
<class name="Loop1" inheritsFrom="Loop2"/>
<class name="Loop2" inheritsFrom="Loop1"/>
<class name="Bad">
  <initialValue name="ghost" value="1"/>
  <initialValue name="small" value="300"/>
  <attribute name="small"><primitive type="unsigned byte" defaultValue="-1"/></attribute>
  <attribute name="small"><primitive type="unsigned byte"/></attribute>
  <attribute name="weird"><primitive type="quad"/></attribute>
  <attribute name="ref"><classRef name="Nowhere"/></attribute>
  <attribute name="fixed"><list type="fixed" length="0"><primitive type="int"/></list></attribute>
  <attribute name="grid"><list type="fixed" length="2"><classRef name="Orphan"/></list></attribute>
  <attribute name="late"><list type="variable" countFieldName="after"><primitive type="int"/></list></attribute>
  <attribute name="after"><primitive type="int"/></attribute>
  <attribute name="f"><primitive type="float"/></attribute>
  <attribute name="byFloat"><list type="variable" countFieldName="f"><primitive type="int"/></list></attribute>
  <attribute name="lost"><list type="variable" countFieldName="nobody"><primitive type="int"/></list></attribute>
</class>
</c>"#;
    let loaded = load_schema(src).expect("load");
    let diags = validate(&loaded.schema.registry);
    assert!(has_errors(&diags));
    let found = |kind: DiagnosticKind, class: &str, field: Option<&str>| {
        diags
            .iter()
            .any(|d| d.kind == kind && d.class == class && d.field.as_deref() == field)
    };
    assert!(found(DiagnosticKind::UnknownParentClass, "Orphan", None));
    assert!(found(DiagnosticKind::InheritanceCycle, "Loop1", None));
    assert!(found(DiagnosticKind::InheritanceCycle, "Loop2", None));
    assert!(found(DiagnosticKind::UnresolvedInitialValue, "Bad", Some("ghost")));
    assert!(found(DiagnosticKind::InvalidLiteral, "Bad", Some("small")));
    assert!(found(DiagnosticKind::DuplicateField, "Bad", Some("small")));
    assert!(found(DiagnosticKind::UnknownPrimitiveType, "Bad", Some("weird")));
    assert!(found(DiagnosticKind::UnknownClassReference, "Bad", Some("ref")));
    assert!(found(DiagnosticKind::InvalidListLength, "Bad", Some("fixed")));
    assert!(found(DiagnosticKind::UnsupportedLayout, "Bad", Some("grid")));
    assert!(found(DiagnosticKind::CountFieldAfterList, "Bad", Some("late")));
    assert!(found(DiagnosticKind::InvalidCountField, "Bad", Some("byFloat")));
    assert!(found(DiagnosticKind::UnresolvedCountFieldLink, "Bad", Some("lost")));
    assert!(diags.iter().all(|d| d.severity == Severity::Error));

    let shown = diags
        .iter()
        .find(|d| d.kind == DiagnosticKind::UnknownClassReference)
        .unwrap()
        .to_string();
    assert_eq!(
        shown,
        "error: class `Nowhere` is not defined [UnknownClassReference] (Bad.ref)"
    );
}
