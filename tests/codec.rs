//! Wire contract through the plan interpreter: round trip, size agreement,
//! inheritance prefix and dynamic length sync.

use pdugen::codec::{Codec, CodecError, Endianness};
use pdugen::{load_schema, ClassRegistry, Object, Value};

const FOO: &str = r#"<classes>
<class name="Foo" xmlRootElement="true">
  <attribute name="count"><primitive type="unsigned short"/></attribute>
  <attribute name="items"><list type="variable" countFieldName="count"><primitive type="int"/></list></attribute>
</class>
</classes>"#;

const DIS: &str = r#"<classes>
<class name="PduHeader">
  <attribute name="protocolVersion"><primitive type="unsigned byte" defaultValue="7"/></attribute>
  <attribute name="pduType"><primitive type="unsigned byte"/></attribute>
  <attribute name="timestamp"><primitive type="unsigned int"/></attribute>
</class>
<class name="EntityId">
  <attribute name="site"><primitive type="unsigned short"/></attribute>
  <attribute name="entity"><primitive type="unsigned short"/></attribute>
</class>
<class name="Vector3">
  <attribute name="x"><primitive type="double"/></attribute>
  <attribute name="y"><primitive type="double"/></attribute>
  <attribute name="z"><primitive type="double"/></attribute>
</class>
<class name="Articulation">
  <attribute name="kind"><primitive type="short"/></attribute>
  <attribute name="value"><primitive type="float"/></attribute>
</class>
<class name="EntityStatePdu" inheritsFrom="PduHeader">
  <initialValue name="pduType" value="1"/>
  <attribute name="entityId"><classRef name="EntityId"/></attribute>
  <attribute name="articulationCount"><primitive type="unsigned byte"/></attribute>
  <attribute name="location"><classRef name="Vector3"/></attribute>
  <attribute name="marking"><list type="fixed" length="4" couldBeString="true"><primitive type="byte"/></list></attribute>
  <attribute name="articulations"><list type="variable" countFieldName="articulationCount"><classRef name="Articulation"/></list></attribute>
</class>
<class name="TaggedPdu" inheritsFrom="EntityStatePdu">
  <initialValue name="pduType" value="42"/>
  <attribute name="tags"><list type="variable" countFieldName="timestamp"><primitive type="unsigned short"/></list></attribute>
</class>
</classes>"#;

fn registry(src: &str) -> ClassRegistry {
    load_schema(src).expect("load").schema.registry
}

fn foo_with(items: &[i32]) -> (ClassRegistry, Object) {
    let reg = registry(FOO);
    let mut foo = Codec::new(&reg, Endianness::Big).instantiate("Foo").expect("instantiate");
    for i in items {
        assert!(foo.push("items", Value::I32(*i)));
    }
    (reg, foo)
}

fn entity_state(codec: &Codec<'_>) -> Object {
    let mut pdu = codec.instantiate("EntityStatePdu").expect("instantiate");
    pdu.set("timestamp", Value::U32(0x0102_0304));
    if let Some(id) = pdu.get_mut("entityId").and_then(Value::as_object_mut) {
        id.set("site", Value::U16(17));
        id.set("entity", Value::U16(4));
    }
    if let Some(loc) = pdu.get_mut("location").and_then(Value::as_object_mut) {
        loc.set("x", Value::Double(1.5));
        loc.set("z", Value::Double(-2.0));
    }
    pdu.set(
        "marking",
        Value::List(b"AB\0\0".iter().map(|b| Value::I8(*b as i8)).collect()),
    );
    for (kind, value) in [(3i16, 0.25f32), (-1, 9.0)] {
        let mut a = codec.instantiate("Articulation").expect("instantiate");
        a.set("kind", Value::I16(kind));
        a.set("value", Value::Float(value));
        pdu.push("articulations", Value::Object(a));
    }
    pdu
}

#[test]
fn foo_scenario() {
    let (reg, mut foo) = foo_with(&[7, 8, 9]);
    let codec = Codec::new(&reg, Endianness::Big);
    // Stored count is stale; the wire carries the live length.
    assert_eq!(foo.get("count"), Some(&Value::U16(0)));
    assert_eq!(codec.marshalled_size(&foo).unwrap(), 14);
    let bytes = codec.marshal(&foo).unwrap();
    assert_eq!(
        bytes,
        vec![0x00, 0x03, 0x00, 0x00, 0x00, 0x07, 0x00, 0x00, 0x00, 0x08, 0x00, 0x00, 0x00, 0x09]
    );

    let back = codec.unmarshal("Foo", &bytes).unwrap();
    assert_eq!(back.get("count"), Some(&Value::U16(3)));
    assert_eq!(
        back.list("items").unwrap(),
        &[Value::I32(7), Value::I32(8), Value::I32(9)]
    );
    assert!(codec.equals(&foo, &back).unwrap());

    foo.push("items", Value::I32(10));
    assert_eq!(codec.mismatches(&foo, &back).unwrap(), vec!["count", "items.len"]);
}

#[test]
fn empty_list_is_two_bytes() {
    let (reg, foo) = foo_with(&[]);
    let codec = Codec::new(&reg, Endianness::Big);
    assert_eq!(codec.marshal(&foo).unwrap(), vec![0, 0]);
    assert_eq!(codec.marshalled_size(&foo).unwrap(), 2);
}

#[test]
fn little_endian_codec() {
    let (reg, foo) = foo_with(&[1]);
    let codec = Codec::new(&reg, Endianness::Little);
    assert_eq!(codec.marshal(&foo).unwrap(), vec![1, 0, 1, 0, 0, 0]);
}

#[test]
fn round_trip_and_size_agree() {
    let reg = registry(DIS);
    let codec = Codec::new(&reg, Endianness::Big);
    let pdu = entity_state(&codec);
    let bytes = codec.marshal(&pdu).unwrap();
    // header 6, id 4, count 1, location 24, marking 4, articulations 2 * 6
    assert_eq!(bytes.len(), 51);
    assert_eq!(codec.marshalled_size(&pdu).unwrap(), bytes.len());

    let back = codec.unmarshal("EntityStatePdu", &bytes).unwrap();
    assert!(codec.equals(&pdu, &back).unwrap());
    assert_eq!(back.get("articulationCount"), Some(&Value::U8(2)));
    assert_eq!(codec.marshal(&back).unwrap(), bytes);
}

#[test]
fn initial_values_apply_to_ancestor_fields() {
    let reg = registry(DIS);
    let codec = Codec::new(&reg, Endianness::Big);
    let pdu = codec.instantiate("TaggedPdu").unwrap();
    assert_eq!(pdu.get("pduType"), Some(&Value::U8(42)));
    assert_eq!(pdu.get("protocolVersion"), Some(&Value::U8(7)));
    let parent = pdu.parent.as_deref().unwrap();
    assert_eq!(parent.get("pduType"), Some(&Value::U8(42)));
    assert_eq!(codec.instantiate("EntityStatePdu").unwrap().get("pduType"), Some(&Value::U8(1)));
}

#[test]
fn ancestor_bytes_come_first() {
    let reg = registry(DIS);
    let codec = Codec::new(&reg, Endianness::Big);
    let header = codec.instantiate("PduHeader").unwrap();
    let pdu = codec.instantiate("EntityStatePdu").unwrap();
    let mut header_of_pdu = header.clone();
    header_of_pdu.set("pduType", Value::U8(1));

    let full = codec.marshal(&pdu).unwrap();
    let prefix = codec.marshal(&header_of_pdu).unwrap();
    assert_eq!(&full[..prefix.len()], prefix.as_slice());
    assert_eq!(&full[..2], &[7, 1]);
}

#[test]
fn inherited_count_field_drives_unmarshal() {
    let reg = registry(DIS);
    let codec = Codec::new(&reg, Endianness::Big);
    let mut tagged = codec.instantiate("TaggedPdu").unwrap();
    tagged.set("timestamp", Value::U32(2));
    tagged.push("tags", Value::U16(0xBEEF));
    tagged.push("tags", Value::U16(0x0001));
    let bytes = codec.marshal(&tagged).unwrap();
    assert_eq!(&bytes[bytes.len() - 4..], &[0xBE, 0xEF, 0x00, 0x01]);
    assert_eq!(codec.marshalled_size(&tagged).unwrap(), bytes.len());

    let back = codec.unmarshal("TaggedPdu", &bytes).unwrap();
    assert_eq!(back.list("tags").map(|t| t.len()), Some(2));
    assert!(codec.equals(&tagged, &back).unwrap());
}

#[test]
fn trailing_bytes_are_left_alone() {
    let (reg, _) = foo_with(&[]);
    let codec = Codec::new(&reg, Endianness::Big);
    let mut obj = codec.instantiate("Foo").unwrap();
    let used = codec
        .unmarshal_into(&mut obj, &[0, 1, 0, 0, 0, 5, 0xFF, 0xFF])
        .unwrap();
    assert_eq!(used, 6);
    assert_eq!(obj.list("items").unwrap(), &[Value::I32(5)]);
}

#[test]
fn short_input_fails() {
    let (reg, _) = foo_with(&[]);
    let codec = Codec::new(&reg, Endianness::Big);
    assert!(matches!(codec.unmarshal("Foo", &[0]), Err(CodecError::Io(_))));
    // Count says 3, only one element present.
    assert!(matches!(
        codec.unmarshal("Foo", &[0, 3, 0, 0, 0, 1]),
        Err(CodecError::Io(_))
    ));
}

#[test]
fn dynamic_length_overflow_is_an_error() {
    let src = r#"<c><class name="Small">
  <attribute name="n"><primitive type="unsigned byte"/></attribute>
  <attribute name="xs"><list type="variable" countFieldName="n"><primitive type="unsigned byte"/></list></attribute>
</class></c>"#;
    let reg = registry(src);
    let codec = Codec::new(&reg, Endianness::Big);
    let mut obj = codec.instantiate("Small").unwrap();
    for _ in 0..256 {
        obj.push("xs", Value::U8(0));
    }
    assert!(matches!(
        codec.marshal(&obj),
        Err(CodecError::LengthOverflow { len: 256, .. })
    ));
}

#[test]
fn type_mismatch_is_reported() {
    let (reg, mut foo) = foo_with(&[1]);
    let codec = Codec::new(&reg, Endianness::Big);
    foo.set("items", Value::List(vec![Value::U8(1)]));
    assert!(matches!(codec.marshal(&foo), Err(CodecError::TypeMismatch { .. })));
    assert!(matches!(codec.instantiate("Nope"), Err(CodecError::UnknownClass(_))));
}

#[test]
fn nested_mismatch_paths() {
    let reg = registry(DIS);
    let codec = Codec::new(&reg, Endianness::Big);
    let a = entity_state(&codec);
    let mut b = a.clone();
    if let Some(loc) = b.get_mut("location").and_then(Value::as_object_mut) {
        loc.set("y", Value::Double(3.0));
    }
    if let Some(Value::List(arts)) = b.get_mut("articulations") {
        if let Some(first) = arts.get_mut(0).and_then(Value::as_object_mut) {
            first.set("kind", Value::I16(0));
        }
    }
    b.set("protocolVersion", Value::U8(6));
    assert_eq!(
        codec.mismatches(&a, &b).unwrap(),
        vec!["protocolVersion", "location.y", "articulations[0].kind"]
    );
}
