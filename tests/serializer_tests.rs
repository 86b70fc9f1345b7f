use strict_der::asn1_types::{ASN1Identifier, ASN1OctetString, TagClass};
use strict_der::der::{self, DERParseable, Serializer};

#[test]
fn test_long_form_length_boundaries() {
    for (content_len, expected_header) in [
        (0usize, vec![0x04, 0x00]),
        (127, vec![0x04, 0x7F]),
        (128, vec![0x04, 0x81, 0x80]),
        (255, vec![0x04, 0x81, 0xFF]),
        (256, vec![0x04, 0x82, 0x01, 0x00]),
        (65535, vec![0x04, 0x82, 0xFF, 0xFF]),
        (65536, vec![0x04, 0x83, 0x01, 0x00, 0x00]),
    ] {
        let mut serializer = Serializer::new();
        serializer
            .append_primitive_node(ASN1Identifier::OCTET_STRING, |buf| {
                buf.extend_from_slice(&vec![0x5A; content_len]);
                Ok(())
            })
            .unwrap();
        let out = serializer.serialized_bytes();
        assert_eq!(&out[..expected_header.len()], expected_header.as_slice());
        assert_eq!(out.len(), expected_header.len() + content_len);

        // Everything the serializer emits parses back.
        let val = ASN1OctetString::from_der_bytes(out.as_ref()).unwrap();
        assert_eq!(val.0.len(), content_len);
    }
}

#[test]
fn test_deeply_nested_constructed_writes() {
    // Each level wraps the next in an explicit tag; the innermost node
    // carries enough content that every enclosing length needs the long
    // form, exercising repeated in-place shifts.
    let mut serializer = Serializer::new();
    serializer
        .append_constructed_node(
            ASN1Identifier::explicit_tag(0, TagClass::ContextSpecific),
            |level0| {
                level0.append_constructed_node(
                    ASN1Identifier::explicit_tag(1, TagClass::ContextSpecific),
                    |level1| {
                        level1.append_primitive_node(ASN1Identifier::OCTET_STRING, |buf| {
                            buf.extend_from_slice(&vec![0x77; 200]);
                            Ok(())
                        })
                    },
                )
            },
        )
        .unwrap();

    let out = serializer.serialized_bytes();
    // inner: 04 81 C8 + 200, middle: A1 81 CB ..., outer: A0 81 CE ...
    assert_eq!(&out[0..3], &[0xA0, 0x81, 0xCE]);
    assert_eq!(&out[3..6], &[0xA1, 0x81, 0xCB]);
    assert_eq!(&out[6..9], &[0x04, 0x81, 0xC8]);
    assert_eq!(out.len(), 3 + 3 + 3 + 200);
    assert!(der::parse(out.as_ref()).is_ok());
}

#[test]
fn test_multiple_top_level_nodes_concatenate() {
    let mut serializer = Serializer::new();
    serializer.serialize(&1i64).unwrap();
    serializer.serialize(&true).unwrap();
    assert_eq!(
        serializer.serialized_bytes(),
        vec![0x02, 0x01, 0x01, 0x01, 0x01, 0xFF]
    );
}

#[test]
fn test_serialize_node_reemits_long_form_structure() {
    // Build a structure whose outer length is long-form, parse it, then
    // re-emit the parsed node; the bytes must match exactly.
    let mut serializer = Serializer::new();
    serializer
        .write_sequence(|seq| {
            for _ in 0..20 {
                seq.append_primitive_node(ASN1Identifier::OCTET_STRING, |buf| {
                    buf.extend_from_slice(&[0xEE; 8]);
                    Ok(())
                })?;
            }
            Ok(())
        })
        .unwrap();
    let bytes = serializer.serialized_bytes();
    assert_eq!(&bytes[0..3], &[0x30, 0x81, 0xC8]);

    let node = der::parse(bytes.as_ref()).unwrap();
    let mut reemit = Serializer::new();
    reemit.serialize_node(&node).unwrap();
    assert_eq!(reemit.serialized_bytes(), bytes);
}

#[test]
fn test_large_tag_number_roundtrip() {
    let identifier = ASN1Identifier::primitive(1000, TagClass::Private);
    let mut serializer = Serializer::new();
    serializer
        .append_primitive_node(identifier, |buf| {
            buf.extend_from_slice(&[0x01]);
            Ok(())
        })
        .unwrap();
    let out = serializer.serialized_bytes();
    // 1000 = 0x3E8 -> base-128 digits 0x87 0x68.
    assert_eq!(out.as_ref(), &[0xDF, 0x87, 0x68, 0x01, 0x01]);

    let node = der::parse(out.as_ref()).unwrap();
    assert_eq!(node.identifier, identifier);
}
