use crate::asn1::{ASN1Node, Content};
use crate::asn1_err;
use crate::asn1_types::ASN1Identifier;
use crate::der::{DERImplicitlyTaggable, DERParseable, DERSerializable, Serializer};
use crate::errors::{ASN1Error, ErrorCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ASN1Null;

impl DERParseable for ASN1Null {
    fn from_der_node(node: ASN1Node) -> Result<Self, ASN1Error> {
        Self::from_der_node_with_identifier(node, ASN1Null::default_identifier())
    }
}

impl DERSerializable for ASN1Null {
    fn serialize(&self, serializer: &mut Serializer) -> Result<(), ASN1Error> {
        self.serialize_with_identifier(serializer, Self::default_identifier())
    }
}

impl DERImplicitlyTaggable for ASN1Null {
    fn default_identifier() -> ASN1Identifier {
        ASN1Identifier::NULL
    }

    fn from_der_node_with_identifier(
        node: ASN1Node,
        identifier: ASN1Identifier,
    ) -> Result<Self, ASN1Error> {
        if node.identifier != identifier {
            return Err(asn1_err!(
                ErrorCode::UnexpectedFieldType,
                "Expected {}, got {}",
                identifier,
                node.identifier
            ));
        }
        match node.content {
            Content::Primitive(bytes) => {
                if !bytes.is_empty() {
                    return Err(asn1_err!(
                        ErrorCode::InvalidASN1Object,
                        "NULL must have 0 length"
                    ));
                }
                Ok(ASN1Null)
            }
            _ => Err(asn1_err!(
                ErrorCode::UnexpectedFieldType,
                "NULL must be primitive"
            )),
        }
    }

    fn serialize_with_identifier(
        &self,
        serializer: &mut Serializer,
        identifier: ASN1Identifier,
    ) -> Result<(), ASN1Error> {
        serializer.append_primitive_node(identifier, |_| Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_roundtrip() {
        let bytes = vec![0x05, 0x00];
        let val = ASN1Null::from_der_bytes(&bytes).unwrap();
        assert_eq!(val, ASN1Null);

        let mut serializer = Serializer::new();
        serializer.serialize(&val).unwrap();
        assert_eq!(serializer.serialized_bytes(), bytes);
    }

    #[test]
    fn test_null_with_content_rejected() {
        let err = ASN1Null::from_der_bytes(&[0x05, 0x01, 0x00]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidASN1Object);
    }
}
