use crate::asn1::{ASN1Node, Content};
use crate::asn1_err;
use crate::asn1_types::ASN1Identifier;
use crate::der::{DERImplicitlyTaggable, DERParseable, DERSerializable, Serializer};
use crate::errors::{ASN1Error, ErrorCode};
use num_bigint::BigInt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ASN1Integer {
    pub value: BigInt,
}

impl From<i64> for ASN1Integer {
    fn from(v: i64) -> Self {
        ASN1Integer {
            value: BigInt::from(v),
        }
    }
}

impl From<BigInt> for ASN1Integer {
    fn from(v: BigInt) -> Self {
        ASN1Integer { value: v }
    }
}

impl DERParseable for ASN1Integer {
    fn from_der_node(node: ASN1Node) -> Result<Self, ASN1Error> {
        Self::from_der_node_with_identifier(node, ASN1Integer::default_identifier())
    }
}

impl DERSerializable for ASN1Integer {
    fn serialize(&self, serializer: &mut Serializer) -> Result<(), ASN1Error> {
        self.serialize_with_identifier(serializer, Self::default_identifier())
    }
}

impl DERImplicitlyTaggable for ASN1Integer {
    fn default_identifier() -> ASN1Identifier {
        ASN1Identifier::INTEGER
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
                if bytes.is_empty() {
                    return Err(asn1_err!(
                        ErrorCode::InvalidASN1Object,
                        "Integer with 0 bytes"
                    ));
                }

                // Minimal two's complement: a leading 0x00 is only valid to
                // clear the sign bit of the next octet, a leading 0xFF only
                // when the next octet's sign bit is unset.
                if bytes.len() > 1 {
                    let first = bytes[0];
                    let second = bytes[1];
                    if first == 0x00 && (second & 0x80) == 0 {
                        return Err(asn1_err!(
                            ErrorCode::InvalidASN1IntegerEncoding,
                            "Integer encoded with redundant leading zero"
                        ));
                    }
                    if first == 0xFF && (second & 0x80) == 0x80 {
                        return Err(asn1_err!(
                            ErrorCode::InvalidASN1IntegerEncoding,
                            "Integer encoded with redundant leading FF"
                        ));
                    }
                }

                Ok(ASN1Integer {
                    value: BigInt::from_signed_bytes_be(&bytes),
                })
            }
            _ => Err(asn1_err!(
                ErrorCode::UnexpectedFieldType,
                "Integer must be primitive"
            )),
        }
    }

    fn serialize_with_identifier(
        &self,
        serializer: &mut Serializer,
        identifier: ASN1Identifier,
    ) -> Result<(), ASN1Error> {
        serializer.append_primitive_node(identifier, |buf| {
            buf.extend_from_slice(&self.value.to_signed_bytes_be());
            Ok(())
        })
    }
}
