use crate::asn1::{ASN1Node, Content};
use crate::asn1_err;
use crate::asn1_types::ASN1Identifier;
use crate::der::{DERImplicitlyTaggable, DERParseable, DERSerializable, Serializer};
use crate::errors::{ASN1Error, ErrorCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ASN1Boolean(pub bool);

impl From<bool> for ASN1Boolean {
    fn from(b: bool) -> Self {
        ASN1Boolean(b)
    }
}

impl From<ASN1Boolean> for bool {
    fn from(val: ASN1Boolean) -> Self {
        val.0
    }
}

impl DERParseable for ASN1Boolean {
    fn from_der_node(node: ASN1Node) -> Result<Self, ASN1Error> {
        Self::from_der_node_with_identifier(node, ASN1Boolean::default_identifier())
    }
}

impl DERSerializable for ASN1Boolean {
    fn serialize(&self, serializer: &mut Serializer) -> Result<(), ASN1Error> {
        self.serialize_with_identifier(serializer, Self::default_identifier())
    }
}

impl DERImplicitlyTaggable for ASN1Boolean {
    fn default_identifier() -> ASN1Identifier {
        ASN1Identifier::BOOLEAN
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
                if bytes.len() != 1 {
                    return Err(asn1_err!(
                        ErrorCode::InvalidASN1Object,
                        "Boolean must have length 1"
                    ));
                }
                // Only the two canonical octets are acceptable.
                match bytes[0] {
                    0x00 => Ok(ASN1Boolean(false)),
                    0xFF => Ok(ASN1Boolean(true)),
                    _ => Err(asn1_err!(
                        ErrorCode::InvalidASN1Object,
                        "Boolean must be 0x00 or 0xFF in DER"
                    )),
                }
            }
            _ => Err(asn1_err!(
                ErrorCode::UnexpectedFieldType,
                "Boolean must be primitive"
            )),
        }
    }

    fn serialize_with_identifier(
        &self,
        serializer: &mut Serializer,
        identifier: ASN1Identifier,
    ) -> Result<(), ASN1Error> {
        serializer.append_primitive_node(identifier, |buf| {
            buf.extend_from_slice(&[if self.0 { 0xFF } else { 0x00 }]);
            Ok(())
        })
    }
}
