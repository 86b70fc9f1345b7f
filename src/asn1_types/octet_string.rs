use crate::asn1::{ASN1Node, Content};
use crate::asn1_err;
use crate::asn1_types::ASN1Identifier;
use crate::der::{DERImplicitlyTaggable, DERParseable, DERSerializable, Serializer};
use crate::errors::{ASN1Error, ErrorCode};
use bytes::Bytes;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ASN1OctetString(pub Bytes);

impl From<Vec<u8>> for ASN1OctetString {
    fn from(v: Vec<u8>) -> Self {
        ASN1OctetString(Bytes::from(v))
    }
}

impl From<&[u8]> for ASN1OctetString {
    fn from(v: &[u8]) -> Self {
        ASN1OctetString(Bytes::copy_from_slice(v))
    }
}

impl DERParseable for ASN1OctetString {
    fn from_der_node(node: ASN1Node) -> Result<Self, ASN1Error> {
        Self::from_der_node_with_identifier(node, ASN1OctetString::default_identifier())
    }
}

impl DERSerializable for ASN1OctetString {
    fn serialize(&self, serializer: &mut Serializer) -> Result<(), ASN1Error> {
        self.serialize_with_identifier(serializer, Self::default_identifier())
    }
}

impl DERImplicitlyTaggable for ASN1OctetString {
    fn default_identifier() -> ASN1Identifier {
        ASN1Identifier::OCTET_STRING
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
            Content::Primitive(bytes) => Ok(ASN1OctetString(bytes)),
            _ => Err(asn1_err!(
                ErrorCode::UnexpectedFieldType,
                "OCTET STRING must be primitive"
            )),
        }
    }

    fn serialize_with_identifier(
        &self,
        serializer: &mut Serializer,
        identifier: ASN1Identifier,
    ) -> Result<(), ASN1Error> {
        serializer.append_primitive_node(identifier, |buf| {
            buf.extend_from_slice(&self.0);
            Ok(())
        })
    }
}
