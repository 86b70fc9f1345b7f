use crate::asn1::{ASN1Node, Content};
use crate::asn1_err;
use crate::asn1_types::ASN1Identifier;
use crate::der::{DERImplicitlyTaggable, DERParseable, DERSerializable, Serializer};
use crate::errors::{ASN1Error, ErrorCode};
use bytes::Bytes;

/// An ASN.1 BIT STRING: value octets plus the count of unused low bits in
/// the final octet.
///
/// The fields are kept private so that every mutation re-validates the
/// padding invariants; a value that exists can always be serialized to
/// valid DER.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ASN1BitString {
    bytes: Bytes,
    padding_bits: u8,
}

impl ASN1BitString {
    /// Panics if `padding_bits > 7`; that is a caller bug, not a data
    /// error. Violations of the padding invariants on otherwise in-range
    /// input are reported as `InvalidASN1Object`.
    pub fn new(bytes: Bytes, padding_bits: u8) -> Result<Self, ASN1Error> {
        assert!(padding_bits <= 7, "padding bits must be in 0..=7");
        Self::validate(&bytes, padding_bits)?;
        Ok(ASN1BitString {
            bytes,
            padding_bits,
        })
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn padding_bits(&self) -> u8 {
        self.padding_bits
    }

    pub fn set_bytes(&mut self, bytes: Bytes) -> Result<(), ASN1Error> {
        Self::validate(&bytes, self.padding_bits)?;
        self.bytes = bytes;
        Ok(())
    }

    /// Panics if `padding_bits > 7`.
    pub fn set_padding_bits(&mut self, padding_bits: u8) -> Result<(), ASN1Error> {
        assert!(padding_bits <= 7, "padding bits must be in 0..=7");
        Self::validate(&self.bytes, padding_bits)?;
        self.padding_bits = padding_bits;
        Ok(())
    }

    fn validate(bytes: &Bytes, padding_bits: u8) -> Result<(), ASN1Error> {
        if bytes.is_empty() && padding_bits != 0 {
            return Err(asn1_err!(
                ErrorCode::InvalidASN1Object,
                "Empty BIT STRING must have 0 padding bits"
            ));
        }
        if !bytes.is_empty() {
            let last = bytes[bytes.len() - 1];
            let mask = (1u8 << padding_bits) - 1;
            if (last & mask) != 0 {
                return Err(asn1_err!(
                    ErrorCode::InvalidASN1Object,
                    "BIT STRING unused bits must be zero"
                ));
            }
        }
        Ok(())
    }
}

impl DERParseable for ASN1BitString {
    fn from_der_node(node: ASN1Node) -> Result<Self, ASN1Error> {
        Self::from_der_node_with_identifier(node, ASN1BitString::default_identifier())
    }
}

impl DERSerializable for ASN1BitString {
    fn serialize(&self, serializer: &mut Serializer) -> Result<(), ASN1Error> {
        self.serialize_with_identifier(serializer, Self::default_identifier())
    }
}

impl DERImplicitlyTaggable for ASN1BitString {
    fn default_identifier() -> ASN1Identifier {
        ASN1Identifier::BIT_STRING
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
                        "Empty BIT STRING content (missing padding byte)"
                    ));
                }
                let padding_bits = bytes[0];
                if padding_bits > 7 {
                    return Err(asn1_err!(
                        ErrorCode::InvalidASN1Object,
                        "Invalid padding bits in BIT STRING"
                    ));
                }

                let data = bytes.slice(1..);
                Self::validate(&data, padding_bits)?;

                Ok(ASN1BitString {
                    bytes: data,
                    padding_bits,
                })
            }
            _ => Err(asn1_err!(
                ErrorCode::UnexpectedFieldType,
                "BIT STRING must be primitive"
            )),
        }
    }

    fn serialize_with_identifier(
        &self,
        serializer: &mut Serializer,
        identifier: ASN1Identifier,
    ) -> Result<(), ASN1Error> {
        serializer.append_primitive_node(identifier, |buf| {
            buf.extend_from_slice(&[self.padding_bits]);
            buf.extend_from_slice(&self.bytes);
            Ok(())
        })
    }
}
