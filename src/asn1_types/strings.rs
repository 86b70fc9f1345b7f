use crate::asn1::{ASN1Node, Content};
use crate::asn1_err;
use crate::asn1_types::ASN1Identifier;
use crate::der::{DERImplicitlyTaggable, DERParseable, DERSerializable, Serializer};
use crate::errors::{ASN1Error, ErrorCode};

macro_rules! impl_string_type {
    ($name:ident, $tag:expr, $validation:expr) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(s: String) -> Result<Self, ASN1Error> {
                if !($validation)(&s) {
                    return Err(asn1_err!(
                        ErrorCode::InvalidStringRepresentation,
                        "Invalid content for {}",
                        stringify!($name)
                    ));
                }
                Ok($name(s))
            }
        }

        impl From<$name> for String {
            fn from(val: $name) -> Self {
                val.0
            }
        }

        impl DERParseable for $name {
            fn from_der_node(node: ASN1Node) -> Result<Self, ASN1Error> {
                Self::from_der_node_with_identifier(node, $name::default_identifier())
            }
        }

        impl DERSerializable for $name {
            fn serialize(&self, serializer: &mut Serializer) -> Result<(), ASN1Error> {
                self.serialize_with_identifier(serializer, Self::default_identifier())
            }
        }

        impl DERImplicitlyTaggable for $name {
            fn default_identifier() -> ASN1Identifier {
                $tag
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
                        let s = String::from_utf8(bytes.to_vec()).map_err(|_| {
                            asn1_err!(ErrorCode::InvalidStringRepresentation, "Invalid UTF-8")
                        })?;
                        if !($validation)(&s) {
                            return Err(asn1_err!(
                                ErrorCode::InvalidStringRepresentation,
                                "Invalid content for {}",
                                stringify!($name)
                            ));
                        }
                        Ok($name(s))
                    }
                    _ => Err(asn1_err!(
                        ErrorCode::UnexpectedFieldType,
                        "{} must be primitive",
                        stringify!($name)
                    )),
                }
            }

            fn serialize_with_identifier(
                &self,
                serializer: &mut Serializer,
                identifier: ASN1Identifier,
            ) -> Result<(), ASN1Error> {
                serializer.append_primitive_node(identifier, |buf| {
                    buf.extend_from_slice(self.0.as_bytes());
                    Ok(())
                })
            }
        }
    };
}

impl_string_type!(ASN1UTF8String, ASN1Identifier::UTF8_STRING, |_s: &str| true); // UTF-8 check done by String::from_utf8
impl_string_type!(
    ASN1PrintableString,
    ASN1Identifier::PRINTABLE_STRING,
    |s: &str| {
        s.chars().all(|c| {
            c.is_ascii_alphanumeric()
                || matches!(
                    c,
                    ' ' | '\'' | '(' | ')' | '+' | ',' | '-' | '.' | '/' | ':' | '=' | '?'
                )
        })
    }
);
impl_string_type!(ASN1IA5String, ASN1Identifier::IA5_STRING, |s: &str| s
    .is_ascii());
impl_string_type!(
    ASN1NumericString,
    ASN1Identifier::NUMERIC_STRING,
    |s: &str| s.chars().all(|c| c.is_ascii_digit() || c == ' ')
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8_string_roundtrip() {
        let bytes = vec![0x0C, 0x05, b'H', b'e', b'l', b'l', b'o'];
        let val = ASN1UTF8String::from_der_bytes(&bytes).unwrap();
        assert_eq!(val.0, "Hello");

        let mut serializer = Serializer::new();
        serializer.serialize(&val).unwrap();
        assert_eq!(serializer.serialized_bytes(), bytes);
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        let err = ASN1UTF8String::from_der_bytes(&[0x0C, 0x01, 0xFF]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidStringRepresentation);
    }

    #[test]
    fn test_printable_string_alphabet() {
        assert!(ASN1PrintableString::new("ABC 123.-".to_string()).is_ok());
        assert!(ASN1PrintableString::new("user@example.com".to_string()).is_err());
    }

    #[test]
    fn test_numeric_string_alphabet() {
        assert!(ASN1NumericString::new("123 456".to_string()).is_ok());
        assert!(ASN1NumericString::new("123 A".to_string()).is_err());
    }

    #[test]
    fn test_ia5_string_alphabet() {
        assert!(ASN1IA5String::new("Hello".to_string()).is_ok());
        assert!(ASN1IA5String::new("Héllo".to_string()).is_err());
    }
}
