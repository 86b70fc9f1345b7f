mod bit_string;
mod boolean;
mod generalized_time;
mod identifier;
mod integer;
mod null;
mod octet_string;
mod strings;

pub use bit_string::ASN1BitString;
pub use boolean::ASN1Boolean;
pub use generalized_time::GeneralizedTime;
pub use identifier::{ASN1Identifier, TagClass};
pub use integer::ASN1Integer;
pub use null::ASN1Null;
pub use octet_string::ASN1OctetString;
pub use strings::{ASN1IA5String, ASN1NumericString, ASN1PrintableString, ASN1UTF8String};
