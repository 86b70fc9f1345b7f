use crate::asn1::{ASN1Node, Content};
use crate::asn1_err;
use crate::asn1_types::ASN1Identifier;
use crate::der::{DERImplicitlyTaggable, DERParseable, DERSerializable, Serializer};
use crate::errors::{ASN1Error, ErrorCode};

/// An ASN.1 GeneralizedTime in its canonical DER form
/// `YYYYMMDDHHMMSS[.f…]Z`.
///
/// The components are plain calendar fields; mapping to a platform clock
/// type is deliberately left to callers. Fields are private so every
/// mutation re-runs the range checks: a value that exists serializes to
/// valid DER.
///
/// Seconds run to 61 to tolerate leap seconds, so no total ordering is
/// defined on values of this type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeneralizedTime {
    year: u16,
    month: u8,
    day: u8,
    hours: u8,
    minutes: u8,
    seconds: u8,
    fractional_seconds: f64,
}

impl GeneralizedTime {
    pub fn new(
        year: u16,
        month: u8,
        day: u8,
        hours: u8,
        minutes: u8,
        seconds: u8,
        fractional_seconds: f64,
    ) -> Result<Self, ASN1Error> {
        let time = GeneralizedTime {
            year,
            month,
            day,
            hours,
            minutes,
            seconds,
            fractional_seconds,
        };
        time.validate()?;
        Ok(time)
    }

    pub fn year(&self) -> u16 {
        self.year
    }

    pub fn month(&self) -> u8 {
        self.month
    }

    pub fn day(&self) -> u8 {
        self.day
    }

    pub fn hours(&self) -> u8 {
        self.hours
    }

    pub fn minutes(&self) -> u8 {
        self.minutes
    }

    pub fn seconds(&self) -> u8 {
        self.seconds
    }

    pub fn fractional_seconds(&self) -> f64 {
        self.fractional_seconds
    }

    pub fn set_year(&mut self, year: u16) -> Result<(), ASN1Error> {
        self.replace(|time| time.year = year)
    }

    pub fn set_month(&mut self, month: u8) -> Result<(), ASN1Error> {
        self.replace(|time| time.month = month)
    }

    pub fn set_day(&mut self, day: u8) -> Result<(), ASN1Error> {
        self.replace(|time| time.day = day)
    }

    pub fn set_hours(&mut self, hours: u8) -> Result<(), ASN1Error> {
        self.replace(|time| time.hours = hours)
    }

    pub fn set_minutes(&mut self, minutes: u8) -> Result<(), ASN1Error> {
        self.replace(|time| time.minutes = minutes)
    }

    pub fn set_seconds(&mut self, seconds: u8) -> Result<(), ASN1Error> {
        self.replace(|time| time.seconds = seconds)
    }

    pub fn set_fractional_seconds(&mut self, fractional_seconds: f64) -> Result<(), ASN1Error> {
        self.replace(|time| time.fractional_seconds = fractional_seconds)
    }

    fn replace(&mut self, mutate: impl FnOnce(&mut GeneralizedTime)) -> Result<(), ASN1Error> {
        let mut candidate = *self;
        mutate(&mut candidate);
        candidate.validate()?;
        *self = candidate;
        Ok(())
    }

    fn validate(&self) -> Result<(), ASN1Error> {
        if self.year > 9999 {
            return Err(asn1_err!(
                ErrorCode::InvalidASN1Object,
                "GeneralizedTime year out of range: {}",
                self.year
            ));
        }
        if self.month < 1 || self.month > 12 {
            return Err(asn1_err!(
                ErrorCode::InvalidASN1Object,
                "GeneralizedTime month out of range: {}",
                self.month
            ));
        }
        let day_limit = days_in_month(self.month, self.year);
        if self.day < 1 || self.day > day_limit {
            return Err(asn1_err!(
                ErrorCode::InvalidASN1Object,
                "GeneralizedTime day out of range: {}",
                self.day
            ));
        }
        if self.hours > 23 {
            return Err(asn1_err!(
                ErrorCode::InvalidASN1Object,
                "GeneralizedTime hours out of range: {}",
                self.hours
            ));
        }
        if self.minutes > 59 {
            return Err(asn1_err!(
                ErrorCode::InvalidASN1Object,
                "GeneralizedTime minutes out of range: {}",
                self.minutes
            ));
        }
        // 60 and 61 are tolerated for leap seconds.
        if self.seconds > 61 {
            return Err(asn1_err!(
                ErrorCode::InvalidASN1Object,
                "GeneralizedTime seconds out of range: {}",
                self.seconds
            ));
        }
        if !(0.0..1.0).contains(&self.fractional_seconds) {
            return Err(asn1_err!(
                ErrorCode::InvalidASN1Object,
                "GeneralizedTime fractional seconds out of range: {}",
                self.fractional_seconds
            ));
        }
        Ok(())
    }

    fn canonical_string(&self) -> String {
        let mut text = format!(
            "{:04}{:02}{:02}{:02}{:02}{:02}",
            self.year, self.month, self.day, self.hours, self.minutes, self.seconds
        );
        if self.fractional_seconds > 0.0 {
            let formatted = format!("{}", self.fractional_seconds);
            // "0.xxx" -> ".xxx"
            text.push_str(&formatted[1..]);
        }
        text.push('Z');
        text
    }

    fn parse_canonical(text: &[u8]) -> Result<Self, ASN1Error> {
        // Shortest form is YYYYMMDDHHMMSSZ.
        if text.len() < 15 {
            return Err(asn1_err!(
                ErrorCode::InvalidStringRepresentation,
                "GeneralizedTime too short"
            ));
        }
        if text[text.len() - 1] != b'Z' {
            return Err(asn1_err!(
                ErrorCode::InvalidStringRepresentation,
                "GeneralizedTime must end with Z in DER"
            ));
        }

        let year = read_digits(text, 0, 4)?;
        let month = read_digits(text, 4, 2)?;
        let day = read_digits(text, 6, 2)?;
        let hours = read_digits(text, 8, 2)?;
        let minutes = read_digits(text, 10, 2)?;
        let seconds = read_digits(text, 12, 2)?;

        let fractional_seconds = match text.len() {
            15 => 0.0,
            _ => {
                if text[14] != b'.' {
                    return Err(asn1_err!(
                        ErrorCode::InvalidStringRepresentation,
                        "Malformed GeneralizedTime fractional seconds"
                    ));
                }
                let digits = &text[15..text.len() - 1];
                if digits.is_empty() {
                    return Err(asn1_err!(
                        ErrorCode::InvalidStringRepresentation,
                        "GeneralizedTime with bare fraction dot"
                    ));
                }
                // Canonical form has no trailing zeros.
                if digits[digits.len() - 1] == b'0' {
                    return Err(asn1_err!(
                        ErrorCode::InvalidStringRepresentation,
                        "GeneralizedTime fraction has trailing zeros"
                    ));
                }
                if digits.iter().any(|digit| !digit.is_ascii_digit()) {
                    return Err(asn1_err!(
                        ErrorCode::InvalidStringRepresentation,
                        "Malformed GeneralizedTime fractional seconds"
                    ));
                }
                // Parse the whole fraction at once so the closest f64 is
                // chosen, keeping text round-trips stable.
                let literal = format!(
                    "0.{}",
                    std::str::from_utf8(digits).map_err(|_| asn1_err!(
                        ErrorCode::InvalidStringRepresentation,
                        "Malformed GeneralizedTime fractional seconds"
                    ))?
                );
                literal.parse::<f64>().map_err(|_| {
                    asn1_err!(
                        ErrorCode::InvalidStringRepresentation,
                        "Malformed GeneralizedTime fractional seconds"
                    )
                })?
            }
        };

        GeneralizedTime::new(
            year as u16,
            month as u8,
            day as u8,
            hours as u8,
            minutes as u8,
            seconds as u8,
            fractional_seconds,
        )
    }
}

fn read_digits(text: &[u8], start: usize, count: usize) -> Result<u64, ASN1Error> {
    let mut value = 0u64;
    for index in start..start + count {
        let byte = text[index];
        if !byte.is_ascii_digit() {
            return Err(asn1_err!(
                ErrorCode::InvalidStringRepresentation,
                "Non-digit in GeneralizedTime field"
            ));
        }
        value = value * 10 + u64::from(byte - b'0');
    }
    Ok(value)
}

fn days_in_month(month: u8, year: u16) -> u8 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        _ => 0,
    }
}

fn is_leap_year(year: u16) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

impl DERParseable for GeneralizedTime {
    fn from_der_node(node: ASN1Node) -> Result<Self, ASN1Error> {
        Self::from_der_node_with_identifier(node, GeneralizedTime::default_identifier())
    }
}

impl DERSerializable for GeneralizedTime {
    fn serialize(&self, serializer: &mut Serializer) -> Result<(), ASN1Error> {
        self.serialize_with_identifier(serializer, Self::default_identifier())
    }
}

impl DERImplicitlyTaggable for GeneralizedTime {
    fn default_identifier() -> ASN1Identifier {
        ASN1Identifier::GENERALIZED_TIME
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
            Content::Primitive(bytes) => Self::parse_canonical(&bytes),
            _ => Err(asn1_err!(
                ErrorCode::UnexpectedFieldType,
                "GeneralizedTime must be primitive"
            )),
        }
    }

    fn serialize_with_identifier(
        &self,
        serializer: &mut Serializer,
        identifier: ASN1Identifier,
    ) -> Result<(), ASN1Error> {
        let text = self.canonical_string();
        serializer.append_primitive_node(identifier, |buf| {
            buf.extend_from_slice(text.as_bytes());
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::der;

    fn parse_text(text: &str) -> Result<GeneralizedTime, ASN1Error> {
        let mut bytes = vec![0x18, text.len() as u8];
        bytes.extend_from_slice(text.as_bytes());
        GeneralizedTime::from_der_bytes(&bytes)
    }

    #[test]
    fn test_basic_roundtrip() {
        let time = parse_text("20230101120000Z").unwrap();
        assert_eq!(time.year(), 2023);
        assert_eq!(time.month(), 1);
        assert_eq!(time.day(), 1);
        assert_eq!(time.hours(), 12);
        assert_eq!(time.minutes(), 0);
        assert_eq!(time.seconds(), 0);
        assert_eq!(time.fractional_seconds(), 0.0);

        let mut serializer = Serializer::new();
        serializer.serialize(&time).unwrap();
        let node = der::parse(serializer.serialized_bytes().as_ref()).unwrap();
        assert_eq!(GeneralizedTime::from_der_node(node).unwrap(), time);
    }

    #[test]
    fn test_fractional_seconds_roundtrip() {
        let time = parse_text("20230101120000.125Z").unwrap();
        assert_eq!(time.fractional_seconds(), 0.125);

        let mut serializer = Serializer::new();
        serializer.serialize(&time).unwrap();
        let expected: &[u8] = b"20230101120000.125Z";
        let out = serializer.serialized_bytes();
        assert_eq!(&out[2..], expected);
    }

    #[test]
    fn test_fraction_trailing_zero_rejected() {
        let err = parse_text("20230101120000.500Z").unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidStringRepresentation);
    }

    #[test]
    fn test_bare_fraction_dot_rejected() {
        let err = parse_text("20230101120000.Z").unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidStringRepresentation);
    }

    #[test]
    fn test_missing_z_rejected() {
        let err = parse_text("20230101120000").unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidStringRepresentation);
    }

    #[test]
    fn test_separators_rejected() {
        let err = parse_text("2023-01-01 12:00Z").unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidStringRepresentation);
    }

    #[test]
    fn test_leap_year_handling() {
        assert!(parse_text("20000229000000Z").is_ok());
        assert!(parse_text("19000229000000Z").is_err());
        assert!(parse_text("20200229000000Z").is_ok());
        assert!(parse_text("20210229000000Z").is_err());
    }

    #[test]
    fn test_field_ranges() {
        assert!(parse_text("20231301000000Z").is_err()); // month 13
        assert!(parse_text("20230432000000Z").is_err()); // April 32nd
        assert!(parse_text("20230101240000Z").is_err()); // hour 24
        assert!(parse_text("20230101126000Z").is_err()); // minute 60
        assert!(parse_text("20230101120061Z").is_ok()); // leap-second tolerant
        assert!(parse_text("20230101120062Z").is_err());
    }

    #[test]
    fn test_setters_revalidate() {
        let mut time = GeneralizedTime::new(2020, 2, 29, 0, 0, 0, 0.0).unwrap();
        // 2021 is not a leap year, so Feb 29 cannot survive.
        assert!(time.set_year(2021).is_err());
        assert_eq!(time.year(), 2020);

        assert!(time.set_day(28).is_ok());
        assert!(time.set_year(2021).is_ok());

        assert!(time.set_fractional_seconds(1.5).is_err());
        assert!(time.set_fractional_seconds(0.25).is_ok());
        assert!(time.set_seconds(62).is_err());
    }

    #[test]
    fn test_new_rejects_out_of_range() {
        assert!(GeneralizedTime::new(10000, 1, 1, 0, 0, 0, 0.0).is_err());
        assert!(GeneralizedTime::new(2023, 0, 1, 0, 0, 0, 0.0).is_err());
        assert!(GeneralizedTime::new(2023, 1, 0, 0, 0, 0, 0.0).is_err());
        assert!(GeneralizedTime::new(2023, 1, 1, 0, 0, 0, -0.5).is_err());
    }
}
