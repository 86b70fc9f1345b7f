//! Strict DER parsing and serialization.
//!
//! Decoding walks the input once into a flat, depth-tagged node buffer and
//! exposes it as a lazy tree of [`asn1::ASN1Node`] values; encoding streams
//! into a single buffer whose length prefixes are patched in place. BER
//! constructs (indefinite lengths, non-minimal encodings) are rejected.

pub mod asn1;
pub mod asn1_types;
pub mod der;
pub mod errors;
