use crate::asn1::{
    minimal_octet_len, ASN1Node, ASN1NodeCollection, ASN1NodeCollectionIterator, Content,
    ParseResult,
};
use crate::asn1_err;
use crate::asn1_types::{ASN1Boolean, ASN1Identifier, ASN1Integer, ASN1UTF8String, TagClass};
use crate::errors::{ASN1Error, ErrorCode};
use bytes::{BufMut, Bytes, BytesMut};
use num_bigint::BigInt;
use num_traits::ToPrimitive;

/// A type that can be decoded from a parsed node.
pub trait DERParseable: Sized {
    fn from_der_node(node: ASN1Node) -> Result<Self, ASN1Error>;

    fn from_der_iterator(iter: &mut ASN1NodeCollectionIterator) -> Result<Self, ASN1Error> {
        let node = iter.next().ok_or_else(|| {
            asn1_err!(
                ErrorCode::InvalidASN1Object,
                "Unable to decode {}, no ASN.1 nodes to decode",
                std::any::type_name::<Self>()
            )
        })?;
        Self::from_der_node(node)
    }

    fn from_der_bytes(bytes: &[u8]) -> Result<Self, ASN1Error> {
        let node = parse(bytes)?;
        Self::from_der_node(node)
    }
}

/// A type that can write itself into a [`Serializer`].
pub trait DERSerializable {
    fn serialize(&self, serializer: &mut Serializer) -> Result<(), ASN1Error>;
}

/// A type whose tag can be replaced in place (implicit tagging). The
/// default parse and serialize paths route through `default_identifier`.
pub trait DERImplicitlyTaggable: DERParseable + DERSerializable {
    fn default_identifier() -> ASN1Identifier;

    fn from_der_node_with_identifier(
        node: ASN1Node,
        identifier: ASN1Identifier,
    ) -> Result<Self, ASN1Error>;

    fn serialize_with_identifier(
        &self,
        serializer: &mut Serializer,
        identifier: ASN1Identifier,
    ) -> Result<(), ASN1Error>;
}

// DER namespace functions

pub fn parse(data: &[u8]) -> Result<ASN1Node, ASN1Error> {
    let bytes = Bytes::copy_from_slice(data);
    let result = ParseResult::parse(bytes)?;

    let first = result
        .nodes
        .first()
        .ok_or_else(|| asn1_err!(ErrorCode::InvalidASN1Object, "No ASN.1 nodes parsed"))?
        .clone();

    let nodes_arc = std::sync::Arc::new(result.nodes);
    let root_depth = first.depth;

    // Verify single root
    let end_index = nodes_arc
        .iter()
        .enumerate()
        .skip(1)
        .find(|(_, node)| node.depth <= root_depth)
        .map(|(idx, _)| idx)
        .unwrap_or(nodes_arc.len());

    if end_index != nodes_arc.len() {
        return Err(asn1_err!(
            ErrorCode::InvalidASN1Object,
            "ASN1ParseResult unexpectedly allowed multiple root nodes"
        ));
    }

    if first.identifier.constructed {
        let collection = ASN1NodeCollection::new(nodes_arc, 1..end_index, root_depth);
        Ok(ASN1Node {
            identifier: first.identifier,
            content: Content::Constructed(collection),
            encoded_bytes: first.encoded_bytes,
        })
    } else {
        Ok(ASN1Node {
            identifier: first.identifier,
            content: Content::Primitive(first.data_bytes.unwrap()),
            encoded_bytes: first.encoded_bytes,
        })
    }
}

/// Decodes a constructed node as a SEQUENCE body. The builder receives the
/// child iterator and must consume every child.
pub fn sequence<T, F>(
    node: ASN1Node,
    identifier: ASN1Identifier,
    builder: F,
) -> Result<T, ASN1Error>
where
    F: FnOnce(&mut ASN1NodeCollectionIterator) -> Result<T, ASN1Error>,
{
    if node.identifier != identifier {
        return Err(asn1_err!(
            ErrorCode::UnexpectedFieldType,
            "{}",
            node.identifier
        ));
    }
    match node.content {
        Content::Constructed(collection) => {
            let mut iter = collection.into_iter();
            let result = builder(&mut iter)?;
            if iter.next().is_some() {
                return Err(asn1_err!(
                    ErrorCode::InvalidASN1Object,
                    "Unconsumed sequence nodes"
                ));
            }
            Ok(result)
        }
        _ => Err(asn1_err!(
            ErrorCode::UnexpectedFieldType,
            "{}",
            node.identifier
        )),
    }
}

/// Decodes a SET body. Parsing is identical to [`sequence`]; DER canonical
/// SET ordering is not checked here, callers that need it must validate the
/// child order themselves.
pub fn set<T, F>(node: ASN1Node, identifier: ASN1Identifier, builder: F) -> Result<T, ASN1Error>
where
    F: FnOnce(&mut ASN1NodeCollectionIterator) -> Result<T, ASN1Error>,
{
    sequence(node, identifier, builder)
}

pub fn sequence_of<T: DERParseable>(
    identifier: ASN1Identifier,
    root_node: ASN1Node,
) -> Result<Vec<T>, ASN1Error> {
    if root_node.identifier != identifier {
        return Err(asn1_err!(
            ErrorCode::UnexpectedFieldType,
            "{}",
            root_node.identifier
        ));
    }
    match root_node.content {
        Content::Constructed(collection) => {
            collection.into_iter().map(|n| T::from_der_node(n)).collect()
        }
        _ => Err(asn1_err!(
            ErrorCode::UnexpectedFieldType,
            "{}",
            root_node.identifier
        )),
    }
}

pub fn sequence_of_from_iterator<T: DERParseable>(
    identifier: ASN1Identifier,
    iter: &mut ASN1NodeCollectionIterator,
) -> Result<Vec<T>, ASN1Error> {
    let node = iter.next().ok_or_else(|| {
        asn1_err!(
            ErrorCode::InvalidASN1Object,
            "No ASN.1 node for SEQUENCE OF"
        )
    })?;
    sequence_of(identifier, node)
}

/// Unwraps an explicit-tag node: a constructed wrapper that must contain
/// exactly one child, which is handed to the builder.
pub fn explicitly_tagged<T, F>(
    node: ASN1Node,
    tag_number: u64,
    tag_class: TagClass,
    builder: F,
) -> Result<T, ASN1Error>
where
    F: FnOnce(ASN1Node) -> Result<T, ASN1Error>,
{
    let expected = ASN1Identifier::explicit_tag(tag_number, tag_class);
    if node.identifier != expected {
        return Err(asn1_err!(
            ErrorCode::InvalidFieldIdentifier,
            "Expected {}, got {}",
            expected,
            node.identifier
        ));
    }
    match node.content {
        Content::Constructed(collection) => {
            let mut iter = collection.into_iter();
            let child = iter.next().ok_or_else(|| {
                asn1_err!(
                    ErrorCode::InvalidASN1Object,
                    "Explicitly tagged field with no inner node"
                )
            })?;
            if iter.next().is_some() {
                return Err(asn1_err!(
                    ErrorCode::InvalidASN1Object,
                    "Explicitly tagged field with more than one inner node"
                ));
            }
            builder(child)
        }
        _ => Err(asn1_err!(
            ErrorCode::InvalidASN1Object,
            "Explicitly tagged field must be constructed"
        )),
    }
}

pub fn explicitly_tagged_from_iterator<T, F>(
    iter: &mut ASN1NodeCollectionIterator,
    tag_number: u64,
    tag_class: TagClass,
    builder: F,
) -> Result<T, ASN1Error>
where
    F: FnOnce(ASN1Node) -> Result<T, ASN1Error>,
{
    let node = iter.next().ok_or_else(|| {
        asn1_err!(
            ErrorCode::InvalidASN1Object,
            "No ASN.1 node for explicitly tagged field"
        )
    })?;
    explicitly_tagged(node, tag_number, tag_class, builder)
}

/// Like [`explicitly_tagged_from_iterator`] for OPTIONAL fields: the next
/// child is consumed only when its tag matches; on absence or mismatch the
/// iterator is left untouched and `None` is returned.
pub fn optional_explicitly_tagged<T, F>(
    iter: &mut ASN1NodeCollectionIterator,
    tag_number: u64,
    tag_class: TagClass,
    builder: F,
) -> Result<Option<T>, ASN1Error>
where
    F: FnOnce(ASN1Node) -> Result<T, ASN1Error>,
{
    let expected = ASN1Identifier::explicit_tag(tag_number, tag_class);
    match iter.peek() {
        None => Ok(None),
        Some(node) if node.identifier != expected => Ok(None),
        Some(_) => {
            let node = iter.next().expect("peeked node must exist");
            explicitly_tagged(node, tag_number, tag_class, builder).map(Some)
        }
    }
}

pub fn optional_implicitly_tagged<T: DERImplicitlyTaggable>(
    iter: &mut ASN1NodeCollectionIterator,
) -> Result<Option<T>, ASN1Error> {
    optional_implicitly_tagged_with_identifier(iter, T::default_identifier())
}

pub fn optional_implicitly_tagged_with_identifier<T: DERImplicitlyTaggable>(
    iter: &mut ASN1NodeCollectionIterator,
    identifier: ASN1Identifier,
) -> Result<Option<T>, ASN1Error> {
    match iter.peek() {
        None => Ok(None),
        Some(node) if node.identifier != identifier => Ok(None),
        Some(_) => {
            let node = iter.next().expect("peeked node must exist");
            T::from_der_node_with_identifier(node, identifier).map(Some)
        }
    }
}

/// Decodes a field with a DEFAULT. On absence or tag mismatch the default
/// is returned. DER forbids encoding a DEFAULT field at its default state,
/// so a present value equal to the default is rejected.
pub fn decode_default<T, F>(
    iter: &mut ASN1NodeCollectionIterator,
    identifier: ASN1Identifier,
    default: T,
    builder: F,
) -> Result<T, ASN1Error>
where
    T: PartialEq,
    F: FnOnce(ASN1Node) -> Result<T, ASN1Error>,
{
    match iter.peek() {
        None => return Ok(default),
        Some(node) if node.identifier != identifier => return Ok(default),
        Some(_) => {}
    }
    let node = iter.next().expect("peeked node must exist");
    let value = builder(node)?;
    if value == default {
        return Err(asn1_err!(
            ErrorCode::InvalidASN1Object,
            "DEFAULT field explicitly encoded at its default value"
        ));
    }
    Ok(value)
}

pub fn decode_default_explicitly_tagged<T, F>(
    iter: &mut ASN1NodeCollectionIterator,
    tag_number: u64,
    tag_class: TagClass,
    default: T,
    builder: F,
) -> Result<T, ASN1Error>
where
    T: PartialEq,
    F: FnOnce(ASN1Node) -> Result<T, ASN1Error>,
{
    match optional_explicitly_tagged(iter, tag_number, tag_class, builder)? {
        None => Ok(default),
        Some(value) if value == default => Err(asn1_err!(
            ErrorCode::InvalidASN1Object,
            "DEFAULT field explicitly encoded at its default value"
        )),
        Some(value) => Ok(value),
    }
}

// Primitive implementations

impl DERParseable for bool {
    fn from_der_node(node: ASN1Node) -> Result<Self, ASN1Error> {
        <Self as DERImplicitlyTaggable>::from_der_node_with_identifier(
            node,
            <Self as DERImplicitlyTaggable>::default_identifier(),
        )
    }
}

impl DERSerializable for bool {
    fn serialize(&self, serializer: &mut Serializer) -> Result<(), ASN1Error> {
        ASN1Boolean::from(*self).serialize(serializer)
    }
}

impl DERImplicitlyTaggable for bool {
    fn default_identifier() -> ASN1Identifier {
        ASN1Identifier::BOOLEAN
    }

    fn from_der_node_with_identifier(
        node: ASN1Node,
        identifier: ASN1Identifier,
    ) -> Result<Self, ASN1Error> {
        ASN1Boolean::from_der_node_with_identifier(node, identifier).map(|b| b.0)
    }

    fn serialize_with_identifier(
        &self,
        serializer: &mut Serializer,
        identifier: ASN1Identifier,
    ) -> Result<(), ASN1Error> {
        ASN1Boolean::from(*self).serialize_with_identifier(serializer, identifier)
    }
}

impl DERParseable for String {
    fn from_der_node(node: ASN1Node) -> Result<Self, ASN1Error> {
        <Self as DERImplicitlyTaggable>::from_der_node_with_identifier(
            node,
            <Self as DERImplicitlyTaggable>::default_identifier(),
        )
    }
}

impl DERSerializable for String {
    fn serialize(&self, serializer: &mut Serializer) -> Result<(), ASN1Error> {
        ASN1UTF8String(self.clone()).serialize(serializer)
    }
}

impl DERImplicitlyTaggable for String {
    fn default_identifier() -> ASN1Identifier {
        ASN1Identifier::UTF8_STRING
    }

    fn from_der_node_with_identifier(
        node: ASN1Node,
        identifier: ASN1Identifier,
    ) -> Result<Self, ASN1Error> {
        ASN1UTF8String::from_der_node_with_identifier(node, identifier).map(|s| s.0)
    }

    fn serialize_with_identifier(
        &self,
        serializer: &mut Serializer,
        identifier: ASN1Identifier,
    ) -> Result<(), ASN1Error> {
        ASN1UTF8String(self.clone()).serialize_with_identifier(serializer, identifier)
    }
}

macro_rules! impl_der_for_fixed_width_int {
    ($($ty:ty => $to_method:ident),+ $(,)?) => {
        $(
            impl DERParseable for $ty {
                fn from_der_node(node: ASN1Node) -> Result<Self, ASN1Error> {
                    <Self as DERImplicitlyTaggable>::from_der_node_with_identifier(
                        node,
                        <Self as DERImplicitlyTaggable>::default_identifier(),
                    )
                }
            }

            impl DERSerializable for $ty {
                fn serialize(&self, serializer: &mut Serializer) -> Result<(), ASN1Error> {
                    ASN1Integer { value: BigInt::from(*self) }.serialize(serializer)
                }
            }

            impl DERImplicitlyTaggable for $ty {
                fn default_identifier() -> ASN1Identifier {
                    ASN1Identifier::INTEGER
                }

                fn from_der_node_with_identifier(
                    node: ASN1Node,
                    identifier: ASN1Identifier,
                ) -> Result<Self, ASN1Error> {
                    let value = ASN1Integer::from_der_node_with_identifier(node, identifier)?;
                    value
                        .value
                        .$to_method()
                        .ok_or_else(|| asn1_err!(ErrorCode::ValueOutOfRange, concat!("ASN1Integer does not fit into ", stringify!($ty))))
                }

                fn serialize_with_identifier(
                    &self,
                    serializer: &mut Serializer,
                    identifier: ASN1Identifier,
                ) -> Result<(), ASN1Error> {
                    ASN1Integer { value: BigInt::from(*self) }
                        .serialize_with_identifier(serializer, identifier)
                }
            }
        )+
    };
}

impl_der_for_fixed_width_int!(
    i8 => to_i8,
    i16 => to_i16,
    i32 => to_i32,
    i64 => to_i64,
    i128 => to_i128,
    isize => to_isize,
    u8 => to_u8,
    u16 => to_u16,
    u32 => to_u32,
    u64 => to_u64,
    u128 => to_u128,
    usize => to_usize,
);

impl<T> DERParseable for Vec<T>
where
    T: DERParseable + DERSerializable,
{
    fn from_der_node(node: ASN1Node) -> Result<Self, ASN1Error> {
        <Self as DERImplicitlyTaggable>::from_der_node_with_identifier(
            node,
            <Self as DERImplicitlyTaggable>::default_identifier(),
        )
    }
}

impl<T> DERSerializable for Vec<T>
where
    T: DERSerializable,
{
    fn serialize(&self, serializer: &mut Serializer) -> Result<(), ASN1Error> {
        serializer.serialize_sequence_of(ASN1Identifier::SEQUENCE, self)
    }
}

impl<T> DERImplicitlyTaggable for Vec<T>
where
    T: DERParseable + DERSerializable,
{
    fn default_identifier() -> ASN1Identifier {
        ASN1Identifier::SEQUENCE
    }

    fn from_der_node_with_identifier(
        node: ASN1Node,
        identifier: ASN1Identifier,
    ) -> Result<Self, ASN1Error> {
        sequence_of(identifier, node)
    }

    fn serialize_with_identifier(
        &self,
        serializer: &mut Serializer,
        identifier: ASN1Identifier,
    ) -> Result<(), ASN1Error> {
        serializer.serialize_sequence_of(identifier, self)
    }
}

impl<T> DERParseable for Option<T>
where
    T: DERImplicitlyTaggable,
{
    fn from_der_node(node: ASN1Node) -> Result<Self, ASN1Error> {
        T::from_der_node(node).map(Some)
    }

    fn from_der_iterator(iter: &mut ASN1NodeCollectionIterator) -> Result<Self, ASN1Error> {
        optional_implicitly_tagged(iter)
    }
}

impl<T> DERSerializable for Option<T>
where
    T: DERSerializable,
{
    fn serialize(&self, serializer: &mut Serializer) -> Result<(), ASN1Error> {
        if let Some(value) = self {
            serializer.serialize(value)?;
        }
        Ok(())
    }
}

impl<T> DERParseable for Box<T>
where
    T: DERParseable,
{
    fn from_der_node(node: ASN1Node) -> Result<Self, ASN1Error> {
        Ok(Box::new(T::from_der_node(node)?))
    }
}

impl<T> DERSerializable for Box<T>
where
    T: DERSerializable,
{
    fn serialize(&self, serializer: &mut Serializer) -> Result<(), ASN1Error> {
        (**self).serialize(serializer)
    }
}

/// Emits DER into a single growing buffer.
///
/// Every node is written with a one-byte length placeholder that is patched
/// once the content size is known; content longer than 127 bytes is shifted
/// right to make room for the long-form length octets. Nested constructed
/// writes share this buffer, so no intermediate allocations occur.
pub struct Serializer {
    buffer: BytesMut,
}

impl Serializer {
    pub fn new() -> Self {
        Serializer {
            buffer: BytesMut::with_capacity(1024),
        }
    }

    pub fn serialized_bytes(&self) -> Bytes {
        self.buffer.clone().freeze()
    }

    /// Appends a primitive node. The writer appends the content octets
    /// directly to the output buffer.
    ///
    /// Panics if `identifier` has the constructed bit set.
    pub fn append_primitive_node(
        &mut self,
        identifier: ASN1Identifier,
        content_writer: impl FnOnce(&mut BytesMut) -> Result<(), ASN1Error>,
    ) -> Result<(), ASN1Error> {
        assert!(
            !identifier.constructed,
            "append_primitive_node requires a primitive identifier"
        );
        self.append_node(identifier, |serializer| content_writer(&mut serializer.buffer))
    }

    /// Appends a constructed node. The writer receives the serializer
    /// itself, so appends nest to arbitrary depth.
    ///
    /// Panics if `identifier` does not have the constructed bit set.
    pub fn append_constructed_node<F>(
        &mut self,
        identifier: ASN1Identifier,
        writer: F,
    ) -> Result<(), ASN1Error>
    where
        F: FnOnce(&mut Serializer) -> Result<(), ASN1Error>,
    {
        assert!(
            identifier.constructed,
            "append_constructed_node requires a constructed identifier"
        );
        self.append_node(identifier, writer)
    }

    pub fn write_sequence<F>(&mut self, writer: F) -> Result<(), ASN1Error>
    where
        F: FnOnce(&mut Serializer) -> Result<(), ASN1Error>,
    {
        self.append_constructed_node(ASN1Identifier::SEQUENCE, writer)
    }

    pub fn write_set<F>(&mut self, writer: F) -> Result<(), ASN1Error>
    where
        F: FnOnce(&mut Serializer) -> Result<(), ASN1Error>,
    {
        self.append_constructed_node(ASN1Identifier::SET, writer)
    }

    pub fn serialize<T: DERSerializable>(&mut self, value: &T) -> Result<(), ASN1Error> {
        value.serialize(self)
    }

    /// Wraps one constructed explicit-tag node around a nested serialize.
    pub fn serialize_explicitly_tagged<T: DERSerializable>(
        &mut self,
        value: &T,
        tag_number: u64,
        tag_class: TagClass,
    ) -> Result<(), ASN1Error> {
        let identifier = ASN1Identifier::explicit_tag(tag_number, tag_class);
        self.append_constructed_node(identifier, |serializer| serializer.serialize(value))
    }

    /// Emits nothing when the value is absent.
    pub fn serialize_optional<T: DERSerializable>(
        &mut self,
        value: Option<&T>,
    ) -> Result<(), ASN1Error> {
        if let Some(value) = value {
            self.serialize(value)?;
        }
        Ok(())
    }

    pub fn serialize_sequence_of<T: DERSerializable>(
        &mut self,
        identifier: ASN1Identifier,
        elements: &[T],
    ) -> Result<(), ASN1Error> {
        self.append_constructed_node(identifier, |serializer| {
            for element in elements {
                serializer.serialize(element)?;
            }
            Ok(())
        })
    }

    /// Re-emits an already-parsed node by walking its tree.
    pub fn serialize_node(&mut self, node: &ASN1Node) -> Result<(), ASN1Error> {
        match &node.content {
            Content::Primitive(data) => {
                let data = data.clone();
                self.append_primitive_node(node.identifier, |buffer| {
                    buffer.extend_from_slice(&data);
                    Ok(())
                })
            }
            Content::Constructed(collection) => {
                let collection = collection.clone();
                self.append_constructed_node(node.identifier, |serializer| {
                    for child in collection {
                        serializer.serialize_node(&child)?;
                    }
                    Ok(())
                })
            }
        }
    }

    fn append_node<F>(&mut self, identifier: ASN1Identifier, writer: F) -> Result<(), ASN1Error>
    where
        F: FnOnce(&mut Serializer) -> Result<(), ASN1Error>,
    {
        self.buffer.write_identifier(identifier);
        let length_index = self.buffer.len();
        self.buffer.put_u8(0x00);
        let content_start = self.buffer.len();

        writer(self)?;

        let content_length = self.buffer.len() - content_start;
        if content_length <= 0x7F {
            self.buffer[length_index] = content_length as u8;
            return Ok(());
        }

        // Long form: the placeholder holds the 0x80|n indicator and the
        // content moves right to make room for the n length octets.
        let extra = minimal_octet_len(content_length as u64);
        let old_end = self.buffer.len();
        self.buffer.resize(old_end + extra, 0);
        self.buffer
            .copy_within(content_start..old_end, content_start + extra);
        self.buffer[length_index] = 0x80 | extra as u8;
        for i in 0..extra {
            self.buffer[length_index + 1 + i] = (content_length >> (8 * (extra - 1 - i))) as u8;
        }
        Ok(())
    }
}

impl Default for Serializer {
    fn default() -> Self {
        Serializer::new()
    }
}

// Helpers

pub(crate) trait IdentifierWriter {
    fn write_identifier(&mut self, identifier: ASN1Identifier);
}

impl IdentifierWriter for BytesMut {
    fn write_identifier(&mut self, identifier: ASN1Identifier) {
        if let Some(short) = identifier.short_form() {
            self.put_u8(short);
        } else {
            let mut top_byte = 0x1f;
            if identifier.constructed {
                top_byte |= 0x20;
            }
            top_byte |= identifier.tag_class.top_byte_flags();
            self.put_u8(top_byte);

            // base 128 encoding of the tag number
            write_base128_uint(self, identifier.tag_number);
        }
    }
}

fn write_base128_uint(buffer: &mut BytesMut, mut n: u64) {
    if n == 0 {
        buffer.put_u8(0);
        return;
    }

    let mut digits = Vec::new();
    while n != 0 {
        digits.push((n & 0x7F) as u8);
        n >>= 7;
    }

    for (i, digit) in digits.iter().rev().enumerate() {
        let mut byte = *digit;
        if i != digits.len() - 1 {
            byte |= 0x80;
        }
        buffer.put_u8(byte);
    }
}
