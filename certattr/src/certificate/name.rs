// Copyright (c) 2026 Intel Corporation
//
// SPDX-License-Identifier: Apache-2.0 or MIT

//! Distinguished Name (DN) support.
//!
//! The attribute engine treats a DN as an opaque value with a small set of
//! operations: component insert/delete/lookup, structural comparison, prefix
//! matching for name constraints, and DER encode/decode. DNs appear both as
//! the subject/issuer of a certificate object and as `directoryName` values
//! inside GeneralName fields.

extern crate alloc;

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

use const_oid::ObjectIdentifier;
use der::{
    asn1::{Ia5StringRef, PrintableStringRef, SetOfVec, Utf8StringRef},
    Decode, DecodeValue, Encode, EncodeValue, ErrorKind, Header, Length, Reader, Sequence, Tag,
    ValueOrd, Writer,
};

use crate::error::{Error as CertError, NameError};

// ============================================================================
// Common Attribute Type OIDs (RFC 5280, Appendix A.1)
// ============================================================================

/// Common Name (CN) - 2.5.4.3
pub const CN: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.3");

/// Country (C) - 2.5.4.6
pub const COUNTRY_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.6");

/// Locality (L) - 2.5.4.7
pub const LOCALITY_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.7");

/// State or Province (ST) - 2.5.4.8
pub const STATE_OR_PROVINCE_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.8");

/// Organization (O) - 2.5.4.10
pub const ORGANIZATION_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.10");

/// Organizational Unit (OU) - 2.5.4.11
pub const ORGANIZATIONAL_UNIT_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.11");

/// Email Address - 1.2.840.113549.1.9.1
pub const EMAIL_ADDRESS: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.1");

// ============================================================================
// AttributeTypeAndValue
// ============================================================================

/// A single DN component.
///
/// The value is kept as its raw DER TLV so that string types the `der` crate
/// has no tag for (T61String, UniversalString) survive a decode/encode cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeTypeAndValue {
    /// Attribute type (OID)
    pub oid: ObjectIdentifier,
    raw_value: Vec<u8>,
}

impl<'a> DecodeValue<'a> for AttributeTypeAndValue {
    fn decode_value<R: Reader<'a>>(reader: &mut R, header: Header) -> der::Result<Self> {
        reader.read_nested(header.length, |nested| {
            let oid = ObjectIdentifier::decode(nested)?;
            let remaining = nested.remaining_len();
            let raw_value = nested.read_vec(remaining)?;
            if raw_value.len() < 2 {
                return Err(ErrorKind::Length { tag: Tag::Sequence }.into());
            }
            Ok(Self { oid, raw_value })
        })
    }
}

impl EncodeValue for AttributeTypeAndValue {
    fn value_len(&self) -> der::Result<Length> {
        self.oid.encoded_len()? + Length::try_from(self.raw_value.len())?
    }

    fn encode_value(&self, writer: &mut impl Writer) -> der::Result<()> {
        self.oid.encode(writer)?;
        writer.write(&self.raw_value)
    }
}

impl Sequence<'_> for AttributeTypeAndValue {}

impl ValueOrd for AttributeTypeAndValue {
    fn value_cmp(&self, other: &Self) -> der::Result<core::cmp::Ordering> {
        match self.oid.cmp(&other.oid) {
            core::cmp::Ordering::Equal => Ok(self.raw_value.cmp(&other.raw_value)),
            other_order => Ok(other_order),
        }
    }
}

impl AttributeTypeAndValue {
    /// Create a component, picking PrintableString when the text allows it
    /// and UTF8String otherwise.
    pub fn new(oid: ObjectIdentifier, value: &str) -> der::Result<Self> {
        let raw_value = match PrintableStringRef::new(value) {
            Ok(s) => s.to_der()?,
            Err(_) if oid == EMAIL_ADDRESS => Ia5StringRef::new(value)?.to_der()?,
            Err(_) => Utf8StringRef::new(value)?.to_der()?,
        };
        Ok(Self { oid, raw_value })
    }

    /// The raw tag byte of the attribute value.
    pub fn value_tag_byte(&self) -> u8 {
        self.raw_value.first().copied().unwrap_or(0)
    }

    /// The content bytes of the attribute value (after tag + length).
    pub fn value_content(&self) -> &[u8] {
        let len_byte = match self.raw_value.get(1) {
            Some(b) => *b,
            None => return &[],
        };
        let start = if len_byte & 0x80 == 0 {
            2
        } else {
            2 + (len_byte & 0x7F) as usize
        };
        self.raw_value.get(start..).unwrap_or(&[])
    }

    /// The value as text. BMPString and UniversalString are transcoded,
    /// the 8-bit string types are read as UTF-8.
    pub fn value_as_str(&self) -> der::Result<String> {
        let content = self.value_content();
        let tag = Tag::try_from(self.value_tag_byte()).unwrap_or(Tag::OctetString);
        match self.value_tag_byte() {
            // BMPString
            0x1E => {
                if content.len() % 2 != 0 {
                    return Err(ErrorKind::Length { tag }.into());
                }
                let units: Vec<u16> = content
                    .chunks(2)
                    .map(|c| u16::from_be_bytes([c[0], c[1]]))
                    .collect();
                String::from_utf16(&units).map_err(|_| der::Error::from(ErrorKind::Value { tag }))
            }
            // UniversalString
            0x1C => {
                if content.len() % 4 != 0 {
                    return Err(ErrorKind::Length { tag }.into());
                }
                content
                    .chunks(4)
                    .map(|c| {
                        char::from_u32(u32::from_be_bytes([c[0], c[1], c[2], c[3]]))
                            .ok_or_else(|| der::Error::from(ErrorKind::Value { tag }))
                    })
                    .collect()
            }
            _ => core::str::from_utf8(content)
                .map(|s| s.to_string())
                .map_err(|_| der::Error::from(ErrorKind::Value { tag })),
        }
    }

    /// Get a short name for the attribute type if known.
    pub fn attr_name(&self) -> &str {
        match self.oid {
            CN => "CN",
            COUNTRY_NAME => "C",
            LOCALITY_NAME => "L",
            STATE_OR_PROVINCE_NAME => "ST",
            ORGANIZATION_NAME => "O",
            ORGANIZATIONAL_UNIT_NAME => "OU",
            EMAIL_ADDRESS => "emailAddress",
            _ => "OID",
        }
    }
}

impl fmt::Display for AttributeTypeAndValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = self
            .value_as_str()
            .unwrap_or_else(|_| "<error>".to_string());
        match self.attr_name() {
            "OID" => write!(f, "{}={}", self.oid, value),
            name => write!(f, "{}={}", name, value),
        }
    }
}

// ============================================================================
// RelativeDistinguishedName
// ============================================================================

/// RelativeDistinguishedName (RDN) is a SET OF AttributeTypeAndValue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelativeDistinguishedName {
    pub attributes: SetOfVec<AttributeTypeAndValue>,
}

impl RelativeDistinguishedName {
    /// Create a new RDN with a single attribute.
    pub fn new(attr: AttributeTypeAndValue) -> der::Result<Self> {
        let mut attributes = SetOfVec::new();
        attributes.insert(attr)?;
        Ok(Self { attributes })
    }

    /// Get the first (or only) attribute in this RDN.
    pub fn first(&self) -> Option<&AttributeTypeAndValue> {
        self.attributes.iter().next()
    }
}

impl<'a> DecodeValue<'a> for RelativeDistinguishedName {
    fn decode_value<R: Reader<'a>>(reader: &mut R, header: Header) -> der::Result<Self> {
        let attributes = SetOfVec::decode_value(reader, header)?;
        Ok(Self { attributes })
    }
}

impl EncodeValue for RelativeDistinguishedName {
    fn value_len(&self) -> der::Result<Length> {
        self.attributes.value_len()
    }

    fn encode_value(&self, writer: &mut impl Writer) -> der::Result<()> {
        self.attributes.encode_value(writer)
    }
}

impl der::FixedTag for RelativeDistinguishedName {
    const TAG: Tag = Tag::Set;
}

impl fmt::Display for RelativeDistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let attrs: Vec<String> = self.attributes.iter().map(|a| a.to_string()).collect();
        write!(f, "{}", attrs.join("+"))
    }
}

// ============================================================================
// Name (RDNSequence)
// ============================================================================

/// A Distinguished Name, RDNs ordered from root to leaf.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Name {
    pub rdns: Vec<RelativeDistinguishedName>,
}

impl<'a> DecodeValue<'a> for Name {
    fn decode_value<R: Reader<'a>>(reader: &mut R, header: Header) -> der::Result<Self> {
        reader.read_nested(header.length, |reader| {
            let mut rdns = Vec::new();
            while !reader.is_finished() {
                rdns.push(RelativeDistinguishedName::decode(reader)?);
            }
            Ok(Self { rdns })
        })
    }
}

impl EncodeValue for Name {
    fn value_len(&self) -> der::Result<Length> {
        self.rdns
            .iter()
            .try_fold(Length::ZERO, |len, rdn| len + rdn.encoded_len()?)
    }

    fn encode_value(&self, writer: &mut impl Writer) -> der::Result<()> {
        for rdn in &self.rdns {
            rdn.encode(writer)?;
        }
        Ok(())
    }
}

impl der::FixedTag for Name {
    const TAG: Tag = Tag::Sequence;
}

impl Name {
    pub fn new() -> Self {
        Self { rdns: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.rdns.is_empty()
    }

    /// Iterate over every component in every RDN.
    pub fn components(&self) -> impl Iterator<Item = &AttributeTypeAndValue> {
        self.rdns.iter().flat_map(|rdn| rdn.attributes.iter())
    }

    /// Find the first component with the given OID.
    pub fn find_attr(&self, oid: ObjectIdentifier) -> Option<&AttributeTypeAndValue> {
        self.components().find(|attr| attr.oid == oid)
    }

    /// Text value of the first component with the given OID.
    pub fn component(&self, oid: ObjectIdentifier) -> Option<String> {
        self.find_attr(oid).and_then(|a| a.value_as_str().ok())
    }

    /// Append a single-valued RDN holding `value`.
    pub fn add_component(&mut self, oid: ObjectIdentifier, value: &str) -> crate::Result<()> {
        if value.is_empty() {
            return Err(CertError::NameError(NameError::InvalidAttribute(
                oid.to_string(),
            )));
        }
        let attr = AttributeTypeAndValue::new(oid, value)?;
        self.rdns.push(RelativeDistinguishedName::new(attr)?);
        Ok(())
    }

    /// Remove the first RDN that contains a component with the given OID.
    pub fn delete_component(&mut self, oid: ObjectIdentifier) -> crate::Result<()> {
        let pos = self
            .rdns
            .iter()
            .position(|rdn| rdn.attributes.iter().any(|a| a.oid == oid))
            .ok_or(CertError::NameError(NameError::EmptyName))?;
        self.rdns.remove(pos);
        Ok(())
    }

    /// True if every RDN of `prefix` matches the leading RDNs of this name,
    /// which is how a directoryName subtree constrains a DN.
    pub fn starts_with(&self, prefix: &Name) -> bool {
        prefix.rdns.len() <= self.rdns.len()
            && prefix
                .rdns
                .iter()
                .zip(self.rdns.iter())
                .all(|(a, b)| a == b)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rdns: Vec<String> = self.rdns.iter().rev().map(|r| r.to_string()).collect();
        write!(f, "{}", rdns.join(", "))
    }
}
