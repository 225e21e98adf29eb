// Copyright (c) 2026 Intel Corporation
//
// SPDX-License-Identifier: Apache-2.0 or MIT

//! DER encoder for attribute lists
//!
//! Field encodings are produced by one function, [`encode_field`], which the
//! walker also uses to size leaves, so the size computed before writing
//! always matches the bytes written.
//!
//! Extensions are written in list order as
//! `SEQUENCE { OID, critical BOOLEAN DEFAULT FALSE, OCTET STRING }`.
//! CMS and RTCS attributes are written as `SEQUENCE { OID, SET { value } }`
//! and, since they form a SET OF, in ascending order of their encodings.

extern crate alloc;

use alloc::vec::Vec;

use const_oid::ObjectIdentifier;
use der::asn1::{
    BitStringRef, Ia5StringRef, Null, OctetStringRef, PrintableStringRef, UintRef, Utf8StringRef,
};
use der::{Encode, Header, Tag};

use super::list::{AttributeEntry, AttributeList, BlobAttribute};
use super::table::{self, AttributeInfo, FieldType, FL_EXPLICIT};
use super::walker::{self, EncodedAttribute, Node};
use super::AttributeValue;
use crate::certificate::CertType;
use crate::config::CheckOptions;
use crate::error::{Error, ErrorType, Result};
use crate::time::Time;

/// Bytes of each CMS attribute encoding compared when sorting.
const ATTR_ENCODED_SIZE: usize = 48;

// ============================================================================
// TLV helpers
// ============================================================================

pub(crate) fn tlv(tag_byte: u8, content: &[u8]) -> Result<Vec<u8>> {
    let header = Header::new(Tag::try_from(tag_byte)?, content.len())?;
    let mut out = header.to_der()?;
    out.extend_from_slice(content);
    Ok(out)
}

pub(crate) fn sizeof_tlv(tag_byte: u8, content_len: usize) -> Result<usize> {
    let header = Header::new(Tag::try_from(tag_byte)?, content_len)?;
    Ok(usize::try_from(header.encoded_len()?)? + content_len)
}

pub(crate) fn sizeof_oid(oid: &ObjectIdentifier) -> Result<usize> {
    Ok(usize::try_from(oid.encoded_len()?)?)
}

/// Universal tag byte of a row type, `None` for types with no fixed tag.
pub(crate) fn universal_tag(field_type: FieldType) -> Option<u8> {
    let tag = match field_type {
        FieldType::Boolean => 0x01,
        FieldType::Integer | FieldType::IntegerBytes => 0x02,
        FieldType::BitString => 0x03,
        FieldType::OctetString => 0x04,
        FieldType::Null => 0x05,
        FieldType::Oid | FieldType::Identifier | FieldType::Choice => 0x06,
        FieldType::Enumerated => 0x0A,
        FieldType::Utf8String => 0x0C,
        FieldType::PrintableString => 0x13,
        FieldType::Ia5String => 0x16,
        FieldType::UtcTime => 0x17,
        FieldType::GeneralizedTime => 0x18,
        FieldType::VisibleString => 0x1A,
        FieldType::Sequence | FieldType::Dn => 0x30,
        FieldType::Set => 0x31,
        FieldType::Blob | FieldType::Subtyped => return None,
    };
    Some(tag)
}

/// True if a tagged row must keep its universal encoding inside an
/// explicit wrapper.
pub(crate) fn is_explicit(row: &AttributeInfo) -> bool {
    // Name is a CHOICE and can't be implicitly tagged
    row.has_flag(FL_EXPLICIT) || row.field_type == FieldType::Dn
}

/// Tag byte of a constructed row.
pub(crate) fn constructed_tag(row: &AttributeInfo) -> u8 {
    match row.tag {
        Some(n) => 0xA0 | n,
        None if row.field_type == FieldType::Set => 0x31,
        None => 0x30,
    }
}

pub(crate) fn sizeof_constructed(row: &AttributeInfo, content_len: usize) -> Result<usize> {
    sizeof_tlv(constructed_tag(row), content_len)
}

// ============================================================================
// Field encoding
// ============================================================================

fn field_error(row: &AttributeInfo) -> Error {
    Error::invalid(row.field(), ErrorType::AttrValue)
}

/// Named bits, bit 0 first, as a DER BIT STRING with trailing zero bits
/// removed.
fn encode_named_bits(value: i64) -> Result<Vec<u8>> {
    if value == 0 {
        return Ok(BitStringRef::new(0, &[])?.to_der()?);
    }
    let bits = 64 - (value as u64).leading_zeros() as usize;
    let mut bytes = alloc::vec![0u8; (bits + 7) / 8];
    for bit in 0..bits {
        if value & (1 << bit) != 0 {
            bytes[bit / 8] |= 0x80 >> (bit % 8);
        }
    }
    let unused = (bytes.len() * 8 - bits) as u8;
    Ok(BitStringRef::new(unused, &bytes)?.to_der()?)
}

fn encode_universal(row: &AttributeInfo, value: &AttributeValue) -> Result<Vec<u8>> {
    let bad = || field_error(row);
    let encoded = match row.field_type {
        FieldType::Boolean => value.as_bool().ok_or_else(bad)?.to_der()?,
        FieldType::Integer => value.as_integer().ok_or_else(bad)?.to_der()?,
        FieldType::Enumerated => {
            let mut encoded = value.as_integer().ok_or_else(bad)?.to_der()?;
            encoded[0] = 0x0A;
            encoded
        }
        FieldType::BitString => encode_named_bits(value.as_integer().ok_or_else(bad)?)?,
        FieldType::OctetString => OctetStringRef::new(value.as_bytes().ok_or_else(bad)?)?.to_der()?,
        FieldType::IntegerBytes => UintRef::new(value.as_bytes().ok_or_else(bad)?)?.to_der()?,
        FieldType::Oid => value.as_oid().ok_or_else(bad)?.to_der()?,
        FieldType::Null => Null.to_der()?,
        FieldType::Ia5String => Ia5StringRef::new(value.as_str().ok_or_else(bad)?)?.to_der()?,
        FieldType::PrintableString => {
            PrintableStringRef::new(value.as_str().ok_or_else(bad)?)?.to_der()?
        }
        FieldType::Utf8String => Utf8StringRef::new(value.as_str().ok_or_else(bad)?)?.to_der()?,
        FieldType::VisibleString => tlv(0x1A, value.as_str().ok_or_else(bad)?.as_bytes())?,
        FieldType::UtcTime => Time::utc_from_unix_secs(value.as_time().ok_or_else(bad)?)?.to_der()?,
        FieldType::GeneralizedTime => {
            Time::generalized_from_unix_secs(value.as_time().ok_or_else(bad)?)?.to_der()?
        }
        FieldType::Identifier => row.oid.ok_or_else(bad)?.to_der()?,
        FieldType::Choice => {
            let selection = value.as_integer().ok_or_else(bad)?;
            let choice = row
                .sub_table()
                .and_then(|rows| table::choice_row(rows, selection))
                .and_then(|choice| choice.oid)
                .ok_or_else(bad)?;
            choice.to_der()?
        }
        FieldType::Dn => value.as_name().ok_or_else(bad)?.to_der()?,
        FieldType::Blob => value.as_bytes().ok_or_else(bad)?.to_vec(),
        FieldType::Sequence | FieldType::Set | FieldType::Subtyped => {
            return Err(Error::internal("constructed row encoded as a field"))
        }
    };
    Ok(encoded)
}

/// Complete encoding of one field, including its context tag.
pub fn encode_field(row: &AttributeInfo, value: &AttributeValue) -> Result<Vec<u8>> {
    let mut encoded = encode_universal(row, value)?;
    let n = match row.tag {
        Some(n) => n,
        None => return Ok(encoded),
    };
    if is_explicit(row) {
        return tlv(0xA0 | n, &encoded);
    }
    match encoded.first_mut() {
        Some(first) => *first = 0x80 | (*first & 0x20) | n,
        None => return Err(field_error(row)),
    }
    Ok(encoded)
}

pub fn sizeof_field(row: &AttributeInfo, value: &AttributeValue) -> Result<usize> {
    Ok(encode_field(row, value)?.len())
}

fn write_node(node: &Node, entries: &[AttributeEntry], out: &mut Vec<u8>) -> Result<()> {
    match node {
        Node::Leaf { entry, row, .. } => {
            let entry = entries
                .get(*entry)
                .ok_or_else(|| Error::internal("encoding tree out of date"))?;
            out.extend_from_slice(&encode_field(row, &entry.value)?);
        }
        Node::Fixed { row, .. } => {
            let oid = row
                .oid
                .ok_or_else(|| Error::internal("identifier row without OID"))?;
            out.extend_from_slice(&oid.to_der()?);
        }
        Node::Sequence { row, children, .. } | Node::SetOf { row, children, .. } => {
            let content_len: usize = children.iter().map(Node::size).sum();
            let header = Header::new(Tag::try_from(constructed_tag(row))?, content_len)?;
            out.extend_from_slice(&header.to_der()?);
            for child in children {
                write_node(child, entries, out)?;
            }
        }
    }
    Ok(())
}

// ============================================================================
// Attribute encoding
// ============================================================================

/// Write `SEQUENCE { OID, [critical,] OCTET STRING | SET { value } }`.
fn wrap_attribute(
    oid: &ObjectIdentifier,
    critical: bool,
    value: &[u8],
    set_wrapped: bool,
) -> Result<Vec<u8>> {
    let mut content = oid.to_der()?;
    if set_wrapped {
        content.extend_from_slice(&tlv(0x31, value)?);
    } else {
        if critical {
            content.extend_from_slice(&true.to_der()?);
        }
        content.extend_from_slice(&tlv(0x04, value)?);
    }
    tlv(0x30, &content)
}

fn encode_attribute(
    attribute: &EncodedAttribute,
    entries: &[AttributeEntry],
    set_wrapped: bool,
) -> Result<Vec<u8>> {
    let mut payload = Vec::with_capacity(attribute.payload_len);
    for node in &attribute.nodes {
        write_node(node, entries, &mut payload)?;
    }
    if payload.len() != attribute.payload_len {
        return Err(Error::internal("attribute size mismatch"));
    }
    wrap_attribute(&attribute.oid, attribute.critical, &payload, set_wrapped)
}

fn encode_blob(blob: &BlobAttribute, set_wrapped: bool) -> Result<Vec<u8>> {
    wrap_attribute(&blob.oid, blob.critical, &blob.value, set_wrapped)
}

/// Sort prefix of an encoded attribute: the SEQUENCE header and OID,
/// zero-padded.
fn sort_prefix(encoded: &[u8]) -> Result<[u8; ATTR_ENCODED_SIZE]> {
    use der::{Decode, Reader, SliceReader};

    let mut reader = SliceReader::new(encoded)?;
    Header::decode(&mut reader)?;
    let oid_start = usize::try_from(reader.position())?;
    let oid = ObjectIdentifier::decode(&mut reader)?;
    let prefix_len = oid_start + sizeof_oid(&oid)?;

    let mut prefix = [0u8; ATTR_ENCODED_SIZE];
    let n = prefix_len.min(ATTR_ENCODED_SIZE);
    prefix[..n].copy_from_slice(&encoded[..n]);
    Ok(prefix)
}

/// Emit encoded attributes as a DER SET OF: repeatedly pick the smallest
/// prefix strictly greater than the one last written.
fn write_sorted(encodings: &[Vec<u8>], out: &mut Vec<u8>) -> Result<()> {
    let prefixes = encodings
        .iter()
        .map(|e| sort_prefix(e))
        .collect::<Result<Vec<_>>>()?;

    let mut previous = [0u8; ATTR_ENCODED_SIZE];
    loop {
        let mut best: Option<usize> = None;
        let mut best_prefix = [0xFFu8; ATTR_ENCODED_SIZE];
        for (i, prefix) in prefixes.iter().enumerate() {
            if *prefix > previous && *prefix < best_prefix {
                best = Some(i);
                best_prefix = *prefix;
            }
        }
        match best {
            Some(i) => {
                out.extend_from_slice(&encodings[i]);
                previous = best_prefix;
            }
            None => break,
        }
    }
    Ok(())
}

// ============================================================================
// Attribute blocks
// ============================================================================

/// Context tag of the RTCS response extensions.
const CTAG_RTCS_RESPONSE_EXTENSIONS: u8 = 1;

/// Wrap the encoded attributes for the object type.
fn wrap_block(cert_type: CertType, content: &[u8]) -> Result<Vec<u8>> {
    use super::oids::EXTENSION_REQUEST;

    let wrapped = match cert_type {
        CertType::Certificate => tlv(0xA3, &tlv(0x30, content)?)?,
        CertType::Crl => tlv(0xA0, &tlv(0x30, content)?)?,
        CertType::CertRequest => {
            let mut inner = EXTENSION_REQUEST.to_der()?;
            inner.extend_from_slice(&tlv(0x31, &tlv(0x30, content)?)?);
            tlv(0x30, &inner)?
        }
        CertType::RequestCert | CertType::RequestRevocation => content.to_vec(),
        CertType::AttributeCertificate | CertType::PkiUser | CertType::RevocationEntry => {
            tlv(0x30, content)?
        }
        CertType::OcspRequest => tlv(0xA2, &tlv(0x30, content)?)?,
        CertType::OcspResponse => tlv(0xA1, &tlv(0x30, content)?)?,
        CertType::CmsAttributes => tlv(0xA0, content)?,
        CertType::RtcsRequest => tlv(0x31, content)?,
        CertType::RtcsResponse => tlv(0xA0 | CTAG_RTCS_RESPONSE_EXTENSIONS, content)?,
    };
    Ok(wrapped)
}

/// Encode an attribute list, returning an empty vector for an empty list.
///
/// The list is validated first; blob attributes are written only when
/// `options.sign_unrecognised_attributes` is set. The same gate applies to
/// SET-encoded blocks (CMS and RTCS), so the written block always agrees
/// with `sizeof_attributes`.
pub fn write_attributes(
    list: &mut AttributeList,
    cert_type: CertType,
    options: &CheckOptions,
) -> Result<Vec<u8>> {
    let attributes = walker::check_attributes(list, cert_type.valid_mask())?;
    let set_wrapped = cert_type.uses_set_encoding();

    let mut encodings = Vec::with_capacity(attributes.len() + list.blobs().len());
    for attribute in &attributes {
        encodings.push(encode_attribute(attribute, list.entries(), set_wrapped)?);
    }
    if options.sign_unrecognised_attributes {
        for blob in list.blobs() {
            encodings.push(encode_blob(blob, set_wrapped)?);
        }
    }
    if encodings.is_empty() {
        return Ok(Vec::new());
    }

    let mut content = Vec::new();
    if set_wrapped {
        write_sorted(&encodings, &mut content)?;
    } else {
        for encoding in &encodings {
            content.extend_from_slice(encoding);
        }
    }
    log::trace!(
        "writing {} attributes for {:?} ({} bytes)",
        encodings.len(),
        cert_type,
        content.len()
    );
    wrap_block(cert_type, &content)
}

/// Size of the encoding [`write_attributes`] produces.
pub fn sizeof_attributes(
    list: &mut AttributeList,
    cert_type: CertType,
    options: &CheckOptions,
) -> Result<usize> {
    let attributes = walker::check_attributes(list, cert_type.valid_mask())?;
    let set_wrapped = cert_type.uses_set_encoding();

    let mut content_len = 0usize;
    let mut count = 0usize;
    for attribute in &attributes {
        content_len += sizeof_attribute(
            &attribute.oid,
            attribute.critical,
            attribute.payload_len,
            set_wrapped,
        )?;
        count += 1;
    }
    if options.sign_unrecognised_attributes {
        for blob in list.blobs() {
            content_len += sizeof_attribute(&blob.oid, blob.critical, blob.value.len(), set_wrapped)?;
            count += 1;
        }
    }
    if count == 0 {
        return Ok(0);
    }
    sizeof_block(cert_type, content_len)
}

fn sizeof_attribute(
    oid: &ObjectIdentifier,
    critical: bool,
    payload_len: usize,
    set_wrapped: bool,
) -> Result<usize> {
    let mut len = sizeof_oid(oid)?;
    if set_wrapped {
        len += sizeof_tlv(0x31, payload_len)?;
    } else {
        if critical {
            len += 3;
        }
        len += sizeof_tlv(0x04, payload_len)?;
    }
    sizeof_tlv(0x30, len)
}

fn sizeof_block(cert_type: CertType, content_len: usize) -> Result<usize> {
    use super::oids::EXTENSION_REQUEST;

    let len = match cert_type {
        CertType::Certificate => sizeof_tlv(0xA3, sizeof_tlv(0x30, content_len)?)?,
        CertType::Crl => sizeof_tlv(0xA0, sizeof_tlv(0x30, content_len)?)?,
        CertType::CertRequest => {
            let set = sizeof_tlv(0x31, sizeof_tlv(0x30, content_len)?)?;
            sizeof_tlv(0x30, sizeof_oid(&EXTENSION_REQUEST)? + set)?
        }
        CertType::RequestCert | CertType::RequestRevocation => content_len,
        CertType::AttributeCertificate | CertType::PkiUser | CertType::RevocationEntry => {
            sizeof_tlv(0x30, content_len)?
        }
        CertType::OcspRequest => sizeof_tlv(0xA2, sizeof_tlv(0x30, content_len)?)?,
        CertType::OcspResponse => sizeof_tlv(0xA1, sizeof_tlv(0x30, content_len)?)?,
        CertType::CmsAttributes => sizeof_tlv(0xA0, content_len)?,
        CertType::RtcsRequest => sizeof_tlv(0x31, content_len)?,
        CertType::RtcsResponse => sizeof_tlv(0xA0 | CTAG_RTCS_RESPONSE_EXTENSIONS, content_len)?,
    };
    Ok(len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::decode::{add_attribute_field, add_blob_attribute};
    use crate::attr::table::{TableKind, CONTENT_TYPE_DATA};
    use crate::attr::CertInfo;

    fn options() -> CheckOptions {
        CheckOptions::new()
    }

    fn extensions() -> AttributeList {
        AttributeList::new(TableKind::Extensions)
    }

    #[test]
    fn test_named_bits() {
        // digitalSignature only
        assert_eq!(encode_named_bits(1).unwrap(), [0x03, 0x02, 0x07, 0x80]);
        // keyCertSign | cRLSign
        assert_eq!(encode_named_bits(0x60).unwrap(), [0x03, 0x02, 0x01, 0x06]);
        // decipherOnly spills into a second byte
        assert_eq!(
            encode_named_bits(0x100).unwrap(),
            [0x03, 0x03, 0x07, 0x00, 0x80]
        );
        assert_eq!(encode_named_bits(0).unwrap(), [0x03, 0x01, 0x00]);
    }

    #[test]
    fn test_key_usage_certificate_block() {
        let mut list = extensions();
        add_attribute_field(&mut list, CertInfo::KeyUsage, None, AttributeValue::Integer(0x60))
            .unwrap();

        let der = write_attributes(&mut list, CertType::Certificate, &options()).unwrap();
        let expected = [
            0xA3, 0x12, 0x30, 0x10, // [3] { SEQUENCE {
            0x30, 0x0E, 0x06, 0x03, 0x55, 0x1D, 0x0F, // keyUsage
            0x01, 0x01, 0xFF, // critical
            0x04, 0x04, 0x03, 0x02, 0x01, 0x06,
        ];
        assert_eq!(der, expected);
        assert_eq!(
            sizeof_attributes(&mut list, CertType::Certificate, &options()).unwrap(),
            der.len()
        );
    }

    #[test]
    fn test_default_value_elided() {
        let mut list = extensions();
        add_attribute_field(&mut list, CertInfo::Ca, None, AttributeValue::Boolean(false)).unwrap();
        let der = write_attributes(&mut list, CertType::RequestCert, &options()).unwrap();
        // basicConstraints, critical, OCTET STRING { SEQUENCE {} }
        assert_eq!(
            der,
            [0x30, 0x0C, 0x06, 0x03, 0x55, 0x1D, 0x13, 0x01, 0x01, 0xFF, 0x04, 0x02, 0x30, 0x00]
        );

        let mut list = extensions();
        add_attribute_field(&mut list, CertInfo::Ca, None, AttributeValue::Boolean(true)).unwrap();
        let der = write_attributes(&mut list, CertType::RequestCert, &options()).unwrap();
        assert!(der.ends_with(&[0x04, 0x05, 0x30, 0x03, 0x01, 0x01, 0xFF]));
    }

    #[test]
    fn test_implicit_and_explicit_tags() {
        let mut list = extensions();
        add_attribute_field(
            &mut list,
            CertInfo::SubjectAltName,
            Some(CertInfo::DnsName),
            AttributeValue::Text("abc.com".into()),
        )
        .unwrap();
        let der = write_attributes(&mut list, CertType::RequestCert, &options()).unwrap();
        assert!(der.ends_with(&[0x30, 0x09, 0x82, 0x07, b'a', b'b', b'c', b'.', b'c', b'o', b'm']));

        let loc = table::field_id_to_attribute(
            table::EXTENSION_INFO,
            CertInfo::SubjectAltName,
            Some(CertInfo::DirectoryName),
        )
        .unwrap();
        let mut name = crate::certificate::name::Name::new();
        name.add_component(crate::certificate::name::COUNTRY_NAME, "US")
            .unwrap();
        let encoded = encode_field(loc.row, &AttributeValue::Name(name.clone())).unwrap();
        assert_eq!(encoded[0], 0xA4);
        assert_eq!(&encoded[2..], name.to_der().unwrap().as_slice());
    }

    #[test]
    fn test_blobs_follow_sign_option() {
        let mut list = extensions();
        add_attribute_field(&mut list, CertInfo::KeyUsage, None, AttributeValue::Integer(1))
            .unwrap();
        add_blob_attribute(
            &mut list,
            ObjectIdentifier::new_unwrap("1.2.3.4"),
            false,
            &[0x05, 0x00],
            false,
        )
        .unwrap();

        let with = write_attributes(&mut list, CertType::RequestCert, &options()).unwrap();
        let without = write_attributes(
            &mut list,
            CertType::RequestCert,
            &options().skip_unrecognised_attributes(),
        )
        .unwrap();
        assert_eq!(with.len(), without.len() + 11);
        assert!(with.ends_with(&[0x30, 0x09, 0x06, 0x03, 0x2A, 0x03, 0x04, 0x04, 0x02, 0x05, 0x00]));
        assert_eq!(
            sizeof_attributes(
                &mut list,
                CertType::RequestCert,
                &options().skip_unrecognised_attributes()
            )
            .unwrap(),
            without.len()
        );
    }

    #[test]
    fn test_cms_attributes_sorted() {
        let mut list = AttributeList::new(TableKind::Cms);
        add_attribute_field(
            &mut list,
            CertInfo::CmsContentType,
            None,
            AttributeValue::Integer(CONTENT_TYPE_DATA),
        )
        .unwrap();
        add_attribute_field(
            &mut list,
            CertInfo::CmsSigningDescription,
            None,
            AttributeValue::Text("x".into()),
        )
        .unwrap();
        add_blob_attribute(
            &mut list,
            ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.2"),
            false,
            &[0x13, 0x01, b'y'],
            false,
        )
        .unwrap();

        let der = write_attributes(&mut list, CertType::CmsAttributes, &options()).unwrap();
        assert_eq!(
            sizeof_attributes(&mut list, CertType::CmsAttributes, &options()).unwrap(),
            der.len()
        );

        // split the SET OF and check it is in ascending order
        let mut elements = Vec::new();
        let mut rest = &der[2..];
        while !rest.is_empty() {
            let len = rest[1] as usize + 2;
            elements.push(rest[..len].to_vec());
            rest = &rest[len..];
        }
        assert_eq!(elements.len(), 3);
        let mut sorted = elements.clone();
        sorted.sort();
        assert_eq!(elements, sorted);

        // The blob is dropped from the SET as well
        let skip = options().skip_unrecognised_attributes();
        let without = write_attributes(&mut list, CertType::CmsAttributes, &skip).unwrap();
        assert_eq!(
            sizeof_attributes(&mut list, CertType::CmsAttributes, &skip).unwrap(),
            without.len()
        );
        let blob = elements
            .iter()
            .find(|e| e[2..13] == [0x06, 0x09, 0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D, 0x01, 0x09, 0x02])
            .unwrap();
        assert_eq!(without.len(), der.len() - blob.len());
    }

    #[test]
    fn test_empty_list_writes_nothing() {
        let mut list = extensions();
        assert!(write_attributes(&mut list, CertType::Certificate, &options())
            .unwrap()
            .is_empty());
        assert_eq!(
            sizeof_attributes(&mut list, CertType::Certificate, &options()).unwrap(),
            0
        );
    }
}
