// Copyright (c) 2026 Intel Corporation
//
// SPDX-License-Identifier: Apache-2.0 or MIT

//! Attribute decoding and field insertion
//!
//! [`read_attributes`] parses an encoded attribute block for an object type
//! and replays the description table over each recognised attribute,
//! producing one list entry per field. [`add_attribute_field`] is the
//! checked path for callers building a list by hand.
//!
//! Attributes the table doesn't describe, or describes above the
//! configured compliance level, are kept as blobs and written back out
//! unchanged.

extern crate alloc;

use alloc::vec::Vec;

use const_oid::ObjectIdentifier;
use der::asn1::{
    AnyRef, BitStringRef, Ia5StringRef, Null, OctetStringRef, PrintableStringRef, UintRef,
    Utf8StringRef,
};
use der::{Decode, Reader, SliceReader, Tagged};

use super::encode::{constructed_tag, is_explicit, universal_tag};
use super::list::{AttributeEntry, AttributeList, BlobAttribute, EntryFlags};
use super::oids;
use super::table::{
    self, AttributeInfo, FieldId, FieldType, FL_IDENTIFIER, FL_MULTIVALUED, FL_NONENCODING,
    FL_SETOF,
};
use super::{AttributeValue, CertInfo};
use crate::certificate::name::Name;
use crate::certificate::CertType;
use crate::config::{CheckOptions, ComplianceLevel};
use crate::error::{Error, ErrorKind, ErrorType, Result};
use crate::time::Time;

const MAX_NESTING_DEPTH: usize = 16;

// ============================================================================
// Revocation reasons
// ============================================================================

/// First reason code that doesn't fit in a cRLReason.
pub const CRL_REASON_LAST: i64 = 11;

/// Highest cRLExtReason value.
pub const CRL_EXT_REASON_NEVER_VALID: i64 = 20;

/// Which extension carries a revocation reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReasonCodeOid {
    CrlReason,
    CrlExtReason,
}

impl ReasonCodeOid {
    pub fn field(self) -> CertInfo {
        match self {
            ReasonCodeOid::CrlReason => CertInfo::CrlReason,
            ReasonCodeOid::CrlExtReason => CertInfo::CrlExtReason,
        }
    }

    pub fn oid(self) -> ObjectIdentifier {
        match self {
            ReasonCodeOid::CrlReason => oids::CRL_REASON,
            ReasonCodeOid::CrlExtReason => oids::CRL_EXT_REASON,
        }
    }
}

/// Pick the extension for a revocation reason code.
///
/// The two reason extensions share one value space, so this is the only
/// place an OID is chosen from the data rather than from the table.
pub fn classify_reason_code(value: i64) -> ReasonCodeOid {
    if value < CRL_REASON_LAST {
        ReasonCodeOid::CrlReason
    } else {
        ReasonCodeOid::CrlExtReason
    }
}

// ============================================================================
// Field insertion
// ============================================================================

/// Rows describing `field`: the field's own row followed by any alternate
/// encodings of it.
fn field_rows(
    list: &AttributeList,
    field: CertInfo,
    sub_field: Option<CertInfo>,
) -> Result<(table::FieldLocation, &'static [AttributeInfo])> {
    let table = list.table();
    let location =
        table::field_id_to_attribute(table, field, sub_field).ok_or(Error::arg_value(field))?;
    if sub_field.is_some() {
        return Ok((location, core::slice::from_ref(location.row)));
    }
    let start = table
        .iter()
        .position(|row| row.field() == Some(field))
        .ok_or(Error::arg_value(field))?;
    let len = table[start..]
        .iter()
        .take_while(|row| row.field_id == FieldId::Id(field))
        .count();
    Ok((location, &table[start..start + len]))
}

/// Add one field value to a list.
///
/// The value is checked against the table before anything is inserted. A
/// second value for a field that isn't multi-valued is rejected. Returns
/// the index of the new entry.
pub fn add_attribute_field(
    list: &mut AttributeList,
    field: CertInfo,
    sub_field: Option<CertInfo>,
    value: AttributeValue,
) -> Result<usize> {
    add_attribute_field_with_flags(list, field, sub_field, value, EntryFlags::default())
}

/// [`add_attribute_field`] with caller-supplied entry flags (critical,
/// locked).
pub fn add_attribute_field_with_flags(
    list: &mut AttributeList,
    field: CertInfo,
    sub_field: Option<CertInfo>,
    mut value: AttributeValue,
    flags: EntryFlags,
) -> Result<usize> {
    // Both reason extensions are set through either identifier
    let field = match (field, value.as_integer()) {
        (CertInfo::CrlReason | CertInfo::CrlExtReason, Some(code)) => {
            classify_reason_code(code).field()
        }
        _ => field,
    };

    let (location, rows) = field_rows(list, field, sub_field)?;
    if rows[0].field_type == FieldType::Identifier {
        value = AttributeValue::Unused;
    }
    let row = select_row(rows, &value)
        .map_err(|error_type| Error::invalid(Some(sub_field.unwrap_or(field)), error_type))?;

    // For a GeneralName component the owning field decides multiplicity
    let owner = match sub_field {
        Some(_) => rows_owner(list, field).unwrap_or(row),
        None => row,
    };
    let multivalued = owner.has_flag(FL_MULTIVALUED);
    if !multivalued && list.find(field, sub_field).is_some() {
        return Err(Error::duplicate(sub_field.unwrap_or(field)));
    }

    let mut entry = AttributeEntry::new(
        location.attribute_id,
        field,
        sub_field,
        row.field_type,
        value,
    );
    entry.flags = EntryFlags {
        multivalued,
        blob: false,
        default_applied: false,
        ..flags
    };
    log::trace!("adding {:?}/{:?} to {:?}", field, sub_field, location.attribute_id);
    Ok(list.insert_entry(entry))
}

/// Add a field, or replace the value of an existing single-valued one.
pub fn set_attribute_field(
    list: &mut AttributeList,
    field: CertInfo,
    sub_field: Option<CertInfo>,
    value: AttributeValue,
) -> Result<usize> {
    let (_, rows) = field_rows(list, field, sub_field)?;
    let existing = match list.find(field, sub_field) {
        Some(index) if sub_field.is_none() && !rows[0].has_flag(FL_MULTIVALUED) => index,
        _ => return add_attribute_field(list, field, sub_field, value),
    };
    let row = select_row(rows, &value)
        .map_err(|error_type| Error::invalid(Some(sub_field.unwrap_or(field)), error_type))?;
    let entry = list
        .entry_mut(existing)
        .ok_or_else(|| Error::internal("entry index out of range"))?;
    if entry.flags.locked {
        return Err(Error::permission(field));
    }
    entry.field_type = row.field_type;
    entry.value = value;
    Ok(existing)
}

fn rows_owner(list: &AttributeList, field: CertInfo) -> Option<&'static AttributeInfo> {
    list.table().iter().find(|row| row.field() == Some(field))
}

/// First alternate encoding that accepts `value`, or the preferred row's
/// error.
fn select_row(
    rows: &'static [AttributeInfo],
    value: &AttributeValue,
) -> core::result::Result<&'static AttributeInfo, ErrorType> {
    let mut first_error = None;
    for row in rows {
        match row.check_value(value) {
            Ok(()) => return Ok(row),
            Err(error_type) => {
                first_error.get_or_insert(error_type);
            }
        }
    }
    Err(first_error.unwrap_or(ErrorType::AttrValue))
}

/// True if `bytes` is one or more complete TLVs.
fn is_well_formed(bytes: &[u8]) -> bool {
    let mut reader = match SliceReader::new(bytes) {
        Ok(reader) => reader,
        Err(_) => return false,
    };
    if reader.is_finished() {
        return false;
    }
    while !reader.is_finished() {
        if AnyRef::decode(&mut reader).is_err() {
            return false;
        }
    }
    true
}

/// Keep an attribute the table doesn't handle as an opaque blob.
///
/// `value` is the content of the attribute's OCTET STRING or SET. It must
/// be well-formed DER unless `ignored` is set, which exempts known-broken
/// encodings from the check.
pub fn add_blob_attribute(
    list: &mut AttributeList,
    oid: ObjectIdentifier,
    critical: bool,
    value: &[u8],
    ignored: bool,
) -> Result<()> {
    if list.find_blob(&oid).is_some() {
        return Err(Error::attribute(
            ErrorKind::Duplicate,
            None,
            ErrorType::AttrPresent,
        ));
    }
    if !ignored && !is_well_formed(value) {
        return Err(Error::bad_data("unrecognised attribute isn't valid DER"));
    }
    log::debug!("keeping attribute {} as a blob", oid);
    list.push_blob(BlobAttribute {
        oid,
        critical,
        value: value.to_vec(),
        flags: EntryFlags {
            critical,
            blob: true,
            ignored,
            ..EntryFlags::default()
        },
    });
    Ok(())
}

// ============================================================================
// Table-driven decoding
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum Scope {
    Top,
    Sub(CertInfo),
}

struct Decoded {
    field_id: CertInfo,
    sub_field_id: Option<CertInfo>,
    field_type: FieldType,
    value: AttributeValue,
}

struct Decoder {
    attribute_id: CertInfo,
    fields: Vec<Decoded>,
}

fn bad_field(field: Option<CertInfo>, msg: &str) -> Error {
    log::trace!("decode failed at {:?}: {}", field, msg);
    Error::bad_data(msg)
}

/// Tag byte a leaf row is encoded with, `None` if any tag is accepted.
fn expected_tag(row: &AttributeInfo) -> Option<u8> {
    match row.tag {
        Some(n) if is_explicit(row) => Some(0xA0 | n),
        Some(n) => universal_tag(row.field_type).map(|t| 0x80 | (t & 0x20) | n),
        None => universal_tag(row.field_type),
    }
}

/// Expected tag of the first item of a GeneralName alternative.
fn item_tag(row: &AttributeInfo) -> Option<u8> {
    if row.is_constructed() {
        Some(constructed_tag(row))
    } else {
        expected_tag(row)
    }
}

fn read_tlv<'a>(reader: &mut SliceReader<'a>) -> Result<AnyRef<'a>> {
    Ok(AnyRef::decode(reader)?)
}

fn content_reader<'a>(any: &AnyRef<'a>) -> Result<SliceReader<'a>> {
    Ok(SliceReader::new(any.value())?)
}

fn finish(reader: &SliceReader<'_>, attribute_id: CertInfo) -> Result<()> {
    if !reader.is_finished() {
        return Err(bad_field(Some(attribute_id), "trailing data in attribute"));
    }
    Ok(())
}

/// Named bits, first bit first, back to an integer.
fn decode_named_bits(bits: &BitStringRef<'_>) -> Result<i64> {
    let mut value = 0i64;
    for (i, byte) in bits.raw_bytes().iter().enumerate() {
        for bit in 0..8 {
            if byte & (0x80 >> bit) == 0 {
                continue;
            }
            let n = i * 8 + bit;
            if n >= 63 {
                return Err(Error::bad_data("BIT STRING too long"));
            }
            value |= 1 << n;
        }
    }
    Ok(value)
}

/// Decode a value TLV carrying its universal tag.
fn decode_universal(row: &AttributeInfo, tlv: &[u8]) -> Result<AttributeValue> {
    let value = match row.field_type {
        FieldType::Boolean => AttributeValue::Boolean(bool::from_der(tlv)?),
        FieldType::Integer => AttributeValue::Integer(i64::from_der(tlv)?),
        FieldType::Enumerated => {
            let mut retagged = tlv.to_vec();
            retagged[0] = 0x02;
            AttributeValue::Integer(i64::from_der(&retagged)?)
        }
        FieldType::BitString => {
            AttributeValue::Integer(decode_named_bits(&BitStringRef::from_der(tlv)?)?)
        }
        FieldType::OctetString => {
            AttributeValue::Bytes(OctetStringRef::from_der(tlv)?.as_bytes().to_vec())
        }
        FieldType::IntegerBytes => AttributeValue::Bytes(UintRef::from_der(tlv)?.as_bytes().to_vec()),
        FieldType::Oid => AttributeValue::Oid(ObjectIdentifier::from_der(tlv)?),
        FieldType::Null => {
            Null::from_der(tlv)?;
            AttributeValue::Unused
        }
        FieldType::Ia5String => AttributeValue::Text(Ia5StringRef::from_der(tlv)?.as_str().into()),
        FieldType::PrintableString => {
            AttributeValue::Text(PrintableStringRef::from_der(tlv)?.as_str().into())
        }
        FieldType::Utf8String => AttributeValue::Text(Utf8StringRef::from_der(tlv)?.as_str().into()),
        FieldType::VisibleString => {
            let any = AnyRef::from_der(tlv)?;
            let text = core::str::from_utf8(any.value())
                .map_err(|_| Error::bad_data("VisibleString isn't text"))?;
            AttributeValue::Text(text.into())
        }
        FieldType::UtcTime | FieldType::GeneralizedTime => {
            AttributeValue::Time(Time::from_der(tlv)?.unix_secs())
        }
        FieldType::Dn => AttributeValue::Name(Name::from_der(tlv)?),
        FieldType::Blob => AttributeValue::Bytes(tlv.to_vec()),
        FieldType::Identifier => {
            let oid = ObjectIdentifier::from_der(tlv)?;
            if row.oid != Some(oid) {
                return Err(Error::bad_data("unexpected identifier"));
            }
            AttributeValue::Unused
        }
        FieldType::Choice => {
            let oid = ObjectIdentifier::from_der(tlv)?;
            let selection = row
                .sub_table()
                .and_then(|rows| rows.iter().find(|r| r.oid == Some(oid)))
                .map(|r| r.default_value)
                .ok_or_else(|| Error::invalid(row.field(), ErrorType::AttrValue))?;
            AttributeValue::Integer(selection)
        }
        FieldType::Sequence | FieldType::Set | FieldType::Subtyped => {
            return Err(Error::internal("constructed row decoded as a field"))
        }
    };
    Ok(value)
}

/// Strip a field's context tag and decode its value.
fn decode_field(row: &AttributeInfo, tlv: &[u8]) -> Result<AttributeValue> {
    match row.tag {
        Some(_) if is_explicit(row) => {
            let inner = AnyRef::from_der(tlv)?;
            let mut reader = content_reader(&inner)?;
            let value_tlv = reader.tlv_bytes()?;
            if !reader.is_finished() {
                return Err(Error::bad_data("trailing data after tagged value"));
            }
            decode_universal(row, value_tlv)
        }
        Some(_) => {
            let universal = universal_tag(row.field_type)
                .ok_or_else(|| Error::internal("implicitly tagged row without universal tag"))?;
            let mut retagged = tlv.to_vec();
            retagged[0] = universal;
            decode_universal(row, &retagged)
        }
        None => decode_universal(row, tlv),
    }
}

impl Decoder {
    fn push(&mut self, scope: Scope, row: &AttributeInfo, value: AttributeValue) -> Result<()> {
        let field = row
            .field()
            .ok_or_else(|| Error::internal("value row without field"))?;
        row.check_value(&value)
            .map_err(|error_type| Error::invalid(Some(field), error_type))?;
        let (field_id, sub_field_id) = match scope {
            Scope::Top => (field, None),
            Scope::Sub(parent) => (parent, Some(field)),
        };
        self.fields.push(Decoded {
            field_id,
            sub_field_id,
            field_type: row.field_type,
            value,
        });
        Ok(())
    }

    fn decode_items(
        &mut self,
        rows: &'static [AttributeInfo],
        range: core::ops::Range<usize>,
        scope: Scope,
        reader: &mut SliceReader<'_>,
        depth: usize,
    ) -> Result<()> {
        if depth > MAX_NESTING_DEPTH {
            return Err(Error::overflow(Some(self.attribute_id)));
        }

        let mut i = range.start;
        while i < range.end {
            let row = &rows[i];
            let next = reader.peek_byte();

            if row.is_constructed() {
                let end = table::find_item_end(rows, i).min(range.end - 1);
                if next == Some(constructed_tag(row)) {
                    let any = read_tlv(reader)?;
                    let mut inner = content_reader(&any)?;
                    self.decode_constructed(rows, i, end, scope, &mut inner, depth)?;
                    finish(&inner, self.attribute_id)?;
                } else if !row.is_optional() && next.is_some() {
                    return Err(bad_field(row.field(), "missing SEQUENCE"));
                }
                i = end + 1;
                continue;
            }

            if row.field().is_none() {
                if row.field_type == FieldType::Identifier {
                    let oid = ObjectIdentifier::decode(reader)?;
                    if row.oid != Some(oid) {
                        return Err(bad_field(None, "unexpected identifier"));
                    }
                } else if row.has_flag(FL_NONENCODING) {
                    while !reader.is_finished() {
                        read_tlv(reader)?;
                    }
                }
                i += 1;
                continue;
            }

            let mut last = i;
            while last + 1 < range.end && rows[last + 1].field_id == row.field_id {
                last += 1;
            }

            let decoded = if row.field_type == FieldType::Subtyped {
                self.decode_general_name(row, reader, depth)?
            } else {
                let alternate = rows[i..=last]
                    .iter()
                    .find(|alt| next.is_some() && expected_tag(alt).map_or(true, |t| Some(t) == next));
                match alternate {
                    Some(alt) => {
                        let tlv = reader.tlv_bytes()?;
                        let value = decode_field(alt, tlv)?;
                        self.push(scope, alt, value)?;
                        true
                    }
                    None => false,
                }
            };
            if !decoded && !row.is_optional() {
                return Err(bad_field(row.field(), "mandatory field missing"));
            }
            i = last + 1;
        }
        Ok(())
    }

    fn decode_constructed(
        &mut self,
        rows: &'static [AttributeInfo],
        start: usize,
        end: usize,
        scope: Scope,
        reader: &mut SliceReader<'_>,
        depth: usize,
    ) -> Result<()> {
        let row = &rows[start];
        let inner = start + 1..end + 1;
        if inner.is_empty() {
            return Ok(());
        }
        let first = &rows[inner.start];

        // SEQUENCE OF OBJECT IDENTIFIER with one row per known value
        if first.field_type == FieldType::Identifier && first.field().is_some() {
            return self.decode_identifier_list(&rows[inner], reader);
        }

        if !row.has_flag(FL_SETOF) {
            return self.decode_items(rows, inner, scope, reader, depth + 1);
        }

        if first.has_flag(FL_IDENTIFIER) {
            return self.decode_identifier_groups(rows, inner, scope, reader, depth);
        }

        while !reader.is_finished() {
            let before = reader.position();
            self.decode_items(rows, inner.clone(), scope, reader, depth + 1)?;
            if reader.position() == before {
                return Err(bad_field(row.field(), "unexpected element in SET OF"));
            }
        }
        Ok(())
    }

    fn decode_identifier_list(
        &mut self,
        rows: &'static [AttributeInfo],
        reader: &mut SliceReader<'_>,
    ) -> Result<()> {
        while !reader.is_finished() {
            let oid = ObjectIdentifier::decode(reader)?;
            match rows.iter().find(|row| row.oid == Some(oid)) {
                Some(row) => self.push(Scope::Top, row, AttributeValue::Unused)?,
                None => log::debug!("skipping unknown identifier {}", oid),
            }
        }
        Ok(())
    }

    /// SEQUENCE OF { OID, value } where the OID selects the row group.
    fn decode_identifier_groups(
        &mut self,
        rows: &'static [AttributeInfo],
        inner: core::ops::Range<usize>,
        scope: Scope,
        reader: &mut SliceReader<'_>,
        depth: usize,
    ) -> Result<()> {
        while !reader.is_finished() {
            let element = read_tlv(reader)?;
            if element.tag() != der::Tag::Sequence {
                return Err(bad_field(None, "expected SEQUENCE"));
            }
            let mut content = content_reader(&element)?;
            let oid = ObjectIdentifier::decode(&mut content)?;

            let mut group = None;
            let mut g = inner.start;
            while g < inner.end {
                let group_end = table::find_item_end(rows, g);
                let is_match = rows.get(g + 1).map_or(false, |id_row| {
                    id_row.field_type == FieldType::Identifier && id_row.oid == Some(oid)
                });
                if is_match {
                    group = Some((g, group_end));
                    break;
                }
                g = group_end + 1;
            }

            match group {
                Some((g, group_end)) => {
                    self.decode_items(rows, g + 2..group_end + 1, scope, &mut content, depth + 2)?;
                    finish(&content, self.attribute_id)?;
                }
                None => log::debug!("skipping element with unknown identifier {}", oid),
            }
        }
        Ok(())
    }

    /// Decode the one GeneralName alternative present, if any.
    fn decode_general_name(
        &mut self,
        row: &'static AttributeInfo,
        reader: &mut SliceReader<'_>,
        depth: usize,
    ) -> Result<bool> {
        let parent = row
            .field()
            .ok_or_else(|| Error::internal("GeneralName row without field"))?;
        let sub_table = row
            .sub_table()
            .ok_or_else(|| Error::internal("GeneralName row without sub-table"))?;
        let next = match reader.peek_byte() {
            Some(next) => next,
            None => return Ok(false),
        };

        let mut i = 0;
        while i < sub_table.len() {
            let end = table::find_item_end(sub_table, i);
            if item_tag(&sub_table[i]) == Some(next) {
                self.decode_items(sub_table, i..end + 1, Scope::Sub(parent), reader, depth + 1)?;
                return Ok(true);
            }
            i = end + 1;
        }
        Err(Error::invalid(Some(parent), ErrorType::AttrValue))
    }
}

/// Decode one recognised attribute's payload into its field values.
fn decode_attribute(
    table: &'static [AttributeInfo],
    start: usize,
    attribute_id: CertInfo,
    payload: &[u8],
) -> Result<Vec<Decoded>> {
    let end = table::attribute_end(table, start);
    let mut decoder = Decoder {
        attribute_id,
        fields: Vec::new(),
    };
    let mut reader = SliceReader::new(payload)?;
    log::trace!("decoding {}", table[start].description);
    decoder.decode_items(table, start..end + 1, Scope::Top, &mut reader, 0)?;
    finish(&reader, attribute_id)?;

    // An attribute holding only default values keeps one of them so it
    // stays present
    if decoder.fields.is_empty() {
        if let Some(row) = table[start..=end]
            .iter()
            .find(|row| row.has_flag(table::FL_DEFAULT))
        {
            let value = match row.field_type {
                FieldType::Boolean => AttributeValue::Boolean(row.default_value != 0),
                _ => AttributeValue::Integer(row.default_value),
            };
            decoder.push(Scope::Top, row, value)?;
        }
    }
    Ok(decoder.fields)
}

// ============================================================================
// Attribute blocks
// ============================================================================

fn unwrap_tag<'a>(bytes: &'a [u8], tag_byte: u8) -> Result<&'a [u8]> {
    let mut reader = SliceReader::new(bytes)?;
    if reader.peek_byte() != Some(tag_byte) {
        return Err(Error::bad_data("unexpected attribute block tag"));
    }
    let any = read_tlv(&mut reader)?;
    if !reader.is_finished() {
        return Err(Error::bad_data("trailing data after attribute block"));
    }
    Ok(any.value())
}

/// Strip the object type's wrapper, leaving the concatenated attributes.
fn unwrap_block(bytes: &[u8], cert_type: CertType) -> Result<&[u8]> {
    let content = match cert_type {
        CertType::Certificate => unwrap_tag(unwrap_tag(bytes, 0xA3)?, 0x30)?,
        CertType::Crl => unwrap_tag(unwrap_tag(bytes, 0xA0)?, 0x30)?,
        CertType::CertRequest => {
            let mut reader = SliceReader::new(unwrap_tag(bytes, 0x30)?)?;
            let oid = ObjectIdentifier::decode(&mut reader)?;
            if oid != oids::EXTENSION_REQUEST && oid != oids::MS_EXTENSION_REQUEST {
                return Err(Error::bad_data("not an extension request"));
            }
            let set = reader.tlv_bytes()?;
            if !reader.is_finished() {
                return Err(Error::bad_data("trailing data after extension request"));
            }
            unwrap_tag(unwrap_tag(set, 0x31)?, 0x30)?
        }
        CertType::RequestCert | CertType::RequestRevocation => bytes,
        CertType::AttributeCertificate | CertType::PkiUser | CertType::RevocationEntry => {
            unwrap_tag(bytes, 0x30)?
        }
        CertType::OcspRequest => unwrap_tag(unwrap_tag(bytes, 0xA2)?, 0x30)?,
        CertType::OcspResponse => unwrap_tag(unwrap_tag(bytes, 0xA1)?, 0x30)?,
        CertType::CmsAttributes => unwrap_tag(bytes, 0xA0)?,
        CertType::RtcsRequest => unwrap_tag(bytes, 0x31)?,
        CertType::RtcsResponse => unwrap_tag(bytes, 0xA1)?,
    };
    Ok(content)
}

struct RawAttribute<'a> {
    oid: ObjectIdentifier,
    critical: bool,
    payload: &'a [u8],
}

fn read_raw_attribute<'a>(
    reader: &mut SliceReader<'a>,
    set_wrapped: bool,
) -> Result<RawAttribute<'a>> {
    let element = read_tlv(reader)?;
    if element.tag() != der::Tag::Sequence {
        return Err(Error::bad_data("attribute isn't a SEQUENCE"));
    }
    let mut content = content_reader(&element)?;
    let oid = ObjectIdentifier::decode(&mut content)?;

    let mut critical = false;
    let payload = if set_wrapped {
        let set = read_tlv(&mut content)?;
        if set.tag() != der::Tag::Set {
            return Err(Error::bad_data("attribute value isn't a SET"));
        }
        set.value()
    } else {
        if content.peek_byte() == Some(0x01) {
            critical = bool::decode(&mut content)?;
        }
        OctetStringRef::decode(&mut content)?.as_bytes()
    };
    if !content.is_finished() {
        return Err(Error::bad_data("trailing data in attribute"));
    }
    Ok(RawAttribute {
        oid,
        critical,
        payload,
    })
}

/// Parse an encoded attribute block for `cert_type` into a new list.
///
/// An empty input yields an empty list.
pub fn read_attributes(
    bytes: &[u8],
    cert_type: CertType,
    options: &CheckOptions,
) -> Result<AttributeList> {
    let mut list = AttributeList::new(cert_type.table_kind());
    if bytes.is_empty() {
        return Ok(list);
    }
    let table = list.table();
    let set_wrapped = cert_type.uses_set_encoding();
    let valid_mask = cert_type.valid_mask();

    let mut reader = SliceReader::new(unwrap_block(bytes, cert_type)?)?;
    let mut seen: Vec<ObjectIdentifier> = Vec::new();
    while !reader.is_finished() {
        let raw = read_raw_attribute(&mut reader, set_wrapped)?;
        if seen.contains(&raw.oid) {
            let locus = table::oid_to_attribute(table, &raw.oid)
                .and_then(|start| table::attribute_id_at(table, start));
            return Err(Error::attribute(
                ErrorKind::Duplicate,
                locus,
                ErrorType::AttrPresent,
            ));
        }
        seen.push(raw.oid);
        read_attribute(&mut list, &raw, valid_mask, options)?;
    }
    log::trace!(
        "read {} attributes for {:?}",
        seen.len(),
        cert_type
    );
    Ok(list)
}

fn read_attribute(
    list: &mut AttributeList,
    raw: &RawAttribute<'_>,
    valid_mask: u16,
    options: &CheckOptions,
) -> Result<()> {
    let table = list.table();
    let level = options.compliance_level;

    let start = match table::oid_to_attribute(table, &raw.oid) {
        Some(start) => start,
        None => return add_blob_attribute(list, raw.oid, raw.critical, raw.payload, false),
    };
    let attribute_id = table::attribute_id_at(table, start)
        .ok_or_else(|| Error::internal("attribute row without identifier"))?;
    let head = &table[start];

    if head.level > level {
        log::debug!(
            "{} is above compliance level {:?}, keeping as a blob",
            head.description,
            level
        );
        return add_blob_attribute(list, raw.oid, raw.critical, raw.payload, true);
    }
    if head.valid & valid_mask == 0 {
        if level < ComplianceLevel::Standard {
            log::debug!("{} isn't valid here, keeping as a blob", head.description);
            return add_blob_attribute(list, raw.oid, raw.critical, raw.payload, false);
        }
        return Err(Error::invalid(Some(attribute_id), ErrorType::AttrPresent));
    }

    let fields = decode_attribute(table, start, attribute_id, raw.payload)?;
    if fields.is_empty() {
        log::debug!("{} holds nothing recognised, keeping as a blob", head.description);
        return add_blob_attribute(list, raw.oid, raw.critical, raw.payload, false);
    }

    for decoded in fields {
        let owner = table
            .iter()
            .find(|row| row.field() == Some(decoded.field_id))
            .map_or(false, |row| row.has_flag(FL_MULTIVALUED));
        let mut entry = AttributeEntry::new(
            attribute_id,
            decoded.field_id,
            decoded.sub_field_id,
            decoded.field_type,
            decoded.value,
        );
        entry.flags.critical = raw.critical;
        entry.flags.multivalued = owner;
        list.insert_entry(entry);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::encode::write_attributes;
    use crate::attr::table::{TableKind, HOLD_REJECT};
    use crate::certificate::name::{COUNTRY_NAME, ORGANIZATION_NAME};

    fn extensions() -> AttributeList {
        AttributeList::new(TableKind::Extensions)
    }

    fn options() -> CheckOptions {
        CheckOptions::new().with_compliance_level(ComplianceLevel::PkixFull)
    }

    fn round_trip(list: &mut AttributeList, cert_type: CertType) -> AttributeList {
        let der = write_attributes(list, cert_type, &options()).unwrap();
        read_attributes(&der, cert_type, &options()).unwrap()
    }

    #[test]
    fn test_reason_code_classification() {
        assert_eq!(classify_reason_code(0), ReasonCodeOid::CrlReason);
        assert_eq!(classify_reason_code(10), ReasonCodeOid::CrlReason);
        assert_eq!(classify_reason_code(CRL_REASON_LAST), ReasonCodeOid::CrlExtReason);
        assert_eq!(
            classify_reason_code(CRL_EXT_REASON_NEVER_VALID).oid(),
            oids::CRL_EXT_REASON
        );

        let mut list = extensions();
        add_attribute_field(&mut list, CertInfo::CrlReason, None, AttributeValue::Integer(20))
            .unwrap();
        assert!(list.has_attribute(CertInfo::CrlExtReason));
        assert!(!list.has_attribute(CertInfo::CrlReason));
    }

    #[test]
    fn test_add_field_checks() {
        let mut list = extensions();
        add_attribute_field(&mut list, CertInfo::PathLenConstraint, None, AttributeValue::Integer(3)).unwrap();
        let err = add_attribute_field(&mut list, CertInfo::PathLenConstraint, None, AttributeValue::Integer(4))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Duplicate);

        let err = add_attribute_field(&mut list, CertInfo::InhibitAnyPolicy, None, AttributeValue::Integer(65))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invalid);
        assert_eq!(err.error_type(), ErrorType::AttrValue);
        assert_eq!(err.locus(), Some(CertInfo::InhibitAnyPolicy));

        let err = add_attribute_field(
            &mut list,
            CertInfo::SubjectAltName,
            Some(CertInfo::DnsName),
            "a".into(),
        )
        .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::AttrSize);

        // multi-valued GeneralNames
        for name in ["one.com", "two.com"] {
            add_attribute_field(
                &mut list,
                CertInfo::SubjectAltName,
                Some(CertInfo::DnsName),
                name.into(),
            )
            .unwrap();
        }
        assert_eq!(list.field_values(CertInfo::SubjectAltName).count(), 2);
        assert!(list.entries().iter().all(|e| e.field_id != CertInfo::SubjectAltName
            || e.flags.multivalued));
    }

    #[test]
    fn test_alternate_encoding_selected() {
        let mut list = extensions();
        add_attribute_field(&mut list, CertInfo::CertPolicyId, None, oids::ANY_POLICY.into())
            .unwrap();
        add_attribute_field(
            &mut list,
            CertInfo::CertPolicyExplicitText,
            None,
            "caf\u{e9}".into(),
        )
        .unwrap();
        let index = list.find(CertInfo::CertPolicyExplicitText, None).unwrap();
        assert_eq!(list.entries()[index].field_type, FieldType::Utf8String);

        let read = round_trip(&mut list, CertType::Certificate);
        assert_eq!(read.entries(), list.entries());
    }

    #[test]
    fn test_set_attribute_field_replaces() {
        let mut list = extensions();
        add_attribute_field(&mut list, CertInfo::KeyUsage, None, AttributeValue::Integer(1)).unwrap();
        set_attribute_field(&mut list, CertInfo::KeyUsage, None, AttributeValue::Integer(4)).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list.value(CertInfo::KeyUsage), Some(&AttributeValue::Integer(4)));

        list.lock_attribute(CertInfo::KeyUsage);
        let err = set_attribute_field(&mut list, CertInfo::KeyUsage, None, AttributeValue::Integer(2)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Permission);
    }

    #[test]
    fn test_blob_structure_check() {
        let mut list = extensions();
        let oid = ObjectIdentifier::new_unwrap("1.2.3.4");
        let err = add_blob_attribute(&mut list, oid, false, &[0x04, 0x05, 0x00], false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadData);
        add_blob_attribute(&mut list, oid, false, &[0x04, 0x05, 0x00], true).unwrap();
        assert!(list.blobs()[0].flags.ignored);
        let err = add_blob_attribute(&mut list, oid, false, &[0x05, 0x00], false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Duplicate);
    }

    #[test]
    fn test_round_trip_certificate_extensions() {
        let mut list = extensions();
        add_attribute_field(&mut list, CertInfo::Ca, None, true.into()).unwrap();
        add_attribute_field(&mut list, CertInfo::PathLenConstraint, None, AttributeValue::Integer(2)).unwrap();
        add_attribute_field(&mut list, CertInfo::KeyUsage, None, AttributeValue::Integer(0x60)).unwrap();
        add_attribute_field(
            &mut list,
            CertInfo::SubjectKeyIdentifier,
            None,
            AttributeValue::Bytes(alloc::vec![0x11; 20]),
        )
        .unwrap();
        add_attribute_field(
            &mut list,
            CertInfo::SubjectAltName,
            Some(CertInfo::Rfc822Name),
            "user@example.com".into(),
        )
        .unwrap();
        add_attribute_field(
            &mut list,
            CertInfo::SubjectAltName,
            Some(CertInfo::DnsName),
            "www.example.com".into(),
        )
        .unwrap();
        let mut name = Name::new();
        name.add_component(COUNTRY_NAME, "US").unwrap();
        name.add_component(ORGANIZATION_NAME, "Example").unwrap();
        add_attribute_field(
            &mut list,
            CertInfo::SubjectAltName,
            Some(CertInfo::DirectoryName),
            name.into(),
        )
        .unwrap();
        add_attribute_field(
            &mut list,
            CertInfo::AuthorityInfoOcsp,
            Some(CertInfo::UniformResourceIdentifier),
            "http://ocsp.example.com".into(),
        )
        .unwrap();
        add_attribute_field(&mut list, CertInfo::ExtKeyServerAuth, None, AttributeValue::Unused)
            .unwrap();
        add_attribute_field(&mut list, CertInfo::ExtKeyClientAuth, None, AttributeValue::Unused)
            .unwrap();
        add_attribute_field(
            &mut list,
            CertInfo::PermittedSubtrees,
            Some(CertInfo::DnsName),
            ".example.com".into(),
        )
        .unwrap();

        let read = round_trip(&mut list, CertType::Certificate);
        let strip = |l: &AttributeList| -> Vec<(CertInfo, CertInfo, Option<CertInfo>, AttributeValue)> {
            l.entries()
                .iter()
                .map(|e| (e.attribute_id, e.field_id, e.sub_field_id, e.value.clone()))
                .collect()
        };
        assert_eq!(strip(&read), strip(&list));
        assert!(read.is_critical(CertInfo::BasicConstraints));
    }

    #[test]
    fn test_default_only_attribute_survives() {
        let mut list = extensions();
        add_attribute_field(&mut list, CertInfo::Ca, None, false.into()).unwrap();
        let read = round_trip(&mut list, CertType::Certificate);
        assert_eq!(read.value(CertInfo::Ca), Some(&AttributeValue::Boolean(false)));
    }

    #[test]
    fn test_choice_and_reason_round_trip() {
        let mut list = extensions();
        add_attribute_field(&mut list, CertInfo::HoldInstructionCode, None, AttributeValue::Integer(HOLD_REJECT))
            .unwrap();
        add_attribute_field(&mut list, CertInfo::CrlReason, None, AttributeValue::Integer(1)).unwrap();
        let read = round_trip(&mut list, CertType::RevocationEntry);
        assert_eq!(
            read.value(CertInfo::HoldInstructionCode),
            Some(&AttributeValue::Integer(HOLD_REJECT))
        );
        assert_eq!(read.value(CertInfo::CrlReason), Some(&AttributeValue::Integer(1)));
    }

    #[test]
    fn test_unknown_extension_kept_as_blob() {
        // [3] { SEQ { SEQ { 1.2.3.4, OCTET STRING { NULL } } } }
        let der = [
            0xA3, 0x0D, 0x30, 0x0B, 0x30, 0x09, 0x06, 0x03, 0x2A, 0x03, 0x04, 0x04, 0x02, 0x05,
            0x00,
        ];
        let mut list = read_attributes(&der, CertType::Certificate, &options()).unwrap();
        assert!(list.entries().is_empty());
        assert_eq!(list.blobs().len(), 1);
        assert_eq!(list.blobs()[0].value, [0x05, 0x00]);

        let written = write_attributes(&mut list, CertType::Certificate, &options()).unwrap();
        assert_eq!(written, der);
    }

    #[test]
    fn test_compliance_downgrade_and_validity() {
        let mut list = extensions();
        add_attribute_field(&mut list, CertInfo::InhibitAnyPolicy, None, AttributeValue::Integer(1)).unwrap();
        let der = write_attributes(&mut list, CertType::Certificate, &options()).unwrap();

        // inhibitAnyPolicy is only decoded at PKIX full
        let read = read_attributes(&der, CertType::Certificate, &CheckOptions::new()).unwrap();
        assert!(!read.has_attribute(CertInfo::InhibitAnyPolicy));
        assert_eq!(read.blobs()[0].oid, oids::INHIBIT_ANY_POLICY);
        assert!(read.blobs()[0].flags.ignored);

        // keyUsage isn't valid in a CRL
        let mut list = extensions();
        add_attribute_field(&mut list, CertInfo::KeyUsage, None, AttributeValue::Integer(1)).unwrap();
        let der = write_attributes(&mut list, CertType::RequestCert, &options()).unwrap();
        let crl = [&[0xA0, der.len() as u8 + 2, 0x30, der.len() as u8][..], &der[..]].concat();
        let err = read_attributes(&crl, CertType::Crl, &options()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invalid);
        assert_eq!(err.locus(), Some(CertInfo::KeyUsage));

        let reduced = CheckOptions::new().with_compliance_level(ComplianceLevel::Reduced);
        let read = read_attributes(&crl, CertType::Crl, &reduced).unwrap();
        assert_eq!(read.blobs().len(), 1);
    }

    #[test]
    fn test_duplicate_extension_rejected() {
        // keyUsage with no bits set, twice, in an unwrapped request block
        let ku = [
            0x30, 0x0A, 0x06, 0x03, 0x55, 0x1D, 0x0F, 0x04, 0x03, 0x03, 0x01, 0x00,
        ];
        let read = read_attributes(&ku, CertType::RequestCert, &options()).unwrap();
        assert_eq!(read.value(CertInfo::KeyUsage), Some(&AttributeValue::Integer(0)));

        let block = [&ku[..], &ku[..]].concat();
        let err = read_attributes(&block, CertType::RequestCert, &options()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Duplicate);
        assert_eq!(err.locus(), Some(CertInfo::KeyUsage));
    }

    fn aia_block(descriptions: &[Vec<u8>]) -> Vec<u8> {
        use crate::attr::encode::tlv;
        use der::Encode;

        let aia = tlv(0x30, &descriptions.concat()).unwrap();
        let mut ext = oids::AUTHORITY_INFO_ACCESS.to_der().unwrap();
        ext.extend_from_slice(&tlv(0x04, &aia).unwrap());
        let ext = tlv(0x30, &ext).unwrap();
        tlv(0xA3, &tlv(0x30, &ext).unwrap()).unwrap()
    }

    #[test]
    fn test_unknown_access_method_skipped() {
        use crate::attr::encode::tlv;
        use der::Encode;

        let unknown = tlv(
            0x30,
            &[0x06, 0x03, 0x2A, 0x03, 0x04, 0x86, 0x04, b'h', b't', b't', b'p'],
        )
        .unwrap();
        let mut known = oids::AD_CA_ISSUERS.to_der().unwrap();
        known.extend_from_slice(&tlv(0x86, b"http://ca.example.com/ca.crt").unwrap());
        let known = tlv(0x30, &known).unwrap();

        let block = aia_block(&[unknown.clone(), known]);
        let read = read_attributes(&block, CertType::Certificate, &options()).unwrap();
        assert_eq!(read.len(), 1);
        assert_eq!(read.entries()[0].field_id, CertInfo::AuthorityInfoCaIssuers);
        assert_eq!(
            read.entries()[0].value,
            AttributeValue::Text("http://ca.example.com/ca.crt".into())
        );

        // nothing recognised at all: the extension is kept whole
        let block = aia_block(&[unknown]);
        let read = read_attributes(&block, CertType::Certificate, &options()).unwrap();
        assert!(read.entries().is_empty());
        assert_eq!(read.blobs()[0].oid, oids::AUTHORITY_INFO_ACCESS);
    }
}
