// Copyright (c) 2026 Intel Corporation
//
// SPDX-License-Identifier: Apache-2.0 or MIT

//! Attribute description tables
//!
//! Every attribute the engine understands is described by a run of
//! contiguous [`AttributeInfo`] rows, one per ASN.1 element. A row either
//! opens a SEQUENCE/SET (children follow it, and the `seq_end` count on the
//! last child closes it again) or describes a leaf. `FL_MORE` on a row means
//! the next row still belongs to the same attribute.
//!
//! Consecutive rows with the same field identifier are alternate encodings
//! of one field: the first is used when encoding, any of them is accepted
//! when decoding.
//!
//! # References
//! - RFC 5280 Section 4.2 - Certificate Extensions
//! - RFC 5280 Section 5.3 - CRL Entry Extensions
//! - RFC 5652 Section 11 - Useful Attributes

use core::fmt;

use const_oid::ObjectIdentifier;

use super::oids;
use super::{AttributeValue, CertInfo};
use crate::config::ComplianceLevel;
use crate::error::ErrorType;

// ============================================================================
// Row flags
// ============================================================================

/// Field may be absent
pub const FL_OPTIONAL: u32 = 0x0001;
/// Field has a default value and is omitted when it holds it
pub const FL_DEFAULT: u32 = 0x0002;
/// Context tag is explicit (wraps the universal encoding)
pub const FL_EXPLICIT: u32 = 0x0004;
/// SEQUENCE { OID, value } group selected by its OID
pub const FL_IDENTIFIER: u32 = 0x0008;
/// SET OF / SEQUENCE OF: the children repeat
pub const FL_SETOF: u32 = 0x0010;
/// Constructed item must contain at least one element
pub const FL_NONEMPTY: u32 = 0x0020;
/// Row is never written
pub const FL_NONENCODING: u32 = 0x0040;
/// Field may occur more than once
pub const FL_MULTIVALUED: u32 = 0x0080;
/// Attribute is not copied from requests into certificates
pub const FL_NOCOPY: u32 = 0x0100;
/// Attribute is always marked critical
pub const FL_CRITICAL: u32 = 0x0200;
/// Next row belongs to the same attribute
pub const FL_MORE: u32 = 0x0400;

// ============================================================================
// Valid object types
// ============================================================================

pub const VALID_CERT: u16 = 0x0001;
pub const VALID_ATTRCERT: u16 = 0x0002;
pub const VALID_CRL: u16 = 0x0004;
pub const VALID_CERTREQ: u16 = 0x0008;
pub const VALID_REQCERT: u16 = 0x0010;
pub const VALID_REVREQ: u16 = 0x0020;
pub const VALID_OCSPREQ: u16 = 0x0040;
pub const VALID_OCSPRESP: u16 = 0x0080;
pub const VALID_RTCSREQ: u16 = 0x0100;
pub const VALID_RTCSRESP: u16 = 0x0200;
pub const VALID_PKIUSER: u16 = 0x0400;
pub const VALID_CMS: u16 = 0x0800;

// ============================================================================
// CHOICE values
// ============================================================================

pub const HOLD_NONE: i64 = 1;
pub const HOLD_CALL_ISSUER: i64 = 2;
pub const HOLD_REJECT: i64 = 3;
pub const HOLD_PICKUP_TOKEN: i64 = 4;

pub const CONTENT_TYPE_DATA: i64 = 1;
pub const CONTENT_TYPE_SIGNED_DATA: i64 = 2;
pub const CONTENT_TYPE_ENVELOPED_DATA: i64 = 3;
pub const CONTENT_TYPE_DIGESTED_DATA: i64 = 4;
pub const CONTENT_TYPE_ENCRYPTED_DATA: i64 = 5;
pub const CONTENT_TYPE_AUTH_DATA: i64 = 6;
pub const CONTENT_TYPE_TST_INFO: i64 = 7;

// ============================================================================
// Row types
// ============================================================================

/// ASN.1 type of a row as defined (before any context tagging).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Boolean,
    Integer,
    Enumerated,
    /// Named bit flags held as an integer
    BitString,
    OctetString,
    /// Unsigned INTEGER carried as a byte string (serial numbers, nonces)
    IntegerBytes,
    Oid,
    Null,
    Ia5String,
    PrintableString,
    VisibleString,
    Utf8String,
    UtcTime,
    GeneralizedTime,
    Sequence,
    Set,
    /// Fixed OID written from the table
    Identifier,
    /// Pre-encoded TLV
    Blob,
    /// One of several OIDs in a sub-table, held as an integer selection
    Choice,
    /// Distinguished name
    Dn,
    /// Reference to a sub-table (a GeneralName)
    Subtyped,
}

/// Field identifier carried by a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldId {
    /// Structural row with no field of its own
    None,
    /// The attribute identifier is given by a later row
    Follows,
    Id(CertInfo),
}

/// Extended validation applied after the type and range checks.
pub type ValidateFn = fn(&AttributeValue) -> core::result::Result<(), ErrorType>;

/// Extra data hanging off a row.
#[derive(Clone, Copy)]
pub enum Extra {
    None,
    SubTable(&'static [AttributeInfo]),
    Validate(ValidateFn),
}

impl PartialEq for Extra {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Extra::None, Extra::None) => true,
            (Extra::SubTable(a), Extra::SubTable(b)) => core::ptr::eq(*a, *b),
            (Extra::Validate(a), Extra::Validate(b)) => *a as usize == *b as usize,
            _ => false,
        }
    }
}

impl Eq for Extra {}

impl fmt::Debug for Extra {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Extra::None => f.write_str("None"),
            Extra::SubTable(rows) => write!(f, "SubTable({} rows)", rows.len()),
            Extra::Validate(_) => f.write_str("Validate"),
        }
    }
}

/// One row of a description table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeInfo {
    /// OID of the attribute (on its first row) or of an identifier row
    pub oid: Option<ObjectIdentifier>,
    pub field_id: FieldId,
    pub description: &'static str,
    pub field_type: FieldType,
    /// Context-specific tag number, if tagged
    pub tag: Option<u8>,
    pub flags: u32,
    /// Number of enclosing constructed items this row closes
    pub seq_end: u8,
    /// Lowest compliance level at which the attribute is decoded
    pub level: ComplianceLevel,
    /// `VALID_*` object types the attribute may appear in
    pub valid: u16,
    /// Value range for integers, length range for strings
    pub low: i64,
    pub high: i64,
    /// Default for `FL_DEFAULT` fields, selection value for CHOICE rows
    pub default_value: i64,
    pub extra: Extra,
}

const ROW: AttributeInfo = AttributeInfo {
    oid: None,
    field_id: FieldId::None,
    description: "",
    field_type: FieldType::Sequence,
    tag: None,
    flags: 0,
    seq_end: 0,
    level: ComplianceLevel::Oblivious,
    valid: 0,
    low: 0,
    high: 0,
    default_value: 0,
    extra: Extra::None,
};

impl AttributeInfo {
    pub fn field(&self) -> Option<CertInfo> {
        match self.field_id {
            FieldId::Id(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_constructed(&self) -> bool {
        matches!(self.field_type, FieldType::Sequence | FieldType::Set)
    }

    pub fn is_optional(&self) -> bool {
        self.flags & (FL_OPTIONAL | FL_DEFAULT) != 0
    }

    pub fn has_flag(&self, flag: u32) -> bool {
        self.flags & flag != 0
    }

    pub fn sub_table(&self) -> Option<&'static [AttributeInfo]> {
        match self.extra {
            Extra::SubTable(rows) => Some(rows),
            _ => None,
        }
    }

    /// True if `value` equals this row's default and may be omitted.
    pub fn is_default(&self, value: &AttributeValue) -> bool {
        self.has_flag(FL_DEFAULT) && value.as_integer() == Some(self.default_value)
    }

    /// Type, range and extended checks for a value stored in this field.
    pub fn check_value(&self, value: &AttributeValue) -> core::result::Result<(), ErrorType> {
        match self.field_type {
            FieldType::Boolean => {
                value.as_bool().ok_or(ErrorType::AttrValue)?;
            }
            FieldType::Integer | FieldType::Enumerated | FieldType::BitString => {
                let v = value.as_integer().ok_or(ErrorType::AttrValue)?;
                if v < self.low || v > self.high {
                    return Err(ErrorType::AttrValue);
                }
            }
            FieldType::Choice => {
                let v = value.as_integer().ok_or(ErrorType::AttrValue)?;
                let rows = self.sub_table().ok_or(ErrorType::AttrValue)?;
                if !rows.iter().any(|r| r.default_value == v) {
                    return Err(ErrorType::AttrValue);
                }
            }
            FieldType::OctetString | FieldType::IntegerBytes | FieldType::Blob => {
                let bytes = match value {
                    AttributeValue::Bytes(b) => b,
                    _ => return Err(ErrorType::AttrValue),
                };
                self.check_length(bytes.len())?;
                if self.field_type == FieldType::Blob && !is_single_tlv(bytes) {
                    return Err(ErrorType::AttrValue);
                }
            }
            FieldType::Ia5String
            | FieldType::PrintableString
            | FieldType::VisibleString
            | FieldType::Utf8String => {
                let text = value.as_str().ok_or(ErrorType::AttrValue)?;
                self.check_length(text.len())?;
                if !string_type_allows(self.field_type, text) {
                    return Err(ErrorType::AttrValue);
                }
            }
            FieldType::Oid => {
                value.as_oid().ok_or(ErrorType::AttrValue)?;
            }
            FieldType::UtcTime | FieldType::GeneralizedTime => {
                value.as_time().ok_or(ErrorType::AttrValue)?;
            }
            FieldType::Dn => {
                value.as_name().ok_or(ErrorType::AttrValue)?;
            }
            FieldType::Identifier | FieldType::Null => {
                if *value != AttributeValue::Unused {
                    return Err(ErrorType::AttrValue);
                }
            }
            FieldType::Sequence | FieldType::Set | FieldType::Subtyped => {
                return Err(ErrorType::AttrValue);
            }
        }

        if let Extra::Validate(validate) = self.extra {
            validate(value)?;
        }
        Ok(())
    }

    fn check_length(&self, len: usize) -> core::result::Result<(), ErrorType> {
        let len = len as i64;
        if len < self.low || len > self.high {
            return Err(ErrorType::AttrSize);
        }
        Ok(())
    }
}

fn string_type_allows(field_type: FieldType, text: &str) -> bool {
    match field_type {
        FieldType::Ia5String => text.is_ascii(),
        FieldType::VisibleString => text.bytes().all(|b| (0x20..=0x7E).contains(&b)),
        FieldType::PrintableString => text
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b" '()+,-./:=?".contains(&b)),
        _ => true,
    }
}

/// True if `bytes` is exactly one well-formed TLV.
pub(crate) fn is_single_tlv(bytes: &[u8]) -> bool {
    use der::Decode;
    der::asn1::AnyRef::from_der(bytes).is_ok()
}

// ============================================================================
// Extended validation
// ============================================================================

const MIN_DNS_SIZE: i64 = 3;
const MIN_RFC822_SIZE: i64 = 3;
const MIN_URL_SIZE: i64 = 4;
const MAX_NAME_SIZE: i64 = 255;

#[derive(Clone, Copy, PartialEq, Eq)]
enum UrlKind {
    Dns,
    Rfc822,
    Url,
}

fn check_url_string(text: &str, kind: UrlKind) -> core::result::Result<(), ErrorType> {
    let mut s = text;
    let has_scheme = s.contains("://");

    match kind {
        UrlKind::Dns => {
            if has_scheme {
                return Err(ErrorType::AttrValue);
            }
            // A leading pair of digits is almost always an IP address
            let b = s.as_bytes();
            if b.len() >= 2 && b[0].is_ascii_digit() && b[1].is_ascii_digit() {
                return Err(ErrorType::AttrValue);
            }
            s = s.strip_prefix("*.").unwrap_or(s);
        }
        UrlKind::Rfc822 => {
            if has_scheme {
                return Err(ErrorType::AttrValue);
            }
            s = s.strip_prefix("*@").unwrap_or(s);
        }
        UrlKind::Url => {
            if !has_scheme {
                return Err(ErrorType::AttrValue);
            }
        }
    }

    if s.is_empty() {
        return Err(ErrorType::AttrValue);
    }
    if s
        .bytes()
        .any(|b| !(0x21..=0x7E).contains(&b) || b"<>\"{}|\\^[]`*".contains(&b))
    {
        return Err(ErrorType::AttrValue);
    }
    Ok(())
}

fn check_text(value: &AttributeValue, kind: UrlKind) -> core::result::Result<(), ErrorType> {
    let text = value.as_str().ok_or(ErrorType::AttrValue)?;
    check_url_string(text, kind)
}

pub fn check_dns(value: &AttributeValue) -> core::result::Result<(), ErrorType> {
    check_text(value, UrlKind::Dns)
}

pub fn check_rfc822(value: &AttributeValue) -> core::result::Result<(), ErrorType> {
    check_text(value, UrlKind::Rfc822)
}

pub fn check_url(value: &AttributeValue) -> core::result::Result<(), ErrorType> {
    check_text(value, UrlKind::Url)
}

// ============================================================================
// GeneralName
// ============================================================================

/// GeneralName alternatives, RFC 5280 Section 4.2.1.6.
pub const GENERAL_NAME_INFO: &[AttributeInfo] = &[
    // otherName [0] SEQUENCE { type-id OID, value [0] EXPLICIT ANY }
    AttributeInfo {
        description: "otherName",
        tag: Some(0),
        flags: FL_OPTIONAL,
        ..ROW
    },
    AttributeInfo {
        field_id: FieldId::Id(CertInfo::OtherNameTypeId),
        description: "otherName.typeID",
        field_type: FieldType::Oid,
        ..ROW
    },
    AttributeInfo {
        field_id: FieldId::Id(CertInfo::OtherNameValue),
        description: "otherName.value",
        field_type: FieldType::Blob,
        tag: Some(0),
        flags: FL_EXPLICIT,
        seq_end: 1,
        low: 3,
        high: 512,
        ..ROW
    },
    AttributeInfo {
        field_id: FieldId::Id(CertInfo::Rfc822Name),
        description: "rfc822Name",
        field_type: FieldType::Ia5String,
        tag: Some(1),
        flags: FL_OPTIONAL,
        low: MIN_RFC822_SIZE,
        high: MAX_NAME_SIZE,
        extra: Extra::Validate(check_rfc822),
        ..ROW
    },
    AttributeInfo {
        field_id: FieldId::Id(CertInfo::DnsName),
        description: "dNSName",
        field_type: FieldType::Ia5String,
        tag: Some(2),
        flags: FL_OPTIONAL,
        low: MIN_DNS_SIZE,
        high: MAX_NAME_SIZE,
        extra: Extra::Validate(check_dns),
        ..ROW
    },
    // Name is itself a CHOICE so the tag must be explicit
    AttributeInfo {
        field_id: FieldId::Id(CertInfo::DirectoryName),
        description: "directoryName",
        field_type: FieldType::Dn,
        tag: Some(4),
        flags: FL_OPTIONAL | FL_EXPLICIT,
        ..ROW
    },
    AttributeInfo {
        description: "ediPartyName",
        tag: Some(5),
        flags: FL_OPTIONAL,
        ..ROW
    },
    AttributeInfo {
        field_id: FieldId::Id(CertInfo::EdiPartyNameAssigner),
        description: "ediPartyName.nameAssigner",
        field_type: FieldType::PrintableString,
        tag: Some(0),
        flags: FL_OPTIONAL | FL_EXPLICIT,
        low: 1,
        high: 64,
        ..ROW
    },
    AttributeInfo {
        field_id: FieldId::Id(CertInfo::EdiPartyNamePartyName),
        description: "ediPartyName.partyName",
        field_type: FieldType::PrintableString,
        tag: Some(1),
        flags: FL_EXPLICIT,
        seq_end: 1,
        low: 1,
        high: 64,
        ..ROW
    },
    AttributeInfo {
        field_id: FieldId::Id(CertInfo::UniformResourceIdentifier),
        description: "uniformResourceIdentifier",
        field_type: FieldType::Ia5String,
        tag: Some(6),
        flags: FL_OPTIONAL,
        low: MIN_URL_SIZE,
        high: MAX_NAME_SIZE,
        extra: Extra::Validate(check_url),
        ..ROW
    },
    AttributeInfo {
        field_id: FieldId::Id(CertInfo::IpAddress),
        description: "iPAddress",
        field_type: FieldType::OctetString,
        tag: Some(7),
        flags: FL_OPTIONAL,
        low: 4,
        high: 16,
        ..ROW
    },
    AttributeInfo {
        field_id: FieldId::Id(CertInfo::RegisteredId),
        description: "registeredID",
        field_type: FieldType::Oid,
        tag: Some(8),
        flags: FL_OPTIONAL,
        ..ROW
    },
];

// ============================================================================
// CHOICE sub-tables
// ============================================================================

const HOLD_INSTRUCTION_INFO: &[AttributeInfo] = &[
    AttributeInfo {
        oid: Some(oids::HOLD_INSTRUCTION_NONE),
        description: "holdInstructionCode.none",
        field_type: FieldType::Identifier,
        default_value: HOLD_NONE,
        ..ROW
    },
    AttributeInfo {
        oid: Some(oids::HOLD_INSTRUCTION_CALL_ISSUER),
        description: "holdInstructionCode.callIssuer",
        field_type: FieldType::Identifier,
        default_value: HOLD_CALL_ISSUER,
        ..ROW
    },
    AttributeInfo {
        oid: Some(oids::HOLD_INSTRUCTION_REJECT),
        description: "holdInstructionCode.reject",
        field_type: FieldType::Identifier,
        default_value: HOLD_REJECT,
        ..ROW
    },
    AttributeInfo {
        oid: Some(oids::HOLD_INSTRUCTION_PICKUP_TOKEN),
        description: "holdInstructionCode.pickupToken",
        field_type: FieldType::Identifier,
        default_value: HOLD_PICKUP_TOKEN,
        ..ROW
    },
];

const CONTENT_TYPE_INFO: &[AttributeInfo] = &[
    AttributeInfo {
        oid: Some(oids::CONTENT_DATA),
        description: "contentType.data",
        field_type: FieldType::Identifier,
        default_value: CONTENT_TYPE_DATA,
        ..ROW
    },
    AttributeInfo {
        oid: Some(oids::CONTENT_SIGNED_DATA),
        description: "contentType.signedData",
        field_type: FieldType::Identifier,
        default_value: CONTENT_TYPE_SIGNED_DATA,
        ..ROW
    },
    AttributeInfo {
        oid: Some(oids::CONTENT_ENVELOPED_DATA),
        description: "contentType.envelopedData",
        field_type: FieldType::Identifier,
        default_value: CONTENT_TYPE_ENVELOPED_DATA,
        ..ROW
    },
    AttributeInfo {
        oid: Some(oids::CONTENT_DIGESTED_DATA),
        description: "contentType.digestedData",
        field_type: FieldType::Identifier,
        default_value: CONTENT_TYPE_DIGESTED_DATA,
        ..ROW
    },
    AttributeInfo {
        oid: Some(oids::CONTENT_ENCRYPTED_DATA),
        description: "contentType.encryptedData",
        field_type: FieldType::Identifier,
        default_value: CONTENT_TYPE_ENCRYPTED_DATA,
        ..ROW
    },
    AttributeInfo {
        oid: Some(oids::CONTENT_AUTH_DATA),
        description: "contentType.authData",
        field_type: FieldType::Identifier,
        default_value: CONTENT_TYPE_AUTH_DATA,
        ..ROW
    },
    AttributeInfo {
        oid: Some(oids::CONTENT_TST_INFO),
        description: "contentType.tstInfo",
        field_type: FieldType::Identifier,
        default_value: CONTENT_TYPE_TST_INFO,
        ..ROW
    },
];

// ============================================================================
// Certificate, CRL and request extensions
// ============================================================================

/// Extensions and request attributes, ordered by field identifier.
pub static EXTENSION_INFO: &[AttributeInfo] = &[
    // challengePassword (PKCS #9): never copied into the issued certificate
    AttributeInfo {
        oid: Some(oids::CHALLENGE_PASSWORD),
        field_id: FieldId::Id(CertInfo::ChallengePassword),
        description: "challengePassword",
        field_type: FieldType::PrintableString,
        flags: FL_NOCOPY,
        level: ComplianceLevel::Standard,
        valid: VALID_CERTREQ,
        low: 1,
        high: 64,
        ..ROW
    },
    // cRLExtReason: reason codes that don't fit in cRLReason
    AttributeInfo {
        oid: Some(oids::CRL_EXT_REASON),
        field_id: FieldId::Id(CertInfo::CrlExtReason),
        description: "cRLExtReason",
        field_type: FieldType::Enumerated,
        level: ComplianceLevel::Standard,
        valid: VALID_CRL | VALID_REVREQ,
        low: 0,
        high: 20,
        ..ROW
    },
    AttributeInfo {
        oid: Some(oids::KEY_FEATURES),
        field_id: FieldId::Id(CertInfo::KeyFeatures),
        description: "keyFeatures",
        field_type: FieldType::BitString,
        level: ComplianceLevel::Standard,
        valid: VALID_CERT | VALID_CERTREQ,
        low: 0,
        high: 7,
        ..ROW
    },
    // authorityInfoAccess: SEQUENCE OF accessDescription
    AttributeInfo {
        oid: Some(oids::AUTHORITY_INFO_ACCESS),
        field_id: FieldId::Id(CertInfo::AuthorityInfoAccess),
        description: "authorityInfoAccess",
        flags: FL_MORE | FL_SETOF,
        level: ComplianceLevel::Standard,
        valid: VALID_CERT,
        ..ROW
    },
    AttributeInfo {
        description: "authorityInfoAccess.accessDescription (rtcs)",
        flags: FL_MORE | FL_IDENTIFIER | FL_OPTIONAL,
        ..ROW
    },
    AttributeInfo {
        oid: Some(oids::AD_RTCS),
        description: "authorityInfoAccess.rtcs",
        field_type: FieldType::Identifier,
        flags: FL_MORE,
        ..ROW
    },
    AttributeInfo {
        field_id: FieldId::Id(CertInfo::AuthorityInfoRtcs),
        description: "authorityInfoAccess.accessDescription.accessLocation (rtcs)",
        field_type: FieldType::Subtyped,
        flags: FL_MORE | FL_OPTIONAL | FL_MULTIVALUED,
        seq_end: 1,
        extra: Extra::SubTable(GENERAL_NAME_INFO),
        ..ROW
    },
    AttributeInfo {
        description: "authorityInfoAccess.accessDescription (ocsp)",
        flags: FL_MORE | FL_IDENTIFIER | FL_OPTIONAL,
        ..ROW
    },
    AttributeInfo {
        oid: Some(oids::AD_OCSP),
        description: "authorityInfoAccess.ocsp",
        field_type: FieldType::Identifier,
        flags: FL_MORE,
        ..ROW
    },
    AttributeInfo {
        field_id: FieldId::Id(CertInfo::AuthorityInfoOcsp),
        description: "authorityInfoAccess.accessDescription.accessLocation (ocsp)",
        field_type: FieldType::Subtyped,
        flags: FL_MORE | FL_OPTIONAL | FL_MULTIVALUED,
        seq_end: 1,
        extra: Extra::SubTable(GENERAL_NAME_INFO),
        ..ROW
    },
    AttributeInfo {
        description: "authorityInfoAccess.accessDescription (caIssuers)",
        flags: FL_MORE | FL_IDENTIFIER | FL_OPTIONAL,
        ..ROW
    },
    AttributeInfo {
        oid: Some(oids::AD_CA_ISSUERS),
        description: "authorityInfoAccess.caIssuers",
        field_type: FieldType::Identifier,
        flags: FL_MORE,
        ..ROW
    },
    AttributeInfo {
        field_id: FieldId::Id(CertInfo::AuthorityInfoCaIssuers),
        description: "authorityInfoAccess.accessDescription.accessLocation (caIssuers)",
        field_type: FieldType::Subtyped,
        flags: FL_MORE | FL_OPTIONAL | FL_MULTIVALUED,
        seq_end: 1,
        extra: Extra::SubTable(GENERAL_NAME_INFO),
        ..ROW
    },
    // Any other access method is skipped on read
    AttributeInfo {
        description: "authorityInfoAccess.accessDescription (catch-all)",
        flags: FL_MORE | FL_IDENTIFIER | FL_OPTIONAL,
        ..ROW
    },
    AttributeInfo {
        description: "authorityInfoAccess.accessDescription (skipped)",
        field_type: FieldType::Blob,
        flags: FL_OPTIONAL | FL_NONENCODING,
        seq_end: 2,
        ..ROW
    },
    // ocspNonce: an INTEGER, although some responders send an OCTET STRING
    AttributeInfo {
        oid: Some(oids::OCSP_NONCE),
        field_id: FieldId::Id(CertInfo::OcspNonce),
        description: "ocspNonce",
        field_type: FieldType::IntegerBytes,
        flags: FL_MORE | FL_OPTIONAL,
        level: ComplianceLevel::Standard,
        valid: VALID_OCSPREQ | VALID_OCSPRESP,
        low: 1,
        high: 64,
        ..ROW
    },
    AttributeInfo {
        field_id: FieldId::Id(CertInfo::OcspNonce),
        description: "ocspNonce (octet string)",
        field_type: FieldType::OctetString,
        flags: FL_OPTIONAL,
        low: 1,
        high: 64,
        ..ROW
    },
    AttributeInfo {
        oid: Some(oids::SUBJECT_KEY_IDENTIFIER),
        field_id: FieldId::Id(CertInfo::SubjectKeyIdentifier),
        description: "subjectKeyIdentifier",
        field_type: FieldType::OctetString,
        level: ComplianceLevel::Standard,
        valid: VALID_CERT,
        low: 1,
        high: 64,
        ..ROW
    },
    AttributeInfo {
        oid: Some(oids::KEY_USAGE),
        field_id: FieldId::Id(CertInfo::KeyUsage),
        description: "keyUsage",
        field_type: FieldType::BitString,
        flags: FL_CRITICAL,
        level: ComplianceLevel::Reduced,
        valid: VALID_CERTREQ | VALID_CERT,
        low: 0,
        high: 0x1FF,
        ..ROW
    },
    // subjectAltName: the attribute and its only field share an identifier
    AttributeInfo {
        oid: Some(oids::SUBJECT_ALT_NAME),
        field_id: FieldId::Follows,
        description: "subjectAltName",
        flags: FL_MORE | FL_SETOF,
        level: ComplianceLevel::Standard,
        valid: VALID_CERTREQ | VALID_CERT,
        ..ROW
    },
    AttributeInfo {
        field_id: FieldId::Id(CertInfo::SubjectAltName),
        description: "subjectAltName.generalName",
        field_type: FieldType::Subtyped,
        flags: FL_MULTIVALUED,
        seq_end: 1,
        extra: Extra::SubTable(GENERAL_NAME_INFO),
        ..ROW
    },
    AttributeInfo {
        oid: Some(oids::ISSUER_ALT_NAME),
        field_id: FieldId::Follows,
        description: "issuerAltName",
        flags: FL_MORE | FL_SETOF,
        level: ComplianceLevel::Standard,
        valid: VALID_CERT | VALID_CRL,
        ..ROW
    },
    AttributeInfo {
        field_id: FieldId::Id(CertInfo::IssuerAltName),
        description: "issuerAltName.generalName",
        field_type: FieldType::Subtyped,
        flags: FL_MULTIVALUED,
        seq_end: 1,
        extra: Extra::SubTable(GENERAL_NAME_INFO),
        ..ROW
    },
    // basicConstraints
    AttributeInfo {
        oid: Some(oids::BASIC_CONSTRAINTS),
        field_id: FieldId::Id(CertInfo::BasicConstraints),
        description: "basicConstraints",
        flags: FL_MORE | FL_CRITICAL,
        level: ComplianceLevel::Reduced,
        valid: VALID_CERTREQ | VALID_CERT | VALID_ATTRCERT,
        ..ROW
    },
    AttributeInfo {
        field_id: FieldId::Id(CertInfo::Ca),
        description: "basicConstraints.cA",
        field_type: FieldType::Boolean,
        flags: FL_MORE | FL_OPTIONAL | FL_DEFAULT,
        high: 1,
        default_value: 0,
        ..ROW
    },
    AttributeInfo {
        field_id: FieldId::Id(CertInfo::PathLenConstraint),
        description: "basicConstraints.pathLenConstraint",
        field_type: FieldType::Integer,
        flags: FL_OPTIONAL,
        seq_end: 1,
        low: 0,
        high: 64,
        ..ROW
    },
    AttributeInfo {
        oid: Some(oids::CRL_NUMBER),
        field_id: FieldId::Id(CertInfo::CrlNumber),
        description: "cRLNumber",
        field_type: FieldType::Integer,
        level: ComplianceLevel::PkixPartial,
        valid: VALID_CRL,
        low: 0,
        high: i32::MAX as i64,
        ..ROW
    },
    AttributeInfo {
        oid: Some(oids::CRL_REASON),
        field_id: FieldId::Id(CertInfo::CrlReason),
        description: "cRLReason",
        field_type: FieldType::Enumerated,
        level: ComplianceLevel::Reduced,
        valid: VALID_CRL | VALID_REVREQ,
        low: 0,
        high: 10,
        ..ROW
    },
    AttributeInfo {
        oid: Some(oids::HOLD_INSTRUCTION_CODE),
        field_id: FieldId::Id(CertInfo::HoldInstructionCode),
        description: "holdInstructionCode",
        field_type: FieldType::Choice,
        level: ComplianceLevel::PkixPartial,
        valid: VALID_CRL | VALID_REVREQ,
        low: HOLD_NONE,
        high: HOLD_PICKUP_TOKEN,
        extra: Extra::SubTable(HOLD_INSTRUCTION_INFO),
        ..ROW
    },
    AttributeInfo {
        oid: Some(oids::INVALIDITY_DATE),
        field_id: FieldId::Id(CertInfo::InvalidityDate),
        description: "invalidityDate",
        field_type: FieldType::GeneralizedTime,
        level: ComplianceLevel::Standard,
        valid: VALID_CRL | VALID_REVREQ,
        ..ROW
    },
    AttributeInfo {
        oid: Some(oids::DELTA_CRL_INDICATOR),
        field_id: FieldId::Id(CertInfo::DeltaCrlIndicator),
        description: "deltaCRLIndicator",
        field_type: FieldType::Integer,
        flags: FL_CRITICAL,
        level: ComplianceLevel::PkixPartial,
        valid: VALID_CRL,
        low: 0,
        high: i32::MAX as i64,
        ..ROW
    },
    // nameConstraints
    AttributeInfo {
        oid: Some(oids::NAME_CONSTRAINTS),
        field_id: FieldId::Id(CertInfo::NameConstraints),
        description: "nameConstraints",
        flags: FL_MORE | FL_CRITICAL,
        level: ComplianceLevel::PkixFull,
        valid: VALID_CERT | VALID_ATTRCERT,
        ..ROW
    },
    AttributeInfo {
        description: "nameConstraints.permittedSubtrees",
        tag: Some(0),
        flags: FL_MORE | FL_SETOF | FL_OPTIONAL,
        ..ROW
    },
    AttributeInfo {
        description: "nameConstraints.permittedSubtrees.generalSubtree",
        flags: FL_MORE,
        ..ROW
    },
    AttributeInfo {
        field_id: FieldId::Id(CertInfo::PermittedSubtrees),
        description: "nameConstraints.permittedSubtrees.generalSubtree.base",
        field_type: FieldType::Subtyped,
        flags: FL_MORE | FL_OPTIONAL | FL_MULTIVALUED,
        seq_end: 2,
        extra: Extra::SubTable(GENERAL_NAME_INFO),
        ..ROW
    },
    AttributeInfo {
        description: "nameConstraints.excludedSubtrees",
        tag: Some(1),
        flags: FL_MORE | FL_SETOF | FL_OPTIONAL,
        ..ROW
    },
    AttributeInfo {
        description: "nameConstraints.excludedSubtrees.generalSubtree",
        flags: FL_MORE,
        ..ROW
    },
    AttributeInfo {
        field_id: FieldId::Id(CertInfo::ExcludedSubtrees),
        description: "nameConstraints.excludedSubtrees.generalSubtree.base",
        field_type: FieldType::Subtyped,
        flags: FL_OPTIONAL | FL_MULTIVALUED,
        seq_end: 3,
        extra: Extra::SubTable(GENERAL_NAME_INFO),
        ..ROW
    },
    // certificatePolicies: SEQUENCE OF policyInformation
    AttributeInfo {
        oid: Some(oids::CERTIFICATE_POLICIES),
        field_id: FieldId::Id(CertInfo::CertificatePolicies),
        description: "certPolicies",
        flags: FL_MORE | FL_SETOF,
        level: ComplianceLevel::PkixPartial,
        valid: VALID_CERT,
        ..ROW
    },
    AttributeInfo {
        description: "certPolicies.policyInformation",
        flags: FL_MORE,
        ..ROW
    },
    AttributeInfo {
        field_id: FieldId::Id(CertInfo::CertPolicyId),
        description: "certPolicies.policyInformation.policyIdentifier",
        field_type: FieldType::Oid,
        flags: FL_MORE | FL_MULTIVALUED,
        ..ROW
    },
    AttributeInfo {
        description: "certPolicies.policyInformation.policyQualifiers",
        flags: FL_MORE | FL_SETOF | FL_OPTIONAL,
        ..ROW
    },
    AttributeInfo {
        description: "certPolicies.policyInformation.policyQualifiers (cPSuri)",
        flags: FL_MORE | FL_IDENTIFIER | FL_OPTIONAL,
        ..ROW
    },
    AttributeInfo {
        oid: Some(oids::QT_CPS),
        description: "certPolicies.policyInformation.policyQualifiers.policyQualifierId (cPSuri)",
        field_type: FieldType::Identifier,
        flags: FL_MORE,
        ..ROW
    },
    AttributeInfo {
        field_id: FieldId::Id(CertInfo::CertPolicyCpsUri),
        description: "certPolicies.policyInformation.policyQualifiers.qualifier.cPSuri",
        field_type: FieldType::Ia5String,
        flags: FL_MORE | FL_OPTIONAL | FL_MULTIVALUED,
        seq_end: 1,
        low: MIN_URL_SIZE,
        high: MAX_NAME_SIZE,
        extra: Extra::Validate(check_url),
        ..ROW
    },
    AttributeInfo {
        description: "certPolicies.policyInformation.policyQualifiers (userNotice)",
        flags: FL_MORE | FL_IDENTIFIER | FL_OPTIONAL,
        ..ROW
    },
    AttributeInfo {
        oid: Some(oids::QT_UNOTICE),
        description:
            "certPolicies.policyInformation.policyQualifiers.policyQualifierId (userNotice)",
        field_type: FieldType::Identifier,
        flags: FL_MORE,
        ..ROW
    },
    AttributeInfo {
        description: "certPolicies.policyInformation.policyQualifiers.qualifier.userNotice",
        flags: FL_MORE | FL_OPTIONAL,
        ..ROW
    },
    AttributeInfo {
        description: "certPolicies.policyInformation.policyQualifiers.userNotice.noticeRef",
        flags: FL_MORE | FL_OPTIONAL,
        ..ROW
    },
    AttributeInfo {
        field_id: FieldId::Id(CertInfo::CertPolicyOrganization),
        description:
            "certPolicies.policyInformation.policyQualifiers.userNotice.noticeRef.organization",
        field_type: FieldType::VisibleString,
        flags: FL_MORE | FL_OPTIONAL,
        low: 1,
        high: 200,
        ..ROW
    },
    AttributeInfo {
        field_id: FieldId::Id(CertInfo::CertPolicyOrganization),
        description:
            "certPolicies.policyInformation.policyQualifiers.userNotice.noticeRef.organization (IA5)",
        field_type: FieldType::Ia5String,
        flags: FL_MORE | FL_OPTIONAL,
        low: 1,
        high: 200,
        ..ROW
    },
    AttributeInfo {
        description:
            "certPolicies.policyInformation.policyQualifiers.userNotice.noticeRef.noticeNumbers",
        flags: FL_MORE | FL_SETOF | FL_OPTIONAL,
        ..ROW
    },
    AttributeInfo {
        field_id: FieldId::Id(CertInfo::CertPolicyNoticeNumbers),
        description:
            "certPolicies.policyInformation.policyQualifiers.userNotice.noticeRef.noticeNumbers",
        field_type: FieldType::Integer,
        flags: FL_MORE | FL_OPTIONAL | FL_MULTIVALUED,
        seq_end: 2,
        low: 1,
        high: 1024,
        ..ROW
    },
    AttributeInfo {
        field_id: FieldId::Id(CertInfo::CertPolicyExplicitText),
        description: "certPolicies.policyInformation.policyQualifiers.userNotice.explicitText",
        field_type: FieldType::VisibleString,
        flags: FL_MORE | FL_OPTIONAL,
        low: 1,
        high: 200,
        ..ROW
    },
    AttributeInfo {
        field_id: FieldId::Id(CertInfo::CertPolicyExplicitText),
        description:
            "certPolicies.policyInformation.policyQualifiers.userNotice.explicitText (UTF8)",
        field_type: FieldType::Utf8String,
        flags: FL_OPTIONAL,
        seq_end: 5,
        low: 1,
        high: 200,
        ..ROW
    },
    // policyMappings: SEQUENCE OF { issuerDomainPolicy, subjectDomainPolicy }
    AttributeInfo {
        oid: Some(oids::POLICY_MAPPINGS),
        field_id: FieldId::Id(CertInfo::PolicyMappings),
        description: "policyMappings",
        flags: FL_MORE | FL_SETOF,
        level: ComplianceLevel::PkixFull,
        valid: VALID_CERT,
        ..ROW
    },
    AttributeInfo {
        description: "policyMappings.policyMapping",
        flags: FL_MORE,
        ..ROW
    },
    AttributeInfo {
        field_id: FieldId::Id(CertInfo::IssuerDomainPolicy),
        description: "policyMappings.policyMapping.issuerDomainPolicy",
        field_type: FieldType::Oid,
        flags: FL_MORE | FL_MULTIVALUED,
        ..ROW
    },
    AttributeInfo {
        field_id: FieldId::Id(CertInfo::SubjectDomainPolicy),
        description: "policyMappings.policyMapping.subjectDomainPolicy",
        field_type: FieldType::Oid,
        flags: FL_MULTIVALUED,
        seq_end: 2,
        ..ROW
    },
    // authorityKeyIdentifier
    AttributeInfo {
        oid: Some(oids::AUTHORITY_KEY_IDENTIFIER),
        field_id: FieldId::Id(CertInfo::AuthorityKeyIdentifier),
        description: "authorityKeyIdentifier",
        flags: FL_MORE,
        level: ComplianceLevel::PkixPartial,
        valid: VALID_CERT | VALID_CRL,
        ..ROW
    },
    AttributeInfo {
        field_id: FieldId::Id(CertInfo::AuthorityKeyId),
        description: "authorityKeyIdentifier.keyIdentifier",
        field_type: FieldType::OctetString,
        tag: Some(0),
        flags: FL_MORE | FL_OPTIONAL,
        low: 1,
        high: 64,
        ..ROW
    },
    AttributeInfo {
        description: "authorityKeyIdentifier.authorityCertIssuer",
        tag: Some(1),
        flags: FL_MORE | FL_SETOF | FL_OPTIONAL,
        ..ROW
    },
    AttributeInfo {
        field_id: FieldId::Id(CertInfo::AuthorityCertIssuer),
        description: "authorityKeyIdentifier.authorityCertIssuer.generalName",
        field_type: FieldType::Subtyped,
        flags: FL_MORE | FL_OPTIONAL | FL_MULTIVALUED,
        seq_end: 1,
        extra: Extra::SubTable(GENERAL_NAME_INFO),
        ..ROW
    },
    AttributeInfo {
        field_id: FieldId::Id(CertInfo::AuthorityCertSerialNumber),
        description: "authorityKeyIdentifier.authorityCertSerialNumber",
        field_type: FieldType::IntegerBytes,
        tag: Some(2),
        flags: FL_OPTIONAL,
        seq_end: 1,
        low: 1,
        high: 64,
        ..ROW
    },
    // policyConstraints
    AttributeInfo {
        oid: Some(oids::POLICY_CONSTRAINTS),
        field_id: FieldId::Id(CertInfo::PolicyConstraints),
        description: "policyConstraints",
        flags: FL_MORE,
        level: ComplianceLevel::PkixFull,
        valid: VALID_CERT,
        ..ROW
    },
    AttributeInfo {
        field_id: FieldId::Id(CertInfo::RequireExplicitPolicy),
        description: "policyConstraints.requireExplicitPolicy",
        field_type: FieldType::Integer,
        tag: Some(0),
        flags: FL_MORE | FL_OPTIONAL,
        low: 0,
        high: 64,
        ..ROW
    },
    AttributeInfo {
        field_id: FieldId::Id(CertInfo::InhibitPolicyMapping),
        description: "policyConstraints.inhibitPolicyMapping",
        field_type: FieldType::Integer,
        tag: Some(1),
        flags: FL_OPTIONAL,
        seq_end: 1,
        low: 0,
        high: 64,
        ..ROW
    },
    // extKeyUsage: SEQUENCE OF KeyPurposeId, one row per known purpose
    AttributeInfo {
        oid: Some(oids::EXT_KEY_USAGE),
        field_id: FieldId::Id(CertInfo::ExtKeyUsage),
        description: "extKeyUsage",
        flags: FL_MORE | FL_NONEMPTY,
        level: ComplianceLevel::Standard,
        valid: VALID_CERTREQ | VALID_CERT,
        ..ROW
    },
    AttributeInfo {
        oid: Some(oids::KP_SERVER_AUTH),
        field_id: FieldId::Id(CertInfo::ExtKeyServerAuth),
        description: "extKeyUsage.serverAuth",
        field_type: FieldType::Identifier,
        flags: FL_MORE | FL_OPTIONAL,
        ..ROW
    },
    AttributeInfo {
        oid: Some(oids::KP_CLIENT_AUTH),
        field_id: FieldId::Id(CertInfo::ExtKeyClientAuth),
        description: "extKeyUsage.clientAuth",
        field_type: FieldType::Identifier,
        flags: FL_MORE | FL_OPTIONAL,
        ..ROW
    },
    AttributeInfo {
        oid: Some(oids::KP_CODE_SIGNING),
        field_id: FieldId::Id(CertInfo::ExtKeyCodeSigning),
        description: "extKeyUsage.codeSigning",
        field_type: FieldType::Identifier,
        flags: FL_MORE | FL_OPTIONAL,
        ..ROW
    },
    AttributeInfo {
        oid: Some(oids::KP_EMAIL_PROTECTION),
        field_id: FieldId::Id(CertInfo::ExtKeyEmailProtection),
        description: "extKeyUsage.emailProtection",
        field_type: FieldType::Identifier,
        flags: FL_MORE | FL_OPTIONAL,
        ..ROW
    },
    AttributeInfo {
        oid: Some(oids::KP_TIME_STAMPING),
        field_id: FieldId::Id(CertInfo::ExtKeyTimeStamping),
        description: "extKeyUsage.timeStamping",
        field_type: FieldType::Identifier,
        flags: FL_MORE | FL_OPTIONAL,
        ..ROW
    },
    AttributeInfo {
        oid: Some(oids::KP_OCSP_SIGNING),
        field_id: FieldId::Id(CertInfo::ExtKeyOcspSigning),
        description: "extKeyUsage.ocspSigning",
        field_type: FieldType::Identifier,
        flags: FL_MORE | FL_OPTIONAL,
        ..ROW
    },
    AttributeInfo {
        oid: Some(oids::ANY_EXTENDED_KEY_USAGE),
        field_id: FieldId::Id(CertInfo::ExtKeyAnyKeyUsage),
        description: "extKeyUsage.anyExtendedKeyUsage",
        field_type: FieldType::Identifier,
        flags: FL_OPTIONAL,
        seq_end: 1,
        ..ROW
    },
    AttributeInfo {
        oid: Some(oids::INHIBIT_ANY_POLICY),
        field_id: FieldId::Id(CertInfo::InhibitAnyPolicy),
        description: "inhibitAnyPolicy",
        field_type: FieldType::Integer,
        level: ComplianceLevel::PkixFull,
        valid: VALID_CERTREQ | VALID_CERT,
        low: 0,
        high: 64,
        ..ROW
    },
];

// ============================================================================
// CMS attributes
// ============================================================================

/// CMS signed attributes. Each value sits inside a SET in the encoding.
pub static CMS_ATTRIBUTE_INFO: &[AttributeInfo] = &[
    AttributeInfo {
        oid: Some(oids::CMS_CONTENT_TYPE),
        field_id: FieldId::Id(CertInfo::CmsContentType),
        description: "contentType",
        field_type: FieldType::Choice,
        valid: VALID_CMS,
        low: CONTENT_TYPE_DATA,
        high: CONTENT_TYPE_TST_INFO,
        extra: Extra::SubTable(CONTENT_TYPE_INFO),
        ..ROW
    },
    AttributeInfo {
        oid: Some(oids::CMS_MESSAGE_DIGEST),
        field_id: FieldId::Id(CertInfo::CmsMessageDigest),
        description: "messageDigest",
        field_type: FieldType::OctetString,
        valid: VALID_CMS,
        low: 16,
        high: 64,
        ..ROW
    },
    AttributeInfo {
        oid: Some(oids::CMS_SIGNING_TIME),
        field_id: FieldId::Id(CertInfo::CmsSigningTime),
        description: "signingTime",
        field_type: FieldType::UtcTime,
        valid: VALID_CMS,
        ..ROW
    },
    AttributeInfo {
        oid: Some(oids::CMS_SIGNING_DESCRIPTION),
        field_id: FieldId::Id(CertInfo::CmsSigningDescription),
        description: "signingDescription",
        field_type: FieldType::Utf8String,
        valid: VALID_CMS,
        low: 1,
        high: 1024,
        ..ROW
    },
];

// ============================================================================
// Lookup
// ============================================================================

/// Which description table an object uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Extensions,
    Cms,
}

pub fn attribute_table(kind: TableKind) -> &'static [AttributeInfo] {
    match kind {
        TableKind::Extensions => EXTENSION_INFO,
        TableKind::Cms => CMS_ATTRIBUTE_INFO,
    }
}

/// True if row `index` is the first row of an attribute.
pub fn is_attribute_start(table: &[AttributeInfo], index: usize) -> bool {
    index == 0 || !table[index - 1].has_flag(FL_MORE)
}

/// Index of the last row of the attribute starting at `start`.
pub fn attribute_end(table: &[AttributeInfo], start: usize) -> usize {
    let mut i = start;
    while i + 1 < table.len() && table[i].has_flag(FL_MORE) {
        i += 1;
    }
    i
}

/// Rows of the attribute starting at `start`.
pub fn attribute_rows(table: &'static [AttributeInfo], start: usize) -> &'static [AttributeInfo] {
    &table[start..=attribute_end(table, start)]
}

/// Attribute identifier of the attribute starting at `start`, resolving
/// `FieldId::Follows` to the next row that carries an identifier.
pub fn attribute_id_at(table: &[AttributeInfo], start: usize) -> Option<CertInfo> {
    let end = attribute_end(table, start);
    match table[start].field_id {
        FieldId::Id(id) => Some(id),
        FieldId::Follows => table[start + 1..=end].iter().find_map(|row| row.field()),
        FieldId::None => None,
    }
}

/// Start row of the attribute with the given OID.
pub fn oid_to_attribute(table: &[AttributeInfo], oid: &ObjectIdentifier) -> Option<usize> {
    (0..table.len()).find(|&i| is_attribute_start(table, i) && table[i].oid.as_ref() == Some(oid))
}

/// Start row of the attribute with the given identifier.
pub fn attribute_start(table: &[AttributeInfo], attribute_id: CertInfo) -> Option<usize> {
    (0..table.len())
        .find(|&i| is_attribute_start(table, i) && attribute_id_at(table, i) == Some(attribute_id))
}

/// Where a field lives in a table.
#[derive(Debug, Clone, Copy)]
pub struct FieldLocation {
    pub attribute_id: CertInfo,
    /// Start row of the owning attribute
    pub attribute_start: usize,
    /// Row describing the field (in the sub-table for GeneralName components)
    pub row: &'static AttributeInfo,
}

/// Find the row describing `field` (and `sub_field`, for a component of a
/// GeneralName-valued field), along with the attribute that owns it.
pub fn field_id_to_attribute(
    table: &'static [AttributeInfo],
    field: CertInfo,
    sub_field: Option<CertInfo>,
) -> Option<FieldLocation> {
    let index = table.iter().position(|row| row.field() == Some(field))?;
    let attribute_start = (0..=index)
        .rev()
        .find(|&i| is_attribute_start(table, i))
        .unwrap_or(0);
    let attribute_id = attribute_id_at(table, attribute_start)?;

    let row = match sub_field {
        None => &table[index],
        Some(sub) => table[index]
            .sub_table()?
            .iter()
            .find(|row| row.field() == Some(sub))?,
    };

    Some(FieldLocation {
        attribute_id,
        attribute_start,
        row,
    })
}

/// Index of the last row of the item starting at `index`.
///
/// A leaf is an item by itself. A constructed row opens a level that its
/// descendants close again through their `seq_end` counts.
pub fn find_item_end(rows: &[AttributeInfo], index: usize) -> usize {
    if !rows[index].is_constructed() {
        return index;
    }
    let mut depth: i32 = 1;
    let mut i = index;
    while i + 1 < rows.len() {
        i += 1;
        let row = &rows[i];
        if row.is_constructed() {
            depth += 1;
        } else {
            depth -= row.seq_end as i32;
        }
        if depth <= 0 {
            return i;
        }
    }
    i
}

/// Row in a CHOICE sub-table holding selection `value`.
pub fn choice_row(rows: &'static [AttributeInfo], value: i64) -> Option<&'static AttributeInfo> {
    rows.iter().find(|row| row.default_value == value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    fn attribute_starts(table: &[AttributeInfo]) -> Vec<usize> {
        (0..table.len())
            .filter(|&i| is_attribute_start(table, i))
            .collect()
    }

    fn assert_items_tile(rows: &[AttributeInfo], start: usize, end: usize) {
        let mut i = start;
        while i <= end {
            i = find_item_end(rows, i) + 1;
        }
        assert_eq!(i, end + 1, "items overrun at row {}", start);
    }

    #[test]
    fn test_nesting_closes_at_attribute_end() {
        for table in [EXTENSION_INFO, CMS_ATTRIBUTE_INFO] {
            for start in attribute_starts(table) {
                let end = attribute_end(table, start);
                if table[start].is_constructed() {
                    assert_eq!(
                        find_item_end(table, start),
                        end,
                        "{}",
                        table[start].description
                    );
                }
                assert_items_tile(table, start, end);
                assert!(table[start].oid.is_some());
                assert!(attribute_id_at(table, start).is_some());
            }
        }
        assert_items_tile(GENERAL_NAME_INFO, 0, GENERAL_NAME_INFO.len() - 1);
    }

    #[test]
    fn test_attribute_ids_are_sorted() {
        let ids: Vec<CertInfo> = attribute_starts(EXTENSION_INFO)
            .into_iter()
            .filter_map(|i| attribute_id_at(EXTENSION_INFO, i))
            .collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn test_oid_lookup() {
        let start = oid_to_attribute(EXTENSION_INFO, &oids::BASIC_CONSTRAINTS).unwrap();
        assert_eq!(
            attribute_id_at(EXTENSION_INFO, start),
            Some(CertInfo::BasicConstraints)
        );
        assert_eq!(attribute_rows(EXTENSION_INFO, start).len(), 3);

        // identifier rows inside an attribute are not attribute starts
        assert!(oid_to_attribute(EXTENSION_INFO, &oids::AD_OCSP).is_none());
        assert!(oid_to_attribute(EXTENSION_INFO, &oids::CMS_SIGNING_TIME).is_none());
        assert!(oid_to_attribute(CMS_ATTRIBUTE_INFO, &oids::CMS_SIGNING_TIME).is_some());
    }

    #[test]
    fn test_field_follows() {
        let start = oid_to_attribute(EXTENSION_INFO, &oids::SUBJECT_ALT_NAME).unwrap();
        assert_eq!(EXTENSION_INFO[start].field_id, FieldId::Follows);
        assert_eq!(
            attribute_id_at(EXTENSION_INFO, start),
            Some(CertInfo::SubjectAltName)
        );
        assert_eq!(
            attribute_start(EXTENSION_INFO, CertInfo::SubjectAltName),
            Some(start)
        );
    }

    #[test]
    fn test_field_lookup() {
        let loc = field_id_to_attribute(EXTENSION_INFO, CertInfo::PathLenConstraint, None).unwrap();
        assert_eq!(loc.attribute_id, CertInfo::BasicConstraints);
        assert_eq!(loc.row.field_type, FieldType::Integer);

        let loc = field_id_to_attribute(
            EXTENSION_INFO,
            CertInfo::SubjectAltName,
            Some(CertInfo::DnsName),
        )
        .unwrap();
        assert_eq!(loc.attribute_id, CertInfo::SubjectAltName);
        assert_eq!(loc.row.tag, Some(2));

        let loc = field_id_to_attribute(
            EXTENSION_INFO,
            CertInfo::AuthorityInfoOcsp,
            Some(CertInfo::UniformResourceIdentifier),
        )
        .unwrap();
        assert_eq!(loc.attribute_id, CertInfo::AuthorityInfoAccess);

        assert!(field_id_to_attribute(EXTENSION_INFO, CertInfo::CmsSigningTime, None).is_none());
    }

    #[test]
    fn test_check_value_ranges() {
        let loc = field_id_to_attribute(EXTENSION_INFO, CertInfo::PathLenConstraint, None).unwrap();
        assert!(loc.row.check_value(&AttributeValue::Integer(3)).is_ok());
        assert_eq!(
            loc.row.check_value(&AttributeValue::Integer(65)),
            Err(ErrorType::AttrValue)
        );
        assert_eq!(
            loc.row.check_value(&AttributeValue::Text("3".into())),
            Err(ErrorType::AttrValue)
        );

        let loc = field_id_to_attribute(EXTENSION_INFO, CertInfo::SubjectKeyIdentifier, None)
            .unwrap();
        assert_eq!(
            loc.row.check_value(&AttributeValue::Bytes(Vec::new())),
            Err(ErrorType::AttrSize)
        );
    }

    #[test]
    fn test_choice_rows() {
        let loc =
            field_id_to_attribute(EXTENSION_INFO, CertInfo::HoldInstructionCode, None).unwrap();
        let rows = loc.row.sub_table().unwrap();
        assert_eq!(
            choice_row(rows, HOLD_REJECT).unwrap().oid,
            Some(oids::HOLD_INSTRUCTION_REJECT)
        );
        assert!(loc.row.check_value(&AttributeValue::Integer(9)).is_err());
    }

    #[test]
    fn test_name_validation() {
        let text = |s: &str| AttributeValue::Text(s.into());

        assert!(check_dns(&text("www.example.com")).is_ok());
        assert!(check_dns(&text("*.example.com")).is_ok());
        assert!(check_dns(&text(".foo.com")).is_ok());
        assert!(check_dns(&text("http://example.com")).is_err());
        assert!(check_dns(&text("10.0.0.1")).is_err());
        assert!(check_dns(&text("exa mple.com")).is_err());

        assert!(check_rfc822(&text("user@example.com")).is_ok());
        assert!(check_rfc822(&text("foo.com")).is_ok());
        assert!(check_rfc822(&text("*@example.com")).is_ok());
        assert!(check_rfc822(&text("mailto://user@example.com")).is_err());

        assert!(check_url(&text("http://www.example.com/crl")).is_ok());
        assert!(check_url(&text("www.example.com")).is_err());
        assert!(check_url(&text("http://example.com/<x>")).is_err());
    }

    #[test]
    fn test_string_types() {
        let loc = field_id_to_attribute(EXTENSION_INFO, CertInfo::ChallengePassword, None).unwrap();
        assert!(loc.row.check_value(&AttributeValue::Text("secret".into())).is_ok());
        assert_eq!(
            loc.row.check_value(&AttributeValue::Text("s@cret".into())),
            Err(ErrorType::AttrValue)
        );
    }
}
