// Copyright (c) 2026 Intel Corporation
//
// SPDX-License-Identifier: Apache-2.0 or MIT

//! Table-driven certificate attribute engine.
//!
//! An attribute (an X.509 extension or a CMS attribute) is identified by its
//! OID; a field is one component inside it. Fields are identified by
//! [`CertInfo`] and carried in an [`AttributeList`] as flat, sorted
//! [`AttributeEntry`] values. The description table in [`table`] gives the
//! ASN.1 grammar every attribute follows, and the remaining modules replay
//! that grammar:
//!
//! - [`walker`] checks a list against the table and builds an encoding tree
//! - [`encode`] sizes and writes the tree as DER
//! - [`decode`] reads DER back into list entries
//! - [`copy`] moves attributes between lists with role-aware remapping

extern crate alloc;

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use const_oid::ObjectIdentifier;

use crate::certificate::name::Name;

pub mod copy;
pub mod decode;
pub mod encode;
pub mod list;
pub mod oids;
pub mod table;
pub mod walker;

pub use self::copy::{
    copy_attribute, copy_attribute_field, copy_attributes, copy_issuer_attributes,
    copy_ocsp_request_attributes, copy_request_attributes, copy_revocation_attributes, CopyMode,
};
pub use self::decode::{
    add_attribute_field, add_attribute_field_with_flags, add_blob_attribute,
    classify_reason_code, read_attributes, set_attribute_field, ReasonCodeOid,
};
pub use self::encode::{sizeof_attributes, write_attributes};
pub use self::list::{
    AttributeEntry, AttributeList, BlobAttribute, EntryFlags, FieldLookupResult,
};
pub use self::walker::{check_attributes, EncodedAttribute, Node};

// ============================================================================
// Field identifiers
// ============================================================================

/// Stable identifier for every object field, extension, extension field and
/// GeneralName component the engine knows about.
///
/// Within each group the declaration order follows the description table, so
/// sorting entries by identifier yields the order the grammar expects.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CertInfo {
    // Object-level fields, used for selection and as error loci
    SubjectName = 1,
    IssuerName,
    ValidFrom,
    ValidTo,
    RevocationDate,
    TrustedUsage,
    SerialNumber,

    // GeneralName components
    OtherNameTypeId = 100,
    OtherNameValue,
    Rfc822Name,
    DnsName,
    DirectoryName,
    EdiPartyNameAssigner,
    EdiPartyNamePartyName,
    UniformResourceIdentifier,
    IpAddress,
    RegisteredId,

    // Certificate, CRL and request extensions
    ChallengePassword = 200,
    CrlExtReason,
    KeyFeatures,
    AuthorityInfoAccess,
    AuthorityInfoRtcs,
    AuthorityInfoOcsp,
    AuthorityInfoCaIssuers,
    OcspNonce,
    SubjectKeyIdentifier,
    KeyUsage,
    SubjectAltName,
    IssuerAltName,
    BasicConstraints,
    Ca,
    PathLenConstraint,
    CrlNumber,
    CrlReason,
    HoldInstructionCode,
    InvalidityDate,
    DeltaCrlIndicator,
    NameConstraints,
    PermittedSubtrees,
    ExcludedSubtrees,
    CertificatePolicies,
    CertPolicyId,
    CertPolicyCpsUri,
    CertPolicyOrganization,
    CertPolicyNoticeNumbers,
    CertPolicyExplicitText,
    PolicyMappings,
    IssuerDomainPolicy,
    SubjectDomainPolicy,
    AuthorityKeyIdentifier,
    AuthorityKeyId,
    AuthorityCertIssuer,
    AuthorityCertSerialNumber,
    PolicyConstraints,
    RequireExplicitPolicy,
    InhibitPolicyMapping,
    ExtKeyUsage,
    ExtKeyServerAuth,
    ExtKeyClientAuth,
    ExtKeyCodeSigning,
    ExtKeyEmailProtection,
    ExtKeyTimeStamping,
    ExtKeyOcspSigning,
    ExtKeyAnyKeyUsage,
    InhibitAnyPolicy,

    // CMS attributes
    CmsContentType = 400,
    CmsMessageDigest,
    CmsSigningTime,
    CmsSigningDescription,
}

impl CertInfo {
    /// Object-level field (subject, issuer, validity) rather than an
    /// attribute field.
    pub fn is_object_field(self) -> bool {
        (self as u16) < 100
    }

    /// One of the components of a GeneralName.
    pub fn is_general_name_component(self) -> bool {
        (100..200).contains(&(self as u16))
    }

    /// A certificate/CRL extension or extension field.
    pub fn is_extension(self) -> bool {
        (200..400).contains(&(self as u16))
    }

    /// A CMS attribute.
    pub fn is_cms(self) -> bool {
        (self as u16) >= 400
    }
}

impl fmt::Display for CertInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// ============================================================================
// Field values
// ============================================================================

/// Value held by one attribute list entry.
///
/// Integers carry INTEGER, ENUMERATED, BIT STRING flags and CHOICE
/// selections; byte strings carry OCTET STRINGs, INTEGER-encoded byte
/// strings and pre-encoded blobs; times are seconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    /// Placeholder with no value (identifier fields)
    Unused,
    Boolean(bool),
    Integer(i64),
    Bytes(Vec<u8>),
    Text(String),
    Oid(ObjectIdentifier),
    Time(u64),
    Name(Name),
}

impl AttributeValue {
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            AttributeValue::Integer(v) => Some(*v),
            AttributeValue::Boolean(b) => Some(*b as i64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            AttributeValue::Bytes(b) => Some(b),
            AttributeValue::Text(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_oid(&self) -> Option<&ObjectIdentifier> {
        match self {
            AttributeValue::Oid(oid) => Some(oid),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<u64> {
        match self {
            AttributeValue::Time(t) => Some(*t),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<&Name> {
        match self {
            AttributeValue::Name(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_name_mut(&mut self) -> Option<&mut Name> {
        match self {
            AttributeValue::Name(name) => Some(name),
            _ => None,
        }
    }

    /// Length used for range checks on string-like values.
    pub(crate) fn data_len(&self) -> Option<usize> {
        match self {
            AttributeValue::Bytes(b) => Some(b.len()),
            AttributeValue::Text(s) => Some(s.len()),
            _ => None,
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Boolean(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Integer(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.into())
    }
}

impl From<&[u8]> for AttributeValue {
    fn from(value: &[u8]) -> Self {
        AttributeValue::Bytes(value.to_vec())
    }
}

impl From<ObjectIdentifier> for AttributeValue {
    fn from(value: ObjectIdentifier) -> Self {
        AttributeValue::Oid(value)
    }
}

impl From<Name> for AttributeValue {
    fn from(value: Name) -> Self {
        AttributeValue::Name(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cert_info_groups() {
        assert!(CertInfo::SubjectName.is_object_field());
        assert!(CertInfo::DnsName.is_general_name_component());
        assert!(CertInfo::KeyUsage.is_extension());
        assert!(CertInfo::CmsSigningTime.is_cms());
        assert!(!CertInfo::CmsSigningTime.is_extension());
    }

    #[test]
    fn test_cert_info_order_follows_table() {
        assert!(CertInfo::Ca < CertInfo::PathLenConstraint);
        assert!(CertInfo::Rfc822Name < CertInfo::DnsName);
        assert!(CertInfo::CertPolicyId < CertInfo::CertPolicyCpsUri);
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(AttributeValue::from(5i64).as_integer(), Some(5));
        assert_eq!(AttributeValue::from(true).as_integer(), Some(1));
        assert_eq!(AttributeValue::from("abc").data_len(), Some(3));
        assert!(AttributeValue::Unused.as_bytes().is_none());
    }
}
