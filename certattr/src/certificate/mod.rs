// Copyright (c) 2026 Intel Corporation
//
// SPDX-License-Identifier: Apache-2.0 or MIT

//! Certificate-like objects.
//!
//! A [`CertObject`] is the owner of one attribute list together with the
//! object-level fields the constraint checker and the selection cursor need:
//! subject and issuer DNs, validity, key information and state flags. The
//! per-type data (certificate serial, CRL revocation entries) lives in
//! [`CertKind`].
//!
//! Objects start out under construction. [`CertObject::sign`] checks the
//! object, encodes its attributes and freezes it; an object loaded from an
//! encoded attribute block with [`CertObject::from_encoded`] is frozen from
//! the start and marked as imported.
//!
//! # Examples
//!
//! ```no_run
//! use certattr::attr::{AttributeValue, CertInfo};
//! use certattr::certificate::{CertObject, CertType};
//! use certattr::config::CheckOptions;
//!
//! # fn example() -> certattr::Result<()> {
//! let mut ca = CertObject::new(CertType::Certificate)?.self_signed();
//! ca.add_attribute(CertInfo::Ca, None, AttributeValue::Boolean(true))?;
//! ca.add_attribute(CertInfo::KeyUsage, None, AttributeValue::Integer(0x60))?;
//! let extensions = ca.sign(None, &CheckOptions::new())?;
//! # let _ = extensions;
//! # Ok(())
//! # }
//! ```

pub mod name;
pub mod select;

extern crate alloc;

use alloc::vec::Vec;

use der::{Decode, Encode};

use crate::attr::copy::copy_issuer_attributes;
use crate::attr::decode::{add_attribute_field, add_blob_attribute, read_attributes, set_attribute_field};
use crate::attr::encode::write_attributes;
use crate::attr::table::{self, *};
use crate::attr::walker;
use crate::attr::{AttributeList, AttributeValue, CertInfo, FieldLookupResult};
use crate::check;
use crate::config::{CheckOptions, ComplianceLevel};
use crate::crypto_backend::CryptoBackend;
use crate::error::{Error, ErrorKind, ErrorType, Result};

use self::name::Name;
use self::select::Selection;

/// Size of a generated OCSP nonce.
pub const OCSP_NONCE_SIZE: usize = 16;

// ============================================================================
// Object types
// ============================================================================

/// The kind of object an attribute block belongs to.
///
/// The type decides which table rows are valid, which table is used and
/// how the encoded block is wrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CertType {
    Certificate,
    AttributeCertificate,
    /// PKCS #10 request
    CertRequest,
    /// CRMF certificate request
    RequestCert,
    /// CRMF revocation request
    RequestRevocation,
    Crl,
    /// One entry of a CRL
    RevocationEntry,
    OcspRequest,
    OcspResponse,
    RtcsRequest,
    RtcsResponse,
    PkiUser,
    CmsAttributes,
}

impl CertType {
    /// Valid-mask bits matching this object type.
    pub fn valid_mask(self) -> u16 {
        match self {
            CertType::Certificate => VALID_CERT,
            CertType::AttributeCertificate => VALID_ATTRCERT,
            CertType::CertRequest => VALID_CERTREQ,
            CertType::RequestCert => VALID_CERTREQ | VALID_REQCERT,
            CertType::RequestRevocation => VALID_REVREQ,
            CertType::Crl => VALID_CRL,
            CertType::RevocationEntry => VALID_CRL | VALID_REVREQ,
            CertType::OcspRequest => VALID_OCSPREQ,
            CertType::OcspResponse => VALID_OCSPRESP,
            CertType::RtcsRequest => VALID_RTCSREQ,
            CertType::RtcsResponse => VALID_RTCSRESP,
            CertType::PkiUser => VALID_PKIUSER,
            CertType::CmsAttributes => VALID_CMS,
        }
    }

    pub fn table_kind(self) -> TableKind {
        match self {
            CertType::CmsAttributes => TableKind::Cms,
            _ => TableKind::Extensions,
        }
    }

    /// True if attributes are written as `SEQUENCE { OID, SET OF value }`
    /// and the block is a DER SET that has to be sorted.
    pub fn uses_set_encoding(self) -> bool {
        matches!(
            self,
            CertType::CmsAttributes | CertType::RtcsRequest | CertType::RtcsResponse
        )
    }
}

// ============================================================================
// Validity and key information
// ============================================================================

/// Validity period, in seconds since the epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Validity {
    pub not_before: u64,
    pub not_after: u64,
}

impl Validity {
    pub fn new(not_before: u64, not_after: u64) -> Self {
        Self {
            not_before,
            not_after,
        }
    }

    /// RFC 5280 §4.1.2.5: notBefore must come before notAfter.
    pub fn is_well_formed(&self) -> bool {
        self.not_before < self.not_after
    }
}

/// Public-key algorithm of the subject key.
///
/// Only the capabilities matter here: they bound the keyUsage bits a
/// certificate may carry and supply the implicit usage when keyUsage is
/// absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyAlgorithm {
    #[default]
    Rsa,
    Dsa,
    Ecdsa,
    Ed25519,
    Dh,
}

impl KeyAlgorithm {
    pub fn can_sign(self) -> bool {
        !matches!(self, KeyAlgorithm::Dh)
    }

    pub fn can_encrypt(self) -> bool {
        matches!(self, KeyAlgorithm::Rsa)
    }

    pub fn can_agree(self) -> bool {
        matches!(self, KeyAlgorithm::Ecdsa | KeyAlgorithm::Dh)
    }
}

// ============================================================================
// Per-type data
// ============================================================================

/// One revoked certificate in a CRL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevocationEntry {
    pub serial: Vec<u8>,
    pub revocation_time: Option<u64>,
    pub attributes: AttributeList,
}

impl RevocationEntry {
    pub fn new(serial: &[u8], revocation_time: Option<u64>) -> Self {
        Self {
            serial: serial.to_vec(),
            revocation_time,
            attributes: AttributeList::new(TableKind::Extensions),
        }
    }

    /// Encode the entry's extensions.
    pub fn write_attributes(&mut self, options: &CheckOptions) -> Result<Vec<u8>> {
        write_attributes(&mut self.attributes, CertType::RevocationEntry, options)
    }
}

/// Data carried only by some object types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertKind {
    Certificate {
        serial: Vec<u8>,
    },
    AttributeCertificate,
    CertRequest,
    RequestCert,
    RequestRevocation,
    Crl {
        revocations: Vec<RevocationEntry>,
        /// Entry selected by the caller, if any
        current: Option<usize>,
        /// Revocation time used for entries that don't carry their own
        revocation_time: Option<u64>,
    },
    OcspRequest,
    OcspResponse,
    RtcsRequest,
    RtcsResponse,
    PkiUser,
    CmsAttributes,
}

impl CertKind {
    fn from_type(cert_type: CertType) -> Result<Self> {
        Ok(match cert_type {
            CertType::Certificate => CertKind::Certificate { serial: Vec::new() },
            CertType::AttributeCertificate => CertKind::AttributeCertificate,
            CertType::CertRequest => CertKind::CertRequest,
            CertType::RequestCert => CertKind::RequestCert,
            CertType::RequestRevocation => CertKind::RequestRevocation,
            CertType::Crl => CertKind::Crl {
                revocations: Vec::new(),
                current: None,
                revocation_time: None,
            },
            CertType::OcspRequest => CertKind::OcspRequest,
            CertType::OcspResponse => CertKind::OcspResponse,
            CertType::RtcsRequest => CertKind::RtcsRequest,
            CertType::RtcsResponse => CertKind::RtcsResponse,
            CertType::PkiUser => CertKind::PkiUser,
            CertType::CmsAttributes => CertKind::CmsAttributes,
            // Entries only exist inside a CRL
            CertType::RevocationEntry => {
                return Err(Error::attribute(
                    ErrorKind::ArgumentValue,
                    None,
                    ErrorType::None,
                ))
            }
        })
    }

    pub fn cert_type(&self) -> CertType {
        match self {
            CertKind::Certificate { .. } => CertType::Certificate,
            CertKind::AttributeCertificate => CertType::AttributeCertificate,
            CertKind::CertRequest => CertType::CertRequest,
            CertKind::RequestCert => CertType::RequestCert,
            CertKind::RequestRevocation => CertType::RequestRevocation,
            CertKind::Crl { .. } => CertType::Crl,
            CertKind::OcspRequest => CertType::OcspRequest,
            CertKind::OcspResponse => CertType::OcspResponse,
            CertKind::RtcsRequest => CertType::RtcsRequest,
            CertKind::RtcsResponse => CertType::RtcsResponse,
            CertKind::PkiUser => CertType::PkiUser,
            CertKind::CmsAttributes => CertType::CmsAttributes,
        }
    }
}

/// CRL entry extensions, which go to the selected revocation entry.
const ENTRY_ATTRIBUTES: [CertInfo; 4] = [
    CertInfo::CrlReason,
    CertInfo::CrlExtReason,
    CertInfo::HoldInstructionCode,
    CertInfo::InvalidityDate,
];

// ============================================================================
// Certificate object
// ============================================================================

/// Object state flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObjectFlags {
    pub self_signed: bool,
    /// Signed or loaded: the attributes can no longer change
    pub signed: bool,
    /// Loaded from an encoded form rather than built locally
    pub imported: bool,
    /// Spliced into a chain to make it buildable; exempt from path-length
    /// and name constraints
    pub path_kludge: bool,
}

/// A certificate-like object and its attributes.
#[derive(Debug, Clone)]
pub struct CertObject {
    pub(crate) kind: CertKind,
    pub(crate) subject: Name,
    pub(crate) issuer: Name,
    pub(crate) subject_der: Option<Vec<u8>>,
    pub(crate) issuer_der: Option<Vec<u8>>,
    pub(crate) validity: Option<Validity>,
    pub(crate) flags: ObjectFlags,
    pub(crate) trusted_usage: Option<i64>,
    pub(crate) key_algorithm: KeyAlgorithm,
    pub(crate) public_key: Vec<u8>,
    pub(crate) max_check_level: Option<ComplianceLevel>,
    pub(crate) attributes: AttributeList,
    /// Index of the attribute entry under the cursor
    pub(crate) cursor: Option<usize>,
    pub(crate) selection: Selection,
}

impl CertObject {
    /// Create an empty object under construction.
    pub fn new(cert_type: CertType) -> Result<Self> {
        Ok(Self {
            kind: CertKind::from_type(cert_type)?,
            subject: Name::new(),
            issuer: Name::new(),
            subject_der: None,
            issuer_der: None,
            validity: None,
            flags: ObjectFlags::default(),
            trusted_usage: None,
            key_algorithm: KeyAlgorithm::default(),
            public_key: Vec::new(),
            max_check_level: None,
            attributes: AttributeList::new(cert_type.table_kind()),
            cursor: None,
            selection: Selection::default(),
        })
    }

    /// Load an object from its encoded attribute block.
    ///
    /// `subject_der`/`issuer_der` are the encoded DNs, kept verbatim for
    /// binary name chaining.
    pub fn from_encoded(
        cert_type: CertType,
        attributes: &[u8],
        subject_der: Option<&[u8]>,
        issuer_der: Option<&[u8]>,
        options: &CheckOptions,
    ) -> Result<Self> {
        let mut object = Self::new(cert_type)?;
        object.attributes = read_attributes(attributes, cert_type, options)?;
        if let Some(der) = subject_der {
            object.subject = Name::from_der(der)?;
            object.subject_der = Some(der.to_vec());
        }
        if let Some(der) = issuer_der {
            object.issuer = Name::from_der(der)?;
            object.issuer_der = Some(der.to_vec());
        }
        object.flags.imported = true;
        object.flags.signed = true;
        log::trace!(
            "loaded {:?} with {} attribute entries",
            cert_type,
            object.attributes.len()
        );
        Ok(object)
    }

    // ========================================================================
    // Builders
    // ========================================================================

    pub fn with_subject(mut self, subject: Name) -> Self {
        self.subject = subject;
        self
    }

    pub fn with_issuer(mut self, issuer: Name) -> Self {
        self.issuer = issuer;
        self
    }

    pub fn with_validity(mut self, validity: Validity) -> Self {
        self.validity = Some(validity);
        self
    }

    pub fn with_serial_number(mut self, serial: &[u8]) -> Self {
        if let CertKind::Certificate { serial: s } = &mut self.kind {
            *s = serial.to_vec();
        }
        self
    }

    pub fn with_key_algorithm(mut self, algorithm: KeyAlgorithm) -> Self {
        self.key_algorithm = algorithm;
        self
    }

    /// Set the encoded subject public key, the input of the key identifier.
    pub fn with_public_key(mut self, public_key: &[u8]) -> Self {
        self.public_key = public_key.to_vec();
        self
    }

    /// Restrict the usages this certificate is trusted for. A value of 0
    /// distrusts the certificate outright.
    pub fn with_trusted_usage(mut self, usage: i64) -> Self {
        self.trusted_usage = Some(usage);
        self
    }

    pub fn self_signed(mut self) -> Self {
        self.flags.self_signed = true;
        self
    }

    pub fn path_kludge(mut self) -> Self {
        self.flags.path_kludge = true;
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn kind(&self) -> &CertKind {
        &self.kind
    }

    pub fn cert_type(&self) -> CertType {
        self.kind.cert_type()
    }

    pub fn subject(&self) -> &Name {
        &self.subject
    }

    /// The issuer DN. A self-signed object with no explicit issuer reports
    /// its subject.
    pub fn issuer(&self) -> &Name {
        if self.issuer_aliases_subject() {
            &self.subject
        } else {
            &self.issuer
        }
    }

    pub(crate) fn issuer_aliases_subject(&self) -> bool {
        self.flags.self_signed && self.issuer.is_empty()
    }

    pub fn encoded_subject(&self) -> Option<&[u8]> {
        self.subject_der.as_deref()
    }

    pub fn encoded_issuer(&self) -> Option<&[u8]> {
        self.issuer_der.as_deref()
    }

    pub fn validity(&self) -> Option<&Validity> {
        self.validity.as_ref()
    }

    pub fn flags(&self) -> ObjectFlags {
        self.flags
    }

    pub fn is_signed(&self) -> bool {
        self.flags.signed
    }

    pub fn trusted_usage(&self) -> Option<i64> {
        self.trusted_usage
    }

    pub fn key_algorithm(&self) -> KeyAlgorithm {
        self.key_algorithm
    }

    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    /// Highest level this object has been checked to.
    pub fn max_check_level(&self) -> Option<ComplianceLevel> {
        self.max_check_level
    }

    pub fn attributes(&self) -> &AttributeList {
        &self.attributes
    }

    pub fn serial_number(&self) -> Option<&[u8]> {
        match &self.kind {
            CertKind::Certificate { serial } => Some(serial),
            _ => None,
        }
    }

    /// Look a field up, reporting table defaults.
    pub fn attribute(&self, field: CertInfo, sub_field: Option<CertInfo>) -> FieldLookupResult<'_> {
        self.attributes.lookup(field, sub_field)
    }

    /// Value of a field, or its table default.
    pub fn attribute_value(&self, field: CertInfo) -> Result<AttributeValue> {
        self.attributes
            .lookup(field, None)
            .value()
            .ok_or(Error::not_found(field))
    }

    /// basicConstraints cA, FALSE when absent.
    pub fn is_ca(&self) -> bool {
        self.attributes
            .lookup(CertInfo::Ca, None)
            .value()
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    pub fn path_len_constraint(&self) -> Option<i64> {
        self.attributes
            .value(CertInfo::PathLenConstraint)
            .and_then(|v| v.as_integer())
    }

    pub fn key_usage(&self) -> Option<i64> {
        self.attributes
            .value(CertInfo::KeyUsage)
            .and_then(|v| v.as_integer())
    }

    // ========================================================================
    // Attribute modification
    // ========================================================================

    /// Refuse changes to a signed object. Otherwise drop any recorded
    /// check level, so the next check runs in full.
    pub(crate) fn ensure_mutable(&mut self, locus: CertInfo) -> Result<()> {
        if self.flags.signed {
            log::error!("{:?}: object is already signed", locus);
            return Err(Error::permission(locus));
        }
        self.max_check_level = None;
        Ok(())
    }

    /// Attribute holding `field`, after checking that it's valid for this
    /// object type.
    fn owning_attribute(&self, field: CertInfo, sub_field: Option<CertInfo>) -> Result<CertInfo> {
        let table = self.attributes.table();
        let location = table::field_id_to_attribute(table, field, sub_field)
            .ok_or(Error::arg_value(field))?;
        let valid = table
            .get(location.attribute_start)
            .map(|row| row.valid)
            .unwrap_or(0);
        if valid & self.cert_type().valid_mask() == 0 {
            return Err(Error::invalid(Some(field), ErrorType::AttrPresent));
        }
        Ok(location.attribute_id)
    }

    /// Revocation entry that takes CRL entry extensions, if any.
    fn entry_list(&mut self, attribute_id: CertInfo) -> Option<&mut AttributeList> {
        if !ENTRY_ATTRIBUTES.contains(&attribute_id) {
            return None;
        }
        match &mut self.kind {
            CertKind::Crl {
                revocations,
                current: Some(index),
                ..
            } => revocations.get_mut(*index).map(|entry| &mut entry.attributes),
            _ => None,
        }
    }

    /// Add a field value.
    ///
    /// On a CRL with a selected revocation entry, entry extensions go to
    /// that entry. Otherwise the cursor moves to the new field.
    pub fn add_attribute(
        &mut self,
        field: CertInfo,
        sub_field: Option<CertInfo>,
        value: AttributeValue,
    ) -> Result<()> {
        self.ensure_mutable(field)?;
        let attribute_id = self.owning_attribute(field, sub_field)?;
        if let Some(list) = self.entry_list(attribute_id) {
            add_attribute_field(list, field, sub_field, value)?;
            return Ok(());
        }
        let index = add_attribute_field(&mut self.attributes, field, sub_field, value)?;
        self.entry_inserted(index);
        self.cursor = Some(index);
        self.derive_selection();
        Ok(())
    }

    /// Add a field or replace the value of a single-valued one.
    pub fn set_attribute(
        &mut self,
        field: CertInfo,
        sub_field: Option<CertInfo>,
        value: AttributeValue,
    ) -> Result<()> {
        self.ensure_mutable(field)?;
        let attribute_id = self.owning_attribute(field, sub_field)?;
        if let Some(list) = self.entry_list(attribute_id) {
            set_attribute_field(list, field, sub_field, value)?;
            return Ok(());
        }
        let before = self.attributes.len();
        let index = set_attribute_field(&mut self.attributes, field, sub_field, value)?;
        if self.attributes.len() > before {
            self.entry_inserted(index);
        }
        self.cursor = Some(index);
        self.derive_selection();
        Ok(())
    }

    /// Keep an attribute the table doesn't describe.
    pub fn add_blob_attribute(
        &mut self,
        oid: const_oid::ObjectIdentifier,
        critical: bool,
        value: &[u8],
    ) -> Result<()> {
        if self.flags.signed {
            return Err(Error::attribute(ErrorKind::Permission, None, ErrorType::None));
        }
        self.max_check_level = None;
        add_blob_attribute(&mut self.attributes, oid, critical, value, false)
    }

    pub fn set_critical(&mut self, attribute_id: CertInfo, critical: bool) -> Result<()> {
        self.ensure_mutable(attribute_id)?;
        self.attributes.set_critical(attribute_id, critical)
    }

    /// Delete one field value. The entry under the cursor is preferred when
    /// it matches.
    pub fn delete_field(&mut self, field: CertInfo, sub_field: Option<CertInfo>) -> Result<()> {
        self.ensure_mutable(field)?;
        let attribute_id = self.owning_attribute(field, sub_field)?;
        if let Some(list) = self.entry_list(attribute_id) {
            list.delete_field(field, sub_field)?;
            return Ok(());
        }
        let index = match self.cursor.and_then(|c| self.attributes.entry(c)) {
            Some(entry) if entry.field_id == field && entry.sub_field_id == sub_field => self.cursor,
            _ => self.attributes.find(field, sub_field),
        }
        .ok_or(Error::not_found(field))?;
        self.attributes.delete_entry(index)?;
        self.entries_removed(index..index + 1);
        Ok(())
    }

    /// Delete a whole attribute.
    pub fn delete_attribute(&mut self, attribute_id: CertInfo) -> Result<()> {
        self.ensure_mutable(attribute_id)?;
        if let Some(list) = self.entry_list(attribute_id) {
            list.delete_attribute(attribute_id)?;
            return Ok(());
        }
        let range = self.attributes.attribute_range(attribute_id);
        self.attributes.delete_attribute(attribute_id)?;
        self.entries_removed(range);
        Ok(())
    }

    // ========================================================================
    // Revocation entries
    // ========================================================================

    fn crl_parts(&self) -> Result<(&[RevocationEntry], Option<usize>, Option<u64>)> {
        match &self.kind {
            CertKind::Crl {
                revocations,
                current,
                revocation_time,
            } => Ok((revocations, *current, *revocation_time)),
            _ => Err(Error::arg_value(CertInfo::RevocationDate)),
        }
    }

    pub fn revocations(&self) -> &[RevocationEntry] {
        match &self.kind {
            CertKind::Crl { revocations, .. } => revocations,
            _ => &[],
        }
    }

    /// The selected revocation entry.
    pub fn current_revocation(&self) -> Option<&RevocationEntry> {
        let (revocations, current, _) = self.crl_parts().ok()?;
        revocations.get(current?)
    }

    /// Add a revoked serial number and select it.
    pub fn add_revocation(&mut self, serial: &[u8], revocation_time: Option<u64>) -> Result<()> {
        self.ensure_mutable(CertInfo::SerialNumber)?;
        match &mut self.kind {
            CertKind::Crl {
                revocations,
                current,
                ..
            } => {
                if revocations.iter().any(|entry| entry.serial == serial) {
                    return Err(Error::duplicate(CertInfo::SerialNumber));
                }
                revocations.push(RevocationEntry::new(serial, revocation_time));
                *current = Some(revocations.len() - 1);
                Ok(())
            }
            _ => Err(Error::arg_value(CertInfo::SerialNumber)),
        }
    }

    /// Select the revocation entry for a serial number.
    pub fn select_revocation(&mut self, serial: &[u8]) -> Result<()> {
        match &mut self.kind {
            CertKind::Crl {
                revocations,
                current,
                ..
            } => {
                let index = revocations
                    .iter()
                    .position(|entry| entry.serial == serial)
                    .ok_or(Error::not_found(CertInfo::SerialNumber))?;
                *current = Some(index);
                Ok(())
            }
            _ => Err(Error::arg_value(CertInfo::SerialNumber)),
        }
    }

    /// Revocation time slot that get, set and delete all act on: the
    /// selected entry, else the first entry, else the CRL-level default.
    fn revocation_time_slot(&mut self) -> Result<&mut Option<u64>> {
        match &mut self.kind {
            CertKind::Crl {
                revocations,
                current,
                revocation_time,
            } => {
                let index = current.unwrap_or(0);
                match revocations.get_mut(index) {
                    Some(entry) => Ok(&mut entry.revocation_time),
                    None => Ok(revocation_time),
                }
            }
            _ => Err(Error::arg_value(CertInfo::RevocationDate)),
        }
    }

    pub fn revocation_date(&self) -> Result<u64> {
        let (revocations, current, default_time) = self.crl_parts()?;
        let slot = match revocations.get(current.unwrap_or(0)) {
            Some(entry) => entry.revocation_time,
            None => default_time,
        };
        slot.ok_or(Error::not_found(CertInfo::RevocationDate))
    }

    pub fn set_revocation_date(&mut self, time: u64) -> Result<()> {
        self.ensure_mutable(CertInfo::RevocationDate)?;
        let slot = self.revocation_time_slot()?;
        if slot.is_some() {
            return Err(Error::duplicate(CertInfo::RevocationDate));
        }
        *slot = Some(time);
        Ok(())
    }

    pub fn delete_revocation_date(&mut self) -> Result<()> {
        self.ensure_mutable(CertInfo::RevocationDate)?;
        self.revocation_time_slot()?
            .take()
            .map(|_| ())
            .ok_or(Error::not_found(CertInfo::RevocationDate))
    }

    // ========================================================================
    // Generated attributes
    // ========================================================================

    /// Add a subjectKeyIdentifier holding the SHA-1 hash of the public key
    /// (RFC 5280 §4.2.1.2, method 1).
    pub fn add_subject_key_identifier<B: CryptoBackend>(&mut self, backend: &B) -> Result<()> {
        if self.public_key.is_empty() {
            return Err(Error::not_initialized(
                Some(CertInfo::SubjectKeyIdentifier),
                ErrorType::AttrAbsent,
            ));
        }
        let digest = backend.sha1(&self.public_key)?;
        self.add_attribute(
            CertInfo::SubjectKeyIdentifier,
            None,
            AttributeValue::Bytes(digest.to_vec()),
        )
    }

    /// Add a random OCSP nonce. The top bit is cleared so the value reads
    /// as a positive INTEGER.
    pub fn add_ocsp_nonce<B: CryptoBackend>(&mut self, backend: &B) -> Result<()> {
        let mut nonce = [0u8; OCSP_NONCE_SIZE];
        backend.fill_random(&mut nonce)?;
        nonce[0] &= 0x7F;
        self.add_attribute(CertInfo::OcspNonce, None, AttributeValue::Bytes(nonce.to_vec()))
    }

    // ========================================================================
    // Checking and signing
    // ========================================================================

    /// Check the object against `issuer` and record the level reached.
    pub fn check(&mut self, issuer: Option<&CertObject>, options: &CheckOptions) -> Result<()> {
        if let Some(level) = check::check_cert(self, issuer, options, false)? {
            self.max_check_level = Some(level);
        }
        Ok(())
    }

    /// Check the object, merge in the attributes inherited from `issuer`,
    /// encode the attribute block and freeze the object.
    ///
    /// Returns the encoded attributes. Nothing changes if any step fails.
    pub fn sign(&mut self, issuer: Option<&CertObject>, options: &CheckOptions) -> Result<Vec<u8>> {
        if self.flags.signed {
            log::error!("sign: {:?} is already signed", self.cert_type());
            return Err(Error::attribute(ErrorKind::Permission, None, ErrorType::None));
        }
        let cert_type = self.cert_type();

        let explicit_issuer = self.issuer.clone();
        let checked_level = self.max_check_level;
        if let Some(issuer) = issuer {
            if self.issuer.is_empty() {
                self.issuer = issuer.subject.clone();
            }
        }
        let result = self.sign_inner(issuer, options);
        if result.is_err() {
            self.issuer = explicit_issuer;
            self.max_check_level = checked_level;
        }
        let (attributes, encoded) = result?;

        self.attributes = attributes;
        self.subject_der = Some(self.subject.to_der()?);
        self.issuer_der = Some(self.issuer().to_der()?);
        self.flags.signed = true;
        self.selection.clear_saved();
        log::trace!("sign: {:?} signed, {} bytes of attributes", cert_type, encoded.len());
        Ok(encoded)
    }

    fn sign_inner(
        &mut self,
        issuer: Option<&CertObject>,
        options: &CheckOptions,
    ) -> Result<(AttributeList, Vec<u8>)> {
        let cert_type = self.cert_type();
        if !matches!(cert_type, CertType::CmsAttributes | CertType::PkiUser) {
            self.check(issuer, options)?;
        }

        let mut attributes = self.attributes.clone();
        if let Some(issuer) = issuer {
            if matches!(
                cert_type,
                CertType::Certificate | CertType::AttributeCertificate
            ) {
                copy_issuer_attributes(&mut attributes, &issuer.attributes, cert_type)?;
            }
        }
        if let CertKind::Crl { revocations, .. } = &mut self.kind {
            for entry in revocations.iter_mut() {
                walker::check_attributes(
                    &mut entry.attributes,
                    CertType::RevocationEntry.valid_mask(),
                )?;
            }
        }
        let encoded = write_attributes(&mut attributes, cert_type, options)?;
        Ok((attributes, encoded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certificate::name::{CN, COUNTRY_NAME};

    struct FixedBackend;

    impl CryptoBackend for FixedBackend {
        fn sha1(&self, data: &[u8]) -> Result<[u8; 20]> {
            let mut out = [0u8; 20];
            out[0] = data.len() as u8;
            Ok(out)
        }

        fn fill_random(&self, out: &mut [u8]) -> Result<()> {
            out.fill(0xFF);
            Ok(())
        }
    }

    fn options() -> CheckOptions {
        CheckOptions::new().skip_time_validation()
    }

    fn name(cn: &str) -> Name {
        let mut name = Name::new();
        name.add_component(COUNTRY_NAME, "US").unwrap();
        name.add_component(CN, cn).unwrap();
        name
    }

    #[test]
    fn test_cert_type_masks() {
        assert_eq!(CertType::Certificate.valid_mask(), VALID_CERT);
        assert_eq!(
            CertType::RequestCert.valid_mask(),
            VALID_CERTREQ | VALID_REQCERT
        );
        assert_eq!(CertType::CmsAttributes.table_kind(), TableKind::Cms);
        assert!(CertType::RtcsResponse.uses_set_encoding());
        assert!(!CertType::Crl.uses_set_encoding());
        assert!(CertObject::new(CertType::RevocationEntry).is_err());
    }

    #[test]
    fn test_add_rejects_invalid_type() {
        let mut request = CertObject::new(CertType::CertRequest).unwrap();
        let err = request
            .add_attribute(CertInfo::CrlNumber, None, AttributeValue::Integer(1))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invalid);
        assert_eq!(err.locus(), Some(CertInfo::CrlNumber));
        assert_eq!(err.error_type(), ErrorType::AttrPresent);
    }

    #[test]
    fn test_signed_object_is_frozen() {
        let mut cert = CertObject::new(CertType::Certificate)
            .unwrap()
            .with_subject(name("root"))
            .self_signed();
        cert.add_attribute(CertInfo::Ca, None, AttributeValue::Boolean(true))
            .unwrap();
        cert.add_attribute(CertInfo::KeyUsage, None, AttributeValue::Integer(0x60))
            .unwrap();
        cert.sign(None, &options()).unwrap();
        assert!(cert.is_signed());
        assert_eq!(cert.issuer(), cert.subject());
        assert_eq!(cert.encoded_issuer(), cert.encoded_subject());

        let err = cert
            .add_attribute(CertInfo::CrlNumber, None, AttributeValue::Integer(1))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Permission);
        assert!(cert.sign(None, &options()).is_err());
    }

    #[test]
    fn test_failed_sign_keeps_checks_pending() {
        let mut cert = CertObject::new(CertType::Certificate)
            .unwrap()
            .with_subject(name("leaf"))
            .self_signed();
        cert.add_attribute(CertInfo::KeyUsage, None, AttributeValue::Integer(0x01))
            .unwrap();
        cert.add_attribute(
            CertInfo::CertPolicyCpsUri,
            None,
            AttributeValue::Text("http://www.example.com/cps".into()),
        )
        .unwrap();

        let err = cert.sign(None, &options()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotInitialized);
        assert!(!cert.is_signed());
        assert_eq!(cert.max_check_level(), None);

        cert.delete_attribute(CertInfo::CertificatePolicies).unwrap();
        cert.add_attribute(
            CertInfo::PermittedSubtrees,
            Some(CertInfo::DnsName),
            AttributeValue::Text(".example.com".into()),
        )
        .unwrap();
        let err = cert.sign(None, &options()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invalid);
        assert_eq!(err.locus(), Some(CertInfo::Ca));
        assert_eq!(err.error_type(), ErrorType::Constraint);
        assert!(!cert.is_signed());
    }

    #[test]
    fn test_changes_discard_check_level() {
        let mut cert = CertObject::new(CertType::Certificate)
            .unwrap()
            .with_subject(name("leaf"))
            .self_signed();
        cert.add_attribute(CertInfo::KeyUsage, None, AttributeValue::Integer(0x01))
            .unwrap();
        cert.check(None, &options()).unwrap();
        assert_eq!(cert.max_check_level(), Some(ComplianceLevel::PkixFull));

        cert.add_attribute(
            CertInfo::PermittedSubtrees,
            Some(CertInfo::DnsName),
            AttributeValue::Text(".example.com".into()),
        )
        .unwrap();
        assert_eq!(cert.max_check_level(), None);
        let err = cert.check(None, &options()).unwrap_err();
        assert_eq!(err.locus(), Some(CertInfo::Ca));
    }

    #[test]
    fn test_load_marks_imported() {
        let mut cert = CertObject::new(CertType::Certificate).unwrap();
        cert.add_attribute(CertInfo::KeyUsage, None, AttributeValue::Integer(0x01))
            .unwrap();
        let block = write_attributes(&mut cert.attributes, CertType::Certificate, &options()).unwrap();
        let subject = name("leaf").to_der().unwrap();

        let loaded = CertObject::from_encoded(
            CertType::Certificate,
            &block,
            Some(&subject),
            None,
            &options(),
        )
        .unwrap();
        assert!(loaded.flags().imported);
        assert!(loaded.is_signed());
        assert_eq!(loaded.key_usage(), Some(0x01));
        assert_eq!(loaded.subject(), &name("leaf"));
        assert!(!loaded.is_ca());
    }

    #[test]
    fn test_revocation_date_precedence() {
        let mut crl = CertObject::new(CertType::Crl).unwrap();
        crl.set_revocation_date(100).unwrap();
        assert_eq!(crl.revocation_date().unwrap(), 100);

        crl.add_revocation(&[1], None).unwrap();
        crl.add_revocation(&[2], Some(300)).unwrap();
        assert_eq!(crl.revocation_date().unwrap(), 300);

        crl.select_revocation(&[1]).unwrap();
        assert!(crl.revocation_date().is_err());
        crl.set_revocation_date(200).unwrap();
        assert_eq!(crl.revocations()[0].revocation_time, Some(200));
        assert!(crl.set_revocation_date(250).is_err());

        crl.delete_revocation_date().unwrap();
        assert_eq!(crl.revocations()[0].revocation_time, None);
        assert_eq!(crl.revocations()[1].revocation_time, Some(300));
        assert!(crl.delete_revocation_date().is_err());
        assert!(crl.add_revocation(&[2], None).is_err());
        assert!(crl.select_revocation(&[9]).is_err());
    }

    #[test]
    fn test_entry_extensions_follow_selection() {
        let mut crl = CertObject::new(CertType::Crl).unwrap();
        crl.add_attribute(CertInfo::CrlNumber, None, AttributeValue::Integer(7))
            .unwrap();
        crl.add_revocation(&[5], Some(10)).unwrap();
        crl.add_attribute(CertInfo::CrlReason, None, AttributeValue::Integer(1))
            .unwrap();

        assert!(!crl.attributes().has_attribute(CertInfo::CrlReason));
        let entry = crl.current_revocation().unwrap();
        assert!(entry.attributes.has_attribute(CertInfo::CrlReason));

        let block = crl.sign(None, &options()).unwrap();
        assert!(!block.is_empty());
        let mut entry = crl.revocations()[0].clone();
        assert_eq!(entry.write_attributes(&options()).unwrap()[0], 0x30);
    }

    #[test]
    fn test_generated_attributes() {
        let mut cert = CertObject::new(CertType::Certificate).unwrap();
        let err = cert.add_subject_key_identifier(&FixedBackend).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotInitialized);

        let mut cert = cert.with_public_key(&[0x30, 0x03, 0x02, 0x01, 0x05]);
        cert.add_subject_key_identifier(&FixedBackend).unwrap();
        let ski = cert.attribute_value(CertInfo::SubjectKeyIdentifier).unwrap();
        assert_eq!(ski.as_bytes().unwrap().len(), 20);
        assert_eq!(ski.as_bytes().unwrap()[0], 5);

        let mut request = CertObject::new(CertType::OcspRequest).unwrap();
        request.add_ocsp_nonce(&FixedBackend).unwrap();
        let nonce = request.attribute_value(CertInfo::OcspNonce).unwrap();
        assert_eq!(nonce.as_bytes().unwrap().len(), OCSP_NONCE_SIZE);
        assert_eq!(nonce.as_bytes().unwrap()[0], 0x7F);
    }

    #[test]
    fn test_set_attribute_replaces_value() {
        let mut cert = CertObject::new(CertType::Certificate)
            .unwrap()
            .with_serial_number(&[0x01, 0x02]);
        assert_eq!(cert.serial_number(), Some(&[0x01, 0x02][..]));

        cert.set_attribute(CertInfo::KeyUsage, None, AttributeValue::Integer(0x01))
            .unwrap();
        cert.set_attribute(CertInfo::KeyUsage, None, AttributeValue::Integer(0x05))
            .unwrap();
        assert_eq!(cert.key_usage(), Some(0x05));
        assert_eq!(cert.attributes().field_values(CertInfo::KeyUsage).count(), 1);

        let crl = CertObject::new(CertType::Crl)
            .unwrap()
            .with_serial_number(&[0x01]);
        assert_eq!(crl.serial_number(), None);
    }

    #[test]
    fn test_key_algorithm_capabilities() {
        assert!(KeyAlgorithm::Rsa.can_sign() && KeyAlgorithm::Rsa.can_encrypt());
        assert!(!KeyAlgorithm::Rsa.can_agree());
        assert!(KeyAlgorithm::Ecdsa.can_agree());
        assert!(!KeyAlgorithm::Dh.can_sign());
        assert!(Validity::new(1, 2).is_well_formed());
        assert!(!Validity::new(2, 2).is_well_formed());
    }
}
