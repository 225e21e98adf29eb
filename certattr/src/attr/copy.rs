// Copyright (c) 2026 Intel Corporation
//
// SPDX-License-Identifier: Apache-2.0 or MIT

//! Copying attributes between lists.
//!
//! Copies are all-or-nothing: every duplicate check runs before the first
//! entry is inserted, and the multi-attribute merges build into a copy of
//! the destination that replaces it only on success.

extern crate alloc;

use alloc::vec::Vec;

use crate::attr::list::{AttributeEntry, AttributeList, EntryFlags};
use crate::attr::table::{self, FL_NOCOPY};
use crate::attr::{AttributeValue, CertInfo};
use crate::certificate::CertType;
use crate::error::{Error, ErrorKind, ErrorType, Result};

/// How entries are rewritten while being copied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyMode {
    /// Copy verbatim
    Direct,
    /// Subject attributes become the matching issuer attributes in the
    /// certificate being issued
    SubjectToIssuer,
    /// Length constraints lose one level on the way down the chain
    IssuerToSubject,
}

/// Integer constraints counting certificates below the issuer.
const LENGTH_CONSTRAINTS: [CertInfo; 3] = [
    CertInfo::PathLenConstraint,
    CertInfo::RequireExplicitPolicy,
    CertInfo::InhibitPolicyMapping,
];

const REVOCATION_ATTRIBUTES: [CertInfo; 3] = [
    CertInfo::CrlReason,
    CertInfo::InvalidityDate,
    CertInfo::CrlExtReason,
];

// ============================================================================
// Entry rewriting
// ============================================================================

/// Attribute and field identifiers an entry is copied under.
fn remap(attribute_id: CertInfo, field_id: CertInfo, mode: CopyMode) -> (CertInfo, CertInfo) {
    if mode != CopyMode::SubjectToIssuer {
        return (attribute_id, field_id);
    }
    match (attribute_id, field_id) {
        (CertInfo::SubjectAltName, CertInfo::SubjectAltName) => {
            (CertInfo::IssuerAltName, CertInfo::IssuerAltName)
        }
        (CertInfo::SubjectKeyIdentifier, CertInfo::SubjectKeyIdentifier) => {
            (CertInfo::AuthorityKeyIdentifier, CertInfo::AuthorityKeyId)
        }
        other => other,
    }
}

fn target_attribute(attribute_id: CertInfo, mode: CopyMode) -> CertInfo {
    remap(attribute_id, attribute_id, mode).0
}

/// The entry as it lands in the destination, or `None` if it's dropped.
fn copy_entry(entry: &AttributeEntry, mode: CopyMode) -> Option<AttributeEntry> {
    let mut copy = entry.clone();
    copy.flags.locked = false;
    match mode {
        CopyMode::Direct => {}
        CopyMode::SubjectToIssuer => {
            let (attribute_id, field_id) = remap(entry.attribute_id, entry.field_id, mode);
            if attribute_id != entry.attribute_id {
                copy.attribute_id = attribute_id;
                copy.field_id = field_id;
                copy.flags = EntryFlags {
                    multivalued: entry.flags.multivalued,
                    ..EntryFlags::default()
                };
            }
        }
        CopyMode::IssuerToSubject => {
            if LENGTH_CONSTRAINTS.contains(&entry.field_id) {
                let value = entry.value.as_integer()? - 1;
                if value < 0 {
                    return None;
                }
                copy.value = AttributeValue::Integer(value);
            }
        }
    }
    Some(copy)
}

fn check_kinds(dest: &AttributeList, src: &AttributeList) -> Result<()> {
    if dest.kind() != src.kind() {
        log::error!(
            "copy: can't copy {:?} attributes into a {:?} list",
            src.kind(),
            dest.kind()
        );
        return Err(Error::internal("attribute lists use different tables"));
    }
    Ok(())
}

fn is_nocopy(list: &AttributeList, attribute_id: CertInfo) -> bool {
    let rows = list.table();
    table::attribute_start(rows, attribute_id)
        .and_then(|start| rows.get(start))
        .map_or(false, |row| row.has_flag(FL_NOCOPY))
}

fn insert_copies<'a, I>(dest: &mut AttributeList, entries: I, mode: CopyMode)
where
    I: IntoIterator<Item = &'a AttributeEntry>,
{
    for entry in entries {
        if let Some(copy) = copy_entry(entry, mode) {
            dest.insert_entry(copy);
        }
    }
}

// ============================================================================
// Single attributes
// ============================================================================

/// Copy every entry of one attribute.
pub fn copy_attribute(
    dest: &mut AttributeList,
    src: &AttributeList,
    attribute_id: CertInfo,
    mode: CopyMode,
) -> Result<()> {
    check_kinds(dest, src)?;
    let entries = src.attribute_entries(attribute_id);
    if entries.is_empty() {
        return Err(Error::not_found(attribute_id));
    }
    let target = target_attribute(attribute_id, mode);
    if dest.has_attribute(target) {
        log::error!("copy_attribute: {:?} is already present", target);
        return Err(Error::duplicate(target));
    }
    insert_copies(dest, entries, mode);
    Ok(())
}

/// Copy every value of one field.
pub fn copy_attribute_field(
    dest: &mut AttributeList,
    src: &AttributeList,
    field: CertInfo,
    mode: CopyMode,
) -> Result<()> {
    check_kinds(dest, src)?;
    let entries: Vec<&AttributeEntry> = src.field_values(field).collect();
    let first = entries.first().ok_or(Error::not_found(field))?;
    let (_, target) = remap(first.attribute_id, field, mode);
    if dest.find_first_field_of(target).is_some() {
        log::error!("copy_attribute_field: {:?} is already present", target);
        return Err(Error::duplicate(target));
    }
    insert_copies(dest, entries, mode);
    Ok(())
}

// ============================================================================
// Whole lists
// ============================================================================

/// Copy every copyable attribute, including unrecognised ones, from `src`.
pub fn copy_attributes(dest: &mut AttributeList, src: &AttributeList, mode: CopyMode) -> Result<()> {
    check_kinds(dest, src)?;

    let copyable = move || {
        src.entries()
            .iter()
            .filter(move |entry| !is_nocopy(src, entry.attribute_id))
    };
    for entry in copyable() {
        let (_, target) = remap(entry.attribute_id, entry.field_id, mode);
        if dest.find_first_field_of(target).is_some() {
            log::error!("copy_attributes: {:?} is already present", target);
            return Err(Error::duplicate(target));
        }
    }
    for blob in src.blobs() {
        if dest.find_blob(&blob.oid).is_some() {
            log::error!("copy_attributes: attribute {} is already present", blob.oid);
            return Err(Error::attribute(
                ErrorKind::Duplicate,
                None,
                ErrorType::AttrPresent,
            ));
        }
    }

    insert_copies(dest, copyable(), mode);
    for blob in src.blobs() {
        dest.push_blob(blob.clone());
    }
    Ok(())
}

/// Carry a request's attributes into the certificate issued from it.
pub fn copy_request_attributes(dest: &mut AttributeList, src: &AttributeList) -> Result<()> {
    copy_attributes(dest, src, CopyMode::Direct)
}

/// Merge one length constraint from the issuer, keeping the smaller value.
fn merge_length_constraint(dest: &mut AttributeList, src: &AttributeList, field: CertInfo) {
    let Some(copy) = src
        .find_first_field_of(field)
        .and_then(|index| src.entry(index))
        .and_then(|entry| copy_entry(entry, CopyMode::IssuerToSubject))
    else {
        return;
    };
    let existing = dest.find_first_field_of(field);
    match existing.and_then(|index| dest.entry_mut(index)) {
        Some(entry) => {
            let current = entry.value.as_integer();
            let inherited = copy.value.as_integer();
            if let (Some(current), Some(inherited)) = (current, inherited) {
                if inherited < current {
                    entry.value = AttributeValue::Integer(inherited);
                }
            }
        }
        None => {
            dest.insert_entry(copy);
        }
    }
}

/// Merge the attributes a certificate inherits from its issuer.
///
/// A CA subject takes the issuer's name constraints and its length
/// constraints less one. The issuer's subjectAltName and
/// subjectKeyIdentifier become the subject's issuerAltName and
/// authorityKeyIdentifier unless the subject already has them, and its
/// authorityInfoAccess is copied if the subject has none.
pub fn copy_issuer_attributes(
    dest: &mut AttributeList,
    src: &AttributeList,
    cert_type: CertType,
) -> Result<()> {
    check_kinds(dest, src)?;
    let mut merged = dest.clone();

    let subject_is_ca = merged
        .value(CertInfo::Ca)
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    if subject_is_ca {
        let subtrees = [CertInfo::PermittedSubtrees, CertInfo::ExcludedSubtrees];
        for field in subtrees {
            if src.find_first_field_of(field).is_some()
                && merged.find_first_field_of(field).is_some()
            {
                log::error!("copy_issuer_attributes: subject already has {:?}", field);
                return Err(Error::duplicate(field));
            }
        }
        for field in subtrees {
            if src.find_first_field_of(field).is_some() {
                copy_attribute_field(&mut merged, src, field, CopyMode::Direct)?;
            }
        }
        for field in LENGTH_CONSTRAINTS {
            merge_length_constraint(&mut merged, src, field);
        }
    }

    if cert_type != CertType::AttributeCertificate {
        for attribute_id in [CertInfo::SubjectAltName, CertInfo::SubjectKeyIdentifier] {
            let target = target_attribute(attribute_id, CopyMode::SubjectToIssuer);
            if src.has_attribute(attribute_id) && !merged.has_attribute(target) {
                copy_attribute(&mut merged, src, attribute_id, CopyMode::SubjectToIssuer)?;
            }
        }
        if src.has_attribute(CertInfo::AuthorityInfoAccess)
            && !merged.has_attribute(CertInfo::AuthorityInfoAccess)
        {
            copy_attribute(
                &mut merged,
                src,
                CertInfo::AuthorityInfoAccess,
                CopyMode::Direct,
            )?;
        }
    }

    log::trace!(
        "copy_issuer_attributes: {} entries after merge",
        merged.len()
    );
    *dest = merged;
    Ok(())
}

/// Echo an OCSP request's nonce into the response.
pub fn copy_ocsp_request_attributes(dest: &mut AttributeList, src: &AttributeList) -> Result<()> {
    check_kinds(dest, src)?;
    if dest.has_attribute(CertInfo::OcspNonce) {
        dest.delete_attribute(CertInfo::OcspNonce)?;
    }
    if src.has_attribute(CertInfo::OcspNonce) {
        copy_attribute(dest, src, CertInfo::OcspNonce, CopyMode::Direct)?;
    }
    Ok(())
}

/// Carry the revocation details from a revocation request into a CRL
/// entry. Nothing else is copied.
pub fn copy_revocation_attributes(dest: &mut AttributeList, src: &AttributeList) -> Result<()> {
    check_kinds(dest, src)?;
    let mut merged = dest.clone();
    for attribute_id in REVOCATION_ATTRIBUTES {
        if src.has_attribute(attribute_id) {
            copy_attribute(&mut merged, src, attribute_id, CopyMode::Direct)?;
        }
    }
    *dest = merged;
    Ok(())
}
