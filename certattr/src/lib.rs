// Copyright (c) 2026 Intel Corporation
//
// SPDX-License-Identifier: Apache-2.0 or MIT

//! Certificate Attribute Engine
//!
//! A no_std-compatible, table-driven engine for X.509 extensions and CMS
//! signed attributes. Uses `der` for ASN.1 primitives and an optional
//! crypto backend for key identifiers and nonces.
//!
//! # Features
//! - Build, check and encode certificate, CRL, request, OCSP and RTCS
//!   extensions from one description table
//! - Decode extensions back into fields, keeping unknown ones as blobs
//! - DER SET OF ordering for CMS signed attributes
//! - Subject, issuer and GeneralName DN selection with a field cursor
//! - Key usage, basic constraints, path length, name and policy
//!   constraint checks at selectable compliance levels
//! - Issuer-to-subject attribute propagation when signing
//!
//! # Example
//! ```no_run
//! use certattr::prelude::*;
//!
//! # fn example() -> certattr::Result<()> {
//! let mut cert = CertObject::new(CertType::Certificate)?;
//! cert.add_attribute(CertInfo::KeyUsage, None, AttributeValue::Integer(0x01))?;
//! cert.select_general_name(CertInfo::SubjectAltName, SelectionMode::CreateIfAbsent)?;
//! cert.select_dn(CertInfo::DirectoryName, SelectionMode::CreateIfAbsent)?;
//! cert.add_dn_component(certattr::certificate::name::COUNTRY_NAME, "US")?;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod attr;
pub mod certificate;
pub mod check;
pub mod config;
pub mod crypto_backend;
pub mod error;
pub mod time;

pub use attr::{AttributeEntry, AttributeList, AttributeValue, CertInfo};
pub use certificate::name::Name;
pub use certificate::select::{CursorMove, DnSelection, SelectionMode};
pub use certificate::{CertObject, CertType, KeyAlgorithm, Validity};
pub use check::{check_cert, check_key_usage, KeyUsageCheck};
pub use config::{CheckOptions, ComplianceLevel};
pub use error::{Error, ErrorKind, ErrorType, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::attr::{AttributeValue, CertInfo};
    pub use crate::certificate::select::{CursorMove, SelectionMode};
    pub use crate::certificate::{CertObject, CertType};
    pub use crate::config::{CheckOptions, ComplianceLevel};
    pub use crate::{Error, Result};
}

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use crate::attr::table::CONTENT_TYPE_DATA;
    use crate::certificate::name::{Name, CN, COUNTRY_NAME, ORGANIZATION_NAME};
    use crate::{ErrorKind, ErrorType};
    use der::{Decode, Header, Reader, SliceReader, Tag, TagNumber};

    fn name(cn: &str) -> Name {
        let mut name = Name::new();
        name.add_component(COUNTRY_NAME, "US").unwrap();
        name.add_component(CN, cn).unwrap();
        name
    }

    fn signed_ca() -> CertObject {
        let mut ca = CertObject::new(CertType::Certificate)
            .unwrap()
            .with_subject(name("Example Root"))
            .self_signed();
        ca.add_attribute(CertInfo::KeyUsage, None, AttributeValue::Integer(0x60))
            .unwrap();
        ca.add_attribute(CertInfo::Ca, None, AttributeValue::Boolean(true))
            .unwrap();
        ca.add_attribute(
            CertInfo::SubjectKeyIdentifier,
            None,
            AttributeValue::Bytes(alloc::vec![0x5A; 20]),
        )
        .unwrap();
        ca.sign(None, &CheckOptions::new().skip_time_validation())
            .unwrap();
        ca
    }

    #[test]
    fn test_end_entity_inherits_from_issuer() {
        let _ = env_logger::builder().is_test(true).try_init();
        let ca = signed_ca();
        let mut leaf = CertObject::new(CertType::Certificate)
            .unwrap()
            .with_subject(name("leaf"));
        leaf.add_attribute(CertInfo::KeyUsage, None, AttributeValue::Integer(0x01))
            .unwrap();
        leaf.sign(Some(&ca), &CheckOptions::new().skip_time_validation())
            .unwrap();

        assert_eq!(leaf.issuer(), ca.subject());
        assert_eq!(leaf.encoded_issuer(), ca.encoded_subject());
        assert_eq!(
            leaf.attribute_value(CertInfo::AuthorityKeyId).unwrap(),
            AttributeValue::Bytes(alloc::vec![0x5A; 20])
        );
    }

    #[test]
    fn test_name_constraints_on_end_entity_rejected() {
        let _ = env_logger::builder().is_test(true).try_init();
        let ca = signed_ca();
        let mut leaf = CertObject::new(CertType::Certificate)
            .unwrap()
            .with_subject(name("leaf"));
        leaf.add_attribute(
            CertInfo::PermittedSubtrees,
            Some(CertInfo::DnsName),
            AttributeValue::Text(".example.com".into()),
        )
        .unwrap();

        let err = leaf
            .sign(Some(&ca), &CheckOptions::new().skip_time_validation())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invalid);
        assert_eq!(err.locus(), Some(CertInfo::Ca));
        assert_eq!(err.error_type(), ErrorType::Constraint);

        // The failed signing leaves the object untouched
        assert!(!leaf.is_signed());
        assert!(leaf.issuer().is_empty());
        assert!(!leaf.attributes().has_attribute(CertInfo::AuthorityKeyIdentifier));
    }

    #[test]
    fn test_cms_attributes_encode_sorted() {
        let mut cms = CertObject::new(CertType::CmsAttributes).unwrap();
        cms.add_attribute(
            CertInfo::CmsContentType,
            None,
            AttributeValue::Integer(CONTENT_TYPE_DATA),
        )
        .unwrap();
        cms.add_attribute(
            CertInfo::CmsMessageDigest,
            None,
            AttributeValue::Bytes(alloc::vec![0xAB; 20]),
        )
        .unwrap();
        cms.add_attribute(
            CertInfo::CmsSigningTime,
            None,
            AttributeValue::Time(1_700_000_000),
        )
        .unwrap();
        let der = cms.sign(None, &CheckOptions::new()).unwrap();

        let mut reader = SliceReader::new(&der).unwrap();
        let header = Header::decode(&mut reader).unwrap();
        assert_eq!(
            header.tag,
            Tag::ContextSpecific {
                constructed: true,
                number: TagNumber::N0,
            }
        );
        assert_eq!(reader.remaining_len(), header.length);

        let mut elements = alloc::vec::Vec::new();
        while !reader.is_finished() {
            elements.push(reader.tlv_bytes().unwrap());
        }
        assert_eq!(elements.len(), 3);
        assert!(elements.windows(2).all(|pair| pair[0] < pair[1]));

        // SEQUENCE { OID 1.2.840.113549.1.9.n, ... }. The shorter
        // signingTime (5) sorts ahead of messageDigest (4).
        for (element, arc) in elements.iter().zip([0x03, 0x05, 0x04]) {
            assert_eq!(element[0], 0x30);
            assert_eq!(
                &element[2..13],
                &[0x06, 0x09, 0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D, 0x01, 0x09, arc]
            );
        }
    }

    #[test]
    fn test_directory_name_in_subject_alt_name() {
        let mut cert = CertObject::new(CertType::Certificate).unwrap();
        cert.select_general_name(CertInfo::SubjectAltName, SelectionMode::CreateIfAbsent)
            .unwrap();
        cert.select_dn(CertInfo::DirectoryName, SelectionMode::CreateIfAbsent)
            .unwrap();
        cert.add_dn_component(COUNTRY_NAME, "US").unwrap();
        cert.add_dn_component(ORGANIZATION_NAME, "Example").unwrap();

        let index = cert
            .attributes()
            .find(CertInfo::SubjectAltName, Some(CertInfo::DirectoryName))
            .unwrap();
        assert!(!cert.is_selection_pending());
        assert_eq!(cert.cursor, Some(index));
        let entry = cert.cursor_entry().unwrap();
        assert_eq!(entry.field_id, CertInfo::SubjectAltName);
        assert_eq!(entry.sub_field_id, Some(CertInfo::DirectoryName));

        let dn = cert.attributes().entries()[index].value.as_name().unwrap();
        assert_eq!(dn.component(COUNTRY_NAME).as_deref(), Some("US"));
        assert_eq!(dn.component(ORGANIZATION_NAME).as_deref(), Some("Example"));
    }
}
