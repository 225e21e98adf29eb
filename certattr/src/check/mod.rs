// Copyright (c) 2026 Intel Corporation
//
// SPDX-License-Identifier: Apache-2.0 or MIT

//! Constraint checks run before an object is signed or accepted.
//!
//! [`check_cert`] checks a certificate-like object against the certificate
//! that issued it, at the compliance level from [`CheckOptions`]. Each
//! level adds checks on top of the previous one:
//!
//! - Oblivious: explicit distrust of the issuer
//! - Reduced: validity period, issuer name chaining
//! - Standard: key usage and basicConstraints consistency, critical
//!   unrecognised extensions
//! - PkixPartial: CA-only extensions, path length, extKeyUsage
//! - PkixFull: name constraints and policy constraints

pub mod keyusage;
pub mod names;
pub mod policy;

pub use keyusage::{check_key_usage, KeyUsageCheck};
pub use policy::PolicyType;

use crate::attr::CertInfo;
use crate::certificate::{CertObject, CertType};
use crate::config::{CheckOptions, ComplianceLevel};
use crate::error::{Error, ErrorType, Result};

use keyusage::{KU_CRL_SIGN, KU_KEY_CERT_SIGN};

/// Attributes only a CA certificate may carry.
const CA_ONLY_ATTRIBUTES: [CertInfo; 4] = [
    CertInfo::NameConstraints,
    CertInfo::PolicyConstraints,
    CertInfo::InhibitAnyPolicy,
    CertInfo::PolicyMappings,
];

/// Report an error found in the issuer as a constraint the issuer imposes.
fn as_issuer_constraint(err: Error) -> Error {
    match err {
        Error::AttributeError(e) => {
            Error::attribute(e.kind, e.locus, ErrorType::IssuerConstraint)
        }
        other => other,
    }
}

fn constraint_error(locus: Option<CertInfo>, error_type: ErrorType, msg: &str) -> Error {
    log::error!("check_cert: {}", msg);
    Error::invalid(locus, error_type)
}

// ============================================================================
// Per-type checks
// ============================================================================

fn check_crl(crl: &CertObject, issuer: Option<&CertObject>, level: ComplianceLevel) -> Result<()> {
    let attributes = crl.attributes();
    let delta = attributes
        .value(CertInfo::DeltaCrlIndicator)
        .and_then(|v| v.as_integer());
    let number = attributes.value(CertInfo::CrlNumber).and_then(|v| v.as_integer());
    if let (Some(delta), Some(number)) = (delta, number) {
        if number <= delta {
            return Err(constraint_error(
                Some(CertInfo::DeltaCrlIndicator),
                ErrorType::Constraint,
                "delta CRL number doesn't follow its base CRL",
            ));
        }
    }
    if let Some(issuer) = issuer {
        check_key_usage(issuer, Some(KU_CRL_SIGN), KeyUsageCheck::Ca, level)?;
    }
    Ok(())
}

/// CA-only attributes in `cert`, reported against `error_type` if it
/// isn't a CA.
fn check_ca_only_attributes(cert: &CertObject, error_type: ErrorType) -> Result<()> {
    if cert.is_ca() {
        return Ok(());
    }
    let attributes = cert.attributes();
    let present = CA_ONLY_ATTRIBUTES
        .iter()
        .any(|id| attributes.has_attribute(*id))
        || attributes.find_first_field_of(CertInfo::PathLenConstraint).is_some();
    if present {
        return Err(constraint_error(
            Some(CertInfo::Ca),
            error_type,
            "CA-only attribute in a non-CA certificate",
        ));
    }
    Ok(())
}

fn check_path_length(subject: &CertObject, issuer: &CertObject) -> Result<()> {
    let Some(path_len) = issuer.path_len_constraint() else {
        return Ok(());
    };
    if subject.flags().path_kludge || path_len > 0 {
        return Ok(());
    }
    if subject.is_ca() {
        return Err(constraint_error(
            Some(CertInfo::PathLenConstraint),
            ErrorType::IssuerConstraint,
            "path length constraint exceeded",
        ));
    }
    Ok(())
}

fn check_policies(subject: &CertObject, issuer: &CertObject) -> Result<()> {
    let attributes = issuer.attributes();
    let require_explicit = attributes
        .value(CertInfo::RequireExplicitPolicy)
        .and_then(|v| v.as_integer());
    if !matches!(require_explicit, Some(skip) if skip <= 0) {
        return Ok(());
    }
    let inhibit_any = attributes
        .value(CertInfo::InhibitAnyPolicy)
        .and_then(|v| v.as_integer());
    let policy_type = match inhibit_any {
        Some(skip) if skip <= 0 => PolicyType::SubjectSpecific,
        _ => PolicyType::Subject,
    };
    policy::check_policy_constraints(subject, issuer, policy_type)
}

// ============================================================================
// Certificate check
// ============================================================================

/// Check `subject` against `issuer` (or itself if self-signed).
///
/// Returns the compliance level the object was checked to, or `None` if
/// there is nothing to record (types without issuer checks, or a check
/// that a previous one already covered).
///
/// With `short_circuit` set, checks that depend on the rest of the chain
/// (path length, name and policy constraints) are left to the chain
/// checker.
pub fn check_cert(
    subject: &CertObject,
    issuer: Option<&CertObject>,
    options: &CheckOptions,
    short_circuit: bool,
) -> Result<Option<ComplianceLevel>> {
    let flags = subject.flags();
    // Objects being built locally are held to the full standard
    let level = if flags.imported {
        options.compliance_level
    } else {
        ComplianceLevel::PkixFull
    };
    log::trace!(
        "check_cert: {:?} at {:?}",
        subject.cert_type(),
        level
    );

    match subject.cert_type() {
        CertType::Certificate | CertType::AttributeCertificate => {}
        CertType::Crl => {
            check_crl(subject, issuer, level)?;
            return Ok(None);
        }
        CertType::CmsAttributes | CertType::PkiUser => {
            log::error!("check_cert: {:?} has no issuer checks", subject.cert_type());
            return Err(Error::arg_value(CertInfo::IssuerName));
        }
        _ => return Ok(None),
    }

    let issuer = match issuer {
        Some(issuer) => issuer,
        None if flags.self_signed => subject,
        None => {
            log::error!("check_cert: no issuer for a non-self-signed certificate");
            return Err(Error::arg_value(CertInfo::IssuerName));
        }
    };

    // Explicit distrust overrides everything else
    if issuer.trusted_usage().is_some() {
        check_key_usage(
            issuer,
            Some(KU_KEY_CERT_SIGN),
            KeyUsageCheck::Ca,
            ComplianceLevel::Oblivious,
        )
        .map_err(as_issuer_constraint)?;
    }
    if level < ComplianceLevel::Reduced {
        return Ok(Some(level));
    }

    if let Some(validity) = subject.validity() {
        if !validity.is_well_formed() {
            return Err(constraint_error(
                Some(CertInfo::ValidFrom),
                ErrorType::Constraint,
                "validity period ends before it starts",
            ));
        }
        if options.check_time {
            let now = options.current_time()?;
            if flags.imported && now < validity.not_before {
                return Err(constraint_error(
                    Some(CertInfo::ValidFrom),
                    ErrorType::Constraint,
                    "certificate isn't valid yet",
                ));
            }
            if now > validity.not_after {
                return Err(constraint_error(
                    Some(CertInfo::ValidTo),
                    ErrorType::Constraint,
                    "certificate has expired",
                ));
            }
        }
    }

    let already_checked = matches!(subject.max_check_level(), Some(max) if max >= level);
    if (flags.self_signed || short_circuit) && already_checked {
        return Ok(None);
    }

    if !flags.self_signed {
        let chained = match (subject.encoded_issuer(), issuer.encoded_subject()) {
            (Some(issuer_dn), Some(subject_dn)) => issuer_dn == subject_dn,
            _ => subject.issuer() == issuer.subject(),
        };
        if !chained {
            return Err(constraint_error(
                Some(CertInfo::IssuerName),
                ErrorType::Constraint,
                "issuer name doesn't match the issuing certificate's subject",
            ));
        }
    }
    if level < ComplianceLevel::Standard {
        return Ok(Some(level));
    }

    let partially_checked =
        matches!(subject.max_check_level(), Some(max) if max >= ComplianceLevel::PkixPartial);
    if !partially_checked && subject.cert_type() != CertType::AttributeCertificate {
        check_key_usage(subject, None, KeyUsageCheck::General, level)?;
    }
    if !flags.self_signed {
        check_key_usage(issuer, Some(KU_KEY_CERT_SIGN), KeyUsageCheck::Ca, level)
            .map_err(as_issuer_constraint)?;
    }

    if flags.imported {
        let unknown_critical = subject
            .attributes()
            .blobs()
            .iter()
            .any(|blob| blob.critical && !blob.flags.ignored);
        if unknown_critical {
            return Err(constraint_error(
                None,
                ErrorType::Constraint,
                "unrecognised critical extension",
            ));
        }
    }
    if level < ComplianceLevel::PkixPartial {
        return Ok(Some(level));
    }

    check_ca_only_attributes(subject, ErrorType::Constraint)?;
    if !flags.self_signed {
        check_ca_only_attributes(issuer, ErrorType::IssuerConstraint)?;
    }
    if !short_circuit {
        check_path_length(subject, issuer)?;
    }

    let attributes = subject.attributes();
    if attributes.find_first_field_of(CertInfo::ExtKeyAnyKeyUsage).is_some()
        && attributes.is_critical(CertInfo::ExtKeyUsage)
    {
        return Err(constraint_error(
            Some(CertInfo::ExtKeyAnyKeyUsage),
            ErrorType::Constraint,
            "anyExtendedKeyUsage in a critical extKeyUsage",
        ));
    }
    if level < ComplianceLevel::PkixFull || short_circuit {
        return Ok(Some(level));
    }

    if !flags.self_signed {
        // Excluded subtrees take precedence
        names::check_name_constraints(subject, issuer, true)?;
        names::check_name_constraints(subject, issuer, false)?;
    }
    check_policies(subject, issuer)?;

    Ok(Some(level))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::AttributeValue;
    use crate::certificate::name::{Name, CN};
    use crate::certificate::Validity;
    use crate::error::ErrorKind;

    fn name(cn: &str) -> Name {
        let mut name = Name::new();
        name.add_component(CN, cn).unwrap();
        name
    }

    fn ca(cn: &str) -> CertObject {
        let mut ca = CertObject::new(CertType::Certificate)
            .unwrap()
            .with_subject(name(cn))
            .self_signed();
        ca.add_attribute(
            CertInfo::KeyUsage,
            None,
            AttributeValue::Integer(KU_KEY_CERT_SIGN | KU_CRL_SIGN),
        )
        .unwrap();
        ca.add_attribute(CertInfo::Ca, None, AttributeValue::Boolean(true))
            .unwrap();
        ca
    }

    fn end_entity(issuer: &str) -> CertObject {
        CertObject::new(CertType::Certificate)
            .unwrap()
            .with_subject(name("leaf"))
            .with_issuer(name(issuer))
    }

    fn options() -> CheckOptions {
        CheckOptions::new().skip_time_validation()
    }

    #[test]
    fn test_self_signed_ca() {
        let ca = ca("root");
        let level = check_cert(&ca, None, &options(), false).unwrap();
        assert_eq!(level, Some(ComplianceLevel::PkixFull));
    }

    #[test]
    fn test_issuer_chaining() {
        let ca = ca("root");
        check_cert(&end_entity("root"), Some(&ca), &options(), false).unwrap();

        let err = check_cert(&end_entity("other"), Some(&ca), &options(), false).unwrap_err();
        assert_eq!(err.locus(), Some(CertInfo::IssuerName));
        assert_eq!(err.error_type(), ErrorType::Constraint);

        let err = check_cert(&end_entity("root"), None, &options(), false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentValue);
    }

    #[test]
    fn test_issuer_must_be_ca() {
        let mut issuer = CertObject::new(CertType::Certificate)
            .unwrap()
            .with_subject(name("root"))
            .self_signed();
        issuer
            .add_attribute(
                CertInfo::KeyUsage,
                None,
                AttributeValue::Integer(keyusage::KU_DIGITAL_SIGNATURE),
            )
            .unwrap();
        let err = check_cert(&end_entity("root"), Some(&issuer), &options(), false).unwrap_err();
        assert_eq!(err.locus(), Some(CertInfo::Ca));
        assert_eq!(err.error_type(), ErrorType::IssuerConstraint);
    }

    #[test]
    fn test_distrusted_issuer() {
        let ca = ca("root").with_trusted_usage(keyusage::KU_DIGITAL_SIGNATURE);
        let err = check_cert(&end_entity("root"), Some(&ca), &options(), false).unwrap_err();
        assert_eq!(err.locus(), Some(CertInfo::TrustedUsage));
        assert_eq!(err.error_type(), ErrorType::IssuerConstraint);
    }

    #[test]
    fn test_validity() {
        let ca = ca("root");
        let leaf = end_entity("root").with_validity(Validity::new(200, 100));
        let err = check_cert(&leaf, Some(&ca), &options(), false).unwrap_err();
        assert_eq!(err.locus(), Some(CertInfo::ValidFrom));

        let leaf = end_entity("root").with_validity(Validity::new(100, 200));
        let opts = CheckOptions::new().with_validation_time(300);
        let err = check_cert(&leaf, Some(&ca), &opts, false).unwrap_err();
        assert_eq!(err.locus(), Some(CertInfo::ValidTo));

        // Not yet valid is only an error for loaded certificates
        let opts = CheckOptions::new().with_validation_time(50);
        check_cert(&leaf, Some(&ca), &opts, false).unwrap();
    }

    #[test]
    fn test_ca_only_attributes() {
        let ca = ca("root");
        let mut leaf = end_entity("root");
        leaf.add_attribute(CertInfo::PathLenConstraint, None, AttributeValue::Integer(1))
            .unwrap();
        let err = check_cert(&leaf, Some(&ca), &options(), false).unwrap_err();
        assert_eq!(err.locus(), Some(CertInfo::Ca));
        assert_eq!(err.error_type(), ErrorType::Constraint);
    }

    #[test]
    fn test_path_length() {
        let mut root = ca("root");
        root.add_attribute(CertInfo::PathLenConstraint, None, AttributeValue::Integer(0))
            .unwrap();

        let mut sub_ca = end_entity("root");
        sub_ca
            .add_attribute(
                CertInfo::KeyUsage,
                None,
                AttributeValue::Integer(KU_KEY_CERT_SIGN),
            )
            .unwrap();
        sub_ca
            .add_attribute(CertInfo::Ca, None, AttributeValue::Boolean(true))
            .unwrap();
        let err = check_cert(&sub_ca, Some(&root), &options(), false).unwrap_err();
        assert_eq!(err.locus(), Some(CertInfo::PathLenConstraint));
        assert_eq!(err.error_type(), ErrorType::IssuerConstraint);

        // Chain-level checks are skipped when short-circuiting
        check_cert(&sub_ca, Some(&root), &options(), true).unwrap();
        check_cert(&end_entity("root"), Some(&root), &options(), false).unwrap();
    }

    #[test]
    fn test_delta_crl() {
        let ca = ca("root");
        let mut crl = CertObject::new(CertType::Crl)
            .unwrap()
            .with_issuer(name("root"));
        crl.add_attribute(CertInfo::CrlNumber, None, AttributeValue::Integer(5))
            .unwrap();
        crl.add_attribute(CertInfo::DeltaCrlIndicator, None, AttributeValue::Integer(5))
            .unwrap();
        let err = check_cert(&crl, Some(&ca), &options(), false).unwrap_err();
        assert_eq!(err.locus(), Some(CertInfo::DeltaCrlIndicator));

        crl.delete_attribute(CertInfo::DeltaCrlIndicator).unwrap();
        crl.add_attribute(CertInfo::DeltaCrlIndicator, None, AttributeValue::Integer(4))
            .unwrap();
        assert_eq!(check_cert(&crl, Some(&ca), &options(), false).unwrap(), None);
    }

    #[test]
    fn test_types_without_checks() {
        let request = CertObject::new(CertType::CertRequest).unwrap();
        assert_eq!(check_cert(&request, None, &options(), false).unwrap(), None);

        let cms = CertObject::new(CertType::CmsAttributes).unwrap();
        let err = check_cert(&cms, None, &options(), false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentValue);
    }
}
