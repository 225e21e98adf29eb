// Copyright (c) 2026 Intel Corporation
//
// SPDX-License-Identifier: Apache-2.0 or MIT

//! Key usage checks.
//!
//! [`check_key_usage`] answers two questions. With [`KeyUsageCheck::Usage`]
//! or [`KeyUsageCheck::Ca`] it checks that a key may be used for one
//! purpose, whatever else its extensions say. With
//! [`KeyUsageCheck::General`] it also checks that keyUsage,
//! basicConstraints, extKeyUsage and the key algorithm agree with each
//! other (RFC 5280 §4.2.1.3, §4.2.1.9, §4.2.1.12, RFC 3279).

extern crate alloc;

use alloc::vec::Vec;

use crate::attr::CertInfo;
use crate::certificate::{CertObject, CertType, KeyAlgorithm};
use crate::config::ComplianceLevel;
use crate::error::{Error, ErrorType, Result};

// ============================================================================
// keyUsage bits
// ============================================================================

pub const KU_DIGITAL_SIGNATURE: i64 = 0x001;
pub const KU_NON_REPUDIATION: i64 = 0x002;
pub const KU_KEY_ENCIPHERMENT: i64 = 0x004;
pub const KU_DATA_ENCIPHERMENT: i64 = 0x008;
pub const KU_KEY_AGREEMENT: i64 = 0x010;
pub const KU_KEY_CERT_SIGN: i64 = 0x020;
pub const KU_CRL_SIGN: i64 = 0x040;
pub const KU_ENCIPHER_ONLY: i64 = 0x080;
pub const KU_DECIPHER_ONLY: i64 = 0x100;

const USAGE_SIGN_MASK: i64 =
    KU_DIGITAL_SIGNATURE | KU_NON_REPUDIATION | KU_KEY_CERT_SIGN | KU_CRL_SIGN;
const USAGE_CRYPT_MASK: i64 = KU_KEY_ENCIPHERMENT | KU_DATA_ENCIPHERMENT;
const USAGE_KEY_AGREEMENT_MASK: i64 = KU_KEY_AGREEMENT | KU_ENCIPHER_ONLY | KU_DECIPHER_ONLY;
const USAGE_CA_MASK: i64 = KU_KEY_CERT_SIGN | KU_CRL_SIGN;

/// Usages that never come from an extended key usage
const USAGE_NONRELEVANT: i64 = KU_NON_REPUDIATION | KU_KEY_CERT_SIGN | KU_CRL_SIGN;

/// keyUsage bits implied by each extended key usage.
const EXT_KEY_USAGES: [(CertInfo, i64); 6] = [
    (
        CertInfo::ExtKeyServerAuth,
        KU_DIGITAL_SIGNATURE | KU_KEY_ENCIPHERMENT | KU_KEY_AGREEMENT,
    ),
    (CertInfo::ExtKeyClientAuth, KU_DIGITAL_SIGNATURE),
    (CertInfo::ExtKeyCodeSigning, KU_DIGITAL_SIGNATURE),
    (
        CertInfo::ExtKeyEmailProtection,
        KU_DIGITAL_SIGNATURE | KU_NON_REPUDIATION | KU_KEY_ENCIPHERMENT,
    ),
    (
        CertInfo::ExtKeyTimeStamping,
        KU_DIGITAL_SIGNATURE | KU_NON_REPUDIATION,
    ),
    (CertInfo::ExtKeyOcspSigning, KU_DIGITAL_SIGNATURE),
];

/// What [`check_key_usage`] checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyUsageCheck {
    /// The key can be used for the requested usage
    Usage,
    /// The certificate is a CA allowed the requested CA usage
    Ca,
    /// The usage extensions are consistent with each other
    General,
}

fn algorithm_mask(algorithm: KeyAlgorithm) -> i64 {
    let mut mask = 0;
    if algorithm.can_sign() {
        mask |= USAGE_SIGN_MASK;
    }
    if algorithm.can_encrypt() {
        mask |= USAGE_CRYPT_MASK;
    }
    if algorithm.can_agree() {
        mask |= USAGE_KEY_AGREEMENT_MASK;
    }
    mask
}

/// Usage of a key whose certificate carries no keyUsage: anything the
/// algorithm can do apart from the CA usages.
fn implicit_usage(algorithm: KeyAlgorithm) -> i64 {
    let mut usage = 0;
    if algorithm.can_encrypt() {
        usage |= KU_KEY_ENCIPHERMENT;
    }
    if algorithm.can_sign() {
        usage |= KU_DIGITAL_SIGNATURE | KU_NON_REPUDIATION;
    }
    if algorithm.can_agree() {
        usage |= KU_KEY_AGREEMENT;
    }
    usage
}

/// keyUsage implied by each extended key usage present, limited to what the
/// key algorithm can do.
fn ext_key_usages(cert: &CertObject) -> Result<Vec<(CertInfo, i64)>> {
    let mask = algorithm_mask(cert.key_algorithm());
    let mut usages = Vec::new();
    for (field, usage) in EXT_KEY_USAGES {
        if cert.attributes().find_first_field_of(field).is_none() {
            continue;
        }
        if usage & mask == 0 {
            log::error!(
                "check_key_usage: {:?} is not possible with a {:?} key",
                field,
                cert.key_algorithm()
            );
            return Err(Error::invalid(Some(field), ErrorType::Constraint));
        }
        usages.push((field, usage & mask));
    }
    Ok(usages)
}

/// True if both keyUsage and every extended usage present are marked
/// critical in the encoded certificate.
fn usages_critical(cert: &CertObject) -> bool {
    let list = cert.attributes();
    let ku_critical = list
        .attribute_entries(CertInfo::KeyUsage)
        .iter()
        .any(|e| e.flags.critical);
    ku_critical
        && list
            .attribute_entries(CertInfo::ExtKeyUsage)
            .iter()
            .all(|e| e.flags.critical)
}

fn usage_error(locus: CertInfo, error_type: ErrorType, msg: &str) -> Error {
    log::error!("check_key_usage: {}", msg);
    Error::invalid(Some(locus), error_type)
}

/// Check that `cert` may be used for `usage` (a set of `KU_*` bits), and
/// for [`KeyUsageCheck::General`] that its usage extensions are
/// consistent.
///
/// Below the Standard level missing CA information is synthesised from
/// the other half (keyUsage from the cA flag or the reverse) so that
/// certificates accepted by older software still pass.
pub fn check_key_usage(
    cert: &CertObject,
    usage: Option<i64>,
    check_type: KeyUsageCheck,
    level: ComplianceLevel,
) -> Result<()> {
    let trusted = match cert.cert_type() {
        CertType::Certificate => cert.trusted_usage(),
        _ => None,
    };

    // Explicit distrust applies whatever the level
    if let (Some(usage), Some(trusted)) = (usage, trusted) {
        if trusted & usage == 0 {
            return Err(usage_error(
                CertInfo::TrustedUsage,
                ErrorType::IssuerConstraint,
                "certificate isn't trusted for the requested usage",
            ));
        }
    }
    if level < ComplianceLevel::Reduced {
        return Ok(());
    }

    // Phase 1: collect the usage information, fixing it up at low levels
    let algorithm = cert.key_algorithm();
    let mut is_ca = cert.is_ca();
    let ext_usages = if level >= ComplianceLevel::PkixPartial {
        ext_key_usages(cert)?
    } else {
        Vec::new()
    };
    let raw_ext_usage = ext_usages.iter().fold(0, |acc, (_, u)| acc | u);
    let raw_key_usage = match cert.key_usage() {
        Some(key_usage) => {
            if level < ComplianceLevel::Standard
                && key_usage & usage.unwrap_or(0) & USAGE_CA_MASK != 0
            {
                is_ca = true;
            }
            key_usage
        }
        None => {
            let mut key_usage = 0;
            if level < ComplianceLevel::PkixPartial && is_ca {
                key_usage = USAGE_CA_MASK;
            }
            key_usage | implicit_usage(algorithm)
        }
    };
    let ca_usage = raw_key_usage & USAGE_CA_MASK;
    let (key_usage, ext_usage) = match trusted {
        Some(trusted) => (raw_key_usage & trusted, raw_ext_usage & trusted),
        None => (raw_key_usage, raw_ext_usage),
    };

    // Phase 2: strict usability
    if check_type == KeyUsageCheck::Ca {
        if !is_ca {
            return Err(usage_error(
                CertInfo::Ca,
                ErrorType::Constraint,
                "certificate isn't a CA",
            ));
        }
        if ca_usage & usage.unwrap_or(0) == 0 {
            return Err(usage_error(
                CertInfo::KeyUsage,
                ErrorType::Constraint,
                "CA certificate lacks the requested CA usage",
            ));
        }
    }
    if let (Some(usage), Some(_)) = (usage, trusted) {
        if usage & key_usage == 0 {
            return Err(usage_error(
                CertInfo::TrustedUsage,
                ErrorType::Constraint,
                "requested usage is outside the trusted usage",
            ));
        }
    }
    if level < ComplianceLevel::Standard || check_type != KeyUsageCheck::General {
        return Ok(());
    }

    // Phase 3: consistency
    if is_ca {
        if ca_usage | ext_usage == 0 {
            return Err(usage_error(
                CertInfo::KeyUsage,
                ErrorType::Constraint,
                "CA certificate has no CA key usage",
            ));
        }
    } else if (ca_usage | ext_usage) & USAGE_CA_MASK != 0 {
        return Err(usage_error(
            CertInfo::Ca,
            ErrorType::Constraint,
            "non-CA certificate has a CA key usage",
        ));
    }

    if let Some(usage) = usage {
        let usable = if level >= ComplianceLevel::PkixPartial
            && usage & (KU_ENCIPHER_ONLY | KU_DECIPHER_ONLY) != 0
        {
            let excluded = if usage & KU_ENCIPHER_ONLY != 0 {
                KU_DECIPHER_ONLY
            } else {
                KU_ENCIPHER_ONLY
            };
            key_usage & usage != 0 && key_usage & excluded == 0
        } else {
            key_usage & usage != 0
        };
        if !usable {
            let locus = if raw_key_usage & usage != 0 {
                CertInfo::TrustedUsage
            } else {
                CertInfo::KeyUsage
            };
            return Err(usage_error(
                locus,
                ErrorType::Constraint,
                "requested usage isn't permitted",
            ));
        }
    }

    // From here on the untrimmed values are checked
    let key_usage = raw_key_usage;
    if key_usage & KU_ENCIPHER_ONLY != 0 && key_usage & KU_DECIPHER_ONLY != 0 {
        return Err(usage_error(
            CertInfo::KeyUsage,
            ErrorType::AttrValue,
            "encipherOnly and decipherOnly are both set",
        ));
    }
    if key_usage & !algorithm_mask(algorithm) != 0 {
        return Err(usage_error(
            CertInfo::KeyUsage,
            ErrorType::AttrValue,
            "keyUsage isn't possible with the key algorithm",
        ));
    }

    let key_usage = key_usage & !USAGE_NONRELEVANT;
    let ext_usage = raw_ext_usage & !USAGE_NONRELEVANT;
    if ext_usage == 0 || level < ComplianceLevel::PkixPartial {
        return Ok(());
    }
    if is_ca && key_usage & ext_usage & USAGE_CRYPT_MASK != 0 {
        return Err(usage_error(
            CertInfo::KeyUsage,
            ErrorType::Constraint,
            "CA certificate has an encryption usage",
        ));
    }

    // Imported certificates are held to this only when both are critical
    if cert.flags().imported && !usages_critical(cert) {
        return Ok(());
    }
    for (field, ext) in &ext_usages {
        let ext = ext & !USAGE_NONRELEVANT;
        if ext != 0 && key_usage & ext == 0 {
            log::error!("check_key_usage: keyUsage contradicts {:?}", field);
            return Err(Error::invalid(
                Some(CertInfo::KeyUsage),
                ErrorType::Constraint,
            ));
        }
    }
    if key_usage & (KU_ENCIPHER_ONLY | KU_DECIPHER_ONLY) != 0 && key_usage & KU_KEY_AGREEMENT == 0
    {
        return Err(usage_error(
            CertInfo::KeyUsage,
            ErrorType::AttrValue,
            "encipherOnly/decipherOnly without keyAgreement",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::AttributeValue;
    use crate::error::ErrorKind;

    fn cert_with(key_usage: Option<i64>, ca: bool, algorithm: KeyAlgorithm) -> CertObject {
        let mut cert = CertObject::new(CertType::Certificate)
            .unwrap()
            .with_key_algorithm(algorithm);
        if let Some(key_usage) = key_usage {
            cert.add_attribute(
                CertInfo::KeyUsage,
                None,
                AttributeValue::Integer(key_usage),
            )
            .unwrap();
        }
        if ca {
            cert.add_attribute(CertInfo::Ca, None, AttributeValue::Boolean(true))
                .unwrap();
        }
        cert
    }

    fn assert_invalid(result: Result<()>, locus: CertInfo, error_type: ErrorType) {
        let err = result.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invalid);
        assert_eq!(err.locus(), Some(locus));
        assert_eq!(err.error_type(), error_type);
    }

    #[test]
    fn test_ca_usage() {
        let level = ComplianceLevel::Standard;
        let ca = cert_with(Some(KU_KEY_CERT_SIGN | KU_CRL_SIGN), true, KeyAlgorithm::Rsa);
        check_key_usage(&ca, Some(KU_KEY_CERT_SIGN), KeyUsageCheck::Ca, level).unwrap();

        let not_ca = cert_with(Some(KU_KEY_CERT_SIGN), false, KeyAlgorithm::Rsa);
        assert_invalid(
            check_key_usage(&not_ca, Some(KU_KEY_CERT_SIGN), KeyUsageCheck::Ca, level),
            CertInfo::Ca,
            ErrorType::Constraint,
        );

        let wrong_usage = cert_with(Some(KU_DIGITAL_SIGNATURE), true, KeyAlgorithm::Rsa);
        assert_invalid(
            check_key_usage(&wrong_usage, Some(KU_KEY_CERT_SIGN), KeyUsageCheck::Ca, level),
            CertInfo::KeyUsage,
            ErrorType::Constraint,
        );
    }

    #[test]
    fn test_reduced_level_synthesises_ca_flag() {
        let cert = cert_with(Some(KU_KEY_CERT_SIGN), false, KeyAlgorithm::Rsa);
        check_key_usage(
            &cert,
            Some(KU_KEY_CERT_SIGN),
            KeyUsageCheck::Ca,
            ComplianceLevel::Reduced,
        )
        .unwrap();

        let cert = cert_with(None, true, KeyAlgorithm::Rsa);
        check_key_usage(
            &cert,
            Some(KU_CRL_SIGN),
            KeyUsageCheck::Ca,
            ComplianceLevel::Standard,
        )
        .unwrap();
        assert!(check_key_usage(
            &cert,
            Some(KU_CRL_SIGN),
            KeyUsageCheck::Ca,
            ComplianceLevel::PkixPartial,
        )
        .is_err());
    }

    #[test]
    fn test_distrust_applies_at_oblivious() {
        let cert = cert_with(Some(KU_KEY_CERT_SIGN), true, KeyAlgorithm::Rsa).with_trusted_usage(0);
        assert_invalid(
            check_key_usage(
                &cert,
                Some(KU_KEY_CERT_SIGN),
                KeyUsageCheck::Ca,
                ComplianceLevel::Oblivious,
            ),
            CertInfo::TrustedUsage,
            ErrorType::IssuerConstraint,
        );
    }

    #[test]
    fn test_general_consistency() {
        let level = ComplianceLevel::Standard;
        let cert = cert_with(Some(KU_KEY_CERT_SIGN), false, KeyAlgorithm::Rsa);
        assert_invalid(
            check_key_usage(&cert, None, KeyUsageCheck::General, level),
            CertInfo::Ca,
            ErrorType::Constraint,
        );

        let cert = cert_with(
            Some(KU_KEY_AGREEMENT | KU_ENCIPHER_ONLY | KU_DECIPHER_ONLY),
            false,
            KeyAlgorithm::Ecdsa,
        );
        assert_invalid(
            check_key_usage(&cert, None, KeyUsageCheck::General, level),
            CertInfo::KeyUsage,
            ErrorType::AttrValue,
        );

        let cert = cert_with(Some(KU_KEY_ENCIPHERMENT), false, KeyAlgorithm::Dsa);
        assert_invalid(
            check_key_usage(&cert, None, KeyUsageCheck::General, level),
            CertInfo::KeyUsage,
            ErrorType::AttrValue,
        );

        let cert = cert_with(None, false, KeyAlgorithm::Ed25519);
        check_key_usage(&cert, None, KeyUsageCheck::General, level).unwrap();
    }

    #[test]
    fn test_ext_key_usage_mapping() {
        let mut cert = cert_with(Some(KU_KEY_ENCIPHERMENT), false, KeyAlgorithm::Rsa);
        cert.add_attribute(CertInfo::ExtKeyCodeSigning, None, AttributeValue::Unused)
            .unwrap();
        check_key_usage(&cert, None, KeyUsageCheck::General, ComplianceLevel::Standard)
            .unwrap();
        assert_invalid(
            check_key_usage(
                &cert,
                None,
                KeyUsageCheck::General,
                ComplianceLevel::PkixPartial,
            ),
            CertInfo::KeyUsage,
            ErrorType::Constraint,
        );

        let mut cert = cert_with(Some(KU_KEY_AGREEMENT), false, KeyAlgorithm::Dh);
        cert.add_attribute(CertInfo::ExtKeyCodeSigning, None, AttributeValue::Unused)
            .unwrap();
        assert_invalid(
            check_key_usage(
                &cert,
                None,
                KeyUsageCheck::General,
                ComplianceLevel::PkixPartial,
            ),
            CertInfo::ExtKeyCodeSigning,
            ErrorType::Constraint,
        );

        let mut cert = cert_with(Some(KU_DIGITAL_SIGNATURE), false, KeyAlgorithm::Rsa);
        cert.add_attribute(CertInfo::ExtKeyServerAuth, None, AttributeValue::Unused)
            .unwrap();
        check_key_usage(&cert, None, KeyUsageCheck::General, ComplianceLevel::PkixFull)
            .unwrap();
    }
}
