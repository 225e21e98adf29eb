// Copyright (c) 2026 Intel Corporation
//
// SPDX-License-Identifier: Apache-2.0 or MIT

//! certificatePolicies and policyMappings checks.

use const_oid::ObjectIdentifier;

use crate::attr::{oids, AttributeList, CertInfo};
use crate::certificate::CertObject;
use crate::error::{Error, ErrorType, Result};

/// How strictly the subject's policies are matched against the issuer's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyType {
    /// Any policy, or none at all
    None,
    /// A policy other than anyPolicy, if present
    NoneSpecific,
    /// The subject must have a policy matching the issuer's
    Subject,
    /// As `Subject`, with anyPolicy not accepted for the subject
    SubjectSpecific,
    /// As `Subject`, with anyPolicy accepted from neither side
    BothSpecific,
}

#[derive(Debug, Default)]
struct PolicySummary {
    has_policy: bool,
    has_any_policy: bool,
}

fn policies(list: &AttributeList) -> impl Iterator<Item = &ObjectIdentifier> {
    list.field_values(CertInfo::CertPolicyId)
        .filter_map(|e| e.value.as_oid())
}

/// Summarise a policy list, or `None` if it can't satisfy the requirement.
fn summarise(list: &AttributeList, inhibit_any_policy: bool) -> Option<PolicySummary> {
    let mut summary = PolicySummary::default();
    for oid in policies(list) {
        if *oid == oids::ANY_POLICY {
            summary.has_any_policy = true;
        } else {
            summary.has_policy = true;
        }
    }
    if !summary.has_policy && !summary.has_any_policy {
        return None;
    }
    if inhibit_any_policy {
        if !summary.has_policy {
            return None;
        }
        summary.has_any_policy = false;
    }
    Some(summary)
}

fn policy_error(error_type: ErrorType, locus: CertInfo, msg: &str) -> Error {
    log::error!("check_policy_constraints: {}", msg);
    Error::invalid(Some(locus), error_type)
}

/// Check the subject's certificatePolicies against the issuer's.
pub(crate) fn check_policy_constraints(
    subject: &CertObject,
    issuer: &CertObject,
    policy_type: PolicyType,
) -> Result<()> {
    let issuer_attributes = issuer.attributes();
    let subject_attributes = subject.attributes();

    // anyPolicy can't be mapped to or from
    let mapped_any = [CertInfo::IssuerDomainPolicy, CertInfo::SubjectDomainPolicy]
        .iter()
        .flat_map(|field| issuer_attributes.field_values(*field))
        .any(|e| e.value.as_oid() == Some(&oids::ANY_POLICY));
    if mapped_any {
        return Err(policy_error(
            ErrorType::IssuerConstraint,
            CertInfo::PolicyMappings,
            "policy mapping involves anyPolicy",
        ));
    }

    let subject_has_policies = policies(subject_attributes).next().is_some();
    if policy_type == PolicyType::None && !subject_has_policies {
        return Ok(());
    }

    let inhibit_subject = matches!(
        policy_type,
        PolicyType::NoneSpecific | PolicyType::SubjectSpecific | PolicyType::BothSpecific
    );
    let subject_summary = summarise(subject_attributes, inhibit_subject).ok_or_else(|| {
        policy_error(
            ErrorType::Constraint,
            CertInfo::CertPolicyId,
            "subject has no acceptable policy",
        )
    })?;

    let issuer_has_policies = policies(issuer_attributes).next().is_some();
    if matches!(policy_type, PolicyType::Subject | PolicyType::SubjectSpecific)
        && !issuer_has_policies
    {
        return Ok(());
    }
    let issuer_summary = summarise(
        issuer_attributes,
        policy_type == PolicyType::BothSpecific,
    )
    .ok_or_else(|| {
        policy_error(
            ErrorType::Constraint,
            CertInfo::CertPolicyId,
            "issuer has no acceptable policy",
        )
    })?;

    if subject_summary.has_any_policy || issuer_summary.has_any_policy {
        return Ok(());
    }
    let matched = policies(issuer_attributes)
        .any(|issuer_policy| policies(subject_attributes).any(|p| p == issuer_policy));
    if !matched {
        return Err(policy_error(
            ErrorType::Constraint,
            CertInfo::CertPolicyId,
            "no subject policy matches an issuer policy",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::AttributeValue;
    use crate::certificate::CertType;

    const POLICY_A: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.4.1.99.1");
    const POLICY_B: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.4.1.99.2");

    fn cert_with_policies(policies: &[ObjectIdentifier]) -> CertObject {
        let mut cert = CertObject::new(CertType::Certificate).unwrap();
        for policy in policies {
            cert.add_attribute(CertInfo::CertPolicyId, None, AttributeValue::Oid(*policy))
                .unwrap();
        }
        cert
    }

    #[test]
    fn test_matching_policies() {
        let issuer = cert_with_policies(&[POLICY_A, POLICY_B]);
        let subject = cert_with_policies(&[POLICY_B]);
        check_policy_constraints(&subject, &issuer, PolicyType::Subject).unwrap();

        let subject = cert_with_policies(&[ObjectIdentifier::new_unwrap("1.3.6.1.4.1.99.3")]);
        let err = check_policy_constraints(&subject, &issuer, PolicyType::Subject).unwrap_err();
        assert_eq!(err.locus(), Some(CertInfo::CertPolicyId));
        assert_eq!(err.error_type(), ErrorType::Constraint);
    }

    #[test]
    fn test_any_policy() {
        let issuer = cert_with_policies(&[POLICY_A]);
        let subject = cert_with_policies(&[oids::ANY_POLICY]);
        check_policy_constraints(&subject, &issuer, PolicyType::Subject).unwrap();
        assert!(
            check_policy_constraints(&subject, &issuer, PolicyType::SubjectSpecific).is_err()
        );

        let issuer = cert_with_policies(&[oids::ANY_POLICY]);
        let subject = cert_with_policies(&[POLICY_B]);
        check_policy_constraints(&subject, &issuer, PolicyType::SubjectSpecific).unwrap();
        assert!(
            check_policy_constraints(&subject, &issuer, PolicyType::BothSpecific).is_err()
        );
    }

    #[test]
    fn test_missing_policies() {
        let issuer = cert_with_policies(&[]);
        let subject = cert_with_policies(&[]);
        check_policy_constraints(&subject, &issuer, PolicyType::None).unwrap();
        assert!(check_policy_constraints(&subject, &issuer, PolicyType::Subject).is_err());

        let subject = cert_with_policies(&[POLICY_A]);
        check_policy_constraints(&subject, &issuer, PolicyType::Subject).unwrap();
    }

    #[test]
    fn test_any_policy_mapping_rejected() {
        let mut issuer = cert_with_policies(&[POLICY_A]);
        issuer
            .add_attribute(
                CertInfo::IssuerDomainPolicy,
                None,
                AttributeValue::Oid(oids::ANY_POLICY),
            )
            .unwrap();
        let subject = cert_with_policies(&[POLICY_A]);
        let err = check_policy_constraints(&subject, &issuer, PolicyType::None).unwrap_err();
        assert_eq!(err.locus(), Some(CertInfo::PolicyMappings));
        assert_eq!(err.error_type(), ErrorType::IssuerConstraint);
    }
}
