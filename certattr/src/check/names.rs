// Copyright (c) 2026 Intel Corporation
//
// SPDX-License-Identifier: Apache-2.0 or MIT

//! nameConstraints enforcement (RFC 5280 §4.2.1.10).

extern crate alloc;

use alloc::vec::Vec;

use crate::attr::{AttributeValue, CertInfo};
use crate::certificate::CertObject;
use crate::error::{Error, ErrorType, Result};

/// GeneralName forms the constraints apply to.
const CONSTRAINED_NAMES: [CertInfo; 4] = [
    CertInfo::DirectoryName,
    CertInfo::Rfc822Name,
    CertInfo::DnsName,
    CertInfo::UniformResourceIdentifier,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchKind {
    Dns,
    Email,
    Uri,
}

/// Host part of a URI: after the scheme, before any path, query or
/// fragment, without userinfo or port.
fn uri_host(uri: &[u8]) -> &[u8] {
    let rest = match uri.windows(3).position(|w| w == b"://") {
        Some(pos) => &uri[pos + 3..],
        None => uri,
    };
    let end = rest
        .iter()
        .position(|&c| c == b'/' || c == b'?' || c == b'#')
        .unwrap_or(rest.len());
    let authority = &rest[..end];
    let host = match authority.iter().rposition(|&c| c == b'@') {
        Some(pos) => &authority[pos + 1..],
        None => authority,
    };
    match host.iter().rposition(|&c| c == b':') {
        Some(pos) => &host[..pos],
        None => host,
    }
}

/// Check whether `constrained` falls under `constraint`.
///
/// A constraint starting with '.' matches any name ending with it. An
/// email constraint without the dot matches a mailbox at that host, or
/// the full mailbox. A DNS constraint matches the name and its
/// subdomains. A URI constraint matches the host exactly.
fn wildcard_match(constraint: &[u8], constrained: &[u8], kind: MatchKind) -> bool {
    let constrained = match kind {
        MatchKind::Uri => uri_host(constrained),
        _ => constrained,
    };
    if constraint.is_empty() || constraint.len() > constrained.len() {
        return false;
    }
    let start = constrained.len() - constraint.len();
    let is_wildcard = constraint[0] == b'.';

    if !is_wildcard {
        let anchored = match kind {
            MatchKind::Email => {
                start == 0 || constrained[start - 1] == b'@'
            }
            MatchKind::Dns => start == 0 || constrained[start - 1] == b'.',
            MatchKind::Uri => start == 0,
        };
        if !anchored {
            return false;
        }
    }
    constrained[start..].eq_ignore_ascii_case(constraint)
}

fn general_name_matches(sub: CertInfo, constraint: &AttributeValue, value: &AttributeValue) -> bool {
    if sub == CertInfo::DirectoryName {
        return match (constraint.as_name(), value.as_name()) {
            (Some(constraint), Some(name)) => name.starts_with(constraint),
            _ => false,
        };
    }
    let kind = match sub {
        CertInfo::Rfc822Name => MatchKind::Email,
        CertInfo::UniformResourceIdentifier => MatchKind::Uri,
        _ => MatchKind::Dns,
    };
    match (constraint.as_bytes(), value.as_bytes()) {
        (Some(constraint), Some(value)) => wildcard_match(constraint, value, kind),
        _ => false,
    }
}

/// Apply the issuer's permitted (`excluded == false`) or excluded subtrees
/// to the subject's names.
pub(crate) fn check_name_constraints(
    subject: &CertObject,
    issuer: &CertObject,
    excluded: bool,
) -> Result<()> {
    let field = if excluded {
        CertInfo::ExcludedSubtrees
    } else {
        CertInfo::PermittedSubtrees
    };
    if subject.flags().path_kludge {
        return Ok(());
    }
    let constraints = issuer.attributes();
    let names = subject.attributes();

    // The subject DN against directoryName subtrees
    let subject_dn = subject.subject();
    if !subject_dn.is_empty() {
        let mut dn_constraints = constraints
            .field_values(field)
            .filter(|e| e.sub_field_id == Some(CertInfo::DirectoryName))
            .peekable();
        if dn_constraints.peek().is_some() {
            let matched = dn_constraints.any(|c| {
                c.value
                    .as_name()
                    .map(|constraint| subject_dn.starts_with(constraint))
                    .unwrap_or(false)
            });
            if matched == excluded {
                log::error!(
                    "check_name_constraints: subject DN {} {} the {:?}",
                    subject_dn,
                    if excluded { "falls within" } else { "falls outside" },
                    field
                );
                return Err(Error::invalid(
                    Some(CertInfo::SubjectName),
                    ErrorType::Constraint,
                ));
            }
        }
    }

    // subjectAltName entries, one GeneralName form at a time
    for sub in CONSTRAINED_NAMES {
        let mut sub_constraints = constraints
            .field_values(field)
            .filter(|e| e.sub_field_id == Some(sub))
            .peekable();
        if sub_constraints.peek().is_none() {
            continue;
        }
        let sub_constraints: Vec<_> = sub_constraints.collect();
        for name in names
            .field_values(CertInfo::SubjectAltName)
            .filter(|e| e.sub_field_id == Some(sub))
        {
            let matched = sub_constraints
                .iter()
                .any(|c| general_name_matches(sub, &c.value, &name.value));
            if matched == excluded {
                log::error!(
                    "check_name_constraints: {:?} altName violates the {:?}",
                    sub,
                    field
                );
                return Err(Error::invalid(
                    Some(CertInfo::SubjectAltName),
                    ErrorType::Constraint,
                ));
            }
        }
    }

    Ok(())
}
