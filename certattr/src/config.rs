// Copyright (c) 2026 Intel Corporation
//
// SPDX-License-Identifier: Apache-2.0 or MIT

//! Options shared by the decoder, walker, encoder and constraint checker.

// ============================================================================
// Compliance Level
// ============================================================================

/// How strictly RFC 5280 rules are enforced.
///
/// Each table row carries the lowest level at which it is processed; rows
/// above the configured level are handled as opaque blobs, and constraint
/// checks above it are skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ComplianceLevel {
    /// Only explicit distrust is enforced
    Oblivious,
    /// Minimal checks accepted by most deployed software
    Reduced,
    #[default]
    Standard,
    /// The commonly implemented subset of PKIX
    PkixPartial,
    /// Everything, including name and policy constraints
    PkixFull,
}

// ============================================================================
// Check Options
// ============================================================================

/// Options for attribute processing and certificate checks.
#[derive(Debug, Clone)]
pub struct CheckOptions {
    /// Compliance level gating table rows and checks
    pub compliance_level: ComplianceLevel,

    /// Whether to check the validity period against the current time
    pub check_time: bool,

    /// Fixed time (seconds since the epoch) used instead of the wall clock
    pub validation_time: Option<u64>,

    /// Whether unrecognised (blob) attributes are written and signed
    pub sign_unrecognised_attributes: bool,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            compliance_level: ComplianceLevel::default(),
            check_time: !cfg!(feature = "no-time-check"),
            validation_time: None,
            sign_unrecognised_attributes: true,
        }
    }
}

impl CheckOptions {
    /// Create options at the Standard level with time checks enabled
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the compliance level
    pub fn with_compliance_level(mut self, level: ComplianceLevel) -> Self {
        self.compliance_level = level;
        self
    }

    /// Disable validity period checks (useful for testing)
    pub fn skip_time_validation(mut self) -> Self {
        self.check_time = false;
        self
    }

    /// Validate against a fixed point in time
    pub fn with_validation_time(mut self, secs: u64) -> Self {
        self.validation_time = Some(secs);
        self.check_time = true;
        self
    }

    /// Drop unrecognised attributes when encoding
    pub fn skip_unrecognised_attributes(mut self) -> Self {
        self.sign_unrecognised_attributes = false;
        self
    }

    /// The time validity periods are checked against.
    pub fn current_time(&self) -> crate::Result<u64> {
        match self.validation_time {
            Some(t) => Ok(t),
            None => Ok(crate::time::current_time()?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_order() {
        assert!(ComplianceLevel::Oblivious < ComplianceLevel::Reduced);
        assert!(ComplianceLevel::PkixPartial < ComplianceLevel::PkixFull);
        assert_eq!(ComplianceLevel::default(), ComplianceLevel::Standard);
    }

    #[test]
    fn test_builder() {
        let opts = CheckOptions::new()
            .with_compliance_level(ComplianceLevel::PkixFull)
            .with_validation_time(1000)
            .skip_unrecognised_attributes();
        assert_eq!(opts.compliance_level, ComplianceLevel::PkixFull);
        assert!(opts.check_time);
        assert_eq!(opts.current_time().unwrap(), 1000);
        assert!(!opts.sign_unrecognised_attributes);

        let opts = CheckOptions::new().skip_time_validation();
        assert!(!opts.check_time);
    }
}
