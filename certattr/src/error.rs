// Copyright (c) 2026 Intel Corporation
//
// SPDX-License-Identifier: Apache-2.0 or MIT

//! Error types for the attribute engine
//!
//! Every failure carries a structured error kind, and attribute failures also
//! carry the field they refer to (the error locus) and what was wrong with it
//! (the error type). Callers use the locus/type pair to report which
//! extension field broke which rule.

extern crate alloc;

use alloc::string::{String, ToString};
use core::fmt;

use crate::attr::CertInfo;

/// Result type alias for attribute engine operations
pub type Result<T> = core::result::Result<T, Error>;

/// Error type for attribute list, encoding, decoding and constraint checks
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// Errors during DER/ASN.1 parsing
    ParseError(ParseError),

    /// Attribute list, grammar and constraint errors
    AttributeError(AttributeError),

    /// Distinguished name errors
    NameError(NameError),

    /// Internal error (should not occur in normal operation)
    InternalError(String),
}

/// Errors that occur during DER/ASN.1 parsing
#[derive(Debug, Clone)]
pub enum ParseError {
    /// Invalid DER encoding
    InvalidDer(String),

    /// Unexpected end of input
    UnexpectedEof,

    /// Invalid tag encountered
    InvalidTag { expected: u8, found: u8 },

    /// Trailing data after a complete object
    TrailingData(usize),

    /// Error from der crate
    DerError(String),
}

/// Coarse error category, independent of which field failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Field or attribute absent
    NotFound,
    /// Non-multivalued field added twice, or merge target already present
    Duplicate,
    /// Value or constraint check failed
    Invalid,
    /// Size or internal limit exceeded
    Overflow,
    /// Attempt to modify a locked field
    Permission,
    /// Cursor operation before any selection was made
    NotInitialized,
    /// Allocation failure
    OutOfMemory,
    /// Malformed encoded data
    BadData,
    /// Argument incompatible with the requested operation
    ArgumentValue,
}

/// What was wrong with the field named by the error locus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ErrorType {
    #[default]
    None,
    /// Field size out of range
    AttrSize,
    /// Field value out of range or rejected by an extended check
    AttrValue,
    /// Required field absent
    AttrAbsent,
    /// Field present when it shouldn't be
    AttrPresent,
    /// Constraint on the subject violated
    Constraint,
    /// Constraint imposed by the issuer violated
    IssuerConstraint,
}

/// An attribute error with its locus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeError {
    pub kind: ErrorKind,
    pub locus: Option<CertInfo>,
    pub error_type: ErrorType,
}

/// Errors related to distinguished names
#[derive(Debug, Clone)]
pub enum NameError {
    /// Invalid name encoding
    InvalidEncoding(String),

    /// Empty distinguished name
    EmptyName,

    /// Invalid attribute value
    InvalidAttribute(String),

    /// No DN is currently selected
    NoSelection,
}

// ============================================================================
// Error Display Implementation (works in both std and no_std)
// ============================================================================

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ParseError(e) => write!(f, "Parse error: {}", e),
            Error::AttributeError(e) => write!(f, "Attribute error: {}", e),
            Error::NameError(e) => write!(f, "Name error: {}", e),
            Error::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::InvalidDer(msg) => write!(f, "Invalid DER encoding: {}", msg),
            ParseError::UnexpectedEof => write!(f, "Unexpected end of input"),
            ParseError::InvalidTag { expected, found } => write!(
                f,
                "Invalid tag: expected 0x{:02x}, found 0x{:02x}",
                expected, found
            ),
            ParseError::TrailingData(n) => write!(f, "{} bytes of trailing data", n),
            ParseError::DerError(msg) => write!(f, "DER error: {}", msg),
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::NotFound => "not found",
            ErrorKind::Duplicate => "already present",
            ErrorKind::Invalid => "invalid",
            ErrorKind::Overflow => "overflow",
            ErrorKind::Permission => "permission denied",
            ErrorKind::NotInitialized => "not initialised",
            ErrorKind::OutOfMemory => "out of memory",
            ErrorKind::BadData => "bad data",
            ErrorKind::ArgumentValue => "bad argument value",
        };
        f.write_str(s)
    }
}

impl fmt::Display for AttributeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(locus) = self.locus {
            write!(f, " at {:?}", locus)?;
        }
        if self.error_type != ErrorType::None {
            write!(f, " ({:?})", self.error_type)?;
        }
        Ok(())
    }
}

impl fmt::Display for NameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameError::InvalidEncoding(msg) => write!(f, "Invalid name encoding: {}", msg),
            NameError::EmptyName => write!(f, "Empty distinguished name"),
            NameError::InvalidAttribute(attr) => write!(f, "Invalid attribute: {}", attr),
            NameError::NoSelection => write!(f, "No distinguished name selected"),
        }
    }
}

// ============================================================================
// std::error::Error implementation (when std feature is enabled)
// ============================================================================

#[cfg(feature = "std")]
impl std::error::Error for Error {}

// ============================================================================
// Conversions from external crate errors
// ============================================================================

/// Convert from der crate errors
impl From<der::Error> for Error {
    fn from(err: der::Error) -> Self {
        Error::ParseError(ParseError::DerError(err.to_string()))
    }
}

/// Convert from ring's Unspecified error
#[cfg(feature = "ring-backend")]
impl From<ring::error::Unspecified> for Error {
    fn from(_: ring::error::Unspecified) -> Self {
        Error::InternalError("Cryptographic operation failed".to_string())
    }
}

// ============================================================================
// Helper constructors for common error cases
// ============================================================================

impl Error {
    /// Create an attribute error with an explicit locus and type
    pub fn attribute(kind: ErrorKind, locus: Option<CertInfo>, error_type: ErrorType) -> Self {
        Error::AttributeError(AttributeError {
            kind,
            locus,
            error_type,
        })
    }

    pub fn not_found(locus: CertInfo) -> Self {
        Self::attribute(ErrorKind::NotFound, Some(locus), ErrorType::AttrAbsent)
    }

    pub fn duplicate(locus: CertInfo) -> Self {
        Self::attribute(ErrorKind::Duplicate, Some(locus), ErrorType::AttrPresent)
    }

    /// Create an invalid-value error for a field
    pub fn invalid(locus: Option<CertInfo>, error_type: ErrorType) -> Self {
        Self::attribute(ErrorKind::Invalid, locus, error_type)
    }

    pub fn not_initialized(locus: Option<CertInfo>, error_type: ErrorType) -> Self {
        Self::attribute(ErrorKind::NotInitialized, locus, error_type)
    }

    pub fn permission(locus: CertInfo) -> Self {
        Self::attribute(ErrorKind::Permission, Some(locus), ErrorType::None)
    }

    /// Create an overflow error (internal limits or size queries)
    pub fn overflow(locus: Option<CertInfo>) -> Self {
        Self::attribute(ErrorKind::Overflow, locus, ErrorType::None)
    }

    /// Create a contract-violation error for a bad argument
    pub fn arg_value(locus: CertInfo) -> Self {
        Self::attribute(ErrorKind::ArgumentValue, Some(locus), ErrorType::None)
    }

    /// Create a bad-data error for malformed input
    pub fn bad_data<S: Into<String>>(msg: S) -> Self {
        Error::ParseError(ParseError::InvalidDer(msg.into()))
    }

    /// Create an internal error (should be rare)
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Error::InternalError(msg.into())
    }

    /// The coarse error kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ParseError(_) => ErrorKind::BadData,
            Error::AttributeError(e) => e.kind,
            Error::NameError(NameError::NoSelection) => ErrorKind::NotInitialized,
            Error::NameError(NameError::EmptyName) => ErrorKind::NotFound,
            Error::NameError(_) => ErrorKind::Invalid,
            Error::InternalError(_) => ErrorKind::Invalid,
        }
    }

    /// The field the error refers to, if any
    pub fn locus(&self) -> Option<CertInfo> {
        match self {
            Error::AttributeError(e) => e.locus,
            _ => None,
        }
    }

    /// What was wrong with the field named by [`Error::locus`]
    pub fn error_type(&self) -> ErrorType {
        match self {
            Error::AttributeError(e) => e.error_type,
            _ => ErrorType::None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
