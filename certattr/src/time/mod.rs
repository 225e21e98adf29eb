// Copyright (c) 2026 Intel Corporation
//
// SPDX-License-Identifier: Apache-2.0 or MIT

//! Time values carried by attributes and certificate validity periods.
//!
//! Attribute fields store times as seconds since the Unix epoch and choose
//! the wire form (UTCTime or GeneralizedTime) from the table row. This module
//! converts between the two and provides the comparison helpers used by the
//! constraint checker.
//!
//! # UTCTime Y2K Conversion
//!
//! UTCTime values are interpreted according to RFC 5280:
//! - Years 50-99 are interpreted as 1950-1999
//! - Years 00-49 are interpreted as 2000-2049

use core::cmp::Ordering;
use core::time::Duration;
use der::{
    asn1::{GeneralizedTime, UtcTime},
    Decode, DecodeValue, Encode, EncodeValue, Header, Length, Reader, Result, Tag, Writer,
};

/// A timestamp that can be either UTCTime or GeneralizedTime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Time {
    /// UTCTime format (YYMMDDHHMMSSZ)
    UtcTime(UtcTime),
    /// GeneralizedTime format (YYYYMMDDHHMMSSZ)
    GeneralizedTime(GeneralizedTime),
}

impl Time {
    /// Build a UTCTime from seconds since the epoch.
    pub fn utc_from_unix_secs(secs: u64) -> Result<Self> {
        Ok(Time::UtcTime(UtcTime::from_unix_duration(
            Duration::from_secs(secs),
        )?))
    }

    /// Build a GeneralizedTime from seconds since the epoch.
    pub fn generalized_from_unix_secs(secs: u64) -> Result<Self> {
        Ok(Time::GeneralizedTime(GeneralizedTime::from_unix_duration(
            Duration::from_secs(secs),
        )?))
    }

    /// Returns the DateTime representation.
    pub fn to_date_time(&self) -> der::DateTime {
        match self {
            Time::UtcTime(utc) => utc.to_date_time(),
            Time::GeneralizedTime(gen) => gen.to_date_time(),
        }
    }

    /// Seconds since the Unix epoch.
    pub fn unix_secs(&self) -> u64 {
        self.to_date_time().unix_duration().as_secs()
    }

    /// Checks if this time is before another time.
    pub fn is_before(&self, other: &Time) -> bool {
        self.unix_secs() < other.unix_secs()
    }

    /// Checks if this time is after another time.
    pub fn is_after(&self, other: &Time) -> bool {
        self.unix_secs() > other.unix_secs()
    }
}

impl PartialOrd for Time {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Time {
    fn cmp(&self, other: &Self) -> Ordering {
        self.unix_secs().cmp(&other.unix_secs())
    }
}

impl<'a> DecodeValue<'a> for Time {
    fn decode_value<R: Reader<'a>>(reader: &mut R, header: Header) -> Result<Self> {
        match header.tag {
            Tag::UtcTime => Ok(Time::UtcTime(UtcTime::decode_value(reader, header)?)),
            Tag::GeneralizedTime => Ok(Time::GeneralizedTime(GeneralizedTime::decode_value(
                reader, header,
            )?)),
            tag => Err(der::Error::from(der::ErrorKind::TagUnexpected {
                expected: Some(Tag::UtcTime),
                actual: tag,
            })),
        }
    }
}

impl EncodeValue for Time {
    fn value_len(&self) -> Result<Length> {
        match self {
            Time::UtcTime(utc) => utc.value_len(),
            Time::GeneralizedTime(gen) => gen.value_len(),
        }
    }

    fn encode_value(&self, writer: &mut impl Writer) -> Result<()> {
        match self {
            Time::UtcTime(utc) => utc.encode_value(writer),
            Time::GeneralizedTime(gen) => gen.encode_value(writer),
        }
    }
}

impl Encode for Time {
    fn encoded_len(&self) -> Result<Length> {
        match self {
            Time::UtcTime(utc) => utc.encoded_len(),
            Time::GeneralizedTime(gen) => gen.encoded_len(),
        }
    }

    fn encode(&self, writer: &mut impl Writer) -> Result<()> {
        match self {
            Time::UtcTime(utc) => utc.encode(writer),
            Time::GeneralizedTime(gen) => gen.encode(writer),
        }
    }
}

impl<'a> Decode<'a> for Time {
    fn decode<R: Reader<'a>>(reader: &mut R) -> Result<Self> {
        let header = Header::decode(reader)?;
        Self::decode_value(reader, header)
    }
}

/// Gets the current time in seconds since the epoch.
pub fn current_time() -> Result<u64> {
    #[cfg(feature = "std")]
    {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_err(|_| der::Error::from(der::ErrorKind::DateTime))?;
        Ok(now.as_secs())
    }

    #[cfg(not(feature = "std"))]
    {
        Err(der::Error::from(der::ErrorKind::DateTime))
    }
}
