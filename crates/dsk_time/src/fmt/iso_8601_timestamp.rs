// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::{self, Debug, Display, Formatter};
use std::str::FromStr;
use std::time::SystemTime;

use super::utils::from_jiff;
use crate::fmt::utils::to_jiff;
use crate::{Error, Timestamp};

/// Parser and Formater for Iso8601.
///
/// The `ISO 8601` standard is used worldwide in various applications, ranging
/// from software and digital formats to international communication, to ensure
/// consistency across different systems and regions.
///
/// Examples:
/// - `2024-08-06T21:30:00Z` // (UTC)
/// - `2024-08-06T14:30:00-07:00` // (UTC offset)
///
/// The [`Iso8601Timestamp`] format is defined in [ISO 8601](https://en.wikipedia.org/wiki/ISO_8601).
///
/// # UTC and time zones
///
/// While the ISO 8601 can include the UTC offset, resulting [`Timestamp`] is always represented in the
/// UTC time zone with the offset of `Z`.
///
/// # Serialization and deserialization
///
/// The `Iso8601Timestamp` implements the `Serialize` and `Deserialize` traits from the `serde` crate.
/// The timestamp is serialized as a string using ISO 8601 fromat.
///
/// # Leap seconds
///
/// If the ISO 8601 string contains a leap second, the parsing will be successful and the leap seconds trimmed.
///
/// ```
/// use dsk_time::fmt::Iso8601Timestamp;
///
/// let iso  = "1990-12-31T23:59:60Z".parse::<Iso8601Timestamp>()?;
/// assert_eq!(iso.to_string(), "1990-12-31T23:59:59Z");
///
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
///
/// # Examples
///
/// ### Formatting and parsing - UTC
/// ```
/// use dsk_time::Timestamp;
/// use dsk_time::fmt::Iso8601Timestamp;
///
/// let iso  = "2024-08-06T21:30:00Z".parse::<Iso8601Timestamp>()?;
/// assert_eq!(iso.to_string(), "2024-08-06T21:30:00Z");
///
/// let timestamp: Timestamp = iso.into();
/// assert_eq!(Iso8601Timestamp::from(timestamp), iso);
///
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
///
/// ### Formatting and parsing - With UTC offset
///
/// This example demonstrates that the UTC offset is applied to the resulting [`Timestamp`].
/// Notice, that when formatting the absolute time, the UTC offset is not included in the formatted string.
/// ```
/// use dsk_time::Timestamp;
/// use dsk_time::fmt::Iso8601Timestamp;
///
/// let iso  = "2024-08-06T23:30:00+02:00".parse::<Iso8601Timestamp>()?;
/// assert_eq!(iso.to_string(), "2024-08-06T21:30:00Z"); // Notice that UTC offset is applied
///
/// let timestamp: Timestamp = iso.into();
/// assert_eq!(Iso8601Timestamp::from(timestamp), iso);
///
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Iso8601Timestamp(Timestamp);

impl FromStr for Iso8601Timestamp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let timestamp = from_jiff(s.parse::<jiff::Timestamp>().map_err(Error::from_jiff)?)?;
        Ok(Self(timestamp))
    }
}

impl Display for Iso8601Timestamp {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        Display::fmt(&to_jiff(self.0.with_rounded_nanos()), f)
    }
}

impl From<Iso8601Timestamp> for Timestamp {
    fn from(value: Iso8601Timestamp) -> Self {
        value.0
    }
}

impl From<Timestamp> for Iso8601Timestamp {
    fn from(value: Timestamp) -> Self {
        Self(value)
    }
}

impl From<Iso8601Timestamp> for SystemTime {
    fn from(value: Iso8601Timestamp) -> Self {
        Timestamp::from(value).to_system_time()
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Iso8601Timestamp {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Iso8601Timestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        String::deserialize(deserializer)?
            .parse::<Self>()
            .map_err(serde::de::Error::custom)
    }
}
