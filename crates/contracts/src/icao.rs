//! IcaoAddress - 24-bit aircraft address
//!
//! Stored inline as six upper-case ASCII hex digits, so it is `Copy`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Number of hex digits in an ICAO 24-bit address.
pub const ICAO_ADDRESS_LEN: usize = 6;

/// ICAO 24-bit aircraft address, the identity key of every record.
///
/// Always normalised to upper case, so `4ca123` and `4CA123` are the same key.
///
/// # Examples
/// ```
/// use contracts::IcaoAddress;
///
/// let addr: IcaoAddress = "4ca123".parse().unwrap();
/// assert_eq!(addr.as_str(), "4CA123");
/// assert!("4CA12".parse::<IcaoAddress>().is_err());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IcaoAddress([u8; ICAO_ADDRESS_LEN]);

/// Error returned for a malformed address
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid ICAO address '{0}': expected {ICAO_ADDRESS_LEN} hex digits")]
pub struct InvalidIcaoAddress(pub String);

impl IcaoAddress {
    /// Parse and normalise an address.
    pub fn parse(s: &str) -> Result<Self, InvalidIcaoAddress> {
        let bytes = s.as_bytes();
        if bytes.len() != ICAO_ADDRESS_LEN || !bytes.iter().all(u8::is_ascii_hexdigit) {
            return Err(InvalidIcaoAddress(s.to_string()));
        }

        let mut digits = [0u8; ICAO_ADDRESS_LEN];
        for (dst, src) in digits.iter_mut().zip(bytes) {
            *dst = src.to_ascii_uppercase();
        }
        Ok(Self(digits))
    }

    /// Get the address as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        // Only ASCII hex digits are ever stored.
        std::str::from_utf8(&self.0).unwrap_or_default()
    }

    /// Numeric value of the address.
    pub fn to_u32(&self) -> u32 {
        u32::from_str_radix(self.as_str(), 16).unwrap_or_default()
    }
}

impl FromStr for IcaoAddress {
    type Err = InvalidIcaoAddress;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for IcaoAddress {
    #[inline]
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for IcaoAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for IcaoAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IcaoAddress({})", self.as_str())
    }
}

impl PartialEq<str> for IcaoAddress {
    #[inline]
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for IcaoAddress {
    #[inline]
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl Serialize for IcaoAddress {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for IcaoAddress {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
