//! Human-readable byte sizes for config values and log fields

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const KIB: u64 = 1024;
const MIB: u64 = KIB * 1024;
const GIB: u64 = MIB * 1024;
const TIB: u64 = GIB * 1024;

const UNITS: &[(&str, u64)] = &[("TB", TIB), ("GB", GIB), ("MB", MIB), ("KB", KIB)];

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Invalid size format: {0}")]
    InvalidFormat(String),

    #[error("Invalid number: {0}")]
    InvalidNumber(#[from] std::num::ParseIntError),

    #[error("Invalid unit: {0}")]
    InvalidUnit(String),

    #[error("Size overflows u64: {0}")]
    Overflow(String),
}

/// Byte count that parses from `"5MB"`-style strings or plain integers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ByteSize(pub u64);

impl ByteSize {
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    pub fn as_usize(&self) -> usize {
        usize::try_from(self.0).unwrap_or(usize::MAX)
    }

    /// Largest whole unit, with one decimal when it is non-zero (`1.5MB`)
    pub fn to_human_readable(&self) -> String {
        for &(unit, divisor) in UNITS {
            if self.0 >= divisor {
                let whole = self.0 / divisor;
                let tenth = (self.0 % divisor) * 10 / divisor;
                return if tenth == 0 {
                    format!("{whole}{unit}")
                } else {
                    format!("{whole}.{tenth}{unit}")
                };
            }
        }

        format!("{}B", self.0)
    }
}

impl From<u64> for ByteSize {
    fn from(value: u64) -> Self {
        ByteSize(value)
    }
}

impl<'de> Deserialize<'de> for ByteSize {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct ByteSizeVisitor;

        impl serde::de::Visitor<'_> for ByteSizeVisitor {
            type Value = ByteSize;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a byte size as string (e.g., \"5MB\", \"1GB\") or integer")
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(ByteSize(v))
            }

            // config-rs and TOML hand integers over as i64
            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                u64::try_from(v)
                    .map(ByteSize)
                    .map_err(|_| E::custom(format!("byte size must not be negative: {v}")))
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                v.parse::<ByteSize>().map_err(serde::de::Error::custom)
            }
        }

        deserializer.deserialize_any(ByteSizeVisitor)
    }
}

impl FromStr for ByteSize {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase();

        let split = normalized
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(normalized.len());
        let (digits, unit) = normalized.split_at(split);

        if digits.is_empty() {
            return Err(ParseError::InvalidFormat(s.to_string()));
        }

        let value: u64 = digits.parse()?;

        let multiplier = match unit.trim() {
            "" | "B" => 1,
            "K" | "KB" | "KIB" => KIB,
            "M" | "MB" | "MIB" => MIB,
            "G" | "GB" | "GIB" => GIB,
            "T" | "TB" | "TIB" => TIB,
            other => return Err(ParseError::InvalidUnit(other.to_string())),
        };

        value
            .checked_mul(multiplier)
            .map(ByteSize)
            .ok_or_else(|| ParseError::Overflow(s.to_string()))
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_human_readable())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_units() {
        assert_eq!("1024".parse::<ByteSize>().unwrap().as_u64(), 1024);
        assert_eq!("1KB".parse::<ByteSize>().unwrap().as_u64(), KIB);
        assert_eq!("5m".parse::<ByteSize>().unwrap().as_u64(), 5 * MIB);
        assert_eq!("5MiB".parse::<ByteSize>().unwrap().as_u64(), 5 * MIB);
        assert_eq!("2 GB".parse::<ByteSize>().unwrap().as_u64(), 2 * GIB);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            "MB".parse::<ByteSize>(),
            Err(ParseError::InvalidFormat(_))
        ));
        assert!(matches!(
            "5XB".parse::<ByteSize>(),
            Err(ParseError::InvalidUnit(_))
        ));
        assert!(matches!(
            "99999999999TB".parse::<ByteSize>(),
            Err(ParseError::Overflow(_))
        ));
    }

    #[test]
    fn test_to_human_readable() {
        assert_eq!(ByteSize(512).to_human_readable(), "512B");
        assert_eq!(ByteSize(KIB).to_human_readable(), "1KB");
        assert_eq!(ByteSize(MIB + MIB / 2).to_human_readable(), "1.5MB");
        assert_eq!(ByteSize(50 * GIB).to_string(), "50GB");
    }

    #[test]
    fn test_deserialize_string_and_number() {
        #[derive(Deserialize)]
        struct Limits {
            body: ByteSize,
            archive: ByteSize,
        }

        let parsed: Limits = serde_json::from_str(r#"{"body": "10MB", "archive": 1024}"#).unwrap();
        assert_eq!(parsed.body.as_u64(), 10 * MIB);
        assert_eq!(parsed.archive.as_u64(), 1024);
    }

    #[test]
    fn test_deserialize_negative_number_fails() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Limits {
            body: ByteSize,
        }

        assert!(serde_json::from_str::<Limits>(r#"{"body": -1}"#).is_err());
    }
}
