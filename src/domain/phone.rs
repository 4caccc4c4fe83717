//! Phone number value types.
//!
//! `NormalizedPhoneNumber` can only be minted inside the crate (by the
//! normalizer). `RegionPlan` is the per-region validity rule consumed through
//! the `NumberingPlan` port.

use regex::Regex;
use serde::Serialize;
use std::fmt;

/// Canonical E.164 number: `+`, country code, national significant number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct NormalizedPhoneNumber(String);

impl NormalizedPhoneNumber {
    /// Caller guarantees `digits` is 8-15 ASCII digits with a non-zero first digit.
    pub(crate) fn from_digits(digits: &str) -> Self {
        Self(format!("+{}", digits))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Digits without the leading `+`.
    pub fn digits(&self) -> &str {
        &self.0[1..]
    }
}

impl fmt::Display for NormalizedPhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NormalizedPhoneNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Dialing rules for one region (ISO 3166 alpha-2 code).
#[derive(Debug, Clone)]
pub struct RegionPlan {
    pub region: String,
    pub calling_code: u16,
    /// National trunk prefix dialed before the national number (e.g. "0" in PK, "1" in US).
    pub trunk_prefix: Option<String>,
    national_pattern: Regex,
}

impl RegionPlan {
    /// `national_pattern` describes the national significant number; it is anchored here.
    pub fn new(
        region: &str,
        calling_code: u16,
        trunk_prefix: Option<&str>,
        national_pattern: &str,
    ) -> Result<Self, regex::Error> {
        let national_pattern = Regex::new(&format!("^(?:{})$", national_pattern))?;
        Ok(Self {
            region: region.to_ascii_uppercase(),
            calling_code,
            trunk_prefix: trunk_prefix.filter(|p| !p.is_empty()).map(str::to_string),
            national_pattern,
        })
    }

    /// True if `national` (digits only, no trunk prefix) is a valid number in this region.
    pub fn accepts(&self, national: &str) -> bool {
        self.national_pattern.is_match(national)
    }
}
