//! Freeform phone text -> E.164.
//!
//! Accepts `+CC...`, `00CC...`, national numbers with or without the trunk
//! prefix, and numbers written with the country code but no `+`. Validity is
//! decided by the injected `NumberingPlan`; this type holds no other state.

use crate::domain::{NormalizedPhoneNumber, NotANumber, RegionPlan};
use crate::ports::NumberingPlan;
use std::sync::Arc;

/// E.164 bounds on total digits (country code + national number).
const MIN_DIGITS: usize = 8;
const MAX_DIGITS: usize = 15;
/// Anything longer is not a phone number someone typed.
const MAX_INPUT_LEN: usize = 64;
/// Country calling codes are 1-3 digits and prefix-free.
const MAX_CALLING_CODE_LEN: usize = 3;

pub struct PhoneNormalizer {
    plan: Arc<dyn NumberingPlan>,
}

impl PhoneNormalizer {
    pub fn new(plan: Arc<dyn NumberingPlan>) -> Self {
        Self { plan }
    }

    /// Normalize `raw`, using `default_region` when the number carries no country code.
    pub fn normalize(
        &self,
        raw: &str,
        default_region: &str,
    ) -> Result<NormalizedPhoneNumber, NotANumber> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(NotANumber::new("empty input"));
        }
        if trimmed.len() > MAX_INPUT_LEN {
            return Err(NotANumber::new("input too long"));
        }

        let (has_plus, digits) = extract_digits(trimmed)?;

        if has_plus {
            return self.normalize_international(&digits);
        }
        if let Some(rest) = digits.strip_prefix("00") {
            return self.normalize_international(rest);
        }
        self.normalize_national(&digits, default_region)
    }

    fn normalize_international(&self, digits: &str) -> Result<NormalizedPhoneNumber, NotANumber> {
        check_length(digits)?;
        if digits.starts_with('0') {
            return Err(NotANumber::new("country code cannot start with 0"));
        }

        for len in 1..=MAX_CALLING_CODE_LEN.min(digits.len() - 1) {
            let (code, national) = digits.split_at(len);
            let Ok(code) = code.parse::<u16>() else {
                continue;
            };
            let regions = self.plan.regions_for_code(code);
            if regions.is_empty() {
                continue;
            }
            return if regions.iter().any(|r| r.accepts(national)) {
                Ok(NormalizedPhoneNumber::from_digits(digits))
            } else {
                Err(NotANumber::new(format!("invalid number for +{}", code)))
            };
        }

        // Calling code outside the plan: only the E.164 length bounds apply.
        Ok(NormalizedPhoneNumber::from_digits(digits))
    }

    fn normalize_national(
        &self,
        digits: &str,
        default_region: &str,
    ) -> Result<NormalizedPhoneNumber, NotANumber> {
        let region = self
            .plan
            .region(default_region)
            .ok_or_else(|| NotANumber::new(format!("unknown region {}", default_region)))?;

        let national = national_candidates(region, digits)
            .into_iter()
            .find(|candidate| region.accepts(candidate))
            .ok_or_else(|| NotANumber::new(format!("invalid number for region {}", region.region)))?;

        let full = format!("{}{}", region.calling_code, national);
        check_length(&full)?;
        Ok(NormalizedPhoneNumber::from_digits(&full))
    }
}

/// Split formatting from digits. Returns whether a `+` preceded the first digit.
fn extract_digits(input: &str) -> Result<(bool, String), NotANumber> {
    let mut digits = String::with_capacity(input.len());
    let mut has_plus = false;

    for c in input.chars() {
        match c {
            '0'..='9' => digits.push(c),
            '+' if !has_plus && digits.is_empty() => has_plus = true,
            ' ' | '-' | '.' | '(' | ')' | '/' | '\u{a0}' => {}
            _ => return Err(NotANumber::new(format!("unexpected character {:?}", c))),
        }
    }

    if digits.is_empty() {
        return Err(NotANumber::new("no digits"));
    }
    Ok((has_plus, digits))
}

/// National readings of `digits`, most literal first: as typed, without the
/// trunk prefix, and without a leading country code.
fn national_candidates<'a>(region: &RegionPlan, digits: &'a str) -> Vec<&'a str> {
    let mut candidates = vec![digits];
    if let Some(rest) = region
        .trunk_prefix
        .as_deref()
        .and_then(|trunk| digits.strip_prefix(trunk))
    {
        candidates.push(rest);
    }
    if let Some(rest) = digits.strip_prefix(region.calling_code.to_string().as_str()) {
        candidates.push(rest);
    }
    candidates
}

fn check_length(digits: &str) -> Result<(), NotANumber> {
    if (MIN_DIGITS..=MAX_DIGITS).contains(&digits.len()) {
        Ok(())
    } else {
        Err(NotANumber::new(format!(
            "{} digits, expected {}-{}",
            digits.len(),
            MIN_DIGITS,
            MAX_DIGITS
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::numbering::StaticNumberingPlan;

    fn normalizer() -> PhoneNormalizer {
        PhoneNormalizer::new(Arc::new(StaticNumberingPlan::builtin().unwrap()))
    }

    #[test]
    fn test_pakistani_formats() {
        let n = normalizer();
        for raw in [
            "03001234567",
            "0300-1234567",
            "300 1234567",
            "+92 300 1234567",
            "0092 300 1234567",
            "923001234567",
            "(0300) 123-4567",
            "(+92) 300 1234567",
            "( +92 ) 300-1234567",
        ] {
            assert_eq!(
                n.normalize(raw, "PK").map(|p| p.to_string()),
                Ok("+923001234567".to_string()),
                "input {:?}",
                raw
            );
        }
    }

    #[test]
    fn test_idempotent_on_normalized_numbers() {
        let n = normalizer();
        for (raw, region) in [
            ("03001234567", "PK"),
            ("(202) 555-0123", "US"),
            ("07911 123456", "GB"),
            ("9876543210", "IN"),
            ("5512 3456", "QA"),
        ] {
            let first = n.normalize(raw, region).unwrap();
            let second = n.normalize(first.as_str(), region).unwrap();
            let other_region = n.normalize(first.as_str(), "PK").unwrap();
            assert_eq!(first, second);
            assert_eq!(first, other_region);
        }
    }

    #[test]
    fn test_garbage_is_not_a_number() {
        let n = normalizer();
        for raw in [
            "",
            "   ",
            "not a phone",
            "call me",
            "+",
            "---",
            "0300-CALL-NOW",
            "12+34",
            "++92 300 1234567",
            "(92)+300 1234567",
            "☎ 0300",
            &"1".repeat(100),
        ] {
            assert!(n.normalize(raw, "PK").is_err(), "input {:?}", raw);
        }
    }

    #[test]
    fn test_invalid_for_region() {
        let n = normalizer();
        // 39x is not an allocated mobile prefix
        assert!(n.normalize("0399 1234567", "PK").is_err());
        // wrong digit count
        assert!(n.normalize("0300 12345", "PK").is_err());
        assert!(n.normalize("+92 300 123456789", "PK").is_err());
        // NANP area codes cannot start with 0/1
        assert!(n.normalize("+1 023 555 0123", "PK").is_err());
    }

    #[test]
    fn test_unknown_region_and_unknown_calling_code() {
        let n = normalizer();
        assert_eq!(
            n.normalize("03001234567", "ZZ"),
            Err(NotANumber::new("unknown region ZZ"))
        );
        // +49 is not in the built-in table: only E.164 length bounds apply
        assert_eq!(
            n.normalize("+49 30 123456", "PK").map(|p| p.to_string()),
            Ok("+4930123456".to_string())
        );
        assert!(n.normalize("+49 1", "PK").is_err());
        assert!(n.normalize("+0 300 1234567", "PK").is_err());
    }

    #[test]
    fn test_region_is_case_insensitive() {
        let n = normalizer();
        assert!(n.normalize("03001234567", "pk").is_ok());
    }
}
