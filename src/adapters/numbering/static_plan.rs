//! Table-driven numbering plan.
//!
//! Ships a compact built-in table for the regions the volunteer network
//! operates in; deployments can replace it with a JSON file of the same shape.

use crate::domain::{DomainError, RegionPlan};
use crate::ports::NumberingPlan;
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// (region, calling code, trunk prefix, national significant number pattern)
const BUILTIN_REGIONS: &[(&str, u16, Option<&str>, &str)] = &[
    ("PK", 92, Some("0"), r"3[0-6]\d{8}|[24-9]\d{8,9}"),
    ("IN", 91, Some("0"), r"[1-9]\d{9}"),
    ("BD", 880, Some("0"), r"1[3-9]\d{8}|[2-9]\d{7,9}"),
    ("AF", 93, Some("0"), r"[2-7]\d{8}"),
    ("AE", 971, Some("0"), r"5[024-68]\d{7}|[2-47-9]\d{7}"),
    ("SA", 966, Some("0"), r"5\d{8}|1\d{7,8}"),
    ("QA", 974, None, r"[3-7]\d{7}"),
    ("KW", 965, None, r"[2569]\d{7}"),
    ("OM", 968, None, r"[279]\d{7}"),
    ("TR", 90, Some("0"), r"5\d{9}|[2-4]\d{9}|8[58]\d{8}"),
    ("MY", 60, Some("0"), r"1\d{8,9}|[3-9]\d{7,8}"),
    ("GB", 44, Some("0"), r"7\d{9}|[1-3]\d{8,9}|[58]\d{9}"),
    ("US", 1, Some("1"), r"[2-9]\d{2}[2-9]\d{6}"),
    ("CA", 1, Some("1"), r"[2-9]\d{2}[2-9]\d{6}"),
];

/// One entry of a numbering plan file.
#[derive(Debug, Deserialize)]
struct RegionEntry {
    region: String,
    calling_code: u16,
    #[serde(default)]
    trunk_prefix: Option<String>,
    national_pattern: String,
}

/// In-memory numbering plan. Read-only after construction.
#[derive(Debug, Clone)]
pub struct StaticNumberingPlan {
    regions: Vec<RegionPlan>,
}

impl StaticNumberingPlan {
    /// Built-in table. Fails only if a bundled pattern does not compile.
    pub fn builtin() -> Result<Self, DomainError> {
        let regions = BUILTIN_REGIONS
            .iter()
            .map(|&(region, code, trunk, pattern)| {
                RegionPlan::new(region, code, trunk, pattern).map_err(|e| {
                    DomainError::NumberingPlan(format!("built-in pattern for {}: {}", region, e))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { regions })
    }

    /// Load a plan from a JSON array of
    /// `{"region", "calling_code", "trunk_prefix", "national_pattern"}` objects.
    pub fn from_json_file(path: &Path) -> Result<Self, DomainError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DomainError::NumberingPlan(format!("read {}: {}", path.display(), e))
        })?;
        let plan = Self::from_json_str(&content)?;
        info!(
            path = %path.display(),
            regions = plan.regions.len(),
            "numbering plan loaded from file"
        );
        Ok(plan)
    }

    pub fn from_json_str(content: &str) -> Result<Self, DomainError> {
        let entries: Vec<RegionEntry> = serde_json::from_str(content)
            .map_err(|e| DomainError::NumberingPlan(format!("invalid plan JSON: {}", e)))?;
        if entries.is_empty() {
            return Err(DomainError::NumberingPlan("plan has no regions".into()));
        }
        let regions = entries
            .into_iter()
            .map(|entry| {
                RegionPlan::new(
                    &entry.region,
                    entry.calling_code,
                    entry.trunk_prefix.as_deref(),
                    &entry.national_pattern,
                )
                .map_err(|e| {
                    DomainError::NumberingPlan(format!("pattern for {}: {}", entry.region, e))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { regions })
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

impl NumberingPlan for StaticNumberingPlan {
    fn region(&self, region: &str) -> Option<&RegionPlan> {
        self.regions
            .iter()
            .find(|r| r.region.eq_ignore_ascii_case(region.trim()))
    }

    fn regions_for_code(&self, calling_code: u16) -> Vec<&RegionPlan> {
        self.regions
            .iter()
            .filter(|r| r.calling_code == calling_code)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builtin_compiles() {
        let plan = StaticNumberingPlan::builtin().unwrap();
        assert_eq!(plan.len(), BUILTIN_REGIONS.len());
        assert!(!plan.is_empty());
        assert_eq!(plan.region("pk").map(|r| r.calling_code), Some(92));
        assert_eq!(plan.regions_for_code(1).len(), 2);
        assert!(plan.region("ZZ").is_none());
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"region": "NZ", "calling_code": 64, "trunk_prefix": "0", "national_pattern": "2\\d{{7,9}}"}}]"#
        )
        .unwrap();
        let plan = StaticNumberingPlan::from_json_file(file.path()).unwrap();
        let nz = plan.region("NZ").unwrap();
        assert_eq!(nz.trunk_prefix.as_deref(), Some("0"));
        assert!(nz.accepts("211234567"));
    }

    #[test]
    fn test_rejects_bad_pattern_and_empty_plan() {
        let bad = r#"[{"region": "XX", "calling_code": 999, "national_pattern": "("}]"#;
        assert!(matches!(
            StaticNumberingPlan::from_json_str(bad),
            Err(DomainError::NumberingPlan(_))
        ));
        assert!(StaticNumberingPlan::from_json_str("[]").is_err());
    }
}
