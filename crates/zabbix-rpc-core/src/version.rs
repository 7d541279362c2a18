//! Parsing of Zabbix's `apiinfo.version` string into a structured form.

use crate::error::ParseError;

/// A parsed Zabbix API version, plus the original string it was parsed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    /// Major version, e.g. `6` in `"6.0.5"`.
    pub major: u32,
    /// Minor version, e.g. `0` in `"6.0.5"`.
    pub minor: u32,
    /// Patch version. Defaults to `0` when absent or unparseable.
    pub patch: u32,
    /// The input string with a leading `v` stripped, verbatim otherwise.
    pub full: String,
}

impl VersionInfo {
    /// Parse a version string such as `"6.0.5"`, `"v7.0.0"`, or `"6.4"`.
    ///
    /// At least a major and minor component are required. The patch
    /// component is optional and defaults to `0` whether it is missing or
    /// simply not a valid integer — Zabbix pre-release suffixes (e.g.
    /// `"7.0.0rc1"`) are tolerated this way rather than rejected.
    pub fn parse(version_str: &str) -> Result<Self, ParseError> {
        let stripped = version_str.strip_prefix('v').unwrap_or(version_str);
        let parts: Vec<&str> = stripped.split('.').collect();

        if parts.len() < 2 {
            return Err(ParseError::TooFewComponents(version_str.to_string()));
        }

        let major = parts[0]
            .parse::<u32>()
            .map_err(|_| ParseError::InvalidMajor(version_str.to_string()))?;
        let minor = parts[1]
            .parse::<u32>()
            .map_err(|_| ParseError::InvalidMinor(version_str.to_string()))?;
        let patch = parts.get(2).and_then(|p| p.parse::<u32>().ok()).unwrap_or(0);

        Ok(Self {
            major,
            minor,
            patch,
            full: stripped.to_string(),
        })
    }
}

impl std::fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_triplet() {
        let v = VersionInfo::parse("6.0.5").unwrap();
        assert_eq!(v.major, 6);
        assert_eq!(v.minor, 0);
        assert_eq!(v.patch, 5);
        assert_eq!(v.full, "6.0.5");
    }

    #[test]
    fn strips_leading_v() {
        let v = VersionInfo::parse("v7.0.0").unwrap();
        assert_eq!(v.major, 7);
        assert_eq!(v.full, "7.0.0");
    }

    #[test]
    fn defaults_missing_patch_to_zero() {
        let v = VersionInfo::parse("6.4").unwrap();
        assert_eq!(v.patch, 0);
        assert_eq!(v.full, "6.4");
    }

    #[test]
    fn defaults_unparseable_patch_to_zero() {
        let v = VersionInfo::parse("7.0.0rc1").unwrap();
        assert_eq!(v.patch, 0);
    }

    #[test]
    fn rejects_single_component() {
        assert!(matches!(
            VersionInfo::parse("6"),
            Err(ParseError::TooFewComponents(_))
        ));
    }

    #[test]
    fn rejects_non_numeric_major() {
        assert!(matches!(
            VersionInfo::parse("a.0.0"),
            Err(ParseError::InvalidMajor(_))
        ));
    }
}
