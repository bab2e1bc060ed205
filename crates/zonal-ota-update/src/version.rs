//! Semantic version value type and comparison rules
//!
//! Versions are strictly `MAJOR.MINOR.PATCH` with ASCII decimal components.
//! Pre-release and build suffixes are not accepted, so `"1.2.3-rc1"` and
//! `"1.2"` both fail to parse.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zonal_ota_errors::VersionError;

/// A `major.minor.patch` version with lexicographic triple ordering.
///
/// # Examples
///
/// ```
/// use zonal_ota_update::version::SemanticVersion;
///
/// # fn demo() -> Result<(), zonal_ota_errors::VersionError> {
/// let v2 = SemanticVersion::parse("2.0.0")?;
/// let v10 = SemanticVersion::parse("10.0.0")?;
/// assert!(v2 < v10);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SemanticVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl SemanticVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse a version string.
    ///
    /// # Errors
    ///
    /// Returns [`VersionError::InvalidVersionFormat`] unless the input is
    /// exactly three dot-separated, non-empty runs of ASCII digits, each of
    /// which fits in a `u32`.
    pub fn parse(s: &str) -> Result<Self, VersionError> {
        let mut parts = s.split('.');
        let (Some(major), Some(minor), Some(patch), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(VersionError::invalid_format(s));
        };

        Ok(Self {
            major: component(s, major)?,
            minor: component(s, minor)?,
            patch: component(s, patch)?,
        })
    }

    /// Three-way comparison on the `(major, minor, patch)` triple.
    pub fn compare(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }

    /// Compatible iff the major components are equal.
    pub fn is_compatible_with(&self, other: &Self) -> bool {
        self.major == other.major
    }
}

fn component(input: &str, part: &str) -> Result<u32, VersionError> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(VersionError::invalid_format(input));
    }
    part.parse::<u32>()
        .ok()
        .ok_or_else(|| VersionError::invalid_format(input))
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for SemanticVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for SemanticVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SemanticVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Which component changed between two versions, most significant first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Major,
    Minor,
    Patch,
    None,
}

impl ChangeType {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeType::Major => "major",
            ChangeType::Minor => "minor",
            ChangeType::Patch => "patch",
            ChangeType::None => "none",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify the change from `from` to `to`.
pub fn change_type(from: &SemanticVersion, to: &SemanticVersion) -> ChangeType {
    if from.major != to.major {
        ChangeType::Major
    } else if from.minor != to.minor {
        ChangeType::Minor
    } else if from.patch != to.patch {
        ChangeType::Patch
    } else {
        ChangeType::None
    }
}

/// Compare two version strings.
///
/// # Errors
///
/// Fails if either string is not a valid version.
pub fn compare_versions(a: &str, b: &str) -> Result<Ordering, VersionError> {
    Ok(SemanticVersion::parse(a)?.cmp(&SemanticVersion::parse(b)?))
}

/// Return the greatest of `versions`, as given.
///
/// # Errors
///
/// [`VersionError::EmptyVersionSet`] for empty input, or the parse error of
/// the first malformed entry.
pub fn latest_version<'a, I>(versions: I) -> Result<&'a str, VersionError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<(SemanticVersion, &'a str)> = None;
    for raw in versions {
        let parsed = SemanticVersion::parse(raw)?;
        match best {
            Some((current, _)) if current >= parsed => {}
            _ => best = Some((parsed, raw)),
        }
    }
    best.map(|(_, raw)| raw).ok_or(VersionError::EmptyVersionSet)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() -> Result<(), VersionError> {
        assert_eq!(SemanticVersion::parse("1.2.3")?, SemanticVersion::new(1, 2, 3));
        assert_eq!(SemanticVersion::parse("0.0.0")?, SemanticVersion::new(0, 0, 0));
        assert_eq!(SemanticVersion::parse("010.0.7")?, SemanticVersion::new(10, 0, 7));
        Ok(())
    }

    #[test]
    fn test_parse_rejects() {
        for bad in [
            "", "1", "1.2", "1.2.3.4", "1..3", "a.b.c", "1.2.3-rc1", " 1.2.3", "1.2.3 ", "-1.2.3",
            "+1.2.3", "1.2.99999999999",
        ] {
            assert_eq!(
                SemanticVersion::parse(bad),
                Err(VersionError::invalid_format(bad)),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_ordering_is_numeric() -> Result<(), VersionError> {
        assert!(SemanticVersion::parse("2.0.0")? < SemanticVersion::parse("10.0.0")?);
        assert!(SemanticVersion::parse("1.9.9")? < SemanticVersion::parse("2.0.0")?);
        assert_eq!(
            SemanticVersion::new(1, 2, 3).compare(&SemanticVersion::new(1, 2, 3)),
            Ordering::Equal
        );
        Ok(())
    }

    #[test]
    fn test_change_type() {
        let v = SemanticVersion::new;
        assert_eq!(change_type(&v(1, 0, 0), &v(2, 0, 0)), ChangeType::Major);
        assert_eq!(change_type(&v(1, 2, 0), &v(1, 3, 5)), ChangeType::Minor);
        assert_eq!(change_type(&v(1, 2, 0), &v(1, 2, 1)), ChangeType::Patch);
        assert_eq!(change_type(&v(1, 2, 0), &v(1, 2, 0)), ChangeType::None);
        assert_eq!(change_type(&v(3, 0, 0), &v(2, 9, 9)), ChangeType::Major);
    }

    #[test]
    fn test_compatibility() {
        assert!(SemanticVersion::new(2, 1, 0).is_compatible_with(&SemanticVersion::new(2, 9, 3)));
        assert!(!SemanticVersion::new(2, 1, 0).is_compatible_with(&SemanticVersion::new(3, 0, 0)));
    }

    #[test]
    fn test_latest_version() -> Result<(), VersionError> {
        assert_eq!(latest_version(["1.0.0", "1.10.0", "1.9.9"])?, "1.10.0");
        assert_eq!(latest_version(["3.0.0"])?, "3.0.0");
        assert_eq!(latest_version(Vec::<&str>::new()), Err(VersionError::EmptyVersionSet));
        assert_eq!(
            latest_version(["1.0.0", "bogus"]),
            Err(VersionError::invalid_format("bogus"))
        );
        Ok(())
    }

    #[test]
    fn test_compare_versions() -> Result<(), VersionError> {
        assert_eq!(compare_versions("1.0.0", "1.0.1")?, Ordering::Less);
        assert_eq!(compare_versions("2.0.0", "1.99.99")?, Ordering::Greater);
        assert!(compare_versions("1.0", "1.0.0").is_err());
        Ok(())
    }

    #[test]
    fn test_serde_as_string() -> Result<(), serde_json::Error> {
        let json = serde_json::to_string(&SemanticVersion::new(4, 5, 6))?;
        assert_eq!(json, "\"4.5.6\"");
        let back: SemanticVersion = serde_json::from_str(&json)?;
        assert_eq!(back, SemanticVersion::new(4, 5, 6));
        assert!(serde_json::from_str::<SemanticVersion>("\"4.5\"").is_err());
        Ok(())
    }
}
