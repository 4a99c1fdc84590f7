//! Severity levels understood by the sink.
//!
//! The ordering follows the usual severity ladder with [`FemtoLevel::None`]
//! at the top. `None` is a sentinel: a sink never writes records at that level
//! and a minimum level of `None` disables the sink entirely.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FemtoLevel {
    Trace,
    Debug,
    #[default]
    Information,
    Warning,
    Error,
    Critical,
    None,
}

/// Returned when a string does not name a known level.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unknown log level '{0}'")]
pub struct ParseLevelError(pub String);

impl FemtoLevel {
    /// Every level in ascending order of severity.
    pub const ALL: [FemtoLevel; 7] = [
        FemtoLevel::Trace,
        FemtoLevel::Debug,
        FemtoLevel::Information,
        FemtoLevel::Warning,
        FemtoLevel::Error,
        FemtoLevel::Critical,
        FemtoLevel::None,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FemtoLevel::Trace => "Trace",
            FemtoLevel::Debug => "Debug",
            FemtoLevel::Information => "Information",
            FemtoLevel::Warning => "Warning",
            FemtoLevel::Error => "Error",
            FemtoLevel::Critical => "Critical",
            FemtoLevel::None => "None",
        }
    }

    /// Parse `s`, falling back to [`FemtoLevel::Information`] when it is
    /// blank or unrecognised.
    pub fn parse_or_information(s: &str) -> Self {
        s.parse().unwrap_or(Self::Information)
    }

    /// `true` for the sentinel level that never produces output.
    pub fn is_disabled(self) -> bool {
        self == FemtoLevel::None
    }
}

impl fmt::Display for FemtoLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // `pad` honours width and alignment so `{:>11}` works as expected.
        f.pad(self.as_str())
    }
}

impl FromStr for FemtoLevel {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "information" | "info" => Ok(Self::Information),
            "warning" | "warn" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            "critical" | "fatal" => Ok(Self::Critical),
            "none" | "off" => Ok(Self::None),
            _ => Err(ParseLevelError(s.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Trace", FemtoLevel::Trace)]
    #[case("DEBUG", FemtoLevel::Debug)]
    #[case("information", FemtoLevel::Information)]
    #[case("info", FemtoLevel::Information)]
    #[case(" Warning ", FemtoLevel::Warning)]
    #[case("warn", FemtoLevel::Warning)]
    #[case("Error", FemtoLevel::Error)]
    #[case("critical", FemtoLevel::Critical)]
    #[case("None", FemtoLevel::None)]
    fn parses_level_names(#[case] input: &str, #[case] expected: FemtoLevel) {
        assert_eq!(input.parse::<FemtoLevel>(), Ok(expected));
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("verbose")]
    fn unknown_levels_fall_back_to_information(#[case] input: &str) {
        assert!(input.parse::<FemtoLevel>().is_err());
        assert_eq!(
            FemtoLevel::parse_or_information(input),
            FemtoLevel::Information
        );
    }

    #[test]
    fn levels_are_ordered_by_severity() {
        assert!(FemtoLevel::ALL.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(FemtoLevel::default(), FemtoLevel::Information);
    }

    #[test]
    fn display_respects_padding() {
        assert_eq!(format!("{:>11}", FemtoLevel::Error), "      Error");
        assert_eq!(format!("{:>11}", FemtoLevel::Information), "Information");
    }
}
