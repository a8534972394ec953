//! Learner feedback after attempting to recall a word.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ReviewError;

/// The four review buttons, ordered from worst to best recall.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grade {
    Forgot,
    Struggled,
    Remembered,
    Perfect,
}

impl Grade {
    pub const ALL: [Grade; 4] = [
        Grade::Forgot,
        Grade::Struggled,
        Grade::Remembered,
        Grade::Perfect,
    ];

    pub fn value(self) -> u8 {
        match self {
            Grade::Forgot => 0,
            Grade::Struggled => 1,
            Grade::Remembered => 2,
            Grade::Perfect => 3,
        }
    }

    /// Whether the word was recalled well enough to leave the retry rounds.
    pub fn is_pass(self) -> bool {
        self >= Grade::Remembered
    }

    pub fn label(self) -> &'static str {
        match self {
            Grade::Forgot => "forgot",
            Grade::Struggled => "struggled",
            Grade::Remembered => "remembered",
            Grade::Perfect => "perfect",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl TryFrom<u8> for Grade {
    type Error = ReviewError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Grade::Forgot),
            1 => Ok(Grade::Struggled),
            2 => Ok(Grade::Remembered),
            3 => Ok(Grade::Perfect),
            other => Err(ReviewError::invalid_grade(other)),
        }
    }
}

impl TryFrom<i64> for Grade {
    type Error = ReviewError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .map_err(|_| ReviewError::invalid_grade(value))
            .and_then(Grade::try_from)
    }
}

/// Accepts either the numeric value or the name, case-insensitive.
impl FromStr for Grade {
    type Err = ReviewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(n) = trimmed.parse::<u8>() {
            return Grade::try_from(n);
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "forgot" => Ok(Grade::Forgot),
            "struggled" => Ok(Grade::Struggled),
            "remembered" => Ok(Grade::Remembered),
            "perfect" => Ok(Grade::Perfect),
            _ => Err(ReviewError::invalid_grade(trimmed)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grade_ordering() {
        assert!(Grade::Forgot < Grade::Struggled);
        assert!(Grade::Struggled < Grade::Remembered);
        assert!(Grade::Remembered < Grade::Perfect);
    }

    #[test]
    fn test_try_from_u8() {
        for grade in Grade::ALL {
            assert_eq!(Grade::try_from(grade.value()).unwrap(), grade);
        }
        assert!(matches!(
            Grade::try_from(4u8),
            Err(ReviewError::InvalidGrade { .. })
        ));
    }

    #[test]
    fn test_try_from_negative_i64() {
        assert!(Grade::try_from(-1i64).is_err());
        assert_eq!(Grade::try_from(3i64).unwrap(), Grade::Perfect);
    }

    #[test]
    fn test_parse_names_and_numbers() {
        assert_eq!("perfect".parse::<Grade>().unwrap(), Grade::Perfect);
        assert_eq!(" Forgot ".parse::<Grade>().unwrap(), Grade::Forgot);
        assert_eq!("1".parse::<Grade>().unwrap(), Grade::Struggled);
        assert!("easy".parse::<Grade>().is_err());
        assert!("7".parse::<Grade>().is_err());
    }

    #[test]
    fn test_is_pass() {
        assert!(!Grade::Forgot.is_pass());
        assert!(!Grade::Struggled.is_pass());
        assert!(Grade::Remembered.is_pass());
        assert!(Grade::Perfect.is_pass());
    }
}
