use serde::{Deserialize, Serialize};

use crate::domain::errors::ValidationError;

/// Maximum length of a business code
pub const MAX_CODE_LENGTH: usize = 50;

/// A validated business code, the human-chosen identifier used in every external lookup
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Code(String);

impl Code {
    /// Create a new Code, rejecting blank values and values over [`MAX_CODE_LENGTH`] characters.
    ///
    /// The value is kept as given; callers encode it when building URLs.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();

        if value.trim().is_empty() {
            return Err(ValidationError::EmptyCode);
        }

        let length = value.chars().count();
        if length > MAX_CODE_LENGTH {
            return Err(ValidationError::CodeTooLong {
                actual: length,
                max: MAX_CODE_LENGTH,
            });
        }

        Ok(Self(value))
    }

    /// Get the code as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Code {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Code::new(value)
    }
}

impl From<Code> for String {
    fn from(code: Code) -> Self {
        code.0
    }
}

impl PartialEq<str> for Code {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_codes() {
        assert!(Code::new("intellij").is_ok());
        assert!(Code::new("IDEA-2023.3.8").is_ok());
        assert!(Code::new("IJ-10023").is_ok());
        assert!(Code::new("a".repeat(MAX_CODE_LENGTH)).is_ok());
        assert_eq!(Code::new("IDEA 2024.1").unwrap().as_str(), "IDEA 2024.1");
        assert!(Code::new("release/1").is_ok());
    }

    #[test]
    fn test_invalid_codes() {
        assert_eq!(Code::new(""), Err(ValidationError::EmptyCode));
        assert_eq!(Code::new("   "), Err(ValidationError::EmptyCode));

        assert_eq!(
            Code::new("a".repeat(MAX_CODE_LENGTH + 1)),
            Err(ValidationError::CodeTooLong {
                actual: MAX_CODE_LENGTH + 1,
                max: MAX_CODE_LENGTH
            })
        );
    }

    #[test]
    fn test_serde_roundtrip_rejects_invalid() {
        let code: Code = serde_json::from_str("\"F1\"").unwrap();
        assert_eq!(code.as_str(), "F1");
        assert!(serde_json::from_str::<Code>("\"\"").is_err());
    }
}
