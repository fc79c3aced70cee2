/// Validation errors for domain value objects and inbound payloads
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    // Code validation errors
    EmptyCode,
    CodeTooLong {
        actual: usize,
        max: usize,
    },

    // Payload field errors
    FieldRequired {
        field: String,
    },
    FieldTooLong {
        field: String,
        actual: usize,
        max: usize,
    },
    InvalidField {
        field: String,
        value: String,
        expected: String,
    },
}

impl ValidationError {
    pub fn required(field: &str) -> Self {
        ValidationError::FieldRequired {
            field: field.to_string(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::EmptyCode => write!(f, "Code cannot be empty"),
            ValidationError::CodeTooLong { actual, max } => {
                write!(f, "Code too long: {} characters (max: {})", actual, max)
            }
            ValidationError::FieldRequired { field } => write!(f, "{} is required", field),
            ValidationError::FieldTooLong { field, actual, max } => {
                write!(
                    f,
                    "{} cannot exceed {} characters (got {})",
                    field, max, actual
                )
            }
            ValidationError::InvalidField {
                field,
                value,
                expected,
            } => {
                write!(
                    f,
                    "Invalid value for field '{}': '{}' (expected: {})",
                    field, value, expected
                )
            }
        }
    }
}

impl std::error::Error for ValidationError {}
