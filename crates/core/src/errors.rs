use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;

impl AnalysisError {
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter { name, reason: reason.into() }
    }

    pub fn error_class(&self) -> &'static str {
        match self {
            Self::InvalidParameter { .. } => "invalid_parameter",
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::InvalidParameter { .. } => {
                "The analysis parameters are out of range. Check inputs and try again."
            }
        }
    }
}

pub(crate) fn ensure_fraction(name: &'static str, value: f64) -> AnalysisResult<()> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(AnalysisError::invalid(name, format!("must be within 0.0..=1.0, got {value}")))
    }
}

pub(crate) fn ensure_positive(name: &'static str, value: usize) -> AnalysisResult<()> {
    if value == 0 {
        Err(AnalysisError::invalid(name, "must be greater than zero"))
    } else {
        Ok(())
    }
}
