use thiserror::Error;

/// Failures of the preprocessing pipeline.
///
/// Every variant is fatal for a run; nothing is written once one is raised.
#[derive(Error, Debug)]
pub enum PrepError {
    /// No reference sequence could be determined
    #[error("Can't find reference sequence: {0}")]
    Resolution(String),

    /// Sequences of unequal length, or an ATS out of step with the columns
    #[error("Shape mismatch in {context}: expected {expected}, found {found}")]
    ShapeMismatch {
        context: String,
        expected: usize,
        found: usize,
    },

    /// Filtering removed every sequence or every position
    #[error("Filtering left an empty alignment: {0}")]
    DegenerateFilter(String),

    /// Malformed input file
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PrepError {
    pub fn shape(context: &str, expected: usize, found: usize) -> Self {
        PrepError::ShapeMismatch {
            context: context.to_string(),
            expected,
            found,
        }
    }
}
