use std::error::Error;
use std::fmt;

/// Unified application error.
///
/// Covers the binary's own failure points: configuration, reading the
/// input file and writing the report.
#[derive(Debug)]
pub enum AppError {
    Config(String),
    Input(String),
    Output(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(msg) => write!(f, "Config error: {}", msg),
            AppError::Input(msg) => write!(f, "Input error: {}", msg),
            AppError::Output(msg) => write!(f, "Output error: {}", msg),
        }
    }
}

impl Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_the_kind() {
        assert_eq!(
            AppError::Input("missing file".to_string()).to_string(),
            "Input error: missing file"
        );
        assert_eq!(AppError::Config("bad".to_string()).to_string(), "Config error: bad");
    }
}
