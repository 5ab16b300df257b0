use thiserror::Error;

/// Shape problems found while reading scheduler output.
///
/// Every variant keeps enough context (the offending line, expected vs. actual
/// counts) to diagnose a scheduler whose output format changed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OutputError {
    #[error("expected {expected} fields but found {actual} in line {line:?}")]
    FieldCount {
        expected: usize,
        actual: usize,
        line: String,
    },

    #[error("expected {min}..={max} columns but found {actual} in line {line:?}")]
    ColumnCount {
        min: usize,
        max: usize,
        actual: usize,
        line: String,
    },

    #[error("header has {keys} tokens but value line has {values}")]
    TokenCount { keys: usize, values: usize },

    #[error("required key {key:?} is missing in {line:?}")]
    MissingKey { key: String, line: String },

    #[error("invalid value {value:?} for {field}")]
    InvalidValue { field: String, value: String },

    #[error("line {line:?} does not match {pattern:?}")]
    Unmatched { pattern: String, line: String },

    #[error("no {what} found in output")]
    Empty { what: String },

    #[error("host {host} reports {allocated} bytes allocated out of {physical}")]
    MemoryExceeded {
        host: String,
        allocated: u64,
        physical: u64,
    },
}

#[derive(Error, Debug)]
pub enum GridError {
    #[error("No command template registered for {engine}/{operation}")]
    MissingTemplate { engine: String, operation: String },

    #[error("Template error in {name}: {reason}")]
    Template { name: String, reason: String },

    #[error("Failed to start `{program}`: {source}")]
    ProcessStart {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{program}` exited with code {code}: {stderr}")]
    NonZeroExit {
        program: String,
        code: i32,
        stderr: String,
    },

    #[error("Malformed scheduler output: {0}")]
    MalformedOutput(#[from] OutputError),

    #[error("Not valid status value provided: {0}")]
    UnrecognizedStatus(i64),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Scheduler unreachable: {0}")]
    Unreachable(String),

    #[error("{operation} is not supported for {engine}")]
    Unsupported { operation: String, engine: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Caller-visible outcome class of a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    NotFound,
    BadRequest,
    Internal,
}

impl GridError {
    /// Maps an error kind onto the class a provider reports to its caller.
    ///
    /// `NonZeroExit` is classified by the provider that ran the command, so here
    /// it falls back to `Internal`.
    pub fn class(&self) -> ErrorClass {
        match self {
            GridError::NotFound(_) | GridError::Unreachable(_) => ErrorClass::NotFound,
            GridError::BadRequest(_) | GridError::Unsupported { .. } => ErrorClass::BadRequest,
            _ => ErrorClass::Internal,
        }
    }

    pub fn is_malformed_output(&self) -> bool {
        matches!(self, GridError::MalformedOutput(_))
    }
}

pub type Result<T> = std::result::Result<T, GridError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_of_provider_errors() {
        assert_eq!(GridError::NotFound("job 5".into()).class(), ErrorClass::NotFound);
        assert_eq!(GridError::Unreachable("6444".into()).class(), ErrorClass::NotFound);
        assert_eq!(GridError::BadRequest("id".into()).class(), ErrorClass::BadRequest);
        assert_eq!(GridError::UnrecognizedStatus(99999).class(), ErrorClass::Internal);
    }

    #[test]
    fn output_error_converts_into_malformed_output() {
        let err: GridError = OutputError::Empty {
            what: "job id".into(),
        }
        .into();
        assert!(err.is_malformed_output());
        assert_eq!(err.to_string(), "Malformed scheduler output: no job id found in output");
    }
}
