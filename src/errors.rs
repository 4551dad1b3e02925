use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;

pub type Result<T> = std::result::Result<T, FareError>;

#[derive(Debug)]
pub enum FareError {
    IO(io::Error),
    Bincode(bincode::Error),
    SerdeJson(serde_json::Error),
    /// A row of the cleaned CSV could not be turned into a trip record.
    MalformedRecord { line: usize, reason: String },
    UnknownField(String),
    /// A stage that needs at least one record received none.
    EmptyDataset(&'static str),
    SchemaMismatch { expected: String, found: String },
}

impl From<io::Error> for FareError {
    fn from(err: io::Error) -> FareError {
        FareError::IO(err)
    }
}

impl From<bincode::Error> for FareError {
    fn from(err: bincode::Error) -> FareError {
        FareError::Bincode(err)
    }
}

impl From<serde_json::Error> for FareError {
    fn from(err: serde_json::Error) -> FareError {
        FareError::SerdeJson(err)
    }
}

impl Display for FareError {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match *self {
            FareError::IO(ref e) => write!(f, "IO error: {}", e),
            FareError::Bincode(ref e) => write!(f, "Bincode error: {}", e),
            FareError::SerdeJson(ref e) => write!(f, "SerdeJson error: {}", e),
            FareError::MalformedRecord { line, ref reason } => {
                write!(f, "Malformed record at line {}: {}", line, reason)
            }
            FareError::UnknownField(ref name) => write!(f, "Unknown field: {}", name),
            FareError::EmptyDataset(stage) => write!(f, "Empty dataset: {}", stage),
            FareError::SchemaMismatch {
                ref expected,
                ref found,
            } => write!(
                f,
                "Schema mismatch: expected [{}], found [{}]",
                expected, found
            ),
        }
    }
}

impl Error for FareError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match *self {
            FareError::IO(ref e) => Some(e),
            FareError::Bincode(ref e) => Some(e),
            FareError::SerdeJson(ref e) => Some(e),
            FareError::MalformedRecord { .. } => None,
            FareError::UnknownField(_) => None,
            FareError::EmptyDataset(_) => None,
            FareError::SchemaMismatch { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_malformed_record() {
        let err = FareError::MalformedRecord {
            line: 3,
            reason: String::from("column 2 is not a number"),
        };
        assert_eq!(
            err.to_string(),
            "Malformed record at line 3: column 2 is not a number"
        );
        assert!(err.source().is_none());
    }

    #[test]
    fn io_error_keeps_source() {
        let err: FareError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert!(err.to_string().starts_with("IO error"));
        assert!(err.source().is_some());
    }
}
