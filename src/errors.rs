//
// Errors
//
use std::io;
use std::result;
use std::error;
use std::num;
use std::fmt;

/// Type alias for parlance errors
pub type Result<X> = result::Result<X, Error>;

/// Wrapper for many kinds of errors occuring while preparing corpora, exporting or scraping
#[derive(Debug)]
pub enum Error {
    InvalidDimensions(String),
    IOError(io::Error),
    ParseIntError(num::ParseIntError),
    MissingFile(&'static str, Option<io::Error>),
    InvalidDocument(String),
    InvalidFormat(String),
    SampleTooLarge { requested: usize, available: usize },
    ValenceOutOfRange { value: f64, floor: f64, ceil: f64 },
    InvalidRange(String),
    JsonError(serde_json::Error),
    BincodeError(bincode::Error),
    HttpError(reqwest::Error),
    Other(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::InvalidDimensions(ref info) => write!(f, "Dimension Mismatch: {}", info),
            Error::IOError(ref err) => write!(f, "IO error: {}", err),
            Error::ParseIntError(ref err) => write!(f, "Error parsing integer: {}", err),
            Error::MissingFile(ref info, ref opt_err) => {
                write!(f,
                    "The {} must already exist at this point but there was a problem opening it. \
                    Wrong directory? Maybe missed a step? The OS error was: ",
                    info)?;
                if let Some(ref err) = *opt_err { err.fmt(f) }
                else { write!(f, "Unknown") }
            },
            Error::InvalidDocument(ref info) => write!(f, "Invalid document: {}", info),
            Error::InvalidFormat(ref info) => write!(f, "Invalid file format: {}", info),
            Error::SampleTooLarge { requested, available } => write!(f,
                "Asked for a sample of {} documents but only {} are available",
                requested, available),
            Error::ValenceOutOfRange { value, floor, ceil } => write!(f,
                "Valence score {} is outside of the range [{}, {}]",
                value, floor, ceil),
            Error::InvalidRange(ref info) => write!(f, "Invalid range: {}", info),
            Error::JsonError(ref err) => write!(f, "JSON error: {}", err),
            Error::BincodeError(ref err) => write!(f, "Checkpoint encoding error: {}", err),
            Error::HttpError(ref err) => write!(f, "HTTP error: {}", err),
            Error::Other(ref info) => write!(f, "{}", info),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::IOError(ref err) => Some(err),
            Error::ParseIntError(ref err) => Some(err),
            Error::MissingFile(_, Some(ref err)) => Some(err),
            Error::JsonError(ref err) => Some(err),
            Error::BincodeError(ref err) => Some(err),
            Error::HttpError(ref err) => Some(err),
            _ => None,
        }
    }
}
//
// Convert everything else into Error
//
impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::IOError(err)
    }
}
impl From<num::ParseIntError> for Error {
    fn from(err: num::ParseIntError) -> Self {
        Error::ParseIntError(err)
    }
}
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::JsonError(err)
    }
}
impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::BincodeError(err)
    }
}
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::HttpError(err)
    }
}
impl From<tempfile::PersistError> for Error {
    fn from(err: tempfile::PersistError) -> Self {
        Error::IOError(err.error)
    }
}

