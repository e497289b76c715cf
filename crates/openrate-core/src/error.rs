use std::fmt;

/// Errors raised while parsing input at the edges of the engine.
///
/// Scoring itself never fails; these only come from turning external text
/// (tone names, timestamps, table files) into engine values.
#[derive(Debug)]
pub enum Error {
    UnknownTone(String),
    InvalidTimestamp(String),
    InvalidTables(String),
    TablesParse(toml::de::Error),
    TablesSerialize(toml::ser::Error),
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnknownTone(name) => {
                write!(f, "unknown tone '{name}' (expected professional, casual or exciting)")
            }
            Error::InvalidTimestamp(msg) => write!(f, "invalid timestamp: {msg}"),
            Error::InvalidTables(msg) => write!(f, "invalid scoring tables: {msg}"),
            Error::TablesParse(e) => write!(f, "failed to parse scoring tables: {e}"),
            Error::TablesSerialize(e) => write!(f, "failed to serialize scoring tables: {e}"),
            Error::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::TablesParse(e) => Some(e),
            Error::TablesSerialize(e) => Some(e),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::TablesParse(e)
    }
}

impl From<toml::ser::Error> for Error {
    fn from(e: toml::ser::Error) -> Self {
        Error::TablesSerialize(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
