use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, NbtError>;

#[derive(Debug, Error)]
pub enum NbtError {
    #[error("invalid tag type: {0}")]
    InvalidTag(u8),
    #[error("truncated data: {0}")]
    TruncatedData(String),
    #[error("unsupported type: {0}")]
    UnsupportedType(String),
    #[error("invalid UTF-8 in string: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
    #[error("tag nesting exceeds {0} levels")]
    DepthLimit(usize),
    #[error("missing field `{0}`")]
    MissingField(String),
    #[error("field `{field}` should be {expected}, found {found}")]
    WrongType {
        field: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("unknown field `{0}`")]
    UnknownField(String),
    #[error("IO error: {0}")]
    Io(io::Error),
}

impl From<io::Error> for NbtError {
    fn from(err: io::Error) -> Self {
        // Any short read inside a payload means a declared length overran the stream.
        if err.kind() == io::ErrorKind::UnexpectedEof {
            NbtError::TruncatedData(err.to_string())
        } else {
            NbtError::Io(err)
        }
    }
}
