use thiserror::Error;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(Box<ErrorKind>);

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.0.as_ref()
    }

    /// The container could not be opened, enumerated or read.
    pub fn storage_access(context: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::StorageAccess {
                context: context.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn missing_attribute(
        node: impl Into<String>,
        name: impl Into<String>,
        message: impl Into<String>,
    ) -> Error {
        Error(
            ErrorKind::MissingAttribute {
                node: node.into(),
                name: name.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn unsupported_column_type(
        column: impl Into<String>,
        stored_type: impl Into<String>,
    ) -> Error {
        Error(
            ErrorKind::UnsupportedColumnType {
                column: column.into(),
                stored_type: stored_type.into(),
            }
            .into(),
        )
    }

    pub fn unsupported_shape(column: impl Into<String>, dims: &[u64]) -> Error {
        Error(
            ErrorKind::UnsupportedShape {
                column: column.into(),
                dims: dims.to_vec(),
            }
            .into(),
        )
    }

    pub fn row_count_mismatch(column: impl Into<String>, expected: u64, actual: u64) -> Error {
        Error(
            ErrorKind::RowCountMismatch {
                column: column.into(),
                expected,
                actual,
            }
            .into(),
        )
    }

    pub fn unmapped_field(field: impl Into<String>) -> Error {
        Error(
            ErrorKind::UnmappedField {
                field: field.into(),
            }
            .into(),
        )
    }

    pub fn invalid_format(name: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidFormat {
                element: name.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn invalid_arg(name: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidArgument {
                name: name.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn invalid_operation(name: impl Into<String>) -> Error {
        Error(ErrorKind::InvalidOperation { name: name.into() }.into())
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Error {
        Error(
            ErrorKind::Io {
                context: context.into(),
                source,
            }
            .into(),
        )
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("storage access failed for '{context}': {message}")]
    StorageAccess { context: String, message: String },

    #[error("missing attribute '{name}' on '{node}': {message}")]
    MissingAttribute {
        node: String,
        name: String,
        message: String,
    },

    #[error("unsupported type {stored_type} of column '{column}'")]
    UnsupportedColumnType { column: String, stored_type: String },

    #[error("unsupported shape {dims:?} of column '{column}'")]
    UnsupportedShape { column: String, dims: Vec<u64> },

    #[error("column '{column}' has {actual} rows, expected {expected}")]
    RowCountMismatch {
        column: String,
        expected: u64,
        actual: u64,
    },

    #[error("no resolution rule for field '{field}'")]
    UnmappedField { field: String },

    #[error("invalid argument {name}: {message}")]
    InvalidArgument { name: String, message: String },

    #[error("invalid operation {name}")]
    InvalidOperation { name: String },

    #[error("invalid format for '{element}': {message}")]
    InvalidFormat { element: String, message: String },

    #[error("IO error for '{context}': {source}'")]
    Io {
        context: String,
        source: std::io::Error,
    },
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(kind.into())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::io("", e)
    }
}
