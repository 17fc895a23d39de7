/// Errors raised while building field descriptors and requests.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    /// The address string cannot be expressed as a field descriptor.
    #[error("invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    /// The data type name is not known.
    #[error("unknown data type '{0}'")]
    UnknownDataType(String),

    /// Field names identify results and must not be empty.
    #[error("field name must not be empty")]
    EmptyName,

    /// Two fields in one request share a name.
    #[error("duplicate field name '{0}' in request")]
    DuplicateField(String),

    /// A request must carry at least one field.
    #[error("request contains no fields")]
    EmptyRequest,
}

pub type Result<T> = std::result::Result<T, FieldError>;
