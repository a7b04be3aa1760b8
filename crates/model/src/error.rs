use thiserror::Error;

/// Errors raised while reading a JSON Schema document into a [`SchemaType`] tree.
///
/// [`SchemaType`]: crate::core::schema::SchemaType
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Schema node must be a JSON object, got: {0}")]
    NotAnObject(String),

    #[error("Unsupported schema type '{0}'")]
    UnsupportedType(String),

    #[error("Invalid 'type' declaration: {0}")]
    InvalidTypeDeclaration(String),

    #[error("Array schema at '{0}' has no 'items'")]
    MissingItems(String),
}
