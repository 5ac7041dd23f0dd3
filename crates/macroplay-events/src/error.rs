use thiserror::Error;

/// Errors raised while decoding a macro command
#[derive(Debug, Error)]
pub enum EventError {
    /// The payload after the prefix is not valid JSON or does not match the event shape
    #[error("malformed event payload: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The payload has no usable `Type` discriminant
    #[error("unknown event type: {0}")]
    UnknownType(String),

    /// A field required by the event's statement type is absent
    #[error("{kind} event is missing field '{field}'")]
    MissingField {
        kind: &'static str,
        field: &'static str,
    },
}
