use macroplay_core::HostError;
use macroplay_events::EventError;
use thiserror::Error;

/// First failure of a playback pass
///
/// Every variant except `MissingAction` and `NestingTooDeep` has already
/// flagged the action and the offending macro as alert when it is returned.
#[derive(Debug, Error)]
pub enum PlayError {
    #[error("malformed event in command {command}: {source}")]
    MalformedEvent {
        command: String,
        #[source]
        source: EventError,
    },

    #[error("{0} Object doesn't exist in the active view layer")]
    MissingObject(String),

    #[error("action {0} does not exist")]
    MissingAction(String),

    #[error("{source}; command: {command}")]
    Invocation { command: String, source: HostError },

    #[error("{0}")]
    Script(String),

    #[error("loop condition {statement} failed: {source}")]
    Condition { statement: String, source: HostError },

    #[error("{0}")]
    RecursionGuard(String),

    #[error("loop nesting deeper than {0} levels")]
    NestingTooDeep(usize),

    #[error("invalid loop range {start}..{end} by {step}")]
    InvalidLoopRange { start: f64, end: f64, step: f64 },
}
