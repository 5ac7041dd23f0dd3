//! Wire format of recorded macro commands
//!
//! A macro's `command` string is either a plain invocation expression
//! (`bpy.ops.object.delete()`, `bpy.context.scene.frame_current = 3`) or a
//! pseudo-event encoded as `ar.event:<json>`. This crate decodes both into
//! typed values once, so the player never re-interprets strings at dispatch
//! time.

pub mod classify;
pub mod command;
pub mod error;
pub mod payload;

pub use classify::{EventKind, MacroCommand, classify, is_event};
pub use command::{OperatorCall, PlainCommand, display_name, extract_properties};
pub use error::EventError;
pub use payload::{EventPayload, LoopEvent, LoopStatement, SelectObjectEvent};

/// Reserved prefix marking a pseudo-event command
pub const EVENT_PREFIX: &str = "ar.event";

/// Namespace of host operators
pub const OPERATOR_PREFIX: &str = "bpy.ops.";

/// Namespace of the ambient host context
pub const CONTEXT_PREFIX: &str = "bpy.context.";

/// Namespace of host data blocks, only used for display names
pub const DATA_PREFIX: &str = "bpy.data.";
