//! Macro playback engine
//!
//! The [`Player`] walks an action's macros against a [`Host`], suspending on
//! timers and render waits and resuming when the embedding application ticks
//! it. Suspended playback lives in explicit [`Continuation`] values owned by a
//! [`Scheduler`]; nothing is kept on the call stack between passes.

pub mod continuation;
pub mod error;
pub mod host;
pub mod player;
pub mod render_queue;
pub mod resolver;
pub mod scene;
pub mod scheduler;
pub mod timer;

pub use continuation::{Continuation, LoopFrame};
pub use error::PlayError;
pub use host::{Host, Invocation, ScriptUnit};
pub use player::{PlayOutcome, Player, TickReport};
pub use render_queue::{RenderCompleteQueue, RenderWait};
pub use resolver::{ResolvedContext, resolve, restore};
pub use scene::{CommandHandler, CommandRegistry, JournalEntry, SceneHost, SceneObject, SceneState};
pub use scheduler::Scheduler;
pub use timer::{TimerId, TimerQueue};
