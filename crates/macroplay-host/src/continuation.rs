//! Resumable playback state

use macroplay_core::{ActionType, Macro, SurfaceContext};

/// Bookkeeping of one active counted loop
#[derive(Debug, Clone, PartialEq)]
pub struct LoopFrame {
    /// Full loop body, replayed from the start on every iteration
    pub body: Vec<Macro>,
    /// Iterations still to run, the current one included
    pub remaining: i64,
    /// Macros following the loop's `EndLoop`
    pub after: Vec<Macro>,
}

/// Everything needed to resume a suspended playback pass
#[derive(Debug, Clone, PartialEq)]
pub struct Continuation {
    pub action_type: ActionType,
    pub action_id: String,
    /// Active macros still to run in this pass
    pub macros: Vec<Macro>,
    /// Counted loops enclosing `macros`, innermost last
    pub loops: Vec<LoopFrame>,
    /// Surface captured when the pass was suspended
    pub context: Option<SurfaceContext>,
    /// A fresh pass pre-scans its macros for render waits
    pub fresh: bool,
    /// Nesting depth of conditional and range loop bodies
    pub depth: usize,
}

impl Continuation {
    /// Start of a new top-level pass over an action's active macros
    pub fn start<'a>(
        action_type: ActionType,
        action_id: impl Into<String>,
        macros: impl IntoIterator<Item = &'a Macro>,
    ) -> Self {
        Self {
            action_type,
            action_id: action_id.into(),
            macros: macros.into_iter().filter(|m| m.active).cloned().collect(),
            loops: Vec::new(),
            context: None,
            fresh: true,
            depth: 0,
        }
    }

    /// Same action and loop state, different macros
    pub fn with_macros(&self, macros: Vec<Macro>, loops: Vec<LoopFrame>) -> Self {
        Self {
            action_type: self.action_type,
            action_id: self.action_id.clone(),
            macros,
            loops,
            context: self.context,
            fresh: false,
            depth: self.depth,
        }
    }

    /// A self-contained pass over a loop body, one level deeper
    pub fn nested(&self, body: Vec<Macro>) -> Self {
        Self {
            depth: self.depth + 1,
            ..self.with_macros(body, Vec::new())
        }
    }
}
