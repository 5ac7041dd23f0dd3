use std::collections::VecDeque;

use macroplay_core::ActionType;

/// An action waiting for the host to finish a render
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderWait {
    pub action_type: ActionType,
    pub action_id: String,
    /// Macro playback resumes from
    pub resume_macro_id: String,
}

/// Actions suspended on a `Render Complete` event, in arrival order
#[derive(Debug, Default)]
pub struct RenderCompleteQueue {
    entries: VecDeque<RenderWait>,
}

impl RenderCompleteQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(
        &mut self,
        action_type: ActionType,
        action_id: impl Into<String>,
        resume_macro_id: impl Into<String>,
    ) {
        self.entries.push_back(RenderWait {
            action_type,
            action_id: action_id.into(),
            resume_macro_id: resume_macro_id.into(),
        });
    }

    /// Remove every waiting entry, oldest first
    pub fn drain(&mut self) -> Vec<RenderWait> {
        self.entries.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_is_fifo_and_empties() {
        let mut queue = RenderCompleteQueue::new();
        queue.enqueue(ActionType::Global, "a", "m1");
        queue.enqueue(ActionType::Local, "b", "m2");

        let drained = queue.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].action_id, "a");
        assert_eq!(drained[1].resume_macro_id, "m2");
        assert!(queue.is_empty());
    }
}
