use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Delay before an action resumes after a render finished (default: 100ms)
    #[serde(default = "default_render_resume_delay")]
    pub render_resume_delay_ms: u64,

    /// Driver loop cadence (default: 50ms)
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,

    /// Deepest allowed nesting of loop bodies
    #[serde(default = "default_max_nesting_depth")]
    pub max_nesting_depth: usize,
}

fn default_render_resume_delay() -> u64 {
    100
}

fn default_tick_interval() -> u64 {
    50
}

fn default_max_nesting_depth() -> usize {
    64
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            render_resume_delay_ms: default_render_resume_delay(),
            tick_interval_ms: default_tick_interval(),
            max_nesting_depth: default_max_nesting_depth(),
        }
    }
}

impl PlayerConfig {
    pub fn render_resume_delay(&self) -> Duration {
        Duration::from_millis(self.render_resume_delay_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        // A zero period would make the driver spin
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}
