//! Everything needed to run playback outside the host application: logging,
//! library and scene files, and the async loop that ticks the player.

pub mod driver;
pub mod loader;
pub mod logging;
pub mod signal;

pub use driver::{DriverOptions, DriverSummary, run_until_idle};
pub use loader::{LoadError, load_library, load_scene, save_library};
pub use logging::init_logging;
pub use signal::{RenderSignal, render_signal_channel, setup_render_complete_signal};
