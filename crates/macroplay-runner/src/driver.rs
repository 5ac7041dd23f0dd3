use std::time::Duration;

use macroplay_core::ActionLibrary;
use macroplay_host::timer::FAR_FUTURE;
use macroplay_host::{Host, Player};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::signal::RenderSignal;

/// How the driver loop paces and ends playback
#[derive(Debug, Clone)]
pub struct DriverOptions {
    /// Pause between ticks of the player
    pub tick_interval: Duration,
    /// Report a finished render this long after playback starts waiting for one
    pub render_complete_after: Option<Duration>,
    /// Give up after this long even if continuations are still scheduled
    pub timeout: Option<Duration>,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(50),
            render_complete_after: None,
            timeout: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct DriverSummary {
    pub ticks: usize,
    pub resumed: usize,
    pub skipped: usize,
    /// Resumed passes that failed, with their action id and error message
    pub failures: Vec<(String, String)>,
    pub renders_signalled: usize,
    /// Render waits still queued when the loop ended
    pub waiting_for_render: usize,
    pub timed_out: bool,
}

/// `now + delay`, saturating at a far-future instant
fn later(delay: Duration) -> tokio::time::Instant {
    let now = tokio::time::Instant::now();
    now.checked_add(delay)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

/// Wait for the next render signal; pending forever without a source
///
/// Returns `false` once the sending side is gone.
async fn next_render_signal(rx: &mut Option<watch::Receiver<Option<RenderSignal>>>) -> bool {
    match rx {
        Some(rx) => rx.changed().await.is_ok(),
        None => std::future::pending().await,
    }
}

/// Tick the player until nothing is scheduled and no render wait can complete
///
/// Render waits are released either by `render_signal` or, when
/// `render_complete_after` is set, by a simulated render finishing after
/// that delay.
pub async fn run_until_idle(
    player: &mut Player,
    host: &mut dyn Host,
    library: &mut ActionLibrary,
    options: &DriverOptions,
    mut render_signal: Option<watch::Receiver<Option<RenderSignal>>>,
) -> DriverSummary {
    let started = tokio::time::Instant::now();
    let tick_interval = options.tick_interval.max(Duration::from_millis(1));
    let mut render_deadline: Option<tokio::time::Instant> = None;
    let mut summary = DriverSummary::default();

    loop {
        let report = player.tick(host, library, std::time::Instant::now());
        summary.ticks += 1;
        summary.resumed += report.resumed;
        summary.skipped += report.skipped;
        summary.failures.extend(
            report
                .failures
                .into_iter()
                .map(|(action_id, err)| (action_id, err.to_string())),
        );

        if player.is_idle() {
            if player.render_queue().is_empty() {
                debug!(target: "playback", "Player idle after {} ticks", summary.ticks);
                break;
            }
            if render_signal.is_none() && options.render_complete_after.is_none() {
                warn!(
                    target: "playback",
                    "{} action(s) wait for a render that nothing will report",
                    player.render_queue().len()
                );
                break;
            }
            if let Some(after) = options.render_complete_after
                && render_deadline.is_none()
            {
                render_deadline = Some(later(after));
            }
        }

        if let Some(timeout) = options.timeout
            && started.elapsed() >= timeout
        {
            warn!(
                target: "playback",
                "Playback timed out with {} scheduled and {} waiting for render",
                player.pending(),
                player.render_queue().len()
            );
            summary.timed_out = true;
            break;
        }

        let mut wake = later(tick_interval);
        if let Some(deadline) = render_deadline {
            wake = wake.min(deadline);
        }

        let signalled = tokio::select! {
            _ = tokio::time::sleep_until(wake) => None,
            alive = next_render_signal(&mut render_signal) => Some(alive),
        };

        match signalled {
            Some(true) => {
                info!(target: "playback", "Render complete");
                summary.renders_signalled += 1;
                player.render_complete(library);
            }
            Some(false) => {
                debug!(target: "playback", "Render signal source closed");
                render_signal = None;
            }
            None => {}
        }

        if let Some(deadline) = render_deadline
            && tokio::time::Instant::now() >= deadline
        {
            render_deadline = None;
            info!(target: "playback", "Simulated render complete");
            summary.renders_signalled += 1;
            player.render_complete(library);
        }
    }

    summary.waiting_for_render = player.render_queue().len();
    summary
}
