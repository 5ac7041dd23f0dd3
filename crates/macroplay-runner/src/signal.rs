use tokio::sync::watch;
use tracing::info;

/// Render-complete signal type (empty - just signals that a render finished)
#[derive(Debug, Clone)]
pub struct RenderSignal;

/// Channel carrying render-complete signals to the driver
pub fn render_signal_channel() -> (
    watch::Sender<Option<RenderSignal>>,
    watch::Receiver<Option<RenderSignal>>,
) {
    watch::channel(None)
}

/// Create a render-complete channel and spawn a SIGUSR1 handler feeding it
///
/// Must be called from within a tokio runtime.
#[cfg(unix)]
pub fn setup_render_complete_signal() -> watch::Receiver<Option<RenderSignal>> {
    let (render_tx, render_rx) = render_signal_channel();

    tokio::spawn(async move {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigusr1 = match signal(SignalKind::user_defined1()) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(target: "playback", "Failed to register SIGUSR1 handler: {}", e);
                return;
            }
        };

        loop {
            if sigusr1.recv().await.is_none() {
                break;
            }
            info!(target: "playback", "Received SIGUSR1 - render complete");

            if render_tx.send(Some(RenderSignal)).is_err() {
                info!(target: "playback", "Render signal receiver dropped, shutting down SIGUSR1 handler");
                break;
            }
        }
    });

    render_rx
}

/// Create a render-complete channel (non-Unix platforms don't support SIGUSR1)
#[cfg(not(unix))]
pub fn setup_render_complete_signal() -> watch::Receiver<Option<RenderSignal>> {
    let (render_tx, render_rx) = render_signal_channel();
    tracing::warn!(target: "playback", "SIGUSR1 render signal not supported on this platform");
    // Keep the sender alive but never send signals
    std::mem::forget(render_tx);
    render_rx
}
