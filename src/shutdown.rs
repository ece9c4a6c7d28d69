//! Graceful shutdown coordinator.
//!
//! Listens for SIGINT (Ctrl+C), SIGTERM, and SIGHUP and cancels a
//! [`CancellationToken`]. The reorder loop checks it between folders, so the
//! folder in flight is finished and checkpointed before the run stops. A
//! second signal force-exits.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

/// Exit code used when a second signal forces the process down.
const FORCE_EXIT_CODE: i32 = 130;

/// Count one received signal. Returns `true` if the process should exit now.
fn on_signal(count: &AtomicU32, token: &CancellationToken) -> bool {
    if count.fetch_add(1, Ordering::SeqCst) == 0 {
        tracing::info!("Received shutdown signal, finishing current folder...");
        tracing::info!("Press Ctrl+C again to force exit");
        token.cancel();
        false
    } else {
        tracing::warn!("Force exit requested");
        true
    }
}

/// Install signal handlers and return a token cancelled on the first signal.
pub(crate) fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let count = Arc::new(AtomicU32::new(0));

    let handler_token = token.clone();
    tokio::spawn(async move {
        #[cfg(unix)]
        let (mut sigterm, mut sighup) = {
            use tokio::signal::unix::{signal, SignalKind};
            (
                signal(SignalKind::terminate()).expect("failed to register SIGTERM handler"),
                signal(SignalKind::hangup()).expect("failed to register SIGHUP handler"),
            )
        };

        loop {
            #[cfg(unix)]
            {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                    _ = sighup.recv() => {}
                }
            }

            #[cfg(not(unix))]
            {
                tokio::signal::ctrl_c()
                    .await
                    .expect("failed to listen for Ctrl+C");
            }

            if on_signal(&count, &handler_token) {
                std::process::exit(FORCE_EXIT_CODE);
            }
        }
    });

    token
}
