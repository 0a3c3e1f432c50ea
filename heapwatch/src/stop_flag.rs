use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tokio::{signal, sync::Notify};
use tracing::{info, warn};

/// Shared shutdown signal. Once stopped it stays stopped.
#[derive(Clone, Debug, Default)]
pub struct StopFlag {
    flag: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Resolves once [`StopFlag::stop`] has been called, including calls
    /// that happened before `wait` was polled.
    pub async fn wait(&self) {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        if self.is_stopped() {
            return;
        }
        notified.await;
    }
}

pub fn register_signal_handler(stop_flag: &StopFlag) {
    {
        let stop_flag = stop_flag.clone();
        tokio::spawn(async move {
            if let Err(e) = signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for Ctrl-C");
                return;
            }
            info!("Ctrl-C received, stopping monitor...");
            stop_flag.stop();
        });
    }
    #[cfg(unix)]
    {
        let stop_flag = stop_flag.clone();

        tokio::spawn(async move {
            let mut terminate =
                match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                    Ok(signal) => signal,
                    Err(e) => {
                        warn!(error = %e, "Failed to install terminate signal handler");
                        return;
                    }
                };
            terminate.recv().await;
            info!("Terminate signal received, stopping monitor...");
            stop_flag.stop();
        });
    }
}
