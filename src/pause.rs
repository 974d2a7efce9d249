use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tokio::task::JoinHandle;

/// Single-slot "pause requested" flag shared between the signal listener and
/// the sampling loop. Setting it twice before the loop polls is one request.
#[derive(Clone, Debug, Default)]
pub struct PauseFlag {
    requested: Arc<AtomicBool>,
}

impl PauseFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.requested.store(true, Ordering::Release);
    }

    /// Consume a pending request, if any.
    pub fn take(&self) -> bool {
        self.requested.swap(false, Ordering::AcqRel)
    }
}

/// Route SIGUSR1 to `flag`. The listener does nothing but set the flag; the
/// loop applies it on its next tick.
pub fn listen_for_pause(flag: PauseFlag) -> std::io::Result<JoinHandle<()>> {
    let mut usr1 = signal(SignalKind::user_defined1())?;
    Ok(tokio::spawn(async move {
        while usr1.recv().await.is_some() {
            flag.request();
        }
    }))
}
