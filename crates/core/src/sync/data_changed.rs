//! Transient "data changed" broadcast raised after successful syncs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

/// Multi-reader flag that goes `true` on [`pulse`](Self::pulse) and falls back
/// to `false` on its own after `duration`. Observers never acknowledge it.
#[derive(Debug, Clone)]
pub struct DataChangedPulse {
    flag: Arc<watch::Sender<bool>>,
    generation: Arc<AtomicU64>,
    duration: Duration,
}

impl DataChangedPulse {
    pub fn new(duration: Duration) -> Self {
        let (flag, _) = watch::channel(false);
        Self {
            flag: Arc::new(flag),
            generation: Arc::new(AtomicU64::new(0)),
            duration,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.flag.subscribe()
    }

    pub fn is_raised(&self) -> bool {
        *self.flag.borrow()
    }

    /// Raises the flag. A pulse raised while another is still up extends it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn pulse(&self) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.flag.send_replace(true);

        let flag = Arc::clone(&self.flag);
        let current = Arc::clone(&self.generation);
        let duration = self.duration;
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            if current.load(Ordering::SeqCst) == generation {
                flag.send_replace(false);
            }
        });
    }
}
