use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::cache::Cache;

struct Signal {
    stop: Mutex<bool>,
    condvar: Condvar,
}

/// Wakes on `cleanup_interval_ms` and sweeps expired entries. Stopped and joined
/// during service-container teardown before the cache's owning slot is cleared.
/// A condvar (rather than a plain sleep) lets `stop` interrupt a long interval
/// immediately instead of waiting out the remainder of the sleep.
pub struct CleanupWorker {
    signal: Arc<Signal>,
    handle: Option<JoinHandle<()>>,
}

impl CleanupWorker {
    pub fn spawn(cache: Arc<Cache>, interval: Duration) -> Self {
        let signal = Arc::new(Signal { stop: Mutex::new(false), condvar: Condvar::new() });
        let worker_signal = signal.clone();

        let handle = std::thread::spawn(move || loop {
            let guard = worker_signal.stop.lock().expect("cache worker mutex poisoned");
            let (guard, timed_out) = worker_signal
                .condvar
                .wait_timeout(guard, interval)
                .expect("cache worker mutex poisoned");

            if *guard {
                return;
            }
            drop(guard);

            if timed_out.timed_out() {
                let removed = cache.cleanup_expired();
                if removed > 0 {
                    log::debug!("[CACHE] swept {removed} expired entries");
                }
            }
        });

        Self { signal, handle: Some(handle) }
    }

    pub fn stop(&mut self) {
        *self.signal.stop.lock().expect("cache worker mutex poisoned") = true;
        self.signal.condvar.notify_one();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for CleanupWorker {
    fn drop(&mut self) {
        self.stop();
    }
}
