use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Granularity of [`ShutdownSignal::sleep`].
const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// Shared shutdown flag handed to a worker body.
///
/// Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    flag: Arc<AtomicBool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown.
    pub fn request(&self) {
        self.set(true);
    }

    /// Set or clear the flag.
    pub fn set(&self, requested: bool) {
        self.flag.store(requested, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// The raw flag, for blocking calls that take a cancel flag.
    pub fn as_flag(&self) -> &AtomicBool {
        &self.flag
    }

    /// Sleep for up to `duration`, waking early once shutdown is requested.
    ///
    /// Returns `true` if shutdown was requested.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_requested() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            std::thread::sleep((deadline - now).min(SLEEP_SLICE));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let signal = ShutdownSignal::new();
        let clone = signal.clone();
        assert!(!clone.is_requested());
        signal.request();
        assert!(clone.is_requested());
        assert!(clone.as_flag().load(Ordering::SeqCst));
        clone.set(false);
        assert!(!signal.is_requested());
    }

    #[test]
    fn sleep_runs_full_duration_without_request() {
        let signal = ShutdownSignal::new();
        let started = Instant::now();
        assert!(!signal.sleep(Duration::from_millis(120)));
        assert!(started.elapsed() >= Duration::from_millis(120));
    }

    #[test]
    fn sleep_wakes_early_on_request() {
        let signal = ShutdownSignal::new();
        let requester = signal.clone();
        let started = Instant::now();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            requester.request();
        });
        assert!(signal.sleep(Duration::from_secs(30)));
        assert!(started.elapsed() < Duration::from_secs(5));
        handle.join().unwrap();
    }
}
