//! Completion polling: fixed-interval existence probes with a
//! locator-keyed single-flight guard.

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

/// Existence probe for an artifact locator.
///
/// `Ok(false)` means "not there yet". Errors are treated as transient and
/// retried on the next tick, since the artifact may simply not exist yet.
pub trait Probe {
    fn exists(&self, locator: &str) -> anyhow::Result<bool>;
}

/// HEAD-request probe against the server's report route.
pub struct HttpProbe {
    base: String,
    agent: ureq::Agent,
}

impl HttpProbe {
    pub fn new(base: String) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
            agent: ureq::Agent::new(),
        }
    }
}

impl Probe for HttpProbe {
    fn exists(&self, locator: &str) -> anyhow::Result<bool> {
        match self.agent.head(&format!("{}{}", self.base, locator)).call() {
            Ok(_) => Ok(true),
            // Any non-2xx status means the report is not ready yet.
            Err(ureq::Error::Status(_, _)) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// Outcome of a watch request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    /// The artifact exists. Reported exactly once per watch.
    Ready,
    /// A watch for the same locator is already in flight; nothing was done.
    AlreadyWatching,
}

/// Polls artifact locators until they exist.
///
/// At most one watch per locator may be in flight at a time; watches for
/// distinct locators proceed independently. There is deliberately no upper
/// bound on attempts: the loop runs until the probe succeeds or the caller
/// tears the process down, which means a locator that never materializes
/// is polled forever.
pub struct Watcher {
    interval: Duration,
    in_flight: Mutex<HashSet<String>>,
}

impl Watcher {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Blocks until the artifact at `locator` exists.
    ///
    /// Probe errors are swallowed and retried on the next tick. When the
    /// probe first reports existence, the guard for this locator is cleared
    /// so a later, unrelated audit of the same page can be watched again.
    pub fn wait_until_ready<P: Probe>(&self, locator: &str, probe: &P) -> WatchOutcome {
        {
            let mut in_flight = self.in_flight.lock().expect("watcher lock poisoned");
            if !in_flight.insert(locator.to_string()) {
                return WatchOutcome::AlreadyWatching;
            }
        }

        loop {
            match probe.exists(locator) {
                Ok(true) => break,
                Ok(false) => {}
                Err(e) => eprintln!("probe error (will retry): {}", e),
            }
            std::thread::sleep(self.interval);
        }

        self.in_flight
            .lock()
            .expect("watcher lock poisoned")
            .remove(locator);

        WatchOutcome::Ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Probe that reports existence from the `ready_on`-th attempt onward.
    struct ReadyAfter {
        attempts: AtomicUsize,
        ready_on: usize,
    }

    impl ReadyAfter {
        fn new(ready_on: usize) -> Self {
            Self {
                attempts: AtomicUsize::new(0),
                ready_on,
            }
        }

        fn attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }
    }

    impl Probe for ReadyAfter {
        fn exists(&self, _locator: &str) -> anyhow::Result<bool> {
            let n = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(n >= self.ready_on)
        }
    }

    /// Probe that never reports existence, counting attempts.
    struct NeverReady {
        attempts: Arc<AtomicUsize>,
    }

    impl Probe for NeverReady {
        fn exists(&self, _locator: &str) -> anyhow::Result<bool> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Ok(false)
        }
    }

    /// Probe that fails transiently before succeeding.
    struct FlakyThenReady {
        attempts: AtomicUsize,
        failures: usize,
    }

    impl Probe for FlakyThenReady {
        fn exists(&self, _locator: &str) -> anyhow::Result<bool> {
            let n = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if n <= self.failures {
                anyhow::bail!("connection refused");
            }
            Ok(true)
        }
    }

    #[test]
    fn test_ready_clears_guard_for_later_watches() {
        let watcher = Watcher::new(Duration::ZERO);

        let probe = ReadyAfter::new(5);
        assert_eq!(
            watcher.wait_until_ready("/reports/a.html", &probe),
            WatchOutcome::Ready
        );
        assert_eq!(probe.attempts(), 5);

        // The guard was cleared; a fresh watch for the same locator runs.
        let probe = ReadyAfter::new(1);
        assert_eq!(
            watcher.wait_until_ready("/reports/a.html", &probe),
            WatchOutcome::Ready
        );
    }

    #[test]
    fn test_duplicate_watch_for_same_locator_is_noop() {
        let watcher = Arc::new(Watcher::new(Duration::from_millis(5)));
        let attempts = Arc::new(AtomicUsize::new(0));

        let background = Arc::clone(&watcher);
        let background_attempts = Arc::clone(&attempts);
        std::thread::spawn(move || {
            let probe = NeverReady {
                attempts: background_attempts,
            };
            background.wait_until_ready("/reports/a.html", &probe);
        });

        // Let the background watch claim the guard.
        while attempts.load(Ordering::SeqCst) == 0 {
            std::thread::sleep(Duration::from_millis(1));
        }

        let probe = ReadyAfter::new(1);
        assert_eq!(
            watcher.wait_until_ready("/reports/a.html", &probe),
            WatchOutcome::AlreadyWatching
        );
        assert_eq!(probe.attempts(), 0);
    }

    #[test]
    fn test_distinct_locators_watch_concurrently() {
        let watcher = Arc::new(Watcher::new(Duration::from_millis(5)));
        let attempts = Arc::new(AtomicUsize::new(0));

        let background = Arc::clone(&watcher);
        let background_attempts = Arc::clone(&attempts);
        std::thread::spawn(move || {
            let probe = NeverReady {
                attempts: background_attempts,
            };
            background.wait_until_ready("/reports/a.html", &probe);
        });

        while attempts.load(Ordering::SeqCst) == 0 {
            std::thread::sleep(Duration::from_millis(1));
        }

        // A different locator is not blocked by the in-flight watch.
        let probe = ReadyAfter::new(1);
        assert_eq!(
            watcher.wait_until_ready("/reports/b.html", &probe),
            WatchOutcome::Ready
        );
    }

    #[test]
    fn test_probe_errors_are_swallowed_and_retried() {
        let watcher = Watcher::new(Duration::ZERO);
        let probe = FlakyThenReady {
            attempts: AtomicUsize::new(0),
            failures: 3,
        };

        assert_eq!(
            watcher.wait_until_ready("/reports/a.html", &probe),
            WatchOutcome::Ready
        );
        assert_eq!(probe.attempts.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_never_ready_locator_keeps_polling() {
        // The loop has no attempt bound on purpose; verify it is still
        // probing well past any reasonable cutoff rather than giving up.
        let watcher = Arc::new(Watcher::new(Duration::from_millis(1)));
        let attempts = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicBool::new(false));

        let background = Arc::clone(&watcher);
        let background_attempts = Arc::clone(&attempts);
        let background_finished = Arc::clone(&finished);
        std::thread::spawn(move || {
            let probe = NeverReady {
                attempts: background_attempts,
            };
            background.wait_until_ready("/reports/never.html", &probe);
            background_finished.store(true, Ordering::SeqCst);
        });

        std::thread::sleep(Duration::from_millis(150));
        assert!(!finished.load(Ordering::SeqCst));
        assert!(attempts.load(Ordering::SeqCst) > 20);
    }
}
