use std::sync::OnceLock;
use std::time::Duration;
use tokio::time::Instant;

/// Time since the session started, frozen once stopped.
#[derive(Debug)]
pub struct SessionClock {
    started: Instant,
    stopped: OnceLock<Duration>,
}

impl SessionClock {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            stopped: OnceLock::new(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        match self.stopped.get() {
            Some(elapsed) => *elapsed,
            None => self.started.elapsed(),
        }
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed().as_secs()
    }

    pub fn stop(&self) {
        let _ = self.stopped.set(self.started.elapsed());
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.get().is_some()
    }

    pub fn display(&self) -> String {
        format_elapsed(self.elapsed_seconds())
    }
}

/// `m:ss`, minutes unbounded.
pub fn format_elapsed(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
