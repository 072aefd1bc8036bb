use super::r#trait::ActiveWindowTracker;
use std::time::{Duration, Instant};
use tracing::info;

const FAKE_PROCESSES: &[&str] = &["browser.exe", "terminal", "editor", "game"];

/// Эмуляция смены активного окна: имя процесса меняется каждые 10 секунд
pub struct DryRunTracker {
    started: Instant,
    period: Duration,
}

impl DryRunTracker {
    pub fn new() -> Self {
        info!("Dry-run режим - трекер окон работает в режиме эмуляции");
        Self::with_period(Duration::from_secs(10))
    }

    pub fn with_period(period: Duration) -> Self {
        Self {
            started: Instant::now(),
            period,
        }
    }

    fn index_at(&self, now: Instant) -> usize {
        let elapsed = now.saturating_duration_since(self.started).as_millis();
        let period = self.period.as_millis().max(1);
        ((elapsed / period) as usize) % FAKE_PROCESSES.len()
    }
}

impl Default for DryRunTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ActiveWindowTracker for DryRunTracker {
    fn get_active_process_name(&self) -> Option<String> {
        Some(FAKE_PROCESSES[self.index_at(Instant::now())].to_string())
    }

    fn backend_name(&self) -> &'static str {
        "dry-run"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycles_fake_processes() {
        let tracker = DryRunTracker::with_period(Duration::from_secs(10));
        let start = tracker.started;

        assert_eq!(tracker.index_at(start), 0);
        assert_eq!(tracker.index_at(start + Duration::from_secs(11)), 1);
        assert_eq!(tracker.index_at(start + Duration::from_secs(40)), 0);
        assert_eq!(tracker.get_active_process_name().as_deref(), Some("browser.exe"));
    }
}
