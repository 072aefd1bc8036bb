use std::fmt;
use std::time::{Duration, Instant};

/// Неизменяемый снимок состояния активного процесса.
///
/// Снимок заменяется целиком под одной блокировкой: читатель никогда не видит
/// флаг совпадения в паре с чужой меткой времени или чужой целью.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveProcessState {
    pub current_process_name: Option<String>,
    pub target_process_name: String,
    pub is_match: bool,
    /// `None` - кэш сброшен (например, после смены цели)
    pub last_checked: Option<Instant>,
    /// Увеличивается при каждой смене целевого процесса
    pub generation: u64,
}

impl ActiveProcessState {
    pub fn new(target_process_name: impl Into<String>) -> Self {
        Self {
            current_process_name: None,
            target_process_name: target_process_name.into(),
            is_match: false,
            last_checked: None,
            generation: 0,
        }
    }

    /// Результат свежей проверки для той же цели
    pub fn checked(&self, current_process_name: Option<String>, is_match: bool, at: Instant) -> Self {
        Self {
            current_process_name,
            target_process_name: self.target_process_name.clone(),
            is_match,
            last_checked: Some(at),
            generation: self.generation,
        }
    }

    /// Новая цель со сброшенным кэшем
    pub fn retargeted(&self, target_process_name: impl Into<String>) -> Self {
        Self {
            current_process_name: self.current_process_name.clone(),
            target_process_name: target_process_name.into(),
            is_match: false,
            last_checked: None,
            generation: self.generation + 1,
        }
    }

    /// Кэш свежий, если проверка была не раньше чем `ttl` назад
    pub fn is_fresh(&self, ttl: Duration, now: Instant) -> bool {
        self.last_checked
            .map(|at| now.saturating_duration_since(at) < ttl)
            .unwrap_or(false)
    }
}

/// Статус мониторинга для отображения пользователю
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorStatus {
    pub current_process: Option<String>,
    pub target_process: String,
    pub is_target_active: bool,
    pub monitor_running: bool,
}

impl fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let icon = if self.is_target_active { "✅" } else { "❌" };
        let name = self.current_process.as_deref().unwrap_or("Не определен");
        write!(f, "{} {}", icon, name)
    }
}
