use crate::error::{RemapError, Result};
use std::process::Command;
use tracing::debug;

pub struct XdotoolBackend;

impl XdotoolBackend {
    pub fn new() -> Self {
        Self
    }

    pub fn test(&self) -> Result<()> {
        self.active_window_pid().map(|_| ())
    }

    pub fn active_window_pid(&self) -> Result<u32> {
        let output = Command::new("xdotool")
            .args(["getactivewindow", "getwindowpid"])
            .output()
            .map_err(|e| {
                debug!("xdotool не найден или не работает: {}", e);
                RemapError::ServiceUnavailable(format!("xdotool не найден: {}", e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!("xdotool вернул ошибку: {}", stderr);
            return Err(RemapError::ServiceUnavailable(format!(
                "xdotool вернул ошибку: {}",
                stderr.trim()
            )));
        }

        parse_pid(&String::from_utf8_lossy(&output.stdout))
            .ok_or_else(|| RemapError::ServiceUnavailable("xdotool вернул неверный pid".to_string()))
    }
}

/// Первая строка вывода как pid
pub(super) fn parse_pid(stdout: &str) -> Option<u32> {
    stdout
        .lines()
        .next()
        .and_then(|line| line.trim().parse::<u32>().ok())
        .filter(|&pid| pid > 0)
}
