use crate::error::{RemapError, Result};
use crate::remap_error;
use serde_json::Value;
use std::process::Command;

pub struct SwayBackend;

impl SwayBackend {
    pub fn new() -> Self {
        Self
    }

    pub fn test(&self) -> Result<()> {
        let output = Command::new("swaymsg").args(["-t", "get_version"]).output()?;
        if output.status.success() {
            Ok(())
        } else {
            Err(RemapError::ServiceUnavailable("sway failed".to_string()))
        }
    }

    pub fn active_window_pid(&self) -> Result<u32> {
        let output = Command::new("swaymsg")
            .args(["-t", "get_tree"])
            .output()
            .map_err(|e| remap_error!(service_unavailable, "swaymsg не найден: {}", e))?;

        if !output.status.success() {
            return Err(RemapError::ServiceUnavailable("swaymsg вернул ошибку".to_string()));
        }

        let tree: Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| remap_error!(service_unavailable, "Неверный ответ swaymsg: {}", e))?;

        focused_pid(&tree)
            .ok_or_else(|| RemapError::ServiceUnavailable("Активное окно в Sway не найдено".to_string()))
    }
}

/// pid сфокусированного узла в дереве sway (обычные и плавающие окна)
pub(super) fn focused_pid(node: &Value) -> Option<u32> {
    if node.get("focused").and_then(Value::as_bool) == Some(true) {
        if let Some(pid) = node.get("pid").and_then(Value::as_u64) {
            return u32::try_from(pid).ok();
        }
    }

    ["nodes", "floating_nodes"]
        .iter()
        .filter_map(|key| node.get(*key).and_then(Value::as_array))
        .flatten()
        .find_map(focused_pid)
}
