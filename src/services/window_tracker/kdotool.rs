use crate::error::{RemapError, Result};
use crate::remap_error;
use std::process::Command;
use tracing::debug;

use super::xdotool::parse_pid;

/// Пользователь сессии, от имени которого нужно вызывать kdotool.
///
/// Под sudo KWin доступен только через сессионную шину исходного пользователя.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct SessionUser {
    name: String,
    runtime_dir: String,
}

impl SessionUser {
    fn from_env() -> Option<Self> {
        let name = std::env::var("SUDO_USER").ok().filter(|n| !n.is_empty())?;
        let output = Command::new("id").args(["-u", &name]).output().ok()?;
        let uid = String::from_utf8(output.stdout).ok()?;
        Some(Self::new(name, uid.trim()))
    }

    fn new(name: String, uid: &str) -> Self {
        Self {
            name,
            runtime_dir: format!("/run/user/{}", uid),
        }
    }

    fn bus_address(&self) -> String {
        format!("unix:path={}/bus", self.runtime_dir)
    }
}

pub struct KdotoolBackend {
    session: Option<SessionUser>,
}

impl KdotoolBackend {
    pub fn new() -> Self {
        let session = SessionUser::from_env();
        if let Some(user) = &session {
            debug!("kdotool будет вызываться от имени {} ({})", user.name, user.runtime_dir);
        }
        Self { session }
    }

    fn command(&self, args: &[&str]) -> Command {
        let Some(user) = &self.session else {
            let mut cmd = Command::new("kdotool");
            cmd.args(args);
            return cmd;
        };

        let mut cmd = Command::new("sudo");
        cmd.args(["-E", "-u", &user.name, "kdotool"])
            .args(args)
            .env("DBUS_SESSION_BUS_ADDRESS", user.bus_address())
            .env("XDG_RUNTIME_DIR", &user.runtime_dir)
            .env("USER", &user.name);
        cmd
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        let output = self
            .command(args)
            .output()
            .map_err(|e| remap_error!(service_unavailable, "kdotool не найден: {}", e))?;

        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).trim().to_string());
        }

        debug!("kdotool {:?}: {}", args, String::from_utf8_lossy(&output.stderr).trim());
        Err(remap_error!(service_unavailable, "kdotool {} завершился с ошибкой", args[0]))
    }

    pub fn test(&self) -> Result<()> {
        let pid = self.active_window_pid()?;
        debug!("kdotool отвечает, pid активного окна: {}", pid);
        Ok(())
    }

    pub fn active_window_pid(&self) -> Result<u32> {
        let window_id = self.run(&["getactivewindow"])?;
        if window_id.is_empty() {
            return Err(RemapError::ServiceUnavailable("kdotool: нет активного окна".to_string()));
        }

        let stdout = self.run(&["getwindowpid", &window_id])?;
        parse_pid(&stdout)
            .ok_or_else(|| RemapError::ServiceUnavailable("kdotool вернул неверный pid".to_string()))
    }
}
