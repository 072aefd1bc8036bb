use crate::config::MatchMode;

/// Сравнение имени активного процесса с целевым
#[derive(Debug, Clone, Copy)]
pub struct ProcessMatcher {
    mode: MatchMode,
}

impl ProcessMatcher {
    pub fn new(mode: MatchMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    pub fn matches(&self, active: &str, target: &str) -> bool {
        match self.mode {
            MatchMode::Lenient => matches_lenient(active, target),
            MatchMode::Strict => matches_strict(active, target),
        }
    }
}

impl Default for ProcessMatcher {
    fn default() -> Self {
        Self::new(MatchMode::Lenient)
    }
}

/// Мягкое сравнение без учета регистра: равенство, префикс, суффикс или
/// вхождение в любую сторону. Очень короткая цель совпадает почти со всем.
pub fn matches_lenient(active: &str, target: &str) -> bool {
    let active = active.to_lowercase();
    let target = target.to_lowercase();

    active == target
        || active.starts_with(&target)
        || active.ends_with(&target)
        || active.contains(&target)
        || target.contains(&active)
}

/// Строгое сравнение: равенство без учета регистра и суффикса ".exe"
pub fn matches_strict(active: &str, target: &str) -> bool {
    strip_exe(&active.to_lowercase()) == strip_exe(&target.to_lowercase())
}

fn strip_exe(name: &str) -> &str {
    name.strip_suffix(".exe").unwrap_or(name)
}
