use parking_lot::Mutex;
use std::collections::BTreeSet;
use sysinfo::{Pid, System};
use tracing::debug;

/// Преобразование pid в имя исполняемого файла
pub struct ProcessNameResolver {
    system: Mutex<System>,
}

impl ProcessNameResolver {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }

    /// `None`, если процесс успел завершиться между запросом окна и запросом имени
    pub fn name_of(&self, pid: u32) -> Option<String> {
        let pid = Pid::from_u32(pid);
        let mut system = self.system.lock();

        if !system.refresh_process(pid) {
            debug!("Процесс {} не найден", pid);
            return None;
        }

        system
            .process(pid)
            .map(|process| process.name().to_string())
            .filter(|name| !name.is_empty())
    }
}

impl Default for ProcessNameResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Уникальные имена запущенных процессов, отсортированные.
/// Фильтр сравнивается без учета регистра.
pub fn running_processes(filter: Option<&str>) -> Vec<String> {
    let mut system = System::new();
    system.refresh_processes();

    let names = system
        .processes()
        .values()
        .map(|process| process.name().to_string())
        .filter(|name| !name.is_empty());

    filter_names(names, filter)
}

fn filter_names(names: impl Iterator<Item = String>, filter: Option<&str>) -> Vec<String> {
    let filter = filter.map(str::to_lowercase).filter(|f| !f.is_empty());

    names
        .filter(|name| match &filter {
            Some(f) => name.to_lowercase().contains(f.as_str()),
            None => true,
        })
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
