use crate::error::{RemapError, Result};
use crate::mappings::{KeyChord, KeyDescriptor};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Решение обработчика по перехваченному нажатию
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Пропустить исходное нажатие без изменений
    Forward,
    /// Поглотить нажатие (действие уже выполнено)
    Suppress,
}

pub type HotkeyHandler = Arc<dyn Fn() -> Verdict + Send + Sync>;

/// Регистрация глобальных перехватчиков клавиш
pub trait HotkeyBackend: Send + Sync {
    fn register(&self, key: &KeyDescriptor, handler: HotkeyHandler) -> Result<()>;
    fn unregister(&self, key: &KeyDescriptor) -> Result<()>;
}

struct Interceptor {
    key: KeyDescriptor,
    handler: HotkeyHandler,
}

/// Таблица перехвата, которую читает слушатель клавиатуры.
///
/// Один аккорд - один перехватчик. Зарезервированные системные комбинации
/// зарегистрировать нельзя.
pub struct InterceptTable {
    entries: DashMap<KeyChord, Interceptor>,
    reserved: HashSet<KeyChord>,
}

impl InterceptTable {
    pub fn new(reserved_keys: &[String]) -> Self {
        let reserved = reserved_keys
            .iter()
            .filter_map(|raw| match KeyDescriptor::parse(raw) {
                Ok(key) => Some(key.chord()),
                Err(e) => {
                    warn!("Пропускаем зарезервированную комбинацию '{}': {}", raw, e);
                    None
                }
            })
            .collect();

        Self {
            entries: DashMap::new(),
            reserved,
        }
    }

    /// Обработчик для аккорда. Блокировка таблицы снимается до вызова обработчика.
    pub fn lookup(&self, chord: &KeyChord) -> Option<HotkeyHandler> {
        self.entries.get(chord).map(|entry| Arc::clone(&entry.handler))
    }

    pub fn fire(&self, chord: &KeyChord) -> Option<Verdict> {
        self.lookup(chord).map(|handler| handler())
    }

    pub fn is_registered(&self, key: &KeyDescriptor) -> bool {
        self.entries.contains_key(&key.chord())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn registered_keys(&self) -> Vec<KeyDescriptor> {
        let mut keys: Vec<KeyDescriptor> = self.entries.iter().map(|e| e.key.clone()).collect();
        keys.sort();
        keys
    }

    /// Все обработчики по порядку клавиш (для dry-run эмуляции)
    pub fn handlers(&self) -> Vec<(KeyDescriptor, HotkeyHandler)> {
        let mut handlers: Vec<(KeyDescriptor, HotkeyHandler)> = self
            .entries
            .iter()
            .map(|e| (e.key.clone(), Arc::clone(&e.handler)))
            .collect();
        handlers.sort_by(|a, b| a.0.cmp(&b.0));
        handlers
    }
}

impl HotkeyBackend for InterceptTable {
    fn register(&self, key: &KeyDescriptor, handler: HotkeyHandler) -> Result<()> {
        let chord = key.chord();

        if self.reserved.contains(&chord) {
            return Err(RemapError::registration(key, "комбинация зарезервирована системой"));
        }

        match self.entries.entry(chord) {
            Entry::Occupied(existing) => Err(RemapError::registration(
                key,
                format!("уже занято назначением '{}'", existing.get().key),
            )),
            Entry::Vacant(slot) => {
                slot.insert(Interceptor {
                    key: key.clone(),
                    handler,
                });
                debug!("Перехватчик для '{}' зарегистрирован", key);
                Ok(())
            }
        }
    }

    fn unregister(&self, key: &KeyDescriptor) -> Result<()> {
        match self.entries.remove(&key.chord()) {
            Some(_) => {
                debug!("Перехватчик для '{}' снят", key);
                Ok(())
            }
            None => Err(RemapError::registration(key, "не зарегистрировано")),
        }
    }
}
