use crate::config::ProfileConfig;
use crate::error::Result;
use crate::mappings::{ActionDescriptor, KeyDescriptor};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Источник назначений для ядра перехвата: профиль, конфигурация, UI.
pub trait MappingSource: Send + Sync {
    fn get_mapping_for_key(&self, key: &KeyDescriptor) -> Option<ActionDescriptor>;
    fn get_target_process_name(&self) -> String;
    fn mappings(&self) -> Vec<(KeyDescriptor, ActionDescriptor)>;
}

/// Профиль: целевой процесс и назначения клавиш
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub name: String,
    pub target_process: String,
    mappings: BTreeMap<KeyDescriptor, ActionDescriptor>,
}

impl Profile {
    pub fn new(name: impl Into<String>, target_process: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target_process: target_process.into(),
            mappings: BTreeMap::new(),
        }
    }

    /// Собрать профиль из конфигурации. Неверные назначения пропускаются с предупреждением.
    pub fn from_config(name: &str, config: &ProfileConfig) -> Self {
        let mut profile = Self::new(name, config.target_process.trim());

        for (raw_key, raw_action) in &config.mappings {
            let key = match KeyDescriptor::parse(raw_key) {
                Ok(key) => key,
                Err(e) => {
                    warn!("Профиль '{}': пропускаем назначение '{}': {}", name, raw_key, e);
                    continue;
                }
            };
            let action = match ActionDescriptor::parse(raw_action) {
                Ok(action) => action,
                Err(e) => {
                    warn!("Профиль '{}': пропускаем назначение '{}': {}", name, raw_key, e);
                    continue;
                }
            };
            if !profile.add_mapping(key.clone(), action) {
                warn!("Профиль '{}': '{}' задано несколько раз, используется последнее", name, key);
            }
        }

        debug!("Профиль '{}' загружен: {} назначений", name, profile.len());
        profile
    }

    /// Добавляет назначение. Возвращает true, если клавиша новая, false - если перезаписана.
    pub fn add_mapping(&mut self, key: KeyDescriptor, action: ActionDescriptor) -> bool {
        self.mappings.insert(key, action).is_none()
    }

    /// Разбирает строки и добавляет назначение
    pub fn add_raw_mapping(&mut self, key: &str, action: &str) -> Result<bool> {
        let key = KeyDescriptor::parse(key)?;
        let action = ActionDescriptor::parse(action)?;
        Ok(self.add_mapping(key, action))
    }

    pub fn remove_mapping(&mut self, key: &KeyDescriptor) -> bool {
        self.mappings.remove(key).is_some()
    }

    pub fn get_mapping(&self, key: &KeyDescriptor) -> Option<&ActionDescriptor> {
        self.mappings.get(key)
    }

    pub fn has_mapping(&self, key: &KeyDescriptor) -> bool {
        self.mappings.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&KeyDescriptor, &ActionDescriptor)> {
        self.mappings.iter()
    }

    /// Поиск: все слова запроса должны встречаться в строке "клавиша действие"
    pub fn search(&self, query: &str) -> Vec<(&KeyDescriptor, &ActionDescriptor)> {
        let terms: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
        if terms.is_empty() {
            return Vec::new();
        }

        self.mappings
            .iter()
            .filter(|(key, action)| {
                let haystack = format!("{} {}", key, action).to_lowercase();
                terms.iter().all(|term| haystack.contains(term.as_str()))
            })
            .collect()
    }
}

impl MappingSource for Profile {
    fn get_mapping_for_key(&self, key: &KeyDescriptor) -> Option<ActionDescriptor> {
        self.get_mapping(key).cloned()
    }

    fn get_target_process_name(&self) -> String {
        self.target_process.clone()
    }

    fn mappings(&self) -> Vec<(KeyDescriptor, ActionDescriptor)> {
        self.mappings
            .iter()
            .map(|(key, action)| (key.clone(), action.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> KeyDescriptor {
        KeyDescriptor::parse(s).unwrap()
    }

    #[test]
    fn test_from_config_skips_invalid() {
        let mut config = ProfileConfig::default();
        config.target_process = " chrome ".to_string();
        config.mappings.insert("ctrl+t".into(), "\"New Tab\"".into());
        config.mappings.insert("hyper+x".into(), "\"bad key\"".into());
        config.mappings.insert("f1".into(), "".into());

        let profile = Profile::from_config("work", &config);
        assert_eq!(profile.target_process, "chrome");
        assert_eq!(profile.len(), 1);
        assert_eq!(
            profile.get_mapping(&key("ctrl+t")),
            Some(&ActionDescriptor::LiteralText("New Tab".into()))
        );
    }

    #[test]
    fn test_readding_replaces_action() {
        let mut profile = Profile::new("p", "x");
        assert!(profile.add_raw_mapping("Ctrl+T", "\"one\"").unwrap());
        assert!(!profile.add_raw_mapping("ctrl+t", "\"two\"").unwrap());
        assert_eq!(profile.len(), 1);
        assert_eq!(
            profile.get_mapping_for_key(&key("ctrl+t")),
            Some(ActionDescriptor::LiteralText("two".into()))
        );
    }

    #[test]
    fn test_remove_mapping() {
        let mut profile = Profile::new("p", "x");
        profile.add_raw_mapping("f1", "date_long").unwrap();
        assert!(profile.has_mapping(&key("f1")));
        assert!(profile.remove_mapping(&key("f1")));
        assert!(!profile.remove_mapping(&key("f1")));
        assert!(profile.is_empty());
    }

    #[test]
    fn test_search() {
        let mut profile = Profile::new("p", "x");
        profile.add_raw_mapping("f1", "date_long").unwrap();
        profile.add_raw_mapping("f2", "\"Hello World\"").unwrap();
        profile.add_raw_mapping("ctrl+h", "\"hello there\"").unwrap();

        assert_eq!(profile.search("hello").len(), 2);
        assert_eq!(profile.search("HELLO world").len(), 1);
        assert_eq!(profile.search("date").len(), 1);
        assert!(profile.search("   ").is_empty());
    }

    #[test]
    fn test_mapping_source() {
        let mut profile = Profile::new("p", "browser.exe");
        profile.add_raw_mapping("f1", "time").unwrap();
        assert_eq!(profile.get_target_process_name(), "browser.exe");
        assert_eq!(profile.mappings(), vec![(key("f1"), ActionDescriptor::Time)]);
    }
}
