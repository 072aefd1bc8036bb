use crate::error::{RemapError, Result};
use crate::remap_error;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Слова в имени, по которым устройство точно не клавиатура
const NOT_KEYBOARD: &[&str] = &["mouse", "deathadder", "touchpad", "trackpoint"];

pub struct DeviceFinder;

impl DeviceFinder {
    /// Путь к клавиатуре: явно заданный или `auto`
    pub fn find_keyboard_device(device_path: &str) -> Result<PathBuf> {
        if device_path != "auto" {
            let path = PathBuf::from(device_path);
            return if path.exists() {
                info!("Используется указанное устройство: {:?}", path);
                Ok(path)
            } else {
                RemapError::device_not_found(format!("Указанное устройство не найдено: {:?}", path))
            };
        }

        info!("Начинаем автопоиск клавиатурного устройства...");

        if let Some(device) = Self::find_by_id()? {
            info!("Найдено устройство по ID: {:?}", device);
            return Ok(device);
        }

        if let Some(device) = Self::find_by_event_devices()? {
            info!("Найдено устройство среди event устройств: {:?}", device);
            return Ok(device);
        }

        RemapError::device_not_found(
            "Не удалось найти подходящее клавиатурное устройство. \
             Убедитесь, что пользователь добавлен в группу 'input'",
        )
    }

    /// Приоритет ссылки из /dev/input/by-id, `None` - не клавиатура
    fn by_id_priority(name: &str) -> Option<u32> {
        let lower = name.to_lowercase();
        if !lower.contains("event") || !(lower.contains("kbd") || lower.contains("keyboard")) {
            return None;
        }
        if NOT_KEYBOARD.iter().any(|word| lower.contains(word)) {
            return None;
        }

        Some(if lower.ends_with("event-kbd") {
            100
        } else if lower.contains("keyboard") {
            50
        } else {
            10
        })
    }

    fn find_by_id() -> Result<Option<PathBuf>> {
        let by_id_dir = Path::new("/dev/input/by-id");
        if !by_id_dir.exists() {
            debug!("Директория /dev/input/by-id не существует");
            return Ok(None);
        }

        let entries = fs::read_dir(by_id_dir)
            .map_err(|e| remap_error!(permission, "Нет доступа к /dev/input/by-id: {}", e))?;

        let mut candidates = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("").to_string();

            let Some(priority) = Self::by_id_priority(&name) else {
                continue;
            };

            if !Self::is_device_accessible(&path) {
                warn!("Устройство {:?} недоступно", path);
                continue;
            }

            if Self::is_keyboard_device(&path) {
                info!("Добавлена клавиатура: {} (приоритет: {})", name, priority);
                candidates.push((path, priority));
            } else {
                debug!("Устройство не прошло проверку как клавиатура: {}", name);
            }
        }

        candidates.sort_by(|a, b| b.1.cmp(&a.1));
        Ok(candidates.into_iter().next().map(|(path, _)| path))
    }

    fn find_by_event_devices() -> Result<Option<PathBuf>> {
        let entries = fs::read_dir("/dev/input")
            .map_err(|e| remap_error!(permission, "Нет доступа к /dev/input: {}", e))?;

        let mut event_devices = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("event"))
            {
                event_devices.push(path);
            }
        }
        event_devices.sort();

        Ok(event_devices.into_iter().find(|path| {
            debug!("Проверяем устройство: {:?}", path);
            Self::is_keyboard_device(path) && Self::is_device_accessible(path)
        }))
    }

    /// Проверка возможностей через evdev: есть буквы, пробел, Enter и много клавиш
    fn is_keyboard_device(device_path: &Path) -> bool {
        let device = match evdev::Device::open(device_path) {
            Ok(device) => device,
            Err(e) => {
                debug!("Не удалось открыть устройство {:?}: {}", device_path, e);
                return false;
            }
        };

        let device_name = device.name().unwrap_or("Unknown").to_lowercase();
        if NOT_KEYBOARD.iter().any(|word| device_name.contains(word)) {
            debug!("Исключаем устройство как мышь/тачпад: {:?} ({})", device_path, device_name);
            return false;
        }

        let has_keys = device.supported_keys().is_some_and(|keys| {
            keys.contains(evdev::KeyCode::KEY_A)
                && keys.contains(evdev::KeyCode::KEY_SPACE)
                && keys.contains(evdev::KeyCode::KEY_ENTER)
                && keys.iter().count() > 20
        });

        if has_keys {
            info!("Устройство {:?} подходит как клавиатура ({})", device_path, device_name);
        }
        has_keys
    }

    fn is_device_accessible(device_path: &Path) -> bool {
        match fs::File::open(device_path) {
            Ok(_) => true,
            Err(e) => {
                debug!("Устройство {:?} недоступно: {}", device_path, e);
                false
            }
        }
    }
}
