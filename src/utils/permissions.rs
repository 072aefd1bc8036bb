use crate::error::{RemapError, Result};
use std::fs::{self, OpenOptions};
use std::path::Path;
use tracing::{info, warn};

const INPUT_DIR: &str = "/dev/input";
const UINPUT_DEVICE: &str = "/dev/uinput";

/// Проверить доступ к устройствам ввода и к uinput
pub fn check_permissions() -> Result<()> {
    info!("Проверка прав доступа...");

    let result = check_input_devices_access().and_then(|_| check_uinput_access());
    if result.is_err() {
        for line in setup_commands() {
            warn!("{}", line);
        }
    }
    result?;

    check_not_root();

    info!("Проверка прав доступа завершена успешно");
    Ok(())
}

fn check_input_devices_access() -> Result<()> {
    if !Path::new(INPUT_DIR).exists() {
        return Err(RemapError::Permission(format!("Директория {} не существует", INPUT_DIR)));
    }

    fs::read_dir(INPUT_DIR).map_err(|e| {
        RemapError::Permission(format!(
            "Нет доступа к {}: {}. Добавьте пользователя в группу 'input'",
            INPUT_DIR, e
        ))
    })?;

    info!("Доступ к {} подтвержден", INPUT_DIR);
    Ok(())
}

/// Открытие на запись: проверка реальных прав, а не битов режима
fn check_uinput_access() -> Result<()> {
    if !Path::new(UINPUT_DEVICE).exists() {
        return Err(RemapError::Permission(format!(
            "{} не существует, загрузите модуль: sudo modprobe uinput",
            UINPUT_DEVICE
        )));
    }

    OpenOptions::new().write(true).open(UINPUT_DEVICE).map_err(|e| {
        RemapError::Permission(format!(
            "Нет прав на запись в {}: {}. Добавьте пользователя в группу 'uinput' или 'input'",
            UINPUT_DEVICE, e
        ))
    })?;

    info!("Доступ к {} подтвержден", UINPUT_DEVICE);
    Ok(())
}

fn check_not_root() {
    match std::env::var("USER") {
        Ok(user) if user == "root" => {
            warn!("⚠️  Приложение запущено от имени root!");
            warn!("   Рекомендуется добавить пользователя в группы 'input' и 'uinput'");
            warn!("   и запускать приложение от имени обычного пользователя");
        }
        Ok(user) => info!("Приложение запущено от имени пользователя: {}", user),
        Err(_) => warn!("Не удалось определить пользователя"),
    }
}

/// Команды для настройки прав доступа
pub fn setup_commands() -> Vec<&'static str> {
    vec![
        "# Добавить пользователя в необходимые группы:",
        "sudo usermod -a -G input,uinput $USER",
        "# Загрузить модуль uinput:",
        "sudo modprobe uinput",
        "# Автоматическая загрузка модуля при загрузке системы:",
        "echo 'uinput' | sudo tee /etc/modules-load.d/uinput.conf",
        "# После выполнения команд перезайдите в систему",
    ]
}
