use thiserror::Error;

#[derive(Error, Debug)]
pub enum RemapError {
    #[error("Ошибка конфигурации: {0}")]
    Config(#[from] anyhow::Error),

    #[error("Ошибка ввода-вывода: {0}")]
    Io(#[from] std::io::Error),

    #[error("Ошибка uinput: {0}")]
    Uinput(#[from] uinput::Error),

    #[error("Устройство не найдено: {0}")]
    DeviceNotFound(String),

    #[error("Недостаточно прав доступа: {0}")]
    Permission(String),

    #[error("Сервис недоступен: {0}")]
    ServiceUnavailable(String),

    #[error("Неверная клавиша: {0}")]
    InvalidKey(String),

    #[error("Неверное действие: {0}")]
    InvalidAction(String),

    #[error("Не удалось зарегистрировать '{key}': {reason}")]
    Registration { key: String, reason: String },

    #[error("Не удалось зарегистрировать ни одной клавиши")]
    NoMappingsRegistered,

    #[error("Ошибка буфера обмена: {0}")]
    Clipboard(String),

    #[error("Ошибка эмуляции ввода: {0}")]
    Injection(String),

    #[error("Неизвестный символ: {0}")]
    UnknownSymbol(String),

    #[error("Внутренняя ошибка: {0}")]
    Internal(String),
}

impl RemapError {
    pub fn device_not_found<T>(msg: impl Into<String>) -> Result<T> {
        Err(RemapError::DeviceNotFound(msg.into()))
    }

    pub fn registration(key: impl ToString, reason: impl Into<String>) -> Self {
        RemapError::Registration {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RemapError>;

// Удобные макросы для создания ошибок
#[macro_export]
macro_rules! remap_error {
    (permission, $($arg:tt)*) => {
        $crate::error::RemapError::Permission(format!($($arg)*))
    };
    (invalid_key, $($arg:tt)*) => {
        $crate::error::RemapError::InvalidKey(format!($($arg)*))
    };
    (invalid_action, $($arg:tt)*) => {
        $crate::error::RemapError::InvalidAction(format!($($arg)*))
    };
    (service_unavailable, $($arg:tt)*) => {
        $crate::error::RemapError::ServiceUnavailable(format!($($arg)*))
    };
    (clipboard, $($arg:tt)*) => {
        $crate::error::RemapError::Clipboard(format!($($arg)*))
    };
    (injection, $($arg:tt)*) => {
        $crate::error::RemapError::Injection(format!($($arg)*))
    };
    (internal, $($arg:tt)*) => {
        $crate::error::RemapError::Internal(format!($($arg)*))
    };
}
