use crate::error::Result;
use crate::remap_error;
use parking_lot::Mutex;
use tracing::{debug, warn};

/// Доступ к системному буферу обмена (только текст)
pub trait ClipboardProvider: Send + Sync {
    fn get_text(&self) -> Result<String>;
    fn set_text(&self, text: &str) -> Result<()>;
    /// Очистить буфер, если исходное содержимое не удалось сохранить
    fn clear(&self) -> Result<()>;
}

/// Буфер обмена через arboard (X11 / Wayland data-control)
pub struct ArboardClipboard {
    inner: Mutex<arboard::Clipboard>,
}

impl ArboardClipboard {
    pub fn new() -> Result<Self> {
        let clipboard = arboard::Clipboard::new()
            .map_err(|e| remap_error!(clipboard, "буфер обмена недоступен: {}", e))?;
        debug!("Буфер обмена инициализирован");
        Ok(Self {
            inner: Mutex::new(clipboard),
        })
    }

    /// `None`, если буфер обмена недоступен (например, нет графической сессии)
    pub fn try_new() -> Option<Self> {
        match Self::new() {
            Ok(clipboard) => Some(clipboard),
            Err(e) => {
                warn!("{}, текст будет печататься посимвольно", e);
                None
            }
        }
    }
}

impl ClipboardProvider for ArboardClipboard {
    fn get_text(&self) -> Result<String> {
        self.inner
            .lock()
            .get_text()
            .map_err(|e| remap_error!(clipboard, "чтение: {}", e))
    }

    fn set_text(&self, text: &str) -> Result<()> {
        self.inner
            .lock()
            .set_text(text)
            .map_err(|e| remap_error!(clipboard, "запись: {}", e))
    }

    fn clear(&self) -> Result<()> {
        self.inner
            .lock()
            .clear()
            .map_err(|e| remap_error!(clipboard, "очистка: {}", e))
    }
}
