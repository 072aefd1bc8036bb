use crate::config::{ExecutorConfig, TextStrategy};
use crate::debug_if_enabled;
use crate::error::{RemapError, Result};
use crate::events::{KeyCode, Modifiers, VirtualKeyEvent};
use crate::mappings::{symbols, ActionDescriptor, KeyChord, KeyDescriptor, KeyNames};
use crate::services::clipboard::ClipboardProvider;
use crate::services::virtual_device::KeyEmitter;
use chrono::{DateTime, Locale, TimeZone};
use std::fmt::{Display, Write};
use std::sync::Arc;
use std::thread;
use tracing::{debug, info, warn};

const ENTER: u16 = 28;

/// Выполнение действий: вставка текста, символов, дат и отправка комбинаций.
///
/// Вызывается синхронно из обработчика клавиш. Ошибки возвращаются
/// вызывающему, который логирует их и не пропускает дальше.
pub struct ActionExecutor {
    emitter: Arc<dyn KeyEmitter>,
    clipboard: Option<Box<dyn ClipboardProvider>>,
    settings: ExecutorConfig,
    paste_chord: KeyChord,
    locale: Locale,
    date_long_format: String,
}

impl ActionExecutor {
    pub fn new(
        emitter: Arc<dyn KeyEmitter>,
        clipboard: Option<Box<dyn ClipboardProvider>>,
        settings: &ExecutorConfig,
    ) -> Result<Self> {
        let paste_chord = KeyDescriptor::parse(&settings.paste_combo)?.chord();
        let locale = resolve_locale(&settings.locale);
        let date_long_format = if settings.date_long_format.trim().eq_ignore_ascii_case("auto") {
            date_long_format_for(locale).to_string()
        } else {
            settings.date_long_format.clone()
        };

        info!(
            "Инициализация ActionExecutor (вставка: {:?}, буфер обмена: {}, локаль: {:?})",
            settings.text_strategy,
            if clipboard.is_some() { "есть" } else { "нет" },
            locale
        );

        Ok(Self {
            emitter,
            clipboard,
            settings: settings.clone(),
            paste_chord,
            locale,
            date_long_format,
        })
    }

    pub fn execute(&self, action: &ActionDescriptor) -> Result<()> {
        debug_if_enabled!("Выполняем действие: {}", action.describe());

        // Физически удерживаемые модификаторы не должны смешиваться с вводом
        self.emitter.sync_modifiers(Modifiers::default())?;

        match action {
            ActionDescriptor::LiteralText(text) | ActionDescriptor::MultilineText(text) => {
                self.insert_text(text)
            }
            ActionDescriptor::DateLong => self.insert_now(&self.date_long_format),
            ActionDescriptor::DateShort => self.insert_now(&self.settings.date_short_format),
            ActionDescriptor::DateTime => self.insert_now(&self.settings.datetime_format),
            ActionDescriptor::Time => self.insert_now(&self.settings.time_format),
            ActionDescriptor::Currency(id) => {
                let symbol = symbols::currency_symbol(id)
                    .ok_or_else(|| RemapError::UnknownSymbol(format!("currency:{}", id)))?;
                self.insert_text(symbol)
            }
            ActionDescriptor::Symbol(id) => {
                let symbol = symbols::named_symbol(id)
                    .ok_or_else(|| RemapError::UnknownSymbol(format!("symbol:{}", id)))?;
                self.insert_text(symbol)
            }
            ActionDescriptor::KeyCombo(combo) => {
                let chord = KeyDescriptor::parse(combo)?.chord();
                self.emitter.tap_chord(chord)
            }
        }
    }

    fn insert_now(&self, format: &str) -> Result<()> {
        let text = format_datetime(&chrono::Local::now(), format, self.locale)?;
        self.insert_text(&text)
    }

    fn insert_text(&self, text: &str) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }

        match (&self.clipboard, self.settings.text_strategy) {
            (Some(clipboard), TextStrategy::Clipboard) => {
                match self.paste_via_clipboard(clipboard.as_ref(), text) {
                    Err(RemapError::Clipboard(e)) => {
                        warn!("Буфер обмена недоступен ({}), печатаем текст", e);
                        self.type_text(text)
                    }
                    other => other,
                }
            }
            _ => self.type_text(text),
        }
    }

    /// Вставка через буфер обмена. Исходное содержимое восстанавливается
    /// после задержки, даже если вставка не удалась; нетекстовый или
    /// пустой буфер после вставки очищается.
    fn paste_via_clipboard(&self, clipboard: &dyn ClipboardProvider, text: &str) -> Result<()> {
        let original = match clipboard.get_text() {
            Ok(original) => Some(original),
            Err(e) => {
                debug!("Содержимое буфера не сохранено: {}", e);
                None
            }
        };

        clipboard.set_text(text)?;

        let pasted = self.emitter.tap_chord(self.paste_chord);
        thread::sleep(self.settings.paste_restore_delay());

        let restored = match original {
            Some(original) => clipboard.set_text(&original),
            None => clipboard.clear(),
        };
        if let Err(e) = restored {
            warn!("Не удалось восстановить буфер обмена: {}", e);
        }

        pasted
    }

    /// Посимвольная печать. Строки разделяются Enter с паузой между ними.
    fn type_text(&self, text: &str) -> Result<()> {
        let mut skipped = 0usize;

        for (index, line) in text.split('\n').enumerate() {
            if index > 0 {
                self.tap_code(ENTER, false)?;
                thread::sleep(self.settings.line_delay());
            }

            for ch in line.chars().filter(|&ch| ch != '\r') {
                match KeyNames::char_to_key(ch) {
                    Some((code, shift)) => self.tap_code(code, shift)?,
                    None => skipped += 1,
                }
            }
        }

        if skipped > 0 {
            warn!("Пропущено символов, которые нельзя напечатать: {}", skipped);
        }

        Ok(())
    }

    fn tap_code(&self, code: u16, shift: bool) -> Result<()> {
        if shift {
            self.emitter.tap_chord(KeyChord {
                modifiers: Modifiers::new().with_shift(true),
                code,
            })
        } else {
            let key = KeyCode::new(code);
            self.emitter.send_event(VirtualKeyEvent::press(key))?;
            self.emitter.send_event(VirtualKeyEvent::release(key))
        }
    }
}

/// Форматирование даты с названиями месяцев выбранной локали
pub fn format_datetime<Tz>(at: &DateTime<Tz>, format: &str, locale: Locale) -> Result<String>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut out = String::new();
    write!(out, "{}", at.format_localized(format, locale))
        .map_err(|_| RemapError::InvalidAction(format!("неверный формат даты '{}'", format)))?;
    Ok(out)
}

/// Длинный формат даты для `date_long_format = "auto"`.
/// В русском после года пишется "года": "5 октября 2024 года".
pub fn date_long_format_for(locale: Locale) -> &'static str {
    match locale {
        Locale::ru_RU | Locale::ru_UA => "%-d %B %Y года",
        _ => "%-d %B %Y",
    }
}

/// Локаль из настроек; `auto` - из LC_ALL, LC_TIME, LANG. По умолчанию en_US.
pub fn resolve_locale(setting: &str) -> Locale {
    let raw = if setting.trim().eq_ignore_ascii_case("auto") {
        ["LC_ALL", "LC_TIME", "LANG"]
            .iter()
            .find_map(|var| std::env::var(var).ok().filter(|v| !v.is_empty()))
    } else {
        Some(setting.to_string())
    };

    raw.as_deref().and_then(parse_locale).unwrap_or(Locale::en_US)
}

fn parse_locale(raw: &str) -> Option<Locale> {
    let name = raw.trim().split(['.', '@']).next()?.replace('-', "_");
    Locale::try_from(name.as_str()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::events::KeyState;
    use chrono::Utc;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeEmitter {
        events: Mutex<Vec<VirtualKeyEvent>>,
        synced: Mutex<Vec<Modifiers>>,
        fail: bool,
    }

    impl FakeEmitter {
        fn pressed_codes(&self) -> Vec<u16> {
            self.events
                .lock()
                .iter()
                .filter(|e| e.state == KeyState::Pressed)
                .map(|e| e.key_code.value())
                .collect()
        }
    }

    impl KeyEmitter for FakeEmitter {
        fn send_event(&self, event: VirtualKeyEvent) -> Result<()> {
            if self.fail {
                return Err(RemapError::Injection("fake".into()));
            }
            self.events.lock().push(event);
            Ok(())
        }

        fn sync_modifiers(&self, wanted: Modifiers) -> Result<()> {
            self.synced.lock().push(wanted);
            Ok(())
        }

        fn release_all_keys(&self) -> Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeClipboard {
        content: Mutex<Option<String>>,
        writes: Mutex<Vec<String>>,
        clears: AtomicUsize,
        fail_set: bool,
    }

    impl FakeClipboard {
        fn with(content: Option<&str>) -> Self {
            Self {
                content: Mutex::new(content.map(str::to_string)),
                ..Default::default()
            }
        }
    }

    impl ClipboardProvider for Arc<FakeClipboard> {
        fn get_text(&self) -> Result<String> {
            self.content
                .lock()
                .clone()
                .ok_or_else(|| RemapError::Clipboard("не текст".into()))
        }

        fn set_text(&self, text: &str) -> Result<()> {
            if self.fail_set {
                return Err(RemapError::Clipboard("fake".into()));
            }
            self.writes.lock().push(text.to_string());
            *self.content.lock() = Some(text.to_string());
            Ok(())
        }

        fn clear(&self) -> Result<()> {
            self.clears.fetch_add(1, Ordering::SeqCst);
            *self.content.lock() = None;
            Ok(())
        }
    }

    fn settings(strategy: TextStrategy) -> ExecutorConfig {
        let mut settings = Config::default().executor;
        settings.text_strategy = strategy;
        settings.paste_restore_delay_ms = 0;
        settings.line_delay_ms = 0;
        settings.locale = "en_US".to_string();
        settings
    }

    fn executor(
        emitter: &Arc<FakeEmitter>,
        clipboard: Option<Arc<FakeClipboard>>,
        strategy: TextStrategy,
    ) -> ActionExecutor {
        let clipboard = clipboard.map(|c| Box::new(c) as Box<dyn ClipboardProvider>);
        ActionExecutor::new(emitter.clone(), clipboard, &settings(strategy)).unwrap()
    }

    #[test]
    fn test_paste_restores_original_clipboard() {
        let emitter = Arc::new(FakeEmitter::default());
        let clipboard = Arc::new(FakeClipboard::with(Some("orig")));
        let executor = executor(&emitter, Some(clipboard.clone()), TextStrategy::Clipboard);

        executor.execute(&ActionDescriptor::LiteralText("New Tab".into())).unwrap();

        assert_eq!(*clipboard.writes.lock(), vec!["New Tab", "orig"]);
        // ctrl, v
        assert_eq!(emitter.pressed_codes(), vec![29, 47]);
        assert_eq!(*emitter.synced.lock(), vec![Modifiers::default()]);
    }

    #[test]
    fn test_restore_happens_even_if_paste_fails() {
        let emitter = Arc::new(FakeEmitter {
            fail: true,
            ..Default::default()
        });
        let clipboard = Arc::new(FakeClipboard::with(Some("orig")));
        let executor = executor(&emitter, Some(clipboard.clone()), TextStrategy::Clipboard);

        let result = executor.execute(&ActionDescriptor::LiteralText("x".into()));
        assert!(matches!(result, Err(RemapError::Injection(_))));
        assert_eq!(clipboard.content.lock().as_deref(), Some("orig"));
    }

    #[test]
    fn test_non_text_clipboard_is_cleared_after_paste() {
        let emitter = Arc::new(FakeEmitter::default());
        let clipboard = Arc::new(FakeClipboard::with(None));
        let executor = executor(&emitter, Some(clipboard.clone()), TextStrategy::Clipboard);

        executor.execute(&ActionDescriptor::Currency("ruble".into())).unwrap();
        assert_eq!(*clipboard.writes.lock(), vec!["₽"]);
        assert_eq!(clipboard.clears.load(Ordering::SeqCst), 1);
        assert_eq!(*clipboard.content.lock(), None);
    }

    #[test]
    fn test_clipboard_cleared_even_if_paste_fails() {
        let emitter = Arc::new(FakeEmitter {
            fail: true,
            ..Default::default()
        });
        let clipboard = Arc::new(FakeClipboard::with(None));
        let executor = executor(&emitter, Some(clipboard.clone()), TextStrategy::Clipboard);

        let result = executor.execute(&ActionDescriptor::LiteralText("secret".into()));
        assert!(matches!(result, Err(RemapError::Injection(_))));
        assert_eq!(*clipboard.content.lock(), None);
    }

    #[test]
    fn test_clipboard_failure_falls_back_to_typing() {
        let emitter = Arc::new(FakeEmitter::default());
        let clipboard = Arc::new(FakeClipboard {
            fail_set: true,
            ..Default::default()
        });
        let executor = executor(&emitter, Some(clipboard), TextStrategy::Clipboard);

        executor.execute(&ActionDescriptor::LiteralText("hi".into())).unwrap();
        assert_eq!(emitter.pressed_codes(), vec![35, 23]);
    }

    #[test]
    fn test_typing_multiline_uses_enter() {
        let emitter = Arc::new(FakeEmitter::default());
        let executor = executor(&emitter, None, TextStrategy::Typing);

        executor
            .execute(&ActionDescriptor::MultilineText("a\r\nB".into()))
            .unwrap();
        // a, enter, shift+b
        assert_eq!(emitter.pressed_codes(), vec![30, 28, 42, 48]);
    }

    #[test]
    fn test_typing_skips_unsupported_characters() {
        let emitter = Arc::new(FakeEmitter::default());
        let executor = executor(&emitter, None, TextStrategy::Typing);

        executor.execute(&ActionDescriptor::LiteralText("a₽".into())).unwrap();
        assert_eq!(emitter.pressed_codes(), vec![30]);
    }

    #[test]
    fn test_unknown_symbol_is_error() {
        let emitter = Arc::new(FakeEmitter::default());
        let executor = executor(&emitter, None, TextStrategy::Typing);

        let result = executor.execute(&ActionDescriptor::Currency("bitcoin".into()));
        assert!(matches!(result, Err(RemapError::UnknownSymbol(_))));
        let result = executor.execute(&ActionDescriptor::Symbol("nope".into()));
        assert!(matches!(result, Err(RemapError::UnknownSymbol(_))));
        assert!(emitter.events.lock().is_empty());
    }

    #[test]
    fn test_key_combo_is_tapped() {
        let emitter = Arc::new(FakeEmitter::default());
        let executor = executor(&emitter, None, TextStrategy::Typing);

        executor.execute(&ActionDescriptor::KeyCombo("ctrl+shift+t".into())).unwrap();
        assert_eq!(emitter.pressed_codes(), vec![29, 42, 20]);
        assert_eq!(emitter.events.lock().len(), 6);

        let result = executor.execute(&ActionDescriptor::KeyCombo("ctrl+nope".into()));
        assert!(matches!(result, Err(RemapError::InvalidKey(_))));
    }

    #[test]
    fn test_invalid_paste_combo_rejected() {
        let emitter: Arc<dyn KeyEmitter> = Arc::new(FakeEmitter::default());
        let mut config = settings(TextStrategy::Clipboard);
        config.paste_combo = "ctrl+nope".to_string();
        assert!(ActionExecutor::new(emitter, None, &config).is_err());
    }

    #[test]
    fn test_format_datetime_localized() {
        let at = Utc.with_ymd_and_hms(2024, 10, 5, 14, 3, 9).unwrap();
        assert_eq!(format_datetime(&at, "%-d %B %Y", Locale::en_US).unwrap(), "5 October 2024");
        assert_eq!(format_datetime(&at, "%d.%m.%Y", Locale::en_US).unwrap(), "05.10.2024");
        assert_eq!(format_datetime(&at, "%H:%M:%S", Locale::en_US).unwrap(), "14:03:09");
    }

    #[test]
    fn test_date_long_format_follows_locale() {
        assert_eq!(date_long_format_for(Locale::ru_RU), "%-d %B %Y года");
        assert_eq!(date_long_format_for(Locale::en_US), "%-d %B %Y");

        let at = Utc.with_ymd_and_hms(2024, 10, 5, 14, 3, 9).unwrap();
        let ru = format_datetime(&at, date_long_format_for(Locale::ru_RU), Locale::ru_RU).unwrap();
        assert!(ru.starts_with("5 "));
        assert!(ru.ends_with(" 2024 года"));
    }

    #[test]
    fn test_auto_date_long_format_is_resolved() {
        let emitter = Arc::new(FakeEmitter::default());
        let mut config = settings(TextStrategy::Typing);
        config.locale = "ru_RU".to_string();
        let executor = ActionExecutor::new(emitter.clone(), None, &config).unwrap();
        assert_eq!(executor.date_long_format, "%-d %B %Y года");

        config.date_long_format = "%Y".to_string();
        let executor = ActionExecutor::new(emitter, None, &config).unwrap();
        assert_eq!(executor.date_long_format, "%Y");
    }

    #[test]
    fn test_resolve_locale() {
        assert_eq!(resolve_locale("ru_RU.UTF-8"), Locale::ru_RU);
        assert_eq!(resolve_locale("de-DE"), Locale::de_DE);
        assert_eq!(resolve_locale("xx_YY"), Locale::en_US);
        assert_eq!(resolve_locale("klingon"), Locale::en_US);
    }
}
