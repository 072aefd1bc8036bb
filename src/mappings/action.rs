use crate::error::{RemapError, Result};
use crate::mappings::symbols;
use std::fmt;
use std::str::FromStr;

/// Действие назначения в разобранном виде.
///
/// Строковая форма из профиля разбирается один раз при загрузке,
/// дальше выполнение - это `match` по варианту.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ActionDescriptor {
    LiteralText(String),
    MultilineText(String),
    DateLong,
    DateShort,
    DateTime,
    Time,
    Currency(String),
    Symbol(String),
    KeyCombo(String),
}

const TRIPLE_QUOTE: &str = "\"\"\"";

impl ActionDescriptor {
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Err(RemapError::InvalidAction("пустое действие".to_string()));
        }

        let action = match raw {
            "date_long" => Self::DateLong,
            "date_short" => Self::DateShort,
            "datetime" => Self::DateTime,
            "time" => Self::Time,
            _ => {
                if let Some(id) = raw.strip_prefix("currency:") {
                    Self::Currency(id.to_string())
                } else if let Some(id) = raw.strip_prefix("symbol:") {
                    Self::Symbol(id.to_string())
                } else if raw.len() >= 2 * TRIPLE_QUOTE.len()
                    && raw.starts_with(TRIPLE_QUOTE)
                    && raw.ends_with(TRIPLE_QUOTE)
                {
                    // Тройные кавычки проверяются раньше одинарных
                    Self::MultilineText(raw[3..raw.len() - 3].to_string())
                } else if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
                    Self::LiteralText(raw[1..raw.len() - 1].to_string())
                } else {
                    Self::KeyCombo(raw.trim().to_string())
                }
            }
        };

        Ok(action)
    }

    /// Сериализованная форма действия для профиля.
    ///
    /// Формат без экранирования, поэтому значения, которые читаются обратно
    /// как другое действие, отклоняются: например, текст `""a""` в кавычках
    /// совпадает с многострочной формой `"""a"""`.
    pub fn encode(&self) -> Result<String> {
        let encoded = self.to_string();
        if Self::parse(&encoded)? != *self {
            return Err(RemapError::InvalidAction(format!(
                "{} нельзя записать без потерь: читается как {}",
                self.describe(),
                encoded
            )));
        }
        Ok(encoded)
    }

    /// Человекочитаемое описание для логов
    pub fn describe(&self) -> String {
        match self {
            Self::DateLong => "Дата (длинная)".to_string(),
            Self::DateShort => "Дата (короткая)".to_string(),
            Self::DateTime => "Дата и время".to_string(),
            Self::Time => "Время".to_string(),
            Self::Currency(id) => match (symbols::currency_symbol(id), symbols::currency_name(id)) {
                (Some(sym), Some(name)) => format!("{} {}", sym, name),
                _ => format!("Валюта: {}", id),
            },
            Self::Symbol(id) => match (symbols::named_symbol(id), symbols::symbol_name(id)) {
                (Some(sym), Some(name)) => format!("{} {}", sym, name),
                _ => format!("Символ: {}", id),
            },
            Self::MultilineText(text) => format!("Многострочный: \"{}\"", preview(text)),
            Self::LiteralText(text) => format!("Текст: \"{}\"", preview(text)),
            Self::KeyCombo(combo) => format!("Клавиши: {}", combo),
        }
    }
}

fn preview(text: &str) -> String {
    const LIMIT: usize = 20;
    if text.chars().count() > LIMIT {
        format!("{}...", text.chars().take(LIMIT).collect::<String>())
    } else {
        text.to_string()
    }
}

impl fmt::Display for ActionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LiteralText(text) => write!(f, "\"{}\"", text),
            Self::MultilineText(text) => write!(f, "{}{}{}", TRIPLE_QUOTE, text, TRIPLE_QUOTE),
            Self::DateLong => f.write_str("date_long"),
            Self::DateShort => f.write_str("date_short"),
            Self::DateTime => f.write_str("datetime"),
            Self::Time => f.write_str("time"),
            Self::Currency(id) => write!(f, "currency:{}", id),
            Self::Symbol(id) => write!(f, "symbol:{}", id),
            Self::KeyCombo(combo) => f.write_str(combo),
        }
    }
}

impl FromStr for ActionDescriptor {
    type Err = RemapError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_actions() {
        assert_eq!(ActionDescriptor::parse("date_long").unwrap(), ActionDescriptor::DateLong);
        assert_eq!(ActionDescriptor::parse("date_short").unwrap(), ActionDescriptor::DateShort);
        assert_eq!(ActionDescriptor::parse("datetime").unwrap(), ActionDescriptor::DateTime);
        assert_eq!(ActionDescriptor::parse("time").unwrap(), ActionDescriptor::Time);
    }

    #[test]
    fn test_prefixed_actions() {
        assert_eq!(
            ActionDescriptor::parse("currency:ruble").unwrap(),
            ActionDescriptor::Currency("ruble".into())
        );
        assert_eq!(
            ActionDescriptor::parse("symbol:arrow_right").unwrap(),
            ActionDescriptor::Symbol("arrow_right".into())
        );
    }

    #[test]
    fn test_text_actions() {
        assert_eq!(
            ActionDescriptor::parse("\"New Tab\"").unwrap(),
            ActionDescriptor::LiteralText("New Tab".into())
        );
        assert_eq!(
            ActionDescriptor::parse("\"\"\"line 1\nline 2\"\"\"").unwrap(),
            ActionDescriptor::MultilineText("line 1\nline 2".into())
        );
        assert_eq!(ActionDescriptor::parse("\"\"").unwrap(), ActionDescriptor::LiteralText(String::new()));
    }

    #[test]
    fn test_fallback_to_key_combo() {
        assert_eq!(
            ActionDescriptor::parse("ctrl+shift+t").unwrap(),
            ActionDescriptor::KeyCombo("ctrl+shift+t".into())
        );
        // Одиночная кавычка - не текст
        assert_eq!(ActionDescriptor::parse("\"").unwrap(), ActionDescriptor::KeyCombo("\"".into()));
    }

    #[test]
    fn test_empty_action_rejected() {
        assert!(ActionDescriptor::parse("").is_err());
        assert!(ActionDescriptor::parse("   ").is_err());
    }

    #[test]
    fn test_text_round_trip() {
        let literal = ActionDescriptor::LiteralText("hello".into());
        assert_eq!(ActionDescriptor::parse(&literal.encode().unwrap()).unwrap(), literal);

        let multiline = ActionDescriptor::MultilineText("Здравствуйте,\nс уважением\n".into());
        assert_eq!(ActionDescriptor::parse(&multiline.encode().unwrap()).unwrap(), multiline);

        // Кавычки внутри текста допустимы, пока форма однозначна
        let quoted = ActionDescriptor::LiteralText("say \"hi\"".into());
        assert_eq!(quoted.encode().unwrap(), "\"say \"hi\"\"");
    }

    #[test]
    fn test_ambiguous_encoding_rejected() {
        let literal = ActionDescriptor::LiteralText("\"\"hi\"\"".into());
        assert!(matches!(literal.encode(), Err(RemapError::InvalidAction(_))));

        let combo = ActionDescriptor::KeyCombo("date_long".into());
        assert!(matches!(combo.encode(), Err(RemapError::InvalidAction(_))));

        // короткий текст из кавычек не пересекается с тройными
        let quotes = ActionDescriptor::LiteralText("\"\"".into());
        assert_eq!(quotes.encode().unwrap(), "\"\"\"\"");
    }

    #[test]
    fn test_describe() {
        assert_eq!(ActionDescriptor::Currency("ruble".into()).describe(), "₽ Рубль");
        assert_eq!(ActionDescriptor::Symbol("nope".into()).describe(), "Символ: nope");
        assert_eq!(
            ActionDescriptor::LiteralText("abcdefghijklmnopqrstuvwxyz".into()).describe(),
            "Текст: \"abcdefghijklmnopqrst...\""
        );
        assert_eq!(ActionDescriptor::KeyCombo("alt+f4".into()).describe(), "Клавиши: alt+f4");
    }
}
