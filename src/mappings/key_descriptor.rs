use crate::error::{RemapError, Result};
use crate::events::Modifiers;
use crate::mappings::KeyNames;
use std::fmt;
use std::str::FromStr;

/// Дескриптор клавиши или комбинации: `t`, `f5`, `num 1`, `ctrl+shift+t`.
///
/// Каноническая форма - нижний регистр, модификаторы в порядке ctrl, alt, shift, win.
/// `Shift+Ctrl+T` и `ctrl+shift+t` - один и тот же дескриптор.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyDescriptor {
    modifiers: Modifiers,
    key: &'static str,
}

/// Аккорд для таблицы перехвата: точный набор модификаторов + evdev код основной клавиши
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyChord {
    pub modifiers: Modifiers,
    pub code: u16,
}

impl KeyDescriptor {
    pub fn parse(input: &str) -> Result<Self> {
        let lowered = input.trim().to_lowercase();
        if lowered.is_empty() {
            return Err(RemapError::InvalidKey("пустой дескриптор".to_string()));
        }

        // Снимаем модификаторы слева: основная клавиша сама может содержать '+' ("num +")
        let mut modifiers = Modifiers::new();
        let mut rest = lowered.as_str();
        while let Some(pos) = rest.find('+') {
            let head = rest[..pos].trim();
            let tail = rest[pos + 1..].trim_start();
            let Some(name) = KeyNames::canonical(head).filter(|n| Modifiers::is_modifier_name(n)) else {
                break;
            };
            if tail.is_empty() {
                break;
            }
            modifiers.set(name, true);
            rest = tail;
        }

        let key = KeyNames::canonical(rest)
            .ok_or_else(|| RemapError::InvalidKey(format!("неизвестная клавиша '{}' в '{}'", rest.trim(), input)))?;

        Ok(Self { modifiers, key })
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Каноническое имя основной клавиши
    pub fn key(&self) -> &'static str {
        self.key
    }

    pub fn is_combination(&self) -> bool {
        self.modifiers.has_any()
    }

    pub fn chord(&self) -> KeyChord {
        KeyChord {
            modifiers: self.modifiers,
            // Имя получено из словаря, код есть всегда
            code: KeyNames::code_of(self.key).unwrap_or_default(),
        }
    }
}

impl fmt::Display for KeyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for name in self.modifiers.names() {
            write!(f, "{}+", name)?;
        }
        write!(f, "{}", self.key)
    }
}

impl FromStr for KeyDescriptor {
    type Err = RemapError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = KeyNames::name_of(self.code).unwrap_or("?");
        if self.modifiers.is_empty() {
            write!(f, "{}", name)
        } else {
            write!(f, "{}+{}", self.modifiers, name)
        }
    }
}
