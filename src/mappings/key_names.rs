use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Словарь имён клавиш и их evdev кодов.
/// Канонические имена совпадают с тем, как клавиши записываются в профилях.
pub struct KeyNames;

// Канонические имена и evdev коды
const CANONICAL_KEYS: &[(&str, u16)] = &[
    // Буквенные клавиши
    ("a", 30), ("b", 48), ("c", 46), ("d", 32), ("e", 18), ("f", 33), ("g", 34),
    ("h", 35), ("i", 23), ("j", 36), ("k", 37), ("l", 38), ("m", 50), ("n", 49),
    ("o", 24), ("p", 25), ("q", 16), ("r", 19), ("s", 31), ("t", 20), ("u", 22),
    ("v", 47), ("w", 17), ("x", 45), ("y", 21), ("z", 44),

    // Цифровые клавиши (верхний ряд)
    ("1", 2), ("2", 3), ("3", 4), ("4", 5), ("5", 6),
    ("6", 7), ("7", 8), ("8", 9), ("9", 10), ("0", 11),

    // Специальные клавиши
    ("space", 57),
    ("enter", 28),
    ("tab", 15),
    ("backspace", 14),
    ("delete", 111),
    ("esc", 1),
    ("insert", 110),
    ("home", 102),
    ("end", 107),
    ("page up", 104),
    ("page down", 109),
    ("print screen", 99),   // KEY_SYSRQ
    ("scroll lock", 70),
    ("pause", 119),
    ("caps lock", 58),
    ("num lock", 69),
    ("menu", 127),          // KEY_COMPOSE

    // Стрелки
    ("up", 103), ("down", 108), ("left", 105), ("right", 106),

    // Знаки пунктуации
    ("minus", 12), ("equal", 13), ("leftbrace", 26), ("rightbrace", 27),
    ("backslash", 43), ("semicolon", 39), ("apostrophe", 40), ("grave", 41),
    ("comma", 51), ("dot", 52), ("slash", 53),

    // Numpad
    ("num 0", 82), ("num 1", 79), ("num 2", 80), ("num 3", 81), ("num 4", 75),
    ("num 5", 76), ("num 6", 77), ("num 7", 71), ("num 8", 72), ("num 9", 73),
    ("num +", 78), ("num -", 74), ("num *", 55), ("num /", 98),
    ("num .", 83), ("num enter", 96),

    // Модификаторы
    ("ctrl", 29), ("alt", 56), ("shift", 42), ("win", 125),

    // Функциональные клавиши
    ("f1", 59), ("f2", 60), ("f3", 61), ("f4", 62), ("f5", 63), ("f6", 64),
    ("f7", 65), ("f8", 66), ("f9", 67), ("f10", 68), ("f11", 87), ("f12", 88),
    ("f13", 183), ("f14", 184), ("f15", 185), ("f16", 186), ("f17", 187), ("f18", 188),
    ("f19", 189), ("f20", 190), ("f21", 191), ("f22", 192), ("f23", 193), ("f24", 194),
];

// Альтернативные написания -> каноническое имя
const ALIASES: &[(&str, &str)] = &[
    ("escape", "esc"),
    ("return", "enter"),
    ("del", "delete"),
    ("ins", "insert"),
    ("pageup", "page up"),
    ("pagedown", "page down"),
    ("printscreen", "print screen"),
    ("scrolllock", "scroll lock"),
    ("capslock", "caps lock"),
    ("numlock", "num lock"),
    ("kp0", "num 0"), ("kp1", "num 1"), ("kp2", "num 2"), ("kp3", "num 3"), ("kp4", "num 4"),
    ("kp5", "num 5"), ("kp6", "num 6"), ("kp7", "num 7"), ("kp8", "num 8"), ("kp9", "num 9"),
    ("kpadd", "num +"),
    ("kpsubtract", "num -"),
    ("kpmultiply", "num *"),
    ("kpdivide", "num /"),
    ("kpdecimal", "num ."),
    ("kpenter", "num enter"),
    ("control", "ctrl"),
    ("super", "win"),
    ("meta", "win"),
];

static NAME_TO_CODE: Lazy<HashMap<&'static str, u16>> =
    Lazy::new(|| CANONICAL_KEYS.iter().copied().collect());

static ALIAS_TO_NAME: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| ALIASES.iter().copied().collect());

static CODE_TO_NAME: Lazy<HashMap<u16, &'static str>> =
    Lazy::new(|| CANONICAL_KEYS.iter().map(|&(name, code)| (code, name)).collect());

impl KeyNames {
    /// Каноническое имя клавиши (регистр и лишние пробелы игнорируются)
    pub fn canonical(key_name: &str) -> Option<&'static str> {
        let normalized = key_name
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();

        if let Some((&name, _)) = NAME_TO_CODE.get_key_value(normalized.as_str()) {
            return Some(name);
        }
        ALIAS_TO_NAME.get(normalized.as_str()).copied()
    }

    /// Получить evdev код клавиши по её имени
    pub fn code_of(key_name: &str) -> Option<u16> {
        Self::canonical(key_name).and_then(|name| NAME_TO_CODE.get(name).copied())
    }

    /// Получить имя клавиши по её коду
    pub fn name_of(keycode: u16) -> Option<&'static str> {
        CODE_TO_NAME.get(&Self::normalize_code(keycode)).copied()
    }

    /// Правые модификаторы считаются теми же клавишами, что и левые
    pub fn normalize_code(keycode: u16) -> u16 {
        match keycode {
            97 => 29,   // KEY_RIGHTCTRL
            100 => 56,  // KEY_RIGHTALT
            54 => 42,   // KEY_RIGHTSHIFT
            126 => 125, // KEY_RIGHTMETA
            other => other,
        }
    }

    /// Код модификатора по каноническому имени
    pub fn modifier_code(name: &str) -> Option<u16> {
        match name {
            "ctrl" => Some(29),
            "alt" => Some(56),
            "shift" => Some(42),
            "win" => Some(125),
            _ => None,
        }
    }

    /// Клавиша и необходимость shift для печати символа на US раскладке
    pub fn char_to_key(ch: char) -> Option<(u16, bool)> {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            let mut buf = [0u8; 4];
            return Self::code_of(ch.encode_utf8(&mut buf)).map(|code| (code, false));
        }
        if ch.is_ascii_uppercase() {
            let lower = ch.to_ascii_lowercase();
            return Self::char_to_key(lower).map(|(code, _)| (code, true));
        }

        let key = match ch {
            ' ' => (57, false),
            '\t' => (15, false),
            '-' => (12, false),
            '=' => (13, false),
            '[' => (26, false),
            ']' => (27, false),
            '\\' => (43, false),
            ';' => (39, false),
            '\'' => (40, false),
            '`' => (41, false),
            ',' => (51, false),
            '.' => (52, false),
            '/' => (53, false),
            '_' => (12, true),
            '+' => (13, true),
            '{' => (26, true),
            '}' => (27, true),
            '|' => (43, true),
            ':' => (39, true),
            '"' => (40, true),
            '~' => (41, true),
            '<' => (51, true),
            '>' => (52, true),
            '?' => (53, true),
            '!' => (2, true),
            '@' => (3, true),
            '#' => (4, true),
            '$' => (5, true),
            '%' => (6, true),
            '^' => (7, true),
            '&' => (8, true),
            '*' => (9, true),
            '(' => (10, true),
            ')' => (11, true),
            _ => return None,
        };
        Some(key)
    }
}
