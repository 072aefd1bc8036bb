use once_cell::sync::Lazy;
use std::collections::HashMap;

// Символы валют
const CURRENCIES: &[(&str, &str, &str)] = &[
    ("ruble", "₽", "Рубль"),
    ("tenge", "₸", "Тенге"),
    ("dram", "֏", "Драм"),
    ("som", "soʻm", "Сум"),
    ("euro", "€", "Евро"),
    ("pound", "£", "Фунт"),
    ("yen", "¥", "Йена"),
    ("cent", "¢", "Цент"),
];

// Именованные символы
const SYMBOLS: &[(&str, &str, &str)] = &[
    // Математические
    ("plus", "+", "Плюс"),
    ("minus", "-", "Минус"),
    ("multiply", "*", "Умножить"),
    ("divide", "/", "Разделить"),
    ("equals", "=", "Равно"),
    ("not_equal", "≠", "Не равно"),
    ("less_equal", "≤", "Меньше или равно"),
    ("greater_equal", "≥", "Больше или равно"),
    ("approx", "≈", "Приблизительно"),
    ("plus_minus", "±", "Плюс-минус"),
    ("infinity", "∞", "Бесконечность"),
    ("pi", "π", "Пи"),
    ("sum", "∑", "Сумма"),
    ("integral", "∫", "Интеграл"),
    // Стрелки
    ("arrow_left", "←", "Стрелка влево"),
    ("arrow_right", "→", "Стрелка вправо"),
    ("arrow_up", "↑", "Стрелка вверх"),
    ("arrow_down", "↓", "Стрелка вниз"),
    ("arrow_both", "↔", "Стрелка в обе стороны"),
    ("arrow_double_left", "«", "Двойная влево"),
    ("arrow_double_right", "»", "Двойная вправо"),
    // Специальные
    ("copyright", "©", "Копирайт"),
    ("registered", "®", "Зарегистрировано"),
    ("trademark", "™", "Торговая марка"),
    ("degree", "°", "Градус"),
    ("section", "§", "Секция"),
    ("paragraph", "¶", "Параграф"),
    ("bullet", "•", "Маркер"),
    ("middle_dot", "·", "Средняя точка"),
    ("ellipsis", "…", "Многоточие"),
    ("em_dash", "—", "Длинное тире"),
    ("en_dash", "–", "Короткое тире"),
    // Кавычки
    ("quote_left", "“", "Левая двойная"),
    ("quote_right", "”", "Правая двойная"),
    ("quote_single_left", "‘", "Левая одинарная"),
    ("quote_single_right", "’", "Правая одинарная"),
    // Валюты
    ("euro", "€", "Евро"),
    ("pound", "£", "Фунт"),
    ("yen", "¥", "Йена"),
    ("cent", "¢", "Цент"),
    // Другие
    ("check", "✓", "Галочка"),
    ("cross", "✗", "Крестик"),
    ("star", "★", "Звезда"),
    ("heart", "♥", "Сердце"),
    ("diamond", "♦", "Бубны"),
    ("club", "♣", "Трефы"),
    ("spade", "♠", "Пики"),
];

static CURRENCY_MAP: Lazy<HashMap<&'static str, (&'static str, &'static str)>> =
    Lazy::new(|| CURRENCIES.iter().map(|&(id, sym, name)| (id, (sym, name))).collect());

static SYMBOL_MAP: Lazy<HashMap<&'static str, (&'static str, &'static str)>> =
    Lazy::new(|| SYMBOLS.iter().map(|&(id, sym, name)| (id, (sym, name))).collect());

/// Символ валюты по идентификатору (регистронезависимо)
pub fn currency_symbol(id: &str) -> Option<&'static str> {
    CURRENCY_MAP.get(id.to_lowercase().as_str()).map(|&(sym, _)| sym)
}

pub fn currency_name(id: &str) -> Option<&'static str> {
    CURRENCY_MAP.get(id.to_lowercase().as_str()).map(|&(_, name)| name)
}

/// Именованный символ по идентификатору (регистронезависимо)
pub fn named_symbol(id: &str) -> Option<&'static str> {
    SYMBOL_MAP.get(id.to_lowercase().as_str()).map(|&(sym, _)| sym)
}

pub fn symbol_name(id: &str) -> Option<&'static str> {
    SYMBOL_MAP.get(id.to_lowercase().as_str()).map(|&(_, name)| name)
}
