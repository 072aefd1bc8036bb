use std::fmt;

/// Состояние клавиши
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyState {
    Pressed,
    Released,
    Repeat,
}

impl KeyState {
    /// Значение evdev события (0 - отпускание, 1 - нажатие, 2 - автоповтор)
    pub fn from_evdev_value(value: i32) -> Option<Self> {
        match value {
            0 => Some(KeyState::Released),
            1 => Some(KeyState::Pressed),
            2 => Some(KeyState::Repeat),
            _ => None,
        }
    }

    pub fn evdev_value(&self) -> i32 {
        match self {
            KeyState::Released => 0,
            KeyState::Pressed => 1,
            KeyState::Repeat => 2,
        }
    }
}

/// Код клавиши (evdev коды)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyCode(pub u16);

impl KeyCode {
    pub fn new(code: u16) -> Self {
        Self(code)
    }

    pub fn value(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KEY_{}", self.0)
    }
}

/// Модификаторы клавиш
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub win: bool,
}

impl Modifiers {
    /// Канонический порядок модификаторов в дескрипторе клавиши
    pub const NAMES: [&'static str; 4] = ["ctrl", "alt", "shift", "win"];

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ctrl(mut self, ctrl: bool) -> Self {
        self.ctrl = ctrl;
        self
    }

    pub fn with_alt(mut self, alt: bool) -> Self {
        self.alt = alt;
        self
    }

    pub fn with_shift(mut self, shift: bool) -> Self {
        self.shift = shift;
        self
    }

    pub fn with_win(mut self, win: bool) -> Self {
        self.win = win;
        self
    }

    pub fn is_empty(&self) -> bool {
        !self.ctrl && !self.alt && !self.shift && !self.win
    }

    pub fn has_any(&self) -> bool {
        !self.is_empty()
    }

    /// Установить модификатор по имени. Возвращает false для неизвестного имени.
    pub fn set(&mut self, name: &str, value: bool) -> bool {
        match name {
            "ctrl" => self.ctrl = value,
            "alt" => self.alt = value,
            "shift" => self.shift = value,
            "win" => self.win = value,
            _ => return false,
        }
        true
    }

    pub fn is_modifier_name(name: &str) -> bool {
        Self::NAMES.contains(&name)
    }

    /// Имена активных модификаторов в каноническом порядке
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        let flags = [self.ctrl, self.alt, self.shift, self.win];
        Self::NAMES
            .into_iter()
            .zip(flags)
            .filter_map(|(name, on)| on.then_some(name))
    }

}

impl fmt::Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "none");
        }
        let names: Vec<&str> = self.names().collect();
        write!(f, "{}", names.join("+"))
    }
}
