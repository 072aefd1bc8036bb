use crate::events::Modifiers;
use evdev::KeyCode;

/// Физически удерживаемые модификаторы (левые и правые считаются отдельно)
#[derive(Debug, Default)]
pub struct ModifierState {
    left: Modifiers,
    right: Modifiers,
}

impl ModifierState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn to_modifiers(&self) -> Modifiers {
        Modifiers {
            ctrl: self.left.ctrl || self.right.ctrl,
            alt: self.left.alt || self.right.alt,
            shift: self.left.shift || self.right.shift,
            win: self.left.win || self.right.win,
        }
    }

    /// Имя модификатора для кода клавиши
    pub fn modifier_name(code: u16) -> Option<&'static str> {
        match KeyCode::new(code) {
            KeyCode::KEY_LEFTCTRL | KeyCode::KEY_RIGHTCTRL => Some("ctrl"),
            KeyCode::KEY_LEFTALT | KeyCode::KEY_RIGHTALT => Some("alt"),
            KeyCode::KEY_LEFTSHIFT | KeyCode::KEY_RIGHTSHIFT => Some("shift"),
            KeyCode::KEY_LEFTMETA | KeyCode::KEY_RIGHTMETA => Some("win"),
            _ => None,
        }
    }

    pub fn update_key(&mut self, code: u16, pressed: bool) {
        let Some(name) = Self::modifier_name(code) else {
            return;
        };

        let side = match KeyCode::new(code) {
            KeyCode::KEY_RIGHTCTRL | KeyCode::KEY_RIGHTALT | KeyCode::KEY_RIGHTSHIFT | KeyCode::KEY_RIGHTMETA => {
                &mut self.right
            }
            _ => &mut self.left,
        };
        side.set(name, pressed);
    }
}
