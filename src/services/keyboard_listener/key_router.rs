use crate::debug_if_enabled;
use crate::error::Result;
use crate::events::{KeyCode, KeyState, VirtualKeyEvent};
use crate::mappings::{KeyChord, KeyNames};
use crate::services::interceptor::{InterceptTable, Verdict};
use crate::services::virtual_device::KeyEmitter;
use std::collections::HashSet;
use std::sync::Arc;

use super::modifier_state::ModifierState;

/// Маршрутизация физических нажатий: перехватчик или проброс на виртуальное устройство.
///
/// Аккорд ищется по модификаторам, удерживаемым ДО нажатия клавиши, так что
/// `ctrl` сам по себе и `ctrl+t` - разные аккорды. Поглощенное нажатие
/// поглощает и свои автоповторы, и отпускание.
pub struct KeyRouter {
    table: Arc<InterceptTable>,
    emitter: Arc<dyn KeyEmitter>,
    modifiers: ModifierState,
    suppressed: HashSet<u16>,
}

impl KeyRouter {
    pub fn new(table: Arc<InterceptTable>, emitter: Arc<dyn KeyEmitter>) -> Self {
        Self {
            table,
            emitter,
            modifiers: ModifierState::new(),
            suppressed: HashSet::new(),
        }
    }

    pub fn handle_key(&mut self, code: u16, state: KeyState) -> Result<()> {
        let held_before = self.modifiers.to_modifiers();
        self.modifiers.update_key(code, state != KeyState::Released);

        match state {
            KeyState::Pressed => {
                let chord = KeyChord {
                    modifiers: held_before,
                    code: KeyNames::normalize_code(code),
                };

                if self.table.fire(&chord) == Some(Verdict::Suppress) {
                    debug_if_enabled!("Нажатие {} поглощено", chord);
                    self.suppressed.insert(code);
                    // Действие могло отпустить модификаторы виртуального устройства
                    return self.emitter.sync_modifiers(self.forwarded_modifiers());
                }
            }
            KeyState::Repeat => {
                if self.suppressed.contains(&code) {
                    return Ok(());
                }
            }
            KeyState::Released => {
                if self.suppressed.remove(&code) {
                    return Ok(());
                }
            }
        }

        self.emitter.send_event(VirtualKeyEvent::new(KeyCode::new(code), state))
    }

    /// Удерживаемые модификаторы, которые были проброшены (не поглощены)
    fn forwarded_modifiers(&self) -> crate::events::Modifiers {
        let mut held = self.modifiers.to_modifiers();
        for &code in &self.suppressed {
            if let Some(name) = ModifierState::modifier_name(code) {
                held.set(name, false);
            }
        }
        held
    }
}
