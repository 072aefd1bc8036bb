use crate::debug_if_enabled;
use crate::error::{RemapError, Result};
use crate::remap_error;
use crate::events::{KeyCode, KeyState, Modifiers, VirtualKeyEvent};
use crate::mappings::{KeyChord, KeyNames};
use parking_lot::Mutex;
use smallvec::SmallVec;
use std::collections::BTreeSet;
use tracing::{debug, error, info};

/// Источник синтетического ввода: проброс событий и эмуляция нажатий.
pub trait KeyEmitter: Send + Sync {
    fn send_event(&self, event: VirtualKeyEvent) -> Result<()>;

    /// Привести модификаторы виртуального устройства к `wanted`
    fn sync_modifiers(&self, wanted: Modifiers) -> Result<()>;

    /// Отпустить все клавиши, нажатые через устройство
    fn release_all_keys(&self) -> Result<()>;

    /// Нажать и отпустить комбинацию: модификаторы, клавиша, отпускание в обратном порядке
    fn tap_chord(&self, chord: KeyChord) -> Result<()> {
        let modifier_codes: SmallVec<[u16; 4]> = chord
            .modifiers
            .names()
            .filter_map(KeyNames::modifier_code)
            .collect();

        for &code in &modifier_codes {
            self.send_event(VirtualKeyEvent::press(KeyCode::new(code)))?;
        }

        let key = KeyCode::new(chord.code);
        let result = self
            .send_event(VirtualKeyEvent::press(key))
            .and_then(|_| self.send_event(VirtualKeyEvent::release(key)));

        for &code in modifier_codes.iter().rev() {
            self.send_event(VirtualKeyEvent::release(KeyCode::new(code)))?;
        }

        result
    }
}

struct DeviceState {
    device: Option<uinput::Device>,
    pressed: BTreeSet<u16>,
}

/// Виртуальная клавиатура uinput. В dry-run режиме события только логируются.
pub struct VirtualDevice {
    state: Mutex<DeviceState>,
    device_name: String,
    dry_run: bool,
}

/// Левый и правый коды одного модификатора
fn modifier_variants(name: &str) -> [u16; 2] {
    match name {
        "ctrl" => [29, 97],
        "alt" => [56, 100],
        "shift" => [42, 54],
        _ => [125, 126],
    }
}

impl VirtualDevice {
    pub fn new(device_name: &str, dry_run: bool) -> Result<Self> {
        info!("Инициализация VirtualDevice '{}' (dry_run: {})", device_name, dry_run);

        let device = if dry_run {
            None
        } else {
            Some(Self::create_virtual_device(device_name)?)
        };

        Ok(Self {
            state: Mutex::new(DeviceState {
                device,
                pressed: BTreeSet::new(),
            }),
            device_name: device_name.to_string(),
            dry_run,
        })
    }

    fn create_virtual_device(device_name: &str) -> Result<uinput::Device> {
        info!("Создание виртуального устройства uinput '{}' для инъекции клавиш", device_name);

        let virtual_device = uinput::default()?
            .name(device_name)?
            .event(uinput::event::Keyboard::All)?
            .create()
            .map_err(|e| {
                RemapError::Injection(format!(
                    "Не удалось создать виртуальное устройство '{}': {}",
                    device_name, e
                ))
            })?;

        info!("Виртуальное устройство '{}' создано успешно", device_name);
        Ok(virtual_device)
    }

    fn write(&self, state: &mut DeviceState, event: VirtualKeyEvent) -> Result<()> {
        let keycode = event.key_code.value();

        if self.dry_run {
            info!("[DRY RUN] Виртуальное событие: {:?}", event);
        } else {
            let device = state
                .device
                .as_mut()
                .ok_or_else(|| RemapError::Injection("Виртуальное устройство недоступно".to_string()))?;

            device
                .write(1, i32::from(keycode), event.state.evdev_value())
                .map_err(|e| remap_error!(injection, "Не удалось отправить событие клавиши {}: {}", keycode, e))?;

            device
                .write(0, 0, 0)
                .map_err(|e| remap_error!(injection, "Не удалось синхронизировать события: {}", e))?;

            debug_if_enabled!("Виртуальное событие {} отправлено", event.key_code);
        }

        match event.state {
            KeyState::Pressed | KeyState::Repeat => {
                state.pressed.insert(keycode);
            }
            KeyState::Released => {
                state.pressed.remove(&keycode);
            }
        }

        Ok(())
    }

    /// Коды клавиш, которые сейчас нажаты через устройство
    pub fn pressed_keys(&self) -> Vec<u16> {
        self.state.lock().pressed.iter().copied().collect()
    }
}

impl KeyEmitter for VirtualDevice {
    fn send_event(&self, event: VirtualKeyEvent) -> Result<()> {
        let mut state = self.state.lock();
        self.write(&mut state, event)
    }

    fn sync_modifiers(&self, wanted: Modifiers) -> Result<()> {
        let mut state = self.state.lock();
        let mut events: SmallVec<[VirtualKeyEvent; 8]> = SmallVec::new();

        for name in Modifiers::NAMES {
            let want = match name {
                "ctrl" => wanted.ctrl,
                "alt" => wanted.alt,
                "shift" => wanted.shift,
                _ => wanted.win,
            };
            let held: SmallVec<[u16; 2]> = modifier_variants(name)
                .into_iter()
                .filter(|code| state.pressed.contains(code))
                .collect();

            if want && held.is_empty() {
                if let Some(code) = KeyNames::modifier_code(name) {
                    events.push(VirtualKeyEvent::press(KeyCode::new(code)));
                }
            } else if !want {
                events.extend(held.into_iter().map(|code| VirtualKeyEvent::release(KeyCode::new(code))));
            }
        }

        if !events.is_empty() {
            debug!("Синхронизация модификаторов виртуального устройства: {}", wanted);
        }

        for event in events {
            self.write(&mut state, event)?;
        }

        Ok(())
    }

    fn release_all_keys(&self) -> Result<()> {
        let mut state = self.state.lock();
        let pressed: Vec<u16> = state.pressed.iter().rev().copied().collect();

        if !pressed.is_empty() {
            info!("Отпускаем {} нажатых клавиш", pressed.len());
        }

        let mut last_error = None;
        for code in pressed {
            if let Err(e) = self.write(&mut state, VirtualKeyEvent::release(KeyCode::new(code))) {
                error!("Не удалось отпустить клавишу {}: {}", code, e);
                state.pressed.remove(&code);
                last_error = Some(e);
            }
        }

        match last_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Drop for VirtualDevice {
    fn drop(&mut self) {
        if !self.dry_run {
            info!("Закрытие виртуального устройства '{}'", self.device_name);
        }
    }
}
