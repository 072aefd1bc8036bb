use crate::config::Config;
use crate::debug_if_enabled;
use crate::error::{RemapError, Result};
use crate::events::KeyState;
use crate::services::interceptor::InterceptTable;
use crate::services::virtual_device::KeyEmitter;
use crate::utils::DeviceFinder;
use evdev::{Device, EventType, InputEvent};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use super::key_router::KeyRouter;
use super::r#trait::KeyboardListenerTrait;

/// Слушатель физической клавиатуры: эксклюзивный захват устройства и
/// маршрутизация каждого события через таблицу перехвата.
pub struct RealKeyboardListener {
    device: Device,
    router: KeyRouter,
}

/// Открыть устройство и захватить его, чтобы исходные события не доходили до системы
fn open_grabbed(path: &Path) -> Result<Device> {
    let mut device = Device::open(path)
        .map_err(|e| RemapError::DeviceNotFound(format!("{}: {}", path.display(), e)))?;

    if let Err(e) = device.grab() {
        warn!("Клавиатура {} уже захвачена другим процессом или нет прав", path.display());
        warn!("Проверьте, что пользователь в группе input: sudo usermod -a -G input $USER");
        return Err(RemapError::Permission(format!(
            "эксклюзивный захват {} не удался: {}",
            path.display(),
            e
        )));
    }

    info!(
        "Клавиатура захвачена: {} ({}, phys: {:?})",
        device.name().unwrap_or("без имени"),
        path.display(),
        device.physical_path()
    );
    Ok(device)
}

impl RealKeyboardListener {
    pub fn new(
        config: &Config,
        table: Arc<InterceptTable>,
        emitter: Arc<dyn KeyEmitter>,
    ) -> Result<Self> {
        let path = DeviceFinder::find_keyboard_device(&config.input.device_path)?;

        Ok(Self {
            device: open_grabbed(&path)?,
            router: KeyRouter::new(table, emitter),
        })
    }

    /// Блокирующий цикл чтения: обработчики перехватчиков выполняются в этом потоке
    fn run_blocking(mut self) -> Result<()> {
        info!("Чтение событий клавиатуры начато");

        loop {
            let batch: Vec<InputEvent> = match self.device.fetch_events() {
                Ok(events) => events.collect(),
                Err(e) => {
                    error!("Чтение событий клавиатуры: {}", e);
                    std::thread::sleep(Duration::from_millis(100));
                    continue;
                }
            };

            for event in batch {
                if let Err(e) = self.route(event) {
                    error!("Событие {} не обработано: {}", event.code(), e);
                }
            }
        }
    }

    fn route(&mut self, event: InputEvent) -> Result<()> {
        if event.event_type() != EventType::KEY {
            return Ok(());
        }

        match KeyState::from_evdev_value(event.value()) {
            Some(state) => {
                debug_if_enabled!("Клавиша {} {:?}", event.code(), state);
                self.router.handle_key(event.code(), state)
            }
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl KeyboardListenerTrait for RealKeyboardListener {
    /// Чтение идет в отдельном потоке ОС: runtime не ждет его при завершении
    async fn run(self: Box<Self>) -> Result<()> {
        let (done_tx, done_rx) = tokio::sync::oneshot::channel();

        std::thread::Builder::new()
            .name("keyboard-listener".to_string())
            .spawn(move || {
                let _ = done_tx.send((*self).run_blocking());
            })?;

        done_rx.await.map_err(|_| {
            RemapError::Internal("Поток чтения клавиатуры завершился без результата".to_string())
        })?
    }
}

impl Drop for RealKeyboardListener {
    fn drop(&mut self) {
        match self.device.ungrab() {
            Ok(()) => info!("Клавиатура освобождена"),
            Err(e) => error!("Не удалось освободить клавиатуру: {}", e),
        }
    }
}
