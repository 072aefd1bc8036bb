use crate::error::Result;
use crate::services::interceptor::InterceptTable;
use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::{debug, info, warn};

use super::r#trait::KeyboardListenerTrait;

/// Эмуляция клавиатуры: по очереди "нажимает" зарегистрированные комбинации
pub struct DryRunKeyboardListener {
    table: Arc<InterceptTable>,
    period: Duration,
}

impl DryRunKeyboardListener {
    pub fn new(table: Arc<InterceptTable>) -> Self {
        info!("Инициализация DryRunKeyboardListener");
        Self {
            table,
            period: Duration::from_secs(5),
        }
    }

    async fn run_impl(self) -> Result<()> {
        info!("Dry-run режим - KeyboardListener работает в режиме эмуляции");

        let mut ticker = interval(self.period);
        let mut next = 0usize;

        loop {
            ticker.tick().await;

            let handlers = self.table.handlers();
            if handlers.is_empty() {
                debug!("Нет зарегистрированных перехватчиков");
                continue;
            }

            let (key, handler) = handlers[next % handlers.len()].clone();
            next = next.wrapping_add(1);

            match tokio::task::spawn_blocking(move || handler()).await {
                Ok(verdict) => info!("[DRY RUN] Нажатие '{}': {:?}", key, verdict),
                Err(e) => warn!("[DRY RUN] Обработчик '{}' прерван: {}", key, e),
            }
        }
    }
}

#[async_trait::async_trait]
impl KeyboardListenerTrait for DryRunKeyboardListener {
    async fn run(self: Box<Self>) -> Result<()> {
        (*self).run_impl().await
    }
}
