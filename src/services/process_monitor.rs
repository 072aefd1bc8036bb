use crate::config::MonitorConfig;
use crate::error::{RemapError, Result};
use crate::events::{ActiveProcessState, MonitorStatus};
use crate::services::process_matcher::ProcessMatcher;
use crate::services::window_tracker::ActiveWindowTracker;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Instant;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

/// Фоновый мониторинг активного процесса.
///
/// Цикл опроса и обработчик клавиш работают с одним снимком
/// `ActiveProcessState`, который заменяется целиком. Смена цели увеличивает
/// `generation`, и запись цикла, начатая до смены, отбрасывается.
pub struct ProcessMonitor {
    inner: Arc<MonitorInner>,
    task: Mutex<Option<MonitorTask>>,
}

struct MonitorInner {
    tracker: Arc<dyn ActiveWindowTracker>,
    matcher: ProcessMatcher,
    settings: MonitorConfig,
    state: RwLock<Arc<ActiveProcessState>>,
}

struct MonitorTask {
    handle: JoinHandle<()>,
    shutdown: watch::Sender<bool>,
}

impl MonitorInner {
    fn snapshot(&self) -> Arc<ActiveProcessState> {
        Arc::clone(&self.state.read())
    }

    fn evaluate(&self, name: Option<&str>, target: &str) -> bool {
        match name {
            Some(name) => self.matcher.matches(name, target),
            None => self.settings.match_when_undetectable && !self.tracker.is_available(),
        }
    }

    /// Запись результата проверки, начатой со снимка `from`
    fn store(&self, from: &ActiveProcessState, name: Option<String>, is_match: bool) -> bool {
        let mut state = self.state.write();

        if state.generation != from.generation || state.target_process_name != from.target_process_name {
            debug!(
                "Цель сменилась во время проверки ({} -> {}), результат отброшен",
                from.target_process_name, state.target_process_name
            );
            return false;
        }

        if state.current_process_name != name {
            debug!(
                "Активный процесс: {:?} -> {:?} (совпадение: {})",
                state.current_process_name, name, is_match
            );
        }

        *state = Arc::new(state.checked(name, is_match, Instant::now()));
        true
    }

    async fn poll_once(self: &Arc<Self>) -> Result<()> {
        let snapshot = self.snapshot();
        let inner = Arc::clone(self);
        let target = snapshot.target_process_name.clone();

        let (name, is_match) = tokio::task::spawn_blocking(move || {
            let name = inner.tracker.get_active_process_name();
            let is_match = inner.evaluate(name.as_deref(), &target);
            (name, is_match)
        })
        .await
        .map_err(|e| RemapError::Internal(format!("Опрос активного окна прерван: {}", e)))?;

        self.store(&snapshot, name, is_match);
        Ok(())
    }
}

async fn run_loop(inner: Arc<MonitorInner>, mut shutdown: watch::Receiver<bool>) {
    info!(
        "Мониторинг процессов запущен (интервал {:?}, трекер: {})",
        inner.settings.poll_interval(),
        inner.tracker.backend_name()
    );

    loop {
        let delay = match inner.poll_once().await {
            Ok(()) => inner.settings.poll_interval(),
            Err(e) => {
                error!("Ошибка в цикле мониторинга: {}", e);
                inner.settings.error_backoff()
            }
        };

        tokio::select! {
            _ = shutdown.changed() => break,
            _ = sleep(delay) => {}
        }
    }

    info!("Мониторинг процессов остановлен");
}

impl ProcessMonitor {
    pub fn new(
        tracker: Arc<dyn ActiveWindowTracker>,
        settings: &MonitorConfig,
        target_process_name: &str,
    ) -> Self {
        Self {
            inner: Arc::new(MonitorInner {
                tracker,
                matcher: ProcessMatcher::new(settings.match_mode),
                settings: settings.clone(),
                state: RwLock::new(Arc::new(ActiveProcessState::new(target_process_name))),
            }),
            task: Mutex::new(None),
        }
    }

    /// Запуск фонового опроса. Повторный вызов ничего не делает.
    pub fn start(&self) -> Result<()> {
        let mut task = self.task.lock();
        if task.as_ref().is_some_and(|t| !t.handle.is_finished()) {
            debug!("Мониторинг уже запущен");
            return Ok(());
        }

        let runtime = Handle::try_current()
            .map_err(|e| RemapError::Internal(format!("Нет tokio runtime для мониторинга: {}", e)))?;

        let (shutdown, receiver) = watch::channel(false);
        let handle = runtime.spawn(run_loop(Arc::clone(&self.inner), receiver));
        *task = Some(MonitorTask { handle, shutdown });

        Ok(())
    }

    /// Остановка с ожиданием не дольше `join_timeout`. Безопасно в остановленном состоянии.
    pub async fn stop(&self) {
        let task = self.task.lock().take();
        let Some(MonitorTask { mut handle, shutdown }) = task else {
            return;
        };

        let _ = shutdown.send(true);

        match timeout(self.inner.settings.join_timeout(), &mut handle).await {
            Ok(Ok(())) => debug!("Задача мониторинга завершена"),
            Ok(Err(e)) => warn!("Задача мониторинга завершилась с ошибкой: {}", e),
            Err(_) => {
                warn!(
                    "Мониторинг не остановился за {:?}, прерываем задачу",
                    self.inner.settings.join_timeout()
                );
                handle.abort();
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|t| !t.handle.is_finished())
    }

    /// Активна ли цель. С `use_cache` возвращает кэш, если он моложе TTL
    /// и посчитан для той же цели; иначе делает синхронный запрос.
    pub fn is_target_active(&self, target: &str, use_cache: bool) -> bool {
        let snapshot = self.inner.snapshot();

        if use_cache
            && snapshot.target_process_name == target
            && snapshot.is_fresh(self.inner.settings.cache_ttl(), Instant::now())
        {
            return snapshot.is_match;
        }

        let name = self.inner.tracker.get_active_process_name();
        let is_match = self.inner.evaluate(name.as_deref(), target);

        if snapshot.target_process_name == target {
            self.inner.store(&snapshot, name, is_match);
        }

        is_match
    }

    /// Смена цели и сброс кэша одной заменой снимка
    pub fn set_target(&self, target_process_name: &str) {
        let mut state = self.inner.state.write();
        if state.target_process_name == target_process_name {
            return;
        }

        info!(
            "Целевой процесс: {} -> {}",
            state.target_process_name, target_process_name
        );
        *state = Arc::new(state.retargeted(target_process_name));
    }

    pub fn target(&self) -> String {
        self.inner.snapshot().target_process_name.clone()
    }

    pub fn snapshot(&self) -> Arc<ActiveProcessState> {
        self.inner.snapshot()
    }

    pub fn status(&self) -> MonitorStatus {
        let snapshot = self.inner.snapshot();
        MonitorStatus {
            current_process: snapshot.current_process_name.clone(),
            target_process: snapshot.target_process_name.clone(),
            is_target_active: snapshot.is_match,
            monitor_running: self.is_running(),
        }
    }
}

impl Drop for ProcessMonitor {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.handle.abort();
        }
    }
}
