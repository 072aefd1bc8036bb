use crate::debug_if_enabled;
use crate::error::{RemapError, Result};
use crate::mappings::{ActionDescriptor, KeyDescriptor};
use crate::profile::MappingSource;
use crate::services::action_executor::ActionExecutor;
use crate::services::interceptor::{HotkeyBackend, HotkeyHandler, Verdict};
use crate::services::process_monitor::ProcessMonitor;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, BTreeSet};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Сессия перехвата: живые перехватчики и флаг активности
#[derive(Default)]
struct DispatchSession {
    interceptors: BTreeSet<KeyDescriptor>,
    active: bool,
}

/// Ядро переназначения клавиш.
///
/// На каждое назначение регистрируется перехватчик. При срабатывании
/// перехватчик спрашивает монитор, активен ли целевой процесс: если нет,
/// нажатие пропускается без изменений, если да - поглощается и выполняется
/// действие.
///
/// Изменять назначения следует при остановленном перехвате. Если сессия
/// активна, `register`/`unregister` сразу обновляют живые перехватчики.
pub struct HotkeyDispatcher {
    backend: Arc<dyn HotkeyBackend>,
    monitor: Arc<ProcessMonitor>,
    executor: Arc<ActionExecutor>,
    mappings: RwLock<BTreeMap<KeyDescriptor, ActionDescriptor>>,
    session: Mutex<DispatchSession>,
}

/// Тело перехватчика. Паника не выходит за его пределы: нажатие поглощается.
fn dispatch(
    monitor: &ProcessMonitor,
    executor: &ActionExecutor,
    key: &KeyDescriptor,
    action: &ActionDescriptor,
) -> Verdict {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let target = monitor.target();
        if !monitor.is_target_active(&target, true) {
            debug_if_enabled!("'{}': {} не активен, пропускаем нажатие", key, target);
            return Verdict::Forward;
        }

        debug_if_enabled!("'{}' -> {}", key, action.describe());
        if let Err(e) = executor.execute(action) {
            error!("Не удалось выполнить '{}' для '{}': {}", action.describe(), key, e);
        }
        Verdict::Suppress
    }));

    outcome.unwrap_or_else(|_| {
        error!("Паника в обработчике '{}', нажатие поглощено", key);
        Verdict::Suppress
    })
}

impl HotkeyDispatcher {
    pub fn new(
        backend: Arc<dyn HotkeyBackend>,
        monitor: Arc<ProcessMonitor>,
        executor: Arc<ActionExecutor>,
    ) -> Self {
        Self {
            backend,
            monitor,
            executor,
            mappings: RwLock::new(BTreeMap::new()),
            session: Mutex::new(DispatchSession::default()),
        }
    }

    fn make_handler(&self, key: &KeyDescriptor, action: &ActionDescriptor) -> HotkeyHandler {
        let monitor = Arc::clone(&self.monitor);
        let executor = Arc::clone(&self.executor);
        let key = key.clone();
        let action = action.clone();

        Arc::new(move || dispatch(&monitor, &executor, &key, &action))
    }

    /// Добавить или заменить назначение. Возвращает true, если клавиша новая.
    ///
    /// Если перехват активен и новый перехватчик не регистрируется,
    /// прежнее назначение и его перехватчик возвращаются на место.
    pub fn register(&self, key: KeyDescriptor, action: ActionDescriptor) -> Result<bool> {
        let mut session = self.session.lock();
        let previous = self.mappings.write().insert(key.clone(), action.clone());

        if session.active {
            let was_live = session.interceptors.remove(&key);
            if was_live {
                if let Err(e) = self.backend.unregister(&key) {
                    debug!("Снятие перехватчика '{}': {}", key, e);
                }
            }

            if let Err(e) = self.backend.register(&key, self.make_handler(&key, &action)) {
                warn!("Назначение '{}' не применено: {}", key, e);
                self.restore_mapping(&mut session, &key, previous, was_live);
                return Err(e);
            }
            session.interceptors.insert(key);
        }

        Ok(previous.is_none())
    }

    fn restore_mapping(
        &self,
        session: &mut DispatchSession,
        key: &KeyDescriptor,
        previous: Option<ActionDescriptor>,
        was_live: bool,
    ) {
        let Some(action) = previous else {
            self.mappings.write().remove(key);
            return;
        };

        if was_live {
            match self.backend.register(key, self.make_handler(key, &action)) {
                Ok(()) => {
                    session.interceptors.insert(key.clone());
                }
                Err(e) => error!("Не удалось вернуть перехватчик '{}': {}", key, e),
            }
        }
        self.mappings.write().insert(key.clone(), action);
    }

    /// Удалить назначение. Возвращает true, если оно было.
    pub fn unregister(&self, key: &KeyDescriptor) -> bool {
        let mut session = self.session.lock();
        let existed = self.mappings.write().remove(key).is_some();

        if session.interceptors.remove(key) {
            if let Err(e) = self.backend.unregister(key) {
                warn!("Не удалось снять перехватчик '{}': {}", key, e);
            }
        }

        existed
    }

    /// Зарегистрировать перехватчики для всех назначений.
    ///
    /// Ошибки отдельных клавиш логируются и пропускаются. Если не удалось
    /// зарегистрировать ни одной, сессия остается неактивной.
    pub fn start(&self) -> Result<()> {
        let mut session = self.session.lock();
        if session.active {
            debug!("Перехват уже запущен");
            return Ok(());
        }

        let mappings = self.mappings.read().clone();
        if mappings.is_empty() {
            warn!("Нет назначений для перехвата");
            return Err(RemapError::NoMappingsRegistered);
        }

        for (key, action) in &mappings {
            match self.backend.register(key, self.make_handler(key, action)) {
                Ok(()) => {
                    session.interceptors.insert(key.clone());
                }
                Err(e) => warn!("Пропускаем '{}': {}", key, e),
            }
        }

        if session.interceptors.is_empty() {
            error!("Не удалось зарегистрировать ни одной клавиши из {}", mappings.len());
            return Err(RemapError::NoMappingsRegistered);
        }

        session.active = true;
        info!(
            "Перехват запущен: {} из {} клавиш, цель: {}",
            session.interceptors.len(),
            mappings.len(),
            self.monitor.target()
        );

        Ok(())
    }

    /// Снять все перехватчики. Повторный вызов безопасен.
    pub fn stop(&self) {
        let mut session = self.session.lock();

        for key in std::mem::take(&mut session.interceptors) {
            if let Err(e) = self.backend.unregister(&key) {
                warn!("Не удалось снять перехватчик '{}': {}", key, e);
            }
        }

        if session.active {
            info!("Перехват остановлен");
        }
        session.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.session.lock().active
    }

    /// Загрузка назначений без запуска перехвата
    pub fn load_profile(&self, source: &dyn MappingSource) -> Result<()> {
        self.switch_profile(source, false)
    }

    /// Смена профиля: остановка, замена назначений и цели, при `restart` - запуск
    pub fn switch_profile(&self, source: &dyn MappingSource, restart: bool) -> Result<()> {
        if self.is_active() {
            self.stop();
        }

        let mappings: BTreeMap<KeyDescriptor, ActionDescriptor> = source.mappings().into_iter().collect();
        info!("Загружено назначений: {}", mappings.len());
        *self.mappings.write() = mappings;

        self.on_target_process_changed(&source.get_target_process_name());

        if restart {
            self.start()?;
        }

        Ok(())
    }

    pub fn on_target_process_changed(&self, new_name: &str) {
        self.monitor.set_target(new_name.trim());
    }

    pub fn get_mapping_for_key(&self, key: &KeyDescriptor) -> Option<ActionDescriptor> {
        self.mappings.read().get(key).cloned()
    }

    pub fn get_target_process_name(&self) -> String {
        self.monitor.target()
    }

    /// Выполнить действие назначения один раз, без проверки процесса
    pub fn test_mapping(&self, key: &KeyDescriptor) -> Result<()> {
        let action = self
            .get_mapping_for_key(key)
            .ok_or_else(|| RemapError::InvalidKey(format!("для '{}' нет назначения", key)))?;

        info!("Тест '{}': {}", key, action.describe());
        self.executor.execute(&action)
    }

    pub fn mapping_count(&self) -> usize {
        self.mappings.read().len()
    }

    /// Клавиши с живыми перехватчиками
    pub fn live_keys(&self) -> Vec<KeyDescriptor> {
        self.session.lock().interceptors.iter().cloned().collect()
    }
}

impl Drop for HotkeyDispatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, TextStrategy};
    use crate::events::{Modifiers, VirtualKeyEvent};
    use crate::profile::Profile;
    use crate::services::interceptor::InterceptTable;
    use crate::services::virtual_device::KeyEmitter;
    use crate::services::window_tracker::ActiveWindowTracker;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeTracker(Mutex<Option<String>>);

    impl ActiveWindowTracker for FakeTracker {
        fn get_active_process_name(&self) -> Option<String> {
            self.0.lock().clone()
        }

        fn backend_name(&self) -> &'static str {
            "fake"
        }
    }

    #[derive(Default)]
    struct FakeEmitter {
        events: Mutex<Vec<VirtualKeyEvent>>,
        panic: bool,
    }

    impl KeyEmitter for FakeEmitter {
        fn send_event(&self, event: VirtualKeyEvent) -> Result<()> {
            if self.panic {
                panic!("emitter exploded");
            }
            self.events.lock().push(event);
            Ok(())
        }

        fn sync_modifiers(&self, _wanted: Modifiers) -> Result<()> {
            Ok(())
        }

        fn release_all_keys(&self) -> Result<()> {
            Ok(())
        }
    }

    /// Таблица перехвата, в которой следующие `failures` регистраций не проходят
    struct SwitchableBackend {
        table: Arc<InterceptTable>,
        failures: AtomicUsize,
    }

    impl HotkeyBackend for SwitchableBackend {
        fn register(&self, key: &KeyDescriptor, handler: HotkeyHandler) -> Result<()> {
            if self.failures.load(Ordering::SeqCst) > 0 {
                self.failures.fetch_sub(1, Ordering::SeqCst);
                return Err(RemapError::registration(key, "бэкенд недоступен"));
            }
            self.table.register(key, handler)
        }

        fn unregister(&self, key: &KeyDescriptor) -> Result<()> {
            self.table.unregister(key)
        }
    }

    struct Fixture {
        dispatcher: HotkeyDispatcher,
        backend: Arc<SwitchableBackend>,
        table: Arc<InterceptTable>,
        tracker: Arc<FakeTracker>,
        emitter: Arc<FakeEmitter>,
    }

    fn fixture_with(emitter: FakeEmitter) -> Fixture {
        let config = Config::default();
        let tracker = Arc::new(FakeTracker(Mutex::new(None)));
        let emitter = Arc::new(emitter);

        let mut executor_settings = config.executor.clone();
        executor_settings.text_strategy = TextStrategy::Typing;
        executor_settings.line_delay_ms = 0;
        executor_settings.locale = "en_US".to_string();

        let table = Arc::new(InterceptTable::new(&config.input.reserved_keys));
        let monitor = Arc::new(ProcessMonitor::new(tracker.clone(), &config.monitor, "browser.exe"));
        let executor = Arc::new(ActionExecutor::new(emitter.clone(), None, &executor_settings).unwrap());

        let backend = Arc::new(SwitchableBackend {
            table: table.clone(),
            failures: AtomicUsize::new(0),
        });

        Fixture {
            dispatcher: HotkeyDispatcher::new(backend.clone(), monitor, executor),
            backend,
            table,
            tracker,
            emitter,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(FakeEmitter::default())
    }

    fn key(s: &str) -> KeyDescriptor {
        KeyDescriptor::parse(s).unwrap()
    }

    fn text(s: &str) -> ActionDescriptor {
        ActionDescriptor::LiteralText(s.to_string())
    }

    #[test]
    fn test_start_without_mappings_fails() {
        let f = fixture();
        assert!(matches!(f.dispatcher.start(), Err(RemapError::NoMappingsRegistered)));
        assert!(!f.dispatcher.is_active());
    }

    #[test]
    fn test_zero_successful_registrations_fails() {
        let f = fixture();
        f.dispatcher.register(key("ctrl+alt+delete"), text("x")).unwrap();

        assert!(matches!(f.dispatcher.start(), Err(RemapError::NoMappingsRegistered)));
        assert!(!f.dispatcher.is_active());
        assert!(f.table.is_empty());
    }

    #[test]
    fn test_partial_registration_failures() {
        let f = fixture();
        f.dispatcher.register(key("ctrl+t"), text("New Tab")).unwrap();
        f.dispatcher.register(key("ctrl+alt+delete"), text("x")).unwrap();
        f.dispatcher.register(key("f1"), ActionDescriptor::Time).unwrap();

        f.dispatcher.start().unwrap();
        assert!(f.dispatcher.is_active());
        assert_eq!(f.dispatcher.live_keys(), vec![key("f1"), key("ctrl+t")]);
        assert_eq!(f.table.registered_keys(), vec![key("f1"), key("ctrl+t")]);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let f = fixture();
        f.dispatcher.stop();
        f.dispatcher.register(key("f1"), text("x")).unwrap();
        f.dispatcher.start().unwrap();

        f.dispatcher.stop();
        f.dispatcher.stop();
        assert!(!f.dispatcher.is_active());
        assert!(f.table.is_empty());
        assert_eq!(f.dispatcher.mapping_count(), 1);
    }

    #[test]
    fn test_inactive_target_forwards_key() {
        let f = fixture();
        *f.tracker.0.lock() = Some("notepad".to_string());
        f.dispatcher.register(key("ctrl+t"), text("New Tab")).unwrap();
        f.dispatcher.start().unwrap();

        assert_eq!(f.table.fire(&key("ctrl+t").chord()), Some(Verdict::Forward));
        assert!(f.emitter.events.lock().is_empty());
    }

    #[test]
    fn test_active_target_suppresses_and_executes() {
        let f = fixture();
        *f.tracker.0.lock() = Some("Browser.EXE".to_string());
        f.dispatcher.register(key("ctrl+t"), text("New Tab")).unwrap();
        f.dispatcher.start().unwrap();

        assert_eq!(f.table.fire(&key("ctrl+t").chord()), Some(Verdict::Suppress));
        // "New Tab": 7 символов, у 'N' и 'T' есть shift
        let presses = f
            .emitter
            .events
            .lock()
            .iter()
            .filter(|e| e.state == crate::events::KeyState::Pressed)
            .count();
        assert_eq!(presses, 9);
    }

    #[test]
    fn test_failed_action_still_suppresses() {
        let f = fixture();
        *f.tracker.0.lock() = Some("browser.exe".to_string());
        f.dispatcher
            .register(key("f2"), ActionDescriptor::Symbol("nope".into()))
            .unwrap();
        f.dispatcher.start().unwrap();

        assert_eq!(f.table.fire(&key("f2").chord()), Some(Verdict::Suppress));
    }

    #[test]
    fn test_panic_is_contained() {
        let f = fixture_with(FakeEmitter {
            panic: true,
            ..Default::default()
        });
        *f.tracker.0.lock() = Some("browser.exe".to_string());
        f.dispatcher.register(key("f3"), text("boom")).unwrap();
        f.dispatcher.start().unwrap();

        assert_eq!(f.table.fire(&key("f3").chord()), Some(Verdict::Suppress));
    }

    #[test]
    fn test_edits_while_active_update_interceptors() {
        let f = fixture();
        f.dispatcher.register(key("f1"), text("one")).unwrap();
        f.dispatcher.start().unwrap();

        assert!(f.dispatcher.register(key("f2"), text("two")).unwrap());
        assert!(!f.dispatcher.register(key("f1"), text("uno")).unwrap());
        assert!(f.table.is_registered(&key("f2")));
        assert_eq!(f.dispatcher.get_mapping_for_key(&key("f1")), Some(text("uno")));

        assert!(f.dispatcher.unregister(&key("f1")));
        assert!(!f.table.is_registered(&key("f1")));
        assert_eq!(f.dispatcher.live_keys(), vec![key("f2")]);
    }

    #[test]
    fn test_failed_replace_while_active_keeps_old_mapping() {
        let f = fixture();
        *f.tracker.0.lock() = Some("browser.exe".to_string());
        f.dispatcher.register(key("f1"), text("a")).unwrap();
        f.dispatcher.start().unwrap();

        f.backend.failures.store(1, Ordering::SeqCst);
        assert!(f.dispatcher.register(key("f1"), text("b")).is_err());
        assert_eq!(f.dispatcher.get_mapping_for_key(&key("f1")), Some(text("a")));

        // прежний перехватчик снова на месте и выполняет старое действие
        assert_eq!(f.dispatcher.live_keys(), vec![key("f1")]);
        assert!(f.table.is_registered(&key("f1")));
        assert_eq!(f.table.fire(&key("f1").chord()), Some(Verdict::Suppress));
        // 'a': нажатие и отпускание
        assert_eq!(f.emitter.events.lock().len(), 2);

        f.backend.failures.store(1, Ordering::SeqCst);
        assert!(f.dispatcher.register(key("f3"), text("d")).is_err());
        assert!(f.dispatcher.get_mapping_for_key(&key("f3")).is_none());
        assert_eq!(f.dispatcher.mapping_count(), 1);
    }

    #[test]
    fn test_reserved_key_while_active_is_rolled_back() {
        let f = fixture();
        f.dispatcher.register(key("f1"), text("a")).unwrap();
        f.dispatcher.start().unwrap();

        let result = f.dispatcher.register(key("ctrl+alt+delete"), text("x"));
        assert!(matches!(result, Err(RemapError::Registration { .. })));
        assert_eq!(f.dispatcher.mapping_count(), 1);
        assert!(f.dispatcher.get_mapping_for_key(&key("ctrl+alt+delete")).is_none());
        assert_eq!(f.dispatcher.live_keys(), vec![key("f1")]);
    }

    #[test]
    fn test_switch_profile_restarts_with_new_mappings() {
        let f = fixture();
        f.dispatcher.register(key("ctrl+t"), text("New Tab")).unwrap();
        f.dispatcher.start().unwrap();

        let mut profile = Profile::new("work", "firefox");
        profile.add_raw_mapping("f1", "date_short").unwrap();
        f.dispatcher.switch_profile(&profile, true).unwrap();

        assert!(f.dispatcher.is_active());
        assert_eq!(f.dispatcher.get_target_process_name(), "firefox");
        assert_eq!(f.table.registered_keys(), vec![key("f1")]);
        assert!(f.dispatcher.get_mapping_for_key(&key("ctrl+t")).is_none());
    }

    #[test]
    fn test_load_profile_does_not_start() {
        let f = fixture();
        let mut profile = Profile::new("default", "chrome");
        profile.add_raw_mapping("f1", "time").unwrap();

        f.dispatcher.load_profile(&profile).unwrap();
        assert!(!f.dispatcher.is_active());
        assert_eq!(f.dispatcher.mapping_count(), 1);
        assert!(f.table.is_empty());
    }

    #[test]
    fn test_mapping_runs_action_once() {
        let f = fixture();
        f.dispatcher.register(key("f1"), text("a")).unwrap();

        f.dispatcher.test_mapping(&key("f1")).unwrap();
        assert_eq!(f.emitter.events.lock().len(), 2);
        assert!(f.dispatcher.test_mapping(&key("f9")).is_err());
    }
}
