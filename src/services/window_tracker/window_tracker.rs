use crate::error::{RemapError, Result};
use parking_lot::Mutex;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::kdotool::KdotoolBackend;
use super::process_name::ProcessNameResolver;
use super::r#trait::ActiveWindowTracker;
use super::sway::SwayBackend;
use super::xdotool::XdotoolBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkingMethod {
    Kdotool,
    Xdotool,
    Sway,
}

impl WorkingMethod {
    pub fn from_mode(mode: &str) -> Option<Self> {
        match mode {
            "kdotool" => Some(Self::Kdotool),
            "xdotool" => Some(Self::Xdotool),
            "sway" => Some(Self::Sway),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Kdotool => "kdotool",
            Self::Xdotool => "xdotool",
            Self::Sway => "sway",
        }
    }
}

impl fmt::Display for WorkingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Источник pid активного окна (одна утилита рабочего стола)
trait WindowPidSource: Send + Sync {
    fn test(&self) -> Result<()>;
    fn active_window_pid(&self) -> Result<u32>;
}

impl WindowPidSource for KdotoolBackend {
    fn test(&self) -> Result<()> {
        KdotoolBackend::test(self)
    }

    fn active_window_pid(&self) -> Result<u32> {
        KdotoolBackend::active_window_pid(self)
    }
}

impl WindowPidSource for XdotoolBackend {
    fn test(&self) -> Result<()> {
        XdotoolBackend::test(self)
    }

    fn active_window_pid(&self) -> Result<u32> {
        XdotoolBackend::active_window_pid(self)
    }
}

impl WindowPidSource for SwayBackend {
    fn test(&self) -> Result<()> {
        SwayBackend::test(self)
    }

    fn active_window_pid(&self) -> Result<u32> {
        SwayBackend::active_window_pid(self)
    }
}

fn backend_for(method: WorkingMethod) -> Box<dyn WindowPidSource> {
    match method {
        WorkingMethod::Kdotool => Box::new(KdotoolBackend::new()),
        WorkingMethod::Xdotool => Box::new(XdotoolBackend::new()),
        WorkingMethod::Sway => Box::new(SwayBackend::new()),
    }
}

/// Минимальный интервал между попытками определить рабочий способ
const REDETECT_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Default)]
struct Selection {
    method: Option<WorkingMethod>,
    last_detection: Option<Instant>,
}

/// Трекер на утилитах рабочего стола.
///
/// В режиме `auto` перебирает способы по порядку и запоминает рабочий.
/// Один запрос вызывает утилиту не больше одного раза: если способ
/// перестал отвечать, запрос возвращает `None`, а способ определяется
/// заново не чаще раза в `REDETECT_INTERVAL`.
pub struct RealWindowTracker {
    backends: Vec<(WorkingMethod, Box<dyn WindowPidSource>)>,
    selection: Mutex<Selection>,
    redetect_interval: Duration,
    resolver: ProcessNameResolver,
}

impl RealWindowTracker {
    pub fn new(detection_mode: &str) -> Result<Self> {
        let candidates = match detection_mode {
            "auto" => Self::auto_candidates(),
            mode => vec![WorkingMethod::from_mode(mode).ok_or_else(|| {
                RemapError::Internal(format!("Неизвестный режим детекции: {}", mode))
            })?],
        };

        info!(
            "Инициализация RealWindowTracker, способы: {:?}",
            candidates.iter().map(WorkingMethod::as_str).collect::<Vec<_>>()
        );

        let backends = candidates
            .into_iter()
            .map(|method| (method, backend_for(method)))
            .collect();
        Ok(Self::with_backends(backends, REDETECT_INTERVAL))
    }

    fn with_backends(
        backends: Vec<(WorkingMethod, Box<dyn WindowPidSource>)>,
        redetect_interval: Duration,
    ) -> Self {
        Self {
            backends,
            selection: Mutex::new(Selection::default()),
            redetect_interval,
            resolver: ProcessNameResolver::new(),
        }
    }

    /// Порядок перебора зависит от сессии: под Sway сначала swaymsg
    fn auto_candidates() -> Vec<WorkingMethod> {
        let desktop = std::env::var("XDG_CURRENT_DESKTOP")
            .unwrap_or_default()
            .to_lowercase();

        if std::env::var("SWAYSOCK").is_ok() || desktop.contains("sway") {
            vec![WorkingMethod::Sway, WorkingMethod::Kdotool, WorkingMethod::Xdotool]
        } else {
            vec![WorkingMethod::Kdotool, WorkingMethod::Xdotool, WorkingMethod::Sway]
        }
    }

    fn methods(&self) -> Vec<WorkingMethod> {
        self.backends.iter().map(|(method, _)| *method).collect()
    }

    fn backend(&self, method: WorkingMethod) -> Option<&dyn WindowPidSource> {
        self.backends
            .iter()
            .find(|(m, _)| *m == method)
            .map(|(_, backend)| backend.as_ref())
    }

    fn detect_working_method(&self) -> Option<WorkingMethod> {
        debug!("Определяем рабочий метод детекции окон...");

        for (method, backend) in &self.backends {
            match backend.test() {
                Ok(()) => {
                    info!("Используем {}", method);
                    return Some(*method);
                }
                Err(e) => debug!("{} не работает: {}", method, e),
            }
        }

        warn!("Ни один метод детекции окон не работает");
        None
    }

    /// Текущий способ; перебор запускается, только если прошел интервал
    fn current_method(&self, selection: &mut Selection) -> Option<WorkingMethod> {
        if selection.method.is_none() {
            let due = selection
                .last_detection
                .map_or(true, |at| at.elapsed() >= self.redetect_interval);
            if due {
                selection.last_detection = Some(Instant::now());
                selection.method = self.detect_working_method();
            }
        }
        selection.method
    }

    fn active_window_pid(&self) -> Option<u32> {
        let mut selection = self.selection.lock();
        let method = self.current_method(&mut selection)?;
        let backend = self.backend(method)?;

        match backend.active_window_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                warn!("Метод {} перестал работать: {}", method, e);
                selection.method = None;
                selection.last_detection = Some(Instant::now());
                None
            }
        }
    }

    pub fn working_method(&self) -> Option<WorkingMethod> {
        self.selection.lock().method
    }
}

impl ActiveWindowTracker for RealWindowTracker {
    fn get_active_process_name(&self) -> Option<String> {
        let pid = self.active_window_pid()?;
        let name = self.resolver.name_of(pid);
        debug!("Активное окно: pid={} процесс={:?}", pid, name);
        name
    }

    fn is_available(&self) -> bool {
        let mut selection = self.selection.lock();
        self.current_method(&mut selection).is_some()
    }

    fn backend_name(&self) -> &'static str {
        self.working_method().map(|m| m.as_str()).unwrap_or("none")
    }
}

impl Drop for RealWindowTracker {
    fn drop(&mut self) {
        debug!("RealWindowTracker завершает работу");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct FakeSource {
        working: AtomicBool,
        tests: AtomicUsize,
        queries: AtomicUsize,
    }

    impl FakeSource {
        fn new(working: bool) -> Arc<Self> {
            Arc::new(Self {
                working: AtomicBool::new(working),
                ..Default::default()
            })
        }

        fn outcome(&self) -> Result<()> {
            if self.working.load(Ordering::SeqCst) {
                Ok(())
            } else {
                Err(RemapError::ServiceUnavailable("fake".into()))
            }
        }

        fn calls(&self) -> usize {
            self.tests.load(Ordering::SeqCst) + self.queries.load(Ordering::SeqCst)
        }
    }

    impl WindowPidSource for Arc<FakeSource> {
        fn test(&self) -> Result<()> {
            self.tests.fetch_add(1, Ordering::SeqCst);
            self.outcome()
        }

        fn active_window_pid(&self) -> Result<u32> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            self.outcome().map(|()| 4242)
        }
    }

    fn tracker(
        sources: &[(WorkingMethod, &Arc<FakeSource>)],
        interval: Duration,
    ) -> RealWindowTracker {
        let backends = sources
            .iter()
            .map(|(method, source)| {
                let backend: Box<dyn WindowPidSource> = Box::new(Arc::clone(source));
                (*method, backend)
            })
            .collect();
        RealWindowTracker::with_backends(backends, interval)
    }

    #[test]
    fn test_fixed_mode_pins_one_backend() {
        let tracker = RealWindowTracker::new("sway").unwrap();
        assert_eq!(tracker.methods(), vec![WorkingMethod::Sway]);
    }

    #[test]
    fn test_unknown_mode_rejected() {
        assert!(RealWindowTracker::new("wmctrl").is_err());
    }

    #[test]
    fn test_auto_tries_all_backends() {
        let tracker = RealWindowTracker::new("auto").unwrap();
        assert_eq!(tracker.methods().len(), 3);
        assert!(tracker.working_method().is_none());
    }

    #[test]
    fn test_first_working_backend_is_remembered() {
        let kdotool = FakeSource::new(false);
        let xdotool = FakeSource::new(true);
        let tracker = tracker(
            &[(WorkingMethod::Kdotool, &kdotool), (WorkingMethod::Xdotool, &xdotool)],
            Duration::from_secs(60),
        );

        assert_eq!(tracker.active_window_pid(), Some(4242));
        assert_eq!(tracker.active_window_pid(), Some(4242));
        assert_eq!(tracker.working_method(), Some(WorkingMethod::Xdotool));
        assert_eq!(kdotool.calls(), 1);
        assert_eq!(xdotool.tests.load(Ordering::SeqCst), 1);
        assert_eq!(xdotool.queries.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_failed_query_returns_none_without_retry() {
        let kdotool = FakeSource::new(true);
        let xdotool = FakeSource::new(true);
        let tracker = tracker(
            &[(WorkingMethod::Kdotool, &kdotool), (WorkingMethod::Xdotool, &xdotool)],
            Duration::from_secs(60),
        );
        assert_eq!(tracker.active_window_pid(), Some(4242));

        kdotool.working.store(false, Ordering::SeqCst);
        let before = kdotool.calls();
        assert_eq!(tracker.active_window_pid(), None);

        // ровно один вызов утилиты, без повторного перебора
        assert_eq!(kdotool.calls(), before + 1);
        assert_eq!(xdotool.calls(), 0);
        assert!(tracker.working_method().is_none());

        // следующий запрос в пределах интервала не запускает перебор
        assert_eq!(tracker.active_window_pid(), None);
        assert!(!tracker.is_available());
        assert_eq!(kdotool.calls(), before + 1);
        assert_eq!(xdotool.calls(), 0);
    }

    #[test]
    fn test_redetection_is_rate_limited() {
        let xdotool = FakeSource::new(false);
        let tracker = tracker(&[(WorkingMethod::Xdotool, &xdotool)], Duration::from_millis(50));

        assert!(!tracker.is_available());
        assert!(!tracker.is_available());
        assert_eq!(tracker.active_window_pid(), None);
        assert_eq!(xdotool.tests.load(Ordering::SeqCst), 1);

        xdotool.working.store(true, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(80));

        assert_eq!(tracker.active_window_pid(), Some(4242));
        assert_eq!(xdotool.tests.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.backend_name(), "xdotool");
    }
}
