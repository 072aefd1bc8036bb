use crate::config::Config;
use crate::error::Result;
use std::sync::Arc;

use super::dry_run::DryRunTracker;
use super::window_tracker::RealWindowTracker;

/// Источник имени процесса активного окна.
///
/// Вызывается из фонового цикла монитора и из обработчика клавиш (когда кэш
/// устарел), поэтому интерфейс синхронный и не возвращает ошибок.
pub trait ActiveWindowTracker: Send + Sync {
    fn get_active_process_name(&self) -> Option<String>;

    /// Хотя бы один способ определения окна работает
    fn is_available(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str;
}

/// Factory function to create an appropriate tracker based on the dry_run flag
pub fn create_window_tracker(
    config: &Config,
    dry_run: bool,
) -> Result<Arc<dyn ActiveWindowTracker>> {
    if dry_run {
        Ok(Arc::new(DryRunTracker::new()))
    } else {
        Ok(Arc::new(RealWindowTracker::new(&config.monitor.detection_mode)?))
    }
}
