pub mod action_executor;
pub mod clipboard;
pub mod hotkey_dispatcher;
pub mod interceptor;
pub mod keyboard_listener;
pub mod process_matcher;
pub mod process_monitor;
pub mod virtual_device;
pub mod window_tracker;

pub use action_executor::ActionExecutor;
pub use clipboard::{ArboardClipboard, ClipboardProvider};
pub use hotkey_dispatcher::HotkeyDispatcher;
pub use interceptor::{HotkeyBackend, HotkeyHandler, InterceptTable, Verdict};
pub use keyboard_listener::create_keyboard_listener;
pub use process_matcher::ProcessMatcher;
pub use process_monitor::ProcessMonitor;
pub use virtual_device::{KeyEmitter, VirtualDevice};
pub use window_tracker::{create_window_tracker, running_processes, ActiveWindowTracker};
