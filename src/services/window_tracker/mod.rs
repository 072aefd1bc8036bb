//! ActiveWindowTracker service: responsibility and boundaries
//!
//! This module and its submodules answer ONE question: which process owns the
//! currently focused window. Backends shell out to the desktop tools
//! (xdotool, kdotool, swaymsg) for the window pid; the pid is resolved to an
//! executable name through `sysinfo`. Every OS-layer failure degrades to
//! `None` ("unknown process"). Caching, matching and polling live in
//! ProcessMonitor, never here.

mod dry_run;
mod kdotool;
mod process_name;
mod sway;
mod r#trait;
mod window_tracker;
mod xdotool;

pub use self::dry_run::DryRunTracker;
pub use self::process_name::{running_processes, ProcessNameResolver};
pub use self::r#trait::{create_window_tracker, ActiveWindowTracker};
pub use self::window_tracker::{RealWindowTracker, WorkingMethod};
