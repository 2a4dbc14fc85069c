pub mod log;
pub mod severity;
pub mod systime;
pub mod verbosity;

pub use log::log;
pub use severity::LogSeverity;
pub use verbosity::{debug, debug_enabled, set_debug_level, DebugLevel};
