pub mod console;
pub mod daemon;
pub mod host;

// Re-export commonly used items
pub use console::{Command, Outcome};
pub use host::DirectoryHost;
