pub mod ansi;
pub mod config;
pub mod error;
pub mod filesystem;
pub mod history;
pub mod keygen;
pub mod session;
pub mod transfer;

mod app;
mod events;
mod key_event;
mod ui;
mod utils;

// Re-export commonly used types
pub use app::{App, Pane, PendingDelete, PromptKind, Screen};
pub use error::{AppError, Result};
pub use events::AppEvent;
pub use key_event::KeyFlow;
pub use utils::{expand_tilde, init_panic_hook, init_tracing, restore_tui};
