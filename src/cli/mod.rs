pub mod approval;
pub mod commands;
pub mod progress;
pub mod ui;

pub use approval::spawn_console_surface;
pub use progress::ConsoleRenderer;
