// Library interface for AppVol
// This allows tests and other modules to access the crate's functionality

pub mod audio;
pub mod config;
pub mod constants;
pub mod hotkeys;
pub mod overlay;
pub mod settings;

#[cfg(windows)]
pub mod app;
#[cfg(windows)]
pub mod dialogs;
#[cfg(windows)]
pub mod foreground;
