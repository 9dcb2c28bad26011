pub mod config;
pub mod manager;


pub use config::{ExecutionSettings, FileSettings, LintSettings, Settings};
pub use manager::SettingsManager;
