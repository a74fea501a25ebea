pub mod event_manager;
pub mod format;
pub mod localization;
