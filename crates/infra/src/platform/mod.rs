//! Platform integration

pub mod browser;

pub use browser::{open_or_print, BrowserLauncher, ManualBrowser, SystemBrowser};
