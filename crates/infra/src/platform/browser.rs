//! Opening the authorization URL in the user's browser.

use std::io;
use std::sync::Arc;

use tracing::{info, warn};

/// Something that can show the user a URL.
pub trait BrowserLauncher: Send + Sync {
    /// # Errors
    /// Returns the launcher's I/O error when the URL could not be opened.
    fn open(&self, url: &str) -> io::Result<()>;
}

impl<T: BrowserLauncher + ?Sized> BrowserLauncher for Arc<T> {
    fn open(&self, url: &str) -> io::Result<()> {
        (**self).open(url)
    }
}

/// Opens URLs with the platform's default handler.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBrowser;

impl BrowserLauncher for SystemBrowser {
    fn open(&self, url: &str) -> io::Result<()> {
        info!("Opening browser for authorization");
        open::that(url)
    }
}

/// Never launches anything; the URL is printed for manual use.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManualBrowser;

impl BrowserLauncher for ManualBrowser {
    fn open(&self, url: &str) -> io::Result<()> {
        print_manual_instructions(url);
        Ok(())
    }
}

/// Try `launcher`, printing the URL when it fails. Never fails itself.
pub fn open_or_print(launcher: &dyn BrowserLauncher, url: &str) {
    if let Err(err) = launcher.open(url) {
        warn!(error = %err, "Failed to open browser automatically");
        print_manual_instructions(url);
    }
}

#[allow(clippy::print_stderr)]
fn print_manual_instructions(url: &str) {
    eprintln!("\nPlease authorize inboxkit by visiting:\n{url}\n");
}
