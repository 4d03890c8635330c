use url::Url;

/// Opens the login page for the user.
pub trait BrowserLauncher: Send + Sync {
    fn open(&self, url: &Url) -> anyhow::Result<()>;
}

/// Launches the platform default browser.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBrowser;

impl BrowserLauncher for SystemBrowser {
    #[cfg(feature = "browser")]
    fn open(&self, url: &Url) -> anyhow::Result<()> {
        webbrowser::open(url.as_str())
            .map_err(|e| anyhow::anyhow!("Failed to open browser: {}", e))
    }

    #[cfg(not(feature = "browser"))]
    fn open(&self, url: &Url) -> anyhow::Result<()> {
        tracing::debug!("Browser support not compiled in, not opening {}", url);
        Ok(())
    }
}

/// Never opens anything. For headless use and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoBrowser;

impl BrowserLauncher for NoBrowser {
    fn open(&self, _url: &Url) -> anyhow::Result<()> {
        Ok(())
    }
}
