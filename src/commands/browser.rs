//! Opening links in the system browser.

use tracing::{debug, info};

/// Open a URL in the system's default browser
pub fn open_browser(url: &str) -> Result<(), String> {
    info!(%url, "Opening browser");
    open::that(url).map_err(|e| format!("Failed to open browser: {}", e))?;
    debug!("Browser opened successfully");
    Ok(())
}
