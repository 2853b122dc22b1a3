//! Locating a Chrome/Chromium executable for the browser pool.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{HarvestError, Result};

#[cfg(target_os = "macos")]
const KNOWN_PATHS: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
];

#[cfg(all(unix, not(target_os = "macos")))]
const KNOWN_PATHS: &[&str] = &[
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/opt/google/chrome/chrome",
    "/snap/bin/chromium",
];

#[cfg(windows)]
const KNOWN_PATHS: &[&str] = &[
    r"C:\Program Files\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
];

/// Command names tried against PATH.
const KNOWN_COMMANDS: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
    "chrome",
];

/// Finds a browser executable without touching the network.
///
/// Order: `explicit` (usually `browser.chrome_path` or `--chrome`), the
/// `CHROME` environment variable, PATH, then install locations. Candidates
/// that do not exist are skipped. Nothing found is `AutomationUnavailable`.
pub fn locate_chrome(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        return Err(HarvestError::AutomationUnavailable(format!(
            "Configured browser not found at {}",
            path.display()
        )));
    }

    if let Some(path) = std::env::var_os("CHROME").map(PathBuf::from) {
        if path.exists() {
            debug!("Browser from CHROME: {}", path.display());
            return Ok(path);
        }
        debug!("Ignoring CHROME={}, no such file", path.display());
    }

    if let Some(path) = KNOWN_COMMANDS.iter().find_map(|cmd| which::which(cmd).ok()) {
        debug!("Browser on PATH: {}", path.display());
        return Ok(path);
    }

    KNOWN_PATHS
        .iter()
        .map(Path::new)
        .find(|p| p.exists())
        .map(Path::to_path_buf)
        .ok_or_else(|| {
            HarvestError::AutomationUnavailable(
                "No Chrome/Chromium found; install one or set CHROME".to_string(),
            )
        })
}
