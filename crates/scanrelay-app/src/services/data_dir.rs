// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-aware config directory resolution.

use std::path::PathBuf;

const APP_DIR: &str = "scanrelay";
const CONFIG_FILE: &str = "config.json";

/// Directory holding scanrelay's settings. Not created here; saving the
/// config creates it.
pub fn config_dir() -> PathBuf {
    resolve_config_dir(
        std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from),
        std::env::var_os("HOME").map(PathBuf::from),
    )
}

/// Default settings file path.
pub fn config_path() -> PathBuf {
    config_dir().join(CONFIG_FILE)
}

fn resolve_config_dir(xdg: Option<PathBuf>, home: Option<PathBuf>) -> PathBuf {
    // Try XDG config dir, then fallback to home
    if let Some(xdg) = xdg.filter(|p| p.is_absolute()) {
        return xdg.join(APP_DIR);
    }
    if let Some(home) = home {
        return home.join(".config").join(APP_DIR);
    }
    // Last resort
    PathBuf::from(".").join(APP_DIR)
}
