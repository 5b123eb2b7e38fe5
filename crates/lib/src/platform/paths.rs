use std::path::PathBuf;

use crate::consts::APP_NAME;

#[cfg(windows)]
const HOME_VAR: &str = "USERPROFILE";
#[cfg(not(windows))]
const HOME_VAR: &str = "HOME";

/// The user's home directory, empty when unset.
fn home_dir() -> PathBuf {
  std::env::var_os(HOME_VAR).map(PathBuf::from).unwrap_or_default()
}

/// Per-user cache root for pinforge.
///
/// `$XDG_CACHE_HOME/pinforge`, else `~/.cache/pinforge`. On Windows the
/// local application data directory is used instead.
pub fn cache_dir() -> PathBuf {
  #[cfg(windows)]
  let (var, fallback) = ("LOCALAPPDATA", home_dir().join("AppData").join("Local"));
  #[cfg(not(windows))]
  let (var, fallback) = ("XDG_CACHE_HOME", home_dir().join(".cache"));

  match std::env::var_os(var) {
    Some(base) if !base.is_empty() => PathBuf::from(base).join(APP_NAME),
    _ => fallback.join(APP_NAME),
  }
}
