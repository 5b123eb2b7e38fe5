/// Application name, used for default cache and data directories.
pub const APP_NAME: &str = "pinforge";

/// Environment variable overriding the cache root.
pub const CACHE_ENV: &str = "PINFORGE_CACHE";

/// First slot handed out to manifest sources.
pub const SLOT_BASE: u32 = 100;

/// Last usable slot. The packaging tool reserves lower ids.
pub const SLOT_MAX: u32 = 999;

/// Permission mode applied to installed executables.
pub const EXECUTABLE_MODE: u32 = 0o755;

/// Directory marker that identifies a git working copy.
pub const GIT_MARKER: &str = ".git";
