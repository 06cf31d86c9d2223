//! CLI-level configuration: where on disk the config store lives.

use std::path::PathBuf;

/// Resolve the default state directory (`~/.lumina`, falling back to `/tmp/.lumina`).
pub fn default_state_path() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("/tmp")).join(".lumina")
}
