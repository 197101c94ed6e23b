use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};

/// Platform base directory for per-user state.
///
/// Windows: the roaming application data folder, elsewhere the user's home.
fn platform_base() -> Result<PathBuf> {
    #[cfg(target_os = "windows")]
    let base = dirs::config_dir();
    #[cfg(not(target_os = "windows"))]
    let base = dirs::home_dir();

    base.ok_or_else(|| anyhow!("cannot determine the user's home directory"))
}

/// Expand a leading `~` or `~/` against the platform base directory.
fn expand_tilde(raw: &str) -> Result<PathBuf> {
    if raw == "~" {
        return platform_base();
    }
    if let Some(rest) = raw.strip_prefix("~/").or_else(|| raw.strip_prefix("~\\")) {
        return Ok(platform_base()?.join(rest));
    }
    Ok(PathBuf::from(raw))
}

/// Resolve the application home directory into an absolute path.
///
/// `None` selects `<platform base>/<default_subdir>`. Relative paths are
/// anchored at the current working directory. With `create`, the directory
/// is created if missing.
pub fn resolve_home_dir(
    configured: Option<String>,
    default_subdir: &str,
    create: bool,
) -> Result<PathBuf> {
    let mut path = match configured {
        Some(raw) => expand_tilde(raw.trim())?,
        None => platform_base()?.join(default_subdir),
    };

    if path.is_relative() {
        path = std::env::current_dir()
            .context("cannot determine current directory")?
            .join(path);
    }

    if create {
        ensure_dir(&path)?;
    }
    Ok(path)
}

fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path)
        .with_context(|| format!("cannot create directory '{}'", path.display()))
}
