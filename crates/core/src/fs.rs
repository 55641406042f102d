//! Filesystem utilities

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info};

/// Create a directory and all parent directories if they don't exist
pub fn ensure_dir_exists(path: &Path) -> io::Result<()> {
    if !path.is_dir() {
        fs::create_dir_all(path)?;
        info!("Created directory: {}", path.display());
    }
    Ok(())
}

/// Flush a directory entry to disk so renames and new files inside it survive a crash
#[cfg(unix)]
pub fn sync_dir(path: &Path) -> io::Result<()> {
    fs::File::open(path)?.sync_all()
}

#[cfg(not(unix))]
pub fn sync_dir(_path: &Path) -> io::Result<()> {
    Ok(())
}

/// Swap a fully written `staging` directory into place at `target`.
///
/// Any previous `target` is first moved aside and deleted only after the new
/// directory is in place, so readers see either the old set or the new set.
pub fn replace_dir(staging: &Path, target: &Path) -> io::Result<()> {
    let retired = retired_path(target);
    let had_previous = target.exists();
    if had_previous {
        if retired.exists() {
            fs::remove_dir_all(&retired)?;
        }
        fs::rename(target, &retired)?;
        debug!("Moved {} aside to {}", target.display(), retired.display());
    }

    fs::rename(staging, target)?;
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        sync_dir(parent)?;
    }

    if had_previous {
        fs::remove_dir_all(&retired)?;
    }
    info!("Installed {}", target.display());
    Ok(())
}

fn retired_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".retired");
    target.with_file_name(name)
}
