use std::{
    ffi::OsString,
    io,
    path::{Path, PathBuf},
};

use log::warn;
use walkdir::WalkDir;

use crate::error::{KitError, KitResult};

pub fn get_root_dir(root_dir: Option<OsString>) -> PathBuf {
    match root_dir {
        Some(root) => PathBuf::from(root),
        None => {
            let default_sub_dir = Path::new(".local/share/composekit/");
            let mut home_path = match home::home_dir() {
                Some(hpath) => hpath,
                None => PathBuf::from("/tmp"),
            };

            home_path.push(default_sub_dir);

            home_path
        }
    }
}

/// Immediate, non-hidden subdirectories of `root` sorted by file name.
/// Symlinks pointing at directories count as directories.
pub fn project_dirs(root: &Path) -> KitResult<Vec<PathBuf>> {
    let walker = WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name();

    let mut dirs = Vec::new();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if err.depth() > 0 && is_broken_link(&err) => {
                warn!("skipping broken link {:?}: {err}", err.path().unwrap_or(root));
                continue;
            }
            Err(err) => {
                let path = err.path().unwrap_or(root).to_path_buf();
                return Err(KitError::IoError(path, err.into()));
            }
        };

        if !entry.file_type().is_dir() {
            continue;
        }

        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }

        dirs.push(entry.into_path());
    }

    Ok(dirs)
}

// dangling symlink or symlink loop below the root
fn is_broken_link(err: &walkdir::Error) -> bool {
    if err.loop_ancestor().is_some() {
        return true;
    }

    let unreadable = matches!(
        err.io_error(),
        Some(io) if io.kind() == io::ErrorKind::NotFound || io.raw_os_error().is_some()
    );
    let is_symlink = err
        .path()
        .and_then(|path| path.symlink_metadata().ok())
        .is_some_and(|meta| meta.file_type().is_symlink());

    unreadable && is_symlink
}
