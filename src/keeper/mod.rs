pub mod refresh;
pub mod reset;

use std::{
    fs::{self, File},
    path::PathBuf,
};

use fs2::FileExt;

use log::debug;

use crate::error::{KitError, KitResult};

const LOCK_FILE: &str = "composekit.lock";

/// Owns the state directory and the run lock shared by all workflows.
pub struct Keeper {
    state_dir: PathBuf,
    lock_path: PathBuf,
    lock_file: File,
}

/// Releases the run lock when dropped.
pub struct RunLock<'a> {
    file: &'a File,
}

impl Drop for RunLock<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.file.unlock() {
            debug!("unlock failed: {err}");
        }
    }
}

impl Keeper {
    pub fn new(root_dir: PathBuf) -> KitResult<Self> {
        debug!("state directory: {:?}", root_dir);

        match fs::create_dir_all(&root_dir) {
            Ok(_) => {}
            Err(err) => return Err(KitError::IoError(root_dir, err)),
        }

        let lock_path = root_dir.join(LOCK_FILE);

        let lock_file = match File::create(&lock_path) {
            Ok(f) => f,
            Err(err) => return Err(KitError::IoError(lock_path, err)),
        };

        Ok(Self {
            state_dir: root_dir,
            lock_path,
            lock_file,
        })
    }

    pub fn state_dir(&self) -> &PathBuf {
        &self.state_dir
    }

    /// Takes the exclusive run lock without waiting.
    pub fn lock(&self) -> KitResult<RunLock<'_>> {
        match self.lock_file.try_lock_exclusive() {
            Ok(_) => Ok(RunLock {
                file: &self.lock_file,
            }),
            Err(err) if err.kind() == fs2::lock_contended_error().kind() => {
                Err(KitError::LockBusy(self.lock_path.clone()))
            }
            Err(err) => Err(KitError::LockError(err)),
        }
    }
}
