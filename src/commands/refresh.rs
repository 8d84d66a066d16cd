use std::{env, ffi::OsString, path::PathBuf};

use clap::Parser;

use crate::{
    console::Console,
    error::{KitError, KitResult},
    keeper::{
        refresh::{RefreshOptions, RefreshReport},
        Keeper,
    },
    runtime::ContainerRuntime,
    utils,
};

/// Pull and recreate every compose project below a directory, then prune images
#[derive(Parser, Debug)]
pub struct Refresh {
    /// Directory whose subdirectories are compose projects (default: current directory)
    #[clap(short, long)]
    dir: Option<PathBuf>,

    /// Stop at the first project that fails to pull or start
    #[clap(long)]
    fail_fast: bool,

    /// Prune all unused images instead of dangling ones only
    #[clap(long)]
    all_images: bool,
}

impl Refresh {
    pub fn options(&self) -> RefreshOptions {
        RefreshOptions {
            fail_fast: self.fail_fast,
            all_images: self.all_images,
        }
    }

    pub fn exec<D: ContainerRuntime>(
        &self,
        root_dir: Option<OsString>,
        docker: &D,
    ) -> KitResult<RefreshReport> {
        let projects_dir = match &self.dir {
            Some(dir) => dir.clone(),
            None => env::current_dir().map_err(|err| KitError::IoError(PathBuf::from("."), err))?,
        };

        let keeper = Keeper::new(utils::get_root_dir(root_dir))?;
        let mut console = Console::stdio();

        keeper.refresh(docker, &mut console, &projects_dir, &self.options())
    }
}
