use std::{
    io::{BufRead, Write},
    path::{Path, PathBuf},
};

use log::warn;

use crate::{
    console::Console,
    error::KitResult,
    runtime::{ContainerRuntime, Policy},
    say, utils,
};

use super::Keeper;

#[derive(Debug, Clone, Default)]
pub struct RefreshOptions {
    /// Abort on the first failing pull or up.
    pub fail_fast: bool,
    /// Prune every unused image, not only dangling ones.
    pub all_images: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectOutcome {
    pub dir: PathBuf,
    pub pulled: bool,
    pub recreated: bool,
}

impl ProjectOutcome {
    pub fn succeeded(&self) -> bool {
        self.pulled && self.recreated
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub projects: Vec<ProjectOutcome>,
    pub pruned: bool,
}

impl RefreshReport {
    pub fn failed(&self) -> impl Iterator<Item = &ProjectOutcome> {
        self.projects.iter().filter(|p| !p.succeeded())
    }
}

impl Keeper {
    /// Pulls and recreates every compose project directly below `root`,
    /// then prunes unused images once.
    pub fn refresh<D, R, W>(
        &self,
        docker: &D,
        console: &mut Console<R, W>,
        root: &Path,
        options: &RefreshOptions,
    ) -> KitResult<RefreshReport>
    where
        D: ContainerRuntime,
        R: BufRead,
        W: Write,
    {
        let _lock = self.lock()?;

        let policy = if options.fail_fast {
            Policy::Require
        } else {
            Policy::Tolerate
        };

        let mut report = RefreshReport::default();

        for dir in utils::project_dirs(root)? {
            let name = dir.file_name().unwrap_or(dir.as_os_str()).to_string_lossy().into_owned();

            say!(console, "==> {name}: pulling images")?;
            let pulled = docker.compose_pull(&dir, policy)?.success;

            say!(console, "==> {name}: recreating containers")?;
            let recreated = docker.compose_up_detached(&dir, policy)?.success;

            if !(pulled && recreated) {
                warn!("project {} did not refresh cleanly", dir.display());
            }

            report.projects.push(ProjectOutcome {
                dir,
                pulled,
                recreated,
            });
        }

        say!(console, "==> pruning unused images")?;
        docker.prune_images(options.all_images)?;
        report.pruned = true;

        let failed = report.failed().count();
        if failed > 0 {
            say!(
                console,
                "Refreshed {} project(s), {failed} with errors",
                report.projects.len()
            )?;
        } else {
            say!(console, "Refreshed {} project(s)", report.projects.len())?;
        }

        Ok(report)
    }
}
