mod docker;

use std::path::Path;

use serde::Deserialize;

use crate::error::KitResult;

pub use docker::{ComposeFlavor, DockerCli};

/// What a failing command means to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Non-zero exit becomes [`crate::error::KitError::CommandFailed`].
    Require,
    /// Non-zero exit is returned as an unsuccessful [`Outcome`].
    Tolerate,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    pub success: bool,
    pub code: Option<i32>,
    pub stderr: String,
}

impl Outcome {
    pub fn ok() -> Self {
        Self {
            success: true,
            code: Some(0),
            stderr: String::new(),
        }
    }

    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            code: Some(code),
            stderr: stderr.into(),
        }
    }
}

/// One row of `docker ps --format '{{json .}}'`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ContainerSummary {
    #[serde(rename = "ID")]
    pub id: String,
    pub names: String,
    pub image: String,
    pub state: String,
    pub status: String,
}

impl ContainerSummary {
    pub fn is_running(&self) -> bool {
        self.state == "running"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerScope {
    Running,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeQuery<'a> {
    Dangling,
    NameMatch(&'a str),
}

pub trait ContainerRuntime {
    fn compose_pull(&self, project: &Path, policy: Policy) -> KitResult<Outcome>;

    fn compose_up_detached(&self, project: &Path, policy: Policy) -> KitResult<Outcome>;

    fn containers(&self, scope: ContainerScope) -> KitResult<Vec<ContainerSummary>>;

    fn stop_containers(&self, names: &[String], policy: Policy) -> KitResult<Outcome>;

    fn prune_containers(&self) -> KitResult<()>;

    fn networks(&self) -> KitResult<Vec<String>>;

    fn remove_network(&self, name: &str, policy: Policy) -> KitResult<Outcome>;

    fn volumes(&self, query: VolumeQuery<'_>) -> KitResult<Vec<String>>;

    fn prune_volumes(&self) -> KitResult<()>;

    fn remove_volumes(&self, names: &[String]) -> KitResult<()>;

    fn prune_images(&self, all: bool) -> KitResult<()>;

    /// Names of running containers starting with `prefix`.
    fn running_with_prefix(&self, prefix: &str) -> KitResult<Vec<String>> {
        Ok(self
            .containers(ContainerScope::Running)?
            .into_iter()
            .filter(|c| c.names.starts_with(prefix))
            .map(|c| c.names)
            .collect())
    }

    fn stopped_containers(&self) -> KitResult<Vec<ContainerSummary>> {
        Ok(self
            .containers(ContainerScope::All)?
            .into_iter()
            .filter(|c| !c.is_running())
            .collect())
    }
}
