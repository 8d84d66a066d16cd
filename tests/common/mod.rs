#![allow(dead_code)]

use std::{
    cell::RefCell,
    path::{Path, PathBuf},
};

use composekit::{
    console::Console,
    error::{KitError, KitResult},
    keeper::Keeper,
    runtime::{ContainerRuntime, ContainerScope, ContainerSummary, Outcome, Policy, VolumeQuery},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Pull(PathBuf),
    Up(PathBuf),
    Ps(ContainerScope),
    Stop(Vec<String>),
    PruneContainers,
    Networks,
    RemoveNetwork(String),
    Volumes(String),
    PruneVolumes,
    RemoveVolumes(Vec<String>),
    PruneImages(bool),
}

/// In-memory engine that records every call in order.
#[derive(Default)]
pub struct FakeRuntime {
    pub calls: RefCell<Vec<Call>>,
    pub running: RefCell<Vec<String>>,
    /// Running containers that come back up after `stop`.
    pub sticky: Vec<String>,
    pub stopped: Vec<ContainerSummary>,
    pub networks: Vec<String>,
    pub network_in_use: bool,
    pub dangling: Vec<String>,
    pub volumes: Vec<String>,
    /// Project directory names whose pull fails.
    pub failing_pulls: Vec<String>,
    /// Project directory names whose `up` fails.
    pub failing_ups: Vec<String>,
    /// Containers whose `stop` reports an error although they exit.
    pub failing_stops: Vec<String>,
    pub prune_images_exit: Option<i32>,
}

impl FakeRuntime {
    pub fn with_running(names: &[&str]) -> Self {
        Self {
            running: RefCell::new(names.iter().map(|n| n.to_string()).collect()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn called(&self, pred: impl Fn(&Call) -> bool) -> bool {
        self.calls.borrow().iter().any(pred)
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }
}

fn failure(command: &str, code: i32, stderr: &str, policy: Policy) -> KitResult<Outcome> {
    match policy {
        Policy::Require => Err(KitError::CommandFailed {
            command: command.to_string(),
            code: Some(code),
            stderr: stderr.to_string(),
        }),
        Policy::Tolerate => Ok(Outcome::failed(code, stderr)),
    }
}

fn summary(name: &str, state: &str) -> ContainerSummary {
    ContainerSummary {
        id: format!("{:x}", name.len() * 4099),
        names: name.to_string(),
        image: "nextcloud/all-in-one:latest".to_string(),
        state: state.to_string(),
        status: if state == "running" { "Up 3 hours" } else { "Exited (0) 1 minute ago" }.to_string(),
    }
}

impl ContainerRuntime for FakeRuntime {
    fn compose_pull(&self, project: &Path, policy: Policy) -> KitResult<Outcome> {
        self.record(Call::Pull(project.to_path_buf()));

        let name = project.file_name().unwrap().to_string_lossy();
        if self.failing_pulls.iter().any(|f| name == f.as_str()) {
            return failure("docker compose pull", 18, "manifest unknown", policy);
        }
        Ok(Outcome::ok())
    }

    fn compose_up_detached(&self, project: &Path, policy: Policy) -> KitResult<Outcome> {
        self.record(Call::Up(project.to_path_buf()));

        let name = project.file_name().unwrap().to_string_lossy();
        if self.failing_ups.iter().any(|f| name == f.as_str()) {
            return failure("docker compose up -d", 17, "port is already allocated", policy);
        }
        Ok(Outcome::ok())
    }

    fn containers(&self, scope: ContainerScope) -> KitResult<Vec<ContainerSummary>> {
        self.record(Call::Ps(scope));

        let mut rows: Vec<_> = self
            .running
            .borrow()
            .iter()
            .map(|n| summary(n, "running"))
            .collect();
        if scope == ContainerScope::All {
            rows.extend(self.stopped.iter().cloned());
        }
        Ok(rows)
    }

    fn stop_containers(&self, names: &[String], policy: Policy) -> KitResult<Outcome> {
        self.record(Call::Stop(names.to_vec()));

        self.running
            .borrow_mut()
            .retain(|n| !names.contains(n) || self.sticky.contains(n));

        if names.iter().any(|n| self.failing_stops.contains(n)) {
            return failure("docker stop", 1, "cannot stop container: permission denied", policy);
        }
        Ok(Outcome::ok())
    }

    fn prune_containers(&self) -> KitResult<()> {
        self.record(Call::PruneContainers);
        Ok(())
    }

    fn networks(&self) -> KitResult<Vec<String>> {
        self.record(Call::Networks);
        Ok(self.networks.clone())
    }

    fn remove_network(&self, name: &str, policy: Policy) -> KitResult<Outcome> {
        self.record(Call::RemoveNetwork(name.to_string()));

        if self.network_in_use {
            return failure("docker network rm", 1, "network has active endpoints", policy);
        }
        Ok(Outcome::ok())
    }

    fn volumes(&self, query: VolumeQuery<'_>) -> KitResult<Vec<String>> {
        match query {
            VolumeQuery::Dangling => {
                self.record(Call::Volumes("dangling".to_string()));
                Ok(self.dangling.clone())
            }
            VolumeQuery::NameMatch(filter) => {
                self.record(Call::Volumes(filter.to_string()));
                Ok(self
                    .volumes
                    .iter()
                    .filter(|v| v.contains(filter))
                    .cloned()
                    .collect())
            }
        }
    }

    fn prune_volumes(&self) -> KitResult<()> {
        self.record(Call::PruneVolumes);
        Ok(())
    }

    fn remove_volumes(&self, names: &[String]) -> KitResult<()> {
        self.record(Call::RemoveVolumes(names.to_vec()));
        Ok(())
    }

    fn prune_images(&self, all: bool) -> KitResult<()> {
        self.record(Call::PruneImages(all));

        match self.prune_images_exit {
            Some(code) => Err(KitError::CommandFailed {
                command: "docker image prune".to_string(),
                code: Some(code),
                stderr: "daemon unavailable".to_string(),
            }),
            None => Ok(()),
        }
    }
}

pub fn keeper() -> (tempfile::TempDir, Keeper) {
    let state = tempfile::tempdir().unwrap();
    let keeper = Keeper::new(state.path().join("state")).unwrap();
    (state, keeper)
}

pub fn console(input: &str) -> Console<&[u8], Vec<u8>> {
    Console::new(input.as_bytes(), Vec::new())
}

pub fn output(console: Console<&[u8], Vec<u8>>) -> String {
    let (_, out) = console.into_parts();
    String::from_utf8(out).unwrap()
}
