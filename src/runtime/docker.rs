use std::{
    ffi::OsString,
    path::Path,
    process::{Command, ExitStatus, Output, Stdio},
};

use log::{debug, warn};

use crate::error::{KitError, KitResult};

use super::{ContainerRuntime, ContainerScope, ContainerSummary, Outcome, Policy, VolumeQuery};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ComposeFlavor {
    /// `docker compose ...`
    #[default]
    Plugin,
    /// standalone `docker-compose ...`
    Standalone,
}

/// [`ContainerRuntime`] backed by the `docker` command line.
#[derive(Debug, Clone)]
pub struct DockerCli {
    docker: OsString,
    compose: ComposeFlavor,
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new(OsString::from("docker"), ComposeFlavor::Plugin)
    }
}

impl DockerCli {
    pub fn new(docker: OsString, compose: ComposeFlavor) -> Self {
        Self { docker, compose }
    }

    fn docker<I, S>(&self, args: I) -> Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        let mut cmd = Command::new(&self.docker);
        cmd.args(args);
        cmd
    }

    fn compose(&self, project: &Path, args: &[&str]) -> Command {
        let mut cmd = match self.compose {
            ComposeFlavor::Plugin => self.docker(["compose"]),
            ComposeFlavor::Standalone => Command::new("docker-compose"),
        };
        cmd.args(args).current_dir(project);
        cmd
    }

    /// Runs with inherited stdio so pull progress reaches the operator.
    fn stream(&self, mut cmd: Command, policy: Policy) -> KitResult<Outcome> {
        let line = describe(&cmd);
        debug!("running: {line}");

        let status = cmd.status().map_err(|err| KitError::Spawn(line.clone(), err))?;

        settle(line, status, String::new(), policy)
    }

    fn capture(&self, mut cmd: Command, policy: Policy) -> KitResult<(Outcome, String)> {
        let line = describe(&cmd);
        debug!("running: {line}");

        let Output {
            status,
            stdout,
            stderr,
        } = cmd
            .stdin(Stdio::null())
            .output()
            .map_err(|err| KitError::Spawn(line.clone(), err))?;

        let stderr = String::from_utf8_lossy(&stderr).trim().to_string();
        let outcome = settle(line, status, stderr, policy)?;

        Ok((outcome, String::from_utf8_lossy(&stdout).into_owned()))
    }

    fn read(&self, cmd: Command) -> KitResult<String> {
        self.capture(cmd, Policy::Require).map(|(_, stdout)| stdout)
    }

    fn read_names(&self, cmd: Command) -> KitResult<Vec<String>> {
        Ok(lines(&self.read(cmd)?))
    }
}

fn settle(line: String, status: ExitStatus, stderr: String, policy: Policy) -> KitResult<Outcome> {
    if status.success() {
        return Ok(Outcome {
            success: true,
            code: status.code(),
            stderr,
        });
    }

    match policy {
        Policy::Require => Err(KitError::CommandFailed {
            command: line,
            code: status.code(),
            stderr,
        }),
        Policy::Tolerate => {
            warn!("`{line}` exited with {status}: {stderr}");
            Ok(Outcome {
                success: false,
                code: status.code(),
                stderr,
            })
        }
    }
}

fn describe(cmd: &Command) -> String {
    std::iter::once(cmd.get_program())
        .chain(cmd.get_args())
        .map(|arg| arg.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}

fn lines(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

pub(crate) fn parse_ps(stdout: &str) -> KitResult<Vec<ContainerSummary>> {
    lines(stdout)
        .into_iter()
        .map(|row| serde_json::from_str(&row).map_err(|err| KitError::Parse(row, err)))
        .collect()
}

impl ContainerRuntime for DockerCli {
    fn compose_pull(&self, project: &Path, policy: Policy) -> KitResult<Outcome> {
        self.stream(self.compose(project, &["pull"]), policy)
    }

    fn compose_up_detached(&self, project: &Path, policy: Policy) -> KitResult<Outcome> {
        self.stream(self.compose(project, &["up", "-d"]), policy)
    }

    fn containers(&self, scope: ContainerScope) -> KitResult<Vec<ContainerSummary>> {
        let mut cmd = self.docker(["ps"]);
        if scope == ContainerScope::All {
            cmd.arg("--all");
        }
        cmd.args(["--format", "{{json .}}"]);

        parse_ps(&self.read(cmd)?)
    }

    fn stop_containers(&self, names: &[String], policy: Policy) -> KitResult<Outcome> {
        if names.is_empty() {
            return Ok(Outcome::ok());
        }

        let mut cmd = self.docker(["stop"]);
        cmd.args(names);

        self.capture(cmd, policy).map(|(outcome, _)| outcome)
    }

    fn prune_containers(&self) -> KitResult<()> {
        self.stream(self.docker(["container", "prune", "--force"]), Policy::Require)?;
        Ok(())
    }

    fn networks(&self) -> KitResult<Vec<String>> {
        self.read_names(self.docker(["network", "ls", "--format", "{{.Name}}"]))
    }

    fn remove_network(&self, name: &str, policy: Policy) -> KitResult<Outcome> {
        self.capture(self.docker(["network", "rm", name]), policy)
            .map(|(outcome, _)| outcome)
    }

    fn volumes(&self, query: VolumeQuery<'_>) -> KitResult<Vec<String>> {
        let mut cmd = self.docker(["volume", "ls"]);
        match query {
            VolumeQuery::Dangling => cmd.args(["--filter", "dangling=true"]),
            VolumeQuery::NameMatch(name) => cmd.arg("--filter").arg(format!("name={name}")),
        };
        cmd.args(["--format", "{{.Name}}"]);

        self.read_names(cmd)
    }

    fn prune_volumes(&self) -> KitResult<()> {
        self.stream(self.docker(["volume", "prune", "--force"]), Policy::Require)?;
        Ok(())
    }

    fn remove_volumes(&self, names: &[String]) -> KitResult<()> {
        if names.is_empty() {
            return Ok(());
        }

        let mut cmd = self.docker(["volume", "rm"]);
        cmd.args(names);

        self.stream(cmd, Policy::Require)?;
        Ok(())
    }

    fn prune_images(&self, all: bool) -> KitResult<()> {
        let mut cmd = self.docker(["image", "prune"]);
        if all {
            cmd.arg("--all");
        }
        cmd.arg("--force");

        self.stream(cmd, Policy::Require)?;
        Ok(())
    }
}
