use std::{
    fmt,
    fs,
    io::{BufRead, Write},
    path::PathBuf,
};

use log::{debug, info};
use tabwriter::TabWriter;

use crate::{
    console::{Answer, Console},
    error::{KitError, KitResult},
    runtime::{ContainerRuntime, ContainerSummary, Policy, VolumeQuery},
    say,
};

use super::Keeper;

/// Literal the operator must type before a data directory is removed.
pub const DELETE_CONFIRMATION: &str = "DELETE";

/// Names a reset is allowed to touch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetProfile {
    pub known_containers: Vec<String>,
    pub container_prefix: String,
    pub network: String,
    pub volume_filter: String,
}

impl Default for ResetProfile {
    fn default() -> Self {
        Self {
            known_containers: vec![
                "nextcloud-aio-mastercontainer".to_string(),
                "nextcloud-aio-domaincheck".to_string(),
            ],
            container_prefix: "nextcloud-aio".to_string(),
            network: "nextcloud-aio".to_string(),
            volume_filter: "nextcloud_aio_".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseKind {
    Unconditional,
    /// Acts only on what the runtime reports as present.
    Presence,
    /// Aborts the whole reset when its check fails.
    Gate,
    /// Acts only on an explicit operator confirmation.
    Operator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    ConfirmIntent,
    StopKnown,
    StopMatching,
    VerifyQuiescence,
    ListStopped,
    PruneStopped,
    RemoveNetwork,
    PruneDangling,
    RemoveVolumes,
    RemoveDatadir,
    PruneImages,
}

impl Phase {
    pub const ALL: [Phase; 11] = [
        Phase::ConfirmIntent,
        Phase::StopKnown,
        Phase::StopMatching,
        Phase::VerifyQuiescence,
        Phase::ListStopped,
        Phase::PruneStopped,
        Phase::RemoveNetwork,
        Phase::PruneDangling,
        Phase::RemoveVolumes,
        Phase::RemoveDatadir,
        Phase::PruneImages,
    ];

    pub fn next(self) -> Option<Phase> {
        let idx = Phase::ALL.iter().position(|p| *p == self)?;
        Phase::ALL.get(idx + 1).copied()
    }

    pub fn kind(self) -> PhaseKind {
        match self {
            Phase::ConfirmIntent | Phase::ListStopped | Phase::PruneStopped | Phase::PruneDangling => {
                PhaseKind::Unconditional
            }
            Phase::StopKnown | Phase::StopMatching | Phase::RemoveNetwork => PhaseKind::Presence,
            Phase::VerifyQuiescence => PhaseKind::Gate,
            Phase::RemoveVolumes | Phase::RemoveDatadir | Phase::PruneImages => PhaseKind::Operator,
        }
    }

    pub fn number(self) -> usize {
        Phase::ALL.iter().position(|p| *p == self).unwrap_or_default() + 1
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = match self {
            Phase::ConfirmIntent => "Confirm reset",
            Phase::StopKnown => "Stop well-known containers",
            Phase::StopMatching => "Stop remaining containers",
            Phase::VerifyQuiescence => "Verify nothing is running",
            Phase::ListStopped => "Stopped containers",
            Phase::PruneStopped => "Remove stopped containers",
            Phase::RemoveNetwork => "Remove network",
            Phase::PruneDangling => "Remove dangling volumes",
            Phase::RemoveVolumes => "Remove persistent volumes",
            Phase::RemoveDatadir => "Remove custom data directory",
            Phase::PruneImages => "Remove unused images",
        };
        f.write_str(title)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResetReport {
    pub executed: Vec<Phase>,
    pub stopped: Vec<String>,
    pub network_removed: bool,
    pub volumes_removed: Vec<String>,
    pub datadir_removed: Option<PathBuf>,
    pub images_pruned: bool,
}

struct ResetRun<'a, D, R, W> {
    docker: &'a D,
    console: &'a mut Console<R, W>,
    profile: &'a ResetProfile,
    report: ResetReport,
}

impl Keeper {
    /// Tears down the instance described by `profile`, phase by phase.
    ///
    /// Every phase re-queries the runtime. The run stops with
    /// [`KitError::StillRunning`] if matching containers survive the stop
    /// phases; declined prompts skip their phase and the run still succeeds.
    pub fn reset<D, R, W>(
        &self,
        docker: &D,
        console: &mut Console<R, W>,
        profile: &ResetProfile,
    ) -> KitResult<ResetReport>
    where
        D: ContainerRuntime,
        R: BufRead,
        W: Write,
    {
        let _lock = self.lock()?;

        let mut run = ResetRun {
            docker,
            console,
            profile,
            report: ResetReport::default(),
        };

        let mut phase = Some(Phase::ConfirmIntent);
        while let Some(current) = phase {
            say!(run.console, "\n[{}/{}] {current}", current.number(), Phase::ALL.len())?;
            debug!("reset phase {current:?} ({:?})", current.kind());

            run.execute(current)?;
            run.report.executed.push(current);

            phase = current.next();
        }

        say!(run.console, "\nReset finished.")?;

        Ok(run.report)
    }
}

impl<D, R, W> ResetRun<'_, D, R, W>
where
    D: ContainerRuntime,
    R: BufRead,
    W: Write,
{
    fn execute(&mut self, phase: Phase) -> KitResult<()> {
        match phase {
            Phase::ConfirmIntent => self.confirm_intent(),
            Phase::StopKnown => self.stop_known(),
            Phase::StopMatching => self.stop_matching(),
            Phase::VerifyQuiescence => self.verify_quiescence(),
            Phase::ListStopped => self.list_stopped(),
            Phase::PruneStopped => self.docker.prune_containers(),
            Phase::RemoveNetwork => self.remove_network(),
            Phase::PruneDangling => self.prune_dangling(),
            Phase::RemoveVolumes => self.remove_volumes(),
            Phase::RemoveDatadir => self.remove_datadir(),
            Phase::PruneImages => self.prune_images(),
        }
    }

    fn confirm_intent(&mut self) -> KitResult<()> {
        let profile = self.profile;
        say!(
            self.console,
            "WARNING! this stops and removes all '{}*' containers, the '{}' network \
             and stopped containers, and offers to remove '{}' volumes.",
            profile.container_prefix,
            profile.network,
            profile.volume_filter
        )?;

        match self
            .console
            .ask_line("Press Enter to continue or Ctrl+C to abort.")?
        {
            Some(_) => Ok(()),
            None => Err(KitError::Aborted),
        }
    }

    fn stop_known(&mut self) -> KitResult<()> {
        let mut found = false;

        for name in &self.profile.known_containers {
            let running = self.docker.running_with_prefix(name)?;
            if !running.iter().any(|r| r == name) {
                continue;
            }
            found = true;

            say!(self.console, "Stopping {name}")?;
            let names = std::slice::from_ref(name);
            if self.docker.stop_containers(names, Policy::Tolerate)?.success {
                self.report.stopped.push(name.clone());
            } else {
                say!(self.console, "Warning: could not stop {name}, continuing")?;
            }
        }

        if !found {
            say!(self.console, "None of the well-known containers is running.")?;
        }

        Ok(())
    }

    fn stop_matching(&mut self) -> KitResult<()> {
        let running = self.docker.running_with_prefix(&self.profile.container_prefix)?;

        if running.is_empty() {
            say!(
                self.console,
                "No running '{}*' containers found.",
                self.profile.container_prefix
            )?;
            return Ok(());
        }

        say!(self.console, "Stopping: {}", running.join(" "))?;
        self.docker.stop_containers(&running, Policy::Require)?;
        self.report.stopped.extend(running);

        Ok(())
    }

    fn verify_quiescence(&mut self) -> KitResult<()> {
        let running = self.docker.running_with_prefix(&self.profile.container_prefix)?;

        if running.is_empty() {
            say!(self.console, "All '{}*' containers are stopped.", self.profile.container_prefix)?;
            return Ok(());
        }

        say!(self.console, "Still running:")?;
        for name in &running {
            say!(self.console, "  {name}")?;
        }

        Err(KitError::StillRunning(running))
    }

    fn list_stopped(&mut self) -> KitResult<()> {
        let stopped = self.docker.stopped_containers()?;

        if stopped.is_empty() {
            say!(self.console, "No stopped containers.")?;
            return Ok(());
        }

        let table = render_containers(&stopped)?;
        say!(self.console, "{table}")
    }

    fn remove_network(&mut self) -> KitResult<()> {
        let network = &self.profile.network;

        if !self.docker.networks()?.iter().any(|n| n == network) {
            say!(self.console, "Network {network} not found.")?;
            return Ok(());
        }

        let outcome = self.docker.remove_network(network, Policy::Tolerate)?;
        if outcome.success {
            say!(self.console, "Removed network {network}.")?;
            self.report.network_removed = true;
        } else {
            say!(
                self.console,
                "Warning: could not remove network {network} (still in use?), continuing"
            )?;
        }

        Ok(())
    }

    fn prune_dangling(&mut self) -> KitResult<()> {
        let dangling = self.docker.volumes(VolumeQuery::Dangling)?;

        if dangling.is_empty() {
            say!(self.console, "No dangling volumes.")?;
        } else {
            say!(self.console, "Dangling volumes:")?;
            for name in &dangling {
                say!(self.console, "  {name}")?;
            }
        }

        self.docker.prune_volumes()
    }

    fn remove_volumes(&mut self) -> KitResult<()> {
        let filter = &self.profile.volume_filter;
        let volumes = self.docker.volumes(VolumeQuery::NameMatch(filter))?;

        if volumes.is_empty() {
            say!(self.console, "No volumes matching '{filter}'.")?;
            return Ok(());
        }

        say!(self.console, "Volumes matching '{filter}':")?;
        for name in &volumes {
            say!(self.console, "  {name}")?;
        }

        let answer = self
            .console
            .ask("Remove these volumes? All instance data in them is lost. [yes/no]")?;

        if answer != Answer::Yes {
            say!(self.console, "Warning: volumes left in place.")?;
            return Ok(());
        }

        self.docker.remove_volumes(&volumes)?;
        info!("removed volumes {volumes:?}");
        self.report.volumes_removed = volumes;

        Ok(())
    }

    fn remove_datadir(&mut self) -> KitResult<()> {
        let answer = self
            .console
            .ask("Did the instance use a custom data directory? [yes/no]")?;
        if answer != Answer::Yes {
            say!(self.console, "Skipping data directory removal.")?;
            return Ok(());
        }

        let Some(raw) = self.console.ask_line("Path of the data directory:")? else {
            say!(self.console, "Warning: no path given, data directory left in place.")?;
            return Ok(());
        };

        let path = PathBuf::from(raw);
        if !path.is_dir() {
            say!(
                self.console,
                "Warning: {} is not an existing directory, skipping.",
                path.display()
            )?;
            return Ok(());
        }

        let answer = self.console.ask(&format!(
            "Type {DELETE_CONFIRMATION} to remove {} and everything in it:",
            path.display()
        ))?;
        if !answer.is_literal(DELETE_CONFIRMATION) {
            say!(self.console, "Warning: {} left in place.", path.display())?;
            return Ok(());
        }

        match fs::remove_dir_all(&path) {
            Ok(_) => {}
            Err(err) => return Err(KitError::IoError(path, err)),
        }

        say!(self.console, "Removed {}.", path.display())?;
        self.report.datadir_removed = Some(path);

        Ok(())
    }

    fn prune_images(&mut self) -> KitResult<()> {
        let answer = self.console.ask("Remove all unused images? [yes/no]")?;
        if answer != Answer::Yes {
            say!(self.console, "Images left in place.")?;
            return Ok(());
        }

        self.docker.prune_images(true)?;
        self.report.images_pruned = true;

        Ok(())
    }
}

fn render_containers(rows: &[ContainerSummary]) -> KitResult<String> {
    let mut buf = Vec::new();
    let mut tw = TabWriter::new(&mut buf);

    let mut write = || -> std::io::Result<()> {
        writeln!(tw, "CONTAINER ID\tNAMES\tIMAGE\tSTATUS")?;
        for row in rows {
            writeln!(tw, "{}\t{}\t{}\t{}", row.id, row.names, row.image, row.status)?;
        }
        tw.flush()
    };
    write().map_err(KitError::Console)?;
    drop(tw);

    Ok(String::from_utf8_lossy(&buf).trim_end().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_form_a_forward_chain() {
        let mut walked = vec![Phase::ConfirmIntent];
        while let Some(next) = walked.last().and_then(|p| p.next()) {
            walked.push(next);
        }
        assert_eq!(walked, Phase::ALL);
        assert!(walked.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn only_quiescence_is_a_gate() {
        let gates: Vec<_> = Phase::ALL
            .into_iter()
            .filter(|p| p.kind() == PhaseKind::Gate)
            .collect();
        assert_eq!(gates, [Phase::VerifyQuiescence]);
    }

    #[test]
    fn phase_numbers_are_one_based() {
        assert_eq!(Phase::ConfirmIntent.number(), 1);
        assert_eq!(Phase::PruneImages.number(), 11);
    }

    #[test]
    fn container_table_is_aligned() {
        let rows = vec![
            ContainerSummary {
                id: "a1".into(),
                names: "nextcloud-aio-apache".into(),
                image: "nextcloud/aio-apache".into(),
                state: "exited".into(),
                status: "Exited (0)".into(),
            },
            ContainerSummary {
                id: "b22".into(),
                names: "redis".into(),
                image: "redis:7".into(),
                state: "exited".into(),
                status: "Exited (137)".into(),
            },
        ];

        let table = render_containers(&rows).unwrap();
        let lines: Vec<_> = table.lines().collect();

        assert_eq!(lines.len(), 3);
        let column = lines[0].find("NAMES").unwrap();
        assert_eq!(lines[1].find("nextcloud-aio-apache"), Some(column));
        assert_eq!(lines[2].find("redis"), Some(column));
    }
}
