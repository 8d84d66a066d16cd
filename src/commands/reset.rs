use std::{ffi::OsString, path::PathBuf};

use clap::Parser;

use crate::{
    console::Console,
    error::KitResult,
    keeper::{
        reset::{ResetProfile, ResetReport},
        Keeper,
    },
    runtime::ContainerRuntime,
    utils,
};

/// Stop and remove a container instance, its network and (on request) its data
#[derive(Parser, Debug)]
pub struct Reset {
    /// Well-known container to stop first; repeat for several
    #[clap(long = "known", value_name = "NAME")]
    known: Vec<String>,

    /// Name prefix of the instance containers
    #[clap(long)]
    prefix: Option<String>,

    /// Network dedicated to the instance
    #[clap(long)]
    network: Option<String>,

    /// Name filter selecting the instance volumes
    #[clap(long)]
    volume_filter: Option<String>,
}

impl Reset {
    pub fn profile(&self) -> ResetProfile {
        let mut profile = ResetProfile::default();

        if !self.known.is_empty() {
            profile.known_containers = self.known.clone();
        }
        if let Some(prefix) = &self.prefix {
            profile.container_prefix = prefix.clone();
        }
        if let Some(network) = &self.network {
            profile.network = network.clone();
        }
        if let Some(filter) = &self.volume_filter {
            profile.volume_filter = filter.clone();
        }

        profile
    }

    pub fn exec<D: ContainerRuntime>(
        &self,
        root_dir: Option<OsString>,
        docker: &D,
    ) -> KitResult<ResetReport> {
        let root_dir_path: PathBuf = utils::get_root_dir(root_dir);

        let keeper = Keeper::new(root_dir_path)?;
        let mut console = Console::stdio();

        keeper.reset(docker, &mut console, &self.profile())
    }
}
