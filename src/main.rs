use std::ffi::OsString;

use clap::{Parser, Subcommand};
use composekit::{
    commands::{refresh, reset},
    runtime::{ComposeFlavor, DockerCli},
};

#[derive(Parser, Debug)]
#[clap(version = env!("CARGO_PKG_VERSION"), about)]
struct Opts {
    /// Path to state directory holding the run lock
    #[clap(short, long)]
    root: Option<OsString>,

    /// Docker client binary
    #[clap(long, default_value = "docker")]
    docker: OsString,

    /// Use the standalone docker-compose binary instead of `docker compose`
    #[clap(long)]
    legacy_compose: bool,

    /// composekit commands
    #[clap(subcommand)]
    subcmd: SubCommand,
}

#[derive(Subcommand, Debug)]
enum SubCommand {
    /// Pull latest images and recreate every compose project in a directory
    Refresh(refresh::Refresh),

    /// Tear down a container instance (Nextcloud AIO by default)
    Reset(reset::Reset),
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .init();

    let opts = Opts::parse();
    let root_dir = opts.root;

    let compose = if opts.legacy_compose {
        ComposeFlavor::Standalone
    } else {
        ComposeFlavor::Plugin
    };
    let docker = DockerCli::new(opts.docker, compose);

    let result = match opts.subcmd {
        SubCommand::Refresh(refresh) => refresh.exec(root_dir, &docker).map(|_| ()),
        SubCommand::Reset(reset) => reset.exec(root_dir, &docker).map(|_| ()),
    };

    match result {
        Ok(_) => {}
        Err(err) => {
            log::error!("{}", err);
            std::process::exit(err.exit_code());
        }
    }
}
