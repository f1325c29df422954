use std::path::PathBuf;

use clap::{crate_authors, Parser, Subcommand};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use log::error;
use miette::Result;
use relkit_utils::constants::RELKIT_LOG_DIR;

use crate::shadow;

pub mod completions;
pub mod images;
pub mod install;
pub mod release;

pub trait RelkitCommand {
    /// Runs the command and returns a result
    /// of the execution
    ///
    /// # Errors
    /// Can return a `miette` Error
    fn try_run(&mut self) -> Result<()>;

    /// Runs the command and exits if there is an error.
    fn run(&mut self) {
        if let Err(e) = self.try_run() {
            error!("Failed:\n{e:?}");
            std::process::exit(1);
        }
    }
}

#[derive(Parser, Debug)]
#[clap(
    name = "relkit",
    about,
    long_about = None,
    author = crate_authors!(),
    version = shadow::PKG_VERSION,
    long_version = shadow::CLAP_LONG_VERSION,
)]
pub struct RelkitArgs {
    #[command(subcommand)]
    pub command: Option<CommandArgs>,

    /// The directory to write the log file to.
    #[arg(long, global = true, env = RELKIT_LOG_DIR)]
    pub log_out: Option<PathBuf>,

    #[clap(flatten)]
    pub verbosity: Verbosity<InfoLevel>,
}

#[derive(Debug, Subcommand)]
pub enum CommandArgs {
    /// Build images with ko and push them to
    /// `KO_DOCKER_REPO`.
    ///
    /// Images are tagged `latest` and with
    /// `GITHUB_REF_NAME` when it is set.
    BuildImages(images::BuildImagesCommand),

    /// Build images with ko into the local
    /// container daemon.
    ///
    /// This is the default when no subcommand
    /// is given.
    BuildImagesLocal(images::BuildImagesLocalCommand),

    /// Publish a release with goreleaser
    Release(release::ReleaseCommand),

    /// Install a pinned tool if it is missing
    Install(install::InstallCommand),

    /// Generate shell completions for your shell to stdout
    Completions(completions::CompletionsCommand),
}

impl RelkitArgs {
    /// Runs the selected subcommand, falling back
    /// to a local image build.
    pub fn run(self) {
        match self.command {
            Some(CommandArgs::BuildImages(mut command)) => command.run(),
            Some(CommandArgs::BuildImagesLocal(mut command)) => command.run(),
            Some(CommandArgs::Release(mut command)) => command.run(),
            Some(CommandArgs::Install(mut command)) => command.run(),
            Some(CommandArgs::Completions(mut command)) => command.run(),
            None => match images::BuildImagesLocalCommand::from_env() {
                Ok(mut command) => command.run(),
                Err(e) => {
                    error!("Failed:\n{e:?}");
                    std::process::exit(1);
                }
            },
        }
    }
}
