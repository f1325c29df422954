use std::path::PathBuf;

use bon::Builder;
use clap::Args;
use colored::Colorize;
use log::{info, trace};
use miette::Result;
use relkit_process_management::tools::{resolve_install_dir, Installer, Tool};
use relkit_utils::platform::{Arch, HostPlatform, Os};

use super::RelkitCommand;

#[derive(Debug, Clone, Args, Builder)]
pub struct InstallCommand {
    /// The tool to install.
    #[arg(value_enum)]
    tool: Tool,

    /// The version to install. Defaults to
    /// the pinned version of the tool.
    #[arg(long)]
    #[builder(into)]
    version: Option<String>,

    /// The directory to install into.
    #[arg(long)]
    #[builder(into)]
    install_dir: Option<PathBuf>,

    /// Install the build for another os.
    ///
    /// Implies `--force`.
    #[arg(long, value_enum)]
    os: Option<Os>,

    /// Install the build for another architecture.
    ///
    /// Implies `--force`.
    #[arg(long, value_enum)]
    arch: Option<Arch>,

    /// Download even if a matching version is found.
    #[arg(short, long)]
    #[builder(default)]
    force: bool,
}

impl RelkitCommand for InstallCommand {
    fn try_run(&mut self) -> Result<()> {
        trace!("InstallCommand::try_run()");

        let version = self
            .version
            .as_deref()
            .unwrap_or(self.tool.spec().default_version);
        let install_dir = resolve_install_dir(self.install_dir.as_deref())?;
        let platform = HostPlatform::detect_with(self.os, self.arch)?;

        let installer = Installer::builder()
            .tool(self.tool)
            .version(version)
            .platform(platform)
            .install_dir(install_dir)
            .build();

        // A foreign build can't be probed for its version.
        let path = if self.force || self.os.is_some() || self.arch.is_some() {
            installer.install()?
        } else {
            installer.ensure()?
        };

        info!(
            "{} {version} is at {}",
            self.tool.to_string().bold(),
            path.display().to_string().green()
        );
        Ok(())
    }
}
