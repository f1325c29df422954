use std::path::PathBuf;

use bon::Builder;
use clap::Args;
use log::trace;
use miette::Result;
use relkit_process_management::drivers::{
    ldflags::LdFlags, opts::ReleaseOpts, GoReleaserDriver, ReleaseDriver, ToolDriver,
};
use relkit_utils::{
    constants::{
        DEFAULT_VERSION_PACKAGE, GORELEASER_VERSION, RELKIT_GORELEASER_VERSION,
        RELKIT_VERSION_PACKAGE,
    },
    string,
};

use super::RelkitCommand;

#[derive(Debug, Clone, Args, Builder)]
pub struct ReleaseCommand {
    /// The version of goreleaser to use. It is
    /// downloaded when missing.
    #[arg(long, env = RELKIT_GORELEASER_VERSION, default_value = GORELEASER_VERSION)]
    #[builder(into, default = string!(GORELEASER_VERSION))]
    goreleaser_version: String,

    /// The directory missing tools are installed into.
    #[arg(long)]
    #[builder(into)]
    install_dir: Option<PathBuf>,

    /// Keep the contents of `dist/` from a previous run.
    #[arg(long)]
    #[builder(default)]
    keep_dist: bool,

    /// The Go package whose version variables
    /// are stamped through `LDFLAGS`.
    #[arg(long, env = RELKIT_VERSION_PACKAGE, default_value = DEFAULT_VERSION_PACKAGE)]
    #[builder(into, default = string!(DEFAULT_VERSION_PACKAGE))]
    version_package: String,
}

impl RelkitCommand for ReleaseCommand {
    fn try_run(&mut self) -> Result<()> {
        trace!("ReleaseCommand::try_run()");

        let goreleaser = GoReleaserDriver::ensure_tool(
            Some(&self.goreleaser_version),
            self.install_dir.as_deref(),
        )?;
        let ldflags = LdFlags::generate_or_unknown(self.version_package.as_str()).to_string();

        GoReleaserDriver::release(
            &ReleaseOpts::builder()
                .binary(goreleaser)
                .rm_dist(!self.keep_dist)
                .ldflags(ldflags)
                .build(),
        )
    }
}
