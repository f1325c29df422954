use std::process::Command;

use comlexr::cmd;
use log::{info, trace};
use miette::{bail, IntoDiagnostic, Result};
use relkit_utils::constants::LDFLAGS;

use super::{opts::ReleaseOpts, ReleaseDriver, ToolDriver};
use crate::{logging::CommandLogging, tools::Tool};

#[derive(Debug)]
pub struct GoReleaserDriver;

impl ToolDriver for GoReleaserDriver {
    const TOOL: Tool = Tool::Goreleaser;
}

impl ReleaseDriver for GoReleaserDriver {
    fn release_command(opts: &ReleaseOpts) -> Command {
        let mut command = cmd!(
            &*opts.binary,
            "release",
            if opts.rm_dist => "--rm-dist",
        );

        if let Some(ldflags) = opts.ldflags.as_deref() {
            command.env(LDFLAGS, ldflags);
        }
        command
    }

    fn release(opts: &ReleaseOpts) -> Result<()> {
        trace!("GoReleaserDriver::release({opts:#?})");

        let command = Self::release_command(opts);
        trace!("{command:?}");
        let status = command
            .message_status("goreleaser", "Publishing release")
            .into_diagnostic()?;

        if !status.success() {
            bail!("Failed to publish release");
        }
        info!("Successfully published release");
        Ok(())
    }
}
