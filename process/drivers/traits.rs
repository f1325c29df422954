use std::{
    path::{Path, PathBuf},
    process::Command,
};

use log::trace;
use miette::Result;

use super::opts::{ImageBuildOpts, RegistryLoginOpts, ReleaseOpts};
use crate::tools::{self, Tool};

/// Ties a driver to the external tool it runs.
pub trait ToolDriver {
    const TOOL: Tool;

    /// Makes sure the tool is installed, defaulting to
    /// its pinned version.
    ///
    /// Returns the path to the binary.
    ///
    /// # Errors
    /// Will error if the tool can't be found or installed.
    fn ensure_tool(version: Option<&str>, install_dir: Option<&Path>) -> Result<PathBuf> {
        let version = version.unwrap_or(Self::TOOL.spec().default_version);
        trace!("{}::ensure_tool({version}, {install_dir:?})", Self::TOOL);

        tools::ensure_installed(Self::TOOL, version, install_dir)
    }
}

/// Allows building and publishing images.
pub trait ImageDriver: ToolDriver {
    /// Builds the command line for a build without running it.
    fn build_command(opts: &ImageBuildOpts) -> Command;

    /// Runs the build logic for the driver.
    ///
    /// # Errors
    /// Will error if the build fails.
    fn build(opts: &ImageBuildOpts) -> Result<()>;

    /// Runs the login logic for the driver.
    ///
    /// # Errors
    /// Will error if login fails.
    fn login(opts: &RegistryLoginOpts) -> Result<()>;
}

/// Allows packaging and publishing releases.
pub trait ReleaseDriver: ToolDriver {
    /// Builds the command line for a release without running it.
    fn release_command(opts: &ReleaseOpts) -> Command;

    /// Runs the release logic for the driver.
    ///
    /// # Errors
    /// Will error if the release fails.
    fn release(opts: &ReleaseOpts) -> Result<()>;
}
