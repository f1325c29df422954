use std::{ffi::OsStr, path::PathBuf, time::Duration};

use log::{debug, trace};
use miette::{Context, IntoDiagnostic, Result};
use relkit_utils::{exec_cmd, resolve_binary};
use semver::Version;

const PROBE_TIME_LIMIT: Duration = Duration::from_secs(10);

/// Looks for `binary` and checks that it reports the `expected` version.
///
/// The binary is looked up in `search_path` if given, otherwise in
/// `PATH`. Returns the full path of a matching binary.
///
/// # Errors
/// Will error if the binary exists but the version probe
/// couldn't be executed, e.g. because of missing permissions.
pub fn find_command<P>(
    binary: &str,
    version_args: &[&str],
    expected: &Version,
    search_path: Option<P>,
) -> Result<Option<PathBuf>>
where
    P: AsRef<OsStr>,
{
    trace!("find_command({binary}, {version_args:?}, {expected})");

    let Some(full_path) = resolve_binary(binary, search_path) else {
        debug!("`{binary}` is not on the search path");
        return Ok(None);
    };

    let Some(output) = exec_cmd(&full_path, version_args, PROBE_TIME_LIMIT)
        .into_diagnostic()
        .with_context(|| format!("Failed to probe the version of {}", full_path.display()))?
    else {
        debug!("Version probe of {} failed", full_path.display());
        return Ok(None);
    };

    let found = output.lines().find_map(parse_version);
    trace!("`{binary}` reports version {found:?}");

    Ok(match found {
        Some(version) if version == *expected => Some(full_path),
        Some(version) => {
            debug!(
                "Found `{binary}` version {version} at {}, need {expected}",
                full_path.display()
            );
            None
        }
        None => {
            debug!("Unable to determine the version of {}", full_path.display());
            None
        }
    })
}

/// Checks whether `binary` is on the search path at the `expected` version.
///
/// # Errors
/// Will error if the version probe couldn't be executed.
pub fn is_command_available<P>(
    binary: &str,
    version_args: &[&str],
    expected: &Version,
    search_path: Option<P>,
) -> Result<bool>
where
    P: AsRef<OsStr>,
{
    find_command(binary, version_args, expected, search_path).map(|found| found.is_some())
}

/// Pulls the first semver looking token out of a line of
/// version output, e.g. `goreleaser version 1.10.3` or `v0.11.2`.
pub(super) fn parse_version(line: &str) -> Option<Version> {
    line.split(|c: char| c.is_whitespace() || c == ',' || c == '(' || c == ')')
        .map(|token| token.trim_start_matches(['v', 'V']))
        .find_map(|token| Version::parse(token).ok())
}
