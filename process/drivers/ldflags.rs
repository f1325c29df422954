//! Version stamping for Go binaries.
//!
//! Produces the `-X` linker flags that fill in the version
//! variables of a Go package from the git metadata of the
//! working tree.

use std::{borrow::Cow, fmt};

use chrono::{DateTime, SecondsFormat, Utc};
use comlexr::cmd;
use log::{debug, trace, warn};
use miette::{bail, miette, IntoDiagnostic, Result};
use relkit_utils::constants::{SOURCE_DATE_EPOCH, UNKNOWN_VERSION};

#[cfg(not(test))]
use relkit_utils::get_env_var;

#[cfg(test)]
use relkit_utils::test_utils::get_env_var;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LdFlags<'scope> {
    pub package: Cow<'scope, str>,
    pub git_version: String,
    pub git_commit: String,
    pub git_tree_state: String,
    pub build_date: String,
}

impl<'scope> LdFlags<'scope> {
    /// Flags with every field set to `unknown`.
    #[must_use]
    pub fn unknown<P>(package: P) -> Self
    where
        P: Into<Cow<'scope, str>>,
    {
        Self {
            package: package.into(),
            git_version: UNKNOWN_VERSION.into(),
            git_commit: UNKNOWN_VERSION.into(),
            git_tree_state: UNKNOWN_VERSION.into(),
            build_date: UNKNOWN_VERSION.into(),
        }
    }

    /// Reads the git metadata of the current directory.
    ///
    /// # Errors
    /// Will error if `git` can't be run or the directory
    /// is not a git work tree.
    pub fn generate<P>(package: P) -> Result<Self>
    where
        P: Into<Cow<'scope, str>>,
    {
        let package = package.into();
        trace!("LdFlags::generate({package})");

        let git_version = git(&["describe", "--tags", "--always", "--dirty"])?;
        let git_commit = git(&["rev-parse", "HEAD"])?;
        let git_tree_state = tree_state(&git(&["status", "--porcelain"])?).to_string();
        let build_date = build_date(get_env_var(SOURCE_DATE_EPOCH).ok().as_deref())?;

        Ok(Self {
            package,
            git_version,
            git_commit,
            git_tree_state,
            build_date,
        })
    }

    /// Like [`LdFlags::generate`], but logs a warning and
    /// falls back to [`LdFlags::unknown`] on failure.
    #[must_use]
    pub fn generate_or_unknown<P>(package: P) -> Self
    where
        P: Into<Cow<'scope, str>>,
    {
        let package = package.into();
        match Self::generate(package.clone()) {
            Ok(flags) => {
                debug!("Generated LDFLAGS: {flags}");
                flags
            }
            Err(e) => {
                warn!("Unable to read version info from git, stamping `{UNKNOWN_VERSION}`: {e}");
                Self::unknown(package)
            }
        }
    }
}

impl fmt::Display for LdFlags<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pkg = &self.package;
        write!(
            f,
            "-X {pkg}.gitVersion={} -X {pkg}.gitCommit={} -X {pkg}.gitTreeState={} -X {pkg}.buildDate={}",
            self.git_version, self.git_commit, self.git_tree_state, self.build_date,
        )
    }
}

fn git(args: &[&str]) -> Result<String> {
    let output = cmd!("git", for args).output().into_diagnostic()?;

    if !output.status.success() {
        bail!(
            "git {} failed:\n{}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// `clean` when `git status --porcelain` printed nothing.
fn tree_state(porcelain: &str) -> &'static str {
    if porcelain.trim().is_empty() {
        "clean"
    } else {
        "dirty"
    }
}

/// RFC 3339 in UTC, taken from a unix timestamp when given.
fn build_date(source_date_epoch: Option<&str>) -> Result<String> {
    let date = match source_date_epoch {
        Some(epoch) => {
            let secs = epoch
                .trim()
                .parse::<i64>()
                .map_err(|e| miette!("Invalid {SOURCE_DATE_EPOCH} `{epoch}`: {e}"))?;
            DateTime::<Utc>::from_timestamp(secs, 0)
                .ok_or_else(|| miette!("{SOURCE_DATE_EPOCH} `{epoch}` is out of range"))?
        }
        None => Utc::now(),
    };

    Ok(date.to_rfc3339_opts(SecondsFormat::Secs, true))
}
