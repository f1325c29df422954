pub mod command_output;
pub mod credentials;
pub mod constants;
pub mod platform;
pub mod secret;

#[cfg(any(test, feature = "test"))]
pub mod test_utils;

use std::{
    env,
    path::{Path, PathBuf},
};

use log::trace;
use miette::{miette, Result};

pub use command_output::*;

/// Creates a `String` from a string-like value.
#[macro_export]
macro_rules! string {
    ($str:expr) => {
        ::std::string::String::from($str)
    };
}

/// Gets the value of an env var.
///
/// Empty values are treated the same as
/// a missing variable.
///
/// # Errors
/// Will error if the env var doesn't exist or is empty.
pub fn get_env_var<S>(key: S) -> Result<String>
where
    S: AsRef<str>,
{
    fn inner(key: &str) -> Result<String> {
        env::var(key)
            .ok()
            .filter(|val| !val.is_empty())
            .inspect(|_| trace!("Found env var {key}"))
            .ok_or_else(|| miette!("Failed to retrieve env var '{key}'"))
    }
    inner(key.as_ref())
}

/// Checks whether a directory is one of the entries
/// of the current `PATH`.
#[must_use]
pub fn dir_on_path(dir: &Path) -> bool {
    env::var_os("PATH").is_some_and(|path| env::split_paths(&path).any(|p| p == dir))
}

#[must_use]
pub fn home_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|base_dirs| base_dirs.home_dir().to_path_buf())
}
