use log::trace;

use crate::{
    constants::{GITHUB_ACTOR, GITHUB_TOKEN},
    secret::SecretValue,
};

#[cfg(not(test))]
use crate::get_env_var;

#[cfg(test)]
use crate::test_utils::get_env_var;

/// Registry login credentials.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub registry: String,
    pub username: String,
    pub password: SecretValue,
}

impl Credentials {
    /// Collects credentials for `registry` from the CI environment.
    ///
    /// The username comes from `GITHUB_ACTOR` and the
    /// password from `GITHUB_TOKEN`. Returns `None` unless
    /// both are set.
    #[must_use]
    pub fn from_env<S>(registry: S) -> Option<Self>
    where
        S: Into<String>,
    {
        let registry = registry.into();
        trace!("Credentials::from_env({registry})");

        let username = get_env_var(GITHUB_ACTOR).ok()?;
        let password = get_env_var(GITHUB_TOKEN).ok()?;

        Some(Self {
            registry,
            username,
            password: password.into(),
        })
    }
}
