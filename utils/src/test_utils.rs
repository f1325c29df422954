//! Stand-ins for the env var helpers in tests.
//!
//! Every test thread gets its own set of variables, so
//! tests running in parallel can't see each other's values
//! and the real environment is never touched.

use std::{cell::RefCell, collections::HashMap};

use miette::{miette, Result};

thread_local! {
    static ENV_VARS: RefCell<HashMap<String, String>> = RefCell::new(HashMap::new());
}

/// Test harness function for getting env variables.
///
/// # Errors
/// Will error if the env variable wasn't set on this
/// thread or is empty.
pub fn get_env_var<S>(key: S) -> Result<String>
where
    S: AsRef<str>,
{
    let key = key.as_ref();
    ENV_VARS
        .with_borrow(|vars| vars.get(key).filter(|val| !val.is_empty()).cloned())
        .ok_or_else(|| miette!("Failed to retrieve env var '{key}'"))
}

/// Test harness function for setting env variables.
pub fn set_env_var<S, T>(key: S, value: T)
where
    S: Into<String>,
    T: Into<String>,
{
    ENV_VARS.with_borrow_mut(|vars| {
        vars.insert(key.into(), value.into());
    });
}
