use std::{borrow::Cow, path::Path};

use bon::Builder;
use relkit_utils::secret::SecretValue;

#[derive(Debug, Clone, Builder)]
pub struct RegistryLoginOpts<'scope> {
    #[builder(into)]
    pub binary: Cow<'scope, Path>,

    #[builder(into)]
    pub registry: Cow<'scope, str>,

    #[builder(into)]
    pub username: Cow<'scope, str>,

    /// Written to the tool's stdin, never passed as an argument.
    pub password: &'scope SecretValue,
}
