use std::{borrow::Cow, path::Path};

use bon::Builder;

/// Options for publishing a release with `goreleaser`.
#[derive(Debug, Clone, Builder)]
pub struct ReleaseOpts<'scope> {
    /// Path to the `goreleaser` binary.
    #[builder(into)]
    pub binary: Cow<'scope, Path>,

    /// Clear the `dist` directory before building.
    #[builder(default = true)]
    pub rm_dist: bool,

    /// Exported as `LDFLAGS`.
    #[builder(into)]
    pub ldflags: Option<Cow<'scope, str>>,
}
