use std::{borrow::Cow, path::Path};

use bon::Builder;
use relkit_utils::constants::{DEFAULT_IMAGE_PLATFORM, KO_CACHE_PATH};

/// Options for building container images with `ko`.
#[derive(Debug, Clone, Builder)]
pub struct ImageBuildOpts<'scope> {
    /// Path to the `ko` binary.
    #[builder(into)]
    pub binary: Cow<'scope, Path>,

    /// The Go import path to build.
    #[builder(default = Cow::Borrowed("."), into)]
    pub import_path: Cow<'scope, str>,

    #[builder(default = Cow::Borrowed(DEFAULT_IMAGE_PLATFORM), into)]
    pub platform: Cow<'scope, str>,

    /// The list of tags for the image being built.
    #[builder(default, into)]
    pub tags: Vec<Cow<'scope, str>>,

    /// Load the image into the local daemon instead of pushing.
    #[builder(default)]
    pub local: bool,

    /// Use the repository as the image name without
    /// appending the import path.
    #[builder(default = true)]
    pub bare: bool,

    /// The repository images are pushed to. Exported as `KO_DOCKER_REPO`.
    #[builder(into)]
    pub docker_repo: Option<Cow<'scope, str>>,

    /// Exported as `KOCACHE`.
    #[builder(default = Cow::Borrowed(Path::new(KO_CACHE_PATH)), into)]
    pub cache_dir: Cow<'scope, Path>,

    /// Exported as `LDFLAGS`.
    #[builder(into)]
    pub ldflags: Option<Cow<'scope, str>>,
}
