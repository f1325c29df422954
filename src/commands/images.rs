use std::path::{Path, PathBuf};

use bon::Builder;
use clap::{Args, FromArgMatches};
use log::{debug, info, trace, warn};
use miette::{miette, IntoDiagnostic, Result};
use relkit_process_management::drivers::{
    ldflags::LdFlags,
    opts::{ImageBuildOpts, RegistryLoginOpts},
    ImageDriver, KoDriver, ToolDriver,
};
use relkit_utils::{
    constants::{
        DEFAULT_IMAGE_PLATFORM, DEFAULT_REGISTRY, DEFAULT_VERSION_PACKAGE, GITHUB_ACTOR,
        GITHUB_REF_NAME, GITHUB_TOKEN, KO_CACHE_PATH, KO_DOCKER_REPO, KO_VERSION, LATEST_TAG,
        RELKIT_KO_VERSION, RELKIT_REGISTRY, RELKIT_VERSION_PACKAGE,
    },
    credentials::Credentials,
    string,
};

#[cfg(not(test))]
use relkit_utils::get_env_var;

#[cfg(test)]
use relkit_utils::test_utils::get_env_var;

use super::RelkitCommand;

/// Arguments shared by the image tasks.
#[derive(Debug, Clone, Args, Builder)]
pub struct KoArgs {
    /// The version of ko to use. It is
    /// downloaded when missing.
    #[arg(long, env = RELKIT_KO_VERSION, default_value = KO_VERSION)]
    #[builder(into, default = string!(KO_VERSION))]
    ko_version: String,

    /// The directory missing tools are installed into.
    ///
    /// Defaults to `RELKIT_INSTALL_DIR`, then
    /// `$CARGO_HOME/bin`, then `~/.cargo/bin`.
    #[arg(long)]
    #[builder(into)]
    install_dir: Option<PathBuf>,

    /// The ko build cache. Exported as `KOCACHE`.
    #[arg(long, default_value = KO_CACHE_PATH)]
    #[builder(into, default = PathBuf::from(KO_CACHE_PATH))]
    cache_dir: PathBuf,

    /// The platform to build images for.
    #[arg(long, default_value = DEFAULT_IMAGE_PLATFORM)]
    #[builder(into, default = string!(DEFAULT_IMAGE_PLATFORM))]
    platform: String,

    /// The Go import path to build.
    #[arg(long, default_value = ".")]
    #[builder(into, default = string!("."))]
    import_path: String,

    /// The Go package whose version variables
    /// are stamped through `LDFLAGS`.
    #[arg(long, env = RELKIT_VERSION_PACKAGE, default_value = DEFAULT_VERSION_PACKAGE)]
    #[builder(into, default = string!(DEFAULT_VERSION_PACKAGE))]
    version_package: String,
}

impl KoArgs {
    fn ensure_ko(&self) -> Result<PathBuf> {
        KoDriver::ensure_tool(Some(&self.ko_version), self.install_dir.as_deref())
    }

    fn ldflags(&self) -> String {
        LdFlags::generate_or_unknown(self.version_package.as_str()).to_string()
    }

    fn build_opts<'a>(&'a self, binary: &'a Path, ldflags: &'a str) -> ImageBuildOpts<'a> {
        ImageBuildOpts::builder()
            .binary(binary)
            .import_path(self.import_path.as_str())
            .platform(self.platform.as_str())
            .cache_dir(self.cache_dir.as_path())
            .ldflags(ldflags)
            .build()
    }
}

#[derive(Debug, Clone, Args, Builder)]
pub struct BuildImagesCommand {
    #[clap(flatten)]
    #[builder(default = KoArgs::builder().build())]
    ko: KoArgs,

    /// The registry to log into before pushing.
    ///
    /// Login uses `GITHUB_ACTOR` and `GITHUB_TOKEN`
    /// and is skipped when either is missing.
    #[arg(long, env = RELKIT_REGISTRY, default_value = DEFAULT_REGISTRY)]
    #[builder(into, default = string!(DEFAULT_REGISTRY))]
    registry: String,
}

impl RelkitCommand for BuildImagesCommand {
    fn try_run(&mut self) -> Result<()> {
        trace!("BuildImagesCommand::try_run()");

        let docker_repo = docker_repo()?;
        let tags = push_tags();

        let ko = self.ko.ensure_ko()?;
        let ldflags = self.ko.ldflags();

        self.login(&ko)?;

        info!("Building images for {docker_repo} with tags {tags:?}");
        let opts = ImageBuildOpts {
            tags: tags.iter().map(|tag| tag.as_str().into()).collect(),
            docker_repo: Some(docker_repo.as_str().into()),
            ..self.ko.build_opts(&ko, &ldflags)
        };
        KoDriver::build(&opts)
    }
}

impl BuildImagesCommand {
    fn login(&self, ko: &Path) -> Result<()> {
        let Some(creds) = Credentials::from_env(self.registry.as_str()) else {
            warn!(
                "{GITHUB_ACTOR} or {GITHUB_TOKEN} not set, skipping login to {}",
                self.registry
            );
            return Ok(());
        };

        KoDriver::login(
            &RegistryLoginOpts::builder()
                .binary(ko)
                .registry(creds.registry.as_str())
                .username(creds.username.as_str())
                .password(&creds.password)
                .build(),
        )
    }
}

/// The repository images get pushed to.
fn docker_repo() -> Result<String> {
    get_env_var(KO_DOCKER_REPO)
        .map_err(|_| miette!("missing {KO_DOCKER_REPO} environment variable"))
}

/// `latest` plus the git ref being built.
fn push_tags() -> Vec<String> {
    let mut tags = vec![string!(LATEST_TAG)];

    match get_env_var(GITHUB_REF_NAME) {
        Ok(ref_name) => tags.push(ref_name),
        Err(_) => warn!("{GITHUB_REF_NAME} not set, only tagging `{LATEST_TAG}`"),
    }
    debug!("Push tags: {tags:?}");
    tags
}

#[derive(Debug, Clone, Args, Builder)]
pub struct BuildImagesLocalCommand {
    #[clap(flatten)]
    #[builder(default = KoArgs::builder().build())]
    ko: KoArgs,
}

impl BuildImagesLocalCommand {
    /// The command as if it was run without arguments,
    /// still honoring environment overrides.
    ///
    /// # Errors
    /// Will error if an environment override is invalid.
    pub fn from_env() -> Result<Self> {
        let matches = Self::augment_args(clap::Command::new("build-images-local"))
            .try_get_matches_from(["build-images-local"])
            .into_diagnostic()?;
        Self::from_arg_matches(&matches).into_diagnostic()
    }
}

impl RelkitCommand for BuildImagesLocalCommand {
    fn try_run(&mut self) -> Result<()> {
        trace!("BuildImagesLocalCommand::try_run()");

        let ko = self.ko.ensure_ko()?;
        let ldflags = self.ko.ldflags();

        let opts = ImageBuildOpts {
            local: true,
            ..self.ko.build_opts(&ko, &ldflags)
        };
        KoDriver::build(&opts)
    }
}

#[cfg(test)]
mod test {
    use std::{fs, path::Path};

    use relkit_utils::{
        constants::{GITHUB_REF_NAME, KO_DOCKER_REPO},
        test_utils::set_env_var,
    };
    use tempfile::TempDir;

    use super::{docker_repo, push_tags, BuildImagesCommand, BuildImagesLocalCommand, KoArgs};
    use crate::commands::RelkitCommand;

    /// Puts a `ko` 0.11.2 stand-in into `dir` that writes its
    /// build arguments and environment to `dir/record`.
    #[cfg(unix)]
    fn fake_ko(dir: &Path, exit_code: i32) {
        use std::os::unix::fs::PermissionsExt;

        let script = format!(
            "#!/bin/sh\n\
             case \"$1\" in\n\
             version) echo 0.11.2 ;;\n\
             login) cat > /dev/null ;;\n\
             *) printf '%s\\n' \"$*\" \"$KO_DOCKER_REPO\" \"$KOCACHE\" \"$LDFLAGS\" > {record}\n\
             exit {exit_code} ;;\n\
             esac\n",
            record = dir.join("record").display(),
        );
        let ko = dir.join("ko");
        fs::write(&ko, script).unwrap();
        fs::set_permissions(&ko, fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[cfg(unix)]
    fn ko_args(dir: &Path) -> KoArgs {
        KoArgs::builder()
            .install_dir(dir)
            .cache_dir(dir.join("cache"))
            .build()
    }

    #[cfg(unix)]
    #[test]
    fn build_images_pushes_with_tags() {
        let dir = TempDir::new().unwrap();
        fake_ko(dir.path(), 0);
        set_env_var(KO_DOCKER_REPO, "ghcr.io/acme/app");
        set_env_var(GITHUB_REF_NAME, "v1.2.3");

        BuildImagesCommand::builder()
            .ko(ko_args(dir.path()))
            .build()
            .try_run()
            .unwrap();

        let record = fs::read_to_string(dir.path().join("record")).unwrap();
        let record: Vec<&str> = record.lines().collect();
        assert_eq!(
            record[0],
            "build --bare --platform=linux/amd64 -t latest -t v1.2.3 ."
        );
        assert_eq!(record[1], "ghcr.io/acme/app");
        assert_eq!(Path::new(record[2]), dir.path().join("cache"));
        assert!(record[3].starts_with("-X sigs.k8s.io/release-utils/version.gitVersion="));
        assert!(dir.path().join("cache").is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn build_images_fails_with_ko() {
        let dir = TempDir::new().unwrap();
        fake_ko(dir.path(), 1);
        set_env_var(KO_DOCKER_REPO, "ghcr.io/acme/app");

        let err = BuildImagesCommand::builder()
            .ko(ko_args(dir.path()))
            .build()
            .try_run()
            .unwrap_err();
        assert!(err.to_string().contains("Failed to build images"));
        assert!(dir.path().join("record").exists());
    }

    #[cfg(unix)]
    #[test]
    fn build_images_local_runs_ko() {
        let dir = TempDir::new().unwrap();
        fake_ko(dir.path(), 0);

        BuildImagesLocalCommand::builder()
            .ko(ko_args(dir.path()))
            .build()
            .try_run()
            .unwrap();

        let record = fs::read_to_string(dir.path().join("record")).unwrap();
        assert_eq!(
            record.lines().next(),
            Some("build --bare --local --platform=linux/amd64 .")
        );
    }

    #[test]
    fn missing_docker_repo() {
        let err = docker_repo().unwrap_err();
        assert_eq!(err.to_string(), "missing KO_DOCKER_REPO environment variable");
    }

    #[test]
    fn empty_docker_repo_is_missing() {
        set_env_var(KO_DOCKER_REPO, "");
        assert!(docker_repo().is_err());
    }

    #[test]
    fn docker_repo_from_env() {
        set_env_var(KO_DOCKER_REPO, "ghcr.io/acme/app");
        assert_eq!(docker_repo().unwrap(), "ghcr.io/acme/app");
    }

    #[test]
    fn build_images_fails_before_install() {
        let err = BuildImagesCommand::builder()
            .ko(KoArgs::builder()
                .install_dir("/nonexistent/relkit/bin")
                .build())
            .build()
            .try_run()
            .unwrap_err();
        assert!(err.to_string().contains("missing KO_DOCKER_REPO"));
    }

    #[test]
    fn push_tags_with_ref() {
        set_env_var(GITHUB_REF_NAME, "v1.2.3");
        assert_eq!(push_tags(), ["latest", "v1.2.3"]);
    }

    #[test]
    fn push_tags_without_ref() {
        assert_eq!(push_tags(), ["latest"]);
    }

    #[test]
    fn local_build_opts() {
        let args = KoArgs::builder().build();
        let opts = args.build_opts(Path::new("/bin/ko"), "-X a.b=c");

        assert_eq!(opts.import_path, ".");
        assert_eq!(opts.platform, "linux/amd64");
        assert_eq!(opts.cache_dir, Path::new("/tmp/ko"));
        assert_eq!(opts.ldflags.as_deref(), Some("-X a.b=c"));
        assert!(opts.tags.is_empty());
    }

    #[test]
    fn local_from_env_defaults() {
        let command = BuildImagesLocalCommand::from_env().unwrap();
        assert_eq!(command.ko.import_path, ".");
        assert_eq!(command.ko.cache_dir, Path::new("/tmp/ko"));
    }
}
