use std::{
    borrow::Cow,
    ffi::OsStr,
    fs,
    io::{BufReader, Seek},
    path::{Path, PathBuf},
};

use bon::Builder;
use log::{debug, info, trace, warn};
use miette::{miette, Context, IntoDiagnostic, Result};
use relkit_utils::{
    constants::{CARGO_HOME, RELKIT_INSTALL_DIR},
    dir_on_path,
    platform::HostPlatform,
};
use semver::Version;

#[cfg(not(test))]
use relkit_utils::get_env_var;

#[cfg(test)]
use relkit_utils::test_utils::get_env_var;

use super::{find_command, Downloader, HttpDownloader, InstallError, Tool};

/// Works out where tools get installed.
///
/// Uses `explicit` if given, then `$RELKIT_INSTALL_DIR`,
/// then `$CARGO_HOME/bin`, then `~/.cargo/bin`.
///
/// # Errors
/// Will error if none of those can be determined.
pub fn resolve_install_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        return Ok(dir.to_path_buf());
    }

    if let Ok(dir) = get_env_var(RELKIT_INSTALL_DIR) {
        return Ok(PathBuf::from(dir));
    }

    if let Ok(cargo_home) = get_env_var(CARGO_HOME) {
        return Ok(Path::new(&cargo_home).join("bin"));
    }

    relkit_utils::home_dir()
        .map(|home| home.join(".cargo").join("bin"))
        .ok_or_else(|| {
            miette!("Unable to determine an install directory, set {RELKIT_INSTALL_DIR}")
        })
}

/// Downloads and installs a pinned version of a tool.
#[derive(Debug, Builder)]
pub struct Installer<'scope> {
    tool: Tool,

    #[builder(into)]
    version: Cow<'scope, str>,

    platform: HostPlatform,

    #[builder(into)]
    install_dir: Cow<'scope, Path>,

    /// Also look for the tool on `PATH`, not just in the install dir.
    #[builder(default = true)]
    search_env_path: bool,

    #[builder(default = &HttpDownloader as &dyn Downloader)]
    downloader: &'scope dyn Downloader,
}

impl Installer<'_> {
    /// The URL of the release archive for this platform.
    ///
    /// # Errors
    /// Will error if the tool's URL template is malformed.
    pub fn download_url(&self) -> Result<String, InstallError> {
        self.tool.spec().download_url(&self.version, self.platform)
    }

    /// Where the binary ends up once installed.
    #[must_use]
    pub fn target_path(&self) -> PathBuf {
        self.install_dir
            .join(self.tool.spec().target_file_name(self.platform))
    }

    /// Looks for an install of the tool at the pinned version,
    /// first in the install dir and then on `PATH`.
    ///
    /// # Errors
    /// Will error if the version probe couldn't be run or the
    /// pinned version is not valid semver.
    pub fn find_installed(&self) -> Result<Option<PathBuf>> {
        let spec = self.tool.spec();
        let expected = Version::parse(self.version.trim_start_matches('v'))
            .into_diagnostic()
            .with_context(|| format!("Invalid version {} for `{}`", self.version, spec.name))?;

        if let Some(path) = find_command(
            spec.name,
            spec.version_args,
            &expected,
            Some(self.install_dir.as_os_str()),
        )? {
            return Ok(Some(path));
        }

        if self.search_env_path {
            find_command(spec.name, spec.version_args, &expected, None::<&OsStr>)
        } else {
            Ok(None)
        }
    }

    /// Makes sure the pinned version of the tool is installed,
    /// downloading it if needed.
    ///
    /// Returns the path to the binary.
    ///
    /// # Errors
    /// Will error if the check or the install fails.
    pub fn ensure(&self) -> Result<PathBuf> {
        let name = self.tool.spec().name;
        info!("Checking if `{name}` version {} is installed", self.version);

        let path = if let Some(path) = self.find_installed()? {
            path
        } else {
            info!("`{name}` not found");
            let path = self.install()?;

            if !dir_on_path(&self.install_dir) {
                warn!(
                    "{} is not on your PATH, add it to run `{name}` directly",
                    self.install_dir.display()
                );
            }
            path
        };

        info!("`{name}` is installed!");
        debug!("Using {}", path.display());
        Ok(path)
    }

    /// Downloads the release archive and installs the binary,
    /// replacing any existing file at [`Self::target_path`].
    ///
    /// # Errors
    /// Will error if the download or extraction fails or
    /// the install dir isn't writable.
    pub fn install(&self) -> Result<PathBuf, InstallError> {
        let spec = self.tool.spec();
        let url = self.download_url()?;
        let target = self.target_path();
        trace!("Installer::install({url} -> {})", target.display());

        info!("Will install `{}` version {}", spec.name, self.version);

        fs::create_dir_all(&self.install_dir)
            .map_err(|e| InstallError::Io(self.install_dir.to_path_buf(), e))?;

        let mut archive =
            tempfile::tempfile().map_err(|e| InstallError::Io(std::env::temp_dir(), e))?;
        let size = self.downloader.fetch(&url, &mut archive)?;
        debug!("Downloaded {size} bytes from {url}");
        archive
            .rewind()
            .map_err(|e| InstallError::Io(std::env::temp_dir(), e))?;

        let mut staged = tempfile::NamedTempFile::new_in(&self.install_dir)
            .map_err(|e| InstallError::Io(self.install_dir.to_path_buf(), e))?;
        spec.archive_format(self.platform.os).extract_binary(
            BufReader::new(archive),
            &spec.target_file_name(self.platform),
            staged.as_file_mut(),
        )?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            fs::set_permissions(staged.path(), fs::Permissions::from_mode(0o755))
                .map_err(|e| InstallError::Io(staged.path().to_path_buf(), e))?;
        }

        staged
            .persist(&target)
            .map_err(|e| InstallError::Io(target.clone(), e.error))?;

        info!("Installed `{}` to {}", spec.name, target.display());
        Ok(target)
    }
}

#[cfg(test)]
mod test {
    use std::{
        fs,
        io::Write,
        path::Path,
        sync::atomic::{AtomicUsize, Ordering},
    };

    use relkit_utils::{
        constants::{CARGO_HOME, RELKIT_INSTALL_DIR},
        platform::{Arch, HostPlatform, Os},
        test_utils::set_env_var,
    };
    use rstest::rstest;
    use tempfile::TempDir;

    use super::{resolve_install_dir, Installer};
    use crate::tools::{archive::test::tar_gz, Downloader, InstallError, Tool};

    /// Serves a fixed archive and counts how often it was asked to.
    #[derive(Debug)]
    struct StubDownloader {
        body: Vec<u8>,
        fetches: AtomicUsize,
    }

    impl StubDownloader {
        fn new(body: Vec<u8>) -> Self {
            Self {
                body,
                fetches: AtomicUsize::new(0),
            }
        }

        fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    impl Downloader for StubDownloader {
        fn fetch(&self, url: &str, dest: &mut dyn Write) -> Result<u64, InstallError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            dest.write_all(&self.body)
                .map_err(|e| InstallError::DownloadBody(url.to_string(), e))?;
            Ok(self.body.len() as u64)
        }
    }

    #[derive(Debug)]
    struct FailingDownloader;

    impl Downloader for FailingDownloader {
        fn fetch(&self, url: &str, _dest: &mut dyn Write) -> Result<u64, InstallError> {
            Err(InstallError::DownloadStatus(
                url.to_string(),
                reqwest::StatusCode::NOT_FOUND,
            ))
        }
    }

    fn installer<'a>(
        tool: Tool,
        os: Os,
        dir: &'a Path,
        downloader: &'a dyn Downloader,
    ) -> Installer<'a> {
        Installer::builder()
            .tool(tool)
            .version(tool.spec().default_version)
            .platform(HostPlatform::new(os, Arch::Amd64))
            .install_dir(dir)
            .search_env_path(false)
            .downloader(downloader)
            .build()
    }

    #[rstest]
    #[case(Tool::Ko, Os::Linux, "ko")]
    #[case(Tool::Ko, Os::Darwin, "ko")]
    #[case(Tool::Ko, Os::Windows, "ko.exe")]
    #[case(Tool::Goreleaser, Os::Linux, "goreleaser")]
    #[case(Tool::Goreleaser, Os::Windows, "goreleaser.exe")]
    fn installs_binary_with_platform_name(
        #[case] tool: Tool,
        #[case] os: Os,
        #[case] file_name: &str,
    ) {
        let dir = TempDir::new().unwrap();
        let downloader = StubDownloader::new(tar_gz(&[
            ("README.md", b"readme"),
            (file_name, b"binary contents"),
        ]));

        let path = installer(tool, os, dir.path(), &downloader)
            .install()
            .unwrap();

        assert_eq!(path, dir.path().join(file_name));
        assert_eq!(fs::read(&path).unwrap(), b"binary contents");
        assert_eq!(downloader.fetches(), 1);
    }

    #[test]
    fn creates_missing_install_dir() {
        let dir = TempDir::new().unwrap();
        let install_dir = dir.path().join("nested").join("bin");
        let downloader = StubDownloader::new(tar_gz(&[("ko", b"ko")]));

        let path = installer(Tool::Ko, Os::Linux, &install_dir, &downloader)
            .install()
            .unwrap();
        assert!(path.starts_with(&install_dir));
        assert!(path.exists());
    }

    #[test]
    fn download_failure_is_reported() {
        let dir = TempDir::new().unwrap();

        let err = installer(Tool::Ko, Os::Linux, dir.path(), &FailingDownloader)
            .install()
            .unwrap_err();
        assert!(err.is_download());
        assert!(!dir.path().join("ko").exists());
    }

    #[test]
    fn malformed_archive_is_reported() {
        let dir = TempDir::new().unwrap();
        let downloader = StubDownloader::new(b"<html>rate limited</html>".to_vec());

        let err = installer(Tool::Goreleaser, Os::Linux, dir.path(), &downloader)
            .install()
            .unwrap_err();
        assert!(err.is_extract());
        assert!(!dir.path().join("goreleaser").exists());
    }

    #[cfg(unix)]
    #[test]
    fn ensure_does_not_download_twice() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let script = b"#!/bin/sh\necho 'goreleaser version 1.10.3'\n";
        let downloader = StubDownloader::new(tar_gz(&[("goreleaser", script)]));
        let installer = installer(Tool::Goreleaser, Os::Linux, dir.path(), &downloader);

        assert!(installer.find_installed().unwrap().is_none());

        let first = installer.ensure().unwrap();
        assert_eq!(downloader.fetches(), 1);
        let mode = fs::metadata(&first).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);

        let second = installer.ensure().unwrap();
        assert_eq!(first, second);
        assert_eq!(downloader.fetches(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn install_dir_is_searched_before_path() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let ko = dir.path().join("ko");
        fs::write(&ko, "#!/bin/sh\necho 0.11.2\n").unwrap();
        fs::set_permissions(&ko, fs::Permissions::from_mode(0o755)).unwrap();

        let found = Installer::builder()
            .tool(Tool::Ko)
            .version("0.11.2")
            .platform(HostPlatform::new(Os::Linux, Arch::Amd64))
            .install_dir(dir.path())
            .build()
            .find_installed()
            .unwrap();
        assert_eq!(found, Some(ko));
    }

    #[test]
    fn explicit_install_dir_wins() {
        set_env_var(RELKIT_INSTALL_DIR, "/opt/relkit/bin");
        assert_eq!(
            resolve_install_dir(Some(Path::new("/tmp/bin"))).unwrap(),
            Path::new("/tmp/bin")
        );
    }

    #[test]
    fn install_dir_from_env() {
        set_env_var(RELKIT_INSTALL_DIR, "/opt/relkit/bin");
        set_env_var(CARGO_HOME, "/home/dev/.cargo");
        assert_eq!(
            resolve_install_dir(None).unwrap(),
            Path::new("/opt/relkit/bin")
        );
    }

    #[test]
    fn install_dir_from_cargo_home() {
        set_env_var(CARGO_HOME, "/home/dev/.cargo");
        assert_eq!(
            resolve_install_dir(None).unwrap(),
            Path::new("/home/dev/.cargo/bin")
        );
    }
}
