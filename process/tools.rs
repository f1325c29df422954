//! Locating and installing the external tools the tasks shell out to.
//!
//! Each [`Tool`] carries a static [`ToolSpec`] describing how to probe
//! its version and where its release archives live. [`Installer`] ties
//! a [`ToolSpec`] to a version, platform and install directory.

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use log::trace;
use miette::{Diagnostic, Result};
use relkit_utils::{
    constants::{GORELEASER_URL_TEMPLATE, GORELEASER_VERSION, KO_URL_TEMPLATE, KO_VERSION},
    platform::{Arch, HostPlatform, Os},
};
use thiserror::Error;

pub use self::{
    archive::ArchiveFormat,
    check::{find_command, is_command_available},
    download::{Downloader, HttpDownloader},
    install::{resolve_install_dir, Installer},
    template::{TemplateVars, UrlTemplate},
};

mod archive;
mod check;
mod download;
mod install;
mod template;

#[derive(Error, Diagnostic, Debug)]
pub enum InstallError {
    #[error("Invalid URL template `{0}`: {1}")]
    #[diagnostic()]
    Template(String, String),

    #[error("Failed to download {0}:\n{1}")]
    #[diagnostic()]
    Download(String, reqwest::Error),

    #[error("Download of {0} failed with HTTP status {1}")]
    #[diagnostic()]
    DownloadStatus(String, reqwest::StatusCode),

    #[error("Failed to read the download of {0}:\n{1}")]
    #[diagnostic()]
    DownloadBody(String, std::io::Error),

    #[error("Failed to extract `{0}` from the archive:\n{1}")]
    #[diagnostic()]
    Extract(String, std::io::Error),

    #[error("The archive doesn't contain `{0}`")]
    #[diagnostic()]
    MissingBinary(String),

    #[error("Failed to write {}:\n{}", .0.display(), .1)]
    #[diagnostic()]
    Io(PathBuf, std::io::Error),
}

impl InstallError {
    /// The archive could not be fetched.
    #[must_use]
    pub const fn is_download(&self) -> bool {
        matches!(
            self,
            Self::Download(..) | Self::DownloadStatus(..) | Self::DownloadBody(..)
        )
    }

    /// The archive was fetched but is unusable.
    #[must_use]
    pub const fn is_extract(&self) -> bool {
        matches!(self, Self::Extract(..) | Self::MissingBinary(..))
    }
}

/// Everything needed to probe and install a tool.
#[derive(Debug, Clone, Copy)]
pub struct ToolSpec {
    /// The binary name, also the name of the file inside the archive.
    pub name: &'static str,

    /// Arguments that make the binary print its version.
    pub version_args: &'static [&'static str],

    pub default_version: &'static str,

    pub url_template: &'static str,

    /// Os names as the release assets spell them. Unlisted
    /// oses use their own name.
    pub os_replacements: &'static [(Os, &'static str)],

    /// Arch names as the release assets spell them. Unlisted
    /// arches use their own name.
    pub arch_replacements: &'static [(Arch, &'static str)],

    /// Archive format per os. Unlisted oses get a tarball.
    pub archive_formats: &'static [(Os, ArchiveFormat)],
}

const TITLE_CASE_OS: &[(Os, &str)] = &[
    (Os::Darwin, "Darwin"),
    (Os::Linux, "Linux"),
    (Os::Windows, "Windows"),
];

const X86_64_ARCH: &[(Arch, &str)] = &[(Arch::Amd64, "x86_64")];

const TARBALLS: &[(Os, ArchiveFormat)] = &[
    (Os::Linux, ArchiveFormat::TarGz),
    (Os::Darwin, ArchiveFormat::TarGz),
    (Os::Windows, ArchiveFormat::TarGz),
];

pub const KO_SPEC: ToolSpec = ToolSpec {
    name: "ko",
    version_args: &["version"],
    default_version: KO_VERSION,
    url_template: KO_URL_TEMPLATE,
    os_replacements: TITLE_CASE_OS,
    arch_replacements: X86_64_ARCH,
    archive_formats: TARBALLS,
};

pub const GORELEASER_SPEC: ToolSpec = ToolSpec {
    name: "goreleaser",
    version_args: &["-v"],
    default_version: GORELEASER_VERSION,
    url_template: GORELEASER_URL_TEMPLATE,
    os_replacements: TITLE_CASE_OS,
    arch_replacements: X86_64_ARCH,
    archive_formats: TARBALLS,
};

impl ToolSpec {
    #[must_use]
    pub fn os_name(&self, os: Os) -> &'static str {
        self.os_replacements
            .iter()
            .find_map(|(o, name)| (*o == os).then_some(*name))
            .unwrap_or_else(|| os.as_str())
    }

    #[must_use]
    pub fn arch_name(&self, arch: Arch) -> &'static str {
        self.arch_replacements
            .iter()
            .find_map(|(a, name)| (*a == arch).then_some(*name))
            .unwrap_or_else(|| arch.as_str())
    }

    #[must_use]
    pub fn archive_format(&self, os: Os) -> ArchiveFormat {
        self.archive_formats
            .iter()
            .find_map(|(o, format)| (*o == os).then_some(*format))
            .unwrap_or_default()
    }

    /// Builds the download URL of the release archive.
    ///
    /// # Errors
    /// Will error if the URL template is malformed.
    pub fn download_url(
        &self,
        version: &str,
        platform: HostPlatform,
    ) -> Result<String, InstallError> {
        UrlTemplate::new(self.url_template).render(
            &TemplateVars::builder()
                .version(version)
                .os(self.os_name(platform.os))
                .arch(self.arch_name(platform.arch))
                .ext(self.archive_format(platform.os).extension())
                .build(),
        )
    }

    /// The file name the binary is installed under.
    #[must_use]
    pub fn target_file_name(&self, platform: HostPlatform) -> String {
        platform.exe_name(self.name)
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Hash)]
pub enum Tool {
    Ko,
    Goreleaser,
}

impl Tool {
    #[must_use]
    pub const fn spec(self) -> &'static ToolSpec {
        match self {
            Self::Ko => &KO_SPEC,
            Self::Goreleaser => &GORELEASER_SPEC,
        }
    }
}

impl std::fmt::Display for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.spec().name)
    }
}

/// Makes sure `version` of `tool` is installed for the running
/// platform, downloading it into the install dir if needed.
///
/// Returns the path to the binary.
///
/// # Errors
/// Will error if the platform is unsupported, the version probe
/// can't run, or the install fails.
pub fn ensure_installed(tool: Tool, version: &str, install_dir: Option<&Path>) -> Result<PathBuf> {
    trace!("ensure_installed({tool}, {version}, {install_dir:?})");

    let install_dir = resolve_install_dir(install_dir)?;
    Installer::builder()
        .tool(tool)
        .version(version)
        .platform(HostPlatform::detect()?)
        .install_dir(install_dir)
        .build()
        .ensure()
}
