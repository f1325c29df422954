use std::str::FromStr;

use clap::ValueEnum;
use miette::{bail, Result};

/// Operating systems a tool can be installed for.
///
/// Names follow the vocabulary release pages use
/// before any per-tool remapping.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Hash)]
pub enum Os {
    #[value(name = "linux")]
    Linux,

    #[value(name = "darwin")]
    Darwin,

    #[value(name = "windows")]
    Windows,
}

impl Os {
    /// The os of the running binary.
    ///
    /// # Errors
    /// Will error if the os is not one that release
    /// archives are published for.
    pub fn current() -> Result<Self> {
        std::env::consts::OS.parse()
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match *self {
            Self::Linux => "linux",
            Self::Darwin => "darwin",
            Self::Windows => "windows",
        }
    }

    /// Suffix executables carry on this os.
    #[must_use]
    pub const fn exe_suffix(&self) -> &'static str {
        match *self {
            Self::Windows => ".exe",
            Self::Linux | Self::Darwin => "",
        }
    }
}

impl std::fmt::Display for Os {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Os {
    type Err = miette::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "linux" => Self::Linux,
            "darwin" | "macos" => Self::Darwin,
            "windows" => Self::Windows,
            os => bail!("Operating system {os} unsupported"),
        })
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Hash)]
pub enum Arch {
    #[value(name = "amd64")]
    Amd64,

    #[value(name = "arm64")]
    Arm64,

    #[value(name = "arm")]
    Arm,

    #[value(name = "386")]
    I386,

    #[value(name = "ppc64le")]
    Ppc64le,

    #[value(name = "s390x")]
    S390x,

    #[value(name = "riscv64")]
    Riscv64,
}

impl Arch {
    /// The architecture of the running binary.
    ///
    /// # Errors
    /// Will error if the architecture is not one that
    /// release archives are published for.
    pub fn current() -> Result<Self> {
        Ok(match std::env::consts::ARCH {
            "x86_64" => Self::Amd64,
            "aarch64" => Self::Arm64,
            "arm" => Self::Arm,
            "x86" => Self::I386,
            "powerpc64" if cfg!(target_endian = "little") => Self::Ppc64le,
            "s390x" => Self::S390x,
            "riscv64" => Self::Riscv64,
            arch => bail!("Arch {arch} is unsupported"),
        })
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match *self {
            Self::Amd64 => "amd64",
            Self::Arm64 => "arm64",
            Self::Arm => "arm",
            Self::I386 => "386",
            Self::Ppc64le => "ppc64le",
            Self::S390x => "s390x",
            Self::Riscv64 => "riscv64",
        }
    }
}

impl std::fmt::Display for Arch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Arch {
    type Err = miette::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "amd64" | "x86_64" => Self::Amd64,
            "arm64" | "aarch64" => Self::Arm64,
            "arm" => Self::Arm,
            "386" | "x86" => Self::I386,
            "ppc64le" => Self::Ppc64le,
            "s390x" => Self::S390x,
            "riscv64" => Self::Riscv64,
            arch => bail!("Arch {arch} is unsupported"),
        })
    }
}

/// The os/arch pair a tool gets downloaded for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HostPlatform {
    pub os: Os,
    pub arch: Arch,
}

impl HostPlatform {
    #[must_use]
    pub const fn new(os: Os, arch: Arch) -> Self {
        Self { os, arch }
    }

    /// Detects the platform of the running binary.
    ///
    /// # Errors
    /// Will error if either the os or the arch is unsupported.
    pub fn detect() -> Result<Self> {
        Ok(Self::new(Os::current()?, Arch::current()?))
    }

    /// Detects the platform, replacing whichever parts were
    /// given explicitly.
    ///
    /// # Errors
    /// Will error if a part that needs detecting is unsupported.
    pub fn detect_with(os: Option<Os>, arch: Option<Arch>) -> Result<Self> {
        Ok(Self::new(
            match os {
                Some(os) => os,
                None => Os::current()?,
            },
            match arch {
                Some(arch) => arch,
                None => Arch::current()?,
            },
        ))
    }

    /// Appends the os specific executable suffix to `name`.
    #[must_use]
    pub fn exe_name(&self, name: &str) -> String {
        format!("{name}{}", self.os.exe_suffix())
    }
}

impl std::fmt::Display for HostPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}
