use std::{
    io::{self, Read, Seek, Write},
    path::Path,
};

use flate2::read::GzDecoder;
use log::trace;

use super::InstallError;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    #[default]
    TarGz,
    Zip,
}

impl ArchiveFormat {
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::TarGz => ".tar.gz",
            Self::Zip => ".zip",
        }
    }

    /// Copies the file named `binary` out of `archive` into `dest`.
    ///
    /// The binary is matched by file name at any depth
    /// inside the archive.
    ///
    /// # Errors
    /// Will error if the archive is malformed or doesn't contain `binary`.
    pub fn extract_binary<R, W>(
        self,
        archive: R,
        binary: &str,
        dest: &mut W,
    ) -> Result<u64, InstallError>
    where
        R: Read + Seek,
        W: Write,
    {
        trace!("ArchiveFormat::extract_binary({self:?}, {binary})");

        match self {
            Self::TarGz => extract_tar_gz(archive, binary, dest),
            Self::Zip => extract_zip(archive, binary, dest),
        }
    }
}

fn file_name_matches(path: &Path, binary: &str) -> bool {
    path.file_name().is_some_and(|name| name == binary)
}

fn extract_tar_gz<R, W>(archive: R, binary: &str, dest: &mut W) -> Result<u64, InstallError>
where
    R: Read,
    W: Write,
{
    let extract_err = |e: io::Error| InstallError::Extract(binary.to_string(), e);
    let mut archive = tar::Archive::new(GzDecoder::new(archive));

    for entry in archive.entries().map_err(extract_err)? {
        let mut entry = entry.map_err(extract_err)?;

        if !entry.header().entry_type().is_file() {
            continue;
        }

        let matches = file_name_matches(&entry.path().map_err(extract_err)?, binary);
        if matches {
            return io::copy(&mut entry, dest).map_err(extract_err);
        }
    }

    Err(InstallError::MissingBinary(binary.to_string()))
}

fn extract_zip<R, W>(archive: R, binary: &str, dest: &mut W) -> Result<u64, InstallError>
where
    R: Read + Seek,
    W: Write,
{
    let extract_err = |e: io::Error| InstallError::Extract(binary.to_string(), e);
    let mut archive = zip::ZipArchive::new(archive).map_err(|e| extract_err(io::Error::other(e)))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| extract_err(io::Error::other(e)))?;

        if entry.is_file() && file_name_matches(Path::new(entry.name()), binary) {
            return io::copy(&mut entry, dest).map_err(extract_err);
        }
    }

    Err(InstallError::MissingBinary(binary.to_string()))
}
