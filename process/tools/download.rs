use std::{fmt::Debug, io::Write, time::Duration};

use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, trace};
use relkit_utils::constants::USER_AGENT;

use super::InstallError;
use crate::logging::Logger;

/// Fetches release archives.
pub trait Downloader: Debug {
    /// Streams the body at `url` into `dest`, returning
    /// the number of bytes written.
    ///
    /// # Errors
    /// Will error if the url is unreachable, the response status
    /// is not a success, or the body can't be read.
    fn fetch(&self, url: &str, dest: &mut dyn Write) -> Result<u64, InstallError>;
}

/// Downloads over HTTP(S) with a progress bar.
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpDownloader;

impl HttpDownloader {
    const TIMEOUT: Duration = Duration::from_secs(300);
}

impl Downloader for HttpDownloader {
    fn fetch(&self, url: &str, dest: &mut dyn Write) -> Result<u64, InstallError> {
        trace!("HttpDownloader::fetch({url})");

        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Self::TIMEOUT)
            .build()
            .map_err(|e| InstallError::Download(url.to_string(), e))?;

        let response = client
            .get(url)
            .send()
            .map_err(|e| InstallError::Download(url.to_string(), e))?;

        let status = response.status();
        debug!("GET {url} -> {status}");
        if !status.is_success() {
            return Err(InstallError::DownloadStatus(url.to_string(), status));
        }

        let progress = Logger::multi_progress().add(
            response
                .content_length()
                .map_or_else(ProgressBar::new_spinner, ProgressBar::new),
        );
        if let Ok(style) =
            ProgressStyle::with_template("{msg} [{bar:30}] {bytes}/{total_bytes} ({bytes_per_sec})")
        {
            progress.set_style(style.progress_chars("=> "));
        }
        progress.set_message(format!(
            "Downloading {}",
            url.rsplit('/').next().unwrap_or(url)
        ));

        let written = std::io::copy(&mut progress.wrap_read(response), dest)
            .map_err(|e| InstallError::DownloadBody(url.to_string(), e));

        progress.finish_and_clear();
        Logger::multi_progress().remove(&progress);

        written
    }
}
