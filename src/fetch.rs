//! Retrying artifact downloads.
//!
//! The fetcher performs a deadline-bounded, indefinitely-retried HTTP GET
//! of one artifact's release asset. The on-disk filename comes from the
//! `Content-Disposition` response header, the body is buffered fully and
//! written atomically, and the file only counts as downloaded once its
//! SHA-256 digest matches the manifest.
//!
//! There is no retry-count cap; only the caller-supplied [`Deadline`]
//! bounds the loop. Transient failures (transport errors, non-2xx status,
//! unusable filename header, checksum mismatch) all retry under
//! exponential backoff.

use crate::checksum;
use crate::deadline::Deadline;
use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// First backoff delay.
const BACKOFF_START: Duration = Duration::from_secs(2);
/// Ceiling on the delay between attempts.
const BACKOFF_CAP: Duration = Duration::from_secs(600);

/// Exponential backoff schedule: 2s, 4s, 8s, ... capped at 10 minutes.
#[derive(Debug)]
pub struct Backoff {
    next: Duration,
}

impl Backoff {
    pub fn new() -> Self {
        Self {
            next: BACKOFF_START,
        }
    }

    /// The delay to wait before the next attempt. Monotonically
    /// non-decreasing and bounded by [`BACKOFF_CAP`].
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = (self.next * 2).min(BACKOFF_CAP);
        delay
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}

/// Downloads release assets over HTTP(S).
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .user_agent(concat!("toolshed/", env!("CARGO_PKG_VERSION")))
                .build()
                .expect("Failed to build HTTP client"),
        }
    }

    /// Fetch `url` into `out_dir`, retrying until `deadline`.
    ///
    /// Returns the absolute path of the verified file, or `None` if the
    /// deadline expired first. A partially-written file may be left in
    /// `out_dir` on cancellation; the working directory is ephemeral.
    pub fn fetch(
        &self,
        name: &str,
        url: &str,
        sha256: &str,
        out_dir: &Path,
        deadline: Deadline,
    ) -> Option<PathBuf> {
        let mut backoff = Backoff::new();
        loop {
            if deadline.expired() {
                debug!(artifact = name, "download cancelled before attempt");
                return None;
            }
            match self.attempt(url, sha256, out_dir, deadline) {
                Ok(path) => {
                    info!(artifact = name, file = %path.display(), "downloaded");
                    return Some(path);
                }
                Err(err) => {
                    let delay = backoff.next_delay();
                    warn!(
                        artifact = name,
                        error = %err,
                        retry_delay_s = delay.as_secs(),
                        "retrying download"
                    );
                    if !deadline.sleep(delay) {
                        debug!(artifact = name, "download cancelled during backoff");
                        return None;
                    }
                }
            }
        }
    }

    fn attempt(
        &self,
        url: &str,
        sha256: &str,
        out_dir: &Path,
        deadline: Deadline,
    ) -> Result<PathBuf> {
        let response = self
            .client
            .get(url)
            .timeout(deadline.remaining().max(Duration::from_millis(1)))
            .send()
            .context("request failed")?;

        let status = response.status();
        if !status.is_success() {
            bail!("HTTP {status}");
        }

        let filename = response
            .headers()
            .get(reqwest::header::CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(attachment_filename)
            .context("unusable Content-Disposition header")?;

        // Buffer the whole body, then write via a rename so no partially
        // written file can ever pass the checksum.
        let body = response.bytes().context("reading response body")?;
        let path = out_dir.join(&filename);
        let partial = out_dir.join(format!(".{filename}.part"));
        fs::write(&partial, &body)
            .with_context(|| format!("writing {}", partial.display()))?;
        fs::rename(&partial, &path)
            .with_context(|| format!("renaming into {}", path.display()))?;

        let actual = checksum::sha256_file(&path)?;
        if actual != sha256 {
            bail!("checksum mismatch: expected {sha256}, got {actual}");
        }
        Ok(path)
    }
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract the filename from a `Content-Disposition` header value.
///
/// Accepts `attachment; filename="X"` and the unquoted form. Anything
/// else — missing disposition type, a non-`filename` key, RFC 5987
/// `filename*=` syntax — yields `None`. Filenames that resolve outside
/// the output directory are rejected too.
pub fn attachment_filename(header: &str) -> Option<String> {
    let mut parts = header.splitn(2, ';');
    if parts.next()?.trim() != "attachment" {
        return None;
    }
    let mut key_val = parts.next()?.splitn(2, '=');
    if key_val.next()?.trim() != "filename" {
        return None;
    }
    let name = key_val
        .next()?
        .trim()
        .trim_matches('"')
        .trim()
        .to_string();
    if name.is_empty() {
        return None;
    }
    // A bare base name only; no path separators, no parent traversal.
    if Path::new(&name).file_name()?.to_str()? != name {
        return None;
    }
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let mut backoff = Backoff::new();
        let mut delays = Vec::new();
        for _ in 0..12 {
            delays.push(backoff.next_delay());
        }
        assert_eq!(delays[0], Duration::from_secs(2));
        assert_eq!(delays[1], Duration::from_secs(4));
        assert_eq!(delays[2], Duration::from_secs(8));
        for pair in delays.windows(2) {
            assert!(pair[1] >= pair[0], "delays must be non-decreasing");
            assert!(pair[1] <= Duration::from_secs(600));
        }
        assert_eq!(*delays.last().unwrap(), Duration::from_secs(600));
    }

    #[test]
    fn attachment_filename_quoted() {
        assert_eq!(
            attachment_filename(r#"attachment; filename="tool.tar.gz""#),
            Some("tool.tar.gz".to_string())
        );
    }

    #[test]
    fn attachment_filename_unquoted() {
        assert_eq!(
            attachment_filename("attachment; filename=tool.zip"),
            Some("tool.zip".to_string())
        );
    }

    #[test]
    fn attachment_filename_tolerates_spacing() {
        assert_eq!(
            attachment_filename(r#"attachment;  filename = "tool.tar.xz" "#),
            Some("tool.tar.xz".to_string())
        );
    }

    #[test]
    fn inline_disposition_is_rejected() {
        assert_eq!(attachment_filename(r#"inline; filename="x.zip""#), None);
    }

    #[test]
    fn missing_filename_key_is_rejected() {
        assert_eq!(attachment_filename("attachment"), None);
        assert_eq!(attachment_filename("attachment; name=\"x\""), None);
    }

    #[test]
    fn rfc5987_extended_syntax_is_treated_as_absent() {
        assert_eq!(
            attachment_filename("attachment; filename*=UTF-8''t%C3%B6ol.zip"),
            None
        );
    }

    #[test]
    fn empty_filename_is_rejected() {
        assert_eq!(attachment_filename(r#"attachment; filename="""#), None);
    }

    #[test]
    fn path_components_in_filename_are_rejected() {
        assert_eq!(
            attachment_filename(r#"attachment; filename="../evil.tar.gz""#),
            None
        );
        assert_eq!(
            attachment_filename(r#"attachment; filename="/etc/passwd""#),
            None
        );
    }
}
