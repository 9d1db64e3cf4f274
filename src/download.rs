//! Streaming asset download with progress reporting

use std::path::Path;
use std::time::Duration;

use futures::StreamExt;
use log::{debug, info};
use tokio::io::AsyncWriteExt;
use tokio::time::timeout;

use crate::error::LauncherError;
use crate::progress::ProgressSender;

// Abort when the stream stalls; a slow connection keeps making progress,
// a dead one trips this.
const INACTIVITY_TIMEOUT: Duration = Duration::from_secs(300);

/// Stream `url` into `dest`, emitting a download-progress event per chunk.
///
/// `dest` is always a freshly created temp path owned by the caller, so a
/// partial file left behind by a failure can never be confused with a
/// completed download. Any transport or write failure is a `Download` error.
pub async fn fetch(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
    progress: &ProgressSender,
) -> Result<(), LauncherError> {
    info!("downloading {} -> {}", url, dest.display());

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| LauncherError::Download(e.to_string()))?;

    if !response.status().is_success() {
        return Err(LauncherError::Download(format!(
            "HTTP {} from {}",
            response.status(),
            url
        )));
    }

    let total = response.content_length().unwrap_or(0);
    debug!("asset size: {} bytes", total);

    let mut file = tokio::fs::File::create(dest)
        .await
        .map_err(|e| LauncherError::Download(e.to_string()))?;

    let mut downloaded: u64 = 0;
    let mut stream = response.bytes_stream();

    loop {
        let chunk = match timeout(INACTIVITY_TIMEOUT, stream.next()).await {
            Ok(Some(Ok(chunk))) => chunk,
            Ok(Some(Err(e))) => return Err(LauncherError::Download(e.to_string())),
            Ok(None) => break,
            Err(_) => {
                return Err(LauncherError::Download(format!(
                    "no data for {}s after {}/{} bytes",
                    INACTIVITY_TIMEOUT.as_secs(),
                    downloaded,
                    total
                )));
            }
        };

        file.write_all(&chunk)
            .await
            .map_err(|e| LauncherError::Download(e.to_string()))?;
        downloaded += chunk.len() as u64;
        progress.download_progress(downloaded, total);
    }

    file.flush()
        .await
        .map_err(|e| LauncherError::Download(e.to_string()))?;

    info!("download complete: {} bytes", downloaded);
    progress.download_finished().await;
    Ok(())
}
