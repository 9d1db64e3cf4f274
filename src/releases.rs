//! Release index client for the upstream GitHub repository

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::LauncherError;
use crate::progress::ProgressSender;

/// Release index of the managed engine.
pub const RELEASE_INDEX_URL: &str = "https://api.github.com/repos/godotengine/godot/releases";

const USER_AGENT: &str = concat!("godot-launcher/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// One published release: display name plus the API URL that lists its assets.
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct ReleaseAssets {
    assets: Vec<Asset>,
}

#[derive(Debug, Deserialize)]
struct Asset {
    name: String,
    browser_download_url: String,
}

/// Anything that can enumerate remote releases.
///
/// The catalog takes this as a seam so refresh logic is testable without a
/// network; `ReleaseClient` is the production implementation.
pub trait ReleaseSource {
    fn releases(&self) -> impl Future<Output = Result<Vec<Release>, LauncherError>> + Send;
}

/// Asset-level operations of the release host: listing one release's files
/// and streaming one of them to disk.
///
/// Kept separate from `ReleaseSource` so the installer can be driven end to
/// end in tests without faking the whole index.
pub trait AssetSource {
    /// Asset list of one release: `filename -> download URL`.
    fn asset_listing(
        &self,
        release_url: &str,
    ) -> impl Future<Output = Result<BTreeMap<String, String>, LauncherError>> + Send;

    /// Stream the asset at `url` into `dest`, reporting through `progress`.
    fn fetch_asset(
        &self,
        url: &str,
        dest: &Path,
        progress: &ProgressSender,
    ) -> impl Future<Output = Result<(), LauncherError>> + Send;
}

/// HTTP client for the release index. Pure queries, no retry policy.
pub struct ReleaseClient {
    client: reqwest::Client,
    download_client: reqwest::Client,
    index_url: String,
}

impl ReleaseClient {
    pub fn new() -> Result<Self, LauncherError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| LauncherError::Network(e.to_string()))?;
        // Asset streams can legitimately run for minutes, so this client
        // bounds connecting only; the fetcher guards stalls itself.
        let download_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| LauncherError::Network(e.to_string()))?;
        Ok(Self {
            client,
            download_client,
            index_url: RELEASE_INDEX_URL.to_string(),
        })
    }

}

impl ReleaseSource for ReleaseClient {
    async fn releases(&self) -> Result<Vec<Release>, LauncherError> {
        let response = self
            .client
            .get(&self.index_url)
            .header("Accept", "application/vnd.github.v3+json")
            .send()
            .await
            .map_err(|e| LauncherError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(LauncherError::Network(format!(
                "HTTP {} from release index",
                response.status()
            )));
        }

        response
            .json::<Vec<Release>>()
            .await
            .map_err(|e| LauncherError::Api(e.to_string()))
    }
}

impl AssetSource for ReleaseClient {
    async fn asset_listing(
        &self,
        release_url: &str,
    ) -> Result<BTreeMap<String, String>, LauncherError> {
        let response = self
            .client
            .get(release_url)
            .send()
            .await
            .map_err(|e| LauncherError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(LauncherError::Network(format!(
                "HTTP {} from {}",
                response.status(),
                release_url
            )));
        }

        let listing: ReleaseAssets = response
            .json()
            .await
            .map_err(|e| LauncherError::Api(e.to_string()))?;

        Ok(listing
            .assets
            .into_iter()
            .map(|a| (a.name, a.browser_download_url))
            .collect())
    }

    async fn fetch_asset(
        &self,
        url: &str,
        dest: &Path,
        progress: &ProgressSender,
    ) -> Result<(), LauncherError> {
        crate::download::fetch(&self.download_client, url, dest, progress).await
    }
}
