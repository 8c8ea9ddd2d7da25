//! YouTube Data API playlist listing.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{Item, Page, PageFetcher};
use crate::error::{Error, Result};

const PLAYLIST_ITEMS_URL: &str = "https://www.googleapis.com/youtube/v3/playlistItems";

/// Upper bound the API accepts for `maxResults`.
const MAX_RESULTS_LIMIT: usize = 50;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemsResponse {
    next_page_token: Option<String>,
    #[serde(default)]
    items: Vec<PlaylistItem>,
}

#[derive(Deserialize)]
struct PlaylistItem {
    snippet: Snippet,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    title: String,
    resource_id: ResourceId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceId {
    video_id: Option<String>,
}

/// Pages through a playlist with the `playlistItems` endpoint.
pub struct YouTubePlaylist {
    http: reqwest::Client,
    api_key: String,
    playlist_id: String,
    page_size: usize,
}

impl YouTubePlaylist {
    /// Creates a playlist source requesting `page_size` items per page.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        api_key: impl Into<String>,
        playlist_id: impl Into<String>,
        page_size: usize,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            playlist_id: playlist_id.into(),
            page_size,
        })
    }
}

#[async_trait]
impl PageFetcher for YouTubePlaylist {
    async fn fetch_page(&self, index: usize, token: Option<&str>) -> Result<Page> {
        let max_results = self.page_size.clamp(1, MAX_RESULTS_LIMIT).to_string();
        let mut query = vec![
            ("part", "snippet"),
            ("playlistId", self.playlist_id.as_str()),
            ("maxResults", max_results.as_str()),
            ("key", self.api_key.as_str()),
        ];
        if let Some(token) = token {
            query.push(("pageToken", token));
        }

        log::info!("Fetching playlist {} page {index}", self.playlist_id);
        let response = self.http.get(PLAYLIST_ITEMS_URL).query(&query).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(Error::Catalog(format!("{status}: {}", body.trim())));
        }
        parse_page(index, &body)
    }
}

/// Parses a `playlistItems` response body into a page.
///
/// Entries without a video id are dropped.
fn parse_page(index: usize, body: &str) -> Result<Page> {
    let response: PlaylistItemsResponse = serde_json::from_str(body)?;
    let items = response
        .items
        .into_iter()
        .filter_map(|entry| {
            let Snippet { title, resource_id } = entry.snippet;
            resource_id.video_id.map(|id| Item { id, title })
        })
        .collect();

    Ok(Page {
        index,
        items,
        next_token: response.next_page_token.filter(|t| !t.is_empty()),
    })
}
