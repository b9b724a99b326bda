//! YouTube Data API v3 client: request URLs, response parsing, error taxonomy.

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use futures::future::BoxFuture;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::constants::constants;
use crate::results::unescape_html;

// --- Errors ---

/// Everything that can go wrong between "the user asked for a page" and "we have items".
///
/// The `Display` text of each variant is the message shown in the error panel.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
  #[error("YouTube API key required. Set YOUTUBE_API_KEY, pass --api-key, or add api_key to prefs.toml.")]
  Configuration,

  #[error("Invalid API request. Please check your YouTube API key.")]
  BadRequest,

  #[error("API quota exceeded or invalid API key. Please check your YouTube API key and quota limits.")]
  QuotaOrAuth,

  #[error("HTTP error! status: {0}")]
  Http(u16),

  #[error("Failed to fetch videos. Please check your API key and try again.")]
  Transport(String),

  #[error("Unexpected response from the YouTube API.")]
  Parse(String),
}

impl From<reqwest::Error> for FetchError {
  fn from(err: reqwest::Error) -> Self {
    FetchError::Transport(err.to_string())
  }
}

/// Map an HTTP status onto the error taxonomy. 2xx is `Ok`.
pub fn classify_status(status: StatusCode) -> Result<(), FetchError> {
  if status.is_success() {
    return Ok(());
  }
  Err(match status.as_u16() {
    400 => FetchError::BadRequest,
    403 => FetchError::QuotaOrAuth,
    other => FetchError::Http(other),
  })
}

// --- API key ---

/// A key that passed the configuration check. Never logged.
#[derive(Clone)]
pub struct ApiKey(String);

impl ApiKey {
  /// Reject missing, placeholder, and implausibly short keys before any request is made.
  pub fn parse(raw: Option<&str>) -> Result<Self, FetchError> {
    let c = constants();
    let key = raw.map(str::trim).unwrap_or_default();
    if key.is_empty() || key == c.api_key_placeholder || key.len() < c.min_api_key_len {
      return Err(FetchError::Configuration);
    }
    Ok(Self(key.to_string()))
  }

  fn as_str(&self) -> &str {
    &self.0
  }
}

impl std::fmt::Debug for ApiKey {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str("ApiKey(***)")
  }
}

// --- Listings ---

/// Value of the search endpoint's `order` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SortOrder {
  #[default]
  Relevance,
  Date,
  ViewCount,
  Rating,
  Title,
}

impl SortOrder {
  pub const ALL: [SortOrder; 5] =
    [SortOrder::Relevance, SortOrder::Date, SortOrder::ViewCount, SortOrder::Rating, SortOrder::Title];

  pub fn as_param(self) -> &'static str {
    match self {
      SortOrder::Relevance => "relevance",
      SortOrder::Date => "date",
      SortOrder::ViewCount => "viewCount",
      SortOrder::Rating => "rating",
      SortOrder::Title => "title",
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      SortOrder::Relevance => "Relevance",
      SortOrder::Date => "Upload date",
      SortOrder::ViewCount => "View count",
      SortOrder::Rating => "Rating",
      SortOrder::Title => "Title",
    }
  }

  pub fn from_config(s: &str) -> Self {
    SortOrder::ALL.into_iter().find(|o| o.as_param().eq_ignore_ascii_case(s)).unwrap_or_default()
  }

  pub fn next(self) -> Self {
    let idx = SortOrder::ALL.iter().position(|o| *o == self).unwrap_or(0);
    SortOrder::ALL[(idx + 1) % SortOrder::ALL.len()]
  }
}

/// Which endpoint a search pages through. Captured when the search starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Listing {
  Search { query: String, order: SortOrder },
  /// A preset keyword search picked from the category list.
  Category { name: String, order: SortOrder },
  Trending { region: String },
}

impl Listing {
  /// The query label the controller tracks for this listing.
  pub fn query(&self) -> &str {
    match self {
      Listing::Search { query, .. } => query,
      Listing::Category { name, .. } => name,
      Listing::Trending { .. } => "trending",
    }
  }

  pub fn title(&self) -> String {
    match self {
      Listing::Search { query, .. } => format!("Search results for \"{}\"", query),
      Listing::Category { name, .. } => format!("{} Videos", capitalize(name)),
      Listing::Trending { .. } => "Trending Videos".to_string(),
    }
  }

  /// Keyword listings re-run under a new sort order; the chart ignores it.
  pub fn with_order(&self, order: SortOrder) -> Option<Listing> {
    match self {
      Listing::Search { query, .. } => Some(Listing::Search { query: query.clone(), order }),
      Listing::Category { name, .. } => Some(Listing::Category { name: name.clone(), order }),
      Listing::Trending { .. } => None,
    }
  }
}

fn capitalize(s: &str) -> String {
  let mut chars = s.chars();
  match chars.next() {
    Some(first) => first.to_uppercase().chain(chars).collect(),
    None => String::new(),
  }
}

/// Pre-parsed endpoint URLs plus the key appended to every request.
#[derive(Debug, Clone)]
pub struct ApiEndpoint {
  search_url: Url,
  videos_url: Url,
  api_key: ApiKey,
  page_size: u32,
}

impl ApiEndpoint {
  pub fn new(base_url: &str, api_key: ApiKey, page_size: u32) -> anyhow::Result<Self> {
    let base = base_url.trim_end_matches('/');
    Ok(Self {
      search_url: Url::parse(&format!("{}/search", base))?,
      videos_url: Url::parse(&format!("{}/videos", base))?,
      api_key,
      page_size,
    })
  }

  /// Build the request URL for one page of `listing`. `cursor` is the previous page's `nextPageToken`.
  pub fn page_url(&self, listing: &Listing, cursor: Option<&str>) -> Url {
    let page_size = self.page_size.to_string();
    let mut url = match listing {
      Listing::Search { .. } | Listing::Category { .. } => self.search_url.clone(),
      Listing::Trending { .. } => self.videos_url.clone(),
    };
    {
      let mut pairs = url.query_pairs_mut();
      match listing {
        Listing::Search { query, order } | Listing::Category { name: query, order } => {
          pairs
            .append_pair("part", "snippet")
            .append_pair("type", "video")
            .append_pair("q", query)
            .append_pair("order", order.as_param());
        }
        Listing::Trending { region } => {
          pairs
            .append_pair("part", "snippet,statistics")
            .append_pair("chart", "mostPopular")
            .append_pair("regionCode", region);
        }
      }
      pairs.append_pair("maxResults", &page_size);
      if let Some(token) = cursor.filter(|t| !t.is_empty()) {
        pairs.append_pair("pageToken", token);
      }
      pairs.append_pair("key", self.api_key.as_str());
    }
    url
  }
}

// --- Results ---

/// One video from a search or chart page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultItem {
  pub id: String,
  pub title: String,
  pub thumbnail_url: Option<String>,
  pub channel_name: String,
  pub published_at: Option<DateTime<Utc>>,
  pub view_count: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageResponse {
  pub items: Vec<ResultItem>,
  /// `None` ends pagination for this listing.
  pub next_cursor: Option<String>,
  pub total_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
  Page(PageResponse),
  /// No playable items on this page. The cursor still decides whether more pages exist.
  NoResults { total_count: u64, next_cursor: Option<String> },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPage {
  items: Option<Vec<RawItem>>,
  next_page_token: Option<String>,
  page_info: Option<RawPageInfo>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPageInfo {
  total_results: Option<u64>,
}

#[derive(Deserialize)]
struct RawItem {
  id: RawId,
  snippet: Option<RawSnippet>,
  statistics: Option<RawStatistics>,
}

/// `videos` returns a bare id string; `search` returns `{ "kind": ..., "videoId": ... }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
  Plain(String),
  Search {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
  },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSnippet {
  /// Snippet text arrives entity-encoded.
  #[serde(default)]
  title: String,
  #[serde(default)]
  channel_title: String,
  published_at: Option<String>,
  thumbnails: Option<RawThumbnails>,
}

#[derive(Deserialize)]
struct RawThumbnails {
  high: Option<RawThumbnail>,
  medium: Option<RawThumbnail>,
  default: Option<RawThumbnail>,
}

#[derive(Deserialize)]
struct RawThumbnail {
  url: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStatistics {
  view_count: Option<String>,
}

impl RawItem {
  fn into_item(self) -> Option<ResultItem> {
    let id = match self.id {
      RawId::Plain(id) => Some(id),
      RawId::Search { video_id } => video_id,
    }
    .filter(|id| !id.is_empty())?;
    let snippet = self.snippet?;
    let thumbnail_url =
      snippet.thumbnails.and_then(|t| t.high.or(t.medium).or(t.default)).map(|t| t.url).filter(|u| !u.is_empty());
    let published_at = snippet
      .published_at
      .as_deref()
      .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
      .map(|d| d.with_timezone(&Utc));
    let view_count = self.statistics.and_then(|s| s.view_count).and_then(|v| v.trim().parse().ok());
    Some(ResultItem {
      id,
      title: unescape_html(&snippet.title),
      thumbnail_url,
      channel_name: unescape_html(&snippet.channel_title),
      published_at,
      view_count,
    })
  }
}

/// Parse a successful response body. Missing or empty `items` is `NoResults`, not an error.
pub fn parse_page(body: &str) -> Result<FetchOutcome, FetchError> {
  let raw: RawPage = serde_json::from_str(body).map_err(|e| FetchError::Parse(e.to_string()))?;
  let total_count = raw.page_info.and_then(|p| p.total_results).unwrap_or(0);
  let next_cursor = raw.next_page_token.filter(|t| !t.is_empty());
  let items: Vec<ResultItem> = raw.items.unwrap_or_default().into_iter().filter_map(RawItem::into_item).collect();
  if items.is_empty() {
    return Ok(FetchOutcome::NoResults { total_count, next_cursor });
  }
  Ok(FetchOutcome::Page(PageResponse { items, next_cursor, total_count }))
}

// --- Fetching ---

/// One GET per page. The seam the query controller drives.
pub trait PageFetcher: Send + Sync {
  fn fetch_page(&self, url: Url) -> BoxFuture<'static, Result<FetchOutcome, FetchError>>;
}

#[derive(Clone)]
pub struct YouTubeClient {
  http: Client,
}

impl YouTubeClient {
  pub fn new() -> anyhow::Result<Self> {
    let http = Client::builder()
      .timeout(Duration::from_secs(constants().request_timeout_secs))
      .user_agent(concat!("vidstream/", env!("CARGO_PKG_VERSION")))
      .build()?;
    Ok(Self { http })
  }
}

impl PageFetcher for YouTubeClient {
  fn fetch_page(&self, url: Url) -> BoxFuture<'static, Result<FetchOutcome, FetchError>> {
    let http = self.http.clone();
    Box::pin(async move {
      let endpoint = url.path().to_string();
      debug!(endpoint = %endpoint, "fetching page");
      let response = http.get(url).send().await.map_err(|e| {
        warn!(endpoint = %endpoint, err = %e, "request failed");
        FetchError::from(e)
      })?;
      let status = response.status();
      if let Err(e) = classify_status(status) {
        warn!(endpoint = %endpoint, status = status.as_u16(), "API returned error status");
        return Err(e);
      }
      let body = response.text().await?;
      parse_page(&body)
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn endpoint() -> ApiEndpoint {
    let key = ApiKey::parse(Some("AIzaTestKey12345")).unwrap();
    ApiEndpoint::new("https://www.googleapis.com/youtube/v3", key, 24).unwrap()
  }

  fn query_value(url: &Url, name: &str) -> Option<String> {
    url.query_pairs().find(|(k, _)| k == name).map(|(_, v)| v.into_owned())
  }

  // --- ApiKey ---

  #[test]
  fn api_key_rejects_missing_and_placeholder() {
    assert_eq!(ApiKey::parse(None).unwrap_err(), FetchError::Configuration);
    assert_eq!(ApiKey::parse(Some("   ")).unwrap_err(), FetchError::Configuration);
    assert_eq!(ApiKey::parse(Some("YOUR_YOUTUBE_API_KEY_HERE")).unwrap_err(), FetchError::Configuration);
    assert_eq!(ApiKey::parse(Some("short")).unwrap_err(), FetchError::Configuration);
  }

  #[test]
  fn api_key_debug_is_redacted() {
    let key = ApiKey::parse(Some("AIzaSecretKey999")).unwrap();
    assert!(!format!("{:?}", key).contains("Secret"));
  }

  // --- classify_status ---

  #[test]
  fn classify_status_taxonomy() {
    assert_eq!(classify_status(StatusCode::OK), Ok(()));
    assert_eq!(classify_status(StatusCode::BAD_REQUEST), Err(FetchError::BadRequest));
    assert_eq!(classify_status(StatusCode::FORBIDDEN), Err(FetchError::QuotaOrAuth));
    assert_eq!(classify_status(StatusCode::INTERNAL_SERVER_ERROR), Err(FetchError::Http(500)));
    assert_eq!(classify_status(StatusCode::NOT_FOUND), Err(FetchError::Http(404)));
  }

  #[test]
  fn error_messages_match_panel_text() {
    assert_eq!(FetchError::Http(502).to_string(), "HTTP error! status: 502");
    assert!(FetchError::QuotaOrAuth.to_string().starts_with("API quota exceeded"));
    assert!(FetchError::Transport("dns".into()).to_string().starts_with("Failed to fetch"));
  }

  // --- SortOrder ---

  #[test]
  fn sort_order_from_config() {
    assert_eq!(SortOrder::from_config("viewcount"), SortOrder::ViewCount);
    assert_eq!(SortOrder::from_config("DATE"), SortOrder::Date);
    assert_eq!(SortOrder::from_config("bogus"), SortOrder::Relevance);
  }

  #[test]
  fn sort_order_cycles() {
    assert_eq!(SortOrder::Relevance.next(), SortOrder::Date);
    assert_eq!(SortOrder::Title.next(), SortOrder::Relevance);
  }

  // --- page_url ---

  #[test]
  fn search_url_encodes_query_and_order() {
    let listing = Listing::Search { query: "cats & dogs".to_string(), order: SortOrder::ViewCount };
    let url = endpoint().page_url(&listing, None);
    assert_eq!(url.path(), "/youtube/v3/search");
    assert_eq!(query_value(&url, "q").as_deref(), Some("cats & dogs"));
    assert_eq!(query_value(&url, "order").as_deref(), Some("viewCount"));
    assert_eq!(query_value(&url, "maxResults").as_deref(), Some("24"));
    assert_eq!(query_value(&url, "type").as_deref(), Some("video"));
    assert_eq!(query_value(&url, "pageToken"), None);
    assert!(!url.as_str().contains("cats & dogs"));
  }

  #[test]
  fn search_url_carries_cursor() {
    let listing = Listing::Search { query: "cats".to_string(), order: SortOrder::Relevance };
    let url = endpoint().page_url(&listing, Some("CBgQAA"));
    assert_eq!(query_value(&url, "pageToken").as_deref(), Some("CBgQAA"));
  }

  #[test]
  fn empty_cursor_is_omitted() {
    let listing = Listing::Search { query: "cats".to_string(), order: SortOrder::Relevance };
    let url = endpoint().page_url(&listing, Some(""));
    assert_eq!(query_value(&url, "pageToken"), None);
  }

  #[test]
  fn category_url_is_a_keyword_search() {
    let listing = Listing::Category { name: "gaming".to_string(), order: SortOrder::Date };
    let url = endpoint().page_url(&listing, None);
    assert_eq!(url.path(), "/youtube/v3/search");
    assert_eq!(query_value(&url, "q").as_deref(), Some("gaming"));
    assert_eq!(query_value(&url, "order").as_deref(), Some("date"));
    assert_eq!(listing.title(), "Gaming Videos");
    assert_eq!(listing.query(), "gaming");
  }

  #[test]
  fn only_keyword_listings_take_a_new_order() {
    let search = Listing::Search { query: "cats".to_string(), order: SortOrder::Relevance };
    assert_eq!(
      search.with_order(SortOrder::Rating),
      Some(Listing::Search { query: "cats".to_string(), order: SortOrder::Rating })
    );
    assert_eq!(Listing::Trending { region: "US".to_string() }.with_order(SortOrder::Rating), None);
  }

  #[test]
  fn trending_url_uses_chart_endpoint() {
    let listing = Listing::Trending { region: "GB".to_string() };
    let url = endpoint().page_url(&listing, None);
    assert_eq!(url.path(), "/youtube/v3/videos");
    assert_eq!(query_value(&url, "chart").as_deref(), Some("mostPopular"));
    assert_eq!(query_value(&url, "regionCode").as_deref(), Some("GB"));
    assert_eq!(query_value(&url, "part").as_deref(), Some("snippet,statistics"));
    assert_eq!(query_value(&url, "q"), None);
  }

  // --- parse_page ---

  #[test]
  fn parse_search_page() {
    let body = r#"{
      "nextPageToken": "CBgQAA",
      "pageInfo": { "totalResults": 1000000, "resultsPerPage": 24 },
      "items": [
        {
          "id": { "kind": "youtube#video", "videoId": "abc123" },
          "snippet": {
            "title": "Cats <3",
            "channelTitle": "Cat TV",
            "publishedAt": "2024-05-01T12:00:00Z",
            "thumbnails": { "medium": { "url": "https://i.ytimg.com/vi/abc123/mqdefault.jpg" } }
          }
        }
      ]
    }"#;
    let FetchOutcome::Page(page) = parse_page(body).unwrap() else { panic!("expected page") };
    assert_eq!(page.next_cursor.as_deref(), Some("CBgQAA"));
    assert_eq!(page.total_count, 1_000_000);
    assert_eq!(page.items.len(), 1);
    let item = &page.items[0];
    assert_eq!(item.id, "abc123");
    assert_eq!(item.title, "Cats <3");
    assert_eq!(item.channel_name, "Cat TV");
    assert_eq!(item.thumbnail_url.as_deref(), Some("https://i.ytimg.com/vi/abc123/mqdefault.jpg"));
    assert!(item.published_at.is_some());
    assert_eq!(item.view_count, None);
  }

  #[test]
  fn parse_trending_page_with_statistics() {
    let body = r#"{
      "items": [
        {
          "id": "xyz789",
          "snippet": {
            "title": "Top video",
            "channelTitle": "Someone",
            "publishedAt": "2024-05-01T12:00:00Z",
            "thumbnails": {
              "high": { "url": "https://i.ytimg.com/vi/xyz789/hqdefault.jpg" },
              "medium": { "url": "https://i.ytimg.com/vi/xyz789/mqdefault.jpg" }
            }
          },
          "statistics": { "viewCount": "1234567" }
        }
      ]
    }"#;
    let FetchOutcome::Page(page) = parse_page(body).unwrap() else { panic!("expected page") };
    assert_eq!(page.next_cursor, None);
    assert_eq!(page.total_count, 0);
    assert_eq!(page.items[0].id, "xyz789");
    assert_eq!(page.items[0].view_count, Some(1_234_567));
    assert_eq!(page.items[0].thumbnail_url.as_deref(), Some("https://i.ytimg.com/vi/xyz789/hqdefault.jpg"));
  }

  #[test]
  fn parse_missing_items_is_no_results() {
    let none = FetchOutcome::NoResults { total_count: 0, next_cursor: None };
    assert_eq!(parse_page(r#"{"pageInfo":{"totalResults":0}}"#).unwrap(), none);
    assert_eq!(parse_page(r#"{"items":[]}"#).unwrap(), none);
  }

  #[test]
  fn parse_skips_non_video_entries() {
    let body = r#"{"items":[{"id":{"kind":"youtube#channel","channelId":"UC1"},"snippet":{"title":"A channel"}}]}"#;
    assert_eq!(parse_page(body).unwrap(), FetchOutcome::NoResults { total_count: 0, next_cursor: None });
  }

  #[test]
  fn parse_empty_page_keeps_next_token() {
    let body = r#"{"nextPageToken":"N2","pageInfo":{"totalResults":500},"items":[]}"#;
    assert_eq!(
      parse_page(body).unwrap(),
      FetchOutcome::NoResults { total_count: 500, next_cursor: Some("N2".to_string()) }
    );
  }

  #[test]
  fn parse_empty_next_token_ends_pagination() {
    let body = r#"{"nextPageToken":"","items":[{"id":"a1","snippet":{"title":"t","channelTitle":"c"}}]}"#;
    let FetchOutcome::Page(page) = parse_page(body).unwrap() else { panic!("expected page") };
    assert_eq!(page.next_cursor, None);
  }

  #[test]
  fn parse_decodes_snippet_entities() {
    let body = r#"{"items":[{"id":"a1","snippet":{"title":"Tom &amp; Jerry&#39;s &quot;best&quot;","channelTitle":"A&amp;B"}}]}"#;
    let FetchOutcome::Page(page) = parse_page(body).unwrap() else { panic!("expected page") };
    assert_eq!(page.items[0].title, "Tom & Jerry's \"best\"");
    assert_eq!(page.items[0].channel_name, "A&B");
  }

  #[test]
  fn parse_garbage_is_parse_error() {
    assert!(matches!(parse_page("<html>oops</html>"), Err(FetchError::Parse(_))));
  }
}
