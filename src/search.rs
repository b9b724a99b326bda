//! Query controller: owns the search state and sequences page requests.
//!
//! At most one fetch is outstanding per controller. The in-flight flag is set
//! before the fetch task is spawned and cleared on every completion path,
//! including a fetch task that dies without reporting.

use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::youtube::{ApiEndpoint, FetchError, FetchOutcome, Listing, PageFetcher, PageResponse, SortOrder};

type FetchResult = Result<FetchOutcome, FetchError>;

/// Everything the controller knows about the current listing. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchState {
  pub query: String,
  pub listing: Option<Listing>,
  /// `nextPageToken` of the most recent page, `None` once pagination has ended.
  pub page_cursor: Option<String>,
  pub in_flight: bool,
}

/// Which page a request asked for; remembered so a failure can be retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageRequest {
  First,
  Next,
}

impl PageRequest {
  fn appends(self) -> bool {
    self == PageRequest::Next
  }
}

/// Completion of a page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchEvent {
  Loaded { page: PageResponse, append: bool },
  /// `has_more` is set when the empty page still carried a cursor.
  NoResults { total_count: u64, has_more: bool, append: bool },
  Failed { error: FetchError, append: bool },
}

pub struct QueryController {
  fetcher: Arc<dyn PageFetcher>,
  endpoint: ApiEndpoint,
  region: String,
  order: SortOrder,
  state: SearchState,
  pending: Option<(PageRequest, oneshot::Receiver<FetchResult>)>,
  failed: Option<PageRequest>,
}

impl QueryController {
  pub fn new(fetcher: Arc<dyn PageFetcher>, endpoint: ApiEndpoint, region: String, order: SortOrder) -> Self {
    Self { fetcher, endpoint, region, order, state: SearchState::default(), pending: None, failed: None }
  }

  pub fn state(&self) -> &SearchState {
    &self.state
  }

  pub fn is_in_flight(&self) -> bool {
    self.state.in_flight
  }

  pub fn order(&self) -> SortOrder {
    self.order
  }

  /// Whether the last page carried a cursor.
  pub fn has_more(&self) -> bool {
    self.state.page_cursor.as_deref().is_some_and(|c| !c.is_empty())
  }

  /// Whether the last request failed and can be re-issued.
  pub fn can_retry(&self) -> bool {
    self.failed.is_some() && !self.state.in_flight
  }

  /// Start a keyword search from page one. Returns `false` without calling out
  /// when the query is blank or a fetch is already in flight.
  pub fn start_search(&mut self, query: &str) -> bool {
    let query = query.trim();
    if query.is_empty() || self.state.in_flight {
      debug!(query, in_flight = self.state.in_flight, "search rejected");
      return false;
    }
    info!(query, order = self.order.as_param(), "search started");
    self.start_listing(Listing::Search { query: query.to_string(), order: self.order });
    true
  }

  /// Start a preset keyword search for a category. Same guards as `start_search`.
  pub fn start_category(&mut self, name: &str) -> bool {
    let name = name.trim();
    if name.is_empty() || self.state.in_flight {
      debug!(category = name, in_flight = self.state.in_flight, "category search rejected");
      return false;
    }
    info!(category = name, order = self.order.as_param(), "category search started");
    self.start_listing(Listing::Category { name: name.to_string(), order: self.order });
    true
  }

  /// Start the "most popular" chart listing from page one.
  pub fn start_trending(&mut self) -> bool {
    if self.state.in_flight {
      return false;
    }
    info!(region = %self.region, "trending started");
    self.start_listing(Listing::Trending { region: self.region.clone() });
    true
  }

  /// Fetch the page after the current cursor, reusing the listing captured when
  /// the search started.
  pub fn load_next_page(&mut self) -> bool {
    if !self.has_more() || self.state.query.is_empty() || self.state.in_flight {
      return false;
    }
    let Some(listing) = self.state.listing.clone() else { return false };
    debug!(query = %self.state.query, "loading next page");
    self.dispatch(&listing, PageRequest::Next);
    true
  }

  /// Re-issue the request that last failed.
  pub fn retry(&mut self) -> bool {
    if !self.can_retry() {
      return false;
    }
    let Some(listing) = self.state.listing.clone() else { return false };
    match self.failed {
      Some(PageRequest::First) => {
        info!(query = %self.state.query, "retrying first page");
        self.start_listing(listing);
        true
      }
      Some(PageRequest::Next) => {
        info!(query = %self.state.query, "retrying next page");
        self.load_next_page()
      }
      None => false,
    }
  }

  /// Change the sort order. An active keyword or category search restarts from
  /// page one so a cursor is never reused under a different order. Returns
  /// whether a restart was issued.
  pub fn set_order(&mut self, order: SortOrder) -> bool {
    if order == self.order {
      return false;
    }
    self.order = order;
    if self.state.in_flight {
      return false;
    }
    match self.state.listing.as_ref().and_then(|l| l.with_order(order)) {
      Some(listing) => {
        info!(query = %self.state.query, order = order.as_param(), "restarting under new order");
        self.start_listing(listing);
        true
      }
      None => false,
    }
  }

  fn start_listing(&mut self, listing: Listing) {
    self.state.query = listing.query().to_string();
    self.state.page_cursor = None;
    self.state.listing = Some(listing.clone());
    self.dispatch(&listing, PageRequest::First);
  }

  fn dispatch(&mut self, listing: &Listing, request: PageRequest) {
    let cursor = match request {
      PageRequest::First => None,
      PageRequest::Next => self.state.page_cursor.as_deref(),
    };
    let url = self.endpoint.page_url(listing, cursor);
    self.state.in_flight = true;
    self.failed = None;

    let fetch = self.fetcher.fetch_page(url);
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      let _ = tx.send(fetch.await);
    });
    self.pending = Some((request, rx));
  }

  /// Non-blocking poll for the outstanding request.
  pub fn check_pending(&mut self) -> Option<SearchEvent> {
    let (request, mut rx) = self.pending.take()?;
    match rx.try_recv() {
      Ok(result) => Some(self.complete(request, result)),
      Err(oneshot::error::TryRecvError::Empty) => {
        self.pending = Some((request, rx));
        None
      }
      Err(oneshot::error::TryRecvError::Closed) => Some(self.task_lost(request)),
    }
  }

  /// Wait for the outstanding request, if any.
  pub async fn settle(&mut self) -> Option<SearchEvent> {
    let (request, rx) = self.pending.take()?;
    match rx.await {
      Ok(result) => Some(self.complete(request, result)),
      Err(_) => Some(self.task_lost(request)),
    }
  }

  fn task_lost(&mut self, request: PageRequest) -> SearchEvent {
    warn!("fetch task ended without a result");
    self.complete(request, Err(FetchError::Transport("fetch task ended without a result".to_string())))
  }

  fn complete(&mut self, request: PageRequest, result: FetchResult) -> SearchEvent {
    self.state.in_flight = false;
    let append = request.appends();
    match result {
      Ok(FetchOutcome::Page(page)) => {
        info!(
          query = %self.state.query,
          items = page.items.len(),
          has_more = page.next_cursor.is_some(),
          "page loaded"
        );
        self.state.page_cursor = page.next_cursor.clone();
        SearchEvent::Loaded { page, append }
      }
      Ok(FetchOutcome::NoResults { total_count, next_cursor }) => {
        let has_more = next_cursor.is_some();
        info!(query = %self.state.query, has_more, "no results");
        self.state.page_cursor = next_cursor;
        SearchEvent::NoResults { total_count, has_more, append }
      }
      Err(error) => {
        warn!(query = %self.state.query, err = ?error, "page fetch failed");
        self.failed = Some(request);
        SearchEvent::Failed { error, append }
      }
    }
  }
}
