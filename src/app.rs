use chrono::Utc;
use ratatui::widgets::ListState;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::config::Config;
use crate::constants::constants;
use crate::player::{self, NowPlaying, Player};
use crate::results::{Card, Panel, ResultsView};
use crate::search::{QueryController, SearchEvent};
use crate::theme::{THEMES, Theme};
use crate::youtube::Listing;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
  Input,
  Results,
}

pub struct App {
  pub input: String,
  pub cursor_position: usize,
  pub input_scroll: usize,
  pub mode: AppMode,
  pub theme_index: usize,
  /// `None` when no usable API key was configured.
  pub search: Option<QueryController>,
  pub view: ResultsView,
  pub list_state: ListState,
  pub player: Player,
  pub last_error: Option<String>,
  pub status_message: Option<String>,
  pub should_quit: bool,
  config: Config,
  /// Whether preference changes are written to `prefs.toml`.
  persist_prefs: bool,
  /// When the last error was set, for auto-dismiss.
  error_time: Option<Instant>,
  /// Set when `status_message` is a transient notice rather than a loading message.
  notice_time: Option<Instant>,
}

impl App {
  pub fn new(search: Option<QueryController>, theme_index: usize, config: Config) -> Self {
    let mut view = ResultsView::default();
    if search.is_none() {
      view.show_api_key_required();
    }
    Self {
      input: String::new(),
      cursor_position: 0,
      input_scroll: 0,
      mode: AppMode::Input,
      theme_index: theme_index.min(THEMES.len() - 1),
      search,
      view,
      list_state: ListState::default(),
      player: Player::new(),
      last_error: None,
      status_message: None,
      should_quit: false,
      config,
      persist_prefs: true,
      error_time: None,
      notice_time: None,
    }
  }

  pub fn theme(&self) -> &'static Theme {
    // Safety: theme_index is clamped to THEMES.len() - 1 in new().
    &THEMES[self.theme_index]
  }

  /// Set an error message with auto-dismiss tracking.
  pub fn set_error(&mut self, msg: String) {
    self.last_error = Some(msg);
    self.error_time = Some(Instant::now());
  }

  pub fn clear_error(&mut self) {
    self.last_error = None;
    self.error_time = None;
  }

  /// Show a progress message; it stays until the request completes.
  fn set_status(&mut self, msg: String) {
    self.status_message = Some(msg);
    self.notice_time = None;
  }

  /// Show a status-line message that dismisses itself like an error.
  pub fn set_notice(&mut self, msg: String) {
    self.status_message = Some(msg);
    self.notice_time = Some(Instant::now());
  }

  /// Clear stale error messages and notices.
  pub fn expire_error(&mut self) {
    let ttl = Duration::from_secs(constants().error_dismiss_secs);
    if let Some(t) = self.error_time
      && t.elapsed() >= ttl
    {
      self.clear_error();
    }
    if let Some(t) = self.notice_time
      && t.elapsed() >= ttl
    {
      self.status_message = None;
      self.notice_time = None;
    }
  }

  pub fn is_loading(&self) -> bool {
    self.search.as_ref().is_some_and(QueryController::is_in_flight)
  }

  fn current_title(&self) -> Option<String> {
    self.search.as_ref().and_then(|s| s.state().listing.as_ref()).map(Listing::title)
  }

  pub fn selected_card(&self) -> Option<&Card> {
    self.list_state.selected().and_then(|i| self.view.cards.get(i))
  }

  // --- Requests ---

  pub fn trigger_search(&mut self) {
    let query = self.input.trim().to_string();
    if query.is_empty() {
      self.set_error("Enter a search term.".to_string());
      return;
    }
    let Some(search) = self.search.as_mut() else {
      self.view.show_api_key_required();
      return;
    };
    if search.start_search(&query) {
      self.clear_error();
      self.set_status(format!("Searching '{}'…", query));
      self.begin_listing();
    }
  }

  /// Run the preset search for the `index`th category and mirror it in the input box.
  pub fn trigger_category(&mut self, index: usize) {
    let Some(name) = constants().categories.get(index) else { return };
    let Some(search) = self.search.as_mut() else {
      self.view.show_api_key_required();
      return;
    };
    if search.start_category(name) {
      self.input = name.clone();
      self.cursor_position = self.input.chars().count();
      self.clear_error();
      self.set_status(format!("Loading {} videos…", name));
      self.begin_listing();
    }
  }

  pub fn trigger_trending(&mut self) {
    let Some(search) = self.search.as_mut() else {
      self.view.show_api_key_required();
      return;
    };
    if search.start_trending() {
      self.set_status("Loading trending videos…".to_string());
      self.begin_listing();
    }
  }

  pub fn trigger_load_more(&mut self) {
    let Some(search) = self.search.as_mut() else { return };
    if search.load_next_page() {
      self.set_status("Loading more…".to_string());
    }
  }

  pub fn trigger_retry(&mut self) {
    let Some(search) = self.search.as_mut() else { return };
    if search.retry() {
      self.clear_error();
      self.set_status("Retrying…".to_string());
      self.view.panel = if self.view.cards.is_empty() { Panel::Loading } else { Panel::Results };
    }
  }

  /// Cycle the search sort order. Restarts the active keyword or category search.
  pub fn cycle_sort(&mut self) {
    let Some(search) = self.search.as_mut() else { return };
    let order = search.order().next();
    let restarted = search.set_order(order);
    let on_chart = matches!(search.state().listing, Some(Listing::Trending { .. }));
    info!(order = order.as_param(), restarted, "sort order changed");
    self.config.sort_order = Some(order.as_param().to_string());
    if self.persist_prefs {
      self.config.save();
    }
    if restarted {
      self.set_status(format!("Sorting by {}…", order.label().to_lowercase()));
      self.begin_listing();
    } else if on_chart {
      self.set_notice(format!("Sort: {}. Trending is unsorted; applies to the next search.", order.label()));
    }
  }

  fn begin_listing(&mut self) {
    let title = self.current_title().unwrap_or_default();
    self.view.begin(title);
    self.list_state.select(None);
  }

  pub fn check_pending(&mut self) {
    let Some(event) = self.search.as_mut().and_then(QueryController::check_pending) else { return };
    self.status_message = None;
    self.notice_time = None;
    self.apply(event);
  }

  fn apply(&mut self, event: SearchEvent) {
    match event {
      SearchEvent::Loaded { page, append } => {
        self.view.show_page(&page, append, Utc::now());
        if !append || self.list_state.selected().is_none() {
          self.list_state.select(Some(0));
        }
        self.mode = AppMode::Results;
      }
      SearchEvent::NoResults { has_more, append, .. } => {
        self.view.show_no_results(append, has_more);
        if self.view.cards.is_empty() {
          self.list_state.select(None);
          if !has_more {
            self.mode = AppMode::Input;
          }
        }
      }
      SearchEvent::Failed { error, .. } => {
        self.view.show_error(error.to_string());
        self.mode = AppMode::Input;
      }
    }
  }

  // --- Playback ---

  pub async fn play_selected(&mut self) {
    let Some(card) = self.selected_card() else { return };
    let now_playing =
      NowPlaying { video_id: card.video_id.clone(), title: card.title.clone(), channel: card.channel.clone() };
    self.clear_error();
    if let Err(e) = self.player.play(now_playing).await {
      warn!(err = %e, "playback failed");
      self.set_error(format!("Playback error: {:#}", e));
      let _ = self.player.stop().await;
    }
  }

  pub fn open_selected(&mut self) {
    let Some(video_id) = self.selected_card().map(|c| c.video_id.clone()) else { return };
    if let Err(e) = player::open_in_browser(&video_id) {
      self.set_error(format!("Failed to open browser: {:#}", e));
    }
  }

  // --- Navigation ---

  pub fn select_next(&mut self) {
    let count = self.view.cards.len();
    if count > 0 {
      let i = self.list_state.selected().map_or(0, |i| (i + 1) % count);
      self.list_state.select(Some(i));
    }
  }

  pub fn select_previous(&mut self) {
    let count = self.view.cards.len();
    if count > 0 {
      let i = self.list_state.selected().map_or(0, |i| if i == 0 { count - 1 } else { i - 1 });
      self.list_state.select(Some(i));
    }
  }
}
