//! Result rendering: API items become display cards, cards accumulate in a view.
//!
//! `Card::from_item` is pure so formatting and escaping can be tested without a
//! terminal. The TUI draws cards as plain text; `Card::to_html` is the markup
//! rendition used by `--print --format html`, and is the only place item text
//! meets markup.

use chrono::{DateTime, Utc};

use crate::player::embed_url;
use crate::youtube::{PageResponse, ResultItem};

// --- Formatting ---

/// Escape the five HTML-significant characters.
pub fn escape_html(text: &str) -> String {
  let mut out = String::with_capacity(text.len());
  for c in text.chars() {
    match c {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '"' => out.push_str("&quot;"),
      '\'' => out.push_str("&#39;"),
      _ => out.push(c),
    }
  }
  out
}

/// Inverse of [`escape_html`] for the entities it produces.
pub fn unescape_html(text: &str) -> String {
  text
    .replace("&lt;", "<")
    .replace("&gt;", ">")
    .replace("&quot;", "\"")
    .replace("&#39;", "'")
    .replace("&amp;", "&")
}

/// "Today", "Yesterday", "3 days ago", "2 weeks ago", "1 month ago", "4 years ago".
pub fn format_relative_date(published: DateTime<Utc>, now: DateTime<Utc>) -> String {
  let days = (now - published).num_days().unsigned_abs();
  let plural = |n: u64, unit: &str| format!("{} {}{} ago", n, unit, if n > 1 { "s" } else { "" });
  match days {
    0 => "Today".to_string(),
    1 => "Yesterday".to_string(),
    2..=6 => format!("{} days ago", days),
    7..=29 => plural(days / 7, "week"),
    30..=364 => plural(days / 30, "month"),
    _ => plural(days / 365, "year"),
  }
}

/// "1.2M", "3.4K", "999".
pub fn format_view_count(count: u64) -> String {
  if count >= 1_000_000 {
    format!("{:.1}M", count as f64 / 1_000_000.0)
  } else if count >= 1_000 {
    format!("{:.1}K", count as f64 / 1_000.0)
  } else {
    count.to_string()
  }
}

/// Group digits in threes: 1234567 -> "1,234,567".
pub fn group_thousands(n: u64) -> String {
  let digits = n.to_string();
  let mut out = String::with_capacity(digits.len() + digits.len() / 3);
  for (i, c) in digits.chars().enumerate() {
    if i > 0 && (digits.len() - i) % 3 == 0 {
      out.push(',');
    }
    out.push(c);
  }
  out
}

// --- Cards ---

/// Display description of one result item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
  pub video_id: String,
  pub title: String,
  pub channel: String,
  pub thumbnail_url: Option<String>,
  pub date_label: String,
  pub views_label: Option<String>,
  pub embed_url: String,
}

impl Card {
  pub fn from_item(item: &ResultItem, now: DateTime<Utc>) -> Self {
    Self {
      video_id: item.id.clone(),
      title: item.title.clone(),
      channel: item.channel_name.clone(),
      thumbnail_url: item.thumbnail_url.clone(),
      date_label: item.published_at.map(|p| format_relative_date(p, now)).unwrap_or_default(),
      views_label: item.view_count.map(|v| format!("{} views", format_view_count(v))),
      embed_url: embed_url(&item.id),
    }
  }

  /// Right-hand metadata column: "1.2M views · 3 days ago".
  pub fn meta_line(&self) -> String {
    match (&self.views_label, self.date_label.is_empty()) {
      (Some(views), false) => format!("{} · {}", views, self.date_label),
      (Some(views), true) => views.clone(),
      (None, _) => self.date_label.clone(),
    }
  }

  pub fn to_html(&self) -> String {
    let title = escape_html(&self.title);
    let thumbnail = self
      .thumbnail_url
      .as_deref()
      .map(|u| format!("\n  <img src=\"{}\" alt=\"{}\" loading=\"lazy\">", escape_html(u), title))
      .unwrap_or_default();
    let views = self
      .views_label
      .as_deref()
      .map(|v| format!("\n    <span class=\"video-views\">{}</span>", escape_html(v)))
      .unwrap_or_default();
    format!(
      "<div class=\"video-card\" data-video-id=\"{id}\">\
       \n  <a class=\"video-link\" href=\"{embed}\">{title}</a>{thumbnail}\
       \n  <div class=\"video-meta\">\
       \n    <span class=\"video-channel\">{channel}</span>{views}\
       \n    <span class=\"video-date\">{date}</span>\
       \n  </div>\
       \n</div>",
      id = escape_html(&self.video_id),
      embed = escape_html(&self.embed_url),
      channel = escape_html(&self.channel),
      date = escape_html(&self.date_label),
    )
  }
}

// --- View state ---

/// Which panel occupies the results area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Panel {
  Hero,
  Loading,
  Results,
  NoResults,
  Error(String),
  ApiKeyRequired,
}

/// The accumulated result cards plus the panel and "load more" affordance.
#[derive(Debug, Clone)]
pub struct ResultsView {
  pub title: String,
  pub cards: Vec<Card>,
  pub load_more_visible: bool,
  pub total_results: u64,
  pub panel: Panel,
}

impl Default for ResultsView {
  fn default() -> Self {
    Self {
      title: String::new(),
      cards: Vec::new(),
      load_more_visible: false,
      total_results: 0,
      panel: Panel::Hero,
    }
  }
}

impl ResultsView {
  /// A fresh listing is starting: drop the old cards and show the loading panel.
  pub fn begin(&mut self, title: String) {
    self.title = title;
    self.cards.clear();
    self.load_more_visible = false;
    self.total_results = 0;
    self.panel = Panel::Loading;
  }

  /// Convert `items` to cards, replacing the list unless `append` is set. Order is preserved.
  pub fn render(&mut self, items: &[ResultItem], append: bool, now: DateTime<Utc>) {
    if !append {
      self.cards.clear();
    }
    self.cards.extend(items.iter().map(|item| Card::from_item(item, now)));
    self.panel = Panel::Results;
  }

  pub fn show_page(&mut self, page: &PageResponse, append: bool, now: DateTime<Utc>) {
    self.render(&page.items, append, now);
    self.load_more_visible = page.next_cursor.as_deref().is_some_and(|c| !c.is_empty());
    if page.total_count > 0 || !append {
      self.total_results = page.total_count;
    }
  }

  /// An empty first page shows the empty panel; an empty later page keeps the
  /// cards. "Load more" still follows the cursor either way.
  pub fn show_no_results(&mut self, append: bool, has_more: bool) {
    self.load_more_visible = has_more;
    if append && !self.cards.is_empty() {
      self.panel = Panel::Results;
    } else {
      self.cards.clear();
      self.total_results = 0;
      self.panel = Panel::NoResults;
    }
  }

  /// Cards are kept behind the error panel so a retried "load more" can append to them.
  pub fn show_error(&mut self, message: String) {
    self.load_more_visible = false;
    self.panel = Panel::Error(message);
  }

  pub fn show_api_key_required(&mut self) {
    self.title = "API Configuration Required".to_string();
    self.cards.clear();
    self.load_more_visible = false;
    self.panel = Panel::ApiKeyRequired;
  }

  pub fn results_count_label(&self) -> Option<String> {
    (self.total_results > 0).then(|| format!("{} results", group_thousands(self.total_results)))
  }

  pub fn to_html(&self) -> String {
    let cards: Vec<String> = self.cards.iter().map(Card::to_html).collect();
    format!(
      "<section class=\"video-grid\">\n<h2 class=\"results-title\">{}</h2>\n{}\n</section>\n",
      escape_html(&self.title),
      cards.join("\n")
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::{Duration, TimeZone};

  fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
  }

  fn item(id: &str, title: &str) -> ResultItem {
    ResultItem {
      id: id.to_string(),
      title: title.to_string(),
      thumbnail_url: Some(format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", id)),
      channel_name: "Channel".to_string(),
      published_at: Some(now() - Duration::days(3)),
      view_count: None,
    }
  }

  fn items(prefix: &str, n: usize) -> Vec<ResultItem> {
    (0..n).map(|i| item(&format!("{}{}", prefix, i), &format!("Video {}", i))).collect()
  }

  // --- escaping ---

  #[test]
  fn escape_html_specials() {
    assert_eq!(
      escape_html(r#"<a href="x">Tom & Jerry's</a>"#),
      "&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&#39;s&lt;/a&gt;"
    );
    assert_eq!(escape_html("plain"), "plain");
  }

  #[test]
  fn escape_is_stable_through_unescape() {
    for text in ["<script>alert(1)</script>", "Tom & Jerry", "\"quoted\" & 'single'", "日本語"] {
      assert_eq!(escape_html(&unescape_html(text)), escape_html(text), "text: {}", text);
      assert_eq!(unescape_html(&escape_html(text)), text);
    }
  }

  #[test]
  fn unescape_restores_escaped_entities() {
    assert_eq!(unescape_html("&amp;lt;"), "&lt;");
    assert_eq!(unescape_html(&escape_html("&lt;already&gt;")), "&lt;already&gt;");
  }

  #[test]
  fn script_title_renders_as_literal_text() {
    let card = Card::from_item(&item("x1", "<script>alert('pwned')</script>"), now());
    let html = card.to_html();
    assert!(!html.contains("<script>"));
    assert!(html.contains("&lt;script&gt;alert(&#39;pwned&#39;)&lt;/script&gt;"));
    assert_eq!(card.title, "<script>alert('pwned')</script>");
  }

  #[test]
  fn channel_name_is_escaped() {
    let mut it = item("x1", "t");
    it.channel_name = "<b>Bold</b>".to_string();
    let html = Card::from_item(&it, now()).to_html();
    assert!(html.contains("&lt;b&gt;Bold&lt;/b&gt;"));
    assert!(!html.contains("<b>"));
  }

  // --- formatting ---

  #[test]
  fn relative_dates() {
    let n = now();
    assert_eq!(format_relative_date(n, n), "Today");
    assert_eq!(format_relative_date(n - Duration::days(1), n), "Yesterday");
    assert_eq!(format_relative_date(n - Duration::days(5), n), "5 days ago");
    assert_eq!(format_relative_date(n - Duration::days(7), n), "1 week ago");
    assert_eq!(format_relative_date(n - Duration::days(20), n), "2 weeks ago");
    assert_eq!(format_relative_date(n - Duration::days(45), n), "1 month ago");
    assert_eq!(format_relative_date(n - Duration::days(200), n), "6 months ago");
    assert_eq!(format_relative_date(n - Duration::days(800), n), "2 years ago");
  }

  #[test]
  fn view_counts() {
    assert_eq!(format_view_count(999), "999");
    assert_eq!(format_view_count(1_500), "1.5K");
    assert_eq!(format_view_count(1_234_567), "1.2M");
  }

  #[test]
  fn thousands_grouping() {
    assert_eq!(group_thousands(0), "0");
    assert_eq!(group_thousands(999), "999");
    assert_eq!(group_thousands(1_000), "1,000");
    assert_eq!(group_thousands(1_234_567), "1,234,567");
  }

  #[test]
  fn card_from_item() {
    let mut it = item("abc", "Title");
    it.view_count = Some(2_500_000);
    let card = Card::from_item(&it, now());
    assert_eq!(card.video_id, "abc");
    assert_eq!(card.date_label, "3 days ago");
    assert_eq!(card.views_label.as_deref(), Some("2.5M views"));
    assert_eq!(card.meta_line(), "2.5M views · 3 days ago");
    assert_eq!(card.embed_url, "https://www.youtube.com/embed/abc?autoplay=1&rel=0");
  }

  #[test]
  fn card_without_date_or_views() {
    let mut it = item("abc", "Title");
    it.published_at = None;
    let card = Card::from_item(&it, now());
    assert_eq!(card.meta_line(), "");
  }

  // --- view ---

  #[test]
  fn render_replaces_unless_appending() {
    let mut view = ResultsView::default();
    view.render(&items("a", 3), false, now());
    view.render(&items("b", 2), true, now());
    assert_eq!(view.cards.len(), 5);
    assert_eq!(view.cards[0].video_id, "a0");
    assert_eq!(view.cards[3].video_id, "b0");

    view.render(&items("c", 1), false, now());
    assert_eq!(view.cards.len(), 1);
    assert_eq!(view.cards[0].video_id, "c0");
  }

  #[test]
  fn load_more_follows_cursor() {
    let mut view = ResultsView::default();
    let page = PageResponse { items: items("a", 2), next_cursor: Some("X".to_string()), total_count: 10 };
    view.show_page(&page, false, now());
    assert!(view.load_more_visible);

    let page = PageResponse { items: items("b", 2), next_cursor: None, total_count: 10 };
    view.show_page(&page, true, now());
    assert!(!view.load_more_visible);

    let page = PageResponse { items: items("c", 2), next_cursor: Some(String::new()), total_count: 10 };
    view.show_page(&page, false, now());
    assert!(!view.load_more_visible);
  }

  #[test]
  fn empty_first_page_shows_no_results_panel() {
    let mut view = ResultsView::default();
    view.show_no_results(false, false);
    assert_eq!(view.panel, Panel::NoResults);
    assert!(view.cards.is_empty());
    assert!(!view.load_more_visible);
  }

  #[test]
  fn empty_later_page_keeps_cards() {
    let mut view = ResultsView::default();
    let page = PageResponse { items: items("a", 4), next_cursor: Some("X".to_string()), total_count: 4 };
    view.show_page(&page, false, now());
    view.show_no_results(true, false);
    assert_eq!(view.panel, Panel::Results);
    assert_eq!(view.cards.len(), 4);
    assert!(!view.load_more_visible);
  }

  #[test]
  fn empty_later_page_with_cursor_keeps_load_more() {
    let mut view = ResultsView::default();
    let page = PageResponse { items: items("a", 4), next_cursor: Some("X".to_string()), total_count: 4 };
    view.show_page(&page, false, now());
    view.show_no_results(true, true);
    assert_eq!(view.panel, Panel::Results);
    assert_eq!(view.cards.len(), 4);
    assert!(view.load_more_visible);
  }

  #[test]
  fn error_panel_hides_load_more_and_keeps_cards() {
    let mut view = ResultsView::default();
    let page = PageResponse { items: items("a", 4), next_cursor: Some("X".to_string()), total_count: 4 };
    view.show_page(&page, false, now());
    view.show_error("boom".to_string());
    assert_eq!(view.panel, Panel::Error("boom".to_string()));
    assert!(!view.load_more_visible);
    assert_eq!(view.cards.len(), 4);
  }

  #[test]
  fn begin_clears_previous_listing() {
    let mut view = ResultsView::default();
    view.render(&items("a", 3), false, now());
    view.begin("Search results for \"dogs\"".to_string());
    assert!(view.cards.is_empty());
    assert_eq!(view.panel, Panel::Loading);
  }

  #[test]
  fn results_count_label() {
    let mut view = ResultsView::default();
    assert_eq!(view.results_count_label(), None);
    view.total_results = 1_000_000;
    assert_eq!(view.results_count_label().as_deref(), Some("1,000,000 results"));
  }

  #[test]
  fn view_html_escapes_title() {
    let mut view = ResultsView::default();
    view.begin("Search results for \"<i>\"".to_string());
    view.render(&items("a", 2), false, now());
    let html = view.to_html();
    assert!(html.contains("Search results for &quot;&lt;i&gt;&quot;"));
    assert_eq!(html.matches("class=\"video-card\"").count(), 2);
  }
}
