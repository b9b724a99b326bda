use ratatui::{
  Frame,
  layout::{Alignment, Constraint, Layout, Rect},
  style::{Modifier, Style, Stylize},
  text::{Line, Span},
  widgets::{Block, BorderType, List, ListItem, Padding, Paragraph, Wrap},
};

use crate::app::{App, AppMode};
use crate::constants::constants;
use crate::results::Panel;
use crate::theme::Theme;

// --- Helpers ---

/// Compute the display width of the first `n` chars (accounting for double-width CJK).
pub fn display_width(s: &str, n: usize) -> usize {
  use unicode_width::UnicodeWidthChar;
  s.chars().take(n).map(|c| c.width().unwrap_or(0)).sum()
}

/// Truncate a string to `max_width` characters, appending "…" if truncated.
fn truncate_str(s: &str, max_width: usize) -> String {
  if s.chars().count() <= max_width {
    s.to_string()
  } else {
    let truncated: String = s.chars().take(max_width.saturating_sub(1)).collect();
    format!("{}…", truncated)
  }
}

/// " 1 music  2 gaming … " for the number-key quick searches.
fn category_strip() -> String {
  let entries: Vec<String> =
    constants().categories.iter().take(9).enumerate().map(|(i, name)| format!("{} {}", i + 1, name)).collect();
  format!(" {} ", entries.join("  "))
}

fn panel_block<'a>(theme: &Theme, title: impl Into<Line<'a>>) -> Block<'a> {
  Block::bordered()
    .title(title)
    .title_style(Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))
    .border_type(BorderType::Rounded)
    .border_style(Style::default().fg(theme.border))
}

// --- UI Rendering ---

pub fn ui(frame: &mut Frame, app: &mut App) {
  let theme = app.theme();

  frame.render_widget(Block::default().style(Style::default().bg(theme.bg)), frame.area());

  let [header_area, main_area, status_area, input_area, footer_area] = Layout::vertical([
    Constraint::Length(1),
    Constraint::Min(3),
    Constraint::Length(1),
    Constraint::Length(3),
    Constraint::Length(1),
  ])
  .areas(frame.area());

  render_header(frame, app, header_area);
  render_main(frame, app, main_area);
  render_status(frame, app, status_area);
  render_input(frame, app, input_area);
  render_footer(frame, app, footer_area);
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let left = Line::from(Span::styled(" ▶ vidstream ", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)));
  frame.render_widget(left, area);

  let right_text = match app.view.results_count_label() {
    Some(count) => format!("{}  v{} ", count, env!("CARGO_PKG_VERSION")),
    None => format!("v{} ", env!("CARGO_PKG_VERSION")),
  };
  let width = right_text.chars().count() as u16;
  let right = Line::from(Span::styled(right_text, Style::default().fg(theme.muted)));
  let right_area = Rect { x: area.x + area.width.saturating_sub(width), width: width.min(area.width), ..area };
  frame.render_widget(right, right_area);
}

fn render_main(frame: &mut Frame, app: &mut App, area: Rect) {
  let area = if app.player.is_playing() {
    let [list_area, player_area] =
      Layout::horizontal([Constraint::Percentage(68), Constraint::Percentage(32)]).areas(area);
    render_now_playing(frame, app, player_area);
    list_area
  } else {
    area
  };

  match app.view.panel.clone() {
    Panel::Hero => render_welcome(frame, app.theme(), area),
    Panel::Loading => render_message(frame, app.theme(), area, &app.view.title, &["Loading…"], false),
    Panel::Results => render_results(frame, app, area),
    Panel::NoResults => {
      let mut body = vec!["Try searching with different keywords or check your spelling.", "", "Ctrl+P  Back to trending"];
      if app.view.load_more_visible {
        body.push("m  Try the next page");
      }
      render_message(frame, app.theme(), area, "No videos found", &body, false)
    }
    Panel::Error(message) => render_message(
      frame,
      app.theme(),
      area,
      "Oops! Something went wrong",
      &[message.as_str(), "", "Ctrl+R  Try again"],
      true,
    ),
    Panel::ApiKeyRequired => render_message(
      frame,
      app.theme(),
      area,
      "YouTube API Key Required",
      &[
        "To use vidstream, configure a valid YouTube Data API v3 key.",
        "",
        "1. Open https://console.cloud.google.com/",
        "2. Create or select a project",
        "3. Enable the YouTube Data API v3",
        "4. Create credentials (API key)",
        "5. Export YOUTUBE_API_KEY, pass --api-key, or set api_key in prefs.toml",
      ],
      true,
    ),
  }
}

fn render_welcome(frame: &mut Frame, theme: &Theme, area: Rect) {
  let text = vec![
    Line::from(""),
    Line::from(Span::styled("▶  Welcome to vidstream", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))),
    Line::from(""),
    Line::from(Span::styled("Search YouTube. Browse results. Play videos.", Style::default().fg(theme.fg))),
    Line::from(""),
    Line::from(Span::styled("Type a query below and press Enter.", Style::default().fg(theme.muted))),
  ];
  let paragraph = Paragraph::new(text).alignment(Alignment::Center).block(
    Block::bordered().border_type(BorderType::Rounded).border_style(Style::default().fg(theme.border)),
  );
  frame.render_widget(paragraph, area);
}

fn render_message(frame: &mut Frame, theme: &Theme, area: Rect, heading: &str, body: &[&str], is_error: bool) {
  let heading_color = if is_error { theme.error } else { theme.accent };
  let mut text = vec![
    Line::from(""),
    Line::from(Span::styled(heading.to_string(), Style::default().fg(heading_color).add_modifier(Modifier::BOLD))),
    Line::from(""),
  ];
  text.extend(body.iter().map(|l| Line::from(Span::styled(l.to_string(), Style::default().fg(theme.fg)))));
  let paragraph = Paragraph::new(text).alignment(Alignment::Center).wrap(Wrap { trim: false }).block(
    Block::bordered().border_type(BorderType::Rounded).border_style(Style::default().fg(theme.border)),
  );
  frame.render_widget(paragraph, area);
}

fn render_results(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();

  // Inner width: area minus 2 borders minus 2 chars for highlight symbol ("▶ ")
  let inner_w = area.width.saturating_sub(4) as usize;
  let selected = app.list_state.selected();

  let items: Vec<ListItem> = app
    .view
    .cards
    .iter()
    .enumerate()
    .map(|(i, card)| {
      let is_selected = Some(i) == selected;
      let fg = if is_selected { theme.highlight_fg } else { theme.fg };
      let bg = if is_selected {
        theme.highlight_bg
      } else if i % 2 == 1 {
        theme.stripe_bg
      } else {
        theme.bg
      };

      let meta = card.meta_line();
      let meta_w = meta.chars().count();
      let channel = truncate_str(&card.channel, inner_w.saturating_sub(meta_w + 2));
      let gap = inner_w.saturating_sub(channel.chars().count() + meta_w);

      let title_line = Line::from(Span::styled(truncate_str(&card.title, inner_w), Style::default().fg(fg).bold()));
      let meta_line = Line::from(vec![
        Span::styled(channel, Style::default().fg(theme.muted)),
        Span::raw(" ".repeat(gap)),
        Span::styled(meta, Style::default().fg(theme.muted)),
      ]);
      ListItem::new(vec![title_line, meta_line]).bg(bg)
    })
    .collect();

  let sort_label = app.search.as_ref().map(|s| s.order().label()).unwrap_or_default();
  let title = format!(" {} ", app.view.title);
  let mut block = panel_block(theme, title);
  if app.view.load_more_visible {
    let hint = if app.is_loading() { " loading more… " } else { " ▼ m: load more " };
    block = block.title_bottom(Line::from(Span::styled(hint, Style::default().fg(theme.accent))).centered());
  }
  block = block.title_bottom(Line::from(Span::styled(category_strip(), Style::default().fg(theme.muted))).left_aligned());
  if !sort_label.is_empty() {
    let sort = Span::styled(format!(" sort: {} ", sort_label), Style::default().fg(theme.muted));
    block = block.title_bottom(Line::from(sort).right_aligned());
  }

  let list = List::new(items)
    .block(block)
    .highlight_symbol("▶ ")
    .highlight_style(Style::default().fg(theme.highlight_fg).bg(theme.highlight_bg).add_modifier(Modifier::BOLD));

  frame.render_stateful_widget(list, area, &mut app.list_state);
}

fn render_now_playing(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let block = panel_block(theme, " Now Playing ").padding(Padding::horizontal(1));

  let Some(np) = &app.player.now_playing else {
    frame.render_widget(block, area);
    return;
  };
  let inner_w = area.width.saturating_sub(4) as usize;
  let mut lines = vec![
    Line::from(""),
    Line::from(Span::styled(truncate_str(&np.title, inner_w), Style::default().fg(theme.fg).bold())),
    Line::from(""),
    Line::from(vec![
      Span::styled("Channel  ", Style::default().fg(theme.muted)),
      Span::styled(truncate_str(&np.channel, inner_w.saturating_sub(9)), Style::default().fg(theme.fg)),
    ]),
  ];
  if app.player.paused {
    lines.push(Line::from(Span::styled("Paused", Style::default().fg(theme.status))));
  }
  lines.push(Line::from(""));
  lines.push(Line::from(Span::styled(
    truncate_str(&crate::player::embed_url(&np.video_id), inner_w),
    Style::default().fg(theme.accent).add_modifier(Modifier::UNDERLINED),
  )));
  frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let (text, style) = if let Some(msg) = &app.status_message {
    (format!(" ⏳ {}", msg), Style::default().fg(theme.status))
  } else if let Some(err) = &app.last_error {
    (format!(" ⚠  {}", err), Style::default().fg(theme.error))
  } else if let Some(status) = app.player.last_status() {
    (format!(" ♪ {}", status), Style::default().fg(theme.status))
  } else {
    (" Ready".to_string(), Style::default().fg(theme.muted))
  };
  frame.render_widget(Paragraph::new(text).style(style), area);
}

/// Horizontal scroll that keeps the cursor column inside a box `inner_w` wide.
fn input_scroll_for(cursor_col: usize, scroll: usize, inner_w: usize) -> usize {
  if inner_w == 0 {
    return cursor_col;
  }
  if cursor_col < scroll {
    cursor_col
  } else if cursor_col >= scroll + inner_w {
    cursor_col + 1 - inner_w
  } else {
    scroll
  }
}

fn render_input(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let border_color = if app.mode == AppMode::Input { theme.accent } else { theme.border };
  let input_block = Block::bordered()
    .title(" Search YouTube ")
    .title_style(Style::default().fg(border_color))
    .border_type(BorderType::Rounded)
    .border_style(Style::default().fg(border_color))
    .padding(Padding::horizontal(1));

  let inner_w = area.width.saturating_sub(4) as usize;
  let cursor_col = display_width(&app.input, app.cursor_position);

  app.input_scroll = input_scroll_for(cursor_col, app.input_scroll, inner_w);

  let visible: String = app
    .input
    .chars()
    .scan(0usize, |col, c| {
      let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
      let start = *col;
      *col += w;
      Some((start, *col, c))
    })
    .skip_while(|(_, end, _)| *end <= app.input_scroll)
    .take_while(|(start, _, _)| *start < app.input_scroll + inner_w)
    .map(|(_, _, c)| c)
    .collect();

  let paragraph = Paragraph::new(visible).style(Style::default().fg(theme.fg)).block(input_block);
  frame.render_widget(paragraph, area);

  if app.mode == AppMode::Input && inner_w > 0 {
    let cursor_x = area.x + 2 + cursor_col.saturating_sub(app.input_scroll) as u16;
    frame.set_cursor_position((cursor_x, area.y + 1));
  }
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let has_results = !app.view.cards.is_empty();
  let is_playing = app.player.is_playing();
  let can_retry = app.search.as_ref().is_some_and(|s| s.can_retry());
  let keys: Vec<(&str, &str)> = match app.mode {
    AppMode::Input => {
      let mut k = vec![("Enter", "Search"), ("^p", "Trending")];
      if can_retry {
        k.push(("^r", "Retry"));
      }
      if is_playing {
        k.push(("^s", "Stop"));
      }
      if has_results {
        k.push(("↓", "Results"));
      } else {
        k.push(("Esc", "Quit"));
      }
      k
    }
    AppMode::Results => {
      let mut k = vec![("Enter", "Play"), ("o", "Browser"), ("j/k", "Navigate")];
      if app.view.load_more_visible {
        k.push(("m", "More"));
      }
      k.push(("s", "Sort"));
      k.push(("1-9", "Category"));
      if is_playing {
        let pause_label = if app.player.paused { "Resume" } else { "Pause" };
        k.push(("Space", pause_label));
        k.push(("^s", "Stop"));
      }
      k.push(("Esc", "Search"));
      k
    }
  };

  let spans: Vec<Span> = keys
    .iter()
    .enumerate()
    .flat_map(|(i, (key, action))| {
      let mut s = vec![
        Span::styled(format!(" {} ", key), Style::default().fg(theme.key_fg).bg(theme.key_bg)),
        Span::styled(format!(" {} ", action), Style::default().fg(theme.muted)),
      ];
      if i < keys.len() - 1 {
        s.push(Span::raw("  "));
      }
      s
    })
    .collect();

  frame.render_widget(Line::from(spans), area);
}
