mod app;
mod config;
mod constants;
mod input;
mod player;
mod results;
mod search;
mod theme;
mod ui;
mod youtube;

use anyhow::{Context, Result, bail};
use clap::{CommandFactory, Parser, ValueEnum};
use ratatui::{
  DefaultTerminal,
  crossterm::event::{self, Event, KeyEventKind},
};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use app::App;
use config::Config;
use constants::constants;
use results::ResultsView;
use search::{QueryController, SearchEvent};
use youtube::{ApiEndpoint, ApiKey, SortOrder, YouTubeClient};

// --- CLI ---

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum PrintFormat {
  #[default]
  Text,
  Html,
}

#[derive(Parser, Debug)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about, long_about = None)]
struct Args {
  /// YouTube Data API v3 key (overrides YOUTUBE_API_KEY and prefs.toml)
  #[arg(long)]
  api_key: Option<String>,

  /// Region code for the trending chart, e.g. 'US' or 'GB'
  #[arg(long)]
  region: Option<String>,

  /// Sort order for keyword searches
  #[arg(long, value_enum)]
  order: Option<SortOrder>,

  /// Color theme: 'dark' or 'light'
  #[arg(long)]
  theme: Option<String>,

  /// Search non-interactively and print the result cards instead of starting the TUI
  #[arg(long, value_name = "QUERY")]
  print: Option<String>,

  /// Number of pages to fetch in --print mode
  #[arg(long, default_value_t = 1, requires = "print", value_parser = clap::value_parser!(u32).range(1..))]
  pages: u32,

  /// Output format for --print
  #[arg(long, value_enum, default_value_t = PrintFormat::Text, requires = "print")]
  format: PrintFormat,

  /// Print shell completions and exit
  #[arg(long, value_name = "SHELL")]
  completions: Option<clap_complete::Shell>,
}

// --- Setup ---

/// Log to a daily file; the terminal belongs to the TUI (or to --print output).
fn init_tracing() -> Result<WorkerGuard> {
  let dir = config::log_dir();
  std::fs::create_dir_all(&dir).with_context(|| format!("Failed to create log directory {}", dir.display()))?;
  let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(&dir, "vidstream.log"));
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vidstream=info"));
  tracing_subscriber::fmt().with_env_filter(filter).with_writer(writer).with_ansi(false).init();
  Ok(guard)
}

/// Build the query controller, or `None` when no usable API key is configured.
fn build_controller(args: &Args, config: &Config) -> Result<Option<QueryController>> {
  let raw_key = config::resolve_api_key(args.api_key.clone(), std::env::var("YOUTUBE_API_KEY").ok(), config);
  let key = match ApiKey::parse(raw_key.as_deref()) {
    Ok(key) => key,
    Err(e) => {
      warn!(err = %e, "no usable API key");
      return Ok(None);
    }
  };
  let c = constants();
  let endpoint = ApiEndpoint::new(&c.api_base_url, key, c.page_size).context("Invalid API base URL")?;
  let client = YouTubeClient::new().context("Failed to build HTTP client")?;
  let region = args.region.clone().or_else(|| config.region_code.clone()).unwrap_or_else(|| c.default_region.clone());
  let order = args.order.or_else(|| config.sort_order.as_deref().map(SortOrder::from_config)).unwrap_or_default();
  Ok(Some(QueryController::new(Arc::new(client), endpoint, region, order)))
}

// --- Main ---

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  if let Some(shell) = args.completions {
    clap_complete::generate(shell, &mut Args::command(), "vidstream", &mut std::io::stdout());
    return Ok(());
  }

  let _log_guard = init_tracing()?;
  info!(version = env!("CARGO_PKG_VERSION"), "starting");

  let config = Config::load();
  let search = build_controller(&args, &config)?;

  if let Some(query) = args.print.as_deref() {
    let Some(search) = search else { bail!(youtube::FetchError::Configuration) };
    let view = collect_pages(search, query, args.pages).await?;
    return write_view(&view, args.format, &mut std::io::stdout().lock());
  }

  let theme_index = theme::theme_index(args.theme.as_deref().or(config.theme_name.as_deref()));

  let default_hook = std::panic::take_hook();
  std::panic::set_hook(Box::new(move |info| {
    ratatui::restore();
    default_hook(info);
  }));

  let mut terminal = ratatui::init();
  let result = run(&mut terminal, App::new(search, theme_index, config)).await;
  ratatui::restore();
  result
}

async fn run(terminal: &mut DefaultTerminal, mut app: App) -> Result<()> {
  app.trigger_trending();

  loop {
    app.check_pending();
    app.player.poll();
    app.expire_error();

    terminal.draw(|frame| ui::ui(frame, &mut app))?;

    if event::poll(Duration::from_millis(100))? {
      match event::read()? {
        Event::Key(key) if key.kind == KeyEventKind::Press => {
          input::handle_key_event(&mut app, key).await?;
        }
        _ => {}
      }
    }

    if app.should_quit {
      break;
    }
  }

  app.player.stop().await?;
  info!("exiting");
  Ok(())
}

/// Fetch up to `pages` pages of `query` into a results view. Stops early when
/// pagination ends; every started request is awaited.
async fn collect_pages(mut search: QueryController, query: &str, pages: u32) -> Result<ResultsView> {
  if !search.start_search(query) {
    bail!("Enter a search term.");
  }
  let mut view = ResultsView::default();
  view.begin(format!("Search results for \"{}\"", query.trim()));

  let mut fetched = 0;
  while let Some(event) = search.settle().await {
    fetched += 1;
    match event {
      SearchEvent::Loaded { page, append } => view.show_page(&page, append, chrono::Utc::now()),
      SearchEvent::NoResults { has_more, append, .. } => view.show_no_results(append, has_more),
      SearchEvent::Failed { error, .. } => bail!(error),
    }
    if fetched >= pages || !search.load_next_page() {
      break;
    }
  }
  Ok(view)
}

fn write_view(view: &ResultsView, format: PrintFormat, out: &mut impl Write) -> Result<()> {
  match format {
    PrintFormat::Html => write!(out, "{}", view.to_html())?,
    PrintFormat::Text => {
      if view.cards.is_empty() {
        writeln!(out, "No videos found")?;
      }
      if let Some(count) = view.results_count_label() {
        writeln!(out, "{}\n", count)?;
      }
      for card in &view.cards {
        writeln!(out, "{}\n  {}  {}\n  {}", card.title, card.channel, card.meta_line(), card.embed_url)?;
      }
    }
  }
  Ok(())
}
