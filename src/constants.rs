//! Application constants loaded from `constants.ron` at compile time.
//!
//! The RON file is embedded via `include_str!`, so there is no runtime file I/O.
//! Parsed once on first access via `LazyLock`.

use serde::Deserialize;
use std::sync::LazyLock;

/// All tuneable application constants.
#[derive(Debug, Deserialize)]
pub struct Constants {
  // YouTube Data API v3
  pub api_base_url: String,
  pub api_key_placeholder: String,
  pub min_api_key_len: usize,

  // Paging
  pub page_size: u32,
  pub default_region: String,
  pub request_timeout_secs: u64,
  /// Quick-search presets, selectable with the number keys.
  pub categories: Vec<String>,

  // Player
  pub embed_url_base: String,
  pub watch_url_base: String,

  // UI
  pub error_dismiss_secs: u64,
}

static CONSTANTS: LazyLock<Constants> = LazyLock::new(|| {
  // Safety: the RON file is embedded at compile time; if it's malformed this is a build-time error.
  ron::from_str(include_str!("../constants.ron")).expect("constants.ron must be valid RON (embedded at compile time)")
});

/// Returns a reference to the parsed application constants.
pub fn constants() -> &'static Constants {
  &CONSTANTS
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn embedded_constants_parse() {
    let c = constants();
    assert_eq!(c.page_size, 24);
    assert!(c.api_base_url.starts_with("https://"));
    assert!(!c.api_key_placeholder.is_empty());
    assert!((1..=9).contains(&c.categories.len()));
  }
}
