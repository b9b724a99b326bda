use ratatui::style::Color;

pub struct Theme {
  pub name: &'static str,
  pub bg: Color,
  pub fg: Color,
  pub muted: Color,
  pub accent: Color,
  pub border: Color,
  pub highlight_fg: Color,
  pub highlight_bg: Color,
  pub stripe_bg: Color,
  pub status: Color,
  pub error: Color,
  pub key_fg: Color,
  pub key_bg: Color,
}

pub static THEMES: [Theme; 2] = [
  Theme {
    name: "dark",
    bg: Color::Rgb(15, 15, 15),
    fg: Color::Rgb(241, 241, 241),
    muted: Color::Rgb(170, 170, 170),
    accent: Color::Rgb(255, 68, 68),
    border: Color::Rgb(63, 63, 63),
    highlight_fg: Color::Rgb(255, 255, 255),
    highlight_bg: Color::Rgb(48, 48, 48),
    stripe_bg: Color::Rgb(24, 24, 24),
    status: Color::Rgb(62, 166, 255),
    error: Color::Rgb(255, 120, 100),
    key_fg: Color::Rgb(15, 15, 15),
    key_bg: Color::Rgb(170, 170, 170),
  },
  Theme {
    name: "light",
    bg: Color::Rgb(255, 255, 255),
    fg: Color::Rgb(15, 15, 15),
    muted: Color::Rgb(96, 96, 96),
    accent: Color::Rgb(204, 0, 0),
    border: Color::Rgb(220, 220, 220),
    highlight_fg: Color::Rgb(15, 15, 15),
    highlight_bg: Color::Rgb(229, 229, 229),
    stripe_bg: Color::Rgb(248, 248, 248),
    status: Color::Rgb(6, 95, 212),
    error: Color::Rgb(196, 43, 28),
    key_fg: Color::Rgb(255, 255, 255),
    key_bg: Color::Rgb(96, 96, 96),
  },
];

/// Index of the named theme, defaulting to the first.
pub fn theme_index(name: Option<&str>) -> usize {
  name.and_then(|n| THEMES.iter().position(|t| t.name.eq_ignore_ascii_case(n))).unwrap_or(0)
}
