//! TOML configuration, loaded from `~/.config/minipager/config.toml`.
//!
//! Every field is optional; unknown or malformed values fall back to the
//! defaults with a warning rather than aborting.

use std::path::PathBuf;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::pager::draw::{parse_color, DesktopColors, SchemeColors, Style};
use crate::pager::grid::{Corner, GridPolicy, Orientation};
use crate::pager::Borders;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub grid: GridSection,
    pub geometry: GeometrySection,
    pub borders: BordersSection,
    pub colors: ColorsSection,
    pub icons: IconsSection,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GridSection {
    /// 0 means "derive from the desktop count".
    pub rows: u16,
    pub columns: u16,
    /// Fill columns first instead of rows.
    pub vertical: bool,
    /// One of top-left, top-right, bottom-left, bottom-right.
    pub corner: String,
}

impl Default for GridSection {
    fn default() -> Self {
        Self {
            rows: 0,
            columns: 2,
            vertical: false,
            corner: "top-left".into(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GeometrySection {
    pub x: i16,
    pub y: i16,
    pub width: u16,
    pub height: u16,
}

impl Default for GeometrySection {
    fn default() -> Self {
        Self {
            x: 0,
            y: 0,
            width: 58,
            height: 58,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BordersSection {
    pub frame: u16,
    pub border: u16,
    pub shadow: u16,
    pub separator: u16,
}

impl Default for BordersSection {
    fn default() -> Self {
        Self {
            frame: 1,
            border: 1,
            shadow: 1,
            separator: 1,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ColorsSection {
    pub active_background: String,
    pub active_border: String,
    pub active_top_shadow: String,
    pub active_bottom_shadow: String,
    pub urgent_background: String,
    pub urgent_border: String,
    pub urgent_top_shadow: String,
    pub urgent_bottom_shadow: String,
    pub inactive_background: String,
    pub inactive_border: String,
    pub inactive_top_shadow: String,
    pub inactive_bottom_shadow: String,
    pub desktop_background: String,
    pub desktop_current: String,
    pub separator: String,
    pub desktop_top_shadow: String,
    pub desktop_bottom_shadow: String,
}

impl Default for ColorsSection {
    fn default() -> Self {
        Self {
            active_background: "#000000".into(),
            active_border: "#616161".into(),
            active_top_shadow: "#B6B6B6".into(),
            active_bottom_shadow: "#616161".into(),
            urgent_background: "#FC6161".into(),
            urgent_border: "#9B1D1D".into(),
            urgent_top_shadow: "#F7D9D9".into(),
            urgent_bottom_shadow: "#9B1D1D".into(),
            inactive_background: "#AAAAAA".into(),
            inactive_border: "#555555".into(),
            inactive_top_shadow: "#FFFFFF".into(),
            inactive_bottom_shadow: "#555555".into(),
            desktop_background: "#121212".into(),
            desktop_current: "#505075".into(),
            separator: "#000000".into(),
            desktop_top_shadow: "#000000".into(),
            desktop_bottom_shadow: "#FFFFFF".into(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct IconsSection {
    pub draw: bool,
}

impl Default for IconsSection {
    fn default() -> Self {
        Self { draw: true }
    }
}

impl Config {
    pub fn load() -> Self {
        match Self::path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => {
                debug!("no config file, using defaults");
                Self::default()
            }
        }
    }

    fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("minipager").join("config.toml"))
    }

    fn load_from(path: &std::path::Path) -> Self {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) => {
                warn!(path = %path.display(), %err, "cannot read config, using defaults");
                return Self::default();
            }
        };
        Self::parse(&text)
    }

    fn parse(text: &str) -> Self {
        match toml::from_str(text) {
            Ok(config) => config,
            Err(err) => {
                warn!(%err, "malformed config, using defaults");
                Self::default()
            }
        }
    }

    pub fn grid_policy(&self) -> GridPolicy {
        GridPolicy {
            rows: self.grid.rows,
            cols: self.grid.columns,
            orientation: if self.grid.vertical {
                Orientation::Vertical
            } else {
                Orientation::Horizontal
            },
            corner: parse_corner(&self.grid.corner),
        }
    }

    pub fn borders(&self) -> Borders {
        Borders {
            frame: self.borders.frame,
            border: self.borders.border,
            shadow: self.borders.shadow,
            separator: self.borders.separator,
        }
    }

    pub fn style(&self) -> Style {
        let c = &self.colors;
        Style {
            windows: [
                SchemeColors {
                    background: parse_color(&c.active_background, 0x000000),
                    border: parse_color(&c.active_border, 0x616161),
                    top_shadow: parse_color(&c.active_top_shadow, 0xB6B6B6),
                    bottom_shadow: parse_color(&c.active_bottom_shadow, 0x616161),
                },
                SchemeColors {
                    background: parse_color(&c.urgent_background, 0xFC6161),
                    border: parse_color(&c.urgent_border, 0x9B1D1D),
                    top_shadow: parse_color(&c.urgent_top_shadow, 0xF7D9D9),
                    bottom_shadow: parse_color(&c.urgent_bottom_shadow, 0x9B1D1D),
                },
                SchemeColors {
                    background: parse_color(&c.inactive_background, 0xAAAAAA),
                    border: parse_color(&c.inactive_border, 0x555555),
                    top_shadow: parse_color(&c.inactive_top_shadow, 0xFFFFFF),
                    bottom_shadow: parse_color(&c.inactive_bottom_shadow, 0x555555),
                },
            ],
            desktop: DesktopColors {
                background: parse_color(&c.desktop_background, 0x121212),
                current: parse_color(&c.desktop_current, 0x505075),
                separator: parse_color(&c.separator, 0x000000),
                top_shadow: parse_color(&c.desktop_top_shadow, 0x000000),
                bottom_shadow: parse_color(&c.desktop_bottom_shadow, 0xFFFFFF),
            },
        }
    }
}

pub fn parse_corner(name: &str) -> Corner {
    match name {
        "top-left" => Corner::TopLeft,
        "top-right" => Corner::TopRight,
        "bottom-left" => Corner::BottomLeft,
        "bottom-right" => Corner::BottomRight,
        other => {
            warn!(corner = other, "unknown corner, using top-left");
            Corner::TopLeft
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_config() {
        let config = Config::parse(
            r##"
            [grid]
            rows = 2
            columns = 3
            corner = "bottom-right"

            [colors]
            active_background = "#112233"
            "##,
        );
        assert_eq!(config.grid.rows, 2);
        assert_eq!(config.grid.columns, 3);
        assert_eq!(config.grid_policy().corner, Corner::BottomRight);
        assert_eq!(config.colors.active_background, "#112233");
        // untouched sections keep their defaults
        assert_eq!(config.geometry.width, 58);
        assert!(config.icons.draw);
    }

    #[test]
    fn malformed_config_falls_back_to_defaults() {
        let config = Config::parse("[grid\nrows = ");
        assert_eq!(config.grid.columns, 2);
    }

    #[test]
    fn unknown_corner_falls_back() {
        assert_eq!(parse_corner("middle"), Corner::TopLeft);
    }

    #[test]
    fn all_corners_parse() {
        assert_eq!(parse_corner("top-left"), Corner::TopLeft);
        assert_eq!(parse_corner("top-right"), Corner::TopRight);
        assert_eq!(parse_corner("bottom-left"), Corner::BottomLeft);
        assert_eq!(parse_corner("bottom-right"), Corner::BottomRight);
    }
}
