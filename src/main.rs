mod config;
mod pager;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use x11rb::connection::Connection;

use crate::config::Config;
use crate::pager::grid::Orientation;
use crate::pager::{events, Pager, Rect};

#[derive(Debug, Parser)]
#[command(name = "minipager", version, about = "Miniature EWMH desktop pager")]
struct Cli {
    /// Grid rows (0 = derive from the desktop count)
    #[arg(short, long)]
    rows: Option<u16>,

    /// Grid columns (0 = derive from the desktop count)
    #[arg(short, long)]
    columns: Option<u16>,

    /// Corner holding desktop 0: top-left, top-right, bottom-left, bottom-right
    #[arg(long)]
    corner: Option<String>,

    /// Fill columns first instead of rows
    #[arg(short, long)]
    vertical: bool,

    /// Initial pager geometry, e.g. 58x58+0+0
    #[arg(short, long)]
    geometry: Option<String>,

    /// Do not draw client icons on the proxies
    #[arg(long)]
    no_icons: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let cli = Cli::parse();
    let config = Config::load();

    let mut policy = config.grid_policy();
    if let Some(rows) = cli.rows {
        policy.rows = rows;
    }
    if let Some(columns) = cli.columns {
        policy.cols = columns;
    }
    if cli.vertical {
        policy.orientation = Orientation::Vertical;
    }
    if let Some(corner) = &cli.corner {
        policy.corner = config::parse_corner(corner);
    }

    let mut geometry = Rect {
        x: config.geometry.x,
        y: config.geometry.y,
        width: config.geometry.width.max(1),
        height: config.geometry.height.max(1),
    };
    if let Some(spec) = &cli.geometry {
        match parse_geometry(spec) {
            Some((width, height, x, y)) => {
                geometry = Rect {
                    x,
                    y,
                    width: width.max(1),
                    height: height.max(1),
                }
            }
            None => warn!(geometry = %spec, "unparsable geometry, using configured size"),
        }
    }
    let draw_icons = config.icons.draw && !cli.no_icons;

    let (conn, screen_num) = x11rb::connect(None).context("cannot connect to the X display")?;
    let mut pager = Pager::new(
        &conn,
        screen_num,
        policy,
        config.style(),
        config.borders(),
        geometry,
        draw_icons,
    )?;
    pager.sync(&conn)?;

    while pager.running {
        let event = conn.wait_for_event()?;
        events::handle(&mut pager, &conn, &event)?;
        conn.flush()?;
    }

    pager.shutdown(&conn)?;
    Ok(())
}

/// Parse an X-style `WIDTHxHEIGHT[+X+Y]` geometry specification.
fn parse_geometry(spec: &str) -> Option<(u16, u16, i16, i16)> {
    let (size, offsets) = match spec.find(['+', '-']) {
        Some(i) => (&spec[..i], &spec[i..]),
        None => (spec, ""),
    };
    let (w, h) = size.split_once('x')?;
    let width: u16 = w.parse().ok()?;
    let height: u16 = h.parse().ok()?;
    let (mut x, mut y) = (0i16, 0i16);
    if !offsets.is_empty() {
        let second = offsets[1..].find(['+', '-']).map(|i| i + 1)?;
        x = offsets[..second].parse().ok()?;
        y = offsets[second..].parse().ok()?;
    }
    Some((width, height, x, y))
}

#[cfg(test)]
mod tests {
    use super::parse_geometry;

    #[test]
    fn geometry_size_only() {
        assert_eq!(parse_geometry("58x58"), Some((58, 58, 0, 0)));
    }

    #[test]
    fn geometry_with_offsets() {
        assert_eq!(parse_geometry("120x68+10+20"), Some((120, 68, 10, 20)));
        assert_eq!(parse_geometry("120x68-10+20"), Some((120, 68, -10, 20)));
        assert_eq!(parse_geometry("120x68+10-20"), Some((120, 68, 10, -20)));
    }

    #[test]
    fn geometry_rejects_garbage() {
        assert_eq!(parse_geometry("120"), None);
        assert_eq!(parse_geometry("x"), None);
        assert_eq!(parse_geometry("120x68+5"), None);
        assert_eq!(parse_geometry("axb"), None);
    }
}
