//! XRender-backed drawing: solid fills, shadowed 3-D relief, icon
//! compositing and background pixmaps for cells and proxies.

use std::collections::HashMap;

use anyhow::{Context as _, Result};
use tracing::warn;
use x11rb::connection::Connection;
use x11rb::protocol::render::{
    Color, ConnectionExt as _, CreatePictureAux, PictOp, PictType, Pictformat, Picture, Repeat,
    Transform,
};
use x11rb::protocol::xproto::{
    ChangeWindowAttributesAux, ConnectionExt as _, CreateGCAux, ImageFormat, ImageOrder, Pixmap,
    Rectangle, Screen, Window,
};

use crate::pager::client::{Client, ClientFlags};
use crate::pager::grid::DesktopGrid;
use crate::pager::props::{Icon, ICON_SIZE};
use crate::pager::Rect;

/// Visual style of a client proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Active = 0,
    Urgent = 1,
    Inactive = 2,
}

impl Scheme {
    pub fn for_client(client: &Client, active: Option<Window>) -> Self {
        if client.flags.contains(ClientFlags::URGENT) {
            Scheme::Urgent
        } else if active == Some(client.window) {
            Scheme::Active
        } else {
            Scheme::Inactive
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SchemeColors {
    pub background: Color,
    pub border: Color,
    pub top_shadow: Color,
    pub bottom_shadow: Color,
}

#[derive(Debug, Clone, Copy)]
pub struct DesktopColors {
    pub background: Color,
    pub current: Color,
    pub separator: Color,
    pub top_shadow: Color,
    pub bottom_shadow: Color,
}

/// All colors, parsed once from the config.
#[derive(Debug, Clone, Copy)]
pub struct Style {
    pub windows: [SchemeColors; 3],
    pub desktop: DesktopColors,
}

/// Parse a `#RRGGBB` string into a render color, falling back (with a
/// warning) to `fallback` on anything malformed.
pub fn parse_color(spec: &str, fallback: u32) -> Color {
    let rgb = spec
        .strip_prefix('#')
        .filter(|hex| hex.len() == 6)
        .and_then(|hex| u32::from_str_radix(hex, 16).ok())
        .unwrap_or_else(|| {
            warn!(color = spec, "unparsable color, using default");
            fallback
        });
    rgb_color(rgb)
}

fn rgb_color(rgb: u32) -> Color {
    let scale = |c: u32| ((c & 0xFF) * 0x101) as u16;
    Color {
        red: scale(rgb >> 16),
        green: scale(rgb >> 8),
        blue: scale(rgb),
        alpha: 0xFFFF,
    }
}

struct Solid {
    pixmap: Pixmap,
    picture: Picture,
}

/// Owns the picture formats, the per-color solid fills and the per-client
/// icon pictures.
pub struct Painter {
    root: Window,
    depth: u8,
    window_format: Pictformat,
    argb_format: Pictformat,
    style: Style,
    shadow: u16,
    scheme_borders: [Solid; 3],
    desktop_background: Solid,
    desktop_current: Solid,
    icons: HashMap<Window, Picture>,
}

impl Painter {
    pub fn new<C: Connection>(
        conn: &C,
        screen: &Screen,
        style: Style,
        shadow: u16,
    ) -> Result<Self> {
        let formats = conn.render_query_pict_formats()?.reply()?;
        let window_format = formats
            .screens
            .iter()
            .flat_map(|s| &s.depths)
            .flat_map(|d| &d.visuals)
            .find(|v| v.visual == screen.root_visual)
            .map(|v| v.format)
            .context("no picture format for the root visual")?;
        let argb_format = formats
            .formats
            .iter()
            .find(|f| {
                f.type_ == PictType::DIRECT
                    && f.depth == 32
                    && f.direct.alpha_mask == 0xFF
                    && f.direct.alpha_shift == 24
            })
            .map(|f| f.id)
            .context("no ARGB32 picture format")?;
        let solid = |color: Color| -> Result<Solid> {
            let pixmap = conn.generate_id()?;
            conn.create_pixmap(screen.root_depth, pixmap, screen.root, 1, 1)?;
            let picture = conn.generate_id()?;
            conn.render_create_picture(
                picture,
                pixmap,
                window_format,
                &CreatePictureAux::new().repeat(Repeat::NORMAL),
            )?;
            conn.render_fill_rectangles(
                PictOp::SRC,
                picture,
                color,
                &[Rectangle {
                    x: 0,
                    y: 0,
                    width: 1,
                    height: 1,
                }],
            )?;
            Ok(Solid { pixmap, picture })
        };
        Ok(Self {
            root: screen.root,
            depth: screen.root_depth,
            window_format,
            argb_format,
            shadow,
            scheme_borders: [
                solid(style.windows[0].border)?,
                solid(style.windows[1].border)?,
                solid(style.windows[2].border)?,
            ],
            desktop_background: solid(style.desktop.background)?,
            desktop_current: solid(style.desktop.current)?,
            style,
            icons: HashMap::new(),
        })
    }

    /// Repaint the pager window background: separator fill plus the outer
    /// relief of the frame.
    pub fn draw_frame<C: Connection>(&self, conn: &C, window: Window, geom: Rect) -> Result<()> {
        let (width, height) = (geom.width.max(1), geom.height.max(1));
        let (pixmap, picture) = self.surface(conn, width, height)?;
        conn.render_fill_rectangles(
            PictOp::SRC,
            picture,
            self.style.desktop.separator,
            &[Rectangle {
                x: 0,
                y: 0,
                width,
                height,
            }],
        )?;
        self.draw_shadows(
            conn,
            picture,
            self.style.desktop.top_shadow,
            self.style.desktop.bottom_shadow,
            width,
            height,
        )?;
        conn.change_window_attributes(
            window,
            &ChangeWindowAttributesAux::new().background_pixmap(pixmap),
        )?;
        conn.clear_area(false, window, 0, 0, 0, 0)?;
        conn.render_free_picture(picture)?;
        conn.free_pixmap(pixmap)?;
        Ok(())
    }

    /// Set every cell's background, highlighting the current desktop.
    pub fn draw_desktops<C: Connection>(
        &self,
        conn: &C,
        grid: &DesktopGrid,
        current: u32,
    ) -> Result<()> {
        for (i, cell) in grid.cells().iter().enumerate() {
            let solid = if i as u32 == current {
                &self.desktop_current
            } else {
                &self.desktop_background
            };
            conn.change_window_attributes(
                cell.window,
                &ChangeWindowAttributesAux::new().background_pixmap(solid.pixmap),
            )?;
            conn.clear_area(false, cell.window, 0, 0, 0, 0)?;
        }
        Ok(())
    }

    /// Repaint every proxy of one client with the given scheme.
    pub fn draw_client<C: Connection>(
        &mut self,
        conn: &C,
        client: &Client,
        scheme: Scheme,
        draw_icons: bool,
    ) -> Result<()> {
        let colors = self.style.windows[scheme as usize];
        let border = self.scheme_borders[scheme as usize].pixmap;
        let icon = if draw_icons {
            self.icon_picture(conn, client)?
        } else {
            None
        };
        for proxy in &client.proxies {
            let (width, height) = (proxy.rect.width.max(1), proxy.rect.height.max(1));
            let (pixmap, picture) = self.surface(conn, width, height)?;
            conn.render_fill_rectangles(
                PictOp::SRC,
                picture,
                colors.background,
                &[Rectangle {
                    x: 0,
                    y: 0,
                    width,
                    height,
                }],
            )?;
            if let Some(icon) = icon {
                let dx = (i32::from(width) - i32::from(ICON_SIZE)) / 2;
                let dy = (i32::from(height) - i32::from(ICON_SIZE)) / 2;
                conn.render_composite(
                    PictOp::OVER,
                    icon,
                    x11rb::NONE,
                    picture,
                    0,
                    0,
                    0,
                    0,
                    dx.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16,
                    dy.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16,
                    ICON_SIZE,
                    ICON_SIZE,
                )?;
            }
            self.draw_shadows(
                conn,
                picture,
                colors.top_shadow,
                colors.bottom_shadow,
                width,
                height,
            )?;
            conn.change_window_attributes(
                proxy.window,
                &ChangeWindowAttributesAux::new()
                    .background_pixmap(pixmap)
                    .border_pixmap(border),
            )?;
            conn.clear_area(false, proxy.window, 0, 0, 0, 0)?;
            conn.render_free_picture(picture)?;
            conn.free_pixmap(pixmap)?;
        }
        Ok(())
    }

    /// Drop the cached icon picture for a client whose `_NET_WM_ICON`
    /// changed or which went away.
    pub fn forget_icon<C: Connection>(&mut self, conn: &C, window: Window) -> Result<()> {
        if let Some(picture) = self.icons.remove(&window) {
            conn.render_free_picture(picture)?;
        }
        Ok(())
    }

    /// Free every server-side resource the painter owns.
    pub fn release<C: Connection>(&mut self, conn: &C) -> Result<()> {
        for (_, picture) in self.icons.drain() {
            conn.render_free_picture(picture)?;
        }
        for solid in self
            .scheme_borders
            .iter()
            .chain([&self.desktop_background, &self.desktop_current])
        {
            conn.render_free_picture(solid.picture)?;
            conn.free_pixmap(solid.pixmap)?;
        }
        Ok(())
    }

    fn surface<C: Connection>(
        &self,
        conn: &C,
        width: u16,
        height: u16,
    ) -> Result<(Pixmap, Picture)> {
        let pixmap = conn.generate_id()?;
        conn.create_pixmap(self.depth, pixmap, self.root, width, height)?;
        let picture = conn.generate_id()?;
        conn.render_create_picture(picture, pixmap, self.window_format, &CreatePictureAux::new())?;
        Ok((pixmap, picture))
    }

    /// Light lines along the top/left edges, dark ones along bottom/right.
    fn draw_shadows<C: Connection>(
        &self,
        conn: &C,
        picture: Picture,
        light: Color,
        dark: Color,
        width: u16,
        height: u16,
    ) -> Result<()> {
        let (w, h) = (i32::from(width), i32::from(height));
        let mut lights = Vec::new();
        let mut darks = Vec::new();
        for i in 0..i32::from(self.shadow) {
            if 2 * i + 1 > w || 2 * i + 1 > h {
                break;
            }
            lights.push(Rectangle {
                x: i as i16,
                y: i as i16,
                width: 1,
                height: (h - (2 * i + 1)) as u16,
            });
            lights.push(Rectangle {
                x: i as i16,
                y: i as i16,
                width: (w - (2 * i + 1)) as u16,
                height: 1,
            });
            darks.push(Rectangle {
                x: (w - 1 - i) as i16,
                y: i as i16,
                width: 1,
                height: (h - 2 * i) as u16,
            });
            darks.push(Rectangle {
                x: i as i16,
                y: (h - 1 - i) as i16,
                width: (w - 2 * i) as u16,
                height: 1,
            });
        }
        if !lights.is_empty() {
            conn.render_fill_rectangles(PictOp::SRC, picture, light, &lights)?;
        }
        if !darks.is_empty() {
            conn.render_fill_rectangles(PictOp::SRC, picture, dark, &darks)?;
        }
        Ok(())
    }

    /// Upload a client's icon as an ARGB32 picture, scaled to the proxy
    /// icon size, caching the result per client window.
    fn icon_picture<C: Connection>(
        &mut self,
        conn: &C,
        client: &Client,
    ) -> Result<Option<Picture>> {
        if let Some(&picture) = self.icons.get(&client.window) {
            return Ok(Some(picture));
        }
        let Some(icon) = &client.icon else {
            return Ok(None);
        };
        let picture = self.upload_icon(conn, icon)?;
        self.icons.insert(client.window, picture);
        Ok(Some(picture))
    }

    fn upload_icon<C: Connection>(&self, conn: &C, icon: &Icon) -> Result<Picture> {
        let le = conn.setup().image_byte_order == ImageOrder::LSB_FIRST;
        let mut bytes = Vec::with_capacity(icon.pixels.len() * 4);
        for &pixel in &icon.pixels {
            if le {
                bytes.extend_from_slice(&pixel.to_le_bytes());
            } else {
                bytes.extend_from_slice(&pixel.to_be_bytes());
            }
        }
        let pixmap = conn.generate_id()?;
        conn.create_pixmap(32, pixmap, self.root, icon.width, icon.height)?;
        let gc = conn.generate_id()?;
        conn.create_gc(gc, pixmap, &CreateGCAux::new())?;
        conn.put_image(
            ImageFormat::Z_PIXMAP,
            pixmap,
            gc,
            icon.width,
            icon.height,
            0,
            0,
            0,
            32,
            &bytes,
        )?;
        conn.free_gc(gc)?;
        let picture = conn.generate_id()?;
        conn.render_create_picture(picture, pixmap, self.argb_format, &CreatePictureAux::new())?;
        conn.free_pixmap(pixmap)?;
        let edge = icon.width.max(icon.height);
        if edge != ICON_SIZE {
            // map destination pixels back to source: scale by edge/ICON_SIZE
            let scale = ((i64::from(edge) << 16) / i64::from(ICON_SIZE)) as i32;
            conn.render_set_picture_transform(
                picture,
                Transform {
                    matrix11: scale,
                    matrix12: 0,
                    matrix13: 0,
                    matrix21: 0,
                    matrix22: scale,
                    matrix23: 0,
                    matrix31: 0,
                    matrix32: 0,
                    matrix33: 1 << 16,
                },
            )?;
            conn.render_set_picture_filter(picture, b"bilinear", &[])?;
        }
        Ok(picture)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_color_accepts_hex() {
        let c = parse_color("#FF8000", 0);
        assert_eq!((c.red, c.green, c.blue), (0xFFFF, 0x8080, 0x0000));
        assert_eq!(c.alpha, 0xFFFF);
    }

    #[test]
    fn parse_color_falls_back_on_garbage() {
        let c = parse_color("bogus", 0x123456);
        assert_eq!((c.red, c.green, c.blue), (0x1212, 0x3434, 0x5656));
        let c = parse_color("#12345", 0xFFFFFF);
        assert_eq!(c.red, 0xFFFF);
    }
}
