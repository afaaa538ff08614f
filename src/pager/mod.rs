//! The pager: a live miniature of the window manager's desktops.
//!
//! All mirrored state hangs off the [`Pager`] context; the `set_*` methods
//! re-read one root or client property each and reconcile the mirror, so
//! every property-change notification maps to exactly one method.

pub mod atoms;
pub mod client;
pub mod draw;
pub mod events;
pub mod grid;
pub mod layout;
pub mod props;
pub mod xops;

use anyhow::Result;
use tracing::{debug, info};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{
    AtomEnum, ChangeWindowAttributesAux, ConnectionExt, CreateWindowAux, EventMask, PropMode,
    Timestamp, Window, WindowClass,
};
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;
use x11rb::COPY_DEPTH_FROM_PARENT;

use crate::pager::atoms::Atoms;
use crate::pager::client::{remap_client, ClientAttrs, ClientFlags, ClientRegistry, ALL_DESKTOPS};
use crate::pager::draw::{Painter, Scheme, Style};
use crate::pager::grid::{DesktopGrid, GridPolicy};
use crate::pager::xops::XOps;

/// EWMH source indication for messages from a pager.
pub(crate) const PAGER_SOURCE: u32 = 2;

/// A rectangle in X11 coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i16,
    pub y: i16,
    pub width: u16,
    pub height: u16,
}

/// Pixel widths of the chrome around cells and proxies.
#[derive(Debug, Clone, Copy)]
pub struct Borders {
    pub frame: u16,
    pub border: u16,
    pub shadow: u16,
    pub separator: u16,
}

pub struct Pager {
    pub atoms: Atoms,
    pub root: Window,
    pub root_geom: Rect,
    pub window: Window,
    pub geometry: Rect,
    pub borders: Borders,
    pub grid: DesktopGrid,
    pub registry: ClientRegistry,
    pub painter: Painter,
    pub current_desktop: u32,
    pub active: Option<Window>,
    pub showing_desktop: bool,
    pub draw_icons: bool,
    pub running: bool,
}

impl Pager {
    pub fn new(
        conn: &RustConnection,
        screen_num: usize,
        policy: GridPolicy,
        style: Style,
        borders: Borders,
        geometry: Rect,
        draw_icons: bool,
    ) -> Result<Self> {
        let screen = &conn.setup().roots[screen_num];
        let root = screen.root;
        let root_geom = Rect {
            x: 0,
            y: 0,
            width: screen.width_in_pixels,
            height: screen.height_in_pixels,
        };
        let atoms = Atoms::new(conn)?;
        conn.change_window_attributes(
            root,
            &ChangeWindowAttributesAux::new()
                .event_mask(EventMask::PROPERTY_CHANGE | EventMask::STRUCTURE_NOTIFY),
        )?;
        let window = conn.generate_id()?;
        conn.create_window(
            COPY_DEPTH_FROM_PARENT,
            window,
            root,
            geometry.x,
            geometry.y,
            geometry.width,
            geometry.height,
            0,
            WindowClass::COPY_FROM_PARENT,
            0,
            &CreateWindowAux::new().event_mask(EventMask::STRUCTURE_NOTIFY),
        )?;
        conn.change_property8(
            PropMode::REPLACE,
            window,
            AtomEnum::WM_NAME,
            AtomEnum::STRING,
            b"minipager",
        )?;
        conn.change_property8(
            PropMode::REPLACE,
            window,
            AtomEnum::WM_CLASS,
            AtomEnum::STRING,
            b"minipager\0Minipager\0",
        )?;
        conn.change_property32(
            PropMode::REPLACE,
            window,
            atoms.wm_protocols,
            AtomEnum::ATOM,
            &[atoms.wm_delete_window],
        )?;
        let painter = Painter::new(conn, screen, style, borders.shadow)?;
        debug!(window, root, "created pager window");
        Ok(Self {
            atoms,
            root,
            root_geom,
            window,
            geometry,
            borders,
            grid: DesktopGrid::new(policy),
            registry: ClientRegistry::new(),
            painter,
            current_desktop: 0,
            active: None,
            showing_desktop: false,
            draw_icons,
            running: true,
        })
    }

    /// Full resync from the root window, then map the pager.
    pub fn sync(&mut self, conn: &RustConnection) -> Result<()> {
        self.reset_desktops(conn)?;
        self.set_current_desktop(conn)?;
        self.set_clients(conn)?;
        self.set_active(conn)?;
        self.set_showing_desktop(conn)?;
        self.painter.draw_frame(conn, self.window, self.geometry)?;
        self.painter
            .draw_desktops(conn, &self.grid, self.current_desktop)?;
        conn.map_window(self.window)?;
        conn.flush()?;
        info!(
            desktops = self.grid.len(),
            clients = self.registry.iter().count(),
            "pager mapped"
        );
        Ok(())
    }

    /// Re-read `_NET_NUMBER_OF_DESKTOPS` and rebuild the grid from scratch.
    ///
    /// Desktop-count changes are a hard resync boundary: every client proxy
    /// and every cell is destroyed and recreated.
    pub fn reset_desktops(&mut self, conn: &RustConnection) -> Result<()> {
        let ndesktops =
            props::get_cardinal(conn, self.root, self.atoms.net_number_of_desktops)?.unwrap_or(0);
        debug!(ndesktops, "resetting desktop grid");
        let mut ops = XOps::new(conn);
        self.registry.clear(&mut ops)?;
        self.grid.reset(ndesktops, self.window, &mut ops)?;
        self.grid.layout(
            self.geometry,
            self.borders.frame,
            self.borders.separator,
            &mut ops,
        )?;
        if self.current_desktop >= ndesktops {
            self.current_desktop = ndesktops.saturating_sub(1);
        }
        self.publish_layout(conn)?;
        Ok(())
    }

    /// Advertise the grid shape via `_NET_DESKTOP_LAYOUT` on the root.
    pub fn publish_layout(&self, conn: &RustConnection) -> Result<()> {
        let policy = self.grid.policy();
        conn.change_property32(
            PropMode::REPLACE,
            self.root,
            self.atoms.net_desktop_layout,
            AtomEnum::CARDINAL,
            &[
                policy.orientation.layout_value(),
                u32::from(self.grid.cols()),
                u32::from(self.grid.rows()),
                policy.corner.layout_value(),
            ],
        )?;
        Ok(())
    }

    /// Reconcile the registry against `_NET_CLIENT_LIST_STACKING`.
    pub fn set_clients(&mut self, conn: &RustConnection) -> Result<()> {
        let stacking = if self.grid.is_empty() {
            Vec::new()
        } else {
            props::get_window_list(conn, self.root, self.atoms.net_client_list_stacking)?
        };
        let atoms = self.atoms;
        let (root, draw_icons) = (self.root, self.draw_icons);
        let before: Vec<Window> = self.registry.iter().map(|c| c.window).collect();
        let mut ops = XOps::new(conn);
        let outcome = self.registry.refresh(
            &stacking,
            &self.grid,
            self.root_geom,
            self.borders.border,
            &mut ops,
            |window| fetch_attrs(conn, &atoms, root, draw_icons, window),
        )?;
        for window in before {
            if self.registry.get(window).is_none() {
                self.painter.forget_icon(conn, window)?;
            }
        }
        if let Some(active) = self.active {
            if self.registry.get(active).is_none() {
                self.active = None;
            }
        }
        for window in &outcome.created {
            self.draw_client_window(conn, *window)?;
        }
        if outcome.changed {
            debug!(clients = stacking.len(), "client list changed");
            self.registry.raise_all(&mut ops)?;
            self.registry
                .remap_all(self.showing_desktop, self.grid.len(), &mut ops)?;
        }
        Ok(())
    }

    /// Re-read `_NET_CURRENT_DESKTOP` and restyle the cells on change.
    pub fn set_current_desktop(&mut self, conn: &RustConnection) -> Result<()> {
        let desktop =
            props::get_cardinal(conn, self.root, self.atoms.net_current_desktop)?.unwrap_or(0);
        if desktop != self.current_desktop {
            self.current_desktop = desktop;
            self.painter.draw_desktops(conn, &self.grid, desktop)?;
        }
        Ok(())
    }

    /// Re-read `_NET_ACTIVE_WINDOW` and restyle old and new on change.
    pub fn set_active(&mut self, conn: &RustConnection) -> Result<()> {
        let active = props::get_window_list(conn, self.root, self.atoms.net_active_window)?
            .into_iter()
            .next()
            .filter(|&w| w != x11rb::NONE);
        if active != self.active {
            let old = self.active;
            self.active = active;
            if let Some(window) = old {
                self.draw_client_window(conn, window)?;
            }
            if let Some(window) = active {
                self.draw_client_window(conn, window)?;
            }
        }
        Ok(())
    }

    /// Re-read `_NET_SHOWING_DESKTOP`; all proxies hide while it is set.
    pub fn set_showing_desktop(&mut self, conn: &RustConnection) -> Result<()> {
        let showing =
            props::get_cardinal(conn, self.root, self.atoms.net_showing_desktop)?.unwrap_or(0) != 0;
        if showing != self.showing_desktop {
            self.showing_desktop = showing;
            let mut ops = XOps::new(conn);
            self.registry.remap_all(showing, self.grid.len(), &mut ops)?;
        }
        Ok(())
    }

    /// `_NET_WM_STATE` changed on a client: hidden, sticky and urgency may
    /// all have moved.
    pub fn on_client_state(&mut self, conn: &RustConnection, window: Window) -> Result<()> {
        if self.registry.get(window).is_none() {
            return Ok(());
        }
        let desktop = fetch_desktop(conn, &self.atoms, window)?;
        let hidden = props::has_state(
            conn,
            window,
            self.atoms.net_wm_state,
            self.atoms.net_wm_state_hidden,
        )?;
        let urgent = fetch_urgent(conn, &self.atoms, window)?;
        let mut ops = XOps::new(conn);
        self.registry.set_client_desktop(
            window,
            desktop,
            &self.grid,
            self.root_geom,
            self.borders.border,
            &mut ops,
        )?;
        if let Some(client) = self.registry.get_mut(window) {
            client.flags.set(ClientFlags::HIDDEN, hidden);
            client.flags.set(ClientFlags::URGENT, urgent);
        }
        self.draw_client_window(conn, window)?;
        self.remap_client_window(conn, window)?;
        Ok(())
    }

    /// `_NET_WM_DESKTOP` changed on a client.
    pub fn on_client_desktop(&mut self, conn: &RustConnection, window: Window) -> Result<()> {
        let desktop = fetch_desktop(conn, &self.atoms, window)?;
        let mut ops = XOps::new(conn);
        let moved = self.registry.set_client_desktop(
            window,
            desktop,
            &self.grid,
            self.root_geom,
            self.borders.border,
            &mut ops,
        )?;
        if moved {
            self.draw_client_window(conn, window)?;
            self.remap_client_window(conn, window)?;
        }
        Ok(())
    }

    /// WM_HINTS changed: only the urgency flag matters here.
    pub fn on_client_hints(&mut self, conn: &RustConnection, window: Window) -> Result<()> {
        let urgent = fetch_urgent(conn, &self.atoms, window)?;
        let Some(client) = self.registry.get_mut(window) else {
            return Ok(());
        };
        if client.flags.contains(ClientFlags::URGENT) != urgent {
            client.flags.set(ClientFlags::URGENT, urgent);
            self.draw_client_window(conn, window)?;
        }
        Ok(())
    }

    /// `_NET_WM_ICON` changed: refetch and repaint.
    pub fn on_client_icon(&mut self, conn: &RustConnection, window: Window) -> Result<()> {
        if self.registry.get(window).is_none() {
            return Ok(());
        }
        self.painter.forget_icon(conn, window)?;
        let icon = props::get_icon(conn, window, self.atoms.net_wm_icon)?;
        if let Some(client) = self.registry.get_mut(window) {
            client.icon = icon;
        }
        self.draw_client_window(conn, window)?;
        Ok(())
    }

    /// A client window moved or resized on screen.
    pub fn on_client_configure(
        &mut self,
        conn: &RustConnection,
        window: Window,
        geom: Rect,
    ) -> Result<()> {
        if !self.registry.set_client_geometry(window, geom) {
            return Ok(());
        }
        let mut ops = XOps::new(conn);
        self.registry
            .place_client(window, &self.grid, self.root_geom, &mut ops)?;
        self.draw_client_window(conn, window)?;
        self.remap_client_window(conn, window)?;
        Ok(())
    }

    /// The root window changed size.
    pub fn on_root_configure(&mut self, conn: &RustConnection, geom: Rect) -> Result<()> {
        if geom == self.root_geom {
            return Ok(());
        }
        self.root_geom = geom;
        let mut ops = XOps::new(conn);
        self.registry
            .place_all(&self.grid, self.root_geom, &mut ops)?;
        self.draw_all_clients(conn)?;
        Ok(())
    }

    /// The pager window itself changed size.
    pub fn on_pager_configure(&mut self, conn: &RustConnection, geom: Rect) -> Result<()> {
        let resized =
            geom.width != self.geometry.width || geom.height != self.geometry.height;
        self.geometry = geom;
        if resized {
            self.relayout(conn)?;
        }
        Ok(())
    }

    /// Recompute the whole geometry stack and repaint everything.
    pub fn relayout(&mut self, conn: &RustConnection) -> Result<()> {
        let mut ops = XOps::new(conn);
        self.grid.layout(
            self.geometry,
            self.borders.frame,
            self.borders.separator,
            &mut ops,
        )?;
        self.registry
            .place_all(&self.grid, self.root_geom, &mut ops)?;
        self.painter.draw_frame(conn, self.window, self.geometry)?;
        self.painter
            .draw_desktops(conn, &self.grid, self.current_desktop)?;
        self.draw_all_clients(conn)
    }

    /// Repaint all proxies of one mirrored client.
    pub fn draw_client_window(&mut self, conn: &RustConnection, window: Window) -> Result<()> {
        if let Some(client) = self.registry.get(window) {
            let scheme = Scheme::for_client(client, self.active);
            self.painter
                .draw_client(conn, client, scheme, self.draw_icons)?;
        }
        Ok(())
    }

    fn draw_all_clients(&mut self, conn: &RustConnection) -> Result<()> {
        let windows: Vec<Window> = self.registry.iter().map(|c| c.window).collect();
        for window in windows {
            self.draw_client_window(conn, window)?;
        }
        Ok(())
    }

    fn remap_client_window(&self, conn: &RustConnection, window: Window) -> Result<()> {
        if let Some(client) = self.registry.get(window) {
            let mut ops = XOps::new(conn);
            remap_client(client, self.showing_desktop, self.grid.len(), &mut ops)?;
        }
        Ok(())
    }

    /// Ask the window manager to switch to a desktop.
    pub fn switch_desktop(&self, conn: &RustConnection, desktop: u32) -> Result<()> {
        debug!(desktop, "requesting desktop switch");
        props::send_client_message(
            conn,
            self.root,
            x11rb::NONE,
            self.atoms.net_current_desktop,
            [desktop, x11rb::CURRENT_TIME, 0, 0, 0],
        )
    }

    /// Ask the window manager to activate a client.
    pub fn activate(&self, conn: &RustConnection, window: Window, time: Timestamp) -> Result<()> {
        debug!(window, "requesting activation");
        props::send_client_message(
            conn,
            self.root,
            window,
            self.atoms.net_active_window,
            [PAGER_SOURCE, time, 0, 0, 0],
        )
    }

    /// Ask the window manager to move a client to another desktop.
    pub fn send_to_desktop(
        &self,
        conn: &RustConnection,
        window: Window,
        desktop: u32,
    ) -> Result<()> {
        debug!(window, desktop, "requesting desktop move");
        props::send_client_message(
            conn,
            self.root,
            window,
            self.atoms.net_wm_desktop,
            [desktop, PAGER_SOURCE, 0, 0, 0],
        )
    }

    /// Release every owned resource before exit.
    pub fn shutdown(&mut self, conn: &RustConnection) -> Result<()> {
        let mut ops = XOps::new(conn);
        self.registry.clear(&mut ops)?;
        self.grid.reset(0, self.window, &mut ops)?;
        self.painter.release(conn)?;
        conn.destroy_window(self.window)?;
        conn.flush()?;
        Ok(())
    }
}

fn fetch_attrs(
    conn: &RustConnection,
    atoms: &Atoms,
    root: Window,
    draw_icons: bool,
    window: Window,
) -> Result<ClientAttrs> {
    let geom = fetch_geometry(conn, root, window)?;
    let desktop = fetch_desktop(conn, atoms, window)?;
    let hidden = props::has_state(conn, window, atoms.net_wm_state, atoms.net_wm_state_hidden)?;
    let urgent = fetch_urgent(conn, atoms, window)?;
    let icon = if draw_icons {
        props::get_icon(conn, window, atoms.net_wm_icon)?
    } else {
        None
    };
    Ok(ClientAttrs {
        geom,
        desktop,
        hidden,
        urgent,
        icon,
    })
}

/// A client's desktop: the sticky state wins over `_NET_WM_DESKTOP`.
fn fetch_desktop(conn: &RustConnection, atoms: &Atoms, window: Window) -> Result<u32> {
    if props::has_state(conn, window, atoms.net_wm_state, atoms.net_wm_state_sticky)? {
        return Ok(ALL_DESKTOPS);
    }
    Ok(props::get_cardinal(conn, window, atoms.net_wm_desktop)?.unwrap_or(0))
}

fn fetch_urgent(conn: &RustConnection, atoms: &Atoms, window: Window) -> Result<bool> {
    Ok(props::has_state(
        conn,
        window,
        atoms.net_wm_state,
        atoms.net_wm_state_demands_attention,
    )? || props::wm_hints_urgent(conn, window)?)
}

/// Screen-space geometry of a client window; a vanished window degrades to
/// a 1x1 rectangle at the origin.
fn fetch_geometry(conn: &RustConnection, root: Window, window: Window) -> Result<Rect> {
    let fallback = Rect {
        x: 0,
        y: 0,
        width: 1,
        height: 1,
    };
    let geom = match conn.get_geometry(window)?.reply() {
        Ok(geom) => geom,
        Err(_) => return Ok(fallback),
    };
    let pos = match conn.translate_coordinates(window, root, 0, 0)?.reply() {
        Ok(pos) => pos,
        Err(_) => return Ok(fallback),
    };
    Ok(Rect {
        x: pos.dst_x,
        y: pos.dst_y,
        width: geom.width,
        height: geom.height,
    })
}
