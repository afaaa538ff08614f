//! Client mirror objects and the registry reconciling them against the
//! window manager's stacking list.

use anyhow::{Context, Result};
use bitflags::bitflags;
use x11rb::protocol::xproto::Window;

use crate::pager::grid::{DesktopCell, DesktopGrid};
use crate::pager::layout::place_in_cell;
use crate::pager::props::Icon;
use crate::pager::xops::ProxyOps;
use crate::pager::Rect;

/// `_NET_WM_DESKTOP` sentinel for "on every desktop".
pub const ALL_DESKTOPS: u32 = 0xFFFF_FFFF;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ClientFlags: u8 {
        const HIDDEN = 1 << 0;
        const URGENT = 1 << 1;
    }
}

/// One miniature stand-in window inside a desktop cell.
#[derive(Debug)]
pub struct Proxy {
    pub window: Window,
    pub rect: Rect,
}

/// Mirror of one managed top-level window.
///
/// A client on an ordinary desktop owns exactly one proxy, parented to that
/// desktop's cell. A client on [`ALL_DESKTOPS`] owns one proxy per cell.
#[derive(Debug)]
pub struct Client {
    pub window: Window,
    pub proxies: Vec<Proxy>,
    pub geom: Rect,
    pub desktop: u32,
    pub flags: ClientFlags,
    pub icon: Option<Icon>,
}

impl Client {
    pub fn sticky(&self) -> bool {
        self.desktop == ALL_DESKTOPS
    }

    /// Whether this client shows anything inside the cell for `desktop`.
    pub fn visible_on(&self, desktop: u32) -> bool {
        if self.flags.contains(ClientFlags::HIDDEN) {
            return false;
        }
        self.sticky() || self.desktop == desktop
    }
}

/// Snapshot of a client's mirrored properties, fetched when it first appears.
#[derive(Debug, Clone)]
pub struct ClientAttrs {
    pub geom: Rect,
    pub desktop: u32,
    pub hidden: bool,
    pub urgent: bool,
    pub icon: Option<Icon>,
}

impl ClientAttrs {
    fn flags(&self) -> ClientFlags {
        let mut flags = ClientFlags::empty();
        flags.set(ClientFlags::HIDDEN, self.hidden);
        flags.set(ClientFlags::URGENT, self.urgent);
        flags
    }
}

/// Result of one reconciliation pass.
#[derive(Debug, Default)]
pub struct RefreshOutcome {
    /// The identity sequence differs from the previous pass.
    pub changed: bool,
    /// Windows that entered the registry this pass.
    pub created: Vec<Window>,
}

/// All mirrored clients, kept in bottom-to-top stacking order.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: Vec<Client>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Client> {
        self.clients.iter()
    }

    pub fn get(&self, window: Window) -> Option<&Client> {
        self.clients.iter().find(|c| c.window == window)
    }

    pub fn get_mut(&mut self, window: Window) -> Option<&mut Client> {
        self.clients.iter_mut().find(|c| c.window == window)
    }

    /// Client owning the given proxy window, if any.
    pub fn by_proxy(&self, proxy: Window) -> Option<&Client> {
        self.clients
            .iter()
            .find(|c| c.proxies.iter().any(|p| p.window == proxy))
    }

    /// Reconcile against a fresh stacking list.
    ///
    /// Each listed window is matched against the previous registry, first at
    /// the same position and then linearly; matches are detached and reused
    /// so surviving clients keep their proxy windows. Unmatched listed
    /// windows are fetched via `fetch` and given fresh proxies; previous
    /// clients left unmatched are destroyed.
    pub fn refresh<O: ProxyOps>(
        &mut self,
        stacking: &[Window],
        grid: &DesktopGrid,
        screen: Rect,
        border: u16,
        ops: &mut O,
        mut fetch: impl FnMut(Window) -> Result<ClientAttrs>,
    ) -> Result<RefreshOutcome> {
        let previous: Vec<Window> = self.clients.iter().map(|c| c.window).collect();
        let mut old: Vec<Option<Client>> = self.clients.drain(..).map(Some).collect();
        let mut next = Vec::with_capacity(stacking.len());
        let mut created = Vec::new();
        for (i, &window) in stacking.iter().enumerate() {
            let at_position = old
                .get(i)
                .is_some_and(|slot| slot.as_ref().is_some_and(|c| c.window == window));
            let reused = if at_position {
                old[i].take()
            } else {
                old.iter_mut()
                    .find(|slot| slot.as_ref().is_some_and(|c| c.window == window))
                    .and_then(Option::take)
            };
            if let Some(client) = reused {
                next.push(client);
                continue;
            }
            let attrs = fetch(window)?;
            ops.watch(window)?;
            let mut client = Client {
                window,
                proxies: Vec::new(),
                geom: attrs.geom,
                desktop: attrs.desktop,
                flags: attrs.flags(),
                icon: attrs.icon,
            };
            allocate_proxies(&mut client, grid, screen, border, ops)?;
            created.push(window);
            next.push(client);
        }
        for slot in old {
            if let Some(client) = slot {
                destroy_client(client, ops)?;
            }
        }
        self.clients = next;
        Ok(RefreshOutcome {
            changed: previous != stacking,
            created,
        })
    }

    /// Move a client to another desktop.
    ///
    /// Proxies are destroyed and reallocated only when the move crosses the
    /// [`ALL_DESKTOPS`] boundary; an ordinary-to-ordinary move reparents the
    /// single existing proxy into the target cell. Returns whether the
    /// desktop actually changed.
    pub fn set_client_desktop<O: ProxyOps>(
        &mut self,
        window: Window,
        desktop: u32,
        grid: &DesktopGrid,
        screen: Rect,
        border: u16,
        ops: &mut O,
    ) -> Result<bool> {
        let Some(client) = self.get_mut(window) else {
            return Ok(false);
        };
        let old = client.desktop;
        if old == desktop {
            return Ok(false);
        }
        client.desktop = desktop;
        if (old == ALL_DESKTOPS) != (desktop == ALL_DESKTOPS) {
            for proxy in client.proxies.drain(..) {
                ops.destroy_window(proxy.window)?;
            }
            allocate_proxies(client, grid, screen, border, ops)?;
        } else {
            let cell = cell_for(grid, desktop)?;
            let rect = place_in_cell(client.geom, cell.rect, screen);
            if let Some(proxy) = client.proxies.first_mut() {
                ops.reparent(proxy.window, cell.window, rect.x, rect.y)?;
                ops.move_resize(proxy.window, rect)?;
                proxy.rect = rect;
            }
        }
        Ok(true)
    }

    pub fn set_client_geometry(&mut self, window: Window, geom: Rect) -> bool {
        match self.get_mut(window) {
            Some(client) if client.geom != geom => {
                client.geom = geom;
                true
            }
            _ => false,
        }
    }

    /// Recompute and apply the proxy rectangles of one client.
    pub fn place_client<O: ProxyOps>(
        &mut self,
        window: Window,
        grid: &DesktopGrid,
        screen: Rect,
        ops: &mut O,
    ) -> Result<()> {
        if let Some(client) = self.get_mut(window) {
            place_proxies(client, grid, screen, ops)?;
        }
        Ok(())
    }

    /// Recompute and apply every proxy rectangle, after a relayout.
    pub fn place_all<O: ProxyOps>(
        &mut self,
        grid: &DesktopGrid,
        screen: Rect,
        ops: &mut O,
    ) -> Result<()> {
        for client in &mut self.clients {
            place_proxies(client, grid, screen, ops)?;
        }
        Ok(())
    }

    /// Restack every proxy to match registry (stacking) order.
    pub fn raise_all<O: ProxyOps>(&self, ops: &mut O) -> Result<()> {
        for client in &self.clients {
            for proxy in &client.proxies {
                ops.raise(proxy.window)?;
            }
        }
        Ok(())
    }

    /// Map or unmap every proxy according to visibility.
    pub fn remap_all<O: ProxyOps>(
        &self,
        showing_desktop: bool,
        ndesktops: u32,
        ops: &mut O,
    ) -> Result<()> {
        for client in &self.clients {
            remap_client(client, showing_desktop, ndesktops, ops)?;
        }
        Ok(())
    }

    /// Destroy every client's proxies and empty the registry.
    pub fn clear<O: ProxyOps>(&mut self, ops: &mut O) -> Result<()> {
        for client in self.clients.drain(..) {
            destroy_client(client, ops)?;
        }
        Ok(())
    }
}

fn cell_for(grid: &DesktopGrid, desktop: u32) -> Result<&DesktopCell> {
    grid.cell(desktop)
        .or_else(|| grid.cells().first())
        .context("no desktop cells")
}

/// Allocate fresh proxies for a client: one in its desktop's cell, or one
/// per cell when sticky.
fn allocate_proxies<O: ProxyOps>(
    client: &mut Client,
    grid: &DesktopGrid,
    screen: Rect,
    border: u16,
    ops: &mut O,
) -> Result<()> {
    client.proxies.clear();
    if client.sticky() {
        for cell in grid.cells() {
            let rect = place_in_cell(client.geom, cell.rect, screen);
            let window = ops.create_window(cell.window, border)?;
            ops.move_resize(window, rect)?;
            client.proxies.push(Proxy { window, rect });
        }
    } else {
        let cell = cell_for(grid, client.desktop)?;
        let rect = place_in_cell(client.geom, cell.rect, screen);
        let window = ops.create_window(cell.window, border)?;
        ops.move_resize(window, rect)?;
        client.proxies.push(Proxy { window, rect });
    }
    Ok(())
}

fn place_proxies<O: ProxyOps>(
    client: &mut Client,
    grid: &DesktopGrid,
    screen: Rect,
    ops: &mut O,
) -> Result<()> {
    if client.sticky() {
        for (proxy, cell) in client.proxies.iter_mut().zip(grid.cells()) {
            let rect = place_in_cell(client.geom, cell.rect, screen);
            ops.move_resize(proxy.window, rect)?;
            proxy.rect = rect;
        }
    } else {
        let cell = cell_for(grid, client.desktop)?;
        let rect = place_in_cell(client.geom, cell.rect, screen);
        if let Some(proxy) = client.proxies.first_mut() {
            ops.move_resize(proxy.window, rect)?;
            proxy.rect = rect;
        }
    }
    Ok(())
}

/// Map each proxy whose cell's desktop should show the client, unmap the
/// rest. Everything is unmapped in showing-desktop mode, and a client whose
/// reported desktop lies beyond the grid stays unmapped until the index
/// becomes valid again.
pub fn remap_client<O: ProxyOps>(
    client: &Client,
    showing_desktop: bool,
    ndesktops: u32,
    ops: &mut O,
) -> Result<()> {
    for (i, proxy) in client.proxies.iter().enumerate() {
        let desktop = if client.sticky() {
            i as u32
        } else {
            client.desktop
        };
        let visible = !showing_desktop && desktop < ndesktops && client.visible_on(desktop);
        if visible {
            ops.map(proxy.window)?;
        } else {
            ops.unmap(proxy.window)?;
        }
    }
    Ok(())
}

fn destroy_client<O: ProxyOps>(client: Client, ops: &mut O) -> Result<()> {
    for proxy in client.proxies {
        ops.destroy_window(proxy.window)?;
    }
    Ok(())
}
