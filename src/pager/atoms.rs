//! Interned X11 atoms used by the pager.

use anyhow::{Context, Result};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{Atom, ConnectionExt};

/// All atoms the pager ever touches, interned once at startup.
#[derive(Debug, Clone, Copy)]
pub struct Atoms {
    pub wm_protocols: Atom,
    pub wm_delete_window: Atom,
    pub net_active_window: Atom,
    pub net_client_list_stacking: Atom,
    pub net_current_desktop: Atom,
    pub net_desktop_layout: Atom,
    pub net_number_of_desktops: Atom,
    pub net_showing_desktop: Atom,
    pub net_wm_desktop: Atom,
    pub net_wm_icon: Atom,
    pub net_wm_state: Atom,
    pub net_wm_state_hidden: Atom,
    pub net_wm_state_sticky: Atom,
    pub net_wm_state_demands_attention: Atom,
}

impl Atoms {
    pub fn new<C: Connection>(conn: &C) -> Result<Self> {
        let intern = |name: &str| -> Result<Atom> {
            let reply = conn
                .intern_atom(false, name.as_bytes())?
                .reply()
                .with_context(|| format!("failed to intern atom {name}"))?;
            Ok(reply.atom)
        };
        Ok(Self {
            wm_protocols: intern("WM_PROTOCOLS")?,
            wm_delete_window: intern("WM_DELETE_WINDOW")?,
            net_active_window: intern("_NET_ACTIVE_WINDOW")?,
            net_client_list_stacking: intern("_NET_CLIENT_LIST_STACKING")?,
            net_current_desktop: intern("_NET_CURRENT_DESKTOP")?,
            net_desktop_layout: intern("_NET_DESKTOP_LAYOUT")?,
            net_number_of_desktops: intern("_NET_NUMBER_OF_DESKTOPS")?,
            net_showing_desktop: intern("_NET_SHOWING_DESKTOP")?,
            net_wm_desktop: intern("_NET_WM_DESKTOP")?,
            net_wm_icon: intern("_NET_WM_ICON")?,
            net_wm_state: intern("_NET_WM_STATE")?,
            net_wm_state_hidden: intern("_NET_WM_STATE_HIDDEN")?,
            net_wm_state_sticky: intern("_NET_WM_STATE_STICKY")?,
            net_wm_state_demands_attention: intern("_NET_WM_STATE_DEMANDS_ATTENTION")?,
        })
    }
}
