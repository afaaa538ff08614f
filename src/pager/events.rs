//! Event dispatch: one explicit `match` over the protocol event stream.

use anyhow::Result;
use tracing::trace;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{
    AtomEnum, ButtonPressEvent, ButtonReleaseEvent, ClientMessageEvent, ConfigureNotifyEvent,
    ConfigureWindowAux, ConnectionExt, EventMask, GrabMode, GrabStatus, PropertyNotifyEvent,
    StackMode,
};
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;

use crate::pager::{Pager, Rect};

pub fn handle(pager: &mut Pager, conn: &RustConnection, event: &Event) -> Result<()> {
    match event {
        Event::ButtonPress(ev) => on_button_press(pager, conn, ev),
        Event::ButtonRelease(ev) => on_button_release(pager, conn, ev),
        Event::ConfigureNotify(ev) => on_configure(pager, conn, ev),
        Event::ClientMessage(ev) => on_client_message(pager, ev),
        Event::PropertyNotify(ev) => on_property(pager, conn, ev),
        // async errors for windows that vanished mid-update are expected
        Event::Error(err) => {
            trace!(?err, "ignoring X error");
            Ok(())
        }
        _ => Ok(()),
    }
}

fn on_button_press(pager: &mut Pager, conn: &RustConnection, ev: &ButtonPressEvent) -> Result<()> {
    if ev.detail != 1 {
        return Ok(());
    }
    if pager.registry.by_proxy(ev.event).is_some() {
        drag_proxy(pager, conn, ev)?;
    }
    Ok(())
}

fn on_button_release(
    pager: &mut Pager,
    conn: &RustConnection,
    ev: &ButtonReleaseEvent,
) -> Result<()> {
    if ev.detail != 1 {
        return Ok(());
    }
    if let Some(desktop) = pager.grid.find_cell(ev.event) {
        pager.switch_desktop(conn, desktop)?;
    }
    Ok(())
}

fn on_configure(pager: &mut Pager, conn: &RustConnection, ev: &ConfigureNotifyEvent) -> Result<()> {
    if ev.window == pager.root {
        pager.on_root_configure(
            conn,
            Rect {
                x: 0,
                y: 0,
                width: ev.width,
                height: ev.height,
            },
        )
    } else if ev.window == pager.window {
        pager.on_pager_configure(
            conn,
            Rect {
                x: ev.x,
                y: ev.y,
                width: ev.width,
                height: ev.height,
            },
        )
    } else {
        pager.on_client_configure(
            conn,
            ev.window,
            Rect {
                x: ev.x,
                y: ev.y,
                width: ev.width,
                height: ev.height,
            },
        )
    }
}

fn on_client_message(pager: &mut Pager, ev: &ClientMessageEvent) -> Result<()> {
    if ev.window == pager.window
        && ev.type_ == pager.atoms.wm_protocols
        && ev.data.as_data32()[0] == pager.atoms.wm_delete_window
    {
        pager.running = false;
    }
    Ok(())
}

fn on_property(pager: &mut Pager, conn: &RustConnection, ev: &PropertyNotifyEvent) -> Result<()> {
    let atoms = pager.atoms;
    if ev.window == pager.root {
        if ev.atom == atoms.net_current_desktop {
            pager.set_current_desktop(conn)
        } else if ev.atom == atoms.net_number_of_desktops {
            on_desktop_count(pager, conn)
        } else if ev.atom == atoms.net_client_list_stacking {
            pager.set_clients(conn)
        } else if ev.atom == atoms.net_active_window {
            pager.set_active(conn)
        } else if ev.atom == atoms.net_showing_desktop {
            pager.set_showing_desktop(conn)
        } else {
            Ok(())
        }
    } else if ev.atom == atoms.net_wm_state {
        pager.on_client_state(conn, ev.window)
    } else if ev.atom == atoms.net_wm_desktop {
        pager.on_client_desktop(conn, ev.window)
    } else if ev.atom == u32::from(AtomEnum::WM_HINTS) {
        pager.on_client_hints(conn, ev.window)
    } else if ev.atom == atoms.net_wm_icon {
        pager.on_client_icon(conn, ev.window)
    } else {
        Ok(())
    }
}

fn on_desktop_count(pager: &mut Pager, conn: &RustConnection) -> Result<()> {
    pager.reset_desktops(conn)?;
    pager
        .painter
        .draw_desktops(conn, &pager.grid, pager.current_desktop)?;
    pager.set_clients(conn)?;
    pager.set_active(conn)?;
    Ok(())
}

/// Drag a client proxy across the pager.
///
/// The proxy is lifted out of its cell onto the pager window and follows
/// the grabbed pointer; dropping it on another cell asks the window manager
/// to move the client there, dropping anywhere else activates the client.
/// Sticky clients are activated outright. Events arriving mid-drag are
/// replayed once the drag ends.
fn drag_proxy(pager: &mut Pager, conn: &RustConnection, ev: &ButtonPressEvent) -> Result<()> {
    let proxy = ev.event;
    let (client_win, sticky, source_desktop) = {
        let Some(client) = pager.registry.by_proxy(proxy) else {
            return Ok(());
        };
        (client.window, client.sticky(), client.desktop)
    };
    if sticky {
        return pager.activate(conn, client_win, ev.time);
    }
    let border = i16::try_from(pager.borders.border).unwrap_or(0);
    let pos = conn
        .translate_coordinates(proxy, pager.window, -border, -border)?
        .reply()?;
    let (mut x, mut y) = (pos.dst_x, pos.dst_y);
    conn.reparent_window(proxy, pager.window, x, y)?;
    conn.configure_window(
        proxy,
        &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE),
    )?;
    conn.flush()?;
    let grab = conn
        .grab_pointer(
            false,
            proxy,
            EventMask::BUTTON_RELEASE | EventMask::POINTER_MOTION,
            GrabMode::ASYNC,
            GrabMode::ASYNC,
            pager.window,
            x11rb::NONE,
            ev.time,
        )?
        .reply()?;
    let mut target = source_desktop;
    let mut drop_time = ev.time;
    let mut deferred = Vec::new();
    if grab.status == GrabStatus::SUCCESS {
        loop {
            match conn.wait_for_event()? {
                Event::MotionNotify(motion) => {
                    x = x.saturating_add(motion.event_x.saturating_sub(ev.event_x));
                    y = y.saturating_add(motion.event_y.saturating_sub(ev.event_y));
                    conn.configure_window(
                        proxy,
                        &ConfigureWindowAux::new().x(i32::from(x)).y(i32::from(y)),
                    )?;
                    conn.flush()?;
                }
                Event::ButtonRelease(release) => {
                    let drop_x = x.saturating_add(release.event_x);
                    let drop_y = y.saturating_add(release.event_y);
                    if let Some(desktop) = pager.grid.cell_at(drop_x, drop_y) {
                        target = desktop;
                    }
                    drop_time = release.time;
                    conn.ungrab_pointer(release.time)?;
                    break;
                }
                other => deferred.push(other),
            }
        }
    }
    // put the proxy back on its source cell before asking the WM anything
    let restore = pager
        .registry
        .get(client_win)
        .and_then(|c| c.proxies.first())
        .map(|p| (p.window, p.rect));
    let cell = pager
        .grid
        .cell(source_desktop)
        .or_else(|| pager.grid.cells().first())
        .map(|c| c.window);
    if let (Some((proxy, rect)), Some(cell)) = (restore, cell) {
        conn.reparent_window(proxy, cell, rect.x, rect.y)?;
    }
    if target != source_desktop {
        pager.send_to_desktop(conn, client_win, target)?;
    } else {
        pager.activate(conn, client_win, drop_time)?;
    }
    conn.flush()?;
    for event in deferred {
        if !matches!(event, Event::ButtonPress(_)) {
            handle(pager, conn, &event)?;
        }
    }
    Ok(())
}
