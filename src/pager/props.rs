//! Property Accessor
//!
//! Read-side helpers over EWMH/ICCCM window properties and the one-shot
//! client-message sender. Reply errors for vanished windows degrade to
//! "property absent"; only connection failures propagate.

use anyhow::Result;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{
    Atom, AtomEnum, ClientMessageEvent, ConnectionExt, EventMask, Window,
};

/// Preferred icon edge in pixels.
pub const ICON_SIZE: u16 = 16;

/// `XUrgencyHint` bit in the WM_HINTS flags word.
const URGENCY_HINT: u32 = 1 << 8;

/// A client icon in premultiplied ARGB, one `u32` per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Icon {
    pub width: u16,
    pub height: u16,
    pub pixels: Vec<u32>,
}

/// First CARDINAL value of a property, or `None` if unset or unreadable.
pub fn get_cardinal<C: Connection>(conn: &C, window: Window, prop: Atom) -> Result<Option<u32>> {
    let reply = match conn
        .get_property(false, window, prop, AtomEnum::CARDINAL, 0, 1)?
        .reply()
    {
        Ok(reply) => reply,
        Err(_) => return Ok(None),
    };
    Ok(reply.value32().and_then(|mut values| values.next()))
}

/// All ATOM values of a property.
pub fn get_atom_list<C: Connection>(conn: &C, window: Window, prop: Atom) -> Result<Vec<Atom>> {
    let reply = match conn
        .get_property(false, window, prop, AtomEnum::ATOM, 0, u32::MAX)?
        .reply()
    {
        Ok(reply) => reply,
        Err(_) => return Ok(Vec::new()),
    };
    Ok(reply.value32().map(Iterator::collect).unwrap_or_default())
}

/// All WINDOW values of a property, in property order.
pub fn get_window_list<C: Connection>(conn: &C, window: Window, prop: Atom) -> Result<Vec<Window>> {
    let reply = match conn
        .get_property(false, window, prop, AtomEnum::WINDOW, 0, u32::MAX)?
        .reply()
    {
        Ok(reply) => reply,
        Err(_) => return Ok(Vec::new()),
    };
    Ok(reply.value32().map(Iterator::collect).unwrap_or_default())
}

/// Whether `_NET_WM_STATE` on `window` contains `state`.
pub fn has_state<C: Connection>(
    conn: &C,
    window: Window,
    net_wm_state: Atom,
    state: Atom,
) -> Result<bool> {
    Ok(get_atom_list(conn, window, net_wm_state)?.contains(&state))
}

/// Whether WM_HINTS carries the urgency flag.
pub fn wm_hints_urgent<C: Connection>(conn: &C, window: Window) -> Result<bool> {
    let reply = match conn
        .get_property(
            false,
            window,
            AtomEnum::WM_HINTS,
            AtomEnum::WM_HINTS,
            0,
            1,
        )?
        .reply()
    {
        Ok(reply) => reply,
        Err(_) => return Ok(false),
    };
    let flags = reply.value32().and_then(|mut values| values.next());
    Ok(flags.is_some_and(|f| f & URGENCY_HINT != 0))
}

/// Fetch `_NET_WM_ICON` and pick the best fit for [`ICON_SIZE`].
pub fn get_icon<C: Connection>(conn: &C, window: Window, net_wm_icon: Atom) -> Result<Option<Icon>> {
    let reply = match conn
        .get_property(false, window, net_wm_icon, AtomEnum::ANY, 0, u32::MAX)?
        .reply()
    {
        Ok(reply) => reply,
        Err(_) => return Ok(None),
    };
    if reply.format != 32 {
        return Ok(None);
    }
    let words: Vec<u32> = match reply.value32() {
        Some(values) => values.collect(),
        None => return Ok(None),
    };
    Ok(select_icon(&words, ICON_SIZE))
}

/// Scan an `_NET_WM_ICON` payload of `[w, h, w*h pixels]` blocks and pick the
/// icon whose larger edge is closest to `preferred` from above.
///
/// Malformed blocks (zero dimension, truncated pixel data) end the scan;
/// icons smaller than `preferred` on both edges are skipped; an exact match
/// stops early. Ties keep the first candidate. The chosen icon's pixels are
/// premultiplied by alpha.
pub fn select_icon(words: &[u32], preferred: u16) -> Option<Icon> {
    let mut best: Option<(usize, u32, u32)> = None;
    let mut best_diff = i64::MAX;
    let mut i = 0usize;
    while i + 2 <= words.len() {
        let w = u64::from(words[i]);
        let h = u64::from(words[i + 1]);
        let size = (w * h) as usize;
        if w < 1 || h < 1 || i + 2 + size > words.len() {
            break;
        }
        let diff = w.max(h) as i64 - i64::from(preferred);
        if diff >= 0 && diff < best_diff {
            best = Some((i + 2, w as u32, h as u32));
            best_diff = diff;
            if diff == 0 {
                break;
            }
        }
        i += 2 + size;
    }
    let (offset, width, height) = best?;
    let pixels = words[offset..offset + (width * height) as usize]
        .iter()
        .map(|&p| prealpha(p))
        .collect();
    Some(Icon {
        width: width as u16,
        height: height as u16,
        pixels,
    })
}

/// Premultiply one ARGB pixel by its alpha channel.
pub fn prealpha(pixel: u32) -> u32 {
    let alpha = pixel >> 24;
    ((alpha * (pixel & 0x00FF_00FF)) >> 8 & 0x00FF_00FF)
        | ((alpha * (pixel & 0x0000_FF00)) >> 8 & 0x0000_FF00)
        | (alpha << 24)
}

/// Send a 32-bit client message to the root window with the substructure
/// masks window managers listen on.
pub fn send_client_message<C: Connection>(
    conn: &C,
    root: Window,
    window: Window,
    type_: Atom,
    data: [u32; 5],
) -> Result<()> {
    let event = ClientMessageEvent::new(32, window, type_, data);
    conn.send_event(
        false,
        root,
        EventMask::SUBSTRUCTURE_REDIRECT | EventMask::SUBSTRUCTURE_NOTIFY,
        event,
    )?;
    conn.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(w: u32, h: u32, fill: u32) -> Vec<u32> {
        let mut v = vec![w, h];
        v.extend(std::iter::repeat(fill).take((w * h) as usize));
        v
    }

    #[test]
    fn prealpha_opaque_scales_by_255_over_256() {
        assert_eq!(prealpha(0xFFFF_FFFF), 0xFFFE_FEFE);
        assert_eq!(prealpha(0xFF00_0000), 0xFF00_0000);
    }

    #[test]
    fn prealpha_transparent_is_black() {
        assert_eq!(prealpha(0x00FF_FFFF), 0);
        assert_eq!(prealpha(0x0012_3456), 0);
    }

    #[test]
    fn prealpha_half_alpha_halves_channels() {
        let p = prealpha(0x80FF_FFFF);
        assert_eq!(p >> 24, 0x80);
        assert_eq!((p >> 16) & 0xFF, 0x7F);
        assert_eq!((p >> 8) & 0xFF, 0x7F);
        assert_eq!(p & 0xFF, 0x7F);
    }

    #[test]
    fn select_prefers_exact_size() {
        let mut words = block(32, 32, 0xFF00_0000);
        words.extend(block(16, 16, 0xFF00_0001));
        words.extend(block(48, 48, 0xFF00_0002));
        let icon = select_icon(&words, 16).unwrap();
        assert_eq!((icon.width, icon.height), (16, 16));
    }

    #[test]
    fn select_takes_closest_from_above() {
        let mut words = block(64, 64, 0);
        words.extend(block(24, 24, 0));
        words.extend(block(32, 32, 0));
        let icon = select_icon(&words, 16).unwrap();
        assert_eq!((icon.width, icon.height), (24, 24));
    }

    #[test]
    fn select_skips_smaller_icons() {
        let mut words = block(8, 8, 0);
        words.extend(block(32, 32, 0));
        let icon = select_icon(&words, 16).unwrap();
        assert_eq!((icon.width, icon.height), (32, 32));
    }

    #[test]
    fn select_none_when_all_too_small() {
        let mut words = block(8, 8, 0);
        words.extend(block(12, 12, 0));
        assert!(select_icon(&words, 16).is_none());
    }

    #[test]
    fn select_stops_at_truncated_block() {
        let mut words = block(20, 20, 0);
        words.extend([64, 64, 1, 2, 3]); // truncated pixel data
        let icon = select_icon(&words, 16).unwrap();
        assert_eq!((icon.width, icon.height), (20, 20));
    }

    #[test]
    fn select_stops_at_zero_dimension() {
        let mut words = vec![0, 16];
        words.extend(block(20, 20, 0));
        assert!(select_icon(&words, 16).is_none());
    }

    #[test]
    fn select_uses_larger_edge() {
        // 16x64 has max edge 64, 20x20 has max edge 20: the latter wins
        let mut words = block(16, 64, 0);
        words.extend(block(20, 20, 0));
        let icon = select_icon(&words, 16).unwrap();
        assert_eq!((icon.width, icon.height), (20, 20));
    }

    #[test]
    fn select_tie_keeps_first() {
        let mut words = block(32, 32, 0xAAAA_AAAA);
        words.extend(block(32, 32, 0xBBBB_BBBB));
        let icon = select_icon(&words, 16).unwrap();
        assert_eq!(icon.pixels[0], prealpha(0xAAAA_AAAA));
    }

    #[test]
    fn selected_pixels_are_premultiplied() {
        let words = block(16, 16, 0x80FF_FFFF);
        let icon = select_icon(&words, 16).unwrap();
        assert!(icon.pixels.iter().all(|&p| p == prealpha(0x80FF_FFFF)));
    }
}
