//! Window operations behind the proxy/cell lifecycle.
//!
//! `ProxyOps` is the narrow seam between the reconciliation logic and the X
//! server, so grid and registry behavior stays testable without a display.

use anyhow::Result;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{
    ChangeWindowAttributesAux, ConfigureWindowAux, ConnectionExt, CreateWindowAux, EventMask,
    StackMode, Window, WindowClass,
};
use x11rb::COPY_DEPTH_FROM_PARENT;

use crate::pager::Rect;

pub trait ProxyOps {
    /// Create an unmapped child window of `parent` with the given border
    /// width, ready to be positioned.
    fn create_window(&mut self, parent: Window, border_width: u16) -> Result<Window>;
    fn destroy_window(&mut self, window: Window) -> Result<()>;
    fn move_resize(&mut self, window: Window, rect: Rect) -> Result<()>;
    fn map(&mut self, window: Window) -> Result<()>;
    fn unmap(&mut self, window: Window) -> Result<()>;
    fn reparent(&mut self, window: Window, parent: Window, x: i16, y: i16) -> Result<()>;
    fn raise(&mut self, window: Window) -> Result<()>;
    /// Subscribe to structure and property changes on a client window.
    fn watch(&mut self, window: Window) -> Result<()>;
}

/// The real implementation over an x11rb connection.
pub struct XOps<'a, C: Connection> {
    conn: &'a C,
}

impl<'a, C: Connection> XOps<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }
}

impl<C: Connection> ProxyOps for XOps<'_, C> {
    fn create_window(&mut self, parent: Window, border_width: u16) -> Result<Window> {
        let window = self.conn.generate_id()?;
        self.conn.create_window(
            COPY_DEPTH_FROM_PARENT,
            window,
            parent,
            0,
            0,
            1,
            1,
            border_width,
            WindowClass::COPY_FROM_PARENT,
            0,
            &CreateWindowAux::new()
                .event_mask(EventMask::BUTTON_PRESS | EventMask::BUTTON_RELEASE),
        )?;
        Ok(window)
    }

    fn destroy_window(&mut self, window: Window) -> Result<()> {
        self.conn.destroy_window(window)?;
        Ok(())
    }

    fn move_resize(&mut self, window: Window, rect: Rect) -> Result<()> {
        self.conn.configure_window(
            window,
            &ConfigureWindowAux::new()
                .x(i32::from(rect.x))
                .y(i32::from(rect.y))
                .width(u32::from(rect.width))
                .height(u32::from(rect.height)),
        )?;
        Ok(())
    }

    fn map(&mut self, window: Window) -> Result<()> {
        self.conn.map_window(window)?;
        Ok(())
    }

    fn unmap(&mut self, window: Window) -> Result<()> {
        self.conn.unmap_window(window)?;
        Ok(())
    }

    fn reparent(&mut self, window: Window, parent: Window, x: i16, y: i16) -> Result<()> {
        self.conn.reparent_window(window, parent, x, y)?;
        Ok(())
    }

    fn raise(&mut self, window: Window) -> Result<()> {
        self.conn.configure_window(
            window,
            &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE),
        )?;
        Ok(())
    }

    fn watch(&mut self, window: Window) -> Result<()> {
        self.conn.change_window_attributes(
            window,
            &ChangeWindowAttributesAux::new()
                .event_mask(EventMask::STRUCTURE_NOTIFY | EventMask::PROPERTY_CHANGE),
        )?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashSet;

    use super::*;

    /// Records every operation instead of talking to a server. Window ids are
    /// handed out sequentially from 1.
    #[derive(Default)]
    pub struct RecordingOps {
        next: Window,
        pub parents: Vec<(Window, Window)>,
        pub destroyed: Vec<Window>,
        pub reparented: Vec<(Window, Window)>,
        pub moved: Vec<(Window, Rect)>,
        pub raised: Vec<Window>,
        pub watched: Vec<Window>,
        pub mapped: HashSet<Window>,
    }

    impl RecordingOps {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn created(&self) -> Vec<Window> {
            self.parents.iter().map(|&(w, _)| w).collect()
        }

        pub fn parent_of(&self, window: Window) -> Option<Window> {
            self.reparented
                .iter()
                .rev()
                .find(|&&(w, _)| w == window)
                .map(|&(_, p)| p)
                .or_else(|| {
                    self.parents
                        .iter()
                        .find(|&&(w, _)| w == window)
                        .map(|&(_, p)| p)
                })
        }
    }

    impl ProxyOps for RecordingOps {
        fn create_window(&mut self, parent: Window, _border_width: u16) -> Result<Window> {
            self.next += 1;
            self.parents.push((self.next, parent));
            Ok(self.next)
        }

        fn destroy_window(&mut self, window: Window) -> Result<()> {
            self.destroyed.push(window);
            self.mapped.remove(&window);
            Ok(())
        }

        fn move_resize(&mut self, window: Window, rect: Rect) -> Result<()> {
            self.moved.push((window, rect));
            Ok(())
        }

        fn map(&mut self, window: Window) -> Result<()> {
            self.mapped.insert(window);
            Ok(())
        }

        fn unmap(&mut self, window: Window) -> Result<()> {
            self.mapped.remove(&window);
            Ok(())
        }

        fn reparent(&mut self, window: Window, parent: Window, _x: i16, _y: i16) -> Result<()> {
            self.reparented.push((window, parent));
            Ok(())
        }

        fn raise(&mut self, window: Window) -> Result<()> {
            self.raised.push(window);
            Ok(())
        }

        fn watch(&mut self, window: Window) -> Result<()> {
            self.watched.push(window);
            Ok(())
        }
    }
}
