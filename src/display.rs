//! [`DisplayServer`] over the X11 core protocol and the mouse-area service

use std::sync::Arc;

use anyhow::Result;
use tokio::runtime::Handle;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{self, ConnectionExt, EventMask, GrabMode};
use x11rb::rust_connection::RustConnection;

use crate::dbus::mouse_area::XMouseAreaProxy;
use crate::geometry::Rect;
use crate::grab::{AreaCookie, AreaMask, DisplayServer, GrabStatus};

pub struct X11Display {
    conn: Arc<RustConnection>,
    mouse_area: XMouseAreaProxy<'static>,
    /// Runs mouse-area calls from the core thread
    runtime: Handle,
}

impl X11Display {
    pub fn new(conn: Arc<RustConnection>, mouse_area: XMouseAreaProxy<'static>, runtime: Handle) -> Self {
        Self {
            conn,
            mouse_area,
            runtime,
        }
    }
}

fn status(status: xproto::GrabStatus) -> GrabStatus {
    match status {
        xproto::GrabStatus::SUCCESS => GrabStatus::Success,
        xproto::GrabStatus::ALREADY_GRABBED => GrabStatus::AlreadyGrabbed,
        xproto::GrabStatus::INVALID_TIME => GrabStatus::InvalidTime,
        xproto::GrabStatus::NOT_VIEWABLE => GrabStatus::NotViewable,
        _ => GrabStatus::Frozen,
    }
}

impl DisplayServer for X11Display {
    fn grab_pointer(&mut self, window: u32) -> Result<GrabStatus> {
        let reply = self
            .conn
            .grab_pointer(
                false,
                window,
                EventMask::POINTER_MOTION | EventMask::BUTTON_PRESS | EventMask::BUTTON_RELEASE,
                GrabMode::ASYNC,
                GrabMode::ASYNC,
                x11rb::NONE,
                x11rb::NONE,
                x11rb::CURRENT_TIME,
            )?
            .reply()?;
        Ok(status(reply.status))
    }

    fn ungrab_pointer(&mut self) -> Result<()> {
        self.conn.ungrab_pointer(x11rb::CURRENT_TIME)?.check()?;
        Ok(())
    }

    fn grab_keyboard(&mut self, window: u32) -> Result<GrabStatus> {
        let reply = self
            .conn
            .grab_keyboard(false, window, x11rb::CURRENT_TIME, GrabMode::ASYNC, GrabMode::ASYNC)?
            .reply()?;
        Ok(status(reply.status))
    }

    fn ungrab_keyboard(&mut self) -> Result<()> {
        self.conn.ungrab_keyboard(x11rb::CURRENT_TIME)?.check()?;
        Ok(())
    }

    fn register_area(&mut self, area: Rect, mask: AreaMask) -> Result<AreaCookie> {
        // Pending grabs must reach the server before the area goes live
        self.conn.flush()?;
        let cookie = self.runtime.block_on(self.mouse_area.register_area(
            area.x,
            area.y,
            area.right(),
            area.bottom(),
            mask.bits(),
        ))?;
        Ok(AreaCookie(cookie))
    }

    fn unregister_area(&mut self, cookie: &AreaCookie) -> Result<()> {
        self.runtime
            .block_on(self.mouse_area.unregister_area(cookie.as_str()))?;
        Ok(())
    }
}
