//! Input Grabber
//!
//! Owns the exclusive pointer/keyboard grabs and the registered mouse area.
//! All display-server failures stop here: grabs that cannot be acquired are
//! logged and retried on the next event, ungrabs never report errors.

use anyhow::Result;
use bitflags::bitflags;
use tracing::{debug, trace, warn};

use crate::geometry::Rect;

bitflags! {
    /// Event classes delivered for a registered mouse area
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AreaMask: i32 {
        const MOTION = 1 << 0;
        const BUTTON = 1 << 1;
        const KEY    = 1 << 2;
    }
}

/// Reply status of a grab request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrabStatus {
    Success,
    AlreadyGrabbed,
    InvalidTime,
    NotViewable,
    Frozen,
}

impl GrabStatus {
    /// Success and AlreadyGrabbed both leave us holding the grab
    pub fn is_acquired(self) -> bool {
        matches!(self, Self::Success | Self::AlreadyGrabbed)
    }
}

/// Opaque id of a mouse-area registration
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AreaCookie(pub String);

impl AreaCookie {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Currently registered exclusive area
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrabToken {
    pub area: Rect,
    pub cookie: AreaCookie,
}

/// Display-server operations the grabber needs
pub trait DisplayServer {
    fn grab_pointer(&mut self, window: u32) -> Result<GrabStatus>;
    fn ungrab_pointer(&mut self) -> Result<()>;
    fn grab_keyboard(&mut self, window: u32) -> Result<GrabStatus>;
    fn ungrab_keyboard(&mut self) -> Result<()>;
    fn register_area(&mut self, area: Rect, mask: AreaMask) -> Result<AreaCookie>;
    fn unregister_area(&mut self, cookie: &AreaCookie) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Device {
    Pointer,
    Keyboard,
}

/// Input grab state machine over a [`DisplayServer`]
pub struct InputGrabber<D> {
    display: D,
    retry_attempts: u32,
    pointer_grabbed: bool,
    keyboard_grabbed: bool,
    token: Option<GrabToken>,
}

impl<D: DisplayServer> InputGrabber<D> {
    pub fn new(display: D, retry_attempts: u32) -> Self {
        Self {
            display,
            retry_attempts: retry_attempts.max(1),
            pointer_grabbed: false,
            keyboard_grabbed: false,
            token: None,
        }
    }

    #[cfg(test)]
    pub fn is_pointer_grabbed(&self) -> bool {
        self.pointer_grabbed
    }

    #[cfg(test)]
    pub fn is_keyboard_grabbed(&self) -> bool {
        self.keyboard_grabbed
    }

    #[cfg(test)]
    pub fn token(&self) -> Option<&GrabToken> {
        self.token.as_ref()
    }

    pub fn cookie(&self) -> Option<&AreaCookie> {
        self.token.as_ref().map(|token| &token.cookie)
    }

    pub fn grab_pointer(&mut self, window: Option<u32>) {
        let Some(window) = window else { return };
        self.pointer_grabbed = self.grab(Device::Pointer, window);
    }

    pub fn grab_keyboard(&mut self, window: Option<u32>) {
        let Some(window) = window else { return };
        self.keyboard_grabbed = self.grab(Device::Keyboard, window);
    }

    /// Ungrabs need no target window so they also work mid-teardown
    pub fn ungrab_pointer(&mut self) {
        if let Err(e) = self.display.ungrab_pointer() {
            debug!("Ignoring pointer ungrab failure: {}", e);
        }
        self.pointer_grabbed = false;
    }

    pub fn ungrab_keyboard(&mut self) {
        if let Err(e) = self.display.ungrab_keyboard() {
            debug!("Ignoring keyboard ungrab failure: {}", e);
        }
        self.keyboard_grabbed = false;
    }

    /// Release both grabs regardless of the tracked state
    pub fn ungrab_all(&mut self) {
        self.ungrab_pointer();
        self.ungrab_keyboard();
    }

    /// Register the exclusive area. If a token is already held it is
    /// returned unchanged (first registration wins).
    pub fn register_area(&mut self, area: Rect, mask: AreaMask) -> Option<&GrabToken> {
        if self.token.is_none() {
            match self.display.register_area(area, mask) {
                Ok(cookie) => {
                    debug!("Registered mouse area {:?} (cookie={})", area, cookie.as_str());
                    self.token = Some(GrabToken { area, cookie });
                }
                Err(e) => warn!("Failed to register mouse area {:?}: {}", area, e),
            }
        }
        self.token.as_ref()
    }

    pub fn unregister_area(&mut self) {
        if let Some(token) = self.token.take() {
            debug!("Unregistering mouse area (cookie={})", token.cookie.as_str());
            if let Err(e) = self.display.unregister_area(&token.cookie) {
                debug!("Ignoring mouse area unregister failure: {}", e);
            }
        }
    }

    fn grab(&mut self, device: Device, window: u32) -> bool {
        for attempt in 1..=self.retry_attempts {
            let result = match device {
                Device::Pointer => self.display.grab_pointer(window),
                Device::Keyboard => self.display.grab_keyboard(window),
            };
            match result {
                Ok(status) => {
                    trace!("{:?} grab attempt {}: {:?}", device, attempt, status);
                    if status.is_acquired() {
                        debug!("{:?} grabbed on window 0x{:x} ({:?})", device, window, status);
                        return true;
                    }
                }
                Err(e) => {
                    warn!("{:?} grab request failed: {}", device, e);
                    return false;
                }
            }
        }
        warn!(
            "Giving up {:?} grab on window 0x{:x} after {} attempts",
            device, window, self.retry_attempts
        );
        false
    }
}
