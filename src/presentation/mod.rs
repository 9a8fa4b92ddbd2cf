//! Presentation Layer
//!
//! The hierarchy drives menu surfaces through [`Presentation`]; user
//! interaction comes back as queued [`PresentationEvent`]s which the
//! service drains after every command.

pub mod layout;
pub mod x11;

use anyhow::Result;

use crate::geometry::{Rect, Size};
use crate::menu::content::{ItemUpdate, MenuContent};
use crate::menu::key::MenuKey;
use crate::menu::node::{MenuNode, NodeId};

/// Callback from a menu surface
#[derive(Debug, Clone, PartialEq)]
pub enum PresentationEvent {
    /// An item was activated (click or Enter)
    ItemInvoked {
        node: NodeId,
        item_id: String,
        checked: bool,
    },
    /// A checkable item changed state
    CheckedToggled {
        node: NodeId,
        item_id: String,
        checked: bool,
    },
    /// Show `content` as the submenu of `node`; `None` closes it
    SubMenuRequested {
        node: NodeId,
        content: Option<MenuContent>,
    },
    /// Give focus back to the parent of `node`
    ActivateParent { node: NodeId },
    /// Move focus into the submenu of `node`
    ActivateSubMenu { node: NodeId },
    /// Close the whole hierarchy
    DismissRequested { node: NodeId },
    /// None of the menu surfaces has platform focus anymore
    FocusLost,
}

/// Operations the core needs from the rendering side
pub trait Presentation {
    /// Create and map the surface for `node`, returning its laid-out size
    fn show(&mut self, node: &MenuNode) -> Result<Size>;

    /// Replace the items of an existing surface in place
    fn update_content(&mut self, node: &MenuNode) -> Result<Size>;

    fn destroy(&mut self, node: NodeId);

    /// Native window handle used as grab target
    fn window(&self, node: NodeId) -> Option<u32>;

    fn is_active(&self, node: NodeId) -> bool;

    fn activate(&mut self, node: NodeId);

    fn select_first(&mut self, node: NodeId);

    /// Deliver a simulated navigation key to the surface of `node`
    fn send_key(&mut self, node: NodeId, key: MenuKey);

    fn update_item(&mut self, node: NodeId, item_id: &str, update: &ItemUpdate);

    /// Work area of the monitor menus appear on
    fn monitor_area(&self) -> Rect;

    fn take_events(&mut self) -> Vec<PresentationEvent>;
}
