//! Menu Hierarchy Controller
//!
//! Owns the open hierarchy and the input grabs and decides every
//! transition between them:
//!
//! ```text
//! Idle --show--> Open --dismiss/unregister--> Closing --> Idle
//!                 ^  |
//!                 +--+ show again (content swap)
//! ```
//!
//! Pointer events are hit-tested against the union of all visible menu
//! rectangles. Inside that area the pointer grab is dropped so the menu
//! windows receive normal input, outside it the grab is taken back so a
//! click anywhere else closes the menu.

use tracing::{debug, info, trace};

use crate::error::MenuError;
use crate::grab::{AreaCookie, AreaMask, DisplayServer, InputGrabber};
use crate::menu::content::MenuContent;
use crate::menu::hierarchy::Hierarchy;
use crate::menu::key::MenuKey;
use crate::menu::node::NodeId;
use crate::presentation::Presentation;
use crate::session::SessionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// No menu open
    Idle,
    /// Root visible, grabs held
    Open,
    /// Teardown in progress
    Closing,
}

/// Raw input routed by the mouse-area service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputKind {
    Motion,
    ButtonPress { button: i32 },
    KeyPress { key: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputEvent {
    pub kind: InputKind,
    pub x: i32,
    pub y: i32,
    pub cookie: AreaCookie,
}

/// What the caller has to do after an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Stay,
    /// The owning session asked to go away (outside click, focus loss)
    Dismiss(SessionId),
}

pub struct HierarchyController<D, P> {
    grabber: InputGrabber<D>,
    hierarchy: Hierarchy<P>,
    state: ControllerState,
    root: Option<NodeId>,
}

impl<D: DisplayServer, P: Presentation> HierarchyController<D, P> {
    pub fn new(grabber: InputGrabber<D>, hierarchy: Hierarchy<P>) -> Self {
        Self {
            grabber,
            hierarchy,
            state: ControllerState::Idle,
            root: None,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Session that owns the open hierarchy
    pub fn owner(&self) -> Option<&SessionId> {
        self.root
            .and_then(|root| self.hierarchy.node(root))
            .map(|node| node.session())
    }

    #[cfg(test)]
    pub fn grabber(&self) -> &InputGrabber<D> {
        &self.grabber
    }

    pub fn hierarchy(&self) -> &Hierarchy<P> {
        &self.hierarchy
    }

    pub fn hierarchy_mut(&mut self) -> &mut Hierarchy<P> {
        &mut self.hierarchy
    }

    fn root_window(&self) -> Option<u32> {
        self.root.and_then(|root| self.hierarchy.window(root))
    }

    /// Open `content` for `session`, swapping the content of an already
    /// open root in place.
    pub fn show_menu(&mut self, session: &SessionId, content: MenuContent) -> Result<NodeId, MenuError> {
        let open_root = self
            .root
            .filter(|root| self.state == ControllerState::Open && self.hierarchy.node(*root).is_some());

        let root = match open_root {
            Some(root) => {
                debug!("Swapping content of open menu {:?} for {}", root, session);
                self.hierarchy.destroy_subs(root);
                self.hierarchy.set_session(root, session);
                self.hierarchy.set_content(root, content)?;
                root
            }
            None => {
                let root = self.hierarchy.create_root(session.clone(), content)?;
                info!("Opened menu {:?} for {}", root, session);
                self.root = Some(root);
                self.state = ControllerState::Open;
                root
            }
        };

        let area = self.hierarchy.presentation().monitor_area();
        self.grabber.register_area(area, AreaMask::all());
        self.grab_all();
        self.hierarchy.activate(root);
        Ok(root)
    }

    /// Open or close the submenu of `parent`
    pub fn show_sub_menu(&mut self, parent: NodeId, content: Option<MenuContent>) -> Option<NodeId> {
        if self.state != ControllerState::Open {
            return None;
        }
        let child = self.hierarchy.show_sub_menu(parent, content);
        if child.is_some() {
            self.grab_all();
        }
        child
    }

    fn grab_all(&mut self) {
        let window = self.root_window();
        self.grabber.grab_pointer(window);
        self.grabber.grab_keyboard(window);
    }

    /// Route one mouse-area event. Events carrying a stale cookie are dropped.
    pub fn handle_input(&mut self, event: &InputEvent) -> Transition {
        if self.state != ControllerState::Open {
            trace!("Dropping {:?} while {:?}", event.kind, self.state);
            return Transition::Stay;
        }
        if self.grabber.cookie() != Some(&event.cookie) {
            trace!("Dropping {:?} with stale cookie {}", event.kind, event.cookie.as_str());
            return Transition::Stay;
        }
        let Some(root) = self.root else {
            return Transition::Stay;
        };

        match &event.kind {
            InputKind::Motion => {
                if self.hierarchy.in_menu_area(root, event.x, event.y) {
                    self.grabber.ungrab_pointer();
                } else {
                    let window = self.root_window();
                    self.grabber.grab_pointer(window);
                }
                Transition::Stay
            }
            InputKind::ButtonPress { button } => {
                if self.hierarchy.in_menu_area(root, event.x, event.y) {
                    return Transition::Stay;
                }
                debug!("Button {} at ({}, {}) outside menu", button, event.x, event.y);
                self.grabber.ungrab_all();
                self.dismiss()
            }
            InputKind::KeyPress { key } => {
                if let Some(key) = MenuKey::parse(key) {
                    let target = self.hierarchy.focus_owner(root);
                    trace!("Forwarding {:?} to {:?}", key, target);
                    self.hierarchy.presentation_mut().send_key(target, key);
                }
                Transition::Stay
            }
        }
    }

    /// The menu windows lost platform focus entirely
    pub fn focus_lost(&mut self) -> Transition {
        if self.state != ControllerState::Open {
            return Transition::Stay;
        }
        debug!("Menu lost focus");
        self.grabber.ungrab_all();
        self.dismiss()
    }

    fn dismiss(&mut self) -> Transition {
        match self.owner().cloned() {
            Some(owner) => Transition::Dismiss(owner),
            None => {
                self.close();
                Transition::Stay
            }
        }
    }

    /// Tear the whole hierarchy down. Grabs and the mouse area are
    /// released even if the tree is already partially gone.
    pub fn close(&mut self) {
        self.state = ControllerState::Closing;
        self.grabber.ungrab_all();
        self.grabber.unregister_area();
        if let Some(root) = self.root.take() {
            let ancestor = self.hierarchy.ancestor(root);
            self.hierarchy.destroy_forward(ancestor);
            info!("Closed menu {:?}", ancestor);
        }
        self.state = ControllerState::Idle;
    }

    pub fn release_area(&mut self) {
        self.grabber.unregister_area();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Size;
    use crate::testing::{DisplayCall, FakeDisplay, FakePresentation, SurfaceCall};

    type Controller = HierarchyController<FakeDisplay, FakePresentation>;

    fn controller() -> (Controller, FakeDisplay, FakePresentation) {
        let display = FakeDisplay::new();
        let presentation = FakePresentation::new(Size::new(100, 60));
        let controller = HierarchyController::new(
            InputGrabber::new(display.clone(), 200),
            Hierarchy::new(presentation.clone()),
        );
        (controller, display, presentation)
    }

    fn content(x: i32, y: i32, items: &[&str]) -> MenuContent {
        let items: Vec<String> = items.iter().map(|item| format!("\"{item}\"")).collect();
        MenuContent::parse(&format!(r#"{{"x":{x},"y":{y},"items":[{}]}}"#, items.join(",")))
            .unwrap()
    }

    fn session() -> SessionId {
        SessionId::from("/com/deepin/menu/a")
    }

    fn event(controller: &Controller, kind: InputKind, x: i32, y: i32) -> InputEvent {
        InputEvent {
            kind,
            x,
            y,
            cookie: controller.grabber().cookie().cloned().unwrap(),
        }
    }

    #[test]
    fn test_show_opens_root_and_grabs() {
        let (mut controller, display, _) = controller();

        let root = controller.show_menu(&session(), content(100, 100, &["A", "B"])).unwrap();

        assert_eq!(controller.state(), ControllerState::Open);
        let node = controller.hierarchy().node(root).unwrap();
        assert_eq!(node.position(), (100, 100));
        assert_eq!(node.content().items.len(), 2);
        assert!(controller.grabber().is_pointer_grabbed());
        assert!(controller.grabber().is_keyboard_grabbed());
        assert_eq!(display.count(|call| matches!(call, DisplayCall::RegisterArea(_))), 1);
    }

    #[test]
    fn test_outside_click_releases_grabs_and_dismisses() {
        let (mut controller, _, _) = controller();
        controller.show_menu(&session(), content(100, 100, &["A", "B"])).unwrap();

        let press = event(&controller, InputKind::ButtonPress { button: 1 }, 500, 500);
        assert_eq!(controller.handle_input(&press), Transition::Dismiss(session()));
        assert!(!controller.grabber().is_pointer_grabbed());
        assert!(!controller.grabber().is_keyboard_grabbed());

        controller.close();
        assert_eq!(controller.state(), ControllerState::Idle);
        assert!(controller.hierarchy().arena().is_empty());
        assert!(controller.grabber().cookie().is_none());
    }

    #[test]
    fn test_inside_click_is_ignored() {
        let (mut controller, _, _) = controller();
        controller.show_menu(&session(), content(100, 100, &["A"])).unwrap();

        let press = event(&controller, InputKind::ButtonPress { button: 1 }, 200, 160);
        assert_eq!(controller.handle_input(&press), Transition::Stay);
        assert!(controller.grabber().is_keyboard_grabbed());
    }

    #[test]
    fn test_motion_toggles_pointer_grab() {
        let (mut controller, _, _) = controller();
        controller.show_menu(&session(), content(100, 100, &["A"])).unwrap();

        let inside = event(&controller, InputKind::Motion, 150, 120);
        controller.handle_input(&inside);
        assert!(!controller.grabber().is_pointer_grabbed());
        assert!(controller.grabber().is_keyboard_grabbed());

        let outside = event(&controller, InputKind::Motion, 20, 20);
        controller.handle_input(&outside);
        assert!(controller.grabber().is_pointer_grabbed());
    }

    #[test]
    fn test_stale_cookie_never_transitions() {
        let (mut controller, display, _) = controller();
        controller.show_menu(&session(), content(100, 100, &["A"])).unwrap();
        let calls_before = display.calls().len();

        for kind in [
            InputKind::ButtonPress { button: 1 },
            InputKind::Motion,
            InputKind::KeyPress { key: "escape".into() },
        ] {
            let stale = InputEvent {
                kind,
                x: 900,
                y: 900,
                cookie: AreaCookie("stale".into()),
            };
            assert_eq!(controller.handle_input(&stale), Transition::Stay);
        }

        assert_eq!(controller.state(), ControllerState::Open);
        assert_eq!(display.calls().len(), calls_before);
    }

    #[test]
    fn test_sub_menu_extends_menu_area() {
        let (mut controller, _, _) = controller();
        let root = controller.show_menu(&session(), content(100, 100, &["A", "B"])).unwrap();
        let child = controller.show_sub_menu(root, Some(content(200, 120, &["C"]))).unwrap();

        assert_eq!(controller.hierarchy().node(root).unwrap().child(), Some(child));
        let press = event(&controller, InputKind::ButtonPress { button: 1 }, 290, 175);
        assert_eq!(controller.handle_input(&press), Transition::Stay);
    }

    #[test]
    fn test_key_goes_to_active_sub_menu() {
        let (mut controller, _, screen) = controller();
        let root = controller.show_menu(&session(), content(100, 100, &["A", "B"])).unwrap();
        let child = controller.show_sub_menu(root, Some(content(200, 120, &["C"]))).unwrap();
        controller.hierarchy_mut().activate_sub_menu(root);

        let key = event(&controller, InputKind::KeyPress { key: "down".into() }, 0, 0);
        controller.handle_input(&key);

        assert_eq!(screen.last_call(), Some(SurfaceCall::SendKey(child, MenuKey::Down)));
    }

    #[test]
    fn test_disallowed_key_is_dropped() {
        let (mut controller, _, screen) = controller();
        controller.show_menu(&session(), content(100, 100, &["A"])).unwrap();
        let calls_before = screen.calls().len();

        let key = event(&controller, InputKind::KeyPress { key: "F1".into() }, 0, 0);
        controller.handle_input(&key);

        assert_eq!(screen.calls().len(), calls_before);
    }

    #[test]
    fn test_content_swap_keeps_root() {
        let (mut controller, display, _) = controller();
        let root = controller.show_menu(&session(), content(100, 100, &["A"])).unwrap();
        controller.show_sub_menu(root, Some(content(200, 100, &["C"]))).unwrap();
        let cookie = controller.grabber().cookie().cloned();

        let swapped = controller.show_menu(&session(), content(400, 400, &["X", "Y"])).unwrap();

        assert_eq!(swapped, root);
        let node = controller.hierarchy().node(root).unwrap();
        assert_eq!(node.position(), (100, 100));
        assert_eq!(node.content().items.len(), 2);
        assert_eq!(node.child(), None);
        assert_eq!(controller.grabber().cookie().cloned(), cookie);
        assert_eq!(display.count(|call| matches!(call, DisplayCall::RegisterArea(_))), 1);
    }

    #[test]
    fn test_focus_loss_dismisses_owner() {
        let (mut controller, _, _) = controller();
        controller.show_menu(&session(), content(0, 0, &["A"])).unwrap();

        assert_eq!(controller.focus_lost(), Transition::Dismiss(session()));
        assert!(!controller.grabber().is_keyboard_grabbed());
    }

    #[test]
    fn test_close_releases_grabs_after_partial_teardown() {
        let (mut controller, display, _) = controller();
        let root = controller.show_menu(&session(), content(0, 0, &["A"])).unwrap();
        controller.hierarchy_mut().destroy_forward(root);

        controller.close();

        assert!(!controller.grabber().is_pointer_grabbed());
        assert!(display.count(|call| matches!(call, DisplayCall::UngrabKeyboard)) >= 1);
        assert_eq!(display.count(|call| matches!(call, DisplayCall::UnregisterArea(_))), 1);
        assert_eq!(controller.state(), ControllerState::Idle);
    }

    #[test]
    fn test_events_while_idle_are_ignored() {
        let (mut controller, _, _) = controller();
        let press = InputEvent {
            kind: InputKind::ButtonPress { button: 1 },
            x: 0,
            y: 0,
            cookie: AreaCookie("cookie-1".into()),
        };
        assert_eq!(controller.handle_input(&press), Transition::Stay);
        assert_eq!(controller.focus_lost(), Transition::Stay);
    }
}
