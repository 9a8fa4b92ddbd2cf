//! Session Registry
//!
//! Maps menu object paths to sessions and turns D-Bus menu requests
//! into controller calls. Everything the registry wants to happen outside
//! the core thread (bus signals, timers, process restarts) is queued as an
//! [`Effect`] and drained by the service loop.

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::{debug, info, warn};

use crate::error::MenuError;
use crate::grab::DisplayServer;
use crate::menu::content::{ItemUpdate, MenuContent};
use crate::menu::controller::{HierarchyController, InputEvent, Transition};
use crate::menu::node::NodeId;
use crate::presentation::{Presentation, PresentationEvent};

/// Object path of a registered menu session
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(path: &str) -> Self {
        Self(path.to_string())
    }
}

impl From<String> for SessionId {
    fn from(path: String) -> Self {
        Self(path)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
pub struct HierarchySession {
    pub id: SessionId,
    /// Root of this session's menu, none before the first show
    pub root: Option<NodeId>,
}

/// Signals emitted on a session's object path
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    ItemInvoked { session: SessionId, item_id: String, checked: bool },
    ItemTextSet { session: SessionId, item_id: String, text: String },
    ItemActivitySet { session: SessionId, item_id: String, active: bool },
    ItemCheckedSet { session: SessionId, item_id: String, checked: bool },
    MenuUnregistered { session: SessionId },
}

impl Notification {
    /// Object path the signal is emitted on
    pub fn session(&self) -> &SessionId {
        match self {
            Self::ItemInvoked { session, .. }
            | Self::ItemTextSet { session, .. }
            | Self::ItemActivitySet { session, .. }
            | Self::ItemCheckedSet { session, .. }
            | Self::MenuUnregistered { session } => session,
        }
    }
}

/// Work for the service loop
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Notify(Notification),
    /// Post `RestartWindowElapsed(generation)` after `after`
    ArmRestartTimer { generation: u64, after: Duration },
    /// Start a replacement service process
    SpawnReplacement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartDecision {
    /// First unregister: open the grace window
    Arm { generation: u64 },
    /// Second unregister inside the window
    Restart,
    Disabled,
}

/// Debounce for replacement-process restarts.
///
/// An unregister opens a grace window. A second unregister while the
/// window is open triggers exactly one restart and closes it. Registering
/// a session or the window elapsing closes it without a restart.
#[derive(Debug)]
pub struct RestartGuard {
    grace: Duration,
    enabled: bool,
    generation: u64,
    armed: Option<u64>,
}

impl RestartGuard {
    pub fn new(grace: Duration, enabled: bool) -> Self {
        Self {
            grace,
            enabled,
            generation: 0,
            armed: None,
        }
    }

    pub fn grace(&self) -> Duration {
        self.grace
    }

    #[cfg(test)]
    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    pub fn on_unregister(&mut self) -> RestartDecision {
        if !self.enabled {
            return RestartDecision::Disabled;
        }
        if self.armed.take().is_some() {
            return RestartDecision::Restart;
        }
        self.generation += 1;
        self.armed = Some(self.generation);
        RestartDecision::Arm {
            generation: self.generation,
        }
    }

    pub fn on_register(&mut self) {
        if self.armed.take().is_some() {
            debug!("Restart window cancelled by new registration");
        }
    }

    /// Returns true if `generation` was still the open window
    pub fn on_elapsed(&mut self, generation: u64) -> bool {
        if self.armed == Some(generation) {
            self.armed = None;
            true
        } else {
            false
        }
    }
}

pub struct SessionRegistry<D, P> {
    controller: HierarchyController<D, P>,
    sessions: HashMap<SessionId, HierarchySession>,
    restart: RestartGuard,
    root_path: String,
    serial: u64,
    effects: Vec<Effect>,
}

impl<D: DisplayServer, P: Presentation> SessionRegistry<D, P> {
    pub fn new(controller: HierarchyController<D, P>, root_path: &str, restart: RestartGuard) -> Self {
        Self {
            controller,
            sessions: HashMap::new(),
            restart,
            root_path: root_path.trim_end_matches('/').to_string(),
            serial: 0,
            effects: Vec::new(),
        }
    }

    #[cfg(test)]
    pub fn controller(&self) -> &HierarchyController<D, P> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut HierarchyController<D, P> {
        &mut self.controller
    }

    #[cfg(test)]
    pub fn session(&self, id: &SessionId) -> Option<&HierarchySession> {
        self.sessions.get(id)
    }

    #[cfg(test)]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn take_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    fn notify(&mut self, notification: Notification) {
        self.effects.push(Effect::Notify(notification));
    }

    fn next_path(&mut self) -> SessionId {
        self.serial += 1;
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.subsec_nanos())
            .unwrap_or_default();
        SessionId(format!(
            "{}/m{:x}_{}_{:08x}",
            self.root_path,
            std::process::id(),
            self.serial,
            nanos
        ))
    }

    /// Allocate a new session; it has no menu until `show_menu`
    pub fn register_session(&mut self) -> SessionId {
        self.restart.on_register();
        let id = self.next_path();
        self.sessions.insert(
            id.clone(),
            HierarchySession {
                id: id.clone(),
                root: None,
            },
        );
        info!("Registered menu session {}", id);
        id
    }

    pub fn unregister_session(&mut self, id: &SessionId) -> Result<(), MenuError> {
        let Some(session) = self.sessions.remove(id) else {
            return Err(MenuError::UnknownSession(id.to_string()));
        };

        // The area belongs to whichever session owns the open menu, so it is
        // only released together with that menu or when nothing is open.
        let owns_menu = session.root.is_some() && session.root == self.controller.root();
        if owns_menu || self.controller.owner().is_none() {
            self.controller.close();
        }
        self.notify(Notification::MenuUnregistered { session: session.id.clone() });
        info!("Unregistered menu session {}", session.id);

        match self.restart.on_unregister() {
            RestartDecision::Arm { generation } => self.effects.push(Effect::ArmRestartTimer {
                generation,
                after: self.restart.grace(),
            }),
            RestartDecision::Restart => {
                info!("Second unregister inside restart window, restarting service");
                self.effects.push(Effect::SpawnReplacement);
            }
            RestartDecision::Disabled => {}
        }
        Ok(())
    }

    /// Show or replace the menu of `id`. The payload is parsed before
    /// anything changes, so a malformed one leaves the screen untouched.
    pub fn show_menu(&mut self, id: &SessionId, json: &str) -> Result<NodeId, MenuError> {
        if !self.sessions.contains_key(id) {
            return Err(MenuError::UnknownSession(id.to_string()));
        }
        let content = MenuContent::parse(json)?;

        let previous_owner = self.controller.owner().cloned();
        let root = self.controller.show_menu(id, content)?;

        if let Some(previous) = previous_owner.filter(|previous| previous != id) {
            if let Some(session) = self.sessions.get_mut(&previous) {
                session.root = None;
            }
        }
        if let Some(session) = self.sessions.get_mut(id) {
            session.root = Some(root);
        }
        Ok(root)
    }

    pub fn set_item_text(&mut self, id: &SessionId, item_id: &str, text: &str) -> Result<(), MenuError> {
        self.update_item(id, item_id, ItemUpdate::Text(text.to_string()))
    }

    pub fn set_item_activity(&mut self, id: &SessionId, item_id: &str, active: bool) -> Result<(), MenuError> {
        self.update_item(id, item_id, ItemUpdate::Activity(active))
    }

    pub fn set_item_checked(&mut self, id: &SessionId, item_id: &str, checked: bool) -> Result<(), MenuError> {
        self.update_item(id, item_id, ItemUpdate::Checked(checked))
    }

    fn update_item(&mut self, id: &SessionId, item_id: &str, update: ItemUpdate) -> Result<(), MenuError> {
        if !self.sessions.contains_key(id) {
            return Err(MenuError::UnknownSession(id.to_string()));
        }
        if !self.controller.hierarchy_mut().update_item(id, item_id, &update) {
            debug!("Item {} not shown for {}, announcing anyway", item_id, id);
        }
        let session = id.clone();
        let item_id = item_id.to_string();
        self.notify(match update {
            ItemUpdate::Text(text) => Notification::ItemTextSet { session, item_id, text },
            ItemUpdate::Activity(active) => Notification::ItemActivitySet { session, item_id, active },
            ItemUpdate::Checked(checked) => Notification::ItemCheckedSet { session, item_id, checked },
        });
        Ok(())
    }

    pub fn handle_input(&mut self, event: &InputEvent) {
        let transition = self.controller.handle_input(event);
        self.apply(transition);
    }

    fn apply(&mut self, transition: Transition) {
        if let Transition::Dismiss(owner) = transition {
            if let Err(e) = self.unregister_session(&owner) {
                // Owner already went away; make sure nothing stays on screen
                warn!("Dismissing menu: {}", e);
                self.controller.close();
            }
        }
    }

    /// Drain and act on everything the presentation layer reported
    pub fn process_presentation_events(&mut self) {
        loop {
            let events = self.controller.hierarchy_mut().presentation_mut().take_events();
            if events.is_empty() {
                break;
            }
            for event in events {
                self.handle_presentation_event(event);
            }
        }
    }

    fn handle_presentation_event(&mut self, event: PresentationEvent) {
        match event {
            PresentationEvent::ItemInvoked { node, item_id, checked } => {
                if let Some(session) = self.session_of(node) {
                    debug!("Item {} invoked in {}", item_id, session);
                    self.notify(Notification::ItemInvoked { session, item_id, checked });
                }
            }
            PresentationEvent::CheckedToggled { node, item_id, checked } => {
                if let Some(session) = self.session_of(node) {
                    if let Err(e) = self.set_item_checked(&session, &item_id, checked) {
                        warn!("Failed to propagate checked state of {}: {}", item_id, e);
                    }
                }
            }
            PresentationEvent::SubMenuRequested { node, content } => {
                self.controller.show_sub_menu(node, content);
            }
            PresentationEvent::ActivateParent { node } => {
                self.controller.hierarchy_mut().activate_parent(node);
            }
            PresentationEvent::ActivateSubMenu { node } => {
                self.controller.hierarchy_mut().activate_sub_menu(node);
            }
            PresentationEvent::DismissRequested { node } => match self.session_of(node) {
                Some(session) => self.apply(Transition::Dismiss(session)),
                None => self.controller.close(),
            },
            PresentationEvent::FocusLost => {
                let transition = self.controller.focus_lost();
                self.apply(transition);
            }
        }
    }

    fn session_of(&self, node: NodeId) -> Option<SessionId> {
        self.controller
            .hierarchy()
            .node(node)
            .map(|node| node.session().clone())
    }

    pub fn restart_window_elapsed(&mut self, generation: u64) {
        if self.restart.on_elapsed(generation) {
            debug!("Restart window {} elapsed without a second unregister", generation);
        }
    }

    /// Best-effort release before the process exits
    pub fn shutdown(&mut self) {
        self.controller.close();
        self.controller.release_area();
    }
}
