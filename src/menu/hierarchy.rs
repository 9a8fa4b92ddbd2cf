//! Menu Node operations
//!
//! [`Hierarchy`] pairs the node arena with the presentation backend so that
//! every tree edit keeps the on-screen surfaces in sync.

use tracing::{debug, warn};

use crate::error::MenuError;
use crate::menu::content::{ItemUpdate, MenuContent};
use crate::menu::node::{MenuArena, MenuNode, NodeId};
use crate::presentation::Presentation;
use crate::session::SessionId;

pub struct Hierarchy<P> {
    arena: MenuArena,
    presentation: P,
}

impl<P: Presentation> Hierarchy<P> {
    pub fn new(presentation: P) -> Self {
        Self {
            arena: MenuArena::new(),
            presentation,
        }
    }

    pub fn node(&self, id: NodeId) -> Option<&MenuNode> {
        self.arena.get(id)
    }

    #[cfg(test)]
    pub fn arena(&self) -> &MenuArena {
        &self.arena
    }

    pub fn presentation(&self) -> &P {
        &self.presentation
    }

    pub fn presentation_mut(&mut self) -> &mut P {
        &mut self.presentation
    }

    pub fn window(&self, id: NodeId) -> Option<u32> {
        self.arena.get(id)?;
        self.presentation.window(id)
    }

    /// Create and show a root node. Nothing is left behind on failure.
    pub fn create_root(
        &mut self,
        session: SessionId,
        content: MenuContent,
    ) -> Result<NodeId, MenuError> {
        self.create(session, content, None)
    }

    fn create(
        &mut self,
        session: SessionId,
        content: MenuContent,
        parent: Option<NodeId>,
    ) -> Result<NodeId, MenuError> {
        let id = self.arena.insert(session, content, parent);
        let shown = match self.arena.get(id) {
            Some(node) => self.presentation.show(node),
            None => return Err(MenuError::Presentation("node vanished".into())),
        };
        match shown {
            Ok(size) => {
                if let Some(node) = self.arena.get_mut(id) {
                    node.set_size(size);
                }
                debug!("Menu node {:?} shown ({}x{})", id, size.width, size.height);
                Ok(id)
            }
            Err(e) => {
                self.presentation.destroy(id);
                self.arena.remove(id);
                Err(MenuError::Presentation(e.to_string()))
            }
        }
    }

    /// Replace the items of `id` in place; identity and position stay.
    pub fn set_content(&mut self, id: NodeId, content: MenuContent) -> Result<(), MenuError> {
        let node = self
            .arena
            .get_mut(id)
            .ok_or_else(|| MenuError::Presentation("menu node is gone".into()))?;
        node.set_content(content);
        let size = self
            .presentation
            .update_content(node)
            .map_err(|e| MenuError::Presentation(e.to_string()))?;
        node.set_size(size);
        Ok(())
    }

    /// Re-assign a hierarchy to another session
    pub fn set_session(&mut self, root: NodeId, session: &SessionId) {
        for id in self.arena.chain(root) {
            if let Some(node) = self.arena.get_mut(id) {
                node.set_session(session.clone());
            }
        }
    }

    /// Open `content` as the submenu of `parent`, replacing any open one.
    /// Empty or missing content only closes the current submenu.
    pub fn show_sub_menu(&mut self, parent: NodeId, content: Option<MenuContent>) -> Option<NodeId> {
        let (session, old_child) = {
            let node = self.arena.get(parent)?;
            (node.session().clone(), node.child())
        };
        if let Some(old_child) = old_child {
            self.destroy_forward(old_child);
        }
        if let Some(node) = self.arena.get_mut(parent) {
            node.set_child(None);
        }

        let content = content.filter(|content| !content.is_empty())?;
        match self.create(session, content, Some(parent)) {
            Ok(child) => {
                if let Some(node) = self.arena.get_mut(parent) {
                    node.set_child(Some(child));
                }
                Some(child)
            }
            Err(e) => {
                warn!("Failed to open submenu of {:?}: {}", parent, e);
                None
            }
        }
    }

    /// Destroy `id` and all of its descendants, deepest first
    pub fn destroy_forward(&mut self, id: NodeId) {
        let chain = self.arena.chain(id);
        if chain.is_empty() {
            return;
        }
        let parent = self.arena.get(id).and_then(|node| node.parent());
        for current in chain.into_iter().rev() {
            self.presentation.destroy(current);
            self.arena.remove(current);
        }
        // The parent keeps no dangling child link
        if let Some(node) = parent.and_then(|parent| self.arena.get_mut(parent)) {
            if node.child() == Some(id) {
                node.set_child(None);
            }
        }
        debug!("Destroyed menu chain from {:?}", id);
    }

    /// Destroy the descendants of `id` and give focus back to it
    pub fn destroy_subs(&mut self, id: NodeId) {
        let Some(child) = self.arena.get(id).and_then(|node| node.child()) else {
            self.presentation.activate(id);
            return;
        };
        self.destroy_forward(child);
        if let Some(node) = self.arena.get_mut(id) {
            node.set_child(None);
        }
        self.presentation.activate(id);
    }

    pub fn in_menu_area(&self, id: NodeId, x: i32, y: i32) -> bool {
        self.arena.in_menu_area(id, x, y)
    }

    /// First node along the child chain that holds input focus, else `id`
    pub fn focus_owner(&self, id: NodeId) -> NodeId {
        self.arena
            .chain(id)
            .into_iter()
            .find(|current| self.presentation.is_active(*current))
            .unwrap_or(id)
    }

    pub fn ancestor(&self, id: NodeId) -> NodeId {
        self.arena.ancestor(id)
    }

    pub fn activate(&mut self, id: NodeId) {
        if self.arena.contains(id) {
            self.presentation.activate(id);
        }
    }

    /// Focus the parent of `id` (Left key in a submenu)
    pub fn activate_parent(&mut self, id: NodeId) {
        if let Some(parent) = self.arena.get(id).and_then(|node| node.parent()) {
            self.presentation.activate(parent);
        }
    }

    /// Focus the submenu of `id` and select its first item
    pub fn activate_sub_menu(&mut self, id: NodeId) {
        if let Some(child) = self.arena.get(id).and_then(|node| node.child()) {
            self.presentation.activate(child);
            self.presentation.select_first(child);
        }
    }

    /// Apply an item update to every node of `session`.
    /// Returns true if any node carried the item.
    pub fn update_item(&mut self, session: &SessionId, item_id: &str, update: &ItemUpdate) -> bool {
        let targets: Vec<NodeId> = self
            .arena
            .iter()
            .filter(|node| node.session() == session)
            .map(|node| node.id())
            .collect();
        let mut found = false;
        for id in targets {
            if let Some(node) = self.arena.get_mut(id) {
                found |= node.content_mut().apply(item_id, update);
            }
            self.presentation.update_item(id, item_id, update);
        }
        found
    }
}
