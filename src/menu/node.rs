//! Menu nodes and the arena that owns them
//!
//! Every visible menu window is a [`MenuNode`] stored in a [`MenuArena`].
//! Nodes refer to each other through [`NodeId`] handles: `child` is the
//! owning link (destroying a node destroys its child chain), `parent` is a
//! plain back-reference. Handles carry a generation so a handle to a
//! destroyed node never resolves to a node created later in the same slot.

use crate::geometry::{Rect, Size};
use crate::menu::content::MenuContent;
use crate::session::SessionId;

/// Handle to a node in a [`MenuArena`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

/// One menu window
#[derive(Debug, Clone)]
pub struct MenuNode {
    id: NodeId,
    session: SessionId,
    position: (i32, i32),
    size: Size,
    content: MenuContent,
    parent: Option<NodeId>,
    child: Option<NodeId>,
}

impl MenuNode {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn session(&self) -> &SessionId {
        &self.session
    }

    /// Top-left corner, fixed for the lifetime of the node
    pub fn position(&self) -> (i32, i32) {
        self.position
    }

    #[cfg(test)]
    pub fn size(&self) -> Size {
        self.size
    }

    pub fn rect(&self) -> Rect {
        Rect::from_origin(self.position, self.size)
    }

    pub fn content(&self) -> &MenuContent {
        &self.content
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn child(&self) -> Option<NodeId> {
        self.child
    }

    pub fn is_sub_menu(&self) -> bool {
        self.parent.is_some()
    }

    /// Dock styling only applies to root menus
    pub fn is_dock_menu(&self) -> bool {
        self.content.is_dock_menu && !self.is_sub_menu()
    }

    pub(crate) fn set_size(&mut self, size: Size) {
        self.size = size;
    }

    pub(crate) fn set_content(&mut self, content: MenuContent) {
        self.content = content;
    }

    pub(crate) fn content_mut(&mut self) -> &mut MenuContent {
        &mut self.content
    }

    pub(crate) fn set_session(&mut self, session: SessionId) {
        self.session = session;
    }

    pub(crate) fn set_child(&mut self, child: Option<NodeId>) {
        self.child = child;
    }
}

struct Slot {
    generation: u32,
    node: Option<MenuNode>,
}

/// Slot storage for all live menu nodes
#[derive(Default)]
pub struct MenuArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl MenuArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node; its position is taken from the content
    pub fn insert(
        &mut self,
        session: SessionId,
        content: MenuContent,
        parent: Option<NodeId>,
    ) -> NodeId {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot { generation: 0, node: None });
                (self.slots.len() - 1) as u32
            }
        };
        let slot = &mut self.slots[index as usize];
        let id = NodeId {
            index,
            generation: slot.generation,
        };
        slot.node = Some(MenuNode {
            id,
            session,
            position: (content.x, content.y),
            size: Size::default(),
            content,
            parent,
            child: None,
        });
        id
    }

    pub fn remove(&mut self, id: NodeId) -> Option<MenuNode> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let node = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        Some(node)
    }

    pub fn get(&self, id: NodeId) -> Option<&MenuNode> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_ref()
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut MenuNode> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_mut()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.node.is_some()).count()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &MenuNode> {
        self.slots.iter().filter_map(|slot| slot.node.as_ref())
    }

    /// `id` followed by its descendants, root-most first
    pub fn chain(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut next = self.get(id).map(|node| node.id);
        while let Some(current) = next {
            chain.push(current);
            next = self.get(current).and_then(|node| node.child);
        }
        chain
    }

    /// Root of the hierarchy `id` belongs to
    pub fn ancestor(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(parent) = self.get(current).and_then(|node| node.parent) {
            current = parent;
        }
        current
    }

    /// Union of the rectangles of `id` and its descendant chain
    pub fn in_menu_area(&self, id: NodeId, x: i32, y: i32) -> bool {
        self.chain(id)
            .into_iter()
            .filter_map(|current| self.get(current))
            .any(|node| node.rect().contains(x, y))
    }
}
