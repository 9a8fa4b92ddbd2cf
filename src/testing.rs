//! In-memory display server and presentation for unit tests

use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};
use std::rc::Rc;

use anyhow::{Result, bail};

use crate::geometry::{Rect, Size};
use crate::grab::{AreaCookie, AreaMask, DisplayServer, GrabStatus};
use crate::menu::content::ItemUpdate;
use crate::menu::key::MenuKey;
use crate::menu::node::{MenuNode, NodeId};
use crate::presentation::{Presentation, PresentationEvent};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayCall {
    GrabPointer(u32),
    UngrabPointer,
    GrabKeyboard(u32),
    UngrabKeyboard,
    RegisterArea(Rect),
    UnregisterArea(AreaCookie),
}

#[derive(Default)]
struct DisplayState {
    calls: Vec<DisplayCall>,
    pointer_script: VecDeque<GrabStatus>,
    keyboard_script: VecDeque<GrabStatus>,
    fail_ungrab: bool,
    next_cookie: u32,
}

/// Scriptable [`DisplayServer`]; clones share state
#[derive(Clone, Default)]
pub struct FakeDisplay {
    state: Rc<RefCell<DisplayState>>,
}

impl FakeDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replies for the next pointer grabs; Success once exhausted
    pub fn script_pointer(&self, replies: &[GrabStatus]) {
        self.state.borrow_mut().pointer_script.extend(replies.iter().copied());
    }

    pub fn script_keyboard(&self, replies: &[GrabStatus]) {
        self.state.borrow_mut().keyboard_script.extend(replies.iter().copied());
    }

    pub fn fail_ungrab(&self, fail: bool) {
        self.state.borrow_mut().fail_ungrab = fail;
    }

    pub fn calls(&self) -> Vec<DisplayCall> {
        self.state.borrow().calls.clone()
    }

    pub fn count(&self, predicate: impl Fn(&DisplayCall) -> bool) -> usize {
        self.state.borrow().calls.iter().filter(|call| predicate(call)).count()
    }

    fn record(&self, call: DisplayCall) {
        self.state.borrow_mut().calls.push(call);
    }
}

impl DisplayServer for FakeDisplay {
    fn grab_pointer(&mut self, window: u32) -> Result<GrabStatus> {
        self.record(DisplayCall::GrabPointer(window));
        let status = self.state.borrow_mut().pointer_script.pop_front();
        Ok(status.unwrap_or(GrabStatus::Success))
    }

    fn ungrab_pointer(&mut self) -> Result<()> {
        self.record(DisplayCall::UngrabPointer);
        if self.state.borrow().fail_ungrab {
            bail!("pointer ungrab refused");
        }
        Ok(())
    }

    fn grab_keyboard(&mut self, window: u32) -> Result<GrabStatus> {
        self.record(DisplayCall::GrabKeyboard(window));
        let status = self.state.borrow_mut().keyboard_script.pop_front();
        Ok(status.unwrap_or(GrabStatus::Success))
    }

    fn ungrab_keyboard(&mut self) -> Result<()> {
        self.record(DisplayCall::UngrabKeyboard);
        if self.state.borrow().fail_ungrab {
            bail!("keyboard ungrab refused");
        }
        Ok(())
    }

    fn register_area(&mut self, area: Rect, _mask: AreaMask) -> Result<AreaCookie> {
        self.record(DisplayCall::RegisterArea(area));
        let mut state = self.state.borrow_mut();
        state.next_cookie += 1;
        Ok(AreaCookie(format!("cookie-{}", state.next_cookie)))
    }

    fn unregister_area(&mut self, cookie: &AreaCookie) -> Result<()> {
        self.record(DisplayCall::UnregisterArea(cookie.clone()));
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    Show(NodeId),
    UpdateContent(NodeId),
    Destroy(NodeId),
    Activate(NodeId),
    SelectFirst(NodeId),
    SendKey(NodeId, MenuKey),
    UpdateItem(NodeId, String, ItemUpdate),
}

struct SurfaceState {
    size: Size,
    fail_show: bool,
    visible: HashSet<NodeId>,
    active: Option<NodeId>,
    calls: Vec<SurfaceCall>,
    events: Vec<PresentationEvent>,
}

/// Recording [`Presentation`]; clones share state
#[derive(Clone)]
pub struct FakePresentation {
    state: Rc<RefCell<SurfaceState>>,
}

impl FakePresentation {
    /// Every surface reports `size` after layout
    pub fn new(size: Size) -> Self {
        Self {
            state: Rc::new(RefCell::new(SurfaceState {
                size,
                fail_show: false,
                visible: HashSet::new(),
                active: None,
                calls: Vec::new(),
                events: Vec::new(),
            })),
        }
    }

    pub fn set_size(&self, size: Size) {
        self.state.borrow_mut().size = size;
    }

    pub fn fail_show(&self, fail: bool) {
        self.state.borrow_mut().fail_show = fail;
    }

    pub fn set_active(&self, node: Option<NodeId>) {
        self.state.borrow_mut().active = node;
    }

    pub fn is_visible(&self, node: NodeId) -> bool {
        self.state.borrow().visible.contains(&node)
    }

    pub fn push_event(&self, event: PresentationEvent) {
        self.state.borrow_mut().events.push(event);
    }

    pub fn calls(&self) -> Vec<SurfaceCall> {
        self.state.borrow().calls.clone()
    }

    pub fn last_call(&self) -> Option<SurfaceCall> {
        self.state.borrow().calls.last().cloned()
    }

    pub fn item_updates(&self, node: NodeId) -> usize {
        self.state
            .borrow()
            .calls
            .iter()
            .filter(|call| matches!(call, SurfaceCall::UpdateItem(id, ..) if *id == node))
            .count()
    }

    fn record(&self, call: SurfaceCall) {
        self.state.borrow_mut().calls.push(call);
    }
}

/// Stable fake window id per node
fn window_of(node: NodeId) -> u32 {
    let mut hash = 0x1000u32;
    for byte in format!("{node:?}").bytes() {
        hash = hash.wrapping_mul(31).wrapping_add(byte as u32);
    }
    hash | 1
}

impl Presentation for FakePresentation {
    fn show(&mut self, node: &MenuNode) -> Result<Size> {
        self.record(SurfaceCall::Show(node.id()));
        let mut state = self.state.borrow_mut();
        if state.fail_show {
            bail!("surface creation refused");
        }
        state.visible.insert(node.id());
        Ok(state.size)
    }

    fn update_content(&mut self, node: &MenuNode) -> Result<Size> {
        self.record(SurfaceCall::UpdateContent(node.id()));
        Ok(self.state.borrow().size)
    }

    fn destroy(&mut self, node: NodeId) {
        self.record(SurfaceCall::Destroy(node));
        let mut state = self.state.borrow_mut();
        state.visible.remove(&node);
        if state.active == Some(node) {
            state.active = None;
        }
    }

    fn window(&self, node: NodeId) -> Option<u32> {
        self.is_visible(node).then(|| window_of(node))
    }

    fn is_active(&self, node: NodeId) -> bool {
        self.state.borrow().active == Some(node)
    }

    fn activate(&mut self, node: NodeId) {
        self.record(SurfaceCall::Activate(node));
        self.state.borrow_mut().active = Some(node);
    }

    fn select_first(&mut self, node: NodeId) {
        self.record(SurfaceCall::SelectFirst(node));
    }

    fn send_key(&mut self, node: NodeId, key: MenuKey) {
        self.record(SurfaceCall::SendKey(node, key));
    }

    fn update_item(&mut self, node: NodeId, item_id: &str, update: &ItemUpdate) {
        self.record(SurfaceCall::UpdateItem(node, item_id.to_string(), update.clone()));
    }

    fn monitor_area(&self) -> Rect {
        Rect::new(0, 0, 1920, 1080)
    }

    fn take_events(&mut self) -> Vec<PresentationEvent> {
        std::mem::take(&mut self.state.borrow_mut().events)
    }
}
