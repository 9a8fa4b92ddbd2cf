//! Core-protocol X11 menu surfaces
//!
//! One override-redirect window per menu node, drawn with the core font.
//! Pointer input is hit-tested in root coordinates because events may be
//! reported relative to the grab window rather than the surface under the
//! pointer.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, trace, warn};
use x11rb::connection::Connection;
use x11rb::protocol::Event;
use x11rb::protocol::xproto::*;
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;

use crate::config::AppearanceConfig;
use crate::geometry::{Rect, Size};
use crate::menu::content::{ItemUpdate, MenuContent};
use crate::menu::key::MenuKey;
use crate::menu::node::{MenuNode, NodeId};
use crate::presentation::layout::{self, Layout, Metrics};
use crate::presentation::{Presentation, PresentationEvent};

const BORDER_WIDTH: u16 = 1;

struct Atoms {
    net_wm_window_type: Atom,
    net_wm_window_type_popup_menu: Atom,
    net_workarea: Atom,
}

impl Atoms {
    fn new(conn: &RustConnection) -> Result<Self> {
        let intern = |name: &str| -> Result<Atom> {
            Ok(conn.intern_atom(false, name.as_bytes())?.reply()?.atom)
        };
        Ok(Self {
            net_wm_window_type: intern("_NET_WM_WINDOW_TYPE")?,
            net_wm_window_type_popup_menu: intern("_NET_WM_WINDOW_TYPE_POPUP_MENU")?,
            net_workarea: intern("_NET_WORKAREA")?,
        })
    }
}

struct Surface {
    window: Window,
    gc: Gcontext,
    parent: Option<NodeId>,
    depth: usize,
    position: (i32, i32),
    content: MenuContent,
    layout: Layout,
    selected: Option<usize>,
}

impl Surface {
    fn rect(&self) -> Rect {
        Rect::from_origin(self.position, self.layout.size)
    }

    /// Screen position a submenu of row `index` opens at
    fn sub_menu_origin(&self, index: usize) -> (i32, i32) {
        let row_y = self.layout.row(index).map(|row| row.y as i32).unwrap_or(0);
        (
            self.position.0 + self.layout.size.width as i32 + BORDER_WIDTH as i32,
            self.position.1 + row_y,
        )
    }

    fn sub_menu_content(&self, index: usize) -> Option<MenuContent> {
        let item = self.content.items.get(index)?;
        if !item.is_selectable() {
            return None;
        }
        item.sub_menu_at(self.sub_menu_origin(index))
    }

    /// Move the selection to `index`. Returns the submenu request for the
    /// newly selected row, or `None` if the selection did not change.
    fn hover(&mut self, node: NodeId, index: Option<usize>) -> Option<PresentationEvent> {
        if self.selected == index {
            return None;
        }
        self.selected = index;
        let content = index.and_then(|index| self.sub_menu_content(index));
        Some(PresentationEvent::SubMenuRequested { node, content })
    }

    /// Activate row `index`: open its submenu, or toggle and invoke it
    fn invoke(&mut self, node: NodeId, index: usize) -> Vec<PresentationEvent> {
        let Some(item) = self.content.items.get(index).cloned() else {
            return Vec::new();
        };
        if !item.is_selectable() {
            return Vec::new();
        }
        if let Some(content) = self.sub_menu_content(index) {
            return vec![
                PresentationEvent::SubMenuRequested {
                    node,
                    content: Some(content),
                },
                PresentationEvent::ActivateSubMenu { node },
            ];
        }

        let mut events = Vec::new();
        let mut checked = item.checked;
        if item.is_checkable {
            if self.content.single_check {
                checked = true;
                events.extend(self.content.check_exclusive(&item.id).into_iter().map(|item_id| {
                    PresentationEvent::CheckedToggled {
                        node,
                        item_id,
                        checked: false,
                    }
                }));
            } else {
                checked = !checked;
            }
            events.push(PresentationEvent::CheckedToggled {
                node,
                item_id: item.id.clone(),
                checked,
            });
        }
        debug!("Invoking item {:?} of {:?}", item.id, node);
        events.push(PresentationEvent::ItemInvoked {
            node,
            item_id: item.id,
            checked,
        });
        events.push(PresentationEvent::DismissRequested { node });
        events
    }

    /// Apply a navigation key. The selection changes in place, anything the
    /// hierarchy has to do comes back as events.
    fn key(&mut self, node: NodeId, key: MenuKey) -> Vec<PresentationEvent> {
        let is_sub_menu = self.parent.is_some();
        match key {
            MenuKey::Up => {
                self.selected = layout::step(&self.content.items, self.selected, false);
                Vec::new()
            }
            MenuKey::Down => {
                self.selected = layout::step(&self.content.items, self.selected, true);
                Vec::new()
            }
            MenuKey::Letter(letter) => {
                self.selected = layout::find_by_letter(&self.content.items, self.selected, letter).or(self.selected);
                Vec::new()
            }
            MenuKey::Right => match self.selected.and_then(|index| self.sub_menu_content(index)) {
                Some(content) => vec![
                    PresentationEvent::SubMenuRequested {
                        node,
                        content: Some(content),
                    },
                    PresentationEvent::ActivateSubMenu { node },
                ],
                None => Vec::new(),
            },
            MenuKey::Left if is_sub_menu => vec![PresentationEvent::ActivateParent { node }],
            MenuKey::Left => Vec::new(),
            MenuKey::Enter => match self.selected {
                Some(index) => self.invoke(node, index),
                None => Vec::new(),
            },
            MenuKey::Escape if is_sub_menu => vec![PresentationEvent::ActivateParent { node }],
            MenuKey::Escape => vec![PresentationEvent::DismissRequested { node }],
        }
    }
}

/// Clamp a root or window coordinate to the protocol's 16-bit range
fn coord(value: i32) -> i16 {
    value.clamp(i16::MIN.into(), i16::MAX.into()) as i16
}

/// Clamp a window dimension to the protocol's 16-bit range
fn extent(value: u32) -> u16 {
    u16::try_from(value).unwrap_or(u16::MAX)
}

pub struct X11Presentation {
    conn: Arc<RustConnection>,
    root: Window,
    depth: u8,
    screen_size: Size,
    atoms: Atoms,
    font: Font,
    ascent: i16,
    descent: i16,
    metrics: Metrics,
    appearance: AppearanceConfig,
    surfaces: HashMap<NodeId, Surface>,
    windows: HashMap<Window, NodeId>,
    active: Option<NodeId>,
    /// A button went down over one of our surfaces
    pressed: bool,
    events: Vec<PresentationEvent>,
}

impl X11Presentation {
    pub fn new(conn: Arc<RustConnection>, screen_num: usize, appearance: AppearanceConfig) -> Result<Self> {
        let screen = conn
            .setup()
            .roots
            .get(screen_num)
            .context("X server has no such screen")?;
        let root = screen.root;
        let depth = screen.root_depth;
        let screen_size = Size::new(screen.width_in_pixels.into(), screen.height_in_pixels.into());

        let atoms = Atoms::new(&conn).context("Failed to intern menu atoms")?;

        let font = conn.generate_id()?;
        conn.open_font(font, appearance.font.as_bytes())?
            .check()
            .with_context(|| format!("Failed to open core font {:?}", appearance.font))?;
        let info = conn.query_font(font)?.reply().context("Failed to query menu font")?;
        let char_width = info.max_bounds.character_width.max(1) as u32;
        let metrics = Metrics::new(&appearance, char_width);

        debug!(
            "Menu font {:?}: char_width={} ascent={} descent={}",
            appearance.font, char_width, info.font_ascent, info.font_descent
        );

        Ok(Self {
            conn,
            root,
            depth,
            screen_size,
            atoms,
            font,
            ascent: info.font_ascent,
            descent: info.font_descent,
            metrics,
            appearance,
            surfaces: HashMap::new(),
            windows: HashMap::new(),
            active: None,
            pressed: false,
            events: Vec::new(),
        })
    }

    pub fn flush(&self) {
        if let Err(e) = self.conn.flush() {
            warn!("Failed to flush X11 requests: {}", e);
        }
    }

    fn create_surface(&mut self, node: &MenuNode) -> Result<Surface> {
        let layout = Layout::compute(node.content(), &self.metrics);
        let (x, y) = node.position();
        let window = self.conn.generate_id()?;
        let gc = self.conn.generate_id()?;
        let border = if node.is_dock_menu() { 0 } else { BORDER_WIDTH };

        self.conn.create_window(
            self.depth,
            window,
            self.root,
            coord(x),
            coord(y),
            extent(layout.size.width),
            extent(layout.size.height),
            border,
            WindowClass::INPUT_OUTPUT,
            0,
            &CreateWindowAux::new()
                .background_pixel(self.appearance.background)
                .border_pixel(self.appearance.border)
                .override_redirect(1)
                .event_mask(
                    EventMask::EXPOSURE
                        | EventMask::BUTTON_PRESS
                        | EventMask::BUTTON_RELEASE
                        | EventMask::POINTER_MOTION
                        | EventMask::LEAVE_WINDOW
                        | EventMask::FOCUS_CHANGE,
                ),
        )?;
        self.conn.change_property32(
            PropMode::REPLACE,
            window,
            self.atoms.net_wm_window_type,
            AtomEnum::ATOM,
            &[self.atoms.net_wm_window_type_popup_menu],
        )?;
        self.conn.create_gc(
            gc,
            window,
            &CreateGCAux::new()
                .font(self.font)
                .foreground(self.appearance.foreground)
                .background(self.appearance.background)
                .graphics_exposures(0),
        )?;
        self.conn.map_window(window)?;
        self.conn
            .configure_window(window, &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE))?;

        let depth = match node.parent().and_then(|parent| self.surfaces.get(&parent)) {
            Some(parent) => parent.depth + 1,
            None => 0,
        };
        Ok(Surface {
            window,
            gc,
            parent: node.parent(),
            depth,
            position: (x, y),
            content: node.content().clone(),
            layout,
            selected: None,
        })
    }

    fn redraw(&self, node: NodeId) {
        let Some(surface) = self.surfaces.get(&node) else { return };
        if let Err(e) = self.draw(surface) {
            warn!("Failed to draw menu {:?}: {}", node, e);
        }
    }

    fn draw(&self, surface: &Surface) -> Result<()> {
        let appearance = &self.appearance;
        let width = extent(surface.layout.size.width);
        let (window, gc) = (surface.window, surface.gc);

        self.conn
            .change_gc(gc, &ChangeGCAux::new().foreground(appearance.background))?;
        self.conn.poly_fill_rectangle(
            window,
            gc,
            &[Rectangle {
                x: 0,
                y: 0,
                width,
                height: extent(surface.layout.size.height),
            }],
        )?;

        for row in &surface.layout.rows {
            let Some(item) = surface.content.items.get(row.index) else { continue };
            // Rows past the 16-bit window range can never be on screen
            let Ok(top) = i32::try_from(row.y) else { break };
            if top > i32::from(i16::MAX) {
                break;
            }
            let y = coord(top);
            let row_height = i32::try_from(row.height).unwrap_or(i32::MAX);

            if item.is_separator() {
                self.conn
                    .change_gc(gc, &ChangeGCAux::new().foreground(appearance.border))?;
                self.conn.poly_fill_rectangle(
                    window,
                    gc,
                    &[Rectangle {
                        x: coord(self.metrics.padding as i32),
                        y: coord(top + row_height / 2),
                        width: width.saturating_sub(extent(self.metrics.padding.saturating_mul(2))),
                        height: 1,
                    }],
                )?;
                continue;
            }

            let selected = surface.selected == Some(row.index) && item.is_selectable();
            let background = if selected { appearance.highlight } else { appearance.background };
            let foreground = if item.is_active { appearance.foreground } else { appearance.inactive };
            if selected {
                self.conn
                    .change_gc(gc, &ChangeGCAux::new().foreground(background))?;
                self.conn.poly_fill_rectangle(
                    window,
                    gc,
                    &[Rectangle {
                        x: 0,
                        y,
                        width,
                        height: extent(row.height),
                    }],
                )?;
            }
            self.conn.change_gc(
                gc,
                &ChangeGCAux::new().foreground(foreground).background(background),
            )?;

            let baseline = coord(
                top.saturating_add(
                    row_height.saturating_add(i32::from(self.ascent) - i32::from(self.descent)) / 2,
                ),
            );
            let text_x = coord((self.metrics.padding + surface.layout.check_column) as i32);
            self.conn
                .image_text8(window, gc, text_x, baseline, &label_bytes(&item.text))?;

            if item.is_checkable && item.checked && item.show_check_mark {
                self.conn
                    .image_text8(window, gc, coord(self.metrics.padding as i32), baseline, b"*")?;
            }
            if item.sub_menu.is_some() {
                let arrow_x = coord(
                    i32::from(width) - self.metrics.padding as i32 - self.metrics.char_width as i32,
                );
                self.conn.image_text8(window, gc, arrow_x, baseline, b">")?;
            }
        }
        Ok(())
    }

    /// Deepest surface under a root-coordinate point
    fn hit(&self, x: i32, y: i32) -> Option<(NodeId, Option<usize>)> {
        self.surfaces
            .iter()
            .filter(|(_, surface)| surface.rect().contains(x, y))
            .max_by_key(|(_, surface)| surface.depth)
            .map(|(node, surface)| (*node, surface.layout.row_at(y - surface.position.1)))
    }

    fn select(&mut self, node: NodeId, index: Option<usize>) {
        if let Some(surface) = self.surfaces.get_mut(&node) {
            if surface.selected != index {
                surface.selected = index;
                self.redraw(node);
            }
        }
    }

    fn hover(&mut self, x: i32, y: i32) {
        let Some((node, index)) = self.hit(x, y) else { return };
        let Some(surface) = self.surfaces.get_mut(&node) else { return };
        let Some(event) = surface.hover(node, index) else { return };
        self.redraw(node);
        if self.active != Some(node) {
            self.activate(node);
        }
        self.events.push(event);
    }

    fn invoke(&mut self, node: NodeId, index: usize) {
        let Some(surface) = self.surfaces.get_mut(&node) else { return };
        let events = surface.invoke(node, index);
        self.events.extend(events);
    }

    fn focus_moved_away(&self) -> bool {
        match self.conn.get_input_focus().map(|cookie| cookie.reply()) {
            Ok(Ok(reply)) => !self.windows.contains_key(&reply.focus),
            Ok(Err(e)) => {
                warn!("Failed to query input focus: {}", e);
                false
            }
            Err(e) => {
                warn!("Failed to query input focus: {}", e);
                false
            }
        }
    }

    /// Feed one X11 event; resulting callbacks queue up for `take_events`
    pub fn handle_event(&mut self, event: &Event) {
        match event {
            Event::Expose(expose) if expose.count == 0 => {
                if let Some(node) = self.windows.get(&expose.window).copied() {
                    self.redraw(node);
                }
            }
            Event::MotionNotify(motion) => {
                self.hover(motion.root_x.into(), motion.root_y.into());
            }
            Event::ButtonPress(press) => {
                self.pressed = self.hit(press.root_x.into(), press.root_y.into()).is_some();
            }
            Event::ButtonRelease(release) => {
                let pressed = std::mem::take(&mut self.pressed);
                if !pressed {
                    trace!("Ignoring button release without a press on a menu");
                    return;
                }
                if let Some((node, Some(index))) = self.hit(release.root_x.into(), release.root_y.into()) {
                    self.invoke(node, index);
                }
            }
            Event::LeaveNotify(leave) => {
                let Some(node) = self.windows.get(&leave.event).copied() else { return };
                let keeps_selection = self
                    .surfaces
                    .get(&node)
                    .and_then(|surface| surface.selected.and_then(|index| surface.content.items.get(index)))
                    .is_some_and(|item| item.sub_menu.is_some());
                if !keeps_selection {
                    self.select(node, None);
                }
            }
            Event::FocusOut(focus) if focus.mode == NotifyMode::NORMAL => {
                if self.windows.contains_key(&focus.event) && self.focus_moved_away() {
                    debug!("Input focus left the menu windows");
                    self.events.push(PresentationEvent::FocusLost);
                }
            }
            _ => {}
        }
    }
}

/// Core fonts take Latin-1 bytes
fn label_bytes(text: &str) -> Vec<u8> {
    text.chars()
        .filter(|c| *c != '_')
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

impl Presentation for X11Presentation {
    fn show(&mut self, node: &MenuNode) -> Result<Size> {
        let surface = self.create_surface(node).context("Failed to create menu window")?;
        let size = surface.layout.size;
        self.windows.insert(surface.window, node.id());
        self.surfaces.insert(node.id(), surface);
        self.redraw(node.id());
        Ok(size)
    }

    fn update_content(&mut self, node: &MenuNode) -> Result<Size> {
        let layout = Layout::compute(node.content(), &self.metrics);
        let size = layout.size;
        let surface = self
            .surfaces
            .get_mut(&node.id())
            .context("Menu surface is gone")?;
        surface.content = node.content().clone();
        surface.layout = layout;
        surface.selected = None;
        self.conn.configure_window(
            surface.window,
            &ConfigureWindowAux::new()
                .width(size.width)
                .height(size.height)
                .stack_mode(StackMode::ABOVE),
        )?;
        self.redraw(node.id());
        Ok(size)
    }

    fn destroy(&mut self, node: NodeId) {
        let Some(surface) = self.surfaces.remove(&node) else { return };
        self.windows.remove(&surface.window);
        if self.active == Some(node) {
            self.active = None;
        }
        if let Err(e) = self
            .conn
            .free_gc(surface.gc)
            .and_then(|_| self.conn.destroy_window(surface.window))
        {
            warn!("Failed to destroy menu window 0x{:x}: {}", surface.window, e);
        }
    }

    fn window(&self, node: NodeId) -> Option<u32> {
        self.surfaces.get(&node).map(|surface| surface.window)
    }

    fn is_active(&self, node: NodeId) -> bool {
        self.active == Some(node)
    }

    fn activate(&mut self, node: NodeId) {
        let Some(surface) = self.surfaces.get(&node) else { return };
        if let Err(e) = self
            .conn
            .set_input_focus(InputFocus::PARENT, surface.window, x11rb::CURRENT_TIME)
        {
            warn!("Failed to focus menu window 0x{:x}: {}", surface.window, e);
        }
        self.active = Some(node);
    }

    fn select_first(&mut self, node: NodeId) {
        let Some(surface) = self.surfaces.get(&node) else { return };
        let first = layout::step(&surface.content.items, None, true);
        self.select(node, first);
    }

    fn send_key(&mut self, node: NodeId, key: MenuKey) {
        let Some(surface) = self.surfaces.get_mut(&node) else { return };
        let selected = surface.selected;
        let events = surface.key(node, key);
        if surface.selected != selected {
            self.redraw(node);
        }
        self.events.extend(events);
    }

    fn update_item(&mut self, node: NodeId, item_id: &str, update: &ItemUpdate) {
        let Some(surface) = self.surfaces.get_mut(&node) else { return };
        if surface.content.apply(item_id, update) {
            self.redraw(node);
        }
    }

    fn monitor_area(&self) -> Rect {
        let fallback = Rect::from_origin((0, 0), self.screen_size);
        let reply = self
            .conn
            .get_property(false, self.root, self.atoms.net_workarea, AtomEnum::CARDINAL, 0, 4)
            .map_err(anyhow::Error::from)
            .and_then(|cookie| cookie.reply().map_err(anyhow::Error::from));
        match reply {
            Ok(reply) => {
                let values: Vec<u32> = reply.value32().map(|values| values.collect()).unwrap_or_default();
                match values.as_slice() {
                    [x, y, width, height, ..] if *width > 0 && *height > 0 => {
                        Rect::new(*x as i32, *y as i32, *width, *height)
                    }
                    _ => fallback,
                }
            }
            Err(e) => {
                debug!("No _NET_WORKAREA ({}), using screen size", e);
                fallback
            }
        }
    }

    fn take_events(&mut self) -> Vec<PresentationEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menu::node::MenuArena;
    use crate::session::SessionId;

    const NESTED: &str = r#"{"x":100,"y":50,"items":[
        "Open",
        {"itemId":"view","itemText":"View","itemSubMenu":{"items":["Icons","List"]}},
        {"itemId":"gone","itemText":"Gone","isActive":false}
    ]}"#;

    /// A root handle and a submenu handle below it
    fn nodes() -> (NodeId, NodeId) {
        let mut arena = MenuArena::new();
        let session = SessionId::from("/com/deepin/menu/test");
        let content = MenuContent::parse(r#"{"x":0,"y":0,"items":["A"]}"#).unwrap();
        let root = arena.insert(session.clone(), content.clone(), None);
        let sub = arena.insert(session, content, Some(root));
        (root, sub)
    }

    fn surface(json: &str, parent: Option<NodeId>) -> Surface {
        let content = MenuContent::parse(json).unwrap();
        let metrics = Metrics::new(&AppearanceConfig::default(), 6);
        Surface {
            window: 1,
            gc: 2,
            parent,
            depth: usize::from(parent.is_some()),
            position: (content.x, content.y),
            layout: Layout::compute(&content, &metrics),
            content,
            selected: None,
        }
    }

    #[test]
    fn test_left_and_escape_in_sub_menu_return_to_parent() {
        let (root, sub) = nodes();
        let mut menu = surface(NESTED, Some(root));

        assert_eq!(menu.key(sub, MenuKey::Left), vec![PresentationEvent::ActivateParent { node: sub }]);
        assert_eq!(menu.key(sub, MenuKey::Escape), vec![PresentationEvent::ActivateParent { node: sub }]);
    }

    #[test]
    fn test_escape_on_root_dismisses() {
        let (root, _) = nodes();
        let mut menu = surface(NESTED, None);

        assert!(menu.key(root, MenuKey::Left).is_empty());
        assert_eq!(menu.key(root, MenuKey::Escape), vec![PresentationEvent::DismissRequested { node: root }]);
    }

    #[test]
    fn test_right_opens_selected_sub_menu_beside_its_row() {
        let (root, _) = nodes();
        let mut menu = surface(NESTED, None);

        assert!(menu.key(root, MenuKey::Down).is_empty());
        assert_eq!(menu.selected, Some(0));
        assert!(menu.key(root, MenuKey::Right).is_empty());

        menu.key(root, MenuKey::Down);
        assert_eq!(menu.selected, Some(1));
        let events = menu.key(root, MenuKey::Right);

        assert_eq!(events.len(), 2);
        match &events[0] {
            PresentationEvent::SubMenuRequested {
                node,
                content: Some(content),
            } => {
                assert_eq!(*node, root);
                assert_eq!(content.items.len(), 2);
                let width = menu.layout.size.width as i32;
                assert_eq!((content.x, content.y), (100 + width + 1, 50 + 24));
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(events[1], PresentationEvent::ActivateSubMenu { node: root });
    }

    #[test]
    fn test_navigation_skips_inactive_items_and_wraps() {
        let (root, _) = nodes();
        let mut menu = surface(NESTED, None);

        menu.key(root, MenuKey::Up);
        assert_eq!(menu.selected, Some(1));
        menu.key(root, MenuKey::Down);
        assert_eq!(menu.selected, Some(0));

        menu.key(root, MenuKey::Letter('v'));
        assert_eq!(menu.selected, Some(1));
        menu.key(root, MenuKey::Letter('z'));
        assert_eq!(menu.selected, Some(1));
    }

    #[test]
    fn test_single_check_invoke_unchecks_previous_choice_first() {
        let (root, _) = nodes();
        let mut menu = surface(
            r#"{"x":0,"y":0,"singleCheck":true,"items":[
                {"itemId":"icons","itemText":"Icons","isCheckable":true,"checked":true},
                {"itemId":"list","itemText":"List","isCheckable":true}
            ]}"#,
            None,
        );

        let events = menu.invoke(root, 1);

        assert_eq!(
            events,
            vec![
                PresentationEvent::CheckedToggled {
                    node: root,
                    item_id: "icons".into(),
                    checked: false
                },
                PresentationEvent::CheckedToggled {
                    node: root,
                    item_id: "list".into(),
                    checked: true
                },
                PresentationEvent::ItemInvoked {
                    node: root,
                    item_id: "list".into(),
                    checked: true
                },
                PresentationEvent::DismissRequested { node: root },
            ]
        );
        assert!(!menu.content.items[0].checked);
        assert!(menu.content.items[1].checked);
    }

    #[test]
    fn test_checkable_invoke_toggles_state() {
        let (root, _) = nodes();
        let mut menu = surface(
            r#"{"x":0,"y":0,"items":[
                {"itemId":"wrap","itemText":"Wrap","isCheckable":true,"checked":true}
            ]}"#,
            None,
        );

        let events = menu.invoke(root, 0);

        assert_eq!(
            events[..2],
            [
                PresentationEvent::CheckedToggled {
                    node: root,
                    item_id: "wrap".into(),
                    checked: false
                },
                PresentationEvent::ItemInvoked {
                    node: root,
                    item_id: "wrap".into(),
                    checked: false
                },
            ]
        );
    }

    #[test]
    fn test_enter_on_sub_menu_item_opens_it_without_dismissing() {
        let (root, _) = nodes();
        let mut menu = surface(NESTED, None);
        menu.selected = Some(1);

        let events = menu.key(root, MenuKey::Enter);

        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], PresentationEvent::SubMenuRequested { content: Some(_), .. }));
        assert_eq!(events[1], PresentationEvent::ActivateSubMenu { node: root });
        assert!(menu.invoke(root, 2).is_empty());
        assert!(menu.key(root, MenuKey::Escape).contains(&PresentationEvent::DismissRequested { node: root }));
    }

    #[test]
    fn test_hover_requests_sub_menu_only_on_change() {
        let (root, _) = nodes();
        let mut menu = surface(NESTED, None);

        let opened = menu.hover(root, Some(1));
        assert!(matches!(
            opened,
            Some(PresentationEvent::SubMenuRequested { content: Some(_), .. })
        ));
        assert_eq!(menu.hover(root, Some(1)), None);
        assert_eq!(
            menu.hover(root, Some(0)),
            Some(PresentationEvent::SubMenuRequested { node: root, content: None })
        );
        assert_eq!(menu.selected, Some(0));
    }

    #[test]
    fn test_coordinates_clamp_to_protocol_range() {
        assert_eq!(coord(120), 120);
        assert_eq!(coord(40_000), i16::MAX);
        assert_eq!(coord(-40_000), i16::MIN);
        assert_eq!(extent(70_000), u16::MAX);
        assert_eq!(extent(300), 300);
    }

    #[test]
    fn test_label_bytes_drops_mnemonics_and_replaces_wide_chars() {
        assert_eq!(label_bytes("_Open"), b"Open".to_vec());
        assert_eq!(label_bytes("caf\u{e9}"), vec![b'c', b'a', b'f', 0xe9]);
        assert_eq!(label_bytes("\u{4e2d}x"), b"?x".to_vec());
    }
}
