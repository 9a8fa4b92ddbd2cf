//! Menu definitions as sent by clients in `ShowMenu`
//!
//! The payload is a JSON object `{x, y, isDockMenu, items: [...]}`. Items
//! are either full objects using the `itemId`/`itemText`/`itemSubMenu`
//! vocabulary or plain strings, in which case the string is both the id
//! and the label.

use serde::Deserialize;

use crate::error::MenuError;

/// A parsed menu level (root menu or submenu)
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuContent {
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub is_dock_menu: bool,
    #[serde(default)]
    pub checkable_menu: bool,
    #[serde(default)]
    pub single_check: bool,
    #[serde(default)]
    pub items: Vec<MenuItem>,
}

/// One entry of a menu level
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawItem")]
pub struct MenuItem {
    pub id: String,
    pub text: String,
    pub icon: Option<String>,
    pub is_active: bool,
    pub is_checkable: bool,
    pub checked: bool,
    pub show_check_mark: bool,
    pub sub_menu: Option<SubMenu>,
}

/// Nested item list of an item that opens a submenu
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubMenu {
    #[serde(default)]
    pub checkable_menu: bool,
    #[serde(default)]
    pub single_check: bool,
    #[serde(default)]
    pub items: Vec<MenuItem>,
}

/// Item state change requested by a client or by the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub enum ItemUpdate {
    Text(String),
    Activity(bool),
    Checked(bool),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawItem {
    Label(String),
    Full(FullItem),
}

#[derive(Deserialize)]
struct FullItem {
    #[serde(rename = "itemId", alias = "id", default)]
    id: String,
    #[serde(rename = "itemText", alias = "text", default)]
    text: String,
    #[serde(rename = "itemIcon", alias = "icon", default)]
    icon: Option<String>,
    #[serde(rename = "isActive", default = "default_active")]
    is_active: bool,
    #[serde(rename = "isCheckable", default)]
    is_checkable: bool,
    #[serde(default)]
    checked: bool,
    #[serde(rename = "showCheckMark", default)]
    show_check_mark: bool,
    #[serde(rename = "itemSubMenu", alias = "subMenu", default)]
    sub_menu: Option<SubMenu>,
}

fn default_active() -> bool {
    true
}

impl From<RawItem> for MenuItem {
    fn from(raw: RawItem) -> Self {
        match raw {
            RawItem::Label(text) => Self {
                id: text.clone(),
                text,
                icon: None,
                is_active: true,
                is_checkable: false,
                checked: false,
                show_check_mark: false,
                sub_menu: None,
            },
            RawItem::Full(item) => Self {
                id: item.id,
                text: item.text,
                icon: item.icon.filter(|icon| !icon.is_empty()),
                is_active: item.is_active,
                is_checkable: item.is_checkable,
                checked: item.checked,
                show_check_mark: item.show_check_mark,
                // An empty item list means "no submenu"
                sub_menu: item.sub_menu.filter(|sub| !sub.items.is_empty()),
            },
        }
    }
}

impl MenuItem {
    /// Items without a label are drawn as separators
    pub fn is_separator(&self) -> bool {
        self.text.is_empty()
    }

    /// Whether keyboard navigation may land on this item
    pub fn is_selectable(&self) -> bool {
        self.is_active && !self.is_separator()
    }

    /// Build the content of this item's submenu anchored at `origin`
    pub fn sub_menu_at(&self, origin: (i32, i32)) -> Option<MenuContent> {
        let sub = self.sub_menu.as_ref()?;
        Some(MenuContent {
            x: origin.0,
            y: origin.1,
            is_dock_menu: false,
            checkable_menu: sub.checkable_menu,
            single_check: sub.single_check,
            items: sub.items.clone(),
        })
    }
}

impl MenuContent {
    /// Parse a `ShowMenu` payload
    pub fn parse(json: &str) -> Result<Self, MenuError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[cfg(test)]
    pub fn item(&self, id: &str) -> Option<&MenuItem> {
        find_item(&self.items, id)
    }

    /// Apply an item update anywhere in this level or its nested submenus.
    /// Returns false if no item carries `id`.
    pub fn apply(&mut self, id: &str, update: &ItemUpdate) -> bool {
        let Some(item) = find_item_mut(&mut self.items, id) else {
            return false;
        };
        match update {
            ItemUpdate::Text(text) => item.text = text.clone(),
            ItemUpdate::Activity(active) => item.is_active = *active,
            ItemUpdate::Checked(checked) => item.checked = *checked,
        }
        true
    }

    /// Check `id` in a single-check level, unchecking its siblings.
    /// Returns the ids whose checked state was cleared.
    pub fn check_exclusive(&mut self, id: &str) -> Vec<String> {
        let mut cleared = Vec::new();
        for item in &mut self.items {
            if item.id == id {
                item.checked = true;
            } else if item.checked {
                item.checked = false;
                cleared.push(item.id.clone());
            }
        }
        cleared
    }
}

#[cfg(test)]
fn find_item<'a>(items: &'a [MenuItem], id: &str) -> Option<&'a MenuItem> {
    items.iter().find_map(|item| {
        if item.id == id {
            Some(item)
        } else {
            item.sub_menu.as_ref().and_then(|sub| find_item(&sub.items, id))
        }
    })
}

fn find_item_mut<'a>(items: &'a mut [MenuItem], id: &str) -> Option<&'a mut MenuItem> {
    for item in items.iter_mut() {
        if item.id == id {
            return Some(item);
        }
        if let Some(sub) = item.sub_menu.as_mut() {
            if let Some(found) = find_item_mut(&mut sub.items, id) {
                return Some(found);
            }
        }
    }
    None
}
