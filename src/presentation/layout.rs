//! Row layout and keyboard selection for menu surfaces

use crate::config::AppearanceConfig;
use crate::geometry::Size;
use crate::menu::content::{MenuContent, MenuItem};

/// Font and spacing parameters of a surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metrics {
    pub char_width: u32,
    pub item_height: u32,
    pub separator_height: u32,
    pub min_width: u32,
    pub padding: u32,
}

impl Metrics {
    pub fn new(appearance: &AppearanceConfig, char_width: u32) -> Self {
        Self {
            char_width: char_width.max(1),
            item_height: appearance.item_height.into(),
            separator_height: appearance.separator_height.into(),
            min_width: appearance.min_width.into(),
            padding: appearance.padding.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Row {
    /// Index into the level's items
    pub index: usize,
    pub y: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub rows: Vec<Row>,
    pub size: Size,
    /// Width reserved left of the labels for check marks
    pub check_column: u32,
    /// Width reserved right of the labels for submenu arrows
    pub arrow_column: u32,
}

impl Layout {
    pub fn compute(content: &MenuContent, metrics: &Metrics) -> Self {
        let checkable = content.checkable_menu || content.items.iter().any(|item| item.is_checkable);
        let nested = content.items.iter().any(|item| item.sub_menu.is_some());
        let check_column = if checkable { metrics.char_width * 2 } else { 0 };
        let arrow_column = if nested { metrics.char_width * 2 } else { 0 };

        let mut rows = Vec::with_capacity(content.items.len());
        let mut y = 0;
        let mut widest = 0;
        for (index, item) in content.items.iter().enumerate() {
            let height = if item.is_separator() {
                metrics.separator_height
            } else {
                metrics.item_height
            };
            rows.push(Row { index, y, height });
            y += height;
            widest = widest.max(item.text.chars().count() as u32);
        }

        let width = (metrics.padding * 2 + check_column + widest * metrics.char_width + arrow_column)
            .max(metrics.min_width);
        Self {
            rows,
            size: Size::new(width, y.max(1)),
            check_column,
            arrow_column,
        }
    }

    /// Item under a surface-relative y coordinate
    pub fn row_at(&self, y: i32) -> Option<usize> {
        let y = u32::try_from(y).ok()?;
        self.rows
            .iter()
            .find(|row| row.y <= y && y < row.y + row.height)
            .map(|row| row.index)
    }

    pub fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }
}

/// Next selectable item after `from` in the given direction, wrapping
pub fn step(items: &[MenuItem], from: Option<usize>, forward: bool) -> Option<usize> {
    let len = items.len();
    if len == 0 {
        return None;
    }
    let start = match (from, forward) {
        (Some(current), _) => current,
        (None, true) => len - 1,
        (None, false) => 0,
    };
    (1..=len)
        .map(|offset| {
            if forward {
                (start + offset) % len
            } else {
                (start + len - offset % len) % len
            }
        })
        .find(|index| items[*index].is_selectable())
}

/// Next selectable item whose label starts with `letter`, after `from`
pub fn find_by_letter(items: &[MenuItem], from: Option<usize>, letter: char) -> Option<usize> {
    let len = items.len();
    let start = from.unwrap_or(len.saturating_sub(1));
    (1..=len)
        .map(|offset| (start + offset) % len)
        .find(|index| {
            let item = &items[*index];
            item.is_selectable()
                && item
                    .text
                    .trim_start_matches('_')
                    .chars()
                    .next()
                    .is_some_and(|first| first.eq_ignore_ascii_case(&letter))
        })
}
