//! 框选与拖动选择。

use std::collections::HashSet;

use tracing::debug;
use zsch_core::draw_list::{DrawList, ItemKey};
use zsch_core::geometry::{Point, Rect};
use zsch_core::item::{Connectable, HitTestable, ItemFlags};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BlockCommand {
    #[default]
    Move,
    /// 移动选中图元，并让与之相连的导线跟随。
    Drag,
    Copy,
    Delete,
}

/// 拾取列表中的条目：图元句柄与选择结束时的状态位。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PickedItem {
    pub key: ItemKey,
    pub flags: ItemFlags,
}

const WHOLE_ITEM: ItemFlags = ItemFlags::SELECTED
    .union(ItemFlags::MOVE_START)
    .union(ItemFlags::MOVE_END);

#[derive(Debug, Clone, Default)]
pub struct BlockSelector {
    rect: Rect,
    command: BlockCommand,
    picked: Vec<PickedItem>,
}

impl BlockSelector {
    pub fn new(rect: Rect, command: BlockCommand) -> Self {
        Self {
            rect,
            command,
            picked: Vec::new(),
        }
    }

    #[inline]
    pub fn rect(&self) -> Rect {
        self.rect
    }

    #[inline]
    pub fn command(&self) -> BlockCommand {
        self.command
    }

    #[inline]
    pub fn pick_list(&self) -> &[PickedItem] {
        &self.picked
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.picked.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.picked.is_empty()
    }

    pub fn contains(&self, key: ItemKey) -> bool {
        self.picked.iter().any(|picked| picked.key == key)
    }

    pub fn clear(&mut self) {
        self.picked.clear();
    }

    /// 重新拾取与矩形相交的图元（按绘制顺序），返回拾取数量。
    pub fn update_pick_list(&mut self, items: &DrawList, accuracy: i32) -> usize {
        self.picked.clear();
        for (key, item) in items.iter() {
            if item.hit_test_rect(self.rect, false, accuracy) {
                self.picked.push(PickedItem {
                    key,
                    flags: item.flags(),
                });
            }
        }
        self.picked.len()
    }

    /// 标记拾取的图元。拖动时沿连接点传递，直到不再有新的移动点。
    pub fn select_items(&mut self, items: &mut DrawList) {
        if self.picked.is_empty() {
            return;
        }
        items.clear_flags();

        let mut pending: Vec<Point> = Vec::new();
        for picked in &self.picked {
            let Some(item) = items.get_mut(picked.key) else {
                continue;
            };
            item.insert_flags(WHOLE_ITEM);
            if self.command == BlockCommand::Drag {
                item.insert_flags(ItemFlags::IS_DRAGGED);
                if item.is_connectable() {
                    pending.extend(item.connection_points());
                }
            }
        }

        let mut visited: HashSet<Point> = HashSet::new();
        while let Some(point) = pending.pop() {
            if !visited.insert(point) {
                continue;
            }
            for key in items.keys() {
                let Some(item) = items.get_mut(key) else {
                    continue;
                };
                if !item.is_connected_at(point) {
                    continue;
                }
                let newly_picked = !item.flags().contains(ItemFlags::SELECTED);
                if let Some(line) = item.as_line() {
                    // 导线只移动接触到的端点，不继续传递
                    let mut ends = ItemFlags::NONE;
                    if line.start == point {
                        ends |= ItemFlags::MOVE_START;
                    }
                    if line.end == point {
                        ends |= ItemFlags::MOVE_END;
                    }
                    item.insert_flags(ItemFlags::SELECTED | ItemFlags::IS_DRAGGED | ends);
                } else if newly_picked {
                    item.insert_flags(WHOLE_ITEM | ItemFlags::IS_DRAGGED);
                    pending.extend(item.connection_points());
                }
                if newly_picked {
                    self.picked.push(PickedItem {
                        key,
                        flags: ItemFlags::NONE,
                    });
                }
            }
        }

        for picked in &mut self.picked {
            if let Some(item) = items.get(picked.key) {
                picked.flags = item.flags();
            }
        }
        debug!(
            command = ?self.command,
            picked = self.picked.len(),
            moving_points = visited.len(),
            "框选完成"
        );
    }
}
