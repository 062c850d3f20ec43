//! 文档图元列表。
//!
//! 图元存放在槽位 arena 中，槽位之间以下标串成双向链表，链表顺序即绘制与保存顺序。
//! 摘下的图元保留槽位（`Detached`），撤销时可以原样放回同一个键；释放后槽位代数递增，
//! 旧键不会指向新的图元。

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::item::{Item, ItemFlags};

/// 图元在列表中的稳定句柄。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemKey {
    index: u32,
    generation: u32,
}

impl ItemKey {
    #[inline]
    fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    #[inline]
    pub fn index(self) -> u32 {
        self.index
    }

    #[inline]
    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DrawListError {
    #[error("item {0} is not linked into the list")]
    NotLinked(ItemKey),
    #[error("item {0} has no reserved slot to return to")]
    NotDetached(ItemKey),
    #[error("ordinal {ordinal} is out of range for a list of {len} items")]
    OrdinalOutOfRange { ordinal: usize, len: usize },
}

/// 可撤销的单条变更，描述如何回到变更之前的状态。
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// 图元已加入文档；条目本身不持有图元。
    Created { key: ItemKey },
    /// 图元已从文档移除，条目持有它并记录原序号。
    Deleted {
        key: ItemKey,
        ordinal: usize,
        item: Box<Item>,
    },
    /// 图元被修改，条目持有修改前的副本。
    Modified { key: ItemKey, snapshot: Box<Item> },
}

impl Change {
    #[inline]
    pub fn key(&self) -> ItemKey {
        match self {
            Change::Created { key } | Change::Deleted { key, .. } | Change::Modified { key, .. } => {
                *key
            }
        }
    }

    #[inline]
    pub fn owns_item(&self) -> bool {
        matches!(self, Change::Deleted { .. })
    }
}

/// 从列表摘下的图元及其原序号。
#[derive(Debug, Clone, PartialEq)]
pub struct Detached {
    pub item: Item,
    pub ordinal: usize,
}

#[derive(Debug, Clone)]
enum Slot {
    Occupied {
        generation: u32,
        item: Item,
        prev: Option<u32>,
        next: Option<u32>,
    },
    Detached {
        generation: u32,
    },
    Free {
        generation: u32,
    },
}

impl Slot {
    #[inline]
    fn generation(&self) -> u32 {
        match self {
            Slot::Occupied { generation, .. }
            | Slot::Detached { generation }
            | Slot::Free { generation } => *generation,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum SlotState {
    Linked,
    Reserved,
    Missing,
}

#[derive(Debug, Clone, Default)]
pub struct DrawList {
    slots: Vec<Slot>,
    free: Vec<u32>,
    head: Option<u32>,
    tail: Option<u32>,
    len: usize,
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// 追加到末尾。
    pub fn append(&mut self, item: Item) -> ItemKey {
        let index = self.allocate(item);
        self.link_before(index, None);
        self.key_of(index)
    }

    /// 插入到第 `ordinal` 个位置（`ordinal == len` 时等同追加）。
    pub fn insert(&mut self, ordinal: usize, item: Item) -> Result<ItemKey, DrawListError> {
        let before = self.position_at(ordinal)?;
        let index = self.allocate(item);
        self.link_before(index, before);
        Ok(self.key_of(index))
    }

    pub fn insert_before(&mut self, before: ItemKey, item: Item) -> Result<ItemKey, DrawListError> {
        let anchor = self.linked_index(before).ok_or(DrawListError::NotLinked(before))?;
        let index = self.allocate(item);
        self.link_before(index, Some(anchor));
        Ok(self.key_of(index))
    }

    pub fn insert_after(&mut self, after: ItemKey, item: Item) -> Result<ItemKey, DrawListError> {
        let anchor = self.linked_index(after).ok_or(DrawListError::NotLinked(after))?;
        let (_, next) = self.links(anchor);
        let index = self.allocate(item);
        self.link_before(index, next);
        Ok(self.key_of(index))
    }

    #[inline]
    pub fn contains(&self, key: ItemKey) -> bool {
        self.linked_index(key).is_some()
    }

    /// 键对应的槽位是否处于摘下待归还状态。
    pub fn is_detached(&self, key: ItemKey) -> bool {
        self.state_of(key) == SlotState::Reserved
    }

    pub fn get(&self, key: ItemKey) -> Option<&Item> {
        match self.slots.get(key.index as usize)? {
            Slot::Occupied {
                generation, item, ..
            } if *generation == key.generation => Some(item),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, key: ItemKey) -> Option<&mut Item> {
        match self.slots.get_mut(key.index as usize)? {
            Slot::Occupied {
                generation, item, ..
            } if *generation == key.generation => Some(item),
            _ => None,
        }
    }

    /// 图元当前的序号，O(n)。
    pub fn ordinal_of(&self, key: ItemKey) -> Option<usize> {
        self.iter().position(|(candidate, _)| candidate == key)
    }

    pub fn key_at(&self, ordinal: usize) -> Option<ItemKey> {
        self.iter().nth(ordinal).map(|(key, _)| key)
    }

    /// 仅断开链接并保留槽位，O(1)。
    pub fn unlink(&mut self, key: ItemKey) -> Option<Item> {
        let index = self.linked_index(key)?;
        self.unlink_index(index);
        let slot = std::mem::replace(
            &mut self.slots[index as usize],
            Slot::Detached {
                generation: key.generation,
            },
        );
        match slot {
            Slot::Occupied { item, .. } => Some(item),
            _ => None,
        }
    }

    /// 断开链接并记录原序号，供撤销时原位放回。
    pub fn detach(&mut self, key: ItemKey) -> Option<Detached> {
        let ordinal = self.ordinal_of(key)?;
        let item = self.unlink(key)?;
        Some(Detached { item, ordinal })
    }

    /// 把摘下的图元放回原来的键，并插入到 `ordinal` 位置。
    pub fn reattach(&mut self, key: ItemKey, item: Item, ordinal: usize) -> Result<(), DrawListError> {
        if !self.is_detached(key) {
            return Err(DrawListError::NotDetached(key));
        }
        let before = self.position_at(ordinal)?;
        self.slots[key.index as usize] = Slot::Occupied {
            generation: key.generation,
            item,
            prev: None,
            next: None,
        };
        self.link_before(key.index, before);
        Ok(())
    }

    /// 放弃摘下图元的预留槽位。
    pub fn release(&mut self, key: ItemKey) -> bool {
        if !self.is_detached(key) {
            return false;
        }
        self.slots[key.index as usize] = Slot::Free {
            generation: key.generation.wrapping_add(1),
        };
        self.free.push(key.index);
        true
    }

    /// 从列表中取出图元并释放槽位。
    pub fn take(&mut self, key: ItemKey) -> Option<Item> {
        let item = self.unlink(key)?;
        self.release(key);
        Some(item)
    }

    /// 按绘制顺序取出全部图元，所有槽位（含预留槽位）一并释放。
    pub fn clear(&mut self) -> Vec<Item> {
        let order = self.link_order();
        let mut slots: Vec<Option<Item>> = Vec::with_capacity(self.slots.len());
        self.free.clear();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            let generation = slot.generation().wrapping_add(1);
            let previous = std::mem::replace(slot, Slot::Free { generation });
            slots.push(match previous {
                Slot::Occupied { item, .. } => Some(item),
                _ => None,
            });
            self.free.push(index as u32);
        }
        self.free.reverse();
        self.head = None;
        self.tail = None;
        self.len = 0;
        order
            .into_iter()
            .filter_map(|index| slots[index as usize].take())
            .collect()
    }

    pub fn clear_flags(&mut self) {
        for slot in &mut self.slots {
            if let Slot::Occupied { item, .. } = slot {
                item.set_flags(ItemFlags::NONE);
            }
        }
    }

    pub fn iter(&self) -> Iter<'_> {
        Iter {
            list: self,
            cursor: self.head,
        }
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (ItemKey, &mut Item)> + '_ {
        let order = self.link_order();
        let mut by_index: Vec<Option<(ItemKey, &mut Item)>> = self
            .slots
            .iter_mut()
            .enumerate()
            .map(|(index, slot)| match slot {
                Slot::Occupied {
                    generation, item, ..
                } => Some((ItemKey::new(index as u32, *generation), item)),
                _ => None,
            })
            .collect();
        order
            .into_iter()
            .filter_map(move |index| by_index[index as usize].take())
    }

    pub fn keys(&self) -> Vec<ItemKey> {
        self.iter().map(|(key, _)| key).collect()
    }

    /// 回退一条变更，返回其逆变更。
    pub fn apply_change(&mut self, change: Change) -> Result<Change, DrawListError> {
        match change {
            Change::Created { key } => {
                let Detached { item, ordinal } =
                    self.detach(key).ok_or(DrawListError::NotLinked(key))?;
                Ok(Change::Deleted {
                    key,
                    ordinal,
                    item: Box::new(item),
                })
            }
            Change::Deleted { key, ordinal, item } => {
                self.reattach(key, *item, ordinal)?;
                Ok(Change::Created { key })
            }
            Change::Modified { key, snapshot } => {
                let live = self.get_mut(key).ok_or(DrawListError::NotLinked(key))?;
                let previous = std::mem::replace(live, *snapshot);
                Ok(Change::Modified {
                    key,
                    snapshot: Box::new(previous),
                })
            }
        }
    }

    /// 模拟按逆序回退整组变更，判断文档状态是否仍与之匹配。
    pub fn can_revert(&self, changes: &[Change]) -> bool {
        let mut states: HashMap<ItemKey, SlotState> = HashMap::new();
        let mut len = self.len;
        for change in changes.iter().rev() {
            let key = change.key();
            let state = states
                .entry(key)
                .or_insert_with(|| self.state_of(key));
            match change {
                Change::Created { .. } => {
                    if *state != SlotState::Linked {
                        return false;
                    }
                    *state = SlotState::Reserved;
                    len = len.saturating_sub(1);
                }
                Change::Deleted { ordinal, .. } => {
                    if *state != SlotState::Reserved || *ordinal > len {
                        return false;
                    }
                    *state = SlotState::Linked;
                    len += 1;
                }
                Change::Modified { .. } => {
                    if *state != SlotState::Linked {
                        return false;
                    }
                }
            }
        }
        true
    }

    fn state_of(&self, key: ItemKey) -> SlotState {
        match self.slots.get(key.index as usize) {
            Some(Slot::Occupied { generation, .. }) if *generation == key.generation => {
                SlotState::Linked
            }
            Some(Slot::Detached { generation }) if *generation == key.generation => {
                SlotState::Reserved
            }
            _ => SlotState::Missing,
        }
    }

    #[inline]
    fn key_of(&self, index: u32) -> ItemKey {
        ItemKey::new(index, self.slots[index as usize].generation())
    }

    fn linked_index(&self, key: ItemKey) -> Option<u32> {
        (self.state_of(key) == SlotState::Linked).then_some(key.index)
    }

    /// 序号对应的“插入到其前面”的槽位；`ordinal == len` 时为 `None`。
    fn position_at(&self, ordinal: usize) -> Result<Option<u32>, DrawListError> {
        if ordinal > self.len {
            return Err(DrawListError::OrdinalOutOfRange {
                ordinal,
                len: self.len,
            });
        }
        Ok(self.key_at(ordinal).map(|key| key.index))
    }

    fn allocate(&mut self, item: Item) -> u32 {
        match self.free.pop() {
            Some(index) => {
                let generation = self.slots[index as usize].generation();
                self.slots[index as usize] = Slot::Occupied {
                    generation,
                    item,
                    prev: None,
                    next: None,
                };
                index
            }
            None => {
                self.slots.push(Slot::Occupied {
                    generation: 0,
                    item,
                    prev: None,
                    next: None,
                });
                (self.slots.len() - 1) as u32
            }
        }
    }

    fn links(&self, index: u32) -> (Option<u32>, Option<u32>) {
        match &self.slots[index as usize] {
            Slot::Occupied { prev, next, .. } => (*prev, *next),
            _ => (None, None),
        }
    }

    fn set_links(&mut self, index: u32, new_prev: Option<Option<u32>>, new_next: Option<Option<u32>>) {
        if let Slot::Occupied { prev, next, .. } = &mut self.slots[index as usize] {
            if let Some(value) = new_prev {
                *prev = value;
            }
            if let Some(value) = new_next {
                *next = value;
            }
        }
    }

    fn link_before(&mut self, index: u32, before: Option<u32>) {
        let prev = match before {
            Some(anchor) => self.links(anchor).0,
            None => self.tail,
        };
        self.set_links(index, Some(prev), Some(before));
        match prev {
            Some(p) => self.set_links(p, None, Some(Some(index))),
            None => self.head = Some(index),
        }
        match before {
            Some(anchor) => self.set_links(anchor, Some(Some(index)), None),
            None => self.tail = Some(index),
        }
        self.len += 1;
    }

    fn unlink_index(&mut self, index: u32) {
        let (prev, next) = self.links(index);
        match prev {
            Some(p) => self.set_links(p, None, Some(next)),
            None => self.head = next,
        }
        match next {
            Some(n) => self.set_links(n, Some(prev), None),
            None => self.tail = prev,
        }
        self.len -= 1;
    }

    fn link_order(&self) -> Vec<u32> {
        self.iter().map(|(key, _)| key.index).collect()
    }
}

/// 按绘制顺序遍历。
pub struct Iter<'a> {
    list: &'a DrawList,
    cursor: Option<u32>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (ItemKey, &'a Item);

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.cursor?;
        match &self.list.slots[index as usize] {
            Slot::Occupied {
                generation,
                item,
                next,
                ..
            } => {
                self.cursor = *next;
                Some((ItemKey::new(index, *generation), item))
            }
            _ => {
                self.cursor = None;
                None
            }
        }
    }
}

impl<'a> IntoIterator for &'a DrawList {
    type Item = (ItemKey, &'a Item);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use pretty_assertions::assert_eq;

    fn wire(x: i32) -> Item {
        Item::wire(Point::new(x, 0), Point::new(x + 10, 0))
    }

    fn starts(list: &DrawList) -> Vec<i32> {
        list.iter().map(|(_, item)| item.position().x()).collect()
    }

    #[test]
    fn iteration_follows_insertion_order() {
        let mut list = DrawList::new();
        let a = list.append(wire(0));
        list.append(wire(20));
        list.insert_before(a, wire(-20)).expect("锚点存在");
        list.insert(1, wire(-10)).expect("序号合法");
        assert_eq!(starts(&list), vec![-20, -10, 0, 20]);
        assert_eq!(list.len(), 4);
        assert_eq!(list.ordinal_of(a), Some(2));
    }

    #[test]
    fn insert_rejects_ordinal_past_end() {
        let mut list = DrawList::new();
        list.append(wire(0));
        let err = list.insert(3, wire(10)).expect_err("越界");
        assert_eq!(err, DrawListError::OrdinalOutOfRange { ordinal: 3, len: 1 });
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn detach_and_reattach_restore_position_and_key() {
        let mut list = DrawList::new();
        list.append(wire(0));
        let b = list.append(wire(10));
        list.append(wire(20));

        let detached = list.detach(b).expect("已链接");
        assert_eq!(detached.ordinal, 1);
        assert!(!list.contains(b));
        assert!(list.is_detached(b));
        assert!(list.get(b).is_none());
        // 重复摘下为空操作
        assert!(list.detach(b).is_none());

        list.reattach(b, detached.item, detached.ordinal).expect("槽位仍预留");
        assert_eq!(starts(&list), vec![0, 10, 20]);
        assert!(list.contains(b));
    }

    #[test]
    fn released_slots_never_alias_old_keys() {
        let mut list = DrawList::new();
        let a = list.append(wire(0));
        assert!(list.take(a).is_some());
        let b = list.append(wire(5));
        assert_eq!(a.index(), b.index());
        assert_ne!(a, b);
        assert!(list.get(a).is_none());
        assert!(list.get(b).is_some());
    }

    #[test]
    fn clear_returns_items_in_order_and_invalidates_keys() {
        let mut list = DrawList::new();
        let a = list.append(wire(0));
        let b = list.append(wire(10));
        list.unlink(b).expect("已链接");
        list.append(wire(20));

        let items = list.clear();
        assert_eq!(items.len(), 2);
        assert!(list.is_empty());
        assert!(!list.contains(a));
        assert!(!list.is_detached(b));
        let fresh = list.append(wire(30));
        assert_ne!(fresh, a);
    }

    #[test]
    fn apply_change_returns_inverse() {
        let mut list = DrawList::new();
        let a = list.append(wire(0));
        let created = Change::Created { key: a };

        let inverse = list.apply_change(created.clone()).expect("可回退");
        assert!(matches!(inverse, Change::Deleted { ordinal: 0, .. }));
        assert!(list.is_empty());

        let again = list.apply_change(inverse).expect("可重做");
        assert_eq!(again, created);
        assert!(list.contains(a));
    }

    #[test]
    fn modified_change_swaps_snapshot() {
        let mut list = DrawList::new();
        let a = list.append(wire(0));
        let snapshot = list.get(a).cloned().expect("存在");
        if let Some(item) = list.get_mut(a) {
            item.set_position(Point::new(100, 0));
        }
        let inverse = list
            .apply_change(Change::Modified {
                key: a,
                snapshot: Box::new(snapshot),
            })
            .expect("可回退");
        assert_eq!(list.get(a).map(Item::position), Some(Point::new(0, 0)));
        match inverse {
            Change::Modified { snapshot, .. } => assert_eq!(snapshot.position(), Point::new(100, 0)),
            other => panic!("unexpected inverse {other:?}"),
        }
    }

    #[test]
    fn can_revert_simulates_whole_command() {
        let mut list = DrawList::new();
        let a = list.append(wire(0));
        let detached = list.detach(a).expect("已链接");
        // 先创建后删除同一图元：逆序回退时先放回再摘下
        let changes = vec![
            Change::Created { key: a },
            Change::Deleted {
                key: a,
                ordinal: detached.ordinal,
                item: Box::new(detached.item),
            },
        ];
        assert!(list.can_revert(&changes));
        assert!(!list.can_revert(&changes[..1]));

        let stale = Change::Modified {
            key: a,
            snapshot: Box::new(wire(0)),
        };
        assert!(!list.can_revert(&[stale]));
    }

    #[test]
    fn iter_mut_visits_in_draw_order() {
        let mut list = DrawList::new();
        let a = list.append(wire(0));
        list.append(wire(10));
        list.insert_before(a, wire(-10)).expect("锚点存在");
        let mut visited = Vec::new();
        for (key, item) in list.iter_mut() {
            item.insert_flags(ItemFlags::SELECTED);
            visited.push(key);
        }
        assert_eq!(visited, list.keys());
        assert!(list.iter().all(|(_, item)| item.flags().contains(ItemFlags::SELECTED)));
        list.clear_flags();
        assert!(list.iter().all(|(_, item)| item.flags().is_empty()));
    }
}
