//! 单张图纸的文档：图元列表、撤销/重做日志、框选状态与元数据。

use std::collections::HashSet;

use tracing::{debug, info, warn};
use zsch_core::connectivity::{self, PinHit};
use zsch_core::draw_list::{Change, DrawList, ItemKey};
use zsch_core::geometry::{Point, Rect};
use zsch_core::item::{Connectable, HitTestable, Item, ScreenId, TimeStamp};

use crate::EditSettings;
use crate::block::{BlockCommand, BlockSelector, PickedItem};
use crate::errors::EngineError;
use crate::hierarchy::SheetPath;
use crate::undo::{CommandStack, EditTransaction, UndoCommand, UndoList};

/// 子图纸图元对其图纸的一次引用，以图元身份区分同一图纸的多个实例。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SheetRef {
    pub(crate) screen: ScreenId,
    pub(crate) time_stamp: TimeStamp,
}

impl SheetRef {
    pub(crate) fn of(item: &Item) -> Option<Self> {
        item.sub_screen().map(|screen| Self {
            screen,
            time_stamp: item.time_stamp(),
        })
    }
}

/// 本图纸上子图纸引用的增减，由 [`crate::Schematic`] 在每次编辑后结算。
///
/// `detached` 是被取出但未销毁的子图纸图元：引用仍由图元持有，
/// 直到它被重新加入某张图纸或交给 [`crate::Schematic::drop_item`]。
#[derive(Debug, Default)]
pub(crate) struct SheetRefChanges {
    pub(crate) acquired: Vec<SheetRef>,
    pub(crate) detached: Vec<SheetRef>,
    pub(crate) released: Vec<ScreenId>,
}

#[derive(Debug)]
pub struct Screen {
    file_name: String,
    items: DrawList,
    undo_list: CommandStack,
    redo_list: CommandStack,
    max_undo_depth: usize,
    hit_accuracy: i32,
    ref_count: usize,
    cur_item: Option<ItemKey>,
    block: BlockSelector,
    date: String,
    modified: bool,
    sheet_refs: SheetRefChanges,
}

impl Screen {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self::with_settings(file_name, &EditSettings::default())
    }

    pub fn with_settings(file_name: impl Into<String>, settings: &EditSettings) -> Self {
        Self {
            file_name: file_name.into(),
            items: DrawList::new(),
            undo_list: CommandStack::default(),
            redo_list: CommandStack::default(),
            max_undo_depth: settings.max_undo_depth,
            hit_accuracy: settings.hit_accuracy,
            ref_count: 0,
            cur_item: None,
            block: BlockSelector::default(),
            date: String::new(),
            modified: false,
            sheet_refs: SheetRefChanges::default(),
        }
    }

    #[inline]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn set_file_name(&mut self, file_name: impl Into<String>) {
        self.file_name = file_name.into();
    }

    #[inline]
    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn set_date(&mut self, date: impl Into<String>) {
        self.date = date.into();
        self.modified = true;
    }

    /// 引用本图纸的子图纸实例数（根图纸额外持有一次）。
    #[inline]
    pub fn ref_count(&self) -> usize {
        self.ref_count
    }

    #[inline]
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn clear_modify_status(&mut self) {
        self.modified = false;
    }

    #[inline]
    pub fn items(&self) -> &DrawList {
        &self.items
    }

    #[inline]
    pub fn item(&self, key: ItemKey) -> Option<&Item> {
        self.items.get(key)
    }

    #[inline]
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// 当前交互图元；图元已不在列表中时视为没有。
    pub fn cur_item(&self) -> Option<ItemKey> {
        self.cur_item.filter(|key| self.items.contains(*key))
    }

    pub fn set_cur_item(&mut self, key: Option<ItemKey>) {
        self.cur_item = key;
    }

    pub fn add_item(&mut self, item: Item) -> ItemKey {
        self.note_acquired(&item);
        self.modified = true;
        self.items.append(item)
    }

    pub fn insert_item(&mut self, ordinal: usize, item: Item) -> Result<ItemKey, EngineError> {
        let sheet_ref = SheetRef::of(&item);
        let key = self.items.insert(ordinal, item)?;
        self.sheet_refs.acquired.extend(sheet_ref);
        self.modified = true;
        Ok(key)
    }

    pub fn insert_item_before(&mut self, before: ItemKey, item: Item) -> Result<ItemKey, EngineError> {
        let sheet_ref = SheetRef::of(&item);
        let key = self.items.insert_before(before, item)?;
        self.sheet_refs.acquired.extend(sheet_ref);
        self.modified = true;
        Ok(key)
    }

    /// 从列表中取出图元但不销毁，所有权交还调用方。
    /// 子图纸图元继续持有对其图纸的引用。
    pub fn remove_from_draw_list(&mut self, key: ItemKey) -> Option<Item> {
        let item = self.unlink(key)?;
        self.sheet_refs.detached.extend(SheetRef::of(&item));
        Some(item)
    }

    /// 取出并销毁图元；不在列表中时返回 `false`。
    pub fn delete_item(&mut self, key: ItemKey) -> bool {
        match self.unlink(key) {
            Some(item) => {
                self.note_released(&item);
                true
            }
            None => false,
        }
    }

    fn unlink(&mut self, key: ItemKey) -> Option<Item> {
        let item = self.items.take(key)?;
        if self.cur_item == Some(key) {
            self.cur_item = None;
        }
        self.modified = true;
        Some(item)
    }

    #[inline]
    pub fn check_if_on_draw_list(&self, key: ItemKey) -> bool {
        self.items.contains(key)
    }

    /// 销毁全部图元。先清空撤销日志，避免命令引用已不存在的图元。
    pub fn free_draw_list(&mut self) {
        self.clear_undo_or_redo_list(UndoList::Undo, None);
        self.clear_undo_or_redo_list(UndoList::Redo, None);
        let items = self.items.clear();
        debug!(file = %self.file_name, count = items.len(), "清空图元列表");
        for item in &items {
            self.note_released(item);
        }
        self.cur_item = None;
        self.block.clear();
        self.modified = true;
    }

    /// 取出全部导线、总线与结点，按绘制顺序交还调用方。`create_copy` 为真时在原位置
    /// 留下同身份的副本，取出的原件可作为拖动前的快照保存。
    pub fn extract_wires(&mut self, create_copy: bool) -> Vec<Item> {
        let keys: Vec<ItemKey> = self
            .items
            .iter()
            .filter(|(_, item)| {
                item.is_junction() || item.as_line().is_some_and(|line| line.is_connectable())
            })
            .map(|(key, _)| key)
            .collect();

        let mut extracted = Vec::with_capacity(keys.len());
        for key in keys {
            if create_copy {
                if let Some(copy) = self.items.get(key).cloned() {
                    // key 刚从列表中取得，插入不会失败
                    let _ = self.items.insert_before(key, copy);
                }
            }
            extracted.extend(self.unlink(key));
        }
        debug!(file = %self.file_name, count = extracted.len(), create_copy, "取出导线");
        extracted
    }

    pub fn clear_drawing_state(&mut self) {
        self.items.clear_flags();
    }

    /// 按命中容差查找 `point` 处最上层（绘制顺序最后）的图元。
    pub fn item_at(&self, point: Point) -> Option<ItemKey> {
        self.items
            .iter()
            .filter(|(_, item)| item.hit_test(point, self.hit_accuracy))
            .map(|(key, _)| key)
            .last()
    }

    /// 规范化导线拓扑，不记录撤销信息。返回是否有改动。
    pub fn schematic_cleanup(&mut self) -> bool {
        let outcome = connectivity::schematic_cleanup(&mut self.items);
        let stats = outcome.stats();
        let modified = outcome.is_modified();
        self.discard_changes(outcome.into_changes());
        if modified {
            self.modified = true;
            info!(
                file = %self.file_name,
                removed = stats.null_segments + stats.duplicate_junctions,
                merged = stats.merged,
                split = stats.split,
                "连接性清理完成"
            );
        }
        modified
    }

    /// 规范化导线拓扑，有改动时压入一条撤销命令。
    pub fn schematic_cleanup_with_undo(&mut self) -> bool {
        let outcome = connectivity::schematic_cleanup(&mut self.items);
        if !outcome.is_modified() {
            return false;
        }
        self.push_command(UndoCommand::from_changes("cleanup", outcome.into_changes()));
        true
    }

    pub fn count_connected_items(&self, point: Point, test_junctions: bool) -> usize {
        connectivity::count_connected_items(&self.items, point, test_junctions)
    }

    pub fn get_pin(&self, point: Point) -> Option<PinHit<'_>> {
        connectivity::pin_at(&self.items, point)
    }

    pub fn is_junction_needed(&self, point: Point) -> bool {
        connectivity::is_junction_needed(&self.items, point)
    }

    /// 元件与子图纸。
    pub fn hierarchical_items(&self) -> Vec<ItemKey> {
        self.items
            .iter()
            .filter(|(_, item)| item.is_hierarchical())
            .map(|(key, _)| key)
            .collect()
    }

    /// 清除元件位号。给定实例路径时只处理该路径下的位号。返回处理的元件数。
    pub fn clear_annotation(&mut self, scope: Option<&SheetPath>) -> usize {
        let mut cleared = 0;
        for (_, item) in self.items.iter_mut() {
            let time_stamp = item.time_stamp();
            if let Some(component) = item.as_component_mut() {
                let path = scope.map(|sheet_path| sheet_path.component_path(time_stamp));
                component.clear_annotation(path.as_deref());
                cleared += 1;
            }
        }
        if cleared > 0 {
            self.modified = true;
        }
        cleared
    }

    /// 为重复身份的层次图元分配新身份。`seen` 与 `in_use` 跨图纸共享。
    pub(crate) fn replace_duplicate_time_stamps(
        &mut self,
        seen: &mut HashSet<TimeStamp>,
        in_use: &mut HashSet<TimeStamp>,
    ) -> usize {
        let mut replaced = 0;
        for (_, item) in self.items.iter_mut() {
            if !item.is_hierarchical() {
                continue;
            }
            let original = item.time_stamp();
            if seen.insert(original) {
                continue;
            }
            let fresh = loop {
                let candidate = TimeStamp::fresh();
                if in_use.insert(candidate) {
                    break candidate;
                }
            };
            debug!(file = %self.file_name, %original, %fresh, "替换重复的时间戳");
            item.reassign_time_stamp(fresh);
            seen.insert(fresh);
            replaced += 1;
        }
        if replaced > 0 {
            self.modified = true;
        }
        replaced
    }

    pub fn set_block(&mut self, rect: Rect, command: BlockCommand) {
        self.block = BlockSelector::new(rect, command);
    }

    #[inline]
    pub fn block(&self) -> &BlockSelector {
        &self.block
    }

    pub fn update_pick_list(&mut self) -> usize {
        self.block.update_pick_list(&self.items, self.hit_accuracy)
    }

    pub fn select_block_items(&mut self) {
        self.block.select_items(&mut self.items);
    }

    #[inline]
    pub fn pick_list(&self) -> &[PickedItem] {
        self.block.pick_list()
    }

    pub fn clear_block(&mut self) {
        self.block = BlockSelector::default();
    }

    #[inline]
    pub fn undo_count(&self) -> usize {
        self.undo_list.len()
    }

    #[inline]
    pub fn redo_count(&self) -> usize {
        self.redo_list.len()
    }

    #[inline]
    pub fn max_undo_depth(&self) -> usize {
        self.max_undo_depth
    }

    pub fn set_max_undo_depth(&mut self, depth: usize) {
        self.max_undo_depth = depth;
        self.trim_undo_list();
    }

    /// 压入一条新命令：清空重做栈，超出深度时丢弃最旧的命令。空命令被忽略。
    pub fn push_command(&mut self, command: UndoCommand) {
        if command.is_empty() {
            return;
        }
        self.clear_undo_or_redo_list(UndoList::Redo, None);
        debug!(
            file = %self.file_name,
            description = command.description(),
            changes = command.len(),
            "记录撤销命令"
        );
        self.undo_list.push(command);
        self.trim_undo_list();
        self.modified = true;
    }

    pub fn undo(&mut self) -> Result<bool, EngineError> {
        self.revert_from(UndoList::Undo)
    }

    pub fn redo(&mut self) -> Result<bool, EngineError> {
        self.revert_from(UndoList::Redo)
    }

    /// 丢弃 `count` 条最旧的命令（`None` 为全部），返回丢弃的条数。
    pub fn clear_undo_or_redo_list(&mut self, list: UndoList, count: Option<usize>) -> usize {
        let removed = self.stack_mut(list).drain_oldest(count);
        let dropped = removed.len();
        for command in removed {
            self.dispose_command(command);
        }
        dropped
    }

    /// 在事务中编辑，成功后整体记为一条撤销命令；闭包出错时回滚全部改动。
    pub fn edit<R>(
        &mut self,
        description: &str,
        f: impl FnOnce(&mut EditTransaction<'_>) -> Result<R, EngineError>,
    ) -> Result<R, EngineError> {
        let mut tx = EditTransaction::new(&mut self.items);
        match f(&mut tx) {
            Ok(value) => {
                let (changes, acquired) = tx.commit();
                self.sheet_refs.acquired.extend(acquired);
                self.push_command(UndoCommand::from_changes(description, changes));
                Ok(value)
            }
            Err(err) => {
                tx.rollback();
                warn!(file = %self.file_name, description, error = %err, "编辑失败，已回滚");
                Err(err)
            }
        }
    }

    pub fn add_item_with_undo(&mut self, item: Item) -> ItemKey {
        let key = self.add_item(item);
        self.push_command(UndoCommand::from_changes(
            "add item",
            vec![Change::Created { key }],
        ));
        key
    }

    pub fn delete_item_with_undo(&mut self, key: ItemKey) -> Result<(), EngineError> {
        self.edit("delete item", |tx| tx.delete(key))
    }

    pub fn modify_item_with_undo<R>(
        &mut self,
        key: ItemKey,
        f: impl FnOnce(&mut Item) -> R,
    ) -> Result<R, EngineError> {
        self.edit("modify item", |tx| tx.modify(key, f))
    }

    /// 撤销/重做：先整体校验，再逐条逆序回退，逆变更组成反方向的命令。
    fn revert_from(&mut self, list: UndoList) -> Result<bool, EngineError> {
        let Some(command) = self.stack_mut(list).pop() else {
            debug!(file = %self.file_name, ?list, "命令栈为空");
            return Ok(false);
        };
        if !self.items.can_revert(command.changes()) {
            let description = command.description().to_string();
            warn!(file = %self.file_name, ?list, %description, "命令与文档状态不一致，已丢弃");
            self.dispose_command(command);
            return Err(EngineError::InconsistentCommand { description });
        }

        let (description, changes) = command.into_parts();
        let mut inverse = Vec::with_capacity(changes.len());
        for change in changes.into_iter().rev() {
            inverse.push(self.items.apply_change(change)?);
        }
        debug!(file = %self.file_name, ?list, %description, "回退命令");
        self.stack_mut(list.opposite())
            .push(UndoCommand::from_changes(description, inverse));
        self.modified = true;
        Ok(true)
    }

    fn stack_mut(&mut self, list: UndoList) -> &mut CommandStack {
        match list {
            UndoList::Undo => &mut self.undo_list,
            UndoList::Redo => &mut self.redo_list,
        }
    }

    fn trim_undo_list(&mut self) {
        if self.max_undo_depth == 0 {
            return;
        }
        let excess = self.undo_list.len().saturating_sub(self.max_undo_depth);
        if excess > 0 {
            self.clear_undo_or_redo_list(UndoList::Undo, Some(excess));
        }
    }

    /// 丢弃命令：`Deleted` 条目持有的图元随之销毁，其预留槽位释放。
    fn dispose_command(&mut self, command: UndoCommand) {
        let (_, changes) = command.into_parts();
        self.discard_changes(changes);
    }

    fn discard_changes(&mut self, changes: Vec<Change>) {
        for change in changes {
            if let Change::Deleted { key, item, .. } = change {
                self.items.release(key);
                self.note_released(&item);
            }
        }
    }

    fn note_acquired(&mut self, item: &Item) {
        self.sheet_refs.acquired.extend(SheetRef::of(item));
    }

    fn note_released(&mut self, item: &Item) {
        self.sheet_refs.released.extend(item.sub_screen());
    }

    pub(crate) fn take_sheet_ref_changes(&mut self) -> SheetRefChanges {
        std::mem::take(&mut self.sheet_refs)
    }

    pub(crate) fn acquire(&mut self) {
        self.ref_count += 1;
    }

    /// 返回剩余引用数。
    pub(crate) fn release(&mut self) -> usize {
        self.ref_count = self.ref_count.saturating_sub(1);
        self.ref_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use zsch_core::geometry::Angle;
    use zsch_core::item::{LabelKind, Transformable};

    fn p(x: i32, y: i32) -> Point {
        Point::new(x, y)
    }

    fn snapshot(screen: &Screen) -> Vec<Item> {
        screen.items().iter().map(|(_, item)| item.clone()).collect()
    }

    #[test]
    fn undo_then_redo_restores_each_state() {
        let mut screen = Screen::new("root.sch");
        let wire = screen.add_item(Item::wire(p(0, 0), p(100, 0)));
        let initial = snapshot(&screen);

        screen
            .modify_item_with_undo(wire, |item| item.move_by(p(0, 50)))
            .expect("存在");
        let junction = screen.add_item_with_undo(Item::junction(p(0, 50)));
        screen.delete_item_with_undo(wire).expect("存在");
        let edited = snapshot(&screen);
        assert_eq!(screen.undo_count(), 3);

        for _ in 0..3 {
            assert!(screen.undo().expect("可撤销"));
        }
        assert_eq!(snapshot(&screen), initial);
        assert!(!screen.check_if_on_draw_list(junction));
        assert!(!screen.undo().expect("栈空"));

        for _ in 0..3 {
            assert!(screen.redo().expect("可重做"));
        }
        assert_eq!(snapshot(&screen), edited);
        assert!(screen.check_if_on_draw_list(junction));
        assert!(!screen.redo().expect("栈空"));
    }

    #[test]
    fn deleted_item_is_restored_with_same_key_and_position() {
        let mut screen = Screen::new("root.sch");
        screen.add_item(Item::wire(p(0, 0), p(10, 0)));
        let middle = screen.add_item(Item::junction(p(10, 0)));
        screen.add_item(Item::wire(p(10, 0), p(20, 0)));

        screen.delete_item_with_undo(middle).expect("存在");
        assert_eq!(screen.item_count(), 2);
        screen.undo().expect("可撤销");

        assert_eq!(screen.items().ordinal_of(middle), Some(1));
        assert_eq!(screen.item(middle).map(Item::position), Some(p(10, 0)));
    }

    #[test]
    fn push_clears_redo_and_trims_depth() {
        let settings = EditSettings {
            max_undo_depth: 2,
            hit_accuracy: 0,
        };
        let mut screen = Screen::with_settings("root.sch", &settings);
        for x in 0..3 {
            screen.add_item_with_undo(Item::junction(p(x, 0)));
        }
        assert_eq!(screen.undo_count(), 2);

        screen.undo().expect("可撤销");
        assert_eq!(screen.redo_count(), 1);
        screen.add_item_with_undo(Item::junction(p(9, 9)));
        assert_eq!(screen.redo_count(), 0);
        assert_eq!(screen.undo_count(), 2);
    }

    #[test]
    fn empty_commands_are_ignored() {
        let mut screen = Screen::new("root.sch");
        screen.push_command(UndoCommand::new("nothing"));
        assert_eq!(screen.undo_count(), 0);
    }

    #[test]
    fn clearing_undo_log_never_touches_live_items() {
        let mut screen = Screen::new("root.sch");
        let wire = screen.add_item_with_undo(Item::wire(p(0, 0), p(10, 0)));
        screen
            .modify_item_with_undo(wire, |item| item.move_by(p(1, 1)))
            .expect("存在");
        let victim = screen.add_item(Item::junction(p(5, 5)));
        screen.delete_item_with_undo(victim).expect("存在");

        assert_eq!(screen.clear_undo_or_redo_list(UndoList::Undo, Some(2)), 2);
        assert!(screen.check_if_on_draw_list(wire));
        assert_eq!(screen.clear_undo_or_redo_list(UndoList::Undo, None), 1);
        assert!(screen.check_if_on_draw_list(wire));
        assert!(!screen.items().is_detached(victim));
    }

    #[test]
    fn inconsistent_command_is_dropped() {
        let mut screen = Screen::new("root.sch");
        let wire = screen.add_item_with_undo(Item::wire(p(0, 0), p(10, 0)));
        // 绕过日志直接删除，命令失效
        assert!(screen.delete_item(wire));
        let err = screen.undo().expect_err("命令已失效");
        assert!(matches!(err, EngineError::InconsistentCommand { .. }));
        assert_eq!(screen.undo_count(), 0);
        assert_eq!(screen.redo_count(), 0);
    }

    #[test]
    fn failed_edit_rolls_back_everything() {
        let mut screen = Screen::new("root.sch");
        let label = screen.add_item(Item::label(LabelKind::Local, "N1", p(100, 0)));
        let before = snapshot(&screen);

        let result = screen.edit("rotate", |tx| {
            tx.add(Item::wire(p(0, 0), p(50, 0)));
            tx.try_modify(label, |item| item.rotate(p(0, 0), Angle(450)))
        });

        assert!(matches!(result, Err(EngineError::Item(_))));
        assert_eq!(snapshot(&screen), before);
        assert_eq!(screen.undo_count(), 0);
    }

    #[test]
    fn free_draw_list_clears_logs_first() {
        let mut screen = Screen::new("root.sch");
        let wire = screen.add_item_with_undo(Item::wire(p(0, 0), p(10, 0)));
        screen.set_cur_item(Some(wire));
        screen.free_draw_list();

        assert_eq!(screen.item_count(), 0);
        assert_eq!(screen.undo_count(), 0);
        assert_eq!(screen.cur_item(), None);
        assert!(!screen.undo().expect("栈空"));
    }

    #[test]
    fn remove_from_draw_list_hands_item_back() {
        let mut screen = Screen::new("root.sch");
        let wire = screen.add_item(Item::wire(p(0, 0), p(10, 0)));
        screen.set_cur_item(Some(wire));
        let item = screen.remove_from_draw_list(wire).expect("存在");
        assert_eq!(item.position(), p(0, 0));
        assert_eq!(screen.cur_item(), None);
        assert!(screen.remove_from_draw_list(wire).is_none());
        assert!(!screen.delete_item(wire));

        let again = screen.add_item(item);
        assert_ne!(again, wire);
    }

    #[test]
    fn extract_wires_takes_only_connectivity_items() {
        let mut screen = Screen::new("root.sch");
        screen.add_item(Item::wire(p(0, 0), p(100, 0)));
        let label = screen.add_item(Item::label(LabelKind::Local, "N1", p(100, 0)));
        screen.add_item(Item::junction(p(100, 0)));
        screen.add_item(Item::bus(p(0, 50), p(100, 50)));
        screen.add_item(Item::notes_line(p(0, 90), p(100, 90)));
        let before = snapshot(&screen);

        let saved = screen.extract_wires(true);
        assert_eq!(saved.len(), 3);
        assert_eq!(snapshot(&screen), before);

        let taken = screen.extract_wires(false);
        assert_eq!(taken, saved);
        assert_eq!(screen.item_count(), 2);
        assert!(screen.check_if_on_draw_list(label));
        assert!(screen.items().iter().all(|(_, item)| !item.is_junction()));
    }

    #[test]
    fn cleanup_with_undo_is_reversible() {
        let mut screen = Screen::new("root.sch");
        screen.add_item(Item::wire(p(0, 0), p(100, 0)));
        screen.add_item(Item::wire(p(100, 0), p(200, 0)));
        let before = snapshot(&screen);

        assert!(screen.schematic_cleanup_with_undo());
        assert_eq!(screen.item_count(), 1);
        assert!(!screen.schematic_cleanup_with_undo());
        assert_eq!(screen.undo_count(), 1);

        screen.undo().expect("可撤销");
        assert_eq!(snapshot(&screen), before);
    }

    #[test]
    fn item_at_prefers_topmost() {
        let settings = EditSettings {
            max_undo_depth: 10,
            hit_accuracy: 2,
        };
        let mut screen = Screen::with_settings("root.sch", &settings);
        screen.add_item(Item::wire(p(0, 0), p(100, 0)));
        let junction = screen.add_item(Item::junction(p(50, 0)));
        assert_eq!(screen.item_at(p(51, 1)), Some(junction));
        assert_eq!(screen.item_at(p(50, 40)), None);
    }
}
