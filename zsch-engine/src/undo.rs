//! 撤销/重做命令与命令栈。

use std::collections::VecDeque;

use zsch_core::draw_list::{Change, DrawList, ItemKey};
use zsch_core::item::Item;

use crate::errors::EngineError;
use crate::screen::SheetRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndoList {
    Undo,
    Redo,
}

impl UndoList {
    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            UndoList::Undo => UndoList::Redo,
            UndoList::Redo => UndoList::Undo,
        }
    }
}

/// 一条可撤销的命令：描述与按发生顺序排列的变更。
#[derive(Debug, Clone, PartialEq)]
pub struct UndoCommand {
    description: String,
    changes: Vec<Change>,
}

impl UndoCommand {
    pub fn new(description: impl Into<String>) -> Self {
        Self::from_changes(description, Vec::new())
    }

    pub fn from_changes(description: impl Into<String>, changes: Vec<Change>) -> Self {
        Self {
            description: description.into(),
            changes,
        }
    }

    pub fn push(&mut self, change: Change) {
        self.changes.push(change);
    }

    #[inline]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[inline]
    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn into_parts(self) -> (String, Vec<Change>) {
        (self.description, self.changes)
    }
}

/// 单方向的命令栈，最旧的命令在队首。
#[derive(Debug, Default)]
pub struct CommandStack {
    commands: VecDeque<UndoCommand>,
}

impl CommandStack {
    #[inline]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn push(&mut self, command: UndoCommand) {
        self.commands.push_back(command);
    }

    pub fn pop(&mut self) -> Option<UndoCommand> {
        self.commands.pop_back()
    }

    pub fn last(&self) -> Option<&UndoCommand> {
        self.commands.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &UndoCommand> {
        self.commands.iter()
    }

    /// 取出最旧的 `count` 条命令；`None` 取出全部。
    pub fn drain_oldest(&mut self, count: Option<usize>) -> Vec<UndoCommand> {
        let count = count.unwrap_or(self.commands.len()).min(self.commands.len());
        self.commands.drain(..count).collect()
    }
}

/// 记录撤销信息的编辑事务。闭包失败时由 [`crate::Screen::edit`] 整体回滚。
pub struct EditTransaction<'a> {
    items: &'a mut DrawList,
    changes: Vec<Change>,
    acquired: Vec<SheetRef>,
}

impl<'a> EditTransaction<'a> {
    pub(crate) fn new(items: &'a mut DrawList) -> Self {
        Self {
            items,
            changes: Vec::new(),
            acquired: Vec::new(),
        }
    }

    pub fn get(&self, key: ItemKey) -> Option<&Item> {
        self.items.get(key)
    }

    pub fn add(&mut self, item: Item) -> ItemKey {
        self.acquired.extend(SheetRef::of(&item));
        let key = self.items.append(item);
        self.changes.push(Change::Created { key });
        key
    }

    pub fn insert(&mut self, ordinal: usize, item: Item) -> Result<ItemKey, EngineError> {
        let sheet_ref = SheetRef::of(&item);
        let key = self.items.insert(ordinal, item)?;
        self.acquired.extend(sheet_ref);
        self.changes.push(Change::Created { key });
        Ok(key)
    }

    pub fn delete(&mut self, key: ItemKey) -> Result<(), EngineError> {
        let detached = self.items.detach(key).ok_or(EngineError::ItemNotFound(key))?;
        self.changes.push(Change::Deleted {
            key,
            ordinal: detached.ordinal,
            item: Box::new(detached.item),
        });
        Ok(())
    }

    pub fn modify<R>(
        &mut self,
        key: ItemKey,
        f: impl FnOnce(&mut Item) -> R,
    ) -> Result<R, EngineError> {
        let live = self.items.get_mut(key).ok_or(EngineError::ItemNotFound(key))?;
        let snapshot = Box::new(live.clone());
        let result = f(live);
        self.changes.push(Change::Modified { key, snapshot });
        Ok(result)
    }

    /// 修改可能失败时使用；失败则恢复原状且不记录。
    pub fn try_modify<R, E>(
        &mut self,
        key: ItemKey,
        f: impl FnOnce(&mut Item) -> Result<R, E>,
    ) -> Result<R, EngineError>
    where
        EngineError: From<E>,
    {
        let live = self.items.get_mut(key).ok_or(EngineError::ItemNotFound(key))?;
        let snapshot = live.clone();
        match f(live) {
            Ok(result) => {
                self.changes.push(Change::Modified {
                    key,
                    snapshot: Box::new(snapshot),
                });
                Ok(result)
            }
            Err(err) => {
                *live = snapshot;
                Err(err.into())
            }
        }
    }

    /// 追加已发生的变更（例如连接性清理的结果）。
    pub fn record(&mut self, changes: impl IntoIterator<Item = Change>) {
        self.changes.extend(changes);
    }

    pub(crate) fn commit(self) -> (Vec<Change>, Vec<SheetRef>) {
        (self.changes, self.acquired)
    }

    /// 逆序回退全部变更；新建图元随之销毁。
    pub(crate) fn rollback(self) {
        for change in self.changes.into_iter().rev() {
            if let Ok(Change::Deleted { key, .. }) = self.items.apply_change(change) {
                self.items.release(key);
            }
        }
    }
}
