//! 层次原理图：图纸 arena、子图纸引用计数与实例路径。
//!
//! 图纸的引用计数完全由子图纸图元的加入与销毁驱动：每次通过 [`Schematic::edit`]
//! 修改图纸后结算引用增减，计数归零的图纸随即销毁，并递归释放它自己的子图纸。
//! 从列表中取出但未销毁的子图纸图元仍持有引用，重新加入时引用随图元转移。

use tracing::{debug, info, warn};
use zsch_core::draw_list::ItemKey;
use zsch_core::item::{Item, ScreenId, Sheet, TimeStamp};

use crate::EditSettings;
use crate::errors::EngineError;
use crate::screen::{Screen, SheetRef};

/// 一个层次结构内允许的最大图纸实例数。
pub const MAX_SHEETS: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
struct SheetNode {
    time_stamp: TimeStamp,
    name: String,
    screen: ScreenId,
}

/// 从根图纸到某个子图纸实例的路径。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetPath {
    root: ScreenId,
    nodes: Vec<SheetNode>,
}

impl SheetPath {
    pub fn root(screen: ScreenId) -> Self {
        Self {
            root: screen,
            nodes: Vec::new(),
        }
    }

    pub fn child(&self, time_stamp: TimeStamp, name: impl Into<String>, screen: ScreenId) -> Self {
        let mut path = self.clone();
        path.nodes.push(SheetNode {
            time_stamp,
            name: name.into(),
            screen,
        });
        path
    }

    /// 根路径深度为 0。
    #[inline]
    pub fn depth(&self) -> usize {
        self.nodes.len()
    }

    /// 路径末端对应的图纸。
    pub fn screen(&self) -> ScreenId {
        self.nodes.last().map_or(self.root, |node| node.screen)
    }

    pub fn contains_screen(&self, screen: ScreenId) -> bool {
        self.root == screen || self.nodes.iter().any(|node| node.screen == screen)
    }

    /// 形如 `/0000AAAA/0000BBBB/` 的身份路径，根路径为 `/`。
    pub fn path(&self) -> String {
        let mut out = String::from("/");
        for node in &self.nodes {
            out.push_str(&format!("{}/", node.time_stamp));
        }
        out
    }

    /// 形如 `/power/regulator/` 的名称路径。
    pub fn human_path(&self) -> String {
        let mut out = String::from("/");
        for node in &self.nodes {
            out.push_str(&node.name);
            out.push('/');
        }
        out
    }

    /// 元件在该实例下的完整路径。
    pub fn component_path(&self, time_stamp: TimeStamp) -> String {
        format!("{}{}", self.path(), time_stamp)
    }
}

#[derive(Debug)]
pub struct Schematic {
    screens: Vec<Option<Screen>>,
    root: ScreenId,
    settings: EditSettings,
    detached: Vec<SheetRef>,
}

impl Schematic {
    pub fn new(settings: EditSettings) -> Self {
        Self::with_root_file("root.sch", settings)
    }

    /// 根图纸由工程本身持有一次引用。
    pub fn with_root_file(file_name: impl Into<String>, settings: EditSettings) -> Self {
        let mut root = Screen::with_settings(file_name, &settings);
        root.acquire();
        Self {
            screens: vec![Some(root)],
            root: ScreenId::new(0),
            settings,
            detached: Vec::new(),
        }
    }

    #[inline]
    pub fn settings(&self) -> &EditSettings {
        &self.settings
    }

    #[inline]
    pub fn root(&self) -> ScreenId {
        self.root
    }

    /// 新建一张图纸，在有子图纸引用它之前引用计数为 0。
    pub fn add_screen(&mut self, file_name: impl Into<String>) -> ScreenId {
        let id = ScreenId::new(self.screens.len() as u32);
        self.screens
            .push(Some(Screen::with_settings(file_name, &self.settings)));
        id
    }

    pub fn screen(&self, id: ScreenId) -> Option<&Screen> {
        self.screens.get(id.get() as usize)?.as_ref()
    }

    #[inline]
    pub fn contains_screen(&self, id: ScreenId) -> bool {
        self.screen(id).is_some()
    }

    pub fn screen_ids(&self) -> impl Iterator<Item = ScreenId> + '_ {
        self.screens
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(index, _)| ScreenId::new(index as u32))
    }

    pub fn screen_count(&self) -> usize {
        self.screens.iter().flatten().count()
    }

    /// 图纸的唯一可变访问入口。闭包返回后结算子图纸引用的增减。
    pub fn edit<R>(
        &mut self,
        id: ScreenId,
        f: impl FnOnce(&mut Screen) -> R,
    ) -> Result<R, EngineError> {
        let screen = self
            .screens
            .get_mut(id.get() as usize)
            .and_then(Option::as_mut)
            .ok_or(EngineError::ScreenNotFound(id))?;
        let result = f(screen);
        self.settle_sheet_references();
        Ok(result)
    }

    /// 在 `parent` 上放置引用 `sheet.screen()` 的子图纸。
    pub fn add_sheet(&mut self, parent: ScreenId, sheet: Sheet) -> Result<ItemKey, EngineError> {
        self.add_sheet_item(parent, Item::sheet(sheet))
    }

    pub fn add_sheet_item(&mut self, parent: ScreenId, item: Item) -> Result<ItemKey, EngineError> {
        if let Some(target) = item.sub_screen() {
            if !self.contains_screen(target) {
                return Err(EngineError::ScreenNotFound(target));
            }
        }
        self.edit(parent, |screen| screen.add_item(item))
    }

    /// 销毁一个由 [`Screen::remove_from_draw_list`] 取出的图元，释放它持有的子图纸引用。
    pub fn drop_item(&mut self, item: Item) {
        if let Some(sheet_ref) = SheetRef::of(&item) {
            if let Some(index) = self.detached.iter().position(|held| *held == sheet_ref) {
                self.detached.swap_remove(index);
                self.release_screens(vec![sheet_ref.screen]);
            }
        }
    }

    /// 已取出但尚未重新加入或销毁的子图纸图元数。
    #[inline]
    pub fn detached_sheet_count(&self) -> usize {
        self.detached.len()
    }

    /// 深度优先列出每一个图纸实例路径（根在前）。递归引用被跳过。
    pub fn sheet_paths(&self) -> Result<Vec<SheetPath>, EngineError> {
        let mut paths = Vec::new();
        self.collect_paths(SheetPath::root(self.root), &mut paths)?;
        Ok(paths)
    }

    fn collect_paths(&self, path: SheetPath, out: &mut Vec<SheetPath>) -> Result<(), EngineError> {
        if out.len() >= MAX_SHEETS {
            return Err(EngineError::TooManySheets { limit: MAX_SHEETS });
        }
        let current = path.screen();
        out.push(path.clone());
        let Some(screen) = self.screen(current) else {
            return Ok(());
        };
        for (_, item) in screen.items().iter() {
            let Some(sheet) = item.as_sheet() else {
                continue;
            };
            if path.contains_screen(sheet.screen()) {
                warn!(sheet = %sheet.name, "子图纸递归引用自身所在的层次，已跳过");
                continue;
            }
            let child = path.child(item.time_stamp(), sheet.name.clone(), sheet.screen());
            self.collect_paths(child, out)?;
        }
        Ok(())
    }

    fn settle_sheet_references(&mut self) {
        let mut acquired = Vec::new();
        let mut released = Vec::new();
        for screen in self.screens.iter_mut().flatten() {
            let changes = screen.take_sheet_ref_changes();
            acquired.extend(changes.acquired);
            self.detached.extend(changes.detached);
            released.extend(changes.released);
        }

        // 先结算新增引用，图元在图纸之间移动时目标图纸不会被误销毁
        for sheet_ref in acquired {
            if let Some(index) = self.detached.iter().position(|held| *held == sheet_ref) {
                // 取出的图元被重新加入，引用一直由它持有
                self.detached.swap_remove(index);
                continue;
            }
            let id = sheet_ref.screen;
            match self.screens.get_mut(id.get() as usize).and_then(Option::as_mut) {
                Some(screen) => screen.acquire(),
                None => warn!(%id, "子图纸引用了不存在的图纸"),
            }
        }

        self.release_screens(released);
    }

    fn release_screens(&mut self, mut released: Vec<ScreenId>) {
        while let Some(id) = released.pop() {
            let index = id.get() as usize;
            let Some(screen) = self.screens.get_mut(index).and_then(Option::as_mut) else {
                continue;
            };
            let remaining = screen.release();
            debug!(%id, remaining, "子图纸引用释放");
            if remaining > 0 || id == self.root {
                continue;
            }
            if let Some(mut screen) = self.screens[index].take() {
                info!(%id, file = screen.file_name(), "图纸不再被引用，已销毁");
                screen.free_draw_list();
                released.extend(screen.take_sheet_ref_changes().released);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zsch_core::geometry::Point;

    fn sheet(name: &str, screen: ScreenId) -> Sheet {
        Sheet::new(name, format!("{name}.sch"), Point::new(0, 0), Point::new(1_000, 1_000), screen)
    }

    #[test]
    fn ref_counts_follow_sheet_items() {
        let mut schematic = Schematic::new(EditSettings::default());
        let root = schematic.root();
        let shared = schematic.add_screen("shared.sch");
        assert_eq!(schematic.screen(root).map(Screen::ref_count), Some(1));
        assert_eq!(schematic.screen(shared).map(Screen::ref_count), Some(0));

        let first = schematic.add_sheet(root, sheet("a", shared)).expect("根图纸存在");
        let second = schematic.add_sheet(root, sheet("b", shared)).expect("根图纸存在");
        assert_eq!(schematic.screen(shared).map(Screen::ref_count), Some(2));

        schematic
            .edit(root, |screen| screen.delete_item(first))
            .expect("根图纸存在");
        assert_eq!(schematic.screen(shared).map(Screen::ref_count), Some(1));

        schematic
            .edit(root, |screen| screen.delete_item(second))
            .expect("根图纸存在");
        assert!(!schematic.contains_screen(shared));
        assert_eq!(schematic.screen_count(), 1);
    }

    #[test]
    fn undo_log_keeps_deleted_sheet_alive() {
        let mut schematic = Schematic::new(EditSettings::default());
        let root = schematic.root();
        let child = schematic.add_screen("child.sch");
        let key = schematic.add_sheet(root, sheet("child", child)).expect("根图纸存在");

        schematic
            .edit(root, |screen| screen.delete_item_with_undo(key))
            .expect("根图纸存在")
            .expect("子图纸存在");
        assert!(schematic.contains_screen(child));

        schematic
            .edit(root, |screen| screen.free_draw_list())
            .expect("根图纸存在");
        assert!(!schematic.contains_screen(child));
    }

    #[test]
    fn detached_sheet_moves_between_screens() {
        let mut schematic = Schematic::new(EditSettings::default());
        let root = schematic.root();
        let child = schematic.add_screen("child.sch");
        let target = schematic.add_screen("target.sch");
        schematic.add_sheet(root, sheet("target", target)).expect("存在");
        let key = schematic.add_sheet(root, sheet("child", child)).expect("存在");

        let item = schematic
            .edit(root, |screen| screen.remove_from_draw_list(key))
            .expect("根图纸存在")
            .expect("图元存在");
        assert!(schematic.contains_screen(child));
        assert_eq!(schematic.screen(child).map(Screen::ref_count), Some(1));
        assert_eq!(schematic.detached_sheet_count(), 1);

        schematic
            .edit(target, |screen| screen.add_item(item))
            .expect("目标图纸存在");
        assert_eq!(schematic.screen(child).map(Screen::ref_count), Some(1));
        assert_eq!(schematic.detached_sheet_count(), 0);
        let moved = schematic
            .screen(target)
            .and_then(|screen| screen.items().iter().find_map(|(_, item)| item.sub_screen()));
        assert_eq!(moved, Some(child));
        assert!(schematic.contains_screen(child));
    }

    #[test]
    fn dropping_a_detached_sheet_releases_its_screen() {
        let mut schematic = Schematic::new(EditSettings::default());
        let root = schematic.root();
        let child = schematic.add_screen("child.sch");
        let key = schematic.add_sheet(root, sheet("child", child)).expect("存在");

        let item = schematic
            .edit(root, |screen| screen.remove_from_draw_list(key))
            .expect("根图纸存在")
            .expect("图元存在");
        assert!(schematic.contains_screen(child));

        schematic.drop_item(item);
        assert!(!schematic.contains_screen(child));
        assert_eq!(schematic.detached_sheet_count(), 0);
    }

    #[test]
    fn destroying_a_screen_releases_nested_sheets() {
        let mut schematic = Schematic::new(EditSettings::default());
        let root = schematic.root();
        let middle = schematic.add_screen("middle.sch");
        let leaf = schematic.add_screen("leaf.sch");
        let key = schematic.add_sheet(root, sheet("middle", middle)).expect("存在");
        schematic.add_sheet(middle, sheet("leaf", leaf)).expect("存在");

        schematic
            .edit(root, |screen| screen.delete_item(key))
            .expect("存在");
        assert!(!schematic.contains_screen(middle));
        assert!(!schematic.contains_screen(leaf));
    }

    #[test]
    fn sheet_paths_enumerate_every_instance() {
        let mut schematic = Schematic::new(EditSettings::default());
        let root = schematic.root();
        let shared = schematic.add_screen("shared.sch");
        schematic
            .add_sheet_item(root, Item::sheet(sheet("left", shared)).with_time_stamp(TimeStamp::new(0xA)))
            .expect("存在");
        schematic
            .add_sheet_item(root, Item::sheet(sheet("right", shared)).with_time_stamp(TimeStamp::new(0xB)))
            .expect("存在");

        let paths = schematic.sheet_paths().expect("未超限");
        let rendered: Vec<_> = paths.iter().map(SheetPath::path).collect();
        assert_eq!(rendered, vec!["/", "/0000000A/", "/0000000B/"]);
        assert_eq!(paths[2].human_path(), "/right/");
        assert_eq!(paths[1].screen(), shared);
        assert_eq!(
            paths[1].component_path(TimeStamp::new(0x1F)),
            "/0000000A/0000001F"
        );
    }

    #[test]
    fn recursive_sheet_is_skipped() {
        let mut schematic = Schematic::new(EditSettings::default());
        let root = schematic.root();
        let child = schematic.add_screen("child.sch");
        schematic.add_sheet(root, sheet("child", child)).expect("存在");
        schematic.add_sheet(child, sheet("loop", root)).expect("存在");

        let paths = schematic.sheet_paths().expect("未超限");
        assert_eq!(paths.len(), 2);
    }

    #[test]
    fn too_many_sheets_is_an_error() {
        let mut schematic = Schematic::new(EditSettings::default());
        let root = schematic.root();
        let leaf = schematic.add_screen("leaf.sch");
        for i in 0..MAX_SHEETS {
            schematic
                .add_sheet(root, sheet(&format!("s{i}"), leaf))
                .expect("存在");
        }
        let err = schematic.sheet_paths().expect_err("超过上限");
        assert!(matches!(err, EngineError::TooManySheets { limit: MAX_SHEETS }));
    }

    #[test]
    fn sheets_to_missing_screens_are_rejected() {
        let mut schematic = Schematic::new(EditSettings::default());
        let root = schematic.root();
        let err = schematic
            .add_sheet(root, sheet("ghost", ScreenId::new(42)))
            .expect_err("目标不存在");
        assert!(matches!(err, EngineError::ScreenNotFound(_)));
        assert!(schematic.edit(ScreenId::new(42), |_| ()).is_err());
    }
}
