//! 图纸注册表：从根图纸出发发现的去重图纸列表，以及作用于全部图纸的批量操作。

use std::collections::HashSet;

use tracing::{debug, info};
use zsch_core::item::{ScreenId, TimeStamp};

use crate::errors::EngineError;
use crate::hierarchy::Schematic;

#[derive(Debug, Clone, Default)]
pub struct SheetRegistry {
    screens: Vec<ScreenId>,
    cursor: usize,
}

impl SheetRegistry {
    /// 深度优先（先序）遍历层次结构，每张图纸只登记一次。
    pub fn build(schematic: &Schematic) -> Self {
        let mut registry = Self::default();
        let mut stack = vec![schematic.root()];
        while let Some(id) = stack.pop() {
            let Some(screen) = schematic.screen(id) else {
                continue;
            };
            if !registry.add_screen(id) {
                continue;
            }
            let children: Vec<ScreenId> = screen
                .items()
                .iter()
                .filter_map(|(_, item)| item.sub_screen())
                .collect();
            stack.extend(children.into_iter().rev());
        }
        debug!(count = registry.screens.len(), "图纸注册表已建立");
        registry
    }

    fn add_screen(&mut self, id: ScreenId) -> bool {
        if self.screens.contains(&id) {
            return false;
        }
        self.screens.push(id);
        true
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.screens.len()
    }

    pub fn get_screen(&self, index: usize) -> Option<ScreenId> {
        self.screens.get(index).copied()
    }

    pub fn first_screen(&mut self) -> Option<ScreenId> {
        self.cursor = 0;
        self.screens.first().copied()
    }

    /// 移动游标到下一张图纸；越过末尾后一直返回 `None`。
    pub fn next_screen(&mut self) -> Option<ScreenId> {
        if self.cursor < self.screens.len() {
            self.cursor += 1;
        }
        self.screens.get(self.cursor).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = ScreenId> + '_ {
        self.screens.iter().copied()
    }

    /// 列出在层次图元（元件、子图纸）中出现多次的身份，不做修改。
    pub fn find_duplicate_time_stamps(&self, schematic: &Schematic) -> Vec<TimeStamp> {
        let mut seen = HashSet::new();
        let mut duplicates = Vec::new();
        for screen in self.iter().filter_map(|id| schematic.screen(id)) {
            for (_, item) in screen.items().iter() {
                if !item.is_hierarchical() {
                    continue;
                }
                let stamp = item.time_stamp();
                if !seen.insert(stamp) && !duplicates.contains(&stamp) {
                    duplicates.push(stamp);
                }
            }
        }
        duplicates
    }

    /// 按遍历顺序保留每个身份的首次出现，其余分配全层次唯一的新身份。返回替换数。
    pub fn replace_duplicate_time_stamps(
        &self,
        schematic: &mut Schematic,
    ) -> Result<usize, EngineError> {
        let mut in_use: HashSet<TimeStamp> = self
            .iter()
            .filter_map(|id| schematic.screen(id))
            .flat_map(|screen| screen.items().iter().map(|(_, item)| item.time_stamp()))
            .collect();
        let mut seen = HashSet::new();
        let mut replaced = 0;
        for id in self.iter() {
            replaced += schematic.edit(id, |screen| {
                screen.replace_duplicate_time_stamps(&mut seen, &mut in_use)
            })?;
        }
        if replaced > 0 {
            info!(replaced, "已修复重复的时间戳");
        }
        Ok(replaced)
    }

    /// 清除全部图纸上的元件位号。返回处理的元件数。
    pub fn clear_annotation(&self, schematic: &mut Schematic) -> Result<usize, EngineError> {
        let mut cleared = 0;
        for id in self.iter() {
            cleared += schematic.edit(id, |screen| screen.clear_annotation(None))?;
        }
        Ok(cleared)
    }

    pub fn set_date(&self, schematic: &mut Schematic, date: &str) -> Result<(), EngineError> {
        for id in self.iter() {
            schematic.edit(id, |screen| screen.set_date(date))?;
        }
        Ok(())
    }

    /// 对全部图纸做连接性清理，返回有改动的图纸数。
    pub fn schematic_cleanup(&self, schematic: &mut Schematic) -> Result<usize, EngineError> {
        let mut modified = 0;
        for id in self.iter() {
            if schematic.edit(id, |screen| screen.schematic_cleanup())? {
                modified += 1;
            }
        }
        Ok(modified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EditSettings;
    use zsch_core::geometry::Point;
    use zsch_core::item::{Component, Item, Sheet};

    fn sheet(name: &str, screen: ScreenId) -> Sheet {
        Sheet::new(name, format!("{name}.sch"), Point::new(0, 0), Point::new(100, 100), screen)
    }

    #[test]
    fn shared_screen_is_listed_once() {
        let mut schematic = Schematic::new(EditSettings::default());
        let root = schematic.root();
        let shared = schematic.add_screen("shared.sch");
        let other = schematic.add_screen("other.sch");
        schematic.add_sheet(root, sheet("a", shared)).expect("存在");
        schematic.add_sheet(root, sheet("b", other)).expect("存在");
        schematic.add_sheet(root, sheet("c", shared)).expect("存在");

        let mut registry = SheetRegistry::build(&schematic);
        assert_eq!(registry.count(), 3);
        assert_eq!(registry.first_screen(), Some(root));
        assert_eq!(registry.next_screen(), Some(shared));
        assert_eq!(registry.next_screen(), Some(other));
        assert_eq!(registry.next_screen(), None);
        assert_eq!(registry.next_screen(), None);
        assert_eq!(registry.get_screen(1), Some(shared));
        assert_eq!(registry.get_screen(3), None);
    }

    fn resistor_with(stamp: TimeStamp) -> Item {
        Item::component(Component::new("Device:R", "R", Point::new(0, 0))).with_time_stamp(stamp)
    }

    #[test]
    fn duplicate_stamps_are_replaced_once() {
        let mut schematic = Schematic::new(EditSettings::default());
        let root = schematic.root();
        let child = schematic.add_screen("child.sch");
        schematic.add_sheet(root, sheet("child", child)).expect("存在");
        let stamp = TimeStamp::new(0x1234);
        let first = schematic
            .edit(root, |screen| screen.add_item(resistor_with(stamp)))
            .expect("存在");
        let second = schematic
            .edit(child, |screen| screen.add_item(resistor_with(stamp)))
            .expect("存在");

        let registry = SheetRegistry::build(&schematic);
        assert_eq!(registry.find_duplicate_time_stamps(&schematic), vec![stamp]);
        assert_eq!(
            registry
                .replace_duplicate_time_stamps(&mut schematic)
                .expect("修复成功"),
            1
        );

        let kept = schematic.screen(root).and_then(|s| s.item(first)).map(Item::time_stamp);
        let renamed = schematic.screen(child).and_then(|s| s.item(second)).map(Item::time_stamp);
        assert_eq!(kept, Some(stamp));
        assert!(renamed.is_some_and(|ts| ts != stamp));
        assert!(registry.find_duplicate_time_stamps(&schematic).is_empty());
        assert_eq!(
            registry
                .replace_duplicate_time_stamps(&mut schematic)
                .expect("修复成功"),
            0
        );
    }

    #[test]
    fn shared_screen_is_not_a_duplicate_source() {
        let mut schematic = Schematic::new(EditSettings::default());
        let root = schematic.root();
        let shared = schematic.add_screen("shared.sch");
        schematic.add_sheet(root, sheet("a", shared)).expect("存在");
        schematic.add_sheet(root, sheet("b", shared)).expect("存在");
        schematic
            .edit(shared, |screen| screen.add_item(resistor_with(TimeStamp::new(7))))
            .expect("存在");

        let registry = SheetRegistry::build(&schematic);
        assert!(registry.find_duplicate_time_stamps(&schematic).is_empty());
        assert_eq!(
            registry
                .replace_duplicate_time_stamps(&mut schematic)
                .expect("修复成功"),
            0
        );
    }

    #[test]
    fn batch_operations_touch_every_screen() {
        let mut schematic = Schematic::new(EditSettings::default());
        let root = schematic.root();
        let child = schematic.add_screen("child.sch");
        schematic.add_sheet(root, sheet("child", child)).expect("存在");
        schematic
            .edit(child, |screen| {
                screen.add_item(Item::wire(Point::new(0, 0), Point::new(10, 0)));
                screen.add_item(Item::wire(Point::new(10, 0), Point::new(20, 0)));
                let mut part = Component::new("Device:C", "C", Point::new(50, 50));
                part.reference = "C4".into();
                screen.add_item(Item::component(part));
            })
            .expect("存在");

        let registry = SheetRegistry::build(&schematic);
        assert_eq!(registry.schematic_cleanup(&mut schematic).expect("成功"), 1);
        assert_eq!(registry.clear_annotation(&mut schematic).expect("成功"), 1);
        registry.set_date(&mut schematic, "2026-10-16").expect("成功");

        let child_screen = schematic.screen(child).expect("存在");
        assert_eq!(child_screen.item_count(), 2);
        assert_eq!(child_screen.date(), "2026-10-16");
        assert_eq!(schematic.screen(root).map(|s| s.date()), Some("2026-10-16"));
        let reference = child_screen
            .items()
            .iter()
            .find_map(|(_, item)| item.as_component().map(|c| c.reference.clone()));
        assert_eq!(reference.as_deref(), Some("C?"));
    }
}
