//! 内置的层次原理图示例：两张子图纸共用一份放大器图纸，另有一张电源图纸。

use serde::Serialize;
use tracing::{debug, info};
use zsch_core::draw_list::ItemKey;
use zsch_core::geometry::{Point, Rect};
use zsch_core::item::{Component, Item, Pin, ScreenId, Sheet, TimeStamp, Transformable};
use zsch_engine::block::BlockCommand;
use zsch_engine::{EditSettings, EngineError, Schematic, SheetRegistry};

const MM: i32 = 1_000_000;

/// 放大器与电源图纸里各放一个同身份的元件，模拟复制图纸文件后的身份冲突。
const COPIED_STAMP: TimeStamp = TimeStamp::new(0x5A5A_0001);

#[derive(Debug, Clone)]
pub struct DemoOptions {
    pub settings: EditSettings,
    pub cleanup_after_load: bool,
    pub clear_annotation: bool,
    pub date: String,
}

#[derive(Debug, Serialize)]
pub struct ScreenSummary {
    pub id: String,
    pub file: String,
    pub ref_count: usize,
    pub items: usize,
    pub undo: usize,
    pub redo: usize,
}

#[derive(Debug, Serialize)]
pub struct AnnotationSummary {
    pub path: String,
    pub reference: String,
}

#[derive(Debug, Serialize)]
pub struct DemoReport {
    pub date: String,
    pub screens: Vec<ScreenSummary>,
    pub sheet_paths: Vec<String>,
    pub cleaned_screens: usize,
    pub duplicate_time_stamps: Vec<String>,
    pub replaced_time_stamps: usize,
    pub junction_needed: bool,
    pub drag_picked: usize,
    pub annotations: Vec<AnnotationSummary>,
    pub annotations_cleared: usize,
}

pub struct Demo {
    pub schematic: Schematic,
    pub registry: SheetRegistry,
    pub report: DemoReport,
}

struct Layout {
    amplifier: ScreenId,
    resistor: ItemKey,
}

fn mm(x: f64, y: f64) -> Point {
    Point::new((x * f64::from(MM)).round() as i32, (y * f64::from(MM)).round() as i32)
}

pub fn run_demo(options: &DemoOptions) -> Result<Demo, EngineError> {
    let mut schematic = Schematic::with_root_file("demo.sch", options.settings);
    let layout = build_hierarchy(&mut schematic)?;
    let root = schematic.root();
    let registry = SheetRegistry::build(&schematic);
    info!(screens = registry.count(), "示例层次结构已建立");

    let cleaned_screens = if options.cleanup_after_load {
        registry.schematic_cleanup(&mut schematic)?
    } else {
        0
    };

    let duplicate_time_stamps: Vec<String> = registry
        .find_duplicate_time_stamps(&schematic)
        .iter()
        .map(ToString::to_string)
        .collect();
    let replaced_time_stamps = registry.replace_duplicate_time_stamps(&mut schematic)?;

    let junction_needed = schematic
        .screen(root)
        .is_some_and(|screen| screen.is_junction_needed(mm(15.0, 0.0)));
    if junction_needed {
        schematic.edit(root, |screen| {
            screen.add_item_with_undo(Item::junction(mm(15.0, 0.0)))
        })?;
    }

    let drag_picked = schematic.edit(layout.amplifier, |screen| {
        screen.set_block(
            Rect::new(mm(29.0, 27.5), mm(31.0, 32.5)),
            BlockCommand::Drag,
        );
        screen.update_pick_list();
        screen.select_block_items();
        let picked = screen.pick_list().len();
        screen.clear_block();
        screen.clear_drawing_state();
        picked
    })?;

    replay_edit(&mut schematic, root)?;

    let paths = schematic.sheet_paths()?;
    let sheet_paths: Vec<String> = paths.iter().map(|path| path.human_path()).collect();
    let mut annotations = Vec::new();
    schematic.edit(layout.amplifier, |screen| -> Result<(), EngineError> {
        let stamp = screen
            .item(layout.resistor)
            .map(Item::time_stamp)
            .ok_or(EngineError::ItemNotFound(layout.resistor))?;
        let instances: Vec<_> = paths
            .iter()
            .filter(|path| path.screen() == layout.amplifier)
            .collect();
        screen.modify_item_with_undo(layout.resistor, |item| {
            if let Some(component) = item.as_component_mut() {
                for (index, path) in instances.iter().enumerate() {
                    let reference = format!("R{}", index + 1);
                    component.set_reference_for(&path.component_path(stamp), &reference, 1);
                    annotations.push(AnnotationSummary {
                        path: path.human_path(),
                        reference,
                    });
                }
            }
        })
    })??;

    let annotations_cleared = if options.clear_annotation {
        registry.clear_annotation(&mut schematic)?
    } else {
        0
    };
    registry.set_date(&mut schematic, &options.date)?;

    let screens = registry
        .iter()
        .filter_map(|id| schematic.screen(id).map(|screen| (id, screen)))
        .map(|(id, screen)| ScreenSummary {
            id: id.to_string(),
            file: screen.file_name().to_string(),
            ref_count: screen.ref_count(),
            items: screen.item_count(),
            undo: screen.undo_count(),
            redo: screen.redo_count(),
        })
        .collect();
    debug!(screens = schematic.screen_count(), "示例流程结束");

    let report = DemoReport {
        date: options.date.clone(),
        screens,
        sheet_paths,
        cleaned_screens,
        duplicate_time_stamps,
        replaced_time_stamps,
        junction_needed,
        drag_picked,
        annotations,
        annotations_cleared,
    };
    Ok(Demo {
        schematic,
        registry,
        report,
    })
}

fn build_hierarchy(schematic: &mut Schematic) -> Result<Layout, EngineError> {
    let root = schematic.root();
    let amplifier = schematic.add_screen("amplifier.sch");
    let power = schematic.add_screen("power.sch");

    for (name, x) in [("amp_left", 0.0), ("amp_right", 40.0)] {
        let sheet = Sheet::new(name, "amplifier.sch", mm(x, 50.0), mm(30.0, 20.0), amplifier)
            .with_pin("IN", mm(x, 55.0));
        schematic.add_sheet(root, sheet)?;
    }
    let power_sheet = Sheet::new("power", "power.sch", mm(80.0, 50.0), mm(20.0, 20.0), power);
    schematic.add_sheet(root, power_sheet)?;

    schematic.edit(root, |screen| {
        // 共线相接的两段会合并，竖线的端点再把合并结果拆开
        screen.add_item(Item::wire(mm(0.0, 0.0), mm(10.0, 0.0)));
        screen.add_item(Item::wire(mm(10.0, 0.0), mm(20.0, 0.0)));
        screen.add_item(Item::wire(mm(15.0, 0.0), mm(15.0, 10.0)));
        screen.add_item(Item::wire(mm(40.0, 0.0), mm(40.0, 0.0)));
    })?;

    let resistor = schematic.edit(amplifier, |screen| {
        let part = Component::new("Device:R", "R", mm(30.0, 30.0))
            .with_value("10k")
            .with_body(Rect::new(mm(-1.0, -2.5), mm(1.0, 2.5)))
            .with_pin(Pin::new("1", "~", mm(0.0, -3.81)))
            .with_pin(Pin::new("2", "~", mm(0.0, 3.81)));
        let key = screen.add_item(Item::component(part).with_time_stamp(COPIED_STAMP));
        screen.add_item(Item::wire(mm(30.0, 33.81), mm(30.0, 50.0)));
        screen.add_item(Item::wire(mm(30.0, 26.19), mm(30.0, 10.0)));
        key
    })?;

    schematic.edit(power, |screen| {
        let regulator = Component::new("Regulator:LM7805", "U", mm(10.0, 10.0))
            .with_value("LM7805")
            .with_body(Rect::new(mm(-5.0, -3.0), mm(5.0, 3.0)));
        screen.add_item(Item::component(regulator).with_time_stamp(COPIED_STAMP));
    })?;

    Ok(Layout {
        amplifier,
        resistor,
    })
}

/// 移动一段导线后撤销再重做，演示撤销日志。
fn replay_edit(schematic: &mut Schematic, id: ScreenId) -> Result<(), EngineError> {
    schematic.edit(id, |screen| -> Result<(), EngineError> {
        let Some(wire) = screen
            .items()
            .iter()
            .find(|(_, item)| item.as_line().is_some())
            .map(|(key, _)| key)
        else {
            return Ok(());
        };
        screen.modify_item_with_undo(wire, |item| item.move_by(mm(0.0, -2.54)))?;
        screen.undo()?;
        screen.redo()?;
        Ok(())
    })?
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> DemoOptions {
        DemoOptions {
            settings: EditSettings::default(),
            cleanup_after_load: true,
            clear_annotation: false,
            date: "2026-10-16".to_string(),
        }
    }

    #[test]
    fn demo_exercises_the_hierarchy() {
        let demo = run_demo(&options()).expect("示例应当成功");
        let report = &demo.report;

        assert_eq!(demo.registry.count(), 3);
        assert_eq!(report.cleaned_screens, 1);
        assert_eq!(report.duplicate_time_stamps, vec![COPIED_STAMP.to_string()]);
        assert_eq!(report.replaced_time_stamps, 1);
        assert!(report.junction_needed);
        assert_eq!(report.drag_picked, 3);
        assert_eq!(
            report.sheet_paths,
            vec!["/", "/amp_left/", "/amp_right/", "/power/"]
        );
        let references: Vec<&str> = report
            .annotations
            .iter()
            .map(|entry| entry.reference.as_str())
            .collect();
        assert_eq!(references, vec!["R1", "R2"]);

        let amplifier = report
            .screens
            .iter()
            .find(|screen| screen.file == "amplifier.sch")
            .expect("放大器图纸");
        assert_eq!(amplifier.ref_count, 2);
    }

    #[test]
    fn clearing_annotation_counts_components() {
        let mut opts = options();
        opts.clear_annotation = true;
        let demo = run_demo(&opts).expect("示例应当成功");
        assert_eq!(demo.report.annotations_cleared, 2);
    }

    #[test]
    fn cleanup_can_be_skipped() {
        let mut opts = options();
        opts.cleanup_after_load = false;
        let demo = run_demo(&opts).expect("示例应当成功");
        assert_eq!(demo.report.cleaned_screens, 0);
        // 竖线端点落在未拆分的导线中间，同样需要连接点
        assert!(demo.report.junction_needed);
    }
}
