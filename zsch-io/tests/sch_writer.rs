use std::fs;

use zsch_core::geometry::Point;
use zsch_core::item::{Component, Item, LabelKind, Pin, ScreenId, Sheet, TimeStamp};
use zsch_engine::Screen;
use zsch_io::{DocumentSaver, FILE_HEADER, FILE_TRAILER, IoError, SchFacade};

fn mm(value: i32) -> i32 {
    value * 1_000_000
}

fn sample_screen() -> Screen {
    let mut screen = Screen::new("amp.sch");
    screen.set_date("2026-10-16");
    screen.add_item(Item::wire(Point::new(0, 0), Point::new(mm(10), 0)));
    screen.add_item(Item::junction(Point::new(mm(10), 0)));
    screen.add_item(Item::label(LabelKind::Global, "VCC", Point::new(mm(10), mm(-1))));
    let mut part = Component::new("Device:R", "R", Point::new(mm(20), mm(5)))
        .with_value("10k")
        .with_pin(Pin::new("1", "~", Point::new(0, mm(-2))));
    part.reference = "R1".into();
    part.set_reference_for("/0000ABCD", "R1", 1);
    screen.add_item(Item::component(part).with_time_stamp(TimeStamp::new(0xABCD)));
    let sheet = Sheet::new(
        "power",
        "power.sch",
        Point::new(mm(50), mm(50)),
        Point::new(mm(20), mm(10)),
        ScreenId::new(1),
    )
    .with_pin("VIN", Point::new(mm(50), mm(55)));
    screen.add_item(Item::sheet(sheet).with_time_stamp(TimeStamp::new(0x1)));
    screen
}

#[test]
fn writes_items_in_draw_order() {
    let screen = sample_screen();
    let mut out = Vec::new();
    SchFacade::new()
        .write_screen(&screen, &mut out)
        .expect("写入内存成功");
    let text = String::from_utf8(out).expect("UTF-8");
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines.first().copied(), Some(FILE_HEADER));
    assert_eq!(lines.last().copied(), Some(FILE_TRAILER));
    assert!(lines.contains(&"Date \"2026-10-16\""));
    assert!(lines.contains(&"\t0 0 10 0"));
    assert!(lines.contains(&"Connection ~ 10 0"));
    assert!(lines.contains(&"Text GLabel 10 -1 0 1.27"));
    assert!(lines.contains(&"U 1 0 0000ABCD"));
    assert!(lines.contains(&"AR Path=\"/0000ABCD\" Ref=\"R1\" Part=\"1\""));
    assert!(lines.contains(&"S 50 50 20 10"));
    assert!(lines.contains(&"F2 \"VIN\" 50 55"));

    let order: Vec<usize> = ["Wire Wire Line", "Connection ~", "Text GLabel", "$Comp", "$Sheet"]
        .iter()
        .map(|needle| text.find(needle).expect("应当写出"))
        .collect();
    let mut sorted = order.clone();
    sorted.sort_unstable();
    assert_eq!(order, sorted);
}

#[test]
fn output_is_deterministic() {
    let screen = sample_screen();
    let facade = SchFacade::new();
    let mut first = Vec::new();
    let mut second = Vec::new();
    facade.write_screen(&screen, &mut first).expect("写入成功");
    facade.write_screen(&screen, &mut second).expect("写入成功");
    assert_eq!(first, second);
}

#[test]
fn save_writes_file() {
    let dir = tempfile::tempdir().expect("创建临时目录");
    let path = dir.path().join("amp.sch");
    let screen = sample_screen();

    SchFacade::new().save(&screen, &path).expect("保存成功");
    let content = fs::read_to_string(&path).expect("读取保存结果");
    assert!(content.starts_with(FILE_HEADER));
    assert!(content.trim_end().ends_with(FILE_TRAILER));
}

#[test]
fn failed_save_reports_path_and_keeps_screen() {
    let dir = tempfile::tempdir().expect("创建临时目录");
    let path = dir.path().join("missing").join("amp.sch");
    let screen = sample_screen();
    let before: Vec<Item> = screen.items().iter().map(|(_, item)| item.clone()).collect();

    let err = SchFacade::new()
        .save(&screen, &path)
        .expect_err("目录不存在时应失败");
    match err {
        IoError::WriteError { path: reported, .. } => assert_eq!(reported, path),
        other => panic!("unexpected error: {other}"),
    }
    let after: Vec<Item> = screen.items().iter().map(|(_, item)| item.clone()).collect();
    assert_eq!(after, before);
    assert!(!path.exists());
}

#[test]
fn multiline_label_keeps_record_layout() {
    let mut screen = Screen::new("labels.sch");
    screen.add_item(Item::label(LabelKind::Local, "IN\nOUT", Point::new(0, 0)));
    screen.add_item(Item::junction(Point::new(0, 0)));
    let mut out = Vec::new();
    SchFacade::new()
        .write_screen(&screen, &mut out)
        .expect("写入内存成功");
    let text = String::from_utf8(out).expect("UTF-8");
    let lines: Vec<&str> = text.lines().collect();

    let label = lines
        .iter()
        .position(|line| line.starts_with("Text Label"))
        .expect("标签记录");
    assert_eq!(lines[label + 1], "IN\\nOUT");
    assert_eq!(lines[label + 2], "Connection ~ 0 0");
}
