use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;
use zsch_core::item::{Component, Drawing, Item, ItemKind, LabelKind, Line, LineKind, Sheet};
use zsch_engine::Screen;

pub mod units;

use units::{format_point, format_size};

pub const FILE_HEADER: &str = "EESchema Schematic File Version 2";
pub const FILE_TRAILER: &str = "$EndSCHEMATC";

#[derive(Debug, Error)]
pub enum IoError {
    #[error("failed to write schematic data: {0}")]
    Sink(#[from] std::io::Error),
    #[error("failed to write file {path:?}: {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid number: {0:?}")]
    InvalidNumber(String),
}

pub trait DocumentSaver {
    fn save(&self, screen: &Screen, path: &Path) -> Result<(), IoError>;
}

/// 行式 `.sch` 文本格式的写出端。
#[derive(Debug, Default, Clone, Copy)]
pub struct SchFacade;

impl SchFacade {
    pub fn new() -> Self {
        Self
    }

    /// 按绘制顺序写出整张图纸。只借用图纸，写出失败不会改变文档。
    pub fn write_screen(&self, screen: &Screen, sink: &mut impl Write) -> Result<(), IoError> {
        writeln!(sink, "{FILE_HEADER}")?;
        writeln!(sink, "$Descr")?;
        writeln!(sink, "Date {}", quoted(screen.date()))?;
        writeln!(sink, "$EndDescr")?;
        for (_, item) in screen.items().iter() {
            write_item(sink, item)?;
        }
        writeln!(sink, "{FILE_TRAILER}")?;
        Ok(())
    }
}

impl DocumentSaver for SchFacade {
    fn save(&self, screen: &Screen, path: &Path) -> Result<(), IoError> {
        // 先渲染到内存，渲染失败时不触碰目标文件
        let mut buffer = Vec::new();
        self.write_screen(screen, &mut buffer)?;
        fs::write(path, buffer).map_err(|source| IoError::WriteError {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn write_item(sink: &mut impl Write, item: &Item) -> std::io::Result<()> {
    match item.kind() {
        ItemKind::Line(line) => write_line(sink, line),
        ItemKind::Junction(junction) => {
            writeln!(sink, "Connection ~ {}", format_point(junction.position))
        }
        ItemKind::NoConnect(marker) => writeln!(sink, "NoConn ~ {}", format_point(marker.position)),
        ItemKind::Label(label) => {
            let keyword = match label.kind {
                LabelKind::Local => "Label",
                LabelKind::Global => "GLabel",
                LabelKind::Hierarchical => "HLabel",
            };
            writeln!(
                sink,
                "Text {keyword} {} {} {}",
                format_point(label.position),
                label.orientation,
                units::format_internal_units(label.size)
            )?;
            writeln!(sink, "{}", escaped(&label.text))
        }
        ItemKind::Component(component) => write_component(sink, item, component),
        ItemKind::Sheet(sheet) => write_sheet(sink, item, sheet),
        ItemKind::Drawing(drawing) => write_drawing(sink, drawing),
    }
}

fn write_line(sink: &mut impl Write, line: &Line) -> std::io::Result<()> {
    let kind = match line.kind {
        LineKind::Wire => "Wire Wire Line",
        LineKind::Bus => "Wire Bus Line",
        LineKind::Notes => "Wire Notes Line",
    };
    writeln!(sink, "{kind}")?;
    writeln!(sink, "\t{} {}", format_point(line.start), format_point(line.end))
}

fn write_component(sink: &mut impl Write, item: &Item, component: &Component) -> std::io::Result<()> {
    writeln!(sink, "$Comp")?;
    writeln!(sink, "L {} {}", component.lib_name, component.reference)?;
    writeln!(
        sink,
        "U {} {} {}",
        component.unit,
        u8::from(component.units_locked),
        item.time_stamp()
    )?;
    writeln!(sink, "P {}", format_point(component.position))?;
    for entry in &component.references {
        writeln!(
            sink,
            "AR Path={} Ref={} Part={}",
            quoted(&entry.path),
            quoted(&entry.reference),
            quoted(&entry.unit.to_string())
        )?;
    }
    if !component.value.is_empty() {
        writeln!(sink, "F 1 {}", quoted(&component.value))?;
    }
    let o = component.orientation;
    writeln!(sink, "\t{} {} {} {}", o.x1, o.y1, o.x2, o.y2)?;
    writeln!(sink, "$EndComp")
}

fn write_sheet(sink: &mut impl Write, item: &Item, sheet: &Sheet) -> std::io::Result<()> {
    writeln!(sink, "$Sheet")?;
    writeln!(sink, "S {} {}", format_point(sheet.position), format_size(sheet.size))?;
    writeln!(sink, "U {}", item.time_stamp())?;
    writeln!(sink, "F0 {}", quoted(&sheet.name))?;
    writeln!(sink, "F1 {}", quoted(&sheet.file_name))?;
    for (index, pin) in sheet.pins.iter().enumerate() {
        writeln!(
            sink,
            "F{} {} {}",
            index + 2,
            quoted(&pin.name),
            format_point(pin.position)
        )?;
    }
    writeln!(sink, "$EndSheet")
}

fn write_drawing(sink: &mut impl Write, drawing: &Drawing) -> std::io::Result<()> {
    writeln!(
        sink,
        "Drawing {} {} {}",
        drawing.shape,
        units::format_internal_units(drawing.width),
        drawing.points.len()
    )?;
    for point in &drawing.points {
        writeln!(sink, "\t{}", format_point(*point))?;
    }
    Ok(())
}

fn quoted(text: &str) -> String {
    format!("\"{}\"", escaped(text).replace('"', "\\\""))
}

/// 反斜杠与换行转义，保证一条文本只占一行。
fn escaped(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
}
