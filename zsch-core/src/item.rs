//! 原理图图元：身份、图层、临时状态标志以及封闭的图元种类集合。

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::{self, Angle, Point, Rect};

/// 图元层面的错误。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ItemError {
    #[error("layer index {0} is out of range")]
    InvalidLayer(u8),
    #[error("{kind} items do not support {operation}")]
    Unsupported {
        operation: &'static str,
        kind: &'static str,
    },
}

static LAST_TIME_STAMP: AtomicU32 = AtomicU32::new(0);

/// 图元身份。以 Unix 秒为种子，进程内严格递增。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TimeStamp(u32);

impl TimeStamp {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub fn get(self) -> u32 {
        self.0
    }

    /// 生成一个新的身份，保证不小于当前时间且大于此前发出的任何值。
    pub fn fresh() -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs() as u32)
            .unwrap_or(0);
        let mut last = LAST_TIME_STAMP.load(Ordering::Relaxed);
        loop {
            let next = now.max(last.wrapping_add(1));
            match LAST_TIME_STAMP.compare_exchange_weak(
                last,
                next,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Self(next),
                Err(current) => last = current,
            }
        }
    }
}

impl fmt::Display for TimeStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08X}", self.0)
    }
}

/// 子图纸所引用文档在层次结构中的编号。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ScreenId(u32);

impl ScreenId {
    #[inline]
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ScreenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "screen#{}", self.0)
    }
}

pub const LAYER_COUNT: u8 = 16;

/// 图层编号。通过 [`Layer::new`] 构造的值总在合法范围内。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Layer(u8);

impl Layer {
    pub const WIRE: Layer = Layer(0);
    pub const BUS: Layer = Layer(1);
    pub const JUNCTION: Layer = Layer(2);
    pub const LOCAL_LABEL: Layer = Layer(3);
    pub const GLOBAL_LABEL: Layer = Layer(4);
    pub const HIER_LABEL: Layer = Layer(5);
    pub const PIN: Layer = Layer(6);
    pub const FIELDS: Layer = Layer(7);
    pub const DEVICE: Layer = Layer(8);
    pub const DEVICE_BACKGROUND: Layer = Layer(9);
    pub const NOTES: Layer = Layer(10);
    pub const NO_CONNECT: Layer = Layer(11);
    pub const SHEET: Layer = Layer(12);
    pub const SHEET_LABEL: Layer = Layer(13);
    pub const SHEET_NAME: Layer = Layer(14);
    pub const ERC: Layer = Layer(15);

    pub fn new(raw: u8) -> Result<Self, ItemError> {
        if raw < LAYER_COUNT {
            Ok(Self(raw))
        } else {
            Err(ItemError::InvalidLayer(raw))
        }
    }

    #[inline]
    pub fn get(self) -> u8 {
        self.0
    }

    pub fn name(self) -> &'static str {
        match self.0 {
            0 => "wire",
            1 => "bus",
            2 => "junction",
            3 => "local-label",
            4 => "global-label",
            5 => "hier-label",
            6 => "pin",
            7 => "fields",
            8 => "device",
            9 => "device-background",
            10 => "notes",
            11 => "no-connect",
            12 => "sheet",
            13 => "sheet-label",
            14 => "sheet-name",
            _ => "erc",
        }
    }
}

impl TryFrom<u8> for Layer {
    type Error = ItemError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Layer> for u8 {
    fn from(value: Layer) -> Self {
        value.0
    }
}

/// 编辑过程中的临时状态位。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemFlags(u32);

impl ItemFlags {
    pub const NONE: ItemFlags = ItemFlags(0);
    pub const SELECTED: ItemFlags = ItemFlags(1 << 0);
    pub const IS_DRAGGED: ItemFlags = ItemFlags(1 << 1);
    pub const IS_MOVED: ItemFlags = ItemFlags(1 << 2);
    pub const MOVE_START: ItemFlags = ItemFlags(1 << 3);
    pub const MOVE_END: ItemFlags = ItemFlags(1 << 4);
    pub const SKIP_STRUCT: ItemFlags = ItemFlags(1 << 5);

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn union(self, other: ItemFlags) -> ItemFlags {
        ItemFlags(self.0 | other.0)
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn contains(self, other: ItemFlags) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub fn intersects(self, other: ItemFlags) -> bool {
        self.0 & other.0 != 0
    }

    #[inline]
    pub fn insert(&mut self, other: ItemFlags) {
        self.0 |= other.0;
    }

    #[inline]
    pub fn remove(&mut self, other: ItemFlags) {
        self.0 &= !other.0;
    }
}

impl std::ops::BitOr for ItemFlags {
    type Output = ItemFlags;

    fn bitor(self, rhs: ItemFlags) -> ItemFlags {
        ItemFlags(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for ItemFlags {
    fn bitor_assign(&mut self, rhs: ItemFlags) {
        self.0 |= rhs.0;
    }
}

/// 渲染层使用的笔画形状分类。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrokeShape {
    Segment,
    Rect,
    Arc,
    Circle,
    Polygon,
    Curve,
}

impl fmt::Display for StrokeShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StrokeShape::Segment => "Line",
            StrokeShape::Rect => "Rect",
            StrokeShape::Arc => "Arc",
            StrokeShape::Circle => "Circle",
            StrokeShape::Polygon => "Polygon",
            StrokeShape::Curve => "Curve",
        };
        f.write_str(name)
    }
}

/// 几何变换能力。
pub trait Transformable {
    fn move_by(&mut self, delta: Point);
    fn rotate(&mut self, center: Point, angle: Angle) -> Result<(), ItemError>;
    /// 关于经过 `center` 的水平轴镜像。
    fn flip(&mut self, center: Point) -> Result<(), ItemError>;
}

/// 命中测试能力。矩形测试没有通用实现，每种图元各自给出。
pub trait HitTestable {
    fn bounding_box(&self) -> Rect;
    fn hit_test(&self, point: Point, accuracy: i32) -> bool;
    fn hit_test_rect(&self, rect: Rect, contained: bool, accuracy: i32) -> bool;
}

/// 电气连接能力。
pub trait Connectable {
    fn is_connectable(&self) -> bool;
    fn connection_points(&self) -> Vec<Point>;

    fn is_connected_at(&self, point: Point) -> bool {
        self.is_connectable() && self.connection_points().contains(&point)
    }
}

trait Shape: Transformable + HitTestable + Connectable {}

impl<T: Transformable + HitTestable + Connectable> Shape for T {}

fn unsupported(operation: &'static str, kind: &'static str) -> ItemError {
    ItemError::Unsupported { operation, kind }
}

fn box_hit(bbox: Rect, rect: Rect, contained: bool, accuracy: i32) -> bool {
    let area = rect.inflate(accuracy);
    if contained {
        area.contains_rect(&bbox)
    } else {
        area.intersects(&bbox)
    }
}

fn point_hit(position: Point, point: Point, accuracy: i32) -> bool {
    let delta = (point - position).0.abs();
    delta.x <= accuracy && delta.y <= accuracy
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LineKind {
    Wire,
    Bus,
    Notes,
}

/// 导线、总线或注释线段。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    pub kind: LineKind,
    pub start: Point,
    pub end: Point,
}

impl Line {
    pub fn new(kind: LineKind, start: Point, end: Point) -> Self {
        Self { kind, start, end }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        self.start == self.end
    }

    #[inline]
    pub fn is_horizontal(&self) -> bool {
        self.start.y() == self.end.y()
    }

    #[inline]
    pub fn is_vertical(&self) -> bool {
        self.start.x() == self.end.x()
    }
}

impl Transformable for Line {
    fn move_by(&mut self, delta: Point) {
        self.start = self.start + delta;
        self.end = self.end + delta;
    }

    fn rotate(&mut self, center: Point, angle: Angle) -> Result<(), ItemError> {
        self.start = geometry::rotate_point(self.start, center, angle);
        self.end = geometry::rotate_point(self.end, center, angle);
        Ok(())
    }

    fn flip(&mut self, _center: Point) -> Result<(), ItemError> {
        Err(unsupported("flip", "line"))
    }
}

impl HitTestable for Line {
    fn bounding_box(&self) -> Rect {
        Rect::new(self.start, self.end)
    }

    fn hit_test(&self, point: Point, accuracy: i32) -> bool {
        geometry::distance_to_segment(point, self.start, self.end) <= f64::from(accuracy.max(0))
    }

    fn hit_test_rect(&self, rect: Rect, contained: bool, accuracy: i32) -> bool {
        let area = rect.inflate(accuracy);
        if contained {
            area.contains(self.start) && area.contains(self.end)
        } else {
            area.intersects_segment(self.start, self.end)
        }
    }
}

impl Connectable for Line {
    fn is_connectable(&self) -> bool {
        self.kind != LineKind::Notes
    }

    fn connection_points(&self) -> Vec<Point> {
        vec![self.start, self.end]
    }
}

/// 连接点标记（结点或不连接标记）的公共几何实现。
macro_rules! point_marker {
    ($name:ident, $kind:literal, $half:expr) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub struct $name {
            pub position: Point,
        }

        impl $name {
            pub fn new(position: Point) -> Self {
                Self { position }
            }
        }

        impl Transformable for $name {
            fn move_by(&mut self, delta: Point) {
                self.position = self.position + delta;
            }

            fn rotate(&mut self, center: Point, angle: Angle) -> Result<(), ItemError> {
                self.position = geometry::rotate_point(self.position, center, angle);
                Ok(())
            }

            fn flip(&mut self, _center: Point) -> Result<(), ItemError> {
                Err(unsupported("flip", $kind))
            }
        }

        impl HitTestable for $name {
            fn bounding_box(&self) -> Rect {
                Rect::at_point(self.position).inflate($half)
            }

            fn hit_test(&self, point: Point, accuracy: i32) -> bool {
                point_hit(self.position, point, accuracy)
            }

            fn hit_test_rect(&self, rect: Rect, _contained: bool, accuracy: i32) -> bool {
                rect.inflate(accuracy).contains(self.position)
            }
        }

        impl Connectable for $name {
            fn is_connectable(&self) -> bool {
                true
            }

            fn connection_points(&self) -> Vec<Point> {
                vec![self.position]
            }
        }
    };
}

/// 结点符号半径（nm）。
pub const JUNCTION_RADIUS: i32 = 200_000;
/// 不连接标记半边长（nm）。
pub const NO_CONNECT_HALF_SIZE: i32 = 300_000;

point_marker!(Junction, "junction", JUNCTION_RADIUS);
point_marker!(NoConnect, "no-connect", NO_CONNECT_HALF_SIZE);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LabelKind {
    Local,
    Global,
    Hierarchical,
}

/// 网络标签。`orientation` 为文字方向的四分之一圈数 (0..=3)。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub kind: LabelKind,
    pub text: String,
    pub position: Point,
    pub orientation: u8,
    pub size: i32,
}

/// 标签默认字高（nm）。
pub const DEFAULT_TEXT_SIZE: i32 = 1_270_000;

impl Label {
    pub fn new(kind: LabelKind, text: impl Into<String>, position: Point) -> Self {
        Self {
            kind,
            text: text.into(),
            position,
            orientation: 0,
            size: DEFAULT_TEXT_SIZE,
        }
    }
}

impl Transformable for Label {
    fn move_by(&mut self, delta: Point) {
        self.position = self.position + delta;
    }

    fn rotate(&mut self, center: Point, angle: Angle) -> Result<(), ItemError> {
        let turns = angle
            .quarter_turns()
            .ok_or_else(|| unsupported("arbitrary rotation", "label"))?;
        self.position = geometry::rotate_point(self.position, center, angle);
        self.orientation = (self.orientation + turns) % 4;
        Ok(())
    }

    fn flip(&mut self, _center: Point) -> Result<(), ItemError> {
        Err(unsupported("flip", "label"))
    }
}

impl HitTestable for Label {
    fn bounding_box(&self) -> Rect {
        let length = self.size.saturating_mul(self.text.chars().count().max(1) as i32);
        let extent = match self.orientation % 4 {
            0 => Point::new(length, -self.size),
            1 => Point::new(-self.size, -length),
            2 => Point::new(-length, -self.size),
            _ => Point::new(-self.size, length),
        };
        Rect::from_origin_size(self.position, extent)
    }

    fn hit_test(&self, point: Point, accuracy: i32) -> bool {
        self.bounding_box().inflate(accuracy).contains(point)
    }

    fn hit_test_rect(&self, rect: Rect, contained: bool, accuracy: i32) -> bool {
        box_hit(self.bounding_box(), rect, contained, accuracy)
    }
}

impl Connectable for Label {
    fn is_connectable(&self) -> bool {
        true
    }

    fn connection_points(&self) -> Vec<Point> {
        vec![self.position]
    }
}

/// 元件方向矩阵，只表示 90° 旋转与镜像的组合。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Orientation {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl Orientation {
    pub const IDENTITY: Orientation = Orientation {
        x1: 1,
        y1: 0,
        x2: 0,
        y2: 1,
    };

    #[inline]
    pub fn apply(self, p: Point) -> Point {
        Point::new(
            self.x1 * p.x() + self.y1 * p.y(),
            self.x2 * p.x() + self.y2 * p.y(),
        )
    }

    /// 在当前方向上再逆时针旋转若干个四分之一圈。
    pub fn rotated(self, quarter_turns: u8) -> Self {
        (0..quarter_turns % 4).fold(self, |m, _| Orientation {
            x1: -m.x2,
            y1: -m.y2,
            x2: m.x1,
            y2: m.y1,
        })
    }
}

impl Default for Orientation {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// 元件引脚，`offset` 为库坐标系中相对于元件锚点的位置。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pin {
    pub number: String,
    pub name: String,
    pub offset: Point,
    /// 0 表示所有单元共用。
    pub unit: u8,
}

impl Pin {
    pub fn new(number: impl Into<String>, name: impl Into<String>, offset: Point) -> Self {
        Self {
            number: number.into(),
            name: name.into(),
            offset,
            unit: 0,
        }
    }

    pub fn with_unit(mut self, unit: u8) -> Self {
        self.unit = unit;
        self
    }
}

/// 某个层次实例路径下的位号与单元。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathReference {
    pub path: String,
    pub reference: String,
    pub unit: u8,
}

/// 原理图元件。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    pub lib_name: String,
    pub prefix: String,
    pub reference: String,
    pub value: String,
    pub unit: u8,
    pub units_locked: bool,
    pub position: Point,
    pub orientation: Orientation,
    /// 库坐标系中的本体外框。
    pub body: Rect,
    pub pins: Vec<Pin>,
    pub references: Vec<PathReference>,
}

impl Component {
    pub fn new(lib_name: impl Into<String>, prefix: impl Into<String>, position: Point) -> Self {
        let prefix = prefix.into();
        Self {
            lib_name: lib_name.into(),
            reference: unannotated(&prefix),
            prefix,
            value: String::new(),
            unit: 1,
            units_locked: false,
            position,
            orientation: Orientation::IDENTITY,
            body: Rect::default(),
            pins: Vec::new(),
            references: Vec::new(),
        }
    }

    pub fn with_body(mut self, body: Rect) -> Self {
        self.body = body;
        self
    }

    pub fn with_pin(mut self, pin: Pin) -> Self {
        self.pins.push(pin);
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    /// 引脚在文档坐标中的位置。
    #[inline]
    pub fn pin_position(&self, pin: &Pin) -> Point {
        self.position + self.orientation.apply(pin.offset)
    }

    /// 当前单元可见的引脚（含公共引脚）。
    pub fn active_pins(&self) -> impl Iterator<Item = &Pin> + '_ {
        self.pins
            .iter()
            .filter(move |pin| pin.unit == 0 || pin.unit == self.unit)
    }

    pub fn reference_for(&self, path: &str) -> Option<&str> {
        self.references
            .iter()
            .find(|entry| entry.path == path)
            .map(|entry| entry.reference.as_str())
    }

    pub fn set_reference_for(&mut self, path: &str, reference: impl Into<String>, unit: u8) {
        let reference = reference.into();
        match self.references.iter_mut().find(|entry| entry.path == path) {
            Some(entry) => {
                entry.reference = reference;
                entry.unit = unit;
            }
            None => self.references.push(PathReference {
                path: path.to_string(),
                reference,
                unit,
            }),
        }
    }

    /// 清除位号标注。给定实例路径时只处理该路径，否则处理全部路径与默认位号。
    pub fn clear_annotation(&mut self, path: Option<&str>) {
        let cleared = unannotated(&self.prefix);
        let reset_unit = !self.units_locked;
        for entry in &mut self.references {
            if path.is_none_or(|path| entry.path == path) {
                entry.reference = cleared.clone();
                if reset_unit {
                    entry.unit = 1;
                }
            }
        }
        if path.is_none() {
            self.reference = cleared;
            if reset_unit {
                self.unit = 1;
            }
        }
    }

    fn body_box(&self) -> Rect {
        let a = self.orientation.apply(self.body.min());
        let b = self.orientation.apply(self.body.max());
        let pins = self.active_pins().map(|pin| self.pin_position(pin));
        pins.fold(Rect::new(a, b).translate(self.position), |rect, p| {
            rect.merge(Rect::at_point(p))
        })
    }
}

fn unannotated(prefix: &str) -> String {
    let base = prefix.trim_end_matches('?').replace('?', "");
    if base.is_empty() {
        "U?".to_string()
    } else {
        format!("{base}?")
    }
}

impl Transformable for Component {
    fn move_by(&mut self, delta: Point) {
        self.position = self.position + delta;
    }

    fn rotate(&mut self, center: Point, angle: Angle) -> Result<(), ItemError> {
        let turns = angle
            .quarter_turns()
            .ok_or_else(|| unsupported("arbitrary rotation", "component"))?;
        self.position = geometry::rotate_point(self.position, center, angle);
        self.orientation = self.orientation.rotated(turns);
        Ok(())
    }

    fn flip(&mut self, _center: Point) -> Result<(), ItemError> {
        Err(unsupported("flip", "component"))
    }
}

impl HitTestable for Component {
    fn bounding_box(&self) -> Rect {
        self.body_box()
    }

    fn hit_test(&self, point: Point, accuracy: i32) -> bool {
        self.body_box().inflate(accuracy).contains(point)
    }

    fn hit_test_rect(&self, rect: Rect, contained: bool, accuracy: i32) -> bool {
        box_hit(self.body_box(), rect, contained, accuracy)
    }
}

impl Connectable for Component {
    fn is_connectable(&self) -> bool {
        true
    }

    fn connection_points(&self) -> Vec<Point> {
        self.active_pins().map(|pin| self.pin_position(pin)).collect()
    }
}

/// 子图纸上的层次引脚，位置为文档坐标。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetPin {
    pub name: String,
    pub position: Point,
}

/// 层次子图纸，引用层次结构中的另一个文档。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sheet {
    pub name: String,
    pub file_name: String,
    pub position: Point,
    pub size: Point,
    pub pins: Vec<SheetPin>,
    screen: ScreenId,
}

impl Sheet {
    pub fn new(
        name: impl Into<String>,
        file_name: impl Into<String>,
        position: Point,
        size: Point,
        screen: ScreenId,
    ) -> Self {
        Self {
            name: name.into(),
            file_name: file_name.into(),
            position,
            size,
            pins: Vec::new(),
            screen,
        }
    }

    pub fn with_pin(mut self, name: impl Into<String>, position: Point) -> Self {
        self.pins.push(SheetPin {
            name: name.into(),
            position,
        });
        self
    }

    #[inline]
    pub fn screen(&self) -> ScreenId {
        self.screen
    }
}

impl Transformable for Sheet {
    fn move_by(&mut self, delta: Point) {
        self.position = self.position + delta;
        for pin in &mut self.pins {
            pin.position = pin.position + delta;
        }
    }

    fn rotate(&mut self, center: Point, angle: Angle) -> Result<(), ItemError> {
        if angle.quarter_turns().is_none() {
            return Err(unsupported("arbitrary rotation", "sheet"));
        }
        let a = geometry::rotate_point(self.position, center, angle);
        let b = geometry::rotate_point(self.position + self.size, center, angle);
        let rect = Rect::new(a, b);
        self.position = rect.min();
        self.size = Point::new(rect.width(), rect.height());
        for pin in &mut self.pins {
            pin.position = geometry::rotate_point(pin.position, center, angle);
        }
        Ok(())
    }

    fn flip(&mut self, _center: Point) -> Result<(), ItemError> {
        Err(unsupported("flip", "sheet"))
    }
}

impl HitTestable for Sheet {
    fn bounding_box(&self) -> Rect {
        Rect::from_origin_size(self.position, self.size)
    }

    fn hit_test(&self, point: Point, accuracy: i32) -> bool {
        self.bounding_box().inflate(accuracy).contains(point)
    }

    fn hit_test_rect(&self, rect: Rect, contained: bool, accuracy: i32) -> bool {
        box_hit(self.bounding_box(), rect, contained, accuracy)
    }
}

impl Connectable for Sheet {
    fn is_connectable(&self) -> bool {
        true
    }

    fn connection_points(&self) -> Vec<Point> {
        self.pins.iter().map(|pin| pin.position).collect()
    }
}

/// 纯图形笔画。圆与圆弧以前两个点为圆心与半径端点。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Drawing {
    pub shape: StrokeShape,
    pub points: Vec<Point>,
    pub width: i32,
}

impl Drawing {
    pub fn new(shape: StrokeShape, points: Vec<Point>) -> Self {
        Self {
            shape,
            points,
            width: 0,
        }
    }
}

impl Transformable for Drawing {
    fn move_by(&mut self, delta: Point) {
        for p in &mut self.points {
            *p = *p + delta;
        }
    }

    fn rotate(&mut self, center: Point, angle: Angle) -> Result<(), ItemError> {
        for p in &mut self.points {
            *p = geometry::rotate_point(*p, center, angle);
        }
        Ok(())
    }

    fn flip(&mut self, center: Point) -> Result<(), ItemError> {
        for p in &mut self.points {
            *p = Point::new(p.x(), 2 * center.y() - p.y());
        }
        Ok(())
    }
}

impl HitTestable for Drawing {
    fn bounding_box(&self) -> Rect {
        let outline = match (self.shape, self.points.as_slice()) {
            (StrokeShape::Circle | StrokeShape::Arc, [center, rim, ..]) => {
                let radius = center.as_dvec2().distance(rim.as_dvec2()).ceil() as i32;
                Rect::at_point(*center).inflate(radius)
            }
            _ => Rect::enclosing(self.points.iter().copied()).unwrap_or_default(),
        };
        outline.inflate(self.width / 2)
    }

    fn hit_test(&self, point: Point, accuracy: i32) -> bool {
        self.bounding_box().inflate(accuracy).contains(point)
    }

    fn hit_test_rect(&self, rect: Rect, contained: bool, accuracy: i32) -> bool {
        box_hit(self.bounding_box(), rect, contained, accuracy)
    }
}

impl Connectable for Drawing {
    fn is_connectable(&self) -> bool {
        false
    }

    fn connection_points(&self) -> Vec<Point> {
        Vec::new()
    }
}

/// 封闭的图元种类集合。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemKind {
    Line(Line),
    Junction(Junction),
    NoConnect(NoConnect),
    Label(Label),
    Component(Component),
    Sheet(Sheet),
    Drawing(Drawing),
}

impl ItemKind {
    pub fn name(&self) -> &'static str {
        match self {
            ItemKind::Line(_) => "line",
            ItemKind::Junction(_) => "junction",
            ItemKind::NoConnect(_) => "no-connect",
            ItemKind::Label(_) => "label",
            ItemKind::Component(_) => "component",
            ItemKind::Sheet(_) => "sheet",
            ItemKind::Drawing(_) => "drawing",
        }
    }

    fn default_layer(&self) -> Layer {
        match self {
            ItemKind::Line(line) => match line.kind {
                LineKind::Wire => Layer::WIRE,
                LineKind::Bus => Layer::BUS,
                LineKind::Notes => Layer::NOTES,
            },
            ItemKind::Junction(_) => Layer::JUNCTION,
            ItemKind::NoConnect(_) => Layer::NO_CONNECT,
            ItemKind::Label(label) => match label.kind {
                LabelKind::Local => Layer::LOCAL_LABEL,
                LabelKind::Global => Layer::GLOBAL_LABEL,
                LabelKind::Hierarchical => Layer::HIER_LABEL,
            },
            ItemKind::Component(_) => Layer::DEVICE,
            ItemKind::Sheet(_) => Layer::SHEET,
            ItemKind::Drawing(_) => Layer::NOTES,
        }
    }

    fn shape(&self) -> &dyn Shape {
        match self {
            ItemKind::Line(inner) => inner,
            ItemKind::Junction(inner) => inner,
            ItemKind::NoConnect(inner) => inner,
            ItemKind::Label(inner) => inner,
            ItemKind::Component(inner) => inner,
            ItemKind::Sheet(inner) => inner,
            ItemKind::Drawing(inner) => inner,
        }
    }

    fn shape_mut(&mut self) -> &mut dyn Shape {
        match self {
            ItemKind::Line(inner) => inner,
            ItemKind::Junction(inner) => inner,
            ItemKind::NoConnect(inner) => inner,
            ItemKind::Label(inner) => inner,
            ItemKind::Component(inner) => inner,
            ItemKind::Sheet(inner) => inner,
            ItemKind::Drawing(inner) => inner,
        }
    }
}

/// 文档中的一个图元：身份、公共属性与具体种类。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    time_stamp: TimeStamp,
    layer: Layer,
    flags: ItemFlags,
    locked: bool,
    kind: ItemKind,
}

impl Item {
    /// 创建图元并分配新的身份，图层取该种类的默认图层。
    pub fn new(kind: ItemKind) -> Self {
        Self {
            time_stamp: TimeStamp::fresh(),
            layer: kind.default_layer(),
            flags: ItemFlags::NONE,
            locked: false,
            kind,
        }
    }

    pub fn wire(start: Point, end: Point) -> Self {
        Self::new(ItemKind::Line(Line::new(LineKind::Wire, start, end)))
    }

    pub fn bus(start: Point, end: Point) -> Self {
        Self::new(ItemKind::Line(Line::new(LineKind::Bus, start, end)))
    }

    pub fn notes_line(start: Point, end: Point) -> Self {
        Self::new(ItemKind::Line(Line::new(LineKind::Notes, start, end)))
    }

    pub fn junction(position: Point) -> Self {
        Self::new(ItemKind::Junction(Junction::new(position)))
    }

    pub fn no_connect(position: Point) -> Self {
        Self::new(ItemKind::NoConnect(NoConnect::new(position)))
    }

    pub fn label(kind: LabelKind, text: impl Into<String>, position: Point) -> Self {
        Self::new(ItemKind::Label(Label::new(kind, text, position)))
    }

    pub fn component(component: Component) -> Self {
        Self::new(ItemKind::Component(component))
    }

    pub fn sheet(sheet: Sheet) -> Self {
        Self::new(ItemKind::Sheet(sheet))
    }

    pub fn drawing(drawing: Drawing) -> Self {
        Self::new(ItemKind::Drawing(drawing))
    }

    /// 以指定身份构造，用于加载或测试。
    pub fn with_time_stamp(mut self, time_stamp: TimeStamp) -> Self {
        self.time_stamp = time_stamp;
        self
    }

    #[inline]
    pub fn time_stamp(&self) -> TimeStamp {
        self.time_stamp
    }

    /// 身份只允许在层次修复时改写。
    pub fn reassign_time_stamp(&mut self, time_stamp: TimeStamp) {
        self.time_stamp = time_stamp;
    }

    #[inline]
    pub fn kind(&self) -> &ItemKind {
        &self.kind
    }

    #[inline]
    pub fn kind_mut(&mut self) -> &mut ItemKind {
        &mut self.kind
    }

    #[inline]
    pub fn kind_name(&self) -> &'static str {
        self.kind.name()
    }

    #[inline]
    pub fn layer(&self) -> Layer {
        self.layer
    }

    #[inline]
    pub fn set_layer(&mut self, layer: Layer) {
        self.layer = layer;
    }

    pub fn is_on_layer(&self, layer: Layer) -> bool {
        match &self.kind {
            ItemKind::Component(_) => matches!(
                layer,
                Layer::DEVICE | Layer::DEVICE_BACKGROUND | Layer::PIN | Layer::FIELDS
            ),
            ItemKind::Sheet(_) => matches!(
                layer,
                Layer::SHEET | Layer::SHEET_LABEL | Layer::SHEET_NAME
            ),
            _ => self.layer == layer,
        }
    }

    #[inline]
    pub fn flags(&self) -> ItemFlags {
        self.flags
    }

    #[inline]
    pub fn set_flags(&mut self, flags: ItemFlags) {
        self.flags = flags;
    }

    #[inline]
    pub fn insert_flags(&mut self, flags: ItemFlags) {
        self.flags.insert(flags);
    }

    #[inline]
    pub fn clear_flags(&mut self, flags: ItemFlags) {
        self.flags.remove(flags);
    }

    #[inline]
    pub fn is_lockable(&self) -> bool {
        matches!(self.kind, ItemKind::Component(_))
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn set_locked(&mut self, locked: bool) -> Result<(), ItemError> {
        if !self.is_lockable() {
            return Err(unsupported("locking", self.kind_name()));
        }
        self.locked = locked;
        Ok(())
    }

    /// 渲染使用的形状分类；非纯图形图元返回 `None`。
    pub fn shape_kind(&self) -> Option<StrokeShape> {
        match &self.kind {
            ItemKind::Drawing(drawing) => Some(drawing.shape),
            ItemKind::Line(_) => Some(StrokeShape::Segment),
            _ => None,
        }
    }

    /// 锚点位置：线段取起点，图形取首点。
    pub fn position(&self) -> Point {
        match &self.kind {
            ItemKind::Line(line) => line.start,
            ItemKind::Junction(j) => j.position,
            ItemKind::NoConnect(nc) => nc.position,
            ItemKind::Label(label) => label.position,
            ItemKind::Component(c) => c.position,
            ItemKind::Sheet(sheet) => sheet.position,
            ItemKind::Drawing(drawing) => drawing.points.first().copied().unwrap_or_default(),
        }
    }

    /// 移动整个图元，使锚点落在 `position`。
    pub fn set_position(&mut self, position: Point) {
        let delta = position - self.position();
        self.move_by(delta);
    }

    /// 是否为层次图元（元件或子图纸），参与身份去重。
    #[inline]
    pub fn is_hierarchical(&self) -> bool {
        matches!(self.kind, ItemKind::Component(_) | ItemKind::Sheet(_))
    }

    /// 子图纸引用的文档。
    pub fn sub_screen(&self) -> Option<ScreenId> {
        self.as_sheet().map(Sheet::screen)
    }

    pub fn as_line(&self) -> Option<&Line> {
        match &self.kind {
            ItemKind::Line(line) => Some(line),
            _ => None,
        }
    }

    pub fn as_line_mut(&mut self) -> Option<&mut Line> {
        match &mut self.kind {
            ItemKind::Line(line) => Some(line),
            _ => None,
        }
    }

    pub fn as_component(&self) -> Option<&Component> {
        match &self.kind {
            ItemKind::Component(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_component_mut(&mut self) -> Option<&mut Component> {
        match &mut self.kind {
            ItemKind::Component(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_sheet(&self) -> Option<&Sheet> {
        match &self.kind {
            ItemKind::Sheet(sheet) => Some(sheet),
            _ => None,
        }
    }

    #[inline]
    pub fn is_junction(&self) -> bool {
        matches!(self.kind, ItemKind::Junction(_))
    }
}

impl Transformable for Item {
    fn move_by(&mut self, delta: Point) {
        self.kind.shape_mut().move_by(delta);
    }

    fn rotate(&mut self, center: Point, angle: Angle) -> Result<(), ItemError> {
        self.kind.shape_mut().rotate(center, angle)
    }

    fn flip(&mut self, center: Point) -> Result<(), ItemError> {
        self.kind.shape_mut().flip(center)
    }
}

impl HitTestable for Item {
    fn bounding_box(&self) -> Rect {
        self.kind.shape().bounding_box()
    }

    fn hit_test(&self, point: Point, accuracy: i32) -> bool {
        self.kind.shape().hit_test(point, accuracy)
    }

    fn hit_test_rect(&self, rect: Rect, contained: bool, accuracy: i32) -> bool {
        self.kind.shape().hit_test_rect(rect, contained, accuracy)
    }
}

impl Connectable for Item {
    fn is_connectable(&self) -> bool {
        self.kind.shape().is_connectable()
    }

    fn connection_points(&self) -> Vec<Point> {
        self.kind.shape().connection_points()
    }

    fn is_connected_at(&self, point: Point) -> bool {
        self.kind.shape().is_connected_at(point)
    }
}
