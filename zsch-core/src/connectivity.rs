//! 连接性引擎：规范化导线拓扑，并回答某个坐标上的连接查询。
//!
//! 清理按固定顺序执行：删除零长度线段、删除重复结点、合并共线线段、在连接点拆分线段。
//! 每一处结构性改动都以 [`Change`] 记录，调用方可以把它们整体压入撤销日志。

use std::collections::HashSet;

use crate::draw_list::{Change, Detached, DrawList, ItemKey};
use crate::geometry::{self, Point};
use crate::item::{Connectable, Item, ItemFlags, ItemKind, Line, LineKind, Pin};

/// 正在被交互移动的线段不参与合并与拆分。
const MOVING: ItemFlags = ItemFlags::SELECTED
    .union(ItemFlags::IS_MOVED)
    .union(ItemFlags::IS_DRAGGED);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupStats {
    pub null_segments: usize,
    pub duplicate_junctions: usize,
    pub merged: usize,
    pub split: usize,
}

/// 一次清理的结果：按发生顺序排列的变更与统计。
#[derive(Debug, Default)]
pub struct CleanupOutcome {
    changes: Vec<Change>,
    stats: CleanupStats,
}

impl CleanupOutcome {
    #[inline]
    pub fn is_modified(&self) -> bool {
        !self.changes.is_empty()
    }

    #[inline]
    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    #[inline]
    pub fn stats(&self) -> CleanupStats {
        self.stats
    }

    pub fn into_changes(self) -> Vec<Change> {
        self.changes
    }

    fn record_removal(&mut self, key: ItemKey, detached: Detached) {
        self.changes.push(Change::Deleted {
            key,
            ordinal: detached.ordinal,
            item: Box::new(detached.item),
        });
    }
}

/// 某个坐标上命中的元件引脚。
#[derive(Debug, Clone, Copy)]
pub struct PinHit<'a> {
    pub component: ItemKey,
    pub pin: &'a Pin,
}

/// 参与合并/拆分的线段：可连接且不在移动中。
fn cleanup_candidate(item: &Item) -> Option<Line> {
    let line = item.as_line()?;
    (line.is_connectable() && !item.flags().intersects(MOVING)).then_some(*line)
}

pub fn schematic_cleanup(list: &mut DrawList) -> CleanupOutcome {
    let mut outcome = CleanupOutcome::default();
    remove_null_segments(list, &mut outcome);
    remove_duplicate_junctions(list, &mut outcome);
    // 拆分可能留下重叠的碎段，再合并一轮直到不动点
    loop {
        while merge_one(list, &mut outcome) {}
        let mut split_any = false;
        while split_one(list, &mut outcome) {
            split_any = true;
        }
        if !split_any {
            break;
        }
    }
    outcome
}

fn remove_null_segments(list: &mut DrawList, outcome: &mut CleanupOutcome) {
    for key in list.keys() {
        let is_null = list
            .get(key)
            .and_then(cleanup_candidate)
            .is_some_and(|line| line.is_null());
        if !is_null {
            continue;
        }
        if let Some(detached) = list.detach(key) {
            outcome.record_removal(key, detached);
            outcome.stats.null_segments += 1;
        }
    }
}

fn remove_duplicate_junctions(list: &mut DrawList, outcome: &mut CleanupOutcome) {
    let mut seen: HashSet<Point> = HashSet::new();
    for key in list.keys() {
        let position = match list.get(key).map(Item::kind) {
            Some(ItemKind::Junction(junction)) => junction.position,
            _ => continue,
        };
        if seen.insert(position) {
            continue;
        }
        if let Some(detached) = list.detach(key) {
            outcome.record_removal(key, detached);
            outcome.stats.duplicate_junctions += 1;
        }
    }
}

enum Contact {
    Overlap,
    EndToEnd(Point),
}

/// 两条同类共线线段的接触方式；不共线或不接触时返回 `None`。
fn contact(a: &Line, b: &Line) -> Option<Contact> {
    if a.kind != b.kind || a.is_null() || b.is_null() {
        return None;
    }
    if !geometry::collinear(a.start, a.end, b.start) || !geometry::collinear(a.start, a.end, b.end) {
        return None;
    }
    let along = |p: Point| geometry::dot(a.start, a.end, p);
    let a_hi = geometry::dot(a.start, a.end, a.end);
    let (b0, b1) = (along(b.start), along(b.end));
    let lo = b0.min(b1).max(0);
    let hi = b0.max(b1).min(a_hi);
    if lo < hi {
        Some(Contact::Overlap)
    } else if lo == hi {
        Some(Contact::EndToEnd(if lo == 0 { a.start } else { a.end }))
    } else {
        None
    }
}

fn has_other_connection(list: &DrawList, point: Point, a: ItemKey, b: ItemKey) -> bool {
    list.iter()
        .any(|(key, item)| key != a && key != b && item.is_connected_at(point))
}

/// 在幸存线段的方向上取两条线段的并集。
fn union_span(survivor: &Line, other: &Line) -> (Point, Point) {
    let along = |p: Point| geometry::dot(survivor.start, survivor.end, p);
    let mut points = [survivor.start, survivor.end, other.start, other.end];
    points.sort_by_key(|p| along(*p));
    (points[0], points[3])
}

fn merge_one(list: &mut DrawList, outcome: &mut CleanupOutcome) -> bool {
    let candidates: Vec<(ItemKey, Line)> = list
        .iter()
        .filter_map(|(key, item)| cleanup_candidate(item).map(|line| (key, line)))
        .collect();

    for (i, (a_key, a_line)) in candidates.iter().enumerate() {
        for (b_key, b_line) in &candidates[i + 1..] {
            match contact(a_line, b_line) {
                Some(Contact::Overlap) => {
                    // 合并后落在中段的端点上不能有别的连接
                    let (lo, hi) = union_span(a_line, b_line);
                    let buried = [a_line.start, a_line.end, b_line.start, b_line.end]
                        .into_iter()
                        .filter(|point| *point != lo && *point != hi)
                        .any(|point| has_other_connection(list, point, *a_key, *b_key));
                    if buried {
                        continue;
                    }
                }
                Some(Contact::EndToEnd(point)) => {
                    if has_other_connection(list, point, *a_key, *b_key) {
                        continue;
                    }
                }
                None => continue,
            }
            if merge_pair(list, (*a_key, a_line), (*b_key, b_line), outcome) {
                return true;
            }
        }
    }
    false
}

fn merge_pair(
    list: &mut DrawList,
    a: (ItemKey, &Line),
    b: (ItemKey, &Line),
    outcome: &mut CleanupOutcome,
) -> bool {
    let stamp_of = |key: ItemKey| list.get(key).map(Item::time_stamp);
    let (Some(a_stamp), Some(b_stamp)) = (stamp_of(a.0), stamp_of(b.0)) else {
        return false;
    };
    // 身份较小者保留，相同时保留绘制顺序靠前者
    let (survivor, victim) = if b_stamp < a_stamp { (b, a) } else { (a, b) };

    let Some(removed) = list.detach(victim.0) else {
        return false;
    };
    let victim_flags = removed.item.flags();
    let (start, end) = union_span(survivor.1, victim.1);
    let Some(live) = list.get_mut(survivor.0) else {
        return false;
    };
    let snapshot = Box::new(live.clone());
    if let Some(line) = live.as_line_mut() {
        line.start = start;
        line.end = end;
    }
    live.insert_flags(victim_flags);

    outcome.changes.push(Change::Modified {
        key: survivor.0,
        snapshot,
    });
    outcome.record_removal(victim.0, removed);
    outcome.stats.merged += 1;
    true
}

/// 可作为拆分点的位置：同类线段的端点或结点。`None` 表示结点，对任何线型都生效。
fn split_points(list: &DrawList) -> Vec<(Option<LineKind>, Point)> {
    let mut points = Vec::new();
    for (_, item) in list.iter() {
        match item.kind() {
            ItemKind::Line(line) if line.is_connectable() => {
                points.push((Some(line.kind), line.start));
                points.push((Some(line.kind), line.end));
            }
            ItemKind::Junction(junction) => points.push((None, junction.position)),
            _ => {}
        }
    }
    points
}

fn split_one(list: &mut DrawList, outcome: &mut CleanupOutcome) -> bool {
    let points = split_points(list);
    let target = list.iter().find_map(|(key, item)| {
        let line = cleanup_candidate(item)?;
        points
            .iter()
            .find(|(kind, point)| {
                kind.is_none_or(|kind| kind == line.kind)
                    && geometry::segment_interior_contains(line.start, line.end, *point)
            })
            .map(|(_, point)| (key, line, *point))
    });
    let Some((key, line, point)) = target else {
        return false;
    };

    let Some(live) = list.get_mut(key) else {
        return false;
    };
    let snapshot = Box::new(live.clone());
    let mut piece = Item::new(ItemKind::Line(Line::new(line.kind, point, line.end)));
    piece.set_layer(live.layer());
    piece.set_flags(live.flags());
    if let Some(original) = live.as_line_mut() {
        original.end = point;
    }
    outcome.changes.push(Change::Modified { key, snapshot });

    match list.insert_after(key, piece) {
        Ok(new_key) => {
            outcome.changes.push(Change::Created { key: new_key });
            outcome.stats.split += 1;
            true
        }
        // 原线段刚刚还在列表中，插入不会失败
        Err(_) => false,
    }
}

/// 在 `point` 处有连接点的全部图元。
pub fn items_connected_at(list: &DrawList, point: Point) -> Vec<ItemKey> {
    list.iter()
        .filter(|(_, item)| item.is_connected_at(point))
        .map(|(key, _)| key)
        .collect()
}

/// 统计在 `point` 处连接的图元数。`test_junctions` 为真时计入结点图元，
/// 并把三个及以上线段端点交汇（尚无结点图元）的隐式结点计为一个。
pub fn count_connected_items(list: &DrawList, point: Point, test_junctions: bool) -> usize {
    let mut count = 0;
    let mut line_ends = 0;
    let mut has_junction = false;
    for (_, item) in list.iter() {
        if !item.is_connected_at(point) {
            continue;
        }
        match item.kind() {
            ItemKind::Junction(_) => {
                has_junction = true;
                if test_junctions {
                    count += 1;
                }
            }
            ItemKind::Line(_) => {
                line_ends += 1;
                count += 1;
            }
            _ => count += 1,
        }
    }
    if test_junctions && !has_junction && line_ends >= 3 {
        count += 1;
    }
    count
}

/// `point` 处是否需要补一个结点：尚无结点，且三路以上相连，
/// 或至少一个端点落在另一条线段的中段上。
pub fn is_junction_needed(list: &DrawList, point: Point) -> bool {
    let mut ends = 0;
    let mut passes = 0;
    for (_, item) in list.iter() {
        if item.is_junction() && item.is_connected_at(point) {
            return false;
        }
        if item.is_connected_at(point) {
            ends += 1;
        } else if let Some(line) = item.as_line() {
            if line.is_connectable() && geometry::segment_interior_contains(line.start, line.end, point) {
                passes += 1;
            }
        }
    }
    ends >= 3 || (ends >= 1 && passes >= 1)
}

/// 查找位于 `point` 的元件引脚（当前单元或公共引脚）。
pub fn pin_at(list: &DrawList, point: Point) -> Option<PinHit<'_>> {
    list.iter().find_map(|(key, item)| {
        let component = item.as_component()?;
        component
            .active_pins()
            .find(|pin| component.pin_position(pin) == point)
            .map(|pin| PinHit {
                component: key,
                pin,
            })
    })
}
