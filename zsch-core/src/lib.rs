pub mod connectivity;
pub mod draw_list;
pub mod item;

pub mod geometry {
    use std::ops::{Add, Neg, Sub};

    use glam::{DVec2, IVec2};
    use serde::{Deserialize, Serialize};

    /// 渲染与保存使用的默认偏移量。
    pub const ZERO_OFFSET: Point = Point(IVec2::ZERO);

    /// 二维整数坐标点，内部单位为 1 nm，以 `glam::IVec2` 表示。
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Point(pub IVec2);

    impl Point {
        #[inline]
        pub const fn new(x: i32, y: i32) -> Self {
            Self(IVec2::new(x, y))
        }

        #[inline]
        pub fn x(self) -> i32 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> i32 {
            self.0.y
        }

        #[inline]
        pub fn translate(self, offset: Point) -> Self {
            Self(self.0 + offset.0)
        }

        #[inline]
        pub fn as_ivec2(self) -> IVec2 {
            self.0
        }

        #[inline]
        pub fn as_dvec2(self) -> DVec2 {
            self.0.as_dvec2()
        }
    }

    impl From<IVec2> for Point {
        fn from(value: IVec2) -> Self {
            Self(value)
        }
    }

    impl Add for Point {
        type Output = Point;

        fn add(self, rhs: Point) -> Point {
            Point(self.0 + rhs.0)
        }
    }

    impl Sub for Point {
        type Output = Point;

        fn sub(self, rhs: Point) -> Point {
            Point(self.0 - rhs.0)
        }
    }

    impl Neg for Point {
        type Output = Point;

        fn neg(self) -> Point {
            Point(-self.0)
        }
    }

    /// 角度，单位为 0.1 度，逆时针为正。
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Angle(pub i32);

    impl Angle {
        pub const ZERO: Angle = Angle(0);
        pub const QUARTER: Angle = Angle(900);
        pub const HALF: Angle = Angle(1800);

        #[inline]
        pub fn from_tenths(tenths: i32) -> Self {
            Self(tenths)
        }

        #[inline]
        pub fn tenths(self) -> i32 {
            self.0
        }

        /// 归一化到 [0, 3600)。
        #[inline]
        pub fn normalized(self) -> Self {
            Self(self.0.rem_euclid(3600))
        }

        /// 若角度恰为 90° 的整数倍，返回逆时针四分之一圈数 (0..=3)。
        pub fn quarter_turns(self) -> Option<u8> {
            let tenths = self.normalized().0;
            (tenths % 900 == 0).then(|| (tenths / 900) as u8)
        }

        #[inline]
        pub fn to_radians(self) -> f64 {
            (f64::from(self.0) / 10.0).to_radians()
        }
    }

    /// 绕 `center` 旋转点。四分之一圈精确计算，其余角度四舍五入回整数网格。
    pub fn rotate_point(point: Point, center: Point, angle: Angle) -> Point {
        let rel = point.0 - center.0;
        let rotated = match angle.quarter_turns() {
            Some(0) => rel,
            Some(1) => IVec2::new(-rel.y, rel.x),
            Some(2) => -rel,
            Some(3) => IVec2::new(rel.y, -rel.x),
            _ => DVec2::from_angle(angle.to_radians())
                .rotate(rel.as_dvec2())
                .round()
                .as_ivec2(),
        };
        Point(center.0 + rotated)
    }

    /// 以 `o` 为原点的叉积，使用 i64 避免溢出。
    #[inline]
    fn cross(o: Point, a: Point, b: Point) -> i64 {
        let (ax, ay) = (i64::from(a.x() - o.x()), i64::from(a.y() - o.y()));
        let (bx, by) = (i64::from(b.x() - o.x()), i64::from(b.y() - o.y()));
        ax * by - ay * bx
    }

    #[inline]
    pub fn dot(o: Point, a: Point, b: Point) -> i64 {
        let (ax, ay) = (i64::from(a.x() - o.x()), i64::from(a.y() - o.y()));
        let (bx, by) = (i64::from(b.x() - o.x()), i64::from(b.y() - o.y()));
        ax * bx + ay * by
    }

    /// 三点是否共线。
    #[inline]
    pub fn collinear(a: Point, b: Point, c: Point) -> bool {
        cross(a, b, c) == 0
    }

    /// 点是否位于线段上（包含端点）。
    pub fn segment_contains(start: Point, end: Point, point: Point) -> bool {
        collinear(start, end, point)
            && point.x() >= start.x().min(end.x())
            && point.x() <= start.x().max(end.x())
            && point.y() >= start.y().min(end.y())
            && point.y() <= start.y().max(end.y())
    }

    /// 点是否严格位于线段内部（不含端点）。
    pub fn segment_interior_contains(start: Point, end: Point, point: Point) -> bool {
        point != start && point != end && segment_contains(start, end, point)
    }

    /// 两条闭线段是否相交（含端点接触与共线重叠）。
    pub fn segments_intersect(a1: Point, a2: Point, b1: Point, b2: Point) -> bool {
        let d1 = cross(b1, b2, a1).signum();
        let d2 = cross(b1, b2, a2).signum();
        let d3 = cross(a1, a2, b1).signum();
        let d4 = cross(a1, a2, b2).signum();
        if d1 * d2 < 0 && d3 * d4 < 0 {
            return true;
        }
        (d1 == 0 && segment_contains(b1, b2, a1))
            || (d2 == 0 && segment_contains(b1, b2, a2))
            || (d3 == 0 && segment_contains(a1, a2, b1))
            || (d4 == 0 && segment_contains(a1, a2, b2))
    }

    /// 点到线段的距离。
    pub fn distance_to_segment(point: Point, start: Point, end: Point) -> f64 {
        let p = point.as_dvec2();
        let a = start.as_dvec2();
        let ab = end.as_dvec2() - a;
        let len_sq = ab.length_squared();
        if len_sq <= f64::EPSILON {
            return p.distance(a);
        }
        let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
        p.distance(a + ab * t)
    }

    /// 轴对齐矩形（闭区间），构造时自动规范化角点。
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Rect {
        min: Point,
        max: Point,
    }

    impl Rect {
        pub fn new(a: Point, b: Point) -> Self {
            Self {
                min: Point(a.0.min(b.0)),
                max: Point(a.0.max(b.0)),
            }
        }

        #[inline]
        pub fn from_origin_size(origin: Point, size: Point) -> Self {
            Self::new(origin, origin + size)
        }

        #[inline]
        pub fn at_point(point: Point) -> Self {
            Self {
                min: point,
                max: point,
            }
        }

        /// 包含所有给定点的最小矩形；空输入返回 `None`。
        pub fn enclosing(points: impl IntoIterator<Item = Point>) -> Option<Self> {
            let mut points = points.into_iter();
            let first = points.next()?;
            Some(points.fold(Self::at_point(first), |rect, p| {
                rect.merge(Self::at_point(p))
            }))
        }

        #[inline]
        pub fn min(&self) -> Point {
            self.min
        }

        #[inline]
        pub fn max(&self) -> Point {
            self.max
        }

        #[inline]
        pub fn width(&self) -> i32 {
            self.max.x() - self.min.x()
        }

        #[inline]
        pub fn height(&self) -> i32 {
            self.max.y() - self.min.y()
        }

        #[inline]
        pub fn center(&self) -> Point {
            Point((self.min.0 + self.max.0) / 2)
        }

        /// 向四周扩展 `amount`；负值收缩，但不会翻转。
        pub fn inflate(self, amount: i32) -> Self {
            let delta = IVec2::splat(amount);
            let min = self.min.0 - delta;
            let max = self.max.0 + delta;
            if min.x > max.x || min.y > max.y {
                let center = self.center();
                return Self::at_point(center);
            }
            Self {
                min: Point(min),
                max: Point(max),
            }
        }

        #[inline]
        pub fn translate(self, offset: Point) -> Self {
            Self {
                min: self.min + offset,
                max: self.max + offset,
            }
        }

        pub fn merge(self, other: Rect) -> Self {
            Self {
                min: Point(self.min.0.min(other.min.0)),
                max: Point(self.max.0.max(other.max.0)),
            }
        }

        #[inline]
        pub fn contains(&self, point: Point) -> bool {
            point.x() >= self.min.x()
                && point.x() <= self.max.x()
                && point.y() >= self.min.y()
                && point.y() <= self.max.y()
        }

        #[inline]
        pub fn contains_rect(&self, other: &Rect) -> bool {
            self.contains(other.min) && self.contains(other.max)
        }

        #[inline]
        pub fn intersects(&self, other: &Rect) -> bool {
            self.min.x() <= other.max.x()
                && other.min.x() <= self.max.x()
                && self.min.y() <= other.max.y()
                && other.min.y() <= self.max.y()
        }

        /// 线段与矩形（含边界）是否有公共点。
        pub fn intersects_segment(&self, start: Point, end: Point) -> bool {
            if self.contains(start) || self.contains(end) {
                return true;
            }
            let corners = [
                self.min,
                Point::new(self.max.x(), self.min.y()),
                self.max,
                Point::new(self.min.x(), self.max.y()),
            ];
            (0..4).any(|i| segments_intersect(start, end, corners[i], corners[(i + 1) % 4]))
        }
    }
}
