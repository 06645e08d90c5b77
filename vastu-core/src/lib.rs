pub mod geometry {
    use glam::DVec2;
    use serde::{Deserialize, Serialize};

    /// 几何比较的默认容差，单位与地块单位一致（通常为米）。
    pub const TOLERANCE: f64 = 1e-6;

    /// 二维点，内部以 `glam::DVec2` 表示。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Point2(pub DVec2);

    impl Point2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn from_vec(vec: DVec2) -> Self {
            Self(vec)
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn translate(self, offset: Vector2) -> Self {
            Self(self.0 + offset.0)
        }

        #[inline]
        pub fn distance_to(self, other: Point2) -> f64 {
            self.0.distance(other.0)
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }

        /// 两点在容差内是否重合。
        #[inline]
        pub fn approx_eq(self, other: Point2, tolerance: f64) -> bool {
            (self.x() - other.x()).abs() <= tolerance && (self.y() - other.y()).abs() <= tolerance
        }
    }

    impl From<DVec2> for Point2 {
        fn from(value: DVec2) -> Self {
            Self::from_vec(value)
        }
    }

    /// 二维向量。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Vector2(pub DVec2);

    impl Vector2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn from_points(start: Point2, end: Point2) -> Self {
            Self(end.0 - start.0)
        }

        /// 由方位角构造单位向量：0° 指向 +Y，顺时针增加（与罗盘一致）。
        #[inline]
        pub fn from_bearing_degrees(bearing: f64) -> Self {
            let radians = bearing.to_radians();
            Self(DVec2::new(radians.sin(), radians.cos()))
        }

        #[inline]
        pub fn length(self) -> f64 {
            self.0.length()
        }

        #[inline]
        pub fn length_squared(self) -> f64 {
            self.0.length_squared()
        }

        #[inline]
        pub fn normalize(self) -> Option<Self> {
            let len = self.0.length();
            if len <= f64::EPSILON {
                None
            } else {
                Some(Self(self.0 / len))
            }
        }

        /// 逆时针旋转 90° 的垂直向量。
        #[inline]
        pub fn perp(self) -> Self {
            Self(self.0.perp())
        }

        #[inline]
        pub fn dot(self, other: Vector2) -> f64 {
            self.0.dot(other.0)
        }

        #[inline]
        pub fn scale(self, factor: f64) -> Self {
            Self(self.0 * factor)
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }
    }

    impl From<DVec2> for Vector2 {
        fn from(value: DVec2) -> Self {
            Self(value)
        }
    }

    /// 轴对齐边界框，用于估算文档/实体范围。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Bounds2D {
        min: Point2,
        max: Point2,
    }

    impl Bounds2D {
        #[inline]
        pub fn new(min: Point2, max: Point2) -> Self {
            Self { min, max }
        }

        #[inline]
        pub fn empty() -> Self {
            Self {
                min: Point2::new(f64::INFINITY, f64::INFINITY),
                max: Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
            }
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.min.x() > self.max.x() || self.min.y() > self.max.y()
        }

        #[inline]
        pub fn min(&self) -> Point2 {
            self.min
        }

        #[inline]
        pub fn max(&self) -> Point2 {
            self.max
        }

        pub fn include_point(&mut self, point: Point2) {
            if self.is_empty() {
                self.min = point;
                self.max = point;
                return;
            }
            let min_vec = self.min.as_vec2().min(point.as_vec2());
            let max_vec = self.max.as_vec2().max(point.as_vec2());
            self.min = Point2::from_vec(min_vec);
            self.max = Point2::from_vec(max_vec);
        }

        pub fn include_bounds(&mut self, other: &Bounds2D) {
            if other.is_empty() {
                return;
            }
            self.include_point(other.min);
            self.include_point(other.max);
        }

        #[inline]
        pub fn center(&self) -> Point2 {
            debug_assert!(!self.is_empty());
            let min_vec = self.min.as_vec2();
            let max_vec = self.max.as_vec2();
            let center = (min_vec + max_vec) * 0.5;
            Point2::from_vec(center)
        }

        #[inline]
        pub fn to_rect(&self) -> Rect {
            Rect::from_corners(self.min, self.max)
        }
    }

    /// 矩形的四条边（地块坐标系：+X 向右，+Y 向上）。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum RectSide {
        Bottom,
        Right,
        Top,
        Left,
    }

    impl RectSide {
        pub const ALL: [RectSide; 4] = [
            RectSide::Bottom,
            RectSide::Right,
            RectSide::Top,
            RectSide::Left,
        ];

        /// 指向矩形外侧的单位法向量。
        pub fn outward(self) -> Vector2 {
            match self {
                RectSide::Bottom => Vector2::new(0.0, -1.0),
                RectSide::Right => Vector2::new(1.0, 0.0),
                RectSide::Top => Vector2::new(0.0, 1.0),
                RectSide::Left => Vector2::new(-1.0, 0.0),
            }
        }

        #[inline]
        pub fn is_horizontal(self) -> bool {
            matches!(self, RectSide::Bottom | RectSide::Top)
        }

        pub fn opposite(self) -> Self {
            match self {
                RectSide::Bottom => RectSide::Top,
                RectSide::Right => RectSide::Left,
                RectSide::Top => RectSide::Bottom,
                RectSide::Left => RectSide::Right,
            }
        }
    }

    /// 线段。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Segment {
        pub start: Point2,
        pub end: Point2,
    }

    impl Segment {
        #[inline]
        pub fn new(start: Point2, end: Point2) -> Self {
            Self { start, end }
        }

        #[inline]
        pub fn length(&self) -> f64 {
            self.start.distance_to(self.end)
        }

        #[inline]
        pub fn midpoint(&self) -> Point2 {
            Point2::from_vec((self.start.as_vec2() + self.end.as_vec2()) * 0.5)
        }

        /// 单位方向向量；退化线段返回 None。
        #[inline]
        pub fn direction(&self) -> Option<Vector2> {
            Vector2::from_points(self.start, self.end).normalize()
        }

        #[inline]
        pub fn is_horizontal(&self, tolerance: f64) -> bool {
            (self.start.y() - self.end.y()).abs() <= tolerance
        }

        #[inline]
        pub fn is_vertical(&self, tolerance: f64) -> bool {
            (self.start.x() - self.end.x()).abs() <= tolerance
        }

        #[inline]
        pub fn point_at(&self, t: f64) -> Point2 {
            Point2::from_vec(self.start.as_vec2().lerp(self.end.as_vec2(), t))
        }

        pub fn distance_to_point(&self, point: Point2) -> f64 {
            let a = self.start.as_vec2();
            let ab = self.end.as_vec2() - a;
            let len_sq = ab.length_squared();
            if len_sq <= f64::EPSILON {
                return self.start.distance_to(point);
            }
            let t = ((point.as_vec2() - a).dot(ab) / len_sq).clamp(0.0, 1.0);
            (a + ab * t).distance(point.as_vec2())
        }

        /// 两条共线线段的重叠部分，长度不超过容差时返回 None。
        pub fn collinear_overlap(&self, other: &Segment, tolerance: f64) -> Option<Segment> {
            let dir = self.direction()?;
            if other.distance_to_line(self) > tolerance {
                return None;
            }
            let origin = self.start.as_vec2();
            let project = |p: Point2| (p.as_vec2() - origin).dot(dir.as_vec2());
            let (a0, a1) = ordered(project(self.start), project(self.end));
            let (b0, b1) = ordered(project(other.start), project(other.end));
            let lo = a0.max(b0);
            let hi = a1.min(b1);
            if hi - lo <= tolerance {
                return None;
            }
            let at = |t: f64| Point2::from_vec(origin + dir.as_vec2() * t);
            Some(Segment::new(at(lo), at(hi)))
        }

        fn distance_to_line(&self, line: &Segment) -> f64 {
            let Some(dir) = line.direction() else {
                return self.start.distance_to(line.start);
            };
            let origin = line.start.as_vec2();
            let d1 = dir.as_vec2().perp_dot(self.start.as_vec2() - origin).abs();
            let d2 = dir.as_vec2().perp_dot(self.end.as_vec2() - origin).abs();
            d1.max(d2)
        }
    }

    #[inline]
    fn ordered(a: f64, b: f64) -> (f64, f64) {
        if a <= b { (a, b) } else { (b, a) }
    }

    /// 轴对齐矩形，房间与区域的基础表示。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Rect {
        min: Point2,
        max: Point2,
    }

    impl Rect {
        /// 由任意两组坐标构造，自动归一化。
        pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
            let (min_x, max_x) = ordered(x0, x1);
            let (min_y, max_y) = ordered(y0, y1);
            Self {
                min: Point2::new(min_x, min_y),
                max: Point2::new(max_x, max_y),
            }
        }

        #[inline]
        pub fn from_corners(a: Point2, b: Point2) -> Self {
            Self::new(a.x(), a.y(), b.x(), b.y())
        }

        #[inline]
        pub fn min(&self) -> Point2 {
            self.min
        }

        #[inline]
        pub fn max(&self) -> Point2 {
            self.max
        }

        #[inline]
        pub fn width(&self) -> f64 {
            self.max.x() - self.min.x()
        }

        #[inline]
        pub fn height(&self) -> f64 {
            self.max.y() - self.min.y()
        }

        #[inline]
        pub fn area(&self) -> f64 {
            self.width() * self.height()
        }

        #[inline]
        pub fn centroid(&self) -> Point2 {
            Point2::from_vec((self.min.as_vec2() + self.max.as_vec2()) * 0.5)
        }

        /// 长边与短边之比（≥ 1）；退化矩形返回无穷大。
        pub fn aspect_ratio(&self) -> f64 {
            let long = self.width().max(self.height());
            let short = self.width().min(self.height());
            if short <= f64::EPSILON {
                f64::INFINITY
            } else {
                long / short
            }
        }

        #[inline]
        pub fn is_degenerate(&self, tolerance: f64) -> bool {
            self.width() <= tolerance || self.height() <= tolerance
        }

        /// 逆时针顺序的四个角点，从最小角开始。
        pub fn corners(&self) -> [Point2; 4] {
            [
                self.min,
                Point2::new(self.max.x(), self.min.y()),
                self.max,
                Point2::new(self.min.x(), self.max.y()),
            ]
        }

        /// 指定边（逆时针方向）。
        pub fn side(&self, side: RectSide) -> Segment {
            let [a, b, c, d] = self.corners();
            match side {
                RectSide::Bottom => Segment::new(a, b),
                RectSide::Right => Segment::new(b, c),
                RectSide::Top => Segment::new(c, d),
                RectSide::Left => Segment::new(d, a),
            }
        }

        pub fn contains_point(&self, point: Point2, tolerance: f64) -> bool {
            point.x() >= self.min.x() - tolerance
                && point.x() <= self.max.x() + tolerance
                && point.y() >= self.min.y() - tolerance
                && point.y() <= self.max.y() + tolerance
        }

        pub fn contains_rect(&self, other: &Rect, tolerance: f64) -> bool {
            self.contains_point(other.min, tolerance) && self.contains_point(other.max, tolerance)
        }

        /// 点到矩形的最短距离，点在矩形内时为 0。
        pub fn distance_to_point(&self, point: Point2) -> f64 {
            let dx = (self.min.x() - point.x()).max(point.x() - self.max.x()).max(0.0);
            let dy = (self.min.y() - point.y()).max(point.y() - self.max.y()).max(0.0);
            dx.hypot(dy)
        }

        /// 内部是否重叠；仅共享边界不算重叠。
        pub fn overlaps_interior(&self, other: &Rect, tolerance: f64) -> bool {
            let overlap_x = self.max.x().min(other.max.x()) - self.min.x().max(other.min.x());
            let overlap_y = self.max.y().min(other.max.y()) - self.min.y().max(other.min.y());
            overlap_x > tolerance && overlap_y > tolerance
        }

        #[inline]
        pub fn translate(&self, dx: f64, dy: f64) -> Self {
            Self::new(
                self.min.x() + dx,
                self.min.y() + dy,
                self.max.x() + dx,
                self.max.y() + dy,
            )
        }

        /// 向内收缩 `distance`；收缩后退化则返回 None。
        pub fn inset(&self, distance: f64) -> Option<Self> {
            let rect = Self {
                min: Point2::new(self.min.x() + distance, self.min.y() + distance),
                max: Point2::new(self.max.x() - distance, self.max.y() - distance),
            };
            if rect.width() <= 0.0 || rect.height() <= 0.0 {
                None
            } else {
                Some(rect)
            }
        }

        /// 与另一矩形共享的边界线段（以本矩形的边表示），重叠长度需大于容差。
        pub fn shared_boundary(&self, other: &Rect, tolerance: f64) -> Option<(RectSide, Segment)> {
            for side in RectSide::ALL {
                let ours = self.side(side);
                let theirs = other.side(side.opposite());
                if let Some(overlap) = ours.collinear_overlap(&theirs, tolerance) {
                    return Some((side, overlap));
                }
            }
            None
        }

        /// 线段是否穿过矩形开内部（Liang–Barsky 裁剪）。沿边界的线段不算穿过。
        pub fn segment_crosses_interior(&self, segment: &Segment, tolerance: f64) -> bool {
            let x_min = self.min.x() + tolerance;
            let x_max = self.max.x() - tolerance;
            let y_min = self.min.y() + tolerance;
            let y_max = self.max.y() - tolerance;
            if x_min >= x_max || y_min >= y_max {
                return false;
            }
            let length = segment.length();
            if length <= tolerance {
                return false;
            }
            let sx = segment.start.x();
            let sy = segment.start.y();
            let dx = segment.end.x() - sx;
            let dy = segment.end.y() - sy;
            let mut t0 = 0.0_f64;
            let mut t1 = 1.0_f64;
            for (p, q) in [
                (-dx, sx - x_min),
                (dx, x_max - sx),
                (-dy, sy - y_min),
                (dy, y_max - sy),
            ] {
                if p.abs() <= f64::EPSILON {
                    if q < 0.0 {
                        return false;
                    }
                    continue;
                }
                let r = q / p;
                if p < 0.0 {
                    if r > t1 {
                        return false;
                    }
                    t0 = t0.max(r);
                } else {
                    if r < t0 {
                        return false;
                    }
                    t1 = t1.min(r);
                }
            }
            (t1 - t0) * length > tolerance
        }

        #[inline]
        pub fn to_polygon(&self) -> Polygon {
            Polygon::new(self.corners().to_vec())
        }

        #[inline]
        pub fn bounds(&self) -> Bounds2D {
            Bounds2D::new(self.min, self.max)
        }
    }

    /// 简单多边形（顶点按顺序排列，不重复首点）。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Polygon {
        vertices: Vec<Point2>,
    }

    impl Polygon {
        /// 构造多边形；若末点与首点重合则去掉末点。
        pub fn new(mut vertices: Vec<Point2>) -> Self {
            if vertices.len() > 1 {
                let first = vertices[0];
                if let Some(last) = vertices.last() {
                    if last.approx_eq(first, f64::EPSILON) {
                        vertices.pop();
                    }
                }
            }
            Self { vertices }
        }

        #[inline]
        pub fn from_rect(rect: &Rect) -> Self {
            rect.to_polygon()
        }

        #[inline]
        pub fn vertices(&self) -> &[Point2] {
            &self.vertices
        }

        /// 有向面积（逆时针为正）。
        pub fn signed_area(&self) -> f64 {
            let n = self.vertices.len();
            if n < 3 {
                return 0.0;
            }
            let mut sum = 0.0;
            for i in 0..n {
                let a = self.vertices[i];
                let b = self.vertices[(i + 1) % n];
                sum += a.x() * b.y() - b.x() * a.y();
            }
            sum * 0.5
        }

        #[inline]
        pub fn area(&self) -> f64 {
            self.signed_area().abs()
        }

        /// 面积加权质心；退化多边形退化为顶点平均值。
        pub fn centroid(&self) -> Point2 {
            let n = self.vertices.len();
            let area = self.signed_area();
            if n == 0 {
                return Point2::new(0.0, 0.0);
            }
            if area.abs() <= f64::EPSILON {
                let sum = self
                    .vertices
                    .iter()
                    .fold(glam::DVec2::ZERO, |acc, p| acc + p.as_vec2());
                return Point2::from_vec(sum / n as f64);
            }
            let mut cx = 0.0;
            let mut cy = 0.0;
            for i in 0..n {
                let a = self.vertices[i];
                let b = self.vertices[(i + 1) % n];
                let cross = a.x() * b.y() - b.x() * a.y();
                cx += (a.x() + b.x()) * cross;
                cy += (a.y() + b.y()) * cross;
            }
            let factor = 1.0 / (6.0 * area);
            Point2::new(cx * factor, cy * factor)
        }

        pub fn bounds(&self) -> Bounds2D {
            let mut bounds = Bounds2D::empty();
            for vertex in &self.vertices {
                bounds.include_point(*vertex);
            }
            bounds
        }

        pub fn edges(&self) -> impl Iterator<Item = Segment> + '_ {
            let n = self.vertices.len();
            (0..n).map(move |i| Segment::new(self.vertices[i], self.vertices[(i + 1) % n]))
        }

        /// 点是否在多边形内部或边界上（边界容差内视为在内）。
        pub fn contains_point(&self, point: Point2, tolerance: f64) -> bool {
            if self.edges().any(|edge| edge.distance_to_point(point) <= tolerance) {
                return true;
            }
            let n = self.vertices.len();
            let mut inside = false;
            let mut j = n.wrapping_sub(1);
            for i in 0..n {
                let a = self.vertices[i];
                let b = self.vertices[j];
                if (a.y() > point.y()) != (b.y() > point.y()) {
                    let x_cross = (b.x() - a.x()) * (point.y() - a.y()) / (b.y() - a.y()) + a.x();
                    if point.x() < x_cross {
                        inside = !inside;
                    }
                }
                j = i;
            }
            inside
        }

        /// 点是否严格位于内部（距边界超过容差）。
        pub fn contains_point_strict(&self, point: Point2, tolerance: f64) -> bool {
            self.edges().all(|edge| edge.distance_to_point(point) > tolerance)
                && self.contains_point(point, 0.0)
        }

        /// 矩形与多边形内部是否有正面积重叠。
        pub fn overlaps_rect_interior(&self, rect: &Rect, tolerance: f64) -> bool {
            if rect.is_degenerate(tolerance) || self.vertices.len() < 3 {
                return false;
            }
            if self.contains_point_strict(rect.centroid(), tolerance)
                || rect
                    .corners()
                    .iter()
                    .any(|corner| self.contains_point_strict(*corner, tolerance))
            {
                return true;
            }
            if let Some(inner) = rect.inset(tolerance) {
                if self
                    .vertices
                    .iter()
                    .any(|vertex| inner.contains_point(*vertex, 0.0))
                {
                    return true;
                }
            }
            self.edges()
                .any(|edge| rect.segment_crosses_interior(&edge, tolerance))
        }

        /// Sutherland–Hodgman 裁剪：`clip` 必须为凸多边形（顶点方向不限）。
        /// 结果退化时返回 None。
        pub fn clip_convex(&self, clip: &Polygon) -> Option<Polygon> {
            let orientation = clip.signed_area().signum();
            if orientation == 0.0 {
                return None;
            }
            let inside = |a: DVec2, b: DVec2, p: DVec2| (b - a).perp_dot(p - a) * orientation >= -1e-12;
            let mut output: Vec<DVec2> = self.vertices.iter().map(|p| p.as_vec2()).collect();
            for edge in clip.edges() {
                if output.is_empty() {
                    break;
                }
                let a = edge.start.as_vec2();
                let b = edge.end.as_vec2();
                let input = std::mem::take(&mut output);
                let mut prev = input[input.len() - 1];
                for &current in &input {
                    let current_in = inside(a, b, current);
                    let prev_in = inside(a, b, prev);
                    if current_in {
                        if !prev_in {
                            output.extend(line_intersection(prev, current, a, b));
                        }
                        output.push(current);
                    } else if prev_in {
                        output.extend(line_intersection(prev, current, a, b));
                    }
                    prev = current;
                }
            }
            output.dedup_by(|a, b| a.distance(*b) <= TOLERANCE);
            if output.len() > 1 && output[0].distance(output[output.len() - 1]) <= TOLERANCE {
                output.pop();
            }
            let polygon = Polygon::new(output.into_iter().map(Point2::from_vec).collect());
            if polygon.vertices.len() < 3 || polygon.area() <= TOLERANCE {
                None
            } else {
                Some(polygon)
            }
        }

        /// 多边形是否简单（边不自交）且面积为正。
        pub fn is_simple(&self) -> bool {
            let n = self.vertices.len();
            if n < 3 || self.area() <= f64::EPSILON {
                return false;
            }
            let edges: Vec<Segment> = self.edges().collect();
            for i in 0..n {
                for j in (i + 1)..n {
                    let adjacent = j == i + 1 || (i == 0 && j == n - 1);
                    if adjacent {
                        if edges[i].collinear_overlap(&edges[j], TOLERANCE).is_some() {
                            return false;
                        }
                        continue;
                    }
                    if segments_intersect(&edges[i], &edges[j], TOLERANCE) {
                        return false;
                    }
                }
            }
            true
        }

        /// 若多边形本身就是轴对齐矩形则返回该矩形。
        pub fn as_axis_aligned_rect(&self, tolerance: f64) -> Option<Rect> {
            if self.vertices.len() != 4 {
                return None;
            }
            let axis_aligned = self
                .edges()
                .all(|edge| edge.is_horizontal(tolerance) || edge.is_vertical(tolerance));
            if !axis_aligned {
                return None;
            }
            let rect = self.bounds().to_rect();
            if (rect.area() - self.area()).abs() <= tolerance {
                Some(rect)
            } else {
                None
            }
        }

        /// 矩形是否完整位于多边形内：四角在内且没有边穿过矩形内部。
        pub fn contains_rect(&self, rect: &Rect, tolerance: f64) -> bool {
            rect.corners()
                .iter()
                .all(|corner| self.contains_point(*corner, tolerance))
                && !self
                    .edges()
                    .any(|edge| rect.segment_crosses_interior(&edge, tolerance))
        }

        /// 以 `center` 为中心按比例缩放。
        pub fn scaled_about(&self, center: Point2, factor: f64) -> Polygon {
            let c = center.as_vec2();
            Polygon::new(
                self.vertices
                    .iter()
                    .map(|p| Point2::from_vec(c + (p.as_vec2() - c) * factor))
                    .collect(),
            )
        }

        /// 从 `origin` 沿 `direction` 发出的射线与边界的最近交点。
        pub fn ray_exit(&self, origin: Point2, direction: Vector2) -> Option<Point2> {
            let dir = direction.normalize()?.as_vec2();
            let o = origin.as_vec2();
            let mut best: Option<f64> = None;
            for edge in self.edges() {
                let a = edge.start.as_vec2();
                let e = edge.end.as_vec2() - a;
                let denom = dir.perp_dot(e);
                if denom.abs() <= f64::EPSILON {
                    continue;
                }
                let diff = a - o;
                let t = diff.perp_dot(e) / denom;
                let u = diff.perp_dot(dir) / denom;
                if t > TOLERANCE && (-TOLERANCE..=1.0 + TOLERANCE).contains(&u) {
                    best = Some(best.map_or(t, |current: f64| current.min(t)));
                }
            }
            best.map(|t| Point2::from_vec(o + dir * t))
        }

        /// 沿方向投影最远的顶点（并列时取先出现者）。
        pub fn support_point(&self, direction: Vector2) -> Option<Point2> {
            let mut best: Option<(f64, Point2)> = None;
            for vertex in &self.vertices {
                let score = Vector2::from(vertex.as_vec2()).dot(direction);
                match best {
                    Some((current, _)) if score <= current + TOLERANCE => {}
                    _ => best = Some((score, *vertex)),
                }
            }
            best.map(|(_, point)| point)
        }
    }

    /// 线段 p0→p1 与直线 a→b 的交点。
    fn line_intersection(p0: DVec2, p1: DVec2, a: DVec2, b: DVec2) -> Option<DVec2> {
        let r = p1 - p0;
        let s = b - a;
        let denom = r.perp_dot(s);
        if denom.abs() <= f64::EPSILON {
            return None;
        }
        let t = (a - p0).perp_dot(s) / denom;
        Some(p0 + r * t)
    }

    /// 判断两条线段是否相交（含端点接触与共线重叠）。
    pub fn segments_intersect(a: &Segment, b: &Segment, tolerance: f64) -> bool {
        let p = a.start.as_vec2();
        let r = a.end.as_vec2() - p;
        let q = b.start.as_vec2();
        let s = b.end.as_vec2() - q;
        let denom = r.perp_dot(s);
        let qp = q - p;
        if denom.abs() <= f64::EPSILON {
            if r.perp_dot(qp).abs() > tolerance * r.length().max(1.0) {
                return false;
            }
            return a.collinear_overlap(b, tolerance).is_some()
                || a.distance_to_point(b.start) <= tolerance
                || a.distance_to_point(b.end) <= tolerance;
        }
        let t = qp.perp_dot(s) / denom;
        let u = qp.perp_dot(r) / denom;
        let eps_t = tolerance / r.length().max(f64::EPSILON);
        let eps_u = tolerance / s.length().max(f64::EPSILON);
        (-eps_t..=1.0 + eps_t).contains(&t) && (-eps_u..=1.0 + eps_u).contains(&u)
    }

}

pub mod style {
    use serde::{Deserialize, Serialize};

    use crate::document::{Document, Layer};

    /// 线宽，以 0.01mm 为单位存储（DXF 组码 370 的原生单位）。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Lineweight(i16);

    impl Lineweight {
        /// DXF 中的 "Default" 线宽。
        pub const DEFAULT: Lineweight = Lineweight(-3);

        #[inline]
        pub const fn from_hundredths(value: i16) -> Self {
            Self(value)
        }

        #[inline]
        pub fn hundredths(self) -> i16 {
            self.0
        }

        #[inline]
        pub fn mm(self) -> f64 {
            f64::from(self.0) / 100.0
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "UPPERCASE")]
    pub enum Linetype {
        Continuous,
        Dashed,
    }

    impl Linetype {
        pub const ALL: [Linetype; 2] = [Linetype::Continuous, Linetype::Dashed];

        pub fn dxf_name(self) -> &'static str {
            match self {
                Linetype::Continuous => "CONTINUOUS",
                Linetype::Dashed => "DASHED",
            }
        }

        pub fn description(self) -> &'static str {
            match self {
                Linetype::Continuous => "Solid line",
                Linetype::Dashed => "Dashed __ __ __ __ __ __ __ __ __ __ __ __ __ _",
            }
        }

        /// 线型图案（正值为实线段，负值为间隙），与 acad.lin 中的 DASHED 一致。
        pub fn pattern(self) -> &'static [f64] {
            match self {
                Linetype::Continuous => &[],
                Linetype::Dashed => &[0.5, -0.25],
            }
        }

        pub fn from_name(name: &str) -> Option<Self> {
            Self::ALL
                .into_iter()
                .find(|linetype| linetype.dxf_name().eq_ignore_ascii_case(name.trim()))
        }
    }

    /// 图层样式：ACI 颜色、线宽与线型。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct LayerStyle {
        pub color: u8,
        pub lineweight: Lineweight,
        pub linetype: Linetype,
    }

    impl LayerStyle {
        #[inline]
        pub const fn new(color: u8, lineweight: Lineweight, linetype: Linetype) -> Self {
            Self {
                color,
                lineweight,
                linetype,
            }
        }
    }

    impl Default for LayerStyle {
        fn default() -> Self {
            Self::new(7, Lineweight::DEFAULT, Linetype::Continuous)
        }
    }

    /// 图元在图纸中的用途，每种用途映射到唯一的图层。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum DraftingRole {
        Wall,
        WallPattern,
        Door,
        DoorSwing,
        Glazing,
        Dimension,
        Text,
        NorthArrow,
    }

    impl DraftingRole {
        pub const COUNT: usize = 8;
        pub const ALL: [DraftingRole; Self::COUNT] = [
            DraftingRole::Wall,
            DraftingRole::WallPattern,
            DraftingRole::Door,
            DraftingRole::DoorSwing,
            DraftingRole::Glazing,
            DraftingRole::Dimension,
            DraftingRole::Text,
            DraftingRole::NorthArrow,
        ];

        #[inline]
        fn index(self) -> usize {
            self as usize
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct LayerDefinition {
        pub name: String,
        pub style: LayerStyle,
    }

    impl LayerDefinition {
        pub fn new(name: impl Into<String>, style: LayerStyle) -> Self {
            Self {
                name: name.into(),
                style,
            }
        }
    }

    /// 固定的图层样式表，按 [`DraftingRole`] 索引。
    #[derive(Debug, Clone, PartialEq)]
    pub struct StyleTable {
        layers: [LayerDefinition; DraftingRole::COUNT],
    }

    impl StyleTable {
        /// 以 `DraftingRole::ALL` 的顺序提供每个用途的图层定义。
        pub fn new(layers: [LayerDefinition; DraftingRole::COUNT]) -> Self {
            Self { layers }
        }

        /// AIA 国家 CAD 标准图层表。
        pub fn aia() -> Self {
            use Linetype::{Continuous, Dashed};
            let layer = |name: &str, color: u8, weight: i16, linetype: Linetype| {
                LayerDefinition::new(
                    name,
                    LayerStyle::new(color, Lineweight::from_hundredths(weight), linetype),
                )
            };
            Self::new([
                layer("A-WALL", 7, 50, Continuous),
                layer("A-WALL-PATT", 8, 15, Continuous),
                layer("A-DOOR", 4, 25, Continuous),
                layer("A-DOOR-SWING", 3, 13, Dashed),
                layer("A-GLAZ", 4, 25, Continuous),
                layer("A-ANNO-DIMS", 6, 15, Continuous),
                layer("A-ANNO-TEXT", 2, 18, Continuous),
                layer("A-ANNO-NRTH", 2, 18, Continuous),
            ])
        }

        #[inline]
        pub fn layer(&self, role: DraftingRole) -> &LayerDefinition {
            &self.layers[role.index()]
        }

        #[inline]
        pub fn layer_name(&self, role: DraftingRole) -> &str {
            &self.layer(role).name
        }

        #[inline]
        pub fn style(&self, role: DraftingRole) -> LayerStyle {
            self.layer(role).style
        }

        pub fn find(&self, name: &str) -> Option<&LayerDefinition> {
            self.layers.iter().find(|layer| layer.name == name)
        }

        /// 将全部图层（含样式）登记到文档。
        pub fn apply_to(&self, document: &mut Document) {
            for layer in &self.layers {
                document.set_layer(Layer::with_style(layer.name.clone(), layer.style));
            }
        }
    }

    impl Default for StyleTable {
        fn default() -> Self {
            Self::aia()
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn aia_table_matches_standard() {
            let table = StyleTable::aia();
            let expected = [
                (DraftingRole::Wall, "A-WALL", 7, 50, Linetype::Continuous),
                (DraftingRole::WallPattern, "A-WALL-PATT", 8, 15, Linetype::Continuous),
                (DraftingRole::Door, "A-DOOR", 4, 25, Linetype::Continuous),
                (DraftingRole::DoorSwing, "A-DOOR-SWING", 3, 13, Linetype::Dashed),
                (DraftingRole::Glazing, "A-GLAZ", 4, 25, Linetype::Continuous),
                (DraftingRole::Dimension, "A-ANNO-DIMS", 6, 15, Linetype::Continuous),
                (DraftingRole::Text, "A-ANNO-TEXT", 2, 18, Linetype::Continuous),
                (DraftingRole::NorthArrow, "A-ANNO-NRTH", 2, 18, Linetype::Continuous),
            ];
            for (role, name, color, weight, linetype) in expected {
                let layer = table.layer(role);
                assert_eq!(layer.name, name);
                assert_eq!(layer.style.color, color);
                assert_eq!(layer.style.lineweight.hundredths(), weight);
                assert_eq!(layer.style.linetype, linetype);
            }
            assert!((table.style(DraftingRole::Wall).lineweight.mm() - 0.5).abs() < 1e-12);
            assert!(table.find("A-ANNO-DIMS").is_some());
            assert!(table.find("A-UNKNOWN").is_none());
        }

        #[test]
        fn apply_registers_styled_layers() {
            let mut doc = Document::new();
            StyleTable::aia().apply_to(&mut doc);
            let swing = doc.layer("A-DOOR-SWING").expect("应登记门扇图层");
            assert_eq!(swing.style.linetype, Linetype::Dashed);
            assert_eq!(doc.layers().count(), DraftingRole::COUNT + 1);
        }

        #[test]
        fn linetype_lookup_is_case_insensitive() {
            assert_eq!(Linetype::from_name("dashed"), Some(Linetype::Dashed));
            assert_eq!(Linetype::from_name(" Continuous "), Some(Linetype::Continuous));
            assert_eq!(Linetype::from_name("HIDDEN"), None);
        }
    }
}

pub mod document {
    use std::collections::BTreeMap;
    use std::f64::consts::{FRAC_PI_2, PI, TAU};

    use serde::{Deserialize, Serialize};

    use crate::geometry::{Bounds2D, Point2, Vector2};
    use crate::style::LayerStyle;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct EntityId(u64);

    impl EntityId {
        #[inline]
        pub fn new(raw: u64) -> Self {
            Self(raw)
        }

        /// 提供原始数值，便于序列化或日志输出。
        #[inline]
        pub fn get(self) -> u64 {
            self.0
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Layer {
        pub name: String,
        pub is_visible: bool,
        #[serde(default)]
        pub style: LayerStyle,
    }

    impl Layer {
        #[inline]
        pub fn new(name: impl Into<String>) -> Self {
            Self::with_style(name, LayerStyle::default())
        }

        #[inline]
        pub fn with_style(name: impl Into<String>, style: LayerStyle) -> Self {
            Self {
                name: name.into(),
                is_visible: true,
                style,
            }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub enum Entity {
        Line(Line),
        Circle(Circle),
        Arc(Arc),
        Polyline(Polyline),
        Text(Text),
        Hatch(Hatch),
        Dimension(Dimension),
        Solid(Solid),
    }

    impl Entity {
        #[inline]
        pub fn layer_name(&self) -> &str {
            match self {
                Entity::Line(line) => &line.layer,
                Entity::Circle(circle) => &circle.layer,
                Entity::Arc(arc) => &arc.layer,
                Entity::Polyline(polyline) => &polyline.layer,
                Entity::Text(text) => &text.layer,
                Entity::Hatch(hatch) => &hatch.layer,
                Entity::Dimension(dimension) => &dimension.layer,
                Entity::Solid(solid) => &solid.layer,
            }
        }

        /// DXF 实体类型名。
        pub fn kind_name(&self) -> &'static str {
            match self {
                Entity::Line(_) => "LINE",
                Entity::Circle(_) => "CIRCLE",
                Entity::Arc(_) => "ARC",
                Entity::Polyline(_) => "LWPOLYLINE",
                Entity::Text(_) => "TEXT",
                Entity::Hatch(_) => "HATCH",
                Entity::Dimension(_) => "DIMENSION",
                Entity::Solid(_) => "SOLID",
            }
        }

        /// 计算实体的 2D 轴对齐范围，文字退化为插入点。
        pub fn bounds(&self) -> Option<Bounds2D> {
            let mut bounds = Bounds2D::empty();
            match self {
                Entity::Line(line) => {
                    bounds.include_point(line.start);
                    bounds.include_point(line.end);
                }
                Entity::Circle(circle) => {
                    let radius = circle.radius.abs();
                    let center = circle.center;
                    bounds.include_point(Point2::new(center.x() - radius, center.y() - radius));
                    bounds.include_point(Point2::new(center.x() + radius, center.y() + radius));
                }
                Entity::Arc(arc) => {
                    arc_bounds(arc, &mut bounds);
                }
                Entity::Polyline(polyline) => {
                    for vertex in &polyline.vertices {
                        bounds.include_point(*vertex);
                    }
                }
                Entity::Text(text) => {
                    bounds.include_point(text.insert);
                }
                Entity::Hatch(hatch) => {
                    for loop_path in &hatch.loops {
                        for edge in &loop_path.edges {
                            bounds.include_point(edge.start);
                            bounds.include_point(edge.end);
                        }
                    }
                }
                Entity::Dimension(dimension) => {
                    bounds.include_point(dimension.definition_point);
                    bounds.include_point(dimension.text_midpoint);
                    bounds.include_point(dimension.first_point);
                    bounds.include_point(dimension.second_point);
                }
                Entity::Solid(solid) => {
                    for vertex in &solid.vertices {
                        bounds.include_point(*vertex);
                    }
                }
            }
            if bounds.is_empty() {
                None
            } else {
                Some(bounds)
            }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Line {
        pub start: Point2,
        pub end: Point2,
        pub layer: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Circle {
        pub center: Point2,
        pub radius: f64,
        pub layer: String,
    }

    /// 圆弧实体，角度以弧度形式储存，遵循数学正方向（逆时针）。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Arc {
        pub center: Point2,
        pub radius: f64,
        pub start_angle: f64,
        pub end_angle: f64,
        pub layer: String,
    }

    impl Arc {
        /// 逆时针扫过的角度（弧度）。
        pub fn sweep(&self) -> f64 {
            let (start, end) = canonical_interval(self.start_angle, self.end_angle);
            end - start
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Polyline {
        pub vertices: Vec<Point2>,
        pub is_closed: bool,
        pub layer: String,
    }

    /// 单行文字的对齐方式。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum TextAlignment {
        #[default]
        BaselineLeft,
        MiddleCenter,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Text {
        pub insert: Point2,
        pub content: String,
        pub height: f64,
        pub rotation: f64,
        #[serde(default)]
        pub alignment: TextAlignment,
        pub layer: String,
    }

    /// 填充边界中的直线边。
    #[derive(Debug, Clone, Copy, Serialize, Deserialize)]
    pub struct HatchEdge {
        pub start: Point2,
        pub end: Point2,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct HatchLoop {
        pub is_polyline: bool,
        pub is_closed: bool,
        pub edges: Vec<HatchEdge>,
    }

    impl HatchLoop {
        /// 由闭合多边形顶点构造多段线边界。
        pub fn polygon(vertices: &[Point2]) -> Self {
            let n = vertices.len();
            let edges = (0..n)
                .map(|i| HatchEdge {
                    start: vertices[i],
                    end: vertices[(i + 1) % n],
                })
                .collect();
            Self {
                is_polyline: true,
                is_closed: true,
                edges,
            }
        }

        /// 按顺序列出边界顶点。
        pub fn vertices(&self) -> Vec<Point2> {
            self.edges.iter().map(|edge| edge.start).collect()
        }
    }

    /// 图案填充中的单条图案线（角度为弧度，偏移为世界坐标）。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct PatternLine {
        pub angle: f64,
        pub base: Point2,
        pub offset: Vector2,
        pub dashes: Vec<f64>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct HatchPattern {
        pub angle: f64,
        pub scale: f64,
        pub lines: Vec<PatternLine>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Hatch {
        pub pattern_name: String,
        pub is_solid: bool,
        pub loops: Vec<HatchLoop>,
        pub pattern: Option<HatchPattern>,
        pub layer: String,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub enum DimensionKind {
        Linear,
        Aligned,
        Unknown(i16),
    }

    /// 线性/对齐尺寸标注。`first_point`/`second_point` 为两条尺寸界线的原点，
    /// `definition_point` 位于尺寸线上。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Dimension {
        pub kind: DimensionKind,
        pub definition_point: Point2,
        pub text_midpoint: Point2,
        pub first_point: Point2,
        pub second_point: Point2,
        pub text: Option<String>,
        pub measurement: Option<f64>,
        pub rotation: f64,
        pub block_name: Option<String>,
        pub layer: String,
    }

    /// 实心填充三角/四边形（SOLID），三角形时第四点与第三点重合。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Solid {
        pub vertices: [Point2; 4],
        pub layer: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct BlockDefinition {
        pub name: String,
        pub base_point: Point2,
        pub entities: Vec<Entity>,
    }

    #[derive(Debug, Default, Clone, Serialize, Deserialize)]
    pub struct Document {
        layers: BTreeMap<String, Layer>,
        entities: Vec<(EntityId, Entity)>,
        next_entity_id: u64,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        blocks: Vec<BlockDefinition>,
    }

    impl Document {
        pub fn new() -> Self {
            let mut doc = Self::default();
            doc.ensure_layer("0");
            doc
        }

        pub fn ensure_layer(&mut self, name: impl AsRef<str>) {
            let key = name.as_ref();
            self.layers
                .entry(key.to_string())
                .or_insert_with(|| Layer::new(key));
        }

        /// 新增或覆盖图层定义。
        pub fn set_layer(&mut self, layer: Layer) {
            self.layers.insert(layer.name.clone(), layer);
        }

        pub fn layer(&self, name: &str) -> Option<&Layer> {
            self.layers.get(name)
        }

        /// 实体所在图层的样式；图层未登记时返回默认样式。
        pub fn style_of(&self, entity: &Entity) -> LayerStyle {
            self.layer(entity.layer_name())
                .map(|layer| layer.style)
                .unwrap_or_default()
        }

        pub fn add_line(
            &mut self,
            start: Point2,
            end: Point2,
            layer: impl Into<String>,
        ) -> EntityId {
            let layer = layer.into();
            self.push(Entity::Line(Line { start, end, layer }))
        }

        pub fn add_circle(
            &mut self,
            center: Point2,
            radius: f64,
            layer: impl Into<String>,
        ) -> EntityId {
            let layer = layer.into();
            self.push(Entity::Circle(Circle {
                center,
                radius,
                layer,
            }))
        }

        pub fn add_arc(
            &mut self,
            center: Point2,
            radius: f64,
            start_angle: f64,
            end_angle: f64,
            layer: impl Into<String>,
        ) -> EntityId {
            let layer = layer.into();
            self.push(Entity::Arc(Arc {
                center,
                radius,
                start_angle,
                end_angle,
                layer,
            }))
        }

        pub fn add_polyline<I>(
            &mut self,
            vertices: I,
            is_closed: bool,
            layer: impl Into<String>,
        ) -> EntityId
        where
            I: IntoIterator<Item = Point2>,
        {
            let layer = layer.into();
            self.push(Entity::Polyline(Polyline {
                vertices: vertices.into_iter().collect(),
                is_closed,
                layer,
            }))
        }

        pub fn add_text(
            &mut self,
            insert: Point2,
            content: impl Into<String>,
            height: f64,
            rotation: f64,
            alignment: TextAlignment,
            layer: impl Into<String>,
        ) -> EntityId {
            let layer = layer.into();
            self.push(Entity::Text(Text {
                insert,
                content: content.into(),
                height,
                rotation,
                alignment,
                layer,
            }))
        }

        pub fn add_hatch(
            &mut self,
            pattern_name: impl Into<String>,
            is_solid: bool,
            loops: Vec<HatchLoop>,
            pattern: Option<HatchPattern>,
            layer: impl Into<String>,
        ) -> EntityId {
            let layer = layer.into();
            self.push(Entity::Hatch(Hatch {
                pattern_name: pattern_name.into(),
                is_solid,
                loops,
                pattern,
                layer,
            }))
        }

        pub fn add_dimension(&mut self, dimension: Dimension) -> EntityId {
            self.push(Entity::Dimension(dimension))
        }

        pub fn add_solid(&mut self, vertices: [Point2; 4], layer: impl Into<String>) -> EntityId {
            let layer = layer.into();
            self.push(Entity::Solid(Solid { vertices, layer }))
        }

        pub fn add_entity(&mut self, entity: Entity) -> EntityId {
            self.push(entity)
        }

        pub fn layers(&self) -> impl Iterator<Item = &Layer> {
            self.layers.values()
        }

        pub fn entities(&self) -> impl Iterator<Item = &(EntityId, Entity)> {
            self.entities.iter()
        }

        /// 指定图层上的全部实体。
        pub fn entities_on<'a>(&'a self, layer: &'a str) -> impl Iterator<Item = &'a Entity> + 'a {
            self.entities
                .iter()
                .map(|(_, entity)| entity)
                .filter(move |entity| entity.layer_name() == layer)
        }

        /// 登记块定义；同名块会被替换。
        pub fn add_block_definition(&mut self, definition: BlockDefinition) {
            for entity in &definition.entities {
                let layer = entity.layer_name().to_string();
                self.ensure_layer(layer);
            }
            if let Some(existing) = self
                .blocks
                .iter_mut()
                .find(|block| block.name == definition.name)
            {
                *existing = definition;
            } else {
                self.blocks.push(definition);
            }
        }

        pub fn block(&self, name: &str) -> Option<&BlockDefinition> {
            self.blocks.iter().find(|block| block.name == name)
        }

        pub fn blocks(&self) -> impl Iterator<Item = &BlockDefinition> {
            self.blocks.iter()
        }

        pub fn entity(&self, id: EntityId) -> Option<&Entity> {
            self.entities
                .iter()
                .find(|(entity_id, _)| *entity_id == id)
                .map(|(_, entity)| entity)
        }

        pub fn entity_bounds(&self, id: EntityId) -> Option<Bounds2D> {
            self.entity(id).and_then(Entity::bounds)
        }

        pub fn bounds(&self) -> Option<Bounds2D> {
            let mut bounds = Bounds2D::empty();
            let mut has = false;
            for (_, entity) in &self.entities {
                if let Some(entity_bounds) = entity.bounds() {
                    bounds.include_bounds(&entity_bounds);
                    has = true;
                }
            }
            if has { Some(bounds) } else { None }
        }

        fn push(&mut self, entity: Entity) -> EntityId {
            self.ensure_layer(entity.layer_name());
            let id = self.next_id();
            self.entities.push((id, entity));
            id
        }

        #[inline]
        fn next_id(&mut self) -> EntityId {
            let id = self.next_entity_id;
            self.next_entity_id += 1;
            EntityId(id)
        }
    }

    pub fn normalize_angle(angle: f64) -> f64 {
        let mut result = angle % TAU;
        if result < 0.0 {
            result += TAU;
        }
        result
    }

    fn canonical_interval(start: f64, end: f64) -> (f64, f64) {
        let start = normalize_angle(start);
        let mut end = normalize_angle(end);
        if (end - start).abs() < 1e-9 {
            end = start + TAU;
        } else if end < start {
            end += TAU;
        }
        (start, end)
    }

    fn arc_point(center: Point2, radius: f64, angle: f64) -> Point2 {
        let offset = Vector2::new(radius * angle.cos(), radius * angle.sin());
        center.translate(offset)
    }

    fn arc_bounds(arc: &Arc, bounds: &mut Bounds2D) {
        let radius = arc.radius.abs();
        if radius <= f64::EPSILON {
            bounds.include_point(arc.center);
            return;
        }

        let (start, end) = canonical_interval(arc.start_angle, arc.end_angle);
        bounds.include_point(arc_point(arc.center, radius, start));
        bounds.include_point(arc_point(arc.center, radius, end));

        const QUADRANTS: [f64; 4] = [0.0, FRAC_PI_2, PI, FRAC_PI_2 * 3.0];
        for base in QUADRANTS {
            let mut candidate = base;
            while candidate < start {
                candidate += TAU;
            }
            if candidate <= end {
                bounds.include_point(arc_point(arc.center, radius, candidate));
            }
        }
    }

}
