use serde::Serialize;
use tracing::debug;
use vastu_core::document::{Document, HatchLoop, HatchPattern, PatternLine};
use vastu_core::geometry::{Point2, RectSide, Segment, Vector2};
use vastu_engine::Layout;

/// 墙体填充图案名，与 `ansi31` 生成的图案线一致。
pub const ANSI31: &str = "ANSI31";
/// ANSI31 在 acad.pat 中的基准线距。
const ANSI31_BASE_SPACING: f64 = 0.125;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    Horizontal,
    Vertical,
}

impl Axis {
    pub fn of_side(side: RectSide) -> Self {
        if side.is_horizontal() {
            Axis::Horizontal
        } else {
            Axis::Vertical
        }
    }

    /// 墙所在直线的法向（+Y 或 +X）。
    fn normal(self) -> Vector2 {
        match self {
            Axis::Horizontal => Vector2::new(0.0, 1.0),
            Axis::Vertical => Vector2::new(1.0, 0.0),
        }
    }

    fn point(self, line: f64, along: f64) -> Point2 {
        match self {
            Axis::Horizontal => Point2::new(along, line),
            Axis::Vertical => Point2::new(line, along),
        }
    }
}

/// 同一直线上合并后的最长墙段，共享墙只出现一次。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WallRun {
    pub axis: Axis,
    /// 所在直线坐标：水平墙为 y，竖直墙为 x。
    pub line: f64,
    pub start: f64,
    pub end: f64,
    pub is_exterior: bool,
    /// 外墙朝地块内侧的法向符号（+1/-1），内墙为 0。
    pub inward: f64,
    /// 贡献了该墙段的房间下标（升序、去重）。
    pub rooms: Vec<usize>,
    /// 门洞切分后剩余的实体区间。
    pub pieces: Vec<(f64, f64)>,
}

impl WallRun {
    #[inline]
    pub fn length(&self) -> f64 {
        self.end - self.start
    }

    pub fn segment(&self) -> Segment {
        Segment::new(
            self.axis.point(self.line, self.start),
            self.axis.point(self.line, self.end),
        )
    }

    /// 墙带相对中心线的法向范围：内墙居中，外墙整体偏向地块内侧。
    pub fn band_offsets(&self, thickness: f64) -> (f64, f64) {
        if self.is_exterior {
            let far = self.inward * thickness;
            (far.min(0.0), far.max(0.0))
        } else {
            (-thickness * 0.5, thickness * 0.5)
        }
    }

    /// 某个实体区间对应的闭合墙带（逆时针）。
    pub fn band(&self, piece: (f64, f64), thickness: f64) -> [Point2; 4] {
        let (lo, hi) = self.band_offsets(thickness);
        let (a, b) = piece;
        let p = |along: f64, offset: f64| self.axis.point(self.line + offset, along);
        match self.axis {
            Axis::Horizontal => [p(a, lo), p(b, lo), p(b, hi), p(a, hi)],
            Axis::Vertical => [p(a, lo), p(a, hi), p(b, hi), p(b, lo)],
        }
    }

    fn subtract(&mut self, cut: (f64, f64), tolerance: f64) {
        let mut kept = Vec::with_capacity(self.pieces.len() + 1);
        for &(lo, hi) in &self.pieces {
            if cut.1 <= lo + tolerance || cut.0 >= hi - tolerance {
                kept.push((lo, hi));
                continue;
            }
            if cut.0 - lo > tolerance {
                kept.push((lo, cut.0));
            }
            if hi - cut.1 > tolerance {
                kept.push((cut.1, hi));
            }
        }
        self.pieces = kept;
    }
}

struct SideEntry {
    axis: Axis,
    line: f64,
    start: f64,
    end: f64,
    room: usize,
}

/// 收集所有房间边并按直线合并为最长墙段。
pub fn collect_runs(layout: &Layout, tolerance: f64) -> Vec<WallRun> {
    let mut entries: Vec<SideEntry> = Vec::with_capacity(layout.rooms.len() * 4);
    for (index, room) in layout.rooms.iter().enumerate() {
        let rect = room.rect;
        let (x0, y0, x1, y1) = (rect.min().x(), rect.min().y(), rect.max().x(), rect.max().y());
        entries.extend([
            SideEntry { axis: Axis::Horizontal, line: y0, start: x0, end: x1, room: index },
            SideEntry { axis: Axis::Horizontal, line: y1, start: x0, end: x1, room: index },
            SideEntry { axis: Axis::Vertical, line: x0, start: y0, end: y1, room: index },
            SideEntry { axis: Axis::Vertical, line: x1, start: y0, end: y1, room: index },
        ]);
    }
    entries.sort_by(|a, b| {
        a.axis
            .cmp(&b.axis)
            .then_with(|| a.line.total_cmp(&b.line))
            .then_with(|| a.start.total_cmp(&b.start))
    });

    let mut lines: Vec<Vec<SideEntry>> = Vec::new();
    for entry in entries {
        match lines.last_mut() {
            Some(group)
                if group[0].axis == entry.axis
                    && (group[0].line - entry.line).abs() <= tolerance =>
            {
                group.push(entry)
            }
            _ => lines.push(vec![entry]),
        }
    }

    let mut runs = Vec::new();
    for mut group in lines {
        group.sort_by(|a, b| a.start.total_cmp(&b.start));
        let axis = group[0].axis;
        let line = group[0].line;
        let mut current: Option<(f64, f64, Vec<usize>)> = None;
        for entry in group {
            current = match current {
                Some((start, end, mut rooms)) if entry.start <= end + tolerance => {
                    rooms.push(entry.room);
                    Some((start, end.max(entry.end), rooms))
                }
                Some((start, end, rooms)) => {
                    runs.push(finish_run(layout, axis, line, start, end, rooms, tolerance));
                    Some((entry.start, entry.end, vec![entry.room]))
                }
                None => Some((entry.start, entry.end, vec![entry.room])),
            };
        }
        if let Some((start, end, rooms)) = current {
            runs.push(finish_run(layout, axis, line, start, end, rooms, tolerance));
        }
    }
    runs
}

fn finish_run(
    layout: &Layout,
    axis: Axis,
    line: f64,
    start: f64,
    end: f64,
    mut rooms: Vec<usize>,
    tolerance: f64,
) -> WallRun {
    rooms.sort_unstable();
    rooms.dedup();
    let mut run = WallRun {
        axis,
        line,
        start,
        end,
        is_exterior: false,
        inward: 0.0,
        rooms,
        pieces: vec![(start, end)],
    };
    let segment = run.segment();
    let on_boundary: f64 = layout
        .plot
        .boundary_overlaps(&segment, tolerance)
        .iter()
        .map(Segment::length)
        .sum();
    if on_boundary >= run.length() * 0.5 {
        run.is_exterior = true;
        let probe = (run.length() * 1e-3).max(tolerance * 10.0);
        let test = segment.midpoint().translate(axis.normal().scale(probe));
        run.inward = if layout.plot.boundary().contains_point_strict(test, tolerance) {
            1.0
        } else {
            -1.0
        };
    }
    run
}

/// 按门洞把墙段切开。
pub fn cut_at_doors(runs: &mut [WallRun], layout: &Layout, tolerance: f64) {
    for room in &layout.rooms {
        for opening in &room.openings {
            let segment = opening.segment(&room.rect);
            let axis = Axis::of_side(opening.side);
            let (line, a, b) = match axis {
                Axis::Horizontal => (segment.start.y(), segment.start.x(), segment.end.x()),
                Axis::Vertical => (segment.start.x(), segment.start.y(), segment.end.y()),
            };
            let cut = (a.min(b), a.max(b));
            if let Some(run) = runs.iter_mut().find(|run| {
                run.axis == axis
                    && (run.line - line).abs() <= tolerance
                    && cut.0 >= run.start - tolerance
                    && cut.1 <= run.end + tolerance
            }) {
                run.subtract(cut, tolerance);
            }
        }
    }
}

/// ANSI31 斜线图案：`angle_deg` 为图案角度，`spacing` 为实际线距。
pub fn ansi31(angle_deg: f64, spacing: f64) -> HatchPattern {
    let angle = angle_deg.to_radians();
    HatchPattern {
        angle,
        scale: spacing / ANSI31_BASE_SPACING,
        lines: vec![PatternLine {
            angle,
            base: Point2::new(0.0, 0.0),
            offset: Vector2::new(-spacing * angle.sin(), spacing * angle.cos()),
            dashes: Vec::new(),
        }],
    }
}

/// 输出墙带多段线及其填充，返回墙带数量。
pub fn emit_walls(
    document: &mut Document,
    runs: &[WallRun],
    thickness: f64,
    pattern: &HatchPattern,
    wall_layer: &str,
    pattern_layer: &str,
) -> usize {
    let mut bands = 0;
    for run in runs {
        for &piece in &run.pieces {
            let band = run.band(piece, thickness);
            document.add_polyline(band, true, wall_layer);
            document.add_hatch(
                ANSI31,
                false,
                vec![HatchLoop::polygon(&band)],
                Some(pattern.clone()),
                pattern_layer,
            );
            bands += 1;
        }
    }
    debug!(runs = runs.len(), bands, "墙体已输出");
    bands
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{side_by_side, with_door};
    use vastu_core::geometry::Rect;
    use vastu_engine::model::{Adjoining, Opening};

    #[test]
    fn shared_wall_is_emitted_once() {
        let layout = side_by_side();
        let runs = collect_runs(&layout, 1e-6);
        let shared: Vec<&WallRun> = runs
            .iter()
            .filter(|run| run.axis == Axis::Vertical && (run.line - 4.0).abs() < 1e-9)
            .collect();
        assert_eq!(shared.len(), 1);
        assert_eq!(shared[0].rooms, vec![0, 1]);
        assert!(!shared[0].is_exterior);

        // 上下两条外墙各被合并为整条 0..8
        let bottom: Vec<&WallRun> = runs
            .iter()
            .filter(|run| run.axis == Axis::Horizontal && run.line.abs() < 1e-9)
            .collect();
        assert_eq!(bottom.len(), 1);
        assert!((bottom[0].length() - 8.0).abs() < 1e-9);
        assert_eq!(runs.len(), 5);
    }

    #[test]
    fn exterior_bands_stay_inside_the_plot() {
        let layout = side_by_side();
        let runs = collect_runs(&layout, 1e-6);
        let plot = layout.plot.bounds_rect();
        for run in runs.iter().filter(|run| run.is_exterior) {
            for corner in run.band(run.pieces[0], 0.23) {
                assert!(plot.contains_point(corner, 1e-9), "{corner:?} 超出地块");
            }
        }
    }

    #[test]
    fn doors_split_their_run() {
        let layout = with_door(
            side_by_side(),
            0,
            Opening {
                side: RectSide::Right,
                offset: 2.0,
                width: 0.9,
                adjoining: Adjoining::Room(1),
            },
        );
        let mut runs = collect_runs(&layout, 1e-6);
        cut_at_doors(&mut runs, &layout, 1e-6);
        let shared = runs
            .iter()
            .find(|run| run.axis == Axis::Vertical && (run.line - 4.0).abs() < 1e-9)
            .expect("共享墙存在");
        assert_eq!(shared.pieces.len(), 2);
        assert!((shared.pieces[0].1 - 1.55).abs() < 1e-9);
        assert!((shared.pieces[1].0 - 2.45).abs() < 1e-9);
    }

    #[test]
    fn band_is_counter_clockwise() {
        let run = WallRun {
            axis: Axis::Vertical,
            line: 4.0,
            start: 0.0,
            end: 4.0,
            is_exterior: false,
            inward: 0.0,
            rooms: vec![0, 1],
            pieces: vec![(0.0, 4.0)],
        };
        let band = run.band((0.0, 4.0), 0.2);
        let polygon = vastu_core::geometry::Polygon::new(band.to_vec());
        assert!(polygon.signed_area() > 0.0);
        assert!((polygon.area() - 0.8).abs() < 1e-9);
        assert!(Rect::new(3.9, 0.0, 4.1, 4.0).contains_point(band[2], 1e-12));
    }

    #[test]
    fn every_band_is_hatched_with_ansi31_geometry() {
        let layout = side_by_side();
        let runs = collect_runs(&layout, 1e-6);
        let pattern = ansi31(30.0, 0.1);
        let mut document = Document::new();
        let bands = emit_walls(&mut document, &runs, 0.2, &pattern, "A-WALL", "A-WALL-PATT");
        let hatches: Vec<_> = document
            .entities_on("A-WALL-PATT")
            .filter_map(|entity| match entity {
                vastu_core::document::Entity::Hatch(hatch) => Some(hatch),
                _ => None,
            })
            .collect();
        assert_eq!(hatches.len(), bands);
        for hatch in hatches {
            assert_eq!(hatch.pattern_name, ANSI31);
            let lines = &hatch.pattern.as_ref().expect("填充应带图案线").lines;
            assert_eq!(lines.len(), 1);
            assert!((lines[0].angle - 30.0_f64.to_radians()).abs() < 1e-12);
            assert!((lines[0].offset.length() - 0.1).abs() < 1e-12);
        }
    }

    #[test]
    fn ansi31_offset_is_perpendicular() {
        let pattern = ansi31(45.0, 0.05);
        let line = &pattern.lines[0];
        assert!((line.offset.length() - 0.05).abs() < 1e-12);
        let direction = Vector2::new(line.angle.cos(), line.angle.sin());
        assert!(direction.dot(line.offset).abs() < 1e-12);
        assert!((pattern.scale - 0.4).abs() < 1e-12);
    }
}
