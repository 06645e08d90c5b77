use std::fmt::{self, Write as _};

use vastu_config::DrawingUnits;
use vastu_core::document::{
    Arc, BlockDefinition, Circle, Dimension, DimensionKind, Document, Entity, Hatch, HatchPattern,
    Line, Polyline, Solid, Text, TextAlignment,
};
use vastu_core::geometry::Point2;
use vastu_core::style::Linetype;

const MODEL_SPACE: &str = "*Model_Space";
const PAPER_SPACE: &str = "*Paper_Space";
const STANDARD: &str = "Standard";
/// 未找到尺寸文字时 DIMSTYLE 使用的字高。
const DEFAULT_DIMENSION_TEXT: f64 = 0.18;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Handle(u32);

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:X}", self.0)
    }
}

/// 浮点组值：固定 6 位小数，避免输出 `-0.000000`。
struct Real(f64);

impl fmt::Display for Real {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = if self.0.abs() < 5e-7 { 0.0 } else { self.0 };
        write!(f, "{value:.6}")
    }
}

pub(crate) fn render(document: &Document, units: DrawingUnits) -> String {
    let mut writer = DxfWriter::new(document);
    writer.tables();
    writer.blocks();
    writer.entities();
    writer.objects();
    let body = std::mem::take(&mut writer.out);

    writer.header(units);
    let mut text = writer.out;
    text.push_str(&body);
    text.push_str("  0\nEOF\n");
    text
}

struct DxfWriter<'a> {
    document: &'a Document,
    out: String,
    next_handle: u32,
    block_records: Vec<(String, Handle)>,
}

impl<'a> DxfWriter<'a> {
    fn new(document: &'a Document) -> Self {
        Self {
            document,
            out: String::new(),
            // 1..=F 预留给根字典等固定对象
            next_handle: 0x10,
            block_records: Vec::new(),
        }
    }

    fn allocate(&mut self) -> Handle {
        let handle = Handle(self.next_handle);
        self.next_handle += 1;
        handle
    }

    fn pair(&mut self, code: i32, value: impl fmt::Display) {
        let _ = writeln!(self.out, "{code:>3}\n{value}");
    }

    fn real(&mut self, code: i32, value: f64) {
        self.pair(code, Real(value));
    }

    fn point(&mut self, code: i32, point: Point2) {
        self.real(code, point.x());
        self.real(code + 10, point.y());
        self.real(code + 20, 0.0);
    }

    fn begin_section(&mut self, name: &str) {
        self.pair(0, "SECTION");
        self.pair(2, name);
    }

    fn end_section(&mut self) {
        self.pair(0, "ENDSEC");
    }

    fn record_handle(&self, name: &str) -> Handle {
        self.block_records
            .iter()
            .find(|(record, _)| record == name)
            .map(|(_, handle)| *handle)
            .unwrap_or(Handle(0))
    }

    fn header(&mut self, units: DrawingUnits) {
        let (min, max) = match self.document.bounds() {
            Some(bounds) => (bounds.min(), bounds.max()),
            None => (Point2::new(0.0, 0.0), Point2::new(0.0, 0.0)),
        };
        let seed = Handle(self.next_handle);

        self.begin_section("HEADER");
        self.pair(9, "$ACADVER");
        self.pair(1, "AC1015");
        self.pair(9, "$DWGCODEPAGE");
        self.pair(3, "ANSI_1252");
        self.pair(9, "$INSBASE");
        self.point(10, Point2::new(0.0, 0.0));
        self.pair(9, "$EXTMIN");
        self.point(10, min);
        self.pair(9, "$EXTMAX");
        self.point(10, max);
        self.pair(9, "$LUNITS");
        self.pair(70, 2);
        self.pair(9, "$INSUNITS");
        self.pair(70, units.insunits());
        self.pair(9, "$MEASUREMENT");
        self.pair(70, units.measurement());
        self.pair(9, "$LWDISPLAY");
        self.pair(290, 1);
        self.pair(9, "$HANDSEED");
        self.pair(5, seed);
        self.end_section();
    }

    fn begin_table(&mut self, name: &str, count: usize) -> Handle {
        let handle = self.allocate();
        self.pair(0, "TABLE");
        self.pair(2, name);
        self.pair(5, handle);
        self.pair(330, 0);
        self.pair(100, "AcDbSymbolTable");
        self.pair(70, count);
        handle
    }

    fn begin_record(&mut self, kind: &str, owner: Handle, subclass: &str) -> Handle {
        let handle = self.allocate();
        self.pair(0, kind);
        self.pair(5, handle);
        self.pair(330, owner);
        self.pair(100, "AcDbSymbolTableRecord");
        self.pair(100, subclass);
        handle
    }

    fn end_table(&mut self) {
        self.pair(0, "ENDTAB");
    }

    fn tables(&mut self) {
        self.begin_section("TABLES");
        self.vport_table();
        self.ltype_table();
        self.layer_table();
        self.style_table();
        for name in ["VIEW", "UCS"] {
            self.begin_table(name, 0);
            self.end_table();
        }
        self.appid_table();
        self.dimstyle_table();
        self.block_record_table();
        self.end_section();
    }

    fn vport_table(&mut self) {
        let (center, height) = match self.document.bounds() {
            Some(bounds) => {
                let rect = bounds.to_rect();
                (rect.centroid(), rect.height().max(rect.width()) * 1.2)
            }
            None => (Point2::new(0.0, 0.0), 10.0),
        };
        let table = self.begin_table("VPORT", 1);
        self.begin_record("VPORT", table, "AcDbViewportTableRecord");
        self.pair(2, "*ACTIVE");
        self.pair(70, 0);
        self.real(10, 0.0);
        self.real(20, 0.0);
        self.real(11, 1.0);
        self.real(21, 1.0);
        self.real(12, center.x());
        self.real(22, center.y());
        self.real(40, height.max(1.0));
        self.real(41, 1.5);
        self.end_table();
    }

    fn ltype_table(&mut self) {
        let table = self.begin_table("LTYPE", 2 + Linetype::ALL.len());
        for name in ["ByBlock", "ByLayer"] {
            self.begin_record("LTYPE", table, "AcDbLinetypeTableRecord");
            self.pair(2, name);
            self.pair(70, 0);
            self.pair(3, "");
            self.pair(72, 65);
            self.pair(73, 0);
            self.real(40, 0.0);
        }
        for linetype in Linetype::ALL {
            let pattern = linetype.pattern();
            self.begin_record("LTYPE", table, "AcDbLinetypeTableRecord");
            self.pair(2, linetype.dxf_name());
            self.pair(70, 0);
            self.pair(3, linetype.description());
            self.pair(72, 65);
            self.pair(73, pattern.len());
            self.real(40, pattern.iter().map(|dash| dash.abs()).sum());
            for dash in pattern {
                self.real(49, *dash);
                self.pair(74, 0);
            }
        }
        self.end_table();
    }

    fn layer_table(&mut self) {
        let layers: Vec<_> = self.document.layers().cloned().collect();
        let table = self.begin_table("LAYER", layers.len());
        for layer in layers {
            let color = i16::from(layer.style.color);
            self.begin_record("LAYER", table, "AcDbLayerTableRecord");
            self.pair(2, &layer.name);
            self.pair(70, 0);
            self.pair(62, if layer.is_visible { color } else { -color });
            self.pair(6, layer.style.linetype.dxf_name());
            self.pair(370, layer.style.lineweight.hundredths());
        }
        self.end_table();
    }

    fn style_table(&mut self) {
        let table = self.begin_table("STYLE", 1);
        self.begin_record("STYLE", table, "AcDbTextStyleTableRecord");
        self.pair(2, STANDARD);
        self.pair(70, 0);
        self.real(40, 0.0);
        self.real(41, 1.0);
        self.real(50, 0.0);
        self.pair(71, 0);
        self.real(42, 0.2);
        self.pair(3, "txt");
        self.pair(4, "");
        self.end_table();
    }

    fn appid_table(&mut self) {
        let table = self.begin_table("APPID", 1);
        self.begin_record("APPID", table, "AcDbRegAppTableRecord");
        self.pair(2, "ACAD");
        self.pair(70, 0);
        self.end_table();
    }

    fn dimstyle_table(&mut self) {
        let text_height = dimension_text_height(self.document);
        let table = self.allocate();
        self.pair(0, "TABLE");
        self.pair(2, "DIMSTYLE");
        self.pair(5, table);
        self.pair(330, 0);
        self.pair(100, "AcDbSymbolTable");
        self.pair(70, 1);
        self.pair(100, "AcDbDimStyleTable");
        self.pair(71, 0);

        let record = self.allocate();
        self.pair(0, "DIMSTYLE");
        self.pair(105, record);
        self.pair(330, table);
        self.pair(100, "AcDbSymbolTableRecord");
        self.pair(100, "AcDbDimStyleTableRecord");
        self.pair(2, STANDARD);
        self.pair(70, 0);
        self.real(40, 1.0);
        self.real(41, text_height);
        self.real(42, text_height * 0.5);
        self.real(43, 0.0);
        self.real(44, text_height);
        self.real(140, text_height);
        self.real(141, 0.0);
        self.real(147, text_height * 0.5);
        self.pair(77, 1);
        self.pair(271, 2);
        self.end_table();
    }

    fn block_record_table(&mut self) {
        let mut names = vec![MODEL_SPACE.to_string(), PAPER_SPACE.to_string()];
        names.extend(self.document.blocks().map(|block| block.name.clone()));

        let table = self.begin_table("BLOCK_RECORD", names.len());
        for name in names {
            let handle = self.begin_record("BLOCK_RECORD", table, "AcDbBlockTableRecord");
            self.pair(2, &name);
            self.block_records.push((name, handle));
        }
        self.end_table();
    }

    fn blocks(&mut self) {
        self.begin_section("BLOCKS");
        for name in [MODEL_SPACE, PAPER_SPACE] {
            let owner = self.record_handle(name);
            self.begin_block(name, Point2::new(0.0, 0.0), 0, owner);
            self.end_block(owner);
        }
        let document = self.document;
        for block in document.blocks() {
            self.block(block);
        }
        self.end_section();
    }

    fn block(&mut self, block: &BlockDefinition) {
        let owner = self.record_handle(&block.name);
        let flags = if block.name.starts_with('*') { 1 } else { 0 };
        self.begin_block(&block.name, block.base_point, flags, owner);
        for entity in &block.entities {
            self.entity(entity, owner);
        }
        self.end_block(owner);
    }

    fn begin_block(&mut self, name: &str, base: Point2, flags: i16, owner: Handle) {
        let handle = self.allocate();
        self.pair(0, "BLOCK");
        self.pair(5, handle);
        self.pair(330, owner);
        self.pair(100, "AcDbEntity");
        self.pair(8, "0");
        self.pair(100, "AcDbBlockBegin");
        self.pair(2, name);
        self.pair(70, flags);
        self.point(10, base);
        self.pair(3, name);
        self.pair(1, "");
    }

    fn end_block(&mut self, owner: Handle) {
        let handle = self.allocate();
        self.pair(0, "ENDBLK");
        self.pair(5, handle);
        self.pair(330, owner);
        self.pair(100, "AcDbEntity");
        self.pair(8, "0");
        self.pair(100, "AcDbBlockEnd");
    }

    fn entities(&mut self) {
        self.begin_section("ENTITIES");
        let owner = self.record_handle(MODEL_SPACE);
        let document = self.document;
        for (_, entity) in document.entities() {
            self.entity(entity, owner);
        }
        self.end_section();
    }

    fn entity(&mut self, entity: &Entity, owner: Handle) {
        let style = self.document.style_of(entity);
        let handle = self.allocate();
        self.pair(0, entity.kind_name());
        self.pair(5, handle);
        self.pair(330, owner);
        self.pair(100, "AcDbEntity");
        self.pair(8, entity.layer_name());
        self.pair(6, style.linetype.dxf_name());
        self.pair(62, style.color);
        self.pair(370, style.lineweight.hundredths());

        match entity {
            Entity::Line(line) => self.line(line),
            Entity::Circle(circle) => self.circle(circle),
            Entity::Arc(arc) => self.arc(arc),
            Entity::Polyline(polyline) => self.polyline(polyline),
            Entity::Text(text) => self.text(text),
            Entity::Hatch(hatch) => self.hatch(hatch),
            Entity::Dimension(dimension) => self.dimension(dimension),
            Entity::Solid(solid) => self.solid(solid),
        }
    }

    fn line(&mut self, line: &Line) {
        self.pair(100, "AcDbLine");
        self.point(10, line.start);
        self.point(11, line.end);
    }

    fn circle(&mut self, circle: &Circle) {
        self.pair(100, "AcDbCircle");
        self.point(10, circle.center);
        self.real(40, circle.radius);
    }

    fn arc(&mut self, arc: &Arc) {
        self.pair(100, "AcDbCircle");
        self.point(10, arc.center);
        self.real(40, arc.radius);
        self.pair(100, "AcDbArc");
        self.real(50, arc.start_angle.to_degrees());
        self.real(51, arc.end_angle.to_degrees());
    }

    fn polyline(&mut self, polyline: &Polyline) {
        self.pair(100, "AcDbPolyline");
        self.pair(90, polyline.vertices.len());
        self.pair(70, if polyline.is_closed { 1 } else { 0 });
        self.real(43, 0.0);
        for vertex in &polyline.vertices {
            self.real(10, vertex.x());
            self.real(20, vertex.y());
        }
    }

    fn text(&mut self, text: &Text) {
        self.pair(100, "AcDbText");
        self.point(10, text.insert);
        self.real(40, text.height);
        self.pair(1, encode_text(&text.content));
        self.real(50, text.rotation.to_degrees());
        self.pair(7, STANDARD);
        if text.alignment == TextAlignment::MiddleCenter {
            self.pair(72, 1);
            self.point(11, text.insert);
        }
        self.pair(100, "AcDbText");
        if text.alignment == TextAlignment::MiddleCenter {
            self.pair(73, 2);
        }
    }

    fn hatch(&mut self, hatch: &Hatch) {
        self.pair(100, "AcDbHatch");
        self.point(10, Point2::new(0.0, 0.0));
        self.real(210, 0.0);
        self.real(220, 0.0);
        self.real(230, 1.0);
        self.pair(2, &hatch.pattern_name);
        self.pair(70, if hatch.is_solid { 1 } else { 0 });
        self.pair(71, 0);
        self.pair(91, hatch.loops.len());
        for boundary in &hatch.loops {
            let vertices = boundary.vertices();
            self.pair(92, 2);
            self.pair(72, 0);
            self.pair(73, if boundary.is_closed { 1 } else { 0 });
            self.pair(93, vertices.len());
            for vertex in vertices {
                self.real(10, vertex.x());
                self.real(20, vertex.y());
            }
            self.pair(97, 0);
        }
        self.pair(75, 0);
        self.pair(76, 1);
        if let (false, Some(pattern)) = (hatch.is_solid, hatch.pattern.as_ref()) {
            self.pattern(pattern);
        }
        self.pair(98, 0);
    }

    fn pattern(&mut self, pattern: &HatchPattern) {
        self.real(52, pattern.angle.to_degrees());
        self.real(41, pattern.scale);
        self.pair(77, 0);
        self.pair(78, pattern.lines.len());
        for line in &pattern.lines {
            self.real(53, line.angle.to_degrees());
            self.real(43, line.base.x());
            self.real(44, line.base.y());
            self.real(45, line.offset.x());
            self.real(46, line.offset.y());
            self.pair(79, line.dashes.len());
            for dash in &line.dashes {
                self.real(49, *dash);
            }
        }
    }

    fn dimension(&mut self, dimension: &Dimension) {
        let (kind, subclass) = match dimension.kind {
            DimensionKind::Linear => (0, Some("AcDbRotatedDimension")),
            DimensionKind::Aligned => (1, None),
            DimensionKind::Unknown(flags) => (flags & 0x0F, None),
        };
        let flags = if dimension.block_name.is_some() { kind | 32 } else { kind };

        self.pair(100, "AcDbDimension");
        if let Some(block) = &dimension.block_name {
            self.pair(2, block);
        }
        self.point(10, dimension.definition_point);
        self.point(11, dimension.text_midpoint);
        self.pair(70, flags);
        if let Some(text) = &dimension.text {
            self.pair(1, encode_text(text));
        }
        self.pair(71, 5);
        if let Some(measurement) = dimension.measurement {
            self.real(42, measurement);
        }
        self.pair(3, STANDARD);
        self.pair(100, "AcDbAlignedDimension");
        self.point(13, dimension.first_point);
        self.point(14, dimension.second_point);
        if let Some(subclass) = subclass {
            self.real(50, dimension.rotation.to_degrees());
            self.pair(100, subclass);
        }
    }

    fn solid(&mut self, solid: &Solid) {
        self.pair(100, "AcDbTrace");
        for (index, vertex) in solid.vertices.iter().enumerate() {
            self.point(10 + index as i32, *vertex);
        }
    }

    fn objects(&mut self) {
        self.begin_section("OBJECTS");
        self.pair(0, "DICTIONARY");
        self.pair(5, Handle(0xC));
        self.pair(330, 0);
        self.pair(100, "AcDbDictionary");
        self.pair(281, 1);
        self.pair(3, "ACAD_GROUP");
        self.pair(350, Handle(0xD));
        self.pair(0, "DICTIONARY");
        self.pair(5, Handle(0xD));
        self.pair(330, Handle(0xC));
        self.pair(100, "AcDbDictionary");
        self.pair(281, 1);
        self.end_section();
    }
}

/// 非 ASCII 字符按 UTF-16 码元写为 `\U+XXXX`，BMP 以外的字符写成代理对。
fn encode_text(raw: &str) -> String {
    let mut encoded = String::with_capacity(raw.len());
    let mut units = [0u16; 2];
    for ch in raw.chars() {
        if ch.is_ascii() {
            encoded.push(ch);
            continue;
        }
        for unit in ch.encode_utf16(&mut units) {
            let _ = write!(encoded, "\\U+{unit:04X}");
        }
    }
    encoded
}

/// 取第一个尺寸块中文字的高度作为 DIMTXT。
fn dimension_text_height(document: &Document) -> f64 {
    document
        .blocks()
        .filter(|block| block.name.starts_with("*D"))
        .flat_map(|block| block.entities.iter())
        .find_map(|entity| match entity {
            Entity::Text(text) => Some(text.height),
            _ => None,
        })
        .unwrap_or(DEFAULT_DIMENSION_TEXT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vastu_core::style::StyleTable;

    fn pairs(text: &str) -> Vec<(i32, String)> {
        let lines: Vec<&str> = text.lines().collect();
        lines
            .chunks(2)
            .map(|chunk| {
                (
                    chunk[0].trim().parse().expect("组码应为整数"),
                    chunk[1].to_string(),
                )
            })
            .collect()
    }

    fn styled_document() -> Document {
        let mut document = Document::new();
        StyleTable::aia().apply_to(&mut document);
        document
    }

    #[test]
    fn header_carries_version_units_and_handseed() {
        let mut document = styled_document();
        document.add_line(Point2::new(0.0, 0.0), Point2::new(4.0, 3.0), "A-WALL");
        let text = render(&document, DrawingUnits::Millimeters);
        let pairs = pairs(&text);

        let value_after = |name: &str| {
            let index = pairs
                .iter()
                .position(|(code, value)| *code == 9 && value == name)
                .unwrap_or_else(|| panic!("缺少 {name}"));
            pairs[index + 1].1.clone()
        };
        assert_eq!(value_after("$ACADVER"), "AC1015");
        assert_eq!(value_after("$INSUNITS"), "4");
        assert_eq!(value_after("$MEASUREMENT"), "1");
        assert_eq!(value_after("$EXTMAX"), "4.000000");

        let seed = u32::from_str_radix(&value_after("$HANDSEED"), 16).expect("句柄应为十六进制");
        let header_end = pairs
            .iter()
            .position(|(code, value)| *code == 0 && value == "ENDSEC")
            .expect("HEADER 应有 ENDSEC");
        let max_handle = pairs[header_end..]
            .iter()
            .filter(|(code, _)| *code == 5 || *code == 105)
            .filter_map(|(_, value)| u32::from_str_radix(value, 16).ok())
            .max()
            .expect("应有句柄");
        assert!(seed > max_handle);
        assert_eq!(pairs.last().map(|(_, value)| value.as_str()), Some("EOF"));
    }

    #[test]
    fn handles_are_unique() {
        let mut document = styled_document();
        for i in 0..5 {
            let x = f64::from(i);
            document.add_line(Point2::new(x, 0.0), Point2::new(x, 1.0), "A-WALL");
        }
        let text = render(&document, DrawingUnits::Meters);
        let mut handles: Vec<String> = pairs(&text)
            .into_iter()
            .filter(|(code, _)| *code == 5 || *code == 105)
            .map(|(_, value)| value)
            .collect();
        let total = handles.len();
        handles.sort();
        handles.dedup();
        assert_eq!(handles.len(), total);
    }

    #[test]
    fn entities_carry_layer_style_explicitly() {
        let mut document = styled_document();
        document.add_arc(
            Point2::new(0.0, 0.0),
            0.9,
            0.0,
            std::f64::consts::FRAC_PI_2,
            "A-DOOR-SWING",
        );
        let text = render(&document, DrawingUnits::Meters);
        let pairs = pairs(&text);
        let start = pairs
            .iter()
            .position(|(code, value)| *code == 0 && value == "ARC")
            .expect("应写出 ARC");
        let body: Vec<&(i32, String)> = pairs[start + 1..]
            .iter()
            .take_while(|(code, _)| *code != 0)
            .collect();
        let value = |wanted: i32| {
            body.iter()
                .find(|(code, _)| *code == wanted)
                .map(|(_, value)| value.as_str())
        };
        assert_eq!(value(8), Some("A-DOOR-SWING"));
        assert_eq!(value(6), Some("DASHED"));
        assert_eq!(value(62), Some("3"));
        assert_eq!(value(370), Some("13"));
        assert_eq!(value(50), Some("0.000000"));
        assert_eq!(value(51), Some("90.000000"));
    }

    #[test]
    fn non_ascii_text_is_escaped() {
        assert_eq!(encode_text("12.80 m²"), "12.80 m\\U+00B2");
        assert_eq!(encode_text("Kitchen"), "Kitchen");
        assert_eq!(encode_text("Pooja 🪔"), "Pooja \\U+D83E\\U+DE94");
        assert!(encode_text("厨房 🍳").is_ascii());
    }

    #[test]
    fn reals_never_print_negative_zero() {
        assert_eq!(Real(-1e-9).to_string(), "0.000000");
        assert_eq!(Real(-2.5).to_string(), "-2.500000");
    }
}
