use vastu_core::document::{
    Arc, BlockDefinition, Circle, Dimension, DimensionKind, Document, Entity, Hatch, HatchEdge,
    HatchLoop, HatchPattern, Layer, Line, PatternLine, Polyline, Solid, Text, TextAlignment,
};
use vastu_core::geometry::{Point2, Vector2};
use vastu_core::style::{LayerStyle, Linetype, Lineweight};

#[derive(Debug)]
pub(crate) enum DxfError {
    Unsupported { feature: String },
    Invalid { message: String },
}

impl DxfError {
    fn unsupported(feature: impl Into<String>) -> Self {
        Self::Unsupported {
            feature: feature.into(),
        }
    }

    fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}

pub(crate) struct DxfParser<'a> {
    reader: DxfReader<'a>,
}

impl<'a> DxfParser<'a> {
    pub(crate) fn new(source: &'a str) -> Self {
        Self {
            reader: DxfReader::new(source),
        }
    }

    pub(crate) fn parse(mut self) -> Result<Document, DxfError> {
        let mut document = Document::new();
        while let Some((code, value)) = self.reader.next_pair()? {
            if code != 0 {
                return Err(DxfError::invalid(format!(
                    "意外的组码 {code}（期望 0 表示 SECTION/EOF）"
                )));
            }
            match value.as_str() {
                "SECTION" => {
                    let (name_code, name) = self
                        .reader
                        .next_pair()?
                        .ok_or_else(|| DxfError::invalid("SECTION 缺少名称（组码 2）"))?;
                    if name_code != 2 {
                        return Err(DxfError::invalid(format!(
                            "SECTION 名称使用了组码 {name_code}（期望 2）"
                        )));
                    }
                    match name.as_str() {
                        "TABLES" => self.parse_tables(&mut document)?,
                        "BLOCKS" => self.parse_blocks(&mut document)?,
                        "ENTITIES" => self.parse_entities(&mut document)?,
                        _ => self.skip_section()?,
                    }
                }
                "EOF" => break,
                unexpected => {
                    return Err(DxfError::invalid(format!(
                        "意外的标记 {unexpected}，期望 SECTION 或 EOF"
                    )));
                }
            }
        }
        Ok(document)
    }

    fn skip_section(&mut self) -> Result<(), DxfError> {
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) if value == "ENDSEC" => break,
                Some(_) => continue,
                None => {
                    return Err(DxfError::invalid("SECTION 未找到 ENDSEC 终止标记"));
                }
            }
        }
        Ok(())
    }

    /// 只读取 LAYER 记录，其余符号表跳过。
    fn parse_tables(&mut self, document: &mut Document) -> Result<(), DxfError> {
        loop {
            let (code, value) = match self.reader.next_pair()? {
                Some(pair) => pair,
                None => return Err(DxfError::invalid("TABLES 段提前结束")),
            };
            if code != 0 {
                return Err(DxfError::invalid(format!(
                    "TABLES 段遇到组码 {code}（期望 0 表示记录起始）"
                )));
            }
            match value.as_str() {
                "ENDSEC" => break,
                "LAYER" => {
                    let layer = self.parse_layer()?;
                    document.set_layer(layer);
                }
                _ => self.skip_entity_body()?,
            }
        }
        Ok(())
    }

    fn parse_layer(&mut self) -> Result<Layer, DxfError> {
        let mut name: Option<String> = None;
        let mut color: i16 = 7;
        let mut linetype = Linetype::Continuous;
        let mut lineweight = Lineweight::DEFAULT;
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    break;
                }
                Some((code, value)) => match code {
                    2 => name = Some(value.trim().to_string()),
                    62 => color = parse_i16(&value, "LAYER 颜色（组码 62）")?,
                    6 => {
                        linetype = Linetype::from_name(&value).ok_or_else(|| {
                            DxfError::unsupported(format!("LAYER 线型 {}", value.trim()))
                        })?;
                    }
                    370 => {
                        lineweight =
                            Lineweight::from_hundredths(parse_i16(&value, "LAYER 线宽（组码 370）")?);
                    }
                    _ => {}
                },
                None => return Err(DxfError::invalid("LAYER 未正确结束")),
            }
        }

        let name = name.ok_or_else(|| DxfError::invalid("LAYER 缺少名称（组码 2）"))?;
        let aci = u8::try_from(color.unsigned_abs())
            .map_err(|_| DxfError::invalid(format!("LAYER {name} 颜色 {color} 超出 ACI 范围")))?;
        let mut layer = Layer::with_style(name, LayerStyle::new(aci, lineweight, linetype));
        layer.is_visible = color >= 0;
        Ok(layer)
    }

    fn parse_entities(&mut self, document: &mut Document) -> Result<(), DxfError> {
        loop {
            let (code, value) = match self.reader.next_pair()? {
                Some(pair) => pair,
                None => return Err(DxfError::invalid("ENTITIES 段提前结束")),
            };
            if code != 0 {
                return Err(DxfError::invalid(format!(
                    "ENTITIES 段遇到组码 {code}（期望 0 表示实体起始）"
                )));
            }

            match value.as_str() {
                "ENDSEC" => break,
                entity => {
                    let parsed = self.parse_entity(entity)?;
                    document.add_entity(parsed);
                }
            }
        }
        Ok(())
    }

    fn parse_blocks(&mut self, document: &mut Document) -> Result<(), DxfError> {
        loop {
            let (code, value) = match self.reader.next_pair()? {
                Some(pair) => pair,
                None => return Err(DxfError::invalid("BLOCKS 段提前结束")),
            };
            if code != 0 {
                return Err(DxfError::invalid(format!(
                    "BLOCKS 段遇到组码 {code}（期望 0 表示实体起始）"
                )));
            }

            match value.as_str() {
                "ENDSEC" => break,
                "BLOCK" => {
                    if let Some(definition) = self.parse_block_definition()? {
                        document.add_block_definition(definition);
                    }
                }
                _ => {
                    // 未预期的条目（例如嵌套记录），直接跳过
                    self.skip_entity_body()?;
                }
            }
        }
        Ok(())
    }

    /// 模型空间与图纸空间块返回 `None`；匿名尺寸块（`*D`）照常读取。
    fn parse_block_definition(&mut self) -> Result<Option<BlockDefinition>, DxfError> {
        let mut name: Option<String> = None;
        let mut base_x: f64 = 0.0;
        let mut base_y: f64 = 0.0;
        let mut entities: Vec<Entity> = Vec::new();

        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => match value.as_str() {
                    "ENDBLK" => {
                        self.skip_entity_body()?;
                        break;
                    }
                    entity_kind => match self.parse_entity(entity_kind) {
                        Ok(entity) => entities.push(entity),
                        Err(DxfError::Unsupported { .. }) => {
                            self.skip_entity_body()?;
                        }
                        Err(err) => return Err(err),
                    },
                },
                Some((code, value)) => match code {
                    2 => name = Some(value.trim().to_string()),
                    10 => base_x = parse_f64(&value, "BLOCK 基点 X")?,
                    20 => base_y = parse_f64(&value, "BLOCK 基点 Y")?,
                    _ => {}
                },
                None => {
                    return Err(DxfError::invalid("BLOCK 定义未找到 ENDBLK 终止标记"));
                }
            }
        }

        let name = match name {
            Some(name) => name,
            None => return Err(DxfError::invalid("BLOCK 缺少名称（组码 2）")),
        };

        let lowered = name.to_ascii_lowercase();
        if lowered.starts_with("*model_space") || lowered.starts_with("*paper_space") {
            return Ok(None);
        }

        Ok(Some(BlockDefinition {
            name,
            base_point: Point2::new(base_x, base_y),
            entities,
        }))
    }

    fn parse_entity(&mut self, kind: &str) -> Result<Entity, DxfError> {
        let build: fn(&EntityBody) -> Result<Entity, DxfError> = match kind {
            "LINE" => build_line,
            "CIRCLE" => build_circle,
            "ARC" => build_arc,
            "LWPOLYLINE" => build_lwpolyline,
            "TEXT" => build_text,
            "HATCH" => build_hatch,
            "DIMENSION" => build_dimension,
            "SOLID" => build_solid,
            other => return Err(DxfError::unsupported(format!("暂不支持的实体类型 {other}"))),
        };
        let body = self.read_body(kind)?;
        build(&body)
    }

    /// 读取实体的全部组码，直到下一个 0 组码（回退给调用方）。
    fn read_body(&mut self, kind: &str) -> Result<EntityBody, DxfError> {
        let mut pairs = Vec::new();
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    break;
                }
                Some(pair) => pairs.push(pair),
                None => return Err(DxfError::invalid(format!("{kind} 未正确结束"))),
            }
        }
        Ok(EntityBody {
            kind: kind.to_string(),
            pairs,
        })
    }

    fn skip_entity_body(&mut self) -> Result<(), DxfError> {
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    break;
                }
                Some(_) => continue,
                None => break,
            }
        }
        Ok(())
    }
}

/// 单个实体的组码对，保持文件中的顺序。
struct EntityBody {
    kind: String,
    pairs: Vec<(i32, String)>,
}

impl EntityBody {
    fn values(&self, code: i32) -> impl Iterator<Item = &str> {
        self.pairs
            .iter()
            .filter(move |(c, _)| *c == code)
            .map(|(_, value)| value.as_str())
    }

    fn layer(&self) -> String {
        self.values(8)
            .next()
            .map(|value| value.trim().to_string())
            .unwrap_or_else(|| "0".to_string())
    }

    /// 可选的单值实数；重复出现视为无效。
    fn real_opt(&self, code: i32, what: &str) -> Result<Option<f64>, DxfError> {
        let mut values = self.values(code);
        let Some(first) = values.next() else {
            return Ok(None);
        };
        let context = format!("{} {what}（组码 {code}）", self.kind);
        if values.next().is_some() {
            return Err(DxfError::invalid(format!("{context} 出现重复值")));
        }
        parse_f64(first, &context).map(Some)
    }

    fn real(&self, code: i32, what: &str) -> Result<f64, DxfError> {
        self.real_opt(code, what)?.ok_or_else(|| {
            DxfError::invalid(format!("{} 缺少{what}（组码 {code}）", self.kind))
        })
    }

    /// `code`/`code + 10` 组成的二维点。
    fn point_opt(&self, code: i32, what: &str) -> Result<Option<Point2>, DxfError> {
        match (self.real_opt(code, what)?, self.real_opt(code + 10, what)?) {
            (Some(x), Some(y)) => Ok(Some(Point2::new(x, y))),
            (None, None) => Ok(None),
            _ => Err(DxfError::invalid(format!(
                "{} {what} 坐标不完整（组码 {code}/{}）",
                self.kind,
                code + 10
            ))),
        }
    }

    fn point(&self, code: i32, what: &str) -> Result<Point2, DxfError> {
        self.point_opt(code, what)?.ok_or_else(|| {
            DxfError::invalid(format!(
                "{} 缺少{what}（组码 {code}/{}）",
                self.kind,
                code + 10
            ))
        })
    }

    fn int_or(&self, code: i32, default: i16, what: &str) -> Result<i16, DxfError> {
        match self.values(code).last() {
            Some(value) => parse_i16(value, &format!("{} {what}（组码 {code}）", self.kind)),
            None => Ok(default),
        }
    }
}

fn build_line(body: &EntityBody) -> Result<Entity, DxfError> {
    Ok(Entity::Line(Line {
        start: body.point(10, "起点")?,
        end: body.point(11, "终点")?,
        layer: body.layer(),
    }))
}

fn build_circle(body: &EntityBody) -> Result<Entity, DxfError> {
    Ok(Entity::Circle(Circle {
        center: body.point(10, "圆心")?,
        radius: body.real(40, "半径")?,
        layer: body.layer(),
    }))
}

fn build_arc(body: &EntityBody) -> Result<Entity, DxfError> {
    Ok(Entity::Arc(Arc {
        center: body.point(10, "圆心")?,
        radius: body.real(40, "半径")?,
        start_angle: body.real(50, "起始角")?.to_radians(),
        end_angle: body.real(51, "终止角")?.to_radians(),
        layer: body.layer(),
    }))
}

/// 顶点按 10/20 成对出现，必须按顺序读取。
fn build_lwpolyline(body: &EntityBody) -> Result<Entity, DxfError> {
    let flags = body.int_or(70, 0, "标志")?;
    let mut vertices: Vec<Point2> = Vec::new();
    let mut pending_x: Option<f64> = None;
    for (code, value) in &body.pairs {
        match code {
            10 => {
                if pending_x.replace(parse_f64(value, "LWPOLYLINE 顶点 X")?).is_some() {
                    return Err(DxfError::invalid("LWPOLYLINE 顶点缺少对应的 Y（组码 20）"));
                }
            }
            20 => {
                let x = pending_x
                    .take()
                    .ok_or_else(|| DxfError::invalid("LWPOLYLINE 顶点缺少对应的 X（组码 10）"))?;
                vertices.push(Point2::new(x, parse_f64(value, "LWPOLYLINE 顶点 Y")?));
            }
            42 if parse_f64(value, "LWPOLYLINE 顶点 bulge")?.abs() > f64::EPSILON => {
                return Err(DxfError::unsupported("LWPOLYLINE 圆弧段（bulge）"));
            }
            _ => {}
        }
    }
    if pending_x.is_some() {
        return Err(DxfError::invalid("LWPOLYLINE 末尾顶点不完整"));
    }
    if vertices.is_empty() {
        return Err(DxfError::invalid("LWPOLYLINE 未解析到任何顶点"));
    }
    Ok(Entity::Polyline(Polyline {
        vertices,
        is_closed: flags & 0x01 == 0x01,
        layer: body.layer(),
    }))
}

fn build_text(body: &EntityBody) -> Result<Entity, DxfError> {
    let first = body.point(10, "插入点")?;
    let second = body.point_opt(11, "对齐点")?;
    let horizontal = body.int_or(72, 0, "水平对齐")?;
    let vertical = body.int_or(73, 0, "垂直对齐")?;
    let lines: Vec<String> = body.values(1).map(decode_inline_text).collect();
    if lines.is_empty() {
        return Err(DxfError::invalid("TEXT 缺少文本内容（组码 1）"));
    }

    let (alignment, insert) = match (horizontal, vertical, second) {
        (1, 2, Some(point)) => (TextAlignment::MiddleCenter, point),
        (0, 0, _) => (TextAlignment::BaselineLeft, first),
        (h, v, _) => return Err(DxfError::unsupported(format!("TEXT 对齐方式 {h}/{v}"))),
    };

    Ok(Entity::Text(Text {
        insert,
        content: lines.join("\n"),
        height: body.real(40, "文字高度")?,
        rotation: body.real_opt(50, "旋转角")?.unwrap_or(0.0).to_radians(),
        alignment,
        layer: body.layer(),
    }))
}

/// 正在读取的 HATCH 边界环路。
struct PartialLoop {
    is_polyline: bool,
    is_closed: bool,
    expected_vertices: Option<usize>,
    vertices: Vec<Point2>,
    edges: Vec<HatchEdge>,
    pending_x: Option<f64>,
    edge_end: bool,
}

impl PartialLoop {
    fn new(flags: i32) -> Self {
        Self {
            is_polyline: (flags & 0x02) != 0,
            is_closed: true,
            expected_vertices: None,
            vertices: Vec::new(),
            edges: Vec::new(),
            pending_x: None,
            edge_end: false,
        }
    }

    fn push_x(&mut self, x: f64) -> Result<(), DxfError> {
        if self.pending_x.replace(x).is_some() {
            return Err(DxfError::invalid("HATCH 边界遇到重复的 X 坐标"));
        }
        Ok(())
    }

    fn push_y(&mut self, y: f64) -> Result<(), DxfError> {
        let x = self
            .pending_x
            .take()
            .ok_or_else(|| DxfError::invalid("HATCH 边界 Y 前未读取到对应的 X 值"))?;
        let point = Point2::new(x, y);
        if self.is_polyline {
            self.vertices.push(point);
        } else if self.edge_end {
            if let Some(edge) = self.edges.last_mut() {
                edge.end = point;
            }
        } else {
            self.edges.push(HatchEdge {
                start: point,
                end: point,
            });
        }
        Ok(())
    }

    fn finalize(self) -> Result<HatchLoop, DxfError> {
        if self.pending_x.is_some() {
            return Err(DxfError::invalid("HATCH 顶点缺少对应的 Y 坐标"));
        }
        if !self.is_polyline {
            return Ok(HatchLoop {
                is_polyline: false,
                is_closed: true,
                edges: self.edges,
            });
        }
        if let Some(expected) = self.expected_vertices {
            if expected != self.vertices.len() {
                return Err(DxfError::invalid(format!(
                    "HATCH 多段线环路声明 {expected} 个顶点，实际 {} 个",
                    self.vertices.len()
                )));
            }
        }
        let mut boundary = HatchLoop::polygon(&self.vertices);
        if !self.is_closed {
            boundary.edges.pop();
            boundary.is_closed = false;
        }
        Ok(boundary)
    }
}

/// 只接受多段线环路与直线边环路，读取预定义图案的图案线。
fn build_hatch(body: &EntityBody) -> Result<Entity, DxfError> {
    let mut loops: Vec<HatchLoop> = Vec::new();
    let mut current: Option<PartialLoop> = None;
    let mut boundaries_done = false;
    let mut pattern_lines: Vec<PatternLine> = Vec::new();

    for (code, value) in &body.pairs {
        let code = *code;
        match code {
            92 => {
                if let Some(done) = current.take() {
                    loops.push(done.finalize()?);
                }
                current = Some(PartialLoop::new(parse_i32(value, "HATCH 环路类型（组码 92）")?));
            }
            // 环路结束后出现 75/98，之后的 10/20 是种子点
            75 | 98 => {
                if let Some(done) = current.take() {
                    loops.push(done.finalize()?);
                }
                boundaries_done = true;
            }
            53 => pattern_lines.push(PatternLine {
                angle: parse_f64(value, "HATCH 图案线角度（组码 53）")?.to_radians(),
                base: Point2::new(0.0, 0.0),
                offset: Vector2::new(0.0, 0.0),
                dashes: Vec::new(),
            }),
            43..=46 | 49 => {
                let line = pattern_lines.last_mut().ok_or_else(|| {
                    DxfError::invalid(format!("HATCH 组码 {code} 出现在图案线之前"))
                })?;
                let number = parse_f64(value, "HATCH 图案线数据")?;
                match code {
                    43 => line.base.0.x = number,
                    44 => line.base.0.y = number,
                    45 => line.offset.0.x = number,
                    46 => line.offset.0.y = number,
                    _ => line.dashes.push(number),
                }
            }
            _ => {
                let Some(edge_loop) = current.as_mut().filter(|_| !boundaries_done) else {
                    continue;
                };
                match code {
                    93 => {
                        edge_loop.expected_vertices =
                            Some(parse_i32(value, "HATCH 边计数（组码 93）")? as usize);
                    }
                    72 => {
                        let kind = parse_i32(value, "HATCH 边类型（组码 72）")?;
                        if edge_loop.is_polyline && kind != 0 {
                            return Err(DxfError::unsupported("HATCH 带 bulge 的多段线环路"));
                        }
                        if !edge_loop.is_polyline && kind != 1 {
                            return Err(DxfError::unsupported(format!("HATCH 不支持的边界类型 {kind}")));
                        }
                    }
                    73 => {
                        edge_loop.is_closed = parse_i32(value, "HATCH 多段线闭合标记（组码 73）")? != 0;
                    }
                    10 | 11 => {
                        edge_loop.edge_end = code == 11;
                        edge_loop.push_x(parse_f64(value, "HATCH 边界 X")?)?;
                    }
                    20 | 21 => edge_loop.push_y(parse_f64(value, "HATCH 边界 Y")?)?,
                    _ => {}
                }
            }
        }
    }
    if let Some(done) = current.take() {
        loops.push(done.finalize()?);
    }
    if loops.is_empty() {
        return Err(DxfError::invalid("HATCH 缺少边界定义"));
    }

    let is_solid = body.int_or(70, 0, "填充标志")? & 1 != 0;
    let pattern_angle = body.real_opt(52, "图案角度")?;
    let pattern = if is_solid || (pattern_lines.is_empty() && pattern_angle.is_none()) {
        None
    } else {
        Some(HatchPattern {
            angle: pattern_angle.unwrap_or(0.0).to_radians(),
            scale: body.real_opt(41, "图案比例")?.unwrap_or(1.0),
            lines: pattern_lines,
        })
    };

    Ok(Entity::Hatch(Hatch {
        pattern_name: body
            .values(2)
            .next()
            .map(|name| name.trim().to_string())
            .unwrap_or_else(|| "SOLID".to_string()),
        is_solid,
        loops,
        pattern,
        layer: body.layer(),
    }))
}

fn build_dimension(body: &EntityBody) -> Result<Entity, DxfError> {
    let text = body
        .values(1)
        .last()
        .map(|raw| decode_inline_text(raw.trim()))
        .filter(|entry| !entry.is_empty() && entry != "<>");
    Ok(Entity::Dimension(Dimension {
        kind: dimension_kind_from_flags(body.int_or(70, 0, "类型标志")?),
        definition_point: body.point(10, "定义点")?,
        text_midpoint: body.point(11, "文本位置")?,
        first_point: body.point(13, "第一界线原点")?,
        second_point: body.point(14, "第二界线原点")?,
        text,
        measurement: body.real_opt(42, "测量值")?,
        rotation: body.real_opt(50, "旋转角")?.unwrap_or(0.0).to_radians(),
        block_name: body.values(2).next().map(|name| name.trim().to_string()),
        layer: body.layer(),
    }))
}

/// 缺少第四点时按三角形处理。
fn build_solid(body: &EntityBody) -> Result<Entity, DxfError> {
    let first = body.point(10, "第 1 个顶点")?;
    let second = body.point(11, "第 2 个顶点")?;
    let third = body.point(12, "第 3 个顶点")?;
    let fourth = body.point_opt(13, "第 4 个顶点")?.unwrap_or(third);
    Ok(Entity::Solid(Solid {
        vertices: [first, second, third, fourth],
        layer: body.layer(),
    }))
}

fn dimension_kind_from_flags(flags: i16) -> DimensionKind {
    match flags & 0x0F {
        0 => DimensionKind::Linear,
        1 => DimensionKind::Aligned,
        other => DimensionKind::Unknown(other),
    }
}

struct DxfReader<'a> {
    lines: std::str::Lines<'a>,
    buffer: Option<(i32, String)>,
    line_number: usize,
}

impl<'a> DxfReader<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            lines: source.lines(),
            buffer: None,
            line_number: 0,
        }
    }

    fn next_pair(&mut self) -> Result<Option<(i32, String)>, DxfError> {
        if let Some(pair) = self.buffer.take() {
            return Ok(Some(pair));
        }

        let code_line = match self.lines.next() {
            Some(line) => {
                self.line_number += 1;
                line
            }
            None => return Ok(None),
        };

        let value_line = match self.lines.next() {
            Some(line) => {
                self.line_number += 1;
                line
            }
            None => {
                return Err(DxfError::invalid(format!(
                    "文件在第 {} 行结束，缺少与组码对应的值行",
                    self.line_number
                )));
            }
        };

        let code = code_line.trim().parse::<i32>().map_err(|_| {
            DxfError::invalid(format!(
                "第 {} 行的组码 \"{}\" 无法解析为整数",
                self.line_number - 1,
                code_line.trim()
            ))
        })?;
        let value = value_line.trim_end_matches('\r').to_string();
        Ok(Some((code, value)))
    }

    /// 回退一个组码对；解析器在读到下一个实体的 0 组码后立即回退，因此缓冲区至多一项。
    fn put_back(&mut self, pair: (i32, String)) {
        debug_assert!(self.buffer.is_none(), "DXF 组码对只能回退一次");
        self.buffer = Some(pair);
    }
}

fn parse_f64(raw: &str, context: &str) -> Result<f64, DxfError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| DxfError::invalid(format!("{context} 解析失败（值：\"{raw}\"）")))
}

fn parse_i32(raw: &str, context: &str) -> Result<i32, DxfError> {
    raw.trim()
        .parse::<i32>()
        .map_err(|_| DxfError::invalid(format!("{context} 解析失败（值：\"{raw}\"）")))
}

fn parse_i16(raw: &str, context: &str) -> Result<i16, DxfError> {
    let value = parse_i32(raw, context)?;
    i16::try_from(value)
        .map_err(|_| DxfError::invalid(format!("{context} 超出 i16 范围（值：{value}）")))
}

/// 解码 `\U+XXXX` 转义与 `\P` 换行。
fn decode_inline_text(raw: &str) -> String {
    let mut result = String::new();
    // 连续的 `\U+XXXX` 按 UTF-16 码元收集，以便还原代理对。
    let mut units: Vec<u16> = Vec::new();
    let mut chars = raw.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            flush_units(&mut units, &mut result);
            result.push(ch);
            continue;
        }
        match chars.next() {
            Some('U') | Some('u') if chars.peek() == Some(&'+') => {
                chars.next();
                let hex: String = chars.by_ref().take(4).collect();
                match u16::from_str_radix(&hex, 16) {
                    Ok(unit) if hex.len() == 4 => units.push(unit),
                    _ => {
                        flush_units(&mut units, &mut result);
                        result.push_str("\\U+");
                        result.push_str(&hex);
                    }
                }
            }
            next => {
                flush_units(&mut units, &mut result);
                match next {
                    Some('P') | Some('p') => result.push('\n'),
                    Some('~') => result.push(' '),
                    Some('\\') => result.push('\\'),
                    Some(other) => {
                        result.push('\\');
                        result.push(other);
                    }
                    None => result.push('\\'),
                }
            }
        }
    }
    flush_units(&mut units, &mut result);
    result
}

fn flush_units(units: &mut Vec<u16>, result: &mut String) {
    result.extend(
        char::decode_utf16(units.drain(..)).map(|decoded| decoded.unwrap_or(char::REPLACEMENT_CHARACTER)),
    );
}
