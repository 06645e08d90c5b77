mod reader;
mod writer;

use std::fs;
use std::path::Path;

use thiserror::Error;
use vastu_config::DrawingUnits;
use vastu_core::document::Document;

use reader::{DxfError, DxfParser};

#[derive(Debug, Error)]
pub enum IoError {
    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),
    #[error("failed to read file {path:?}: {source}")]
    ReadError {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write file {path:?}: {source}")]
    WriteError {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid document structure: {0}")]
    InvalidDocument(String),
}

impl From<DxfError> for IoError {
    fn from(err: DxfError) -> Self {
        match err {
            DxfError::Unsupported { feature } => IoError::UnsupportedFeature(feature),
            DxfError::Invalid { message } => IoError::InvalidDocument(message),
        }
    }
}

pub trait DocumentLoader {
    fn load(&self, path: &Path) -> Result<Document, IoError>;
}

pub trait DocumentSaver {
    fn save(&self, document: &Document, path: &Path) -> Result<(), IoError>;
}

/// DXF 读写入口：写出 AutoCAD 2000（AC1015）ASCII DXF，并可读回校验。
#[derive(Debug, Clone, Copy, Default)]
pub struct DxfFacade {
    units: DrawingUnits,
}

impl DxfFacade {
    pub fn new() -> Self {
        Self::default()
    }

    /// 指定写入 `$INSUNITS` / `$MEASUREMENT` 的图纸单位；坐标本身不做换算。
    pub fn with_units(mut self, units: DrawingUnits) -> Self {
        self.units = units;
        self
    }

    pub fn units(&self) -> DrawingUnits {
        self.units
    }

    /// 生成完整的 DXF 文本，不访问文件系统。
    pub fn render(&self, document: &Document) -> String {
        writer::render(document, self.units)
    }

    /// 从内存中的 DXF 文本解析文档。
    pub fn parse(&self, source: &str) -> Result<Document, IoError> {
        Ok(DxfParser::new(source).parse()?)
    }
}

impl DocumentLoader for DxfFacade {
    fn load(&self, path: &Path) -> Result<Document, IoError> {
        let data = fs::read_to_string(path).map_err(|source| IoError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        self.parse(&data)
    }
}

impl DocumentSaver for DxfFacade {
    fn save(&self, document: &Document, path: &Path) -> Result<(), IoError> {
        let text = self.render(document);
        fs::write(path, text).map_err(|source| IoError::WriteError {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_failure_names_the_path() {
        let dir = tempfile::tempdir().expect("创建临时目录失败");
        let target = dir.path().join("missing").join("plan.dxf");
        let err = DxfFacade::new()
            .save(&Document::new(), &target)
            .expect_err("父目录不存在时应写入失败");
        match err {
            IoError::WriteError { path, .. } => assert_eq!(path, target),
            other => panic!("意外的错误类型: {other:?}"),
        }
    }

    #[test]
    fn truncated_input_is_invalid() {
        let err = DxfFacade::new()
            .parse("  0\nSECTION\n  2\nENTITIES\n  0\nLINE\n  8\n")
            .expect_err("缺少值行的 DXF 应解析失败");
        assert!(matches!(err, IoError::InvalidDocument(_)));
    }
}
