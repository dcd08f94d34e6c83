//! 纸张尺寸与渲染模式。
//!
//! 页面盒子按 96 px/in 换算并四舍五入到整数像素，横向时宽高互换。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// CSS 像素密度。
pub const CSS_PX_PER_INCH: f64 = 96.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaperSize {
    /// 8.5in × 11in
    Letter,
    /// 8.27in × 11.69in
    A4,
}

impl PaperSize {
    /// 纵向尺寸（英寸）。
    pub fn inches(self) -> (f64, f64) {
        match self {
            Self::Letter => (8.5, 11.0),
            Self::A4 => (8.27, 11.69),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Letter => "letter",
            Self::A4 => "a4",
        }
    }
}

impl FromStr for PaperSize {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "letter" => Ok(Self::Letter),
            "a4" => Ok(Self::A4),
            other => Err(AppError::InvalidInput(format!("未知纸张：{}（可选：letter / a4）", other))),
        }
    }
}

impl fmt::Display for PaperSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

impl FromStr for Orientation {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "portrait" => Ok(Self::Portrait),
            "landscape" => Ok(Self::Landscape),
            other => Err(AppError::InvalidInput(format!(
                "未知方向：{}（可选：portrait / landscape）",
                other
            ))),
        }
    }
}

/// 页面盒子（CSS 像素）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageBox {
    pub width_px: u32,
    pub height_px: u32,
}

/// 由纸张与方向计算页面盒子。
pub fn page_box(paper: PaperSize, orientation: Orientation) -> PageBox {
    let (w_in, h_in) = paper.inches();
    let width = (w_in * CSS_PX_PER_INCH).round() as u32;
    let height = (h_in * CSS_PX_PER_INCH).round() as u32;

    match orientation {
        Orientation::Portrait => PageBox {
            width_px: width,
            height_px: height,
        },
        Orientation::Landscape => PageBox {
            width_px: height,
            height_px: width,
        },
    }
}

/// 渲染模式：邮件（单列流式）或打印（固定页面分页）。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RenderMode {
    #[default]
    Email,
    Print {
        paper: PaperSize,
        orientation: Orientation,
    },
}

/// 渲染选项。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderOptions {
    pub mode: RenderMode,
    /// 是否叠加对齐网格（仅屏幕显示，打印时隐藏）。
    pub show_grid: bool,
}

impl RenderOptions {
    pub fn email() -> Self {
        Self::default()
    }

    pub fn print(paper: PaperSize, orientation: Orientation) -> Self {
        Self {
            mode: RenderMode::Print { paper, orientation },
            show_grid: false,
        }
    }

    pub fn with_grid(mut self, show_grid: bool) -> Self {
        self.show_grid = show_grid;
        self
    }
}
