// 该文件是 Framewatch （帧哨） 项目的一部分。
// src/model.rs - 模型接口与检测结果定义
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::frame::InputTensor;

/// 原始输出的特征行数：cx, cy, w, h, confidence
pub const RAW_OUTPUT_FEATURES: usize = 5;

/// 推理模型
///
/// 模型在启动时加载一次，之后每帧调用 `infer`。
pub trait Model {
  type Error: std::error::Error + Send + Sync + 'static;

  fn infer(&self, input: &InputTensor) -> Result<RawOutput, Self::Error>;
}

/// 将任意闭包包装为模型，便于接入具体推理后端
pub struct FnModel<F>(pub F);

impl<F, E> Model for FnModel<F>
where
  F: Fn(&InputTensor) -> Result<RawOutput, E>,
  E: std::error::Error + Send + Sync + 'static,
{
  type Error = E;

  fn infer(&self, input: &InputTensor) -> Result<RawOutput, Self::Error> {
    (self.0)(input)
  }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RawOutputError {
  #[error("原始输出形状不匹配: 期望 {expected} 个值 [1, 5, N], 实际 {actual}")]
  ShapeMismatch { expected: usize, actual: usize },
}

/// 单个候选框的原始特征
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
  pub cx: f32,
  pub cy: f32,
  pub w: f32,
  pub h: f32,
  pub confidence: f32,
}

/// 模型原始输出，形状 `[1, 5, N]`
#[derive(Debug, Clone)]
pub struct RawOutput {
  num_candidates: usize,
  data: Box<[f32]>,
}

impl RawOutput {
  pub fn from_vec(data: Vec<f32>, num_candidates: usize) -> Result<Self, RawOutputError> {
    let expected = RAW_OUTPUT_FEATURES * num_candidates;
    if data.len() != expected {
      return Err(RawOutputError::ShapeMismatch {
        expected,
        actual: data.len(),
      });
    }
    Ok(Self {
      num_candidates,
      data: data.into_boxed_slice(),
    })
  }

  /// 由按候选框排列的特征构造（转置为特征行布局）
  pub fn from_candidates(candidates: &[Candidate]) -> Self {
    let n = candidates.len();
    let mut data = vec![0.0f32; RAW_OUTPUT_FEATURES * n];
    for (i, c) in candidates.iter().enumerate() {
      data[i] = c.cx;
      data[n + i] = c.cy;
      data[2 * n + i] = c.w;
      data[3 * n + i] = c.h;
      data[4 * n + i] = c.confidence;
    }
    Self {
      num_candidates: n,
      data: data.into_boxed_slice(),
    }
  }

  pub fn num_candidates(&self) -> usize {
    self.num_candidates
  }

  pub fn shape(&self) -> [usize; 3] {
    [1, RAW_OUTPUT_FEATURES, self.num_candidates]
  }

  /// 第 `row` 个特征行
  pub fn feature(&self, row: usize) -> &[f32] {
    let n = self.num_candidates;
    &self.data[row * n..(row + 1) * n]
  }

  pub fn candidate(&self, index: usize) -> Option<Candidate> {
    if index >= self.num_candidates {
      return None;
    }
    let n = self.num_candidates;
    Some(Candidate {
      cx: self.data[index],
      cy: self.data[n + index],
      w: self.data[2 * n + index],
      h: self.data[3 * n + index],
      confidence: self.data[4 * n + index],
    })
  }

  pub fn candidates(&self) -> impl Iterator<Item = Candidate> + '_ {
    (0..self.num_candidates).filter_map(|i| self.candidate(i))
  }
}

/// 边界框，像素坐标 [left, top, right, bottom]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
  pub left: f32,
  pub top: f32,
  pub right: f32,
  pub bottom: f32,
}

impl BoundingBox {
  pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
    Self {
      left,
      top,
      right,
      bottom,
    }
  }

  pub fn width(&self) -> f32 {
    self.right - self.left
  }

  pub fn height(&self) -> f32 {
    self.bottom - self.top
  }

  pub fn area(&self) -> f32 {
    self.width() * self.height()
  }

  pub fn is_degenerate(&self) -> bool {
    !(self.right > self.left && self.bottom > self.top)
  }

  pub fn iou(&self, other: &BoundingBox) -> f32 {
    nms::iou(self, other)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
  pub bbox: BoundingBox,
  pub confidence: f32,
}

/// 单帧检测结果，帧与帧之间没有对象身份
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DetectionSet {
  pub items: Vec<Detection>,
}

impl DetectionSet {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn iter(&self) -> std::slice::Iter<'_, Detection> {
    self.items.iter()
  }
}

impl From<Vec<Detection>> for DetectionSet {
  fn from(items: Vec<Detection>) -> Self {
    Self { items }
  }
}

impl FromIterator<Detection> for DetectionSet {
  fn from_iter<I: IntoIterator<Item = Detection>>(iter: I) -> Self {
    Self {
      items: iter.into_iter().collect(),
    }
  }
}

impl IntoIterator for DetectionSet {
  type Item = Detection;
  type IntoIter = std::vec::IntoIter<Detection>;

  fn into_iter(self) -> Self::IntoIter {
    self.items.into_iter()
  }
}

impl<'a> IntoIterator for &'a DetectionSet {
  type Item = &'a Detection;
  type IntoIter = std::slice::Iter<'a, Detection>;

  fn into_iter(self) -> Self::IntoIter {
    self.items.iter()
  }
}

/// 模型加载错误，对检测功能是致命的
#[derive(Error, Debug)]
pub enum ModelLoadError {
  #[error("模型加载错误: {0}")]
  Io(#[from] std::io::Error),
  #[error("模型无效: {0}")]
  InvalidArtifact(String),
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
}

/// 打包的模型文件内容
#[derive(Debug, Clone)]
pub struct ModelArtifact {
  bytes: Vec<u8>,
}

impl ModelArtifact {
  pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self, ModelLoadError> {
    let path = path.as_ref();
    tracing::info!("加载模型文件: {}", path.display());
    let bytes = std::fs::read(path)?;
    tracing::debug!(
      "模型文件大小: {:.2} MB",
      bytes.len() as f64 / (1024.0 * 1024.0)
    );
    Self::from_bytes(bytes)
  }

  pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, ModelLoadError> {
    if bytes.is_empty() {
      return Err(ModelLoadError::InvalidArtifact("模型文件为空".to_string()));
    }
    Ok(Self { bytes })
  }

  pub fn bytes(&self) -> &[u8] {
    &self.bytes
  }
}

pub mod decode;
pub mod nms;
pub mod rescale;
mod replay;

pub use self::decode::{DEFAULT_CONFIDENCE_THRESHOLD, decode};
pub use self::nms::{DEFAULT_IOU_THRESHOLD, iou, suppress};
pub use self::replay::{ReplayError, ReplayModel, ReplayModelBuilder};
pub use self::rescale::rescale;
