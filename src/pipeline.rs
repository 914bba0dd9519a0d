// 该文件是 Framewatch （帧哨） 项目的一部分。
// src/pipeline.rs - 单帧检测流水线
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

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::{
  encoder::{self, DecodeError},
  frame::Frame,
  model::{
    DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_IOU_THRESHOLD, DetectionSet, Model, decode, rescale,
    suppress,
  },
};

pub const DEFAULT_INPUT_SIZE: u32 = 640;

/// 流水线参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineConfig {
  pub input_size: u32,
  pub confidence_threshold: f32,
  pub iou_threshold: f32,
}

impl Default for PipelineConfig {
  fn default() -> Self {
    Self {
      input_size: DEFAULT_INPUT_SIZE,
      confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
      iou_threshold: DEFAULT_IOU_THRESHOLD,
    }
  }
}

impl PipelineConfig {
  pub fn input_size(mut self, input_size: u32) -> Self {
    self.input_size = input_size;
    self
  }

  pub fn confidence_threshold(mut self, threshold: f32) -> Self {
    self.confidence_threshold = threshold;
    self
  }

  pub fn iou_threshold(mut self, threshold: f32) -> Self {
    self.iou_threshold = threshold;
    self
  }
}

/// 显示面尺寸，未布局时为 0
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DisplaySize {
  pub width: f32,
  pub height: f32,
}

impl DisplaySize {
  pub fn new(width: f32, height: f32) -> Self {
    Self { width, height }
  }
}

/// 交给渲染端的一帧结果
///
/// `width`/`height` 是检测坐标所在空间：显示面已布局时为显示尺寸，
/// 否则为模型输入尺寸。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overlay {
  pub detections: DetectionSet,
  pub width: f32,
  pub height: f32,
}

impl Overlay {
  pub fn empty(width: f32, height: f32) -> Self {
    Self {
      detections: DetectionSet::new(),
      width,
      height,
    }
  }
}

/// 单帧错误，均不致命
#[derive(Error, Debug)]
pub enum FrameError {
  /// 帧无法解码，跳过该帧
  #[error("帧解码失败: {0}")]
  Decode(#[from] DecodeError),
  /// 推理失败，本帧视为无检测
  #[error("推理失败: {0}")]
  Inference(Box<dyn std::error::Error + Send + Sync>),
}

impl FrameError {
  pub fn is_decode(&self) -> bool {
    matches!(self, FrameError::Decode(_))
  }
}

/// 编码、推理、解码、NMS、缩放
///
/// 不保存跨帧状态，模型句柄与尺寸都显式传入。
pub struct Pipeline<M> {
  model: M,
  config: PipelineConfig,
}

impl<M: Model> Pipeline<M> {
  pub fn new(model: M, config: PipelineConfig) -> Self {
    Self { model, config }
  }

  pub fn config(&self) -> &PipelineConfig {
    &self.config
  }

  pub fn model(&self) -> &M {
    &self.model
  }

  /// 检测坐标最终所在的空间
  pub fn overlay_space(&self, display: DisplaySize) -> (f32, f32) {
    if display.width == 0.0 || display.height == 0.0 {
      let size = self.config.input_size as f32;
      (size, size)
    } else {
      (display.width, display.height)
    }
  }

  /// 处理一帧并附带坐标空间，供渲染端使用
  pub fn overlay(&self, frame: &Frame, display: DisplaySize) -> Result<Overlay, FrameError> {
    let detections = self.process_frame(frame, display)?;
    let (width, height) = self.overlay_space(display);
    Ok(Overlay {
      detections,
      width,
      height,
    })
  }

  /// 处理一帧，返回显示空间中的检测
  pub fn process_frame(
    &self,
    frame: &Frame,
    display: DisplaySize,
  ) -> Result<DetectionSet, FrameError> {
    let size = self.config.input_size;
    let tensor = encoder::encode(frame, size)?;

    let output = self
      .model
      .infer(&tensor)
      .map_err(|e| FrameError::Inference(Box::new(e)))?;
    debug!("模型输出形状: {:?}", output.shape());

    let candidates = decode(&output, size, self.config.confidence_threshold);
    let kept = suppress(&candidates, self.config.iou_threshold);
    let scaled = rescale(
      &kept,
      size as f32,
      size as f32,
      display.width,
      display.height,
    );

    debug!(
      "检测到 {} 个物体 (候选 {})",
      scaled.len(),
      candidates.len()
    );
    Ok(scaled)
  }
}
