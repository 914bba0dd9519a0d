// 该文件是 Framewatch （帧哨） 项目的一部分。
// src/frame.rs - 相机帧与模型输入张量定义
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

use std::str::FromStr;

use thiserror::Error;

pub const RGB_CHANNELS: usize = 3;

/// 帧像素格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
  /// Y 平面 + VU 交错平面（相机默认格式）
  Nv21,
  /// Y 平面 + UV 交错平面
  Nv12,
  /// Y、U、V 三个独立平面
  I420,
  /// 紧密排列的 RGB
  Rgb8,
}

impl PixelFormat {
  /// 给定尺寸下一帧所需的字节数
  pub fn frame_len(&self, width: u32, height: u32) -> usize {
    let luma = width as usize * height as usize;
    match self {
      PixelFormat::Nv21 | PixelFormat::Nv12 | PixelFormat::I420 => {
        luma + 2 * (width as usize / 2) * (height as usize / 2)
      }
      PixelFormat::Rgb8 => luma * RGB_CHANNELS,
    }
  }

  pub fn is_chroma_subsampled(&self) -> bool {
    !matches!(self, PixelFormat::Rgb8)
  }
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("未知像素格式: {0}")]
pub struct UnknownPixelFormat(pub String);

impl FromStr for PixelFormat {
  type Err = UnknownPixelFormat;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "nv21" => Ok(PixelFormat::Nv21),
      "nv12" => Ok(PixelFormat::Nv12),
      "i420" | "yu12" => Ok(PixelFormat::I420),
      "rgb8" | "rgb" => Ok(PixelFormat::Rgb8),
      _ => Err(UnknownPixelFormat(s.to_string())),
    }
  }
}

/// 帧旋转角度（顺时针）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
  #[default]
  Deg0,
  Deg90,
  Deg180,
  Deg270,
}

impl Rotation {
  /// 由角度构造，必须是 90 的整数倍，负数按 360 取模
  pub fn from_degrees(degrees: i32) -> Option<Self> {
    match degrees.rem_euclid(360) {
      0 => Some(Rotation::Deg0),
      90 => Some(Rotation::Deg90),
      180 => Some(Rotation::Deg180),
      270 => Some(Rotation::Deg270),
      _ => None,
    }
  }

  pub fn degrees(&self) -> u32 {
    match self {
      Rotation::Deg0 => 0,
      Rotation::Deg90 => 90,
      Rotation::Deg180 => 180,
      Rotation::Deg270 => 270,
    }
  }

  /// 旋转后宽高是否互换
  pub fn swaps_axes(&self) -> bool {
    matches!(self, Rotation::Deg90 | Rotation::Deg270)
  }
}

/// 相机帧
///
/// 每帧只在一次处理调用中存在，处理完即丢弃。
#[derive(Debug, Clone)]
pub struct Frame {
  width: u32,
  height: u32,
  format: PixelFormat,
  rotation: Rotation,
  data: Box<[u8]>,
}

impl Frame {
  pub fn new(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Self {
    Self {
      width,
      height,
      format,
      rotation: Rotation::Deg0,
      data: data.into_boxed_slice(),
    }
  }

  pub fn with_rotation(mut self, rotation: Rotation) -> Self {
    self.rotation = rotation;
    self
  }

  pub fn width(&self) -> u32 {
    self.width
  }

  pub fn height(&self) -> u32 {
    self.height
  }

  pub fn format(&self) -> PixelFormat {
    self.format
  }

  pub fn rotation(&self) -> Rotation {
    self.rotation
  }

  pub fn data(&self) -> &[u8] {
    &self.data
  }

  /// 旋转后的（宽，高）
  pub fn upright_size(&self) -> (u32, u32) {
    if self.rotation.swaps_axes() {
      (self.height, self.width)
    } else {
      (self.width, self.height)
    }
  }
}

/// 模型输入张量，形状 `[size, size, 3]`，NHWC，RGB，取值 `[0, 1]`
#[derive(Debug, Clone)]
pub struct InputTensor {
  size: u32,
  data: Box<[f32]>,
}

impl InputTensor {
  pub fn zeros(size: u32) -> Self {
    let len = RGB_CHANNELS * size as usize * size as usize;
    Self {
      size,
      data: vec![0.0f32; len].into_boxed_slice(),
    }
  }

  pub fn size(&self) -> u32 {
    self.size
  }

  pub fn shape(&self) -> [usize; 3] {
    [self.size as usize, self.size as usize, RGB_CHANNELS]
  }

  /// 读取 (y, x, c) 处的值
  pub fn get(&self, y: usize, x: usize, c: usize) -> Option<f32> {
    let size = self.size as usize;
    if y >= size || x >= size || c >= RGB_CHANNELS {
      return None;
    }
    self.data.get((y * size + x) * RGB_CHANNELS + c).copied()
  }

  pub fn as_nhwc(&self) -> &[f32] {
    &self.data
  }
}

impl AsMut<[f32]> for InputTensor {
  fn as_mut(&mut self) -> &mut [f32] {
    &mut self.data
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rotation_accepts_multiples_of_ninety() {
    assert_eq!(Rotation::from_degrees(0), Some(Rotation::Deg0));
    assert_eq!(Rotation::from_degrees(90), Some(Rotation::Deg90));
    assert_eq!(Rotation::from_degrees(450), Some(Rotation::Deg90));
    assert_eq!(Rotation::from_degrees(-90), Some(Rotation::Deg270));
    assert_eq!(Rotation::from_degrees(45), None);
  }

  #[test]
  fn upright_size_swaps_for_quarter_turns() {
    let frame = Frame::new(4, 2, PixelFormat::Rgb8, vec![0; 24]).with_rotation(Rotation::Deg90);
    assert_eq!(frame.upright_size(), (2, 4));
    let frame = frame.with_rotation(Rotation::Deg180);
    assert_eq!(frame.upright_size(), (4, 2));
  }

  #[test]
  fn frame_len_per_format() {
    assert_eq!(PixelFormat::Nv21.frame_len(4, 2), 8 + 4);
    assert_eq!(PixelFormat::I420.frame_len(4, 4), 16 + 8);
    assert_eq!(PixelFormat::Rgb8.frame_len(4, 2), 24);
  }

  #[test]
  fn pixel_format_parses_case_insensitive() {
    assert_eq!("NV21".parse::<PixelFormat>(), Ok(PixelFormat::Nv21));
    assert_eq!("yu12".parse::<PixelFormat>(), Ok(PixelFormat::I420));
    assert!("bgra".parse::<PixelFormat>().is_err());
  }

  #[test]
  fn tensor_indexing_is_nhwc() {
    let mut tensor = InputTensor::zeros(2);
    tensor.as_mut()[(2 + 1) * RGB_CHANNELS + 2] = 0.5;
    assert_eq!(tensor.get(1, 1, 2), Some(0.5));
    assert_eq!(tensor.get(2, 0, 0), None);
    assert_eq!(tensor.shape(), [2, 2, 3]);
  }
}
