// 该文件是 Framewatch （帧哨） 项目的一部分。
// src/encoder.rs - 帧编码：像素格式转换、旋转、缩放与归一化
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

use image::{ImageBuffer, Rgb, RgbImage, imageops};
use thiserror::Error;
use tracing::debug;

use crate::frame::{Frame, InputTensor, PixelFormat, RGB_CHANNELS, Rotation};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DecodeError {
  #[error("帧尺寸为空: {width}x{height}")]
  EmptyFrame { width: u32, height: u32 },
  #[error("帧数据长度不足: 期望至少 {expected}, 实际 {actual}")]
  BufferTooShort { expected: usize, actual: usize },
  #[error("色度下采样格式要求偶数尺寸: {width}x{height}")]
  OddDimensions { width: u32, height: u32 },
  #[error("目标尺寸不能为 0")]
  ZeroTargetSize,
}

// BT.601 YUV 转 RGB（定点，右移 8 位）
fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
  let y = y as i32;
  let u = u as i32 - 128;
  let v = v as i32 - 128;
  let r = (y + ((359 * v) >> 8)).clamp(0, 255) as u8;
  let g = (y - ((88 * u + 183 * v) >> 8)).clamp(0, 255) as u8;
  let b = (y + ((454 * u) >> 8)).clamp(0, 255) as u8;
  [r, g, b]
}

fn validate(frame: &Frame) -> Result<(), DecodeError> {
  let (width, height) = (frame.width(), frame.height());
  if width == 0 || height == 0 {
    return Err(DecodeError::EmptyFrame { width, height });
  }
  if frame.format().is_chroma_subsampled() && (width % 2 != 0 || height % 2 != 0) {
    return Err(DecodeError::OddDimensions { width, height });
  }
  let expected = frame.format().frame_len(width, height);
  if frame.data().len() < expected {
    return Err(DecodeError::BufferTooShort {
      expected,
      actual: frame.data().len(),
    });
  }
  Ok(())
}

/// 将帧按原始方向转换为 RGB 图像
fn decode_pixels(frame: &Frame) -> RgbImage {
  let width = frame.width() as usize;
  let height = frame.height() as usize;
  let data = frame.data();
  let luma = width * height;
  let chroma_w = width / 2;
  let chroma_plane = chroma_w * (height / 2);

  match frame.format() {
    PixelFormat::Rgb8 => ImageBuffer::from_fn(frame.width(), frame.height(), |x, y| {
      let idx = (y as usize * width + x as usize) * RGB_CHANNELS;
      Rgb([data[idx], data[idx + 1], data[idx + 2]])
    }),
    PixelFormat::Nv21 | PixelFormat::Nv12 => {
      let swap = frame.format() == PixelFormat::Nv21;
      ImageBuffer::from_fn(frame.width(), frame.height(), |x, y| {
        let (x, y) = (x as usize, y as usize);
        let uv = luma + (y / 2) * width + (x / 2) * 2;
        let (u, v) = if swap {
          (data[uv + 1], data[uv])
        } else {
          (data[uv], data[uv + 1])
        };
        Rgb(yuv_to_rgb(data[y * width + x], u, v))
      })
    }
    PixelFormat::I420 => ImageBuffer::from_fn(frame.width(), frame.height(), |x, y| {
      let (x, y) = (x as usize, y as usize);
      let offset = (y / 2) * chroma_w + x / 2;
      let u = data[luma + offset];
      let v = data[luma + chroma_plane + offset];
      Rgb(yuv_to_rgb(data[y * width + x], u, v))
    }),
  }
}

/// 转换为 RGB 并按帧声明的角度旋转至正向
pub fn to_rgb_image(frame: &Frame) -> Result<RgbImage, DecodeError> {
  validate(frame)?;
  let image = decode_pixels(frame);
  let upright = match frame.rotation() {
    Rotation::Deg0 => image,
    Rotation::Deg90 => imageops::rotate90(&image),
    Rotation::Deg180 => imageops::rotate180(&image),
    Rotation::Deg270 => imageops::rotate270(&image),
  };
  Ok(upright)
}

/// 将相机帧编码为 `[target_size, target_size, 3]` 的归一化张量
///
/// 帧无法解码时返回错误，调用方应跳过该帧。
pub fn encode(frame: &Frame, target_size: u32) -> Result<InputTensor, DecodeError> {
  if target_size == 0 {
    return Err(DecodeError::ZeroTargetSize);
  }

  let upright = to_rgb_image(frame)?;
  debug!(
    "帧解码完成: {}x{} {:?}, 旋转 {} 度",
    frame.width(),
    frame.height(),
    frame.format(),
    frame.rotation().degrees()
  );

  let resized = imageops::resize(
    &upright,
    target_size,
    target_size,
    imageops::FilterType::Triangle,
  );

  let mut tensor = InputTensor::zeros(target_size);
  let slice = tensor.as_mut();
  for (dst, src) in slice.iter_mut().zip(resized.as_raw().iter()) {
    *dst = *src as f32 / 255.0;
  }

  Ok(tensor)
}
