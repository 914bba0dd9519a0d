// 该文件是 Framewatch （帧哨） 项目的一部分。
// src/input.rs - 帧输入源
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

use thiserror::Error;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::{Frame, Rotation},
  utils::{QueryError, query_param},
};

mod raw_file;
mod read_image_file;

pub use self::raw_file::RawFileInput;
pub use self::read_image_file::ImageFileInput;

#[derive(Error, Debug)]
pub enum InputError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像加载错误: {0}")]
  ImageLoadError(#[from] image::ImageError),
  #[error("旋转角度必须是 90 的整数倍: {0}")]
  InvalidRotation(i32),
  #[error("缺少参数: {0}")]
  MissingParameter(&'static str),
  #[error("像素格式错误: {0}")]
  PixelFormat(#[from] crate::frame::UnknownPixelFormat),
  #[error("{0}")]
  Query(#[from] QueryError),
}

/// 读取 `rotation` 参数，默认 0 度
fn rotation_param(url: &Url) -> Result<Rotation, InputError> {
  let degrees = query_param::<i32>(url, "rotation")?.unwrap_or(0);
  Rotation::from_degrees(degrees).ok_or(InputError::InvalidRotation(degrees))
}

pub enum InputWrapper {
  ReadImageFile(ImageFileInput),
  RawFile(RawFileInput),
}

impl FromUrl for InputWrapper {
  type Error = InputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      ImageFileInput::SCHEME => Ok(InputWrapper::ReadImageFile(ImageFileInput::from_url(url)?)),
      RawFileInput::SCHEME => Ok(InputWrapper::RawFile(RawFileInput::from_url(url)?)),
      other => Err(InputError::SchemeMismatch(other.to_string())),
    }
  }
}

impl Iterator for InputWrapper {
  type Item = Frame;

  fn next(&mut self) -> Option<Self::Item> {
    match self {
      InputWrapper::ReadImageFile(input) => input.next(),
      InputWrapper::RawFile(input) => input.next(),
    }
  }
}
