// 该文件是 Framewatch （帧哨） 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
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

use std::{
  path::PathBuf,
  sync::atomic::{AtomicU16, Ordering},
};

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::{
  FromUrl, FromUrlWithScheme,
  encoder::{self, DecodeError},
  frame::Frame,
  model::DetectionSet,
  output::{Render, label_param},
  pipeline::Overlay,
  utils::{query_flag, url_file_path},
};

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("序列化错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("帧解码失败: {0}")]
  DecodeError(#[from] DecodeError),
}

/// 一帧的检测记录
#[derive(Debug, Serialize)]
pub struct FrameRecord<'a> {
  pub timestamp: String,
  pub label: &'a str,
  pub width: f32,
  pub height: f32,
  pub detections: &'a DetectionSet,
}

/// `folder:///path/to/records?always&image&label=Printer`
///
/// 每帧写入 `YYYY/MM/DD/HH-MM-SS-XXXX.json`，带 `image` 时同时保存正向帧图像。
/// 默认只记录有检测的帧，`always` 时每帧都记录。
pub struct DirectoryRecordOutput {
  directory: PathBuf,
  label: String,
  frame_counter: AtomicU16,
  always: bool,
  save_image: bool,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    Ok(DirectoryRecordOutput {
      directory: url_file_path(uri),
      label: label_param(uri),
      frame_counter: AtomicU16::new(0),
      always: query_flag(uri, "always"),
      save_image: query_flag(uri, "image"),
    })
  }
}

impl DirectoryRecordOutput {
  fn frame_id(&self) -> u16 {
    self.frame_counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
  }

  /// 不带扩展名的记录路径
  fn frame_path(&self, now: &DateTime<Utc>) -> Result<PathBuf, DirectoryRecordOutputError> {
    let directory = self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()));
    std::fs::create_dir_all(&directory)?;

    Ok(directory.join(format!(
      "{}-{:04X}",
      now.format("%H-%M-%S"),
      self.frame_id()
    )))
  }
}

impl Render<Frame, Overlay> for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(&self, frame: &Frame, result: &Overlay) -> Result<(), Self::Error> {
    if !self.always && result.detections.is_empty() {
      return Ok(());
    }

    let now = Utc::now();
    let path = self.frame_path(&now)?;

    let record = FrameRecord {
      timestamp: now.to_rfc3339(),
      label: &self.label,
      width: result.width,
      height: result.height,
      detections: &result.detections,
    };
    let json_path = path.with_extension("json");
    std::fs::write(&json_path, serde_json::to_vec_pretty(&record)?)?;
    debug!("写入检测记录: {}", json_path.display());

    if self.save_image {
      let image = encoder::to_rgb_image(frame)?;
      image.save(path.with_extension("png"))?;
    }

    Ok(())
  }
}
