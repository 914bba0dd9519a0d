// 该文件是 Framewatch （帧哨） 项目的一部分。
// src/output/log_output.rs - 日志输出
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

use std::convert::Infallible;

use tracing::info;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::Frame,
  output::{OutputError, Render, label_param, label_text},
  pipeline::Overlay,
};

/// 以日志形式输出每个检测
pub struct LogOutput {
  label: String,
}

impl FromUrlWithScheme for LogOutput {
  const SCHEME: &'static str = "log";
}

impl FromUrl for LogOutput {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(OutputError::SchemeMismatch(url.scheme().to_string()));
    }
    Ok(LogOutput {
      label: label_param(url),
    })
  }
}

impl Render<Frame, Overlay> for LogOutput {
  type Error = Infallible;

  fn render_result(&self, _frame: &Frame, result: &Overlay) -> Result<(), Self::Error> {
    info!(
      "检测到 {} 个对象 ({}x{})",
      result.detections.len(),
      result.width,
      result.height
    );
    for det in result.detections.iter() {
      info!(
        "  - {} at ({:.0}, {:.0}, {:.0}, {:.0})",
        label_text(&self.label, det.confidence),
        det.bbox.left,
        det.bbox.top,
        det.bbox.right,
        det.bbox.bottom
      );
    }
    Ok(())
  }
}
