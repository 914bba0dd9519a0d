// 该文件是 Framewatch （帧哨） 项目的一部分。
// src/output/save_image_file.rs - 保存带检测框的图像文件
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

use std::path::PathBuf;

use ab_glyph::FontArc;
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  encoder::{self, DecodeError},
  frame::Frame,
  output::{Render, draw::Draw, label_param},
  pipeline::Overlay,
  utils::url_file_path,
};

/// `image:///path/to/out.png?label=Printer&font=/path/to/font.ttf`
pub struct SaveImageFileOutput {
  path: PathBuf,
  label: String,
  draw: Draw,
}

#[derive(Error, Debug)]
pub enum SaveImageFileError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("字体无效: {0}")]
  FontError(String),
  #[error("帧解码失败: {0}")]
  DecodeError(#[from] DecodeError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

impl FromUrlWithScheme for SaveImageFileOutput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(SaveImageFileError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    let mut draw = Draw::default();
    if let Some((_, font_path)) = uri.query_pairs().find(|(k, _)| k == "font") {
      let data = std::fs::read(&*font_path)?;
      let font =
        FontArc::try_from_vec(data).map_err(|e| SaveImageFileError::FontError(e.to_string()))?;
      info!("加载标签字体: {}", font_path);
      draw = draw.with_font(font);
    } else {
      warn!("未指定字体，只绘制检测框");
    }

    Ok(SaveImageFileOutput {
      path: url_file_path(uri),
      label: label_param(uri),
      draw,
    })
  }
}

impl SaveImageFileOutput {
  fn save_image(&self, image: image::RgbImage) -> Result<(), SaveImageFileError> {
    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }

    image.save(&self.path)?;

    info!("保存图像到文件: {}", self.path.display());

    Ok(())
  }
}

impl Render<Frame, Overlay> for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn render_result(&self, frame: &Frame, result: &Overlay) -> Result<(), Self::Error> {
    let mut image = encoder::to_rgb_image(frame)?;
    self.draw.draw_overlay(&mut image, result, &self.label);
    self.save_image(image)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    frame::PixelFormat,
    model::{BoundingBox, Detection, DetectionSet},
  };

  #[test]
  fn writes_drawn_frame() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("out.png");
    let url = Url::parse(&format!("image://{}", path.display())).unwrap();
    let output = SaveImageFileOutput::from_url(&url).unwrap();

    let frame = Frame::new(16, 16, PixelFormat::Rgb8, vec![0; 16 * 16 * 3]);
    let overlay = Overlay {
      detections: DetectionSet::from(vec![Detection {
        bbox: BoundingBox::new(2.0, 2.0, 12.0, 12.0),
        confidence: 0.8,
      }]),
      width: 16.0,
      height: 16.0,
    };
    output.render_result(&frame, &overlay).unwrap();

    let saved = image::open(&path).unwrap().to_rgb8();
    assert_eq!(saved.dimensions(), (16, 16));
    assert_eq!(saved.get_pixel(2, 2), &image::Rgb([0, 255, 0]));
  }

  #[test]
  fn saves_to_escaped_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("saved frames").join("out.png");
    let url = Url::parse(&format!("image://{}", path.display())).unwrap();
    let output = SaveImageFileOutput::from_url(&url).unwrap();

    let frame = Frame::new(4, 4, PixelFormat::Rgb8, vec![0; 4 * 4 * 3]);
    output
      .render_result(&frame, &Overlay::empty(4.0, 4.0))
      .unwrap();
    assert!(path.exists());
  }

  #[test]
  fn corrupt_frame_is_reported() {
    let url = Url::parse("image:///tmp/framewatch-never-written.png").unwrap();
    let output = SaveImageFileOutput::from_url(&url).unwrap();
    let frame = Frame::new(16, 16, PixelFormat::Rgb8, vec![0; 3]);
    let err = output
      .render_result(&frame, &Overlay::empty(16.0, 16.0))
      .unwrap_err();
    assert!(matches!(err, SaveImageFileError::DecodeError(_)));
  }

  #[test]
  fn missing_font_fails_construction() {
    let url = Url::parse("image:///tmp/out.png?font=/nonexistent/font.ttf").unwrap();
    assert!(matches!(
      SaveImageFileOutput::from_url(&url),
      Err(SaveImageFileError::IoError(_))
    ));
  }
}
