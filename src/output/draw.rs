// 该文件是 Framewatch （帧哨） 项目的一部分。
// src/output/draw.rs - 检测结果可视化
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

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::{
  drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut},
  rect::Rect,
};

use crate::{
  model::{DetectionSet, rescale},
  output::label_text,
  pipeline::Overlay,
};

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 20.0;
const LABEL_TEXT_HEIGHT: i32 = 24;
const LABEL_CHAR_WIDTH: f32 = 11.0; // 每字符平均宽度（粗略估计）
const LABEL_TEXT_PADDING: i32 = 4;
const BOX_THICKNESS: i32 = 3;
const BOX_COLOR: [u8; 3] = [0, 255, 0]; // 绿色
const TEXT_COLOR: [u8; 3] = [255, 255, 255];

pub struct Draw {
  font: Option<FontArc>,
  font_size: f32,
  thickness: i32,
  box_color: [u8; 3],
  text_color: [u8; 3],
}

impl Default for Draw {
  fn default() -> Self {
    Self {
      font: None,
      font_size: LABEL_FONT_SIZE,
      thickness: BOX_THICKNESS,
      box_color: BOX_COLOR,
      text_color: TEXT_COLOR,
    }
  }
}

impl Draw {
  /// 设置标签字体，没有字体时只画框
  pub fn with_font(mut self, font: FontArc) -> Self {
    self.font = Some(font);
    self
  }

  /// 把检测画到图像上，坐标从 overlay 空间缩放到图像尺寸
  pub fn draw_overlay(&self, image: &mut RgbImage, overlay: &Overlay, label: &str) {
    let scaled = rescale(
      &overlay.detections,
      overlay.width,
      overlay.height,
      image.width() as f32,
      image.height() as f32,
    );
    self.draw_detections(image, &scaled, label);
  }

  /// 检测坐标已是图像像素坐标
  pub fn draw_detections(&self, image: &mut RgbImage, detections: &DetectionSet, label: &str) {
    let (w, h) = (image.width() as i32, image.height() as i32);
    if w == 0 || h == 0 {
      return;
    }

    for det in detections.iter() {
      let x_min = (det.bbox.left.floor() as i32).clamp(0, w - 1);
      let y_min = (det.bbox.top.floor() as i32).clamp(0, h - 1);
      let x_max = (det.bbox.right.ceil() as i32).clamp(0, w - 1);
      let y_max = (det.bbox.bottom.ceil() as i32).clamp(0, h - 1);

      if x_min >= x_max || y_min >= y_max {
        continue;
      }

      // 向内逐层加粗
      for t in 0..self.thickness {
        let width = x_max - x_min - 2 * t;
        let height = y_max - y_min - 2 * t;
        if width <= 0 || height <= 0 {
          break;
        }
        let rect = Rect::at(x_min + t, y_min + t).of_size(width as u32, height as u32);
        draw_hollow_rect_mut(image, rect, Rgb(self.box_color));
      }

      if let Some(font) = &self.font {
        self.draw_label(image, font, x_min, y_min, &label_text(label, det.confidence));
      }
    }
  }

  fn draw_label(&self, image: &mut RgbImage, font: &FontArc, x: i32, y: i32, text: &str) {
    let w = image.width() as i32;
    let text_width =
      (text.chars().count() as f32 * LABEL_CHAR_WIDTH) as i32 + 2 * LABEL_TEXT_PADDING;
    let text_height = LABEL_TEXT_HEIGHT;

    // 标签放在框上方，放不下时贴着图像顶部
    let label_y = (y - text_height).max(0);
    let label_width = text_width.min(w - x);
    if label_width <= 0 {
      return;
    }

    let rect = Rect::at(x, label_y).of_size(label_width as u32, text_height as u32);
    draw_filled_rect_mut(image, rect, Rgb(self.box_color));
    draw_text_mut(
      image,
      Rgb(self.text_color),
      x + LABEL_TEXT_PADDING,
      label_y + (text_height - self.font_size as i32) / 2,
      PxScale::from(self.font_size),
      font,
      text,
    );
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::{BoundingBox, Detection};

  fn overlay(bbox: BoundingBox, width: f32, height: f32) -> Overlay {
    Overlay {
      detections: DetectionSet::from(vec![Detection {
        bbox,
        confidence: 0.9,
      }]),
      width,
      height,
    }
  }

  #[test]
  fn draws_box_edges_in_image_space() {
    let mut image = RgbImage::new(20, 20);
    // overlay 空间 40x40 -> 图像 20x20
    let overlay = overlay(BoundingBox::new(8.0, 8.0, 32.0, 32.0), 40.0, 40.0);
    Draw::default().draw_overlay(&mut image, &overlay, "Printer");

    assert_eq!(image.get_pixel(4, 4), &Rgb(BOX_COLOR));
    assert_eq!(image.get_pixel(10, 4), &Rgb(BOX_COLOR));
    // 框内部保持原样
    assert_eq!(image.get_pixel(10, 10), &Rgb([0, 0, 0]));
  }

  #[test]
  fn ignores_boxes_outside_image() {
    let mut image = RgbImage::new(10, 10);
    let overlay = overlay(BoundingBox::new(50.0, 50.0, 60.0, 60.0), 10.0, 10.0);
    Draw::default().draw_overlay(&mut image, &overlay, "Printer");
    assert!(image.pixels().all(|p| p == &Rgb([0, 0, 0])));
  }
}
