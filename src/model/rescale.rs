// 该文件是 Framewatch （帧哨） 项目的一部分。
// src/model/rescale.rs - 检测坐标缩放到显示空间
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

use crate::model::{BoundingBox, Detection, DetectionSet};

/// 将检测从 `from` 空间按宽高独立缩放到 `to` 空间
///
/// 目标宽或高为 0（显示面尚未布局）时原样返回。
pub fn rescale(
  detections: &DetectionSet,
  from_width: f32,
  from_height: f32,
  to_width: f32,
  to_height: f32,
) -> DetectionSet {
  if to_width == 0.0 || to_height == 0.0 {
    return detections.clone();
  }

  let scale_x = to_width / from_width;
  let scale_y = to_height / from_height;

  detections
    .iter()
    .map(|det| Detection {
      bbox: BoundingBox {
        left: det.bbox.left * scale_x,
        top: det.bbox.top * scale_y,
        right: det.bbox.right * scale_x,
        bottom: det.bbox.bottom * scale_y,
      },
      confidence: det.confidence,
    })
    .collect()
}
