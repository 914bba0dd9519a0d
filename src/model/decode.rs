// 该文件是 Framewatch （帧哨） 项目的一部分。
// src/model/decode.rs - 原始输出解码为候选检测
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

use tracing::debug;

use crate::model::{BoundingBox, Detection, DetectionSet, RawOutput};

pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;

/// 将 `[1, 5, N]` 原始输出解码为候选检测（未做 NMS）
///
/// 置信度必须严格大于阈值；中心框坐标为归一化值，转换为
/// `input_size x input_size` 空间内的角点坐标并裁剪到图像范围，
/// 裁剪后退化的框被丢弃。输出按候选索引顺序排列。
pub fn decode(output: &RawOutput, input_size: u32, confidence_threshold: f32) -> DetectionSet {
  let size = input_size as f32;
  let mut items = Vec::new();

  for candidate in output.candidates() {
    // NaN 也不会通过该比较
    if !(candidate.confidence > confidence_threshold) {
      continue;
    }

    let half_w = candidate.w / 2.0;
    let half_h = candidate.h / 2.0;

    let left = ((candidate.cx - half_w) * size).clamp(0.0, size);
    let top = ((candidate.cy - half_h) * size).clamp(0.0, size);
    let right = ((candidate.cx + half_w) * size).clamp(0.0, size);
    let bottom = ((candidate.cy + half_h) * size).clamp(0.0, size);

    let bbox = BoundingBox::new(left, top, right, bottom);
    if bbox.is_degenerate() {
      continue;
    }

    items.push(Detection {
      bbox,
      confidence: candidate.confidence,
    });
  }

  debug!(
    "解码 {} 个候选框, 保留 {} 个",
    output.num_candidates(),
    items.len()
  );

  DetectionSet::from(items)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::Candidate;
  use approx::assert_relative_eq;

  fn single(cx: f32, cy: f32, w: f32, h: f32, confidence: f32) -> RawOutput {
    RawOutput::from_candidates(&[Candidate {
      cx,
      cy,
      w,
      h,
      confidence,
    }])
  }

  #[test]
  fn decodes_centered_box() {
    let set = decode(&single(0.5, 0.5, 0.4, 0.4, 0.9), 640, 0.5);
    assert_eq!(set.len(), 1);
    let det = set.items[0];
    assert_relative_eq!(det.bbox.left, 192.0, epsilon = 1e-3);
    assert_relative_eq!(det.bbox.top, 192.0, epsilon = 1e-3);
    assert_relative_eq!(det.bbox.right, 448.0, epsilon = 1e-3);
    assert_relative_eq!(det.bbox.bottom, 448.0, epsilon = 1e-3);
    assert_relative_eq!(det.confidence, 0.9);

    // 宽高是完整尺寸，不是半宽
    let set = decode(&single(0.5, 0.5, 0.2, 0.2, 0.9), 640, 0.5);
    assert_relative_eq!(set.items[0].bbox.left, 256.0, epsilon = 1e-3);
    assert_relative_eq!(set.items[0].bbox.right, 384.0, epsilon = 1e-3);
  }

  #[test]
  fn confidence_at_threshold_is_dropped() {
    assert!(decode(&single(0.5, 0.5, 0.2, 0.2, 0.5), 640, 0.5).is_empty());
    assert_eq!(decode(&single(0.5, 0.5, 0.2, 0.2, 0.5001), 640, 0.5).len(), 1);
  }

  #[test]
  fn nan_confidence_is_dropped() {
    assert!(decode(&single(0.5, 0.5, 0.2, 0.2, f32::NAN), 640, 0.5).is_empty());
  }

  #[test]
  fn clamps_to_image_bounds() {
    let set = decode(&single(0.0, 1.0, 0.5, 0.5, 0.8), 100, 0.5);
    let bbox = set.items[0].bbox;
    assert_relative_eq!(bbox.left, 0.0);
    assert_relative_eq!(bbox.top, 75.0);
    assert_relative_eq!(bbox.right, 25.0);
    assert_relative_eq!(bbox.bottom, 100.0);
  }

  #[test]
  fn drops_boxes_degenerate_after_clamping() {
    // 完全在图像左侧之外
    assert!(decode(&single(-0.5, 0.5, 0.2, 0.2, 0.9), 640, 0.5).is_empty());
    // 宽度为零
    assert!(decode(&single(0.5, 0.5, 0.0, 0.2, 0.9), 640, 0.5).is_empty());
  }

  #[test]
  fn keeps_index_order() {
    let output = RawOutput::from_candidates(&[
      Candidate {
        cx: 0.2,
        cy: 0.2,
        w: 0.1,
        h: 0.1,
        confidence: 0.6,
      },
      Candidate {
        cx: 0.5,
        cy: 0.5,
        w: 0.1,
        h: 0.1,
        confidence: 0.3,
      },
      Candidate {
        cx: 0.8,
        cy: 0.8,
        w: 0.1,
        h: 0.1,
        confidence: 0.95,
      },
    ]);
    let set = decode(&output, 10, 0.5);
    let confidences: Vec<f32> = set.iter().map(|d| d.confidence).collect();
    assert_eq!(confidences, vec![0.6, 0.95]);
  }
}
