// 该文件是 Framewatch （帧哨） 项目的一部分。
// src/model/nms.rs - 非极大值抑制
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

use std::cmp::Ordering;

use tracing::debug;

use crate::model::{BoundingBox, Detection, DetectionSet};

pub const DEFAULT_IOU_THRESHOLD: f32 = 0.45;

/// 计算两个边界框的 IoU
pub fn iou(a: &BoundingBox, b: &BoundingBox) -> f32 {
  let inter_w = (a.right.min(b.right) - a.left.max(b.left)).max(0.0);
  let inter_h = (a.bottom.min(b.bottom) - a.top.max(b.top)).max(0.0);
  let intersection = inter_w * inter_h;

  let union = a.area() + b.area() - intersection;

  if union > 0.0 {
    intersection / union
  } else {
    0.0
  }
}

/// 单类别贪心 NMS
///
/// 按置信度降序稳定排序（同分保持原顺序），依次与已保留的检测比较，
/// 与任一已保留检测的 IoU 超过阈值则丢弃。返回值按接受顺序排列。
pub fn suppress(detections: &DetectionSet, iou_threshold: f32) -> DetectionSet {
  let mut sorted: Vec<&Detection> = detections.iter().collect();
  // sort_by 是稳定排序
  sorted.sort_by(|a, b| {
    b.confidence
      .partial_cmp(&a.confidence)
      .unwrap_or(Ordering::Equal)
  });

  let mut selected: Vec<Detection> = Vec::new();
  for candidate in sorted {
    let overlapped = selected
      .iter()
      .any(|kept| iou(&candidate.bbox, &kept.bbox) > iou_threshold);
    if !overlapped {
      selected.push(*candidate);
    }
  }

  debug!("NMS: {} -> {}", detections.len(), selected.len());

  DetectionSet::from(selected)
}

#[cfg(test)]
mod tests {
  use super::*;
  use approx::assert_relative_eq;

  fn det(left: f32, top: f32, right: f32, bottom: f32, confidence: f32) -> Detection {
    Detection {
      bbox: BoundingBox::new(left, top, right, bottom),
      confidence,
    }
  }

  #[test]
  fn iou_of_identical_boxes_is_one() {
    let a = BoundingBox::new(10.0, 20.0, 50.0, 80.0);
    assert_relative_eq!(iou(&a, &a), 1.0);
  }

  #[test]
  fn iou_of_disjoint_boxes_is_zero() {
    let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
    let b = BoundingBox::new(20.0, 20.0, 30.0, 30.0);
    assert_eq!(iou(&a, &b), 0.0);
    // 只共享一条边
    let c = BoundingBox::new(10.0, 0.0, 20.0, 10.0);
    assert_eq!(iou(&a, &c), 0.0);
  }

  #[test]
  fn iou_of_partial_overlap() {
    let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
    let b = BoundingBox::new(5.0, 0.0, 15.0, 10.0);
    // 交集 50，并集 150
    assert_relative_eq!(iou(&a, &b), 1.0 / 3.0, epsilon = 1e-6);
    assert_relative_eq!(a.iou(&b), b.iou(&a));
  }

  #[test]
  fn iou_with_zero_union_is_zero() {
    let a = BoundingBox::new(1.0, 1.0, 1.0, 1.0);
    assert_eq!(iou(&a, &a), 0.0);
  }

  #[test]
  fn overlapping_pair_keeps_higher_confidence() {
    // 交集 85x100，并集 115x100，IoU ≈ 0.739
    let low = det(15.0, 0.0, 115.0, 100.0, 0.6);
    let high = det(0.0, 0.0, 100.0, 100.0, 0.9);
    assert!(iou(&low.bbox, &high.bbox) > 0.7);
    let kept = suppress(&DetectionSet::from(vec![low, high]), 0.45);
    assert_eq!(kept.items, vec![high]);
  }

  #[test]
  fn disjoint_pair_keeps_both_in_confidence_order() {
    let a = det(0.0, 0.0, 10.0, 10.0, 0.7);
    let b = det(100.0, 100.0, 110.0, 110.0, 0.8);
    let kept = suppress(&DetectionSet::from(vec![a, b]), 0.45);
    assert_eq!(kept.items, vec![b, a]);
  }

  #[test]
  fn ties_keep_decode_order() {
    let a = det(0.0, 0.0, 10.0, 10.0, 0.8);
    let b = det(1.0, 1.0, 11.0, 11.0, 0.8);
    let kept = suppress(&DetectionSet::from(vec![a, b]), 0.45);
    assert_eq!(kept.items, vec![a]);
    let kept = suppress(&DetectionSet::from(vec![b, a]), 0.45);
    assert_eq!(kept.items, vec![b]);
  }

  #[test]
  fn iou_equal_to_threshold_is_kept() {
    let a = det(0.0, 0.0, 10.0, 10.0, 0.9);
    let b = det(5.0, 0.0, 15.0, 10.0, 0.5);
    let threshold = iou(&a.bbox, &b.bbox);
    let kept = suppress(&DetectionSet::from(vec![a, b]), threshold);
    assert_eq!(kept.len(), 2);
  }

  #[test]
  fn suppression_is_against_selected_only() {
    // b 被 a 抑制，c 只与 b 重叠，因此保留
    let a = det(0.0, 0.0, 10.0, 10.0, 0.9);
    let b = det(3.0, 0.0, 13.0, 10.0, 0.8);
    let c = det(6.0, 0.0, 16.0, 10.0, 0.7);
    assert!(iou(&b.bbox, &c.bbox) > 0.45);
    let kept = suppress(&DetectionSet::from(vec![a, b, c]), 0.45);
    assert_eq!(kept.items, vec![a, c]);
  }

  #[test]
  fn empty_input_gives_empty_output() {
    assert!(suppress(&DetectionSet::new(), 0.45).is_empty());
  }
}
