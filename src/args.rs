// 该文件是 Framewatch （帧哨） 项目的一部分。
// src/args.rs - 项目参数配置
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

use clap::{Parser, ValueEnum};
use url::Url;

use framewatch::{
  model::{DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_IOU_THRESHOLD},
  pipeline::{DEFAULT_INPUT_SIZE, DisplaySize, PipelineConfig},
};

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
  /// 只处理第一帧
  Once,
  /// 顺序处理每一帧
  #[default]
  Continuous,
  /// 只处理最新帧，处理期间到达的帧被丢弃
  Live,
}

/// Framewatch 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 模型来源，如 replay:///path/to/output.f32
  #[arg(long, value_name = "MODEL")]
  pub model: Url,

  /// 输入来源
  /// - 图片: image:///path/to/image.jpg?rotation=90
  /// - 原始帧: raw:///path/to/capture.nv21?width=640&height=480&format=nv21
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,

  /// 输出路径
  /// - 日志: log://?label=Printer
  /// - 图片: image:///path/to/result.png
  /// - 目录记录: folder:///path/to/records?image
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,

  /// 置信度阈值 (0.0 - 1.0)，严格大于才保留
  #[arg(long, default_value_t = DEFAULT_CONFIDENCE_THRESHOLD, value_name = "THRESHOLD")]
  pub confidence: f32,

  /// NMS IOU 阈值 (0.0 - 1.0)
  #[arg(long, default_value_t = DEFAULT_IOU_THRESHOLD, value_name = "THRESHOLD")]
  pub iou: f32,

  /// 模型输入边长
  #[arg(long, default_value_t = DEFAULT_INPUT_SIZE, value_name = "SIZE")]
  pub input_size: u32,

  /// 显示面宽度，0 表示保持模型输入坐标
  #[arg(long, default_value_t = 0.0, value_name = "WIDTH")]
  pub display_width: f32,

  /// 显示面高度，0 表示保持模型输入坐标
  #[arg(long, default_value_t = 0.0, value_name = "HEIGHT")]
  pub display_height: f32,

  #[arg(long, value_enum, default_value_t = Mode::default())]
  pub mode: Mode,

  /// 最多处理的帧数
  #[arg(long, value_name = "FRAME_NUMBER")]
  pub frame_number: Option<u64>,
}

impl Args {
  pub fn pipeline_config(&self) -> PipelineConfig {
    PipelineConfig::default()
      .input_size(self.input_size)
      .confidence_threshold(self.confidence)
      .iou_threshold(self.iou)
  }

  pub fn display_size(&self) -> DisplaySize {
    DisplaySize::new(self.display_width, self.display_height)
  }
}
