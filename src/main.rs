// 该文件是 Framewatch （帧哨） 项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use framewatch::{
  FromUrl,
  input::InputWrapper,
  model::ReplayModelBuilder,
  output::OutputWrapper,
  pipeline::Pipeline,
  task::{ContinuousTask, LiveTask, OneShotTask, StopSignal, Task},
};

use args::{Args, Mode};

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型来源: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);
  info!(
    "置信度阈值: {}, NMS 阈值: {}, 输入边长: {}",
    args.confidence, args.iou, args.input_size
  );

  let model = ReplayModelBuilder::from_url(&args.model)?.build()?;
  let input = InputWrapper::from_url(&args.input)?;
  let output = OutputWrapper::from_url(&args.output)?;
  let pipeline = Pipeline::new(model, args.pipeline_config());
  let display = args.display_size();

  let summary = match args.mode {
    Mode::Once => OneShotTask::default()
      .with_display(display)
      .run_task(input, &pipeline, output)?,
    Mode::Continuous => ContinuousTask::default()
      .with_display(display)
      .with_frame_number(args.frame_number)
      .with_stop(StopSignal::install_ctrlc()?)
      .run_task(input, &pipeline, output)?,
    Mode::Live => LiveTask::default()
      .with_display(display)
      .with_frame_number(args.frame_number)
      .with_stop(StopSignal::install_ctrlc()?)
      .run_task(input, &pipeline, output)?,
  };

  info!(
    "处理完成: {} 帧, 渲染 {}, 跳过 {}, 推理失败 {}, 丢弃 {}",
    summary.processed,
    summary.rendered,
    summary.skipped,
    summary.inference_failures,
    summary.dropped
  );

  Ok(())
}
