// 该文件是 Framewatch （帧哨） 项目的一部分。
// src/task.rs - 任务调度：单帧、连续与只保留最新帧
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
  sync::{
    Arc, Condvar, Mutex, PoisonError,
    atomic::{AtomicBool, AtomicU64, Ordering},
  },
  thread,
  time::{Duration, Instant},
};

use tracing::{debug, info, warn};

use crate::{
  frame::Frame,
  model::Model,
  output::Render,
  pipeline::{DisplaySize, FrameError, Overlay, Pipeline},
};

pub trait Task<I, M, O>: Sized {
  type Error;
  fn run_task(
    self,
    input: I,
    pipeline: &Pipeline<M>,
    output: O,
  ) -> Result<TaskSummary, Self::Error>;
}

/// 任务统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TaskSummary {
  /// 交给流水线的帧数
  pub processed: u64,
  /// 已渲染的帧数（含推理失败后的空结果）
  pub rendered: u64,
  /// 解码失败而跳过的帧数
  pub skipped: u64,
  /// 推理失败的帧数
  pub inference_failures: u64,
  /// 因只保留最新帧而丢弃的帧数
  pub dropped: u64,
}

/// 停止信号，在帧与帧之间检查
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
  pub fn new() -> Self {
    Self::default()
  }

  /// 注册 Ctrl-C 处理，每个进程只能调用一次
  pub fn install_ctrlc() -> Result<Self, ctrlc::Error> {
    let signal = Self::new();
    let handle = signal.clone();
    ctrlc::set_handler(move || {
      info!("收到中断信号，准备退出...");
      handle.trigger();
      thread::spawn(|| {
        thread::sleep(Duration::from_secs(30));
        warn!("强制退出程序");
        std::process::exit(1);
      });
    })?;
    Ok(signal)
  }

  pub fn trigger(&self) {
    self.0.store(true, Ordering::SeqCst);
  }

  pub fn is_triggered(&self) -> bool {
    self.0.load(Ordering::SeqCst)
  }
}

/// 处理并渲染一帧；单帧错误只记录日志，渲染错误向上传递
fn handle_frame<M, O>(
  pipeline: &Pipeline<M>,
  frame: &Frame,
  display: DisplaySize,
  output: &O,
  summary: &mut TaskSummary,
) -> anyhow::Result<()>
where
  M: Model,
  O: Render<Frame, Overlay>,
  O::Error: std::error::Error + Send + Sync + 'static,
{
  summary.processed += 1;
  let now = Instant::now();
  let overlay = match pipeline.overlay(frame, display) {
    Ok(overlay) => overlay,
    Err(FrameError::Decode(e)) => {
      warn!("跳过无法解码的帧: {}", e);
      summary.skipped += 1;
      return Ok(());
    }
    Err(e @ FrameError::Inference(_)) => {
      warn!("{}，本帧按无检测处理", e);
      summary.inference_failures += 1;
      let (width, height) = pipeline.overlay_space(display);
      Overlay::empty(width, height)
    }
  };
  let elapsed_a = now.elapsed();
  output.render_result(frame, &overlay)?;
  let elapsed_b = now.elapsed();
  summary.rendered += 1;
  info!(
    "检测到 {} 个对象，耗时: {:.2?} / {:.2?}",
    overlay.detections.len(),
    elapsed_a,
    elapsed_b
  );
  Ok(())
}

/// 只处理第一帧
#[derive(Debug, Default)]
pub struct OneShotTask {
  display: DisplaySize,
}

impl OneShotTask {
  pub fn with_display(mut self, display: DisplaySize) -> Self {
    self.display = display;
    self
  }
}

impl<I, M, O> Task<I, M, O> for OneShotTask
where
  I: Iterator<Item = Frame>,
  M: Model,
  O: Render<Frame, Overlay>,
  O::Error: std::error::Error + Send + Sync + 'static,
{
  type Error = anyhow::Error;

  fn run_task(
    self,
    mut input: I,
    pipeline: &Pipeline<M>,
    output: O,
  ) -> Result<TaskSummary, Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    let mut summary = TaskSummary::default();
    handle_frame(pipeline, &frame, self.display, &output, &mut summary)?;
    Ok(summary)
  }
}

/// 顺序处理每一帧
#[derive(Debug, Default)]
pub struct ContinuousTask {
  display: DisplaySize,
  frame_number: Option<u64>,
  stop: StopSignal,
}

impl ContinuousTask {
  pub fn with_display(mut self, display: DisplaySize) -> Self {
    self.display = display;
    self
  }

  pub fn with_frame_number(mut self, frame_number: Option<u64>) -> Self {
    self.frame_number = frame_number;
    self
  }

  pub fn with_stop(mut self, stop: StopSignal) -> Self {
    self.stop = stop;
    self
  }
}

impl<I, M, O> Task<I, M, O> for ContinuousTask
where
  I: Iterator<Item = Frame>,
  M: Model,
  O: Render<Frame, Overlay>,
  O::Error: std::error::Error + Send + Sync + 'static,
{
  type Error = anyhow::Error;

  fn run_task(
    self,
    input: I,
    pipeline: &Pipeline<M>,
    output: O,
  ) -> Result<TaskSummary, Self::Error> {
    info!("开始任务...");
    let mut summary = TaskSummary::default();
    for frame in input {
      debug!("处理第 {} 帧图像", summary.processed + 1);
      handle_frame(pipeline, &frame, self.display, &output, &mut summary)?;
      if self.frame_number.is_some_and(|n| summary.processed >= n) {
        info!("达到指定帧数 {}, 退出任务循环", summary.processed);
        break;
      }
      if self.stop.is_triggered() {
        warn!("中断信号接收，退出任务循环");
        break;
      }
    }

    info!("任务完成，退出: {:?}", summary);
    Ok(summary)
  }
}

struct Slot<T> {
  frame: Option<T>,
  closed: bool,
}

/// 只保留最新一帧的单槽信箱
///
/// 生产端发布新帧时替换尚未被取走的旧帧；消费端阻塞等待，
/// 信箱关闭且为空时返回 `None`。
pub struct LatestFrame<T> {
  slot: Mutex<Slot<T>>,
  ready: Condvar,
}

impl<T> Default for LatestFrame<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T> LatestFrame<T> {
  pub fn new() -> Self {
    Self {
      slot: Mutex::new(Slot {
        frame: None,
        closed: false,
      }),
      ready: Condvar::new(),
    }
  }

  /// 发布一帧，返回不会被处理的帧（被替换的旧帧，或关闭后被拒绝的新帧）
  pub fn publish(&self, frame: T) -> Option<T> {
    let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
    if slot.closed {
      return Some(frame);
    }
    let replaced = slot.frame.replace(frame);
    self.ready.notify_one();
    replaced
  }

  /// 阻塞直到有帧可取或信箱关闭
  pub fn take(&self) -> Option<T> {
    let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
    loop {
      if let Some(frame) = slot.frame.take() {
        return Some(frame);
      }
      if slot.closed {
        return None;
      }
      slot = self
        .ready
        .wait(slot)
        .unwrap_or_else(PoisonError::into_inner);
    }
  }

  pub fn try_take(&self) -> Option<T> {
    self
      .slot
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .frame
      .take()
  }

  pub fn close(&self) {
    let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
    slot.closed = true;
    self.ready.notify_all();
  }

  pub fn is_closed(&self) -> bool {
    self.slot.lock().unwrap_or_else(PoisonError::into_inner).closed
  }
}

/// 输入在独立线程上产出帧，处理线程只取最新一帧，处理期间到达的旧帧被丢弃
#[derive(Debug, Default)]
pub struct LiveTask {
  display: DisplaySize,
  frame_number: Option<u64>,
  stop: StopSignal,
}

impl LiveTask {
  pub fn with_display(mut self, display: DisplaySize) -> Self {
    self.display = display;
    self
  }

  pub fn with_frame_number(mut self, frame_number: Option<u64>) -> Self {
    self.frame_number = frame_number;
    self
  }

  pub fn with_stop(mut self, stop: StopSignal) -> Self {
    self.stop = stop;
    self
  }
}

impl<I, M, O> Task<I, M, O> for LiveTask
where
  I: Iterator<Item = Frame> + Send,
  M: Model,
  O: Render<Frame, Overlay>,
  O::Error: std::error::Error + Send + Sync + 'static,
{
  type Error = anyhow::Error;

  fn run_task(
    self,
    input: I,
    pipeline: &Pipeline<M>,
    output: O,
  ) -> Result<TaskSummary, Self::Error> {
    info!("开始实时任务...");
    let mailbox = LatestFrame::new();
    let dropped = AtomicU64::new(0);

    let result = thread::scope(|scope| {
      let mailbox = &mailbox;
      let dropped = &dropped;
      let stop = &self.stop;

      scope.spawn(move || {
        let mut input = input;
        // 先检查再取帧，取出的每一帧都会进入信箱或计入丢弃
        while !mailbox.is_closed() && !stop.is_triggered() {
          let Some(frame) = input.next() else {
            break;
          };
          if mailbox.publish(frame).is_some() {
            dropped.fetch_add(1, Ordering::Relaxed);
            debug!("处理中，丢弃旧帧");
          }
        }
        mailbox.close();
      });

      let mut summary = TaskSummary::default();
      let outcome = (|| -> anyhow::Result<()> {
        while let Some(frame) = mailbox.take() {
          handle_frame(pipeline, &frame, self.display, &output, &mut summary)?;
          if self.frame_number.is_some_and(|n| summary.processed >= n) {
            info!("达到指定帧数 {}, 退出任务循环", summary.processed);
            break;
          }
          if stop.is_triggered() {
            warn!("中断信号接收，退出任务循环");
            break;
          }
        }
        Ok(())
      })();
      // 让生产线程在下一帧时退出
      mailbox.close();
      outcome.map(|()| summary)
    });

    let mut summary = result?;
    // 关闭后仍留在信箱里的帧也算丢弃
    if mailbox.try_take().is_some() {
      dropped.fetch_add(1, Ordering::Relaxed);
    }
    summary.dropped = dropped.load(Ordering::Relaxed);
    info!("任务完成，退出: {:?}", summary);
    Ok(summary)
  }
}
