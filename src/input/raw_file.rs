// 该文件是 Framewatch （帧哨） 项目的一部分。
// src/input/raw_file.rs - 原始相机帧文件输入
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
  fs::File,
  io::{BufReader, ErrorKind, Read},
};

use tracing::{debug, error, info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::{Frame, PixelFormat, Rotation},
  input::{InputError, rotation_param},
  utils::{query_param, url_file_path},
};

/// 连续存放的原始帧
///
/// `raw:///path/to/capture.nv21?format=nv21&width=640&height=480&rotation=90`
/// 文件末尾不足一帧的数据仍作为一帧产出，由编码器判定为损坏帧。
pub struct RawFileInput {
  reader: Option<BufReader<File>>,
  width: u32,
  height: u32,
  format: PixelFormat,
  rotation: Rotation,
  frame_index: u64,
}

impl FromUrlWithScheme for RawFileInput {
  const SCHEME: &'static str = "raw";
}

impl FromUrl for RawFileInput {
  type Error = InputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(InputError::SchemeMismatch(url.scheme().to_string()));
    }

    let width = query_param::<u32>(url, "width")?.ok_or(InputError::MissingParameter("width"))?;
    let height =
      query_param::<u32>(url, "height")?.ok_or(InputError::MissingParameter("height"))?;
    let format = match url.query_pairs().find(|(k, _)| k == "format") {
      Some((_, v)) => v.parse::<PixelFormat>()?,
      None => PixelFormat::Nv21,
    };
    let rotation = rotation_param(url)?;

    let path = url_file_path(url);
    let file = File::open(&path)?;
    info!(
      "打开原始帧文件: {} ({}x{} {:?}, 旋转 {} 度)",
      path.display(),
      width,
      height,
      format,
      rotation.degrees()
    );

    Ok(RawFileInput {
      reader: Some(BufReader::new(file)),
      width,
      height,
      format,
      rotation,
      frame_index: 0,
    })
  }
}

/// 尽量填满缓冲区，返回实际读取的字节数
fn fill(reader: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
  let mut filled = 0;
  while filled < buf.len() {
    match reader.read(&mut buf[filled..]) {
      Ok(0) => break,
      Ok(n) => filled += n,
      Err(e) if e.kind() == ErrorKind::Interrupted => continue,
      Err(e) => return Err(e),
    }
  }
  Ok(filled)
}

impl Iterator for RawFileInput {
  type Item = Frame;

  fn next(&mut self) -> Option<Self::Item> {
    let reader = self.reader.as_mut()?;
    // 至少读 1 字节，空尺寸的帧也不会死循环
    let frame_len = self.format.frame_len(self.width, self.height).max(1);
    let mut buf = vec![0u8; frame_len];

    let read = match fill(reader, &mut buf) {
      Ok(n) => n,
      Err(e) => {
        error!("读取原始帧失败: {}", e);
        self.reader = None;
        return None;
      }
    };

    if read == 0 {
      debug!("原始帧文件读取完毕，共 {} 帧", self.frame_index);
      self.reader = None;
      return None;
    }

    if read < frame_len {
      warn!("第 {} 帧数据不完整: {} / {}", self.frame_index, read, frame_len);
      buf.truncate(read);
      self.reader = None;
    }

    self.frame_index += 1;
    Some(Frame::new(self.width, self.height, self.format, buf).with_rotation(self.rotation))
  }
}
