// 该文件是 Framewatch （帧哨） 项目的一部分。
// src/utils.rs - URL 查询参数工具
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

use std::{path::PathBuf, str::FromStr};

use thiserror::Error;
use url::Url;

#[derive(Error, Debug, PartialEq, Eq)]
#[error("参数 {key} 无效: {value}")]
pub struct QueryError {
  pub key: String,
  pub value: String,
}

/// 读取并解析查询参数，不存在时返回 `None`
pub fn query_param<T: FromStr>(url: &Url, key: &str) -> Result<Option<T>, QueryError> {
  match url.query_pairs().find(|(k, _)| k == key) {
    Some((_, v)) => v.parse().map(Some).map_err(|_| QueryError {
      key: key.to_string(),
      value: v.into_owned(),
    }),
    None => Ok(None),
  }
}

/// URL 路径解码为文件路径，`%20` 等转义还原为原字符
pub fn url_file_path(url: &Url) -> PathBuf {
  let bytes = urlencoding::decode_binary(url.path().as_bytes());
  PathBuf::from(String::from_utf8_lossy(&bytes).into_owned())
}

/// 查询参数是否出现（忽略取值）
pub fn query_flag(url: &Url, key: &str) -> bool {
  url.query_pairs().any(|(k, _)| k == key)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_present_values() {
    let url = Url::parse("raw:///tmp/a.yuv?width=640&format=nv21&always").unwrap();
    assert_eq!(query_param::<u32>(&url, "width"), Ok(Some(640)));
    assert_eq!(query_param::<u32>(&url, "height"), Ok(None));
    assert!(query_flag(&url, "always"));
    assert!(!query_flag(&url, "image"));
  }

  #[test]
  fn decodes_escaped_path() {
    let url = Url::parse("raw:///tmp/my captures/帧.nv21?width=2").unwrap();
    assert_eq!(url.path(), "/tmp/my%20captures/%E5%B8%A7.nv21");
    assert_eq!(url_file_path(&url), PathBuf::from("/tmp/my captures/帧.nv21"));
  }

  #[test]
  fn reports_unparsable_values() {
    let url = Url::parse("raw:///tmp/a.yuv?width=wide").unwrap();
    let err = query_param::<u32>(&url, "width").unwrap_err();
    assert_eq!(err.key, "width");
    assert_eq!(err.value, "wide");
  }
}
