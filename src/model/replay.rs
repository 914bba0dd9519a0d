// 该文件是 Framewatch （帧哨） 项目的一部分。
// src/model/replay.rs - 回放已录制的模型输出
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

use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::InputTensor,
  model::{Model, ModelArtifact, ModelLoadError, RAW_OUTPUT_FEATURES, RawOutput},
  utils::{query_param, url_file_path},
};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ReplayError {
  #[error("输入张量尺寸不匹配: 期望 {expected}, 实际 {actual}")]
  InputSizeMismatch { expected: u32, actual: u32 },
}

/// 每帧返回同一份录制输出的模型
///
/// 录制文件是小端序 f32 的 `[1, 5, N]` 张量。
pub struct ReplayModel {
  output: RawOutput,
  input_size: Option<u32>,
}

impl ReplayModel {
  pub fn from_artifact(
    artifact: &ModelArtifact,
    num_candidates: Option<usize>,
  ) -> Result<Self, ModelLoadError> {
    let bytes = artifact.bytes();
    if bytes.len() % 4 != 0 {
      return Err(ModelLoadError::InvalidArtifact(format!(
        "文件长度 {} 不是 f32 的整数倍",
        bytes.len()
      )));
    }

    let values: Vec<f32> = bytes
      .chunks_exact(4)
      .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
      .collect();

    let num_candidates = match num_candidates {
      Some(n) => n,
      None if values.len() % RAW_OUTPUT_FEATURES == 0 => values.len() / RAW_OUTPUT_FEATURES,
      None => {
        return Err(ModelLoadError::InvalidArtifact(format!(
          "{} 个值无法组成 [1, 5, N] 输出",
          values.len()
        )));
      }
    };

    let output = RawOutput::from_vec(values, num_candidates)
      .map_err(|e| ModelLoadError::InvalidArtifact(e.to_string()))?;
    debug!("录制输出形状: {:?}", output.shape());

    Ok(Self {
      output,
      input_size: None,
    })
  }

  /// 要求输入张量为指定尺寸
  pub fn with_input_size(mut self, input_size: Option<u32>) -> Self {
    self.input_size = input_size;
    self
  }
}

impl Model for ReplayModel {
  type Error = ReplayError;

  fn infer(&self, input: &InputTensor) -> Result<RawOutput, Self::Error> {
    if let Some(expected) = self.input_size
      && expected != input.size()
    {
      return Err(ReplayError::InputSizeMismatch {
        expected,
        actual: input.size(),
      });
    }
    Ok(self.output.clone())
  }
}

/// 从 `replay:///path/to/output.f32?candidates=8400&input=640` 构建
pub struct ReplayModelBuilder {
  path: PathBuf,
  num_candidates: Option<usize>,
  input_size: Option<u32>,
}

impl FromUrlWithScheme for ReplayModelBuilder {
  const SCHEME: &'static str = "replay";
}

fn parse_query<T: std::str::FromStr>(url: &Url, key: &str) -> Result<Option<T>, ModelLoadError> {
  query_param(url, key).map_err(|e| ModelLoadError::ModelPathError(e.to_string()))
}

impl FromUrl for ReplayModelBuilder {
  type Error = ModelLoadError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ModelLoadError::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    Ok(ReplayModelBuilder {
      path: url_file_path(url),
      num_candidates: parse_query(url, "candidates")?,
      input_size: parse_query(url, "input")?,
    })
  }
}

impl ReplayModelBuilder {
  pub fn build(self) -> Result<ReplayModel, ModelLoadError> {
    let artifact = ModelArtifact::load(&self.path)?;
    let model = ReplayModel::from_artifact(&artifact, self.num_candidates)?
      .with_input_size(self.input_size);
    info!("模型加载完成");
    Ok(model)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn artifact(values: &[f32]) -> ModelArtifact {
    let bytes = values.iter().flat_map(|v| v.to_le_bytes()).collect();
    ModelArtifact::from_bytes(bytes).unwrap()
  }

  #[test]
  fn infers_candidate_count_from_length() {
    let model = ReplayModel::from_artifact(&artifact(&[0.5; 10]), None).unwrap();
    let output = model.infer(&InputTensor::zeros(2)).unwrap();
    assert_eq!(output.shape(), [1, 5, 2]);
  }

  #[test]
  fn rejects_mismatched_candidate_count() {
    let err = ReplayModel::from_artifact(&artifact(&[0.5; 10]), Some(3));
    assert!(matches!(err, Err(ModelLoadError::InvalidArtifact(_))));
    let err = ReplayModel::from_artifact(&artifact(&[0.5; 7]), None);
    assert!(matches!(err, Err(ModelLoadError::InvalidArtifact(_))));
  }

  #[test]
  fn rejects_truncated_float() {
    let artifact = ModelArtifact::from_bytes(vec![0u8; 6]).unwrap();
    assert!(ReplayModel::from_artifact(&artifact, None).is_err());
  }

  #[test]
  fn enforces_input_size() {
    let model = ReplayModel::from_artifact(&artifact(&[0.5; 5]), None)
      .unwrap()
      .with_input_size(Some(640));
    assert_eq!(
      model.infer(&InputTensor::zeros(320)).unwrap_err(),
      ReplayError::InputSizeMismatch {
        expected: 640,
        actual: 320
      }
    );
  }

  #[test]
  fn builder_parses_url() {
    let url = Url::parse("replay:///tmp/out.f32?candidates=8400&input=640").unwrap();
    let builder = ReplayModelBuilder::from_url(&url).unwrap();
    assert_eq!(builder.path, PathBuf::from("/tmp/out.f32"));
    assert_eq!(builder.num_candidates, Some(8400));
    assert_eq!(builder.input_size, Some(640));

    let url = Url::parse("yolo26:///tmp/model.rknn").unwrap();
    assert!(ReplayModelBuilder::from_url(&url).is_err());
  }

  #[test]
  fn builds_from_escaped_path() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("recorded outputs");
    std::fs::create_dir(&nested).unwrap();
    let path = nested.join("out.f32");
    let bytes: Vec<u8> = [0.5f32; 5].iter().flat_map(|v| v.to_le_bytes()).collect();
    std::fs::write(&path, bytes).unwrap();

    let url = Url::parse(&format!("replay://{}", path.display())).unwrap();
    let model = ReplayModelBuilder::from_url(&url).unwrap().build().unwrap();
    assert_eq!(model.infer(&InputTensor::zeros(2)).unwrap().shape(), [1, 5, 1]);
  }

  #[test]
  fn missing_file_is_load_failure() {
    let url = Url::parse("replay:///nonexistent/framewatch/output.f32").unwrap();
    let err = ReplayModelBuilder::from_url(&url).unwrap().build();
    assert!(matches!(err, Err(ModelLoadError::Io(_))));
  }
}
