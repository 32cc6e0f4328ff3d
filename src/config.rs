use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::retarget::{AxisLocks, RotationMode};
use crate::source::DenoiseStrength;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub session: SessionConfig,
    /// ルートボーンの軸ロック
    #[serde(default)]
    pub root: AxisLocks,
    #[serde(default)]
    pub paths: PathsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    /// ティックのフレームレート（1〜60）
    #[serde(default = "default_fps")]
    pub fps: u32,
    /// 開始時点で記録を有効にするか
    #[serde(default)]
    pub record: bool,
    #[serde(default)]
    pub denoising: DenoiseStrength,
    #[serde(default)]
    pub rotation_mode: RotationMode,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PathsConfig {
    /// リグ定義 (JSON)
    #[serde(default = "default_rig_path")]
    pub rig: String,
    /// ボーン割り当て (JSON)
    #[serde(default = "default_mapping_path")]
    pub mapping: String,
    /// 再生する関節フレーム (JSON)
    #[serde(default = "default_replay_path")]
    pub replay: String,
    /// 記録の保存先
    #[serde(default = "default_recording_path")]
    pub recording: String,
}

fn default_fps() -> u32 { 24 }
fn default_rig_path() -> String { "rig.json".to_string() }
fn default_mapping_path() -> String { "mapping.json".to_string() }
fn default_replay_path() -> String { "replay.json".to_string() }
fn default_recording_path() -> String { "recording.json".to_string() }

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            record: false,
            denoising: DenoiseStrength::default(),
            rotation_mode: RotationMode::default(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            rig: default_rig_path(),
            mapping: default_mapping_path(),
            replay: default_replay_path(),
            recording: default_recording_path(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        config.session.fps = config.session.fps.clamp(1, 60);
        Ok(config)
    }

    /// 読めなければデフォルト設定
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                println!("{:#}, using defaults", e);
                Self::default()
            }
        }
    }
}
