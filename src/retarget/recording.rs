use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// 1ボーン分のキーフレーム（フレーム番号 → 値）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoneTrack {
    /// 回転 [x, y, z, w]
    #[serde(default)]
    pub rotation: BTreeMap<u32, [f32; 4]>,
    #[serde(default)]
    pub location: BTreeMap<u32, [f32; 3]>,
}

/// 記録されたアニメーション。ターゲットボーン名ごとのトラック。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    pub tracks: BTreeMap<String, BoneTrack>,
}

impl Recording {
    pub fn new() -> Self {
        Self::default()
    }

    /// 同じフレームに既にキーがあれば置き換える
    pub fn insert_rotation(&mut self, bone: &str, frame: u32, rotation: &UnitQuaternion<f32>) {
        let q = rotation.quaternion();
        self.track_mut(bone)
            .rotation
            .insert(frame, [q.i, q.j, q.k, q.w]);
    }

    pub fn insert_location(&mut self, bone: &str, frame: u32, location: &Vector3<f32>) {
        self.track_mut(bone)
            .location
            .insert(frame, [location.x, location.y, location.z]);
    }

    pub fn track(&self, bone: &str) -> Option<&BoneTrack> {
        self.tracks.get(bone)
    }

    /// 全トラックのキー総数
    pub fn keyframe_count(&self) -> usize {
        self.tracks
            .values()
            .map(|t| t.rotation.len() + t.location.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.keyframe_count() == 0
    }

    /// 最後にキーが打たれたフレーム
    pub fn last_frame(&self) -> Option<u32> {
        self.tracks
            .values()
            .flat_map(|t| t.rotation.keys().chain(t.location.keys()))
            .copied()
            .max()
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write recording {}", path.display()))?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read recording {}", path.display()))?;
        let recording = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse recording {}", path.display()))?;
        Ok(recording)
    }

    fn track_mut(&mut self, bone: &str) -> &mut BoneTrack {
        self.tracks.entry(bone.to_string()).or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingState {
    /// まだ有効なフレームがない（カウンタ 0）
    Idle,
    /// カウンタ 1 以上
    Active,
}

/// フレームカウンタと記録のオン・オフ
///
/// カウンタは記録の有無に関係なく進む。途中で記録を有効にしてもフレーム番号は連続する。
#[derive(Debug, Clone, Default)]
pub struct RecordingController {
    current_frame: u32,
    enabled: bool,
    recording: Recording,
}

impl RecordingController {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            ..Self::default()
        }
    }

    pub fn state(&self) -> RecordingState {
        if self.current_frame == 0 {
            RecordingState::Idle
        } else {
            RecordingState::Active
        }
    }

    pub fn current_frame(&self) -> u32 {
        self.current_frame
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// ボーンの両端が追跡できた。最初の1回で Idle → Active。
    pub fn mark_tracked(&mut self) {
        if self.current_frame == 0 {
            self.current_frame = 1;
        }
    }

    /// ティックの終わりに呼ぶ
    pub fn end_tick(&mut self) {
        if self.current_frame > 0 {
            self.current_frame += 1;
        }
    }

    fn should_record(&self) -> bool {
        self.enabled && self.current_frame > 0
    }

    pub fn record_rotation(&mut self, bone: &str, rotation: &UnitQuaternion<f32>) {
        if self.should_record() {
            self.recording
                .insert_rotation(bone, self.current_frame, rotation);
        }
    }

    pub fn record_location(&mut self, bone: &str, location: &Vector3<f32>) {
        if self.should_record() {
            self.recording
                .insert_location(bone, self.current_frame, location);
        }
    }

    pub fn recording(&self) -> &Recording {
        &self.recording
    }

    pub fn into_recording(self) -> Recording {
        self.recording
    }
}
