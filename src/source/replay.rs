use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::RetargetError;
use crate::joint::{Joint, JointType, TrackingState};
use crate::source::{JointKalman, TrackingSource};

/// 記録済みの生フレーム。関節ごとに (x, y, z, state)。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFrame {
    pub joints: Vec<(f32, f32, f32, i32)>,
}

impl RawFrame {
    /// 全関節を未追跡で埋めたフレーム
    pub fn empty() -> Self {
        Self {
            joints: vec![(0.0, 0.0, 0.0, 0); JointType::COUNT],
        }
    }

    pub fn with_joint(mut self, joint: JointType, x: f32, y: f32, z: f32, state: i32) -> Self {
        if self.joints.len() < JointType::COUNT {
            self.joints.resize(JointType::COUNT, (0.0, 0.0, 0.0, 0));
        }
        self.joints[joint as usize] = (x, y, z, state);
        self
    }
}

/// 記録済みフレームを再生するトラッキングソース
///
/// `update` ごとに1フレーム進め、追跡中・推定の関節だけカルマンフィルタを通す。
pub struct ReplaySource {
    path: Option<PathBuf>,
    frames: Vec<RawFrame>,
    smoothing: bool,
    filters: Vec<JointKalman>,
    current: [Joint; JointType::COUNT],
    cursor: usize,
    open: bool,
}

impl ReplaySource {
    /// JSONファイル（`RawFrame` の配列）から読み込むソース。読み込みは `init` で行う。
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: Some(path.as_ref().to_path_buf()),
            frames: Vec::new(),
            smoothing: true,
            filters: Vec::new(),
            current: [Joint::default(); JointType::COUNT],
            cursor: 0,
            open: false,
        }
    }

    pub fn from_frames(frames: Vec<RawFrame>) -> Self {
        Self {
            path: None,
            frames,
            ..Self::new("")
        }
    }

    /// フィルタを通さず生の値をそのまま返すソース
    pub fn unfiltered(frames: Vec<RawFrame>) -> Self {
        Self {
            smoothing: false,
            ..Self::from_frames(frames)
        }
    }

    pub fn save_frames<P: AsRef<Path>>(path: P, frames: &[RawFrame]) -> anyhow::Result<()> {
        let json = serde_json::to_string(frames)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// 全フレームを再生し終えたか
    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.frames.len()
    }

    pub fn frames_played(&self) -> usize {
        self.cursor
    }

    fn load_frames(path: &Path) -> Result<Vec<RawFrame>, RetargetError> {
        let content = fs::read_to_string(path).map_err(|e| {
            RetargetError::SourceInit(format!("failed to read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            RetargetError::SourceInit(format!("failed to parse {}: {}", path.display(), e))
        })
    }
}

impl TrackingSource for ReplaySource {
    fn init(
        &mut self,
        frame_interval: f32,
        process_noise: f32,
        measurement_noise: f32,
    ) -> Result<(), RetargetError> {
        if let Some(path) = &self.path {
            self.frames = Self::load_frames(path)?;
        }
        if self.frames.is_empty() {
            return Err(RetargetError::SourceInit("replay contains no frames".to_string()));
        }

        self.filters = (0..JointType::COUNT)
            .map(|_| JointKalman::new(frame_interval, measurement_noise, process_noise))
            .collect();
        self.current = [Joint::default(); JointType::COUNT];
        self.cursor = 0;
        self.open = true;

        info!("Replay source opened: {} frames", self.frames.len());
        debug!(
            "Kalman: dt={:.4} process_noise={} measurement_noise={}",
            frame_interval, process_noise, measurement_noise
        );
        Ok(())
    }

    fn update(&mut self) -> bool {
        if !self.open {
            return false;
        }
        let Some(frame) = self.frames.get(self.cursor) else {
            return false;
        };

        for joint in JointType::ALL {
            let (x, y, z, raw_state) = frame
                .joints
                .get(joint as usize)
                .copied()
                .unwrap_or((0.0, 0.0, 0.0, 0));
            let state = TrackingState::from_raw(raw_state);
            let measured = Vector3::new(x, y, z);

            let position = if self.smoothing && state != TrackingState::NotTracked {
                self.filters[joint as usize].filter(measured)
            } else {
                measured
            };
            self.current[joint as usize] = Joint::new(position, state);
        }

        self.cursor += 1;
        true
    }

    fn joint(&self, joint: JointType) -> Joint {
        self.current[joint as usize]
    }

    fn close(&mut self) {
        if self.open {
            self.open = false;
            for filter in &mut self.filters {
                filter.reset();
            }
            info!("Replay source closed after {} frames", self.cursor);
        }
    }
}
