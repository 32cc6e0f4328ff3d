//! Tracking source contract and the file-backed implementation.
//!
//! The retargeting core only sees smoothed joint samples; acquisition and
//! denoising stay on this side of the boundary.

pub mod kalman;
pub mod replay;

pub use kalman::JointKalman;
pub use replay::{RawFrame, ReplaySource};

use serde::{Deserialize, Serialize};

use crate::error::RetargetError;
use crate::joint::{Joint, JointType};

/// センサーノイズ（分散）。全プリセット共通。
pub const MEASUREMENT_NOISE: f32 = 0.0005;

pub trait TrackingSource {
    /// フィルタを設定してソースを開く。失敗時はセッションを開始しない。
    fn init(
        &mut self,
        frame_interval: f32,
        process_noise: f32,
        measurement_noise: f32,
    ) -> Result<(), RetargetError>;

    /// 新しいサンプルが用意できたら true。ブロックしない。
    fn update(&mut self) -> bool;

    fn joint(&self, joint: JointType) -> Joint;

    /// ソースを解放する。何度呼んでもよい。
    fn close(&mut self);
}

/// ノイズ除去の強さ（加速度ノイズのプリセット）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenoiseStrength {
    /// 強い除去。ゆっくりした動き向け
    Strong,
    #[default]
    Normal,
    Low,
    /// ほぼ除去なし。非常に速い動き向け
    VeryLow,
}

impl DenoiseStrength {
    pub fn process_noise(self) -> f32 {
        match self {
            Self::Strong => 1.0,
            Self::Normal => 5.0,
            Self::Low => 20.0,
            Self::VeryLow => 50.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_noise_increases_with_responsiveness() {
        let presets = [
            DenoiseStrength::Strong,
            DenoiseStrength::Normal,
            DenoiseStrength::Low,
            DenoiseStrength::VeryLow,
        ];
        for pair in presets.windows(2) {
            assert!(pair[0].process_noise() < pair[1].process_noise());
        }
    }

    #[test]
    fn test_denoise_strength_names() {
        #[derive(Deserialize)]
        struct Wrapper {
            denoising: DenoiseStrength,
        }
        let w: Wrapper = toml::from_str("denoising = \"very_low\"").unwrap();
        assert_eq!(w.denoising, DenoiseStrength::VeryLow);
        assert_eq!(DenoiseStrength::default(), DenoiseStrength::Normal);
    }
}
