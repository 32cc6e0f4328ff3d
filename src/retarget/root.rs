use nalgebra::Vector3;
use serde::Deserialize;

use crate::catalog::LogicalBone;

/// ルートボーンの軸ロック。ロックした軸には追跡した移動量を反映しない。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct AxisLocks {
    /// 左右（リグX）
    #[serde(default = "default_locked")]
    pub lock_width: bool,
    /// 上下（リグZ）
    #[serde(default = "default_locked")]
    pub lock_height: bool,
    /// 前後（リグY）
    #[serde(default = "default_locked")]
    pub lock_depth: bool,
}

fn default_locked() -> bool { true }

impl AxisLocks {
    pub fn all_locked() -> Self {
        Self {
            lock_width: true,
            lock_height: true,
            lock_depth: true,
        }
    }

    pub fn all_free() -> Self {
        Self {
            lock_width: false,
            lock_height: false,
            lock_depth: false,
        }
    }
}

impl Default for AxisLocks {
    fn default() -> Self {
        Self::all_locked()
    }
}

/// 平行移動を受け持つルートボーンの設定とセッション中の基準値
#[derive(Debug, Clone, PartialEq)]
pub struct RootConfig {
    pub bone: LogicalBone,
    pub locks: AxisLocks,
    /// ルートの両端が初めて追跡できたフレームの始点関節位置（リグ座標系）
    pub first_frame_position: Option<Vector3<f32>>,
    /// レスト姿勢でのルートボーンのアーマチュア空間位置
    pub initial_offset: Vector3<f32>,
}

impl RootConfig {
    pub fn new(bone: LogicalBone, locks: AxisLocks) -> Self {
        Self {
            bone,
            locks,
            first_frame_position: None,
            initial_offset: Vector3::zeros(),
        }
    }

    /// 現在の始点関節位置（リグ座標系）からルートの位置を計算する
    ///
    /// 初回呼び出しで基準位置をラッチする。ロックされていない軸だけ
    /// `initial_offset + (現在 - 基準)`、ロック軸は `initial_offset` のまま。
    /// リグ座標系は X=左右、Y=前後、Z=上下。
    pub fn translation(&mut self, current: Vector3<f32>) -> Vector3<f32> {
        let first = *self.first_frame_position.get_or_insert(current);
        let delta = current - first;

        let mut t = self.initial_offset;
        if !self.locks.lock_width {
            t.x += delta.x;
        }
        if !self.locks.lock_depth {
            t.y += delta.y;
        }
        if !self.locks.lock_height {
            t.z += delta.z;
        }
        t
    }
}
