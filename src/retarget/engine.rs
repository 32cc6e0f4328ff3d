use nalgebra::UnitQuaternion;
use serde::{Deserialize, Serialize};

use crate::catalog::LogicalBone;
use crate::joint::JointFrame;
use crate::retarget::axes::{
    bone_direction, reference_axis, remap_device, shortest_arc, MIN_DIRECTION_NORM,
};
use crate::retarget::session::Session;
use crate::retarget::walker::walk_rig;
use crate::rig::{BoneId, Rig};

/// ポーズ回転の書き込み方
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationMode {
    /// 現在のポーズ座標系で方向を求め、現在の回転に合成する。
    /// レスト補正のあるボーンも1回の更新で目標方向に揃い、同じ入力では回転が変わらない。
    #[default]
    Accumulate,
    /// ボーン自身のポーズ回転を除いた座標系で方向を求め、delta をそのまま書く
    Absolute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoneOutcome {
    Updated,
    /// 始点か終点が Tracked でない
    Untracked,
    /// 両端が重なっていて向きが定まらない
    Degenerate,
}

impl BoneOutcome {
    /// 両端とも追跡できていたか（向きが定まらなくても true）
    pub fn is_tracked(self) -> bool {
        !matches!(self, Self::Untracked)
    }
}

/// 1ティック分の集計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameSummary {
    pub updated: usize,
    pub untracked: usize,
    pub degenerate: usize,
}

impl FrameSummary {
    fn add(&mut self, outcome: BoneOutcome) {
        match outcome {
            BoneOutcome::Updated => self.updated += 1,
            BoneOutcome::Untracked => self.untracked += 1,
            BoneOutcome::Degenerate => self.degenerate += 1,
        }
    }

    pub fn skipped(&self) -> usize {
        self.untracked + self.degenerate
    }
}

/// 論理ボーン1本分のリターゲット
///
/// 両端が Tracked のときだけボーンを書き換える。ルートボーンは平行移動も書く。
/// 記録が有効ならこのフレームのキーを打つ。
pub fn retarget_bone(
    session: &mut Session,
    rig: &mut Rig,
    frame: &JointFrame,
    logical: LogicalBone,
    id: BoneId,
) -> BoneOutcome {
    let definition = logical.definition();
    let start = frame.get(definition.start);
    let end = frame.get(definition.end);
    if !start.is_tracked() || !end.is_tracked() {
        return BoneOutcome::Untracked;
    }
    session.recorder.mark_tracked();

    let direction = bone_direction(&start.position, &end.position);
    if direction.norm() < MIN_DIRECTION_NORM {
        return BoneOutcome::Degenerate;
    }

    let is_root = logical == session.root.bone;
    if is_root {
        let translation = session.root.translation(remap_device(&start.position));
        rig.set_world_translation(id, translation);
    }

    // ボーン座標系へ
    let basis = match session.mode {
        RotationMode::Accumulate => rig.world_transform(id).rotation,
        RotationMode::Absolute => rig.parent_frame(id).rotation,
    };
    let compensation = session
        .calibration
        .get(logical)
        .copied()
        .unwrap_or_else(UnitQuaternion::identity);
    let local = compensation * basis.inverse_transform_vector(&direction);

    let Some(delta) = shortest_arc(&reference_axis(), &local) else {
        return BoneOutcome::Degenerate;
    };

    let bone = rig.bone_mut(id);
    bone.rotation = match session.mode {
        RotationMode::Accumulate => {
            // 補正後の座標系で求めた delta をボーン座標系へ戻してから合成する
            let mut q = bone.rotation * compensation.inverse() * delta * compensation;
            q.renormalize();
            q
        }
        RotationMode::Absolute => delta,
    };

    session.recorder.record_rotation(&bone.name, &bone.rotation);
    if is_root {
        session.recorder.record_location(&bone.name, &bone.location);
    }
    BoneOutcome::Updated
}

/// スナップショット1枚をリグ全体に適用する（親 → 子の順）
pub fn apply_frame(session: &mut Session, rig: &mut Rig, frame: &JointFrame) -> FrameSummary {
    let mut summary = FrameSummary::default();
    let drivers = std::mem::take(&mut session.drivers);

    walk_rig(rig, |rig, id| {
        if let Some(bones) = drivers.get(id) {
            for &logical in bones {
                summary.add(retarget_bone(session, rig, frame, logical, id));
            }
        }
    });

    session.drivers = drivers;
    summary
}
