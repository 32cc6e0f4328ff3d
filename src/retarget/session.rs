use std::time::Duration;

use log::info;

use crate::catalog::LogicalBone;
use crate::config::{Config, SessionConfig};
use crate::error::RetargetError;
use crate::joint::JointFrame;
use crate::mapping::BoneMapping;
use crate::retarget::calibrate::{calibrate, RestCalibration};
use crate::retarget::engine::{apply_frame, FrameSummary, RotationMode};
use crate::retarget::recording::{Recording, RecordingController};
use crate::retarget::root::{AxisLocks, RootConfig};
use crate::rig::{BoneId, Rig};
use crate::source::{DenoiseStrength, TrackingSource, MEASUREMENT_NOISE};

/// 1回のトラッキングセッションの状態
///
/// 開始ごとに作り直す。解決済みのボーン対応、キャリブレーション、ルート基準値、
/// フレームカウンタを持つ。
#[derive(Debug, Clone)]
pub struct Session {
    targets: Vec<(LogicalBone, BoneId)>,
    /// リグのボーンごとに、そのボーンを動かす論理ボーン
    pub(crate) drivers: Vec<Vec<LogicalBone>>,
    pub calibration: RestCalibration,
    pub root: RootConfig,
    pub mode: RotationMode,
    pub recorder: RecordingController,
}

impl Session {
    /// リグをレスト姿勢に戻し、マッピングを解決してキャリブレーションする
    pub fn begin(
        rig: &mut Rig,
        mapping: &BoneMapping,
        locks: AxisLocks,
        mode: RotationMode,
        record: bool,
    ) -> Self {
        rig.reset_pose();

        let targets = mapping.resolve(rig);
        let mut drivers = vec![Vec::new(); rig.len()];
        for &(logical, id) in &targets {
            drivers[id].push(logical);
        }

        let mut root = RootConfig::new(mapping.root(), locks);
        let calibration = calibrate(rig, &targets, &mut root);

        Self {
            targets,
            drivers,
            calibration,
            root,
            mode,
            recorder: RecordingController::new(record),
        }
    }

    /// 割り当て済みの (論理ボーン, リグのボーン)
    pub fn targets(&self) -> &[(LogicalBone, BoneId)] {
        &self.targets
    }

    pub fn current_frame(&self) -> u32 {
        self.recorder.current_frame()
    }
}

/// `tick` の戻り値。ホストはこれを見て次のティックを予約する。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// この間隔で再び呼ぶ
    Continue(Duration),
    Stopped,
}

/// トラッキングソースとセッションを束ねるコントローラ（Idle / Active）
pub struct MocapController<S: TrackingSource> {
    source: S,
    fps: u32,
    denoising: DenoiseStrength,
    mode: RotationMode,
    locks: AxisLocks,
    record: bool,
    session: Option<Session>,
    stop_requested: bool,
    last_summary: FrameSummary,
    finished: Option<Recording>,
}

impl<S: TrackingSource> MocapController<S> {
    pub fn new(source: S, settings: &SessionConfig, locks: AxisLocks) -> Self {
        Self {
            source,
            fps: settings.fps.clamp(1, 60),
            denoising: settings.denoising,
            mode: settings.rotation_mode,
            locks,
            record: settings.record,
            session: None,
            stop_requested: false,
            last_summary: FrameSummary::default(),
            finished: None,
        }
    }

    pub fn from_config(source: S, config: &Config) -> Self {
        Self::new(source, &config.session, config.root)
    }

    /// ティック間隔（秒）
    pub fn frame_interval(&self) -> f32 {
        1.0 / self.fps as f32
    }

    pub fn frame_duration(&self) -> Duration {
        Duration::from_secs_f32(self.frame_interval())
    }

    /// トラッキング開始
    ///
    /// ソースの初期化に失敗したらセッションは作らずにエラーを返す。
    pub fn start(&mut self, rig: &mut Rig, mapping: &BoneMapping) -> Result<(), RetargetError> {
        if self.session.is_some() {
            return Err(RetargetError::AlreadyTracking);
        }

        self.source.init(
            self.frame_interval(),
            self.denoising.process_noise(),
            MEASUREMENT_NOISE,
        )?;

        let session = Session::begin(rig, mapping, self.locks, self.mode, self.record);
        info!(
            "Tracking started: {} bones mapped, root {}, {} fps, {:?} rotation",
            session.targets().len(),
            session.root.bone,
            self.fps,
            self.mode
        );
        self.stop_requested = false;
        self.last_summary = FrameSummary::default();
        self.finished = None;
        self.session = Some(session);
        Ok(())
    }

    /// 次のティックの先頭で停止する。停止中なら何もしない。
    pub fn request_stop(&mut self) {
        if self.session.is_some() {
            self.stop_requested = true;
        }
    }

    /// 1ティック分の処理
    pub fn tick(&mut self, rig: &mut Rig) -> TickOutcome {
        if self.session.is_none() {
            return TickOutcome::Stopped;
        }
        if self.stop_requested {
            self.stop();
            return TickOutcome::Stopped;
        }

        let Some(session) = self.session.as_mut() else {
            return TickOutcome::Stopped;
        };
        if self.source.update() {
            let frame = JointFrame::capture(&self.source);
            self.last_summary = apply_frame(session, rig, &frame);
        }
        session.recorder.end_tick();

        TickOutcome::Continue(self.frame_duration())
    }

    fn stop(&mut self) {
        self.source.close();
        self.stop_requested = false;
        if let Some(session) = self.session.take() {
            let frames = session.current_frame().saturating_sub(1);
            let recording = session.recorder.into_recording();
            info!(
                "Tracking stopped after {} frames ({} keyframes recorded)",
                frames,
                recording.keyframe_count()
            );
            self.finished = Some(recording);
        }
    }

    pub fn is_tracking(&self) -> bool {
        self.session.is_some()
    }

    /// 記録のオン・オフ。セッション中に切り替えてもフレーム番号は続く。
    pub fn set_recording(&mut self, enabled: bool) {
        self.record = enabled;
        if let Some(session) = self.session.as_mut() {
            session.recorder.set_enabled(enabled);
        }
    }

    pub fn is_recording(&self) -> bool {
        self.session
            .as_ref()
            .map_or(self.record, |session| session.recorder.is_enabled())
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// 直前のティックの集計
    pub fn last_summary(&self) -> FrameSummary {
        self.last_summary
    }

    /// 停止したセッションの記録を取り出す
    pub fn take_recording(&mut self) -> Option<Recording> {
        self.finished.take()
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::joint::{Joint, JointType};
    use nalgebra::Isometry3;

    /// 決まったフレーム列を返すだけのソース
    #[derive(Default)]
    struct Scripted {
        frames: Vec<JointFrame>,
        cursor: usize,
        current: JointFrame,
        fail_init: bool,
        init_args: Option<(f32, f32, f32)>,
        open: bool,
        closed: usize,
    }

    impl TrackingSource for Scripted {
        fn init(&mut self, dt: f32, process: f32, measurement: f32) -> Result<(), RetargetError> {
            if self.fail_init {
                return Err(RetargetError::SourceInit("no device".to_string()));
            }
            self.init_args = Some((dt, process, measurement));
            self.open = true;
            Ok(())
        }

        fn update(&mut self) -> bool {
            match self.frames.get(self.cursor) {
                Some(frame) if self.open => {
                    self.current = frame.clone();
                    self.cursor += 1;
                    true
                }
                _ => false,
            }
        }

        fn joint(&self, joint: JointType) -> Joint {
            *self.current.get(joint)
        }

        fn close(&mut self) {
            self.open = false;
            self.closed += 1;
        }
    }

    fn rig() -> Rig {
        let mut rig = Rig::new();
        let hips = rig
            .add_bone("Hips", None, Isometry3::translation(0.0, 0.0, 1.0))
            .unwrap();
        rig.add_bone("Spine2", Some(hips), Isometry3::translation(0.0, 0.3, 0.0))
            .unwrap();
        rig
    }

    fn upright() -> JointFrame {
        let mut frame = JointFrame::default();
        frame.set(JointType::SpineBase, Joint::tracked(0.0, 0.0, 2.0));
        frame.set(JointType::SpineMid, Joint::tracked(0.0, 0.3, 2.0));
        frame.set(JointType::SpineShoulder, Joint::tracked(0.0, 0.5, 2.0));
        frame
    }

    fn controller(frames: Vec<JointFrame>) -> MocapController<Scripted> {
        let source = Scripted {
            frames,
            ..Scripted::default()
        };
        MocapController::new(source, &SessionConfig::default(), AxisLocks::default())
    }

    #[test]
    fn test_start_initializes_source() {
        let mut rig = rig();
        let mapping = BoneMapping::with_defaults(&rig);
        let mut ctrl = controller(vec![upright()]);
        ctrl.start(&mut rig, &mapping).unwrap();

        let (dt, process, measurement) = ctrl.source().init_args.unwrap();
        assert!((dt - 1.0 / 24.0).abs() < 1e-6);
        assert_eq!(process, DenoiseStrength::Normal.process_noise());
        assert_eq!(measurement, MEASUREMENT_NOISE);
        assert!(ctrl.is_tracking());
    }

    #[test]
    fn test_start_twice_fails() {
        let mut rig = rig();
        let mapping = BoneMapping::with_defaults(&rig);
        let mut ctrl = controller(vec![upright()]);
        ctrl.start(&mut rig, &mapping).unwrap();
        let err = ctrl.start(&mut rig, &mapping).unwrap_err();
        assert!(matches!(err, RetargetError::AlreadyTracking));
    }

    #[test]
    fn test_failed_init_starts_nothing() {
        let mut rig = rig();
        let mapping = BoneMapping::with_defaults(&rig);
        let source = Scripted {
            fail_init: true,
            ..Scripted::default()
        };
        let mut ctrl = MocapController::new(source, &SessionConfig::default(), AxisLocks::default());
        assert!(matches!(
            ctrl.start(&mut rig, &mapping),
            Err(RetargetError::SourceInit(_))
        ));
        assert!(!ctrl.is_tracking());
        assert_eq!(ctrl.tick(&mut rig), TickOutcome::Stopped);
    }

    #[test]
    fn test_tick_reschedules_at_frame_rate() {
        let mut rig = rig();
        let mapping = BoneMapping::with_defaults(&rig);
        let mut ctrl = controller(vec![upright(); 3]);
        ctrl.start(&mut rig, &mapping).unwrap();
        assert_eq!(
            ctrl.tick(&mut rig),
            TickOutcome::Continue(Duration::from_secs_f32(1.0 / 24.0))
        );
        assert_eq!(ctrl.last_summary().updated, 2);
    }

    #[test]
    fn test_counter_runs_without_new_samples() {
        let mut rig = rig();
        let mapping = BoneMapping::with_defaults(&rig);
        let mut ctrl = controller(vec![upright()]);
        ctrl.start(&mut rig, &mapping).unwrap();
        for _ in 0..4 {
            ctrl.tick(&mut rig);
        }
        // 最初のティックで 1、以降ティックごとに +1
        assert_eq!(ctrl.session().unwrap().current_frame(), 5);
    }

    #[test]
    fn test_stop_closes_source_on_next_tick() {
        let mut rig = rig();
        let mapping = BoneMapping::with_defaults(&rig);
        let mut ctrl = controller(vec![upright(); 5]);
        ctrl.start(&mut rig, &mapping).unwrap();
        ctrl.tick(&mut rig);

        ctrl.request_stop();
        assert!(ctrl.is_tracking());
        assert_eq!(ctrl.tick(&mut rig), TickOutcome::Stopped);
        assert!(!ctrl.is_tracking());
        assert_eq!(ctrl.source().closed, 1);
        // 停止後のティックはソースに触れない
        assert_eq!(ctrl.tick(&mut rig), TickOutcome::Stopped);
        assert_eq!(ctrl.source().cursor, 1);
    }

    #[test]
    fn test_request_stop_while_idle_is_noop() {
        let mut rig = rig();
        let mapping = BoneMapping::with_defaults(&rig);
        let mut ctrl = controller(vec![upright()]);
        ctrl.request_stop();
        ctrl.start(&mut rig, &mapping).unwrap();
        assert!(matches!(ctrl.tick(&mut rig), TickOutcome::Continue(_)));
    }

    #[test]
    fn test_restart_recalibrates_from_rest() {
        let mut rig = rig();
        let mapping = BoneMapping::with_defaults(&rig);
        let mut ctrl = controller(vec![upright(); 2]);
        ctrl.start(&mut rig, &mapping).unwrap();
        ctrl.tick(&mut rig);
        ctrl.request_stop();
        ctrl.tick(&mut rig);

        ctrl.start(&mut rig, &mapping).unwrap();
        let session = ctrl.session().unwrap();
        assert_eq!(session.current_frame(), 0);
        assert_eq!(session.root.first_frame_position, None);
        assert!(rig.bones().iter().all(|b| b.location == nalgebra::Vector3::zeros()));
    }

    #[test]
    fn test_recording_handed_over_on_stop() {
        let mut rig = rig();
        let mapping = BoneMapping::with_defaults(&rig);
        let mut ctrl = controller(vec![upright(); 3]);
        ctrl.set_recording(true);
        ctrl.start(&mut rig, &mapping).unwrap();
        for _ in 0..3 {
            ctrl.tick(&mut rig);
        }
        assert!(ctrl.take_recording().is_none());
        ctrl.request_stop();
        ctrl.tick(&mut rig);

        let recording = ctrl.take_recording().unwrap();
        let hips = recording.track("Hips").unwrap();
        assert_eq!(hips.rotation.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
    }
}
