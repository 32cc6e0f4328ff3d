pub mod axes;
pub mod calibrate;
pub mod engine;
pub mod recording;
pub mod root;
pub mod session;
pub mod walker;

pub use calibrate::{calibrate, RestCalibration};
pub use engine::{apply_frame, retarget_bone, BoneOutcome, FrameSummary, RotationMode};
pub use recording::{BoneTrack, Recording, RecordingController, RecordingState};
pub use root::{AxisLocks, RootConfig};
pub use session::{MocapController, Session, TickOutcome};
pub use walker::{walk, walk_rig};
