use anyhow::{Context, Result};
use clap::Parser;
use log::warn;
use std::path::Path;
use std::time::Instant;

use kinect_retarget::config::Config;
use kinect_retarget::mapping::BoneMapping;
use kinect_retarget::retarget::{MocapController, RecordingState, TickOutcome};
use kinect_retarget::rig::Rig;
use kinect_retarget::source::ReplaySource;

const CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Parser)]
#[command(author, version, about = "Retarget recorded body-joint frames onto a bone rig")]
struct Args {
    /// 設定ファイル
    #[arg(long, default_value = CONFIG_PATH)]
    config: String,
    /// このフレーム数を処理したら停止
    #[arg(long)]
    max_frames: Option<u32>,
    /// 設定に関係なく記録する
    #[arg(long)]
    record: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let config = Config::load_or_default(&args.config);

    println!("Kinect Retarget ({})", env!("GIT_VERSION"));
    println!("Rig: {}", config.paths.rig);
    println!("Replay: {}", config.paths.replay);
    println!(
        "FPS: {}  denoising: {:?}  rotation: {:?}",
        config.session.fps, config.session.denoising, config.session.rotation_mode
    );
    println!(
        "Root locks: width={} height={} depth={}",
        config.root.lock_width, config.root.lock_height, config.root.lock_depth
    );
    println!();

    let mut rig = Rig::load(&config.paths.rig)?;
    println!("Rig loaded: {} bones", rig.len());

    let mut mapping = BoneMapping::with_defaults(&rig);
    if Path::new(&config.paths.mapping).exists() {
        if let Err(e) = mapping.load(&config.paths.mapping, &rig) {
            warn!("{:#}, keeping default mapping", e);
        }
    }
    println!("Mapped bones: {} (root: {})", mapping.len(), mapping.root());

    let source = ReplaySource::new(&config.paths.replay);
    let mut controller = MocapController::from_config(source, &config);
    if args.record {
        controller.set_recording(true);
    }
    controller
        .start(&mut rig, &mapping)
        .context("Failed to start tracking")?;

    let mut next_tick = Instant::now();
    let mut fps_timer = Instant::now();
    let mut tick_count = 0u32;

    loop {
        if controller.source().is_exhausted() {
            controller.request_stop();
        }
        if let (Some(max), Some(session)) = (args.max_frames, controller.session()) {
            if session.current_frame() > max {
                controller.request_stop();
            }
        }

        match controller.tick(&mut rig) {
            TickOutcome::Continue(interval) => {
                next_tick += interval;
                let now = Instant::now();
                if next_tick > now {
                    std::thread::sleep(next_tick - now);
                } else {
                    // 処理落ち: 遅れを取り戻そうとしない
                    next_tick = now;
                }
            }
            TickOutcome::Stopped => break,
        }

        // FPS表示
        tick_count += 1;
        let elapsed = fps_timer.elapsed().as_secs_f32();
        if elapsed >= 1.0 {
            let summary = controller.last_summary();
            let (frame, state) = controller
                .session()
                .map_or((0, RecordingState::Idle), |s| (s.current_frame(), s.recorder.state()));
            println!(
                "FPS: {:.1} | {:?} frame {} | updated {} skipped {}",
                tick_count as f32 / elapsed,
                state,
                frame,
                summary.updated,
                summary.skipped()
            );
            tick_count = 0;
            fps_timer = Instant::now();
        }
    }

    if let Some(recording) = controller.take_recording() {
        if controller.is_recording() && !recording.is_empty() {
            recording.save(&config.paths.recording)?;
            println!(
                "Recording saved: {} ({} keyframes, last frame {})",
                config.paths.recording,
                recording.keyframe_count(),
                recording.last_frame().unwrap_or(0)
            );
        }
    }

    println!("Shutting down...");
    Ok(())
}
