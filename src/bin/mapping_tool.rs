use anyhow::{bail, Result};
use clap::Parser;
use log::warn;
use std::path::Path;

use kinect_retarget::catalog::LogicalBone;
use kinect_retarget::mapping::BoneMapping;
use kinect_retarget::rig::Rig;

/// リグに合わせてボーン割り当てファイルを作る・確認する
#[derive(Debug, Parser)]
#[command(author, version, about = "Create or inspect a bone mapping for a rig")]
struct Args {
    /// リグ定義 (JSON)
    #[arg(long)]
    rig: String,
    /// 割り当てファイル。既にあれば読み込んでから更新する
    #[arg(long, default_value = "mapping.json")]
    mapping: String,
    /// ルートにする論理ボーン (例: Spine0)
    #[arg(long)]
    root: Option<String>,
    /// 論理ボーン=リグのボーン名（複数可、空にすると解除）
    #[arg(long = "set", value_name = "BONE=TARGET")]
    assignments: Vec<String>,
    /// 表示だけして保存しない
    #[arg(long)]
    dry_run: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let rig = Rig::load(&args.rig)?;
    println!("Rig: {} ({} bones)", args.rig, rig.len());

    let mut mapping = BoneMapping::with_defaults(&rig);
    if Path::new(&args.mapping).exists() {
        if let Err(e) = mapping.load(&args.mapping, &rig) {
            warn!("{:#}, starting from defaults", e);
        }
    }

    for assignment in &args.assignments {
        let Some((bone, target)) = assignment.split_once('=') else {
            bail!("Invalid assignment '{}', expected BONE=TARGET", assignment);
        };
        let Some(bone) = LogicalBone::from_name(bone.trim()) else {
            bail!("Unknown logical bone '{}'", bone);
        };
        mapping.set_mapping(&rig, bone, target.trim());
    }

    if let Some(root) = &args.root {
        match LogicalBone::from_name(root) {
            Some(bone) => mapping.set_root(bone),
            None => bail!("Unknown logical bone '{}'", root),
        }
    }

    println!();
    for bone in LogicalBone::ALL {
        let marker = if bone == mapping.root() { "*" } else { " " };
        println!(
            "{} {:<14} -> {}",
            marker,
            bone.name(),
            mapping.target(bone).unwrap_or("-")
        );
    }
    println!();
    println!("{}/{} mapped, root: {}", mapping.len(), LogicalBone::COUNT, mapping.root());

    if !args.dry_run {
        mapping.save(&args.mapping)?;
        println!("Saved: {}", args.mapping);
    }
    Ok(())
}
