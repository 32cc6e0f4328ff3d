pub mod catalog;
pub mod config;
pub mod error;
pub mod joint;
pub mod mapping;
pub mod retarget;
pub mod rig;
pub mod source;
