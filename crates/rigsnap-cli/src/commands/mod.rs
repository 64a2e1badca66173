//! CLI command implementations

pub mod describe;
pub mod frame_range;
pub mod inspect;
pub mod run;
