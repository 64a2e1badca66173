//! rigsnap CLI library.
//!
//! Document loading and the command implementations behind the `rigsnap`
//! binary.

pub mod commands;
pub mod input;
