//! Shared ambient services for the platformer workspace.
#![forbid(unsafe_code)]

pub mod logging;
