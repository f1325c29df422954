//! This module is responsible for managing processes spawned
//! by this tool. It contains drivers for building images and
//! cutting releases that interface with tools like ko or goreleaser,
//! along with the installer that fetches those tools when missing.

pub mod drivers;
pub mod logging;
pub mod signal_handler;
pub mod tools;
