//! The root library for relkit.
//!
//! This module contains the commands that make up the tasks of the
//! `relkit` binary. Tool installation and process handling live in
//! `relkit-process-management`.

shadow_rs::shadow!(shadow);

pub mod commands;
