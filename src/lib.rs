//! Raspberry Pi web kiosk provisioning.
//!
//! `kiosk-setup install` turns a stock Raspberry Pi OS Lite system (or a
//! mounted image of one, via `--root`) into a kiosk: labwc on the console,
//! Chromium full screen on one URL, and systemd keeping both alive.
//! `kiosk-setup supervise` is the browser-side half, run by the generated
//! service.
//!
//! The layers:
//!
//! - **[`config`]**: `kiosk.toml`, defaults and validation
//! - **[`artifacts`]**: renderers for every generated file
//! - **[`resources`]**: idempotent `check + apply` primitives (files, boot config, groups, units, ...)
//! - **[`tasks`]**: named, dependency-ordered units of work wired to resources
//! - **[`commands`]**: subcommand orchestration (`install`, `supervise`, `version`)
//! - **[`supervisor`]**: wait-for-display and bounded crash retry for the browser
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod artifacts;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod exec;
pub mod logging;
pub mod platform;
pub mod resources;
pub mod supervisor;
pub mod tasks;
pub mod user;
