//! metapack-lib: deployment manifest generation for metadata repositories
//!
//! The crate turns a set of changed repository paths into a deployable package:
//! - `registry`: file extension -> metadata type rules
//! - `classify`: a path's type, member name and destructibility
//! - `manifest`: `package.xml` / `destructiveChanges.xml` generation
//! - `stage`: staging directories and rollback archives
//! - `deploy`: the end-to-end run driven by a job runner

pub mod classify;
pub mod consts;
pub mod deploy;
pub mod manifest;
pub mod package_xml;
pub mod registry;
pub mod stage;
pub mod util;
pub mod vcs;
