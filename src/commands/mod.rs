//! Command handlers.
//!
//! | File      | Invocation                             | Description              |
//! |-----------|----------------------------------------|--------------------------|
//! | `run.rs`  | `rootfs-backup <action> <src> <dst>`   | Backup / restore pipeline |

pub mod run;
