//! Sandboxed, line-oriented access to files below a working directory.
//!
//! ## Architecture
//!
//! ### resolver.rs
//! Lexical path resolution against a working directory. Non-existent targets
//! resolve so that files can be created through the same path logic.
//!
//! ### manager.rs
//! `FileManager` owns a working directory and the handles opened below it:
//! - `chdir` moves the working directory, refusing targets on another
//!   filesystem root
//! - `open`/`create` register handles and track the most recent one
//! - `grep`, `find` and `tree` delegate to search.rs and tree.rs
//! - `execute_command` runs bash in the working directory
//!
//! ### handle.rs
//! `FileHandle` is a path plus a scrolling window of lines. Edits are line
//! ranges and can be guarded by a `Linter` (lint.rs) that rolls the file back
//! on failure.
//!
//! ### context.rs
//! The process current directory is a single global resource. A manager
//! must hold the active lease to bind it, and only one manager may hold it.

pub mod context;
pub mod handle;
pub mod id;
pub mod lint;
pub mod manager;
pub mod resolver;
pub mod search;
pub mod tree;
