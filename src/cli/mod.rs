//! # Command-Line Interface
//!
//! Operator-facing commands and output formatting.
//!
//! ## Command Groups
//!
//! | Group | Purpose | Examples |
//! |-------|---------|----------|
//! | Core | Site setup and export | `init`, `export` |
//! | Book | Book pages | `book add`, `book list`, `book convert` |
//! | Platform | Shortening services | `platform add`, `platform test`, `shorten` |
//! | Git | Publishing | `git status`, `git publish`, `git branch list` |
//!
//! ## Output Formats
//!
//! All commands support `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! ## Logging
//!
//! Diagnostics go to stderr through `tracing`. Use `--verbose` (or `-v`)
//! for debug output, or set `RUST_LOG`:
//! ```bash
//! epub-admin --verbose book convert --platform 2
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod book;
mod git_cmd;
mod output;
mod platform;

pub use app::{run, Cli, Commands};
pub use output::{Output, OutputFormat};
