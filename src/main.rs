//! epub-admin - manage the books of a static e-book site

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = epub_admin::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
