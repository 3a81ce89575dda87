//! `bridged` binary entry point.

use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    // Unlocked handles: the daemon's log writer shares stderr with this thread.
    bridged::run(std::env::args_os(), &mut io::stdout(), &mut io::stderr())
}
