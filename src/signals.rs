//! Cooperative cancellation for SIGINT and SIGPIPE.
//!
//! The handlers do nothing beyond one atomic store. The filelist reader and
//! the crawler poll the flag at record and directory boundaries, and the
//! orchestrator refuses to rewrite the filelist once it is set, so an
//! interrupted run leaves the previous snapshot on disk verbatim.

use signal_hook::consts::{SIGINT, SIGPIPE};
use std::io;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

pub fn install() -> io::Result<Arc<AtomicBool>> {
    let flag = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(SIGINT, Arc::clone(&flag))?;
    signal_hook::flag::register(SIGPIPE, Arc::clone(&flag))?;
    Ok(flag)
}
