// src/progress.rs
use crate::model::PageInfo;

/// Lightweight progress reporting for operations that walk the live table
/// (extraction, mark application). Front ends implement this to surface status.
pub trait Progress {
    /// Called at the start with the number of items (if known).
    fn begin(&mut self, _total: usize) {}

    /// Free-form status line for human eyes.
    fn log(&mut self, _msg: &str) {}

    /// Called when one page of the live table has been processed.
    fn page_done(&mut self, _page: Option<PageInfo>, _found: usize) {}

    /// Called at the end, successful or not.
    fn finish(&mut self) {}
}

/// A no-op progress sink.
pub struct NullProgress;
impl Progress for NullProgress {}

/// Forwards progress lines to the debug log.
pub struct LogProgress;

impl Progress for LogProgress {
    fn begin(&mut self, total: usize) {
        logd!("Starting: {total} items");
    }

    fn log(&mut self, msg: &str) {
        logf!("{msg}");
    }

    fn page_done(&mut self, page: Option<PageInfo>, found: usize) {
        match page {
            Some(p) => logf!("{}: {found} names", p.message()),
            None => logf!("Page done: {found} names"),
        }
    }
}
