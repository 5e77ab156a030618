//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

use pbr::ProgressBar;
use std::io::Stdout;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Progress reporting and cooperative cancellation of a pyramid build
pub trait ProgressSink {
    /// Number of tiles the build will request
    fn set_total(&mut self, total: u64);
    fn add_progress(&mut self, count: u64);
    /// `false` cancels the build before the next tile
    fn is_active(&self) -> bool;
    /// Whether a cancelled build removes the table it created
    fn cleanup_on_cancel(&self) -> bool;
}

/// Silent, never cancelled
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn set_total(&mut self, _total: u64) {}
    fn add_progress(&mut self, _count: u64) {}
    fn is_active(&self) -> bool {
        true
    }
    fn cleanup_on_cancel(&self) -> bool {
        true
    }
}

/// Progress bar on stdout
pub struct ConsoleProgress {
    pb: ProgressBar<Stdout>,
    cancelled: Arc<AtomicBool>,
    cleanup: bool,
}

impl ConsoleProgress {
    pub fn new(msg: &str) -> ConsoleProgress {
        let mut pb = ProgressBar::new(0);
        pb.message(msg);
        pb.show_speed = false;
        pb.show_percent = false;
        pb.show_time_left = false;
        ConsoleProgress {
            pb,
            cancelled: Arc::new(AtomicBool::new(false)),
            cleanup: true,
        }
    }
    /// Keep tiles of a cancelled build
    pub fn keep_on_cancel(mut self) -> Self {
        self.cleanup = false;
        self
    }
    /// Setting the flag cancels the build
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }
    pub fn finish(&mut self) {
        self.pb.finish_println("");
    }
}

impl ProgressSink for ConsoleProgress {
    fn set_total(&mut self, total: u64) {
        self.pb.total = total;
        self.pb.tick();
    }
    fn add_progress(&mut self, count: u64) {
        self.pb.add(count);
    }
    fn is_active(&self) -> bool {
        !self.cancelled.load(Ordering::Relaxed)
    }
    fn cleanup_on_cancel(&self) -> bool {
        self.cleanup
    }
}
