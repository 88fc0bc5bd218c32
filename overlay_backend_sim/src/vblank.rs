// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A thread standing in for the vertical-blank interrupt.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use overlay_core::signal::Semaphore;
use overlay_core::vsync::VsyncIrq;

/// Calls a [`VsyncIrq`] handler once per refresh period on its own thread.
///
/// The thread stops when the ticker is dropped or [`stop`](Self::stop)ped.
#[derive(Debug)]
pub struct VblankTicker {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<u64>>,
}

impl VblankTicker {
    /// 60 Hz refresh.
    pub const REFRESH_60HZ: Duration = Duration::from_micros(16_667);

    /// Starts delivering interrupts to `irq` every `period`.
    pub fn spawn<S>(irq: VsyncIrq<S>, period: Duration) -> io::Result<Self>
    where
        S: Semaphore + Send + Sync + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let thread = thread::Builder::new()
            .name("vblank".to_owned())
            .spawn(move || {
                let mut deadline = Instant::now() + period;
                let mut count = 0_u64;
                while flag.load(Ordering::Acquire) {
                    thread::sleep(deadline.saturating_duration_since(Instant::now()));
                    deadline += period;
                    irq.on_interrupt();
                    count += 1;
                }
                count
            })?;
        log::debug!("vblank ticker started, period {period:?}");
        Ok(Self {
            running,
            thread: Some(thread),
        })
    }

    /// Stops the thread and returns how many interrupts it delivered.
    pub fn stop(mut self) -> u64 {
        self.shutdown()
    }

    fn shutdown(&mut self) -> u64 {
        self.running.store(false, Ordering::Release);
        match self.thread.take().map(JoinHandle::join) {
            Some(Ok(count)) => count,
            Some(Err(_)) => {
                log::error!("vblank thread panicked");
                0
            }
            None => 0,
        }
    }
}

impl Drop for VblankTicker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
