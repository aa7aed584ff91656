// vortexstore - Data compression resistant video generator.
// Copyright 2025 0verv0ltage
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! RAM-based backpressure: pauses frame production once free memory drops
//! below `ram_threshold_trigger_percent`, resuming only once it climbs back
//! above `ram_threshold_resume_percent` (simple hysteresis avoids pause/
//! resume flapping right at the boundary).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sysinfo::System;

use crate::config::Config;

/// Tracks free-RAM percentage against the configured thresholds.
struct RamGate {
    system: System,
    trigger_percent: f64,
    resume_percent: f64,
    paused: bool,
}

impl RamGate {
    fn new(cfg: &Config) -> Self {
        let mut system = System::new();
        system.refresh_memory();
        Self {
            system,
            trigger_percent: cfg.ram_threshold_trigger_percent,
            resume_percent: cfg.ram_threshold_resume_percent,
            paused: false,
        }
    }

    fn poll(&mut self) -> bool {
        self.system.refresh_memory();
        let total = self.system.total_memory().max(1);
        let available = self.system.available_memory();
        let available_percent = (available as f64 / total as f64) * 100.0;

        if self.paused {
            if available_percent >= self.resume_percent {
                self.paused = false;
            }
        } else if available_percent < self.trigger_percent {
            self.paused = true;
        }
        self.paused
    }
}

/// A background-polled flag the frame producer checks before painting each
/// frame. Dropping the handle stops the poller thread on its next tick.
pub struct BackpressureGate {
    paused: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
}

impl BackpressureGate {
    /// Spawn the 1-second poll tick and start tracking `cfg`'s thresholds.
    pub fn spawn(cfg: &Config) -> Self {
        let paused = Arc::new(AtomicBool::new(false));
        let stop = Arc::new(AtomicBool::new(false));
        let paused_writer = Arc::clone(&paused);
        let stop_reader = Arc::clone(&stop);
        let mut gate = RamGate::new(cfg);

        _ = std::thread::Builder::new().name("vortex-ram-gate".into()).spawn(move || {
            while !stop_reader.load(Ordering::Relaxed) {
                paused_writer.store(gate.poll(), Ordering::Relaxed);
                std::thread::sleep(Duration::from_secs(1));
            }
        });

        Self { paused, stop }
    }

    /// Whether production should currently be paused.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }

    /// Block the calling thread until the gate reports available RAM again.
    pub fn wait_until_resumed(&self) {
        while self.is_paused() {
            std::thread::sleep(Duration::from_millis(100));
        }
    }
}

impl Drop for BackpressureGate {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}
