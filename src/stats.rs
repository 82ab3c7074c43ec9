// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use crate::{image::Geometry, FallbackReason, ProcessPath};
use serde_json::{json, Value};
use std::time::{Duration, Instant};

/// Rolling frame rate over a fixed window of frame intervals.
#[derive(Debug, Clone)]
pub struct FpsCounter {
    prev: Instant,
    history: Vec<f64>,
    index: usize,
    filled: usize,
}

impl FpsCounter {
    pub fn new(window: usize) -> Self {
        Self {
            prev: Instant::now(),
            history: vec![0.0; window.max(1)],
            index: 0,
            filled: 0,
        }
    }

    /// Records the interval since the previous tick and returns the average.
    pub fn tick(&mut self) -> f64 {
        let now = Instant::now();
        let elapsed = now.duration_since(self.prev);
        self.prev = now;
        self.record(elapsed)
    }

    /// Records one frame interval and returns the average.
    pub fn record(&mut self, elapsed: Duration) -> f64 {
        let nanos = elapsed.as_nanos().max(1);
        self.history[self.index] = 1e9 / nanos as f64;
        self.index = (self.index + 1) % self.history.len();
        self.filled = (self.filled + 1).min(self.history.len());
        self.fps()
    }

    pub fn fps(&self) -> f64 {
        if self.filled == 0 {
            return 0.0;
        }
        self.history[..self.filled].iter().sum::<f64>() / self.filled as f64
    }
}

/// Counts of the paths committed across processed frames.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FrameStats {
    pub frames: u64,
    pub edges: u64,
    pub unavailable: u64,
    pub failed: u64,
    pub size_mismatch: u64,
}

impl FrameStats {
    pub fn record(&mut self, path: &ProcessPath) {
        self.frames += 1;
        match path {
            ProcessPath::Edges => self.edges += 1,
            ProcessPath::Grayscale(FallbackReason::Unavailable) => self.unavailable += 1,
            ProcessPath::Grayscale(FallbackReason::Failed(_)) => self.failed += 1,
            ProcessPath::Grayscale(FallbackReason::SizeMismatch { .. }) => {
                self.size_mismatch += 1
            }
        }
    }

    pub fn fallbacks(&self) -> u64 {
        self.frames - self.edges
    }

    pub fn to_json(&self, geometry: Geometry, fps: f64) -> Value {
        json!({
            "frames": self.frames,
            "width": geometry.width(),
            "height": geometry.height(),
            "edges": self.edges,
            "fallbacks": {
                "total": self.fallbacks(),
                "unavailable": self.unavailable,
                "failed": self.failed,
                "size_mismatch": self.size_mismatch,
            },
            "fps": (fps * 10.0).round() / 10.0,
        })
    }
}
