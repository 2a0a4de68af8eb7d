use std::fmt;
use std::sync::Arc;

use log::debug;
use structopt::StructOpt;

use crate::texture::{Image, Pose};

pub type Time = f64; // Monotonic time in seconds.

#[derive(Clone, Copy, Debug, StructOpt)]
pub struct CaptureParams {
    #[structopt(
        help = "Minimum time between two captured samples, in seconds",
        long = "min-capture-interval",
        default_value = "1.0"
    )]
    pub min_interval: Time,
}

impl Default for CaptureParams {
    fn default() -> Self {
        Self { min_interval: 1.0 }
    }
}

pub struct CapturedSample {
    pub image: Image,
    pub pose: Pose,
    pub timestamp: Time,
}

impl fmt::Debug for CapturedSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapturedSample")
            .field("image", &self.image.dimensions())
            .field("pose", &self.pose)
            .field("timestamp", &self.timestamp)
            .finish()
    }
}

// Samples in capture order, shared with whoever took the snapshot.
pub type Snapshot = Vec<Arc<CapturedSample>>;

pub struct FrameStore {
    samples: Vec<Arc<CapturedSample>>,
    min_interval: Time,
}

impl FrameStore {
    pub fn new(params: &CaptureParams) -> Self {
        Self {
            samples: Vec::new(),
            min_interval: params.min_interval.max(0.0),
        }
    }

    pub fn min_interval(&self) -> Time {
        self.min_interval
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn last_timestamp(&self) -> Option<Time> {
        self.samples.last().map(|s| s.timestamp)
    }

    pub fn is_capture_due(&self, timestamp: Time) -> bool {
        if !timestamp.is_finite() {
            return false;
        }
        match self.last_timestamp() {
            None => true,
            Some(last) => {
                timestamp >= last && timestamp - last >= self.min_interval
            }
        }
    }

    // Returns whether the sample was stored; an early call is a no-op.
    pub fn capture(
        &mut self,
        image: Image,
        pose: Pose,
        timestamp: Time,
    ) -> bool {
        if !self.is_capture_due(timestamp) {
            return false;
        }

        self.samples.push(Arc::new(CapturedSample {
            image,
            pose,
            timestamp,
        }));
        debug!(
            "captured sample at {:.3}s, {} in store",
            timestamp,
            self.samples.len()
        );
        true
    }

    pub fn snapshot(&self) -> Snapshot {
        self.samples.clone()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}
