//! Tracking-session capture buffer

use crate::session::calibration::{is_ranged, ToleranceWindow};
use crate::source::Pose;

/// Append-only pose buffer for one capture cycle
///
/// `start` clears and activates, `append` records one sample per feed tick
/// while active, `stop` freezes the buffer without clearing it. The buffer
/// is unbounded; the only release is the next `start`. Callers must issue
/// `endtracking` to stop growth.
#[derive(Debug, Default)]
pub struct TrackingBuffer {
    active: bool,
    samples: Vec<Pose>,
}

impl TrackingBuffer {
    pub fn new() -> Self {
        TrackingBuffer::default()
    }

    /// Clear the buffer and begin capturing
    pub fn start(&mut self) {
        self.samples.clear();
        self.active = true;
    }

    /// Stop capturing; buffered samples are retained
    pub fn stop(&mut self) {
        self.active = false;
    }

    /// Record a sample; ignored unless the session is active
    pub fn append(&mut self, pose: Pose) {
        if self.active {
            self.samples.push(pose);
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Count buffered samples that fall outside `tolerance` of `reference`
    pub fn out_of_range_count(&self, reference: &Pose, tolerance: &ToleranceWindow) -> usize {
        self.samples
            .iter()
            .filter(|sample| !is_ranged(sample, reference, tolerance))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Quaternion, Vector3};

    fn pose_at(x: f64) -> Pose {
        Pose::new(Vector3::new(x, 0.0, 0.0), Quaternion::identity())
    }

    fn wide_window() -> ToleranceWindow {
        ToleranceWindow {
            x: 5.0,
            y: 5.0,
            z: 5.0,
            pitch: 360.0,
            yaw: 360.0,
            roll: 360.0,
        }
    }

    #[test]
    fn test_append_requires_active() {
        let mut buffer = TrackingBuffer::new();
        buffer.append(pose_at(1.0));
        assert!(buffer.is_empty());

        buffer.start();
        buffer.append(pose_at(1.0));
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_stop_retains_samples() {
        let mut buffer = TrackingBuffer::new();
        buffer.start();
        buffer.append(pose_at(1.0));
        buffer.append(pose_at(2.0));
        buffer.stop();
        assert!(!buffer.is_active());
        assert_eq!(buffer.len(), 2);

        buffer.append(pose_at(3.0));
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_restart_clears() {
        let mut buffer = TrackingBuffer::new();
        buffer.start();
        buffer.append(pose_at(1.0));
        buffer.stop();
        buffer.start();
        assert!(buffer.is_empty());
        assert!(buffer.is_active());
    }

    #[test]
    fn test_out_of_range_count() {
        let mut buffer = TrackingBuffer::new();
        buffer.start();
        buffer.append(pose_at(1.0));
        buffer.append(pose_at(4.0));
        buffer.append(pose_at(7.0));
        buffer.stop();

        let reference = pose_at(0.0);
        assert_eq!(buffer.out_of_range_count(&reference, &wide_window()), 1);
    }
}
