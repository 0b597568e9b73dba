/// Head offset values, the lock-free cell shared between the tracking and
/// render loops, and the head source seam
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Normalized deviation of the viewer's head from screen center, in [-1, 1]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HeadOffset {
    pub x: f32,
    pub y: f32,
}

impl HeadOffset {
    pub const CENTER: HeadOffset = HeadOffset { x: 0.0, y: 0.0 };

    /// Build an offset, clamping both components into [-1, 1]
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x: clamp_unit(x),
            y: clamp_unit(y),
        }
    }

    /// Convert a normalized landmark position in [0, 1] (image space)
    pub fn from_landmark(u: f32, v: f32) -> Self {
        Self::new((u - 0.5) * 2.0, (v - 0.5) * 2.0)
    }

    /// Mirror horizontally, as a selfie camera view would
    pub fn mirrored(self) -> Self {
        Self { x: -self.x, y: self.y }
    }

    /// Shift by a delta, staying in range
    pub fn nudged(self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    fn pack(self) -> u64 {
        ((self.x.to_bits() as u64) << 32) | self.y.to_bits() as u64
    }

    fn unpack(bits: u64) -> Self {
        Self {
            x: f32::from_bits((bits >> 32) as u32),
            y: f32::from_bits(bits as u32),
        }
    }
}

fn clamp_unit(v: f32) -> f32 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(-1.0, 1.0)
    }
}

/// Latest head offset, published by one thread and read by another.
///
/// Both components live in one `AtomicU64`, so a reader always sees a pair
/// that was written together and never waits on the writer.
#[derive(Debug, Clone, Default)]
pub struct SharedHeadOffset {
    bits: Arc<AtomicU64>,
}

impl SharedHeadOffset {
    pub fn new(initial: HeadOffset) -> Self {
        Self {
            bits: Arc::new(AtomicU64::new(initial.pack())),
        }
    }

    pub fn publish(&self, offset: HeadOffset) {
        self.bits.store(offset.pack(), Ordering::Release);
    }

    pub fn latest(&self) -> HeadOffset {
        HeadOffset::unpack(self.bits.load(Ordering::Acquire))
    }
}

/// Something that keeps a head offset up to date
pub trait HeadSource {
    /// Newest offset; never blocks
    fn latest(&self) -> HeadOffset;

    /// Manual adjustment. Sources driven by a tracker ignore it.
    fn nudge(&mut self, _dx: f32, _dy: f32) {}

    /// Return a manually driven head to center
    fn recenter(&mut self) {}

    /// Halt updates and release the device. Safe to call more than once.
    fn stop(&mut self);

    /// Short label for logs and the HUD
    fn name(&self) -> &str;
}

/// Head source that never moves. Useful for tests and headless runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedHead(pub HeadOffset);

impl HeadSource for FixedHead {
    fn latest(&self) -> HeadOffset {
        self.0
    }

    fn stop(&mut self) {}

    fn name(&self) -> &str {
        "fixed"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_new_clamps() {
        assert_eq!(HeadOffset::new(2.0, -3.0), HeadOffset::new(1.0, -1.0));
        assert_eq!(HeadOffset::new(f32::NAN, 0.5), HeadOffset::new(0.0, 0.5));
    }

    #[test]
    fn test_from_landmark() {
        assert_eq!(HeadOffset::from_landmark(0.5, 0.5), HeadOffset::CENTER);
        assert_eq!(HeadOffset::from_landmark(1.0, 0.0), HeadOffset::new(1.0, -1.0));
        let h = HeadOffset::from_landmark(0.75, 0.25);
        assert!((h.x - 0.5).abs() < 1e-6);
        assert!((h.y + 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_mirrored_and_nudged() {
        let h = HeadOffset::new(0.3, 0.2).mirrored();
        assert_eq!(h, HeadOffset::new(-0.3, 0.2));
        assert_eq!(HeadOffset::new(0.95, 0.0).nudged(0.1, 0.0).x, 1.0);
    }

    #[test]
    fn test_shared_offset_publish_and_read() {
        let shared = SharedHeadOffset::default();
        assert_eq!(shared.latest(), HeadOffset::CENTER);

        shared.publish(HeadOffset::new(-0.25, 0.75));
        assert_eq!(shared.latest(), HeadOffset::new(-0.25, 0.75));
    }

    #[test]
    fn test_shared_offset_across_threads() {
        let shared = SharedHeadOffset::new(HeadOffset::CENTER);
        let writer = shared.clone();

        let handle = thread::spawn(move || {
            for i in 0..1000 {
                let v = i as f32 / 1000.0;
                writer.publish(HeadOffset::new(v, -v));
            }
        });

        // Every read is a pair written together
        for _ in 0..1000 {
            let h = shared.latest();
            assert_eq!(h.x, -h.y);
        }
        handle.join().unwrap();
        assert_eq!(shared.latest(), HeadOffset::new(0.999, -0.999));
    }

    #[test]
    fn test_fixed_head() {
        let mut src = FixedHead(HeadOffset::new(0.1, 0.2));
        src.stop();
        src.stop();
        assert_eq!(src.latest(), HeadOffset::new(0.1, 0.2));
    }
}
