//! Frame time management

/// Frame counter driving the per-frame memoization of world matrices
///
/// Frame numbers start at 1 after the first [`FrameClock::advance`], so a
/// facet stamped with frame 0 (or never stamped) is always stale.
#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    frame: u64,
    delta_time: f32,
    total_time: f32,
}

impl FrameClock {
    /// Create a new clock at frame 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance to the next frame and return its number
    pub fn advance(&mut self, delta_time: f32) -> u64 {
        self.frame += 1;
        self.delta_time = delta_time;
        self.total_time += delta_time;
        self.frame
    }

    /// Current frame number
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Time since the previous frame in seconds
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    /// Total elapsed time in seconds
    pub fn total_time(&self) -> f32 {
        self.total_time
    }

    /// Average frames per second since creation
    pub fn average_fps(&self) -> f32 {
        if self.total_time > 0.0 {
            self.frame as f32 / self.total_time
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_frames_are_monotonic() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.frame(), 0);

        assert_eq!(clock.advance(0.016), 1);
        assert_eq!(clock.advance(0.016), 2);
        assert_eq!(clock.frame(), 2);
        assert_relative_eq!(clock.total_time(), 0.032, epsilon = 1e-6);
        assert_relative_eq!(clock.delta_time(), 0.016, epsilon = 1e-6);
    }
}
