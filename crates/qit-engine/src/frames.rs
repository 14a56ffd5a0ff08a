use std::ops::Range;

use qit_core::error::{QitError, QitResult};

/// Evenly spaced animation frames over the timesteps of a trajectory.
///
/// Frame `i` starts at step `i * interval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSequence {
    pub n_frames: usize,
    pub interval: usize,
}

impl FrameSequence {
    pub fn new(n_frames: usize, interval: usize) -> Self {
        Self { n_frames, interval }
    }

    /// Fails unless every frame start lies inside a trajectory of `n_steps` steps.
    pub fn validate(&self, n_steps: usize) -> QitResult<()> {
        if self.interval == 0 {
            return Err(QitError::Usage("frame interval must be at least 1".into()));
        }
        let needed = self
            .n_frames
            .checked_mul(self.interval)
            .ok_or_else(|| QitError::Usage("frame range overflows".into()))?;
        if needed > n_steps {
            return Err(QitError::Usage(format!(
                "{} frames at interval {} need {needed} steps, trajectory has {n_steps}",
                self.n_frames, self.interval
            )));
        }
        Ok(())
    }

    /// Like [`validate`](Self::validate), and additionally every window of
    /// `frame_len` steps must end inside the trajectory.
    pub fn validate_windows(&self, n_steps: usize, frame_len: usize) -> QitResult<()> {
        self.validate(n_steps)?;
        if frame_len == 0 {
            return Err(QitError::Usage("frame length must be at least 1".into()));
        }
        if let Some(last) = self.n_frames.checked_sub(1) {
            let end = self.window(last, frame_len).end;
            if end > n_steps {
                return Err(QitError::Usage(format!(
                    "last frame window ends at step {end}, trajectory has {n_steps}"
                )));
            }
        }
        Ok(())
    }

    pub fn frame_step(&self, frame: usize) -> usize {
        frame * self.interval
    }

    pub fn window(&self, frame: usize, frame_len: usize) -> Range<usize> {
        let start = self.frame_step(frame);
        start..start + frame_len
    }

    pub fn check_frame(&self, frame: usize) -> QitResult<()> {
        if frame >= self.n_frames {
            return Err(QitError::Usage(format!(
                "frame {frame} requested, sequence has {}",
                self.n_frames
            )));
        }
        Ok(())
    }
}
