//! Frame duration, playback delay and import-side start frame

pub use mrf_format::playback_fps;

/// Inputs for the header's `elapsed_time`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackTiming {
    /// Inclusive frame range
    pub start: i32,
    pub end: i32,
    /// Frame playback should appear to have reached when the model spawns
    pub elapsed_frame: i32,
    pub reverse: bool,
    /// Explicit delay in seconds; used verbatim when > 0
    pub delay: f32,
    /// Seconds per frame
    pub frame_duration: f32,
}

impl PlaybackTiming {
    /// Seconds written to the header's `elapsed_time`
    ///
    /// An explicit delay wins. Otherwise the offset of `elapsed_frame` from the
    /// first sampled frame (the range end when reversed) is converted to
    /// seconds, never negative.
    pub fn elapsed_time(&self) -> f32 {
        if self.delay > 0.0 {
            return self.delay;
        }
        if self.elapsed_frame == self.start {
            return 0.0;
        }

        let offset = if self.reverse {
            self.end - self.elapsed_frame
        } else {
            self.elapsed_frame - self.start
        };
        (offset as f32 * self.frame_duration).max(0.0)
    }
}

/// Seconds per frame for a playback rate
pub fn frame_duration(fps: f32) -> f32 {
    1.0 / fps
}

/// Use `marker` only when it lies inside `[start, end]`, else fall back to `start`
pub fn resolve_elapsed_frame(marker: Option<i32>, start: i32, end: i32) -> i32 {
    match marker {
        Some(frame) if (start..=end).contains(&frame) => frame,
        Some(frame) => {
            tracing::warn!(
                "Elapsed frame {} outside {}..={}, using {}",
                frame,
                start,
                end,
                start
            );
            start
        }
        None => start,
    }
}

/// First frame a reader should start playback on
///
/// `elapsed_time / frame_duration + 1`, clamped to `[1, frame_count - 1]`.
/// Returns 1 for a non-positive duration or fewer than two frames.
pub fn playback_start_frame(elapsed_time: f32, frame_duration: f32, frame_count: u32) -> u32 {
    if frame_duration <= 0.0 || frame_count < 2 {
        return 1;
    }
    let frame = (elapsed_time / frame_duration) as i64 + 1;
    frame.clamp(1, frame_count as i64 - 1) as u32
}
