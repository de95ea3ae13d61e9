use std::time::Duration;

use crate::state::FrameBuffer;

/// Renderer is handed the frame buffer whenever it has changed since the last
/// timer tick. It should abstract the implementation details, so a variety of
/// kinds of screen would work.
pub trait Renderer {
    /// paint a read-only snapshot of the 64x32 frame
    fn present(&mut self, frame: &FrameBuffer);
}

/// Any closure taking a frame can stand in for a renderer
impl<F> Renderer for F
where
    F: FnMut(&FrameBuffer),
{
    fn present(&mut self, frame: &FrameBuffer) {
        self(frame)
    }
}

/// Makes beeps. Best effort: the interpreter never learns whether one was heard.
pub trait Sound {
    fn beep(&mut self, duration: Duration);
}

/// Sound device that never makes a sound
#[derive(Debug, Default, Clone, Copy)]
pub struct Mute;

impl Sound for Mute {
    fn beep(&mut self, _duration: Duration) {}
}
