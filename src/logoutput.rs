use crate::framerenderer::Frame;
use crate::tickloop::FrameSink;

/// Frame sink for running without hardware: logs every frame at trace level.
pub struct LogOutput {
    frames: u64,
}

impl LogOutput {
    pub fn new() -> LogOutput {
        LogOutput { frames: 0 }
    }

    fn describe(frame: &Frame) -> String {
        frame
            .iter()
            .map(|color| format!("{:02x}{:02x}{:02x}", color.red, color.green, color.blue))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Drop for LogOutput {
    fn drop(&mut self) {
        log::info!("Logged {} frames", self.frames);
    }
}

impl FrameSink for LogOutput {
    fn show(&mut self, frame: &Frame) {
        self.frames += 1;
        if log::log_enabled!(log::Level::Trace) {
            log::trace!("Frame {}: {}", self.frames, LogOutput::describe(frame));
        }
    }
}
