use crate::animationstate::{AnimationState, Mode};

pub type Rgb = palette::Srgb<u8>;

/// One color per LED, in strip order.
pub type Frame = Vec<Rgb>;

#[derive(Clone, Debug, PartialEq)]
pub struct Colors {
    pub waiting_primary: Rgb,
    pub waiting_secondary: Rgb,
    pub build_background: Rgb,
    pub build_foreground: Rgb,
    pub success: Rgb,
    pub failure: Rgb,
}

impl Default for Colors {
    fn default() -> Self {
        Colors {
            waiting_primary: Rgb::new(255, 0, 0),
            waiting_secondary: Rgb::new(0, 255, 0),
            build_background: Rgb::new(0, 0, 32),
            build_foreground: Rgb::new(255, 255, 255),
            success: Rgb::new(0, 255, 0),
            failure: Rgb::new(255, 0, 0),
        }
    }
}

pub struct FrameRenderer {
    colors: Colors,
    pixel_count: usize,
    block_width: usize,
}

impl FrameRenderer {
    pub fn new(colors: Colors, pixel_count: usize, block_width: usize) -> FrameRenderer {
        FrameRenderer {
            colors,
            pixel_count,
            block_width: block_width.max(1),
        }
    }

    /// Renders the frame for the current mode. Flips the waiting phase after a waiting frame.
    pub fn render(&self, state: &mut AnimationState, positions: &[usize]) -> Frame {
        match state.mode() {
            Mode::Notifying => self.fill(state.notify_color()),
            Mode::Waiting => {
                let frame = self.alternating(state.wait_phase());
                state.toggle_wait_phase();
                frame
            }
            Mode::Running => self.build_points(positions),
        }
    }

    fn fill(&self, color: Rgb) -> Frame {
        vec![color; self.pixel_count]
    }

    fn alternating(&self, phase: bool) -> Frame {
        (0..self.pixel_count)
            .map(|i| {
                let primary = (i / self.block_width) % 2 == 0;
                if primary != phase {
                    self.colors.waiting_primary
                } else {
                    self.colors.waiting_secondary
                }
            })
            .collect()
    }

    fn build_points(&self, positions: &[usize]) -> Frame {
        let mut frame = self.fill(self.colors.build_background);
        for &position in positions {
            if let Some(pixel) = frame.get_mut(position) {
                *pixel = self.colors.build_foreground;
            }
        }

        frame
    }
}
