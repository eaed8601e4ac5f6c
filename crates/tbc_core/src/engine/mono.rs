//! Luma-only decoder.

use super::dsp::{self, DecodedField, FieldGeometry};
use super::EngineConfig;
use crate::frame::ComponentFrame;
use crate::metadata::VideoParameters;
use crate::window::FieldWindow;

/// Passes samples straight through as luma. U and V stay zero.
#[derive(Debug)]
pub struct MonoDecoder {
    geometry: FieldGeometry,
    luma_limit: f64,
    scratch: Vec<f64>,
}

impl MonoDecoder {
    pub fn new(params: &VideoParameters, config: EngineConfig) -> Self {
        let geometry = FieldGeometry::from_parameters(params);
        Self {
            luma_limit: config.luma_nr * geometry.ire_step,
            geometry,
            scratch: Vec::new(),
        }
    }

    /// Decode the window's current frame.
    pub fn decode(&mut self, window: &FieldWindow) -> ComponentFrame {
        let mut frame = ComponentFrame::new(self.geometry.width, self.geometry.frame_height());
        let (first, second) = window.current();
        let len = self.geometry.len();

        for (slot, field) in [first, second].into_iter().enumerate() {
            let mut decoded = DecodedField {
                y: Vec::with_capacity(len),
                u: vec![0.0; len],
                v: vec![0.0; len],
            };
            dsp::to_samples(&field.data, &mut decoded.y);

            if self.luma_limit > 0.0 {
                for line in decoded.y.chunks_exact_mut(self.geometry.width) {
                    dsp::reduce_noise(line, self.luma_limit, &mut self.scratch);
                }
            }
            dsp::write_field(&mut frame, &self.geometry, &decoded, slot == 1);
        }
        frame
    }
}
