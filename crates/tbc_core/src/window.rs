//! Field window resolution.
//!
//! An engine decodes one frame from its field pair plus whole neighbouring
//! frames on each side. [`FieldWindowLoader`] turns a zero-based frame index
//! into that run of fields, clipped to the capture.

use crate::engine::Margins;
use crate::error::{DecodeError, DecodeResult};
use crate::metadata::{CaptureMetadata, FieldRecord};
use crate::stream::FieldReader;

/// One field's metadata and raw samples.
#[derive(Debug, Clone)]
pub struct SourceField {
    pub record: FieldRecord,
    pub data: Vec<u16>,
}

/// Run of fields handed to an engine.
///
/// `fields` always holds whole (first, second) pairs in frame order. The
/// frame being decoded occupies `fields[start_index..end_index]`.
#[derive(Debug, Clone)]
pub struct FieldWindow {
    pub fields: Vec<SourceField>,
    pub start_index: usize,
    pub end_index: usize,
}

impl FieldWindow {
    /// First and second field of the frame `offset` frames away from the
    /// decoded one, if the window holds it.
    pub fn frame_at(&self, offset: isize) -> Option<(&SourceField, &SourceField)> {
        let first = self.start_index as isize + 2 * offset;
        if first < 0 {
            return None;
        }
        let first = first as usize;
        match (self.fields.get(first), self.fields.get(first + 1)) {
            (Some(a), Some(b)) => Some((a, b)),
            _ => None,
        }
    }

    /// First and second field of the decoded frame.
    pub fn current(&self) -> (&SourceField, &SourceField) {
        (
            &self.fields[self.start_index],
            &self.fields[self.start_index + 1],
        )
    }

    /// Number of whole frames in the window.
    pub fn frame_span(&self) -> usize {
        self.fields.len() / 2
    }
}

/// Resolves field windows for one source.
#[derive(Debug, Clone, Copy)]
pub struct FieldWindowLoader {
    margins: Margins,
    reverse_fields: bool,
}

impl FieldWindowLoader {
    /// Create a loader for an engine's margins.
    pub fn new(margins: Margins, reverse_fields: bool) -> Self {
        Self {
            margins,
            reverse_fields,
        }
    }

    pub fn margins(&self) -> Margins {
        self.margins
    }

    /// Load the window for a zero-based frame index.
    ///
    /// With field reversal on, every pair in the window is swapped, the
    /// neighbouring frames' pairs as well as the requested frame's.
    pub fn resolve_window<R: FieldReader + ?Sized>(
        &self,
        frame_index: i64,
        metadata: &CaptureMetadata,
        reader: &mut R,
    ) -> DecodeResult<FieldWindow> {
        let frame_count = metadata.frame_count();
        let insufficient = || DecodeError::InsufficientFields { frame: frame_index };

        if frame_count == 0 || frame_index < 0 || frame_index as u64 >= frame_count as u64 {
            return Err(insufficient());
        }

        // Frames are 1-based in the field sequence
        let frame_number = frame_index as usize + 1;
        let first_frame = frame_number.saturating_sub(self.margins.look_behind).max(1);
        let last_frame = (frame_number + self.margins.look_ahead).min(frame_count);

        let mut fields = Vec::with_capacity((last_frame - first_frame + 1) * 2);
        for frame in first_frame..=last_frame {
            let (a, b) = metadata
                .frame_field_positions(frame)
                .ok_or_else(insufficient)?;
            for position in [a, b] {
                let seq_no = position + 1;
                let record = metadata.fields.get(position).cloned().ok_or_else(insufficient)?;
                let data = reader
                    .read_field(seq_no)
                    .map_err(|e| DecodeError::stream_read(seq_no, e))?;
                fields.push(SourceField { record, data });
            }
        }

        if fields.is_empty() {
            return Err(insufficient());
        }

        if self.reverse_fields {
            for pair in fields.chunks_exact_mut(2) {
                pair.swap(0, 1);
            }
        }

        let start_index = (frame_number - first_frame) * 2;
        tracing::trace!(
            "[FieldWindow] frame {} -> frames {}..={} (start {})",
            frame_index,
            first_frame,
            last_frame,
            start_index
        );

        Ok(FieldWindow {
            fields,
            start_index,
            end_index: start_index + 2,
        })
    }
}
