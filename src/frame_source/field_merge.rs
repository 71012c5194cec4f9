// SPDX-License-Identifier: MPL-2.0
//! Output picture construction from decoded pictures.
//!
//! Every output frame goes through a [`FieldMerger`]: verbatim frames merge a
//! picture with itself, half-delay frames merge the top field (even rows) of
//! one picture with the bottom field (odd rows) of the next. The strategy is
//! chosen once per session from the decoder and output sample depths, so the
//! per-row loops never branch on format.

use crate::domain::picture::{Picture, PictureFormat, Plane};
use crate::error::{Error, Result};

/// Row-interleaving strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldMerger {
    /// Samples are copied unchanged.
    Copy,
    /// 16-bit samples are rounded down to a narrower depth.
    ///
    /// Hardware decoders hand out 10-bit content in 16-bit containers.
    Narrow { shift: u32, max: u16 },
}

impl FieldMerger {
    /// Picks the strategy converting `source_depth` samples to `output_depth`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedConversion`] for any pair other than equal
    /// depths or 16-bit to 10/12-bit.
    pub fn select(source_depth: u8, output_depth: u8) -> Result<Self> {
        match (source_depth, output_depth) {
            (source, output) if source == output => Ok(FieldMerger::Copy),
            (16, output @ (10 | 12)) => Ok(FieldMerger::Narrow {
                shift: u32::from(16 - output),
                max: (1u16 << output) - 1,
            }),
            (source_depth, output_depth) => Err(Error::UnsupportedConversion {
                source_depth,
                output_depth,
            }),
        }
    }

    /// Builds an output picture from the top field of `top` and the bottom
    /// field of `bottom`.
    ///
    /// Passing the same picture twice yields a plain (converted) copy. The
    /// picture type is taken from `top`.
    #[must_use]
    pub fn merge(&self, top: &Picture, bottom: &Picture, output: PictureFormat) -> Picture {
        let planes = (0..output.chroma.plane_count())
            .map(|index| {
                let (width, height) = output.plane_size(index);
                let mut plane = Plane::filled(width, height, 0);
                for y in 0..height {
                    let source = if y % 2 == 0 { top } else { bottom };
                    self.copy_row(source, index, y, plane.row_mut(y));
                }
                plane
            })
            .collect();
        Picture::from_planes(output, top.picture_type(), planes)
    }

    fn copy_row(&self, source: &Picture, plane: usize, y: u32, dst: &mut [u16]) {
        let Some(src_plane) = source.planes().get(plane) else {
            return;
        };
        if y >= src_plane.height() {
            return;
        }
        let src = src_plane.row(y);
        let len = src.len().min(dst.len());
        match *self {
            FieldMerger::Copy => dst[..len].copy_from_slice(&src[..len]),
            FieldMerger::Narrow { shift, max } => {
                let round = 1u32 << (shift - 1);
                for (d, &s) in dst[..len].iter_mut().zip(&src[..len]) {
                    let narrowed = (u32::from(s) + round) >> shift;
                    *d = narrowed.min(u32::from(max)) as u16;
                }
            }
        }
    }
}
