// SPDX-License-Identifier: MPL-2.0
//! Planar picture buffers.
//!
//! Decoded pictures are stored plane by plane with one `u16` per sample,
//! whatever the bit depth, so 8-bit and high-bit-depth sources share the same
//! merge and cache code. Rows are tightly packed (stride equals plane width).

use serde::{Deserialize, Serialize};

/// Chroma plane arrangement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChromaLayout {
    /// Luma only.
    Gray,
    /// Chroma halved horizontally and vertically.
    Yuv420,
    /// Chroma halved horizontally.
    Yuv422,
    /// Full resolution chroma.
    Yuv444,
}

impl ChromaLayout {
    /// Number of planes a picture in this layout carries.
    #[must_use]
    pub fn plane_count(self) -> usize {
        match self {
            ChromaLayout::Gray => 1,
            _ => 3,
        }
    }

    /// Horizontal and vertical chroma subsampling as right shifts.
    #[must_use]
    pub fn chroma_shift(self) -> (u32, u32) {
        match self {
            ChromaLayout::Gray | ChromaLayout::Yuv444 => (0, 0),
            ChromaLayout::Yuv420 => (1, 1),
            ChromaLayout::Yuv422 => (1, 0),
        }
    }
}

/// Geometry and sample format shared by every picture of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PictureFormat {
    pub width: u32,
    pub height: u32,
    pub chroma: ChromaLayout,
    /// Significant bits per sample (8, 10, 12 or 16).
    pub bit_depth: u8,
}

impl PictureFormat {
    #[must_use]
    pub fn new(width: u32, height: u32, chroma: ChromaLayout, bit_depth: u8) -> Self {
        Self {
            width,
            height,
            chroma,
            bit_depth,
        }
    }

    /// Returns the same geometry with a different sample depth.
    #[must_use]
    pub fn with_bit_depth(self, bit_depth: u8) -> Self {
        Self { bit_depth, ..self }
    }

    /// Width and height of plane `index`.
    #[must_use]
    pub fn plane_size(&self, index: usize) -> (u32, u32) {
        if index == 0 {
            return (self.width, self.height);
        }
        let (shift_x, shift_y) = self.chroma.chroma_shift();
        (self.width >> shift_x, self.height >> shift_y)
    }
}

/// Coding type of the picture the output was taken from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PictureType {
    I,
    P,
    B,
    #[default]
    Unknown,
}

/// One component plane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plane {
    width: u32,
    height: u32,
    samples: Vec<u16>,
}

impl Plane {
    /// Creates a plane filled with `value`.
    #[must_use]
    pub fn filled(width: u32, height: u32, value: u16) -> Self {
        Self {
            width,
            height,
            samples: vec![value; width as usize * height as usize],
        }
    }

    /// Wraps tightly packed samples.
    ///
    /// # Panics
    ///
    /// Panics if `samples.len()` is not `width * height`.
    #[must_use]
    pub fn from_samples(width: u32, height: u32, samples: Vec<u16>) -> Self {
        let expected_len = width as usize * height as usize;
        assert_eq!(
            samples.len(),
            expected_len,
            "plane data length mismatch: expected {expected_len}, got {}",
            samples.len()
        );
        Self {
            width,
            height,
            samples,
        }
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub fn samples(&self) -> &[u16] {
        &self.samples
    }

    /// Samples of row `y`.
    #[must_use]
    pub fn row(&self, y: u32) -> &[u16] {
        let start = y as usize * self.width as usize;
        &self.samples[start..start + self.width as usize]
    }

    /// Mutable samples of row `y`.
    pub fn row_mut(&mut self, y: u32) -> &mut [u16] {
        let width = self.width as usize;
        let start = y as usize * width;
        &mut self.samples[start..start + width]
    }
}

/// A decoded or reconstructed picture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Picture {
    format: PictureFormat,
    picture_type: PictureType,
    planes: Vec<Plane>,
}

impl Picture {
    /// Allocates a black picture.
    ///
    /// Handed out when nothing has been decoded yet, so callers always receive
    /// a picture of the expected geometry.
    #[must_use]
    pub fn blank(format: PictureFormat) -> Self {
        let shift = u32::from(format.bit_depth.saturating_sub(8));
        let black = 16u16 << shift;
        let neutral = 128u16 << shift;
        let planes = (0..format.chroma.plane_count())
            .map(|index| {
                let (width, height) = format.plane_size(index);
                Plane::filled(width, height, if index == 0 { black } else { neutral })
            })
            .collect();
        Self {
            format,
            picture_type: PictureType::Unknown,
            planes,
        }
    }

    /// Assembles a picture from planes.
    ///
    /// # Panics
    ///
    /// Panics if the plane count or any plane size disagrees with `format`.
    #[must_use]
    pub fn from_planes(format: PictureFormat, picture_type: PictureType, planes: Vec<Plane>) -> Self {
        assert_eq!(
            planes.len(),
            format.chroma.plane_count(),
            "plane count mismatch for {:?}",
            format.chroma
        );
        for (index, plane) in planes.iter().enumerate() {
            assert_eq!(
                (plane.width(), plane.height()),
                format.plane_size(index),
                "plane {index} size mismatch"
            );
        }
        Self {
            format,
            picture_type,
            planes,
        }
    }

    #[must_use]
    pub fn format(&self) -> PictureFormat {
        self.format
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.format.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.format.height
    }

    #[must_use]
    pub fn picture_type(&self) -> PictureType {
        self.picture_type
    }

    #[must_use]
    pub fn planes(&self) -> &[Plane] {
        &self.planes
    }

    #[must_use]
    pub fn plane(&self, index: usize) -> &Plane {
        &self.planes[index]
    }

    pub fn plane_mut(&mut self, index: usize) -> &mut Plane {
        &mut self.planes[index]
    }

    /// Total size of the sample buffers in bytes.
    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.planes
            .iter()
            .map(|plane| plane.samples.len() * std::mem::size_of::<u16>())
            .sum()
    }
}
