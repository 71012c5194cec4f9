// SPDX-License-Identifier: MPL-2.0
//! Stride-aware copies from decoder buffers into [`Plane`]s.

use crate::domain::picture::Plane;

/// Copies an 8-bit plane.
#[must_use]
pub fn plane_u8(data: &[u8], stride: usize, width: u32, height: u32) -> Plane {
    let mut samples = Vec::with_capacity(width as usize * height as usize);
    for y in 0..height as usize {
        let row = &data[y * stride..y * stride + width as usize];
        samples.extend(row.iter().map(|&b| u16::from(b)));
    }
    Plane::from_samples(width, height, samples)
}

/// Copies a little-endian 16-bit plane.
#[must_use]
pub fn plane_u16le(data: &[u8], stride: usize, width: u32, height: u32) -> Plane {
    let mut samples = Vec::with_capacity(width as usize * height as usize);
    for y in 0..height as usize {
        let row = &data[y * stride..y * stride + width as usize * 2];
        samples.extend(row.chunks_exact(2).map(|b| u16::from_le_bytes([b[0], b[1]])));
    }
    Plane::from_samples(width, height, samples)
}

/// Splits an interleaved 8-bit chroma plane (NV12) into U and V.
///
/// `width` is the chroma width, so each row holds `2 * width` bytes.
#[must_use]
pub fn split_uv_u8(data: &[u8], stride: usize, width: u32, height: u32) -> (Plane, Plane) {
    let len = width as usize * height as usize;
    let (mut u, mut v) = (Vec::with_capacity(len), Vec::with_capacity(len));
    for y in 0..height as usize {
        let row = &data[y * stride..y * stride + width as usize * 2];
        for pair in row.chunks_exact(2) {
            u.push(u16::from(pair[0]));
            v.push(u16::from(pair[1]));
        }
    }
    (
        Plane::from_samples(width, height, u),
        Plane::from_samples(width, height, v),
    )
}

/// Splits an interleaved little-endian 16-bit chroma plane (P010) into U and V.
#[must_use]
pub fn split_uv_u16le(data: &[u8], stride: usize, width: u32, height: u32) -> (Plane, Plane) {
    let len = width as usize * height as usize;
    let (mut u, mut v) = (Vec::with_capacity(len), Vec::with_capacity(len));
    for y in 0..height as usize {
        let row = &data[y * stride..y * stride + width as usize * 4];
        for pair in row.chunks_exact(4) {
            u.push(u16::from_le_bytes([pair[0], pair[1]]));
            v.push(u16::from_le_bytes([pair[2], pair[3]]));
        }
    }
    (
        Plane::from_samples(width, height, u),
        Plane::from_samples(width, height, v),
    )
}
