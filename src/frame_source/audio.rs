// SPDX-License-Identifier: MPL-2.0
//! Sample-indexed reads from the side PCM file.
//!
//! Audio is stored as fixed-size frames of 16-bit stereo PCM, each located by
//! an [`AudioFrame`] entry. Silent frames, ranges past the index and data
//! missing from a truncated file all read back as zeros.

use std::io::{self, Read, Seek, SeekFrom};

use crate::domain::audio::{samples_per_frame, AudioFrame, BYTES_PER_SAMPLE};
use crate::error::{Error, Result};

/// Reads PCM samples by sample index from an indexed side file.
#[derive(Debug)]
pub struct AudioSampleReader<R> {
    reader: R,
    frames: Vec<AudioFrame>,
    samples_per_frame: u64,
}

impl<R: Read + Seek> AudioSampleReader<R> {
    #[must_use]
    pub fn new(reader: R, frames: Vec<AudioFrame>) -> Self {
        let samples_per_frame = samples_per_frame(&frames) as u64;
        Self {
            reader,
            frames,
            samples_per_frame,
        }
    }

    #[must_use]
    pub fn samples_per_frame(&self) -> u64 {
        self.samples_per_frame
    }

    /// Total number of samples covered by the index.
    #[must_use]
    pub fn num_samples(&self) -> u64 {
        self.frames.len() as u64 * self.samples_per_frame
    }

    /// Reads `count` samples starting at sample `start`.
    ///
    /// Always returns `count * 4` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the side file cannot be read or the request
    /// does not fit in memory.
    pub fn read_samples(&mut self, start: u64, count: u64) -> Result<Vec<u8>> {
        let byte_len = count
            .checked_mul(BYTES_PER_SAMPLE as u64)
            .and_then(|len| usize::try_from(len).ok())
            .ok_or_else(|| Error::Io(format!("audio request of {} samples is too large", count)))?;
        let mut buffer = vec![0u8; byte_len];

        let end = start.saturating_add(count);
        let mut position = start;
        let mut frame_index = start / self.samples_per_frame;

        while position < end {
            let Some(frame) = usize::try_from(frame_index)
                .ok()
                .and_then(|index| self.frames.get(index))
                .copied()
            else {
                break;
            };

            let frame_start = frame_index * self.samples_per_frame;
            let chunk_end = end.min(frame_start + self.samples_per_frame);

            if frame.has_data() {
                let skip = (position - frame_start) * BYTES_PER_SAMPLE as u64;
                let available = u64::from(frame.wave_length).saturating_sub(skip);
                let wanted = ((chunk_end - position) * BYTES_PER_SAMPLE as u64).min(available);

                let out_start = ((position - start) * BYTES_PER_SAMPLE as u64) as usize;
                let out = &mut buffer[out_start..out_start + wanted as usize];
                self.reader.seek(SeekFrom::Start(frame.wave_offset + skip))?;
                let read = read_available(&mut self.reader, out)?;
                if read < out.len() {
                    log::warn!(
                        "Audio file ends inside frame {} ({} of {} bytes), padding with silence",
                        frame_index,
                        read,
                        out.len()
                    );
                }
            }

            position = chunk_end;
            frame_index += 1;
        }

        Ok(buffer)
    }
}

/// Reads until `buf` is full or the reader is exhausted.
fn read_available<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Two frames of 4 samples each; sample `i` of the file is `[i, i, i, i]`.
    fn reader() -> AudioSampleReader<Cursor<Vec<u8>>> {
        let data: Vec<u8> = (0u8..8).flat_map(|i| [i; BYTES_PER_SAMPLE]).collect();
        let frames = vec![AudioFrame::new(0, 16), AudioFrame::new(16, 16)];
        AudioSampleReader::new(Cursor::new(data), frames)
    }

    #[test]
    fn reads_across_frame_boundary() {
        let mut reader = reader();
        let bytes = reader.read_samples(3, 2).unwrap();
        assert_eq!(bytes, vec![3, 3, 3, 3, 4, 4, 4, 4]);
    }

    #[test]
    fn past_index_is_silent() {
        let mut reader = reader();
        let bytes = reader.read_samples(7, 3).unwrap();
        assert_eq!(&bytes[..4], &[7; 4]);
        assert!(bytes[4..].iter().all(|&b| b == 0));
        assert_eq!(bytes.len(), 12);
    }

    #[test]
    fn silent_frame_reads_as_zeros() {
        let data = vec![0xAA; 16];
        let frames = vec![AudioFrame::new(0, 16), AudioFrame::silent()];
        let mut reader = AudioSampleReader::new(Cursor::new(data), frames);

        let bytes = reader.read_samples(2, 4).unwrap();
        assert!(bytes[..8].iter().all(|&b| b == 0xAA));
        assert!(bytes[8..].iter().all(|&b| b == 0));
    }

    #[test]
    fn truncated_file_is_padded() {
        let frames = vec![AudioFrame::new(0, 16)];
        let mut reader = AudioSampleReader::new(Cursor::new(vec![1u8; 6]), frames);

        let bytes = reader.read_samples(0, 4).unwrap();
        assert_eq!(&bytes[..6], &[1; 6]);
        assert!(bytes[6..].iter().all(|&b| b == 0));
    }

    #[test]
    fn sample_count_follows_index() {
        let reader = reader();
        assert_eq!(reader.samples_per_frame(), 4);
        assert_eq!(reader.num_samples(), 8);
    }

    #[test]
    fn zero_count_returns_empty() {
        let mut reader = reader();
        assert!(reader.read_samples(1, 0).unwrap().is_empty());
    }
}
