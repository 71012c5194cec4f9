// SPDX-License-Identifier: MPL-2.0
//! Integration tests for sample-indexed audio reads from a side PCM file.

mod common;

use std::fs::{self, File};
use std::io::BufReader;

use common::{timeline, video_format, SyntheticSession, SyntheticStream};
use tempfile::{tempdir, TempDir};
use ts_frame_source::config::SourceConfig;
use ts_frame_source::domain::audio::{AudioFrame, BYTES_PER_SAMPLE};
use ts_frame_source::manifest::AudioFormat;
use ts_frame_source::FrameSource;

const SAMPLES_PER_FRAME: u64 = 1024;
const FRAME_LEN: u32 = (SAMPLES_PER_FRAME as usize * BYTES_PER_SAMPLE) as u32;

/// PCM bytes where every byte of audio frame `i` equals `i + 1`.
fn pcm(frames: usize) -> Vec<u8> {
    (0..frames)
        .flat_map(|i| std::iter::repeat_n(i as u8 + 1, FRAME_LEN as usize))
        .collect()
}

/// Writes `data` to a temporary side file and attaches it to a video source.
///
/// The directory guard must outlive the source.
fn source_with_audio(data: &[u8], index: Vec<AudioFrame>) -> (FrameSource<SyntheticSession>, TempDir) {
    let dir = tempdir().expect("failed to create temp dir");
    let path = dir.path().join("audio.pcm");
    fs::write(&path, data).expect("failed to write pcm");
    let file = BufReader::new(File::open(&path).expect("failed to open pcm"));

    let (session, _) = SyntheticStream::linear(60, 0).session();
    let source = FrameSource::new(session, timeline(60, 0), video_format(), SourceConfig::default())
        .expect("source should open")
        .with_audio(file, index, AudioFormat { sample_rate: 48000 });
    (source, dir)
}

fn contiguous_index(frames: usize) -> Vec<AudioFrame> {
    (0..frames)
        .map(|i| AudioFrame::new(i as u64 * u64::from(FRAME_LEN), FRAME_LEN))
        .collect()
}

#[test]
fn test_info_reports_audio_stream() {
    let (source, _dir) = source_with_audio(&pcm(3), contiguous_index(3));
    let audio = source.info().audio.expect("audio attached");

    assert_eq!(audio.sample_rate, 48000);
    assert_eq!(audio.channels, 2);
    assert_eq!(audio.num_samples, 3 * SAMPLES_PER_FRAME);
}

#[test]
fn test_read_spanning_frames() {
    let (source, _dir) = source_with_audio(&pcm(3), contiguous_index(3));

    let bytes = source.get_audio_samples(SAMPLES_PER_FRAME - 2, 4).unwrap();

    assert_eq!(bytes.len(), 16);
    assert!(bytes[..8].iter().all(|&b| b == 1));
    assert!(bytes[8..].iter().all(|&b| b == 2));
}

#[test]
fn test_silent_frames_and_tail_are_zero_filled() {
    let mut index = contiguous_index(2);
    index.insert(1, AudioFrame::silent());
    let (source, _dir) = source_with_audio(&pcm(2), index);

    let bytes = source
        .get_audio_samples(SAMPLES_PER_FRAME - 1, SAMPLES_PER_FRAME * 3)
        .unwrap();
    let frame = SAMPLES_PER_FRAME as usize * BYTES_PER_SAMPLE;

    assert!(bytes[..4].iter().all(|&b| b == 1));
    assert!(bytes[4..4 + frame].iter().all(|&b| b == 0), "silent frame");
    assert!(bytes[4 + frame..4 + 2 * frame].iter().all(|&b| b == 2));
    assert!(bytes[4 + 2 * frame..].iter().all(|&b| b == 0), "past the index");
}

#[test]
fn test_short_file_is_padded_with_silence() {
    let mut data = pcm(2);
    data.truncate(FRAME_LEN as usize + 10);
    let (source, _dir) = source_with_audio(&data, contiguous_index(2));

    let bytes = source.get_audio_samples(SAMPLES_PER_FRAME, 8).unwrap();

    assert!(bytes[..10].iter().all(|&b| b == 2));
    assert!(bytes[10..].iter().all(|&b| b == 0));
}

#[test]
fn test_audio_reads_do_not_disturb_video() {
    let (source, _dir) = source_with_audio(&pcm(3), contiguous_index(3));

    let picture = source.get_frame(40).unwrap();
    source.get_audio_samples(0, 4096).unwrap();

    assert!(std::sync::Arc::ptr_eq(&picture, &source.get_frame(40).unwrap()));
    assert_eq!(source.stats().decode.seeks, 1);
}
