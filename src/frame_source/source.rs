// SPDX-License-Identifier: MPL-2.0
//! Thread-safe access API over a decode controller and an audio reader.

use std::io::{Cursor, Read, Seek};
use std::sync::{Arc, Mutex};

use crate::application::port::DecoderSession;
use crate::config::SourceConfig;
use crate::domain::audio::{AudioFrame, CHANNELS};
use crate::domain::error::DecoderError;
use crate::domain::picture::Picture;
use crate::domain::timeline::Timeline;
use crate::error::{Error, Result};
use crate::manifest::{AudioFormat, VideoFormat};

use super::audio::AudioSampleReader;
use super::controller::DecodeController;
use super::stats::SourceStats;

/// Byte source for the side PCM file.
pub trait AudioInput: Read + Seek + Send {}

impl<T: Read + Seek + Send> AudioInput for T {}

/// Audio stream properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioInfo {
    pub sample_rate: u32,
    pub channels: u16,
    pub num_samples: u64,
}

/// Properties of a frame source, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceInfo {
    pub width: u32,
    pub height: u32,
    pub frame_rate_num: u32,
    pub frame_rate_den: u32,
    pub num_frames: usize,
    pub interlaced: bool,
    pub audio: Option<AudioInfo>,
}

/// Random-access frame and audio source.
///
/// Video and audio requests lock independently, so an audio read never waits
/// for a seek.
pub struct FrameSource<D: DecoderSession> {
    video: Mutex<DecodeController<D>>,
    audio: Mutex<AudioSampleReader<Box<dyn AudioInput>>>,
    info: SourceInfo,
}

impl<D: DecoderSession> FrameSource<D> {
    /// Creates a video-only source.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedConversion`] if the decoder's sample depth
    /// cannot be converted to its output depth.
    pub fn new(
        session: D,
        timeline: Timeline,
        video: VideoFormat,
        config: SourceConfig,
    ) -> Result<Self> {
        let controller = DecodeController::new(session, timeline, config)?;
        let output = controller.output_format();
        let info = SourceInfo {
            width: output.width,
            height: output.height,
            frame_rate_num: video.frame_rate_num,
            frame_rate_den: video.frame_rate_den,
            num_frames: controller.timeline().len(),
            interlaced: !video.progressive,
            audio: None,
        };
        log::debug!(
            "Frame source: {}x{} {} frames at {}/{} fps",
            info.width,
            info.height,
            info.num_frames,
            info.frame_rate_num,
            info.frame_rate_den
        );

        let silent: Box<dyn AudioInput> = Box::new(Cursor::new(Vec::new()));
        Ok(Self {
            video: Mutex::new(controller),
            audio: Mutex::new(AudioSampleReader::new(silent, Vec::new())),
            info,
        })
    }

    /// Attaches a side PCM file described by `frames`.
    #[must_use]
    pub fn with_audio<R: AudioInput + 'static>(
        mut self,
        input: R,
        frames: Vec<AudioFrame>,
        format: AudioFormat,
    ) -> Self {
        let reader = AudioSampleReader::new(Box::new(input) as Box<dyn AudioInput>, frames);
        self.info.audio = Some(AudioInfo {
            sample_rate: format.sample_rate,
            channels: CHANNELS,
            num_samples: reader.num_samples(),
        });
        self.audio = Mutex::new(reader);
        self
    }

    #[must_use]
    pub fn info(&self) -> &SourceInfo {
        &self.info
    }

    /// Returns output frame `n`; out-of-range indices are clamped.
    ///
    /// Undecodable frames are answered with a nearby frame. The returned
    /// handle stays valid after the frame leaves the cache.
    ///
    /// # Errors
    ///
    /// - [`Error::Decoder`] if the decoder session fails
    /// - [`Error::TooManyFailedFrames`] once the failure budget is exhausted
    pub fn get_frame(&self, n: usize) -> Result<Arc<Picture>> {
        let mut controller = self
            .video
            .lock()
            .map_err(|_| Error::Decoder(DecoderError::Other("Lock poisoned".to_string())))?;
        controller.request_frame(n)
    }

    /// Returns `count` 16-bit stereo samples starting at sample `start`.
    ///
    /// Silent frames and anything past the audio index read as zeros.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the side file cannot be read.
    pub fn get_audio_samples(&self, start: u64, count: u64) -> Result<Vec<u8>> {
        let mut audio = self
            .audio
            .lock()
            .map_err(|_| Error::Io("Audio lock poisoned".to_string()))?;
        audio.read_samples(start, count)
    }

    /// Field parity of frame `n`: true (top field first) for interlaced
    /// sources.
    #[must_use]
    pub fn parity(&self, _n: usize) -> bool {
        self.info.interlaced
    }

    #[must_use]
    pub fn stats(&self) -> SourceStats {
        match self.video.lock() {
            Ok(controller) => controller.stats(),
            Err(poisoned) => poisoned.into_inner().stats(),
        }
    }
}

#[cfg(feature = "ffmpeg")]
impl FrameSource<crate::infrastructure::ffmpeg::FfmpegDecoderSession> {
    /// Opens the stream and side PCM file a manifest describes.
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest's timeline is invalid, the container
    /// or audio file cannot be opened, or no usable decoder exists.
    pub fn open_manifest(
        manifest: &crate::manifest::SourceManifest,
        config: SourceConfig,
    ) -> Result<Self> {
        let timeline = manifest.timeline()?;
        let session = crate::infrastructure::ffmpeg::FfmpegDecoderSession::open_path(
            &manifest.source_path,
            manifest.decoders,
        )?;
        let source = Self::new(session, timeline, manifest.video, config)?;

        match (&manifest.audio_path, manifest.audio) {
            (Some(path), Some(format)) => {
                let file = std::io::BufReader::new(std::fs::File::open(path)?);
                Ok(source.with_audio(file, manifest.audio_frames.clone(), format))
            }
            _ => Ok(source),
        }
    }
}

impl<D: DecoderSession> std::fmt::Debug for FrameSource<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameSource")
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}
