// SPDX-License-Identifier: MPL-2.0
//! `FFmpeg` adapter implementing the [`DecoderSession`] port trait.
//!
//! This module provides [`FfmpegDecoderSession`], a sequential decoder over a
//! transport stream that can be repositioned by byte offset.
//!
//! # Design Notes
//!
//! - The codec context is rebuilt on every [`reset`], since hardware decoders
//!   do not reliably recover from a flush after a byte seek
//! - Pictures are copied out in their native depth; semi-planar formats
//!   (NV12, P010) are split into separate chroma planes here
//! - Formats without a direct copy path go through the software scaler to
//!   8-bit 4:2:0
//! - The pixel format and size are checked on every picture; a picture that
//!   no longer matches the session is scaled back to it
//!
//! [`DecoderSession`]: crate::application::port::DecoderSession
//! [`reset`]: crate::application::port::DecoderSession::reset

mod planes;

use std::path::{Path, PathBuf};
use std::sync::Once;

use ffmpeg_next::format::Pixel;
use ffmpeg_next::{codec, decoder, format, frame, media, software, Packet};

use crate::application::port::{DecoderSession, RawFrame};
use crate::domain::error::DecoderError;
use crate::domain::picture::{ChromaLayout, Picture, PictureFormat, PictureType, Plane};
use crate::manifest::{DecoderSettings, VideoCodec};

static FFMPEG_INIT: Once = Once::new();

/// Initialize `FFmpeg` with appropriate log level.
///
/// Safe to call multiple times; initialization only happens once. The
/// `FFmpeg` log level is set to ERROR since damaged broadcast streams make the
/// decoders very chatty.
///
/// # Errors
///
/// Returns [`DecoderError::OpenFailed`] if `FFmpeg` cannot be initialized.
pub fn init_ffmpeg() -> Result<(), DecoderError> {
    let mut init_result = Ok(());

    FFMPEG_INIT.call_once(|| {
        if let Err(e) = ffmpeg_next::init() {
            init_result = Err(DecoderError::OpenFailed(format!(
                "FFmpeg initialization failed: {e}"
            )));
            return;
        }

        // SAFETY: av_log_set_level is thread-safe and only affects logging
        unsafe {
            ffmpeg_next::ffi::av_log_set_level(ffmpeg_next::ffi::AV_LOG_ERROR);
        }
    });

    init_result
}

/// How samples are laid out in decoded frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SampleLayout {
    /// One plane per component; 8-bit or little-endian 16-bit containers.
    Planar { chroma: ChromaLayout, depth: u8 },
    /// Luma plane plus interleaved 4:2:0 chroma (NV12, P010).
    SemiPlanar { depth: u8 },
    /// Converted to 8-bit 4:2:0 by the scaler.
    Scaled,
}

impl SampleLayout {
    fn for_pixel(pixel: Pixel) -> Self {
        match pixel {
            Pixel::YUV420P | Pixel::YUVJ420P => Self::Planar {
                chroma: ChromaLayout::Yuv420,
                depth: 8,
            },
            Pixel::YUV422P | Pixel::YUVJ422P => Self::Planar {
                chroma: ChromaLayout::Yuv422,
                depth: 8,
            },
            Pixel::YUV444P | Pixel::YUVJ444P => Self::Planar {
                chroma: ChromaLayout::Yuv444,
                depth: 8,
            },
            Pixel::GRAY8 => Self::Planar {
                chroma: ChromaLayout::Gray,
                depth: 8,
            },
            Pixel::YUV420P10LE => Self::Planar {
                chroma: ChromaLayout::Yuv420,
                depth: 10,
            },
            Pixel::YUV420P12LE => Self::Planar {
                chroma: ChromaLayout::Yuv420,
                depth: 12,
            },
            Pixel::YUV422P10LE => Self::Planar {
                chroma: ChromaLayout::Yuv422,
                depth: 10,
            },
            Pixel::NV12 => Self::SemiPlanar { depth: 8 },
            Pixel::P010LE => Self::SemiPlanar { depth: 16 },
            _ => Self::Scaled,
        }
    }

    fn chroma(self) -> ChromaLayout {
        match self {
            Self::Planar { chroma, .. } => chroma,
            Self::SemiPlanar { .. } | Self::Scaled => ChromaLayout::Yuv420,
        }
    }

    /// Depth of the samples as copied out of the frame.
    fn source_depth(self) -> u8 {
        match self {
            Self::Planar { depth, .. } | Self::SemiPlanar { depth } => depth,
            Self::Scaled => 8,
        }
    }

    /// Pixel format whose frames this layout reads; scaled sources are
    /// converted to 8-bit 4:2:0.
    fn target_pixel(self, pixel: Pixel) -> Pixel {
        match self {
            Self::Scaled => Pixel::YUV420P,
            _ => pixel,
        }
    }

    /// Depth handed to callers. P010 carries 10 significant bits.
    fn output_depth(self) -> u8 {
        match self {
            Self::SemiPlanar { depth: 16 } => 10,
            other => other.source_depth(),
        }
    }
}

fn video_codec(id: codec::Id) -> Option<VideoCodec> {
    match id {
        codec::Id::MPEG2VIDEO => Some(VideoCodec::Mpeg2),
        codec::Id::H264 => Some(VideoCodec::H264),
        codec::Id::HEVC => Some(VideoCodec::Hevc),
        _ => None,
    }
}

fn picture_type(kind: ffmpeg_next::picture::Type) -> PictureType {
    match kind {
        ffmpeg_next::picture::Type::I => PictureType::I,
        ffmpeg_next::picture::Type::P => PictureType::P,
        ffmpeg_next::picture::Type::B => PictureType::B,
        _ => PictureType::Unknown,
    }
}

/// Opens a decoder for the video stream, preferring `name` when available.
fn open_decoder(
    input: &format::context::Input,
    stream_index: usize,
    name: Option<&str>,
) -> Result<decoder::Video, DecoderError> {
    let stream = input
        .stream(stream_index)
        .ok_or(DecoderError::NoVideoStream)?;
    let context = codec::context::Context::from_parameters(stream.parameters())
        .map_err(|e| DecoderError::OpenFailed(format!("Failed to create codec context: {e}")))?;

    if let Some(name) = name {
        if let Some(codec) = decoder::find_by_name(name) {
            return context
                .decoder()
                .open_as(codec)
                .and_then(|opened| opened.video())
                .map_err(|e| DecoderError::UnsupportedCodec(format!("{name}: {e}")));
        }
        log::warn!("Decoder {} is not available, using the default decoder", name);
    }

    context
        .decoder()
        .video()
        .map_err(|e| DecoderError::UnsupportedCodec(e.to_string()))
}

/// Scaler kept while decoded pictures keep the same format and size.
struct Scaler {
    source: (Pixel, u32, u32),
    context: software::scaling::Context,
}

/// Converts `decoded` to `target` pixels at the output geometry.
///
/// The scaler in `slot` is rebuilt only when the decoded format or size
/// changes.
fn convert(
    slot: &mut Option<Scaler>,
    decoded: &frame::Video,
    target: Pixel,
    output: PictureFormat,
) -> Result<frame::Video, DecoderError> {
    let source = (decoded.format(), decoded.width(), decoded.height());
    if !matches!(slot, Some(scaler) if scaler.source == source) {
        log::debug!(
            "Converting {:?} {}x{} pictures to {:?} {}x{}",
            source.0,
            source.1,
            source.2,
            target,
            output.width,
            output.height
        );
        let context = software::scaling::Context::get(
            source.0,
            source.1,
            source.2,
            target,
            output.width,
            output.height,
            software::scaling::Flags::BILINEAR,
        )
        .map_err(|e| DecoderError::Other(format!("Failed to create scaler: {e}")))?;
        *slot = Some(Scaler { source, context });
    }

    let mut converted = frame::Video::empty();
    if let Some(scaler) = slot.as_mut() {
        scaler
            .context
            .run(decoded, &mut converted)
            .map_err(|e| DecoderError::DecodingFailed(format!("Scaling failed: {e}")))?;
    }
    Ok(converted)
}

/// Copies the planes of a frame whose pixels are laid out as `layout`.
fn copy_planes(decoded: &frame::Video, layout: SampleLayout, format: PictureFormat) -> Vec<Plane> {
    match layout {
        SampleLayout::SemiPlanar { depth } => {
            let (width, height) = format.plane_size(0);
            let (chroma_width, chroma_height) = format.plane_size(1);
            let (luma, (u, v)) = if depth == 8 {
                (
                    planes::plane_u8(decoded.data(0), decoded.stride(0), width, height),
                    planes::split_uv_u8(
                        decoded.data(1),
                        decoded.stride(1),
                        chroma_width,
                        chroma_height,
                    ),
                )
            } else {
                (
                    planes::plane_u16le(decoded.data(0), decoded.stride(0), width, height),
                    planes::split_uv_u16le(
                        decoded.data(1),
                        decoded.stride(1),
                        chroma_width,
                        chroma_height,
                    ),
                )
            };
            vec![luma, u, v]
        }
        planar => (0..planar.chroma().plane_count())
            .map(|index| {
                let (width, height) = format.plane_size(index);
                let (data, stride) = (decoded.data(index), decoded.stride(index));
                if planar.source_depth() == 8 {
                    planes::plane_u8(data, stride, width, height)
                } else {
                    planes::plane_u16le(data, stride, width, height)
                }
            })
            .collect(),
    }
}

/// `FFmpeg` contexts for one open stream.
struct DecoderState {
    input: format::context::Input,
    decoder: decoder::Video,
    stream_index: usize,
    scaler: Option<Scaler>,
}

// SAFETY: DecoderState contains FFmpeg types with internal raw pointers.
// These are safe to send between threads because:
// 1. FFmpeg's decoder/format/scaler contexts are thread-safe for single-threaded access per instance
// 2. We maintain exclusive access through Rust's ownership model
// 3. The session is only used from one thread at a time (behind the frame source lock)
unsafe impl Send for DecoderState {}

/// `FFmpeg`-based implementation of [`DecoderSession`].
///
/// Every decoded picture is checked against the format and size the session
/// opened with. Pictures that differ (hardware decoders switching to NV12,
/// format or resolution changes mid-broadcast) are converted back by the
/// software scaler.
///
/// # Thread Safety
///
/// This type is `Send` but not `Sync`; a frame source serializes access.
pub struct FfmpegDecoderSession {
    path: PathBuf,
    state: DecoderState,
    /// Hardware decoder requested by the manifest, if any.
    decoder_name: Option<String>,
    layout: SampleLayout,
    /// Pixel format pictures are copied from.
    target_pixel: Pixel,
    output: PictureFormat,
    /// Timestamp of the first key packet sent since the last reset.
    key_packet_pts: Option<i64>,
    eof_sent: bool,
}

impl FfmpegDecoderSession {
    /// Opens `path` and prepares a decoder for its best video stream.
    ///
    /// # Errors
    ///
    /// - [`DecoderError::OpenFailed`] if the file cannot be opened
    /// - [`DecoderError::NoVideoStream`] if it carries no video
    /// - [`DecoderError::UnsupportedCodec`] if no decoder can be opened
    pub fn open_path(path: &Path, settings: DecoderSettings) -> Result<Self, DecoderError> {
        init_ffmpeg()?;

        let input = format::input(&path)
            .map_err(|e| DecoderError::OpenFailed(format!("{}: {e}", path.display())))?;

        let (stream_index, codec) = {
            let stream = input
                .streams()
                .best(media::Type::Video)
                .ok_or(DecoderError::NoVideoStream)?;
            (stream.index(), video_codec(stream.parameters().id()))
        };
        let decoder_name = codec.and_then(|codec| settings.kind_for(codec).decoder_name(codec));

        let decoder = open_decoder(&input, stream_index, decoder_name.as_deref())?;
        let pixel = decoder.format();
        let layout = SampleLayout::for_pixel(pixel);
        let output = PictureFormat::new(
            decoder.width(),
            decoder.height(),
            layout.chroma(),
            layout.output_depth(),
        );
        log::info!(
            "Opened {} ({}x{}, {:?}, decoder {})",
            path.display(),
            output.width,
            output.height,
            pixel,
            decoder_name.as_deref().unwrap_or("default")
        );

        Ok(Self {
            path: path.to_path_buf(),
            state: DecoderState {
                input,
                decoder,
                stream_index,
                scaler: None,
            },
            decoder_name,
            layout,
            target_pixel: layout.target_pixel(pixel),
            output,
            key_packet_pts: None,
            eof_sent: false,
        })
    }

    fn to_raw_frame(&mut self, decoded: &frame::Video) -> Result<Option<RawFrame>, DecoderError> {
        let Some(pts) = decoded.pts().or_else(|| decoded.timestamp()) else {
            log::debug!("{}: dropping decoded picture without timestamp", self.path.display());
            return Ok(None);
        };
        let is_sync_hint = decoded.is_key() || self.key_packet_pts == Some(pts);
        let picture = self.extract_picture(decoded)?;
        Ok(Some(RawFrame::new(pts, is_sync_hint, picture)))
    }

    fn extract_picture(&mut self, decoded: &frame::Video) -> Result<Picture, DecoderError> {
        let format = self.output.with_bit_depth(self.layout.source_depth());
        let kind = picture_type(decoded.kind());

        let planes = if copies_directly(decoded, self.target_pixel, format) {
            copy_planes(decoded, self.layout, format)
        } else {
            let converted = convert(&mut self.state.scaler, decoded, self.target_pixel, format)?;
            copy_planes(&converted, self.layout, format)
        };
        Ok(Picture::from_planes(format, kind, planes))
    }
}

/// Whether `decoded` can be copied without conversion.
fn copies_directly(decoded: &frame::Video, target: Pixel, format: PictureFormat) -> bool {
    decoded.format() == target && decoded.width() >= format.width && decoded.height() >= format.height
}

impl DecoderSession for FfmpegDecoderSession {
    fn open(&mut self, byte_offset: u64) -> Result<(), DecoderError> {
        let offset = i64::try_from(byte_offset)
            .map_err(|_| DecoderError::SeekFailed(format!("offset {byte_offset} out of range")))?;

        // SAFETY: the context pointer stays valid while `input` is alive, and
        // av_seek_frame only repositions its I/O cursor.
        let ret = unsafe {
            ffmpeg_next::ffi::av_seek_frame(
                self.state.input.as_mut_ptr(),
                -1,
                offset,
                ffmpeg_next::ffi::AVSEEK_FLAG_BYTE as i32,
            )
        };
        if ret < 0 {
            return Err(DecoderError::SeekFailed(format!(
                "byte {}: {}",
                byte_offset,
                ffmpeg_next::Error::from(ret)
            )));
        }
        Ok(())
    }

    fn next_raw_frame(&mut self) -> Result<Option<RawFrame>, DecoderError> {
        let mut decoded = frame::Video::empty();
        loop {
            if self.state.decoder.receive_frame(&mut decoded).is_ok() {
                match self.to_raw_frame(&decoded)? {
                    Some(raw) => return Ok(Some(raw)),
                    None => continue,
                }
            }
            if self.eof_sent {
                return Ok(None);
            }

            let mut packet = Packet::empty();
            match packet.read(&mut self.state.input) {
                Ok(()) => {
                    if packet.stream() != self.state.stream_index {
                        continue;
                    }
                    if packet.is_key() && self.key_packet_pts.is_none() {
                        self.key_packet_pts = packet.pts();
                    }
                    if let Err(e) = self.state.decoder.send_packet(&packet) {
                        log::debug!("Dropping damaged packet: {}", e);
                    }
                }
                Err(ffmpeg_next::Error::Eof) => {
                    if let Err(e) = self.state.decoder.send_eof() {
                        log::debug!("Failed to drain decoder: {}", e);
                    }
                    self.eof_sent = true;
                }
                Err(e) => {
                    return Err(DecoderError::from_message(&format!(
                        "Failed to read packet: {e}"
                    )));
                }
            }
        }
    }

    fn reset(&mut self) -> Result<(), DecoderError> {
        self.state.decoder = open_decoder(
            &self.state.input,
            self.state.stream_index,
            self.decoder_name.as_deref(),
        )?;
        self.key_packet_pts = None;
        self.eof_sent = false;
        Ok(())
    }

    fn output_format(&self) -> PictureFormat {
        self.output
    }

    fn source_bit_depth(&self) -> u8 {
        self.layout.source_depth()
    }
}
