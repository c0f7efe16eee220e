//! Decoder reader collaborator interface.
//!
//! A reader owns one media source and produces its metadata, video frames and audio through
//! [`Deferred`] handles. Readers run their own worker threads; callers only use the
//! non-blocking, future-returning methods and poll the results.

use std::{collections::BTreeMap, path::Path, sync::Arc};

use crate::foundation::{
    deferred::Deferred,
    error::{ReeltimeError, ReeltimeResult},
    time::{RationalTime, TimeRange},
};

/// Opaque key/value options forwarded to reader construction.
pub type IoOptions = BTreeMap<String, String>;

/// Pixel layout of an [`Image`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PixelType {
    /// 8-bit luminance.
    L8,
    /// 8-bit RGB, no alpha.
    Rgb8,
    /// 8-bit RGBA, premultiplied alpha.
    #[default]
    Rgba8Premul,
}

impl PixelType {
    /// Bytes per pixel.
    pub fn channels(self) -> usize {
        match self {
            PixelType::L8 => 1,
            PixelType::Rgb8 => 3,
            PixelType::Rgba8Premul => 4,
        }
    }
}

/// Size and layout of an image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ImageInfo {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel layout.
    pub pixel_type: PixelType,
}

impl ImageInfo {
    /// Length in bytes of a tightly packed buffer.
    pub fn byte_count(&self) -> usize {
        self.width as usize * self.height as usize * self.pixel_type.channels()
    }

    /// `true` when width and height are non-zero.
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// A decoded picture, rows packed top to bottom.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Image {
    /// Size and layout.
    pub info: ImageInfo,
    /// Pixel bytes, `info.byte_count()` long.
    pub data: Vec<u8>,
}

impl Image {
    /// Zero-filled image.
    pub fn new(info: ImageInfo) -> Self {
        Self {
            data: vec![0; info.byte_count()],
            info,
        }
    }

    /// Wrap existing pixel data, checking its length.
    pub fn from_data(info: ImageInfo, data: Vec<u8>) -> ReeltimeResult<Self> {
        if data.len() != info.byte_count() {
            return Err(ReeltimeError::validation(format!(
                "image data is {} bytes, expected {} for {}x{} {:?}",
                data.len(),
                info.byte_count(),
                info.width,
                info.height,
                info.pixel_type
            )));
        }
        Ok(Self { info, data })
    }
}

/// Audio stream layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AudioInfo {
    /// Interleaved channels.
    pub channel_count: u16,
    /// Samples per second.
    pub sample_rate: u32,
}

/// How the video stream is stored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum VideoType {
    /// One container file.
    #[default]
    Movie,
    /// Numbered still images.
    Sequence,
}

/// Stream metadata of an opened media source.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Info {
    /// One entry per video layer; empty when the media has no picture.
    pub video: Vec<ImageInfo>,
    /// File or numbered sequence.
    pub video_type: VideoType,
    /// Frames available, at the video rate.
    pub video_time_range: TimeRange,
    /// `None` when the media has no sound.
    pub audio: Option<AudioInfo>,
    /// Samples available, at the audio rate.
    pub audio_time_range: TimeRange,
    /// Free-form metadata reported by the reader.
    pub tags: BTreeMap<String, String>,
}

impl Info {
    /// `true` when at least one video layer exists.
    pub fn has_video(&self) -> bool {
        !self.video.is_empty()
    }

    /// Frame rate of the video stream.
    pub fn video_rate(&self) -> f64 {
        self.video_time_range.duration.rate
    }
}

/// One decoded video frame.
#[derive(Clone, Debug, Default)]
pub struct VideoFrame {
    /// Media time the frame was read at.
    pub time: RationalTime,
    /// Video layer the frame belongs to.
    pub layer: u16,
    /// `None` when the read was cancelled or failed.
    pub image: Option<Arc<Image>>,
}

/// Interleaved f32 samples for a time range.
#[derive(Clone, Debug, Default)]
pub struct AudioBuffer {
    /// Layout of `samples`.
    pub info: AudioInfo,
    /// Time covered by the buffer.
    pub range: TimeRange,
    /// Interleaved samples.
    pub samples: Vec<f32>,
}

/// Per-media decode backend.
///
/// Every method returns immediately. Cancelled or failed reads resolve with empty data
/// rather than staying pending.
pub trait MediaReader: Send + Sync {
    /// Media path this reader was opened with.
    fn path(&self) -> &Path;

    /// Stream metadata.
    fn info(&self) -> Deferred<Info>;

    /// Decode the video frame at `time` (media time, reader rate).
    ///
    /// `reuse` is a buffer the reader may recycle for the output.
    fn read_video_frame(
        &self,
        time: RationalTime,
        layer: u16,
        reuse: Option<Arc<Image>>,
    ) -> Deferred<VideoFrame>;

    /// Decode the samples covering `range`.
    fn read_audio(&self, range: TimeRange) -> Deferred<AudioBuffer>;

    /// Resolve every queued video read with an empty frame.
    fn cancel_video_frames(&self);

    /// `true` while video reads are queued or in progress.
    fn has_video_frames(&self) -> bool;

    /// Begin shutting down; new reads resolve empty.
    fn stop(&self);

    /// `true` once the reader's threads have finished.
    fn has_stopped(&self) -> bool;
}

/// Factory for readers of a family of file extensions.
pub trait ReadPlugin: Send + Sync {
    /// Short plugin name used in logs.
    fn name(&self) -> &str;

    /// Lower-case extensions without the dot.
    fn extensions(&self) -> &[&str];

    /// Open a reader for `path`.
    fn read(&self, path: &Path, options: &IoOptions) -> ReeltimeResult<Arc<dyn MediaReader>>;
}

#[cfg(test)]
#[path = "../../tests/unit/io/reader.rs"]
mod tests;
