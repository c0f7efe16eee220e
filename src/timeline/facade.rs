//! Public timeline handle.
//!
//! A [`Timeline`] owns an immutable composition and the scheduler thread that serves its frame
//! requests. Every request method returns immediately; results arrive through
//! [`FrameFuture`]s.

use std::{
    path::{Path, PathBuf},
    sync::{Arc, OnceLock},
    time::Duration,
};

use anyhow::Context as _;

use crate::{
    composition::{
        dsl::{CompositionBuilder, TrackBuilder, clip, external},
        model::{Composition, ImageSequenceReference, MediaReference},
    },
    foundation::{
        deferred::Promise,
        error::{ReeltimeError, ReeltimeResult},
        time::{RationalTime, TimeRange},
    },
    io::{
        reader::{Image, ImageInfo, IoOptions, VideoType},
        sequence::{OPT_DEFAULT_SPEED, SequencePath},
    },
    timeline::{
        context::Context,
        frame::{Frame, FrameFuture},
        options::TimelineOptions,
        scheduler::{Request, Scheduler},
    },
};

/// Frame-serving handle over one composition.
///
/// Dropping the timeline stops its scheduler thread; requests still outstanding are
/// completed with whatever their reads produced.
pub struct Timeline {
    comp: Arc<Composition>,
    path: Option<PathBuf>,
    base_dir: Option<PathBuf>,
    context: Context,
    duration: RationalTime,
    global_start_time: RationalTime,
    video_info: OnceLock<Vec<ImageInfo>>,
    scheduler: Scheduler,
}

impl Timeline {
    /// Serve `comp` with default options.
    pub fn new(comp: Composition, context: Context) -> ReeltimeResult<Self> {
        Self::with_options(comp, context, TimelineOptions::default())
    }

    /// Serve `comp` with explicit scheduler options.
    pub fn with_options(
        comp: Composition,
        context: Context,
        options: TimelineOptions,
    ) -> ReeltimeResult<Self> {
        Self::build(comp, None, None, context, options)
    }

    /// Open a JSON composition file, or wrap a single media file in a one-clip composition.
    pub fn from_path(path: impl AsRef<Path>, context: Context) -> ReeltimeResult<Self> {
        Self::from_path_with_options(path, context, TimelineOptions::default())
    }

    /// Like [`Timeline::from_path`], with explicit scheduler options.
    pub fn from_path_with_options(
        path: impl AsRef<Path>,
        context: Context,
        options: TimelineOptions,
    ) -> ReeltimeResult<Self> {
        let path = path.as_ref();
        let base_dir = path.parent().map(Path::to_path_buf);
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));

        let comp = if !is_json && context.io().plugin_for(path).is_some() {
            media_composition(path, &context, &options.io_options)?
        } else {
            Composition::from_json_file(path)?
        };
        Self::build(comp, Some(path.to_path_buf()), base_dir, context, options)
    }

    fn build(
        comp: Composition,
        path: Option<PathBuf>,
        base_dir: Option<PathBuf>,
        context: Context,
        options: TimelineOptions,
    ) -> ReeltimeResult<Self> {
        comp.validate()?;
        let comp = Arc::new(comp);
        let duration = comp.duration();
        let global_start_time = comp.global_start_time();
        tracing::debug!(
            name = %comp.name,
            %duration,
            %global_start_time,
            tracks = comp.tracks.len(),
            "create timeline"
        );
        let scheduler =
            Scheduler::spawn(Arc::clone(&comp), base_dir.clone(), context.clone(), options)?;
        Ok(Self {
            comp,
            path,
            base_dir,
            context,
            duration,
            global_start_time,
            video_info: OnceLock::new(),
            scheduler,
        })
    }

    /// Request the frame at presentation time `time`.
    ///
    /// `reuse` is an image the decoder may recycle. After [`Timeline::stop`] the future is
    /// already resolved with an empty frame.
    pub fn get_frame(
        &self,
        time: RationalTime,
        video_layer: u16,
        reuse: Option<Arc<Image>>,
    ) -> FrameFuture {
        let (promise, future) = Promise::new();
        let request = Request {
            time,
            video_layer,
            reuse,
            promise,
        };
        if let Err(request) = self.scheduler.enqueue(request) {
            request.promise.fulfill(Frame::empty(request.time));
        }
        future
    }

    /// Replace the ranges whose readers are kept open.
    pub fn set_active_ranges(&self, ranges: Vec<TimeRange>) {
        self.scheduler.set_active_ranges(ranges);
    }

    /// Ranges set by the last [`Timeline::set_active_ranges`].
    pub fn active_ranges(&self) -> Vec<TimeRange> {
        self.scheduler.active_ranges()
    }

    /// Drop queued requests and cancel reads in flight.
    ///
    /// Dropped requests resolve as abandoned; requests already admitted complete normally.
    pub fn cancel_frames(&self) {
        self.scheduler.cancel();
    }

    /// Most requests in progress at once.
    pub fn request_count(&self) -> usize {
        self.scheduler.request_count()
    }

    /// Change the in-progress limit; values below 1 become 1.
    pub fn set_request_count(&self, count: usize) {
        self.scheduler.set_request_count(count);
    }

    /// Longest the scheduler sleeps between polls.
    pub fn request_timeout(&self) -> Duration {
        self.scheduler.request_timeout()
    }

    /// Change the scheduler wake-up bound.
    pub fn set_request_timeout(&self, timeout: Duration) {
        self.scheduler.set_request_timeout(timeout);
    }

    /// Options passed to readers the timeline opens.
    pub fn io_options(&self) -> IoOptions {
        self.scheduler.io_options()
    }

    /// Options for readers opened from now on.
    pub fn set_io_options(&self, options: IoOptions) {
        self.scheduler.set_io_options(options);
    }

    /// Requests waiting for admission.
    pub fn queued_frames(&self) -> usize {
        self.scheduler.queued_len()
    }

    /// Length of the composition.
    pub fn duration(&self) -> RationalTime {
        self.duration
    }

    /// Presentation time of the first frame.
    pub fn global_start_time(&self) -> RationalTime {
        self.global_start_time
    }

    /// `[global_start_time, global_start_time + duration)`.
    pub fn time_range(&self) -> TimeRange {
        TimeRange::new(self.global_start_time, self.duration)
    }

    /// Image layout of the first clip that has video; empty when none does.
    ///
    /// Probed once, on first call.
    pub fn video_info(&self) -> Vec<ImageInfo> {
        self.video_info
            .get_or_init(|| {
                probe_video_info(
                    &self.comp,
                    self.base_dir.as_deref(),
                    &self.context,
                    &self.scheduler.io_options(),
                )
            })
            .clone()
    }

    /// The composition being served.
    pub fn composition(&self) -> &Arc<Composition> {
        &self.comp
    }

    /// Path the timeline was opened from, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Shared services the timeline reads through.
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// `true` once the scheduler stopped accepting requests.
    pub fn is_stopped(&self) -> bool {
        self.scheduler.is_stopped()
    }

    /// Stop the scheduler thread and wait for it. Idempotent.
    pub fn stop(&mut self) {
        self.scheduler.stop();
    }
}

impl std::fmt::Debug for Timeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Timeline")
            .field("name", &self.comp.name)
            .field("path", &self.path)
            .field("duration", &self.duration)
            .field("global_start_time", &self.global_start_time)
            .finish_non_exhaustive()
    }
}

// One video track holding one clip that spans the media's frames.
fn media_composition(
    path: &Path,
    context: &Context,
    io_options: &IoOptions,
) -> ReeltimeResult<Composition> {
    let reader = context.io().read(path, io_options)?;
    let info = reader.info().wait();
    reader.stop();
    let info = info
        .with_context(|| format!("no media info for '{}'", path.display()))
        .map_err(ReeltimeError::from)?;
    if !info.has_video() {
        return Err(ReeltimeError::io(format!(
            "'{}' has no video",
            path.display()
        )));
    }

    let range = info.video_time_range;
    let rate = info.video_rate();
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();

    let sequence = match info.video_type {
        VideoType::Sequence => SequencePath::parse(Path::new(&file_name)),
        VideoType::Movie => None,
    };
    let (media_reference, global_start) = match sequence {
        Some(seq) => (
            MediaReference::ImageSequence(ImageSequenceReference {
                target_url_base: String::new(),
                name_prefix: seq.prefix,
                name_suffix: seq.suffix,
                start_frame: range.start_time.value as i64,
                frame_step: 1,
                rate,
                frame_zero_padding: seq.padding,
            }),
            range.start_time,
        ),
        None => (external(file_name.clone()), RationalTime::new(0.0, rate)),
    };

    CompositionBuilder::new(file_name.clone())
        .global_start_time(global_start)
        .track(
            TrackBuilder::video("Video")
                .clip(clip(file_name, media_reference, range))
                .build()?,
        )
        .build()
}

fn probe_video_info(
    comp: &Composition,
    base_dir: Option<&Path>,
    context: &Context,
    io_options: &IoOptions,
) -> Vec<ImageInfo> {
    for (id, clip) in comp.clips() {
        let Some(path) = comp.media_path(id, base_dir) else {
            continue;
        };
        let mut options = io_options.clone();
        options.insert(
            OPT_DEFAULT_SPEED.to_string(),
            clip.source_range.duration.rate.to_string(),
        );
        let reader = match context.io().read(&path, &options) {
            Ok(reader) => reader,
            Err(e) => {
                tracing::debug!(clip = %id, path = %path.display(), error = %e, "probe failed");
                continue;
            }
        };
        let info = reader.info().wait();
        reader.stop();
        if let Some(info) = info.filter(|i| i.has_video()) {
            return info.video;
        }
    }
    Vec::new()
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/facade.rs"]
mod tests;
