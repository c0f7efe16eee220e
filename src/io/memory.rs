//! Procedural in-memory media, for previews and tests.
//!
//! A `.mem` path names a synthetic movie: every frame is a solid color derived from the path
//! hash, with the frame number stamped into the first pixel. Reads can be held back until
//! [`MemoryPlugin::release_all`] and reader shutdown can be held back until
//! [`MemoryPlugin::finish_stops`], which makes scheduling and teardown observable.

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    sync::{
        Arc, Weak,
        atomic::{AtomicUsize, Ordering},
    },
};

use parking_lot::Mutex;

use crate::{
    foundation::{
        deferred::{Deferred, Promise},
        error::{ReeltimeError, ReeltimeResult},
        math::fnv1a64,
        time::{RationalTime, TimeRange},
    },
    io::reader::{
        AudioBuffer, AudioInfo, Image, ImageInfo, Info, IoOptions, MediaReader, PixelType,
        ReadPlugin, VideoFrame,
    },
};

const EXTENSIONS: &[&str] = &["mem"];

#[derive(Clone, Debug)]
struct MemoryConfig {
    width: u32,
    height: u32,
    duration: f64,
    rate: f64,
    manual_release: bool,
    deferred_stop: bool,
    fail: HashSet<String>,
    audio_only: HashSet<String>,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            width: 8,
            height: 8,
            duration: 100_000.0,
            rate: 24.0,
            manual_release: false,
            deferred_stop: false,
            fail: HashSet::new(),
            audio_only: HashSet::new(),
        }
    }
}

#[derive(Default)]
struct Registry {
    config: Mutex<MemoryConfig>,
    readers: Mutex<Vec<Weak<MemoryReader>>>,
    opened: AtomicUsize,
}

/// Read plugin for `.mem` paths.
///
/// Clones share configuration and the registry of opened readers.
#[derive(Clone, Default)]
pub struct MemoryPlugin {
    registry: Arc<Registry>,
}

impl MemoryPlugin {
    /// Plugin with 8x8 frames, 100000 frames at 24 fps.
    pub fn new() -> Self {
        Self::default()
    }

    /// Frame size of readers opened from now on.
    pub fn with_size(self, width: u32, height: u32) -> Self {
        {
            let mut cfg = self.registry.config.lock();
            cfg.width = width;
            cfg.height = height;
        }
        self
    }

    /// Media length of readers opened from now on.
    pub fn with_duration(self, frames: f64, rate: f64) -> Self {
        {
            let mut cfg = self.registry.config.lock();
            cfg.duration = frames;
            cfg.rate = rate;
        }
        self
    }

    /// Hold video reads pending until [`MemoryPlugin::release_all`].
    pub fn manual_release(self, on: bool) -> Self {
        self.registry.config.lock().manual_release = on;
        self
    }

    /// Keep stopped readers running until [`MemoryPlugin::finish_stops`].
    pub fn deferred_stop(self, on: bool) -> Self {
        self.registry.config.lock().deferred_stop = on;
        self
    }

    /// Fail to open any path whose file name is `file_name`.
    pub fn fail_on(self, file_name: impl Into<String>) -> Self {
        self.registry.config.lock().fail.insert(file_name.into());
        self
    }

    /// Open `file_name` as sound-only media.
    pub fn audio_only(self, file_name: impl Into<String>) -> Self {
        self.registry
            .config
            .lock()
            .audio_only
            .insert(file_name.into());
        self
    }

    /// Readers opened so far, including released ones.
    pub fn opened_count(&self) -> usize {
        self.registry.opened.load(Ordering::SeqCst)
    }

    /// Readers still referenced by someone.
    pub fn live_count(&self) -> usize {
        self.live().len()
    }

    /// Most recent live reader opened for a path ending in `file_name`.
    pub fn reader(&self, file_name: &str) -> Option<Arc<MemoryReader>> {
        self.live()
            .into_iter()
            .rev()
            .find(|r| r.path.file_name().and_then(|n| n.to_str()) == Some(file_name))
    }

    /// Video reads currently held back, across live readers.
    pub fn pending_reads(&self) -> usize {
        self.live().iter().map(|r| r.state.lock().pending.len()).sum()
    }

    /// Resolve every held-back read with its frame. Returns how many were resolved.
    pub fn release_all(&self) -> usize {
        self.live().iter().map(|r| r.release()).sum()
    }

    /// Let every stopped reader report [`MediaReader::has_stopped`].
    pub fn finish_stops(&self) {
        for reader in self.live() {
            let mut state = reader.state.lock();
            if state.stopped {
                state.finished = true;
            }
        }
    }

    fn live(&self) -> Vec<Arc<MemoryReader>> {
        let mut readers = self.registry.readers.lock();
        readers.retain(|w| w.strong_count() > 0);
        readers.iter().filter_map(Weak::upgrade).collect()
    }
}

impl ReadPlugin for MemoryPlugin {
    fn name(&self) -> &str {
        "Memory"
    }

    fn extensions(&self) -> &[&str] {
        EXTENSIONS
    }

    fn read(&self, path: &Path, options: &IoOptions) -> ReeltimeResult<Arc<dyn MediaReader>> {
        let cfg = self.registry.config.lock().clone();
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        if cfg.fail.contains(&file_name) {
            return Err(ReeltimeError::io(format!(
                "cannot open '{}'",
                path.display()
            )));
        }

        let range = TimeRange::from_frames(0.0, cfg.duration, cfg.rate);
        let mut info = Info {
            video_time_range: range,
            audio_time_range: range,
            audio: Some(AudioInfo {
                channel_count: 2,
                sample_rate: 48_000,
            }),
            ..Info::default()
        };
        if !cfg.audio_only.contains(&file_name) {
            info.video.push(ImageInfo {
                width: cfg.width,
                height: cfg.height,
                pixel_type: PixelType::Rgba8Premul,
            });
        }
        info.tags.insert("Memory/Name".to_string(), file_name);

        let h = fnv1a64(0, path.to_string_lossy().as_bytes()).to_le_bytes();
        let reader = Arc::new(MemoryReader {
            path: path.to_path_buf(),
            info,
            options: options.clone(),
            color: [h[0], h[1], h[2]],
            manual_release: cfg.manual_release,
            deferred_stop: cfg.deferred_stop,
            state: Mutex::new(ReaderState::default()),
            reads: AtomicUsize::new(0),
        });
        self.registry.readers.lock().push(Arc::downgrade(&reader));
        self.registry.opened.fetch_add(1, Ordering::SeqCst);
        Ok(reader)
    }
}

struct PendingRead {
    time: RationalTime,
    layer: u16,
    promise: Promise<VideoFrame>,
}

#[derive(Default)]
struct ReaderState {
    pending: Vec<PendingRead>,
    stopped: bool,
    finished: bool,
}

/// Reader for one `.mem` path.
pub struct MemoryReader {
    path: PathBuf,
    info: Info,
    options: IoOptions,
    color: [u8; 3],
    manual_release: bool,
    deferred_stop: bool,
    state: Mutex<ReaderState>,
    reads: AtomicUsize,
}

impl MemoryReader {
    /// Options the reader was opened with.
    pub fn options(&self) -> &IoOptions {
        &self.options
    }

    /// Video reads requested so far.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// `true` once [`MediaReader::stop`] was called.
    pub fn is_stopping(&self) -> bool {
        self.state.lock().stopped
    }

    fn release(&self) -> usize {
        let pending = std::mem::take(&mut self.state.lock().pending);
        let n = pending.len();
        for read in pending {
            let frame = self.render(read.time, read.layer);
            read.promise.fulfill(frame);
        }
        n
    }

    fn render(&self, time: RationalTime, layer: u16) -> VideoFrame {
        let image = self.info.video.first().map(|&info| {
            let mut image = Image::new(info);
            for px in image.data.chunks_exact_mut(4) {
                px[..3].copy_from_slice(&self.color);
                px[3] = 255;
            }
            let stamp = (time.value.max(0.0) as u32).to_le_bytes();
            if let Some(px) = image.data.get_mut(..3) {
                px.copy_from_slice(&stamp[..3]);
            }
            Arc::new(image)
        });
        VideoFrame { time, layer, image }
    }
}

/// Frame number stamped into the first pixel of a `.mem` image.
pub fn stamped_frame(image: &Image) -> u32 {
    match image.data.get(..3) {
        Some(&[a, b, c]) => u32::from_le_bytes([a, b, c, 0]),
        _ => 0,
    }
}

fn empty_frame(time: RationalTime, layer: u16) -> VideoFrame {
    VideoFrame {
        time,
        layer,
        image: None,
    }
}

impl MediaReader for MemoryReader {
    fn path(&self) -> &Path {
        &self.path
    }

    fn info(&self) -> Deferred<Info> {
        Deferred::ready(self.info.clone())
    }

    fn read_video_frame(
        &self,
        time: RationalTime,
        layer: u16,
        _reuse: Option<Arc<Image>>,
    ) -> Deferred<VideoFrame> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock();
        if state.stopped {
            return Deferred::ready(empty_frame(time, layer));
        }
        if self.manual_release {
            let (promise, deferred) = Promise::new();
            state.pending.push(PendingRead {
                time,
                layer,
                promise,
            });
            deferred
        } else {
            drop(state);
            Deferred::ready(self.render(time, layer))
        }
    }

    fn read_audio(&self, range: TimeRange) -> Deferred<AudioBuffer> {
        let info = self.info.audio.unwrap_or_default();
        let frames = (range.duration.to_seconds() * f64::from(info.sample_rate)).round();
        let len = frames.max(0.0) as usize * usize::from(info.channel_count);
        Deferred::ready(AudioBuffer {
            info,
            range,
            samples: vec![0.0; len],
        })
    }

    fn cancel_video_frames(&self) {
        let pending = std::mem::take(&mut self.state.lock().pending);
        for read in pending {
            read.promise.fulfill(empty_frame(read.time, read.layer));
        }
    }

    fn has_video_frames(&self) -> bool {
        !self.state.lock().pending.is_empty()
    }

    fn stop(&self) {
        let pending = {
            let mut state = self.state.lock();
            state.stopped = true;
            std::mem::take(&mut state.pending)
        };
        for read in pending {
            read.promise.fulfill(empty_frame(read.time, read.layer));
        }
    }

    fn has_stopped(&self) -> bool {
        let state = self.state.lock();
        state.stopped && (state.finished || !self.deferred_stop)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/io/memory.rs"]
mod tests;
