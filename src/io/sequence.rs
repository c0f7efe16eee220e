//! Numbered image files read as one media source.
//!
//! `shot.0001.png`, `shot.0002.png`, ... become a movie whose frame numbers are media time at
//! the `SequenceIO/DefaultSpeed` rate. Frames decode on a small pool of named worker threads
//! fed through a channel. Cancelling bumps an epoch; jobs from an older epoch resolve empty.

use std::{
    panic::AssertUnwindSafe,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicU64, AtomicUsize, Ordering},
    },
    thread,
};

use anyhow::Context;
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;

use crate::{
    foundation::{
        deferred::{Deferred, Promise},
        error::{ReeltimeError, ReeltimeResult},
        math::premultiply_rgba8_in_place,
        time::{RationalTime, TimeRange},
    },
    io::reader::{
        AudioBuffer, Image, ImageInfo, Info, IoOptions, MediaReader, PixelType, ReadPlugin,
        VideoFrame, VideoType,
    },
};

/// Frames per second used when the options do not say.
pub const DEFAULT_SPEED: f64 = 24.0;
/// Decode threads per reader when the options do not say.
pub const DEFAULT_THREAD_COUNT: usize = 2;

/// Option key for the sequence frame rate.
pub const OPT_DEFAULT_SPEED: &str = "SequenceIO/DefaultSpeed";
/// Option key for the decode thread count.
pub const OPT_THREAD_COUNT: &str = "SequenceIO/ThreadCount";

const EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tif", "tiff", "bmp", "tga", "exr"];

/// A file path split around its frame number.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SequencePath {
    /// Directory holding the files.
    pub dir: PathBuf,
    /// File name part before the frame number.
    pub prefix: String,
    /// Frame number of the path that was parsed; `None` for an unnumbered still.
    pub number: Option<i64>,
    /// Digit count when the number is zero padded, else 0.
    pub padding: usize,
    /// Extension, dot included.
    pub suffix: String,
}

impl SequencePath {
    /// Split `path` into directory, prefix, frame number and suffix.
    pub fn parse(path: &Path) -> Option<Self> {
        let file_name = path.file_name()?.to_str()?;
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let (stem, suffix) = match file_name.rfind('.') {
            Some(i) if i > 0 => file_name.split_at(i),
            _ => (file_name, ""),
        };
        let digits_at = stem
            .char_indices()
            .rev()
            .take_while(|(_, c)| c.is_ascii_digit())
            .last()
            .map(|(i, _)| i);

        let (prefix, number, padding) = match digits_at {
            Some(i) => {
                let digits = &stem[i..];
                let padding = if digits.len() > 1 && digits.starts_with('0') {
                    digits.len()
                } else {
                    0
                };
                (stem[..i].to_string(), digits.parse().ok(), padding)
            }
            None => (stem.to_string(), None, 0),
        };

        Some(Self {
            dir,
            prefix,
            number,
            padding,
            suffix: suffix.to_string(),
        })
    }

    /// Path of frame `n`.
    pub fn frame_path(&self, n: i64) -> PathBuf {
        match self.number {
            Some(_) => self.dir.join(format!(
                "{}{:0width$}{}",
                self.prefix,
                n,
                self.suffix,
                width = self.padding
            )),
            None => self.dir.join(format!("{}{}", self.prefix, self.suffix)),
        }
    }

    /// First and last frame numbers present on disk.
    ///
    /// Falls back to the parsed number when the directory cannot be listed.
    pub fn scan(&self) -> (i64, i64) {
        let Some(number) = self.number else {
            return (0, 0);
        };
        let dir = if self.dir.as_os_str().is_empty() {
            Path::new(".")
        } else {
            self.dir.as_path()
        };
        let Ok(rd) = std::fs::read_dir(dir) else {
            return (number, number);
        };

        let (mut first, mut last) = (number, number);
        for entry in rd.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            let Some(middle) = name
                .strip_prefix(self.prefix.as_str())
                .and_then(|rest| rest.strip_suffix(self.suffix.as_str()))
            else {
                continue;
            };
            if middle.is_empty() || !middle.bytes().all(|b| b.is_ascii_digit()) {
                continue;
            }
            if let Ok(n) = middle.parse::<i64>() {
                first = first.min(n);
                last = last.max(n);
            }
        }
        (first, last)
    }
}

/// Read plugin for still images and numbered image sequences.
#[derive(Clone, Copy, Debug, Default)]
pub struct SequencePlugin;

impl ReadPlugin for SequencePlugin {
    fn name(&self) -> &str {
        "Sequence"
    }

    fn extensions(&self) -> &[&str] {
        EXTENSIONS
    }

    fn read(&self, path: &Path, options: &IoOptions) -> ReeltimeResult<Arc<dyn MediaReader>> {
        Ok(Arc::new(SequenceReader::open(path, options)?))
    }
}

struct Job {
    time: RationalTime,
    layer: u16,
    epoch: u64,
    promise: Promise<VideoFrame>,
}

struct Shared {
    seq: SequencePath,
    frames: TimeRange,
    epoch: AtomicU64,
    pending: AtomicUsize,
    live_workers: AtomicUsize,
}

/// Reader for one image sequence.
pub struct SequenceReader {
    path: PathBuf,
    info: Info,
    shared: Arc<Shared>,
    sender: Mutex<Option<Sender<Job>>>,
    handles: Mutex<Vec<thread::JoinHandle<()>>>,
}

impl SequenceReader {
    /// Scan the sequence, read the first frame's header and start the decode threads.
    pub fn open(path: &Path, options: &IoOptions) -> ReeltimeResult<Self> {
        let seq = SequencePath::parse(path)
            .ok_or_else(|| ReeltimeError::io(format!("not a file path: '{}'", path.display())))?;
        let rate = parse_option(options, OPT_DEFAULT_SPEED)
            .filter(|r: &f64| r.is_finite() && *r > 0.0)
            .unwrap_or(DEFAULT_SPEED);
        let thread_count = parse_option(options, OPT_THREAD_COUNT)
            .filter(|n: &usize| *n > 0)
            .unwrap_or(DEFAULT_THREAD_COUNT);

        let (first, last) = seq.scan();
        let (width, height) = image::image_dimensions(seq.frame_path(first))
            .with_context(|| format!("read image header of '{}'", path.display()))?;

        let frames = TimeRange::from_frames(first as f64, (last - first + 1) as f64, rate);
        let mut info = Info {
            video_time_range: frames,
            video_type: if seq.number.is_some() {
                VideoType::Sequence
            } else {
                VideoType::Movie
            },
            ..Info::default()
        };
        info.video.push(ImageInfo {
            width,
            height,
            pixel_type: PixelType::Rgba8Premul,
        });

        let shared = Arc::new(Shared {
            seq,
            frames,
            epoch: AtomicU64::new(0),
            pending: AtomicUsize::new(0),
            live_workers: AtomicUsize::new(0),
        });

        let (tx, rx) = crossbeam_channel::unbounded::<Job>();
        let mut handles = Vec::with_capacity(thread_count);
        for worker_id in 0..thread_count {
            let rx = rx.clone();
            let shared = Arc::clone(&shared);
            shared.live_workers.fetch_add(1, Ordering::SeqCst);
            let spawned = thread::Builder::new()
                .name(format!("reeltime-seq-{worker_id}"))
                .spawn(move || worker_loop(worker_id, &rx, &shared));
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    // Threads already started exit once `tx` is dropped.
                    tracing::warn!(spawned = handles.len(), "sequence decode thread spawn failed");
                    return Err(ReeltimeError::io(format!(
                        "spawn sequence decode thread: {e}"
                    )));
                }
            }
        }

        tracing::debug!(
            path = %path.display(),
            first,
            last,
            rate,
            threads = thread_count,
            "open image sequence"
        );

        Ok(Self {
            path: path.to_path_buf(),
            info,
            shared,
            sender: Mutex::new(Some(tx)),
            handles: Mutex::new(handles),
        })
    }
}

fn parse_option<T: std::str::FromStr>(options: &IoOptions, key: &str) -> Option<T> {
    options.get(key).and_then(|v| v.trim().parse().ok())
}

fn worker_loop(worker_id: usize, rx: &Receiver<Job>, shared: &Shared) {
    tracing::trace!(worker_id, "sequence worker started");
    while let Ok(job) = rx.recv() {
        let frame = if job.epoch != shared.epoch.load(Ordering::SeqCst) {
            empty_frame(job.time, job.layer)
        } else {
            let decoded = std::panic::catch_unwind(AssertUnwindSafe(|| decode_frame(shared, job.time)));
            match decoded {
                Ok(Ok(image)) => VideoFrame {
                    time: job.time,
                    layer: job.layer,
                    image: Some(Arc::new(image)),
                },
                Ok(Err(e)) => {
                    tracing::warn!(time = %job.time, error = %e, "sequence frame decode failed");
                    empty_frame(job.time, job.layer)
                }
                Err(_) => {
                    tracing::warn!(time = %job.time, "sequence frame decode panicked");
                    empty_frame(job.time, job.layer)
                }
            }
        };
        job.promise.fulfill(frame);
        shared.pending.fetch_sub(1, Ordering::SeqCst);
    }
    shared.live_workers.fetch_sub(1, Ordering::SeqCst);
    tracing::trace!(worker_id, "sequence worker stopped");
}

fn decode_frame(shared: &Shared, time: RationalTime) -> ReeltimeResult<Image> {
    let t = shared.frames.clamped(time.rescaled_to(shared.frames.start_time.rate));
    let path = shared.seq.frame_path(t.value.floor() as i64);
    let rgba = image::open(&path)
        .with_context(|| format!("decode '{}'", path.display()))?
        .to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut data = rgba.into_raw();
    premultiply_rgba8_in_place(&mut data);
    Image::from_data(
        ImageInfo {
            width,
            height,
            pixel_type: PixelType::Rgba8Premul,
        },
        data,
    )
}

fn empty_frame(time: RationalTime, layer: u16) -> VideoFrame {
    VideoFrame {
        time,
        layer,
        image: None,
    }
}

impl MediaReader for SequenceReader {
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
        let sender = self.sender.lock();
        let Some(tx) = sender.as_ref() else {
            return Deferred::ready(empty_frame(time, layer));
        };
        let (promise, deferred) = Promise::new();
        self.shared.pending.fetch_add(1, Ordering::SeqCst);
        let job = Job {
            time,
            layer,
            epoch: self.shared.epoch.load(Ordering::SeqCst),
            promise,
        };
        if let Err(err) = tx.send(job) {
            // Workers are gone; the returned job's promise resolves the deferred.
            self.shared.pending.fetch_sub(1, Ordering::SeqCst);
            let job = err.into_inner();
            job.promise.fulfill(empty_frame(time, layer));
        }
        deferred
    }

    fn read_audio(&self, range: TimeRange) -> Deferred<AudioBuffer> {
        Deferred::ready(AudioBuffer {
            range,
            ..AudioBuffer::default()
        })
    }

    fn cancel_video_frames(&self) {
        self.shared.epoch.fetch_add(1, Ordering::SeqCst);
    }

    fn has_video_frames(&self) -> bool {
        self.shared.pending.load(Ordering::SeqCst) > 0
    }

    fn stop(&self) {
        self.shared.epoch.fetch_add(1, Ordering::SeqCst);
        if self.sender.lock().take().is_some() {
            tracing::debug!(path = %self.path.display(), "stop image sequence");
        }
    }

    fn has_stopped(&self) -> bool {
        self.sender.lock().is_none() && self.shared.live_workers.load(Ordering::SeqCst) == 0
    }
}

impl Drop for SequenceReader {
    fn drop(&mut self) {
        self.stop();
        for handle in self.handles.lock().drain(..) {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/io/sequence.rs"]
mod tests;
