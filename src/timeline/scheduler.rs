//! Frame request scheduler: one background thread per timeline.
//!
//! Each tick waits (bounded by the request timeout), admits queued requests up to the
//! request count, walks the composition for the new ones and dispatches their reads, polls
//! every in-progress request, then sweeps and reaps idle readers. On shutdown every queued
//! and in-progress request is completed with whatever is ready.

use std::{
    collections::VecDeque,
    panic::AssertUnwindSafe,
    path::PathBuf,
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use parking_lot::{Condvar, Mutex, RwLock};

use crate::{
    composition::model::Composition,
    eval::walker::{LayerPlan, ReadPlan, TransitionKind, Walker},
    foundation::{
        deferred::{Deferred, Promise},
        error::{ReeltimeError, ReeltimeResult},
        time::{RationalTime, TimeRange},
    },
    io::{
        cache::ReaderCache,
        reader::{Image, IoOptions, VideoFrame},
        sequence::OPT_DEFAULT_SPEED,
    },
    timeline::{
        context::Context,
        frame::{Frame, FrameLayer},
        options::TimelineOptions,
    },
};

const STATS_INTERVAL: Duration = Duration::from_secs(10);

/// A caller's frame request, queued until admitted.
pub(crate) struct Request {
    pub(crate) time: RationalTime,
    pub(crate) video_layer: u16,
    pub(crate) reuse: Option<Arc<Image>>,
    pub(crate) promise: Promise<Frame>,
}

struct LayerData {
    image: Option<Deferred<VideoFrame>>,
    image_b: Option<Deferred<VideoFrame>>,
    transition: TransitionKind,
    transition_value: f32,
}

struct InProgress {
    time: RationalTime,
    promise: Promise<Frame>,
    layers: Vec<LayerData>,
}

impl InProgress {
    fn is_ready(&self) -> bool {
        self.layers.iter().all(|l| {
            l.image.as_ref().is_none_or(Deferred::is_ready)
                && l.image_b.as_ref().is_none_or(Deferred::is_ready)
        })
    }

    // Reads that are still pending become missing images.
    fn complete(self) {
        let layers = self
            .layers
            .into_iter()
            .map(|l| FrameLayer {
                image: take_image(l.image),
                image_b: take_image(l.image_b),
                transition: l.transition,
                transition_value: l.transition_value,
            })
            .collect();
        self.promise.fulfill(Frame {
            time: self.time,
            layers,
        });
    }
}

fn take_image(read: Option<Deferred<VideoFrame>>) -> Option<Arc<Image>> {
    read?.try_take().ok().flatten().and_then(|frame| frame.image)
}

struct Queue {
    requests: VecDeque<Request>,
    request_count: usize,
    request_timeout: Duration,
    io_options: IoOptions,
    cancel_readers: bool,
    stopped: bool,
}

struct Shared {
    queue: Mutex<Queue>,
    cv: Condvar,
    active_ranges: RwLock<Vec<TimeRange>>,
}

/// Handle to the scheduler thread.
pub(crate) struct Scheduler {
    shared: Arc<Shared>,
    handle: Option<thread::JoinHandle<()>>,
}

impl Scheduler {
    /// Start the scheduler thread for `comp`.
    pub(crate) fn spawn(
        comp: Arc<Composition>,
        base_dir: Option<PathBuf>,
        context: Context,
        options: TimelineOptions,
    ) -> ReeltimeResult<Self> {
        let shared = Arc::new(Shared {
            queue: Mutex::new(Queue {
                requests: VecDeque::new(),
                request_count: options.request_count.max(1),
                request_timeout: options.request_timeout,
                io_options: options.io_options,
                cancel_readers: false,
                stopped: false,
            }),
            cv: Condvar::new(),
            active_ranges: RwLock::new(Vec::new()),
        });

        let worker = Worker {
            rate: comp.duration().rate,
            comp,
            base_dir,
            context,
            shared: Arc::clone(&shared),
            cache: ReaderCache::new(),
            in_progress: Vec::new(),
            log_timer: Instant::now(),
        };
        let handle = thread::Builder::new()
            .name("reeltime-timeline".to_string())
            .spawn(move || worker.run())
            .map_err(|e| ReeltimeError::scheduler(format!("spawn timeline thread: {e}")))?;

        Ok(Self {
            shared,
            handle: Some(handle),
        })
    }

    /// Queue a request; hands it back when the scheduler has stopped.
    pub(crate) fn enqueue(&self, request: Request) -> Result<(), Request> {
        {
            let mut q = self.shared.queue.lock();
            if q.stopped {
                return Err(request);
            }
            q.requests.push_back(request);
        }
        self.shared.cv.notify_one();
        Ok(())
    }

    /// Drop queued requests and ask live readers to cancel their reads.
    pub(crate) fn cancel(&self) {
        let dropped = {
            let mut q = self.shared.queue.lock();
            q.cancel_readers = true;
            std::mem::take(&mut q.requests)
        };
        tracing::debug!(dropped = dropped.len(), "cancel frames");
        drop(dropped);
        self.shared.cv.notify_one();
    }

    pub(crate) fn set_active_ranges(&self, ranges: Vec<TimeRange>) {
        *self.shared.active_ranges.write() = ranges;
    }

    pub(crate) fn active_ranges(&self) -> Vec<TimeRange> {
        self.shared.active_ranges.read().clone()
    }

    pub(crate) fn request_count(&self) -> usize {
        self.shared.queue.lock().request_count
    }

    pub(crate) fn set_request_count(&self, count: usize) {
        self.shared.queue.lock().request_count = count.max(1);
        self.shared.cv.notify_one();
    }

    pub(crate) fn request_timeout(&self) -> Duration {
        self.shared.queue.lock().request_timeout
    }

    pub(crate) fn set_request_timeout(&self, timeout: Duration) {
        self.shared.queue.lock().request_timeout = timeout;
        self.shared.cv.notify_one();
    }

    pub(crate) fn io_options(&self) -> IoOptions {
        self.shared.queue.lock().io_options.clone()
    }

    pub(crate) fn set_io_options(&self, options: IoOptions) {
        self.shared.queue.lock().io_options = options;
    }

    /// Requests queued and not yet admitted.
    pub(crate) fn queued_len(&self) -> usize {
        self.shared.queue.lock().requests.len()
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.shared.queue.lock().stopped
    }

    /// Stop the thread and wait for it to drain. Idempotent.
    pub(crate) fn stop(&mut self) {
        self.shared.queue.lock().stopped = true;
        self.shared.cv.notify_all();
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            tracing::error!("timeline thread panicked during shutdown");
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Worker {
    comp: Arc<Composition>,
    base_dir: Option<PathBuf>,
    context: Context,
    shared: Arc<Shared>,
    cache: ReaderCache,
    in_progress: Vec<InProgress>,
    rate: f64,
    log_timer: Instant,
}

impl Worker {
    fn run(mut self) {
        tracing::debug!(name = %self.comp.name, "timeline thread started");
        loop {
            match std::panic::catch_unwind(AssertUnwindSafe(|| self.tick())) {
                Ok(true) => {}
                Ok(false) => break,
                Err(_) => {
                    tracing::error!("timeline tick panicked; shutting down");
                    break;
                }
            }
        }
        self.drain();
        tracing::debug!(name = %self.comp.name, "timeline thread stopped");
    }

    fn tick(&mut self) -> bool {
        let Some((admitted, options, cancel)) = self.admit() else {
            return false;
        };
        if cancel {
            self.cache.cancel_all();
        }
        for request in admitted {
            self.start(request, &options);
        }
        self.poll();

        let active = self.shared.active_ranges.read().clone();
        self.cache.sweep(&active, &self.comp);
        self.cache.reap();

        if self.log_timer.elapsed() >= STATS_INTERVAL {
            self.log_timer = Instant::now();
            self.log_stats();
        }
        true
    }

    // WAIT + ADMIT. `None` once stopped.
    fn admit(&mut self) -> Option<(Vec<Request>, IoOptions, bool)> {
        let mut q = self.shared.queue.lock();
        let can_admit = !q.requests.is_empty() && self.in_progress.len() < q.request_count;
        if !can_admit && !q.cancel_readers && !q.stopped {
            let timeout = q.request_timeout;
            self.shared.cv.wait_for(&mut q, timeout);
        }
        if q.stopped {
            return None;
        }

        let mut admitted = Vec::new();
        while self.in_progress.len() + admitted.len() < q.request_count {
            match q.requests.pop_front() {
                Some(request) => admitted.push(request),
                None => break,
            }
        }

        let mut options = q.io_options.clone();
        options.insert(OPT_DEFAULT_SPEED.to_string(), self.rate.to_string());
        let cancel = std::mem::take(&mut q.cancel_readers);
        Some((admitted, options, cancel))
    }

    // WALK: resolve and dispatch one admitted request.
    fn start(&mut self, request: Request, options: &IoOptions) {
        let Request {
            time,
            video_layer,
            reuse,
            promise,
        } = request;

        let mut layers = Vec::new();
        let walked = std::panic::catch_unwind(AssertUnwindSafe(|| {
            let mut plans = Vec::new();
            let resolved = Walker::resolve_into(&self.comp, time, &mut plans);
            for plan in &plans {
                layers.push(self.dispatch(plan, video_layer, reuse.clone(), options));
            }
            resolved
        }));
        match walked {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(%time, error = %e, "frame request resolved partially"),
            Err(_) => tracing::warn!(%time, "frame request panicked; resolved partially"),
        }

        self.in_progress.push(InProgress {
            time,
            promise,
            layers,
        });
    }

    fn dispatch(
        &mut self,
        plan: &LayerPlan,
        video_layer: u16,
        reuse: Option<Arc<Image>>,
        options: &IoOptions,
    ) -> LayerData {
        LayerData {
            image: plan
                .image
                .and_then(|read| self.read(read, video_layer, reuse, options)),
            image_b: plan
                .image_b
                .and_then(|read| self.read(read, video_layer, None, options)),
            transition: plan.transition,
            transition_value: plan.transition_value,
        }
    }

    fn read(
        &mut self,
        plan: ReadPlan,
        video_layer: u16,
        reuse: Option<Arc<Image>>,
        options: &IoOptions,
    ) -> Option<Deferred<VideoFrame>> {
        let path = self.comp.media_path(plan.clip, self.base_dir.as_deref());
        let entry = self
            .cache
            .acquire(plan.clip, path.as_deref(), options, self.context.io())?;
        let time = plan.time.rescaled_to(entry.info.video_rate()).floor();
        Some(entry.reader.read_video_frame(time, video_layer, reuse))
    }

    // POLL: complete every request whose reads are all resolved.
    fn poll(&mut self) {
        let (done, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.in_progress)
            .into_iter()
            .partition(InProgress::is_ready);
        self.in_progress = pending;
        for request in done {
            request.complete();
        }
    }

    fn drain(&mut self) {
        let queued = {
            let mut q = self.shared.queue.lock();
            q.stopped = true;
            std::mem::take(&mut q.requests)
        };
        let in_progress = std::mem::take(&mut self.in_progress);
        tracing::debug!(
            queued = queued.len(),
            in_progress = in_progress.len(),
            "completing outstanding requests"
        );
        for request in queued {
            request.promise.fulfill(Frame::empty(request.time));
        }
        for request in in_progress {
            request.complete();
        }
        self.cache.shutdown();
    }

    fn log_stats(&self) {
        let (requests, request_count) = {
            let q = self.shared.queue.lock();
            (q.requests.len(), q.request_count)
        };
        tracing::debug!(
            name = %self.comp.name,
            requests,
            in_progress = self.in_progress.len(),
            request_count,
            readers = self.cache.len(),
            stopping = self.cache.stopping_len(),
            "timeline stats"
        );
    }
}
