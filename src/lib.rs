//! reeltime is a timeline playback engine.
//!
//! It serves video frames out of an editorial composition (tracks of clips, gaps and
//! transitions) on demand. Frame requests are answered asynchronously by one scheduler thread
//! per [`Timeline`], which walks the composition, keeps a pool of decoder readers warm and
//! assembles per-track layers as the reads complete.
//!
//! # Pipeline overview
//!
//! 1. **Request**: [`Timeline::get_frame`] queues a request and returns a [`FrameFuture`]
//! 2. **Walk**: [`Walker`] maps the presentation time to clip reads and a transition blend
//! 3. **Read**: the [`ReaderCache`] opens readers through the [`IoSystem`] plugin registry
//! 4. **Assemble**: finished reads become a [`Frame`] with one [`FrameLayer`] per video track
//! 5. **Flatten** (optional): [`flatten`] blends the layers into one image on the CPU
//!
//! Design constraints:
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Non-blocking requests**: nothing on the request path waits on decoding.
//! - **Deferred teardown**: a reader is released only after it reports it has stopped.
//! - **Premultiplied RGBA8** for every image the built-in readers produce.
#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![allow(missing_docs_in_private_items)]

mod composition;
mod eval;
mod foundation;
mod io;
mod render;
mod timeline;

pub use composition::dsl::{CompositionBuilder, TrackBuilder, clip, dissolve, external};
pub use composition::model::{
    Clip, ClipId, Composition, Effect, Gap, ImageSequenceReference, Item, MediaReference,
    SMPTE_DISSOLVE, Track, TrackKind, Transition,
};
pub use eval::walker::{LayerPlan, ReadPlan, TransitionKind, Walker};
pub use foundation::deferred::{Deferred, Promise};
pub use foundation::error::{ReeltimeError, ReeltimeResult};
pub use foundation::time::{RationalTime, TimeRange, to_ranges};
pub use io::cache::{ReaderCache, ReaderEntry};
pub use io::memory::{MemoryPlugin, MemoryReader, stamped_frame};
pub use io::reader::{
    AudioBuffer, AudioInfo, Image, ImageInfo, Info, IoOptions, MediaReader, PixelType,
    ReadPlugin, VideoFrame, VideoType,
};
pub use io::sequence::{
    DEFAULT_SPEED, DEFAULT_THREAD_COUNT, OPT_DEFAULT_SPEED, OPT_THREAD_COUNT, SequencePath,
    SequencePlugin, SequenceReader,
};
pub use io::system::IoSystem;
pub use render::flatten::{PremulRgba8, crossfade, flatten, over, to_rgba_image};
pub use timeline::context::Context;
pub use timeline::facade::Timeline;
pub use timeline::frame::{Frame, FrameFuture, FrameLayer};
pub use timeline::options::{DEFAULT_REQUEST_COUNT, DEFAULT_REQUEST_TIMEOUT, TimelineOptions};
