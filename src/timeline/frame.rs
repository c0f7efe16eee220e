use std::sync::Arc;

use crate::{
    eval::walker::TransitionKind,
    foundation::{deferred::Deferred, time::RationalTime},
    io::reader::Image,
};

/// Result handle returned by [`crate::Timeline::get_frame`].
pub type FrameFuture = Deferred<Frame>;

/// One video track's contribution to a frame.
#[derive(Clone, Debug, Default)]
pub struct FrameLayer {
    /// Primary image; `None` over a gap or a failed read.
    pub image: Option<Arc<Image>>,
    /// Second image of a transition.
    pub image_b: Option<Arc<Image>>,
    /// How `image` and `image_b` are blended.
    pub transition: TransitionKind,
    /// Transition progress in `[0, 1]`.
    pub transition_value: f32,
}

// Images compare by identity; a frame is a view over reader output, not a copy.
impl PartialEq for FrameLayer {
    fn eq(&self, other: &Self) -> bool {
        same_image(&self.image, &other.image)
            && same_image(&self.image_b, &other.image_b)
            && self.transition == other.transition
            && self.transition_value == other.transition_value
    }
}

fn same_image(a: &Option<Arc<Image>>, b: &Option<Arc<Image>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

/// Composited result for one presentation time: one layer per active video track.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Frame {
    /// Presentation time that was requested.
    pub time: RationalTime,
    /// One entry per video track active at `time`, bottom first.
    pub layers: Vec<FrameLayer>,
}

impl Frame {
    /// A frame without layers, stamped with `time`.
    pub fn empty(time: RationalTime) -> Self {
        Self {
            time,
            layers: Vec::new(),
        }
    }

    /// Rational time equality with `other`.
    pub fn is_time_equal(&self, other: &Frame) -> bool {
        self.time == other.time
    }

    /// `true` when no layer has an image.
    pub fn is_blank(&self) -> bool {
        self.layers
            .iter()
            .all(|l| l.image.is_none() && l.image_b.is_none())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/frame.rs"]
mod tests;
