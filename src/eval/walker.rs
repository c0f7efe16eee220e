use crate::{
    composition::model::{Clip, ClipId, Composition, Item, SMPTE_DISSOLVE, Track, TrackKind},
    foundation::{
        error::{ReeltimeError, ReeltimeResult},
        time::{RationalTime, TimeRange},
    },
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
/// How the two images of a layer are blended.
pub enum TransitionKind {
    /// Only `image` is shown.
    #[default]
    None,
    /// Cross-dissolve from `image` to `image_b` by `transition_value`.
    Dissolve,
}

impl TransitionKind {
    /// Map a transition type string to a kind; unknown types are inert.
    pub fn from_type(transition_type: &str) -> Self {
        if transition_type == SMPTE_DISSOLVE {
            TransitionKind::Dissolve
        } else {
            TransitionKind::None
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
/// One video read: which clip, at which media time.
pub struct ReadPlan {
    /// Clip to read from.
    pub clip: ClipId,
    /// Media time after time warps, at the clip's source rate.
    pub time: RationalTime,
}

#[derive(Clone, Debug, PartialEq)]
/// Reads and blend parameters for one frame layer.
pub struct LayerPlan {
    /// Index of the video track the layer comes from.
    pub track: usize,
    /// Primary image; `None` over a gap or a missing far neighbor.
    pub image: Option<ReadPlan>,
    /// Second image of a transition.
    pub image_b: Option<ReadPlan>,
    /// Blend between `image` and `image_b`.
    pub transition: TransitionKind,
    /// Transition progress in `[0, 1]`.
    pub transition_value: f32,
}

impl LayerPlan {
    fn new(track: usize) -> Self {
        Self {
            track,
            image: None,
            image_b: None,
            transition: TransitionKind::None,
            transition_value: 0.0,
        }
    }
}

/// Stateless resolver from presentation time to per-layer reads.
pub struct Walker;

impl Walker {
    /// Layers active at presentation time `time`, one per video track item containing it.
    pub fn resolve(comp: &Composition, time: RationalTime) -> ReeltimeResult<Vec<LayerPlan>> {
        let mut out = Vec::new();
        Self::resolve_into(comp, time, &mut out)?;
        Ok(out)
    }

    /// Like [`Walker::resolve`], appending to `out`.
    ///
    /// On error `out` keeps the layers resolved before the failure.
    #[tracing::instrument(skip(comp, out))]
    pub fn resolve_into(
        comp: &Composition,
        time: RationalTime,
        out: &mut Vec<LayerPlan>,
    ) -> ReeltimeResult<()> {
        if !time.is_valid() {
            return Err(ReeltimeError::evaluation(format!("invalid time {time}")));
        }
        let t = time - comp.global_start_time();

        for (track_index, track) in comp.tracks.iter().enumerate() {
            if track.kind != TrackKind::Video {
                continue;
            }
            let ranges = track.child_ranges();
            for (index, range) in ranges.iter().enumerate() {
                let Some(range) = *range else {
                    continue;
                };
                if !range.contains(t) {
                    continue;
                }
                out.push(resolve_item(track_index, track, &ranges, index, range, t)?);
            }
        }
        Ok(())
    }

    /// Presentation range during which `clip` may be read, transitions included.
    pub fn effective_range(comp: &Composition, clip: ClipId) -> Option<TimeRange> {
        let track = comp.tracks.get(clip.track)?;
        let range = track.range_of_child(clip.item)?;
        let mut start = range.start_time;
        let mut end = range.end_time_exclusive();
        let (left, right) = track.neighbor_indices(clip.item);
        if let Some(tr) = track.transition_at(left) {
            start = start - tr.in_offset;
        }
        if let Some(tr) = track.transition_at(right) {
            end = end + tr.out_offset;
        }
        let global = comp.global_start_time();
        Some(TimeRange::range_from_start_end_time(
            global + start,
            global + end,
        ))
    }

    /// Media time read from `clip` at track time `t` (global start already removed).
    pub fn media_time(
        comp: &Composition,
        clip: ClipId,
        t: RationalTime,
    ) -> ReeltimeResult<RationalTime> {
        let track = comp
            .tracks
            .get(clip.track)
            .ok_or_else(|| ReeltimeError::evaluation(format!("no track for clip {clip}")))?;
        let ranges = track.child_ranges();
        warped_time(track, &ranges, clip.item, t)
    }
}

fn resolve_item(
    track_index: usize,
    track: &Track,
    ranges: &[Option<TimeRange>],
    index: usize,
    range: TimeRange,
    t: RationalTime,
) -> ReeltimeResult<LayerPlan> {
    let mut layer = LayerPlan::new(track_index);
    if matches!(track.children.get(index), Some(Item::Clip(_))) {
        layer.image = Some(read_plan(track_index, track, ranges, index, t)?);
    }

    let (left, right) = track.neighbor_indices(index);

    if let Some(tr) = track.transition_at(right) {
        let end = range.end_time_inclusive();
        let window_start = end - tr.in_offset;
        if t >= window_start {
            layer.transition = TransitionKind::from_type(&tr.transition_type);
            layer.transition_value = progress(t, window_start, tr.in_offset + tr.out_offset);
            let (_, far) = track.neighbor_indices(index + 1);
            if let Some(far) = far.filter(|&i| is_clip(track, i)) {
                layer.image_b = Some(read_plan(track_index, track, ranges, far, t)?);
            }
        }
    }

    if let Some(tr) = track.transition_at(left) {
        let start = range.start_time;
        if t <= start + tr.out_offset {
            std::mem::swap(&mut layer.image, &mut layer.image_b);
            layer.transition = TransitionKind::from_type(&tr.transition_type);
            let window_start = start - tr.in_offset - RationalTime::new(1.0, start.rate);
            layer.transition_value = progress(t, window_start, tr.in_offset + tr.out_offset);
            let far = left.and_then(|l| track.neighbor_indices(l).0);
            if let Some(far) = far.filter(|&i| is_clip(track, i)) {
                layer.image = Some(read_plan(track_index, track, ranges, far, t)?);
            }
        }
    }

    Ok(layer)
}

// Maps `[window_start, window_start + span + 1]` onto `[0, 1]`.
fn progress(t: RationalTime, window_start: RationalTime, span: RationalTime) -> f32 {
    let rate = window_start.rate;
    let denom = span.value_rescaled_to(rate) + 1.0;
    let v = (t.value_rescaled_to(rate) - window_start.value) / denom;
    v.clamp(0.0, 1.0) as f32
}

fn is_clip(track: &Track, index: usize) -> bool {
    matches!(track.children.get(index), Some(Item::Clip(_)))
}

fn read_plan(
    track_index: usize,
    track: &Track,
    ranges: &[Option<TimeRange>],
    index: usize,
    t: RationalTime,
) -> ReeltimeResult<ReadPlan> {
    Ok(ReadPlan {
        clip: ClipId {
            track: track_index,
            item: index,
        },
        time: warped_time(track, ranges, index, t)?,
    })
}

fn warped_time(
    track: &Track,
    ranges: &[Option<TimeRange>],
    index: usize,
    t: RationalTime,
) -> ReeltimeResult<RationalTime> {
    let clip: &Clip = match track.children.get(index) {
        Some(Item::Clip(clip)) => clip,
        _ => {
            return Err(ReeltimeError::evaluation(format!(
                "item {index} of track '{}' is not a clip",
                track.name
            )));
        }
    };
    let range = ranges.get(index).copied().flatten().ok_or_else(|| {
        ReeltimeError::evaluation(format!("clip {index} of track '{}' has no range", track.name))
    })?;

    let source_start = clip.source_range.start_time;
    let media = source_start + (t - range.start_time).rescaled_to(source_start.rate);

    let mut start = source_start;
    if let Some(tr) = track.transition_at(track.neighbor_indices(index).0) {
        start = start - tr.in_offset;
    }
    let scalar = clip.time_scalar()?;
    let offset = media - start;
    let warped = start + RationalTime::new(offset.value * scalar, offset.rate);
    if !warped.is_valid() {
        return Err(ReeltimeError::evaluation(format!(
            "time warp of clip {index} on track '{}' produced {warped}",
            track.name
        )));
    }
    Ok(warped.rescaled_to(source_start.rate))
}

#[cfg(test)]
#[path = "../../tests/unit/eval/walker.rs"]
mod tests;
