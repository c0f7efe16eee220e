use std::path::{Path, PathBuf};

use crate::foundation::{
    error::{ReeltimeError, ReeltimeResult},
    time::{RationalTime, TimeRange},
};

/// Transition type string that resolves to a dissolve.
pub const SMPTE_DISSOLVE: &str = "SMPTE_Dissolve";

#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
/// An editorial timeline: a root stack of tracks.
///
/// The composition is a read-only arena. Tracks live in a `Vec`, each track owns its items in
/// a `Vec`, and clips are addressed by [`ClipId`] (index identity, valid for this composition
/// only).
///
/// A composition can be:
/// - built programmatically (see [`crate::CompositionBuilder`])
/// - serialized/deserialized via Serde (JSON)
pub struct Composition {
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Presentation time of the first frame. `None` means zero at the composition rate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_start_time: Option<RationalTime>,
    /// Tracks of the root stack, bottom first.
    #[serde(default)]
    pub tracks: Vec<Track>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
/// Kind of media a track carries.
pub enum TrackKind {
    /// Picture track; resolved into frame layers.
    Video,
    /// Sound track; ignored by frame resolution.
    Audio,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
/// An ordered sequence of clips, transitions and gaps of one kind.
pub struct Track {
    /// Track name for authoring/debugging.
    #[serde(default)]
    pub name: String,
    /// Media kind.
    pub kind: TrackKind,
    /// Ordered children.
    #[serde(default)]
    pub children: Vec<Item>,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
/// A child of a [`Track`].
pub enum Item {
    /// Media clip; occupies its source duration.
    Clip(Clip),
    /// Overlap between the two neighboring items; occupies no time.
    Transition(Transition),
    /// Empty space; occupies its duration.
    Gap(Gap),
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
/// A leaf timeline node referencing one media source and a trimmed range of it.
pub struct Clip {
    /// Clip name for authoring/debugging.
    #[serde(default)]
    pub name: String,
    /// Where the media lives.
    pub media_reference: MediaReference,
    /// Trimmed range, in media time.
    pub source_range: TimeRange,
    /// Effects attached to the clip, in application order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<Effect>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
/// Reference from a clip to its media.
pub enum MediaReference {
    /// A single file (movie, still, audio...).
    External {
        /// Path or `file://` URL; relative paths resolve against the composition directory.
        target_url: String,
    },
    /// Numbered image files.
    ImageSequence(ImageSequenceReference),
    /// No media; the clip resolves to a layer without an image.
    Missing,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
/// Numbered image files `target_url_base + name_prefix + NNNN + name_suffix`.
pub struct ImageSequenceReference {
    /// Directory (or URL prefix) holding the frames.
    pub target_url_base: String,
    /// File name part before the frame number.
    #[serde(default)]
    pub name_prefix: String,
    /// File name part after the frame number, extension included.
    #[serde(default)]
    pub name_suffix: String,
    /// Number of the first frame on disk.
    #[serde(default)]
    pub start_frame: i64,
    /// Increment between frame numbers.
    #[serde(default = "default_frame_step")]
    pub frame_step: i64,
    /// Frames per second of the sequence.
    pub rate: f64,
    /// Minimum digit count of the frame number.
    #[serde(default)]
    pub frame_zero_padding: usize,
}

fn default_frame_step() -> i64 {
    1
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
/// An effect attached to a clip.
pub enum Effect {
    /// Scales playback speed around the clip start.
    LinearTimeWarp {
        /// Speed multiplier; 1 plays normally, 2 twice as fast.
        time_scalar: f64,
    },
    /// Holds the first frame of the clip.
    FreezeFrame,
    /// Any other effect; carried but ignored by frame resolution.
    Named {
        /// Effect name.
        name: String,
    },
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
/// Transition between the items on either side of it.
pub struct Transition {
    /// Transition name for authoring/debugging.
    #[serde(default)]
    pub name: String,
    /// Transition type, e.g. [`SMPTE_DISSOLVE`].
    pub transition_type: String,
    /// Overlap into the outgoing item.
    pub in_offset: RationalTime,
    /// Overlap into the incoming item.
    pub out_offset: RationalTime,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
/// Empty space on a track.
pub struct Gap {
    /// Length of the gap.
    pub duration: RationalTime,
}

/// Index identity of a clip inside one [`Composition`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClipId {
    /// Track index in [`Composition::tracks`].
    pub track: usize,
    /// Item index in [`Track::children`].
    pub item: usize,
}

impl std::fmt::Display for ClipId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.track, self.item)
    }
}

impl Composition {
    /// Parse and validate a composition from JSON.
    pub fn from_json_str(s: &str) -> ReeltimeResult<Self> {
        let comp: Self = serde_json::from_str(s)?;
        comp.validate()?;
        Ok(comp)
    }

    /// Read, parse and validate a JSON composition file.
    pub fn from_json_file(path: impl AsRef<Path>) -> ReeltimeResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ReeltimeError::io(format!("read '{}': {e}", path.display())))?;
        Self::from_json_str(&text)
    }

    /// Serialize to indented JSON.
    pub fn to_json_string_pretty(&self) -> ReeltimeResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validate time values and item ordering.
    pub fn validate(&self) -> ReeltimeResult<()> {
        if let Some(start) = self.global_start_time
            && !start.is_valid()
        {
            return Err(ReeltimeError::validation(
                "global_start_time must have a finite value and rate > 0",
            ));
        }

        for (ti, track) in self.tracks.iter().enumerate() {
            let mut prev_was_transition = false;
            for (ii, item) in track.children.iter().enumerate() {
                let at = || format!("track {ti} item {ii}");
                match item {
                    Item::Clip(clip) => {
                        validate_range(clip.source_range, &at())?;
                        clip.time_scalar().map_err(|e| {
                            ReeltimeError::validation(format!("{}: {e}", at()))
                        })?;
                        if let MediaReference::ImageSequence(seq) = &clip.media_reference {
                            if !seq.rate.is_finite() || seq.rate <= 0.0 {
                                return Err(ReeltimeError::validation(format!(
                                    "{}: image sequence rate must be finite and > 0",
                                    at()
                                )));
                            }
                            if seq.frame_step <= 0 {
                                return Err(ReeltimeError::validation(format!(
                                    "{}: image sequence frame_step must be > 0",
                                    at()
                                )));
                            }
                        }
                    }
                    Item::Gap(gap) => {
                        if !gap.duration.is_valid() || gap.duration.value < 0.0 {
                            return Err(ReeltimeError::validation(format!(
                                "{}: gap duration must be valid and >= 0",
                                at()
                            )));
                        }
                    }
                    Item::Transition(tr) => {
                        if prev_was_transition {
                            return Err(ReeltimeError::validation(format!(
                                "{}: adjacent transitions are not supported",
                                at()
                            )));
                        }
                        for (name, offset) in [("in_offset", tr.in_offset), ("out_offset", tr.out_offset)]
                        {
                            if !offset.is_valid() || offset.value < 0.0 {
                                return Err(ReeltimeError::validation(format!(
                                    "{}: transition {name} must be valid and >= 0",
                                    at()
                                )));
                            }
                        }
                    }
                }
                prev_was_transition = matches!(item, Item::Transition(_));
            }
        }
        Ok(())
    }

    /// Length of the longest track; `0@1` for an empty composition.
    pub fn duration(&self) -> RationalTime {
        self.tracks
            .iter()
            .map(Track::duration)
            .fold(None, |acc: Option<RationalTime>, d| match acc {
                Some(a) if a >= d => Some(a),
                _ => Some(d),
            })
            .unwrap_or_default()
    }

    /// Presentation time of the first frame.
    pub fn global_start_time(&self) -> RationalTime {
        self.global_start_time
            .unwrap_or_else(|| RationalTime::new(0.0, self.duration().rate))
    }

    /// `[global_start_time, global_start_time + duration)`.
    pub fn time_range(&self) -> TimeRange {
        TimeRange::new(self.global_start_time(), self.duration())
    }

    /// Clip addressed by `id`, if `id` points at a clip.
    pub fn clip(&self, id: ClipId) -> Option<&Clip> {
        match self.tracks.get(id.track)?.children.get(id.item)? {
            Item::Clip(clip) => Some(clip),
            _ => None,
        }
    }

    /// Every clip of every track, with its id.
    pub fn clips(&self) -> impl Iterator<Item = (ClipId, &Clip)> + '_ {
        self.tracks.iter().enumerate().flat_map(|(track, t)| {
            t.children
                .iter()
                .enumerate()
                .filter_map(move |(item, child)| match child {
                    Item::Clip(clip) => Some((ClipId { track, item }, clip)),
                    _ => None,
                })
        })
    }

    /// Filesystem path of the clip's media, resolved against `base_dir`.
    ///
    /// `None` for a missing reference or an id that is not a clip.
    pub fn media_path(&self, id: ClipId, base_dir: Option<&Path>) -> Option<PathBuf> {
        let url = match &self.clip(id)?.media_reference {
            MediaReference::External { target_url } => target_url.clone(),
            MediaReference::ImageSequence(seq) => seq.target_url_for_frame(seq.start_frame),
            MediaReference::Missing => return None,
        };
        Some(resolve_url(&url, base_dir))
    }
}

fn validate_range(range: TimeRange, at: &str) -> ReeltimeResult<()> {
    if !range.start_time.is_valid() || !range.duration.is_valid() {
        return Err(ReeltimeError::validation(format!(
            "{at}: source_range must have finite values and rates > 0"
        )));
    }
    if range.duration.value < 0.0 {
        return Err(ReeltimeError::validation(format!(
            "{at}: source_range duration must be >= 0"
        )));
    }
    Ok(())
}

fn resolve_url(url: &str, base_dir: Option<&Path>) -> PathBuf {
    let stripped = url.strip_prefix("file://").unwrap_or(url);
    let path = PathBuf::from(stripped);
    match base_dir {
        Some(base) if path.is_relative() => base.join(path),
        _ => path,
    }
}

impl Track {
    /// Sum of the durations of clips and gaps; transitions occupy no time.
    pub fn duration(&self) -> RationalTime {
        self.children
            .iter()
            .filter_map(Item::duration)
            .reduce(|a, b| a + b)
            .unwrap_or_default()
    }

    /// Range in parent of every child, `None` for transitions.
    pub fn child_ranges(&self) -> Vec<Option<TimeRange>> {
        let rate = self
            .children
            .iter()
            .find_map(Item::duration)
            .map_or(1.0, |d| d.rate);
        let mut cursor = RationalTime::new(0.0, rate);
        self.children
            .iter()
            .map(|child| {
                child.duration().map(|d| {
                    let range = TimeRange::new(cursor, d);
                    cursor = cursor + d;
                    range
                })
            })
            .collect()
    }

    /// Range in parent of the child at `index`.
    pub fn range_of_child(&self, index: usize) -> Option<TimeRange> {
        self.child_ranges().get(index).copied().flatten()
    }

    /// Indices of the items immediately before and after `index`.
    pub fn neighbor_indices(&self, index: usize) -> (Option<usize>, Option<usize>) {
        let left = index.checked_sub(1);
        let right = (index + 1 < self.children.len()).then_some(index + 1);
        (left, right)
    }

    /// The child at `index` when it is a transition.
    pub fn transition_at(&self, index: Option<usize>) -> Option<&Transition> {
        match self.children.get(index?)? {
            Item::Transition(tr) => Some(tr),
            _ => None,
        }
    }
}

impl Item {
    /// Time the item occupies in its track; `None` for transitions.
    pub fn duration(&self) -> Option<RationalTime> {
        match self {
            Item::Clip(clip) => Some(clip.source_range.duration),
            Item::Gap(gap) => Some(gap.duration),
            Item::Transition(_) => None,
        }
    }
}

impl Clip {
    /// Composed speed multiplier of the clip's time effects.
    ///
    /// Linear warps multiply; a freeze frame forces 0.
    pub fn time_scalar(&self) -> ReeltimeResult<f64> {
        let mut scalar = 1.0;
        for effect in &self.effects {
            match effect {
                Effect::LinearTimeWarp { time_scalar } => {
                    if !time_scalar.is_finite() {
                        return Err(ReeltimeError::evaluation(format!(
                            "time warp scalar {time_scalar} is not finite"
                        )));
                    }
                    scalar *= time_scalar;
                }
                Effect::FreezeFrame => scalar = 0.0,
                Effect::Named { .. } => {}
            }
        }
        Ok(scalar)
    }

    /// Append an effect.
    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

impl ImageSequenceReference {
    /// URL of the file holding frame number `frame`.
    pub fn target_url_for_frame(&self, frame: i64) -> String {
        let mut out = self.target_url_base.clone();
        if !out.is_empty() && !out.ends_with('/') {
            out.push('/');
        }
        let digits = frame.unsigned_abs().to_string();
        let sign = if frame < 0 { "-" } else { "" };
        let pad = self.frame_zero_padding.saturating_sub(digits.len());
        out.push_str(&self.name_prefix);
        out.push_str(sign);
        out.extend(std::iter::repeat_n('0', pad));
        out.push_str(&digits);
        out.push_str(&self.name_suffix);
        out
    }
}

#[cfg(test)]
#[path = "../../tests/unit/composition/model.rs"]
mod tests;
