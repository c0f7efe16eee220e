use crate::{
    composition::model::{
        Clip, Composition, Gap, Item, MediaReference, SMPTE_DISSOLVE, Track, TrackKind,
        Transition,
    },
    foundation::{
        error::{ReeltimeError, ReeltimeResult},
        time::{RationalTime, TimeRange},
    },
};

/// Programmatic composition construction.
///
/// ```ignore
/// let comp = CompositionBuilder::new("cut")
///     .track(
///         TrackBuilder::video("V1")
///             .clip(clip("a", external("a.mem"), TimeRange::from_frames(0.0, 50.0, 24.0)))
///             .dissolve(RationalTime::new(5.0, 24.0), RationalTime::new(5.0, 24.0))
///             .clip(clip("b", external("b.mem"), TimeRange::from_frames(0.0, 50.0, 24.0)))
///             .build()?,
///     )
///     .build()?;
/// ```
pub struct CompositionBuilder {
    name: String,
    global_start_time: Option<RationalTime>,
    tracks: Vec<Track>,
}

impl CompositionBuilder {
    /// Start an empty composition.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            global_start_time: None,
            tracks: Vec::new(),
        }
    }

    /// Set the presentation time of the first frame.
    pub fn global_start_time(mut self, t: RationalTime) -> Self {
        self.global_start_time = Some(t);
        self
    }

    /// Append a track on top of the existing ones.
    pub fn track(mut self, track: Track) -> Self {
        self.tracks.push(track);
        self
    }

    /// Validate and produce the composition.
    pub fn build(self) -> ReeltimeResult<Composition> {
        let comp = Composition {
            name: self.name,
            global_start_time: self.global_start_time,
            tracks: self.tracks,
        };
        comp.validate()?;
        Ok(comp)
    }
}

/// Builds one [`Track`] item by item.
pub struct TrackBuilder {
    name: String,
    kind: TrackKind,
    children: Vec<Item>,
}

impl TrackBuilder {
    /// Start a track of `kind`.
    pub fn new(name: impl Into<String>, kind: TrackKind) -> Self {
        Self {
            name: name.into(),
            kind,
            children: Vec::new(),
        }
    }

    /// Start a video track.
    pub fn video(name: impl Into<String>) -> Self {
        Self::new(name, TrackKind::Video)
    }

    /// Start an audio track.
    pub fn audio(name: impl Into<String>) -> Self {
        Self::new(name, TrackKind::Audio)
    }

    /// Append a clip.
    pub fn clip(mut self, clip: Clip) -> Self {
        self.children.push(Item::Clip(clip));
        self
    }

    /// Append a gap of `duration`.
    pub fn gap(mut self, duration: RationalTime) -> Self {
        self.children.push(Item::Gap(Gap { duration }));
        self
    }

    /// Append a transition between the previous and the next item.
    pub fn transition(mut self, transition: Transition) -> Self {
        self.children.push(Item::Transition(transition));
        self
    }

    /// Append an SMPTE dissolve.
    pub fn dissolve(self, in_offset: RationalTime, out_offset: RationalTime) -> Self {
        self.transition(dissolve(in_offset, out_offset))
    }

    /// Produce the track; an empty name is rejected.
    pub fn build(self) -> ReeltimeResult<Track> {
        if self.name.trim().is_empty() {
            return Err(ReeltimeError::validation("track name must be non-empty"));
        }
        Ok(Track {
            name: self.name,
            kind: self.kind,
            children: self.children,
        })
    }
}

/// A clip without effects.
pub fn clip(
    name: impl Into<String>,
    media_reference: MediaReference,
    source_range: TimeRange,
) -> Clip {
    Clip {
        name: name.into(),
        media_reference,
        source_range,
        effects: Vec::new(),
    }
}

/// Reference to a single media file.
pub fn external(target_url: impl Into<String>) -> MediaReference {
    MediaReference::External {
        target_url: target_url.into(),
    }
}

/// An SMPTE dissolve transition.
pub fn dissolve(in_offset: RationalTime, out_offset: RationalTime) -> Transition {
    Transition {
        name: String::new(),
        transition_type: SMPTE_DISSOLVE.to_string(),
        in_offset,
        out_offset,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/composition/dsl.rs"]
mod tests;
