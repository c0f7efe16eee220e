use super::*;
use crate::composition::{
    dsl::{CompositionBuilder, TrackBuilder, clip, external},
    model::{Effect, MediaReference},
};

fn f(v: f64) -> RationalTime {
    RationalTime::new(v, 24.0)
}

fn a() -> ClipId {
    ClipId { track: 0, item: 0 }
}

fn b() -> ClipId {
    ClipId { track: 0, item: 2 }
}

// A [0,50) -- dissolve(5,5) -- B [50,100), B trimmed from media frame 10.
fn dissolve_comp() -> Composition {
    CompositionBuilder::new("dissolve")
        .track(
            TrackBuilder::video("V1")
                .clip(clip("A", external("a.mem"), TimeRange::from_frames(0.0, 50.0, 24.0)))
                .dissolve(f(5.0), f(5.0))
                .clip(clip("B", external("b.mem"), TimeRange::from_frames(10.0, 50.0, 24.0)))
                .build()
                .unwrap(),
        )
        .build()
        .unwrap()
}

#[test]
fn single_clip_resolves_one_plain_layer() {
    let comp = CompositionBuilder::new("single")
        .track(
            TrackBuilder::video("V1")
                .clip(clip("A", external("a.mem"), TimeRange::from_frames(0.0, 100.0, 24.0)))
                .build()
                .unwrap(),
        )
        .build()
        .unwrap();
    let layers = Walker::resolve(&comp, f(50.0)).unwrap();
    assert_eq!(layers.len(), 1);
    assert_eq!(layers[0].transition, TransitionKind::None);
    assert_eq!(layers[0].image, Some(ReadPlan { clip: a(), time: f(50.0) }));
    assert_eq!(layers[0].image_b, None);

    assert!(Walker::resolve(&comp, f(100.0)).unwrap().is_empty());
    assert!(Walker::resolve(&comp, f(-1.0)).unwrap().is_empty());
}

#[test]
fn dissolve_window_maps_onto_unit_interval() {
    let comp = dissolve_comp();

    let start = Walker::resolve(&comp, f(44.0)).unwrap();
    assert_eq!(start.len(), 1);
    assert_eq!(start[0].transition, TransitionKind::Dissolve);
    assert_eq!(start[0].transition_value, 0.0);
    assert_eq!(start[0].image.unwrap().clip, a());
    assert_eq!(start[0].image_b.unwrap().clip, b());

    for frame in [49.0, 50.0] {
        let mid = Walker::resolve(&comp, f(frame)).unwrap();
        assert_eq!(mid[0].transition, TransitionKind::Dissolve);
        assert!((mid[0].transition_value - 0.5).abs() < 0.05);
        assert_eq!(mid[0].image.unwrap().clip, a());
        assert_eq!(mid[0].image_b.unwrap().clip, b());
    }

    let end = Walker::resolve(&comp, f(55.0)).unwrap();
    assert_eq!(end[0].transition_value, 1.0);
    assert_eq!(end[0].image.unwrap().clip, a());
    assert_eq!(end[0].image_b.unwrap().clip, b());

    let before = Walker::resolve(&comp, f(43.0)).unwrap();
    assert_eq!(before[0].transition, TransitionKind::None);
    assert_eq!(before[0].image_b, None);
    let after = Walker::resolve(&comp, f(56.0)).unwrap();
    assert_eq!(after[0].transition, TransitionKind::None);
    assert_eq!(after[0].image.unwrap().clip, b());
}

#[test]
fn incoming_clip_reads_relative_to_its_trim() {
    let comp = dissolve_comp();
    let layers = Walker::resolve(&comp, f(60.0)).unwrap();
    assert_eq!(layers[0].image.unwrap().time, f(20.0));
    // Before the cut the incoming clip is read ahead of its trimmed start.
    let layers = Walker::resolve(&comp, f(47.0)).unwrap();
    assert_eq!(layers[0].image_b.unwrap().time, f(7.0));
}

#[test]
fn transition_without_far_clip_is_inert() {
    let comp = CompositionBuilder::new("tail")
        .track(
            TrackBuilder::video("V1")
                .clip(clip("A", external("a.mem"), TimeRange::from_frames(0.0, 20.0, 24.0)))
                .dissolve(f(4.0), f(4.0))
                .build()
                .unwrap(),
        )
        .build()
        .unwrap();
    let layers = Walker::resolve(&comp, f(18.0)).unwrap();
    assert_eq!(layers[0].transition, TransitionKind::Dissolve);
    assert!(layers[0].image.is_some());
    assert!(layers[0].image_b.is_none());
}

#[test]
fn time_warp_scales_around_clip_start() {
    let comp = CompositionBuilder::new("warp")
        .track(
            TrackBuilder::video("V1")
                .clip(
                    clip("A", external("a.mem"), TimeRange::from_frames(100.0, 50.0, 24.0))
                        .with_effect(Effect::LinearTimeWarp { time_scalar: 2.0 }),
                )
                .clip(
                    clip("B", external("b.mem"), TimeRange::from_frames(30.0, 10.0, 24.0))
                        .with_effect(Effect::FreezeFrame),
                )
                .build()
                .unwrap(),
        )
        .build()
        .unwrap();
    let layers = Walker::resolve(&comp, f(10.0)).unwrap();
    assert_eq!(layers[0].image.unwrap().time, f(120.0));
    let frozen = Walker::resolve(&comp, f(55.0)).unwrap();
    assert_eq!(frozen[0].image.unwrap().time, f(30.0));
    assert_eq!(
        Walker::media_time(&comp, ClipId { track: 0, item: 1 }, f(58.0)).unwrap(),
        f(30.0)
    );
}

#[test]
fn gaps_missing_media_and_audio_tracks() {
    let comp = CompositionBuilder::new("mixed")
        .global_start_time(f(1000.0))
        .track(
            TrackBuilder::video("V1")
                .gap(f(10.0))
                .clip(clip("A", external("a.mem"), TimeRange::from_frames(0.0, 10.0, 24.0)))
                .build()
                .unwrap(),
        )
        .track(
            TrackBuilder::video("V2")
                .clip(clip("M", MediaReference::Missing, TimeRange::from_frames(0.0, 20.0, 24.0)))
                .build()
                .unwrap(),
        )
        .track(
            TrackBuilder::audio("A1")
                .clip(clip("S", external("s.wav"), TimeRange::from_frames(0.0, 20.0, 24.0)))
                .build()
                .unwrap(),
        )
        .build()
        .unwrap();

    let in_gap = Walker::resolve(&comp, f(1005.0)).unwrap();
    assert_eq!(in_gap.len(), 2);
    assert_eq!(in_gap[0].track, 0);
    assert!(in_gap[0].image.is_none());
    assert_eq!(in_gap[1].track, 1);
    assert!(in_gap[1].image.is_some());

    let on_clip = Walker::resolve(&comp, f(1012.0)).unwrap();
    assert_eq!(
        on_clip[0].image,
        Some(ReadPlan {
            clip: ClipId { track: 0, item: 1 },
            time: f(2.0)
        })
    );
    assert!(Walker::resolve(&comp, f(5.0)).unwrap().is_empty());
}

#[test]
fn effective_range_includes_transition_offsets() {
    let comp = dissolve_comp();
    assert_eq!(
        Walker::effective_range(&comp, a()),
        Some(TimeRange::from_frames(0.0, 55.0, 24.0))
    );
    assert_eq!(
        Walker::effective_range(&comp, b()),
        Some(TimeRange::from_frames(45.0, 55.0, 24.0))
    );
    assert_eq!(Walker::effective_range(&comp, ClipId { track: 0, item: 1 }), None);
}

#[test]
fn invalid_time_is_an_evaluation_error() {
    let comp = dissolve_comp();
    let mut out = Vec::new();
    assert!(matches!(
        Walker::resolve_into(&comp, RationalTime::invalid(), &mut out),
        Err(ReeltimeError::Evaluation(_))
    ));
    assert!(out.is_empty());
    assert_eq!(TransitionKind::from_type("Custom_Wipe"), TransitionKind::None);
}
