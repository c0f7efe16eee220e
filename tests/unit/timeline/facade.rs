use std::time::Duration;

use super::*;
use crate::{io::memory::MemoryPlugin, io::system::IoSystem};

fn context(plugin: &MemoryPlugin) -> Context {
    let mut io = IoSystem::new();
    io.register(Arc::new(plugin.clone()));
    Context::new(io)
}

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "reeltime_facade_{name}_{}",
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn media_path_becomes_single_clip_composition() {
    let plugin = MemoryPlugin::new().with_duration(48.0, 24.0);
    let tl = Timeline::from_path("/media/shot.mem", context(&plugin)).unwrap();

    assert_eq!(tl.duration(), RationalTime::new(48.0, 24.0));
    assert_eq!(tl.global_start_time(), RationalTime::new(0.0, 24.0));
    assert_eq!(tl.path(), Some(Path::new("/media/shot.mem")));

    let comp = tl.composition();
    assert_eq!(comp.tracks.len(), 1);
    let (id, clip) = comp.clips().next().unwrap();
    assert_eq!(clip.source_range, TimeRange::from_frames(0.0, 48.0, 24.0));
    assert_eq!(
        comp.media_path(id, Some(Path::new("/media"))),
        Some(PathBuf::from("/media/shot.mem"))
    );
    // The probe reader was stopped right away.
    assert!(plugin.reader("shot.mem").is_none_or(|r| r.is_stopping()));
}

#[test]
fn media_path_without_video_is_rejected() {
    let plugin = MemoryPlugin::new().audio_only("sound.mem");
    let err = Timeline::from_path("sound.mem", context(&plugin)).unwrap_err();
    assert!(matches!(err, ReeltimeError::Io(_)));
}

#[test]
fn json_path_resolves_media_next_to_the_file() {
    let dir = temp_dir("json");
    let comp = CompositionBuilder::new("edit")
        .track(
            TrackBuilder::video("V1")
                .clip(clip("A", external("a.mem"), TimeRange::from_frames(0.0, 24.0, 24.0)))
                .build()
                .unwrap(),
        )
        .build()
        .unwrap();
    let file = dir.join("edit.json");
    std::fs::write(&file, comp.to_json_string_pretty().unwrap()).unwrap();

    let plugin = MemoryPlugin::new();
    let tl = Timeline::from_path(&file, context(&plugin)).unwrap();
    let frame = tl
        .get_frame(RationalTime::new(3.0, 24.0), 0, None)
        .wait()
        .unwrap();
    assert_eq!(frame.layers.len(), 1);
    assert!(frame.layers[0].image.is_some());
    assert!(plugin.opened_count() >= 1);
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn video_info_probes_first_clip_with_video() {
    let plugin = MemoryPlugin::new().with_size(16, 9).audio_only("a.mem");
    let comp = CompositionBuilder::new("probe")
        .track(
            TrackBuilder::video("V1")
                .clip(clip("A", external("a.mem"), TimeRange::from_frames(0.0, 10.0, 30.0)))
                .clip(clip("B", external("b.mem"), TimeRange::from_frames(0.0, 10.0, 30.0)))
                .build()
                .unwrap(),
        )
        .build()
        .unwrap();
    let tl = Timeline::new(comp, context(&plugin)).unwrap();

    let info = tl.video_info();
    assert_eq!(info.len(), 1);
    assert_eq!((info[0].width, info[0].height), (16, 9));

    // Both clips were probed once and the probe readers are gone.
    assert_eq!(plugin.opened_count(), 2);
    assert!(plugin.reader("b.mem").is_none());

    // Cached after the first call.
    assert_eq!(tl.video_info(), info);
    assert_eq!(plugin.opened_count(), 2);
}

#[test]
fn tunables_round_trip_and_clamp() {
    let plugin = MemoryPlugin::new();
    let comp = CompositionBuilder::new("empty").build().unwrap();
    let tl = Timeline::new(comp, context(&plugin)).unwrap();

    assert_eq!(tl.request_count(), 16);
    tl.set_request_count(0);
    assert_eq!(tl.request_count(), 1);
    tl.set_request_timeout(Duration::from_millis(20));
    assert_eq!(tl.request_timeout(), Duration::from_millis(20));

    let mut io = IoOptions::new();
    io.insert("k".to_string(), "v".to_string());
    tl.set_io_options(io.clone());
    assert_eq!(tl.io_options(), io);

    let ranges = vec![TimeRange::from_frames(0.0, 10.0, 24.0)];
    tl.set_active_ranges(ranges.clone());
    assert_eq!(tl.active_ranges(), ranges);
    assert!(tl.video_info().is_empty());
}

#[test]
fn stopped_timeline_answers_with_empty_frames() {
    let plugin = MemoryPlugin::new();
    let comp = CompositionBuilder::new("empty").build().unwrap();
    let mut tl = Timeline::new(comp, context(&plugin)).unwrap();
    tl.stop();
    tl.stop();
    assert!(tl.is_stopped());

    let t = RationalTime::new(7.0, 24.0);
    let future = tl.get_frame(t, 0, None);
    assert!(future.is_ready());
    let frame = future.wait().unwrap();
    assert_eq!(frame.time, t);
    assert!(frame.layers.is_empty());
}
