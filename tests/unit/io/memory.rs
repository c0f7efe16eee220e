use super::*;

fn open(plugin: &MemoryPlugin, name: &str) -> Arc<dyn MediaReader> {
    plugin.read(Path::new(name), &IoOptions::new()).unwrap()
}

#[test]
fn frames_are_stamped_with_their_number() {
    let plugin = MemoryPlugin::new().with_size(4, 2);
    let reader = open(&plugin, "a.mem");
    let info = reader.info().wait().unwrap();
    assert!(info.has_video());
    assert_eq!(info.video[0].width, 4);

    let frame = reader
        .read_video_frame(RationalTime::new(42.0, 24.0), 0, None)
        .wait()
        .unwrap();
    let image = frame.image.unwrap();
    assert_eq!(stamped_frame(&image), 42);
    assert_eq!(image.data[3], 255);
    assert_eq!(image.data.len(), 4 * 2 * 4);
}

#[test]
fn zero_sized_frames_render_without_a_stamp() {
    let plugin = MemoryPlugin::new().with_size(0, 3);
    let reader = open(&plugin, "flat.mem");
    let frame = reader
        .read_video_frame(RationalTime::new(7.0, 24.0), 0, None)
        .wait()
        .unwrap();
    let image = frame.image.unwrap();
    assert!(image.data.is_empty());
    assert_eq!(stamped_frame(&image), 0);
}

#[test]
fn manual_release_holds_reads_until_released() {
    let plugin = MemoryPlugin::new().manual_release(true);
    let reader = open(&plugin, "a.mem");
    let pending = reader.read_video_frame(RationalTime::new(1.0, 24.0), 0, None);
    assert!(!pending.is_ready());
    assert!(reader.has_video_frames());
    assert_eq!(plugin.pending_reads(), 1);

    assert_eq!(plugin.release_all(), 1);
    assert!(pending.wait().unwrap().image.is_some());
    assert!(!reader.has_video_frames());
}

#[test]
fn cancel_resolves_pending_reads_empty() {
    let plugin = MemoryPlugin::new().manual_release(true);
    let reader = open(&plugin, "a.mem");
    let pending = reader.read_video_frame(RationalTime::new(1.0, 24.0), 0, None);
    reader.cancel_video_frames();
    let frame = pending.wait().unwrap();
    assert!(frame.image.is_none());
}

#[test]
fn deferred_stop_waits_for_finish() {
    let plugin = MemoryPlugin::new().deferred_stop(true);
    let reader = open(&plugin, "a.mem");
    reader.stop();
    assert!(!reader.has_stopped());
    plugin.finish_stops();
    assert!(reader.has_stopped());

    let after = reader
        .read_video_frame(RationalTime::new(1.0, 24.0), 0, None)
        .wait()
        .unwrap();
    assert!(after.image.is_none());
}

#[test]
fn registry_tracks_live_readers() {
    let plugin = MemoryPlugin::new().fail_on("bad.mem").audio_only("music.mem");
    assert!(plugin.read(Path::new("bad.mem"), &IoOptions::new()).is_err());

    let a = open(&plugin, "a.mem");
    let music = open(&plugin, "music.mem");
    assert!(!music.info().wait().unwrap().has_video());
    assert_eq!(plugin.opened_count(), 2);
    assert_eq!(plugin.live_count(), 2);
    assert!(plugin.reader("a.mem").is_some());

    drop(a);
    drop(music);
    assert_eq!(plugin.live_count(), 0);
    assert_eq!(plugin.opened_count(), 2);
}
