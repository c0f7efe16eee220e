use std::time::{Duration, Instant};

use super::*;

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "reeltime_seq_{name}_{}",
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_frames(dir: &Path, numbers: &[i64]) {
    for &n in numbers {
        let shade = (n % 256) as u8;
        let img = image::RgbaImage::from_pixel(3, 2, image::Rgba([shade, 10, 20, 128]));
        img.save(dir.join(format!("shot.{n:04}.png"))).unwrap();
    }
}

fn wait_until(mut f: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if f() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    false
}

#[test]
fn parse_splits_frame_number() {
    let p = SequencePath::parse(Path::new("/show/sh010/shot.0012.png")).unwrap();
    assert_eq!(p.dir, PathBuf::from("/show/sh010"));
    assert_eq!(p.prefix, "shot.");
    assert_eq!(p.number, Some(12));
    assert_eq!(p.padding, 4);
    assert_eq!(p.suffix, ".png");
    assert_eq!(p.frame_path(7), PathBuf::from("/show/sh010/shot.0007.png"));

    let unpadded = SequencePath::parse(Path::new("take12.jpg")).unwrap();
    assert_eq!(unpadded.number, Some(12));
    assert_eq!(unpadded.padding, 0);
    assert_eq!(unpadded.frame_path(9), PathBuf::from("take9.jpg"));

    let still = SequencePath::parse(Path::new("poster.png")).unwrap();
    assert_eq!(still.number, None);
    assert_eq!(still.frame_path(3), PathBuf::from("poster.png"));
}

#[test]
fn reader_reports_scanned_range_and_decodes_premultiplied() {
    let dir = temp_dir("decode");
    write_frames(&dir, &[3, 4, 5, 6]);

    let mut options = IoOptions::new();
    options.insert(OPT_DEFAULT_SPEED.to_string(), "25".to_string());
    let reader = SequenceReader::open(&dir.join("shot.0004.png"), &options).unwrap();

    let info = reader.info().wait().unwrap();
    assert_eq!(info.video_time_range, TimeRange::from_frames(3.0, 4.0, 25.0));
    assert_eq!(info.video_type, VideoType::Sequence);
    assert_eq!(info.video[0].width, 3);
    assert_eq!(info.video[0].height, 2);

    let frame = reader
        .read_video_frame(RationalTime::new(5.0, 25.0), 0, None)
        .wait()
        .unwrap();
    let image = frame.image.unwrap();
    assert_eq!(image.info.pixel_type, PixelType::Rgba8Premul);
    assert_eq!(&image.data[..4], &[3, 5, 10, 128]);

    // Out-of-range requests hold the last frame.
    let held = reader
        .read_video_frame(RationalTime::new(90.0, 25.0), 0, None)
        .wait()
        .unwrap();
    assert_eq!(held.image.unwrap().data[0], 3);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn stop_drains_workers_and_resolves_late_reads_empty() {
    let dir = temp_dir("stop");
    write_frames(&dir, &[1, 2]);
    let reader = SequenceReader::open(&dir.join("shot.0001.png"), &IoOptions::new()).unwrap();

    reader.stop();
    assert!(wait_until(|| reader.has_stopped()));
    assert!(!reader.has_video_frames());

    let late = reader
        .read_video_frame(RationalTime::new(1.0, 24.0), 0, None)
        .wait()
        .unwrap();
    assert!(late.image.is_none());

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn missing_files_fail_to_open() {
    let dir = temp_dir("missing");
    assert!(SequenceReader::open(&dir.join("shot.0001.png"), &IoOptions::new()).is_err());
    let _ = std::fs::remove_dir_all(&dir);
}
