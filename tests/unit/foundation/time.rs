use super::*;

#[test]
fn equality_is_rate_independent() {
    assert_eq!(RationalTime::new(12.0, 24.0), RationalTime::new(15.0, 30.0));
    assert_ne!(RationalTime::new(12.0, 24.0), RationalTime::new(13.0, 24.0));
    assert!(!RationalTime::new(12.0, 24.0).compare_exact(RationalTime::new(15.0, 30.0)));
    assert!(RationalTime::new(1.0, 24.0) < RationalTime::new(2.0, 30.0));
}

#[test]
fn arithmetic_uses_the_finer_rate() {
    let t = RationalTime::new(1.0, 24.0) + RationalTime::new(1.0, 48.0);
    assert_eq!(t.rate, 48.0);
    assert_eq!(t.value, 3.0);

    let d = RationalTime::new(10.0, 24.0) - RationalTime::new(5.0, 24.0);
    assert!(d.compare_exact(RationalTime::new(5.0, 24.0)));
    assert_eq!(
        RationalTime::new(5.0, 24.0) - RationalTime::new(10.0, 24.0),
        RationalTime::new(-5.0, 24.0)
    );
}

#[test]
fn invalid_sentinel_is_not_valid() {
    assert!(!RationalTime::invalid().is_valid());
    assert!(RationalTime::new(0.0, 24.0).is_valid());
    assert!(!RationalTime::new(f64::NAN, 24.0).is_valid());
}

#[test]
fn range_boundaries() {
    let r = TimeRange::from_frames(10.0, 5.0, 24.0);
    assert!(!r.contains(RationalTime::new(9.0, 24.0)));
    assert!(r.contains(RationalTime::new(10.0, 24.0)));
    assert!(r.contains(RationalTime::new(14.0, 24.0)));
    assert!(!r.contains(RationalTime::new(15.0, 24.0)));
    assert_eq!(r.end_time_exclusive(), RationalTime::new(15.0, 24.0));
    assert_eq!(r.end_time_inclusive(), RationalTime::new(14.0, 24.0));

    let single = TimeRange::from_frames(3.0, 1.0, 24.0);
    assert_eq!(single.end_time_inclusive(), RationalTime::new(3.0, 24.0));
}

#[test]
fn start_end_constructors_agree() {
    let a = TimeRange::range_from_start_end_time(
        RationalTime::new(10.0, 24.0),
        RationalTime::new(20.0, 24.0),
    );
    let b = TimeRange::range_from_start_end_time_inclusive(
        RationalTime::new(10.0, 24.0),
        RationalTime::new(19.0, 24.0),
    );
    assert_eq!(a, b);
    assert_eq!(a.duration, RationalTime::new(10.0, 24.0));
}

#[test]
fn intersects_is_half_open() {
    let a = TimeRange::from_frames(0.0, 10.0, 24.0);
    assert!(a.intersects(TimeRange::from_frames(9.0, 5.0, 24.0)));
    assert!(!a.intersects(TimeRange::from_frames(10.0, 5.0, 24.0)));
    assert!(a.intersects(TimeRange::from_frames(-5.0, 6.0, 24.0)));
    assert!(a.intersects(TimeRange::from_frames(2.0, 4.0, 48.0)));
}

#[test]
fn clamped_holds_first_and_last_frames() {
    let r = TimeRange::from_frames(10.0, 5.0, 24.0);
    assert_eq!(r.clamped(RationalTime::new(2.0, 24.0)), RationalTime::new(10.0, 24.0));
    assert_eq!(r.clamped(RationalTime::new(40.0, 24.0)), RationalTime::new(14.0, 24.0));
    assert_eq!(r.clamped(RationalTime::new(12.0, 24.0)), RationalTime::new(12.0, 24.0));
}

#[test]
fn to_ranges_groups_contiguous_frames() {
    let frames = [7.0, 1.0, 2.0, 3.0, 8.0, 12.0]
        .into_iter()
        .map(|v| RationalTime::new(v, 24.0))
        .collect();
    let ranges = to_ranges(frames);
    assert_eq!(
        ranges,
        vec![
            TimeRange::from_frames(1.0, 3.0, 24.0),
            TimeRange::from_frames(7.0, 2.0, 24.0),
            TimeRange::from_frames(12.0, 1.0, 24.0),
        ]
    );
    assert!(to_ranges(Vec::new()).is_empty());
}
