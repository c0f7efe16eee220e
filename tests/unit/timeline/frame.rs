use super::*;
use crate::io::reader::ImageInfo;

fn image() -> Arc<Image> {
    Arc::new(Image::new(ImageInfo {
        width: 2,
        height: 2,
        ..ImageInfo::default()
    }))
}

#[test]
fn empty_frame_is_blank() {
    let t = RationalTime::new(12.0, 24.0);
    let frame = Frame::empty(t);
    assert_eq!(frame.time, t);
    assert!(frame.is_blank());

    let gap = Frame {
        time: t,
        layers: vec![FrameLayer::default()],
    };
    assert!(gap.is_blank());
}

#[test]
fn layers_compare_images_by_identity() {
    let a = image();
    let copy = Arc::new((*a).clone());
    let layer = |img: &Arc<Image>| FrameLayer {
        image: Some(Arc::clone(img)),
        ..FrameLayer::default()
    };
    assert_eq!(layer(&a), layer(&a));
    assert_ne!(layer(&a), layer(&copy));
    assert!(!Frame {
        time: RationalTime::new(0.0, 24.0),
        layers: vec![layer(&a)],
    }
    .is_blank());
}

#[test]
fn time_equality_ignores_rate_representation() {
    let a = Frame::empty(RationalTime::new(12.0, 24.0));
    let b = Frame::empty(RationalTime::new(0.5, 1.0));
    assert!(a.is_time_equal(&b));
    assert!(!a.is_time_equal(&Frame::empty(RationalTime::new(13.0, 24.0))));
}
