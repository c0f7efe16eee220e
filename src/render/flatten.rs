//! CPU flattening of a [`Frame`] into one premultiplied RGBA8 image.
//!
//! Layers are stacked in track order, first track at the bottom. A dissolve layer blends its
//! two images by `transition_value`; a missing side of the dissolve counts as transparent.

use std::borrow::Cow;

use rayon::prelude::*;

use crate::{
    eval::walker::TransitionKind,
    foundation::{
        error::{ReeltimeError, ReeltimeResult},
        math::{mul_div255, unpremultiply_rgba8_in_place},
    },
    io::reader::{Image, ImageInfo, PixelType},
    timeline::frame::{Frame, FrameLayer},
};

/// One premultiplied RGBA8 pixel.
pub type PremulRgba8 = [u8; 4];

/// Source-over of `src` onto `dst` at `opacity`.
pub fn over(dst: PremulRgba8, src: PremulRgba8, opacity: f32) -> PremulRgba8 {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 || src[3] == 0 {
        return dst;
    }

    let op = ((opacity * 255.0).round() as i32).clamp(0, 255) as u16;
    let sa = mul_div255(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }
    let inv = 255u16 - u16::from(sa);

    let mut out = [0u8; 4];
    out[3] = sa.saturating_add(mul_div255(u16::from(dst[3]), inv));
    for i in 0..3 {
        let sc = mul_div255(u16::from(src[i]), op);
        let dc = mul_div255(u16::from(dst[i]), inv);
        out[i] = sc.saturating_add(dc);
    }
    out
}

/// Linear blend from `a` (t = 0) to `b` (t = 1).
pub fn crossfade(a: PremulRgba8, b: PremulRgba8, t: f32) -> PremulRgba8 {
    let t = t.clamp(0.0, 1.0);
    let tt = ((t * 255.0).round() as i32).clamp(0, 255) as u16;
    let it = 255u16 - tt;

    let mut out = [0u8; 4];
    for i in 0..4 {
        let av = mul_div255(u16::from(a[i]), it);
        let bv = mul_div255(u16::from(b[i]), tt);
        out[i] = av.saturating_add(bv);
    }
    out
}

/// Composite every layer of `frame`. `None` when no layer has an image.
#[tracing::instrument(skip(frame), fields(time = %frame.time, layers = frame.layers.len()))]
pub fn flatten(frame: &Frame) -> ReeltimeResult<Option<Image>> {
    let Some(first) = frame
        .layers
        .iter()
        .flat_map(|l| [l.image.as_deref(), l.image_b.as_deref()])
        .flatten()
        .next()
    else {
        return Ok(None);
    };

    let info = ImageInfo {
        width: first.info.width,
        height: first.info.height,
        pixel_type: PixelType::Rgba8Premul,
    };
    let mut canvas = Image::new(info);
    let row_bytes = info.width as usize * 4;
    if row_bytes == 0 {
        return Ok(Some(canvas));
    }

    for layer in &frame.layers {
        composite_layer(&mut canvas, layer, row_bytes)?;
    }
    Ok(Some(canvas))
}

fn composite_layer(canvas: &mut Image, layer: &FrameLayer, row_bytes: usize) -> ReeltimeResult<()> {
    let a = layer
        .image
        .as_deref()
        .map(|i| rgba8_premul(i, &canvas.info))
        .transpose()?;
    let b = layer
        .image_b
        .as_deref()
        .map(|i| rgba8_premul(i, &canvas.info))
        .transpose()?;

    let (a, b, t) = match (layer.transition, a, b) {
        (TransitionKind::Dissolve, a, b) => (a, b, layer.transition_value),
        (TransitionKind::None, Some(a), _) => (Some(a), None, 0.0),
        (TransitionKind::None, None, _) => return Ok(()),
    };
    if a.is_none() && b.is_none() {
        return Ok(());
    }

    canvas
        .data
        .par_chunks_mut(row_bytes)
        .enumerate()
        .for_each(|(y, row)| {
            let span = y * row_bytes..(y + 1) * row_bytes;
            let a_row = a.as_deref().map(|a| &a[span.clone()]);
            let b_row = b.as_deref().map(|b| &b[span]);
            for (x, d) in row.chunks_exact_mut(4).enumerate() {
                let px = |src: Option<&[u8]>| {
                    src.map_or([0; 4], |s| {
                        [s[x * 4], s[x * 4 + 1], s[x * 4 + 2], s[x * 4 + 3]]
                    })
                };
                let blended = crossfade(px(a_row), px(b_row), t);
                let out = over([d[0], d[1], d[2], d[3]], blended, 1.0);
                d.copy_from_slice(&out);
            }
        });
    Ok(())
}

// Expand to premultiplied RGBA8 at the canvas size.
fn rgba8_premul<'a>(image: &'a Image, canvas: &ImageInfo) -> ReeltimeResult<Cow<'a, [u8]>> {
    if image.info.width != canvas.width || image.info.height != canvas.height {
        return Err(ReeltimeError::evaluation(format!(
            "layer image is {}x{}, frame is {}x{}",
            image.info.width, image.info.height, canvas.width, canvas.height
        )));
    }
    if image.data.len() != image.info.byte_count() {
        return Err(ReeltimeError::evaluation(format!(
            "layer image holds {} bytes, expected {}",
            image.data.len(),
            image.info.byte_count()
        )));
    }
    Ok(match image.info.pixel_type {
        PixelType::Rgba8Premul => Cow::Borrowed(&image.data),
        PixelType::Rgb8 => Cow::Owned(
            image
                .data
                .chunks_exact(3)
                .flat_map(|p| [p[0], p[1], p[2], 255])
                .collect(),
        ),
        PixelType::L8 => Cow::Owned(image.data.iter().flat_map(|&l| [l, l, l, 255]).collect()),
    })
}

/// Straight-alpha copy of a flattened image, ready for encoding.
pub fn to_rgba_image(image: &Image) -> ReeltimeResult<image::RgbaImage> {
    let mut data = rgba8_premul(image, &image.info)?.into_owned();
    unpremultiply_rgba8_in_place(&mut data);
    image::RgbaImage::from_raw(image.info.width, image.info.height, data)
        .ok_or_else(|| ReeltimeError::evaluation("image buffer does not match its size"))
}

#[cfg(test)]
#[path = "../../tests/unit/render/flatten.rs"]
mod tests;
