use std::borrow::Cow;
use std::cmp::Ordering;

use image::Rgba;
use log::warn;

use crate::texture::{Image, SelectionResult, WeightedSample};

pub struct Composite<'a> {
    pub image: Cow<'a, Image>,
    // Blend candidates disagreed in size and only the best one was used.
    pub dimension_mismatch: bool,
}

// `None` when nothing was selected; the caller picks the fallback material.
pub fn composite(result: &SelectionResult) -> Option<Composite<'_>> {
    match result {
        SelectionResult::None => None,
        SelectionResult::Single(s) => Some(Composite {
            image: Cow::Borrowed(&s.sample.image),
            dimension_mismatch: false,
        }),
        SelectionResult::Blend(ws) => blend_weighted(ws),
    }
}

fn heaviest(ws: &[WeightedSample]) -> Option<&WeightedSample> {
    // First of equals wins, matching the best-first order of a blend.
    ws.iter().rev().max_by(|a, b| {
        a.weight.partial_cmp(&b.weight).unwrap_or(Ordering::Equal)
    })
}

pub fn blend_weighted(ws: &[WeightedSample]) -> Option<Composite<'_>> {
    let first = ws.first()?;
    let (width, height) = first.scored.sample.image.dimensions();

    if ws
        .iter()
        .any(|w| w.scored.sample.image.dimensions() != (width, height))
    {
        let best = heaviest(ws)?;
        warn!(
            "blend candidates differ in size, using sample {} alone",
            best.scored.index
        );
        return Some(Composite {
            image: Cow::Borrowed(&best.scored.sample.image),
            dimension_mismatch: true,
        });
    }

    // Lightest first, so the heaviest sample is painted last.
    let mut order: Vec<&WeightedSample> = ws.iter().rev().collect();
    order.sort_by(|a, b| {
        a.weight.partial_cmp(&b.weight).unwrap_or(Ordering::Equal)
    });

    let mut buffer = vec![[0.0f32; 4]; (width * height) as usize];
    for w in order {
        paint(&mut buffer, &w.scored.sample.image, w.weight as f32);
    }

    Some(Composite {
        image: Cow::Owned(unpremultiply(&buffer, width, height)),
        dimension_mismatch: false,
    })
}

// Source-over with a global alpha, onto a premultiplied buffer.
fn paint(buffer: &mut [[f32; 4]], image: &Image, alpha: f32) {
    let alpha = alpha.clamp(0.0, 1.0);
    for (dst, src) in buffer.iter_mut().zip(image.pixels()) {
        let sa = src[3] as f32 / 255.0 * alpha;
        for c in 0..3 {
            dst[c] = src[c] as f32 / 255.0 * sa + dst[c] * (1.0 - sa);
        }
        dst[3] = sa + dst[3] * (1.0 - sa);
    }
}

fn unpremultiply(buffer: &[[f32; 4]], width: u32, height: u32) -> Image {
    let to_u8 = |v: f32| (v * 255.0).clamp(0.0, 255.0).round() as u8;

    let mut image = Image::new(width, height);
    for (dst, src) in image.pixels_mut().zip(buffer) {
        let a = src[3];
        *dst = if a > 0.0 {
            Rgba([
                to_u8(src[0] / a),
                to_u8(src[1] / a),
                to_u8(src[2] / a),
                to_u8(a),
            ])
        } else {
            Rgba([0, 0, 0, 0])
        };
    }
    image
}
