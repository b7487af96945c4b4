//! Image encoding: `DynamicImage` → page-fitted JPEG for embedding.
//!
//! Every image lands on its own A4 page, scaled by the largest factor that
//! keeps both sides on the page and anchored at the top-left corner. The
//! side that limits the scale takes the page dimension exactly; the other is
//! floored to whole points (never below 1).
//!
//! The bitmap is embedded as a `/DCTDecode` stream, so it is always
//! re-encoded as baseline RGB JPEG. Transparent pixels are composited onto
//! white first, and large images are downsampled to one pixel per point.
//! Smaller images are never upsampled; the viewer stretches them.

use crate::pipeline::layout::PageGeometry;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, RgbImage};
use tracing::debug;

/// Placement size of an image on the page, in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FittedSize {
    pub width: f32,
    pub height: f32,
    /// Points per source pixel.
    pub scale: f64,
}

/// A JPEG ready to be wrapped in an image XObject.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub jpeg: Vec<u8>,
    /// Pixel dimensions of the encoded bitmap.
    pub pixel_width: u32,
    pub pixel_height: u32,
    /// Size to draw at.
    pub placement: FittedSize,
}

/// Largest aspect-preserving size of a `w`×`h` image that fits on `page`.
pub fn fit_to_page(w: u32, h: u32, page: PageGeometry) -> FittedSize {
    let (pw, ph) = (f64::from(page.width), f64::from(page.height));
    let (w, h) = (f64::from(w.max(1)), f64::from(h.max(1)));
    let sx = pw / w;
    let sy = ph / h;
    // 1e-9 absorbs float noise such as 100 × 4.21 = 420.99999…
    let floor = |v: f64| (v + 1e-9).floor().max(1.0);
    if sx <= sy {
        FittedSize {
            width: page.width,
            height: floor(h * sx) as f32,
            scale: sx,
        }
    } else {
        FittedSize {
            width: floor(w * sy) as f32,
            height: page.height,
            scale: sy,
        }
    }
}

/// Scale-to-fit, flatten and JPEG-encode `img`.
pub fn encode_image(
    img: &DynamicImage,
    page: PageGeometry,
    quality: u8,
) -> Result<EncodedImage, image::ImageError> {
    let placement = fit_to_page(img.width(), img.height(), page);
    let mut rgb = flatten_onto_white(img);

    if placement.scale < 1.0 {
        let tw = (placement.width.round() as u32).max(1);
        let th = (placement.height.round() as u32).max(1);
        rgb = image::imageops::resize(&rgb, tw, th, FilterType::Triangle);
    }

    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, quality.clamp(1, 100)).encode_image(&rgb)?;
    debug!(
        "Encoded {}x{} image → {} bytes JPEG, drawn at {}x{}pt",
        rgb.width(),
        rgb.height(),
        jpeg.len(),
        placement.width,
        placement.height
    );

    Ok(EncodedImage {
        jpeg,
        pixel_width: rgb.width(),
        pixel_height: rgb.height(),
        placement,
    })
}

/// Drop the alpha channel by compositing onto a white background.
fn flatten_onto_white(img: &DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }
    let rgba = img.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let a = u32::from(a);
        let blend = |c: u8| ((u32::from(c) * a + 255 * (255 - a)) / 255) as u8;
        image::Rgb([blend(r), blend(g), blend(b)])
    })
}
