use crate::error::DetectorError;
use common::{span, span_debug};
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer, images::Image};
use image::{ImageFormat, RgbImage};
use ndarray::Array4;

/// Decode JPEG bytes into a 3-channel RGB image. Grayscale and CMYK inputs are
/// converted; anything that is not a JPEG fails.
pub fn decode_jpeg(bytes: &[u8]) -> Result<RgbImage, DetectorError> {
    let _s = span!("decode_jpeg");

    let decoded = image::load_from_memory_with_format(bytes, ImageFormat::Jpeg)?;

    tracing::debug!(
        width = decoded.width(),
        height = decoded.height(),
        color = ?decoded.color(),
        "Decoded image"
    );

    Ok(decoded.to_rgb8())
}

/// Convert an RGB image into a `[1, H, W, 3]` tensor with values in `[0, 1]`.
pub fn to_input_tensor(image: &RgbImage) -> Result<Array4<f32>, DetectorError> {
    let _s = span_debug!("to_input_tensor");

    let (width, height) = image.dimensions();
    let data: Vec<f32> = image.as_raw().iter().map(|&p| p as f32 / 255.0).collect();

    Array4::from_shape_vec((1, height as usize, width as usize, 3), data)
        .map_err(|e| DetectorError::Preprocess(e.into()))
}

pub struct PreProcessor {
    max_dimension: Option<u32>,
}

impl PreProcessor {
    /// `max_dimension` caps the longer image side; `None` feeds the image to the
    /// model at its native resolution.
    pub fn new(max_dimension: Option<u32>) -> Self {
        Self { max_dimension }
    }

    pub fn prepare(&self, image: RgbImage) -> Result<Array4<f32>, DetectorError> {
        let image = match self.target_size(image.width(), image.height()) {
            Some((width, height)) => {
                resize(image, width, height).map_err(DetectorError::Preprocess)?
            }
            None => image,
        };

        to_input_tensor(&image)
    }

    /// Size to downscale to, if the image exceeds the configured maximum.
    fn target_size(&self, width: u32, height: u32) -> Option<(u32, u32)> {
        let max = self.max_dimension?;
        let longest = width.max(height);
        if longest <= max {
            return None;
        }

        let scale = max as f32 / longest as f32;
        let new_width = ((width as f32 * scale).round() as u32).clamp(1, max);
        let new_height = ((height as f32 * scale).round() as u32).clamp(1, max);
        Some((new_width, new_height))
    }
}

impl Default for PreProcessor {
    fn default() -> Self {
        Self::new(None)
    }
}

fn resize(image: RgbImage, width: u32, height: u32) -> anyhow::Result<RgbImage> {
    let _s = span!("resize");

    tracing::debug!(
        from_width = image.width(),
        from_height = image.height(),
        width,
        height,
        "Downscaling input image"
    );

    let src = Image::from_vec_u8(
        image.width(),
        image.height(),
        image.into_raw(),
        PixelType::U8x3,
    )?;
    let mut dst = Image::new(width, height, PixelType::U8x3);

    Resizer::new().resize(
        &src,
        &mut dst,
        &ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear)),
    )?;

    RgbImage::from_raw(width, height, dst.into_vec())
        .ok_or_else(|| anyhow::anyhow!("resized buffer does not match {}x{}", width, height))
}
