//! Pixel transforms backed by the `image` crate.

use std::io::Cursor;

use async_trait::async_trait;
use image::imageops::FilterType;
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageFormat, ImageReader};

use crate::error::PreprocessError;

use super::recipe::PreprocessFlag;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Upscale {
    /// Largest linear scale factor.
    pub max_factor: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransformOptions {
    pub auto_rotate: bool,
    pub contrast: Option<f32>,
    pub upscale: Option<Upscale>,
    pub denoise_sigma: Option<f32>,
    /// Output bound. Inputs beyond twice this are rejected.
    pub max_width: u32,
    pub max_height: u32,
}

#[derive(Debug, Clone)]
pub struct TransformOutput {
    /// PNG-encoded result.
    pub bytes: Vec<u8>,
    pub applied: Vec<PreprocessFlag>,
    pub width: u32,
    pub height: u32,
}

#[async_trait]
pub trait ImageTransformer: Send + Sync {
    async fn transform(
        &self,
        bytes: Vec<u8>,
        options: &TransformOptions,
    ) -> Result<TransformOutput, PreprocessError>;
}

/// CPU transformer; work runs on the blocking pool.
#[derive(Debug, Default, Clone)]
pub struct RasterTransformer;

impl RasterTransformer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ImageTransformer for RasterTransformer {
    async fn transform(
        &self,
        bytes: Vec<u8>,
        options: &TransformOptions,
    ) -> Result<TransformOutput, PreprocessError> {
        let options = options.clone();
        tokio::task::spawn_blocking(move || transform_blocking(&bytes, &options))
            .await
            .map_err(|e| PreprocessError::Task(e.to_string()))?
    }
}

fn decode_err(e: impl std::fmt::Display) -> PreprocessError {
    PreprocessError::Decode(e.to_string())
}

/// Reads only the header to get dimensions.
pub fn read_dimensions(bytes: &[u8]) -> Result<(u32, u32), PreprocessError> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(decode_err)?
        .into_dimensions()
        .map_err(decode_err)
}

fn upscaled_size(
    width: u32,
    height: u32,
    options: &TransformOptions,
    limit: Upscale,
) -> Option<(u32, u32)> {
    let factor = (limit.max_factor as f64)
        .min(options.max_width as f64 / width as f64)
        .min(options.max_height as f64 / height as f64);

    if factor <= 1.0 {
        return None;
    }

    let new_width = ((width as f64 * factor).floor() as u32).min(options.max_width);
    let new_height = ((height as f64 * factor).floor() as u32).min(options.max_height);
    (new_width > width || new_height > height).then_some((new_width, new_height))
}

fn transform_blocking(
    bytes: &[u8],
    options: &TransformOptions,
) -> Result<TransformOutput, PreprocessError> {
    let (width, height) = read_dimensions(bytes)?;
    if width > options.max_width.saturating_mul(2) || height > options.max_height.saturating_mul(2) {
        return Err(PreprocessError::TooLarge {
            width,
            height,
            max_width: options.max_width,
            max_height: options.max_height,
        });
    }

    let mut decoder = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(decode_err)?
        .into_decoder()
        .map_err(decode_err)?;
    let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);
    let mut image = DynamicImage::from_decoder(decoder).map_err(decode_err)?;

    let mut applied = Vec::new();

    if options.auto_rotate && orientation != Orientation::NoTransforms {
        image.apply_orientation(orientation);
        applied.push(PreprocessFlag::AutoRotate);
    }

    if let Some(contrast) = options.contrast {
        image = image.adjust_contrast(contrast);
        applied.push(PreprocessFlag::ContrastBoost);
    }

    if let Some(limit) = options.upscale {
        if let Some((w, h)) = upscaled_size(image.width(), image.height(), options, limit) {
            image = image.resize(w, h, FilterType::Lanczos3);
            applied.push(PreprocessFlag::Upscale);
        }
    }

    if let Some(sigma) = options.denoise_sigma {
        image = image.blur(sigma);
        applied.push(PreprocessFlag::Denoise);
    }

    let mut out = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .map_err(|e| PreprocessError::Encode(e.to_string()))?;

    Ok(TransformOutput {
        bytes: out,
        applied,
        width: image.width(),
        height: image.height(),
    })
}

#[cfg(test)]
pub(crate) fn sample_png(width: u32, height: u32) -> Vec<u8> {
    let image = image::RgbImage::from_fn(width, height, |x, y| {
        if (x + y) % 2 == 0 {
            image::Rgb([20, 20, 20])
        } else {
            image::Rgb([230, 230, 230])
        }
    });
    let mut out = Vec::new();
    DynamicImage::ImageRgb8(image)
        .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .unwrap();
    out
}
