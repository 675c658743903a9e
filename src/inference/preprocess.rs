//! Image Preprocessing
//!
//! Decodes raw image bytes and turns them into the NHWC float tensor the
//! classifier expects: `(1, height, width, 3)` with channels scaled to [0, 1].

use image::{imageops, imageops::FilterType, RgbImage};

use crate::utils::error::{FoodVisionError, Result};

/// Resampling filter used for every resize
pub const RESIZE_FILTER: FilterType = FilterType::CatmullRom;

/// Number of color channels fed to the model
pub const CHANNELS: usize = 3;

/// Spatial input size of a model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputSize {
    pub height: u32,
    pub width: u32,
}

impl InputSize {
    pub fn new(height: u32, width: u32) -> Self {
        Self { height, width }
    }

    pub fn square(size: u32) -> Self {
        Self::new(size, size)
    }

    /// Tensor shape for a single image of this size
    pub fn tensor_shape(&self) -> [usize; 4] {
        [1, self.height as usize, self.width as usize, CHANNELS]
    }
}

impl std::fmt::Display for InputSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.height, self.width)
    }
}

/// Batch-of-one image tensor in NHWC layout
#[derive(Debug, Clone, PartialEq)]
pub struct InputTensor {
    data: Vec<f32>,
    size: InputSize,
}

impl InputTensor {
    /// Wrap pre-laid-out NHWC data, checking the element count
    pub fn from_vec(data: Vec<f32>, size: InputSize) -> Result<Self> {
        let expected: usize = size.tensor_shape().iter().product();
        if data.len() != expected {
            return Err(FoodVisionError::InvalidInput(format!(
                "tensor data has {} elements, expected {} for {}",
                data.len(),
                expected,
                size
            )));
        }
        Ok(Self { data, size })
    }

    pub fn shape(&self) -> [usize; 4] {
        self.size.tensor_shape()
    }

    pub fn size(&self) -> InputSize {
        self.size
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }
}

/// Decode raw bytes into an RGB image
///
/// Alpha and grayscale inputs are converted to three-channel color.
pub fn decode(raw_image: &[u8]) -> Result<RgbImage> {
    if raw_image.is_empty() {
        return Err(FoodVisionError::Decode("image data is empty".to_string()));
    }
    let image = image::load_from_memory(raw_image)?;
    Ok(image.to_rgb8())
}

/// Stretch an image to exactly `size`, ignoring aspect ratio
fn resize(image: &RgbImage, size: InputSize) -> RgbImage {
    if image.dimensions() == (size.width, size.height) {
        return image.clone();
    }
    imageops::resize(image, size.width, size.height, RESIZE_FILTER)
}

/// Scale every channel to [0, 1], row-major HWC
fn normalize(image: &RgbImage) -> Vec<f32> {
    image
        .as_raw()
        .iter()
        .map(|&channel| channel as f32 / 255.0)
        .collect()
}

/// Decode, resize and normalize raw image bytes
pub fn prepare(raw_image: &[u8], size: InputSize) -> Result<InputTensor> {
    let rgb = decode(raw_image)?;
    let resized = resize(&rgb, size);
    InputTensor::from_vec(normalize(&resized), size)
}
