//! Image XObjects for composited overlays

use crate::{PdfError, Result};
use flate2::{write::ZlibEncoder, Compression};
use image::RgbaImage;
use lopdf::{Dictionary, Object, Stream};
use std::io::Write;

impl From<image::ImageError> for PdfError {
    fn from(err: image::ImageError) -> Self {
        PdfError::ImageError(err.to_string())
    }
}

/// Image XObject data ready to be added to a document
#[derive(Debug, Clone)]
pub struct ImageXObject {
    pub width: u32,
    pub height: u32,
    pub color_space: String,
    pub bits_per_component: u8,
    pub filter: String,
    /// Compressed sample data
    pub data: Vec<u8>,
    /// Alpha channel as a DeviceGray soft mask
    pub soft_mask: Option<Box<ImageXObject>>,
}

impl ImageXObject {
    /// Create an XObject from an RGBA raster
    ///
    /// Colour samples become a DeviceRGB image and the alpha channel a
    /// DeviceGray soft mask, both FlateDecode compressed. Fully opaque
    /// rasters get no soft mask.
    pub fn from_rgba(image: &RgbaImage) -> Result<Self> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(PdfError::ImageError("image has no pixels".to_string()));
        }

        let pixel_count = (width as usize) * (height as usize);
        let mut rgb = Vec::with_capacity(pixel_count * 3);
        let mut alpha = Vec::with_capacity(pixel_count);
        for pixel in image.pixels() {
            rgb.extend_from_slice(&pixel.0[..3]);
            alpha.push(pixel[3]);
        }

        let soft_mask = if alpha.iter().all(|&a| a == 255) {
            None
        } else {
            Some(Box::new(Self {
                width,
                height,
                color_space: "DeviceGray".to_string(),
                bits_per_component: 8,
                filter: "FlateDecode".to_string(),
                data: deflate(&alpha)?,
                soft_mask: None,
            }))
        };

        Ok(Self {
            width,
            height,
            color_space: "DeviceRGB".to_string(),
            bits_per_component: 8,
            filter: "FlateDecode".to_string(),
            data: deflate(&rgb)?,
            soft_mask,
        })
    }

    /// Convert to lopdf Stream object
    ///
    /// The soft mask, if any, must be added to the document separately and
    /// its object id passed in as `smask`.
    pub fn to_pdf_stream(&self, smask: Option<lopdf::ObjectId>) -> Stream {
        let mut dict = Dictionary::new();

        dict.set("Type", Object::Name(b"XObject".to_vec()));
        dict.set("Subtype", Object::Name(b"Image".to_vec()));
        dict.set("Width", self.width as i64);
        dict.set("Height", self.height as i64);
        dict.set(
            "ColorSpace",
            Object::Name(self.color_space.as_bytes().to_vec()),
        );
        dict.set("BitsPerComponent", self.bits_per_component as i64);
        dict.set("Filter", Object::Name(self.filter.as_bytes().to_vec()));
        dict.set("Length", self.data.len() as i64);
        if let Some(id) = smask {
            dict.set("SMask", Object::Reference(id));
        }

        Stream::new(dict, self.data.clone())
    }
}

fn deflate(raw: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(raw)?;
    Ok(encoder.finish()?)
}

/// Generate operators to draw image at position
///
/// # Arguments
/// * `image_name` - Image resource name (e.g., "Im1")
/// * `x` - X coordinate in points
/// * `y` - Y coordinate in points (from bottom, PDF coordinates)
/// * `width` - Image width in points
/// * `height` - Image height in points
pub fn generate_image_operators(
    image_name: &str,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
) -> Vec<u8> {
    format!("q\n{width} 0 0 {height} {x} {y} cm\n/{image_name} Do\nQ\n").into_bytes()
}
