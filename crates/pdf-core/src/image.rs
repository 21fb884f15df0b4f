//! Image XObjects
//!
//! JPEG data is embedded as is (DCTDecode). PNG and raw bitmaps are decoded
//! and stored Flate-compressed; their alpha plane becomes a soft mask.

use crate::{num, PdfError, Result};
use image::{ColorType, DynamicImage, ImageDecoder, ImageReader, RgbaImage};
use lopdf::{dictionary, Stream};
use std::io::{Cursor, Write};

impl From<image::ImageError> for PdfError {
    fn from(err: image::ImageError) -> Self {
        PdfError::ImageError(err.to_string())
    }
}

/// How an image fills its target box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFit {
    /// Fill the box exactly
    #[default]
    Stretch,
    /// Largest aspect-preserving size inside the box, centered
    Contain,
}

/// Drawn size of an image and its offset from the box's top-left corner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub dx: f64,
    pub dy: f64,
    pub width: f64,
    pub height: f64,
}

/// Place a `pixels` sized image in a `target` box (points)
pub fn place_in_box(pixels: (u32, u32), target: (f64, f64), fit: ImageFit) -> Placement {
    let (box_w, box_h) = target;
    let stretched = Placement {
        dx: 0.0,
        dy: 0.0,
        width: box_w,
        height: box_h,
    };
    if fit == ImageFit::Stretch || pixels.0 == 0 || pixels.1 == 0 {
        return stretched;
    }

    let scale = (box_w / pixels.0 as f64).min(box_h / pixels.1 as f64);
    let width = pixels.0 as f64 * scale;
    let height = pixels.1 as f64 * scale;
    Placement {
        dx: (box_w - width) / 2.0,
        dy: (box_h - height) / 2.0,
        width,
        height,
    }
}

/// Color space of the embedded samples
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    Gray,
    Rgb,
}

impl ColorSpace {
    fn pdf_name(self) -> &'static str {
        match self {
            ColorSpace::Gray => "DeviceGray",
            ColorSpace::Rgb => "DeviceRGB",
        }
    }
}

/// Stream filter of the embedded samples
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFilter {
    Dct,
    Flate,
}

impl ImageFilter {
    fn pdf_name(self) -> &'static str {
        match self {
            ImageFilter::Dct => "DCTDecode",
            ImageFilter::Flate => "FlateDecode",
        }
    }
}

/// Compress bytes with zlib for a FlateDecode stream
pub(crate) fn deflate(raw: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(raw)?;
    Ok(encoder.finish()?)
}

/// Image ready to be added to a document
#[derive(Debug, Clone)]
pub struct ImageXObject {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    pub color_space: ColorSpace,
    pub filter: ImageFilter,
    /// Encoded samples (8 bits per component)
    pub data: Vec<u8>,
    /// Flate-compressed 8-bit alpha plane
    pub alpha: Option<Vec<u8>>,
}

impl ImageXObject {
    /// Build from JPEG or PNG file bytes
    pub fn from_encoded(data: &[u8]) -> Result<Self> {
        let reader = ImageReader::new(Cursor::new(data)).with_guessed_format()?;
        match reader.format() {
            Some(image::ImageFormat::Jpeg) => Self::from_jpeg(data),
            Some(image::ImageFormat::Png) => Self::from_png(data),
            Some(other) => Err(PdfError::ImageError(format!(
                "Unsupported image format {other:?}"
            ))),
            None => Err(PdfError::ImageError("Unknown image format".to_string())),
        }
    }

    /// Pass JPEG bytes through; only the header is decoded
    pub fn from_jpeg(data: &[u8]) -> Result<Self> {
        let decoder =
            ImageReader::with_format(Cursor::new(data), image::ImageFormat::Jpeg).into_decoder()?;
        let (width, height) = decoder.dimensions();
        let color_space = match decoder.color_type() {
            ColorType::L8 | ColorType::L16 => ColorSpace::Gray,
            _ => ColorSpace::Rgb,
        };

        Ok(Self {
            width,
            height,
            color_space,
            filter: ImageFilter::Dct,
            data: data.to_vec(),
            alpha: None,
        })
    }

    /// Decode PNG bytes, keeping transparency as a soft mask
    pub fn from_png(data: &[u8]) -> Result<Self> {
        let decoder =
            ImageReader::with_format(Cursor::new(data), image::ImageFormat::Png).into_decoder()?;
        let color_type = decoder.color_type();
        let image = DynamicImage::from_decoder(decoder)?;

        match color_type {
            ColorType::L8 | ColorType::L16 => {
                let gray = image.to_luma8();
                Ok(Self {
                    width: gray.width(),
                    height: gray.height(),
                    color_space: ColorSpace::Gray,
                    filter: ImageFilter::Flate,
                    data: deflate(gray.as_raw())?,
                    alpha: None,
                })
            }
            ColorType::Rgb8 | ColorType::Rgb16 | ColorType::Rgb32F => {
                let rgb = image.to_rgb8();
                Ok(Self {
                    width: rgb.width(),
                    height: rgb.height(),
                    color_space: ColorSpace::Rgb,
                    filter: ImageFilter::Flate,
                    data: deflate(rgb.as_raw())?,
                    alpha: None,
                })
            }
            _ => Self::from_rgba(&image.to_rgba8()),
        }
    }

    /// Split an RGBA bitmap into color samples and an alpha plane
    ///
    /// A fully opaque bitmap gets no soft mask.
    pub fn from_rgba(image: &RgbaImage) -> Result<Self> {
        let (color, alpha): (Vec<[u8; 3]>, Vec<u8>) = image
            .pixels()
            .map(|p| ([p.0[0], p.0[1], p.0[2]], p.0[3]))
            .unzip();

        let alpha = if alpha.iter().all(|&a| a == u8::MAX) {
            None
        } else {
            Some(deflate(&alpha)?)
        };

        Ok(Self {
            width: image.width(),
            height: image.height(),
            color_space: ColorSpace::Rgb,
            filter: ImageFilter::Flate,
            data: deflate(&color.concat())?,
            alpha,
        })
    }

    /// Image stream; the caller links the soft mask from [`Self::smask_stream`]
    pub fn to_pdf_stream(&self) -> Stream {
        Stream::new(
            self.image_dict(self.color_space, self.filter),
            self.data.clone(),
        )
    }

    /// Soft mask stream for the alpha plane, if any
    pub fn smask_stream(&self) -> Option<Stream> {
        let alpha = self.alpha.as_ref()?;
        Some(Stream::new(
            self.image_dict(ColorSpace::Gray, ImageFilter::Flate),
            alpha.clone(),
        ))
    }

    fn image_dict(&self, color_space: ColorSpace, filter: ImageFilter) -> lopdf::Dictionary {
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => self.width as i64,
            "Height" => self.height as i64,
            "ColorSpace" => color_space.pdf_name(),
            "BitsPerComponent" => 8i64,
            "Filter" => filter.pdf_name(),
        }
    }
}

/// Operators painting image `image_name` into a box whose bottom-left corner
/// is (`x`, `y`) in PDF user space, optionally under an ExtGState
pub fn generate_image_operators(
    image_name: &str,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    gstate: Option<&str>,
) -> Vec<u8> {
    let gstate = gstate.map(|name| format!("/{name} gs\n")).unwrap_or_default();
    format!(
        "q\n{gstate}{} 0 0 {} {} {} cm\n/{image_name} Do\nQ\n",
        num(width),
        num(height),
        num(x),
        num(y)
    )
    .into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, ImageBuffer, Luma, Rgb, RgbImage, Rgba};
    use pretty_assertions::assert_eq;

    fn encode(image: DynamicImage, format: image::ImageFormat) -> Vec<u8> {
        let mut buf = Vec::new();
        image.write_to(&mut Cursor::new(&mut buf), format).unwrap();
        buf
    }

    #[test]
    fn test_jpeg_passed_through() {
        let img: RgbImage = ImageBuffer::from_pixel(20, 10, Rgb([224, 141, 60]));
        let jpeg = encode(DynamicImage::ImageRgb8(img), image::ImageFormat::Jpeg);

        let xobject = ImageXObject::from_encoded(&jpeg).unwrap();
        assert_eq!((xobject.width, xobject.height), (20, 10));
        assert_eq!(xobject.color_space, ColorSpace::Rgb);
        assert_eq!(xobject.filter, ImageFilter::Dct);
        assert_eq!(xobject.data, jpeg);
    }

    #[test]
    fn test_gray_jpeg() {
        let img: GrayImage = ImageBuffer::from_pixel(8, 8, Luma([128]));
        let jpeg = encode(DynamicImage::ImageLuma8(img), image::ImageFormat::Jpeg);

        let xobject = ImageXObject::from_encoded(&jpeg).unwrap();
        assert_eq!(xobject.color_space, ColorSpace::Gray);
    }

    #[test]
    fn test_unknown_bytes_rejected() {
        assert!(matches!(
            ImageXObject::from_encoded(&[0u8; 16]),
            Err(PdfError::ImageError(_))
        ));
        assert!(ImageXObject::from_encoded(b"\x89PNG\r\n\x1a\ntruncated").is_err());
    }

    #[test]
    fn test_png_with_alpha_gets_soft_mask() {
        let mut img: RgbaImage = ImageBuffer::new(4, 4);
        img.put_pixel(1, 1, Rgba([21, 76, 121, 255]));
        let xobject =
            ImageXObject::from_encoded(&encode(DynamicImage::ImageRgba8(img), image::ImageFormat::Png))
                .unwrap();

        assert_eq!(xobject.width, 4);
        assert_eq!(xobject.color_space, ColorSpace::Rgb);
        assert_eq!(xobject.filter, ImageFilter::Flate);

        let smask = xobject.smask_stream().unwrap();
        assert_eq!(
            smask.dict.get(b"ColorSpace").unwrap().as_name().unwrap(),
            b"DeviceGray"
        );
    }

    #[test]
    fn test_opaque_rgba_has_no_soft_mask() {
        let img: RgbaImage = ImageBuffer::from_pixel(3, 2, Rgba([255, 0, 0, 255]));
        let xobject = ImageXObject::from_rgba(&img).unwrap();

        assert!(xobject.alpha.is_none());
        assert!(xobject.smask_stream().is_none());
        assert_eq!(xobject.height, 2);
    }

    #[test]
    fn test_pdf_stream_dictionary() {
        let xobject = ImageXObject {
            width: 100,
            height: 50,
            color_space: ColorSpace::Rgb,
            filter: ImageFilter::Dct,
            data: vec![1, 2, 3, 4, 5],
            alpha: None,
        };

        let stream = xobject.to_pdf_stream();
        let dict = &stream.dict;
        assert_eq!(dict.get(b"Subtype").unwrap().as_name().unwrap(), b"Image");
        assert_eq!(dict.get(b"Width").unwrap().as_i64().unwrap(), 100);
        assert_eq!(dict.get(b"Height").unwrap().as_i64().unwrap(), 50);
        assert_eq!(dict.get(b"Filter").unwrap().as_name().unwrap(), b"DCTDecode");
        assert_eq!(stream.content, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_generate_image_operators() {
        let ops = generate_image_operators("XpIm1", 100.0, 200.0, 50.0, 75.0, None);
        assert_eq!(
            String::from_utf8(ops).unwrap(),
            "q\n50 0 0 75 100 200 cm\n/XpIm1 Do\nQ\n"
        );

        let ops = generate_image_operators("XpIm2", 0.0, 0.0, 10.0, 10.0, Some("XpGs1"));
        assert_eq!(
            String::from_utf8(ops).unwrap(),
            "q\n/XpGs1 gs\n10 0 0 10 0 0 cm\n/XpIm2 Do\nQ\n"
        );
    }

    #[test]
    fn test_contain_centers_in_box() {
        // 800x600 in a 100x200 box: width limits, scale 0.125
        let placed = place_in_box((800, 600), (100.0, 200.0), ImageFit::Contain);
        assert_eq!(
            placed,
            Placement {
                dx: 0.0,
                dy: 62.5,
                width: 100.0,
                height: 75.0
            }
        );

        let placed = place_in_box((600, 800), (200.0, 100.0), ImageFit::Contain);
        assert_eq!((placed.dx, placed.width, placed.height), (62.5, 75.0, 100.0));
    }

    #[test]
    fn test_stretch_and_empty_images_fill_box() {
        let stretched = place_in_box((800, 600), (30.0, 40.0), ImageFit::Stretch);
        assert_eq!((stretched.width, stretched.height), (30.0, 40.0));

        let empty = place_in_box((0, 0), (30.0, 40.0), ImageFit::Contain);
        assert_eq!((empty.dx, empty.dy, empty.width, empty.height), (0.0, 0.0, 30.0, 40.0));
    }
}
