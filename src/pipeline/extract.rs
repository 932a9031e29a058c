//! Lossless extraction of a page's embedded image.
//!
//! JPEG streams (`DCTDecode`) are copied out byte for byte. Streams that hold
//! raw 8-bit gray or RGB samples (unfiltered or `FlateDecode`) are written as
//! PNG at their native size, which keeps every sample value. Other encodings
//! are reported as [`Unsupported`] and the caller rasterises the page instead.

use crate::pipeline::encode::{encode_png, PNG_EXTENSION};
use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::fmt;

/// An embedded image, ready to upload.
#[derive(Debug, Clone)]
pub struct ExtractedImage {
    /// Encoded image bytes.
    pub bytes: Vec<u8>,
    /// File extension matching `bytes` (`jpeg` or `png`).
    pub extension: String,
    /// The decoded image.
    pub image: DynamicImage,
}

/// Why an embedded image could not be extracted losslessly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unsupported(pub String);

impl fmt::Display for Unsupported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Extract the image XObject `image_id` from `doc`.
pub fn extract_embedded_image(
    doc: &Document,
    image_id: ObjectId,
) -> Result<ExtractedImage, Unsupported> {
    let stream = doc
        .get_object(image_id)
        .and_then(Object::as_stream)
        .map_err(|e| Unsupported(format!("object {image_id:?} is not an image stream: {e}")))?;

    let filters = stream_filters(&stream.dict);
    match filters.as_slice() {
        [only] if only == "DCTDecode" => {
            let image = image::load_from_memory_with_format(&stream.content, ImageFormat::Jpeg)
                .map_err(|e| Unsupported(format!("embedded JPEG does not decode: {e}")))?;
            Ok(ExtractedImage {
                bytes: stream.content.clone(),
                extension: "jpeg".to_string(),
                image,
            })
        }
        [] => samples_to_png(doc, stream, stream.content.clone()),
        [only] if only == "FlateDecode" => {
            let samples = stream
                .decompressed_content()
                .map_err(|e| Unsupported(format!("cannot inflate image stream: {e}")))?;
            samples_to_png(doc, stream, samples)
        }
        other => Err(Unsupported(format!("unsupported image filters {other:?}"))),
    }
}

fn samples_to_png(
    doc: &Document,
    stream: &Stream,
    samples: Vec<u8>,
) -> Result<ExtractedImage, Unsupported> {
    let dict = &stream.dict;
    if matches!(dict.get(b"ImageMask"), Ok(Object::Boolean(true))) {
        return Err(Unsupported("stencil masks carry no colour samples".into()));
    }

    let width = dimension(dict, b"Width")?;
    let height = dimension(dict, b"Height")?;
    let bits = dict
        .get(b"BitsPerComponent")
        .and_then(Object::as_i64)
        .unwrap_or(8);
    if bits != 8 {
        return Err(Unsupported(format!("{bits}-bit samples")));
    }

    let components = dict
        .get(b"ColorSpace")
        .ok()
        .and_then(|cs| color_components(doc, cs))
        .ok_or_else(|| Unsupported("unsupported colour space".into()))?;

    let expected = width as usize * height as usize * components as usize;
    if samples.len() < expected {
        return Err(Unsupported(format!(
            "{} sample bytes, expected {expected}",
            samples.len()
        )));
    }
    let mut samples = samples;
    samples.truncate(expected);

    let image = match components {
        1 => GrayImage::from_raw(width, height, samples).map(DynamicImage::ImageLuma8),
        _ => RgbImage::from_raw(width, height, samples).map(DynamicImage::ImageRgb8),
    }
    .ok_or_else(|| Unsupported("sample buffer does not match dimensions".into()))?;

    let bytes = encode_png(&image).map_err(|e| Unsupported(format!("PNG encoding failed: {e}")))?;
    Ok(ExtractedImage {
        bytes,
        extension: PNG_EXTENSION.to_string(),
        image,
    })
}

fn dimension(dict: &Dictionary, key: &[u8]) -> Result<u32, Unsupported> {
    dict.get(key)
        .and_then(Object::as_i64)
        .ok()
        .and_then(|v| u32::try_from(v).ok())
        .filter(|v| *v > 0)
        .ok_or_else(|| Unsupported(format!("missing {}", String::from_utf8_lossy(key))))
}

/// Filter names of a stream, in application order.
fn stream_filters(dict: &Dictionary) -> Vec<String> {
    match dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![String::from_utf8_lossy(name).into_owned()],
        Ok(Object::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Colour components of a gray or RGB colour space; None for anything else.
fn color_components(doc: &Document, color_space: &Object) -> Option<u8> {
    match color_space {
        Object::Name(name) => match name.as_slice() {
            b"DeviceGray" | b"CalGray" => Some(1),
            b"DeviceRGB" | b"CalRGB" => Some(3),
            _ => None,
        },
        Object::Reference(id) => color_components(doc, doc.get_object(*id).ok()?),
        Object::Array(items) => match items.as_slice() {
            [Object::Name(family), profile] if family.as_slice() == b"ICCBased" => {
                let profile = match profile {
                    Object::Reference(id) => doc.get_object(*id).ok()?,
                    other => other,
                };
                match profile.as_stream().ok()?.dict.get(b"N").and_then(Object::as_i64) {
                    Ok(1) => Some(1),
                    Ok(3) => Some(3),
                    _ => None,
                }
            }
            [Object::Name(family), ..] if family.as_slice() == b"CalRGB" => Some(3),
            [Object::Name(family), ..] if family.as_slice() == b"CalGray" => Some(1),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    fn tiny_jpeg() -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 3, image::Rgb([10, 200, 30])));
        let mut buf = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut buf), ImageFormat::Jpeg)
            .unwrap();
        buf
    }

    #[test]
    fn jpeg_bytes_are_copied_unchanged() {
        let jpeg = tiny_jpeg();
        let mut doc = Document::with_version("1.5");
        let id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 4,
                "Height" => 3,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            },
            jpeg.clone(),
        ));

        let out = extract_embedded_image(&doc, id).unwrap();
        assert_eq!(out.extension, "jpeg");
        assert_eq!(out.bytes, jpeg);
        assert_eq!((out.image.width(), out.image.height()), (4, 3));
    }

    #[test]
    fn raw_gray_samples_become_png() {
        let samples: Vec<u8> = (0..6).map(|v| v * 40).collect();
        let mut doc = Document::with_version("1.5");
        let id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 3,
                "Height" => 2,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            samples.clone(),
        ));

        let out = extract_embedded_image(&doc, id).unwrap();
        assert_eq!(out.extension, "png");
        let decoded = image::load_from_memory(&out.bytes).unwrap().to_luma8();
        assert_eq!(decoded.into_raw(), samples);
    }

    #[test]
    fn flate_rgb_samples_become_png() {
        let samples: Vec<u8> = [200u8, 20, 90].repeat(32 * 32);
        let mut stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 32,
                "Height" => 32,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
            },
            samples.clone(),
        );
        let _ = stream.compress();
        assert!(stream.dict.get(b"Filter").is_ok(), "stream should be deflated");
        let mut doc = Document::with_version("1.5");
        let id = doc.add_object(stream);

        let out = extract_embedded_image(&doc, id).unwrap();
        assert_eq!(out.extension, "png");
        let decoded = image::load_from_memory(&out.bytes).unwrap().to_rgb8();
        assert_eq!(decoded.into_raw(), samples);
    }

    #[test]
    fn jpeg2000_is_unsupported() {
        let mut doc = Document::with_version("1.5");
        let id = doc.add_object(Stream::new(
            dictionary! {
                "Subtype" => "Image",
                "Width" => 1,
                "Height" => 1,
                "Filter" => "JPXDecode",
            },
            vec![0u8; 8],
        ));
        let err = extract_embedded_image(&doc, id).unwrap_err();
        assert!(err.0.contains("JPXDecode"), "got: {err}");
    }

    #[test]
    fn one_bit_samples_are_unsupported() {
        let mut doc = Document::with_version("1.5");
        let id = doc.add_object(Stream::new(
            dictionary! {
                "Subtype" => "Image",
                "Width" => 8,
                "Height" => 1,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 1,
            },
            vec![0b1010_1010],
        ));
        assert!(extract_embedded_image(&doc, id).is_err());
    }
}
