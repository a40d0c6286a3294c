//! PNG encoding for RGBA frames.

use std::io::Write;

use field_common::{FieldError, FieldResult};
use tiny_skia::Pixmap;

/// Encode straight-alpha RGBA pixels (4 bytes per pixel) as a PNG
/// (color type 6, no filtering).
pub fn create_png(pixels: &[u8], width: usize, height: usize) -> FieldResult<Vec<u8>> {
    if width == 0 || height == 0 || pixels.len() != width * height * 4 {
        return Err(FieldError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!(
                "expected {} bytes for a {}x{} RGBA image, got {}",
                width * height * 4,
                width,
                height,
                pixels.len()
            ),
        )));
    }

    let mut png = Vec::new();

    // PNG signature
    png.extend_from_slice(&[137, 80, 78, 71, 13, 10, 26, 10]);

    let mut ihdr_data = Vec::with_capacity(13);
    ihdr_data.extend_from_slice(&(width as u32).to_be_bytes());
    ihdr_data.extend_from_slice(&(height as u32).to_be_bytes());
    ihdr_data.push(8); // bit depth
    ihdr_data.push(6); // color type (RGBA)
    ihdr_data.push(0); // compression method
    ihdr_data.push(0); // filter method
    ihdr_data.push(0); // interlace method
    write_chunk(&mut png, b"IHDR", &ihdr_data);

    let idat_data = deflate_idat_rgba(pixels, width, height)?;
    write_chunk(&mut png, b"IDAT", &idat_data);

    write_chunk(&mut png, b"IEND", &[]);

    Ok(png)
}

/// Encode a tiny-skia pixmap, converting from premultiplied alpha.
pub fn pixmap_to_png(pixmap: &Pixmap) -> FieldResult<Vec<u8>> {
    create_png(
        &demultiplied_rgba(pixmap),
        pixmap.width() as usize,
        pixmap.height() as usize,
    )
}

/// Straight-alpha RGBA bytes of a pixmap.
pub fn demultiplied_rgba(pixmap: &Pixmap) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(pixmap.pixels().len() * 4);
    for pixel in pixmap.pixels() {
        let c = pixel.demultiply();
        rgba.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    rgba
}

/// Write a PNG chunk
fn write_chunk(png: &mut Vec<u8>, chunk_type: &[u8; 4], data: &[u8]) {
    png.extend_from_slice(&(data.len() as u32).to_be_bytes());
    png.extend_from_slice(chunk_type);
    png.extend_from_slice(data);

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(chunk_type);
    hasher.update(data);
    png.extend_from_slice(&hasher.finalize().to_be_bytes());
}

/// Deflate RGBA image data for IDAT chunk.
fn deflate_idat_rgba(pixels: &[u8], width: usize, height: usize) -> FieldResult<Vec<u8>> {
    let mut uncompressed = Vec::with_capacity(height * (1 + width * 4));
    for row in pixels.chunks_exact(width * 4).take(height) {
        uncompressed.push(0); // filter type: none
        uncompressed.extend_from_slice(row);
    }

    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::fast());
    encoder.write_all(&uncompressed)?;
    Ok(encoder.finish()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_and_ihdr() {
        let png = create_png(&[255, 0, 0, 255, 0, 255, 0, 128], 2, 1).unwrap();
        assert_eq!(&png[..8], &[137, 80, 78, 71, 13, 10, 26, 10]);
        assert_eq!(&png[12..16], b"IHDR");
        assert_eq!(u32::from_be_bytes([png[16], png[17], png[18], png[19]]), 2);
        assert_eq!(u32::from_be_bytes([png[20], png[21], png[22], png[23]]), 1);
        assert_eq!(&png[png.len() - 8..png.len() - 4], b"IEND");
    }

    #[test]
    fn test_length_mismatch() {
        assert!(create_png(&[0, 0, 0], 1, 1).is_err());
    }
}
