use eframe::egui::ColorImage;
use tracing::warn;

/// Downloads and decodes the thumbnail advertised by the info endpoint.
/// Blocking; run it off the UI thread.
pub fn fetch_thumbnail(url: &str) -> Option<ColorImage> {
    let bytes = match reqwest::blocking::get(url).and_then(|r| r.error_for_status()?.bytes()) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(%url, "thumbnail fetch failed: {e}");
            return None;
        }
    };
    decode(&bytes)
}

/// Decodes any format `image` understands into an egui image
pub fn decode(bytes: &[u8]) -> Option<ColorImage> {
    let img = match image::load_from_memory(bytes) {
        Ok(img) => img.to_rgba8(),
        Err(e) => {
            warn!("thumbnail decode failed: {e}");
            return None;
        }
    };
    let size = [img.width() as usize, img.height() as usize];
    Some(ColorImage::from_rgba_unmultiplied(size, &img))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn png_decodes_to_matching_size() {
        let mut png = Vec::new();
        image::RgbaImage::from_pixel(4, 3, image::Rgba([255, 0, 0, 255]))
            .write_to(&mut Cursor::new(&mut png), image::ImageOutputFormat::Png)
            .unwrap();
        let decoded = decode(&png).unwrap();
        assert_eq!(decoded.size, [4, 3]);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(decode(b"not an image").is_none());
    }
}
