//! Importing image and audio assets into a staging tree

use std::fs;
use std::io::{self, Cursor};
use std::path::Path;

use image::ImageFormat;
use tracing::debug;

use crate::error::{Error, Result};

fn read_source(source: &Path) -> Result<Vec<u8>> {
    fs::read(source).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => Error::AssetNotFound(source.to_path_buf()),
        _ => Error::io(source, e),
    })
}

/// Convert image bytes to PNG
///
/// PNG input is returned unchanged. Other supported formats are decoded and
/// re-encoded.
pub fn to_png(data: &[u8], source: &Path) -> Result<Vec<u8>> {
    if matches!(image::guess_format(data), Ok(ImageFormat::Png)) {
        return Ok(data.to_vec());
    }

    let img = image::load_from_memory(data).map_err(|e| Error::Image {
        path: source.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut png = Vec::new();
    img.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| Error::Image {
            path: source.to_path_buf(),
            reason: e.to_string(),
        })?;
    Ok(png)
}

/// Copy an image into place as PNG
pub fn import_image(source: &Path, dest: &Path) -> Result<()> {
    let data = read_source(source)?;
    let png = to_png(&data, source)?;
    fs::write(dest, &png).map_err(|e| Error::write(dest, e))?;
    debug!("Imported image {} -> {}", source.display(), dest.display());
    Ok(())
}

/// Copy an audio clip into place
///
/// Audio is stored as given; no transcoding happens here.
pub fn import_sound(source: &Path, dest: &Path) -> Result<()> {
    let data = read_source(source)?;
    fs::write(dest, &data).map_err(|e| Error::write(dest, e))?;
    debug!("Imported sound {} -> {}", source.display(), dest.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    #[test]
    fn test_png_is_copied_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_pixel(2, 2, Rgb([255, 0, 0]));
        let src = dir.path().join("in.png");
        img.save_with_format(&src, ImageFormat::Png).unwrap();

        let dest = dir.path().join("out.png");
        import_image(&src, &dest).unwrap();
        assert_eq!(fs::read(&src).unwrap(), fs::read(&dest).unwrap());
    }

    #[test]
    fn test_jpeg_is_converted_to_png() {
        let dir = tempfile::tempdir().unwrap();
        let img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_pixel(4, 4, Rgb([0, 128, 255]));
        let src = dir.path().join("in.jpg");
        img.save_with_format(&src, ImageFormat::Jpeg).unwrap();

        let dest = dir.path().join("out.png");
        import_image(&src, &dest).unwrap();
        let out = fs::read(&dest).unwrap();
        assert_eq!(image::guess_format(&out).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn test_garbage_image_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("in.png");
        fs::write(&src, b"no image here").unwrap();
        let err = import_image(&src, &dir.path().join("out.png")).unwrap_err();
        assert!(matches!(err, Error::Image { .. }));
    }

    #[test]
    fn test_missing_source_is_asset_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = import_sound(&dir.path().join("nope.m4a"), &dir.path().join("x.m4a")).unwrap_err();
        assert!(matches!(err, Error::AssetNotFound(_)));
        assert!(err.is_non_fatal());
    }

    #[test]
    fn test_sound_bytes_are_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("in.m4a");
        fs::write(&src, [0x00, 0xFF, 0x81, 0x7F]).unwrap();
        let dest = dir.path().join("out.m4a");
        import_sound(&src, &dest).unwrap();
        assert_eq!(fs::read(&dest).unwrap(), vec![0x00, 0xFF, 0x81, 0x7F]);
    }
}
