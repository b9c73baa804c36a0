use std::io::Cursor;

use anyhow::Context;
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::storage::{is_safe_key, PhotoStorage};

pub const ALLOWED_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "webp"];
const JPEG_QUALITY: u8 = 85;

pub struct UploadItem {
    pub file_name: String,
    pub body: Bytes,
    pub student_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredPhoto {
    pub success: bool,
    pub photo_url: String,
    pub filename: String,
}

/// Lowercased extension of `file_name` when it is one we accept.
pub fn allowed_extension(file_name: &str) -> Option<String> {
    let (_, ext) = file_name.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// `student_<id>.<ext>` for a usable student id, otherwise a random
/// `temp_<hex>.<ext>`. Re-uploading for the same student overwrites.
pub fn stored_file_name(student_id: Option<&str>, ext: &str) -> String {
    let usable = student_id
        .map(str::trim)
        .filter(|id| !id.is_empty() && *id != "null" && *id != "undefined")
        .map(|id| format!("student_{id}.{ext}"))
        .filter(|name| is_safe_key(name));
    usable.unwrap_or_else(|| format!("temp_{}.{ext}", Uuid::new_v4().simple()))
}

/// Decodes any supported image and writes it back as RGB JPEG.
pub fn reencode_jpeg(bytes: &[u8]) -> anyhow::Result<Vec<u8>> {
    let img = image::load_from_memory(bytes).context("decode image")?;
    let rgb = image::DynamicImage::ImageRgb8(img.to_rgb8());
    let mut out = Cursor::new(Vec::new());
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY))
        .context("encode jpeg")?;
    Ok(out.into_inner())
}

/// Stores an upload under its derived name. Bytes that cannot be decoded are
/// kept as sent.
pub async fn store_upload(
    photos: &dyn PhotoStorage,
    item: UploadItem,
    ext: &str,
) -> anyhow::Result<StoredPhoto> {
    let key = stored_file_name(item.student_id.as_deref(), ext);

    let raw = item.body.clone();
    let body = match tokio::task::spawn_blocking(move || reencode_jpeg(&raw)).await {
        Ok(Ok(jpeg)) => Bytes::from(jpeg),
        Ok(Err(e)) => {
            warn!(file = %item.file_name, error = %e, "could not optimise image; storing original bytes");
            item.body
        }
        Err(e) => {
            warn!(file = %item.file_name, error = %e, "image worker failed; storing original bytes");
            item.body
        }
    };

    photos
        .put_object(&key, body)
        .await
        .with_context(|| format!("put_object {key}"))?;

    info!(%key, original = %item.file_name, "photo uploaded");
    Ok(StoredPhoto {
        success: true,
        photo_url: photos.public_url(&key),
        filename: key,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::fake::MemoryPhotos;
    use image::{ImageFormat, Rgba, RgbaImage};

    fn png_bytes() -> Vec<u8> {
        let img = RgbaImage::from_pixel(8, 8, Rgba([200, 10, 10, 128]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn extensions_are_checked_case_insensitively() {
        assert_eq!(allowed_extension("me.PNG").as_deref(), Some("png"));
        assert_eq!(allowed_extension("archive.tar.webp").as_deref(), Some("webp"));
        assert_eq!(allowed_extension("notes.txt"), None);
        assert_eq!(allowed_extension("no_extension"), None);
    }

    #[test]
    fn file_name_uses_student_id_when_usable() {
        assert_eq!(stored_file_name(Some("7"), "jpg"), "student_7.jpg");
        for unusable in [None, Some(""), Some("null"), Some("undefined"), Some("../7")] {
            let name = stored_file_name(unusable, "png");
            assert!(name.starts_with("temp_"), "{name}");
            assert!(name.ends_with(".png"));
            assert_eq!(name.len(), "temp_".len() + 32 + ".png".len());
        }
    }

    #[test]
    fn png_is_reencoded_as_jpeg() {
        let jpeg = reencode_jpeg(&png_bytes()).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn garbage_does_not_decode() {
        assert!(reencode_jpeg(b"definitely not an image").is_err());
    }

    #[tokio::test]
    async fn undecodable_upload_is_stored_verbatim() {
        let photos = MemoryPhotos::default();
        let stored = store_upload(
            &photos,
            UploadItem {
                file_name: "me.gif".into(),
                body: Bytes::from_static(b"GIF-ish"),
                student_id: Some("3".into()),
            },
            "gif",
        )
        .await
        .unwrap();

        assert_eq!(stored.filename, "student_3.gif");
        assert_eq!(stored.photo_url, "/images/uploads/student_3.gif");
        let objects = photos.objects.lock().unwrap();
        assert_eq!(objects["student_3.gif"], Bytes::from_static(b"GIF-ish"));
    }

    #[tokio::test]
    async fn decodable_upload_is_stored_as_jpeg() {
        let photos = MemoryPhotos::default();
        let stored = store_upload(
            &photos,
            UploadItem {
                file_name: "me.png".into(),
                body: Bytes::from(png_bytes()),
                student_id: None,
            },
            "png",
        )
        .await
        .unwrap();

        assert!(stored.filename.starts_with("temp_"));
        let objects = photos.objects.lock().unwrap();
        assert_eq!(&objects[&stored.filename][..2], &[0xFF, 0xD8]);
    }
}
