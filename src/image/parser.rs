//! Manifest extraction from ACI archives

use crate::error::{PusherError, Result};
use crate::image::manifest::ImageManifest;
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use tar::Archive;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const MANIFEST_ENTRY: &str = "manifest";

/// Reads the image manifest out of an image file.
///
/// Implementations may move the file cursor; callers rewind afterwards.
pub trait ImageReader: Send + Sync {
    fn extract_manifest(&self, image: &mut File) -> Result<ImageManifest>;
}

/// Reader for plain and gzip-compressed tar ACIs.
#[derive(Debug, Default, Clone)]
pub struct AciReader;

impl AciReader {
    pub fn new() -> Self {
        Self
    }

    fn manifest_from_archive<R: Read>(archive: &mut Archive<R>) -> Result<ImageManifest> {
        let entries = archive.entries().map_err(extract_error)?;
        for entry in entries {
            let mut entry = entry.map_err(extract_error)?;
            let path = entry.path().map_err(extract_error)?;
            if path.as_os_str() != MANIFEST_ENTRY && path.as_os_str() != "./manifest" {
                continue;
            }

            let mut raw = Vec::new();
            entry.read_to_end(&mut raw).map_err(extract_error)?;
            return serde_json::from_slice(&raw)
                .map_err(|e| PusherError::ManifestExtract(format!("invalid manifest JSON: {}", e)));
        }

        Err(PusherError::ManifestExtract(
            "image contains no manifest".to_string(),
        ))
    }
}

impl ImageReader for AciReader {
    fn extract_manifest(&self, image: &mut File) -> Result<ImageManifest> {
        image.seek(SeekFrom::Start(0)).map_err(extract_error)?;
        let mut magic = [0u8; 2];
        let sniffed = image.read(&mut magic).map_err(extract_error)?;
        image.seek(SeekFrom::Start(0)).map_err(extract_error)?;

        if sniffed == GZIP_MAGIC.len() && magic == GZIP_MAGIC {
            Self::manifest_from_archive(&mut Archive::new(GzDecoder::new(image)))
        } else {
            Self::manifest_from_archive(&mut Archive::new(image))
        }
    }
}

fn extract_error(err: std::io::Error) -> PusherError {
    PusherError::ManifestExtract(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn tar_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (path, data) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, path, *data).unwrap();
        }
        builder.into_inner().unwrap()
    }

    fn file_with(bytes: &[u8]) -> File {
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(bytes).unwrap();
        tmp.reopen().unwrap()
    }

    const MANIFEST: &[u8] =
        br#"{"acKind":"ImageManifest","acVersion":"0.7.0","name":"example.com/app","labels":[{"name":"os","value":"linux"}]}"#;

    #[test]
    fn reads_manifest_from_plain_tar() {
        let mut file = file_with(&tar_bytes(&[
            ("rootfs/etc/hostname", b"box"),
            ("manifest", MANIFEST),
        ]));
        let manifest = AciReader::new().extract_manifest(&mut file).unwrap();
        assert_eq!(manifest.name, "example.com/app");
        assert_eq!(manifest.label("os"), Some("linux"));
    }

    #[test]
    fn reads_manifest_from_gzip_tar() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(&tar_bytes(&[("manifest", MANIFEST)]))
            .unwrap();
        let mut file = file_with(&encoder.finish().unwrap());

        let manifest = AciReader::new().extract_manifest(&mut file).unwrap();
        assert_eq!(manifest.label("os"), Some("linux"));
    }

    #[test]
    fn missing_manifest_is_an_extract_error() {
        let mut file = file_with(&tar_bytes(&[("rootfs/bin/sh", b"#!")]));
        let err = AciReader::new().extract_manifest(&mut file).unwrap_err();
        assert!(matches!(err, PusherError::ManifestExtract(_)));
    }

    #[test]
    fn malformed_manifest_is_an_extract_error() {
        let mut file = file_with(&tar_bytes(&[("manifest", b"{not json")]));
        let err = AciReader::new().extract_manifest(&mut file).unwrap_err();
        assert!(err.to_string().contains("invalid manifest JSON"));
    }

    #[test]
    fn unreadable_image_is_an_extract_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut file = File::open(dir.path()).unwrap();
        let err = AciReader::new().extract_manifest(&mut file).unwrap_err();
        assert!(matches!(err, PusherError::ManifestExtract(_)));
    }
}
