//! Chunk info - hashes, sizes and format details for one or more chunks.

use humansize::{format_size, BINARY};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256};

use crate::archive::Chunk;

/// Offset of the PE header pointer in an MZ stub
const PE_POINTER_OFFSET: usize = 0x3C;
const IMAGE_FILE_MACHINE_AMD64: u16 = 0x8664;

/// Detailed description of a single chunk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkInfo {
    pub index: usize,
    pub name: String,
    pub extension: String,
    pub description: String,
    pub size: u64,
    pub size_human: String,
    pub md5: String,
    pub sha1: String,
    pub sha256: String,
    pub blake3: String,
    /// First four bytes as hex, or `N/A` for shorter chunks
    pub first_bytes: String,
    pub mime: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pe_architecture: Option<String>,
}

/// Decoded image properties
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDetails {
    pub width: u32,
    pub height: u32,
    pub color: String,
    pub bits_per_pixel: u16,
}

impl ChunkInfo {
    pub fn from_chunk(chunk: &Chunk) -> Self {
        let data = chunk.data();
        let size = data.len() as u64;
        let extension = chunk.extension().to_string();

        let image = match extension.as_str() {
            ".png" | ".jpg" | ".gif" | ".bmp" => image_details(data),
            _ => None,
        };
        let pe_architecture = if extension == ".exe" {
            pe_architecture(data).map(str::to_string)
        } else {
            None
        };

        Self {
            index: chunk.index(),
            name: chunk.display_name(),
            description: chunk.description().to_string(),
            size,
            size_human: human_size(size),
            md5: format!("{:x}", md5::compute(data)),
            sha1: hex::encode(Sha1::digest(data)),
            sha256: hex::encode(Sha256::digest(data)),
            blake3: blake3::hash(data).to_hex().to_string(),
            first_bytes: data
                .get(..4)
                .map(hex::encode_upper)
                .unwrap_or_else(|| "N/A".to_string()),
            mime: mime_guess::from_ext(extension.trim_start_matches('.'))
                .first_or_octet_stream()
                .to_string(),
            extension,
            image,
            pe_architecture,
        }
    }

    /// Property/value pairs in display order
    pub fn rows(&self) -> Vec<(&'static str, String)> {
        let mut rows = vec![
            ("File name", self.name.clone()),
            ("Index", self.index.to_string()),
            ("Type", format!("{} ({})", self.extension, self.description)),
            ("MIME", self.mime.clone()),
            ("Size", self.size_human.clone()),
            ("MD5", self.md5.clone()),
            ("SHA-1", self.sha1.clone()),
            ("SHA-256", self.sha256.clone()),
            ("BLAKE3", self.blake3.clone()),
            ("First 4 bytes", self.first_bytes.clone()),
        ];
        if let Some(img) = &self.image {
            rows.push(("Resolution", format!("{}x{}", img.width, img.height)));
            rows.push((
                "Color depth",
                format!("{} bits ({})", img.bits_per_pixel, img.color),
            ));
        }
        if let Some(arch) = &self.pe_architecture {
            rows.push(("Architecture", arch.clone()));
        }
        rows
    }
}

/// Aggregate view over several chunks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub count: usize,
    pub total_size: u64,
    pub total_size_human: String,
    /// Extension histogram in first-seen order
    pub types: Vec<(String, usize)>,
}

impl Summary {
    pub fn from_chunks<'a, I>(chunks: I) -> Self
    where
        I: IntoIterator<Item = &'a Chunk>,
    {
        let mut count = 0;
        let mut total_size = 0u64;
        let mut types: Vec<(String, usize)> = Vec::new();

        for chunk in chunks {
            count += 1;
            total_size += chunk.len() as u64;
            match types.iter_mut().find(|(ext, _)| ext == chunk.extension()) {
                Some((_, n)) => *n += 1,
                None => types.push((chunk.extension().to_string(), 1)),
            }
        }

        Self {
            count,
            total_size,
            total_size_human: human_size(total_size),
            types,
        }
    }

    pub fn rows(&self) -> Vec<(&'static str, String)> {
        let types = self
            .types
            .iter()
            .map(|(ext, n)| format!("{} ({})", ext, n))
            .collect::<Vec<_>>()
            .join(", ");
        vec![
            ("Number of files", self.count.to_string()),
            ("Total size", self.total_size_human.clone()),
            ("File types", types),
        ]
    }
}

/// `"2048 bytes (2 KiB)"`
pub fn human_size(size: u64) -> String {
    format!("{} bytes ({})", size, format_size(size, BINARY))
}

fn image_details(data: &[u8]) -> Option<ImageDetails> {
    use image::GenericImageView;

    match image::load_from_memory(data) {
        Ok(img) => {
            let (width, height) = img.dimensions();
            let color = img.color();
            Some(ImageDetails {
                width,
                height,
                color: format!("{:?}", color),
                bits_per_pixel: color.bits_per_pixel(),
            })
        }
        Err(e) => {
            tracing::debug!("Image decode failed: {}", e);
            None
        }
    }
}

/// `x64` for AMD64 machines, `x86` for anything else with a readable PE header
fn pe_architecture(data: &[u8]) -> Option<&'static str> {
    if data.len() <= 64 {
        return None;
    }
    let ptr = data.get(PE_POINTER_OFFSET..PE_POINTER_OFFSET + 4)?;
    let pe_offset = u32::from_le_bytes(ptr.try_into().ok()?) as usize;
    if pe_offset >= data.len() - 64 {
        return None;
    }
    let machine = data.get(pe_offset + 4..pe_offset + 6)?;
    let machine = u16::from_le_bytes(machine.try_into().ok()?);
    Some(if machine == IMAGE_FILE_MACHINE_AMD64 {
        "x64"
    } else {
        "x86"
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::Archive;

    fn pe_stub(machine: u16) -> Vec<u8> {
        let mut data = vec![0u8; 256];
        data[0] = b'M';
        data[1] = b'Z';
        data[0x3C..0x40].copy_from_slice(&0x80u32.to_le_bytes());
        data[0x80..0x84].copy_from_slice(b"PE\0\0");
        data[0x84..0x86].copy_from_slice(&machine.to_le_bytes());
        data
    }

    fn tiny_png() -> Vec<u8> {
        let img = image::RgbaImage::new(3, 2);
        let mut out = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut out, image::ImageOutputFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn test_basic_fields() {
        let mut archive = Archive::default();
        archive.append(b"abc".to_vec());
        let info = ChunkInfo::from_chunk(archive.get(0).unwrap());

        assert_eq!(info.name, "chunk_0.txt");
        assert_eq!(info.size, 3);
        assert_eq!(info.md5, "900150983cd24fb0d6963f7d28e17f72");
        assert_eq!(info.sha1, "a9993e364706816aba3e25717850c26c9cd0d89d");
        assert_eq!(
            info.sha256,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(info.blake3.len(), 64);
        assert_eq!(info.first_bytes, "N/A");
        assert_eq!(info.mime, "text/plain");
        assert!(info.image.is_none());
    }

    #[test]
    fn test_first_bytes_hex() {
        let mut archive = Archive::default();
        archive.append(vec![0x89, 0x50, 0x4E, 0x47, 0x0D]);
        let info = ChunkInfo::from_chunk(archive.get(0).unwrap());
        assert_eq!(info.first_bytes, "89504E47");
        assert_eq!(info.mime, "image/png");
    }

    #[test]
    fn test_pe_architecture() {
        assert_eq!(pe_architecture(&pe_stub(0x8664)), Some("x64"));
        assert_eq!(pe_architecture(&pe_stub(0x014C)), Some("x86"));
        assert_eq!(pe_architecture(b"MZ"), None);

        let mut bad = pe_stub(0x8664);
        bad[0x3C..0x40].copy_from_slice(&0xFFFF_FFF0u32.to_le_bytes());
        assert_eq!(pe_architecture(&bad), None);

        let mut archive = Archive::default();
        archive.append(pe_stub(0x8664));
        let info = ChunkInfo::from_chunk(archive.get(0).unwrap());
        assert_eq!(info.extension, ".exe");
        assert_eq!(info.pe_architecture.as_deref(), Some("x64"));
    }

    #[test]
    fn test_image_details() {
        let mut archive = Archive::default();
        archive.append(tiny_png());
        let info = ChunkInfo::from_chunk(archive.get(0).unwrap());

        let img = info.image.as_ref().expect("png should decode");
        assert_eq!((img.width, img.height), (3, 2));
        assert_eq!(img.bits_per_pixel, 32);
        assert!(info.rows().iter().any(|(k, v)| *k == "Resolution" && v == "3x2"));
    }

    #[test]
    fn test_truncated_image_has_no_details() {
        let mut archive = Archive::default();
        archive.append(vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]);
        let info = ChunkInfo::from_chunk(archive.get(0).unwrap());
        assert!(info.image.is_none());
    }

    #[test]
    fn test_summary() {
        let mut archive = Archive::default();
        archive.append(b"one".to_vec());
        archive.append(vec![0xFF, 0xD8, 0xFF, 0x00]);
        archive.append(b"two".to_vec());

        let summary = Summary::from_chunks(&archive);
        assert_eq!(summary.count, 3);
        assert_eq!(summary.total_size, 10);
        assert_eq!(
            summary.types,
            vec![(".txt".to_string(), 2), (".jpg".to_string(), 1)]
        );
        assert_eq!(summary.rows()[2].1, ".txt (2), .jpg (1)");
    }

    #[test]
    fn test_human_size() {
        assert!(human_size(12).starts_with("12 bytes ("));
        let kib = human_size(2048);
        assert!(kib.starts_with("2048 bytes ("));
        assert!(kib.contains("KiB"));
    }
}
