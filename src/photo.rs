use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::Error;

pub const MAX_PHOTO_BYTES: u64 = 5 * 1024 * 1024;

pub const ACCEPTED_PHOTO_TYPES: [&str; 4] = ["image/jpeg", "image/jpg", "image/png", "image/webp"];

/// A committed profile photo.
#[derive(Clone, PartialEq, Eq)]
pub struct Photo {
    pub file_name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl Photo {
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn data_uri(&self) -> String {
        data_uri(&self.mime_type, &self.data)
    }
}

impl std::fmt::Debug for Photo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Photo")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("bytes", &self.data.len())
            .finish()
    }
}

enum Source {
    Bytes(Vec<u8>),
    File(PathBuf),
}

/// A file the user picked but which has not been read yet. Type and size are
/// known up front, the content is only read once both checks pass.
pub struct PhotoUpload {
    pub file_name: String,
    pub mime_type: String,
    pub size: u64,
    source: Source,
}

impl PhotoUpload {
    pub fn from_bytes(file_name: impl Into<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            size: data.len() as u64,
            source: Source::Bytes(data),
        }
    }

    /// Describe a file on disk. The MIME type is guessed from the extension.
    pub fn from_path(path: &Path) -> Result<Self, Error> {
        let size = std::fs::metadata(path)?.len();
        let mime_type = image::ImageFormat::from_path(path)
            .map(|f| f.to_mime_type().to_string())
            .unwrap_or_else(|_| "application/octet-stream".to_string());
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self {
            file_name,
            mime_type,
            size,
            source: Source::File(path.to_path_buf()),
        })
    }

    /// Read the content and make sure it decodes as an image.
    pub(crate) fn read(self) -> Result<Photo, Error> {
        let data = match self.source {
            Source::Bytes(data) => data,
            Source::File(path) => std::fs::read(&path)
                .map_err(|e| Error::PhotoReadFailed(format!("{}: {e}", path.display())))?,
        };
        if let Err(e) = image::load_from_memory(&data) {
            return Err(Error::PhotoReadFailed(format!("{}: {e}", self.file_name)));
        }
        Ok(Photo {
            file_name: self.file_name,
            mime_type: self.mime_type,
            data,
        })
    }
}

pub fn data_uri(mime_type: &str, data: &[u8]) -> String {
    format!("data:{mime_type};base64,{}", STANDARD.encode(data))
}

/// Payload bytes of a base64 `data:` URI.
pub fn decode_data_uri(uri: &str) -> Option<Vec<u8>> {
    let rest = uri.strip_prefix("data:")?;
    let (meta, payload) = rest.split_once(',')?;
    if !meta.ends_with(";base64") {
        return None;
    }
    STANDARD.decode(payload.trim()).ok()
}
