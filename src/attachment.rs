//! Validation and staging of the single image or document attached to the next message.

use crate::toast::Notice;
use crate::types::FileInfo;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

pub const MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;
pub const MAX_DOCUMENT_BYTES: u64 = 10 * 1024 * 1024;
/// Documents above this size are accepted with a heads-up.
pub const LARGE_DOCUMENT_BYTES: u64 = 5 * 1024 * 1024;

pub const DOCUMENT_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "text/plain",
];

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum AttachmentError {
    #[error("File must be an image!")]
    NotAnImage,

    #[error("Image must be 5MB or smaller!")]
    ImageTooLarge,

    #[error("Unsupported file format! Use PDF, DOCX, or TXT")]
    UnsupportedDocument,

    #[error("File too large ({size_mb}MB)! Maximum is 10MB")]
    DocumentTooLarge { size_mb: String },

    #[error("{model} does not support image analysis.")]
    ImagesUnsupported { model: String },

    #[error("Image is empty or unreadable!")]
    Unreadable,
}

/// A file picked by the user, fully read into memory.
#[derive(Clone, Debug, PartialEq)]
pub struct PickedFile {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl PickedFile {
    /// Builds a picked file, guessing the MIME type from its name.
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let mime = mime_from_name(&name).to_string();
        Self { name, mime, bytes }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn file_info(&self) -> FileInfo {
        let ext = file_extension(&self.name);
        FileInfo {
            name: self.name.clone(),
            size: format_file_size(self.size()),
            icon: file_icon_class(&ext).to_string(),
        }
    }

    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum StagedAttachment {
    Image { file: PickedFile, data_url: String },
    Document { file: PickedFile },
}

impl StagedAttachment {
    pub fn file(&self) -> &PickedFile {
        match self {
            StagedAttachment::Image { file, .. } | StagedAttachment::Document { file } => file,
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, StagedAttachment::Image { .. })
    }
}

/// Holds at most one staged attachment; staging replaces whatever was there.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AttachmentSlot {
    staged: Option<StagedAttachment>,
}

impl AttachmentSlot {
    pub fn staged(&self) -> Option<&StagedAttachment> {
        self.staged.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_none()
    }

    pub fn has_image(&self) -> bool {
        self.staged.as_ref().is_some_and(StagedAttachment::is_image)
    }

    pub fn has_document(&self) -> bool {
        matches!(self.staged, Some(StagedAttachment::Document { .. }))
    }

    pub fn stage_image(&mut self, file: PickedFile) -> Result<(), AttachmentError> {
        validate_image(&file)?;
        let data_url = file.data_url();
        self.replace(StagedAttachment::Image { file, data_url });
        Ok(())
    }

    /// Stages a document; the `Ok` value carries an optional heads-up for large files.
    pub fn stage_document(&mut self, file: PickedFile) -> Result<Option<Notice>, AttachmentError> {
        let notice = validate_document(&file)?;
        self.replace(StagedAttachment::Document { file });
        Ok(notice)
    }

    fn replace(&mut self, next: StagedAttachment) {
        if let Some(previous) = self.staged.replace(next) {
            tracing::debug!(name = %previous.file().name, "replaced staged attachment");
        }
    }

    pub fn clear_image(&mut self) -> Option<StagedAttachment> {
        if self.has_image() { self.staged.take() } else { None }
    }

    pub fn clear(&mut self) -> Option<StagedAttachment> {
        self.staged.take()
    }
}

pub fn validate_image(file: &PickedFile) -> Result<(), AttachmentError> {
    if !file.mime.starts_with("image/") {
        return Err(AttachmentError::NotAnImage);
    }
    if file.size() > MAX_IMAGE_BYTES {
        return Err(AttachmentError::ImageTooLarge);
    }
    if file.bytes.is_empty() {
        return Err(AttachmentError::Unreadable);
    }
    Ok(())
}

pub fn validate_document(file: &PickedFile) -> Result<Option<Notice>, AttachmentError> {
    if !DOCUMENT_MIME_TYPES.contains(&file.mime.as_str()) {
        return Err(AttachmentError::UnsupportedDocument);
    }
    let size = file.size();
    if size > MAX_DOCUMENT_BYTES {
        return Err(AttachmentError::DocumentTooLarge {
            size_mb: megabytes(size),
        });
    }
    if size > LARGE_DOCUMENT_BYTES {
        return Ok(Some(Notice::info(format!(
            "Large file ({}MB), processing may take a while...",
            megabytes(size)
        ))));
    }
    Ok(None)
}

fn megabytes(bytes: u64) -> String {
    format!("{:.2}", bytes as f64 / 1024.0 / 1024.0)
}

/// `0 Bytes`, else base-1024 units rounded to two decimals (`1.5 KB`).
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut value = bytes as f64;
    let mut exponent = 0;
    while value >= 1024.0 && exponent < UNITS.len() - 1 {
        value /= 1024.0;
        exponent += 1;
    }
    let rounded = (value * 100.0).round() / 100.0;
    let number = format!("{rounded:.2}");
    let number = number.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", number, UNITS[exponent])
}

pub fn file_extension(name: &str) -> String {
    name.rsplit_once('.')
        .map(|(_, ext)| ext)
        .unwrap_or(name)
        .to_ascii_lowercase()
}

pub fn file_icon_class(ext: &str) -> &'static str {
    match ext {
        "pdf" => "fas fa-file-pdf",
        "doc" | "docx" => "fas fa-file-word",
        "txt" => "fas fa-file-alt",
        _ => "fas fa-file",
    }
}

pub fn mime_from_name(name: &str) -> &'static str {
    match file_extension(name).as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "heic" => "image/heic",
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, len: usize) -> PickedFile {
        PickedFile::new(name, vec![0u8; len])
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(1024 * 1024), "1 MB");
        assert_eq!(format_file_size(1_234_567), "1.18 MB");
    }

    #[test]
    fn test_image_validation() {
        assert_eq!(validate_image(&file("notes.pdf", 10)), Err(AttachmentError::NotAnImage));
        assert_eq!(
            validate_image(&file("big.png", MAX_IMAGE_BYTES as usize + 1)),
            Err(AttachmentError::ImageTooLarge)
        );
        assert!(validate_image(&file("cat.JPG", 10)).is_ok());
    }

    #[test]
    fn test_document_validation() {
        assert_eq!(
            validate_document(&file("archive.zip", 10)),
            Err(AttachmentError::UnsupportedDocument)
        );
        assert_eq!(validate_document(&file("small.txt", 10)), Ok(None));

        let large = validate_document(&file("large.pdf", 6 * 1024 * 1024)).unwrap();
        assert_eq!(
            large.map(|n| n.message),
            Some("Large file (6.00MB), processing may take a while...".to_string())
        );

        let err = validate_document(&file("huge.docx", 11 * 1024 * 1024)).unwrap_err();
        assert_eq!(err.to_string(), "File too large (11.00MB)! Maximum is 10MB");
    }

    #[test]
    fn test_slot_holds_one_attachment() {
        let mut slot = AttachmentSlot::default();
        slot.stage_document(file("report.pdf", 100)).unwrap();
        slot.stage_image(file("photo.png", 100)).unwrap();
        assert!(slot.has_image());
        assert!(!slot.has_document());

        slot.stage_document(file("report.pdf", 100)).unwrap();
        assert!(slot.has_document());
        assert!(!slot.has_image());
        assert!(slot.clear_image().is_none());
        assert!(slot.clear().is_some());
        assert!(slot.is_empty());
    }

    #[test]
    fn test_rejected_file_keeps_previous_stage() {
        let mut slot = AttachmentSlot::default();
        slot.stage_image(file("photo.png", 100)).unwrap();
        assert!(slot.stage_document(file("virus.exe", 100)).is_err());
        assert!(slot.has_image());
    }

    #[test]
    fn test_file_info_and_data_url() {
        let picked = PickedFile::new("Thesis.DOCX", b"abc".to_vec());
        let info = picked.file_info();
        assert_eq!(info.icon, "fas fa-file-word");
        assert_eq!(info.size, "3 B");
        assert_eq!(
            PickedFile::new("dot.png", b"abc".to_vec()).data_url(),
            "data:image/png;base64,YWJj"
        );
    }
}
