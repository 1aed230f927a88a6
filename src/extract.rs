// src/extract.rs

//! Text extraction from uploaded files.

use std::{
    io::{Cursor, Read},
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use quick_xml::{Reader, events::Event};
use tokio::process::Command;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("Unsupported file type: {0}")]
    Unsupported(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to run {tool}: {message}")]
    Tool { tool: String, message: String },

    #[error("invalid docx file: {0}")]
    Docx(String),

    #[error("no text could be extracted from {0}")]
    Empty(String),
}

/// Result of extracting an uploaded file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Extracted {
    pub text: String,
    /// Base64 of the original bytes, only for images.
    pub image_base64: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Image,
    Pdf,
    Docx,
    Text,
}

impl FileKind {
    /// Classifies by extension first, then by declared media type.
    pub fn detect(path: &Path, media_type: Option<&str>) -> Result<Self, ExtractError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let media = media_type.unwrap_or("");

        if IMAGE_EXTENSIONS.contains(&ext.as_str()) || media.starts_with("image/") {
            Ok(FileKind::Image)
        } else if ext == "pdf" || media == "application/pdf" {
            Ok(FileKind::Pdf)
        } else if ext == "docx" || media == crate::docx::DOCX_CONTENT_TYPE {
            Ok(FileKind::Docx)
        } else if ext == "txt" || media.starts_with("text/") {
            Ok(FileKind::Text)
        } else if !ext.is_empty() {
            Err(ExtractError::Unsupported(format!(".{}", ext)))
        } else if !media.is_empty() {
            Err(ExtractError::Unsupported(media.to_string()))
        } else {
            Err(ExtractError::Unsupported("unknown".to_string()))
        }
    }
}

/// Turns an uploaded file into text for the AI gateway.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, path: &Path, media_type: Option<&str>) -> Result<Extracted, ExtractError>;
}

/// Extractor backed by the local filesystem plus the `tesseract` and
/// `pdftotext` command line tools.
#[derive(Debug, Clone)]
pub struct SystemExtractor {
    pub tesseract_bin: String,
    pub pdftotext_bin: String,
    pub ocr_lang: String,
}

impl Default for SystemExtractor {
    fn default() -> Self {
        Self {
            tesseract_bin: "tesseract".to_string(),
            pdftotext_bin: "pdftotext".to_string(),
            ocr_lang: "eng".to_string(),
        }
    }
}

#[async_trait]
impl TextExtractor for SystemExtractor {
    async fn extract(&self, path: &Path, media_type: Option<&str>) -> Result<Extracted, ExtractError> {
        let kind = FileKind::detect(path, media_type)?;
        tracing::debug!("Extracting {:?} from {}", kind, path.display());

        match kind {
            FileKind::Image => {
                let bytes = read_file(path).await?;
                let text = run_tool(
                    &self.tesseract_bin,
                    &[path_str(path)?, "stdout", "-l", self.ocr_lang.as_str()],
                )
                .await?;
                Ok(Extracted {
                    text,
                    image_base64: Some(STANDARD.encode(bytes)),
                })
            }
            FileKind::Pdf => {
                let text = run_tool(&self.pdftotext_bin, &["-layout", path_str(path)?, "-"]).await?;
                if text.trim().is_empty() {
                    return Err(ExtractError::Empty(path.display().to_string()));
                }
                Ok(Extracted {
                    text,
                    image_base64: None,
                })
            }
            FileKind::Docx => {
                let bytes = read_file(path).await?;
                let text = tokio::task::spawn_blocking(move || docx_text(&bytes))
                    .await
                    .map_err(|e| ExtractError::Docx(e.to_string()))??;
                Ok(Extracted {
                    text,
                    image_base64: None,
                })
            }
            FileKind::Text => {
                let bytes = read_file(path).await?;
                Ok(Extracted {
                    text: String::from_utf8_lossy(&bytes).into_owned(),
                    image_base64: None,
                })
            }
        }
    }
}

async fn read_file(path: &Path) -> Result<Vec<u8>, ExtractError> {
    tokio::fs::read(path).await.map_err(|source| ExtractError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn path_str(path: &Path) -> Result<&str, ExtractError> {
    path.to_str()
        .ok_or_else(|| ExtractError::Unsupported(format!("non UTF-8 path {}", path.display())))
}

async fn run_tool(tool: &str, args: &[&str]) -> Result<String, ExtractError> {
    let output = Command::new(tool)
        .args(args)
        .output()
        .await
        .map_err(|e| ExtractError::Tool {
            tool: tool.to_string(),
            message: e.to_string(),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ExtractError::Tool {
            tool: tool.to_string(),
            message: format!(
                "exit {}: {}",
                output.status.code().unwrap_or(-1),
                stderr.trim()
            ),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn unescape_entity(name: &[u8]) -> Option<char> {
    match name {
        b"amp" => Some('&'),
        b"lt" => Some('<'),
        b"gt" => Some('>'),
        b"quot" => Some('"'),
        b"apos" => Some('\''),
        _ => {
            let hex = name.strip_prefix(b"#x").or_else(|| name.strip_prefix(b"#X"));
            let code = match hex {
                Some(digits) => u32::from_str_radix(std::str::from_utf8(digits).ok()?, 16).ok()?,
                None => std::str::from_utf8(name.strip_prefix(b"#")?).ok()?.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

/// Plain text of a `.docx` body, one line per paragraph.
pub fn docx_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| ExtractError::Docx(e.to_string()))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| ExtractError::Docx(e.to_string()))?
        .read_to_string(&mut xml)
        .map_err(|e| ExtractError::Docx(e.to_string()))?;

    let mut reader = Reader::from_str(&xml);
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_text = false;
    let mut in_cell = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"w:t" => in_text = true,
                b"w:tc" => in_cell = true,
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" if !in_cell => lines.push(std::mem::take(&mut current)),
                b"w:tc" => {
                    in_cell = false;
                    current.push('\t');
                }
                b"w:tr" => {
                    let row = current.trim_end_matches('\t').to_string();
                    current.clear();
                    lines.push(row);
                }
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"w:tab" => current.push('\t'),
                b"w:br" => current.push('\n'),
                _ => {}
            },
            Ok(Event::Text(ref e)) if in_text => {
                current.push_str(&String::from_utf8_lossy(e.as_ref()));
            }
            Ok(Event::GeneralRef(ref e)) if in_text => {
                if let Some(c) = unescape_entity(e.as_ref()) {
                    current.push(c);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Docx(e.to_string())),
            _ => {}
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }

    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::{Block, Document, Run, parse_markdown, write_docx};

    #[test]
    fn detection_prefers_extension() {
        assert_eq!(
            FileKind::detect(Path::new("q.PNG"), Some("application/octet-stream")).unwrap(),
            FileKind::Image
        );
        assert_eq!(
            FileKind::detect(Path::new("upload"), Some("application/pdf")).unwrap(),
            FileKind::Pdf
        );
        assert_eq!(
            FileKind::detect(Path::new("notes.txt"), None).unwrap(),
            FileKind::Text
        );
    }

    #[test]
    fn unsupported_extension_is_named() {
        let err = FileKind::detect(Path::new("sheet.xlsx"), None).unwrap_err();
        assert_eq!(err.to_string(), "Unsupported file type: .xlsx");
    }

    #[test]
    fn docx_text_reads_paragraphs_and_cells() {
        let mut blocks = vec![Block::paragraph(vec![Run::plain("Profit & Loss A/c")])];
        blocks.extend(parse_markdown("| Particulars | ₹ |\n|---|---|\n| Sales | 1,000 |"));
        let bytes = write_docx(&Document { blocks }).unwrap();

        let text = docx_text(&bytes).unwrap();

        assert!(text.contains("Profit & Loss A/c"));
        assert!(text.contains("Particulars\t₹"));
        assert!(text.contains("Sales\t1,000"));
    }

    #[test]
    fn entities_decode() {
        assert_eq!(unescape_entity(b"amp"), Some('&'));
        assert_eq!(unescape_entity(b"#8377"), Some('₹'));
        assert_eq!(unescape_entity(b"#x20B9"), Some('₹'));
        assert_eq!(unescape_entity(b"nbsp"), None);
    }

    #[tokio::test]
    async fn text_files_are_read_as_is() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("question.txt");
        std::fs::write(&path, "Journal entry for cash sale of ₹1000").unwrap();

        let extracted = SystemExtractor::default().extract(&path, Some("text/plain")).await.unwrap();

        assert_eq!(extracted.text, "Journal entry for cash sale of ₹1000");
        assert!(extracted.image_base64.is_none());
    }

    #[tokio::test]
    async fn docx_files_extract_non_empty_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("answer.docx");
        let doc = Document {
            blocks: parse_markdown("Cash A/c Dr 1000\nTo Sales A/c 1000"),
        };
        std::fs::write(&path, write_docx(&doc).unwrap()).unwrap();

        let extracted = SystemExtractor::default().extract(&path, None).await.unwrap();

        assert_eq!(extracted.text, "Cash A/c Dr 1000\nTo Sales A/c 1000");
    }

    /// Writes an executable shell script standing in for an external tool.
    #[cfg(unix)]
    fn fake_tool(dir: &Path, name: &str, body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_str().unwrap().to_string()
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn images_are_ocred_and_kept_as_base64() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = SystemExtractor {
            tesseract_bin: fake_tool(dir.path(), "tesseract", "echo \"Cash Book $2 $4\""),
            ..SystemExtractor::default()
        };
        let image = dir.path().join("question.png");
        let bytes = b"\x89PNG\r\n\x1a\nnot really pixels".to_vec();
        std::fs::write(&image, &bytes).unwrap();

        let extracted = extractor.extract(&image, Some("image/png")).await.unwrap();

        assert_eq!(extracted.text.trim(), "Cash Book stdout eng");
        assert_eq!(extracted.image_base64, Some(STANDARD.encode(&bytes)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn pdfs_are_read_with_layout() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = SystemExtractor {
            pdftotext_bin: fake_tool(dir.path(), "pdftotext", "echo \"Trial Balance $1 $3\""),
            ..SystemExtractor::default()
        };
        let pdf = dir.path().join("question.pdf");
        std::fs::write(&pdf, b"%PDF-1.4").unwrap();

        let extracted = extractor.extract(&pdf, None).await.unwrap();

        assert_eq!(extracted.text.trim(), "Trial Balance -layout -");
        assert!(extracted.image_base64.is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn pdfs_without_text_are_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = SystemExtractor {
            pdftotext_bin: fake_tool(dir.path(), "pdftotext", "exit 0"),
            ..SystemExtractor::default()
        };
        let pdf = dir.path().join("scan.pdf");
        std::fs::write(&pdf, b"%PDF-1.4").unwrap();

        let err = extractor.extract(&pdf, None).await.unwrap_err();

        assert!(matches!(err, ExtractError::Empty(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_tools_report_their_exit_status() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = SystemExtractor {
            pdftotext_bin: fake_tool(dir.path(), "pdftotext", "echo broken >&2; exit 3"),
            ..SystemExtractor::default()
        };
        let pdf = dir.path().join("bad.pdf");
        std::fs::write(&pdf, b"%PDF-1.4").unwrap();

        let err = extractor.extract(&pdf, None).await.unwrap_err();

        assert!(matches!(err, ExtractError::Tool { ref message, .. } if message == "exit 3: broken"));
    }

    #[tokio::test]
    async fn unsupported_files_fail_before_reading() {
        let err = SystemExtractor::default()
            .extract(Path::new("/nonexistent/malware.exe"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Unsupported(ref ext) if ext == ".exe"));
    }
}
