//! Document text extraction for binary formats

use std::io::{Cursor, Read};
use std::panic::{self, AssertUnwindSafe};

use quick_xml::Reader as XmlReader;
use quick_xml::events::Event;
use zip::ZipArchive;

use crate::error::BackendError;
use crate::error::handlers::panic_message;

const DOCX_BODY_PATH: &str = "word/document.xml";

/// Text layer of a PDF. Font decoding in the extractor can panic on
/// unusual files, so a panic is reported as an extraction failure.
pub fn pdf_text(bytes: &[u8]) -> Result<String, BackendError> {
    match panic::catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(bytes))) {
        Ok(result) => result.map_err(|e| BackendError::Extraction(format!("failed to read PDF: {}", e))),
        Err(payload) => Err(BackendError::Extraction(format!(
            "PDF extractor crashed: {}",
            panic_message(payload.as_ref())
        ))),
    }
}

/// Paragraph text of a DOCX, one paragraph per line
pub fn docx_text(bytes: &[u8]) -> Result<String, BackendError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| BackendError::Extraction(format!("failed to open docx archive: {}", e)))?;
    let mut body = archive
        .by_name(DOCX_BODY_PATH)
        .map_err(|e| BackendError::Extraction(format!("docx missing document.xml: {}", e)))?;

    let mut xml = String::new();
    body.read_to_string(&mut xml)
        .map_err(|e| BackendError::Extraction(format!("failed to read document.xml: {}", e)))?;

    wordprocessing_text(&xml)
}

/// Collects `w:t` runs; paragraphs end lines, `w:tab` and `w:br` map to
/// tab and newline.
fn wordprocessing_text(xml: &str) -> Result<String, BackendError> {
    let mut reader = XmlReader::from_str(xml);
    let mut buf = Vec::new();
    let mut text = String::new();
    let mut in_run_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.name().as_ref() == b"w:t" => in_run_text = true,
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_run_text = false,
                b"w:p" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"w:tab" => text.push('\t'),
                b"w:br" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Text(t)) if in_run_text => {
                let content = t
                    .unescape()
                    .map_err(|e| BackendError::Extraction(format!("bad text in document.xml: {}", e)))?;
                text.push_str(&content);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(BackendError::Extraction(format!(
                    "malformed document.xml at {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(text.trim_end().to_string())
}
