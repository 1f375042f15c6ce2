//! Text extraction for uploaded files.

use anyhow::{anyhow, Context, Result};
use std::io::{Cursor, Read};

use crate::types::DocumentKind;

pub struct DocumentParser;

impl DocumentParser {
    pub fn new() -> Self {
        Self
    }

    /// Extract plain text from raw uploaded bytes.
    pub fn parse(&self, kind: DocumentKind, data: &[u8]) -> Result<String> {
        match kind {
            DocumentKind::Pdf => self.parse_pdf(data),
            DocumentKind::Docx => self.parse_docx(data),
            DocumentKind::Text => Ok(String::from_utf8_lossy(data).into_owned()),
        }
    }

    fn parse_pdf(&self, data: &[u8]) -> Result<String> {
        let text = pdf_extract::extract_text_from_mem(data)
            .context("Failed to extract text from PDF")?;
        Ok(text)
    }

    fn parse_docx(&self, data: &[u8]) -> Result<String> {
        let mut archive = zip::ZipArchive::new(Cursor::new(data))
            .context("Failed to open DOCX as zip archive")?;

        let mut xml_content = String::new();
        archive
            .by_name("word/document.xml")
            .map_err(|e| anyhow!("DOCX missing word/document.xml: {}", e))?
            .read_to_string(&mut xml_content)
            .context("Failed to read DOCX document XML")?;

        Ok(extract_docx_text(&xml_content))
    }
}

impl Default for DocumentParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract text from DOCX XML by collecting <w:t> runs within <w:p> paragraphs.
fn extract_docx_text(xml: &str) -> String {
    let mut result = String::new();
    let mut pos = 0;

    while pos < xml.len() {
        let Some(p_start) = xml[pos..].find("<w:p") else {
            break;
        };
        let abs_p_start = pos + p_start;

        let p_end = match xml[abs_p_start..].find("</w:p>") {
            Some(end) => abs_p_start + end + 6,
            None => xml.len(),
        };

        let paragraph = &xml[abs_p_start..p_end];
        let mut para_text = String::new();
        let mut t_pos = 0;

        while t_pos < paragraph.len() {
            let Some(t_start) = paragraph[t_pos..].find("<w:t") else {
                break;
            };
            let abs_t_start = t_pos + t_start;
            match paragraph[abs_t_start..].find('>') {
                Some(tag_end) => {
                    let content_start = abs_t_start + tag_end + 1;
                    match paragraph[content_start..].find("</w:t>") {
                        Some(t_end) => {
                            para_text.push_str(&paragraph[content_start..content_start + t_end]);
                            t_pos = content_start + t_end + 6;
                        }
                        None => t_pos = content_start,
                    }
                }
                None => t_pos = abs_t_start + 4,
            }
        }

        if !para_text.is_empty() {
            if !result.is_empty() {
                result.push('\n');
            }
            result.push_str(&unescape_xml(&para_text));
        }

        pos = p_end;
    }

    result
}

fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
