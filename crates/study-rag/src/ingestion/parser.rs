//! Multi-format file parser

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io::Read;

use crate::error::{Error, Result};
use crate::types::FileType;

/// Parsed document with extracted text and metadata
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    /// File type
    pub file_type: FileType,
    /// Extracted text content, including page/slide markers
    pub content: String,
    /// Content hash for deduplication
    pub content_hash: String,
    /// Total pages or slides (if applicable)
    pub total_pages: Option<u32>,
    /// Page-level content (PDF pages, PPTX slides)
    pub pages: Vec<PageContent>,
    /// Extraction details (e.g. which PDF extractor succeeded)
    pub metadata: HashMap<String, String>,
}

/// Content from a single page or slide
#[derive(Debug, Clone)]
pub struct PageContent {
    /// Page number (1-indexed)
    pub page_number: u32,
    /// Text content of the page
    pub content: String,
    /// Character offset of the page marker in the full document
    pub char_offset: usize,
}

/// Multi-format file parser
pub struct FileParser;

impl FileParser {
    /// Parse a file based on its extension
    pub fn parse(filename: &str, data: &[u8]) -> Result<ParsedDocument> {
        let file_type = FileType::from_filename(filename).ok_or_else(|| {
            let ext = std::path::Path::new(filename)
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("")
                .to_lowercase();
            Error::UnsupportedFileType(if ext.is_empty() { "(none)".to_string() } else { ext })
        })?;

        match file_type {
            FileType::Pdf => Self::parse_pdf(filename, data),
            FileType::Docx => Self::parse_docx(filename, data),
            FileType::Pptx => Self::parse_pptx(filename, data),
            FileType::Txt => Ok(Self::parse_text(data)),
        }
    }

    /// Parse PDF document page by page, falling back to whole-document extraction
    fn parse_pdf(filename: &str, data: &[u8]) -> Result<ParsedDocument> {
        let doc = lopdf::Document::load_mem(data)
            .map_err(|e| Error::file_parse(filename, format!("Failed to load PDF: {}", e)))?;

        let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
        let total_pages = page_numbers.len() as u32;

        let mut content = String::new();
        let mut pages = Vec::new();
        let mut metadata = HashMap::new();

        for page_number in &page_numbers {
            match doc.extract_text(&[*page_number]) {
                Ok(text) => {
                    let text = normalize_pdf_text(&text);
                    if text.trim().is_empty() {
                        continue;
                    }
                    let char_offset = content.chars().count();
                    content.push_str(&format!("\n--- Page {} ---\n", page_number));
                    content.push_str(&text);
                    pages.push(PageContent {
                        page_number: *page_number,
                        content: text,
                        char_offset,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        "Error extracting text from page {} of {}: {}",
                        page_number,
                        filename,
                        e
                    );
                }
            }
        }

        if content.trim().is_empty() {
            tracing::debug!("Per-page extraction empty for {}, trying pdf-extract", filename);
            let text = normalize_pdf_text(&Self::extract_pdf_with_timeout(filename, data)?);
            if text.trim().is_empty() {
                return Err(Error::file_parse(
                    filename,
                    "PDF appears to be image-based or has no extractable text",
                ));
            }
            content = format!("\n--- Page 1 ---\n{}", text);
            pages.push(PageContent {
                page_number: 1,
                content: text,
                char_offset: 0,
            });
            metadata.insert("extractor".to_string(), "pdf-extract".to_string());
        } else {
            metadata.insert("extractor".to_string(), "lopdf".to_string());
        }

        Ok(ParsedDocument {
            file_type: FileType::Pdf,
            content_hash: hash_content(&content),
            content,
            total_pages: Some(total_pages.max(1)),
            pages,
            metadata,
        })
    }

    /// Extract PDF text with a sync timeout to prevent hangs on problematic fonts
    fn extract_pdf_with_timeout(filename: &str, data: &[u8]) -> Result<String> {
        use std::sync::mpsc;
        use std::thread;
        use std::time::Duration;

        let data_vec = data.to_vec();
        let (tx, rx) = mpsc::channel();

        let handle = thread::spawn(move || {
            let result = pdf_extract::extract_text_from_mem(&data_vec);
            let _ = tx.send(result);
        });

        match rx.recv_timeout(Duration::from_secs(60)) {
            Ok(Ok(text)) => {
                let _ = handle.join();
                Ok(text)
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(Error::file_parse(filename, format!("pdf-extract failed: {}", e)))
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                // the thread cannot be killed; it is left to finish on its own
                tracing::error!("PDF extraction timeout after 60s for {}", filename);
                Err(Error::file_parse(filename, "PDF text extraction timed out"))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                tracing::error!("PDF extraction thread crashed for {}", filename);
                Err(Error::file_parse(filename, "PDF text extraction crashed"))
            }
        }
    }

    /// Parse DOCX document: paragraphs first, then table rows
    fn parse_docx(filename: &str, data: &[u8]) -> Result<ParsedDocument> {
        let doc = docx_rs::read_docx(data).map_err(|e| Error::file_parse(filename, e.to_string()))?;

        let mut paragraphs = Vec::new();
        let mut table_rows = Vec::new();

        for child in &doc.document.children {
            match child {
                docx_rs::DocumentChild::Paragraph(p) => {
                    let text = paragraph_text(p);
                    if !text.trim().is_empty() {
                        paragraphs.push(text);
                    }
                }
                docx_rs::DocumentChild::Table(table) => {
                    for docx_rs::TableChild::TableRow(row) in &table.rows {
                        let cells: Vec<String> = row
                            .cells
                            .iter()
                            .filter_map(|docx_rs::TableRowChild::TableCell(cell)| {
                                let text = cell
                                    .children
                                    .iter()
                                    .filter_map(|c| match c {
                                        docx_rs::TableCellContent::Paragraph(p) => {
                                            Some(paragraph_text(p))
                                        }
                                        _ => None,
                                    })
                                    .collect::<Vec<_>>()
                                    .join("\n");
                                let text = text.trim().to_string();
                                (!text.is_empty()).then_some(text)
                            })
                            .collect();
                        if !cells.is_empty() {
                            table_rows.push(cells.join(" | "));
                        }
                    }
                }
                _ => {}
            }
        }

        let mut content = String::new();
        for line in paragraphs.iter().chain(table_rows.iter()) {
            content.push_str(line);
            content.push('\n');
        }

        Ok(ParsedDocument {
            file_type: FileType::Docx,
            content_hash: hash_content(&content),
            content,
            total_pages: None,
            pages: Vec::new(),
            metadata: HashMap::new(),
        })
    }

    /// Parse PowerPoint presentation (.pptx)
    fn parse_pptx(filename: &str, data: &[u8]) -> Result<ParsedDocument> {
        let cursor = std::io::Cursor::new(data);
        let mut archive =
            zip::ZipArchive::new(cursor).map_err(|e| Error::file_parse(filename, e.to_string()))?;

        // ppt/slides/slide1.xml, slide2.xml, ... sorted numerically
        let mut slide_names: Vec<(u32, String)> = archive
            .file_names()
            .filter(|name| name.starts_with("ppt/slides/slide") && name.ends_with(".xml"))
            .filter_map(|name| {
                name.trim_start_matches("ppt/slides/slide")
                    .trim_end_matches(".xml")
                    .parse::<u32>()
                    .ok()
                    .map(|n| (n, name.to_string()))
            })
            .collect();
        slide_names.sort_by_key(|(n, _)| *n);

        let mut content = String::new();
        let mut pages = Vec::new();
        let mut slide_number = 0u32;

        for (_, slide_name) in &slide_names {
            slide_number += 1;
            let mut xml = String::new();
            archive
                .by_name(slide_name)
                .map_err(|e| Error::file_parse(filename, e.to_string()))?
                .read_to_string(&mut xml)
                .map_err(|e| Error::file_parse(filename, e.to_string()))?;

            let slide_text = extract_text_from_pptx_xml(&xml);
            let char_offset = content.chars().count();
            content.push_str(&format!("\n--- Slide {} ---\n", slide_number));
            if !slide_text.is_empty() {
                content.push_str(&slide_text);
                content.push('\n');
            }
            pages.push(PageContent {
                page_number: slide_number,
                content: slide_text,
                char_offset,
            });
        }

        // markers alone carry no study material
        if pages.iter().all(|p| p.content.is_empty()) {
            content.clear();
        }

        let total_pages = (slide_number > 0).then_some(slide_number);

        Ok(ParsedDocument {
            file_type: FileType::Pptx,
            content_hash: hash_content(&content),
            content,
            total_pages,
            pages,
            metadata: HashMap::new(),
        })
    }

    /// Parse plain text: BOM-tagged UTF-8/16, then UTF-8, then Latin-1
    fn parse_text(data: &[u8]) -> ParsedDocument {
        let (content, encoding) = decode_text(data);
        let mut metadata = HashMap::new();
        metadata.insert("encoding".to_string(), encoding.to_string());

        ParsedDocument {
            file_type: FileType::Txt,
            content_hash: hash_content(&content),
            content,
            total_pages: None,
            pages: Vec::new(),
            metadata,
        }
    }
}

fn paragraph_text(p: &docx_rs::Paragraph) -> String {
    let mut text = String::new();
    for child in &p.children {
        if let docx_rs::ParagraphChild::Run(run) = child {
            for child in &run.children {
                if let docx_rs::RunChild::Text(t) = child {
                    text.push_str(&t.text);
                }
            }
        }
    }
    text
}

/// Extract `<a:t>` runs, one line per non-empty `<a:p>` paragraph
fn extract_text_from_pptx_xml(xml: &str) -> String {
    use quick_xml::events::Event;
    use quick_xml::Reader;

    // whitespace inside <a:t> is significant, so text is not trimmed
    let mut reader = Reader::from_str(xml);

    let mut lines = Vec::new();
    let mut paragraph = String::new();
    let mut in_text_element = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    in_text_element = true;
                }
            }
            Ok(Event::Text(e)) => {
                if in_text_element {
                    if let Ok(text) = e.unescape() {
                        paragraph.push_str(&text);
                    }
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text_element = false,
                b"p" => {
                    let line = paragraph.trim();
                    if !line.is_empty() {
                        lines.push(line.to_string());
                    }
                    paragraph.clear();
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                tracing::debug!("Malformed slide XML: {}", e);
                break;
            }
            _ => {}
        }
    }

    let tail = paragraph.trim();
    if !tail.is_empty() {
        lines.push(tail.to_string());
    }

    lines.join("\n")
}

/// Decode text bytes, reporting which encoding was used
fn decode_text(data: &[u8]) -> (String, &'static str) {
    if let Some(rest) = data.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return (String::from_utf8_lossy(rest).into_owned(), "utf-8-sig");
    }
    if let Some(rest) = data.strip_prefix(&[0xFF, 0xFE]) {
        return (decode_utf16(rest, u16::from_le_bytes), "utf-16le");
    }
    if let Some(rest) = data.strip_prefix(&[0xFE, 0xFF]) {
        return (decode_utf16(rest, u16::from_be_bytes), "utf-16be");
    }
    match std::str::from_utf8(data) {
        Ok(text) => (text.to_string(), "utf-8"),
        // every byte maps to the code point of the same value
        Err(_) => (data.iter().map(|&b| b as char).collect(), "latin-1"),
    }
}

fn decode_utf16(data: &[u8], to_unit: fn([u8; 2]) -> u16) -> String {
    let units = data.chunks_exact(2).map(|pair| to_unit([pair[0], pair[1]]));
    char::decode_utf16(units)
        .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

/// Replace ligatures and odd spaces that PDF fonts commonly produce
fn normalize_pdf_text(text: &str) -> String {
    text.replace('\0', "")
        .replace('\u{00A0}', " ")
        .replace('\u{FB00}', "ff")
        .replace('\u{FB01}', "fi")
        .replace('\u{FB02}', "fl")
        .replace('\u{FB03}', "ffi")
        .replace('\u{FB04}', "ffl")
}

/// Hash content for deduplication
pub fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Small in-memory documents for parser and pipeline tests

    use std::io::{Cursor, Write};

    pub fn pdf(pages: &[&str]) -> Vec<u8> {
        use lopdf::content::{Content, Operation};
        use lopdf::{dictionary, Document, Object, Stream};

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids = Vec::new();
        for text in pages {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id =
                doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    pub fn docx(paragraphs: &[&str], table: &[&[&str]]) -> Vec<u8> {
        use docx_rs::{Docx, Paragraph, Run, Table, TableCell, TableRow};

        let mut docx = Docx::new();
        for text in paragraphs {
            docx = docx.add_paragraph(Paragraph::new().add_run(Run::new().add_text(*text)));
        }
        if !table.is_empty() {
            let rows = table
                .iter()
                .map(|row| {
                    TableRow::new(
                        row.iter()
                            .map(|cell| {
                                TableCell::new().add_paragraph(
                                    Paragraph::new().add_run(Run::new().add_text(*cell)),
                                )
                            })
                            .collect(),
                    )
                })
                .collect();
            docx = docx.add_table(Table::new(rows));
        }

        let mut cursor = Cursor::new(Vec::new());
        docx.build().pack(&mut cursor).unwrap();
        cursor.into_inner()
    }

    pub fn pptx(slides: &[&[&str]]) -> Vec<u8> {
        use zip::write::SimpleFileOptions;

        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (i, paragraphs) in slides.iter().enumerate() {
            let body: String = paragraphs
                .iter()
                .map(|p| format!("<a:p><a:r><a:t>{}</a:t></a:r></a:p>", p))
                .collect();
            let xml = format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:spTree><p:sp><p:txBody>{}</p:txBody></p:sp></p:spTree></p:cSld></p:sld>"#,
                body
            );
            zip.start_file(format!("ppt/slides/slide{}.xml", i + 1), SimpleFileOptions::default())
                .unwrap();
            zip.write_all(xml.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_txt_utf8() {
        let parsed = FileParser::parse("notes.txt", "Photosynthesis converts light.".as_bytes()).unwrap();
        assert_eq!(parsed.file_type, FileType::Txt);
        assert_eq!(parsed.content, "Photosynthesis converts light.");
        assert_eq!(parsed.content_hash, hash_content("Photosynthesis converts light."));
        assert_eq!(parsed.metadata["encoding"], "utf-8");
    }

    #[test]
    fn test_parse_txt_fallbacks() {
        let mut utf16 = vec![0xFF, 0xFE];
        for unit in "Café".encode_utf16() {
            utf16.extend_from_slice(&unit.to_le_bytes());
        }
        let parsed = FileParser::parse("a.txt", &utf16).unwrap();
        assert_eq!(parsed.content, "Café");

        let latin1 = [b'C', b'a', b'f', 0xE9];
        let parsed = FileParser::parse("b.txt", &latin1).unwrap();
        assert_eq!(parsed.content, "Café");
        assert_eq!(parsed.metadata["encoding"], "latin-1");
    }

    #[test]
    fn test_unsupported_extension() {
        let err = FileParser::parse("virus.exe", b"MZ").unwrap_err();
        assert!(matches!(err, Error::UnsupportedFileType(ext) if ext == "exe"));
    }

    #[test]
    fn test_parse_pdf_pages() {
        let data = fixtures::pdf(&["Cells divide by mitosis", "Meiosis makes gametes"]);
        let parsed = FileParser::parse("biology.pdf", &data).unwrap();
        assert_eq!(parsed.total_pages, Some(2));
        assert!(parsed.content.contains("--- Page 1 ---"));
        assert!(parsed.content.contains("mitosis"));
        assert!(parsed.content.contains("gametes"));
    }

    #[test]
    fn test_parse_docx_paragraphs_and_tables() {
        let data = fixtures::docx(
            &["Chapter 1", "", "Supervised learning uses labels."],
            &[&["Term", "Meaning"], &["SVM", " Support vector machine "]],
        );
        let parsed = FileParser::parse("ml.docx", &data).unwrap();
        assert_eq!(
            parsed.content,
            "Chapter 1\nSupervised learning uses labels.\nTerm | Meaning\nSVM | Support vector machine\n"
        );
    }

    #[test]
    fn test_parse_pptx_slides_in_numeric_order() {
        let slides: Vec<&[&str]> = (1..=11)
            .map(|i| -> &[&str] { if i == 10 { &["Tenth slide"] } else { &["Some slide"] } })
            .collect();
        let data = fixtures::pptx(&slides);
        let parsed = FileParser::parse("deck.pptx", &data).unwrap();
        assert_eq!(parsed.total_pages, Some(11));
        let tenth = parsed.content.find("--- Slide 10 ---\nTenth slide").unwrap();
        let ninth = parsed.content.find("--- Slide 9 ---").unwrap();
        assert!(ninth < tenth);
    }

    #[test]
    fn test_pptx_xml_paragraph_lines() {
        let xml = r#"<p:sld xmlns:a="a" xmlns:p="p"><a:p><a:r><a:t>Hello</a:t></a:r><a:r><a:t> world</a:t></a:r></a:p><a:p><a:r><a:t>R &amp; D</a:t></a:r></a:p></p:sld>"#;
        assert_eq!(extract_text_from_pptx_xml(xml), "Hello world\nR & D");
    }
}
