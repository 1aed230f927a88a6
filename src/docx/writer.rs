// src/docx/writer.rs

use std::io::{Cursor, Write};

use quick_xml::{
    Writer,
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
};
use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

use super::{Block, Document, ExportError, ParagraphKind, Run, Table};

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const R_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Usable width of an A4 page with 1" margins, in twentieths of a point.
const TEXT_WIDTH_TWIPS: usize = 9026;
const HEADER_FILL: &str = "1565C0";
const HEADER_TEXT: &str = "FFFFFF";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/></Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const DOCUMENT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:docDefaults><w:rPrDefault><w:rPr><w:rFonts w:ascii="Calibri" w:hAnsi="Calibri" w:cs="Calibri" w:eastAsia="Calibri"/><w:sz w:val="22"/><w:szCs w:val="22"/></w:rPr></w:rPrDefault><w:pPrDefault><w:pPr><w:spacing w:after="100" w:line="264" w:lineRule="auto"/></w:pPr></w:pPrDefault></w:docDefaults><w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/></w:style><w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:pPr><w:keepNext/><w:spacing w:before="240" w:after="300"/><w:outlineLvl w:val="0"/></w:pPr><w:rPr><w:b/><w:sz w:val="32"/></w:rPr></w:style><w:style w:type="paragraph" w:styleId="Heading2"><w:name w:val="heading 2"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:pPr><w:keepNext/><w:spacing w:before="300" w:after="150"/><w:outlineLvl w:val="1"/></w:pPr><w:rPr><w:b/><w:sz w:val="26"/></w:rPr></w:style><w:style w:type="paragraph" w:styleId="Heading3"><w:name w:val="heading 3"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:pPr><w:keepNext/><w:spacing w:before="200" w:after="100"/><w:outlineLvl w:val="2"/></w:pPr><w:rPr><w:b/><w:sz w:val="24"/></w:rPr></w:style><w:style w:type="paragraph" w:styleId="Heading4"><w:name w:val="heading 4"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:pPr><w:keepNext/><w:spacing w:before="160" w:after="80"/><w:outlineLvl w:val="3"/></w:pPr><w:rPr><w:b/><w:i/><w:sz w:val="22"/></w:rPr></w:style><w:style w:type="table" w:styleId="TableGrid"><w:name w:val="Table Grid"/><w:tblPr><w:tblBorders><w:top w:val="single" w:sz="4" w:space="0" w:color="999999"/><w:left w:val="single" w:sz="4" w:space="0" w:color="999999"/><w:bottom w:val="single" w:sz="4" w:space="0" w:color="999999"/><w:right w:val="single" w:sz="4" w:space="0" w:color="999999"/><w:insideH w:val="single" w:sz="4" w:space="0" w:color="999999"/><w:insideV w:val="single" w:sz="4" w:space="0" w:color="999999"/></w:tblBorders><w:tblCellMar><w:left w:w="108" w:type="dxa"/><w:right w:w="108" w:type="dxa"/></w:tblCellMar></w:tblPr></w:style></w:styles>"#;

fn xml_err<E: std::fmt::Display>(e: E) -> ExportError {
    ExportError::Xml(e.to_string())
}

/// Thin helper over `quick_xml::Writer` for WordprocessingML elements.
struct Xml {
    inner: Writer<Vec<u8>>,
}

impl Xml {
    fn new() -> Self {
        Self {
            inner: Writer::new(Vec::new()),
        }
    }

    fn decl(&mut self) -> Result<(), ExportError> {
        self.inner
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))
            .map_err(xml_err)
    }

    fn start(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), ExportError> {
        let mut elem = BytesStart::new(name);
        for &attr in attrs {
            elem.push_attribute(attr);
        }
        self.inner.write_event(Event::Start(elem)).map_err(xml_err)
    }

    fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), ExportError> {
        let mut elem = BytesStart::new(name);
        for &attr in attrs {
            elem.push_attribute(attr);
        }
        self.inner.write_event(Event::Empty(elem)).map_err(xml_err)
    }

    fn end(&mut self, name: &str) -> Result<(), ExportError> {
        self.inner
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(xml_err)
    }

    fn text(&mut self, text: &str) -> Result<(), ExportError> {
        self.inner
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(xml_err)
    }

    fn into_bytes(self) -> Vec<u8> {
        self.inner.into_inner()
    }
}

/// Serializes `doc` as a `.docx` archive.
pub fn write_docx(doc: &Document) -> Result<Vec<u8>, ExportError> {
    let body = document_xml(doc)?;

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, content) in [
        ("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
        ("_rels/.rels", PACKAGE_RELS.as_bytes()),
        ("word/_rels/document.xml.rels", DOCUMENT_RELS.as_bytes()),
        ("word/styles.xml", STYLES.as_bytes()),
        ("word/document.xml", body.as_slice()),
    ] {
        zip.start_file(name, options)?;
        zip.write_all(content)?;
    }

    Ok(zip.finish()?.into_inner())
}

fn document_xml(doc: &Document) -> Result<Vec<u8>, ExportError> {
    let mut xml = Xml::new();
    xml.decl()?;
    xml.start("w:document", &[("xmlns:w", W_NS), ("xmlns:r", R_NS)])?;
    xml.start("w:body", &[])?;

    for block in &doc.blocks {
        match block {
            Block::Heading { level, runs } => {
                let style = format!("Heading{}", (*level).clamp(1, 4));
                let align = (*level == 1).then_some("center");
                paragraph(&mut xml, Some(&style), align, false, runs)?;
            }
            Block::Paragraph { kind, runs } => match kind {
                ParagraphKind::Body => paragraph(&mut xml, None, None, false, runs)?,
                ParagraphKind::Bullet => paragraph(&mut xml, None, None, true, runs)?,
                ParagraphKind::Centered => paragraph(&mut xml, None, Some("center"), false, runs)?,
            },
            Block::Table(table) => {
                write_table(&mut xml, table)?;
                // Word merges adjacent tables without a paragraph between them.
                paragraph(&mut xml, None, None, false, &[])?;
            }
            Block::Spacer => paragraph(&mut xml, None, None, false, &[])?,
        }
    }

    xml.start("w:sectPr", &[])?;
    xml.empty("w:pgSz", &[("w:w", "11906"), ("w:h", "16838")])?;
    xml.empty(
        "w:pgMar",
        &[
            ("w:top", "1440"),
            ("w:right", "1440"),
            ("w:bottom", "1440"),
            ("w:left", "1440"),
            ("w:header", "708"),
            ("w:footer", "708"),
            ("w:gutter", "0"),
        ],
    )?;
    xml.end("w:sectPr")?;

    xml.end("w:body")?;
    xml.end("w:document")?;
    Ok(xml.into_bytes())
}

fn paragraph(
    xml: &mut Xml,
    style: Option<&str>,
    align: Option<&str>,
    bullet: bool,
    runs: &[Run],
) -> Result<(), ExportError> {
    xml.start("w:p", &[])?;

    if style.is_some() || align.is_some() || bullet {
        xml.start("w:pPr", &[])?;
        if let Some(style) = style {
            xml.empty("w:pStyle", &[("w:val", style)])?;
        }
        if bullet {
            xml.empty("w:ind", &[("w:left", "720"), ("w:hanging", "360")])?;
        }
        if let Some(align) = align {
            xml.empty("w:jc", &[("w:val", align)])?;
        }
        xml.end("w:pPr")?;
    }

    if bullet {
        run(xml, &Run::plain("•\t"))?;
    }
    for r in runs {
        run(xml, r)?;
    }

    xml.end("w:p")
}

fn run(xml: &mut Xml, run: &Run) -> Result<(), ExportError> {
    xml.start("w:r", &[])?;

    if run.bold || run.italic || run.size.is_some() || run.color.is_some() {
        xml.start("w:rPr", &[])?;
        if run.bold {
            xml.empty("w:b", &[])?;
        }
        if run.italic {
            xml.empty("w:i", &[])?;
        }
        if let Some(color) = run.color {
            xml.empty("w:color", &[("w:val", color)])?;
        }
        if let Some(size) = run.size {
            let size = size.to_string();
            xml.empty("w:sz", &[("w:val", &size)])?;
            xml.empty("w:szCs", &[("w:val", &size)])?;
        }
        xml.end("w:rPr")?;
    }

    // Tabs inside text are written as <w:tab/> so Word renders them.
    for (i, piece) in run.text.split('\t').enumerate() {
        if i > 0 {
            xml.empty("w:tab", &[])?;
        }
        if !piece.is_empty() {
            xml.start("w:t", &[("xml:space", "preserve")])?;
            xml.text(piece)?;
            xml.end("w:t")?;
        }
    }

    xml.end("w:r")
}

fn write_table(xml: &mut Xml, table: &Table) -> Result<(), ExportError> {
    let columns = table.column_count().max(1);
    let col_width = (TEXT_WIDTH_TWIPS / columns).to_string();

    xml.start("w:tbl", &[])?;
    xml.start("w:tblPr", &[])?;
    xml.empty("w:tblStyle", &[("w:val", "TableGrid")])?;
    xml.empty("w:tblW", &[("w:w", "5000"), ("w:type", "pct")])?;
    xml.empty("w:tblLayout", &[("w:type", "fixed")])?;
    xml.end("w:tblPr")?;

    xml.start("w:tblGrid", &[])?;
    for _ in 0..columns {
        xml.empty("w:gridCol", &[("w:w", &col_width)])?;
    }
    xml.end("w:tblGrid")?;

    table_row(xml, &table.header, columns, &col_width, true)?;
    for row in &table.rows {
        table_row(xml, row, columns, &col_width, false)?;
    }

    xml.end("w:tbl")
}

fn table_row(
    xml: &mut Xml,
    cells: &[String],
    columns: usize,
    col_width: &str,
    header: bool,
) -> Result<(), ExportError> {
    xml.start("w:tr", &[])?;
    if header {
        xml.start("w:trPr", &[])?;
        xml.empty("w:tblHeader", &[])?;
        xml.end("w:trPr")?;
    }

    for column in 0..columns {
        xml.start("w:tc", &[])?;
        xml.start("w:tcPr", &[])?;
        xml.empty("w:tcW", &[("w:w", col_width), ("w:type", "dxa")])?;
        if header {
            xml.empty(
                "w:shd",
                &[("w:val", "clear"), ("w:color", "auto"), ("w:fill", HEADER_FILL)],
            )?;
        }
        xml.end("w:tcPr")?;

        let text = Table::cell(cells, column);
        let cell_run = if header {
            Run::bold(text).sized(20).colored(HEADER_TEXT)
        } else {
            Run::plain(text).sized(20)
        };
        let runs = if text.is_empty() { Vec::new() } else { vec![cell_run] };
        paragraph(xml, None, None, false, &runs)?;

        xml.end("w:tc")?;
    }

    xml.end("w:tr")
}
