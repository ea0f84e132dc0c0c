//! Minimal PDF 1.4 encoder emitting the document in chunks.
//!
//! Every draw command becomes its own content stream object, so a chunk can
//! be written out as soon as the command is encoded. Pages are closed when
//! the next line would cross the bottom margin. The output carries no
//! timestamps or ids, so equal input always encodes to equal bytes.
//!
//! All text is set in the standard Helvetica font with WinAnsi encoding.
//! Printable ASCII and Latin-1 (U+00A0 to U+00FF) are written as-is;
//! any other character is replaced with `?`. Widths are approximated
//! rather than taken from font metrics.

use std::fmt::Write as _;

use crate::layout::DrawCommand;

const PAGE_WIDTH: u32 = 612;
const PAGE_HEIGHT: u32 = 792;
const MARGIN: f64 = 72.0;
const LINE_SPACING: f64 = 1.2;
const BLANK_SIZE: u16 = 12;

const CATALOG_OBJ: usize = 1;
const PAGES_OBJ: usize = 2;
const FONT_OBJ: usize = 3;

/// Incremental PDF writer tracking byte offsets for the cross-reference table.
#[derive(Debug)]
pub struct PdfEncoder {
    written: usize,
    /// Byte offset of each object, indexed by object number - 1.
    offsets: Vec<usize>,
    pages: Vec<usize>,
    current_contents: Vec<usize>,
    cursor_y: f64,
}

impl Default for PdfEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfEncoder {
    pub fn new() -> Self {
        Self {
            written: 0,
            offsets: Vec::new(),
            pages: Vec::new(),
            current_contents: Vec::new(),
            cursor_y: f64::from(PAGE_HEIGHT) - MARGIN,
        }
    }

    /// File header plus the catalog and font objects.
    pub fn begin(&mut self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");
        self.written += out.len();

        self.object(
            &mut out,
            CATALOG_OBJ,
            &format!("<< /Type /Catalog /Pages {PAGES_OBJ} 0 R >>"),
        );
        // Object 2 (the page tree) is written last, once all pages are known.
        self.offsets.push(0);
        self.object(
            &mut out,
            FONT_OBJ,
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>",
        );
        out
    }

    /// Encodes one draw command, closing the current page first if it is full.
    pub fn draw(&mut self, command: &DrawCommand) -> Vec<u8> {
        let mut out = Vec::new();
        let size = match command {
            DrawCommand::Text { size, .. } => *size,
            DrawCommand::Blank => BLANK_SIZE,
        };
        let advance = f64::from(size) * LINE_SPACING;

        if self.cursor_y - advance < MARGIN && !self.current_contents.is_empty() {
            self.close_page(&mut out);
        }
        self.cursor_y -= advance;

        if let DrawCommand::Text {
            size,
            underline,
            text,
        } = command
        {
            let mut content = format!(
                "BT /F1 {size} Tf {MARGIN:.2} {y:.2} Td ({text}) Tj ET\n",
                y = self.cursor_y,
                text = escape_text(text),
            );
            if *underline {
                let width = text_width(text, *size);
                let y = self.cursor_y - 3.0;
                let _ = writeln!(
                    content,
                    "1 w {MARGIN:.2} {y:.2} m {end:.2} {y:.2} l S",
                    end = MARGIN + width,
                );
            }
            let id = self.next_id();
            self.stream(&mut out, id, content.as_bytes());
            self.current_contents.push(id);
        }
        out
    }

    /// Closes the last page and writes the page tree, xref table and trailer.
    pub fn finish(mut self) -> Vec<u8> {
        let mut out = Vec::new();
        if !self.current_contents.is_empty() || self.pages.is_empty() {
            self.close_page(&mut out);
        }

        let kids = self
            .pages
            .iter()
            .map(|id| format!("{id} 0 R"))
            .collect::<Vec<_>>()
            .join(" ");
        let pages = format!(
            "<< /Type /Pages /Kids [{kids}] /Count {} >>",
            self.pages.len()
        );
        self.object(&mut out, PAGES_OBJ, &pages);

        let xref_offset = self.written;
        let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", self.offsets.len() + 1);
        for offset in &self.offsets {
            let _ = writeln!(xref, "{offset:010} 00000 n ");
        }
        let _ = write!(
            xref,
            "trailer\n<< /Size {} /Root {CATALOG_OBJ} 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n",
            self.offsets.len() + 1
        );
        out.extend_from_slice(xref.as_bytes());
        out
    }

    fn close_page(&mut self, out: &mut Vec<u8>) {
        let contents = self
            .current_contents
            .drain(..)
            .map(|id| format!("{id} 0 R"))
            .collect::<Vec<_>>()
            .join(" ");
        let id = self.next_id();
        self.object(
            out,
            id,
            &format!(
                "<< /Type /Page /Parent {PAGES_OBJ} 0 R /MediaBox [0 0 {PAGE_WIDTH} {PAGE_HEIGHT}] \
                 /Resources << /Font << /F1 {FONT_OBJ} 0 R >> >> /Contents [{contents}] >>"
            ),
        );
        self.pages.push(id);
        self.cursor_y = f64::from(PAGE_HEIGHT) - MARGIN;
    }

    fn next_id(&mut self) -> usize {
        self.offsets.push(0);
        self.offsets.len()
    }

    fn record_offset(&mut self, id: usize) {
        if self.offsets.len() < id {
            self.offsets.resize(id, 0);
        }
        self.offsets[id - 1] = self.written;
    }

    fn object(&mut self, out: &mut Vec<u8>, id: usize, body: &str) {
        self.record_offset(id);
        let encoded = format!("{id} 0 obj\n{body}\nendobj\n");
        self.written += encoded.len();
        out.extend_from_slice(encoded.as_bytes());
    }

    fn stream(&mut self, out: &mut Vec<u8>, id: usize, data: &[u8]) {
        self.record_offset(id);
        let head = format!("{id} 0 obj\n<< /Length {} >>\nstream\n", data.len());
        let tail = b"\nendstream\nendobj\n";
        out.extend_from_slice(head.as_bytes());
        out.extend_from_slice(data);
        out.extend_from_slice(tail);
        self.written += head.len() + data.len() + tail.len();
    }
}

/// Escapes a string for a PDF literal, mapping it to WinAnsi (Latin-1) bytes.
fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' | '(' | ')' => {
                escaped.push('\\');
                escaped.push(c);
            }
            ' '..='~' => escaped.push(c),
            '\u{a0}'..='\u{ff}' => {
                let _ = write!(escaped, "\\{:03o}", c as u32);
            }
            _ => escaped.push('?'),
        }
    }
    escaped
}

/// Approximate Helvetica advance width.
fn text_width(text: &str, size: u16) -> f64 {
    text.chars().count() as f64 * f64::from(size) * 0.5
}

/// Lazily yields the encoded chunks of a document: header, one chunk per
/// draw command, then the trailer.
pub struct PdfChunks<'a> {
    encoder: Option<PdfEncoder>,
    commands: std::slice::Iter<'a, DrawCommand>,
    started: bool,
}

impl<'a> PdfChunks<'a> {
    pub fn new(commands: &'a [DrawCommand]) -> Self {
        Self {
            encoder: Some(PdfEncoder::new()),
            commands: commands.iter(),
            started: false,
        }
    }
}

impl Iterator for PdfChunks<'_> {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Self::Item> {
        let encoder = self.encoder.as_mut()?;
        if !self.started {
            self.started = true;
            return Some(encoder.begin());
        }
        match self.commands.next() {
            Some(command) => Some(encoder.draw(command)),
            None => self.encoder.take().map(PdfEncoder::finish),
        }
    }
}

/// Encodes a whole document into memory.
pub fn encode_pdf(commands: &[DrawCommand]) -> Vec<u8> {
    PdfChunks::new(commands).flatten().collect()
}
