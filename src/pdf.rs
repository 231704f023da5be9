use std::io::BufWriter;

use printpdf::*;

use crate::error::{Result, TallyError};
use crate::exporter::{ReportDocument, REPORT_HEADERS};

// US Letter dimensions (mm)
const PAGE_W: f32 = 215.9;
const PAGE_H: f32 = 279.4;
const MARGIN_TOP: f32 = 25.4;
const MARGIN_BOTTOM: f32 = 25.4;
const MARGIN_LEFT: f32 = 19.05;
const MARGIN_RIGHT: f32 = 19.05;
const ROW_H: f32 = 5.3;
const FONT_SIZE: f32 = 9.0;
const HEADER_SIZE: f32 = 10.0;
const TITLE_SIZE: f32 = 16.0;
const SUBTITLE_SIZE: f32 = 10.0;

fn approx_text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * 0.18
}

#[derive(Clone, Copy)]
enum Align {
    Left,
    Right,
}

struct Col {
    width: f32,
    align: Align,
}

const COLUMNS: [Col; 5] = [
    Col { width: 25.0, align: Align::Left },
    Col { width: 21.0, align: Align::Left },
    Col { width: 42.0, align: Align::Left },
    Col { width: 55.0, align: Align::Left },
    Col { width: 34.8, align: Align::Right },
];

struct PdfWriter {
    doc: PdfDocumentReference,
    font: IndirectFontRef,
    font_bold: IndirectFontRef,
    current_page: PdfPageIndex,
    current_layer: PdfLayerIndex,
    y: f32,
}

impl PdfWriter {
    fn new(title: &str) -> Result<Self> {
        let (doc, page, layer) = PdfDocument::new(title, Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| TallyError::Pdf(format!("{e:?}")))?;
        let font_bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| TallyError::Pdf(format!("{e:?}")))?;
        Ok(Self {
            doc,
            font,
            font_bold,
            current_page: page,
            current_layer: layer,
            y: MARGIN_TOP,
        })
    }

    fn pdf_y(&self) -> f32 {
        PAGE_H - self.y
    }

    fn new_page(&mut self) {
        let (page, layer) = self.doc.add_page(Mm(PAGE_W), Mm(PAGE_H), "Layer");
        self.current_page = page;
        self.current_layer = layer;
        self.y = MARGIN_TOP;
    }

    /// Returns true when a page break was needed.
    fn ensure_space(&mut self, needed: f32) -> bool {
        if self.y + needed > PAGE_H - MARGIN_BOTTOM {
            self.new_page();
            return true;
        }
        false
    }

    fn text(&self, s: &str, x: f32, size: f32, bold: bool) {
        let font = if bold { &self.font_bold } else { &self.font };
        let layer = self.doc.get_page(self.current_page).get_layer(self.current_layer);
        layer.use_text(s, size, Mm(x), Mm(self.pdf_y()), font);
    }

    fn hline(&self, x1: f32, x2: f32) {
        let layer = self.doc.get_page(self.current_page).get_layer(self.current_layer);
        layer.set_outline_thickness(0.5);
        let line = Line {
            points: vec![
                (Point::new(Mm(x1), Mm(self.pdf_y())), false),
                (Point::new(Mm(x2), Mm(self.pdf_y())), false),
            ],
            is_closed: false,
        };
        layer.add_line(line);
    }

    fn header(&mut self, title: &str, generated: &str) {
        self.text(title, MARGIN_LEFT, TITLE_SIZE, true);
        self.y += 7.0;
        self.text(generated, MARGIN_LEFT, SUBTITLE_SIZE, false);
        self.y += 8.0;
    }

    fn cells(&self, values: &[&str], size: f32, bold: bool) {
        let mut x = MARGIN_LEFT;
        for (col, value) in COLUMNS.iter().zip(values) {
            match col.align {
                Align::Left => self.text(value, x, size, bold),
                Align::Right => {
                    let tw = approx_text_width(value, size);
                    self.text(value, x + col.width - tw, size, bold);
                }
            }
            x += col.width;
        }
    }

    fn table_header(&mut self) {
        self.ensure_space(ROW_H * 2.0);
        self.cells(&REPORT_HEADERS, HEADER_SIZE, true);
        self.y += 3.0;
        self.hline(MARGIN_LEFT, PAGE_W - MARGIN_RIGHT);
        self.y += ROW_H;
    }

    fn table_row(&mut self, values: &[&str]) {
        if self.ensure_space(ROW_H) {
            self.table_header();
        }
        self.cells(values, FONT_SIZE, false);
        self.y += ROW_H;
    }

    fn footer_line(&mut self, text: &str) {
        self.ensure_space(ROW_H * 2.0);
        self.hline(MARGIN_LEFT, PAGE_W - MARGIN_RIGHT);
        self.y += ROW_H;
        self.text(text, MARGIN_LEFT, FONT_SIZE, true);
        self.y += ROW_H;
    }

    fn to_bytes(self) -> Result<Vec<u8>> {
        let mut buf = BufWriter::new(Vec::new());
        self.doc
            .save(&mut buf)
            .map_err(|e| TallyError::Pdf(format!("{e:?}")))?;
        buf.into_inner().map_err(|e| TallyError::Pdf(e.to_string()))
    }
}

/// One line per record; the column header repeats on every page.
pub fn render_report(doc: &ReportDocument) -> Result<Vec<u8>> {
    let mut pdf = PdfWriter::new(&doc.title)?;
    pdf.header(&doc.title, &doc.generated);
    pdf.table_header();
    for row in &doc.rows {
        let values: Vec<&str> = row.iter().map(String::as_str).collect();
        pdf.table_row(&values);
    }
    pdf.footer_line(&doc.summary());
    pdf.to_bytes()
}
