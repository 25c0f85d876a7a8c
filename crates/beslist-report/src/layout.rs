//! Block layout on A4 pages.

use std::path::{Path, PathBuf};

use printpdf::{
    image_crate, BuiltinFont, Image, ImageTransform, IndirectFontRef, Mm, PdfDocument,
    PdfDocumentReference, PdfLayerReference,
};

use crate::error::ReportError;

pub const PAGE_WIDTH: f32 = 210.0;
pub const PAGE_HEIGHT: f32 = 297.0;
pub const MARGIN: f32 = 20.0;
pub const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;

pub const SCREENSHOT_HEIGHT: f32 = 110.0;
const PAIR_GAP: f32 = 6.0;
const IMAGE_DPI: f32 = 300.0;
const PT_TO_MM: f32 = 0.3528;

pub const PLACEHOLDER_TEXT: &str = "Screenshot not available";

/// One unit of report content, laid out top to bottom.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Title(String),
    Heading(String),
    Text(String),
    /// A full-width screenshot, or the placeholder when `None`.
    Screenshot(Option<PathBuf>),
    /// Two labelled screenshots side by side.
    Pair {
        left_label: String,
        left: Option<PathBuf>,
        right_label: String,
        right: Option<PathBuf>,
    },
    Spacer(f32),
    PageBreak,
}

impl Block {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }
}

/// Scales an image uniformly so it fits inside the box, preserving its
/// aspect ratio. Degenerate sizes yield `(0, 0)`.
#[must_use]
pub fn fit_within(img_w: f32, img_h: f32, box_w: f32, box_h: f32) -> (f32, f32) {
    if img_w <= 0.0 || img_h <= 0.0 || box_w <= 0.0 || box_h <= 0.0 {
        return (0.0, 0.0);
    }
    let scale = (box_w / img_w).min(box_h / img_h);
    (img_w * scale, img_h * scale)
}

/// Greedy word wrap at `max_chars` per line. Words longer than a line are
/// split.
#[must_use]
pub fn wrap(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let rest = word.split_off(max_chars);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        let word: String = word.into_iter().collect();
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Renders blocks into a PDF and returns its bytes.
///
/// # Errors
///
/// Returns [`ReportError::Pdf`] if the document cannot be assembled.
pub fn render(title: &str, blocks: &[Block]) -> Result<Vec<u8>, ReportError> {
    let mut writer = PdfWriter::new(title)?;
    for block in blocks {
        writer.block(block);
    }
    writer.finish()
}

struct PdfWriter {
    doc: PdfDocumentReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    layer: PdfLayerReference,
    y: f32,
    page_has_content: bool,
}

impl PdfWriter {
    fn new(title: &str) -> Result<Self, ReportError> {
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| ReportError::Pdf(format!("{e:?}")))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| ReportError::Pdf(format!("{e:?}")))?;
        let layer = doc.get_page(page).get_layer(layer);
        Ok(Self {
            doc,
            regular,
            bold,
            layer,
            y: PAGE_HEIGHT - MARGIN,
            page_has_content: false,
        })
    }

    fn new_page(&mut self) {
        let (page, layer) = self
            .doc
            .add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = PAGE_HEIGHT - MARGIN;
        self.page_has_content = false;
    }

    fn ensure(&mut self, height: f32) {
        if self.y - height < MARGIN {
            self.new_page();
        }
    }

    fn block(&mut self, block: &Block) {
        match block {
            Block::Title(text) => self.lines(text, 18.0, true),
            Block::Heading(text) => {
                self.y -= 2.0;
                self.lines(text, 13.0, true);
            }
            Block::Text(text) => self.lines(text, 10.0, false),
            Block::Screenshot(path) => {
                self.ensure(SCREENSHOT_HEIGHT + 2.0);
                let top = self.y - 2.0;
                self.image_box(path.as_deref(), MARGIN, top, CONTENT_WIDTH, SCREENSHOT_HEIGHT);
                self.y = top - SCREENSHOT_HEIGHT - 2.0;
                self.page_has_content = true;
            }
            Block::Pair {
                left_label,
                left,
                right_label,
                right,
            } => {
                let half = (CONTENT_WIDTH - PAIR_GAP) / 2.0;
                let label_height = line_height(11.0);
                self.ensure(label_height + SCREENSHOT_HEIGHT + 2.0);
                let baseline = self.y - label_height;
                self.layer
                    .use_text(left_label.as_str(), 11.0, Mm(MARGIN), Mm(baseline), &self.bold);
                self.layer.use_text(
                    right_label.as_str(),
                    11.0,
                    Mm(MARGIN + half + PAIR_GAP),
                    Mm(baseline),
                    &self.bold,
                );
                let top = baseline - 2.0;
                self.image_box(left.as_deref(), MARGIN, top, half, SCREENSHOT_HEIGHT);
                self.image_box(
                    right.as_deref(),
                    MARGIN + half + PAIR_GAP,
                    top,
                    half,
                    SCREENSHOT_HEIGHT,
                );
                self.y = top - SCREENSHOT_HEIGHT - 2.0;
                self.page_has_content = true;
            }
            Block::Spacer(height) => self.y -= height,
            Block::PageBreak => {
                if self.page_has_content {
                    self.new_page();
                }
            }
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn lines(&mut self, text: &str, size: f32, bold: bool) {
        // Helvetica averages about half an em per character.
        let max_chars = (CONTENT_WIDTH / (size * PT_TO_MM * 0.5)) as usize;
        let height = line_height(size);
        for line in wrap(text, max_chars) {
            self.ensure(height);
            self.y -= height;
            let font = if bold { &self.bold } else { &self.regular };
            self.layer.use_text(line, size, Mm(MARGIN), Mm(self.y), font);
            self.page_has_content = true;
        }
    }

    /// Draws the image centred in the box whose top-left corner is
    /// `(x, top)`, or the placeholder text when it is missing or unreadable.
    fn image_box(&self, path: Option<&Path>, x: f32, top: f32, box_w: f32, box_h: f32) {
        let loaded = path.and_then(|p| match image_crate::open(p) {
            Ok(img) => Some(img),
            Err(e) => {
                tracing::warn!(path = %p.display(), error = %e, "screenshot unreadable; using placeholder");
                None
            }
        });

        let Some(img) = loaded else {
            self.layer.use_text(
                PLACEHOLDER_TEXT,
                11.0,
                Mm(x + 4.0),
                Mm(top - box_h / 2.0),
                &self.regular,
            );
            return;
        };

        let buffer = img.to_rgb8();
        #[allow(clippy::cast_precision_loss)]
        let (px_w, px_h) = (buffer.width() as f32, buffer.height() as f32);
        let rgb = image_crate::DynamicImage::ImageRgb8(buffer);
        let (w, h) = fit_within(px_w, px_h, box_w, box_h);
        if w <= 0.0 || h <= 0.0 {
            return;
        }
        let natural_w = px_w / IMAGE_DPI * 25.4;
        let natural_h = px_h / IMAGE_DPI * 25.4;

        Image::from_dynamic_image(&rgb).add_to_layer(
            self.layer.clone(),
            ImageTransform {
                translate_x: Some(Mm(x + (box_w - w) / 2.0)),
                translate_y: Some(Mm(top - box_h + (box_h - h) / 2.0)),
                scale_x: Some(w / natural_w),
                scale_y: Some(h / natural_h),
                dpi: Some(IMAGE_DPI),
                ..Default::default()
            },
        );
    }

    fn finish(self) -> Result<Vec<u8>, ReportError> {
        self.doc
            .save_to_bytes()
            .map_err(|e| ReportError::Pdf(format!("{e:?}")))
    }
}

fn line_height(size: f32) -> f32 {
    size * PT_TO_MM * 1.4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wide_image_is_limited_by_width() {
        let (w, h) = fit_within(1920.0, 1080.0, 170.0, 110.0);
        assert!((w - 170.0).abs() < 1e-3);
        assert!((h - 95.625).abs() < 1e-3);
    }

    #[test]
    fn tall_image_is_limited_by_height() {
        let (w, h) = fit_within(1000.0, 4000.0, 170.0, 110.0);
        assert!((h - 110.0).abs() < 1e-3);
        assert!((w - 27.5).abs() < 1e-3);
    }

    #[test]
    fn aspect_ratio_is_preserved() {
        let (w, h) = fit_within(800.0, 600.0, 82.0, 110.0);
        assert!((w / h - 800.0 / 600.0).abs() < 1e-4);
    }

    #[test]
    fn degenerate_sizes_fit_to_nothing() {
        assert_eq!(fit_within(0.0, 100.0, 170.0, 110.0), (0.0, 0.0));
        assert_eq!(fit_within(100.0, 100.0, 0.0, 110.0), (0.0, 0.0));
    }

    #[test]
    fn wrap_breaks_on_words() {
        assert_eq!(
            wrap("the quick brown fox jumps", 10),
            vec!["the quick", "brown fox", "jumps"]
        );
    }

    #[test]
    fn wrap_splits_overlong_words() {
        assert_eq!(
            wrap("https://www.beslist.nl/p/x", 10),
            vec!["https://ww", "w.beslist.", "nl/p/x"]
        );
    }

    #[test]
    fn wrap_of_blank_text_is_empty() {
        assert!(wrap("   ", 10).is_empty());
    }
}
