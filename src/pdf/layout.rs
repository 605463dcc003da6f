use printpdf::{
  BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference,
  PdfLayerReference, Point, Rgb,
};

use crate::error::AppError;

pub const PAGE_WIDTH: f32 = 210.0;
pub const PAGE_HEIGHT: f32 = 297.0;
pub const MARGIN: f32 = 20.0;
pub const TOP: f32 = PAGE_HEIGHT - 25.0;
pub const BOTTOM: f32 = 30.0;
pub const FOOTER_Y: f32 = 14.0;
pub const LABEL_X: f32 = MARGIN;
pub const VALUE_X: f32 = 78.0;
pub const LINE_HEIGHT: f32 = 7.0;
pub const FONT_SIZE: f32 = 11.0;
const FOOTER_SIZE: f32 = 8.0;
const SEPARATOR_GAP: f32 = 4.0;
const LINE_WIDTH: f32 = 0.4;

// Approximate advance width of builtin Helvetica glyphs, in mm per pt of
// font size. Only feeds the wrapping budget, not exact placement.
const GLYPH_WIDTH_PER_PT: f32 = 0.5 * 0.352_778;

#[derive(Debug, Clone, Copy)]
pub struct TextStyle {
  pub size: f32,
  pub bold: bool,
}

impl TextStyle {
  pub const REGULAR: TextStyle = TextStyle { size: FONT_SIZE, bold: false };
  pub const EMPHASIS: TextStyle = TextStyle { size: 13.0, bold: true };
  pub const SMALL: TextStyle = TextStyle { size: 9.0, bold: false };
}

/// Cursor-based writer for the Eigenbeleg document. Holds the current page
/// layer, a downward-moving Y cursor and the pending footer text. Every
/// drawing primitive reserves its vertical space through `ensure_space`,
/// which is the only place a page break can happen.
pub struct BelegWriter {
  doc: PdfDocumentReference,
  layer: PdfLayerReference,
  font: IndirectFontRef,
  bold: IndirectFontRef,
  y: f32,
  pages: usize,
  footer: Option<String>,
  footers_drawn: usize,
}

impl BelegWriter {
  pub fn new(title: &str) -> Result<Self, AppError> {
    let (doc, page, layer) = PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Seite 1");
    let font = doc.add_builtin_font(BuiltinFont::Helvetica)?;
    let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold)?;

    let layer = doc.get_page(page).get_layer(layer);
    layer.set_outline_color(Color::Rgb(Rgb::new(0.2, 0.2, 0.2, None)));
    layer.set_outline_thickness(LINE_WIDTH);

    Ok(Self {
      doc,
      layer,
      font,
      bold,
      y: TOP,
      pages: 1,
      footer: None,
      footers_drawn: 0,
    })
  }

  pub fn page_count(&self) -> usize {
    self.pages
  }

  pub fn layer(&self) -> PdfLayerReference {
    self.layer.clone()
  }

  pub fn max_value_width(&self) -> f32 {
    PAGE_WIDTH - MARGIN - VALUE_X
  }

  pub fn set_footer(&mut self, text: &str) {
    self.footer = Some(text.to_string());
  }

  /// Breaks to a fresh page when the cursor plus `needed` would cross the
  /// bottom margin. The pending footer is flushed onto the page being left.
  pub fn ensure_space(&mut self, needed: f32) {
    if self.y - needed >= BOTTOM {
      return;
    }
    self.flush_footer();
    self.pages += 1;
    let (page, layer) = self.doc.add_page(
      Mm(PAGE_WIDTH),
      Mm(PAGE_HEIGHT),
      format!("Seite {}", self.pages),
    );
    self.layer = self.doc.get_page(page).get_layer(layer);
    self.layer.set_outline_color(Color::Rgb(Rgb::new(0.2, 0.2, 0.2, None)));
    self.layer.set_outline_thickness(LINE_WIDTH);
    self.y = TOP;
  }

  pub fn vertical_gap(&mut self, mm: f32) {
    self.ensure_space(mm);
    self.y -= mm;
  }

  /// Bold heading spanning the full line, e.g. the document title.
  pub fn heading(&mut self, text: &str, size: f32) {
    let line_h = line_height(size);
    self.ensure_space(line_h);
    self.layer.use_text(text, size, Mm(LABEL_X), Mm(self.y), &self.bold);
    self.y -= line_h;
  }

  /// Full-width wrapped text starting at the left margin.
  pub fn text_line(&mut self, text: &str, style: TextStyle) {
    let budget = max_chars(PAGE_WIDTH - 2.0 * MARGIN, style.size);
    let line_h = line_height(style.size);
    let font = if style.bold { self.bold.clone() } else { self.font.clone() };
    for line in wrap_text(text, budget) {
      self.ensure_space(line_h);
      self.layer.use_text(line, style.size, Mm(LABEL_X), Mm(self.y), &font);
      self.y -= line_h;
    }
  }

  /// Label in the left column, wrapped value in the right column. The label
  /// and the first value line share one space reservation so a page break
  /// can never separate them; continuation lines are checked one by one.
  pub fn label_value(&mut self, label: &str, value: &str, style: TextStyle) {
    let budget = max_chars(self.max_value_width(), style.size);
    let lines = wrap_text(value, budget);
    let line_h = line_height(style.size);
    let value_font = if style.bold { self.bold.clone() } else { self.font.clone() };

    let mut first = true;
    for line in lines {
      self.ensure_space(line_h);
      if first {
        self.layer.use_text(label, FONT_SIZE, Mm(LABEL_X), Mm(self.y), &self.bold);
        first = false;
      }
      self.layer.use_text(line, style.size, Mm(VALUE_X), Mm(self.y), &value_font);
      self.y -= line_h;
    }
  }

  /// Like `label_value`, but for caller-pre-wrapped lines (address blocks).
  pub fn label_block(&mut self, label: &str, lines: &[String]) {
    let line_h = line_height(FONT_SIZE);
    let mut first = true;
    for line in lines {
      self.ensure_space(line_h);
      if first {
        self.layer.use_text(label, FONT_SIZE, Mm(LABEL_X), Mm(self.y), &self.bold);
        first = false;
      }
      self.layer.use_text(line, FONT_SIZE, Mm(VALUE_X), Mm(self.y), &self.font);
      self.y -= line_h;
    }
    if first {
      // Empty block still shows the label.
      self.ensure_space(line_h);
      self.layer.use_text(label, FONT_SIZE, Mm(LABEL_X), Mm(self.y), &self.bold);
      self.y -= line_h;
    }
  }

  pub fn separator(&mut self) {
    self.ensure_space(SEPARATOR_GAP * 2.0);
    self.y -= SEPARATOR_GAP;
    self.rule(LABEL_X, PAGE_WIDTH - MARGIN, self.y);
    self.y -= SEPARATOR_GAP;
  }

  /// Short rule with a caption below, for the handwritten signature.
  pub fn signature_line(&mut self, caption: &str) {
    let line_h = line_height(TextStyle::SMALL.size);
    self.ensure_space(LINE_HEIGHT + line_h);
    self.y -= LINE_HEIGHT;
    self.rule(LABEL_X, LABEL_X + 70.0, self.y);
    self.y -= line_h;
    self.layer.use_text(caption, TextStyle::SMALL.size, Mm(LABEL_X), Mm(self.y), &self.font);
    self.y -= line_h;
  }

  pub fn finish(mut self) -> Result<Vec<u8>, AppError> {
    self.flush_footer();
    let bytes = self.doc.save_to_bytes()?;
    Ok(bytes)
  }

  fn flush_footer(&mut self) {
    if let Some(footer) = &self.footer {
      self.layer.use_text(footer, FOOTER_SIZE, Mm(MARGIN), Mm(FOOTER_Y), &self.font);
      self.footers_drawn += 1;
    }
  }

  fn rule(&self, x1: f32, x2: f32, y: f32) {
    let line = Line {
      points: vec![
        (Point::new(Mm(x1), Mm(y)), false),
        (Point::new(Mm(x2), Mm(y)), false),
      ],
      is_closed: false,
    };
    self.layer.add_line(line);
  }
}

fn line_height(font_size: f32) -> f32 {
  LINE_HEIGHT * (font_size / FONT_SIZE)
}

/// Character budget for one wrapped line in a column of the given width.
pub fn max_chars(width_mm: f32, font_size: f32) -> usize {
  let budget = (width_mm / (font_size * GLYPH_WIDTH_PER_PT)).floor() as usize;
  budget.max(1)
}

/// Greedy word wrap; words longer than the budget are hard-split.
pub fn wrap_text(text: &str, budget: usize) -> Vec<String> {
  let mut lines = Vec::new();
  let mut current = String::new();

  for word in text.split_whitespace() {
    let mut word = word.to_string();
    while word.chars().count() > budget {
      if !current.is_empty() {
        lines.push(std::mem::take(&mut current));
      }
      let head: String = word.chars().take(budget).collect();
      let tail: String = word.chars().skip(budget).collect();
      lines.push(head);
      word = tail;
    }
    if word.is_empty() {
      continue;
    }
    if current.is_empty() {
      current = word;
    } else if current.chars().count() + 1 + word.chars().count() <= budget {
      current.push(' ');
      current.push_str(&word);
    } else {
      lines.push(std::mem::take(&mut current));
      current = word;
    }
  }
  if !current.is_empty() {
    lines.push(current);
  }
  if lines.is_empty() {
    lines.push(String::new());
  }
  lines
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn wrap_keeps_short_text_on_one_line() {
    assert_eq!(wrap_text("Max Mustermann", 40), vec!["Max Mustermann"]);
    assert_eq!(wrap_text("", 40), vec![""]);
  }

  #[test]
  fn wrap_breaks_on_word_boundaries() {
    let lines = wrap_text("iPhone 12 128GB Schwarz Zustand gut", 14);
    assert!(lines.len() > 1);
    for line in &lines {
      assert!(line.chars().count() <= 14, "line too long: {line}");
    }
    assert_eq!(lines.join(" "), "iPhone 12 128GB Schwarz Zustand gut");
  }

  #[test]
  fn wrap_hard_splits_overlong_words() {
    let lines = wrap_text("ABCDEFGHIJKLMNOP", 5);
    assert_eq!(lines, vec!["ABCDE", "FGHIJ", "KLMNO", "P"]);
  }

  #[test]
  fn max_chars_shrinks_with_font_size() {
    let narrow = max_chars(50.0, 13.0);
    let wide = max_chars(50.0, 9.0);
    assert!(wide > narrow);
    assert!(max_chars(0.5, 13.0) >= 1);
  }

  #[test]
  fn cursor_starts_at_top_and_advances() {
    let mut writer = BelegWriter::new("Test").expect("writer");
    assert_eq!(writer.y, TOP);
    writer.label_value("Datum", "01.04.2025", TextStyle::REGULAR);
    assert_eq!(writer.y, TOP - LINE_HEIGHT);
    assert_eq!(writer.page_count(), 1);
  }

  #[test]
  fn ensure_space_breaks_page_at_bottom_margin() {
    let mut writer = BelegWriter::new("Test").expect("writer");
    writer.y = BOTTOM + 1.0;
    writer.ensure_space(LINE_HEIGHT);
    assert_eq!(writer.page_count(), 2);
    assert_eq!(writer.y, TOP);

    writer.y = BOTTOM + LINE_HEIGHT;
    writer.ensure_space(LINE_HEIGHT);
    assert_eq!(writer.page_count(), 2, "exact fit must not break");
  }

  #[test]
  fn label_stays_with_first_value_line_across_page_break() {
    let mut writer = BelegWriter::new("Test").expect("writer");
    writer.y = BOTTOM + 1.0;
    let long_value = "wort ".repeat(40);
    let budget = max_chars(writer.max_value_width(), TextStyle::REGULAR.size);
    let lines = wrap_text(&long_value, budget).len();
    assert!(lines > 1, "value must wrap for this scenario");

    writer.label_value("Beschreibung", &long_value, TextStyle::REGULAR);

    // The whole field moved to page 2: the cursor sits exactly `lines`
    // rows below the top margin, so the label and every value line were
    // drawn after the break, none on page 1.
    assert_eq!(writer.page_count(), 2);
    let expected = TOP - lines as f32 * LINE_HEIGHT;
    assert!(
      (writer.y - expected).abs() < 0.01,
      "cursor at {} instead of {expected}",
      writer.y
    );
  }

  #[test]
  fn long_content_paginates_and_footer_lands_on_every_page() {
    let mut writer = BelegWriter::new("Test").expect("writer");
    writer.set_footer("Eigenbeleg - HandyFlip Buchhaltung");
    for i in 0..80 {
      writer.label_value(&format!("Feld {i}"), "Wert mit etwas laengerem Inhalt", TextStyle::REGULAR);
    }
    let pages = writer.page_count();
    assert!(pages > 1);
    // Pages left behind got their footer at break time.
    assert_eq!(writer.footers_drawn, pages - 1);
    let bytes = writer.finish().expect("pdf bytes");
    assert!(bytes.starts_with(b"%PDF"));
  }

  #[test]
  fn separator_and_signature_line_advance_cursor() {
    let mut writer = BelegWriter::new("Test").expect("writer");
    let before = writer.y;
    writer.separator();
    assert!(writer.y < before);
    let before = writer.y;
    writer.signature_line("Unterschrift Max Mustermann");
    assert!(writer.y < before);
  }
}
