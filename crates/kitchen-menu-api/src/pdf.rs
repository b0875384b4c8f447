
//! One page A4 landscape rendering of a [`MenuSelection`]: a column per
//! diet category, a section per meal.
//!
//! Text is drawn with the builtin Helvetica fonts, which only cover a
//! latin code page, so everything goes through [`ascii_text`] first.

use chrono::NaiveDate;
use printpdf::{
    path::PaintMode, BuiltinFont, Color, IndirectFontRef, Mm, PdfDocument,
    PdfLayerReference, Rect, Rgb,
};

use crate::{ascii_text, DietCategory, MealSlot, MenuSelection};

const TITLE: &str = "Meniul zilei";

const PAGE_WIDTH: f32 = 297.0;
const PAGE_HEIGHT: f32 = 210.0;
const MARGIN: f32 = 12.0;
const COLUMN_GAP: f32 = 6.0;
const COLUMN_TOP: f32 = PAGE_HEIGHT - MARGIN - 16.0;
const LINE_HEIGHT: f32 = 4.5;
// roughly what fits into a column at 10pt
const MAX_LINE_CHARS: usize = 46;

const TEXT_COLOR: (u8, u8, u8) = (0x11, 0x18, 0x27);
const MUTED_COLOR: (u8, u8, u8) = (0x4B, 0x55, 0x63);
const SEPARATOR_COLOR: (u8, u8, u8) = (0xE5, 0xE7, 0xEB);

#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    #[error("could not render pdf: {0}")]
    Render(String),
}

#[derive(Debug, Clone, Copy)]
struct Palette {
    background: (u8, u8, u8),
    border: (u8, u8, u8),
}

fn palette(category: DietCategory) -> Palette {
    match category {
        DietCategory::Normal => Palette {
            background: (0xFE, 0xF3, 0xC7),
            border: (0xFC, 0xD3, 0x4D),
        },
        DietCategory::Diabetic => Palette {
            background: (0xFF, 0xE4, 0xE6),
            border: (0xFD, 0xA4, 0xAF),
        },
        DietCategory::HepatoGastro => Palette {
            background: (0xE0, 0xF2, 0xFE),
            border: (0x7D, 0xD3, 0xFC),
        },
    }
}

fn color((r, g, b): (u8, u8, u8)) -> Color {
    Color::Rgb(Rgb::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, None))
}

/// A printed line inside a category column.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnLine {
    Meal(String),
    Dish(String),
    Empty,
}

pub struct MenuDocument<'a> {
    menu: &'a MenuSelection,
    date: Option<&'a str>,
}

impl<'a> MenuDocument<'a> {
    /// `date` is free text ("8 Octombrie 2025"); blank counts as missing.
    pub fn new(menu: &'a MenuSelection, date: Option<&'a str>) -> Self {
        let date = date.map(str::trim).filter(|v| !v.is_empty());
        Self { menu, date }
    }

    pub fn file_name(&self, today: NaiveDate) -> String {
        let stem = match self.date {
            Some(date) => ascii_text(date)
                .chars()
                .map(|c| if c.is_ascii_alphanumeric() || " -_.".contains(c) { c } else { '_' })
            .collect(),
            None => today.format("%Y-%m-%d").to_string(),
        };
        format!("Meniuri_{stem}.pdf")
    }

    pub fn date_line(&self) -> String {
        format!("Data: {}", self.date.unwrap_or("___"))
    }

    pub fn column(&self, category: DietCategory) -> Vec<ColumnLine> {
        let mut lines = Vec::new();
        for meal in MealSlot::ALL {
            lines.push(ColumnLine::Meal(meal.label().to_uppercase()));

            let cell = self.menu.cell(category, meal);
            if cell.is_empty() {
                lines.push(ColumnLine::Empty);
            }
            for dish in cell.dishes() {
                lines.push(ColumnLine::Dish(format!("{} - {}", dish.name, dish.amount_label())));
            }
        }
        lines
    }

    pub fn render(&self) -> Result<Vec<u8>, PdfError> {
        let (doc, page, layer) = PdfDocument::new(
            TITLE, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "menu",
        );
        let regular = doc.add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| PdfError::Render(e.to_string()))?;
        let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| PdfError::Render(e.to_string()))?;
        let layer = doc.get_page(page).get_layer(layer);

        layer.set_fill_color(color(TEXT_COLOR));
        layer.use_text(TITLE, 18.0, Mm(MARGIN), Mm(PAGE_HEIGHT - MARGIN - 6.0), &bold);
        layer.set_fill_color(color(MUTED_COLOR));
        layer.use_text(
            ascii_text(&self.date_line()), 12.0,
            Mm(PAGE_WIDTH - MARGIN - 70.0), Mm(PAGE_HEIGHT - MARGIN - 6.0),
            &regular,
        );

        let width = (PAGE_WIDTH - 2.0 * MARGIN - 2.0 * COLUMN_GAP) / 3.0;
        for (i, category) in DietCategory::ALL.into_iter().enumerate() {
            let x = MARGIN + i as f32 * (width + COLUMN_GAP);
            self.draw_column(&layer, category, x, width, &regular, &bold);
        }

        doc.save_to_bytes().map_err(|e| PdfError::Render(e.to_string()))
    }

    fn draw_column(
        &self, layer: &PdfLayerReference, category: DietCategory,
        x: f32, width: f32,
        regular: &IndirectFontRef, bold: &IndirectFontRef,
    ) {
        let Palette { background, border } = palette(category);

        layer.set_fill_color(color(background));
        layer.set_outline_color(color(border));
        layer.set_outline_thickness(0.75);
        layer.add_rect(
            Rect::new(Mm(x), Mm(MARGIN), Mm(x + width), Mm(COLUMN_TOP))
                .with_mode(PaintMode::FillStroke),
        );

        layer.set_fill_color(color(TEXT_COLOR));
        layer.use_text(ascii_text(category.label()), 12.0, Mm(x + 3.0), Mm(COLUMN_TOP - 7.0), bold);

        layer.set_fill_color(color(SEPARATOR_COLOR));
        layer.add_rect(
            Rect::new(Mm(x), Mm(COLUMN_TOP - 10.3), Mm(x + width), Mm(COLUMN_TOP - 10.0))
                .with_mode(PaintMode::Fill),
        );

        let mut y = COLUMN_TOP - 16.0;
        for (i, line) in self.column(category).into_iter().enumerate() {
            match line {
                ColumnLine::Meal(title) => {
                    if i > 0 { y -= 3.0; }
                    layer.set_fill_color(color(TEXT_COLOR));
                    layer.use_text(ascii_text(&title), 10.0, Mm(x + 3.0), Mm(y), bold);
                    y -= 5.0;
                },
                ColumnLine::Empty => {
                    layer.set_fill_color(color(MUTED_COLOR));
                    layer.use_text("-", 9.0, Mm(x + 3.0), Mm(y), regular);
                    y -= LINE_HEIGHT;
                },
                ColumnLine::Dish(text) => {
                    layer.set_fill_color(color(TEXT_COLOR));
                    // continuation lines are indented past the bullet
                    let parts = wrap_line(&ascii_text(&text), MAX_LINE_CHARS - 2);
                    for (n, part) in parts.into_iter().enumerate() {
                        let (part, indent) = if n == 0 { (format!("- {part}"), 4.0) } else { (part, 6.5) };
                        layer.use_text(part, 10.0, Mm(x + indent), Mm(y), regular);
                        y -= LINE_HEIGHT;
                    }
                },
            }
        }
    }
}

/// Greedy word wrap. A word longer than `max` is split where it hits the
/// limit.
fn wrap_line(text: &str, max: usize) -> Vec<String> {
    let max = max.max(1);
    let mut lines = Vec::new();
    let mut line = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        loop {
            let used = line.chars().count();
            let sep = usize::from(used > 0);
            if used + sep + word.len() <= max {
                if sep == 1 { line.push(' '); }
                line.extend(word.drain(..));
                break;
            }
            if used > 0 {
                lines.push(std::mem::take(&mut line));
                continue;
            }
            lines.push(word.drain(..max).collect());
        }
    }

    if !line.is_empty() || lines.is_empty() {
        lines.push(line);
    }
    lines
}
