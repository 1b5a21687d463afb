//! Hit-testing layout.
//!
//! `TextLayout` is the seam between the gesture layer and whatever measured
//! the text: it maps a surface point to the nearest buffer offset and an
//! offset back to a surface point. A surface that has not been measured yet
//! simply has no layout; callers hold an `Option<&dyn TextLayout>`.
//!
//! `GridLayout` is the monospace implementation used by terminal surfaces.
//! Each grapheme cluster occupies `unicode-width` cells (at least one), lines
//! wrap at the column budget, and every paragraph separator starts a new row.
//! Surface coordinates are `col * cell_width`, `row * cell_height`.
//!
//! Rounded backgrounds report their padding as extra advance. A layout built
//! with `with_decorations` reserves `ceil(padding / cell_width)` empty cells
//! before and after every background range; points on those cells resolve to
//! the padded word. Proportional hosts implementing `TextLayout` themselves
//! must measure with `RoundedBackground::advance` for the same effect.

use std::collections::BTreeMap;
use std::ops::Range;
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use core_text::PARAGRAPH_SEPARATOR;

use crate::style::{DecorationKind, DecorationLayer};

pub trait TextLayout {
    /// Buffer offset nearest to the surface point. Points above / below the
    /// text clamp to the first / last row, points past a row end map to it.
    fn offset_at(&self, x: f32, y: f32) -> usize;

    /// Surface point (left edge, row top) of `offset`, clamped to the text.
    fn position_of(&self, offset: usize) -> (f32, f32);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cell {
    pub offset: usize,
    pub len: usize,
    pub col: u16,
    pub width: u16,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Row {
    /// Buffer range shown on this row (separator excluded).
    pub range: Range<usize>,
    pub cells: Vec<Cell>,
}

impl Row {
    fn end_col(&self) -> u16 {
        self.cells
            .last()
            .map(|c| c.col.saturating_add(c.width))
            .unwrap_or(0)
    }
}

#[derive(Clone, Debug)]
pub struct GridLayout {
    rows: Vec<Row>,
    columns: u16,
    cell_width: f32,
    cell_height: f32,
}

impl GridLayout {
    pub fn new(text: &str, columns: u16) -> Self {
        Self::with_cell_size(text, columns, 1.0, 1.0)
    }

    pub fn with_cell_size(text: &str, columns: u16, cell_width: f32, cell_height: f32) -> Self {
        Self::build(text, columns, cell_width, cell_height, &Padding::default())
    }

    /// Like `with_cell_size`, reserving cells for rounded background padding.
    pub fn with_decorations(
        text: &str,
        columns: u16,
        cell_width: f32,
        cell_height: f32,
        layer: &DecorationLayer,
    ) -> Self {
        let padding = Padding::from_layer(layer, cell_width);
        Self::build(text, columns, cell_width, cell_height, &padding)
    }

    fn build(
        text: &str,
        columns: u16,
        cell_width: f32,
        cell_height: f32,
        padding: &Padding,
    ) -> Self {
        let columns = columns.max(1);
        let mut rows = Vec::new();
        let mut current = Row {
            range: 0..0,
            cells: Vec::new(),
        };
        let mut col: u16 = 0;
        for (offset, g) in text.grapheme_indices(true) {
            if g.starts_with(PARAGRAPH_SEPARATOR) {
                let next = offset + g.len();
                rows.push(std::mem::replace(
                    &mut current,
                    Row {
                        range: next..next,
                        cells: Vec::new(),
                    },
                ));
                col = 0;
                continue;
            }
            let width = (UnicodeWidthStr::width(g) as u16).max(1);
            let lead = padding.lead(offset);
            let needed = u32::from(col) + u32::from(lead) + u32::from(width);
            if col > 0 && needed > u32::from(columns) {
                let start = offset;
                rows.push(std::mem::replace(
                    &mut current,
                    Row {
                        range: start..start,
                        cells: Vec::new(),
                    },
                ));
                col = 0;
            }
            col = col.saturating_add(lead);
            current.cells.push(Cell {
                offset,
                len: g.len(),
                col,
                width,
            });
            current.range.end = offset + g.len();
            col = col
                .saturating_add(width)
                .saturating_add(padding.trail(offset + g.len()));
        }
        rows.push(current);
        Self {
            rows,
            columns,
            cell_width,
            cell_height,
        }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn columns(&self) -> u16 {
        self.columns
    }

    fn row_of(&self, offset: usize) -> usize {
        self.rows
            .partition_point(|r| r.range.start <= offset)
            .saturating_sub(1)
    }
}

/// Reserved cells keyed by the buffer offset they precede / follow.
#[derive(Debug, Default)]
struct Padding {
    lead: BTreeMap<usize, u16>,
    trail: BTreeMap<usize, u16>,
}

impl Padding {
    fn from_layer(layer: &DecorationLayer, cell_width: f32) -> Self {
        let cells = |pad: f32| {
            if cell_width > 0.0 && pad > 0.0 {
                (pad / cell_width).ceil().min(f32::from(u16::MAX)) as u16
            } else {
                0
            }
        };
        let mut out = Padding::default();
        for d in layer.iter() {
            if let DecorationKind::RoundedBackground(bg) = d.kind {
                let lead = out.lead.entry(d.range.start).or_default();
                *lead = lead.saturating_add(cells(bg.padding_left));
                let trail = out.trail.entry(d.range.end).or_default();
                *trail = trail.saturating_add(cells(bg.padding_right));
            }
        }
        out
    }

    fn lead(&self, offset: usize) -> u16 {
        self.lead.get(&offset).copied().unwrap_or(0)
    }

    fn trail(&self, offset: usize) -> u16 {
        self.trail.get(&offset).copied().unwrap_or(0)
    }
}

impl TextLayout for GridLayout {
    fn offset_at(&self, x: f32, y: f32) -> usize {
        let row_index = if y <= 0.0 {
            0
        } else {
            ((y / self.cell_height) as usize).min(self.rows.len() - 1)
        };
        let row = &self.rows[row_index];
        let col = if x <= 0.0 {
            0
        } else {
            (x / self.cell_width) as u16
        };
        row.cells
            .iter()
            .find(|c| col < c.col.saturating_add(c.width))
            .map(|c| c.offset)
            .unwrap_or(row.range.end)
    }

    fn position_of(&self, offset: usize) -> (f32, f32) {
        let row_index = self.row_of(offset);
        let row = &self.rows[row_index];
        let col = row
            .cells
            .iter()
            .find(|c| offset < c.offset + c.len)
            .map(|c| c.col)
            .unwrap_or_else(|| row.end_col());
        (
            f32::from(col) * self.cell_width,
            row_index as f32 * self.cell_height,
        )
    }
}
