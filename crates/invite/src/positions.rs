//! Marked name-insertion points

use crate::config::RenderConfig;
use crate::{InviteError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A marked insertion point in template page points
///
/// `x` is measured from the page's left edge and `y` from its top edge;
/// together they are the baseline origin of the rendered name.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Page index (0-based)
    #[serde(rename = "page")]
    pub page_index: usize,
    pub x: f64,
    pub y: f64,
    pub font_size: f32,
}

impl Position {
    pub fn new(page_index: usize, x: f64, y: f64, font_size: f32) -> Self {
        Self {
            page_index,
            x,
            y,
            font_size,
        }
    }

    /// Check coordinates and size are usable
    pub fn validate(&self) -> Result<()> {
        if !(self.x.is_finite() && self.y.is_finite()) {
            return Err(InviteError::InvalidPosition(format!(
                "coordinates must be finite, got ({}, {})",
                self.x, self.y
            )));
        }
        if self.x < 0.0 || self.y < 0.0 {
            return Err(InviteError::InvalidPosition(format!(
                "coordinates must not be negative, got ({}, {})",
                self.x, self.y
            )));
        }
        if !(self.font_size.is_finite() && self.font_size > 0.0) {
            return Err(InviteError::InvalidPosition(format!(
                "font size must be positive, got {}",
                self.font_size
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Page {}: ({}, {}) Size: {}",
            self.page_index + 1,
            self.x.round() as i64,
            self.y.round() as i64,
            self.font_size
        )
    }
}

/// Ordered list of positions, in insertion order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PositionStore {
    positions: Vec<Position>,
}

impl PositionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from already-persisted positions, validating each
    pub fn from_positions(positions: Vec<Position>) -> Result<Self> {
        for position in &positions {
            position.validate()?;
        }
        Ok(Self { positions })
    }

    /// Append a position and return its index
    ///
    /// Marking requires a font, since the marker stands in for text that
    /// must be renderable.
    ///
    /// # Arguments
    /// * `config` - Current render configuration
    /// * `page_index` - Page index (0-based)
    /// * `x`, `y` - Baseline origin in page points from the top-left corner
    /// * `font_size` - Font size in points
    pub fn add(
        &mut self,
        config: &RenderConfig,
        page_index: usize,
        x: f64,
        y: f64,
        font_size: f32,
    ) -> Result<usize> {
        config.require_font()?;

        let position = Position::new(page_index, x, y, font_size);
        position.validate()?;

        self.positions.push(position);
        Ok(self.positions.len() - 1)
    }

    /// Remove the position at `index`, keeping the order of the rest
    pub fn remove_at(&mut self, index: usize) -> Result<Position> {
        if index >= self.positions.len() {
            return Err(InviteError::IndexOutOfRange {
                index,
                len: self.positions.len(),
            });
        }
        Ok(self.positions.remove(index))
    }

    pub fn clear(&mut self) {
        self.positions.clear();
    }

    /// Positions on one page, in insertion order
    ///
    /// The iterator is lazy and can be cloned to restart it.
    pub fn list_for_page(&self, page_index: usize) -> impl Iterator<Item = &Position> + Clone + '_ {
        self.positions
            .iter()
            .filter(move |p| p.page_index == page_index)
    }

    /// Positions on one page paired with their store index
    pub fn indexed_for_page(
        &self,
        page_index: usize,
    ) -> impl Iterator<Item = (usize, &Position)> + Clone + '_ {
        self.positions
            .iter()
            .enumerate()
            .filter(move |(_, p)| p.page_index == page_index)
    }

    pub fn get(&self, index: usize) -> Option<&Position> {
        self.positions.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Position> {
        self.positions.iter()
    }

    pub fn as_slice(&self) -> &[Position] {
        &self.positions
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Highest page index referenced by any position
    pub fn max_page_index(&self) -> Option<usize> {
        self.positions.iter().map(|p| p.page_index).max()
    }
}

impl<'a> IntoIterator for &'a PositionStore {
    type Item = &'a Position;
    type IntoIter = std::slice::Iter<'a, Position>;

    fn into_iter(self) -> Self::IntoIter {
        self.positions.iter()
    }
}
