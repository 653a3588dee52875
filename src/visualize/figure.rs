use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EnergyError, Result};

/// Output size of a chart in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FigureSize {
    pub width: u32,
    pub height: u32,
}

impl FigureSize {
    pub const fn new(width: u32, height: u32) -> Self {
        FigureSize { width, height }
    }

    /// Default size of trend and forecast charts.
    pub const fn trend() -> Self {
        FigureSize::new(1200, 600)
    }

    /// Default size of pattern charts.
    pub const fn pattern() -> Self {
        FigureSize::new(1000, 600)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(EnergyError::Config(format!(
                "figure size must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

impl Default for FigureSize {
    fn default() -> Self {
        FigureSize::trend()
    }
}

/// A rendered chart: its labels plus the SVG document.
#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    title: String,
    x_label: String,
    y_label: String,
    size: FigureSize,
    points: usize,
    svg: String,
}

impl Figure {
    pub(crate) fn new(
        title: impl Into<String>,
        x_label: impl Into<String>,
        y_label: impl Into<String>,
        size: FigureSize,
        points: usize,
        svg: String,
    ) -> Self {
        Figure {
            title: title.into(),
            x_label: x_label.into(),
            y_label: y_label.into(),
            size,
            points,
            svg,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn x_label(&self) -> &str {
        &self.x_label
    }

    pub fn y_label(&self) -> &str {
        &self.y_label
    }

    pub fn size(&self) -> FigureSize {
        self.size
    }

    /// Number of data points drawn, across all series.
    pub fn points(&self) -> usize {
        self.points
    }

    /// The chart as an SVG document.
    pub fn svg(&self) -> &str {
        &self.svg
    }

    /// Write the SVG document to `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, &self.svg)
            .map_err(|e| EnergyError::Render(format!("cannot write {}: {}", path.display(), e)))?;
        debug!(path = %path.display(), title = %self.title, "saved figure");
        Ok(())
    }
}
