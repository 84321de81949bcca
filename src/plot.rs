//! Line plots of sampled trajectories.
//!
//! A [`Figure`] owns a vertical stack of [`Axes`]. Lines and axis styling are
//! recorded on the axes and only turned into pixels when the figure is
//! rendered to SVG through `plotters`.

use std::ops::{Range, RangeInclusive};
use std::path::Path;

use plotters::coord::ranged1d::{AsRangedCoord, ValueFormatter};
use plotters::coord::Shift;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;
use thiserror::Error;

/// Colors assigned to lines without an explicit color, in order.
const PALETTE: [RGBColor; 6] = [BLUE, RED, GREEN, MAGENTA, CYAN, BLACK];

/// Plotting failures.
#[derive(Debug, Error)]
pub enum PlotError {
    /// x and y sequences of different length
    #[error("x has {x} points but y has {y}")]
    LengthMismatch {
        /// Length of x
        x: usize,
        /// Length of y
        y: usize,
    },
    /// Nothing drawable on an axes (no finite points, or none positive on a log axis)
    #[error("axes has no drawable points")]
    EmptyRange,
    /// Backend failure while drawing
    #[error("render failed: {0}")]
    Render(String),
    /// Writing the output file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn render_err<E>(err: DrawingAreaErrorKind<E>) -> PlotError
where
    E: std::error::Error + Send + Sync,
{
    PlotError::Render(err.to_string())
}

/// Stroke pattern of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineStyle {
    /// Continuous stroke
    #[default]
    Solid,
    /// Dashed stroke
    Dashed,
}

/// Per-line styling.
#[derive(Debug, Clone, PartialEq)]
pub struct LineOptions {
    /// Stroke color; picked from a fixed palette when `None`
    pub color: Option<RGBColor>,
    /// Stroke pattern
    pub style: LineStyle,
    /// Stroke width in pixels
    pub width: u32,
    /// Legend entry
    pub label: Option<String>,
}

impl Default for LineOptions {
    fn default() -> Self {
        Self {
            color: None,
            style: LineStyle::Solid,
            width: 1,
            label: None,
        }
    }
}

impl LineOptions {
    /// Set the color.
    pub fn color(mut self, color: RGBColor) -> Self {
        self.color = Some(color);
        self
    }

    /// Set the stroke pattern.
    pub fn style(mut self, style: LineStyle) -> Self {
        self.style = style;
        self
    }

    /// Set the legend entry.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Line {
    x: Vec<f64>,
    y: Vec<f64>,
    options: LineOptions,
}

/// One chart: a set of lines plus axis labels, title and scale flags.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Axes {
    lines: Vec<Line>,
    title: Option<String>,
    x_label: Option<String>,
    y_label: Option<String>,
    log_x: bool,
    log_y: bool,
}

impl Axes {
    /// Empty axes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a line through the points `(x[i], y[i])`.
    pub fn plot(
        &mut self,
        x: &[f64],
        y: &[f64],
        options: &LineOptions,
    ) -> Result<&mut Self, PlotError> {
        if x.len() != y.len() {
            return Err(PlotError::LengthMismatch {
                x: x.len(),
                y: y.len(),
            });
        }
        self.lines.push(Line {
            x: x.to_vec(),
            y: y.to_vec(),
            options: options.clone(),
        });
        Ok(self)
    }

    /// Set the chart title.
    pub fn set_title(&mut self, title: impl Into<String>) -> &mut Self {
        self.title = Some(title.into());
        self
    }

    /// Set the x-axis description.
    pub fn set_xlabel(&mut self, label: impl Into<String>) -> &mut Self {
        self.x_label = Some(label.into());
        self
    }

    /// Set the y-axis description.
    pub fn set_ylabel(&mut self, label: impl Into<String>) -> &mut Self {
        self.y_label = Some(label.into());
        self
    }

    /// Use a logarithmic x axis.
    pub fn set_log_x(&mut self, log: bool) -> &mut Self {
        self.log_x = log;
        self
    }

    /// Use a logarithmic y axis.
    pub fn set_log_y(&mut self, log: bool) -> &mut Self {
        self.log_y = log;
        self
    }

    /// Number of recorded lines.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Chart title, if set.
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    fn drawable(&self, x: f64, y: f64) -> bool {
        x.is_finite() && y.is_finite() && (!self.log_x || x > 0.0) && (!self.log_y || y > 0.0)
    }

    /// Data extent over drawable points, widened when degenerate.
    fn bounds(&self) -> Result<(Range<f64>, Range<f64>), PlotError> {
        let mut x_range: Option<(f64, f64)> = None;
        let mut y_range: Option<(f64, f64)> = None;
        for line in &self.lines {
            for (&x, &y) in line.x.iter().zip(&line.y) {
                if !self.drawable(x, y) {
                    continue;
                }
                x_range = Some(x_range.map_or((x, x), |(lo, hi)| (lo.min(x), hi.max(x))));
                y_range = Some(y_range.map_or((y, y), |(lo, hi)| (lo.min(y), hi.max(y))));
            }
        }
        match (x_range, y_range) {
            (Some(x), Some(y)) => Ok((widen(x, self.log_x), widen(y, self.log_y))),
            _ => Err(PlotError::EmptyRange),
        }
    }

    fn draw<DB: DrawingBackend>(&self, area: &DrawingArea<DB, Shift>) -> Result<(), PlotError> {
        let (x, y) = self.bounds()?;
        match (self.log_x, self.log_y) {
            (false, false) => self.draw_on(area, x, y),
            (true, false) => self.draw_on(area, x.log_scale(), y),
            (false, true) => self.draw_on(area, x, y.log_scale()),
            (true, true) => self.draw_on(area, x.log_scale(), y.log_scale()),
        }
    }

    fn draw_on<DB, X, Y>(
        &self,
        area: &DrawingArea<DB, Shift>,
        x_spec: X,
        y_spec: Y,
    ) -> Result<(), PlotError>
    where
        DB: DrawingBackend,
        X: AsRangedCoord<Value = f64>,
        Y: AsRangedCoord<Value = f64>,
        X::CoordDescType: ValueFormatter<f64>,
        Y::CoordDescType: ValueFormatter<f64>,
    {
        let mut builder = ChartBuilder::on(area);
        builder.margin(12).x_label_area_size(36).y_label_area_size(56);
        if let Some(title) = &self.title {
            builder.caption(title, ("sans-serif", 18));
        }
        let mut chart = builder.build_cartesian_2d(x_spec, y_spec).map_err(render_err)?;

        let mut mesh = chart.configure_mesh();
        if let Some(label) = &self.x_label {
            mesh.x_desc(label.as_str());
        }
        if let Some(label) = &self.y_label {
            mesh.y_desc(label.as_str());
        }
        mesh.draw().map_err(render_err)?;

        for (idx, line) in self.lines.iter().enumerate() {
            let color = line.options.color.unwrap_or(PALETTE[idx % PALETTE.len()]);
            let stroke = color.stroke_width(line.options.width);
            let points: Vec<(f64, f64)> = line
                .x
                .iter()
                .zip(&line.y)
                .map(|(&x, &y)| (x, y))
                .filter(|&(x, y)| self.drawable(x, y))
                .collect();

            let anno = match line.options.style {
                LineStyle::Solid => chart.draw_series(LineSeries::new(points, stroke)),
                LineStyle::Dashed => chart.draw_series(DashedLineSeries::new(points, 8, 5, stroke)),
            }
            .map_err(render_err)?;

            if let Some(label) = &line.options.label {
                anno.label(label.as_str())
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 16, y)], stroke));
            }
        }

        if self.lines.iter().any(|l| l.options.label.is_some()) {
            chart
                .configure_series_labels()
                .background_style(WHITE.mix(0.8))
                .border_style(&BLACK)
                .draw()
                .map_err(render_err)?;
        }
        Ok(())
    }
}

fn widen((lo, hi): (f64, f64), log: bool) -> Range<f64> {
    if hi > lo {
        return lo..hi;
    }
    if log {
        lo / 2.0..hi * 2.0
    } else {
        let pad = if lo == 0.0 { 1.0 } else { lo.abs() * 0.5 };
        lo - pad..hi + pad
    }
}

/// A drawing surface holding one or more vertically stacked axes.
#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    axes: Vec<Axes>,
    current: usize,
    size: (u32, u32),
}

impl Default for Figure {
    fn default() -> Self {
        Self::new(960, 720)
    }
}

impl Figure {
    /// Empty figure of the given pixel size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            axes: Vec::new(),
            current: 0,
            size: (width, height),
        }
    }

    /// Current axes, created on first use.
    pub fn gca(&mut self) -> &mut Axes {
        if self.axes.is_empty() {
            self.axes.push(Axes::new());
            self.current = 0;
        }
        &mut self.axes[self.current]
    }

    /// Append a fresh axes below the existing ones and make it current.
    pub fn add_axes(&mut self) -> &mut Axes {
        self.push(Axes::new())
    }

    /// Append `axes` below the existing ones and make it current.
    pub fn push(&mut self, axes: Axes) -> &mut Axes {
        self.axes.push(axes);
        self.current = self.axes.len() - 1;
        &mut self.axes[self.current]
    }

    /// All axes, top to bottom.
    pub fn axes(&self) -> &[Axes] {
        &self.axes
    }

    /// Render to an SVG document.
    pub fn to_svg_string(&self) -> Result<String, PlotError> {
        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, self.size).into_drawing_area();
            self.draw(&root)?;
            root.present().map_err(render_err)?;
        }
        Ok(svg)
    }

    /// Render to an SVG file at `path`.
    pub fn save_svg(&self, path: impl AsRef<Path>) -> Result<(), PlotError> {
        let svg = self.to_svg_string()?;
        std::fs::write(path, svg)?;
        Ok(())
    }

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<(), PlotError> {
        root.fill(&WHITE).map_err(render_err)?;
        if self.axes.is_empty() {
            return Ok(());
        }
        let panels = root.split_evenly((self.axes.len(), 1));
        for (panel, axes) in panels.iter().zip(&self.axes) {
            axes.draw(panel)?;
        }
        Ok(())
    }
}

/// Draw one line onto `axes`, or onto new axes when `None`, and hand the
/// axes back.
pub fn plot_line(
    axes: Option<Axes>,
    x: &[f64],
    y: &[f64],
    options: &LineOptions,
) -> Result<Axes, PlotError> {
    let mut axes = axes.unwrap_or_default();
    axes.plot(x, y, options)?;
    Ok(axes)
}

/// Index range of the samples nearest to `start` and `stop`.
///
/// Nearness is the absolute time difference; the earliest index wins ties.
/// Returns `None` when `t` holds no comparable value.
pub fn sample_window(t: &[f64], start: f64, stop: f64) -> Option<RangeInclusive<usize>> {
    Some(nearest_index(t, start)?..=nearest_index(t, stop)?)
}

fn nearest_index(t: &[f64], target: f64) -> Option<usize> {
    t.iter()
        .enumerate()
        .filter(|(_, v)| !v.is_nan())
        .min_by(|(_, a), (_, b)| (*a - target).abs().total_cmp(&(*b - target).abs()))
        .map(|(i, _)| i)
}
