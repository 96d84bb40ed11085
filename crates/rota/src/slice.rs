use crate::geometry::{FULL_TURN, Point, Rect, normalize_degrees};
use palette::Srgb;
use std::collections::VecDeque;

pub const DEFAULT_STROKE_WIDTH: f64 = 2.0;

/// Radial line from the disc center to its rim.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Edge {
    pub from: Point,
    pub to: Point,
}

/// One wedge of the chart, in chart-local degrees (before rotation).
#[derive(Debug, Clone, PartialEq)]
pub struct PieSlice {
    offset: f64,
    percent: f64,
    color: Srgb<u8>,
    stroke_width: f64,
    bounds: Rect,
    inner: Rect,
    start_edge: Edge,
    end_edge: Edge,
}

impl PieSlice {
    pub fn new(percent: f64, color: Srgb<u8>, offset: f64) -> Self {
        let mut slice = Self {
            offset,
            percent,
            color,
            stroke_width: DEFAULT_STROKE_WIDTH,
            bounds: Rect::default(),
            inner: Rect::default(),
            start_edge: Edge::default(),
            end_edge: Edge::default(),
        };
        slice.update_edges();
        slice
    }

    /// Reinitializes a released slice, keeping its stroke width.
    pub fn reuse(mut self, percent: f64, color: Srgb<u8>, offset: f64) -> Self {
        self.percent = percent;
        self.color = color;
        self.offset = offset;
        self.update_edges();
        self
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn set_offset(&mut self, offset: f64) {
        self.offset = offset;
        self.update_edges();
    }

    pub fn percent(&self) -> f64 {
        self.percent
    }

    pub fn set_percent(&mut self, percent: f64) {
        self.percent = percent;
        self.update_edges();
    }

    pub fn degrees(&self) -> f64 {
        self.percent * FULL_TURN
    }

    pub fn center_degree(&self) -> f64 {
        self.offset + self.degrees() / 2.0
    }

    pub fn color(&self) -> Srgb<u8> {
        self.color
    }

    pub fn set_color(&mut self, color: Srgb<u8>) {
        self.color = color;
    }

    pub fn stroke_width(&self) -> f64 {
        self.stroke_width
    }

    pub fn set_stroke_width(&mut self, width: f64) {
        self.stroke_width = width;
        self.update_edges();
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Bounds inset by the stroke width; the wedge is drawn inside these.
    pub fn inner_bounds(&self) -> Rect {
        self.inner
    }

    pub fn radius(&self) -> f64 {
        self.inner.width() / 2.0
    }

    pub fn start_edge(&self) -> Edge {
        self.start_edge
    }

    pub fn end_edge(&self) -> Edge {
        self.end_edge
    }

    pub fn set_bounds(&mut self, bounds: Rect) {
        self.bounds = bounds;
        self.update_edges();
    }

    /// Whether the screen angle `degree` falls in this slice when the chart is
    /// rotated by `rotation`. The low edge is exclusive and the high edge
    /// inclusive so neighbouring slices never both match a seam.
    pub fn contains_degree(&self, rotation: f64, degree: f64) -> bool {
        let mut local = normalize_degrees(degree - rotation);
        if local == 0.0 {
            local = FULL_TURN;
        }
        self.offset < local && local <= self.offset + self.degrees()
    }

    fn update_edges(&mut self) {
        self.inner = self.bounds.inset(self.stroke_width);
        self.end_edge = self.edge_at(self.offset + self.degrees());
        self.start_edge = self.edge_at(self.offset);
    }

    fn edge_at(&self, degrees: f64) -> Edge {
        let center = self.inner.center();
        let radius = self.radius();
        let radians = degrees.to_radians();
        Edge {
            from: center,
            to: Point::new(
                center.x + radius * radians.cos(),
                center.y + radius * radians.sin(),
            ),
        }
    }
}

/// Free list of released slices, handed back to adapters for reuse.
#[derive(Debug, Default)]
pub struct SlicePool {
    free: VecDeque<PieSlice>,
}

impl SlicePool {
    pub fn recycle(&mut self, slices: impl IntoIterator<Item = PieSlice>) {
        self.free.extend(slices);
    }

    pub fn take(&mut self) -> Option<PieSlice> {
        self.free.pop_front()
    }
}
