pub mod app;
pub mod theme;

/// Space between the chart and the edge of the drawing area.
pub const CHART_PADDING: f64 = 16.0;

/// How often the chart is pumped and the drawing area repainted.
pub const TICK_INTERVAL_MS: u64 = 16;
