//! Rotating pie chart selector.
//!
//! A disc of weighted slices that can be dragged, flung and snapped to an
//! anchor angle. Rendering happens on a dedicated thread with cairo; taps are
//! resolved against an off-screen raster keyed by slice color.

pub mod adapter;
pub mod animation;
pub mod colors;
pub mod config;
pub mod dynamics;
pub mod error;
pub mod events;
pub mod geometry;
pub mod gesture;
pub mod raster;
pub mod render;
pub mod scheduler;
pub mod slice;
pub mod state;
pub mod view;

pub use adapter::{
    DataSetEvent, DataSetObservable, ItemId, PieChartAdapter, SliceEntry, WeightedAdapter,
};
pub use config::{Anchor, ChartConfig};
pub use dynamics::{Dynamics, FrictionDynamics};
pub use error::ChartError;
pub use events::{ChartEvent, ItemClick};
pub use geometry::{Padding, Point, Rect};
pub use gesture::{PointerAction, PointerEvent, TouchState};
pub use raster::Raster;
pub use render::RenderStyle;
pub use slice::PieSlice;
pub use state::{SavedState, ToggleOutcome};
pub use view::ChartView;
