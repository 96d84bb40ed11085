use crate::adapter::ItemId;
use crate::gesture::TouchState;
use crate::slice::PieSlice;

#[derive(Debug, Clone, PartialEq)]
pub struct ItemClick {
    /// The tapped slice was already the selected one.
    pub second_tap: bool,
    pub slice: PieSlice,
    pub index: usize,
    pub id: ItemId,
}

/// Notifications queued by the chart and delivered to listeners on the input
/// thread.
#[derive(Debug, Clone, PartialEq)]
pub enum ChartEvent {
    SelectionChanged(usize),
    ItemClick(ItemClick),
    RotationStateChanged(TouchState),
    Ready,
}
