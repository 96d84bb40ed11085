use crate::colors::SlicePalette;
use crate::error::ChartError;
use crate::slice::PieSlice;
use async_channel::{Receiver, Sender, TryRecvError};
use derive_more::{Display, From, Into};
use palette::Srgb;
use parking_lot::{Mutex, RwLock};

/// Allowed deviation of the weight sum from 1.0.
pub const WEIGHT_TOLERANCE: f64 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, From, Into)]
pub struct ItemId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, From, Into)]
pub struct ObserverId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSetEvent {
    /// The data was replaced; slices must be rebuilt.
    Changed,
    /// The data is no longer valid until the next `Changed`.
    Invalidated,
}

/// The data source behind a chart: one weighted, colored slice per item.
///
/// Weights must sum to 1.0 (see [`WEIGHT_TOLERANCE`]). Implementors build
/// slices in [`PieChartAdapter::slice`], reusing `recycled` when given one.
pub trait PieChartAdapter: Send + Sync {
    fn count(&self) -> usize;

    fn percent(&self, index: usize) -> f64;

    fn slice(&self, recycled: Option<PieSlice>, index: usize, offset: f64) -> PieSlice;

    fn observable(&self) -> &DataSetObservable;

    fn item_id(&self, index: usize) -> ItemId {
        ItemId(index as u64)
    }

    fn has_stable_ids(&self) -> bool {
        false
    }

    /// Generic list rendering. Charts draw slices themselves, so reaching this
    /// is a programming error.
    fn item_view(&self, index: usize) -> ! {
        panic!("pie chart adapters do not render list items (requested item {index})")
    }
}

pub fn total_weight(adapter: &dyn PieChartAdapter) -> f64 {
    (0..adapter.count()).map(|i| adapter.percent(i)).sum()
}

pub fn validate(adapter: &dyn PieChartAdapter) -> Result<(), ChartError> {
    validate_total(total_weight(adapter))
}

pub fn validate_weights(weights: impl IntoIterator<Item = f64>) -> Result<(), ChartError> {
    validate_total(weights.into_iter().sum())
}

fn validate_total(total: f64) -> Result<(), ChartError> {
    if (1.0 - total).abs() > WEIGHT_TOLERANCE {
        return Err(ChartError::WeightSum {
            total,
            tolerance: WEIGHT_TOLERANCE,
        });
    }
    Ok(())
}

/// Receiving end of a data-set subscription. Dropping it without calling
/// [`DataSetObservable::unsubscribe`] leaves a dead sender that is pruned on
/// the next notification.
#[derive(Debug)]
pub struct DataSetSubscription {
    id: ObserverId,
    receiver: Receiver<DataSetEvent>,
}

impl DataSetSubscription {
    pub fn id(&self) -> ObserverId {
        self.id
    }

    pub fn try_recv(&self) -> Result<DataSetEvent, TryRecvError> {
        self.receiver.try_recv()
    }
}

#[derive(Debug, Default)]
pub struct DataSetObservable {
    next_id: Mutex<u64>,
    observers: Mutex<Vec<(ObserverId, Sender<DataSetEvent>)>>,
}

impl DataSetObservable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> DataSetSubscription {
        let id = {
            let mut next = self.next_id.lock();
            *next += 1;
            ObserverId(*next)
        };
        let (tx, rx) = async_channel::unbounded();
        self.observers.lock().push((id, tx));
        DataSetSubscription { id, receiver: rx }
    }

    pub fn unsubscribe(&self, id: ObserverId) {
        self.observers.lock().retain(|(observer, _)| *observer != id);
    }

    pub fn observer_count(&self) -> usize {
        self.observers.lock().len()
    }

    pub fn notify_changed(&self) {
        self.notify(DataSetEvent::Changed);
    }

    pub fn notify_invalidated(&self) {
        self.notify(DataSetEvent::Invalidated);
    }

    fn notify(&self, event: DataSetEvent) {
        self.observers
            .lock()
            .retain(|(_, tx)| tx.try_send(event).is_ok());
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliceEntry {
    pub weight: f64,
    pub color: Srgb<u8>,
}

/// Adapter over a list of weights, coloring them from a [`SlicePalette`]
/// unless colors are given explicitly.
#[derive(Debug)]
pub struct WeightedAdapter {
    entries: RwLock<Vec<SliceEntry>>,
    stable_ids: bool,
    stroke_width: Option<f64>,
    observable: DataSetObservable,
}

impl WeightedAdapter {
    pub fn new(weights: &[f64]) -> Self {
        Self::with_entries(Self::paint(weights))
    }

    pub fn with_entries(entries: Vec<SliceEntry>) -> Self {
        Self {
            entries: RwLock::new(entries),
            stable_ids: false,
            stroke_width: None,
            observable: DataSetObservable::new(),
        }
    }

    pub fn stable_ids(mut self, stable: bool) -> Self {
        self.stable_ids = stable;
        self
    }

    pub fn stroke_width(mut self, width: f64) -> Self {
        self.stroke_width = Some(width);
        self
    }

    pub fn entries(&self) -> Vec<SliceEntry> {
        self.entries.read().clone()
    }

    /// Replaces the data and notifies observers. Weights are not validated
    /// here; the chart keeps its slices until it reloads.
    pub fn set_weights(&self, weights: &[f64]) {
        self.set_entries(Self::paint(weights));
    }

    pub fn set_entries(&self, entries: Vec<SliceEntry>) {
        *self.entries.write() = entries;
        self.observable.notify_changed();
    }

    pub fn invalidate(&self) {
        self.observable.notify_invalidated();
    }

    fn paint(weights: &[f64]) -> Vec<SliceEntry> {
        let mut palette = SlicePalette::new();
        weights
            .iter()
            .map(|&weight| SliceEntry {
                weight,
                color: palette.next_color(),
            })
            .collect()
    }
}

impl PieChartAdapter for WeightedAdapter {
    fn count(&self) -> usize {
        self.entries.read().len()
    }

    fn percent(&self, index: usize) -> f64 {
        self.entries.read().get(index).map_or(0.0, |e| e.weight)
    }

    fn slice(&self, recycled: Option<PieSlice>, index: usize, offset: f64) -> PieSlice {
        let entry = self
            .entries
            .read()
            .get(index)
            .copied()
            .unwrap_or(SliceEntry {
                weight: 0.0,
                color: Srgb::new(0, 0, 0),
            });

        let mut slice = match recycled {
            Some(slice) => slice.reuse(entry.weight, entry.color, offset),
            None => PieSlice::new(entry.weight, entry.color, offset),
        };
        if let Some(width) = self.stroke_width {
            slice.set_stroke_width(width);
        }
        slice
    }

    fn observable(&self) -> &DataSetObservable {
        &self.observable
    }

    fn has_stable_ids(&self) -> bool {
        self.stable_ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_within_tolerance() {
        assert!(validate(&WeightedAdapter::new(&[0.25, 0.25, 0.25, 0.25])).is_ok());
        assert!(validate(&WeightedAdapter::new(&[0.5, 0.49995])).is_ok());
        assert!(validate(&WeightedAdapter::new(&[1.0 / 3.0; 3])).is_ok());
    }

    #[test]
    fn test_validate_rejects_both_directions() {
        assert!(matches!(
            validate(&WeightedAdapter::new(&[0.5, 0.4])),
            Err(ChartError::WeightSum { .. })
        ));
        assert!(validate(&WeightedAdapter::new(&[0.6, 0.6])).is_err());
        assert!(validate(&WeightedAdapter::new(&[])).is_err());
    }

    #[test]
    fn test_slice_reuses_recycled_object() {
        let adapter = WeightedAdapter::new(&[0.5, 0.5]).stroke_width(4.0);
        let recycled = PieSlice::new(0.1, Srgb::new(9, 9, 9), 12.0);

        let slice = adapter.slice(Some(recycled), 1, 180.0);
        assert_eq!(slice.percent(), 0.5);
        assert_eq!(slice.offset(), 180.0);
        assert_eq!(slice.stroke_width(), 4.0);
        assert_eq!(slice.color(), adapter.entries()[1].color);
    }

    #[test]
    fn test_observers_receive_until_unsubscribed() {
        let adapter = WeightedAdapter::new(&[1.0]);
        let first = adapter.observable().subscribe();
        let second = adapter.observable().subscribe();

        adapter.set_weights(&[0.5, 0.5]);
        assert_eq!(first.try_recv(), Ok(DataSetEvent::Changed));
        assert_eq!(second.try_recv(), Ok(DataSetEvent::Changed));

        adapter.observable().unsubscribe(first.id());
        adapter.invalidate();
        assert!(first.try_recv().is_err());
        assert_eq!(second.try_recv(), Ok(DataSetEvent::Invalidated));
        assert_eq!(adapter.observable().observer_count(), 1);
    }

    #[test]
    fn test_dropped_subscriptions_are_pruned() {
        let adapter = WeightedAdapter::new(&[1.0]);
        drop(adapter.observable().subscribe());
        adapter.invalidate();
        assert_eq!(adapter.observable().observer_count(), 0);
    }

    #[test]
    #[should_panic(expected = "do not render list items")]
    fn test_item_view_is_unsupported() {
        let adapter = WeightedAdapter::new(&[1.0]);
        adapter.item_view(0);
    }
}
