use anyhow::Context;
use relm4::prelude::*;
use rota::{ChartView, WeightedAdapter};
use rota_app::gui::app::AppModel;
use rota_app::slices;
use rota_app::sys::runtime;
use std::sync::Arc;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    if let Err(e) = rota::config::write_default_config() {
        log::warn!("Could not write default config: {}", e);
    }
    if let Err(e) = slices::write_default_slices() {
        log::warn!("Could not write default slices: {}", e);
    }

    let config = rota::config::load_or_default();
    let chart = ChartView::new(config).context("Invalid chart config")?;

    let file = slices::load_or_default();
    if file.slices.is_empty() {
        anyhow::bail!("No slices to show");
    }
    let adapter = Arc::new(WeightedAdapter::with_entries(file.entries()?).stable_ids(true));

    let (tx, rx) = async_channel::bounded(32);

    // Start Background Services
    runtime::start_background_services(tx.clone())
        .context("Failed to start background services")?;

    let app = RelmApp::new("org.rota.app");

    app.run::<AppModel>((chart, adapter, file.labels(), rx));
    Ok(())
}
