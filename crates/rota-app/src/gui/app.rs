use crate::events::AppEvent;
use crate::gui::theme::{self, ThemeColors};
use crate::gui::{CHART_PADDING, TICK_INTERVAL_MS};
use crate::slices;
use gtk::prelude::*;
use gtk4 as gtk;
use relm4::prelude::*;
use rota::{ChartView, ItemClick, Padding, PointerAction, PointerEvent, Point, Rect, WeightedAdapter};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub struct AppModel {
    pub chart: Rc<RefCell<ChartView>>,
    pub adapter: Arc<WeightedAdapter>,
    pub labels: Vec<String>,
    pub selection: String,
    /// Set once the view has been built.
    pub drawing_area: Option<gtk::DrawingArea>,
}

#[derive(Debug)]
pub enum AppMsg {
    Toggle,
    Select(usize),
    Pause,
    Resume,
    SlicesReload,
    Pointer(PointerAction, Point),
    Resize(i32, i32),
    Tick,
    Selected(usize),
    Clicked(ItemClick),
}

impl From<AppEvent> for AppMsg {
    fn from(event: AppEvent) -> Self {
        match event {
            AppEvent::Toggle => AppMsg::Toggle,
            AppEvent::Select(i) => AppMsg::Select(i),
            AppEvent::Pause => AppMsg::Pause,
            AppEvent::Resume => AppMsg::Resume,
            AppEvent::SlicesReload => AppMsg::SlicesReload,
        }
    }
}

fn drag_position(gesture: &gtk::GestureDrag) -> Option<Point> {
    let (x, y) = gesture.start_point()?;
    let (dx, dy) = gesture.offset()?;
    Some(Point::new(x + dx, y + dy))
}

impl AppModel {
    fn label(&self, index: usize) -> &str {
        self.labels.get(index).map_or("", String::as_str)
    }

    fn redraw(&self) {
        if let Some(area) = &self.drawing_area {
            area.queue_draw();
        }
    }
}

#[relm4::component(pub)]
impl SimpleComponent for AppModel {
    type Init = (
        ChartView,
        Arc<WeightedAdapter>,
        Vec<String>,
        async_channel::Receiver<AppEvent>,
    );
    type Input = AppMsg;
    type Output = ();

    view! {
        #[root]
        #[name = "window"]
        gtk::ApplicationWindow {
            set_title: Some("Rota"),
            set_default_size: (480, 540),

            add_controller = gtk::EventControllerKey {
                connect_key_pressed[sender] => move |_, key, _, _| {
                    if key == gtk::gdk::Key::Escape {
                        sender.input(AppMsg::Toggle);
                        return glib::Propagation::Stop;
                    }
                    glib::Propagation::Proceed
                }
            },

            gtk::Box {
                set_orientation: gtk::Orientation::Vertical,

                #[name = "drawing_area"]
                gtk::DrawingArea {
                    set_hexpand: true,
                    set_vexpand: true,

                    connect_resize[sender] => move |_, width, height| {
                        sender.input(AppMsg::Resize(width, height));
                    },

                    add_controller = gtk::GestureDrag {
                        connect_drag_begin[sender] => move |_, x, y| {
                            sender.input(AppMsg::Pointer(PointerAction::Down, Point::new(x, y)));
                        },
                        connect_drag_update[sender] => move |gesture, _, _| {
                            if let Some(point) = drag_position(gesture) {
                                sender.input(AppMsg::Pointer(PointerAction::Move, point));
                            }
                        },
                        connect_drag_end[sender] => move |gesture, _, _| {
                            if let Some(point) = drag_position(gesture) {
                                sender.input(AppMsg::Pointer(PointerAction::Up, point));
                            }
                        },
                        connect_cancel[sender] => move |gesture, _| {
                            let point = drag_position(gesture).unwrap_or_default();
                            sender.input(AppMsg::Pointer(PointerAction::Cancel, point));
                        }
                    }
                },

                gtk::Label {
                    add_css_class: "rota-selection",
                    #[watch]
                    set_label: &model.selection,
                }
            }
        }
    }

    fn init(
        init: Self::Init,
        root: Self::Root,
        sender: ComponentSender<Self>,
    ) -> ComponentParts<Self> {
        let (mut chart, adapter, labels, rx) = init;

        theme::load_css();

        {
            let sender = sender.clone();
            chart.set_on_selection_changed(move |index| sender.input(AppMsg::Selected(index)));
        }
        {
            let sender = sender.clone();
            chart.set_on_item_click(move |click| sender.input(AppMsg::Clicked(click.clone())));
        }
        chart.set_on_rotation_state_change(|state| log::debug!("Rotation state: {}", state));
        chart.set_on_ready(|| log::info!("Chart ready"));

        if let Err(e) = chart.set_adapter(adapter.clone()) {
            log::error!("Failed to set slices: {}", e);
        }

        let model = AppModel {
            chart: Rc::new(RefCell::new(chart)),
            adapter,
            labels,
            selection: String::new(),
            drawing_area: None,
        };

        let widgets = view_output!();

        let mut model = model;
        model.drawing_area = Some(widgets.drawing_area.clone());

        {
            let colors = ThemeColors::from_context(&widgets.drawing_area.style_context());
            let mut chart = model.chart.borrow_mut();
            let stroke = chart.config().chart_stroke;
            chart.set_style(colors.render_style(stroke));

            if let Err(e) = chart.attach() {
                log::error!("Failed to start chart rendering: {}", e);
            }
            chart.resume();
        }

        let chart_draw = model.chart.clone();
        widgets
            .drawing_area
            .set_draw_func(move |_, cr, _, _| {
                let Some(frame) = chart_draw.borrow().surface() else {
                    return;
                };
                let painted = frame.to_surface().and_then(|surface| {
                    cr.set_source_surface(&surface, 0.0, 0.0)?;
                    cr.paint()?;
                    Ok(())
                });
                if let Err(e) = painted {
                    log::error!("Drawing error: {}", e);
                }
            });

        {
            let sender = sender.clone();
            glib::timeout_add_local(Duration::from_millis(TICK_INTERVAL_MS), move || {
                sender.input(AppMsg::Tick);
                glib::ControlFlow::Continue
            });
        }

        let sender_clone = sender.clone();
        relm4::spawn(async move {
            while let Ok(event) = rx.recv().await {
                sender_clone.input(AppMsg::from(event));
            }
        });

        root.set_visible(true);

        ComponentParts { model, widgets }
    }

    fn update(&mut self, msg: Self::Input, _sender: ComponentSender<Self>) {
        let now = Instant::now();
        match msg {
            AppMsg::Toggle => {
                let outcome = self.chart.borrow_mut().toggle_chart(now);
                log::debug!("Toggle: {}", outcome);
            }
            AppMsg::Select(index) => {
                if !self.chart.borrow_mut().set_selection(index, now) {
                    log::warn!("Cannot select slice {}", index);
                }
            }
            AppMsg::Pause => self.chart.borrow().pause(),
            AppMsg::Resume => self.chart.borrow().resume(),
            AppMsg::SlicesReload => {
                match slices::load_slices().and_then(|file| Ok((file.entries()?, file.labels()))) {
                    Ok((entries, labels)) => {
                        // keeps the selection across the swap
                        self.adapter.invalidate();
                        self.adapter.set_entries(entries);
                        self.labels = labels;
                        log::info!("Slices reloaded");
                    }
                    Err(e) => log::error!("Failed to reload slices: {}", e),
                }
            }
            AppMsg::Pointer(action, point) => {
                self.chart
                    .borrow_mut()
                    .on_touch(PointerEvent::new(action, point, now));
                self.redraw();
            }
            AppMsg::Resize(width, height) => {
                let (width, height) = (width as f64, height as f64);
                let mut chart = self.chart.borrow_mut();
                let side = chart.measure(width, height, Padding::uniform(CHART_PADDING));
                chart.layout(Rect::new(0.0, 0.0, width, height));
                log::debug!("Chart laid out at {}px, diameter {}", side, chart.diameter());
            }
            AppMsg::Tick => {
                self.chart.borrow_mut().pump(now);
                self.redraw();
            }
            AppMsg::Selected(index) => {
                self.selection = self.label(index).to_string();
            }
            AppMsg::Clicked(click) => {
                if click.second_tap {
                    log::info!("Activated '{}' ({})", self.label(click.index), click.id);
                } else {
                    log::debug!("Clicked slice {}", click.index);
                }
            }
        }
    }
}
