use crate::config::Config;
use crate::models::{GeoPoint, IpSummary};
use chrono::NaiveDate;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use tracing::debug;

pub const ERROR_LOADING: &str = "Error loading";
pub const NOT_AVAILABLE: &str = "Not available";
pub const UNKNOWN_ADDRESS: &str = "Unknown";

pub const MIN_ZOOM: u8 = 1;
pub const MAX_ZOOM: u8 = 19;

#[derive(Debug, PartialEq, Clone, Copy, Default)]
pub enum ViewMode {
    #[default]
    Dashboard,
    Credits,
}

/// One visible text field.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Field {
    #[default]
    Loading,
    Value(String),
    Placeholder(&'static str),
}

impl Field {
    pub fn text(&self) -> &str {
        match self {
            Field::Loading => "Loading...",
            Field::Value(v) => v,
            Field::Placeholder(p) => p,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DisplayState {
    pub ip: Field,
    pub isp: Field,
    pub location: Field,
    pub coordinates: Field,
    pub address: Field,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Popup {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub position: GeoPoint,
    pub popup: Option<Popup>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapState {
    pub center: GeoPoint,
    pub zoom: u8,
    pub marker: Marker,
}

impl MapState {
    /// The marker position, shifted by whole turns of longitude to the copy
    /// closest to the view center, so panning across 180° keeps it on screen.
    pub fn marker_near_center(&self) -> GeoPoint {
        let at = self.marker.position;
        let turns = ((self.center.lon - at.lon) / 360.0).round();
        GeoPoint::new(at.lat, at.lon + turns * 360.0)
    }
}

/// The single map and its single marker.
///
/// Created on the first [`show`](MapView::show) and mutated in place from
/// then on; every other operation is a no-op until then.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum MapView {
    #[default]
    Uninitialized,
    Ready(MapState),
}

impl MapView {
    /// Creates the map centered on `at` with a marker there, or moves the
    /// existing view and marker.
    pub fn show(&mut self, at: GeoPoint, zoom: u8) {
        let zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        match self {
            MapView::Uninitialized => {
                *self = MapView::Ready(MapState {
                    center: at,
                    zoom,
                    marker: Marker {
                        position: at,
                        popup: None,
                    },
                });
            }
            MapView::Ready(state) => {
                state.center = at;
                state.zoom = zoom;
                state.marker.position = at;
            }
        }
    }

    /// Re-centers and moves the marker only if the map already exists.
    pub fn set_view(&mut self, at: GeoPoint, zoom: u8) -> bool {
        if let MapView::Ready(_) = self {
            self.show(at, zoom);
            true
        } else {
            false
        }
    }

    /// Replaces the marker popup. Returns false when there is no marker.
    pub fn bind_popup(&mut self, title: &str, content: &str) -> bool {
        match self {
            MapView::Ready(state) => {
                state.marker.popup = Some(Popup {
                    title: title.to_string(),
                    content: content.to_string(),
                });
                true
            }
            MapView::Uninitialized => false,
        }
    }

    pub fn state(&self) -> Option<&MapState> {
        match self {
            MapView::Ready(state) => Some(state),
            MapView::Uninitialized => None,
        }
    }

    /// Visible `(x_bounds, y_bounds)` in degrees: longitude then latitude.
    pub fn bounds(&self) -> Option<([f64; 2], [f64; 2])> {
        let state = self.state()?;
        let (half_lon, half_lat) = half_spans(state.zoom);
        Some((
            [state.center.lon - half_lon, state.center.lon + half_lon],
            [state.center.lat - half_lat, state.center.lat + half_lat],
        ))
    }

    pub fn zoom_by(&mut self, delta: i8) {
        if let MapView::Ready(state) = self {
            let zoom = (state.zoom as i16 + delta as i16).clamp(MIN_ZOOM as i16, MAX_ZOOM as i16);
            state.zoom = zoom as u8;
        }
    }

    /// Moves the view by a quarter of the visible span per step.
    pub fn pan(&mut self, east_steps: i8, north_steps: i8) {
        if let MapView::Ready(state) = self {
            let (half_lon, half_lat) = half_spans(state.zoom);
            let lon = state.center.lon + f64::from(east_steps) * half_lon / 2.0;
            let lat = state.center.lat + f64::from(north_steps) * half_lat / 2.0;
            state.center = GeoPoint::new(lat.clamp(-90.0, 90.0), wrap_longitude(lon));
        }
    }

    pub fn recenter(&mut self) {
        if let MapView::Ready(state) = self {
            state.center = state.marker.position;
        }
    }
}

fn half_spans(zoom: u8) -> (f64, f64) {
    let half_lon = 720.0 / 2f64.powi(i32::from(zoom));
    (half_lon, half_lon / 2.0)
}

fn wrap_longitude(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

/// Outcome of the reverse geocode step, as shown in the address field.
#[derive(Debug, Clone, PartialEq)]
pub enum AddressOutcome {
    Found(String),
    Unknown,
    Failed,
}

/// A visible change produced by the lookup pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum PageUpdate {
    IpResolved(IpSummary),
    IpFailed,
    /// IP lookup succeeded but carried no usable coordinates.
    NoCoordinates,
    /// Create the map (or move it) at the IP-based position.
    MapShown { at: GeoPoint, zoom: u8 },
    MarkerPopup { title: String, content: String },
    PreciseFix { at: GeoPoint, zoom: u8 },
    PreciseUnavailable,
    Address(AddressOutcome),
}

pub struct App {
    pub view_mode: ViewMode,
    pub display: DisplayState,
    pub map: MapView,
    pub loading: bool,
    pub footer: String,
    pub tick_count: usize,
    pub should_quit: bool,
}

impl App {
    pub fn new(config: &Config, today: NaiveDate) -> Self {
        Self {
            view_mode: ViewMode::Dashboard,
            display: DisplayState::default(),
            map: MapView::Uninitialized,
            loading: true,
            footer: footer_text(&config.site.name, today),
            tick_count: 0,
            should_quit: false,
        }
    }

    pub fn on_tick(&mut self) {
        self.tick_count = self.tick_count.wrapping_add(1);
    }

    pub fn apply(&mut self, update: PageUpdate) {
        debug!("Applying {:?}", update);
        let d = &mut self.display;
        match update {
            PageUpdate::IpResolved(summary) => {
                self.loading = false;
                d.ip = Field::Value(summary.ip);
                d.isp = Field::Value(summary.isp);
                d.location = Field::Value(summary.location);
            }
            PageUpdate::IpFailed => {
                self.loading = false;
                d.ip = Field::Placeholder(ERROR_LOADING);
                d.isp = Field::Placeholder(ERROR_LOADING);
                d.location = Field::Placeholder(ERROR_LOADING);
                d.address = Field::Placeholder(NOT_AVAILABLE);
                d.coordinates = Field::Placeholder(NOT_AVAILABLE);
            }
            PageUpdate::NoCoordinates | PageUpdate::PreciseUnavailable => {
                d.coordinates = Field::Placeholder(NOT_AVAILABLE);
                d.address = Field::Placeholder(NOT_AVAILABLE);
            }
            PageUpdate::MapShown { at, zoom } => self.map.show(at, zoom),
            PageUpdate::MarkerPopup { title, content } => {
                self.map.bind_popup(&title, &content);
            }
            PageUpdate::PreciseFix { at, zoom } => {
                d.coordinates = Field::Value(at.precise_label());
                self.map.set_view(at, zoom);
            }
            PageUpdate::Address(outcome) => {
                d.address = match outcome {
                    AddressOutcome::Found(address) => Field::Value(address),
                    AddressOutcome::Unknown => Field::Placeholder(UNKNOWN_ADDRESS),
                    AddressOutcome::Failed => Field::Placeholder(ERROR_LOADING),
                };
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Tab => {
                self.view_mode = match self.view_mode {
                    ViewMode::Dashboard => ViewMode::Credits,
                    ViewMode::Credits => ViewMode::Dashboard,
                }
            }
            KeyCode::Char('1') => self.view_mode = ViewMode::Dashboard,
            KeyCode::Char('2') => self.view_mode = ViewMode::Credits,
            // Map keys only make sense on the dashboard
            _ if self.view_mode != ViewMode::Dashboard => {}
            KeyCode::Char('+') | KeyCode::Char('=') => self.map.zoom_by(1),
            KeyCode::Char('-') => self.map.zoom_by(-1),
            KeyCode::Left | KeyCode::Char('h') => self.map.pan(-1, 0),
            KeyCode::Right | KeyCode::Char('l') => self.map.pan(1, 0),
            KeyCode::Up | KeyCode::Char('k') => self.map.pan(0, 1),
            KeyCode::Down | KeyCode::Char('j') => self.map.pan(0, -1),
            KeyCode::Char('r') => self.map.recenter(),
            _ => {}
        }
    }
}

/// "Brought to you by SITE on Mon, 19 Oct 2026. | Credits"
pub fn footer_text(site_name: &str, today: NaiveDate) -> String {
    format!(
        "Brought to you by {} on {}. | Credits [2]",
        site_name,
        today.format("%a, %-d %b %Y")
    )
}
