//! TUI rendering
//!
//! This module handles all UI rendering using the `ratatui` crate: the
//! dashboard (lookup results beside the world map), the credits view and
//! the footer.

use crate::app::{App, Field, MapState, ViewMode};
use ratatui::{
    prelude::*,
    widgets::block::{Position, Title},
    widgets::canvas::{Canvas, Map, MapResolution},
    widgets::*,
};

const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const KEY_HELP: &str = "q quit · Tab views · +/- zoom · ←↑↓→ pan · r recenter";

/// Renders one frame of the TUI based on current application state.
///
/// # Arguments
///
/// * `f` - The ratatui frame to draw into (from `terminal.draw()`).
/// * `app` - Current application state (fields, map, view mode).
pub fn render(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(2),
        ])
        .split(f.size());

    let title = Paragraph::new(" What's My IP & Location ")
        .style(Style::default().add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    match app.view_mode {
        ViewMode::Dashboard => render_dashboard_view(f, app, chunks[1]),
        ViewMode::Credits => render_credits_view(f, chunks[1]),
    }

    render_footer(f, app, chunks[2]);
}

/// Dashboard view: results panel (40%) + map (60%).
fn render_dashboard_view(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);

    if app.loading {
        render_loading_panel(f, app, chunks[0]);
    } else {
        render_results_panel(f, app, chunks[0]);
    }

    match (app.map.state(), app.map.bounds()) {
        (Some(state), Some((x_bounds, y_bounds))) => {
            render_map(f, state, x_bounds, y_bounds, chunks[1])
        }
        _ => {
            let message = if app.loading {
                "Waiting for location..."
            } else {
                "Map unavailable"
            };
            let p = Paragraph::new(message)
                .alignment(Alignment::Center)
                .style(Style::default().fg(Color::DarkGray))
                .block(
                    Block::default()
                        .title(" Map ")
                        .borders(Borders::ALL)
                        .border_type(BorderType::Rounded),
                );
            f.render_widget(p, chunks[1]);
        }
    }
}

fn render_loading_panel(f: &mut Frame, app: &App, area: Rect) {
    let frame = SPINNER[app.tick_count % SPINNER.len()];
    let p = Paragraph::new(Line::from(vec![
        Span::styled(frame, Style::default().fg(Color::Cyan)),
        Span::raw(" Detecting your connection..."),
    ]))
    .block(
        Block::default()
            .title(" Your Connection ")
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .padding(Padding::new(2, 2, 1, 1)),
    );
    f.render_widget(p, area);
}

fn render_results_panel(f: &mut Frame, app: &App, area: Rect) {
    let d = &app.display;
    let rows = [
        ("IP Address", &d.ip),
        ("ISP", &d.isp),
        ("Location", &d.location),
        ("Coordinates", &d.coordinates),
        ("Address", &d.address),
    ];

    let mut lines = Vec::with_capacity(rows.len() * 3);
    for (label, field) in rows {
        lines.push(Line::from(Span::styled(
            label,
            Style::default().add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(Span::styled(field.text(), field_style(field))));
        lines.push(Line::from(""));
    }

    let p = Paragraph::new(lines).wrap(Wrap { trim: true }).block(
        Block::default()
            .title(" Your Connection ")
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .padding(Padding::new(2, 2, 1, 0)),
    );
    f.render_widget(p, area);
}

fn field_style(field: &Field) -> Style {
    match field {
        Field::Loading => Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::ITALIC),
        Field::Value(_) => Style::default().fg(Color::Yellow),
        Field::Placeholder(_) => Style::default().fg(Color::Red),
    }
}

fn render_map(f: &mut Frame, state: &MapState, x_bounds: [f64; 2], y_bounds: [f64; 2], area: Rect) {
    let zoom = state.zoom;

    // Degrees per terminal cell, so labels can sit beside the marker.
    // The canvas spreads the bounds over (cells - 1) steps.
    let inner_width = area.width.saturating_sub(2).max(1);
    let inner_height = area.height.saturating_sub(2).max(1);
    let lon_per_cell = (x_bounds[1] - x_bounds[0]) / f64::from(inner_width.saturating_sub(1).max(1));
    let lat_per_row = (y_bounds[1] - y_bounds[0]) / f64::from(inner_height.saturating_sub(1).max(1));
    let label_width = usize::from(inner_width / 2).saturating_sub(3);

    let marker = state.marker_near_center();
    let popup = state.marker.popup.as_ref().map(|p| {
        (
            truncate(&p.title, label_width),
            truncate(&p.content, label_width),
        )
    });

    let canvas = Canvas::default()
        .block(
            Block::default()
                .title(format!(" Map · zoom {} ", zoom))
                .title(
                    Title::from(" © OpenStreetMap contributors ")
                        .position(Position::Bottom)
                        .alignment(Alignment::Right),
                )
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded),
        )
        .marker(symbols::Marker::Braille)
        .x_bounds(x_bounds)
        .y_bounds(y_bounds)
        .paint(move |ctx| {
            ctx.draw(&Map {
                color: Color::Rgb(60, 60, 60),
                resolution: MapResolution::High,
            });
            ctx.layer();

            ctx.print(
                marker.lon,
                marker.lat,
                Line::from(Span::styled(
                    "⌖",
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )),
            );

            if let Some((title, content)) = &popup {
                // Half a row either side of the marker keeps the two lines on adjacent rows
                let x = marker.lon + 2.0 * lon_per_cell;
                ctx.print(
                    x,
                    marker.lat + lat_per_row / 2.0,
                    Line::from(Span::styled(
                        title.clone(),
                        Style::default().fg(Color::Black).bg(Color::Yellow),
                    )),
                );
                ctx.print(
                    x,
                    marker.lat - lat_per_row / 2.0,
                    Line::from(Span::styled(
                        content.clone(),
                        Style::default().fg(Color::Yellow),
                    )),
                );
            }
        });

    f.render_widget(canvas, area);
}

fn render_credits_view(f: &mut Frame, area: Rect) {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let lines = vec![
        Line::from(vec![
            Span::styled("IP geolocation    ", bold),
            Span::raw("GeoJS (get.geojs.io)"),
        ]),
        Line::from(vec![
            Span::styled("Reverse geocoding ", bold),
            Span::raw("Nominatim, data © OpenStreetMap contributors (ODbL)"),
        ]),
        Line::from(vec![
            Span::styled("Precise location  ", bold),
            Span::raw("gpsd, or coordinates from config.toml"),
        ]),
        Line::from(vec![
            Span::styled("World map         ", bold),
            Span::raw("Natural Earth coastlines via ratatui"),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "Press 1 or Tab to return to the dashboard.",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let p = Paragraph::new(lines).block(
        Block::default()
            .title(" Credits ")
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .padding(Padding::new(2, 2, 1, 1)),
    );
    f.render_widget(p, area);
}

fn render_footer(f: &mut Frame, app: &App, area: Rect) {
    let footer = Paragraph::new(vec![
        Line::from(app.footer.as_str()),
        Line::from(Span::styled(KEY_HELP, Style::default().fg(Color::DarkGray))),
    ])
    .alignment(Alignment::Center);
    f.render_widget(footer, area);
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut short: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    short.push('…');
    short
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{AddressOutcome, PageUpdate};
    use crate::config::Config;
    use crate::models::{GeoPoint, IpSummary};
    use chrono::NaiveDate;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn draw(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 32)).unwrap();
        terminal.draw(|f| render(f, app)).unwrap();

        let buffer = terminal.backend().buffer();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                text.push_str(buffer.get(x, y).symbol());
            }
            text.push('\n');
        }
        text
    }

    fn app() -> App {
        App::new(&Config::default(), NaiveDate::from_ymd_opt(2026, 10, 19).unwrap())
    }

    #[test]
    fn loading_screen_shows_indicator_and_footer() {
        let screen = draw(&app());
        assert!(screen.contains("Detecting your connection..."));
        assert!(screen.contains("Waiting for location..."));
        assert!(screen.contains("Brought to you by YOURSITE.COM on Mon, 19 Oct 2026."));
    }

    #[test]
    fn results_and_map_are_drawn() {
        let mut app = app();
        app.apply(PageUpdate::IpResolved(IpSummary {
            ip: "198.51.100.23".into(),
            isp: "Example Net (Asia/Tokyo)".into(),
            location: "Tokyo, Tokyo, JP".into(),
        }));
        app.apply(PageUpdate::MapShown {
            at: GeoPoint::new(35.6895, 139.6917),
            zoom: 10,
        });
        app.apply(PageUpdate::PreciseFix {
            at: GeoPoint::new(35.6812, 139.7671),
            zoom: 15,
        });
        app.apply(PageUpdate::Address(AddressOutcome::Failed));
        app.apply(PageUpdate::MarkerPopup {
            title: "Precise Location (GPS)".into(),
            content: "35.681200, 139.767100".into(),
        });

        let screen = draw(&app);
        assert!(screen.contains("198.51.100.23"));
        assert!(screen.contains("Tokyo, Tokyo, JP"));
        assert!(screen.contains("35.681200, 139.767100"));
        assert!(screen.contains("Error loading"));
        assert!(screen.contains("zoom 15"));
        assert!(screen.contains("Precise Location (GPS)"));
        assert!(!screen.contains("Detecting your connection..."));
    }

    fn row_of(screen: &str, needle: &str) -> Option<usize> {
        screen.lines().position(|line| line.contains(needle))
    }

    #[test]
    fn popup_title_and_content_sit_on_adjacent_rows() {
        let mut app = app();
        app.apply(PageUpdate::IpResolved(IpSummary {
            ip: "198.51.100.23".into(),
            isp: "Example Net (Asia/Tokyo)".into(),
            location: "Tokyo, Tokyo, JP".into(),
        }));
        for zoom in [3, 10, 15] {
            app.apply(PageUpdate::MapShown {
                at: GeoPoint::new(35.6812, 139.7671),
                zoom,
            });
            app.apply(PageUpdate::MarkerPopup {
                title: "Precise Location (GPS)".into(),
                content: "Marunouchi, Chiyoda".into(),
            });

            let screen = draw(&app);
            let title = row_of(&screen, "Precise Location (GPS)");
            let content = row_of(&screen, "Marunouchi, Chiyoda");
            assert!(title.is_some(), "title hidden at zoom {}:\n{}", zoom, screen);
            assert_eq!(content, title.map(|row| row + 1), "zoom {}:\n{}", zoom, screen);
        }
    }

    #[test]
    fn marker_stays_visible_after_panning_across_the_antimeridian() {
        let mut app = app();
        app.apply(PageUpdate::IpResolved(IpSummary {
            ip: "192.0.2.1".into(),
            isp: "Example (Pacific/Fiji)".into(),
            location: "Taveuni, FJ".into(),
        }));
        app.apply(PageUpdate::MapShown {
            at: GeoPoint::new(-16.8, 179.9),
            zoom: 8,
        });
        app.apply(PageUpdate::MarkerPopup {
            title: "Approximate Location (IP-based)".into(),
            content: "Taveuni, FJ".into(),
        });
        app.map.pan(1, 0);

        let screen = draw(&app);
        assert!(screen.contains('⌖'), "{}", screen);
        assert!(screen.contains("Approximate Location (IP-based)"));
    }

    #[test]
    fn failed_lookup_without_map() {
        let mut app = app();
        app.apply(PageUpdate::IpFailed);

        let screen = draw(&app);
        assert!(screen.contains("Error loading"));
        assert!(screen.contains("Not available"));
        assert!(screen.contains("Map unavailable"));
    }

    #[test]
    fn credits_view_lists_sources() {
        let mut app = app();
        app.view_mode = ViewMode::Credits;
        let screen = draw(&app);
        assert!(screen.contains("GeoJS"));
        assert!(screen.contains("OpenStreetMap contributors"));
    }

    #[test]
    fn truncate_marks_cut_text() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a rather long address", 8), "a rathe…");
    }
}
