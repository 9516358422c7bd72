//! Shows where the internet thinks you are: an IP-based location, refined by
//! the device's own position, reverse-geocoded and plotted on a terminal map.

pub mod api;
pub mod app;
pub mod config;
pub mod events;
pub mod geocode;
pub mod location;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod position;
pub mod ui;
