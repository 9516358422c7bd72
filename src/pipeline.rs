//! The lookup chain: IP lookup, then the device's precise position, then
//! reverse geocoding. Each step starts only after the previous one
//! succeeded, and every visible change is posted to the UI as a
//! [`PageUpdate`].

use crate::api::JsonFetcher;
use crate::app::{AddressOutcome, PageUpdate};
use crate::config::Config;
use crate::events::Event;
use crate::geocode::reverse_geocode;
use crate::location::lookup_ip;
use crate::models::{GeoPoint, IpSummary};
use crate::position::{PositionError, PositionOptions, PositionSource};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, warn};

pub const IP_POPUP_TITLE: &str = "Approximate Location (IP-based)";
pub const PRECISE_POPUP_TITLE: &str = "Precise Location (GPS)";

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub ip_lookup_url: String,
    pub reverse_geocode_url: String,
    pub user_agent: String,
    pub position: PositionOptions,
    pub ip_zoom: u8,
    pub precise_zoom: u8,
}

impl From<&Config> for PipelineSettings {
    fn from(config: &Config) -> Self {
        Self {
            ip_lookup_url: config.endpoints.ip_lookup.clone(),
            reverse_geocode_url: config.endpoints.reverse_geocode.clone(),
            user_agent: config.endpoints.user_agent.clone(),
            position: PositionOptions::from(&config.position),
            ip_zoom: config.map.ip_zoom,
            precise_zoom: config.map.precise_zoom,
        }
    }
}

/// Where the chain stopped.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    IpLookupFailed,
    NoCoordinates,
    PreciseUnavailable(String),
    Address(AddressOutcome),
}

struct Updates<'a>(&'a UnboundedSender<Event>);

impl Updates<'_> {
    fn post(&self, update: PageUpdate) {
        if self.0.send(Event::Update(update)).is_err() {
            debug!("UI has gone away; dropping page update");
        }
    }
}

/// Runs the whole chain once.
pub async fn run<F, L>(
    fetcher: &F,
    locator: &L,
    settings: &PipelineSettings,
    tx: &UnboundedSender<Event>,
) -> PipelineOutcome
where
    F: JsonFetcher,
    L: PositionSource,
{
    let updates = Updates(tx);

    let Some(ip_location) = ip_lookup_step(fetcher, settings, &updates).await else {
        return PipelineOutcome::IpLookupFailed;
    };
    let Some(ip_location) = ip_location else {
        return PipelineOutcome::NoCoordinates;
    };
    debug!("IP-based position {}", ip_location.precise_label());

    let precise = match precise_location_step(locator, settings, &updates).await {
        Ok(at) => at,
        Err(e) => return PipelineOutcome::PreciseUnavailable(e.to_string()),
    };

    PipelineOutcome::Address(reverse_geocode_step(fetcher, settings, precise, &updates).await)
}

// None: the lookup failed. Some(None): it succeeded without usable coordinates.
async fn ip_lookup_step<F: JsonFetcher>(
    fetcher: &F,
    settings: &PipelineSettings,
    updates: &Updates<'_>,
) -> Option<Option<GeoPoint>> {
    let record = match lookup_ip(fetcher, &settings.ip_lookup_url).await {
        Ok(record) => record,
        Err(e) => {
            error!("IP lookup failed: {}", e);
            updates.post(PageUpdate::IpFailed);
            return None;
        }
    };

    updates.post(PageUpdate::IpResolved(IpSummary::from(&record)));

    let Some(at) = record.coordinates() else {
        warn!("IP lookup returned no usable coordinates; skipping precise location");
        updates.post(PageUpdate::NoCoordinates);
        return Some(None);
    };

    updates.post(PageUpdate::MapShown {
        at,
        zoom: settings.ip_zoom,
    });
    updates.post(PageUpdate::MarkerPopup {
        title: IP_POPUP_TITLE.to_string(),
        content: record.location_parts().join(", "),
    });
    Some(Some(at))
}

async fn precise_location_step<L: PositionSource>(
    locator: &L,
    settings: &PipelineSettings,
    updates: &Updates<'_>,
) -> Result<GeoPoint, PositionError> {
    let options = settings.position;
    let result = match tokio::time::timeout(options.timeout, locator.current_position(&options)).await {
        Ok(result) => result,
        Err(_) => Err(PositionError::Timeout),
    };

    match result {
        Ok(at) => {
            info!("Precise location {}", at.precise_label());
            updates.post(PageUpdate::PreciseFix {
                at,
                zoom: settings.precise_zoom,
            });
            Ok(at)
        }
        Err(e) => {
            info!("Precise location not available: {}", e);
            updates.post(PageUpdate::PreciseUnavailable);
            Err(e)
        }
    }
}

async fn reverse_geocode_step<F: JsonFetcher>(
    fetcher: &F,
    settings: &PipelineSettings,
    at: GeoPoint,
    updates: &Updates<'_>,
) -> AddressOutcome {
    let outcome = match reverse_geocode(fetcher, &settings.reverse_geocode_url, &settings.user_agent, at).await {
        Ok(Some(address)) => AddressOutcome::Found(address),
        Ok(None) => AddressOutcome::Unknown,
        Err(e) => {
            error!("Reverse geocoding error: {}", e);
            AddressOutcome::Failed
        }
    };

    let popup = match &outcome {
        AddressOutcome::Found(address) => address.clone(),
        AddressOutcome::Unknown | AddressOutcome::Failed => at.precise_label(),
    };
    updates.post(PageUpdate::Address(outcome.clone()));
    updates.post(PageUpdate::MarkerPopup {
        title: PRECISE_POPUP_TITLE.to_string(),
        content: popup,
    });
    outcome
}
