//! # Bay Harbor Catalog
//!
//! Named harbors the service knows about, each with a position for the marine
//! query and the nearest NOAA tide station for the tide query. The list is
//! configuration data (`[[harbors]]` in the config file); the defaults cover
//! the main recreational harbors of San Francisco Bay.

use serde::{Deserialize, Serialize};

use crate::{Coordinate, ServiceError};

/// A named harbor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Harbor {
    /// Lowercase identifier used in URLs and on the command line
    pub slug: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    /// NOAA CO-OPS station id
    pub tide_station: String,
}

impl Harbor {
    fn new(slug: &str, name: &str, lat: f64, lon: f64, tide_station: &str) -> Self {
        Harbor {
            slug: slug.to_string(),
            name: name.to_string(),
            lat,
            lon,
            tide_station: tide_station.to_string(),
        }
    }

    pub fn coordinate(&self) -> Result<Coordinate, ServiceError> {
        Coordinate::new(self.lat, self.lon)
    }
}

/// Built-in harbor list.
pub fn default_harbors() -> Vec<Harbor> {
    vec![
        Harbor::new("san-francisco", "San Francisco Marina", 37.8060, -122.4659, "9414290"),
        Harbor::new("sausalito", "Sausalito", 37.8591, -122.4853, "9414806"),
        Harbor::new("alameda", "Alameda", 37.7717, -122.2983, "9414750"),
        Harbor::new("richmond", "Richmond", 37.9117, -122.3600, "9414863"),
        Harbor::new("berkeley", "Berkeley Marina", 37.8650, -122.3117, "9414816"),
    ]
}

/// Lookup over the configured harbors.
#[derive(Clone, Debug, Default)]
pub struct HarborCatalog {
    harbors: Vec<Harbor>,
}

impl HarborCatalog {
    pub fn new(harbors: Vec<Harbor>) -> Self {
        Self { harbors }
    }

    /// Find a harbor by slug or display name, ignoring case.
    pub fn lookup(&self, name: &str) -> Result<&Harbor, ServiceError> {
        let wanted = name.trim();
        self.harbors
            .iter()
            .find(|h| h.slug.eq_ignore_ascii_case(wanted) || h.name.eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ServiceError::Domain(format!("unknown harbor '{}'", wanted)))
    }

    pub fn all(&self) -> &[Harbor] {
        &self.harbors
    }
}
