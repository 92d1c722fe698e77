//! Runtime configuration.
//!
//! Defaults reproduce the original deployment. They can be replaced wholesale
//! by a JSON document named through `RANKROUTE_CONFIG`, and individual values
//! can be overridden with `RANKROUTE_*` environment variables, read after any
//! `.env` file in the working directory has been loaded.

use log::debug;
use serde::{Deserialize, Serialize};

use std::fs::File;
use std::io::BufReader;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::geometry::Projection;

pub const CONFIG_PATH_VAR: &str = "RANKROUTE_CONFIG";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Largest distance, in working CRS units, at which a point of interest
    /// is still joined to its nearest road.
    pub poi_tolerance: f64,
}

impl Default for BuildConfig {
    fn default() -> Self {
        BuildConfig { poi_tolerance: 1.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepotConfig {
    /// A depot placed strictly closer than this to an existing node (or an
    /// earlier depot site) reuses it instead of splicing a new node.
    pub merge_radius: f64,

    /// Farthest a depot may lie from a road before it is rejected as out of
    /// the network.
    pub search_radius: f64,

    /// Most depot sites remembered for reuse; the least recently used is
    /// forgotten first.
    pub site_capacity: usize,
}

impl Default for DepotConfig {
    fn default() -> Self {
        DepotConfig {
            merge_radius: 10.0,
            search_radius: 500.0,
            site_capacity: 1_024,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    pub vehicles: usize,
    pub capacity: u32,

    /// Discount required road edges when costing the network.
    pub edge_coverage: bool,
    pub coverage_discount: f64,

    /// Solver budget in milliseconds.
    pub time_limit_ms: u64,
}

impl RoutingConfig {
    pub fn time_limit(&self) -> Duration {
        Duration::from_millis(self.time_limit_ms)
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        RoutingConfig {
            vehicles: 3,
            capacity: 4,
            edge_coverage: true,
            coverage_discount: 0.95,
            time_limit_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub projection: Projection,
    pub build: BuildConfig,
    pub depot: DepotConfig,
    pub routing: RoutingConfig,
}

impl Config {
    /// Loads the configuration from the process environment.
    pub fn from_env() -> Result<Config> {
        if let Ok(path) = dotenv::dotenv() {
            debug!("Loaded environment from {}", path.display());
        }

        let mut config = match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) => {
                debug!("Reading configuration from {path}");
                let reader = BufReader::new(File::open(&path)?);
                serde_json::from_reader(reader)?
            }
            Err(_) => Config::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `RANKROUTE_*` overrides resolved through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = &lookup;
        read_var(lookup, "RANKROUTE_PROJECTION", &mut self.projection)?;
        read_var(lookup, "RANKROUTE_POI_TOLERANCE", &mut self.build.poi_tolerance)?;
        read_var(lookup, "RANKROUTE_MERGE_RADIUS", &mut self.depot.merge_radius)?;
        read_var(lookup, "RANKROUTE_SEARCH_RADIUS", &mut self.depot.search_radius)?;
        read_var(lookup, "RANKROUTE_DEPOT_SITES", &mut self.depot.site_capacity)?;
        read_var(lookup, "RANKROUTE_VEHICLES", &mut self.routing.vehicles)?;
        read_var(lookup, "RANKROUTE_CAPACITY", &mut self.routing.capacity)?;
        read_var(lookup, "RANKROUTE_EDGE_COVERAGE", &mut self.routing.edge_coverage)?;
        read_var(
            lookup,
            "RANKROUTE_COVERAGE_DISCOUNT",
            &mut self.routing.coverage_discount,
        )?;
        read_var(lookup, "RANKROUTE_TIME_LIMIT_MS", &mut self.routing.time_limit_ms)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let non_negative = [
            ("poi_tolerance", self.build.poi_tolerance),
            ("merge_radius", self.depot.merge_radius),
            ("search_radius", self.depot.search_radius),
        ];

        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::Config(format!(
                    "{name} must be a non-negative distance, got {value}"
                )));
            }
        }

        let discount = self.routing.coverage_discount;
        if !(discount > 0.0 && discount <= 1.0) {
            return Err(Error::Config(format!(
                "coverage_discount must lie in (0, 1], got {discount}"
            )));
        }

        if self.depot.site_capacity == 0 {
            return Err(Error::Config("site_capacity must be positive".to_string()));
        }

        if self.routing.time_limit_ms == 0 {
            return Err(Error::Config("time_limit_ms must be positive".to_string()));
        }

        Ok(())
    }
}

fn read_var<T, F>(lookup: &F, key: &str, target: &mut T) -> Result<()>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(());
    };

    *target = raw
        .trim()
        .parse()
        .map_err(|err| Error::Config(format!("{key}={raw}: {err}")))?;

    debug!("{key} overridden to {raw}");
    Ok(())
}
