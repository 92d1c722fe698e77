use clap::{Parser, Subcommand};
use log::{error, info};
use serde_json::{json, Value};

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use rankroute::{build_base_network, Config, DepotManager, Formulator, Network, RawFeatures, Result};

/// Taxi-rank fleet routing over a prebuilt road network.
#[derive(Debug, Parser)]
#[command(name = "rankroute", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Builds the road network from a GeoJSON feature collection.
    Build {
        /// Roads as line strings, taxi ranks as points.
        source: PathBuf,
        /// Directory the network is written to.
        out_dir: PathBuf,
    },

    /// Places a depot and routes the fleet through every taxi rank.
    Route {
        /// Directory holding a built network.
        network: PathBuf,
        #[arg(allow_negative_numbers = true)]
        lat: f64,
        #[arg(allow_negative_numbers = true)]
        lon: f64,
        /// Defaults to the configured fleet size.
        vehicles: Option<usize>,
        /// Defaults to the configured vehicle capacity.
        capacity: Option<u32>,
    },
}

fn main() -> ExitCode {
    dotenv::dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    let outcome = Config::from_env().and_then(|config| match cli.command {
        Command::Build { source, out_dir } => build(&config, source, out_dir),
        Command::Route {
            network,
            lat,
            lon,
            vehicles,
            capacity,
        } => route(
            &config,
            network,
            (lat, lon),
            vehicles.unwrap_or(config.routing.vehicles),
            capacity.unwrap_or(config.routing.capacity),
        ),
    });

    match outcome {
        Ok(response) => {
            println!("{response}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{err}");
            println!(
                "{}",
                json!({ "status": "error", "code": err.code(), "message": err.to_string() })
            );
            ExitCode::FAILURE
        }
    }
}

fn build(config: &Config, source: PathBuf, out_dir: PathBuf) -> Result<Value> {
    let start_time = Instant::now();
    let raw = RawFeatures::from_path(source)?;
    let (network, report) = build_base_network(raw, &config.projection, &config.build)?;
    network.save(out_dir)?;

    info!("Built network in {:?}", start_time.elapsed());
    Ok(json!({
        "status": "ok",
        "nodes": network.graph.node_count(),
        "edges": network.graph.edge_count(),
        "roads": report.roads,
        "skipped_roads": report.skipped_roads,
        "taxi_ranks": report.integrated_pois,
        "skipped_taxi_ranks": report.skipped_pois,
    }))
}

fn route(
    config: &Config,
    network: PathBuf,
    (lat, lon): (f64, f64),
    vehicles: usize,
    capacity: u32,
) -> Result<Value> {
    let network = Network::load(network)?;
    let manager = DepotManager::new(network, config.projection, config.depot);
    let (graph, depot) = manager.insert_depot(lat, lon)?;

    let routes = Formulator::from_config(&config.routing)
        .solve_routing(&graph, depot, vehicles, capacity)?;

    let coordinates = routes
        .iter()
        .map(|route| route.coordinates(&graph, manager.projection()))
        .collect::<Result<Vec<_>>>()?;

    Ok(json!({
        "status": "ok",
        "depot": depot.to_string(),
        "routes": coordinates,
    }))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test_log::test]
    fn route_fleet_arguments_are_optional() {
        let cli = Cli::try_parse_from(["rankroute", "route", "out", "38.7", "-9.14"])
            .expect("negative longitude parses");

        let Command::Route {
            network,
            lat,
            lon,
            vehicles,
            capacity,
        } = cli.command
        else {
            panic!("expected the route command");
        };

        assert_eq!(network, PathBuf::from("out"));
        assert_eq!((lat, lon), (38.7, -9.14));
        assert_eq!((vehicles, capacity), (None, None));

        let cli = Cli::try_parse_from(["rankroute", "route", "out", "38.7", "-9.14", "2", "6"])
            .expect("explicit fleet");
        assert!(matches!(
            cli.command,
            Command::Route {
                vehicles: Some(2),
                capacity: Some(6),
                ..
            }
        ));
    }

    #[test_log::test]
    fn malformed_arguments_are_rejected() {
        for args in [
            vec!["rankroute", "route", "out", "north", "-9.14"],
            vec!["rankroute", "route", "out", "38.7", "-9.14", "-1"],
            vec!["rankroute", "build", "roads.geojson"],
            vec!["rankroute", "serve"],
        ] {
            assert!(Cli::try_parse_from(&args).is_err(), "{args:?}");
        }
    }
}
