use geo::Point;
use itertools::Itertools;
use log::{debug, info, warn};
use rayon::prelude::*;

use std::time::Instant;

use crate::build::{PoiFeature, RawFeatures, RoadFeature};
use crate::config::BuildConfig;
use crate::error::{Error, Result};
use crate::geometry::{NodeId, Project};
use crate::graph::{NodeRole, RoadGraph};
use crate::index::RoadIndex;

/// The offline build product: the base graph and the reprojected road set it
/// was derived from. Road positions double as the feature indices recorded on
/// graph edges.
#[derive(Debug, Clone, Default)]
pub struct Network {
    pub graph: RoadGraph,
    pub roads: Vec<RoadFeature>,
}

/// Outcome counts of a network build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub roads: usize,
    pub skipped_roads: usize,
    pub integrated_pois: usize,
    pub skipped_pois: usize,
}

/// Builds the base network from raw geographic features.
///
/// Features failing validation or projection, and points of interest that
/// cannot be joined to a road within [`BuildConfig::poi_tolerance`], are
/// skipped with a warning rather than failing the whole build. Only an input
/// with no usable road at all is rejected.
pub fn build_base_network<P>(
    raw: RawFeatures,
    projection: &P,
    config: &BuildConfig,
) -> Result<(Network, BuildReport)>
where
    P: Project + ?Sized,
{
    let fixed_start_time = Instant::now();
    let mut start_time = Instant::now();
    let mut report = BuildReport::default();

    info!("Reprojecting...");
    let total_roads = raw.roads.len();
    let roads = raw
        .roads
        .par_iter()
        .enumerate()
        .filter_map(|(index, road)| {
            match road.validate().and_then(|_| road.reproject(projection)) {
                Ok(road) => Some(road),
                Err(err) => {
                    warn!("Road {index} skipped: {err}");
                    None
                }
            }
        })
        .collect::<Vec<RoadFeature>>();

    let pois = raw
        .pois
        .par_iter()
        .enumerate()
        .filter_map(|(index, poi)| {
            match poi.validate().and_then(|_| poi.reproject(projection)) {
                Ok(poi) => Some(poi),
                Err(err) => {
                    warn!("Point of interest {index} skipped: {err}");
                    None
                }
            }
        })
        .collect::<Vec<PoiFeature>>();

    report.roads = roads.len();
    report.skipped_roads = total_roads - roads.len();
    report.skipped_pois = raw.pois.len() - pois.len();

    if roads.is_empty() {
        return Err(Error::InvalidGeometry(format!(
            "none of the {total_roads} road features is usable"
        )));
    }

    debug!("Reprojection took: {:?}", start_time.elapsed());
    start_time = Instant::now();

    info!("Ingesting...");
    let mut graph = RoadGraph::new();
    for (feature, road) in roads.iter().enumerate() {
        road.geometry
            .points()
            .tuple_windows()
            .for_each(|(a, b): (Point, Point)| {
                if graph
                    .add_segment(a, b, Some(feature), &road.properties)
                    .is_none()
                {
                    debug!("Road {feature} has a degenerate segment at {}", NodeId::from(a));
                }
            });
    }

    debug!("Graphical ingestion took: {:?}", start_time.elapsed());
    start_time = Instant::now();

    let index = RoadIndex::build(&roads);
    for (position, poi) in pois.into_iter().enumerate() {
        match integrate_poi(&mut graph, &roads, &index, poi, config.poi_tolerance) {
            Ok(id) => {
                debug!("Point of interest {position} integrated as {id}");
                report.integrated_pois += 1;
            }
            Err(err) => {
                warn!("Point of interest {position} not integrated: {err}");
                report.skipped_pois += 1;
            }
        }
    }

    debug!("Point of interest splicing took: {:?}", start_time.elapsed());

    info!(
        "Finished. Built {graph:?} from {} roads, {} taxi ranks ({} skipped) in {}ms",
        report.roads,
        report.integrated_pois,
        report.skipped_pois,
        fixed_start_time.elapsed().as_millis()
    );

    Ok((Network { graph, roads }, report))
}

fn integrate_poi(
    graph: &mut RoadGraph,
    roads: &[RoadFeature],
    index: &RoadIndex,
    poi: PoiFeature,
    tolerance: f64,
) -> Result<NodeId> {
    let feature = index.nearest(poi.geometry)?;
    let road = roads.get(feature).ok_or(Error::NotFound)?;

    graph.splice_point(
        feature,
        road,
        poi.geometry,
        tolerance,
        NodeRole::TaxiRank,
        poi.properties,
    )
}
