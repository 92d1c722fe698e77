use geo::{Distance, Euclidean, Point};
use log::{debug, info};
use rstar::{PointDistance, RTree, RTreeObject, AABB};

use std::borrow::Cow;
use std::fmt::{Debug, Formatter};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use crate::build::Network;
use crate::config::DepotConfig;
use crate::depot::site::{DepotSite, SiteRegistry};
use crate::error::{Error, Result};
use crate::geometry::{NodeId, Project, Projection};
use crate::graph::{NodeRole, Properties, RoadGraph};
use crate::index::RoadIndex;

/// The graph a single request routes over.
///
/// Borrowed when the depot coincides with a base node, otherwise an owned,
/// fully materialised copy of the base graph carrying the spliced depot.
pub type WorkingGraph<'a> = Cow<'a, RoadGraph>;

/// A base node as stored in the node index.
#[derive(Debug, Clone, Copy)]
struct IndexedNode {
    id: NodeId,
    position: Point,
}

impl RTreeObject for IndexedNode {
    type Envelope = AABB<Point>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

impl PointDistance for IndexedNode {
    fn distance_2(&self, point: &Point) -> f64 {
        self.position.distance_2(point)
    }
}

/// Places request-time depots into isolated working copies of a shared base
/// network.
///
/// The base network and both spatial indexes are never mutated after
/// construction. The manager is `Send + Sync`, and can be shared between
/// request threads behind an `Arc`.
pub struct DepotManager<P = Projection>
where
    P: Project,
{
    network: Network,
    roads: RoadIndex,
    nodes: RTree<IndexedNode>,
    projection: P,
    config: DepotConfig,
    sites: Mutex<SiteRegistry>,
}

impl<P: Project> Debug for DepotManager<P> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "DepotManager over {:?}, {:?}",
            self.network.graph, self.roads
        )
    }
}

impl<P: Project> DepotManager<P> {
    pub fn new(network: Network, projection: P, config: DepotConfig) -> Self {
        let start_time = Instant::now();

        let roads = RoadIndex::build(&network.roads);
        let nodes = RTree::bulk_load(
            network
                .graph
                .nodes()
                .map(|node| IndexedNode {
                    id: node.id,
                    position: node.position(),
                })
                .collect(),
        );

        info!(
            "Indexed {} nodes and {} roads in {:?}",
            nodes.size(),
            roads.size(),
            start_time.elapsed()
        );

        DepotManager {
            network,
            roads,
            nodes,
            projection,
            config,
            sites: Mutex::new(SiteRegistry::new(
                config.merge_radius,
                config.site_capacity,
            )),
        }
    }

    /// The shared, read-only base network.
    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn projection(&self) -> &P {
        &self.projection
    }

    /// Inserts a depot at the geographic location (`lat`, `lon`).
    ///
    /// Returns the working graph for the request and the depot's identity.
    /// A location strictly within the merge radius of a base node reuses that
    /// node and borrows the base graph. Otherwise the location is snapped onto
    /// the nearest road and spliced into a fresh copy; locations close to an
    /// earlier depot reuse its snapped position, so they resolve to the same
    /// identity.
    ///
    /// # Errors
    ///
    /// [`Error::Projection`] when the location is outside the projection's
    /// domain, and [`Error::OutOfNetwork`] when no road lies within the
    /// search radius.
    pub fn insert_depot(&self, lat: f64, lon: f64) -> Result<(WorkingGraph<'_>, NodeId)> {
        let point = self.projection.project(Point::new(lon, lat))?;

        if let Some(node) = self.nodes.nearest_neighbor(&point) {
            if Euclidean.distance(node.position, point) < self.config.merge_radius {
                debug!("Depot at ({lat}, {lon}) reuses base node {}", node.id);
                return Ok((Cow::Borrowed(&self.network.graph), node.id));
            }
        }

        // Looked up and recorded under one lock, so concurrent requests close
        // to each other agree on a single site.
        let site = {
            let mut sites = self.sites();
            match sites.nearby(point) {
                Some(site) => {
                    let reused = NodeId::from(site.position);
                    debug!("Depot at ({lat}, {lon}) reuses earlier site {reused}");
                    site
                }
                None => {
                    let site = self.locate(point)?;
                    sites.record(site);
                    site
                }
            }
        };

        let mut graph = self.network.graph.clone();
        let depot = graph.splice_at(
            site.feature,
            site.segment,
            site.position,
            NodeRole::Depot,
            depot_properties(),
        )?;

        debug!("Depot at ({lat}, {lon}) spliced as {depot} onto road {}", site.feature);
        Ok((Cow::Owned(graph), depot))
    }

    /// Snaps `point` onto the nearest road within the search radius.
    fn locate(&self, point: Point) -> Result<DepotSite> {
        let radius = self.config.search_radius;
        let (feature, distance) = self.roads.nearest_with_distance(point)?;
        if distance > radius {
            return Err(Error::OutOfNetwork {
                x: point.x(),
                y: point.y(),
                radius,
                distance,
            });
        }

        let road = self.network.roads.get(feature).ok_or(Error::NotFound)?;
        let (snap, segment) = road.snap(point).ok_or_else(|| {
            Error::InvalidGeometry(format!("road feature {feature} has no segments"))
        })?;

        Ok(DepotSite {
            requested: point,
            position: snap.position,
            feature,
            segment,
        })
    }

    fn sites(&self) -> MutexGuard<'_, SiteRegistry> {
        self.sites.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of depot sites currently remembered for reuse.
    pub fn remembered_sites(&self) -> usize {
        self.sites().len()
    }
}

fn depot_properties() -> Properties {
    let mut properties = Properties::new();
    properties.insert("role".to_string(), "depot".into());
    properties
}
