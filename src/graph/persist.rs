//! Persistence of a built [`Network`]: the graph as a JSON snapshot and the
//! reprojected road set as a GeoJSON feature collection.

use geojson::{Feature, FeatureCollection, GeoJson, Geometry, GeometryValue};
use log::info;
use serde::{Deserialize, Serialize};

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::time::Instant;

use crate::build::{Network, RoadFeature};
use crate::error::{Error, Result};
use crate::geometry::NodeId;
use crate::graph::{Edge, Node, RoadGraph};

pub const GRAPH_FILE: &str = "road_network.json";
pub const ROADS_FILE: &str = "roads.geojson";

#[derive(Serialize, Deserialize)]
struct EdgeRecord {
    source: NodeId,
    target: NodeId,
    #[serde(flatten)]
    edge: Edge,
}

#[derive(Serialize, Deserialize)]
struct GraphSnapshot {
    nodes: Vec<Node>,
    edges: Vec<EdgeRecord>,
}

impl From<&RoadGraph> for GraphSnapshot {
    fn from(graph: &RoadGraph) -> Self {
        GraphSnapshot {
            nodes: graph.nodes().cloned().collect(),
            edges: graph
                .edges()
                .map(|(source, target, edge)| EdgeRecord {
                    source,
                    target,
                    edge: edge.clone(),
                })
                .collect(),
        }
    }
}

impl TryFrom<GraphSnapshot> for RoadGraph {
    type Error = Error;

    fn try_from(snapshot: GraphSnapshot) -> Result<Self> {
        let mut graph = RoadGraph::new();
        for node in snapshot.nodes {
            graph.add_node(node);
        }

        for record in snapshot.edges {
            for end in [record.source, record.target] {
                if !graph.contains_node(&end) {
                    return Err(Error::NodeNotFound(end));
                }
            }

            if record.edge.weight < 0.0 || !record.edge.weight.is_finite() {
                return Err(Error::InvalidGeometry(format!(
                    "edge {} -> {} has weight {}",
                    record.source, record.target, record.edge.weight
                )));
            }

            graph.insert_edge(record.source, record.target, record.edge);
        }

        Ok(graph)
    }
}

impl RoadGraph {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&GraphSnapshot::from(self))?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str::<GraphSnapshot>(json)?.try_into()
    }
}

impl RoadFeature {
    fn to_feature(&self) -> Feature {
        let mut feature = Feature::from(Geometry::new(GeometryValue::from(&self.geometry)));
        feature.properties = Some(self.properties.clone());
        feature
    }
}

/// Serialises roads as a GeoJSON feature collection.
pub fn roads_to_geojson(roads: &[RoadFeature]) -> FeatureCollection {
    FeatureCollection {
        features: roads.iter().map(RoadFeature::to_feature).collect(),
        bbox: None,
        foreign_members: None,
    }
}

/// Reads roads back from a GeoJSON document. Geometries are taken as they
/// are, without reprojection.
///
/// Edges refer to roads by position, so any feature that is not a line string
/// fails the whole read with [`Error::InvalidGeometry`].
pub fn roads_from_geojson(geojson: GeoJson) -> Result<Vec<RoadFeature>> {
    let collection = FeatureCollection::try_from(geojson)?;

    collection
        .features
        .into_iter()
        .enumerate()
        .map(|(index, feature)| {
            let geometry = feature.geometry.ok_or_else(|| {
                Error::InvalidGeometry(format!("persisted road {index} has no geometry"))
            })?;

            let line = geo::LineString::<f64>::try_from(geometry.value).map_err(|err| {
                let reason = format!("persisted road {index} is not a line string: {err}");
                Error::InvalidGeometry(reason)
            })?;

            Ok(RoadFeature::new(line, feature.properties.unwrap_or_default()))
        })
        .collect()
}

impl Network {
    /// Writes the graph and the road set into `dir`, creating it if needed.
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<()> {
        let start_time = Instant::now();
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        let writer = BufWriter::new(File::create(dir.join(GRAPH_FILE))?);
        serde_json::to_writer(writer, &GraphSnapshot::from(&self.graph))?;

        let writer = BufWriter::new(File::create(dir.join(ROADS_FILE))?);
        serde_json::to_writer(writer, &roads_to_geojson(&self.roads))?;

        info!(
            "Persisted network ({:?}) to {} in {:?}",
            self.graph,
            dir.display(),
            start_time.elapsed()
        );
        Ok(())
    }

    /// Loads a network previously written by [`Network::save`].
    pub fn load(dir: impl AsRef<Path>) -> Result<Network> {
        let start_time = Instant::now();
        let dir = dir.as_ref();

        let reader = BufReader::new(File::open(dir.join(GRAPH_FILE))?);
        let snapshot: GraphSnapshot = serde_json::from_reader(reader)?;
        let graph = RoadGraph::try_from(snapshot)?;

        let reader = BufReader::new(File::open(dir.join(ROADS_FILE))?);
        let roads = roads_from_geojson(GeoJson::from_reader(reader)?)?;

        info!(
            "Loaded network ({graph:?}, {} roads) from {} in {:?}",
            roads.len(),
            dir.display(),
            start_time.elapsed()
        );

        Ok(Network { graph, roads })
    }
}
