use geo::{Coord, Line, LineString, Point};
use geojson::{FeatureCollection, GeoJson};
use log::{debug, warn};

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::{Error, Result};
use crate::geometry::split::{snap_point_to_line, Snap};
use crate::geometry::Project;
use crate::graph::Properties;

/// A source road: a line geometry plus its property bag.
#[derive(Debug, Clone, PartialEq)]
pub struct RoadFeature {
    pub geometry: LineString,
    pub properties: Properties,
}

impl RoadFeature {
    pub fn new(geometry: LineString, properties: Properties) -> Self {
        RoadFeature {
            geometry,
            properties,
        }
    }

    /// The nearest position on the road to `point`, with the segment holding it.
    pub fn snap(&self, point: Point) -> Option<(Snap, Line)> {
        let snap = snap_point_to_line(&self.geometry, point)?;
        let segment = self.geometry.lines().nth(snap.segment)?;
        Some((snap, segment))
    }

    /// A road needs at least two finite, distinct vertices.
    pub fn validate(&self) -> Result<()> {
        let coords = &self.geometry.0;
        if coords.len() < 2 {
            return Err(Error::InvalidGeometry(format!(
                "line has {} vertices",
                coords.len()
            )));
        }

        if !coords.iter().all(|c| c.x.is_finite() && c.y.is_finite()) {
            return Err(Error::InvalidGeometry(
                "line has a non-finite vertex".to_string(),
            ));
        }

        if coords.iter().all(|c| *c == coords[0]) {
            return Err(Error::InvalidGeometry("line has zero length".to_string()));
        }

        Ok(())
    }

    pub fn reproject<P: Project + ?Sized>(&self, projection: &P) -> Result<Self> {
        let coords = self
            .geometry
            .coords()
            .map(|c| projection.project(Point(*c)).map(|p| p.0))
            .collect::<Result<Vec<Coord>>>()?;

        Ok(RoadFeature::new(
            LineString::new(coords),
            self.properties.clone(),
        ))
    }
}

/// A source point of interest, such as a taxi rank.
#[derive(Debug, Clone, PartialEq)]
pub struct PoiFeature {
    pub geometry: Point,
    pub properties: Properties,
}

impl PoiFeature {
    pub fn new(geometry: Point, properties: Properties) -> Self {
        PoiFeature {
            geometry,
            properties,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let (x, y) = self.geometry.x_y();
        if x.is_finite() && y.is_finite() {
            Ok(())
        } else {
            Err(Error::InvalidGeometry(format!(
                "point ({x}, {y}) is not finite"
            )))
        }
    }

    pub fn reproject<P: Project + ?Sized>(&self, projection: &P) -> Result<Self> {
        Ok(PoiFeature::new(
            projection.project(self.geometry)?,
            self.properties.clone(),
        ))
    }
}

/// Unprocessed road and point features, as loaded from their source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawFeatures {
    pub roads: Vec<RoadFeature>,
    pub pois: Vec<PoiFeature>,
}

impl RawFeatures {
    pub fn new(roads: Vec<RoadFeature>, pois: Vec<PoiFeature>) -> Self {
        RawFeatures { roads, pois }
    }

    pub fn is_empty(&self) -> bool {
        self.roads.is_empty() && self.pois.is_empty()
    }

    /// Splits a mixed feature collection into roads and points.
    ///
    /// Line strings (and each part of a multi line string) become roads, points
    /// become points of interest. Features without geometry, of any other
    /// geometry type, or with an invalid geometry are skipped with a warning.
    pub fn from_geojson(geojson: GeoJson) -> Result<Self> {
        let collection = FeatureCollection::try_from(geojson)?;
        let mut raw = RawFeatures::default();

        for (index, feature) in collection.features.into_iter().enumerate() {
            let properties = feature.properties.unwrap_or_default();
            let Some(geometry) = feature.geometry else {
                warn!("Feature {index} has no geometry, skipping");
                continue;
            };

            let geometry = match geo::Geometry::<f64>::try_from(geometry.value) {
                Ok(geometry) => geometry,
                Err(err) => {
                    warn!("Feature {index} has an unreadable geometry, skipping: {err}");
                    continue;
                }
            };

            match geometry {
                geo::Geometry::LineString(line) => {
                    raw.push_road(index, RoadFeature::new(line, properties))
                }
                geo::Geometry::MultiLineString(lines) => {
                    for line in lines {
                        raw.push_road(index, RoadFeature::new(line, properties.clone()));
                    }
                }
                geo::Geometry::Point(point) => {
                    raw.push_poi(index, PoiFeature::new(point, properties))
                }
                other => warn!(
                    "Feature {index} has unsupported geometry {}, skipping",
                    geometry_name(&other)
                ),
            }
        }

        debug!(
            "Read {} roads and {} points of interest",
            raw.roads.len(),
            raw.pois.len()
        );
        Ok(raw)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Self::from_geojson(GeoJson::from_reader(reader)?)
    }

    fn push_road(&mut self, index: usize, road: RoadFeature) {
        match road.validate() {
            Ok(()) => self.roads.push(road),
            Err(err) => warn!("Feature {index} skipped: {err}"),
        }
    }

    fn push_poi(&mut self, index: usize, poi: PoiFeature) {
        match poi.validate() {
            Ok(()) => self.pois.push(poi),
            Err(err) => warn!("Feature {index} skipped: {err}"),
        }
    }
}

fn geometry_name(geometry: &geo::Geometry) -> &'static str {
    match geometry {
        geo::Geometry::Point(_) => "Point",
        geo::Geometry::Line(_) => "Line",
        geo::Geometry::LineString(_) => "LineString",
        geo::Geometry::Polygon(_) => "Polygon",
        geo::Geometry::MultiPoint(_) => "MultiPoint",
        geo::Geometry::MultiLineString(_) => "MultiLineString",
        geo::Geometry::MultiPolygon(_) => "MultiPolygon",
        geo::Geometry::GeometryCollection(_) => "GeometryCollection",
        geo::Geometry::Rect(_) => "Rect",
        geo::Geometry::Triangle(_) => "Triangle",
    }
}
