//! Required structures to project between geographic and planar coordinates.
//!
//! Edge weights are Euclidean lengths, so every geometry the network is built
//! from must first be moved into a single planar (metric) reference system.

use geo::{point, Point};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::{Error, Result};

/// Projects positions between a geographic (longitude/latitude, degrees) and a
/// planar reference system.
///
/// Geographic points carry the longitude as `x` and latitude as `y`.
pub trait Project: Send + Sync {
    /// Moves a geographic position into the planar system.
    fn project(&self, geographic: Point) -> Result<Point>;

    /// Moves a planar position back into geographic coordinates.
    fn unproject(&self, planar: Point) -> Result<Point>;
}

/// Transverse Mercator parameters, ellipsoid and false origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransverseMercator {
    pub semi_major_axis: f64,
    pub inverse_flattening: f64,
    pub origin_latitude: f64,
    pub central_meridian: f64,
    pub scale_factor: f64,
    pub false_easting: f64,
    pub false_northing: f64,
}

/// ETRS89 / Portugal TM06 (EPSG:3763).
pub const PT_TM06: TransverseMercator = TransverseMercator {
    semi_major_axis: 6_378_137.0,
    inverse_flattening: 298.257_222_101,
    origin_latitude: 39.668_258_333_333_3,
    central_meridian: -8.133_108_333_333_3,
    scale_factor: 1.0,
    false_easting: 0.0,
    false_northing: 0.0,
};

/// Beyond this longitude offset from the central meridian the series
/// expansion is no longer trustworthy.
const MAX_MERIDIAN_OFFSET: f64 = 30.0;

/// Precomputed series terms (Krüger, fourth order in the third flattening).
struct Series {
    rectifying_radius: f64,
    alpha: [f64; 4],
    beta: [f64; 4],
    delta: [f64; 4],
    eccentricity: f64,
}

impl TransverseMercator {
    fn series(&self) -> Series {
        let f = 1.0 / self.inverse_flattening;
        let n = f / (2.0 - f);
        let (n2, n3, n4) = (n * n, n * n * n, n * n * n * n);

        Series {
            rectifying_radius: self.semi_major_axis / (1.0 + n) * (1.0 + n2 / 4.0 + n4 / 64.0),
            alpha: [
                n / 2.0 - 2.0 * n2 / 3.0 + 5.0 * n3 / 16.0 + 41.0 * n4 / 180.0,
                13.0 * n2 / 48.0 - 3.0 * n3 / 5.0 + 557.0 * n4 / 1440.0,
                61.0 * n3 / 240.0 - 103.0 * n4 / 140.0,
                49561.0 * n4 / 161_280.0,
            ],
            beta: [
                n / 2.0 - 2.0 * n2 / 3.0 + 37.0 * n3 / 96.0 - n4 / 360.0,
                n2 / 48.0 + n3 / 15.0 - 437.0 * n4 / 1440.0,
                17.0 * n3 / 480.0 - 37.0 * n4 / 840.0,
                4397.0 * n4 / 161_280.0,
            ],
            delta: [
                2.0 * n - 2.0 * n2 / 3.0 - 2.0 * n3 + 116.0 * n4 / 45.0,
                7.0 * n2 / 3.0 - 8.0 * n3 / 5.0 - 227.0 * n4 / 45.0,
                56.0 * n3 / 15.0 - 136.0 * n4 / 35.0,
                4279.0 * n4 / 630.0,
            ],
            eccentricity: (f * (2.0 - f)).sqrt(),
        }
    }

    /// Gauss-Schreiber coordinates (ξ', η') on the unit sphere.
    fn conformal(series: &Series, latitude: f64, longitude_offset: f64) -> (f64, f64) {
        let e = series.eccentricity;
        let sin_phi = latitude.sin();
        let t = (sin_phi.atanh() - e * (e * sin_phi).atanh()).sinh();

        let xi = t.atan2(longitude_offset.cos());
        let eta = (longitude_offset.sin() / (1.0 + t * t).sqrt()).atanh();
        (xi, eta)
    }

    /// Northing of the origin latitude along the central meridian.
    fn origin_northing(&self, series: &Series) -> f64 {
        let (xi, _) = Self::conformal(series, self.origin_latitude.to_radians(), 0.0);
        let arc = xi
            + (1..=4)
                .map(|j| series.alpha[j - 1] * (2.0 * j as f64 * xi).sin())
                .sum::<f64>();

        self.scale_factor * series.rectifying_radius * arc
    }
}

impl Project for TransverseMercator {
    fn project(&self, geographic: Point) -> Result<Point> {
        let (longitude, latitude) = geographic.x_y();
        check_geographic(longitude, latitude)?;

        let offset = longitude - self.central_meridian;
        if offset.abs() > MAX_MERIDIAN_OFFSET {
            return Err(Error::Projection(format!(
                "longitude {longitude} is {offset:.3}° from the central meridian"
            )));
        }

        let series = self.series();
        let (xi, eta) = Self::conformal(&series, latitude.to_radians(), offset.to_radians());

        let (mut x, mut y) = (eta, xi);
        for j in 1..=4 {
            let k = 2.0 * j as f64;
            let a = series.alpha[j - 1];
            x += a * (k * xi).cos() * (k * eta).sinh();
            y += a * (k * xi).sin() * (k * eta).cosh();
        }

        let radius = self.scale_factor * series.rectifying_radius;
        let easting = self.false_easting + radius * x;
        let northing = self.false_northing + radius * y - self.origin_northing(&series);

        check_planar(easting, northing)?;
        Ok(point! { x: easting, y: northing })
    }

    fn unproject(&self, planar: Point) -> Result<Point> {
        let (easting, northing) = planar.x_y();
        check_planar(easting, northing)?;

        let series = self.series();
        let radius = self.scale_factor * series.rectifying_radius;

        let xi = (northing - self.false_northing + self.origin_northing(&series)) / radius;
        let eta = (easting - self.false_easting) / radius;

        let (mut xi_prime, mut eta_prime) = (xi, eta);
        for j in 1..=4 {
            let k = 2.0 * j as f64;
            let b = series.beta[j - 1];
            xi_prime -= b * (k * xi).sin() * (k * eta).cosh();
            eta_prime -= b * (k * xi).cos() * (k * eta).sinh();
        }

        let chi = (xi_prime.sin() / eta_prime.cosh()).clamp(-1.0, 1.0).asin();
        let latitude = chi
            + (1..=4)
                .map(|j| series.delta[j - 1] * (2.0 * j as f64 * chi).sin())
                .sum::<f64>();
        let longitude = eta_prime.sinh().atan2(xi_prime.cos());

        let geographic = point! {
            x: self.central_meridian + longitude.to_degrees(),
            y: latitude.to_degrees(),
        };

        check_geographic(geographic.x(), geographic.y())?;
        Ok(geographic)
    }
}

/// Identity projection for data that is already expressed in the working CRS.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Planar;

impl Project for Planar {
    fn project(&self, geographic: Point) -> Result<Point> {
        check_planar(geographic.x(), geographic.y())?;
        Ok(geographic)
    }

    fn unproject(&self, planar: Point) -> Result<Point> {
        check_planar(planar.x(), planar.y())?;
        Ok(planar)
    }
}

/// Projection selectable through configuration.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(ascii_case_insensitive)]
pub enum Projection {
    /// ETRS89 / Portugal TM06.
    #[default]
    #[strum(serialize = "EPSG:3763")]
    #[serde(rename = "EPSG:3763")]
    PtTm06,

    /// Coordinates are used as given.
    #[strum(serialize = "planar")]
    #[serde(rename = "planar")]
    Planar,
}

impl Project for Projection {
    fn project(&self, geographic: Point) -> Result<Point> {
        match self {
            Projection::PtTm06 => PT_TM06.project(geographic),
            Projection::Planar => Planar.project(geographic),
        }
    }

    fn unproject(&self, planar: Point) -> Result<Point> {
        match self {
            Projection::PtTm06 => PT_TM06.unproject(planar),
            Projection::Planar => Planar.unproject(planar),
        }
    }
}

fn check_geographic(longitude: f64, latitude: f64) -> Result<()> {
    if !longitude.is_finite() || !latitude.is_finite() {
        return Err(Error::Projection(format!(
            "non-finite coordinate ({longitude}, {latitude})"
        )));
    }

    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(Error::Projection(format!(
            "coordinate ({longitude}, {latitude}) is outside the geographic domain"
        )));
    }

    Ok(())
}

fn check_planar(x: f64, y: f64) -> Result<()> {
    if !x.is_finite() || !y.is_finite() {
        return Err(Error::Projection(format!(
            "non-finite planar coordinate ({x}, {y})"
        )));
    }

    Ok(())
}
