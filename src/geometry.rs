use geo::{Coord, GeodesicArea, GeodesicLength, LineString, Polygon};

use crate::data::water::{Coords, Shape};

/// Length or area of a point sequence. Linear shapes are measured as a polyline in
/// metres, areal shapes as a single ring in square metres.
pub trait Measure {
    fn measure(&self, points: &[Coords], shape: Shape) -> f64;
}

impl<F> Measure for F
where
    F: Fn(&[Coords], Shape) -> f64,
{
    fn measure(&self, points: &[Coords], shape: Shape) -> f64 {
        self(points, shape)
    }
}

/// Measurements on the WGS84 ellipsoid, delegated to `geo`.
#[derive(Debug, Default, Clone, Copy)]
pub struct GeodesicMeasure;

impl GeodesicMeasure {
    fn line_string(points: &[Coords]) -> LineString<f64> {
        points.iter()
            .map(|point| Coord { x: point.lon, y: point.lat })
            .collect()
    }
}

impl Measure for GeodesicMeasure {
    fn measure(&self, points: &[Coords], shape: Shape) -> f64 {
        let line = Self::line_string(points);
        match shape {
            Shape::Linear => line.geodesic_length(),
            // Polygon::new closes the exterior ring if needed.
            Shape::Areal => Polygon::new(line, vec![]).geodesic_area_unsigned(),
        }
    }
}
