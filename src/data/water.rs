use std::fmt;

use super::osm::Node;

pub const UNKNOWN_NAME: &str = "unknown";

/// Open polyline or closed ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    Linear,
    Areal,
}

impl Shape {
    /// Smallest point count that still describes a usable geometry of this shape.
    pub fn min_points(self) -> usize {
        match self {
            Shape::Linear => 2,
            Shape::Areal => 3,
        }
    }

    /// Number of distinct vertices the points describe. A ring's closing point repeats
    /// its first one and is not counted.
    pub fn vertex_count(self, points: &[Coords]) -> usize {
        match (self, points.first(), points.last()) {
            (Shape::Areal, Some(first), Some(last)) if points.len() > 1 && first == last => {
                points.len() - 1
            },
            _ => points.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Stream,
    River,
    Canal,
    Lake,
    Pond,
    Reservoir,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Stream,
        Category::River,
        Category::Canal,
        Category::Lake,
        Category::Pond,
        Category::Reservoir,
    ];

    pub fn shape(self) -> Shape {
        match self {
            Category::Stream | Category::River | Category::Canal => Shape::Linear,
            Category::Lake | Category::Pond | Category::Reservoir => Shape::Areal,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Stream => "Stream",
            Category::River => "River",
            Category::Canal => "Canal",
            Category::Lake => "Lake",
            Category::Pond => "Pond",
            Category::Reservoir => "Reservoir",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coords {
    pub lon: f64,
    pub lat: f64,
}

impl Coords {
    pub fn new(lon: f64, lat: f64) -> Self {
        Coords { lon, lat }
    }
}

impl From<&Node> for Coords {
    fn from(value: &Node) -> Self {
        Coords {
            lon: value.lon,
            lat: value.lat,
        }
    }
}

/// A way that was recognised as a waterbody, with its resolved geometry.
///
/// `measurement` is a length in metres for linear categories and an area in square
/// metres for areal ones.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedFeature {
    pub name: String,
    pub category: Category,
    pub points: Vec<Coords>,
    pub measurement: f64,
}

impl ClassifiedFeature {
    pub fn shape(&self) -> Shape {
        self.category.shape()
    }
}

impl fmt::Display for ClassifiedFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.shape() {
            Shape::Linear => write!(
                f, "Name: {}, Type: {} (length: {}m)", self.name, self.category, self.measurement
            ),
            Shape::Areal => write!(
                f, "Name: {}, Type: {} (area: {} square m)", self.name, self.category, self.measurement
            ),
        }
    }
}
