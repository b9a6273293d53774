use std::{fs::{self, File}, io::{BufWriter, Write}, path::{Path, PathBuf}};

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Position, Value as GeoJsonValue};
use serde_json::{json, Value};

use crate::{
    data::water::{ClassifiedFeature, Shape},
    errors::Result,
};

const CRS84: &str = "urn:ogc:def:crs:OGC:1.3:CRS84";

/// Persists a finished feature stream under a destination name.
pub trait FeatureWriter {
    fn write(&mut self, features: &[ClassifiedFeature], destination: &str) -> Result<()>;
}

/// Writes each stream as a GeoJSON `FeatureCollection` in WGS84 lon/lat.
///
/// Every feature carries `NAME`, `TYPE` and either `LENGTH` (metres) or `AREA`
/// (square metres). Polygon rings are closed on output.
pub struct GeoJsonWriter {
    dir: PathBuf,
}

impl GeoJsonWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        GeoJsonWriter { dir: dir.into() }
    }

    /// Destinations are bare file names, see `UserConfig::validate`.
    pub fn output_path(&self, destination: &str) -> PathBuf {
        self.dir.join(destination)
    }

    fn close_ring(mut ring: Vec<Position>) -> Vec<Position> {
        if let (Some(first), Some(last)) = (ring.first(), ring.last()) {
            if first != last {
                ring.push(first.clone());
            }
        }
        ring
    }

    fn to_feature(feature: &ClassifiedFeature) -> Feature {
        let positions: Vec<Position> = feature.points.iter()
            .map(|point| vec![point.lon, point.lat])
            .collect();

        let (geometry, measurement_key) = match feature.shape() {
            Shape::Linear => (GeoJsonValue::LineString(positions), "LENGTH"),
            Shape::Areal => (GeoJsonValue::Polygon(vec![Self::close_ring(positions)]), "AREA"),
        };

        let mut properties = JsonObject::new();
        properties.insert("NAME".to_string(), Value::String(feature.name.clone()));
        properties.insert("TYPE".to_string(), Value::String(feature.category.label().to_string()));
        properties.insert(measurement_key.to_string(), json!(feature.measurement));

        Feature {
            bbox: None,
            geometry: Some(Geometry::new(geometry)),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        }
    }

    fn layer_name(destination: &str) -> String {
        Path::new(destination)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(destination)
            .to_string()
    }

    fn collection_members(destination: &str) -> JsonObject {
        let mut members = JsonObject::new();
        members.insert("name".to_string(), Value::String(Self::layer_name(destination)));
        members.insert("crs".to_string(), json!({
            "type": "name",
            "properties": { "name": CRS84 },
        }));
        members
    }
}

impl FeatureWriter for GeoJsonWriter {
    fn write(&mut self, features: &[ClassifiedFeature], destination: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)?;

        let collection = FeatureCollection {
            bbox: None,
            features: features.iter().map(Self::to_feature).collect(),
            foreign_members: Some(Self::collection_members(destination)),
        };

        let mut output_file = BufWriter::new(File::create(self.output_path(destination))?);
        serde_json::to_writer_pretty(&mut output_file, &collection)?;
        output_file.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::water::{Category, Coords};

    fn read_json(path: &Path) -> Value {
        let file = File::open(path).unwrap();
        serde_json::from_reader(file).unwrap()
    }

    #[test]
    fn test_writes_line_schema() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = GeoJsonWriter::new(dir.path());
        let river = ClassifiedFeature {
            name: "Nile".to_string(),
            category: Category::River,
            points: vec![Coords::new(0.0, 0.0), Coords::new(1.0, 1.0)],
            measurement: 156_899.0,
        };

        writer.write(&[river], "lines.geojson").unwrap();

        let collection = read_json(&dir.path().join("lines.geojson"));
        assert_eq!(collection["type"], "FeatureCollection");
        assert_eq!(collection["name"], "lines");
        assert_eq!(collection["crs"]["properties"]["name"], CRS84);
        let feature = &collection["features"][0];
        assert_eq!(feature["geometry"]["type"], "LineString");
        assert_eq!(feature["geometry"]["coordinates"], json!([[0.0, 0.0], [1.0, 1.0]]));
        assert_eq!(feature["properties"]["NAME"], "Nile");
        assert_eq!(feature["properties"]["TYPE"], "River");
        assert_eq!(feature["properties"]["LENGTH"], 156_899.0);
        assert!(feature["properties"].get("AREA").is_none());
    }

    #[test]
    fn test_closes_open_rings() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = GeoJsonWriter::new(dir.path().join("nested"));
        let pond = ClassifiedFeature {
            name: "unknown".to_string(),
            category: Category::Pond,
            points: vec![Coords::new(0.0, 0.0), Coords::new(1.0, 0.0), Coords::new(1.0, 1.0)],
            measurement: 10.0,
        };
        let closed_pond = ClassifiedFeature {
            points: vec![
                Coords::new(0.0, 0.0),
                Coords::new(1.0, 0.0),
                Coords::new(1.0, 1.0),
                Coords::new(0.0, 0.0),
            ],
            ..pond.clone()
        };

        writer.write(&[pond, closed_pond], "areas.geojson").unwrap();

        let collection = read_json(&dir.path().join("nested").join("areas.geojson"));
        let expected_ring = json!([[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]);
        for feature in collection["features"].as_array().unwrap() {
            assert_eq!(feature["geometry"]["type"], "Polygon");
            assert_eq!(feature["geometry"]["coordinates"], expected_ring);
            assert_eq!(feature["properties"]["AREA"], 10.0);
        }
    }

    #[test]
    fn test_empty_stream_still_writes_collection() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = GeoJsonWriter::new(dir.path());

        writer.write(&[], "empty.geojson").unwrap();

        let collection = read_json(&dir.path().join("empty.geojson"));
        assert_eq!(collection["features"], json!([]));
    }

    #[test]
    fn test_output_parses_as_geojson() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = GeoJsonWriter::new(dir.path());
        let lake = ClassifiedFeature {
            name: "Windermere".to_string(),
            category: Category::Lake,
            points: vec![Coords::new(-2.9, 54.3), Coords::new(-2.9, 54.4), Coords::new(-2.95, 54.4)],
            measurement: 14_730_000.0,
        };

        writer.write(&[lake], "areas.geojson").unwrap();

        let file = File::open(dir.path().join("areas.geojson")).unwrap();
        let collection = match geojson::GeoJson::from_reader(file).unwrap() {
            geojson::GeoJson::FeatureCollection(collection) => collection,
            other => panic!("expected a feature collection, got {:?}", other),
        };
        assert_eq!(collection.features.len(), 1);
        let feature = &collection.features[0];
        assert_eq!(feature.property("TYPE"), Some(&json!("Lake")));
        match &feature.geometry.as_ref().unwrap().value {
            GeoJsonValue::Polygon(rings) => assert_eq!(rings[0].len(), 4),
            other => panic!("expected a polygon, got {:?}", other),
        }
        let members = collection.foreign_members.unwrap();
        assert_eq!(members["name"], "areas");
    }
}
