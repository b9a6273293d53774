use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::{
    aggregator::FeatureAggregator,
    classifier::Classifier,
    config::UserConfig,
    data::{osm::Way, OsmMapData},
    errors::Result,
    writer::GeoJsonWriter,
};

use super::{parse_osm::ParseOsmEtl, remove_if_exists, Etl};

pub const ETL_NAME: &str = "waterbodies";

/// Classifies the cached ways and writes the linear and areal waterbody outputs.
pub struct WaterbodiesEtl<'a> {
    config: &'a UserConfig,
    classifier: Classifier,
}

impl WaterbodiesEtl<'_> {
    pub fn new(config: &UserConfig) -> WaterbodiesEtl<'_> {
        WaterbodiesEtl {
            config,
            classifier: Classifier::default(),
        }
    }

    fn output_paths(&self, dir: &Path) -> [PathBuf; 2] {
        [
            dir.join(&self.config.lines_output),
            dir.join(&self.config.areas_output),
        ]
    }
}

impl Etl for WaterbodiesEtl<'_> {
    type Input = OsmMapData;
    type Output = FeatureAggregator;

    fn etl_name(&self) -> &str {
        ETL_NAME
    }

    fn is_cached(&self, dir: &Path) -> Result<bool> {
        for path in self.output_paths(dir) {
            if !path.try_exists()? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn clean(&self, dir: &Path) -> Result<()> {
        for path in self.output_paths(dir) {
            remove_if_exists(&path)?;
        }
        Ok(())
    }

    fn extract(&mut self, dir: &Path) -> Result<Self::Input> {
        ParseOsmEtl::read_cache(dir)
    }

    fn transform(&mut self, input: Self::Input) -> Result<Self::Output> {
        let OsmMapData { nodes, ways } = input;
        let ways: Box<dyn Iterator<Item = Way>> = if self.config.progress {
            Box::new(tqdm::tqdm(ways.into_values()))
        } else {
            Box::new(ways.into_values())
        };

        let classification = self.classifier.classify_all(ways, &nodes);
        info!(
            lines = classification.lines.len(),
            areas = classification.areas.len(),
            unmatched = classification.unmatched.len(),
            failed = classification.failures.len();
            "Classified ways"
        );

        let mut aggregator = FeatureAggregator::new();
        for feature in classification.lines.iter().chain(&classification.areas) {
            debug!("{}", feature);
        }
        aggregator.record_all(classification)?;
        Ok(aggregator)
    }

    fn load(&mut self, dir: &Path, mut output: Self::Output) -> Result<()> {
        let mut line_writer = GeoJsonWriter::new(dir);
        let mut area_writer = GeoJsonWriter::new(dir);
        output.flush(
            &mut line_writer,
            &mut area_writer,
            &self.config.lines_output,
            &self.config.areas_output,
        )
    }
}
