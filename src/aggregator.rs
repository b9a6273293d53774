use log::info;

use crate::{
    classifier::Classification,
    data::water::{ClassifiedFeature, Shape},
    errors::{Error, Result},
    writer::FeatureWriter,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregatorState {
    Empty,
    Accumulating,
    Flushed,
}

/// Collects features into a lines stream and an areas stream and hands both to writers
/// exactly once.
#[derive(Debug, Default)]
pub struct FeatureAggregator {
    lines: Vec<ClassifiedFeature>,
    areas: Vec<ClassifiedFeature>,
    flushed: bool,
}

impl FeatureAggregator {
    pub fn new() -> Self {
        FeatureAggregator::default()
    }

    pub fn state(&self) -> AggregatorState {
        if self.flushed {
            AggregatorState::Flushed
        } else if self.is_empty() {
            AggregatorState::Empty
        } else {
            AggregatorState::Accumulating
        }
    }

    pub fn lines(&self) -> &[ClassifiedFeature] {
        &self.lines
    }

    pub fn areas(&self) -> &[ClassifiedFeature] {
        &self.areas
    }

    pub fn len(&self) -> usize {
        self.lines.len() + self.areas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn record(&mut self, feature: ClassifiedFeature) -> Result<()> {
        if self.flushed {
            return Err(Error::already_flushed());
        }
        match feature.shape() {
            Shape::Linear => self.lines.push(feature),
            Shape::Areal => self.areas.push(feature),
        }
        Ok(())
    }

    pub fn record_all(&mut self, classification: Classification) -> Result<()> {
        for feature in classification.lines.into_iter().chain(classification.areas) {
            self.record(feature)?;
        }
        Ok(())
    }

    /// Hands the lines stream to `line_writer` and the areas stream to `area_writer`.
    ///
    /// The aggregator is `Flushed` from here on, even if a writer fails; the streams are
    /// not kept for a retry.
    pub fn flush(
        &mut self,
        line_writer: &mut dyn FeatureWriter,
        area_writer: &mut dyn FeatureWriter,
        line_dest: &str,
        area_dest: &str,
    ) -> Result<()> {
        if self.flushed {
            return Err(Error::already_flushed());
        }
        self.flushed = true;
        let lines = std::mem::take(&mut self.lines);
        let areas = std::mem::take(&mut self.areas);

        line_writer.write(&lines, line_dest)
            .map_err(|err| err.into_writer_failure(line_dest))?;
        info!(destination = line_dest, features = lines.len(); "Wrote linear features");

        area_writer.write(&areas, area_dest)
            .map_err(|err| err.into_writer_failure(area_dest))?;
        info!(destination = area_dest, features = areas.len(); "Wrote areal features");

        Ok(())
    }
}
