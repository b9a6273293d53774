//! Extracts waterbodies from OpenStreetMap data.
//!
//! Ways are matched against a fixed table of tag rules ([`classifier::RULES`]) and turned
//! into [`ClassifiedFeature`]s: streams, rivers and canals as lines, lakes, ponds and
//! reservoirs as areas. The features are collected by a [`FeatureAggregator`] and written
//! out as two GeoJSON layers.
//!
//! ```no_run
//! use std::collections::HashMap;
//! use osm_waterbodies::{classify, Node, Way};
//!
//! let nodes: HashMap<_, _> = [(1, Node::new(1, 0.0, 0.0)), (2, Node::new(2, 1.0, 1.0))].into();
//! let tags = [("waterway".to_string(), "river".to_string())].into();
//! let way = Way::new(10, tags, vec![1, 2]);
//! let river = classify(&way, &nodes)?.expect("a river");
//! println!("{}", river);
//! # Ok::<(), osm_waterbodies::WayError>(())
//! ```

pub mod aggregator;
pub mod classifier;
pub mod config;
pub mod data;
pub mod errors;
pub mod etl;
pub mod geometry;
pub mod writer;

pub use aggregator::{AggregatorState, FeatureAggregator};
pub use classifier::{classify, classify_all, Classification, Classifier};
pub use data::osm::{Node, NodeTable, OsmId, Way};
pub use data::water::{Category, ClassifiedFeature, Coords, Shape};
pub use errors::{Error, ErrorKind, Result, WayError};
pub use geometry::{GeodesicMeasure, Measure};
pub use writer::{FeatureWriter, GeoJsonWriter};
