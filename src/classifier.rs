//! Tag-based recognition of waterbody ways.
//!
//! Every category is described by a [`WaterbodyRule`]: a list of tag predicates that must
//! all hold. Rules are tried in the order of [`RULES`] and the first one that matches
//! decides the category, even if a later rule would match as well.

use std::borrow::Borrow;

use log::{debug, warn};

use crate::{
    data::{
        osm::{NodeTable, OsmId, Way},
        water::{Category, ClassifiedFeature, Coords, Shape},
    },
    errors::WayError,
    geometry::{GeodesicMeasure, Measure},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagPredicate {
    /// The key is present, whatever its value.
    Present(&'static str),
    Equals(&'static str, &'static str),
}

impl TagPredicate {
    pub fn holds(&self, way: &Way) -> bool {
        match self {
            TagPredicate::Present(key) => way.has_key(key),
            TagPredicate::Equals(key, value) => way.has_kv_pair(key, value),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WaterbodyRule {
    pub category: Category,
    pub predicates: &'static [TagPredicate],
}

impl WaterbodyRule {
    pub fn matches(&self, way: &Way) -> bool {
        self.predicates.iter().all(|predicate| predicate.holds(way))
    }

    pub fn shape(&self) -> Shape {
        self.category.shape()
    }
}

pub static RULES: [WaterbodyRule; 6] = [
    WaterbodyRule {
        category: Category::Stream,
        predicates: &[TagPredicate::Equals("waterway", "stream")],
    },
    WaterbodyRule {
        category: Category::River,
        predicates: &[TagPredicate::Equals("waterway", "river")],
    },
    WaterbodyRule {
        category: Category::Canal,
        predicates: &[TagPredicate::Equals("waterway", "canal")],
    },
    WaterbodyRule {
        category: Category::Lake,
        predicates: &[TagPredicate::Present("natural"), TagPredicate::Equals("water", "lake")],
    },
    WaterbodyRule {
        category: Category::Pond,
        predicates: &[TagPredicate::Present("natural"), TagPredicate::Equals("water", "pond")],
    },
    WaterbodyRule {
        category: Category::Reservoir,
        predicates: &[TagPredicate::Present("natural"), TagPredicate::Equals("water", "reservoir")],
    },
];

pub fn matching_rule(way: &Way) -> Option<&'static WaterbodyRule> {
    RULES.iter().find(|rule| rule.matches(way))
}

/// All categories whose predicates hold for `way`, in rule order.
pub fn matching_categories(way: &Way) -> Vec<Category> {
    RULES.iter()
        .filter(|rule| rule.matches(way))
        .map(|rule| rule.category)
        .collect()
}

/// Result of classifying a batch of ways.
///
/// `unmatched` lists every way that produced no feature, failed ones included, so the
/// three collections always add up to the number of ways seen. `failures` keeps the
/// reason for each failed way.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Classification {
    pub lines: Vec<ClassifiedFeature>,
    pub areas: Vec<ClassifiedFeature>,
    pub unmatched: Vec<OsmId>,
    pub failures: Vec<WayError>,
}

impl Classification {
    pub fn total(&self) -> usize {
        self.lines.len() + self.areas.len() + self.unmatched.len()
    }
}

pub struct Classifier<M: Measure = GeodesicMeasure> {
    measure: M,
}

impl Default for Classifier<GeodesicMeasure> {
    fn default() -> Self {
        Classifier::new(GeodesicMeasure)
    }
}

impl<M: Measure> Classifier<M> {
    pub fn new(measure: M) -> Self {
        Classifier { measure }
    }

    fn resolve_points(way: &Way, nodes: &NodeTable) -> Result<Vec<Coords>, WayError> {
        way.node_ids.iter()
            .map(|node_id| {
                nodes.get(node_id)
                    .map(Coords::from)
                    .ok_or(WayError::MissingNodeReference { way_id: way.id, node_id: *node_id })
            })
            .collect()
    }

    /// Returns `Ok(None)` for ways that are not waterbodies, including ways without tags
    /// or without nodes.
    pub fn classify(&self, way: &Way, nodes: &NodeTable) -> Result<Option<ClassifiedFeature>, WayError> {
        if way.tags.is_empty() || way.node_ids.is_empty() {
            return Ok(None);
        }
        let rule = match matching_rule(way) {
            Some(rule) => rule,
            None => return Ok(None),
        };

        let points = Self::resolve_points(way, nodes)?;
        let shape = rule.shape();
        let vertices = shape.vertex_count(&points);
        if vertices < shape.min_points() {
            return Err(WayError::MalformedWay {
                way_id: way.id,
                reason: format!(
                    "{} needs at least {} distinct points, got {}",
                    rule.category, shape.min_points(), vertices
                ),
            });
        }

        let measurement = self.measure.measure(&points, shape);
        Ok(Some(ClassifiedFeature {
            name: way.name().to_string(),
            category: rule.category,
            points,
            measurement,
        }))
    }

    /// Classifies every way. A way that fails is logged and skipped, it never stops the
    /// pass.
    pub fn classify_all<I>(&self, ways: I, nodes: &NodeTable) -> Classification
    where
        I: IntoIterator,
        I::Item: Borrow<Way>,
    {
        let mut classification = Classification::default();

        for way in ways {
            let way: &Way = way.borrow();
            if log::log_enabled!(log::Level::Debug) {
                let categories = matching_categories(way);
                if categories.len() > 1 {
                    debug!(way_id = way.id, kept = categories[0].label(); "Way matches several categories");
                }
            }

            match self.classify(way, nodes) {
                Ok(Some(feature)) => match feature.shape() {
                    Shape::Linear => classification.lines.push(feature),
                    Shape::Areal => classification.areas.push(feature),
                },
                Ok(None) => classification.unmatched.push(way.id),
                Err(err) => {
                    let message = err.to_string();
                    warn!(way_id = way.id, err = message.as_str(); "Skipping way");
                    classification.unmatched.push(way.id);
                    classification.failures.push(err);
                },
            }
        }

        classification
    }
}

pub fn classify(way: &Way, nodes: &NodeTable) -> Result<Option<ClassifiedFeature>, WayError> {
    Classifier::<GeodesicMeasure>::default().classify(way, nodes)
}

pub fn classify_all<I>(ways: I, nodes: &NodeTable) -> Classification
where
    I: IntoIterator,
    I::Item: Borrow<Way>,
{
    Classifier::<GeodesicMeasure>::default().classify_all(ways, nodes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::osm::{Node, Tags};

    fn tags(pairs: &[(&str, &str)]) -> Tags {
        pairs.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn node_table(nodes: &[(OsmId, f64, f64)]) -> NodeTable {
        nodes.iter()
            .map(|&(id, lon, lat)| (id, Node::new(id, lat, lon)))
            .collect()
    }

    fn square_nodes() -> NodeTable {
        node_table(&[(1, 0.0, 0.0), (2, 0.001, 0.0), (3, 0.001, 0.001), (4, 0.0, 0.001)])
    }

    fn zero_measure() -> Classifier<fn(&[Coords], Shape) -> f64> {
        fn zero(_points: &[Coords], _shape: Shape) -> f64 {
            0.0
        }
        Classifier::new(zero as fn(&[Coords], Shape) -> f64)
    }

    #[test]
    fn test_stream_keeps_every_node() {
        let nodes = square_nodes();
        let way = Way::new(5, tags(&[("waterway", "stream")]), vec![1, 2, 3, 4]);

        let feature = classify(&way, &nodes).unwrap().unwrap();
        assert_eq!(feature.category, Category::Stream);
        assert_eq!(feature.points.len(), way.node_ids.len());
        assert!(feature.measurement > 0.0);
    }

    #[test]
    fn test_nile_end_to_end() {
        let nodes = node_table(&[(1, 0.0, 0.0), (2, 1.0, 1.0)]);
        let way = Way::new(10, tags(&[("waterway", "river"), ("name", "Nile")]), vec![1, 2]);

        let feature = classify(&way, &nodes).unwrap().unwrap();
        assert_eq!(feature.name, "Nile");
        assert_eq!(feature.category, Category::River);
        assert_eq!(feature.points, vec![Coords::new(0.0, 0.0), Coords::new(1.0, 1.0)]);
    }

    #[test]
    fn test_unnamed_lake() {
        let nodes = square_nodes();
        let way = Way::new(7, tags(&[("natural", "water"), ("water", "lake")]), vec![1, 2, 3, 4, 1]);

        let feature = classify(&way, &nodes).unwrap().unwrap();
        assert_eq!(feature.category, Category::Lake);
        assert_eq!(feature.name, "unknown");
        assert_eq!(feature.shape(), Shape::Areal);
    }

    #[test]
    fn test_every_rule() {
        let nodes = square_nodes();
        let cases = [
            (tags(&[("waterway", "stream")]), Category::Stream),
            (tags(&[("waterway", "river")]), Category::River),
            (tags(&[("waterway", "canal")]), Category::Canal),
            (tags(&[("natural", "water"), ("water", "lake")]), Category::Lake),
            (tags(&[("natural", "water"), ("water", "pond")]), Category::Pond),
            (tags(&[("natural", "water"), ("water", "reservoir")]), Category::Reservoir),
        ];
        for (way_tags, expected) in cases {
            let way = Way::new(1, way_tags, vec![1, 2, 3, 4]);
            let feature = zero_measure().classify(&way, &nodes).unwrap().unwrap();
            assert_eq!(feature.category, expected);
        }
    }

    #[test]
    fn test_non_waterbodies_do_not_match() {
        let nodes = square_nodes();
        let not_water = [
            tags(&[("highway", "residential")]),
            tags(&[("waterway", "ditch")]),
            // `water` without `natural`
            tags(&[("water", "lake")]),
            // `natural` without `water`
            tags(&[("natural", "water")]),
            tags(&[("natural", "water"), ("water", "river")]),
        ];
        for way_tags in not_water {
            let way = Way::new(1, way_tags, vec![1, 2, 3, 4]);
            assert_eq!(classify(&way, &nodes), Ok(None));
        }
    }

    #[test]
    fn test_first_rule_wins() {
        let nodes = square_nodes();
        let way = Way::new(
            3,
            tags(&[("waterway", "river"), ("natural", "water"), ("water", "lake")]),
            vec![1, 2, 3, 4, 1],
        );

        assert_eq!(matching_categories(&way), vec![Category::River, Category::Lake]);
        let feature = classify(&way, &nodes).unwrap().unwrap();
        assert_eq!(feature.category, Category::River);
    }

    #[test]
    fn test_tolerates_empty_ways() {
        let nodes = square_nodes();
        let untagged = Way::new(1, Tags::new(), vec![1, 2]);
        let no_nodes = Way::new(2, tags(&[("waterway", "river")]), vec![]);

        assert_eq!(classify(&untagged, &nodes), Ok(None));
        assert_eq!(classify(&no_nodes, &nodes), Ok(None));
    }

    #[test]
    fn test_degenerate_geometry_is_malformed() {
        let nodes = square_nodes();
        let single_point = Way::new(4, tags(&[("waterway", "canal")]), vec![1]);
        let two_point_pond = Way::new(5, tags(&[("natural", "water"), ("water", "pond")]), vec![1, 2]);
        let collapsed_lake = Way::new(6, tags(&[("natural", "water"), ("water", "lake")]), vec![1, 2, 1]);
        let triangle_lake = Way::new(7, tags(&[("natural", "water"), ("water", "lake")]), vec![1, 2, 3, 1]);

        assert!(matches!(
            classify(&single_point, &nodes),
            Err(WayError::MalformedWay { way_id: 4, .. })
        ));
        assert!(matches!(
            classify(&two_point_pond, &nodes),
            Err(WayError::MalformedWay { way_id: 5, .. })
        ));
        assert!(matches!(
            classify(&collapsed_lake, &nodes),
            Err(WayError::MalformedWay { way_id: 6, .. })
        ));
        let triangle = classify(&triangle_lake, &nodes).unwrap().unwrap();
        assert_eq!(triangle.category, Category::Lake);
        assert!(triangle.measurement > 0.0);
    }

    #[test]
    fn test_missing_node_reference() {
        let nodes = square_nodes();
        let way = Way::new(8, tags(&[("waterway", "stream")]), vec![1, 99, 2]);

        assert_eq!(
            classify(&way, &nodes),
            Err(WayError::MissingNodeReference { way_id: 8, node_id: 99 })
        );
    }

    #[test]
    fn test_classify_is_repeatable() {
        let nodes = square_nodes();
        let way = Way::new(9, tags(&[("natural", "water"), ("water", "reservoir")]), vec![1, 2, 3, 4]);
        let way_before = way.clone();
        let nodes_before = nodes.clone();

        let first = classify(&way, &nodes);
        let second = classify(&way, &nodes);
        assert_eq!(first, second);
        assert_eq!(way, way_before);
        assert_eq!(nodes, nodes_before);
    }

    #[test]
    fn test_classify_all_partitions_ways() {
        let nodes = square_nodes();
        let ways = vec![
            Way::new(1, tags(&[("waterway", "stream")]), vec![1, 2]),
            Way::new(2, tags(&[("waterway", "river")]), vec![1, 42]),
            Way::new(3, tags(&[("natural", "water"), ("water", "pond")]), vec![1, 2, 3, 4]),
            Way::new(4, tags(&[("building", "yes")]), vec![1, 2, 3, 4]),
            Way::new(5, tags(&[("waterway", "canal")]), vec![2, 3]),
            Way::new(6, Tags::new(), vec![]),
        ];

        let classification = classify_all(&ways, &nodes);
        assert_eq!(classification.total(), ways.len());
        assert_eq!(classification.lines.len(), 2);
        assert_eq!(classification.areas.len(), 1);
        assert_eq!(classification.unmatched, vec![2, 4, 6]);

        // The broken way does not stop the ways after it.
        assert_eq!(
            classification.failures,
            vec![WayError::MissingNodeReference { way_id: 2, node_id: 42 }]
        );
        assert_eq!(classification.lines[1].category, Category::Canal);
    }

    #[test]
    fn test_injected_measure() {
        let nodes = square_nodes();
        let way = Way::new(1, tags(&[("waterway", "stream")]), vec![1, 2, 3]);
        let classifier = Classifier::new(|points: &[Coords], shape: Shape| {
            assert_eq!(shape, Shape::Linear);
            points.len() as f64 * 10.0
        });

        let feature = classifier.classify(&way, &nodes).unwrap().unwrap();
        assert_eq!(feature.measurement, 30.0);
    }
}
