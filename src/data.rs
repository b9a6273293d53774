use std::collections::HashMap;

use self::osm::{Node, OsmId, Way};

pub mod osm;
pub mod water;

/// Map data as read from the input document. Only nodes and ways are kept, every other
/// element type is discarded while parsing.

#[derive(rkyv::Archive, rkyv::Deserialize, rkyv::Serialize, Debug, Default, Clone, PartialEq)]
#[archive(check_bytes)]
pub struct OsmMapData {
    pub nodes: HashMap<OsmId, Node>,
    pub ways: HashMap<OsmId, Way>,
}

impl OsmMapData {
    /// Later elements with the same id replace earlier ones.
    pub fn insert_node(&mut self, node: Node) {
        self.nodes.insert(node.id, node);
    }

    pub fn insert_way(&mut self, way: Way) {
        self.ways.insert(way.id, way);
    }
}
