use std::collections::HashMap;

use super::water::UNKNOWN_NAME;

pub type OsmId = i64;
pub type Tags = HashMap<String, String>;
pub type NodeTable = HashMap<OsmId, Node>;

#[derive(rkyv::Archive, rkyv::Deserialize, rkyv::Serialize, Debug, Clone, PartialEq)]
#[archive(check_bytes)]
pub struct Node {
    pub id: OsmId,
    pub lat: f64,
    pub lon: f64,
}

impl Node {
    pub fn new(id: OsmId, lat: f64, lon: f64) -> Self {
        Node { id, lat, lon }
    }
}

/// A tagged chain of node references. Nodes are looked up by id, never owned.
#[derive(rkyv::Archive, rkyv::Deserialize, rkyv::Serialize, Debug, Clone, PartialEq)]
#[archive(check_bytes)]
pub struct Way {
    pub id: OsmId,
    pub tags: Tags,
    pub node_ids: Vec<OsmId>,
}

impl Way {
    pub fn new(id: OsmId, tags: Tags, node_ids: Vec<OsmId>) -> Self {
        Way { id, tags, node_ids }
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.tags.contains_key(key)
    }

    pub fn has_kv_pair(&self, key: &str, value: &str) -> bool {
        self.tag(key).map_or(false, |tag_value| tag_value == value)
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// The `name` tag, or `"unknown"` for anonymous ways.
    pub fn name(&self) -> &str {
        self.tag("name").unwrap_or(UNKNOWN_NAME)
    }
}
