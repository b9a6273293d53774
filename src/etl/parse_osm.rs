use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};

use log::{info, warn};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use rkyv::AlignedVec;
use serde::Deserialize;
use xz::bufread::XzDecoder;

use crate::config::UserConfig;
use crate::data::OsmMapData;
use crate::data::osm::{Node, OsmId, Tags, Way};
use crate::errors::{Error, Result};
use crate::etl::{remove_if_exists, Etl};

pub const ETL_NAME: &str = "parse_osm";
pub const OUTPUT_FILE_NAME: &str = "osm_elements.rkyv";
const PARTIAL_FILE_NAME: &str = "osm_elements.rkyv.partial";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// Overpass-style `{"elements": [...]}` document.
    Json,
    /// Plain `.osm` XML.
    Xml,
}

impl InputFormat {
    /// Picks the format from the file name. A trailing `.xz` marks a compressed document.
    pub fn detect(path: &Path) -> Result<(InputFormat, bool)> {
        let file_name = path.file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| Error::config(format!("Invalid input path {}", path.display())))?
            .to_ascii_lowercase();

        let (inner_name, compressed) = match file_name.strip_suffix(".xz") {
            Some(inner_name) => (inner_name, true),
            None => (file_name.as_str(), false),
        };

        let format = if inner_name.ends_with(".json") {
            InputFormat::Json
        } else if inner_name.ends_with(".osm") || inner_name.ends_with(".xml") {
            InputFormat::Xml
        } else {
            return Err(Error::config(format!("Unsupported input format: {}", path.display())));
        };
        Ok((format, compressed))
    }
}

pub struct InputDocument {
    pub format: InputFormat,
    pub reader: Box<dyn BufRead>,
}

#[derive(Deserialize)]
struct OverpassDocument {
    elements: Vec<OverpassElement>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum OverpassElement {
    Node {
        id: OsmId,
        #[serde(default)]
        lat: Option<f64>,
        #[serde(default)]
        lon: Option<f64>,
    },
    Way {
        id: OsmId,
        #[serde(default)]
        nodes: Vec<OsmId>,
        #[serde(default)]
        tags: Tags,
    },
    #[serde(other)]
    Other,
}

pub struct ParseOsmEtl<'a> {
    config: &'a UserConfig,
}

impl ParseOsmEtl<'_> {
    pub fn new(config: &UserConfig) -> ParseOsmEtl<'_> {
        ParseOsmEtl {
            config
        }
    }

    fn output_path(dir: &Path) -> PathBuf {
        dir.join(OUTPUT_FILE_NAME)
    }

    fn partial_path(dir: &Path) -> PathBuf {
        dir.join(PARTIAL_FILE_NAME)
    }

    fn open_input(&self) -> Result<InputDocument> {
        let path = Path::new(&self.config.data_path);
        let (format, compressed) = InputFormat::detect(path)?;
        let file_reader = BufReader::new(File::open(path)?);

        let reader: Box<dyn BufRead> = if compressed {
            Box::new(BufReader::new(XzDecoder::new(file_reader)))
        } else {
            Box::new(file_reader)
        };
        Ok(InputDocument { format, reader })
    }

    fn node_from_parts(id: OsmId, lat: Option<f64>, lon: Option<f64>) -> Option<Node> {
        match (lat, lon) {
            (Some(lat), Some(lon)) => Some(Node { id, lat, lon }),
            _ => {
                warn!(node_id = id; "Dropping node without coordinates");
                None
            },
        }
    }

    pub fn parse_json(reader: impl Read) -> Result<OsmMapData> {
        let document: OverpassDocument = serde_json::from_reader(reader)?;
        let mut data = OsmMapData::default();

        for element in document.elements {
            match element {
                OverpassElement::Node { id, lat, lon } => {
                    if let Some(node) = Self::node_from_parts(id, lat, lon) {
                        data.insert_node(node);
                    }
                },
                OverpassElement::Way { id, nodes, tags } => {
                    data.insert_way(Way::new(id, tags, nodes));
                },
                OverpassElement::Other => (),
            }
        }
        Ok(data)
    }

    fn attribute(el: &BytesStart, key: &[u8]) -> Result<Option<String>> {
        for attribute_res in el.attributes() {
            let attribute = attribute_res?;
            if attribute.key.as_ref() == key {
                return Ok(Some(attribute.unescape_value()?.into_owned()));
            }
        }
        Ok(None)
    }

    fn parse_id(el: &BytesStart, key: &[u8]) -> Result<Option<OsmId>> {
        match Self::attribute(el, key)? {
            Some(value) => Ok(Some(value.trim().parse()?)),
            None => Ok(None),
        }
    }

    fn parse_coordinate(el: &BytesStart, key: &[u8]) -> Result<Option<f64>> {
        match Self::attribute(el, key)? {
            Some(value) => Ok(Some(value.trim().parse()?)),
            None => Ok(None),
        }
    }

    fn open_element(el: &BytesStart, data: &mut OsmMapData, current_way: &mut Option<Way>) -> Result<()> {
        match el.name().as_ref() {
            b"node" => {
                let Some(id) = Self::parse_id(el, b"id")? else {
                    warn!("Dropping node without id");
                    return Ok(());
                };
                let lat = Self::parse_coordinate(el, b"lat")?;
                let lon = Self::parse_coordinate(el, b"lon")?;
                if let Some(node) = Self::node_from_parts(id, lat, lon) {
                    data.insert_node(node);
                }
            },
            b"way" => {
                *current_way = match Self::parse_id(el, b"id")? {
                    Some(id) => Some(Way::new(id, Tags::new(), Vec::new())),
                    None => {
                        warn!("Dropping way without id");
                        None
                    },
                };
            },
            b"nd" => {
                if let Some(way) = current_way.as_mut() {
                    if let Some(node_id) = Self::parse_id(el, b"ref")? {
                        way.node_ids.push(node_id);
                    }
                }
            },
            // Tags of nodes and relations are not needed.
            b"tag" => {
                if let Some(way) = current_way.as_mut() {
                    let key = Self::attribute(el, b"k")?;
                    let value = Self::attribute(el, b"v")?;
                    if let (Some(key), Some(value)) = (key, value) {
                        way.tags.insert(key, value);
                    }
                }
            },
            _ => (),
        }
        Ok(())
    }

    fn close_way(data: &mut OsmMapData, current_way: &mut Option<Way>) {
        if let Some(way) = current_way.take() {
            data.insert_way(way);
        }
    }

    pub fn parse_xml(reader: impl BufRead) -> Result<OsmMapData> {
        let mut reader = Reader::from_reader(reader);
        reader.trim_text(true);
        let mut buf = Vec::new();

        let mut data = OsmMapData::default();
        let mut current_way: Option<Way> = None;

        loop {
            match reader.read_event_into(&mut buf) {
                Err(e) => return Err(e.into()),
                Ok(Event::Eof) => break,
                Ok(Event::Start(e)) => Self::open_element(&e, &mut data, &mut current_way)?,
                Ok(Event::Empty(e)) => {
                    Self::open_element(&e, &mut data, &mut current_way)?;
                    if e.name().as_ref() == b"way" {
                        Self::close_way(&mut data, &mut current_way);
                    }
                },
                Ok(Event::End(e)) => {
                    if e.name().as_ref() == b"way" {
                        Self::close_way(&mut data, &mut current_way);
                    }
                },
                // Declarations, comments and text carry nothing we need.
                Ok(_) => (),
            }
            buf.clear();
        };
        Ok(data)
    }

    /// Reads the map data written by a previous run of this stage.
    ///
    /// The archive is validated before it is deserialized, so a damaged file is
    /// reported as an `ErrorKind::Cache` error.
    pub fn read_cache(dir: &Path) -> Result<OsmMapData> {
        let mut input_file = File::open(Self::output_path(dir))?;
        let mut buf_vec: Vec<u8> = Vec::new();
        input_file.read_to_end(&mut buf_vec)?;

        let mut aligned = AlignedVec::with_capacity(buf_vec.len());
        aligned.extend_from_slice(&buf_vec);

        let data = rkyv::from_bytes::<OsmMapData>(&aligned)
            .map_err(|err| Error::cache(format!("Could not deserialize OSM element cache: {:?}", err)))?;
        Ok(data)
    }
}

impl Etl for ParseOsmEtl<'_> {
    type Input = InputDocument;
    type Output = OsmMapData;

    fn etl_name(&self) -> &str {
        ETL_NAME
    }

    fn is_cached(&self, dir: &Path) -> Result<bool> {
        Ok(Self::output_path(dir).try_exists()?)
    }

    fn clean(&self, dir: &Path) -> Result<()> {
        remove_if_exists(&Self::partial_path(dir))?;
        remove_if_exists(&Self::output_path(dir))
    }

    fn extract(&mut self, _dir: &Path) -> Result<Self::Input> {
        self.open_input()
    }

    fn transform(&mut self, input: Self::Input) -> Result<Self::Output> {
        let data = match input.format {
            InputFormat::Json => Self::parse_json(input.reader)?,
            InputFormat::Xml => Self::parse_xml(input.reader)?,
        };
        info!(nodes = data.nodes.len(), ways = data.ways.len(); "Parsed OSM document");
        Ok(data)
    }

    fn load(&mut self, dir: &Path, output: Self::Output) -> Result<()> {
        let bytes = rkyv::to_bytes::<_, 256>(&output)
            .map_err(|err| Error::cache(format!("Could not serialize OSM elements: {:?}", err)))?;
        // Only a complete archive is ever visible under the cache name.
        let partial_path = Self::partial_path(dir);
        let mut output_file = File::create(&partial_path)?;
        output_file.write_all(&bytes)?;
        output_file.sync_all()?;
        fs::rename(&partial_path, Self::output_path(dir))?;
        Ok(())
    }
}
