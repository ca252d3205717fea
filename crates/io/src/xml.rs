//! OSM XML codec: API element snapshots and batch synchronization
//! payloads share the same document shape.

use std::fmt;
use std::str::FromStr;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};

use geosync_core::document::{OsmDocument, OsmMember, OsmNode, OsmRelation, OsmTag, OsmWay};

#[derive(Debug)]
pub enum XmlError {
    Malformed(String),
    Write(String),
}

impl fmt::Display for XmlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(msg) => write!(f, "malformed OSM XML: {msg}"),
            Self::Write(msg) => write!(f, "XML write error: {msg}"),
        }
    }
}

impl std::error::Error for XmlError {}

fn write_err<E: fmt::Display>(err: E) -> XmlError {
    XmlError::Write(err.to_string())
}

// ---------------------------------------------------------------------------
// Serialization
// ---------------------------------------------------------------------------

/// Serialize a document to OSM XML. `changeset` overrides the changeset
/// attribute on every contained element when present, as required for
/// API uploads.
pub fn to_xml(
    document: &OsmDocument,
    generator: &str,
    changeset: Option<u64>,
) -> Result<String, XmlError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(write_err)?;
    let mut osm = BytesStart::new("osm");
    osm.push_attribute(("version", "0.6"));
    osm.push_attribute(("generator", generator));
    writer.write_event(Event::Start(osm)).map_err(write_err)?;

    for node in &document.nodes {
        let mut start = BytesStart::new("node");
        start.push_attribute(("id", node.id.to_string().as_str()));
        start.push_attribute(("version", node.version.to_string().as_str()));
        start.push_attribute((
            "changeset",
            changeset.unwrap_or(node.changeset).to_string().as_str(),
        ));
        start.push_attribute(("lat", node.lat.to_string().as_str()));
        start.push_attribute(("lon", node.lon.to_string().as_str()));
        write_container(&mut writer, start, &node.tags, "node", |_| Ok(()))?;
    }

    for way in &document.ways {
        let mut start = BytesStart::new("way");
        start.push_attribute(("id", way.id.to_string().as_str()));
        start.push_attribute(("version", way.version.to_string().as_str()));
        start.push_attribute((
            "changeset",
            changeset.unwrap_or(way.changeset).to_string().as_str(),
        ));
        write_container(&mut writer, start, &way.tags, "way", |writer| {
            for node_ref in &way.node_refs {
                let mut nd = BytesStart::new("nd");
                nd.push_attribute(("ref", node_ref.to_string().as_str()));
                writer
                    .write_event(Event::Empty(nd))
                    .map_err(|e| XmlError::Write(e.to_string()))?;
            }
            Ok(())
        })?;
    }

    for relation in &document.relations {
        let mut start = BytesStart::new("relation");
        start.push_attribute(("id", relation.id.to_string().as_str()));
        start.push_attribute(("version", relation.version.to_string().as_str()));
        start.push_attribute((
            "changeset",
            changeset.unwrap_or(relation.changeset).to_string().as_str(),
        ));
        write_container(&mut writer, start, &relation.tags, "relation", |writer| {
            for member in &relation.members {
                let mut m = BytesStart::new("member");
                m.push_attribute(("type", member.member_type.as_str()));
                m.push_attribute(("ref", member.member_ref.to_string().as_str()));
                m.push_attribute(("role", member.role.as_str()));
                writer
                    .write_event(Event::Empty(m))
                    .map_err(|e| XmlError::Write(e.to_string()))?;
            }
            Ok(())
        })?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("osm")))
        .map_err(write_err)?;
    String::from_utf8(writer.into_inner()).map_err(|e| XmlError::Write(e.to_string()))
}

fn write_container(
    writer: &mut Writer<Vec<u8>>,
    start: BytesStart<'_>,
    tags: &[OsmTag],
    name: &str,
    children: impl FnOnce(&mut Writer<Vec<u8>>) -> Result<(), XmlError>,
) -> Result<(), XmlError> {
    writer.write_event(Event::Start(start)).map_err(write_err)?;
    children(writer)?;
    for tag in tags {
        let mut t = BytesStart::new("tag");
        t.push_attribute(("k", tag.key.as_str()));
        t.push_attribute(("v", tag.value.as_str()));
        writer.write_event(Event::Empty(t)).map_err(write_err)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(write_err)
}

/// Body of a changeset-creation request.
pub fn changeset_payload(
    created_by: &str,
    source: &str,
    comment: &str,
) -> Result<String, XmlError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    writer
        .write_event(Event::Start(BytesStart::new("osm")))
        .map_err(write_err)?;
    writer
        .write_event(Event::Start(BytesStart::new("changeset")))
        .map_err(write_err)?;
    for (key, value) in [
        ("created_by", created_by),
        ("source", source),
        ("comment", comment),
    ] {
        let mut tag = BytesStart::new("tag");
        tag.push_attribute(("k", key));
        tag.push_attribute(("v", value));
        writer.write_event(Event::Empty(tag)).map_err(write_err)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("changeset")))
        .map_err(write_err)?;
    writer
        .write_event(Event::End(BytesEnd::new("osm")))
        .map_err(write_err)?;
    String::from_utf8(writer.into_inner()).map_err(|e| XmlError::Write(e.to_string()))
}

// ---------------------------------------------------------------------------
// Deserialization
// ---------------------------------------------------------------------------

enum Container {
    None,
    Node,
    Way,
    Relation,
}

/// Parse an OSM XML body into a document.
pub fn from_xml(xml: &str) -> Result<OsmDocument, XmlError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut document = OsmDocument::default();
    let mut container = Container::None;

    loop {
        let event = reader.read_event_into(&mut buf);
        match event {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                // Self-closed elements never get an End event, so only a
                // Start opens a container for nested tags.
                let opens = matches!(event, Ok(Event::Start(_)));
                match e.name().as_ref() {
                    b"node" => {
                        document.nodes.push(OsmNode {
                            id: num_attr(e, b"id"),
                            version: num_attr(e, b"version"),
                            changeset: num_attr(e, b"changeset"),
                            lat: num_attr(e, b"lat"),
                            lon: num_attr(e, b"lon"),
                            tags: Vec::new(),
                        });
                        if opens {
                            container = Container::Node;
                        }
                    }
                    b"way" => {
                        document.ways.push(OsmWay {
                            id: num_attr(e, b"id"),
                            version: num_attr(e, b"version"),
                            changeset: num_attr(e, b"changeset"),
                            node_refs: Vec::new(),
                            tags: Vec::new(),
                        });
                        if opens {
                            container = Container::Way;
                        }
                    }
                    b"relation" => {
                        document.relations.push(OsmRelation {
                            id: num_attr(e, b"id"),
                            version: num_attr(e, b"version"),
                            changeset: num_attr(e, b"changeset"),
                            members: Vec::new(),
                            tags: Vec::new(),
                        });
                        if opens {
                            container = Container::Relation;
                        }
                    }
                    b"nd" => {
                        if let Some(way) = document.ways.last_mut() {
                            way.node_refs.push(num_attr(e, b"ref"));
                        }
                    }
                    b"member" => {
                        if let Some(relation) = document.relations.last_mut() {
                            relation.members.push(OsmMember {
                                member_type: attr(e, b"type").unwrap_or_default(),
                                member_ref: num_attr(e, b"ref"),
                                role: attr(e, b"role").unwrap_or_default(),
                            });
                        }
                    }
                    b"tag" => {
                        let tag = OsmTag {
                            key: attr(e, b"k").unwrap_or_default(),
                            value: attr(e, b"v").unwrap_or_default(),
                        };
                        match container {
                            Container::Node => {
                                if let Some(node) = document.nodes.last_mut() {
                                    node.tags.push(tag);
                                }
                            }
                            Container::Way => {
                                if let Some(way) = document.ways.last_mut() {
                                    way.tags.push(tag);
                                }
                            }
                            Container::Relation => {
                                if let Some(relation) = document.relations.last_mut() {
                                    relation.tags.push(tag);
                                }
                            }
                            Container::None => {}
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::End(ref e)) => {
                if matches!(e.name().as_ref(), b"node" | b"way" | b"relation") {
                    container = Container::None;
                }
            }
            Ok(Event::Eof) => break,
            Err(err) => return Err(XmlError::Malformed(err.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(document)
}

fn attr(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .and_then(|a| a.unescape_value().ok())
        .map(|v| v.into_owned())
}

fn num_attr<T: FromStr + Default>(e: &BytesStart<'_>, key: &[u8]) -> T {
    attr(e, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or_default()
}
