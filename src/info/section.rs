//! Section fetching and merging
//!
//! An endpoint's namespace is built from up to three sections fetched over
//! one connection, always in the order primary, command stats, cluster.
//! Later sections overwrite colliding keys.

use tracing::warn;

use super::parser::StatusMap;
use crate::client::{ControlPlane, ControlPlaneExt};
use crate::utils::Result;

/// One introspection command's worth of status text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    /// `INFO` (default sections)
    Primary,
    /// `INFO commandstats`
    CommandStats,
    /// `CLUSTER INFO`
    Cluster,
}

impl Section {
    /// Command sent to fetch this section
    pub fn command(&self) -> &'static [&'static str] {
        match self {
            Section::Primary => &["INFO"],
            Section::CommandStats => &["INFO", "commandstats"],
            Section::Cluster => &["CLUSTER", "INFO"],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Primary => "info",
            Section::CommandStats => "commandstats",
            Section::Cluster => "cluster",
        }
    }

    /// Sections to fetch, in merge order
    pub fn plan(command_stats: bool, cluster_info: bool) -> Vec<Section> {
        let mut sections = vec![Section::Primary];
        if command_stats {
            sections.push(Section::CommandStats);
        }
        if cluster_info {
            sections.push(Section::Cluster);
        }
        sections
    }
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fetch and parse one section
pub fn fetch_section<C: ControlPlane>(conn: &mut C, section: Section) -> Result<StatusMap> {
    let text = conn.fetch_bulk(section.command())?;
    Ok(StatusMap::parse(&text))
}

/// Fetch `sections` in order over one connection.
///
/// The first section is required: its failure is returned. Any later
/// section that fails is logged and left out. Once the connection itself
/// has failed, remaining sections are not attempted.
pub fn fetch_sections<C: ControlPlane>(
    conn: &mut C,
    sections: &[Section],
) -> Result<Vec<(Section, StatusMap)>> {
    let mut fetched = Vec::with_capacity(sections.len());

    let Some((&primary, secondary)) = sections.split_first() else {
        return Ok(fetched);
    };
    fetched.push((primary, fetch_section(conn, primary)?));

    for &section in secondary {
        match fetch_section(conn, section) {
            Ok(map) => fetched.push((section, map)),
            Err(e) => {
                warn!("Section '{}' unavailable: {}", section, e);
                if !e.connection_usable() {
                    break;
                }
            }
        }
    }

    Ok(fetched)
}

/// Union of every fetched section for one endpoint in one cycle
#[derive(Debug, Clone, Default)]
pub struct Namespace {
    map: StatusMap,
    sections: Vec<Section>,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge sections in the order given
    pub fn from_sections(sections: impl IntoIterator<Item = (Section, StatusMap)>) -> Self {
        let mut namespace = Namespace::new();
        for (section, map) in sections {
            namespace.merge(section, map);
        }
        namespace
    }

    /// Merge one section; its keys overwrite existing ones
    pub fn merge(&mut self, section: Section, map: StatusMap) {
        self.map.extend(map);
        self.sections.push(section);
    }

    /// Sections merged so far, in merge order
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Scalar or composite `parent_sub` value
    pub fn lookup(&self, key: &str) -> Option<&str> {
        self.map.lookup(key)
    }

    pub fn map(&self) -> &StatusMap {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut StatusMap {
        &mut self.map
    }
}
