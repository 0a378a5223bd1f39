//! Citation graph assembly for the D3 front end

use crate::types::RelationRecord;
use chrono::{Datelike, Utc};
use citegraph_common::db::models::Paper;
use citegraph_common::metrics;
use serde::Serialize;

pub const MIN_NODE_SIZE: i32 = 12;
pub const MAX_NODE_SIZE: i32 = 70;
pub const CENTER_NODE_SIZE: i32 = 45;

/// Citation ceiling regardless of age
const MAX_CITATIONS_CAP: i64 = 50_000;
const CITATIONS_PER_YEAR: i64 = 100;

pub const REFERENCE_COLOR: &str = "#1890ff";
pub const CITATION_COLOR: &str = "#52c41a";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Center,
    Reference,
    Citation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    References,
    Citations,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub title: String,
    pub label: String,
    pub authors: Option<String>,
    pub year: Option<i32>,
    pub doi: Option<String>,
    pub venue: Option<String>,
    pub citation_count: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub size: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphLink {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub link_type: LinkType,
    pub color: &'static str,
}

/// Node/link graph around one paper
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CitationGraph {
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphLink>,
    pub central_node: Paper,
}

#[derive(Debug, Clone, Copy)]
pub struct GraphAssembler {
    current_year: i32,
}

impl GraphAssembler {
    pub fn new(current_year: i32) -> Self {
        Self { current_year }
    }

    /// Sizing against the configured year, or this calendar year
    pub fn from_config(current_year: Option<i32>) -> Self {
        Self::new(current_year.unwrap_or_else(|| Utc::now().year()))
    }

    pub fn current_year(&self) -> i32 {
        self.current_year
    }

    /// Square-root scaled size; the expected citation ceiling grows with age
    pub fn node_size(&self, citation_count: Option<i32>, year: Option<i32>) -> i32 {
        let citations = match citation_count {
            Some(c) if c > 0 => c,
            _ => return MIN_NODE_SIZE,
        };

        let years_old = year
            .map(|y| (i64::from(self.current_year) - i64::from(y)).max(1))
            .unwrap_or(1);
        let max_citations = (CITATIONS_PER_YEAR * years_old).min(MAX_CITATIONS_CAP);
        let normalized = (f64::from(citations) / max_citations as f64).min(1.0);

        let span = f64::from(MAX_NODE_SIZE - MIN_NODE_SIZE);
        MIN_NODE_SIZE + (span * normalized.sqrt()) as i32
    }

    pub fn build_graph(
        &self,
        center: &Paper,
        references: &[RelationRecord],
        citations: &[RelationRecord],
    ) -> CitationGraph {
        let center_id = format!("center_{}", center.id);
        let mut nodes = Vec::with_capacity(1 + references.len() + citations.len());
        let mut links = Vec::with_capacity(references.len() + citations.len());

        nodes.push(GraphNode {
            id: center_id.clone(),
            node_type: NodeType::Center,
            title: center.title.clone(),
            label: center.title.clone(),
            authors: center.authors.clone(),
            year: center.year,
            doi: center.doi.clone(),
            venue: center.venue.clone(),
            citation_count: Some(0),
            url: None,
            size: CENTER_NODE_SIZE,
        });

        for record in references {
            nodes.push(self.relation_node(record, NodeType::Reference));
            links.push(GraphLink {
                source: center_id.clone(),
                target: record.id.to_string(),
                link_type: LinkType::References,
                color: REFERENCE_COLOR,
            });
        }

        for record in citations {
            nodes.push(self.relation_node(record, NodeType::Citation));
            links.push(GraphLink {
                source: record.id.to_string(),
                target: center_id.clone(),
                link_type: LinkType::Citations,
                color: CITATION_COLOR,
            });
        }

        metrics::record_graph(nodes.len());

        CitationGraph {
            nodes,
            links,
            central_node: center.clone(),
        }
    }

    fn relation_node(&self, record: &RelationRecord, node_type: NodeType) -> GraphNode {
        GraphNode {
            id: record.id.to_string(),
            node_type,
            title: record.target_title.clone(),
            label: record.target_title.clone(),
            authors: record.target_authors.clone(),
            year: record.target_year,
            doi: record.target_doi.clone(),
            venue: record.target_venue.clone(),
            citation_count: record.citation_count,
            url: record.open_access_url.clone(),
            size: self.node_size(record.citation_count, record.target_year),
        }
    }
}
