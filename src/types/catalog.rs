//! Static agent catalog
//!
//! The catalog is the fixed set of agent identities the dashboard lays out.
//! Gateway data is always projected onto it; it is never extended at runtime.

use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

use serde::Serialize;

use super::identifiers::AgentId;
use crate::error::{Result, SyncError};

/// Generic session label fragments that fall back to the first catalog node
const GENERIC_AGENT_PATTERNS: &[&str] = &["agent", "task", "subagent", "worker", "job", "process"];

/// Diagram position in percent of the canvas
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Position {
    /// Horizontal offset (0-100)
    pub x: f32,
    /// Vertical offset (0-100)
    pub y: f32,
}

/// One known agent identity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentNodeConfig {
    /// Stable identifier
    pub id: AgentId,
    /// Display name
    pub name: String,
    /// Icon glyph
    pub emoji: String,
    /// CSS color token
    pub color: String,
    /// Default diagram position
    pub position: Position,
    /// Lowercase fragments matched against gateway session labels and ids
    #[serde(skip)]
    pub session_patterns: Vec<String>,
}

impl AgentNodeConfig {
    /// Create a node with no session patterns
    pub fn new(
        id: impl Into<AgentId>,
        name: impl Into<String>,
        emoji: impl Into<String>,
        color: impl Into<String>,
        position: Position,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            emoji: emoji.into(),
            color: color.into(),
            position,
            session_patterns: Vec::new(),
        }
    }

    /// Attach session label patterns
    #[must_use]
    pub fn with_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.session_patterns = patterns
            .into_iter()
            .map(|p| p.into().to_lowercase())
            .collect();
        self
    }
}

/// Ordered, immutable list of agent identities
///
/// Entries are held behind `Arc` so every normalized node for the same
/// catalog shares its presentation data by pointer.
#[derive(Debug)]
pub struct Catalog {
    nodes: Vec<Arc<AgentNodeConfig>>,
}

impl Catalog {
    /// Build a catalog
    ///
    /// # Errors
    /// Returns `InvalidConfig` if two entries share an id
    pub fn new(nodes: Vec<AgentNodeConfig>) -> Result<Self> {
        let mut seen = HashSet::new();
        for node in &nodes {
            if !seen.insert(node.id.clone()) {
                return Err(SyncError::invalid_config(format!(
                    "duplicate catalog id '{}'",
                    node.id
                )));
            }
        }
        Ok(Self {
            nodes: nodes.into_iter().map(Arc::new).collect(),
        })
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the catalog has no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Entries in catalog order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<AgentNodeConfig>> {
        self.nodes.iter()
    }

    /// Look up an entry by id
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Arc<AgentNodeConfig>> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Whether `id` is a catalog id
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Ids in catalog order
    #[must_use]
    pub fn ids(&self) -> Vec<AgentId> {
        self.nodes.iter().map(|n| n.id.clone()).collect()
    }

    /// Find the node a gateway session belongs to
    ///
    /// Patterns are matched as case-insensitive substrings of the label or the
    /// session id, in catalog order. Sessions that look like generic agent work
    /// but match no pattern are attributed to the first node.
    #[must_use]
    pub fn match_session(&self, label: &str, session_id: &str) -> Option<&Arc<AgentNodeConfig>> {
        let label = label.to_lowercase();
        let session_id = session_id.to_lowercase();
        let hit = |pattern: &str| label.contains(pattern) || session_id.contains(pattern);

        self.nodes
            .iter()
            .find(|node| node.session_patterns.iter().any(|p| hit(p)))
            .or_else(|| {
                GENERIC_AGENT_PATTERNS
                    .iter()
                    .any(|p| hit(p))
                    .then(|| self.nodes.first())
                    .flatten()
            })
    }
}

// ============================================================================
// Default catalog
// ============================================================================

struct NodeSpec {
    id: &'static str,
    name: &'static str,
    emoji: &'static str,
    color: &'static str,
    x: f32,
    y: f32,
    patterns: &'static [&'static str],
}

const DEFAULT_NODES: &[NodeSpec] = &[
    NodeSpec {
        id: "research",
        name: "Research",
        emoji: "🔍",
        color: "#3b82f6",
        x: 20.0,
        y: 10.0,
        patterns: &["research", "atlas", "analysis", "investigate"],
    },
    NodeSpec {
        id: "code",
        name: "Code",
        emoji: "💻",
        color: "#22c55e",
        x: 75.0,
        y: 10.0,
        patterns: &["code", "develop", "engineer", "programming", "codeforge"],
    },
    NodeSpec {
        id: "proposal",
        name: "Proposal",
        emoji: "📝",
        color: "#8b5cf6",
        x: 10.0,
        y: 30.0,
        patterns: &["proposal", "estimate", "quote", "bid"],
    },
    NodeSpec {
        id: "content",
        name: "Content",
        emoji: "✍️",
        color: "#f59e0b",
        x: 90.0,
        y: 40.0,
        patterns: &["content", "write", "blog", "article", "copy", "lumina"],
    },
    NodeSpec {
        id: "sales",
        name: "Sales",
        emoji: "💰",
        color: "#22d3ee",
        x: 5.0,
        y: 55.0,
        patterns: &["sales", "lead", "crm", "hunter", "negotiat"],
    },
    NodeSpec {
        id: "analyst",
        name: "Analyst",
        emoji: "📊",
        color: "#ec4899",
        x: 85.0,
        y: 75.0,
        patterns: &["analyst", "data", "metric", "report", "synthesis", "decision"],
    },
    NodeSpec {
        id: "qa",
        name: "QA",
        emoji: "✅",
        color: "#84cc16",
        x: 20.0,
        y: 85.0,
        patterns: &["qa", "test", "review", "quality", "verify", "advocate"],
    },
    NodeSpec {
        id: "outreach",
        name: "Outreach",
        emoji: "📧",
        color: "#f97316",
        x: 55.0,
        y: 90.0,
        patterns: &["outreach", "email", "communication", "network", "stakeholder"],
    },
];

static DEFAULT_CATALOG: OnceLock<Arc<Catalog>> = OnceLock::new();

/// The built-in dashboard catalog
///
/// Always returns the same `Arc`, so node presentation data is shared across
/// every broker that uses the default.
#[must_use]
pub fn default_catalog() -> Arc<Catalog> {
    DEFAULT_CATALOG
        .get_or_init(|| {
            let nodes = DEFAULT_NODES
                .iter()
                .map(|spec| {
                    AgentNodeConfig::new(
                        spec.id,
                        spec.name,
                        spec.emoji,
                        spec.color,
                        Position {
                            x: spec.x,
                            y: spec.y,
                        },
                    )
                    .with_patterns(spec.patterns.iter().copied())
                })
                .collect::<Vec<_>>();
            Arc::new(Catalog {
                nodes: nodes.into_iter().map(Arc::new).collect(),
            })
        })
        .clone()
}
