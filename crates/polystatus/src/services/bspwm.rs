//! bspwm state from `bspc wm -d`.
//!
//! Only the fields the workspace renderer needs are modelled; serde ignores
//! the rest of the dump.

use serde::Deserialize;

use super::process::{CommandRunner, checked};

pub const BSPC: &str = "bspc";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WmDump {
    pub focused_monitor_id: u64,
    #[serde(default)]
    pub monitors: Vec<Monitor>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Monitor {
    pub id: u64,
    pub focused_desktop_id: u64,
    #[serde(default)]
    pub desktops: Vec<Desktop>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Desktop {
    pub id: u64,
    pub name: String,
    pub root: Option<Node>,
}

/// A node of the desktop's binary layout tree. Leaves with a `client` are
/// windows.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub client: Option<Client>,
    pub first_child: Option<Box<Node>>,
    pub second_child: Option<Box<Node>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Client {
    #[serde(default)]
    pub urgent: bool,
}

impl Node {
    fn children(&self) -> impl Iterator<Item = &Node> {
        self.first_child
            .as_deref()
            .into_iter()
            .chain(self.second_child.as_deref())
    }

    /// Number of nodes in this subtree that hold a client.
    pub fn window_count(&self) -> usize {
        usize::from(self.client.is_some()) + self.children().map(Node::window_count).sum::<usize>()
    }

    /// Whether any client in this subtree demands attention.
    pub fn has_urgent(&self) -> bool {
        self.client.as_ref().is_some_and(|c| c.urgent) || self.children().any(Node::has_urgent)
    }
}

impl Desktop {
    pub fn window_count(&self) -> usize {
        self.root.as_ref().map_or(0, Node::window_count)
    }

    pub fn is_urgent(&self) -> bool {
        self.root.as_ref().is_some_and(Node::has_urgent)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DumpError {
    #[error(transparent)]
    Command(#[from] super::process::CommandError),

    #[error("malformed bspwm dump: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn parse_dump(json: &str) -> Result<WmDump, serde_json::Error> {
    serde_json::from_str(json)
}

pub fn query_dump<R: CommandRunner + ?Sized>(runner: &R) -> Result<WmDump, DumpError> {
    let json = checked(runner, BSPC, &["wm", "-d"])?;
    Ok(parse_dump(&json)?)
}
