//! Connection topology summaries.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A summary of how peers are connected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopologyReport {
    /// Number of peers considered.
    pub total_peers: usize,
    /// Number of distinct undirected connections.
    pub total_connections: usize,
    /// Mean connections per peer.
    pub average_connections: f64,
    /// Peers with more connections than average, sorted by id.
    pub central_peers: Vec<String>,
}

impl TopologyReport {
    /// Report for a full mesh over `peer_count` peers: every peer is
    /// connected to every other, so no peer is above average.
    pub fn full_mesh(peer_count: usize) -> Self {
        Self {
            total_peers: peer_count,
            total_connections: peer_count * peer_count.saturating_sub(1) / 2,
            average_connections: peer_count.saturating_sub(1) as f64,
            central_peers: Vec::new(),
        }
    }

    /// Report over explicit links. Duplicate and reversed links count
    /// once; self-links are ignored. Link endpoints missing from `peers`
    /// are added to the peer set.
    pub fn from_links<'a>(
        peers: impl IntoIterator<Item = &'a str>,
        links: &[(String, String)],
    ) -> Self {
        let mut degree: BTreeMap<&str, usize> = peers.into_iter().map(|p| (p, 0)).collect();

        let edges: BTreeSet<(&str, &str)> = links
            .iter()
            .filter(|(a, b)| a != b)
            .map(|(a, b)| {
                if a <= b {
                    (a.as_str(), b.as_str())
                } else {
                    (b.as_str(), a.as_str())
                }
            })
            .collect();

        for &(a, b) in &edges {
            *degree.entry(a).or_default() += 1;
            *degree.entry(b).or_default() += 1;
        }

        let total_peers = degree.len();
        let average_connections = if total_peers == 0 {
            0.0
        } else {
            (2 * edges.len()) as f64 / total_peers as f64
        };
        let central_peers = degree
            .iter()
            .filter(|(_, d)| **d as f64 > average_connections)
            .map(|(id, _)| id.to_string())
            .collect();

        Self {
            total_peers,
            total_connections: edges.len(),
            average_connections,
            central_peers,
        }
    }
}
