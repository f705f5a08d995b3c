use crate::types::IndividualId;

use super::dag::PedigreeDag;
use super::inbreeding::CoefficientTable;

/// Low end of the node colour scale (no collisions).
const LOW_RGB: (u8, u8, u8) = (0x4b, 0xbf, 0x4b);
/// High end of the node colour scale (most inbred individual of the population).
const HIGH_RGB: (u8, u8, u8) = (0xff, 0x00, 0x00);

impl PedigreeDag {
    /// Render the graph as Graphviz DOT for a top-to-bottom layered layout.
    ///
    /// Each level becomes a `rank=same` group. Nodes are filled on a
    /// green-to-red scale by [`CoefficientTable::normalized`], so an
    /// individual keeps its colour across queries on the same population.
    pub fn to_dot(&self, coefficients: &CoefficientTable) -> String {
        let mut out = String::new();
        out.push_str("digraph pedigree {\n");
        out.push_str("  rankdir=TB;\n");
        out.push_str("  node [shape=box, style=filled];\n");

        for (level, ids) in self.levels() {
            out.push_str(&format!("  {{ rank=same; /* level {} */", level));
            for id in &ids {
                out.push_str(&format!(" \"{}\";", id));
            }
            out.push_str(" }\n");
        }

        for &id in self.nodes.keys() {
            out.push_str(&format!(
                "  \"{}\" [label=\"#{}\", fillcolor=\"{}\"",
                id,
                id,
                gradient(coefficients.normalized(id))
            ));
            if id == self.root {
                out.push_str(", penwidth=3");
            }
            out.push_str("];\n");
        }

        for &(parent, child) in &self.edges {
            out.push_str(&format!("  \"{}\" -> \"{}\";\n", parent, child));
        }

        out.push_str("}\n");
        out
    }

    /// Plain-text report of the graph.
    pub fn summary(&self) -> String {
        let mut s = String::new();

        s.push_str(&format!("=== Pedigree of #{} ({}) ===\n\n", self.root, self.mode));
        s.push_str(&format!(
            "Individuals: {}   Parent links: {}\n\n",
            self.n_nodes(),
            self.n_edges()
        ));

        s.push_str("--- Generations ---\n");
        for (level, ids) in self.levels() {
            let names: Vec<String> = ids.iter().map(|id| format!("#{}", id)).collect();
            s.push_str(&format!("  {:>+4}: {}\n", level, names.join(" ")));
        }

        let mut ranked: Vec<(IndividualId, f64)> = self
            .nodes
            .iter()
            .filter(|(_, n)| n.inbreeding > 0.0)
            .map(|(&id, n)| (id, n.inbreeding))
            .collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });

        s.push_str("\n--- Inbreeding (ancestor collisions) ---\n");
        if ranked.is_empty() {
            s.push_str("  none\n");
        }
        let show = ranked.len().min(10);
        for (id, value) in ranked.iter().take(show) {
            s.push_str(&format!("  #{}: {}\n", id, value));
        }
        if ranked.len() > 10 {
            s.push_str(&format!("  ... and {} more\n", ranked.len() - 10));
        }

        s
    }
}

/// Linear interpolation between the two ends of the colour scale.
fn gradient(t: f64) -> String {
    let t = t.clamp(0.0, 1.0);
    let mix = |lo: u8, hi: u8| -> u8 { (lo as f64 + (hi as f64 - lo as f64) * t).round() as u8 };
    format!(
        "#{:02x}{:02x}{:02x}",
        mix(LOW_RGB.0, HIGH_RGB.0),
        mix(LOW_RGB.1, HIGH_RGB.1),
        mix(LOW_RGB.2, HIGH_RGB.2)
    )
}
