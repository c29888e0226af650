//! Prometheus text exposition format.
//!
//! Renders per-share gauges for every node of the tree (internal nodes
//! included) plus the engine counters, for scraping by a Prometheus server
//! or compatible agent.

use gshare_engine::{AllocationTree, Distribution, EngineStats, ShareNode, ShareUsage};

/// Render the share tree and its distribution into Prometheus text format.
///
/// Shares without a distribution entry report zero usage.
pub fn render_prometheus(tree: &AllocationTree, distribution: &Distribution, stats: &EngineStats) -> String {
    let mut nodes = Vec::new();
    collect_nodes(tree.root(), &mut nodes);
    let rows: Vec<(&ShareNode, ShareUsage)> = nodes
        .into_iter()
        .map(|n| (n, distribution.get(n.name()).copied().unwrap_or_default()))
        .collect();

    let mut out = String::new();

    out.push_str("# HELP gshare_weight_percent Share of total capacity after normalization.\n");
    out.push_str("# TYPE gshare_weight_percent gauge\n");
    for (node, _) in &rows {
        out.push_str(&format!(
            "gshare_weight_percent{{share=\"{}\"}} {:.4}\n",
            escape_label(node.name()),
            node.weight()
        ));
    }

    let gauges: [(&str, &str, fn(&ShareUsage) -> f64); 4] = [
        ("gshare_queued_capacity", "Queued capacity in HS06.", |u| u.queued),
        ("gshare_executing_capacity", "Executing capacity in HS06.", |u| u.executing),
        ("gshare_pledged_capacity", "Pledged capacity in HS06.", |u| u.pledged),
        (
            "gshare_under_pledge_capacity",
            "Pledged minus executing capacity in HS06.",
            ShareUsage::under_pledge,
        ),
    ];
    for (name, help, value) in gauges {
        out.push_str(&format!("# HELP {name} {help}\n"));
        out.push_str(&format!("# TYPE {name} gauge\n"));
        for (node, usage) in &rows {
            out.push_str(&format!(
                "{name}{{share=\"{}\"}} {:.2}\n",
                escape_label(node.name()),
                value(usage)
            ));
        }
    }

    out.push_str("# HELP gshare_unclassified_total Tasks that matched no leaf share.\n");
    out.push_str("# TYPE gshare_unclassified_total counter\n");
    out.push_str(&format!("gshare_unclassified_total {}\n", stats.unclassified));

    out.push_str("# HELP gshare_refreshes_total Successful usage refreshes.\n");
    out.push_str("# TYPE gshare_refreshes_total counter\n");
    out.push_str(&format!("gshare_refreshes_total {}\n", stats.refreshes));

    out.push_str("# HELP gshare_refresh_failures_total Failed usage refreshes.\n");
    out.push_str("# TYPE gshare_refresh_failures_total counter\n");
    out.push_str(&format!("gshare_refresh_failures_total {}\n", stats.refresh_failures));

    out
}

fn collect_nodes<'a>(node: &'a ShareNode, nodes: &mut Vec<&'a ShareNode>) {
    nodes.push(node);
    for child in node.children() {
        collect_nodes(child, nodes);
    }
}

fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}
