use crate::metrics::types::{ContactFunnel, FunnelCounts, GroupNode};

/// Node metrics that can be laid out as CSV columns.
pub trait MetricColumns {
    fn headers() -> &'static [&'static str];
    fn values(&self) -> Vec<u64>;
}

impl MetricColumns for FunnelCounts {
    fn headers() -> &'static [&'static str] {
        &[
            "created",
            "distributed",
            "calls_scheduled",
            "calls_completed",
            "proposals",
            "closed_won",
        ]
    }

    fn values(&self) -> Vec<u64> {
        vec![
            self.created,
            self.distributed,
            self.calls_scheduled,
            self.calls_completed,
            self.proposals,
            self.closed_won,
        ]
    }
}

impl MetricColumns for ContactFunnel {
    fn headers() -> &'static [&'static str] {
        &[
            "contacts",
            "deals_created",
            "distributed",
            "calls_scheduled",
            "calls_completed",
            "proposals",
            "closed_won",
        ]
    }

    fn values(&self) -> Vec<u64> {
        vec![
            self.contacts,
            self.deals_created,
            self.distributed,
            self.calls_scheduled,
            self.calls_completed,
            self.proposals,
            self.closed_won,
        ]
    }
}

/// Flatten a tree into CSV, one line per node in depth-first order.
///
/// Columns are `level_1..level_<depth>` followed by the metrics. A node
/// fills the levels of its own path and leaves deeper ones blank.
pub fn tree_to_csv<M: MetricColumns>(nodes: &[GroupNode<M>]) -> String {
    let depth = tree_depth(nodes);
    let mut out = String::new();

    let mut headers: Vec<String> = (1..=depth).map(|i| format!("level_{i}")).collect();
    headers.extend(M::headers().iter().map(|h| h.to_string()));
    out.push_str(&headers.join(","));
    out.push('\n');

    let mut path = Vec::new();
    write_nodes(nodes, depth, &mut path, &mut out);
    out
}

fn tree_depth<M>(nodes: &[GroupNode<M>]) -> usize {
    nodes
        .iter()
        .map(|n| 1 + tree_depth(n.children()))
        .max()
        .unwrap_or(0)
}

fn write_nodes<'a, M: MetricColumns>(
    nodes: &'a [GroupNode<M>],
    depth: usize,
    path: &mut Vec<&'a str>,
    out: &mut String,
) {
    for node in nodes {
        path.push(&node.label);

        let mut cells: Vec<String> = (0..depth)
            .map(|i| path.get(i).map_or(String::new(), |label| csv_escape(label)))
            .collect();
        cells.extend(node.metrics.values().iter().map(u64::to_string));
        out.push_str(&cells.join(","));
        out.push('\n');

        write_nodes(node.children(), depth, path, out);
        path.pop();
    }
}

fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
