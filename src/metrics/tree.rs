use crate::metrics::grouping::group_labeled;
use crate::metrics::types::GroupNode;
use crate::record::Record;

/// Deepest hierarchy a report uses (medium, source, campaign).
pub const MAX_DEPTH: usize = 3;

/// Build a sorted hierarchy of up to [`MAX_DEPTH`] levels.
///
/// `picker(record, level)` returns the grouping value of `record` at
/// `level` (0-based). Each level is case-folded and sorted the same way as
/// [`group_labeled`]; `aggregate` computes the metrics of every node.
pub fn build_tree<M, P, A>(records: &[&Record], depth: usize, picker: P, aggregate: A) -> Vec<GroupNode<M>>
where
    P: Fn(&Record, usize) -> Option<String>,
    A: Fn(&[&Record]) -> M,
{
    let depth = depth.min(MAX_DEPTH);
    if depth == 0 {
        return Vec::new();
    }
    build_level(records, 0, depth, "", &picker, &aggregate)
}

fn build_level<M, P, A>(
    records: &[&Record],
    level: usize,
    depth: usize,
    parent_key: &str,
    picker: &P,
    aggregate: &A,
) -> Vec<GroupNode<M>>
where
    P: Fn(&Record, usize) -> Option<String>,
    A: Fn(&[&Record]) -> M,
{
    group_labeled(records, |r| picker(r, level))
        .into_iter()
        .map(|group| {
            let key = if parent_key.is_empty() {
                escape_segment(&group.label)
            } else {
                format!("{parent_key}/{}", escape_segment(&group.label))
            };
            let children = (level + 1 < depth)
                .then(|| build_level(&group.records, level + 1, depth, &key, picker, aggregate));
            GroupNode {
                metrics: aggregate(&group.records),
                key,
                label: group.label,
                children,
            }
        })
        .collect()
}

fn escape_segment(label: &str) -> String {
    label.replace('\\', "\\\\").replace('/', "\\/")
}
