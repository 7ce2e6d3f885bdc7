use std::{collections::BTreeMap, sync::Arc};

use chrono::Duration;

use super::tags::{TagPath, NO_TAG};

/// One ring segment of a sunburst chart. `value` includes all descendants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SunburstNode {
    pub id: String,
    pub label: Arc<str>,
    /// Empty for the innermost ring.
    pub parent: String,
    pub value: Duration,
}

/// Turns per-path totals into sunburst nodes, parents before children. Padding levels below the
/// first ring are left out, their time stays in the parent. Zero-valued nodes are skipped.
pub fn sunburst_nodes(totals: &BTreeMap<TagPath, Duration>) -> Vec<SunburstNode> {
    let mut prefixes = BTreeMap::<&[Arc<str>], Duration>::new();
    for (path, duration) in totals {
        let levels = path.levels();
        for (i, level) in levels.iter().enumerate() {
            if i > 0 && &**level == NO_TAG {
                break;
            }
            *prefixes
                .entry(&levels[..=i])
                .or_insert_with(Duration::zero) += *duration;
        }
    }

    prefixes
        .into_iter()
        .filter(|(_, value)| !value.is_zero())
        .filter_map(|(prefix, value)| {
            let (label, parent) = prefix.split_last()?;
            Some(SunburstNode {
                id: prefix.join(" > "),
                label: label.clone(),
                parent: parent.join(" > "),
                value,
            })
        })
        .collect()
}
