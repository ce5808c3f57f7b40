// src/dag/batch.rs

//! Batch planning: cap how many resources of one group hit the remote API
//! at the same time.

use crate::dag::order::DependencyGroup;
use crate::template::Resource;

/// A bounded slice of one dependency group, deployed with parallel dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    /// Index of the group this batch was cut from.
    pub group_index: usize,
    /// Position of the batch within its group.
    pub index: usize,
    pub resources: Vec<Resource>,
}

impl Batch {
    pub fn names(&self) -> Vec<&str> {
        self.resources.iter().map(|r| r.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// Split a group into consecutive batches of at most `max_batch_size`
/// resources. The batches partition the group exactly; a size of 0 is
/// treated as 1.
pub fn plan(group: &DependencyGroup, max_batch_size: usize) -> Vec<Batch> {
    let size = max_batch_size.max(1);

    group
        .resources
        .chunks(size)
        .enumerate()
        .map(|(index, chunk)| Batch {
            group_index: group.index,
            index,
            resources: chunk.to_vec(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(n: usize) -> DependencyGroup {
        DependencyGroup {
            index: 3,
            resources: (0..n)
                .map(|i| Resource::new(format!("r{i}"), "test/type"))
                .collect(),
        }
    }

    #[test]
    fn last_batch_takes_the_remainder() {
        let batches = plan(&group(12), 5);
        let sizes: Vec<usize> = batches.iter().map(Batch::len).collect();
        assert_eq!(sizes, vec![5, 5, 2]);
        assert!(batches.iter().all(|b| b.group_index == 3));
        assert_eq!(batches[2].index, 2);
    }

    #[test]
    fn zero_size_is_clamped() {
        assert_eq!(plan(&group(3), 0).len(), 3);
    }

    #[test]
    fn empty_group_has_no_batches() {
        assert!(plan(&group(0), 5).is_empty());
    }
}
