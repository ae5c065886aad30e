use derive_more::Display;
use hashlink::LinkedHashMap;

/// Counts derived from the mirror after every structural change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
#[display("Child nodes: {direct} direct, {all} all")]
pub struct AggregateCounts {
    /// Size of the watched root's child list.
    pub direct: usize,
    /// Sum of all child list sizes, minus the seed entry's listing of the root.
    pub all: usize,
}

impl AggregateCounts {
    /// Recomputes both counts from scratch.
    ///
    /// The map always holds the seed entry listing the root, which the `- 1` removes,
    /// so `all` ends up being the number of mirrored descendants of the root.
    pub fn compute(entries: &LinkedHashMap<String, Vec<String>>, root: &str) -> Self {
        let direct = entries.get(root).map(Vec::len).unwrap_or(0);
        let all = entries
            .values()
            .map(Vec::len)
            .sum::<usize>()
            .saturating_sub(1);

        Self { direct, all }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mirror::VIRTUAL_ROOT;

    fn entries(pairs: &[(&str, &[&str])]) -> LinkedHashMap<String, Vec<String>> {
        pairs
            .iter()
            .map(|(path, children)| {
                (
                    path.to_string(),
                    children.iter().map(|c| c.to_string()).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn counts_descendants_of_root() {
        let map = entries(&[
            (VIRTUAL_ROOT, &["/a"]),
            ("/a", &["/a/b", "/a/c"]),
            ("/a/b", &["/a/b/d"]),
            ("/a/c", &[]),
            ("/a/b/d", &[]),
        ]);

        let counts = AggregateCounts::compute(&map, "/a");

        assert_eq!(counts.direct, 2);
        assert_eq!(counts.all, 3);
    }

    #[test]
    fn seed_only_map_counts_nothing() {
        let map = entries(&[(VIRTUAL_ROOT, &["/a"])]);

        assert_eq!(
            AggregateCounts::compute(&map, "/a"),
            AggregateCounts::default()
        );
    }

    #[test]
    fn empty_map_does_not_underflow() {
        let map = LinkedHashMap::new();

        assert_eq!(AggregateCounts::compute(&map, "/a").all, 0);
    }

    #[test]
    fn unvisited_grandchildren_only_count_once_listed() {
        let map = entries(&[(VIRTUAL_ROOT, &["/a"]), ("/a", &["/a/b", "/a/c"])]);

        let counts = AggregateCounts::compute(&map, "/a");

        assert_eq!(counts, AggregateCounts { direct: 2, all: 2 });
    }

    #[test]
    fn display_matches_label_text() {
        let counts = AggregateCounts { direct: 2, all: 5 };

        assert_eq!(counts.to_string(), "Child nodes: 2 direct, 5 all");
    }
}
