//! Union-find over integer-labeled elements.
//!
//! Used by the board to merge the provisional labels produced while scanning
//! the grid for connected gears.

/// Disjoint-set forest with path compression and union by rank.
#[derive(Debug, Clone)]
pub struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
    size: Vec<usize>,
}

impl DisjointSet {
    /// Creates `count` singleton sets labeled `0..count`.
    pub fn new(count: usize) -> Self {
        Self {
            parent: (0..count).collect(),
            rank: vec![0; count],
            size: vec![1; count],
        }
    }

    /// Number of elements (not sets).
    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    /// Returns the representative of the set containing `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i` is out of range.
    pub fn find(&mut self, i: usize) -> usize {
        self.check(i);
        let mut root = i;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        // Path compression.
        let mut node = i;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }
        root
    }

    /// Merges the sets containing `i` and `j`.
    ///
    /// Returns `false` if they were already in the same set.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of range.
    pub fn union(&mut self, i: usize, j: usize) -> bool {
        let a = self.find(i);
        let b = self.find(j);
        if a == b {
            return false;
        }
        let (root, child) = match self.rank[a].cmp(&self.rank[b]) {
            std::cmp::Ordering::Less => (b, a),
            std::cmp::Ordering::Greater => (a, b),
            std::cmp::Ordering::Equal => {
                self.rank[a] += 1;
                (a, b)
            }
        };
        self.parent[child] = root;
        self.size[root] += self.size[child];
        true
    }

    /// Returns the cardinality of the set whose representative is `repr`.
    ///
    /// # Panics
    ///
    /// Panics if `repr` is out of range.
    pub fn set_size(&mut self, repr: usize) -> usize {
        let root = self.find(repr);
        self.size[root]
    }

    fn check(&self, i: usize) {
        assert!(
            i < self.parent.len(),
            "disjoint set index {i} out of range 0..{}",
            self.parent.len()
        );
    }
}
