use anyhow::Result;
use parking_lot::RwLock;

/// In-memory flat vector index with L2 nearest-neighbor search.
///
/// Embeddings and their source texts live in two parallel arrays guarded by
/// a single lock, so every insertion appends to both under one writer and a
/// reader can never observe one array longer than the other. The index is
/// append-only: positions are stable once assigned, and nothing is ever
/// reordered or deleted.
pub struct VectorIndex {
    inner: RwLock<Inner>,
    /// Capacity bound; 0 = unlimited. Appends past the bound are rejected,
    /// not evicted, because eviction would invalidate stable positions.
    max_entries: usize,
}

#[derive(Default)]
struct Inner {
    embeddings: Vec<Vec<f32>>,
    texts: Vec<String>,
}

/// A single nearest-neighbor match.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorHit {
    /// Position into the index's parallel arrays.
    pub position: usize,
    /// L2 distance to the query embedding (smaller = closer).
    pub distance: f32,
}

impl VectorIndex {
    pub fn new(max_entries: usize) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            max_entries,
        }
    }

    /// Append texts and their embeddings. `embeddings` must be parallel
    /// with `texts`; a length mismatch is an error and nothing is appended.
    pub fn add(&self, texts: Vec<String>, embeddings: Vec<Vec<f32>>) -> Result<()> {
        if texts.len() != embeddings.len() {
            anyhow::bail!(
                "parallel array mismatch: {} texts vs {} embeddings",
                texts.len(),
                embeddings.len()
            );
        }
        if texts.is_empty() {
            return Ok(());
        }

        let mut inner = self.inner.write();

        if self.max_entries > 0 && inner.texts.len() + texts.len() > self.max_entries {
            tracing::warn!(
                "Vector index at capacity ({} entries); rejecting {} new items",
                inner.texts.len(),
                texts.len()
            );
            anyhow::bail!("vector index at capacity ({} entries)", self.max_entries);
        }

        inner.texts.extend(texts);
        inner.embeddings.extend(embeddings);
        debug_assert_eq!(inner.texts.len(), inner.embeddings.len());
        Ok(())
    }

    /// Return at most `k` nearest neighbors by ascending L2 distance.
    /// An empty index yields an empty result, never an error.
    pub fn search(&self, query_embedding: &[f32], k: usize) -> Vec<VectorHit> {
        let inner = self.inner.read();
        if inner.embeddings.is_empty() || k == 0 {
            return Vec::new();
        }

        let mut scored: Vec<VectorHit> = inner
            .embeddings
            .iter()
            .enumerate()
            .map(|(position, e)| VectorHit {
                position,
                distance: l2_distance(query_embedding, e),
            })
            .collect();

        scored.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(k);
        scored
    }

    /// Text stored at an index position, if it exists.
    pub fn get_text(&self, position: usize) -> Option<String> {
        self.inner.read().texts.get(position).cloned()
    }

    /// Resolve a hit list to `(text, distance)` pairs, dropping positions
    /// that are out of range.
    pub fn resolve(&self, hits: &[VectorHit]) -> Vec<(String, f32)> {
        let inner = self.inner.read();
        hits.iter()
            .filter_map(|h| {
                inner
                    .texts
                    .get(h.position)
                    .map(|t| (t.clone(), h.distance))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True iff the parallel arrays agree in length. Always true under the
    /// single-writer lock; exposed for invariant tests.
    pub fn is_aligned(&self) -> bool {
        let inner = self.inner.read();
        inner.texts.len() == inner.embeddings.len()
    }
}

/// Euclidean (L2) distance between two vectors. Mismatched lengths score
/// as infinitely far rather than panicking.
fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::INFINITY;
    }
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}
