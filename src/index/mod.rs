//! Flat nearest-neighbor indexes.
//!
//! Brute-force exact search under Euclidean (L2) distance, with no
//! approximation or quantization. A chunk-level index holds one vector per
//! chunk; a video-level index averages each title's chunk vectors into one
//! row for coarse video similarity.

use crate::error::{LektorError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// A single search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    /// Insertion-order row of the matched vector.
    pub index: usize,
    /// L2 distance to the query.
    pub distance: f32,
}

/// A flat index over fixed-dimension vectors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlatIndex {
    dimension: usize,
    vectors: Vec<Vec<f32>>,
}

impl FlatIndex {
    /// Create an empty index for vectors of the given dimension.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: Vec::new(),
        }
    }

    /// Build an index from a set of vectors, all of the same dimension.
    pub fn from_vectors(vectors: Vec<Vec<f32>>) -> Result<Self> {
        let dimension = vectors
            .first()
            .map(|v| v.len())
            .ok_or_else(|| LektorError::Index("Cannot build an index from zero vectors".into()))?;

        let mut index = Self::new(dimension);
        for vector in vectors {
            index.add(vector)?;
        }
        Ok(index)
    }

    /// Append one vector. Rows keep insertion order.
    pub fn add(&mut self, vector: Vec<f32>) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(LektorError::Index(format!(
                "Vector has dimension {}, index expects {}",
                vector.len(),
                self.dimension
            )));
        }
        self.vectors.push(vector);
        Ok(())
    }

    /// Number of indexed vectors.
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Vector dimension.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Return the k nearest vectors to `query`, ascending by L2 distance.
    ///
    /// Ties keep insertion order (stable sort). If the index holds fewer
    /// than k vectors, all of them are returned. A query whose dimension
    /// does not match the index yields no results.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<Neighbor> {
        if query.len() != self.dimension || k == 0 {
            return Vec::new();
        }

        let mut neighbors: Vec<Neighbor> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(index, vector)| Neighbor {
                index,
                distance: l2_distance(query, vector),
            })
            .collect();

        neighbors.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        neighbors.truncate(k);
        neighbors
    }

    /// Write the index to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string(self)?;
        std::fs::write(path, content)?;
        info!("Saved index with {} vectors to {:?}", self.len(), path);
        Ok(())
    }

    /// Load an index from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let index: Self = serde_json::from_str(&content)?;
        debug!("Loaded index with {} vectors from {:?}", index.len(), path);
        Ok(index)
    }
}

/// A video-level index: one averaged vector per title.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoIndex {
    index: FlatIndex,
    titles: Vec<String>,
}

impl VideoIndex {
    /// Build a video index by averaging each title's chunk vectors.
    ///
    /// Titles appear in first-seen order; row i of the index corresponds to
    /// `titles()[i]`. No re-embedding happens here.
    pub fn build(rows: &[(String, Vec<f32>)]) -> Result<Self> {
        let dimension = rows
            .first()
            .map(|(_, v)| v.len())
            .ok_or_else(|| LektorError::Index("Cannot build an index from zero vectors".into()))?;

        let mut titles: Vec<String> = Vec::new();
        let mut sums: Vec<Vec<f64>> = Vec::new();
        let mut counts: Vec<usize> = Vec::new();

        for (title, vector) in rows {
            if vector.len() != dimension {
                return Err(LektorError::Index(format!(
                    "Vector for '{}' has dimension {}, expected {}",
                    title,
                    vector.len(),
                    dimension
                )));
            }

            let position = match titles.iter().position(|t| t == title) {
                Some(p) => p,
                None => {
                    titles.push(title.clone());
                    sums.push(vec![0.0; dimension]);
                    counts.push(0);
                    titles.len() - 1
                }
            };

            for (sum, value) in sums[position].iter_mut().zip(vector) {
                *sum += *value as f64;
            }
            counts[position] += 1;
        }

        let mut index = FlatIndex::new(dimension);
        for (sum, count) in sums.iter().zip(&counts) {
            index.add(sum.iter().map(|s| (*s / *count as f64) as f32).collect())?;
        }

        Ok(Self { index, titles })
    }

    /// The ordered title list; position corresponds to the index row.
    pub fn titles(&self) -> &[String] {
        &self.titles
    }

    /// Return the nearest titles to `query`, ascending by distance.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(String, f32)> {
        self.index
            .search(query, k)
            .into_iter()
            .map(|n| (self.titles[n.index].clone(), n.distance))
            .collect()
    }

    /// Write the video index to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string(self)?;
        std::fs::write(path, content)?;
        info!("Saved video index with {} titles to {:?}", self.titles.len(), path);
        Ok(())
    }

    /// Load a video index from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Compute the Euclidean distance between two vectors.
pub fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_l2_distance() {
        assert_eq!(l2_distance(&[0.0, 0.0], &[3.0, 4.0]), 5.0);
        assert_eq!(l2_distance(&[1.0, 1.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_search_returns_k_ascending() {
        let index = FlatIndex::from_vectors(vec![
            vec![10.0, 0.0],
            vec![1.0, 0.0],
            vec![5.0, 0.0],
            vec![2.0, 0.0],
        ])
        .unwrap();

        let hits = index.search(&[0.0, 0.0], 3);

        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].index, 1);
        assert_eq!(hits[1].index, 3);
        assert_eq!(hits[2].index, 2);
        assert!(hits[0].distance <= hits[1].distance);
        assert!(hits[1].distance <= hits[2].distance);
    }

    #[test]
    fn test_search_with_k_beyond_corpus_returns_all() {
        let index = FlatIndex::from_vectors(vec![vec![1.0], vec![2.0]]).unwrap();
        let hits = index.search(&[0.0], 10);
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let index = FlatIndex::from_vectors(vec![
            vec![1.0, 0.0],
            vec![-1.0, 0.0],
            vec![0.0, 1.0],
        ])
        .unwrap();

        // All three rows are at distance 1 from the origin.
        let hits = index.search(&[0.0, 0.0], 3);
        let order: Vec<usize> = hits.iter().map(|h| h.index).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn test_dimension_mismatch_yields_no_results() {
        let index = FlatIndex::from_vectors(vec![vec![1.0, 2.0]]).unwrap();
        assert!(index.search(&[1.0, 2.0, 3.0], 1).is_empty());
    }

    #[test]
    fn test_add_rejects_wrong_dimension() {
        let mut index = FlatIndex::new(2);
        assert!(index.add(vec![1.0, 2.0]).is_ok());
        assert!(index.add(vec![1.0]).is_err());
    }

    #[test]
    fn test_video_index_averages_per_title() {
        let rows = vec![
            ("Intro".to_string(), vec![1.0, 0.0]),
            ("Intro".to_string(), vec![3.0, 0.0]),
            ("Grid".to_string(), vec![0.0, 2.0]),
        ];

        let video_index = VideoIndex::build(&rows).unwrap();

        assert_eq!(video_index.titles(), &["Intro".to_string(), "Grid".to_string()]);

        // The averaged Intro vector is [2, 0], so it is the closest title.
        let hits = video_index.search(&[2.0, 0.0], 1);
        assert_eq!(hits[0].0, "Intro");
        assert_eq!(hits[0].1, 0.0);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chunk_index.json");

        let index = FlatIndex::from_vectors(vec![vec![1.0, 2.0]]).unwrap();
        index.save(&path).unwrap();

        let loaded = FlatIndex::load(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.dimension(), 2);
    }
}
