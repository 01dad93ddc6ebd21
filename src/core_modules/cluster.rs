// THEORY:
// A single global average is fragile for garments: a striped shirt averages to a
// color nobody is wearing, and a logo or a shadow drags the mean away from the
// fabric. Clustering isolates the majority color instead. The crop's pixels are
// partitioned into k groups with k-means (`kmeans_colors`, k-means++ seeding),
// and the group with the most members is taken as the garment's color.
//
// Key design points:
// 1.  **Graceful Degradation**: k never exceeds the number of distinct colors.
//     A uniform crop therefore runs with k=1 and its centroid is that color, and
//     a crop smaller than k never fails. The clamp also guarantees k-means++
//     always has an unchosen sample at non-zero distance to pick next.
// 2.  **Reproducibility**: the seed is passed straight to the clustering run, and
//     the dominant-cluster tie goes to the lowest cluster index, so one seed
//     always yields one answer.
// 3.  **Bounded Work**: iteration stops when the convergence score drops to the
//     tolerance, or at the iteration cap, whichever comes first.
//
// Samples are clustered as `Srgb` in [0, 1]; centroids are reported back in
// channel units (0..=255).

use crate::core_modules::color::color::Color;
use crate::error::{Error, Result};
use kmeans_colors::get_kmeans;
use log::debug;
use palette::Srgb;
use std::collections::HashSet;

pub type Centroid = [f64; 3];

/// Largest k the clustering run can label (memberships are stored as `u8`).
pub const MAX_CLUSTER_COUNT: usize = u8::MAX as usize + 1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KMeansSettings {
    pub cluster_count: usize,
    pub max_iterations: usize,
    /// Convergence score at or below which refinement stops.
    pub tolerance: f64,
    pub seed: u64,
}

/// One group of samples after clustering.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    /// Mean color of the group, in channel units.
    pub centroid: Centroid,
    /// Number of pixels assigned to this cluster.
    pub members: usize,
}

/// The full outcome of a clustering run.
#[derive(Debug, Clone, PartialEq)]
pub struct Clustering {
    pub clusters: Vec<Cluster>,
    /// Final convergence score reported by the run.
    pub score: f32,
}

impl Clustering {
    /// The cluster with the largest membership; ties go to the lowest index.
    pub fn dominant(&self) -> Option<&Cluster> {
        let mut best: Option<&Cluster> = None;
        for cluster in &self.clusters {
            match best {
                Some(current) if current.members >= cluster.members => {}
                _ => best = Some(cluster),
            }
        }
        best
    }

    pub fn total_members(&self) -> usize {
        self.clusters.iter().map(|c| c.members).sum()
    }
}

fn to_srgb(color: &Color) -> Srgb {
    Srgb::new(
        color.red as f32 / 255.0,
        color.green as f32 / 255.0,
        color.blue as f32 / 255.0,
    )
}

fn to_centroid(color: &Srgb) -> Centroid {
    [
        color.red as f64 * 255.0,
        color.green as f64 * 255.0,
        color.blue as f64 * 255.0,
    ]
}

/// Partitions color samples into at most `settings.cluster_count` clusters.
pub fn kmeans(samples: &[Color], settings: &KMeansSettings) -> Result<Clustering> {
    if settings.cluster_count == 0 || settings.cluster_count > MAX_CLUSTER_COUNT {
        return Err(Error::Configuration(format!(
            "cluster count must be within 1..={MAX_CLUSTER_COUNT}, got {}",
            settings.cluster_count
        )));
    }
    if samples.is_empty() {
        return Err(Error::InvalidInput(
            "cannot cluster an empty set of pixels".to_string(),
        ));
    }

    let distinct = samples.iter().collect::<HashSet<_>>().len();
    let k = settings.cluster_count.min(distinct);
    if k < settings.cluster_count {
        debug!(
            "only {} distinct colors among {} pixels; clustering with k={} instead of {}",
            distinct,
            samples.len(),
            k,
            settings.cluster_count
        );
    }

    let points: Vec<Srgb> = samples.iter().map(to_srgb).collect();
    let result = get_kmeans(
        k,
        settings.max_iterations,
        settings.tolerance as f32,
        false,
        &points,
        settings.seed,
    );

    let mut members = vec![0usize; result.centroids.len()];
    for &index in &result.indices {
        members[index as usize] += 1;
    }

    debug!("k-means settled with k={k}, score {}", result.score);

    Ok(Clustering {
        clusters: result
            .centroids
            .iter()
            .zip(members)
            .map(|(centroid, members)| Cluster {
                centroid: to_centroid(centroid),
                members,
            })
            .collect(),
        score: result.score,
    })
}
