use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::bouncepoint::BouncePoint;

pub struct Build {
    pub id: String,
    pub point: BouncePoint,
}

/// The builds currently running, in the order they were first created.
pub struct BuildRegistry {
    builds: Vec<Build>,
    strip_length: usize,
    rng: StdRng,
}

impl BuildRegistry {
    pub fn new(strip_length: usize) -> BuildRegistry {
        BuildRegistry::with_rng(strip_length, StdRng::from_entropy())
    }

    pub fn with_seed(strip_length: usize, seed: u64) -> BuildRegistry {
        BuildRegistry::with_rng(strip_length, StdRng::seed_from_u64(seed))
    }

    fn with_rng(strip_length: usize, rng: StdRng) -> BuildRegistry {
        BuildRegistry {
            builds: Vec::new(),
            strip_length,
            rng,
        }
    }

    /// Starts tracking `id` at a random spot. A known id gets a fresh point but keeps its slot.
    pub fn create(&mut self, id: &str) {
        let point = BouncePoint::random(&mut self.rng, self.strip_length);
        match self.builds.iter_mut().find(|build| build.id == id) {
            Some(build) => build.point = point,
            None => self.builds.push(Build {
                id: id.to_string(),
                point,
            }),
        }
    }

    /// Returns false if `id` was not being tracked.
    pub fn remove(&mut self, id: &str) -> bool {
        let count = self.builds.len();
        self.builds.retain(|build| build.id != id);
        self.builds.len() != count
    }

    pub fn clear(&mut self) {
        self.builds.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.builds.is_empty()
    }

    pub fn count(&self) -> usize {
        self.builds.len()
    }

    pub fn strip_length(&self) -> usize {
        self.strip_length
    }

    #[cfg(test)]
    pub fn contains(&self, id: &str) -> bool {
        self.builds.iter().any(|build| build.id == id)
    }

    #[cfg(test)]
    pub fn builds(&self) -> &[Build] {
        &self.builds
    }

    /// Steps every point once and reports where each build ended up.
    pub fn advance_all(&mut self) -> Vec<(&str, usize)> {
        let strip_length = self.strip_length;
        self.builds
            .iter_mut()
            .map(|build| {
                let position = build.point.advance(strip_length);
                (build.id.as_str(), position)
            })
            .collect()
    }
}
