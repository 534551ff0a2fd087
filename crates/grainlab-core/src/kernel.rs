//! Kernel sampler: per-grain sample offsets and weights used to integrate
//! exposure against the luminance field.
//!
//! Templates are cached per (size-bucket, shape-bucket, sample-count)
//! since many grains share a bucket; rotation by the grain's individual
//! orientation is applied at use time, never baked into the cached
//! template, so the cache stays small regardless of orientation spread.

use crate::rng::DeterministicRng;

const GAUSSIAN_FALLOFF_STD: f64 = 0.5;
const OFFSET_STD: f64 = 0.3;
const MAX_CACHE_ENTRIES: usize = 100;

/// One sample offset (in an unrotated, shape-stretched unit-disk frame)
/// with its normalized weight.
#[derive(Debug, Clone, Copy)]
pub struct KernelSample {
    pub ox: f64,
    pub oy: f64,
    pub weight: f64,
}

type CacheKey = (i64, i64, usize);

/// LRU-capped cache of kernel templates. Keyed on bucketed size and shape
/// plus the resolved sample count, so boundary grains whose size sits
/// right at a bucket edge never collide with a different sample count.
pub struct KernelCache {
    s_base: f64,
    entries: Vec<(CacheKey, Vec<KernelSample>)>,
}

impl KernelCache {
    pub fn new(s_base: f64) -> Self {
        Self {
            s_base: s_base.max(1e-6),
            entries: Vec::with_capacity(MAX_CACHE_ENTRIES),
        }
    }

    fn sample_count(size: f64) -> usize {
        if size < 1.5 {
            4
        } else if size < 3.0 {
            8
        } else {
            16
        }
    }

    fn bucket_key(&self, size: f64, shape: f64) -> CacheKey {
        let size_bucket_width = self.s_base / 4.0;
        let size_bucket = (size / size_bucket_width).floor() as i64;
        let shape_bucket = (shape / 0.1).floor() as i64;
        (size_bucket, shape_bucket, Self::sample_count(size))
    }

    /// Fetch (building and caching if needed) the unrotated template for
    /// a grain of the given size and shape. `rng` is only consumed on a
    /// cache miss.
    pub fn template_for(
        &mut self,
        size: f64,
        shape: f64,
        rng: &mut DeterministicRng,
    ) -> Vec<KernelSample> {
        let key = self.bucket_key(size, shape);

        if let Some(pos) = self.entries.iter().position(|(k, _)| *k == key) {
            let entry = self.entries.remove(pos);
            let template = entry.1.clone();
            self.entries.push(entry);
            return template;
        }

        let template = build_template(key.2, shape, rng);

        if self.entries.len() >= MAX_CACHE_ENTRIES {
            self.entries.remove(0);
        }
        self.entries.push((key, template.clone()));
        template
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn build_template(n_samples: usize, shape: f64, rng: &mut DeterministicRng) -> Vec<KernelSample> {
    let stretch_y = 1.0 - 0.5 * shape;
    let mut raw: Vec<(f64, f64)> = Vec::with_capacity(n_samples);
    for _ in 0..n_samples {
        let gx = rng.gaussian(0.0, OFFSET_STD);
        let gy = rng.gaussian(0.0, OFFSET_STD) * stretch_y;
        raw.push((gx, gy));
    }

    let mut weighted: Vec<KernelSample> = raw
        .into_iter()
        .map(|(ox, oy)| {
            let norm_sq = ox * ox + oy * oy;
            let w = (-norm_sq / (2.0 * GAUSSIAN_FALLOFF_STD * GAUSSIAN_FALLOFF_STD)).exp();
            KernelSample { ox, oy, weight: w }
        })
        .collect();

    let total: f64 = weighted.iter().map(|s| s.weight).sum();
    if total > 0.0 {
        for s in &mut weighted {
            s.weight /= total;
        }
    } else {
        let uniform = 1.0 / weighted.len() as f64;
        for s in &mut weighted {
            s.weight = uniform;
        }
    }

    weighted
}

/// Rotate and scale a cached template's offsets by a grain's individual
/// orientation and radius. This step is deliberately never cached.
pub fn rotate_and_scale(template: &[KernelSample], orientation: f64, size: f64) -> Vec<KernelSample> {
    let (sin_t, cos_t) = orientation.sin_cos();
    template
        .iter()
        .map(|s| {
            let rx = s.ox * cos_t - s.oy * sin_t;
            let ry = s.ox * sin_t + s.oy * cos_t;
            KernelSample {
                ox: rx * size,
                oy: ry * size,
                weight: s.weight,
            }
        })
        .collect()
}
