//! Exposure integrator: per-grain integrated luminance from the linear
//! field via the kernel sampler.

use crate::grain::Grain;
use crate::image::LinearField;
use crate::kernel::{rotate_and_scale, KernelCache};
use crate::rng::DeterministicRng;

const EXPOSURE_CLAMP_MAX: f64 = 4.0;

/// Integrate exposure for every grain in `grains`, in order, returning a
/// dense Vec parallel to `grains` (one entry per grain).
pub fn integrate_exposures(
    grains: &[Grain],
    field: &LinearField,
    cache: &mut KernelCache,
    rng: &mut DeterministicRng,
) -> Vec<f64> {
    grains
        .iter()
        .map(|g| integrate_one(g, field, cache, rng))
        .collect()
}

fn integrate_one(
    grain: &Grain,
    field: &LinearField,
    cache: &mut KernelCache,
    rng: &mut DeterministicRng,
) -> f64 {
    let template = cache.template_for(grain.size, grain.shape, rng);
    let samples = rotate_and_scale(&template, grain.orientation, grain.size);

    let mut exposure = 0.0;
    for s in &samples {
        let x = grain.x + s.ox;
        let y = grain.y + s.oy;
        exposure += s.weight * field.sample_bilinear(x, y);
    }

    exposure.clamp(0.0, EXPOSURE_CLAMP_MAX)
}
