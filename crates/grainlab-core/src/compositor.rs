//! Compositor: per-pixel density accumulation, Beer-Lambert transmission,
//! negative-to-positive inversion, and lightness compensation.

use crate::density::pixel_contribution;
use crate::grain::Grain;
use crate::grid::SpatialGrid;
use crate::image::LinearField;

const MAX_LIGHTNESS_ITERATIONS: usize = 2;

/// Floor kept between the clamped local luminance and 1.0 so
/// `base_density` never takes `ln(0)`.
const BASE_TRANSMISSION_FLOOR: f64 = 1e-4;

/// Bulk emulsion density implied directly by the local exposure,
/// independent of any individual grain: Beer-Lambert run in reverse so
/// that, absent any grain texture, the paper response reproduces the
/// input luminance exactly (`1 - exp(-base_density(l)) == l`).
///
/// The explicitly generated grain population is sparse by construction
/// (§4.D's target count covers only a fraction of the frame at typical
/// ISOs), so per-grain density alone leaves most pixels undeveloped and
/// the lightness-compensation scalar cannot brighten a pixel that never
/// received any density in the first place. This floor stands in for the
/// uncountably many sub-resolution grains real film has alongside the
/// ones this simulation models explicitly; individual `Grain`s still
/// contribute the visible texture and noise on top of it.
fn base_density(luminance: f64) -> f64 {
    let l = luminance.clamp(0.0, 1.0 - BASE_TRANSMISSION_FLOOR);
    -(1.0 - l).ln()
}

/// Accumulate density at every pixel from the local exposure floor plus
/// the grains in its 3x3 cell neighborhood, then apply Beer-Lambert
/// attenuation and the negative-to-positive inversion. Returns the paper
/// response field `P = 1 - exp(-sum_density)`, dense row-major over
/// `width * height`.
pub fn composite(
    grains: &[Grain],
    intrinsic: &[f64],
    grid: &SpatialGrid,
    field: &LinearField,
    width: u32,
    height: u32,
    base_seed: u64,
) -> Vec<f64> {
    let mut paper = Vec::with_capacity(width as usize * height as usize);

    for y in 0..height {
        for x in 0..width {
            let px = x as f64 + 0.5;
            let py = y as f64 + 0.5;

            let mut sum = base_density(field.get(x as i64, y as i64));
            for &idx in &grid.query_pixel(px, py) {
                let grain = &grains[idx];
                sum += pixel_contribution(grain, intrinsic[idx], px, py, base_seed, idx as u64);
            }

            let transmission = (-sum).exp();
            let p = (1.0 - transmission).clamp(0.0, 1.0);
            paper.push(p);
        }
    }

    paper
}

/// Pure boundary-condition function: the scalar multiplier applied to the
/// paper response field to bring its mean back toward the original
/// input's mean luminance.
///
/// - `mean_proc < 1e-3`: result would be unstable to scale up, return 1.0
///   unchanged rather than amplify near-zero noise.
/// - `mean_orig < 0.01`: very dark originals only ever get scaled down,
///   never brightened, so clamp the raw ratio to at most 1.0.
/// - otherwise: the raw ratio, clamped to a sane [0.01, 100] band so one
///   pathological frame can't blow up the whole correction.
pub fn calculate_lightness_factor(mean_orig: f64, mean_proc: f64) -> f64 {
    if mean_proc < 1e-3 {
        return 1.0;
    }
    let raw = mean_orig / mean_proc;
    if mean_orig < 0.01 {
        return raw.min(1.0);
    }
    raw.clamp(0.01, 100.0)
}

/// Apply the bounded lightness-compensation loop (at most two
/// iterations) to `paper` in place, given the original input's mean
/// linear luminance `mean_in`. This scales the already-composited field
/// by a uniform factor; it never re-runs grain generation or density
/// accumulation.
pub fn apply_lightness_compensation(paper: &mut [f64], mean_in: f64) {
    for _ in 0..MAX_LIGHTNESS_ITERATIONS {
        let mean_p = mean_of(paper);

        let needs_correction = mean_in > 0.01
            && mean_p > 0.001
            && ((mean_p - mean_in).abs() / mean_in) > 0.01;

        if !needs_correction {
            break;
        }

        let k = calculate_lightness_factor(mean_in, mean_p);
        for v in paper.iter_mut() {
            *v = (*v * k).clamp(0.0, 1.0);
        }
    }
}

fn mean_of(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
