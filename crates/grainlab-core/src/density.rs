//! Two-phase density calculation.
//!
//! Phase 1 produces one intrinsic density scalar per grain, independent
//! of pixel position. Phase 2 evaluates a grain's contribution to a
//! specific pixel from that scalar plus distance/shape falloff and
//! multi-octave noise. Splitting the work this way turns an O(N*M)
//! grain-by-pixel matrix into N scalars plus a per-pixel grid lookup.

use crate::film::FilmProfile;
use crate::grain::Grain;
use crate::rng::DeterministicRng;

const LOGISTIC_STEEPNESS: f64 = 0.12;
const RADIAL_ALPHA: f64 = 1.5;
const NOISE_OCTAVE_WEIGHTS: (f64, f64, f64) = (0.5, 0.3, 0.2);

fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Phase 1: intrinsic density for one grain, independent of pixel
/// position. `base_seed` and `grain_id` derive the grain's one-shot
/// noise term deterministically, so this can run in any order (or in
/// parallel) without changing results.
pub fn intrinsic_density(
    grain: &Grain,
    exposure: f64,
    film: &FilmProfile,
    intensity: f64,
    base_seed: u64,
    grain_id: u64,
) -> f64 {
    let xi_seed = DeterministicRng::derive_grain_seed(base_seed, grain_id);
    let mut xi_rng = DeterministicRng::new(xi_seed);
    let xi = xi_rng.gaussian(0.0, 0.05);

    if exposure + grain.sensitivity < grain.development_threshold - 3.0 * LOGISTIC_STEEPNESS {
        return 0.0;
    }

    let s = logistic(
        (exposure * grain.sensitivity + xi - grain.development_threshold) / LOGISTIC_STEEPNESS,
    );
    let h = film.characteristic_curve(exposure);
    s * h * intensity
}

/// Phase 2: one grain's contribution to one pixel given its already
/// computed intrinsic density.
pub fn pixel_contribution(
    grain: &Grain,
    intrinsic: f64,
    px: f64,
    py: f64,
    base_seed: u64,
    grain_id: u64,
) -> f64 {
    if intrinsic <= 0.0 {
        return 0.0;
    }

    let d = elliptical_distance(grain, px, py);
    if d > 2.0 * grain.size {
        return 0.0;
    }

    let falloff = (-(d / grain.size).powi(2) * RADIAL_ALPHA).exp();
    let noise = texture_noise(grain, px, py, base_seed, grain_id);

    intrinsic * falloff * (1.0 + 0.3 * (noise - 0.5))
}

/// Distance from (px, py) to the grain center under an elliptical metric
/// that undoes the grain's own shape stretch and rotation, so that a
/// highly elliptical grain's iso-density contours are ellipses aligned
/// with its orientation rather than circles.
fn elliptical_distance(grain: &Grain, px: f64, py: f64) -> f64 {
    let dx = px - grain.x;
    let dy = py - grain.y;

    let (sin_t, cos_t) = grain.orientation.sin_cos();
    // rotate into the grain's own frame (inverse rotation)
    let lx = dx * cos_t + dy * sin_t;
    let ly = -dx * sin_t + dy * cos_t;

    let stretch_y = (1.0 - 0.5 * grain.shape).max(1e-3);
    let ly_scaled = ly / stretch_y;

    (lx * lx + ly_scaled * ly_scaled).sqrt()
}

/// Multi-octave value noise, deterministic per (grain, pixel).
fn texture_noise(grain: &Grain, px: f64, py: f64, base_seed: u64, grain_id: u64) -> f64 {
    let noise_seed = DeterministicRng::derive_grain_seed(base_seed.wrapping_add(0xF00D), grain_id);
    let (a, b, c) = NOISE_OCTAVE_WEIGHTS;
    let n1 = value_noise_2d(noise_seed, px, py, 1.0 / grain.size);
    let n2 = value_noise_2d(noise_seed, px, py, 2.0 / grain.size);
    let n3 = value_noise_2d(noise_seed, px, py, 4.0 / grain.size);
    (a * n1 + b * n2 + c * n3).clamp(0.0, 1.0)
}

/// Bilinearly interpolated value noise over an integer lattice whose
/// corner values are deterministic hashes of the cell coordinates. Each
/// lattice corner is seeded independently, so neighboring evaluations at
/// different frequencies never share RNG state.
fn value_noise_2d(seed: u64, x: f64, y: f64, freq: f64) -> f64 {
    let fx = x * freq;
    let fy = y * freq;
    let x0 = fx.floor();
    let y0 = fy.floor();
    let tx = fx - x0;
    let ty = fy - y0;

    let ix0 = x0 as i64;
    let iy0 = y0 as i64;

    let v00 = lattice_value(seed, ix0, iy0);
    let v10 = lattice_value(seed, ix0 + 1, iy0);
    let v01 = lattice_value(seed, ix0, iy0 + 1);
    let v11 = lattice_value(seed, ix0 + 1, iy0 + 1);

    let sx = smoothstep(tx);
    let sy = smoothstep(ty);

    let top = v00 + (v10 - v00) * sx;
    let bottom = v01 + (v11 - v01) * sx;
    top + (bottom - top) * sy
}

/// Deterministic per-cell hash value in [0, 1), following the same
/// coordinate-mixing shape as a hashed-cell Worley noise: mix the two
/// lattice coordinates into the base seed via large odd multipliers,
/// then draw one uniform from a freshly seeded generator.
fn lattice_value(seed: u64, ix: i64, iy: i64) -> f64 {
    const P1: u64 = 0x9E37_79B9_7F4A_7C15;
    const P2: u64 = 0xC2B2_AE3D_27D4_EB4F;
    let cell_seed = seed
        .wrapping_add((ix as u64).wrapping_mul(P1))
        .wrapping_add((iy as u64).wrapping_mul(P2));
    let mut rng = DeterministicRng::new(cell_seed);
    rng.next_f64_unit()
}

fn smoothstep(t: f64) -> f64 {
    t * t * (3.0 - 2.0 * t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::film::FilmType;

    fn sample_grain() -> Grain {
        Grain {
            x: 50.0,
            y: 50.0,
            size: 2.0,
            sensitivity: 0.8,
            shape: 0.0,
            orientation: 0.0,
            development_threshold: 0.75,
        }
    }

    #[test]
    fn undeveloped_grain_has_zero_density() {
        let g = sample_grain();
        let film = FilmProfile::for_type(FilmType::Kodak);
        let d = intrinsic_density(&g, 0.0, &film, 1.0, 1, 0);
        assert_eq!(d, 0.0);
    }

    #[test]
    fn well_exposed_grain_has_positive_density() {
        let g = sample_grain();
        let film = FilmProfile::for_type(FilmType::Kodak);
        let d = intrinsic_density(&g, 2.0, &film, 1.0, 1, 0);
        assert!(d > 0.0);
    }

    #[test]
    fn density_scales_with_intensity() {
        let g = sample_grain();
        let film = FilmProfile::for_type(FilmType::Kodak);
        let d1 = intrinsic_density(&g, 2.0, &film, 1.0, 1, 0);
        let d2 = intrinsic_density(&g, 2.0, &film, 2.0, 1, 0);
        assert!((d2 - 2.0 * d1).abs() < 1e-9);
    }

    #[test]
    fn contribution_is_zero_beyond_two_radii() {
        let g = sample_grain();
        let c = pixel_contribution(&g, 0.5, g.x + 5.0 * g.size, g.y, 1, 0);
        assert_eq!(c, 0.0);
    }

    #[test]
    fn contribution_falls_off_with_distance() {
        let g = sample_grain();
        let near = pixel_contribution(&g, 0.5, g.x + 0.1, g.y, 1, 0);
        let far = pixel_contribution(&g, 0.5, g.x + 1.5 * g.size, g.y, 1, 0);
        assert!(near > far);
    }

    #[test]
    fn elliptical_distance_matches_euclidean_for_circular_grain() {
        let g = sample_grain();
        let d = elliptical_distance(&g, g.x + 3.0, g.y + 4.0);
        assert!((d - 5.0).abs() < 1e-9);
    }

    #[test]
    fn value_noise_is_deterministic() {
        let a = value_noise_2d(42, 10.3, 5.7, 0.5);
        let b = value_noise_2d(42, 10.3, 5.7, 0.5);
        assert_eq!(a, b);
    }

    #[test]
    fn value_noise_stays_in_unit_range() {
        for i in 0..50 {
            let v = value_noise_2d(7, i as f64 * 1.3, i as f64 * 0.7, 0.3);
            assert!((0.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn value_noise_is_continuous_at_lattice_boundary() {
        let a = value_noise_2d(7, 1.999, 1.0, 1.0);
        let b = value_noise_2d(7, 2.001, 1.0, 1.0);
        assert!((a - b).abs() < 0.05);
    }
}
