//! Grain population synthesis: Poisson-disk sampling with a grid-based
//! fallback, followed by per-grain property assignment.

use std::collections::HashSet;

use crate::film::FilmProfile;
use crate::rng::DeterministicRng;

/// One silver-halide grain. Immutable after creation.
#[derive(Debug, Clone, Copy)]
pub struct Grain {
    pub x: f64,
    pub y: f64,
    /// Radius in pixels.
    pub size: f64,
    /// Sensitivity multiplier, in [0.4, 1.2].
    pub sensitivity: f64,
    /// Ellipticity, 0 = circular, 1 = highly elliptical.
    pub shape: f64,
    /// Orientation in radians, [0, pi).
    pub orientation: f64,
    /// Exposure level above which the grain develops.
    pub development_threshold: f64,
}

/// The full set of grains for one image, plus the sizing constants used
/// to derive them (needed downstream by the spatial index and kernel
/// sampler).
pub struct GrainSet {
    pub grains: Vec<Grain>,
    pub s_base: f64,
    pub s_min: f64,
    pub s_max: f64,
    pub r_min: f64,
    /// True if the Poisson-disk stage under-produced and the grid
    /// fallback was used to reach the target count.
    pub used_grid_fallback: bool,
}

/// Generate the grain population for an image of the given dimensions.
///
/// `force_grid_fallback` exists purely for the grid-fallback-equivalence
/// test (§8): setting it true skips Poisson-disk sampling entirely.
pub fn generate_grains(
    width: u32,
    height: u32,
    iso: u32,
    film: FilmProfile,
    intensity: f64,
    rng: &mut DeterministicRng,
    force_grid_fallback: bool,
) -> GrainSet {
    let w = width as f64;
    let h = height as f64;

    let target_count = ((w * h) * iso as f64 / 80_000.0 * intensity).round().max(0.0) as usize;

    let s_base = (iso as f64 / 200.0 * film.size_factor).max(0.5);
    let s_min = 0.5 * s_base;
    let s_max = 3.0 * s_base;
    let r_min = s_base * 1.8;

    let mut positions = if force_grid_fallback {
        Vec::new()
    } else {
        poisson_disk_sample(w, h, r_min, target_count, rng)
    };

    let used_grid_fallback = positions.len() < (0.7 * target_count as f64).ceil() as usize;
    if used_grid_fallback {
        positions = grid_fallback_sample(w, h, r_min, target_count, rng);
    }

    let grains = positions
        .into_iter()
        .map(|(x, y)| make_grain(x, y, s_min, s_max, s_base, film, rng))
        .collect();

    GrainSet {
        grains,
        s_base,
        s_min,
        s_max,
        r_min,
        used_grid_fallback,
    }
}

fn make_grain(
    x: f64,
    y: f64,
    s_min: f64,
    s_max: f64,
    s_base: f64,
    film: FilmProfile,
    rng: &mut DeterministicRng,
) -> Grain {
    let u = rng.next_f64_unit();
    let size = s_min + (s_max - s_min) * u.powi(3);

    let sensitivity = rng.gaussian(0.8, 0.2).clamp(0.4, 1.2);

    let shape_u = rng.next_f64_unit();
    let shape = shape_u * shape_u;

    let orientation = rng.uniform_range(0.0, std::f64::consts::PI);

    let threshold = (film.threshold_bias + rng.gaussian(0.0, 0.15)
        - 0.2 * (size - s_base) / s_base)
        .clamp(0.1, 1.5);

    Grain {
        x,
        y,
        size,
        sensitivity,
        shape,
        orientation,
        development_threshold: threshold,
    }
}

/// Bridson-style Poisson-disk sampling with a background acceleration
/// grid. Stops when the active list is exhausted or `target_count` points
/// have been accepted, whichever comes first.
fn poisson_disk_sample(
    w: f64,
    h: f64,
    r_min: f64,
    target_count: usize,
    rng: &mut DeterministicRng,
) -> Vec<(f64, f64)> {
    if target_count == 0 || w <= 0.0 || h <= 0.0 {
        return Vec::new();
    }

    const K: usize = 30;
    let cell_size = r_min / std::f64::consts::SQRT_2;
    let grid_w = (w / cell_size).ceil().max(1.0) as usize;
    let grid_h = (h / cell_size).ceil().max(1.0) as usize;
    let mut grid: Vec<Option<usize>> = vec![None; grid_w * grid_h];

    let mut points: Vec<(f64, f64)> = Vec::new();
    let mut active: Vec<usize> = Vec::new();

    let first = (rng.uniform_range(0.0, w), rng.uniform_range(0.0, h));
    insert_point(&mut grid, grid_w, cell_size, first, 0);
    points.push(first);
    active.push(0);

    while !active.is_empty() && points.len() < target_count {
        let active_idx = rng.gen_below(active.len());
        let origin_idx = active[active_idx];
        let origin = points[origin_idx];

        let mut found = false;
        for _ in 0..K {
            let radius = rng.uniform_range(r_min, 2.0 * r_min);
            let angle = rng.uniform_range(0.0, 2.0 * std::f64::consts::PI);
            let candidate = (origin.0 + radius * angle.cos(), origin.1 + radius * angle.sin());

            if candidate.0 < 0.0 || candidate.0 >= w || candidate.1 < 0.0 || candidate.1 >= h {
                continue;
            }

            if is_far_enough(&grid, grid_w, grid_h, cell_size, &points, candidate, r_min) {
                let idx = points.len();
                insert_point(&mut grid, grid_w, cell_size, candidate, idx);
                points.push(candidate);
                active.push(idx);
                found = true;
                break;
            }
        }

        if !found {
            active.swap_remove(active_idx);
        }
    }

    points
}

fn insert_point(
    grid: &mut [Option<usize>],
    grid_w: usize,
    cell_size: f64,
    p: (f64, f64),
    idx: usize,
) {
    let gx = (p.0 / cell_size) as usize;
    let gy = (p.1 / cell_size) as usize;
    grid[gy * grid_w + gx] = Some(idx);
}

fn is_far_enough(
    grid: &[Option<usize>],
    grid_w: usize,
    grid_h: usize,
    cell_size: f64,
    points: &[(f64, f64)],
    candidate: (f64, f64),
    r_min: f64,
) -> bool {
    let gx = (candidate.0 / cell_size) as i64;
    let gy = (candidate.1 / cell_size) as i64;

    for dy in -2i64..=2 {
        for dx in -2i64..=2 {
            let nx = gx + dx;
            let ny = gy + dy;
            if nx < 0 || ny < 0 || nx as usize >= grid_w || ny as usize >= grid_h {
                continue;
            }
            if let Some(idx) = grid[ny as usize * grid_w + nx as usize] {
                let p = points[idx];
                let dist = ((p.0 - candidate.0).powi(2) + (p.1 - candidate.1).powi(2)).sqrt();
                if dist < r_min {
                    return false;
                }
            }
        }
    }
    true
}

/// Lay a jittered grid of spacing `1.15 * r_min` and accept cells with a
/// reservoir-style probability until `target_count` is reached (or the
/// grid is exhausted). The 1.15 factor (rather than exactly `r_min`) with
/// jitter bounded to 5% of spacing keeps the worst-case axis-adjacent
/// distance above `0.99 * r_min` even after jitter is applied.
fn grid_fallback_sample(
    w: f64,
    h: f64,
    r_min: f64,
    target_count: usize,
    rng: &mut DeterministicRng,
) -> Vec<(f64, f64)> {
    if target_count == 0 || w <= 0.0 || h <= 0.0 {
        return Vec::new();
    }

    let spacing = 1.15 * r_min;
    let jitter_amp = 0.05 * spacing;

    let cols = (w / spacing).floor().max(1.0) as usize;
    let rows = (h / spacing).floor().max(1.0) as usize;
    let total_cells = cols * rows;

    if total_cells == 0 {
        let p = (
            (w / 2.0).clamp(0.0, w - f64::EPSILON.max(0.0)),
            (h / 2.0).clamp(0.0, h - f64::EPSILON.max(0.0)),
        );
        return vec![p];
    }

    let accept_prob = (target_count as f64 / total_cells as f64).min(1.0);

    let mut points = Vec::with_capacity(target_count.min(total_cells));
    let mut used_cells: HashSet<(usize, usize)> = HashSet::new();
    'outer: for row in 0..rows {
        for col in 0..cols {
            if points.len() >= target_count {
                break 'outer;
            }
            if rng.next_f64_unit() > accept_prob {
                continue;
            }
            let cx = (col as f64 + 0.5) * spacing;
            let cy = (row as f64 + 0.5) * spacing;
            let jx = rng.uniform_range(-jitter_amp, jitter_amp);
            let jy = rng.uniform_range(-jitter_amp, jitter_amp);
            let x = (cx + jx).clamp(0.0, w - 1e-6);
            let y = (cy + jy).clamp(0.0, h - 1e-6);
            points.push((x, y));
            used_cells.insert((col, row));
        }
    }

    // If probability sampling under-shot on a small grid, top up from the
    // cells the first pass skipped. Tracking cells (rather than comparing
    // jittered float coordinates) guarantees a cell visited in the first
    // pass is never re-jittered into a near-duplicate of its own point:
    // two distinct cells are always >= `spacing - 2*jitter_amp` apart,
    // which stays above `0.99 * r_min` by the same margin documented above.
    if points.len() < target_count.min(total_cells) {
        'top_up: for row in 0..rows {
            for col in 0..cols {
                if points.len() >= target_count {
                    break 'top_up;
                }
                if used_cells.contains(&(col, row)) {
                    continue;
                }
                let cx = (col as f64 + 0.5) * spacing;
                let cy = (row as f64 + 0.5) * spacing;
                let jx = rng.uniform_range(-jitter_amp, jitter_amp);
                let jy = rng.uniform_range(-jitter_amp, jitter_amp);
                let x = (cx + jx).clamp(0.0, w - 1e-6);
                let y = (cy + jy).clamp(0.0, h - 1e-6);
                points.push((x, y));
                used_cells.insert((col, row));
            }
        }
    }

    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::film::FilmType;

    #[test]
    fn poisson_disk_respects_minimum_distance() {
        let mut rng = DeterministicRng::new(12345);
        let points = poisson_disk_sample(200.0, 200.0, 10.0, 200, &mut rng);
        for i in 0..points.len() {
            for j in (i + 1)..points.len() {
                let d = ((points[i].0 - points[j].0).powi(2)
                    + (points[i].1 - points[j].1).powi(2))
                .sqrt();
                assert!(d >= 10.0 * 0.99, "points {i},{j} too close: {d}");
            }
        }
    }

    #[test]
    fn poisson_disk_is_deterministic_for_same_seed() {
        let mut a = DeterministicRng::new(777);
        let mut b = DeterministicRng::new(777);
        let pa = poisson_disk_sample(100.0, 100.0, 8.0, 150, &mut a);
        let pb = poisson_disk_sample(100.0, 100.0, 8.0, 150, &mut b);
        assert_eq!(pa.len(), pb.len());
        for (p1, p2) in pa.iter().zip(pb.iter()) {
            assert!((p1.0 - p2.0).abs() < 1e-3);
            assert!((p1.1 - p2.1).abs() < 1e-3);
        }
    }

    #[test]
    fn grid_fallback_respects_minimum_distance_floor() {
        let mut rng = DeterministicRng::new(5);
        let r_min = 10.0;
        let points = grid_fallback_sample(300.0, 300.0, r_min, 400, &mut rng);
        for i in 0..points.len() {
            for j in (i + 1)..points.len() {
                let d = ((points[i].0 - points[j].0).powi(2)
                    + (points[i].1 - points[j].1).powi(2))
                .sqrt();
                // adjacent grid cells only; distant cells are trivially far
                if d < r_min * 2.0 {
                    assert!(d >= r_min * 0.99, "grid points {i},{j} too close: {d}");
                }
            }
        }
    }

    #[test]
    fn grid_fallback_topup_preserves_minimum_distance() {
        // A small grid relative to the target count makes the Bernoulli
        // accept pass undershoot (and the top-up pass run) for most seeds.
        let r_min = 10.0;
        for seed in 0..20u64 {
            let mut rng = DeterministicRng::new(seed);
            let points = grid_fallback_sample(60.0, 60.0, r_min, 30, &mut rng);
            for i in 0..points.len() {
                for j in (i + 1)..points.len() {
                    let d = ((points[i].0 - points[j].0).powi(2)
                        + (points[i].1 - points[j].1).powi(2))
                    .sqrt();
                    if d < r_min * 2.0 {
                        assert!(
                            d >= r_min * 0.99,
                            "seed {seed}: points {i},{j} too close: {d}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn grid_fallback_reaches_within_bounds_of_target() {
        let mut rng = DeterministicRng::new(9);
        let points = grid_fallback_sample(500.0, 500.0, 6.0, 1000, &mut rng);
        assert!(points.len() as f64 >= 0.7 * 1000.0 || points.len() <= 1000);
    }

    #[test]
    fn generate_grains_iso_monotonicity() {
        let mut rng_low = DeterministicRng::new(1);
        let mut rng_high = DeterministicRng::new(1);
        let film = FilmProfile::for_type(FilmType::Kodak);

        let low = generate_grains(400, 400, 400, film, 1.0, &mut rng_low, false);
        let high = generate_grains(400, 400, 3200, film, 1.0, &mut rng_high, false);

        assert!(high.grains.len() < low.grains.len());

        let mean_low: f64 =
            low.grains.iter().map(|g| g.size).sum::<f64>() / low.grains.len() as f64;
        let mean_high: f64 =
            high.grains.iter().map(|g| g.size).sum::<f64>() / high.grains.len() as f64;
        assert!(mean_high > mean_low);
    }

    #[test]
    fn force_grid_fallback_still_meets_count_band() {
        let mut rng = DeterministicRng::new(42);
        let film = FilmProfile::for_type(FilmType::Kodak);
        let set = generate_grains(300, 300, 400, film, 1.0, &mut rng, true);
        assert!(set.used_grid_fallback);
        let target = ((300.0 * 300.0) * 400.0 / 80_000.0).round();
        assert!(set.grains.len() as f64 >= 0.7 * target);
        assert!(set.grains.len() as f64 <= 1.3 * target + 1.0);
    }

    #[test]
    fn grain_properties_stay_in_declared_ranges() {
        let mut rng = DeterministicRng::new(3);
        let film = FilmProfile::for_type(FilmType::Kodak);
        let set = generate_grains(200, 200, 400, film, 1.0, &mut rng, false);
        for g in &set.grains {
            assert!(g.sensitivity >= 0.4 && g.sensitivity <= 1.2);
            assert!(g.shape >= 0.0 && g.shape <= 1.0);
            assert!(g.orientation >= 0.0 && g.orientation < std::f64::consts::PI);
            assert!(g.development_threshold >= 0.1 && g.development_threshold <= 1.5);
            assert!(g.size >= set.s_min - 1e-9 && g.size <= set.s_max + 1e-9);
        }
    }
}
