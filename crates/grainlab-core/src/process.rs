//! Pipeline orchestrator: the crate's single public operation.
//!
//! Wires together every other module in the order prescribed by the data
//! flow (color conversion, grain synthesis, spatial indexing, kernel-based
//! exposure integration, two-phase density, compositing, and lightness
//! compensation) and emits a monochrome raster of the same dimensions and
//! layout as the input.

use crate::color::linear_to_srgb_u8;
use crate::compositor::{apply_lightness_compensation, composite};
use crate::density::intrinsic_density;
use crate::error::ProcessError;
use crate::exposure::integrate_exposures;
use crate::film::FilmProfile;
use crate::grain::generate_grains;
use crate::grid::SpatialGrid;
use crate::image::{field_to_monochrome_raster, LinearField, RasterImage};
use crate::kernel::KernelCache;
use crate::resample::resample_bilinear;
use crate::rng::DeterministicRng;
use crate::settings::Settings;

/// Run the full film-grain pipeline on `image` under `settings`, returning a
/// same-sized raster whose RGB channels have been replaced by the simulated
/// monochrome print (`R == G == B`); alpha is passed through unchanged.
///
/// This is the crate's only public entry point for the core simulation.
/// Validation failures surface synchronously as a [`ProcessError`]; every
/// stochastic stage inside the pipeline is infallible by contract (see the
/// module docs on `grain`, `compositor`).
pub fn process(image: &RasterImage, settings: &Settings) -> Result<RasterImage, ProcessError> {
    settings.clone().validated()?;

    let seed = settings.resolve_seed();
    log::debug!(
        "process: {}x{} iso={} film={} intensity={} upscale={} seed={}",
        image.width,
        image.height,
        settings.iso,
        settings.film_type,
        settings.grain_intensity,
        settings.upscale_factor,
        seed
    );

    let upscaled = settings.upscale_factor > 1.0;
    let work_image = if upscaled {
        let new_w = (image.width as f64 * settings.upscale_factor).round().max(1.0) as u32;
        let new_h = (image.height as f64 * settings.upscale_factor).round().max(1.0) as u32;
        resample_bilinear(image, new_w, new_h)
    } else {
        image.clone()
    };

    let mut rng = DeterministicRng::new(seed);

    let field = LinearField::from_raster(&work_image);
    let mean_in = field.mean();
    log::trace!(
        "stage color: {}x{} linear field, mean={:.4}",
        work_image.width,
        work_image.height,
        mean_in
    );

    let film = FilmProfile::for_type(settings.film_type);

    let grain_set = generate_grains(
        work_image.width,
        work_image.height,
        settings.iso,
        film,
        settings.grain_intensity,
        &mut rng,
        false,
    );
    if grain_set.used_grid_fallback {
        log::warn!(
            "stage grain: Poisson-disk under-produced, fell back to grid sampling ({} grains)",
            grain_set.grains.len()
        );
    }
    log::debug!(
        "stage grain: {} grains, s_base={:.3}",
        grain_set.grains.len(),
        grain_set.s_base
    );

    let grid = SpatialGrid::build(
        &grain_set.grains,
        work_image.width,
        work_image.height,
        grain_set.s_max,
    );
    log::trace!(
        "stage grid: cell_size={:.1} cols={} rows={}",
        grid.cell_size(),
        grid.cols(),
        grid.rows()
    );

    let mut kernel_cache = KernelCache::new(grain_set.s_base);
    let kernel_seed = DeterministicRng::derive_stage_seed(seed, "kernel");
    let mut kernel_rng = DeterministicRng::new(kernel_seed);
    let exposures = integrate_exposures(&grain_set.grains, &field, &mut kernel_cache, &mut kernel_rng);
    log::trace!(
        "stage exposure: {} grains integrated, cache entries={}",
        exposures.len(),
        kernel_cache.len()
    );

    let intrinsic: Vec<f64> = grain_set
        .grains
        .iter()
        .zip(exposures.iter())
        .enumerate()
        .map(|(id, (grain, &exposure))| {
            intrinsic_density(grain, exposure, &film, settings.grain_intensity, seed, id as u64)
        })
        .collect();
    let developed = intrinsic.iter().filter(|d| **d > 0.0).count();
    log::debug!(
        "stage density: {}/{} grains developed",
        developed,
        intrinsic.len()
    );

    let mut paper = composite(
        &grain_set.grains,
        &intrinsic,
        &grid,
        &field,
        work_image.width,
        work_image.height,
        seed,
    );
    log::trace!("stage composite: done");

    let mean_before = mean_of(&paper);
    apply_lightness_compensation(&mut paper, mean_in);
    let mean_after = mean_of(&paper);
    log::debug!(
        "stage lightness: mean_in={:.4} mean_before={:.4} mean_after={:.4}",
        mean_in,
        mean_before,
        mean_after
    );

    let monochrome = field_to_monochrome_raster(&paper, work_image.width, work_image.height, &work_image);

    let result = if upscaled {
        resample_bilinear(&monochrome, image.width, image.height)
    } else {
        monochrome
    };

    log::debug!("process: done");
    Ok(result)
}

fn mean_of(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Alpha passthrough is exercised implicitly by `field_to_monochrome_raster`;
/// kept here as a standalone helper for the ambient PNG/resample paths that
/// want to confirm a linear value maps to the same sRGB byte as the public
/// color module does.
pub fn linear_to_monochrome_pixel(value: f64, alpha: u8) -> [u8; 4] {
    let v = linear_to_srgb_u8(value);
    [v, v, v, alpha]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::film::FilmType;

    fn settings(iso: u32, film: FilmType, seed: u64) -> Settings {
        Settings::new(iso, film).unwrap().with_seed(seed)
    }

    #[test]
    fn mid_gray_scenario_has_expected_mean_and_grain() {
        let img = RasterImage::filled(50, 50, [188, 188, 188, 255]).unwrap();
        let s = settings(400, FilmType::Kodak, 12345);
        let out = process(&img, &s).unwrap();

        let out_field = LinearField::from_raster(&out);
        assert!(out_field.mean() >= 0.45 && out_field.mean() <= 0.55);
        assert!(out_field.std_dev() > 0.0);
    }

    #[test]
    fn black_scenario_stays_dark() {
        let img = RasterImage::filled(50, 50, [0, 0, 0, 255]).unwrap();
        let s = settings(400, FilmType::Kodak, 12345);
        let out = process(&img, &s).unwrap();

        let out_field = LinearField::from_raster(&out);
        assert!(out_field.mean() < 0.01);
        assert!(out_field.std_dev() < 0.005);
    }

    #[test]
    fn white_scenario_stays_bright() {
        let img = RasterImage::filled(50, 50, [255, 255, 255, 255]).unwrap();
        let s = settings(400, FilmType::Kodak, 12345);
        let out = process(&img, &s).unwrap();

        let out_field = LinearField::from_raster(&out);
        assert!(out_field.mean() > 0.95);
    }

    #[test]
    fn process_is_deterministic() {
        let img = RasterImage::filled(50, 50, [188, 188, 188, 255]).unwrap();
        let s = settings(400, FilmType::Kodak, 12345);
        let a = process(&img, &s).unwrap();
        let b = process(&img, &s).unwrap();
        assert_eq!(a.pixels, b.pixels);
    }

    #[test]
    fn output_is_monochrome_and_preserves_alpha() {
        let img = RasterImage::filled(20, 20, [100, 150, 200, 42]).unwrap();
        let s = settings(800, FilmType::Fuji, 7);
        let out = process(&img, &s).unwrap();
        for y in 0..out.height {
            for x in 0..out.width {
                let p = out.pixel_at(x, y);
                assert_eq!(p[0], p[1]);
                assert_eq!(p[1], p[2]);
                assert_eq!(p[3], 42);
            }
        }
    }

    #[test]
    fn film_types_produce_distinct_output() {
        let img = RasterImage::filled(30, 30, [160, 160, 160, 255]).unwrap();
        let k = process(&img, &settings(400, FilmType::Kodak, 99)).unwrap();
        let f = process(&img, &settings(400, FilmType::Fuji, 99)).unwrap();
        let i = process(&img, &settings(400, FilmType::Ilford, 99)).unwrap();
        assert_ne!(k.pixels, f.pixels);
        assert_ne!(k.pixels, i.pixels);
        assert_ne!(f.pixels, i.pixels);
    }

    #[test]
    fn iso_increase_reduces_grain_count() {
        let img = RasterImage::filled(50, 50, [160, 160, 160, 255]).unwrap();
        let film = FilmProfile::for_type(FilmType::Kodak);

        let mut low_rng = DeterministicRng::new(1);
        let low = generate_grains(50, 50, 400, film, 1.0, &mut low_rng, false);
        let mut high_rng = DeterministicRng::new(1);
        let high = generate_grains(50, 50, 3200, film, 1.0, &mut high_rng, false);

        assert!((high.grains.len() as f64) < 0.6 * low.grains.len() as f64);
    }

    #[test]
    fn invalid_settings_are_rejected_synchronously() {
        let img = RasterImage::filled(10, 10, [0, 0, 0, 255]).unwrap();
        let bad = Settings {
            iso: 50,
            film_type: FilmType::Kodak,
            grain_intensity: 1.0,
            upscale_factor: 1.0,
            seed: None,
        };
        assert!(process(&img, &bad).is_err());
    }

    #[test]
    fn upscale_factor_round_trips_dimensions() {
        let img = RasterImage::filled(16, 16, [140, 140, 140, 255]).unwrap();
        let s = settings(400, FilmType::Kodak, 5).with_upscale(2.0);
        let out = process(&img, &s).unwrap();
        assert_eq!(out.width, 16);
        assert_eq!(out.height, 16);
    }
}
