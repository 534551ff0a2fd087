//! Film profile table: per-stock constants and the characteristic curve
//! mapping exposure to optical density.

use std::fmt;
use std::str::FromStr;

/// Supported film stocks. Each carries fixed gamma/toe/shoulder/threshold
/// constants (see [`FilmProfile::for_type`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilmType {
    Kodak,
    Fuji,
    Ilford,
}

impl fmt::Display for FilmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FilmType::Kodak => "kodak",
            FilmType::Fuji => "fuji",
            FilmType::Ilford => "ilford",
        };
        write!(f, "{s}")
    }
}

impl FromStr for FilmType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "kodak" => Ok(FilmType::Kodak),
            "fuji" => Ok(FilmType::Fuji),
            "ilford" => Ok(FilmType::Ilford),
            other => Err(format!("unknown film type: {other}")),
        }
    }
}

/// Fixed per-stock constants driving both grain generation bias and the
/// characteristic curve shape.
#[derive(Debug, Clone, Copy)]
pub struct FilmProfile {
    pub gamma: f64,
    /// Toe compression strength: higher values push the low-exposure
    /// shoulder of the curve down harder before the linear region.
    pub toe_strength: f64,
    /// Shoulder compression strength: higher values saturate faster at
    /// high exposure.
    pub shoulder_strength: f64,
    pub threshold_bias: f64,
    /// Per-stock multiplier on `s_base` grain sizing (grain size factor).
    pub size_factor: f64,
}

impl FilmProfile {
    pub fn for_type(film: FilmType) -> Self {
        match film {
            FilmType::Kodak => FilmProfile {
                gamma: 2.2,
                toe_strength: 1.0,
                shoulder_strength: 1.0,
                threshold_bias: 0.75,
                size_factor: 1.0,
            },
            FilmType::Fuji => FilmProfile {
                gamma: 1.8,
                toe_strength: 0.6,
                shoulder_strength: 0.6,
                threshold_bias: 0.80,
                size_factor: 0.92,
            },
            FilmType::Ilford => FilmProfile {
                gamma: 2.6,
                toe_strength: 1.5,
                shoulder_strength: 1.5,
                threshold_bias: 0.85,
                size_factor: 1.08,
            },
        }
    }

    /// Characteristic curve H(exposure) -> density, in [0, ~1).
    ///
    /// `exposure` is linear-domain (as integrated by the kernel sampler);
    /// internally this moves into log-domain before applying gamma and
    /// toe/shoulder shaping, matching the film-response convention that
    /// density is linear in log-exposure over the useful range. H(0) = 0,
    /// monotonic non-decreasing, asymptotically approaches 1.
    pub fn characteristic_curve(&self, exposure: f64) -> f64 {
        let e = exposure.max(0.0);
        // log-domain exposure measure; ln(1+e) keeps H(0) == 0 exactly
        // while behaving like a log curve away from zero.
        let log_e = (1.0 + e).ln();

        // Toe: soften the low end by an exponential compression keyed off
        // toe_strength; shoulder: saturate the high end the same way.
        let toe = 1.0 - (-log_e * self.toe_strength).exp();
        let shouldered = toe.powf(1.0 / self.gamma.max(0.1));
        let shoulder = 1.0 - (-shouldered * self.shoulder_strength * 3.0).exp();

        shoulder.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_film_types() {
        assert_eq!(FilmType::from_str("kodak").unwrap(), FilmType::Kodak);
        assert_eq!(FilmType::from_str("FUJI").unwrap(), FilmType::Fuji);
        assert_eq!(FilmType::from_str("Ilford").unwrap(), FilmType::Ilford);
    }

    #[test]
    fn rejects_unknown_film_type() {
        assert!(FilmType::from_str("agfa").is_err());
    }

    #[test]
    fn curve_is_zero_at_zero_exposure() {
        for film in [FilmType::Kodak, FilmType::Fuji, FilmType::Ilford] {
            let p = FilmProfile::for_type(film);
            assert_eq!(p.characteristic_curve(0.0), 0.0);
        }
    }

    #[test]
    fn curve_is_monotonic_nondecreasing() {
        for film in [FilmType::Kodak, FilmType::Fuji, FilmType::Ilford] {
            let p = FilmProfile::for_type(film);
            let mut prev = 0.0;
            let mut x = 0.0;
            while x <= 4.0 {
                let h = p.characteristic_curve(x);
                assert!(h >= prev - 1e-9, "curve decreased for {film:?} at {x}");
                prev = h;
                x += 0.05;
            }
        }
    }

    #[test]
    fn curve_saturates_near_one() {
        for film in [FilmType::Kodak, FilmType::Fuji, FilmType::Ilford] {
            let p = FilmProfile::for_type(film);
            assert!(p.characteristic_curve(50.0) > 0.9);
            assert!(p.characteristic_curve(50.0) <= 1.0);
        }
    }

    #[test]
    fn profiles_are_pairwise_distinct() {
        let k = FilmProfile::for_type(FilmType::Kodak);
        let f = FilmProfile::for_type(FilmType::Fuji);
        let i = FilmProfile::for_type(FilmType::Ilford);
        assert_ne!(k.gamma, f.gamma);
        assert_ne!(k.gamma, i.gamma);
        assert_ne!(f.gamma, i.gamma);
    }
}
