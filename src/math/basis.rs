//! Basis functions for the design matrix.
//!
//! Calendar encoding is periodic:
//!
//! - `sin(2π · month / 12)`
//! - `cos(2π · month / 12)`
//!
//! so December and January sit next to each other on the unit circle instead
//! of eleven units apart as raw integer months would.
//!
//! The trend enters as powers of a scaled time index. Scaling by the series
//! length keeps `t^3` near unit magnitude over the training window, which
//! keeps the least-squares problem well conditioned for degree <= 3.

use std::f64::consts::TAU;

pub const MONTHS_PER_YEAR: f64 = 12.0;

/// Position of `month` (1..=12) on the annual cycle, in radians.
pub fn month_angle(month: u32) -> f64 {
    TAU * f64::from(month) / MONTHS_PER_YEAR
}

pub fn month_sin(month: u32) -> f64 {
    month_angle(month).sin()
}

pub fn month_cos(month: u32) -> f64 {
    month_angle(month).cos()
}

/// `(time_index / scale)^power`. A non-positive scale is treated as 1.
pub fn trend_power(time_index: usize, scale: f64, power: u8) -> f64 {
    let scale = if scale.is_finite() && scale > 0.0 { scale } else { 1.0 };
    (time_index as f64 / scale).powi(i32::from(power))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(month: u32) -> (f64, f64) {
        (month_sin(month), month_cos(month))
    }

    fn dist(a: (f64, f64), b: (f64, f64)) -> f64 {
        ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
    }

    #[test]
    fn december_and_january_are_neighbours() {
        let dec_jan = dist(point(12), point(1));
        let jan_feb = dist(point(1), point(2));
        assert!((dec_jan - jan_feb).abs() < 1e-12);
        assert!(dist(point(1), point(7)) > dec_jan);
    }

    #[test]
    fn trend_powers_are_scaled() {
        assert_eq!(trend_power(0, 10.0, 1), 0.0);
        assert!((trend_power(5, 10.0, 2) - 0.25).abs() < 1e-15);
        assert!((trend_power(3, 0.0, 1) - 3.0).abs() < 1e-15);
    }
}
