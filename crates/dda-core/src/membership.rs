//! Membership functions: degree of truth of a scalar against a 3-point
//! (triangle) or 4-point (trapezoid) shape.
//!
//! Equal adjacent points are shoulders, not zero-width slopes. Every shoulder
//! case is handled before any subtraction is used as a divisor, so the
//! evaluation never divides by zero.

use crate::constants::EPSILON;

#[inline]
fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

/// Degree of membership μ(x) ∈ [0, 1] of `x` in the shape given by `points`.
///
/// - 3 points `[a, b, c]`: triangle, or a left (a≈b) / right (b≈c) shoulder.
/// - 4 points `[a, b, c, d]`: trapezoid, or a left (a≈b) / right (c≈d) shoulder.
///
/// Any other point count yields 0. Point ordering is not checked here.
pub fn membership(x: f64, points: &[f64]) -> f64 {
    match *points {
        [a, b, c] => triangle(x, a, b, c),
        [a, b, c, d] => trapezoid(x, a, b, c, d),
        _ => 0.0,
    }
}

fn triangle(x: f64, a: f64, b: f64, c: f64) -> f64 {
    // Left shoulder: full plateau up to b
    if approx_eq(a, b) {
        if x <= b {
            return 1.0;
        }
        if x >= c {
            return 0.0;
        }
        return (c - x) / (c - b);
    }
    // Right shoulder: full plateau from b on
    if approx_eq(b, c) {
        if x >= b {
            return 1.0;
        }
        if x <= a {
            return 0.0;
        }
        return (x - a) / (b - a);
    }
    if x <= a || x >= c {
        return 0.0;
    }
    if approx_eq(x, b) {
        return 1.0;
    }
    if x < b {
        (x - a) / (b - a)
    } else {
        (c - x) / (c - b)
    }
}

fn trapezoid(x: f64, a: f64, b: f64, c: f64, d: f64) -> f64 {
    if approx_eq(a, b) {
        // Plateau runs through c, even when c and d coincide
        if x <= b.max(c) {
            return 1.0;
        }
        if x >= d {
            return 0.0;
        }
        return (d - x) / (d - c);
    }
    if approx_eq(c, d) {
        if x >= c {
            return 1.0;
        }
        if x <= a {
            return 0.0;
        }
        if x >= b {
            return 1.0;
        }
        return (x - a) / (b - a);
    }
    if x <= a || x >= d {
        return 0.0;
    }
    if x >= b && x <= c {
        return 1.0;
    }
    if x < b {
        (x - a) / (b - a)
    } else {
        (d - x) / (d - c)
    }
}
