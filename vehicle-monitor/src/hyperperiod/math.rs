/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Period arithmetic for [`MajorFrame`](super::MajorFrame).

use super::HyperperiodError;

/// Greatest common divisor; `gcd(0, x) == x`.
pub fn gcd(a: u64, b: u64) -> u64 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

/// Least common multiple, `Ok(0)` if either side is `0`.
pub fn lcm(a: u64, b: u64) -> Result<u64, HyperperiodError> {
    match gcd(a, b) {
        0 => Ok(0),
        g => (a / g).checked_mul(b).ok_or(HyperperiodError::Overflow { a, b }),
    }
}

/// LCM of all periods, `Ok(0)` when there are none.
pub fn lcm_of_slice(periods: &[u64]) -> Result<u64, HyperperiodError> {
    match periods.split_first() {
        None => Ok(0),
        Some((&first, rest)) => rest.iter().try_fold(first, |acc, &p| lcm(acc, p)),
    }
}

/// GCD of all periods, `0` when there are none.
pub fn gcd_of_slice(periods: &[u64]) -> u64 {
    periods.iter().fold(0, |acc, &p| gcd(acc, p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gcd_of_vehicle_periods() {
        assert_eq!(gcd(15, 20), 5);
        assert_eq!(gcd(100, 1_000), 100);
        assert_eq!(gcd(17, 13), 1);
        assert_eq!(gcd(0, 15), 15);
        assert_eq!(gcd(15, 0), 15);
        assert_eq!(gcd(0, 0), 0);
    }

    #[test]
    fn lcm_of_pairs() {
        assert_eq!(lcm(15, 20).unwrap(), 60);
        assert_eq!(lcm(100, 1_000).unwrap(), 1_000);
        assert_eq!(lcm(0, 20).unwrap(), 0);
    }

    #[test]
    fn lcm_that_does_not_fit_is_an_error() {
        let a = u64::MAX / 2 + 1;
        let b = u64::MAX / 2 + 3;
        assert!(matches!(lcm(a, b), Err(HyperperiodError::Overflow { .. })));
    }

    #[test]
    fn vehicle_periods_repeat_every_three_seconds() {
        let periods = [15, 20, 100, 100, 1_000, 100, 100, 1_000];
        assert_eq!(lcm_of_slice(&periods).unwrap(), 3_000);
        assert_eq!(gcd_of_slice(&periods), 5);
    }

    #[test]
    fn no_periods() {
        assert_eq!(lcm_of_slice(&[]).unwrap(), 0);
        assert_eq!(gcd_of_slice(&[]), 0);
    }
}
