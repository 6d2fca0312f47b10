//! Unit newtypes for the quantities the sensitivity pipeline converts between.
//!
//! The network tables store native units (MW, kV, Ω, A, degrees). Solvers work
//! on a per-unit system with a 100 MVA base; the conversions live here so the
//! scaling factors are written once.
//!
//! # Usage
//!
//! ```
//! use gridsens_core::units::{Degrees, Kilovolts, Megawatts, Ohms};
//!
//! let flow = Megawatts(100.0);
//! let current = flow.to_amperes(Kilovolts(400.0));
//! assert!((current.value() - 144.3376).abs() < 1e-3);
//!
//! let x = Ohms(16.0);
//! let x_pu = x.to_per_unit(Kilovolts(400.0), Kilovolts(400.0), 100.0);
//! assert!((x_pu - 0.01).abs() < 1e-12);
//!
//! assert!((Degrees(180.0).to_radians().value() - std::f64::consts::PI).abs() < 1e-12);
//! ```

use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Mul, Neg, Sub};

/// Default system power base used for per-unit conversions (MVA).
pub const BASE_MVA: f64 = 100.0;

macro_rules! impl_unit_ops {
    ($type:ty, $unit_name:literal) => {
        impl Add for $type {
            type Output = Self;
            fn add(self, rhs: Self) -> Self::Output {
                Self(self.0 + rhs.0)
            }
        }

        impl Sub for $type {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self::Output {
                Self(self.0 - rhs.0)
            }
        }

        impl Neg for $type {
            type Output = Self;
            fn neg(self) -> Self::Output {
                Self(-self.0)
            }
        }

        impl Mul<f64> for $type {
            type Output = Self;
            fn mul(self, rhs: f64) -> Self::Output {
                Self(self.0 * rhs)
            }
        }

        impl Div<f64> for $type {
            type Output = Self;
            fn div(self, rhs: f64) -> Self::Output {
                Self(self.0 / rhs)
            }
        }

        impl std::fmt::Display for $type {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{:.4} {}", self.0, $unit_name)
            }
        }

        impl $type {
            #[inline]
            pub const fn new(value: f64) -> Self {
                Self(value)
            }

            #[inline]
            pub const fn value(self) -> f64 {
                self.0
            }

            #[inline]
            pub fn abs(self) -> Self {
                Self(self.0.abs())
            }
        }

        impl std::iter::Sum for $type {
            fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
                Self(iter.map(|x| x.0).sum())
            }
        }
    };
}

/// Active power in megawatts (MW)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Megawatts(pub f64);

impl_unit_ops!(Megawatts, "MW");

/// Voltage in kilovolts (kV)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Kilovolts(pub f64);

impl_unit_ops!(Kilovolts, "kV");

/// Series impedance in ohms (Ω)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Ohms(pub f64);

impl_unit_ops!(Ohms, "Ω");

/// Current in amperes (A)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Amperes(pub f64);

impl_unit_ops!(Amperes, "A");

/// Angle in radians
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Radians(pub f64);

impl_unit_ops!(Radians, "rad");

/// Angle in degrees
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Degrees(pub f64);

impl_unit_ops!(Degrees, "°");

/// HVDC droop gain in MW per degree of terminal angle difference.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct MegawattsPerDegree(pub f64);

impl_unit_ops!(MegawattsPerDegree, "MW/°");

impl Radians {
    #[inline]
    pub fn to_degrees(self) -> Degrees {
        Degrees(self.0 * 180.0 / std::f64::consts::PI)
    }
}

impl Degrees {
    #[inline]
    pub fn to_radians(self) -> Radians {
        Radians(self.0 * std::f64::consts::PI / 180.0)
    }
}

impl Megawatts {
    /// Three-phase line current carried by this active power at `voltage`.
    ///
    /// `I = P · 1000 / (√3 · V)`; the sign of `P` is kept.
    #[inline]
    pub fn to_amperes(self, voltage: Kilovolts) -> Amperes {
        Amperes(self.0 * 1000.0 / (3.0_f64.sqrt() * voltage.0))
    }

    #[inline]
    pub fn to_per_unit(self, base_mva: f64) -> f64 {
        self.0 / base_mva
    }

    #[inline]
    pub fn from_per_unit(value: f64, base_mva: f64) -> Self {
        Megawatts(value * base_mva)
    }
}

impl Ohms {
    /// Per-unit value of a series impedance between two voltage levels.
    ///
    /// The impedance base of a branch joining `v1` and `v2` is `v1 · v2 / S_base`.
    #[inline]
    pub fn to_per_unit(self, v1: Kilovolts, v2: Kilovolts, base_mva: f64) -> f64 {
        self.0 * base_mva / (v1.0 * v2.0)
    }

    #[inline]
    pub fn from_per_unit(value: f64, v1: Kilovolts, v2: Kilovolts, base_mva: f64) -> Self {
        Ohms(value * v1.0 * v2.0 / base_mva)
    }
}

impl MegawattsPerDegree {
    /// Droop expressed as per-unit power per radian.
    #[inline]
    pub fn to_per_unit_per_radian(self, base_mva: f64) -> f64 {
        self.0 * 180.0 / std::f64::consts::PI / base_mva
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_megawatts_arithmetic() {
        let p1 = Megawatts(100.0);
        let p2 = Megawatts(50.0);

        assert_eq!((p1 + p2).value(), 150.0);
        assert_eq!((p1 - p2).value(), 50.0);
        assert_eq!((-p1).value(), -100.0);
        assert_eq!((p1 * 2.0).value(), 200.0);
        assert_eq!((p1 / 2.0).value(), 50.0);
    }

    #[test]
    fn test_angle_conversion() {
        let deg = Degrees(180.0);
        let rad = deg.to_radians();

        assert!((rad.value() - std::f64::consts::PI).abs() < 1e-10);
        assert!((rad.to_degrees().value() - 180.0).abs() < 1e-10);
    }

    #[test]
    fn test_current_keeps_sign() {
        let i = Megawatts(-100.0).to_amperes(Kilovolts(400.0));
        assert!(i.value() < 0.0);
        assert!((i.value() + 144.337567).abs() < 1e-5);
    }

    #[test]
    fn test_impedance_round_trip_between_levels() {
        let x = Ohms(25.0);
        let pu = x.to_per_unit(Kilovolts(225.0), Kilovolts(400.0), BASE_MVA);
        let back = Ohms::from_per_unit(pu, Kilovolts(225.0), Kilovolts(400.0), BASE_MVA);
        assert!((back.value() - 25.0).abs() < 1e-12);
    }

    #[test]
    fn test_droop_per_unit() {
        // 100 MW/deg is 57.2958 pu/rad on a 100 MVA base
        let k = MegawattsPerDegree(100.0).to_per_unit_per_radian(BASE_MVA);
        assert!((k - 180.0 / std::f64::consts::PI).abs() < 1e-12);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Megawatts(100.0)), "100.0000 MW");
        assert_eq!(format!("{}", Degrees(45.0)), "45.0000 °");
    }
}
