//! Unit newtypes for the quantities the aggregator handles.
//!
//! ding0 tables mix MW (generator nominal power) and kW (display values);
//! keeping them in distinct types stops a MW figure from being summed into a
//! kW total without the conversion.

use serde::Serialize;
use std::ops::Add;

/// Active power in MW (ding0 generator `p_nom`)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
#[repr(transparent)]
pub struct Megawatts(pub f64);

impl Megawatts {
    #[inline]
    pub fn to_kilowatts(self) -> Kilowatts {
        Kilowatts(self.0 * 1000.0)
    }
}

/// Active power in kW (display unit)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize)]
#[repr(transparent)]
pub struct Kilowatts(pub f64);

impl Kilowatts {
    #[inline]
    pub const fn value(self) -> f64 {
        self.0
    }
}

impl Add for Kilowatts {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

/// Nominal voltage in kV
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
#[repr(transparent)]
pub struct Kilovolts(pub f64);
