//! SI quantities for reported and aerodynamic values.

use uom::si::f64::{
    Area as UomArea, Force as UomForce, MassDensity as UomMassDensity, Pressure as UomPressure,
    Time as UomTime, Velocity as UomVelocity,
};

pub type Area = UomArea;
pub type Density = UomMassDensity;
pub type Force = UomForce;
pub type Pressure = UomPressure;
pub type Time = UomTime;
pub type Velocity = UomVelocity;

#[inline]
pub fn s(v: f64) -> Time {
    use uom::si::time::second;
    Time::new::<second>(v)
}

#[inline]
pub fn m2(v: f64) -> Area {
    use uom::si::area::square_meter;
    Area::new::<square_meter>(v)
}

#[inline]
pub fn mps(v: f64) -> Velocity {
    use uom::si::velocity::meter_per_second;
    Velocity::new::<meter_per_second>(v)
}

#[inline]
pub fn kgpm3(v: f64) -> Density {
    use uom::si::mass_density::kilogram_per_cubic_meter;
    Density::new::<kilogram_per_cubic_meter>(v)
}

/// Dynamic pressure `0.5 * rho * u^2`.
#[inline]
pub fn dynamic_pressure(rho: Density, u: Velocity) -> Pressure {
    0.5 * rho * u * u
}
