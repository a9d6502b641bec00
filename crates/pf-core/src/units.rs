// pf-core/src/units.rs

use uom::si::f64::{
    Acceleration as UomAcceleration, Length as UomLength, MassDensity as UomMassDensity,
    Pressure as UomPressure,
};

// Public canonical unit types (SI, f64)
pub type Accel = UomAcceleration;
pub type Density = UomMassDensity;
pub type Length = UomLength;
pub type Pressure = UomPressure;

#[inline]
pub fn pa(v: f64) -> Pressure {
    use uom::si::pressure::pascal;
    Pressure::new::<pascal>(v)
}

#[inline]
pub fn kpa(v: f64) -> Pressure {
    use uom::si::pressure::kilopascal;
    Pressure::new::<kilopascal>(v)
}

#[inline]
pub fn m(v: f64) -> Length {
    use uom::si::length::meter;
    Length::new::<meter>(v)
}

#[inline]
pub fn kg_per_m3(v: f64) -> Density {
    use uom::si::mass_density::kilogram_per_cubic_meter;
    Density::new::<kilogram_per_cubic_meter>(v)
}

#[inline]
pub fn as_kpa(p: Pressure) -> f64 {
    use uom::si::pressure::kilopascal;
    p.get::<kilopascal>()
}

/// Pressure of a liquid column `rho * g0 * h`.
pub fn static_head_pressure(height: Length, density: Density) -> Pressure {
    use uom::si::acceleration::meter_per_second_squared;
    use uom::si::length::meter;
    use uom::si::mass_density::kilogram_per_cubic_meter;

    let rho = density.get::<kilogram_per_cubic_meter>();
    let g = constants::g0().get::<meter_per_second_squared>();
    pa(rho * g * height.get::<meter>())
}

pub mod constants {
    use super::*;

    pub const G0_MPS2: f64 = 9.806_65;

    /// Chilled/condenser water near 40 C.
    pub const WATER_DENSITY_KG_M3: f64 = 993.326;

    #[inline]
    pub fn g0() -> Accel {
        use uom::si::acceleration::meter_per_second_squared;
        Accel::new::<meter_per_second_squared>(G0_MPS2)
    }

    #[inline]
    pub fn water_density() -> Density {
        kg_per_m3(WATER_DENSITY_KG_M3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_smoke() {
        let _p = pa(101_325.0);
        let _l = m(2.0);
        let _g0 = constants::g0();
        assert!((as_kpa(kpa(3.5)) - 3.5).abs() < 1e-12);
    }

    #[test]
    fn ten_meter_water_column() {
        let p = static_head_pressure(m(10.0), constants::water_density());
        // 993.326 * 9.80665 * 10 / 1000
        assert!((as_kpa(p) - 97.412).abs() < 1e-2);
    }
}
