/*
Reaction kinetics for the dissolved carbonate pair. The full seawater
carbonate system couples five species; for the radial uptake model the
dominant coupling is the reversible hydration of CO2 into bicarbonate,
treated as a pseudo first order interconversion between the first two
species of the profile. Rate constants carry an Arrhenius temperature
dependence with the 15 kcal/mol activation energy of the hydration step.
*/

/// activation energy of the CO2 hydration rate coefficient [cal/mol]
pub const EACTK: f64 = 1.5e4;
/// gas constant in [cal/(mol K)]
pub const RGAS_CAL: f64 = 1.98720;
/// CO2 hydration rate constant at 25 C [1/s]
pub const KP1_25C: f64 = 0.037;

/// Pseudo first order interconversion between species 0 and species 1:
/// net conversion rate w = kf*c0 - kr*c1 [concentration/s], species 0 is
/// consumed and species 1 produced at that rate.
#[derive(Debug, Clone)]
pub struct CarbonateKinetics {
    pub kf: f64,
    pub kr: f64,
}

impl CarbonateKinetics {
    pub fn new(kf: f64, kr: f64) -> CarbonateKinetics {
        assert!(kf >= 0.0 && kr >= 0.0, "rate constants must be non-negative");
        CarbonateKinetics { kf, kr }
    }

    /// Seawater-like constants: forward rate from the 25 C hydration
    /// constant with Arrhenius temperature correction, reverse rate fixed
    /// by the equilibrium ratio keq = c1/c0 at equilibrium.
    pub fn seawater(temp_celsius: f64, keq: f64) -> CarbonateKinetics {
        assert!(keq > 0.0, "equilibrium ratio must be positive");
        let t = temp_celsius + 273.15;
        let t25 = 298.15;
        let arrhenius = (-EACTK / RGAS_CAL * (1.0 / t - 1.0 / t25)).exp();
        let kf = KP1_25C * arrhenius;
        CarbonateKinetics { kf, kr: kf / keq }
    }

    /// net conversion rate of species 0 into species 1
    pub fn rate(&self, c0: f64, c1: f64) -> f64 {
        self.kf * c0 - self.kr * c1
    }

    /// partial derivatives (d rate/d c0, d rate/d c1)
    pub fn rate_derivatives(&self) -> (f64, f64) {
        (self.kf, -self.kr)
    }
}
