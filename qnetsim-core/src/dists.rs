//! The sampler capability and the distribution library behind it.
//!
//! Stations consume randomness through a single operation: "return the next
//! non-negative real". Everything else (which distribution, which
//! parameters, which stream) is decided at configuration time via the
//! factories in this module.
//!
//! Two forms are supported, and every station slot accepts both:
//!
//! - a live sampler (any [`Sampler`] value), for in-process model building;
//! - a plain-data [`SamplerSpec`] descriptor, which serialises with `serde`
//!   and is materialised into a live sampler on first draw. This is what the
//!   parameter-study driver ships across worker boundaries.
//!
//! All distributions are parameterised the way a queueing model is usually
//! stated: exponential by its mean, log-normal and gamma by (mean, sd) with
//! the internal parameters derived from those.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::{SimTime, SimulationConfig};

/// Source of non-negative real samples.
///
/// Implementations are free to return negative values (a mis-parameterised
/// empirical table, say); the engine clips at zero when converting a draw to
/// a duration. NaN is fatal.
pub trait Sampler: Send {
    /// Return the next sample.
    fn draw(&mut self) -> f64;
}

impl<F> Sampler for F
where
    F: FnMut() -> f64 + Send,
{
    fn draw(&mut self) -> f64 {
        self()
    }
}

fn derive_seed(base: u64, salt: u64, param_bits: u64) -> u64 {
    base ^ salt ^ param_bits
}

// ============================================================================
// Distributions
// ============================================================================

/// Exponential distribution, parameterised by its mean.
pub struct Exponential {
    mean: f64,
    rng: StdRng,
    dist: rand_distr::Exp<f64>,
}

impl Exponential {
    /// Create an exponential sampler seeded from entropy.
    ///
    /// For reproducible runs prefer [`Exponential::from_config`] or
    /// [`Exponential::with_seed`].
    pub fn new(mean: f64) -> Self {
        Self::build(mean, SeedableRng::from_entropy())
    }

    /// Create an exponential sampler with an explicit stream seed.
    pub fn with_seed(mean: f64, seed: u64) -> Self {
        Self::build(mean, StdRng::seed_from_u64(seed))
    }

    /// Create an exponential sampler whose stream is derived from the
    /// run-level seed and the parameter.
    pub fn from_config(config: &SimulationConfig, mean: f64) -> Self {
        let seed = derive_seed(config.seed, 0xA5A5_5A5A_0101_0203, mean.to_bits());
        Self::with_seed(mean, seed)
    }

    fn build(mean: f64, rng: StdRng) -> Self {
        assert!(mean > 0.0, "Mean must be positive");
        let dist = rand_distr::Exp::new(1.0 / mean).expect("Rate must be positive");
        Self { mean, rng, dist }
    }

    /// Mean of the distribution.
    pub fn mean(&self) -> f64 {
        self.mean
    }
}

impl Sampler for Exponential {
    fn draw(&mut self) -> f64 {
        self.rng.sample(self.dist)
    }
}

/// Log-normal distribution, parameterised by mean and standard deviation.
///
/// The underlying (mu, sigma) are derived internally:
/// `mu = ln(mean^2 / sqrt(sd^2 + mean^2))`, `sigma = sqrt(ln(sd^2/mean^2 + 1))`.
pub struct LogNormal {
    mean: f64,
    sd: f64,
    rng: StdRng,
    dist: rand_distr::LogNormal<f64>,
}

impl LogNormal {
    pub fn new(mean: f64, sd: f64) -> Self {
        Self::build(mean, sd, SeedableRng::from_entropy())
    }

    pub fn with_seed(mean: f64, sd: f64, seed: u64) -> Self {
        Self::build(mean, sd, StdRng::seed_from_u64(seed))
    }

    pub fn from_config(config: &SimulationConfig, mean: f64, sd: f64) -> Self {
        let bits = mean.to_bits() ^ sd.to_bits().rotate_left(17);
        let seed = derive_seed(config.seed, 0xB4B4_4B4B_0202_0305, bits);
        Self::with_seed(mean, sd, seed)
    }

    fn build(mean: f64, sd: f64, rng: StdRng) -> Self {
        assert!(mean > 0.0, "Mean must be positive");
        assert!(sd >= 0.0, "Standard deviation must be non-negative");
        let mu = (mean * mean / (sd * sd + mean * mean).sqrt()).ln();
        let sigma = ((sd * sd / (mean * mean)) + 1.0).ln().sqrt();
        let dist = rand_distr::LogNormal::new(mu, sigma).expect("Sigma must be non-negative");
        Self {
            mean,
            sd,
            rng,
            dist,
        }
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn sd(&self) -> f64 {
        self.sd
    }
}

impl Sampler for LogNormal {
    fn draw(&mut self) -> f64 {
        self.rng.sample(self.dist)
    }
}

/// Gamma distribution, parameterised by mean and standard deviation.
///
/// Shape and scale are derived internally: `shape = mean^2 / sd^2`,
/// `scale = sd^2 / mean`.
pub struct Gamma {
    mean: f64,
    sd: f64,
    rng: StdRng,
    dist: rand_distr::Gamma<f64>,
}

impl Gamma {
    pub fn new(mean: f64, sd: f64) -> Self {
        Self::build(mean, sd, SeedableRng::from_entropy())
    }

    pub fn with_seed(mean: f64, sd: f64, seed: u64) -> Self {
        Self::build(mean, sd, StdRng::seed_from_u64(seed))
    }

    pub fn from_config(config: &SimulationConfig, mean: f64, sd: f64) -> Self {
        let bits = mean.to_bits() ^ sd.to_bits().rotate_left(23);
        let seed = derive_seed(config.seed, 0xC3C3_3C3C_0303_0407, bits);
        Self::with_seed(mean, sd, seed)
    }

    fn build(mean: f64, sd: f64, rng: StdRng) -> Self {
        assert!(mean > 0.0, "Mean must be positive");
        assert!(sd > 0.0, "Standard deviation must be positive");
        let shape = mean * mean / (sd * sd);
        let scale = sd * sd / mean;
        let dist = rand_distr::Gamma::new(shape, scale).expect("Shape and scale must be positive");
        Self {
            mean,
            sd,
            rng,
            dist,
        }
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn sd(&self) -> f64 {
        self.sd
    }
}

impl Sampler for Gamma {
    fn draw(&mut self) -> f64 {
        self.rng.sample(self.dist)
    }
}

/// Uniform distribution on `[low, high)`.
pub struct Uniform {
    low: f64,
    high: f64,
    rng: StdRng,
    dist: rand_distr::Uniform<f64>,
}

impl Uniform {
    pub fn new(low: f64, high: f64) -> Self {
        Self::build(low, high, SeedableRng::from_entropy())
    }

    pub fn with_seed(low: f64, high: f64, seed: u64) -> Self {
        Self::build(low, high, StdRng::seed_from_u64(seed))
    }

    pub fn from_config(config: &SimulationConfig, low: f64, high: f64) -> Self {
        let bits = low.to_bits() ^ high.to_bits().rotate_left(13);
        let seed = derive_seed(config.seed, 0xD2D2_2D2D_0404_0509, bits);
        Self::with_seed(low, high, seed)
    }

    fn build(low: f64, high: f64, rng: StdRng) -> Self {
        assert!(low < high, "Lower bound must be less than upper bound");
        let dist = rand_distr::Uniform::new(low, high);
        Self {
            low,
            high,
            rng,
            dist,
        }
    }

    pub fn mean(&self) -> f64 {
        (self.low + self.high) / 2.0
    }
}

impl Sampler for Uniform {
    fn draw(&mut self) -> f64 {
        self.rng.sample(self.dist)
    }
}

/// Triangular distribution on `[low, high]` with the density peak at `mode`.
pub struct Triangular {
    rng: StdRng,
    dist: rand_distr::Triangular<f64>,
}

impl Triangular {
    pub fn new(low: f64, mode: f64, high: f64) -> Self {
        Self::build(low, mode, high, SeedableRng::from_entropy())
    }

    pub fn with_seed(low: f64, mode: f64, high: f64, seed: u64) -> Self {
        Self::build(low, mode, high, StdRng::seed_from_u64(seed))
    }

    pub fn from_config(config: &SimulationConfig, low: f64, mode: f64, high: f64) -> Self {
        let bits = low.to_bits() ^ mode.to_bits().rotate_left(7) ^ high.to_bits().rotate_left(13);
        let seed = derive_seed(config.seed, 0xE1E1_1E1E_0505_060B, bits);
        Self::with_seed(low, mode, high, seed)
    }

    fn build(low: f64, mode: f64, high: f64, rng: StdRng) -> Self {
        assert!(
            low <= mode && mode <= high && low < high,
            "Triangular bounds must satisfy low <= mode <= high"
        );
        let dist = rand_distr::Triangular::new(low, high, mode).expect("Bounds must be ordered");
        Self { rng, dist }
    }
}

impl Sampler for Triangular {
    fn draw(&mut self) -> f64 {
        self.rng.sample(self.dist)
    }
}

/// Degenerate distribution returning a fixed value.
#[derive(Debug, Clone)]
pub struct Deterministic {
    value: f64,
}

impl Deterministic {
    pub fn new(value: f64) -> Self {
        Self { value }
    }
}

impl Sampler for Deterministic {
    fn draw(&mut self) -> f64 {
        self.value
    }
}

/// Empirical distribution over a `value -> rate` table.
///
/// Rates are normalised to probabilities internally; they only need to be
/// non-negative with a positive total.
pub struct Empirical {
    entries: Vec<(f64, f64)>,
    total: f64,
    rng: StdRng,
}

impl Empirical {
    pub fn new(entries: Vec<(f64, f64)>) -> Self {
        Self::build(entries, SeedableRng::from_entropy())
    }

    pub fn with_seed(entries: Vec<(f64, f64)>, seed: u64) -> Self {
        Self::build(entries, StdRng::seed_from_u64(seed))
    }

    pub fn from_config(config: &SimulationConfig, entries: Vec<(f64, f64)>) -> Self {
        let mut bits = 0_u64;
        for (i, (value, rate)) in entries.iter().enumerate() {
            bits ^= value.to_bits().rotate_left(i as u32) ^ rate.to_bits().rotate_left(i as u32 + 7);
        }
        let seed = derive_seed(config.seed, 0xF0F0_0F0F_0606_070D, bits);
        Self::with_seed(entries, seed)
    }

    fn build(entries: Vec<(f64, f64)>, rng: StdRng) -> Self {
        assert!(!entries.is_empty(), "Empirical table must not be empty");
        assert!(
            entries.iter().all(|(_, rate)| *rate >= 0.0),
            "Empirical rates must be non-negative"
        );
        let total: f64 = entries.iter().map(|(_, rate)| rate).sum();
        assert!(total > 0.0, "Empirical rates must have a positive total");
        Self {
            entries,
            total,
            rng,
        }
    }
}

impl Sampler for Empirical {
    fn draw(&mut self) -> f64 {
        let r: f64 = self.rng.gen::<f64>() * self.total;
        let mut cumulative = 0.0;
        for (value, rate) in &self.entries {
            cumulative += rate;
            if cumulative >= r {
                return *value;
            }
        }
        self.entries[self.entries.len() - 1].0
    }
}

// ============================================================================
// Plain-data descriptors and the station slot
// ============================================================================

/// Serialisable description of a sampler.
///
/// The "string form" of the sampler capability: a spec travels across
/// process or thread boundaries as plain data and is turned into a live
/// sampler (with a concrete stream seed) on first use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SamplerSpec {
    Exponential { mean: f64 },
    LogNormal { mean: f64, sd: f64 },
    Gamma { mean: f64, sd: f64 },
    Uniform { low: f64, high: f64 },
    Triangular { low: f64, mode: f64, high: f64 },
    Deterministic { value: f64 },
    Empirical { entries: Vec<(f64, f64)> },
}

impl SamplerSpec {
    /// Materialise the description into a live sampler.
    pub fn materialize(&self, seed: u64) -> Box<dyn Sampler> {
        match self {
            SamplerSpec::Exponential { mean } => Box::new(Exponential::with_seed(*mean, seed)),
            SamplerSpec::LogNormal { mean, sd } => Box::new(LogNormal::with_seed(*mean, *sd, seed)),
            SamplerSpec::Gamma { mean, sd } => Box::new(Gamma::with_seed(*mean, *sd, seed)),
            SamplerSpec::Uniform { low, high } => Box::new(Uniform::with_seed(*low, *high, seed)),
            SamplerSpec::Triangular { low, mode, high } => {
                Box::new(Triangular::with_seed(*low, *mode, *high, seed))
            }
            SamplerSpec::Deterministic { value } => Box::new(Deterministic::new(*value)),
            SamplerSpec::Empirical { entries } => {
                Box::new(Empirical::with_seed(entries.clone(), seed))
            }
        }
    }
}

/// A station's sampler slot: either a live sampler or a deferred spec that
/// is materialised on first draw.
pub enum SamplerSlot {
    Live(Box<dyn Sampler>),
    Deferred { spec: SamplerSpec, seed: u64 },
}

impl SamplerSlot {
    /// Wrap a plain-data spec; the sampler is built lazily with `seed`.
    pub fn from_spec(spec: SamplerSpec, seed: u64) -> Self {
        SamplerSlot::Deferred { spec, seed }
    }

    /// Draw the next raw sample, materialising a deferred spec first.
    pub fn draw(&mut self) -> f64 {
        if let SamplerSlot::Deferred { spec, seed } = self {
            let live = spec.materialize(*seed);
            *self = SamplerSlot::Live(live);
        }
        match self {
            SamplerSlot::Live(sampler) => sampler.draw(),
            SamplerSlot::Deferred { .. } => unreachable!("deferred spec materialised above"),
        }
    }

    /// Draw the next sample as a duration.
    ///
    /// Negative draws are clipped at zero; a NaN draw is fatal.
    pub fn next_time(&mut self) -> SimTime {
        SimTime::from_secs_f64(self.draw())
    }
}

impl<S: Sampler + 'static> From<S> for SamplerSlot {
    fn from(sampler: S) -> Self {
        SamplerSlot::Live(Box::new(sampler))
    }
}
