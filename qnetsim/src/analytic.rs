//! Erlang-C calculator for M/M/c systems.
//!
//! A pure numeric routine, independent of the engine. The scenario tests
//! use it as the oracle the simulated means are compared against.

/// `a^k / k!`, computed iteratively to avoid overflow for moderate `k`.
fn power_factorial(a: f64, k: u32) -> f64 {
    (1..=k).fold(1.0, |acc, i| acc * a / f64::from(i))
}

/// Erlang C formula for an M/M/c system.
///
/// `lambda` is the arrival rate, `mu` the service rate per server, `c` the
/// number of servers. The queueing quantities are only defined for a stable
/// system (`a = lambda/mu < c`); they are reported as 0 otherwise, matching
/// the usual convention of the formula.
#[derive(Debug, Clone, Copy)]
pub struct ErlangC {
    lambda: f64,
    mu: f64,
    a: f64,
    c: u32,
    p1: f64,
}

impl ErlangC {
    pub fn new(lambda: f64, mu: f64, c: u32) -> Self {
        let lambda = lambda.max(0.0);
        let mu = mu.max(0.0);
        let a = if mu > 0.0 { lambda / mu } else { 0.0 };
        let c = c.max(1);

        let mut denominator: f64 = (0..c).map(|k| power_factorial(a, k)).sum();
        let tail = power_factorial(a, c) * f64::from(c) / (f64::from(c) - a);
        denominator += tail;
        let p0 = if denominator > 0.0 {
            1.0 / denominator
        } else {
            0.0
        };
        let p1 = tail * p0;

        Self {
            lambda,
            mu,
            a,
            c,
            p1,
        }
    }

    /// Offered load `a = lambda/mu`.
    pub fn a(&self) -> f64 {
        self.a
    }

    /// Utilization `rho = a/c`.
    pub fn rho(&self) -> f64 {
        self.a / f64::from(self.c)
    }

    /// Probability that an arriving client has to wait, `P(W > 0)`.
    pub fn p_wait(&self) -> f64 {
        self.p1
    }

    /// Mean queue length `E[N_Q]`.
    pub fn enq(&self) -> f64 {
        if self.a >= f64::from(self.c) {
            return 0.0;
        }
        self.p1 * self.a / (f64::from(self.c) - self.a)
    }

    /// Mean number of clients in the system `E[N]`.
    pub fn en(&self) -> f64 {
        if self.a >= f64::from(self.c) {
            return 0.0;
        }
        self.enq() + self.a
    }

    /// Mean waiting time `E[W]`.
    pub fn ew(&self) -> f64 {
        if self.a >= f64::from(self.c) {
            return 0.0;
        }
        self.p1 / (f64::from(self.c) * self.mu - self.lambda)
    }

    /// Mean residence time `E[V] = E[W] + E[S]`.
    pub fn ev(&self) -> f64 {
        if self.a >= f64::from(self.c) {
            return 0.0;
        }
        self.ew() + 1.0 / self.mu
    }
}
