//! Per-request stress simulation.
//!
//! Stages run sequentially: randomized delay, CPU burn, I/O wait, payload
//! synthesis. Only cancellation and a panicked CPU worker can fail a run.

use std::hint::black_box;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::WorkloadConfig;
use crate::context::ExecutionContext;
use crate::error::{ServiceError, ServiceResult};

/// Iterations of the mixing loop per CPU work unit.
pub const CPU_ITERATIONS_PER_UNIT: u64 = 100_000;

/// Character the response payload is filled with.
pub const PAYLOAD_FILLER: char = '0';

/// Simulates the configured workload for one request.
#[derive(Debug)]
pub struct WorkloadSimulator {
    config: WorkloadConfig,
    rng: Mutex<StdRng>,
}

impl WorkloadSimulator {
    /// Create a simulator. Seeded from `config.seed` when present.
    pub fn new(config: WorkloadConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            config,
            rng: Mutex::new(rng),
        }
    }

    pub fn config(&self) -> &WorkloadConfig {
        &self.config
    }

    /// Run every stress stage and return the synthesized payload.
    pub async fn simulate(&self, ctx: &ExecutionContext) -> ServiceResult<String> {
        let delay = self.jittered_delay();
        tracing::debug!(
            delay_ms = delay.as_millis() as u64,
            cpu_load = self.config.cpu_load,
            io_load_ms = self.config.io_load_ms,
            "Simulating workload"
        );

        ctx.sleep(delay).await?;
        self.burn_cpu(ctx).await?;
        ctx.sleep(Duration::from_millis(self.config.io_load_ms)).await?;

        let payload = synthesize_payload(self.config.net_load);
        if !payload.is_empty() {
            tracing::debug!(size = payload.len(), "Generated payload");
        }
        Ok(payload)
    }

    /// `delay_time ± uniform(delay_jitter)`, clamped at zero.
    pub fn jittered_delay(&self) -> Duration {
        let base = self.config.delay_time_ms as i64;
        let jitter = self.config.delay_jitter() as i64;
        let offset = if jitter > 0 {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            rng.gen_range(-jitter..=jitter)
        } else {
            0
        };
        Duration::from_millis(base.saturating_add(offset).max(0) as u64)
    }

    async fn burn_cpu(&self, ctx: &ExecutionContext) -> ServiceResult<()> {
        let units = self.config.cpu_load;
        if units == 0 {
            return Ok(());
        }

        // Compute-bound work must not stall the async workers.
        let ctx = ctx.clone();
        tokio::task::spawn_blocking(move || burn_cpu_units(units, &ctx))
            .await
            .map_err(|e| ServiceError::Workload(e.to_string()))?
    }
}

/// Burn `units` CPU work units, checking for abort between units.
pub fn burn_cpu_units(units: u64, ctx: &ExecutionContext) -> ServiceResult<()> {
    let mut acc: u64 = 0x9E37_79B9_7F4A_7C15;
    for _ in 0..units {
        ctx.poll_abort()?;
        for i in 0..CPU_ITERATIONS_PER_UNIT {
            acc ^= i;
            acc = acc.wrapping_mul(0xBF58_476D_1CE4_E5B9);
            acc ^= acc >> 31;
        }
        black_box(acc);
    }
    Ok(())
}

/// Payload of `floor(net_load / 2)` filler characters.
pub fn synthesize_payload(net_load: u64) -> String {
    let len = (net_load / 2) as usize;
    std::iter::repeat(PAYLOAD_FILLER).take(len).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CancellationGranularity;

    fn config(net_load: u64) -> WorkloadConfig {
        WorkloadConfig {
            net_load,
            seed: Some(7),
            ..Default::default()
        }
    }

    #[test]
    fn test_payload_length_is_half_net_load() {
        for n in [0u64, 1, 2, 3, 10, 11, 1024, 4097] {
            let payload = synthesize_payload(n);
            assert_eq!(payload.len() as u64, n / 2, "net_load = {}", n);
            assert!(payload.chars().all(|c| c == PAYLOAD_FILLER));
        }
        assert!(synthesize_payload(0).is_empty());
    }

    #[tokio::test]
    async fn test_simulate_scenario() {
        let simulator = WorkloadSimulator::new(config(10));
        let ctx = ExecutionContext::new();

        let payload = tokio::time::timeout(Duration::from_secs(1), simulator.simulate(&ctx))
            .await
            .expect("simulation should be quick")
            .unwrap();
        assert_eq!(payload, "00000");
    }

    #[tokio::test]
    async fn test_same_seed_same_outcome() {
        let cfg = WorkloadConfig {
            delay_time_ms: 5,
            delay_jitter_ms: Some(3),
            net_load: 64,
            seed: Some(42),
            ..Default::default()
        };
        let a = WorkloadSimulator::new(cfg.clone());
        let b = WorkloadSimulator::new(cfg);

        let delays_a: Vec<_> = (0..8).map(|_| a.jittered_delay()).collect();
        let delays_b: Vec<_> = (0..8).map(|_| b.jittered_delay()).collect();
        assert_eq!(delays_a, delays_b);

        let ctx = ExecutionContext::new();
        let pa = a.simulate(&ctx).await.unwrap();
        let pb = b.simulate(&ctx).await.unwrap();
        assert_eq!(pa.len(), pb.len());
        assert_eq!(pa.len(), 32);
    }

    #[test]
    fn test_jitter_stays_in_bounds_and_clamps() {
        let simulator = WorkloadSimulator::new(WorkloadConfig {
            delay_time_ms: 2,
            delay_jitter_ms: Some(10),
            seed: Some(1),
            ..Default::default()
        });
        for _ in 0..200 {
            let delay = simulator.jittered_delay();
            assert!(delay <= Duration::from_millis(12));
        }

        let simulator = WorkloadSimulator::new(WorkloadConfig {
            delay_time_ms: 100,
            delay_jitter_ms: Some(0),
            ..Default::default()
        });
        assert_eq!(simulator.jittered_delay(), Duration::from_millis(100));
    }

    #[test]
    fn test_cpu_burn_observes_cancellation_mid_flight() {
        let ctx = ExecutionContext::new().with_granularity(CancellationGranularity::MidFlight);
        ctx.cancel();
        assert_eq!(burn_cpu_units(1_000_000, &ctx), Err(ServiceError::Cancelled));

        let ctx = ExecutionContext::new().with_granularity(CancellationGranularity::Steps);
        ctx.cancel();
        assert_eq!(burn_cpu_units(2, &ctx), Ok(()));
    }

    #[tokio::test]
    async fn test_cpu_load_runs_on_blocking_pool() {
        let simulator = WorkloadSimulator::new(WorkloadConfig {
            cpu_load: 3,
            net_load: 4,
            ..Default::default()
        });
        let payload = simulator.simulate(&ExecutionContext::new()).await.unwrap();
        assert_eq!(payload, "00");
    }
}
