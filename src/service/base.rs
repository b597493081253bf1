//! The base service: simulated workload, then downstream fan-out.

use async_trait::async_trait;

use crate::context::ExecutionContext;
use crate::downstream::FanOut;
use crate::error::ServiceResult;
use crate::service::Service;
use crate::workload::WorkloadSimulator;

/// Runs the workload, then calls every downstream in order.
///
/// The payload is only returned when every downstream call succeeded.
#[derive(Debug)]
pub struct BaseService {
    simulator: WorkloadSimulator,
    fan_out: FanOut,
}

impl BaseService {
    pub fn new(simulator: WorkloadSimulator, fan_out: FanOut) -> Self {
        Self { simulator, fan_out }
    }
}

#[async_trait]
impl Service for BaseService {
    async fn execute(&self, ctx: &ExecutionContext) -> ServiceResult<String> {
        ctx.checkpoint()?;
        let payload = self.simulator.simulate(ctx).await?;
        ctx.checkpoint()?;

        self.fan_out.call_all(ctx).await?;
        Ok(payload)
    }

    fn layers(&self) -> Vec<&'static str> {
        vec!["workload"]
    }
}
