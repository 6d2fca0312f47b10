//! Two-strike outage protocol.
//!
//! ```text
//! Applied --converged--> Solved
//!    | diverged: close element
//!    v
//! Reconfirmed --(solve, health logged), reopen--> Reapplied
//!                                                    |--converged--> Solved (retried)
//!                                                    '--diverged---> Failed -> Unconverged
//! ```

use std::collections::BTreeSet;

use gridsens_core::{GridResult, LoadFlowParameters, Network, PowerFlowSolver};
use tracing::{debug, warn};

use super::{apply_outage, Case};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutageState {
    /// Element opened, first solve pending
    Applied,
    /// Element closed again to check the case without outage
    Reconfirmed,
    /// Element reopened for the single retry
    Reapplied,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseStatus {
    Solved { retried: bool },
    Unconverged,
}

pub struct OutageProtocol<'a> {
    power_flow: &'a dyn PowerFlowSolver,
    params: &'a LoadFlowParameters,
    equivalent_hvdcs: &'a BTreeSet<String>,
}

impl<'a> OutageProtocol<'a> {
    pub fn new(
        power_flow: &'a dyn PowerFlowSolver,
        params: &'a LoadFlowParameters,
        equivalent_hvdcs: &'a BTreeSet<String>,
    ) -> Self {
        Self {
            power_flow,
            params,
            equivalent_hvdcs,
        }
    }

    fn solve(&self, network: &mut Network) -> GridResult<bool> {
        Ok(self.power_flow.run(network, self.params)?.converged())
    }

    /// Open the element of `case` and solve, retrying once after a reconfirmation solve.
    ///
    /// On return the network holds the outage and, when solved, its flows.
    pub fn run(&self, network: &mut Network, case: &Case) -> GridResult<CaseStatus> {
        apply_outage(network, case, self.equivalent_hvdcs, false)?;
        let mut state = OutageState::Applied;
        loop {
            debug!(case = %case.id, ?state, "outage protocol");
            state = match state {
                OutageState::Applied => {
                    if self.solve(network)? {
                        return Ok(CaseStatus::Solved { retried: false });
                    }
                    warn!(case = %case.id, "load flow diverged, reconfirming without outage");
                    apply_outage(network, case, self.equivalent_hvdcs, true)?;
                    OutageState::Reconfirmed
                }
                OutageState::Reconfirmed => {
                    if !self.solve(network)? {
                        warn!(case = %case.id, "load flow diverges without the outage too");
                    }
                    apply_outage(network, case, self.equivalent_hvdcs, false)?;
                    OutageState::Reapplied
                }
                OutageState::Reapplied => {
                    if self.solve(network)? {
                        return Ok(CaseStatus::Solved { retried: true });
                    }
                    OutageState::Failed
                }
                OutageState::Failed => {
                    warn!(case = %case.id, "load flow diverged twice, case skipped");
                    return Ok(CaseStatus::Unconverged);
                }
            };
        }
    }
}
