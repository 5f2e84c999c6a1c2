// Running statistics across decisions of one session

use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchStats {
    pub decisions: u64,
    /// Decisions that found no agent with a candidate
    pub empty_decisions: u64,
    /// Rollouts attempted, including failed ones
    pub rollouts: u64,
    pub failed_rollouts: u64,
    pub simulated_ticks: u64,
    /// Challengers that replaced the incumbent
    pub improvements: u64,
    pub actions_issued: u64,
}

impl SearchStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn record_rollout(&mut self, elapsed_ticks: u32) {
        self.rollouts += 1;
        self.simulated_ticks += elapsed_ticks as u64;
    }

    pub fn record_failure(&mut self) {
        self.rollouts += 1;
        self.failed_rollouts += 1;
    }

    /// Mean rollouts per decision, None before the first decision
    pub fn runs_per_decision(&self) -> Option<f64> {
        (self.decisions > 0).then(|| self.rollouts as f64 / self.decisions as f64)
    }

    /// Mean rollouts per issued primitive action
    pub fn runs_per_action(&self) -> Option<f64> {
        (self.actions_issued > 0).then(|| self.rollouts as f64 / self.actions_issued as f64)
    }

    pub fn print_summary(&self) {
        println!("\n═══════════════════════════════════════════════════════════");
        println!("                    SEARCH STATISTICS");
        println!("═══════════════════════════════════════════════════════════");
        println!("Decisions:          {} ({} empty)", self.decisions, self.empty_decisions);
        println!("Rollouts:           {} ({} failed)", self.rollouts, self.failed_rollouts);
        println!("Simulated ticks:    {}", self.simulated_ticks);
        println!("Improvements:       {}", self.improvements);
        println!("Actions issued:     {}", self.actions_issued);
        if let (Some(per_decision), Some(per_action)) = (self.runs_per_decision(), self.runs_per_action()) {
            println!("Runs per decision:  {:.1}", per_decision);
            println!("Runs per action:    {:.1}", per_action);
        }
        println!("═══════════════════════════════════════════════════════════\n");
    }
}
