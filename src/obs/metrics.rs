// self
use crate::{
	config::ProviderKind,
	obs::{FlowOutcome, FlowStage},
};

/// Records a flow outcome via the global metrics recorder (when enabled).
pub fn record_flow_outcome(provider: ProviderKind, stage: FlowStage, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"oauth2_third_flow_total",
			"provider" => provider.as_str(),
			"stage" => stage.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (provider, stage, outcome);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn record_flow_outcome_noop_without_metrics() {
		record_flow_outcome(ProviderKind::Qq, FlowStage::ExchangeCode, FlowOutcome::Failure);
	}
}
