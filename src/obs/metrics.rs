// self
use crate::{
	client::RecoveryDecision,
	obs::{FlowKind, FlowOutcome},
	store::StoreError,
};

/// Records a flow outcome via the global metrics recorder (when enabled).
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"console_session_flow_total",
			"flow" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Records the recovery decision taken for a response.
pub fn record_recovery(decision: RecoveryDecision) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("console_session_recovery_total", "decision" => decision.as_str())
			.increment(1);
	}

	super::tracing::trace_recovery(decision);
}

/// Records a durable mirror write that failed while memory moved on.
pub fn record_mirror_failure(error: &StoreError) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("console_session_mirror_failure_total").increment(1);
	}

	super::tracing::trace_mirror_failure(error);
}
