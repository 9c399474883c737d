// self
use crate::{_prelude::*, client::RecoveryDecision, obs::FlowKind, store::StoreError};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// A span builder used by client flows.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Creates a new span tagged with the provided flow kind + stage.
	pub fn new(kind: FlowKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("console_session.flow", flow = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFlow<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

pub(crate) fn trace_recovery(decision: RecoveryDecision) {
	#[cfg(feature = "tracing")]
	{
		match decision {
			RecoveryDecision::Deliver | RecoveryDecision::Propagate =>
				tracing::trace!(decision = decision.as_str(), "response passed through"),
			RecoveryDecision::StartRefresh | RecoveryDecision::JoinRefresh =>
				tracing::debug!(decision = decision.as_str(), "authorization failure, recovering session"),
			RecoveryDecision::Reject =>
				tracing::warn!(decision = decision.as_str(), "replayed request rejected again"),
		}
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = decision;
	}
}

pub(crate) fn trace_mirror_failure(error: &StoreError) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(%error, "durable token mirror is behind the in-memory token");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = error;
	}
}
