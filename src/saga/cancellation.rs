use tokio_util::sync::CancellationToken;

/// Raised at a `SafePoint` when the run's cancellation flag is set (spec
/// §5, §7 `CancellationError`).
#[derive(Debug, Clone, thiserror::Error)]
#[error("generation cancelled at safe point '{label}'")]
pub struct CancellationError {
    pub label: String,
}

/// A scoped region that checks the token on entry and exit (spec §5). Stage
/// boundaries, Stage 2's per-cluster dispatch, Stage 2b's inter-generation
/// boundary, and Stage 3's inter-episode boundary are all `SafePoint`s.
pub struct SafePoint<'a> {
    token: &'a CancellationToken,
    label: &'static str,
}

impl<'a> SafePoint<'a> {
    pub fn new(token: &'a CancellationToken, label: &'static str) -> Self {
        SafePoint { token, label }
    }

    pub fn check(&self) -> Result<(), CancellationError> {
        if self.token.is_cancelled() {
            Err(CancellationError { label: self.label.to_string() })
        } else {
            Ok(())
        }
    }

    /// A closure form suited to the `cancel_check: impl FnMut() -> bool`
    /// callbacks the stage components take.
    pub fn as_poll(&self) -> impl FnMut() -> bool + '_ {
        move || self.token.is_cancelled()
    }
}

/// A scoped region that **defers** cancellation until exit (spec §5).
/// Persistence is the only `AtomicSection` in the pipeline: a cancellation
/// request arriving mid-write does not interrupt the transaction, and is
/// only observed by the saga once the section's future resolves.
pub struct AtomicSection<'a> {
    token: &'a CancellationToken,
    label: &'static str,
}

impl<'a> AtomicSection<'a> {
    pub fn new(token: &'a CancellationToken, label: &'static str) -> Self {
        AtomicSection { token, label }
    }

    /// Runs `body` to completion regardless of cancellation, then reports
    /// whether a cancellation was observed (for the saga to act on only
    /// after the section's side effects are durable).
    pub async fn run<F, Fut, T>(&self, body: F) -> (T, bool)
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = T>,
    {
        let result = body().await;
        let cancelled = self.token.is_cancelled();
        if cancelled {
            log::info!("cancellation observed after atomic section '{}'; deferred to this point", self.label);
        }
        (result, cancelled)
    }
}
