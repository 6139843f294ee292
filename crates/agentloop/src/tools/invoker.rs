use serde_json::Value;
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::binding::ToolBinding;
use super::result::{ToolError, ToolResult};

/// Aborts the wrapped task when dropped, so an abandoned call does not keep running
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Runs tool calls with argument validation, a per-call timeout and cancellation.
///
/// Whatever happens inside the binding, `invoke` returns a [`ToolResult`]; failures are
/// folded into the result instead of being raised.
#[derive(Clone)]
pub struct ToolInvoker {
    timeout: Duration,
    cancel: CancellationToken,
}

impl ToolInvoker {
    pub fn new(timeout: Duration) -> Self {
        Self::with_cancellation(timeout, CancellationToken::new())
    }

    pub fn with_cancellation(timeout: Duration, cancel: CancellationToken) -> Self {
        Self { timeout, cancel }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn invoke(&self, binding: Arc<dyn ToolBinding>, args: Value) -> ToolResult {
        let name = binding.name().to_string();

        if let Err(error) = binding.parameter_schema().validate(&args) {
            warn!(tool = %name, %error, "rejecting tool call before dispatch");
            return ToolResult::failure(error);
        }

        let mut task = AbortOnDrop(tokio::spawn(async move { binding.invoke(args).await }));

        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                warn!(tool = %name, "tool call cancelled");
                ToolResult::failure(ToolError::Cancelled)
            }
            outcome = tokio::time::timeout(self.timeout, &mut task.0) => match outcome {
                Err(_) => {
                    warn!(tool = %name, timeout = ?self.timeout, "tool call timed out");
                    ToolResult::failure(ToolError::Timeout(self.timeout))
                }
                Ok(Ok(Ok(content))) => ToolResult::ok(content),
                Ok(Ok(Err(e))) => {
                    warn!(tool = %name, error = %e, "tool call failed");
                    ToolResult::failure(ToolError::ToolFailure(format!("{:#}", e)))
                }
                Ok(Err(join_error)) => {
                    let detail = if join_error.is_panic() {
                        format!("tool panicked: {}", panic_message(join_error.into_panic()))
                    } else {
                        join_error.to_string()
                    };
                    warn!(tool = %name, %detail, "tool task did not complete");
                    ToolResult::failure(ToolError::ToolFailure(detail))
                }
            }
        };

        debug!(tool = %name, ok = result.ok, "tool call finished");
        result
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
