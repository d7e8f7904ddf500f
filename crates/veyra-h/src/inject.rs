use chromiumoxide::Page;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use veyra_common::BackendError;

const PROBE_JS: &str = include_str!("probe.js");

/// Bound on a single evaluation. A blocking dialog would otherwise hang it.
const EVAL_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum retries for context errors while the page is navigating.
const MAX_CONTEXT_RETRIES: u32 = 10;

const CONTEXT_RETRY_DELAY: Duration = Duration::from_millis(100);

fn is_context_error(err: &str) -> bool {
    err.contains("Cannot find context")
        || err.contains("Execution context was destroyed")
        || err.contains("-32000")
}

/// One probe response. `doc` identifies the document instance the probe ran in.
#[derive(Debug, Deserialize)]
pub struct ProbeReply {
    pub doc: String,
    pub ok: bool,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub error: Option<String>,
}

enum EvalError {
    Timeout,
    Context(String),
    Other(String),
}

async fn evaluate_with_timeout(page: &Page, expression: &str) -> Result<Value, EvalError> {
    match tokio::time::timeout(EVAL_TIMEOUT, page.evaluate(expression)).await {
        Err(_) => Err(EvalError::Timeout),
        Ok(Err(e)) => {
            let err_str = e.to_string();
            if is_context_error(&err_str) {
                Err(EvalError::Context(err_str))
            } else {
                Err(EvalError::Other(err_str))
            }
        }
        Ok(Ok(remote_object)) => remote_object
            .into_value::<Value>()
            .map_err(|e| EvalError::Other(format!("Failed to get result: {}", e))),
    }
}

/// Run one probe operation, installing the probe first if this document has
/// not seen it yet. Context errors from an in-flight navigation are retried.
pub async fn call(page: &Page, request: Value) -> Result<ProbeReply, BackendError> {
    let request_json = serde_json::to_string(&request)?;
    let expression = format!("{}\nwindow.__veyra.call({})", PROBE_JS, request_json);

    let mut last_error = None;
    for attempt in 0..MAX_CONTEXT_RETRIES {
        match evaluate_with_timeout(page, &expression).await {
            Ok(value) => return Ok(serde_json::from_value(value)?),
            Err(EvalError::Timeout) => {
                return Err(BackendError::TimeoutWithContext {
                    operation: "probe evaluation (blocked by a dialog?)".into(),
                });
            }
            Err(EvalError::Context(err_str)) => {
                tracing::debug!(
                    "Context error during probe call (attempt {}/{}), retrying...",
                    attempt + 1,
                    MAX_CONTEXT_RETRIES
                );
                last_error = Some(err_str);
                tokio::time::sleep(CONTEXT_RETRY_DELAY).await;
            }
            Err(EvalError::Other(err_str)) => return Err(BackendError::ScriptError(err_str)),
        }
    }

    Err(BackendError::ScriptError(last_error.unwrap_or_else(|| {
        "Probe call failed after retries".to_string()
    })))
}

/// Map a probe-side failure onto a backend error.
pub fn probe_error(message: &str) -> BackendError {
    if let Some(id) = message
        .strip_prefix("stale:")
        .or_else(|| message.strip_prefix("detached:"))
    {
        return BackendError::Detached {
            handle: id.to_string(),
        };
    }
    if message.contains("is not a valid selector") {
        return BackendError::SelectorInvalid {
            selector: message.to_string(),
        };
    }
    BackendError::ScriptError(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_errors_are_recognised() {
        assert!(is_context_error("Execution context was destroyed."));
        assert!(is_context_error("{\"code\":-32000}"));
        assert!(!is_context_error("TypeError: x is undefined"));
    }

    #[test]
    fn probe_errors_map_to_backend_errors() {
        assert!(matches!(
            probe_error("detached:abc:3"),
            BackendError::Detached { handle } if handle == "abc:3"
        ));
        assert!(matches!(
            probe_error("Failed to execute 'querySelectorAll': 'div[' is not a valid selector."),
            BackendError::SelectorInvalid { .. }
        ));
        assert!(matches!(
            probe_error("boom"),
            BackendError::ScriptError(_)
        ));
    }

    #[test]
    fn reply_parses_with_and_without_error() {
        let ok: ProbeReply =
            serde_json::from_value(serde_json::json!({ "doc": "d1", "ok": true, "value": "d1:4" }))
                .unwrap();
        assert!(ok.ok);
        assert_eq!(ok.value, "d1:4");

        let err: ProbeReply = serde_json::from_value(
            serde_json::json!({ "doc": "d1", "ok": false, "error": "stale:d0:1" }),
        )
        .unwrap();
        assert_eq!(err.error.as_deref(), Some("stale:d0:1"));
    }
}
