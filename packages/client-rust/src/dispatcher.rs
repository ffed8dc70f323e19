//! Top-level dispatch entry point.
//!
//! Parses the action string, resolves the capability and operation through
//! the registry, delegates execution to the retry/timeout executor, and
//! normalizes both success and failure into the uniform response envelope.
//! A dispatch call never fails at the call boundary; every failure mode is
//! encoded in the envelope.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, info_span, Instrument};
use uuid::Uuid;

use capstan_core::{codes, Action, CallOptions, Message, Response};

use crate::capability::CapabilityContext;
use crate::config::ClientConfig;
use crate::executor;
use crate::registry::CapabilityRegistry;

/// Routes `domain.operation` actions to registered capabilities.
///
/// The only way to obtain a `Dispatcher` is [`Dispatcher::initialize`], which
/// runs every registered capability's `init` first: dispatching against an
/// uninitialized registry is unrepresentable rather than a runtime check.
pub struct Dispatcher {
    registry: CapabilityRegistry,
    config: Arc<ClientConfig>,
}

impl Dispatcher {
    /// Initializes every registered capability in registration order and
    /// returns a ready dispatcher owning the (now read-only) registry.
    ///
    /// # Errors
    ///
    /// Returns the first capability `init()` failure. Initialization errors
    /// are caller lifecycle errors and deliberately do NOT use the response
    /// envelope.
    pub async fn initialize(
        registry: CapabilityRegistry,
        config: ClientConfig,
    ) -> anyhow::Result<Self> {
        let config = Arc::new(config);
        let ctx = CapabilityContext {
            config: config.clone(),
        };
        registry.init_all(&ctx).await?;
        Ok(Self { registry, config })
    }

    /// Dispatch an action with the given payload.
    ///
    /// `options` fields override the configured defaults; pass `None` to use
    /// them as-is. Every call resolves to an envelope, errors included.
    pub async fn dispatch(
        &self,
        action: &str,
        payload: Value,
        options: Option<CallOptions>,
    ) -> Response {
        let id = Uuid::new_v4().to_string();
        let options = options.unwrap_or(CallOptions {
            timeout_millis: self.config.dispatch.default_timeout_millis,
            max_retries: self.config.dispatch.default_max_retries,
        });

        // Malformed actions are rejected before any registry access.
        let action = match Action::parse(action) {
            Ok(action) => action,
            Err(err) => {
                debug!(error = %err, "rejecting malformed action");
                return Response::error(id, codes::INVALID_ACTION, err.to_string());
            }
        };

        let message = Message::new(id, action, payload, options);
        self.dispatch_message(message).await
    }

    async fn dispatch_message(&self, message: Message) -> Response {
        let span = info_span!(
            "dispatch",
            action = %message.action(),
            call_id = message.id(),
        );

        async move {
            let domain = message.action().domain();
            let operation = message.action().operation();

            let Some(capability) = self.registry.lookup(domain) else {
                return Response::error(
                    message.id(),
                    codes::CAPABILITY_NOT_FOUND,
                    format!("no capability registered for domain {domain:?}"),
                );
            };

            if !capability.operations().iter().any(|op| *op == operation) {
                return Response::error(
                    message.id(),
                    codes::OPERATION_NOT_FOUND,
                    format!("capability {domain:?} has no operation {operation:?}"),
                );
            }

            match executor::execute(
                capability,
                operation,
                message.payload().clone(),
                message.options(),
                self.config.dispatch.retry_base_delay_millis,
            )
            .await
            {
                Ok(executed) => {
                    let duration_millis =
                        u64::try_from(executed.elapsed.as_millis()).unwrap_or(u64::MAX);
                    info!(duration_ms = duration_millis, outcome = "ok", "dispatch complete");
                    Response::ok(message.id(), executed.value, duration_millis)
                }
                Err(err) => {
                    info!(code = err.code(), outcome = "error", "dispatch complete");
                    Response::error(message.id(), err.code().to_string(), err.to_string())
                }
            }
        }
        .instrument(span)
        .await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::capability::{Capability, CapabilityError};

    /// Echoes the payload back for `echo`; fails `flaky` with a coded error
    /// until the configured number of attempts has been burned.
    struct EchoCapability {
        invocations: AtomicU32,
        succeed_after: u32,
    }

    impl EchoCapability {
        fn new(succeed_after: u32) -> Self {
            Self {
                invocations: AtomicU32::new(0),
                succeed_after,
            }
        }
    }

    #[async_trait]
    impl Capability for EchoCapability {
        fn domain(&self) -> &'static str {
            "echo"
        }

        fn operations(&self) -> &'static [&'static str] {
            &["echo", "flaky"]
        }

        async fn init(&self, _ctx: &CapabilityContext) -> anyhow::Result<()> {
            Ok(())
        }

        async fn invoke(&self, operation: &str, payload: Value) -> Result<Value, CapabilityError> {
            match operation {
                "echo" => Ok(payload),
                "flaky" => {
                    let n = self.invocations.fetch_add(1, Ordering::SeqCst);
                    if n < self.succeed_after {
                        Err(CapabilityError::with_code("BACKEND_UNAVAILABLE", "try later"))
                    } else {
                        Ok(json!({"recovered": true}))
                    }
                }
                other => Err(CapabilityError::new(format!("unexpected op {other}"))),
            }
        }
    }

    async fn make_dispatcher(succeed_after: u32) -> Dispatcher {
        let registry = CapabilityRegistry::new();
        registry.register(EchoCapability::new(succeed_after)).unwrap();
        Dispatcher::initialize(registry, ClientConfig::default())
            .await
            .unwrap()
    }

    fn error_body(resp: &Response) -> &capstan_core::ErrorBody {
        match resp {
            Response::Error { error, .. } => error,
            Response::Ok { .. } => panic!("expected error envelope, got {resp:?}"),
        }
    }

    #[tokio::test]
    async fn success_returns_ok_envelope_with_data() {
        let dispatcher = make_dispatcher(0).await;
        let resp = dispatcher
            .dispatch("echo.echo", json!({"n": 1}), None)
            .await;
        match resp {
            Response::Ok { data, .. } => assert_eq!(data, json!({"n": 1})),
            Response::Error { .. } => panic!("expected ok envelope"),
        }
    }

    #[tokio::test]
    async fn malformed_action_is_invalid_action() {
        let dispatcher = make_dispatcher(0).await;
        for raw in ["echoecho", ".echo", "echo.", "."] {
            let resp = dispatcher.dispatch(raw, Value::Null, None).await;
            let error = error_body(&resp);
            assert_eq!(error.code, codes::INVALID_ACTION, "action {raw:?}");
            assert!(!error.retryable);
        }
    }

    #[tokio::test]
    async fn unknown_domain_is_capability_not_found() {
        let dispatcher = make_dispatcher(0).await;
        let resp = dispatcher.dispatch("nosuch.echo", Value::Null, None).await;
        let error = error_body(&resp);
        assert_eq!(error.code, codes::CAPABILITY_NOT_FOUND);
        assert!(!error.retryable);
    }

    #[tokio::test]
    async fn unknown_operation_is_operation_not_found() {
        let dispatcher = make_dispatcher(0).await;
        let resp = dispatcher.dispatch("echo.nosuch", Value::Null, None).await;
        let error = error_body(&resp);
        assert_eq!(error.code, codes::OPERATION_NOT_FOUND);
        assert!(!error.retryable);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_carry_last_error_code() {
        let dispatcher = make_dispatcher(99).await;
        let options = CallOptions {
            timeout_millis: 1_000,
            max_retries: 2,
        };
        let resp = dispatcher
            .dispatch("echo.flaky", Value::Null, Some(options))
            .await;
        let error = error_body(&resp);
        assert_eq!(error.code, "BACKEND_UNAVAILABLE");
        assert!(error.retryable);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_recover_and_return_ok() {
        let dispatcher = make_dispatcher(2).await;
        let options = CallOptions {
            timeout_millis: 1_000,
            max_retries: 3,
        };
        let resp = dispatcher
            .dispatch("echo.flaky", Value::Null, Some(options))
            .await;
        match resp {
            Response::Ok { data, .. } => assert_eq!(data, json!({"recovered": true})),
            Response::Error { .. } => panic!("expected recovery"),
        }
    }

    #[tokio::test]
    async fn envelopes_echo_a_fresh_id_per_call() {
        let dispatcher = make_dispatcher(0).await;
        let first = dispatcher.dispatch("echo.echo", Value::Null, None).await;
        let second = dispatcher.dispatch("echo.echo", Value::Null, None).await;
        assert_ne!(first.id(), second.id());
        assert!(!first.id().is_empty());
    }
}
