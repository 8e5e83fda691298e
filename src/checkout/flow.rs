use async_trait::async_trait;
use bigdecimal::BigDecimal;
use std::sync::Arc;
use std::time::Duration;
use log::{debug, warn};

use crate::checkout::api::PaymentApi;
use crate::handlers::payment_handlers::{CreateOrderRequest, VerifyPaymentRequest};

/// Observable states of the checkout flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutState {
    Idle,
    ScriptLoading,
    ScriptLoaded,
    GatewayModalOpen,
    Verifying,
    Succeeded,
    Failed(FailureReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The gateway's browser SDK could not be loaded; the modal was never
    /// reached.
    ScriptLoadFailed,
    OrderCreationFailed(String),
    /// The server answered `verified: false`.
    VerificationFailed,
    /// No verification answer within the configured timeout.
    VerificationTimedOut,
    ApiUnreachable(String),
}

/// Terminal result of one payment attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    Succeeded {
        local_intent_id: String,
        gateway_payment_id: String,
    },
    Failed(FailureReason),
    /// The shopper closed the modal without paying. No charge was attempted
    /// and no verification call is made.
    Dismissed,
}

/// Session-scoped record of whether the SDK script is already on the page.
/// Owned by the caller and passed in per attempt, so "load at most once"
/// is explicit state rather than an ambient global.
#[derive(Debug, Default)]
pub struct ScriptSession {
    loaded: bool,
}

impl ScriptSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckoutPrefill {
    pub name: Option<String>,
    pub email: Option<String>,
    pub contact: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutTheme {
    pub color: String,
}

impl Default for CheckoutTheme {
    fn default() -> Self {
        Self { color: "#0f766e".to_string() }
    }
}

/// Options handed to the gateway's checkout surface, mirroring its
/// `{key, amount, currency, order_id, prefill, theme}` constructor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutOptions {
    pub key_id: String,
    pub amount_minor: i64,
    pub currency: String,
    pub gateway_order_id: String,
    pub prefill: CheckoutPrefill,
    pub theme: CheckoutTheme,
}

/// Credentials the gateway hands back when the shopper completes payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentCredentials {
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModalOutcome {
    Completed(PaymentCredentials),
    Dismissed,
}

/// Loads the gateway's browser SDK script.
#[async_trait]
pub trait ScriptLoader: Send + Sync {
    async fn load_checkout_script(&self) -> Result<(), ScriptLoadError>;
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("checkout script failed to load: {0}")]
pub struct ScriptLoadError(pub String);

/// The gateway's checkout modal. Opaque third-party code; it either hands
/// back payment credentials or reports a dismissal.
#[async_trait]
pub trait CheckoutModal: Send + Sync {
    async fn open(&self, options: CheckoutOptions) -> ModalOutcome;
}

/// One payment attempt from the storefront.
#[derive(Debug, Clone)]
pub struct PayRequest {
    pub amount: BigDecimal,
    pub currency: String,
    pub related_order_id: Option<String>,
    pub idempotency_key: Option<String>,
    pub prefill: CheckoutPrefill,
    pub theme: CheckoutTheme,
}

const DEFAULT_VERIFY_TIMEOUT: Duration = Duration::from_secs(30);

/// Drives `idle → scriptLoading → scriptLoaded → gatewayModalOpen →
/// {verifying → succeeded | failed} | dismissed`.
///
/// Dismissal resets to `idle`: no charge happened, so the attempt is not a
/// failure. Verification is bounded by a timeout so a lost answer cannot
/// leave the flow stuck in `verifying`.
pub struct CheckoutFlow {
    api: Arc<dyn PaymentApi>,
    loader: Arc<dyn ScriptLoader>,
    modal: Arc<dyn CheckoutModal>,
    key_id: String,
    verify_timeout: Duration,
    state: CheckoutState,
}

impl CheckoutFlow {
    pub fn new(
        api: Arc<dyn PaymentApi>,
        loader: Arc<dyn ScriptLoader>,
        modal: Arc<dyn CheckoutModal>,
        key_id: &str,
    ) -> Self {
        Self {
            api,
            loader,
            modal,
            key_id: key_id.to_string(),
            verify_timeout: DEFAULT_VERIFY_TIMEOUT,
            state: CheckoutState::Idle,
        }
    }

    pub fn with_verify_timeout(mut self, timeout: Duration) -> Self {
        self.verify_timeout = timeout;
        self
    }

    pub fn state(&self) -> &CheckoutState {
        &self.state
    }

    pub async fn pay(&mut self, session: &mut ScriptSession, request: PayRequest) -> CheckoutOutcome {
        if !session.loaded {
            self.state = CheckoutState::ScriptLoading;
            if let Err(e) = self.loader.load_checkout_script().await {
                warn!("Checkout script load failed: {}", e);
                return self.fail(FailureReason::ScriptLoadFailed);
            }
            session.loaded = true;
        }
        self.state = CheckoutState::ScriptLoaded;

        // The modal only opens once the server has a gateway order for this
        // attempt.
        let created = match self
            .api
            .create_order(&CreateOrderRequest {
                amount: request.amount.clone(),
                currency: request.currency.clone(),
                order_id: request.related_order_id.clone(),
                idempotency_key: request.idempotency_key.clone(),
            })
            .await
        {
            Ok(created) => created,
            Err(e) => {
                warn!("Order intent creation failed: {}", e);
                return self.fail(FailureReason::OrderCreationFailed(e.to_string()));
            }
        };

        debug!(
            "Opening checkout modal for gateway order {}",
            created.razorpay_order_id
        );
        self.state = CheckoutState::GatewayModalOpen;

        let credentials = match self
            .modal
            .open(CheckoutOptions {
                key_id: self.key_id.clone(),
                amount_minor: created.amount,
                currency: created.currency.clone(),
                gateway_order_id: created.razorpay_order_id.clone(),
                prefill: request.prefill.clone(),
                theme: request.theme.clone(),
            })
            .await
        {
            ModalOutcome::Completed(credentials) => credentials,
            ModalOutcome::Dismissed => {
                // No charge attempt occurred; the flow is reusable as-is.
                debug!("Checkout modal dismissed");
                self.state = CheckoutState::Idle;
                return CheckoutOutcome::Dismissed;
            }
        };

        self.state = CheckoutState::Verifying;

        let verify_request = VerifyPaymentRequest {
            order_id: created.order_id.clone(),
            razorpay_payment_id: credentials.gateway_payment_id.clone(),
            razorpay_order_id: credentials.gateway_order_id.clone(),
            razorpay_signature: credentials.signature.clone(),
        };

        let response = match tokio::time::timeout(
            self.verify_timeout,
            self.api.verify_payment(&verify_request),
        )
        .await
        {
            Err(_) => {
                warn!("Verification timed out for intent {}", created.order_id);
                return self.fail(FailureReason::VerificationTimedOut);
            }
            Ok(Err(e)) => {
                warn!("Verification call failed for intent {}: {}", created.order_id, e);
                return self.fail(FailureReason::ApiUnreachable(e.to_string()));
            }
            Ok(Ok(response)) => response,
        };

        // The verifier's flag is the only thing that decides the outcome.
        if response.verified {
            self.state = CheckoutState::Succeeded;
            CheckoutOutcome::Succeeded {
                local_intent_id: created.order_id,
                gateway_payment_id: credentials.gateway_payment_id,
            }
        } else {
            self.fail(FailureReason::VerificationFailed)
        }
    }

    fn fail(&mut self, reason: FailureReason) -> CheckoutOutcome {
        self.state = CheckoutState::Failed(reason.clone());
        CheckoutOutcome::Failed(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkout::api::ApiError;
    use crate::handlers::payment_handlers::{CreateOrderResponse, VerifyPaymentResponse};
    use std::str::FromStr;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct StubLoader {
        fail: bool,
        loads: AtomicU32,
    }

    impl StubLoader {
        fn new(fail: bool) -> Self {
            Self { fail, loads: AtomicU32::new(0) }
        }
    }

    #[async_trait]
    impl ScriptLoader for StubLoader {
        async fn load_checkout_script(&self) -> Result<(), ScriptLoadError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(ScriptLoadError("network error".to_string()))
            } else {
                Ok(())
            }
        }
    }

    enum ModalBehavior {
        Complete { payment_id: String, signature: String },
        Dismiss,
    }

    struct StubModal {
        behavior: ModalBehavior,
        opened_with: Mutex<Option<CheckoutOptions>>,
    }

    impl StubModal {
        fn new(behavior: ModalBehavior) -> Self {
            Self { behavior, opened_with: Mutex::new(None) }
        }

        fn opened(&self) -> Option<CheckoutOptions> {
            self.opened_with.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CheckoutModal for StubModal {
        async fn open(&self, options: CheckoutOptions) -> ModalOutcome {
            let order_id = options.gateway_order_id.clone();
            *self.opened_with.lock().unwrap() = Some(options);
            match &self.behavior {
                ModalBehavior::Complete { payment_id, signature } => {
                    ModalOutcome::Completed(PaymentCredentials {
                        gateway_order_id: order_id,
                        gateway_payment_id: payment_id.clone(),
                        signature: signature.clone(),
                    })
                }
                ModalBehavior::Dismiss => ModalOutcome::Dismissed,
            }
        }
    }

    struct StubApi {
        create_fails: bool,
        verify_result: Option<bool>,
        verify_hangs: bool,
        create_calls: AtomicU32,
        verify_calls: AtomicU32,
    }

    impl StubApi {
        fn new(verify_result: Option<bool>) -> Self {
            Self {
                create_fails: false,
                verify_result,
                verify_hangs: false,
                create_calls: AtomicU32::new(0),
                verify_calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl PaymentApi for StubApi {
        async fn create_order(&self, request: &CreateOrderRequest) -> Result<CreateOrderResponse, ApiError> {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            if self.create_fails {
                return Err(ApiError::Rejected { status: 502, message: "gateway down".to_string() });
            }
            Ok(CreateOrderResponse {
                razorpay_order_id: "order_1".to_string(),
                order_id: "6a0b7f9e-1f8e-4f4e-9a3e-2d6a1c0b5e77".to_string(),
                amount: 10000,
                currency: request.currency.clone(),
            })
        }

        async fn verify_payment(&self, _request: &VerifyPaymentRequest) -> Result<VerifyPaymentResponse, ApiError> {
            self.verify_calls.fetch_add(1, Ordering::SeqCst);
            if self.verify_hangs {
                // Longer than any test timeout.
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            let verified = self.verify_result.unwrap_or(false);
            Ok(VerifyPaymentResponse {
                verified,
                payment_id: verified.then(|| "pay_1".to_string()),
                message: String::new(),
            })
        }
    }

    fn pay_request() -> PayRequest {
        PayRequest {
            amount: BigDecimal::from_str("100.00").unwrap(),
            currency: "INR".to_string(),
            related_order_id: None,
            idempotency_key: None,
            prefill: CheckoutPrefill::default(),
            theme: CheckoutTheme::default(),
        }
    }

    #[tokio::test]
    async fn test_successful_payment_reaches_succeeded() {
        let api = Arc::new(StubApi::new(Some(true)));
        let loader = Arc::new(StubLoader::new(false));
        let modal = Arc::new(StubModal::new(ModalBehavior::Complete {
            payment_id: "pay_1".to_string(),
            signature: "sig".to_string(),
        }));
        let mut flow = CheckoutFlow::new(api.clone(), loader, modal.clone(), "rzp_test_key");
        let mut session = ScriptSession::new();

        let outcome = flow.pay(&mut session, pay_request()).await;

        assert_eq!(
            outcome,
            CheckoutOutcome::Succeeded {
                local_intent_id: "6a0b7f9e-1f8e-4f4e-9a3e-2d6a1c0b5e77".to_string(),
                gateway_payment_id: "pay_1".to_string(),
            }
        );
        assert_eq!(*flow.state(), CheckoutState::Succeeded);

        // The modal saw the gateway order and key, not the local intent id.
        let options = modal.opened().unwrap();
        assert_eq!(options.gateway_order_id, "order_1");
        assert_eq!(options.key_id, "rzp_test_key");
        assert_eq!(options.amount_minor, 10000);
    }

    #[tokio::test]
    async fn test_script_load_failure_never_reaches_modal() {
        let api = Arc::new(StubApi::new(Some(true)));
        let loader = Arc::new(StubLoader::new(true));
        let modal = Arc::new(StubModal::new(ModalBehavior::Dismiss));
        let mut flow = CheckoutFlow::new(api.clone(), loader, modal.clone(), "rzp_test_key");
        let mut session = ScriptSession::new();

        let outcome = flow.pay(&mut session, pay_request()).await;

        assert_eq!(outcome, CheckoutOutcome::Failed(FailureReason::ScriptLoadFailed));
        assert_eq!(*flow.state(), CheckoutState::Failed(FailureReason::ScriptLoadFailed));
        assert!(modal.opened().is_none());
        assert_eq!(api.create_calls.load(Ordering::SeqCst), 0);
        assert!(!session.is_loaded());
    }

    #[tokio::test]
    async fn test_script_loads_at_most_once_per_session() {
        let api = Arc::new(StubApi::new(Some(true)));
        let loader = Arc::new(StubLoader::new(false));
        let modal = Arc::new(StubModal::new(ModalBehavior::Complete {
            payment_id: "pay_1".to_string(),
            signature: "sig".to_string(),
        }));
        let mut flow = CheckoutFlow::new(api, loader.clone(), modal, "rzp_test_key");
        let mut session = ScriptSession::new();

        flow.pay(&mut session, pay_request()).await;
        flow.pay(&mut session, pay_request()).await;

        assert!(session.is_loaded());
        assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_order_creation_failure_keeps_modal_closed() {
        let mut api = StubApi::new(Some(true));
        api.create_fails = true;
        let api = Arc::new(api);
        let loader = Arc::new(StubLoader::new(false));
        let modal = Arc::new(StubModal::new(ModalBehavior::Dismiss));
        let mut flow = CheckoutFlow::new(api, loader, modal.clone(), "rzp_test_key");
        let mut session = ScriptSession::new();

        let outcome = flow.pay(&mut session, pay_request()).await;

        assert!(matches!(
            outcome,
            CheckoutOutcome::Failed(FailureReason::OrderCreationFailed(_))
        ));
        assert!(modal.opened().is_none());
    }

    #[tokio::test]
    async fn test_dismissal_resets_to_idle_without_verification() {
        let api = Arc::new(StubApi::new(Some(true)));
        let loader = Arc::new(StubLoader::new(false));
        let modal = Arc::new(StubModal::new(ModalBehavior::Dismiss));
        let mut flow = CheckoutFlow::new(api.clone(), loader, modal, "rzp_test_key");
        let mut session = ScriptSession::new();

        let outcome = flow.pay(&mut session, pay_request()).await;

        assert_eq!(outcome, CheckoutOutcome::Dismissed);
        assert_eq!(*flow.state(), CheckoutState::Idle);
        assert_eq!(api.verify_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unverified_response_fails_the_flow() {
        let api = Arc::new(StubApi::new(Some(false)));
        let loader = Arc::new(StubLoader::new(false));
        let modal = Arc::new(StubModal::new(ModalBehavior::Complete {
            payment_id: "pay_1".to_string(),
            signature: "tampered".to_string(),
        }));
        let mut flow = CheckoutFlow::new(api, loader, modal, "rzp_test_key");
        let mut session = ScriptSession::new();

        let outcome = flow.pay(&mut session, pay_request()).await;

        assert_eq!(outcome, CheckoutOutcome::Failed(FailureReason::VerificationFailed));
        assert_eq!(
            *flow.state(),
            CheckoutState::Failed(FailureReason::VerificationFailed)
        );
    }

    #[tokio::test]
    async fn test_verification_timeout_fails_instead_of_hanging() {
        let mut api = StubApi::new(Some(true));
        api.verify_hangs = true;
        let api = Arc::new(api);
        let loader = Arc::new(StubLoader::new(false));
        let modal = Arc::new(StubModal::new(ModalBehavior::Complete {
            payment_id: "pay_1".to_string(),
            signature: "sig".to_string(),
        }));
        let mut flow = CheckoutFlow::new(api, loader, modal, "rzp_test_key")
            .with_verify_timeout(Duration::from_millis(20));
        let mut session = ScriptSession::new();

        let outcome = flow.pay(&mut session, pay_request()).await;

        assert_eq!(
            outcome,
            CheckoutOutcome::Failed(FailureReason::VerificationTimedOut)
        );
    }
}
