//! Client-side checkout flow for the storefront.
//!
//! The gateway's browser SDK and the two payment endpoints sit behind trait
//! seams so the flow's state machine is testable without a browser: a
//! `ScriptLoader` for the SDK script, a `CheckoutModal` for the opaque
//! third-party checkout surface, and a `PaymentApi` for the server.

pub mod api;
pub mod flow;

pub use api::{ApiError, HttpPaymentApi, PaymentApi};
pub use flow::{
    CheckoutFlow, CheckoutModal, CheckoutOptions, CheckoutOutcome, CheckoutPrefill,
    CheckoutState, CheckoutTheme, FailureReason, ModalOutcome, PayRequest,
    PaymentCredentials, ScriptLoadError, ScriptLoader, ScriptSession,
};
