pub mod payment;

pub use payment::{NewPaymentIntent, PaymentIntentRecord, PaymentStatus};
