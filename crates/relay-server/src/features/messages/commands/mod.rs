//! Write operations over the MessageBox

pub mod retry_subscription;

pub use retry_subscription::RetrySubscriptionCommand;
