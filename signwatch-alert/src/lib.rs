//! Alert lifecycle for signwatch.
//!
//! Workers push [`Alert`]s into one queue. The [`AlertRouter`] drains it,
//! drops repeats that fall inside a suppression window, and hands the rest
//! to the [`Dispatcher`], which delivers to every configured [`Notifier`]
//! concurrently with bounded retries.

pub mod alert;
pub mod dispatch;
pub mod error;
pub mod notifier;
pub mod router;

pub use alert::{chain_subject, validator_subject, Alert, AlertKind, SubjectKey};
pub use dispatch::{DeliveryOutcome, Dispatcher, RetryPolicy};
pub use error::NotifierError;
pub use notifier::{DiscordNotifier, Notifier, TelegramNotifier};
pub use router::{AlertRouter, Verdict};
