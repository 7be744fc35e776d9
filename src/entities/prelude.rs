pub use super::checkout_attempts::Entity as CheckoutAttempts;
pub use super::purchases::Entity as Purchases;
pub use super::sales::Entity as Sales;
