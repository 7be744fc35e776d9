pub mod attempt_writer;
pub mod expiry_reconciler;
pub mod purchase_writer;
pub mod sale_scheduler;
