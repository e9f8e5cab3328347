pub mod checkout;
pub mod ledger;
pub mod notifier;
pub mod orders;
pub mod pricing;
pub mod storage;
