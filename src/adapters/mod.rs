// Adapters layer: concrete implementations of the domain ports
// (storage, ledger stores, http, meanings).

pub mod catalogue;
pub mod http_credit_gate;
pub mod http_notifier;
pub mod ledger;
pub mod local_storage;
pub mod meanings;
pub mod memory_store;
pub mod storage_store;
