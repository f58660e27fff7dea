//! Port adapter implementations backed by PostgreSQL

pub mod ledger;

pub use ledger::PostgresLedgerStore;
