pub mod state;

pub use state::{Ledger, LedgerError};
