//! Scan sessions.
//!
//! A session owns the ledger that commits accumulate into, independent of how
//! many times the controller is started and stopped.

use anyhow::Result;
use rand::RngCore;

use crate::ledger::SessionLedger;
use crate::receipt::Receipt;

/// One scanning session: an identifier and the ledger of committed items.
///
/// The ledger outlives individual capture runs; stopping and restarting the
/// controller keeps every entry. Only `reset` (via the controller's
/// `new_session`) clears it.
#[derive(Debug)]
pub struct ScanSession {
    id: String,
    ledger: SessionLedger,
}

impl Default for ScanSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanSession {
    pub fn new() -> Self {
        Self {
            id: new_session_id(),
            ledger: SessionLedger::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn ledger(&self) -> &SessionLedger {
        &self.ledger
    }

    pub(crate) fn ledger_mut(&mut self) -> &mut SessionLedger {
        &mut self.ledger
    }

    /// Snapshot of the ledger for presentation.
    pub fn receipt(&self) -> Result<Receipt> {
        Receipt::from_ledger(&self.id, &self.ledger)
    }

    /// Empty the ledger and start over under a fresh id.
    pub(crate) fn reset(&mut self) {
        self.ledger.reset();
        self.id = new_session_id();
    }
}

fn new_session_id() -> String {
    let mut bytes = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("session:{}", hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_rotates_id_and_clears_ledger() {
        let mut session = ScanSession::new();
        let first = session.id().to_string();
        assert!(first.starts_with("session:"));
        assert_eq!(first.len(), "session:".len() + 16);

        session.reset();
        assert_ne!(session.id(), first);
        assert!(session.ledger().is_empty());
    }

    #[test]
    fn empty_session_has_zero_receipt() {
        let receipt = ScanSession::new().receipt().unwrap();
        assert_eq!(receipt.total_items, 0);
        assert_eq!(receipt.total_value, 0);
        assert!(receipt.lines.is_empty());
    }
}
