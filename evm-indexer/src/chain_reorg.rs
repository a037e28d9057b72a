/// Tolerance for chain re-organization: blocks this close to the chain head
/// are never indexed because a competing fork may still replace them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConfirmationDepth {
    value: u64,
}

impl ConfirmationDepth {
    pub fn new(value: u64) -> Self {
        Self { value }
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    /// The highest block number considered safe to index, if any.
    pub fn deduct_from(&self, latest_block_number: u64) -> Option<u64> {
        latest_block_number.checked_sub(self.value)
    }
}

impl Default for ConfirmationDepth {
    fn default() -> Self {
        Self::new(12)
    }
}
