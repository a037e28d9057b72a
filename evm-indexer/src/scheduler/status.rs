use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::{ConfirmationDepth, HEALTHY_CONSECUTIVE_ERROR_LIMIT};

/// Mirror of the scheduler's loop state, written only by the loop itself.
#[derive(Debug, Default)]
pub(crate) struct SchedulerStatus {
    is_running: AtomicBool,
    consecutive_errors: AtomicU32,
}

impl SchedulerStatus {
    pub fn set_running(&self, is_running: bool) {
        self.is_running.store(is_running, Ordering::SeqCst);
    }

    pub fn set_consecutive_errors(&self, consecutive_errors: u32) {
        self.consecutive_errors.store(consecutive_errors, Ordering::SeqCst);
    }

    pub fn health(&self) -> HealthStatus {
        HealthStatus::new(
            self.is_running.load(Ordering::SeqCst),
            self.consecutive_errors.load(Ordering::SeqCst),
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HealthStatus {
    pub is_running: bool,
    pub consecutive_errors: u32,
    pub is_healthy: bool,
}

impl HealthStatus {
    pub fn new(is_running: bool, consecutive_errors: u32) -> Self {
        Self {
            is_running,
            consecutive_errors,
            is_healthy: consecutive_errors < HEALTHY_CONSECUTIVE_ERROR_LIMIT,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexingProgress {
    pub last_indexed_block: u64,
    pub latest_network_block: u64,
    /// Confirmed blocks not indexed yet
    pub blocks_remaining: u64,
}

impl IndexingProgress {
    pub fn new(
        last_indexed_block: u64,
        latest_network_block: u64,
        confirmation_depth: ConfirmationDepth,
    ) -> Self {
        let target_block = confirmation_depth.deduct_from(latest_network_block).unwrap_or(0);

        Self {
            last_indexed_block,
            latest_network_block,
            blocks_remaining: target_block.saturating_sub(last_indexed_block),
        }
    }
}
