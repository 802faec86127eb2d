use pb_01_actor_state::BlockHeight;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::ports::outbound::ChainClock;

/// Block height set by hand.
#[derive(Debug, Default)]
pub struct ManualClock {
    height: AtomicU64,
}

impl ManualClock {
    pub fn new(height: BlockHeight) -> Self {
        Self {
            height: AtomicU64::new(height),
        }
    }

    pub fn set(&self, height: BlockHeight) {
        self.height.store(height, Ordering::SeqCst);
    }

    /// Moves the height forward by `blocks` and returns the new height.
    pub fn advance(&self, blocks: u64) -> BlockHeight {
        self.height.fetch_add(blocks, Ordering::SeqCst) + blocks
    }
}

impl ChainClock for ManualClock {
    fn block_height(&self) -> BlockHeight {
        self.height.load(Ordering::SeqCst)
    }
}
