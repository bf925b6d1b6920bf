//! Balance checkpoints.

use crate::Timestamp;
use serde::{Deserialize, Serialize};

/// A timestamped snapshot of an account's staked balance, taken right
/// after the mutation that produced it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub at: Timestamp,
    pub balance: u128,
}

impl Checkpoint {
    pub fn new(at: Timestamp, balance: u128) -> Self {
        Self { at, balance }
    }
}
