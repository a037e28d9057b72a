use ethers::types::{Bytes, H160, H256};
use ethers::utils::hex;

/// Renders chain identifiers the way nodes serialize them:
/// full width, lowercase and `0x`-prefixed.
pub struct Hashes;

impl Hashes {
    pub fn h160_to_string(h160: &H160) -> String {
        format!("{h160:?}")
    }

    pub fn h256_to_string(h256: &H256) -> String {
        format!("{h256:?}")
    }

    pub fn bytes_to_string(bytes: &Bytes) -> String {
        format!("0x{}", hex::encode(bytes.as_ref()))
    }
}
