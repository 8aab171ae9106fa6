// Raffle deployment tooling - Utility Functions
use alloy_primitives::{keccak256, utils::format_ether, U256};
use alloy_sol_types::SolValue;

use crate::raffle_error::{Revert, PANIC_DIVISION_BY_ZERO};

/// Deterministic random word `keccak256(abi.encode(requestId, index))`
pub fn random_word(request_id: U256, index: u32) -> U256 {
    let seed = (request_id, U256::from(index)).abi_encode();
    U256::from_be_bytes(keccak256(seed).0)
}

/// Index of the winning player for a random word
pub fn winner_index(word: U256, players: usize) -> Result<usize, Revert> {
    if players == 0 {
        return Err(Revert::panic(PANIC_DIVISION_BY_ZERO));
    }
    let index = word % U256::from(players);
    // always below `players`
    usize::try_from(index).map_err(|_| Revert::panic(PANIC_DIVISION_BY_ZERO))
}

/// Convert wei to ether (for display purposes)
pub fn wei_to_ether(wei: U256) -> String {
    format_ether(wei)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_words_differ_per_index() {
        let id = U256::from(1);
        assert_eq!(random_word(id, 0), random_word(id, 0));
        assert_ne!(random_word(id, 0), random_word(id, 1));
        assert_ne!(random_word(id, 0), random_word(U256::from(2), 0));
    }

    #[test]
    fn test_winner_index_wraps_player_count() {
        assert_eq!(winner_index(U256::from(7), 4).unwrap(), 3);
        assert_eq!(winner_index(U256::MAX, 1).unwrap(), 0);
        assert!(winner_index(U256::from(7), 0).is_err());
    }
}
