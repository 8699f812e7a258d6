//! # League Table
//!
//! Fixed team roster matching the contract's initialization order. Team ids
//! in events index into this table.

/// Team names in contract initialization order.
const TEAM_NAMES: [&str; 20] = [
    "Manchester Virtual",
    "Liverpool Digital",
    "Chelsea Crypto",
    "Arsenal Web3",
    "Tottenham Chain",
    "Manchester Block",
    "Newcastle Node",
    "Brighton Token",
    "Aston Meta",
    "West Ham Hash",
    "Everton Ether",
    "Leicester Link",
    "Wolves Wallet",
    "Crystal Palace Protocol",
    "Fulham Fork",
    "Brentford Bridge",
    "Bournemouth Bytes",
    "Nottingham NFT",
    "Southampton Smart",
    "Leeds Ledger",
];

/// Resolves a team id to its display name.
///
/// Ids beyond the roster get a numeric fallback rather than an error; the
/// cache should keep ingesting even if the contract roster grows first.
#[must_use]
pub fn team_name(team_id: u8) -> String {
    TEAM_NAMES
        .get(usize::from(team_id))
        .map_or_else(|| format!("Team {team_id}"), |name| (*name).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_team() {
        assert_eq!(team_name(0), "Manchester Virtual");
        assert_eq!(team_name(19), "Leeds Ledger");
    }

    #[test]
    fn test_unknown_team_fallback() {
        assert_eq!(team_name(42), "Team 42");
    }
}
