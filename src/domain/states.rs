//! The 50 US states.
//!
//! Each state carries its postal abbreviation, full name, and a position on
//! the tile-grid map used by the dashboard choropleth.

use serde::{Deserialize, Serialize};

/// Position on the tile-grid map (`row`, `col`), 8 rows by 11 columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tile {
    pub row: u8,
    pub col: u8,
}

pub const TILE_ROWS: u8 = 8;
pub const TILE_COLS: u8 = 11;

struct StateInfo {
    abbr: &'static str,
    name: &'static str,
    tile: Tile,
}

const fn info(abbr: &'static str, name: &'static str, row: u8, col: u8) -> StateInfo {
    StateInfo {
        abbr,
        name,
        tile: Tile { row, col },
    }
}

// Sorted by full name; `UsState` ordering follows this table.
static STATES: [StateInfo; 50] = [
    info("AL", "Alabama", 6, 6),
    info("AK", "Alaska", 0, 0),
    info("AZ", "Arizona", 5, 1),
    info("AR", "Arkansas", 5, 4),
    info("CA", "California", 4, 0),
    info("CO", "Colorado", 4, 2),
    info("CT", "Connecticut", 3, 9),
    info("DE", "Delaware", 4, 9),
    info("FL", "Florida", 7, 8),
    info("GA", "Georgia", 6, 7),
    info("HI", "Hawaii", 7, 0),
    info("ID", "Idaho", 2, 1),
    info("IL", "Illinois", 2, 5),
    info("IN", "Indiana", 3, 5),
    info("IA", "Iowa", 3, 4),
    info("KS", "Kansas", 5, 3),
    info("KY", "Kentucky", 4, 5),
    info("LA", "Louisiana", 6, 4),
    info("ME", "Maine", 0, 10),
    info("MD", "Maryland", 4, 8),
    info("MA", "Massachusetts", 2, 10),
    info("MI", "Michigan", 2, 7),
    info("MN", "Minnesota", 2, 4),
    info("MS", "Mississippi", 6, 5),
    info("MO", "Missouri", 4, 4),
    info("MT", "Montana", 2, 2),
    info("NE", "Nebraska", 4, 3),
    info("NV", "Nevada", 3, 1),
    info("NH", "New Hampshire", 1, 10),
    info("NJ", "New Jersey", 3, 8),
    info("NM", "New Mexico", 5, 2),
    info("NY", "New York", 2, 8),
    info("NC", "North Carolina", 5, 6),
    info("ND", "North Dakota", 2, 3),
    info("OH", "Ohio", 3, 6),
    info("OK", "Oklahoma", 6, 3),
    info("OR", "Oregon", 3, 0),
    info("PA", "Pennsylvania", 3, 7),
    info("RI", "Rhode Island", 2, 9),
    info("SC", "South Carolina", 5, 7),
    info("SD", "South Dakota", 3, 3),
    info("TN", "Tennessee", 5, 5),
    info("TX", "Texas", 7, 3),
    info("UT", "Utah", 4, 1),
    info("VT", "Vermont", 1, 9),
    info("VA", "Virginia", 4, 7),
    info("WA", "Washington", 2, 0),
    info("WV", "West Virginia", 4, 6),
    info("WI", "Wisconsin", 2, 6),
    info("WY", "Wyoming", 3, 2),
];

/// One of the 50 US states.
///
/// Serialized as the two-letter postal abbreviation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub struct UsState(u8);

impl UsState {
    pub const COUNT: usize = 50;

    /// All states in name order.
    pub fn all() -> impl Iterator<Item = UsState> {
        (0..Self::COUNT as u8).map(UsState)
    }

    pub fn from_abbr(abbr: &str) -> Option<Self> {
        let abbr = abbr.trim();
        STATES
            .iter()
            .position(|s| s.abbr.eq_ignore_ascii_case(abbr))
            .map(|i| UsState(i as u8))
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        STATES
            .iter()
            .position(|s| s.name.eq_ignore_ascii_case(name))
            .map(|i| UsState(i as u8))
    }

    /// Accepts either the abbreviation or the full name.
    pub fn parse(s: &str) -> Option<Self> {
        Self::from_abbr(s).or_else(|| Self::from_name(s))
    }

    pub fn abbr(self) -> &'static str {
        STATES[self.0 as usize].abbr
    }

    pub fn name(self) -> &'static str {
        STATES[self.0 as usize].name
    }

    pub fn tile(self) -> Tile {
        STATES[self.0 as usize].tile
    }

    pub fn at_tile(tile: Tile) -> Option<Self> {
        STATES
            .iter()
            .position(|s| s.tile == tile)
            .map(|i| UsState(i as u8))
    }

    pub fn next(self) -> Self {
        UsState((self.0 + 1) % Self::COUNT as u8)
    }

    pub fn prev(self) -> Self {
        UsState((self.0 + Self::COUNT as u8 - 1) % Self::COUNT as u8)
    }
}

impl std::fmt::Debug for UsState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "UsState({})", self.abbr())
    }
}

impl std::fmt::Display for UsState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.abbr())
    }
}

impl std::str::FromStr for UsState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UsState::parse(s).ok_or_else(|| format!("unknown US state '{s}'"))
    }
}

impl TryFrom<String> for UsState {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<UsState> for &'static str {
    fn from(value: UsState) -> Self {
        value.abbr()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn parses_abbreviations_and_names() {
        let ny = UsState::parse("NY").unwrap();
        assert_eq!(ny.name(), "New York");
        assert_eq!(UsState::parse("new york"), Some(ny));
        assert_eq!(UsState::parse(" ny "), Some(ny));
        assert_eq!(UsState::parse("District of Columbia"), None);
        assert_eq!(UsState::parse("Puerto Rico"), None);
        assert_eq!(UsState::parse("DC"), None);
    }

    #[test]
    fn every_state_has_a_distinct_tile_inside_the_grid() {
        let tiles: HashSet<Tile> = UsState::all().map(|s| s.tile()).collect();
        assert_eq!(tiles.len(), UsState::COUNT);
        for state in UsState::all() {
            let t = state.tile();
            assert!(t.row < TILE_ROWS && t.col < TILE_COLS, "{state} off grid");
            assert_eq!(UsState::at_tile(t), Some(state));
        }
    }

    #[test]
    fn abbreviations_are_unique() {
        let abbrs: HashSet<&str> = UsState::all().map(|s| s.abbr()).collect();
        assert_eq!(abbrs.len(), UsState::COUNT);
    }

    #[test]
    fn next_and_prev_wrap() {
        let first = UsState::all().next().unwrap();
        let last = UsState::all().last().unwrap();
        assert_eq!(last.next(), first);
        assert_eq!(first.prev(), last);
    }
}
