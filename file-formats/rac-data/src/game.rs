use std::fmt;
use std::str::FromStr;

use crate::error::RacDataError;

/// The four PS2 releases whose assets share these formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Game {
    /// Ratchet & Clank
    Rac1,
    /// Going Commando
    Rac2,
    /// Up Your Arsenal
    Rac3,
    /// Deadlocked
    Dl,
}

impl Game {
    pub const ALL: [Self; 4] = [Self::Rac1, Self::Rac2, Self::Rac3, Self::Dl];

    /// Short identifier, as accepted by [`FromStr`]
    pub fn short_name(self) -> &'static str {
        match self {
            Self::Rac1 => "rac1",
            Self::Rac2 => "rac2",
            Self::Rac3 => "rac3",
            Self::Dl => "dl",
        }
    }
}

impl FromStr for Game {
    type Err = RacDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.as_str() {
            "rac1" | "rac" | "1" => Ok(Self::Rac1),
            "rac2" | "gc" | "2" => Ok(Self::Rac2),
            "rac3" | "uya" | "3" => Ok(Self::Rac3),
            "dl" | "deadlocked" | "4" => Ok(Self::Dl),
            _ => Err(RacDataError::UnknownGame(s.to_string())),
        }
    }
}

impl fmt::Display for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Rac1 => "Ratchet & Clank",
            Self::Rac2 => "Going Commando",
            Self::Rac3 => "Up Your Arsenal",
            Self::Dl => "Deadlocked",
        };
        f.write_str(name)
    }
}
