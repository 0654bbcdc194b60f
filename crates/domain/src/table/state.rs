use serde::{Deserialize, Serialize};

/// Occupancy status of a table.
///
/// ```text
/// Available ──► Reserved ──► Occupied ──► Available
///     └──────────────────────────▲
/// ```
///
/// An administrator may set any status directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TableStatus {
    #[default]
    Available,
    Reserved,
    Occupied,
}

impl TableStatus {
    pub fn can_reserve(&self) -> bool {
        matches!(self, TableStatus::Available)
    }

    /// Whether an order may be seated here, ignoring who holds a reservation.
    pub fn can_occupy(&self) -> bool {
        matches!(self, TableStatus::Available | TableStatus::Reserved)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TableStatus::Available => "AVAILABLE",
            TableStatus::Reserved => "RESERVED",
            TableStatus::Occupied => "OCCUPIED",
        }
    }
}

impl std::fmt::Display for TableStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TableStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "AVAILABLE" => Ok(TableStatus::Available),
            "RESERVED" => Ok(TableStatus::Reserved),
            "OCCUPIED" => Ok(TableStatus::Occupied),
            other => Err(format!("unknown table status: {other}")),
        }
    }
}
