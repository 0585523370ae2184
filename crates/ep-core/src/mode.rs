//! Transport mode of a scheduled connection.

use std::str::FromStr;

use crate::EpError;

/// The kind of vehicle a connection runs on.
///
/// The mode does not affect routing; it is carried for reporting and for the
/// network CSV round trip.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[derive(serde::Serialize, serde::Deserialize)]
pub enum TransportMode {
    /// Short-haul feeder legs within a metro area.
    #[default]
    Local,
    /// Line-haul trucking.
    Surface,
    Railroad,
    Air,
}

impl TransportMode {
    /// Label as written in the network CSV.
    pub fn as_str(self) -> &'static str {
        match self {
            TransportMode::Local    => "Local",
            TransportMode::Surface  => "Surface",
            TransportMode::Railroad => "Railroad",
            TransportMode::Air      => "Air",
        }
    }
}

impl std::fmt::Display for TransportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportMode {
    type Err = EpError;

    /// Case-insensitive; an empty string reads as `Local`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "local" => Ok(TransportMode::Local),
            "surface"    => Ok(TransportMode::Surface),
            "railroad"   => Ok(TransportMode::Railroad),
            "air"        => Ok(TransportMode::Air),
            other        => Err(EpError::Parse(format!("unknown transport mode {other:?}"))),
        }
    }
}
