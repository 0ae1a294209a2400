//! # IMF turning event catalog
//!
//! The event catalog is a hand-curated, read-only table of interplanetary
//! magnetic field (IMF) turning observations: the turning instant, its
//! polarity, the empirically estimated convection response lag, and a
//! quality rating assigned during manual inspection. The pipeline filters it
//! by polarity and quality and never mutates it.
//!
//! Catalogs are loaded from CSV ([`EventCatalog::from_csv`]) or taken from
//! the built-in curated list of the northward-turning study
//! ([`EventCatalog::builtin_northward`]).

use std::str::FromStr;

use camino::Utf8Path;
use hifitime::Epoch;
use serde::Deserialize;

use crate::constants::RadarId;
use crate::sdconv_errors::SdconvError;

/// Polarity of an IMF turning: the sign the vertical component flips toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Polarity {
    Northward,
    Southward,
}

impl Polarity {
    /// Decode the catalog's `turn_flag` angle convention (0 = northward,
    /// 180 = southward).
    pub fn from_turn_flag(flag: u16) -> Result<Self, SdconvError> {
        match flag {
            0 => Ok(Polarity::Northward),
            180 => Ok(Polarity::Southward),
            other => Err(SdconvError::EventCatalogParsing(format!(
                "unknown turn_flag {other} (expected 0 or 180)"
            ))),
        }
    }
}

impl FromStr for Polarity {
    type Err = SdconvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "northward" => Ok(Polarity::Northward),
            "southward" => Ok(Polarity::Southward),
            other => Err(SdconvError::EventCatalogParsing(format!(
                "unknown polarity {other:?}"
            ))),
        }
    }
}

/// Manual quality rating of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventStatus {
    Good,
    Bad,
    Unrated,
}

impl FromStr for EventStatus {
    type Err = SdconvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "good" => Ok(EventStatus::Good),
            "bad" => Ok(EventStatus::Bad),
            "" | "unrated" => Ok(EventStatus::Unrated),
            other => Err(SdconvError::EventCatalogParsing(format!(
                "unknown event status {other:?}"
            ))),
        }
    }
}

/// One curated IMF turning observation.
///
/// The spatial metadata (`radar_id`, `beam_number`, `mlt_sector`,
/// `beam_direction`) records where the response was identified during
/// curation; it is carried for provenance and is not consumed by the
/// alignment arithmetic.
#[derive(Debug, Clone)]
pub struct Event {
    /// Instant of the IMF turning itself (not of the ionospheric response).
    pub event_time: Epoch,
    pub polarity: Polarity,
    /// Convection response delay in minutes; the response time is
    /// `event_time + lag_minutes`.
    pub lag_minutes: u32,
    pub status: EventStatus,
    pub radar_id: Option<RadarId>,
    pub beam_number: Option<u16>,
    /// MLT sector (hours) in which the response was identified.
    pub mlt_sector: Option<u8>,
    /// `"east"` / `"west"` looking beam, as recorded by the curators.
    pub beam_direction: Option<String>,
    pub comment: Option<String>,
}

impl Event {
    /// Minimal event with only the fields the pipeline arithmetic needs.
    pub fn new(event_time: Epoch, polarity: Polarity, lag_minutes: u32, status: EventStatus) -> Self {
        Event {
            event_time,
            polarity,
            lag_minutes,
            status,
            radar_id: None,
            beam_number: None,
            mlt_sector: None,
            beam_direction: None,
            comment: None,
        }
    }
}

/// Raw CSV row; decoded into [`Event`] after parsing the string fields.
#[derive(Debug, Deserialize)]
struct EventRecord {
    datetime: String,
    turn_flag: u16,
    lag_time: u32,
    #[serde(default)]
    event_status: String,
    #[serde(default)]
    rad: Option<String>,
    #[serde(default)]
    bmnum: Option<u16>,
    #[serde(default)]
    mlt: Option<u8>,
    #[serde(default)]
    bmdir: Option<String>,
    #[serde(default)]
    comment: Option<String>,
}

impl TryFrom<EventRecord> for Event {
    type Error = SdconvError;

    fn try_from(rec: EventRecord) -> Result<Self, Self::Error> {
        let event_time = Epoch::from_str(&rec.datetime).map_err(|e| {
            SdconvError::EventCatalogParsing(format!("bad datetime {:?}: {e}", rec.datetime))
        })?;
        Ok(Event {
            event_time,
            polarity: Polarity::from_turn_flag(rec.turn_flag)?,
            lag_minutes: rec.lag_time,
            status: rec.event_status.parse()?,
            radar_id: rec.rad,
            beam_number: rec.bmnum,
            mlt_sector: rec.mlt,
            beam_direction: rec.bmdir,
            comment: rec.comment,
        })
    }
}

/// Read-only collection of turning events with polarity/quality filtering.
#[derive(Debug, Clone, Default)]
pub struct EventCatalog {
    events: Vec<Event>,
}

impl EventCatalog {
    pub fn new(events: Vec<Event>) -> Self {
        EventCatalog { events }
    }

    /// Load a catalog from a CSV file with a header row
    /// (`datetime,turn_flag,lag_time,event_status,rad,bmnum,mlt,bmdir,comment`).
    pub fn from_csv(path: &Utf8Path) -> Result<Self, SdconvError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path.as_std_path())?;
        let mut events = Vec::new();
        for record in reader.deserialize::<EventRecord>() {
            events.push(Event::try_from(record?)?);
        }
        Ok(EventCatalog { events })
    }

    /// All events regardless of polarity or rating.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events matching the given polarity and quality filters. `None` leaves
    /// the corresponding dimension unfiltered.
    pub fn select(
        &self,
        polarity: Option<Polarity>,
        status: Option<EventStatus>,
    ) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| polarity.map_or(true, |p| e.polarity == p))
            .filter(|e| status.map_or(true, |s| e.status == s))
            .collect()
    }

    /// The curated northward-turning list of the original study.
    ///
    /// One entry per (event, radar) identification; events rated `bad`
    /// during inspection are carried with their rating so that the standard
    /// `good` filter drops them.
    pub fn builtin_northward() -> Self {
        fn ev(
            (y, mo, d, h, mi): (i32, u8, u8, u8, u8),
            rad: &str,
            bmnum: u16,
            lag: u32,
            mlt: u8,
            bmdir: &str,
            status: EventStatus,
            comment: Option<&str>,
        ) -> Event {
            Event {
                event_time: Epoch::from_gregorian_utc(y, mo, d, h, mi, 0, 0),
                polarity: Polarity::Northward,
                lag_minutes: lag,
                status,
                radar_id: Some(rad.to_string()),
                beam_number: Some(bmnum),
                mlt_sector: Some(mlt),
                beam_direction: Some(bmdir.to_string()),
                comment: comment.map(str::to_string),
            }
        }

        use EventStatus::{Bad, Good};
        let events = vec![
            ev((2013, 2, 21, 5, 34), "cve", 7, 10, 21, "east", Good, None),
            ev((2013, 2, 21, 5, 34), "cvw", 13, 10, 21, "west", Good, None),
            ev((2013, 2, 21, 5, 34), "fhe", 7, 15, 23, "east", Good, None),
            ev((2013, 2, 21, 5, 34), "fhw", 13, 21, 23, "west", Good, None),
            ev((2013, 2, 21, 5, 34), "bks", 19, 10, 0, "west", Bad, Some("Confusing")),
            ev((2015, 2, 1, 9, 51), "adw", 13, 20, 21, "west", Good, None),
            ev((2015, 2, 1, 9, 51), "cve", 1, 15, 0, "east", Good, None),
            ev((2015, 2, 1, 9, 51), "cvw", 19, 21, 0, "west", Good, None),
            ev((2015, 2, 1, 9, 51), "fhe", 7, 21, 3, "east", Good, None),
            ev((2015, 2, 1, 9, 51), "fhw", 13, 16, 3, "west", Good, None),
            ev((2015, 2, 1, 9, 51), "bks", 13, 15, 5, "west", Good, None),
            ev((2013, 11, 16, 7, 49), "cvw", 13, 10, 23, "west", Good, None),
            ev((2013, 11, 16, 7, 49), "cve", 1, 10, 0, "east", Good, None),
            ev((2013, 11, 16, 7, 49), "fhe", 7, 20, 1, "east", Bad, Some("Confusing")),
            ev((2013, 11, 16, 7, 49), "fhw", 13, 10, 1, "west", Good, None),
            ev((2013, 11, 16, 7, 49), "bks", 13, 10, 3, "west", Good, None),
            ev((2014, 1, 3, 9, 28), "cve", 1, 21, 0, "east", Good, None),
            ev((2014, 1, 3, 9, 28), "adw", 18, 10, 21, "west", Bad, Some("Confusing")),
            ev((2014, 1, 3, 9, 28), "cvw", 19, 9, 0, "west", Good, None),
            ev((2015, 1, 26, 10, 8), "cve", 1, 12, 0, "east", Good, None),
            ev(
                (2015, 1, 26, 10, 8),
                "cve",
                7,
                10,
                1,
                "east",
                Bad,
                Some("SAPS to SAIS after IMF turning"),
            ),
            ev((2015, 1, 26, 10, 8), "cvw", 13, 15, 1, "west", Good, None),
            ev((2015, 1, 26, 10, 8), "fhe", 7, 10, 3, "east", Good, Some("Not clear")),
            ev((2015, 1, 26, 10, 8), "fhw", 13, 20, 3, "west", Good, None),
            ev((2015, 1, 26, 10, 8), "bks", 13, 15, 5, "west", Good, None),
            ev((2014, 1, 1, 8, 0), "fhe", 7, 12, 1, "east", Bad, Some("Confusing")),
            ev((2014, 1, 1, 8, 0), "fhw", 13, 10, 1, "west", Good, None),
            ev((2014, 3, 1, 9, 20), "cve", 7, 20, 1, "east", Bad, Some("Confusing")),
            ev((2014, 3, 1, 9, 20), "fhw", 13, 12, 1, "west", Good, None),
            ev((2014, 3, 1, 9, 20), "fhe", 7, 22, 3, "east", Good, None),
            ev((2014, 3, 1, 9, 20), "bks", 13, 22, 3, "west", Good, None),
            ev((2014, 12, 16, 14, 2), "adw", 13, 15, 1, "west", Good, None),
            ev((2014, 12, 16, 14, 2), "ade", 7, 17, 3, "east", Good, None),
            ev((2014, 12, 16, 14, 2), "cve", 7, 10, 5, "east", Good, None),
        ];
        EventCatalog { events }
    }
}
