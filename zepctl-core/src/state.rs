use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDateTime, Timelike, Utc};

use crate::error::{ConvertError, Result};
use crate::markdown::MarkdownBuffer;

/// Author recorded when no paragraph names a user.
pub const DEFAULT_USER: &str = "anonymous";

/// Placeholder rendered in the header for dates never seen.
pub const UNSET_DATE: &str = "N/A";

const ZONED_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%b %d, %Y %I:%M:%S %p",
    "%b %d, %Y, %I:%M:%S %p",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// A paragraph timestamp.
///
/// Zeppelin writes `dateCreated`/`dateUpdated` either as a Java locale string
/// without zone (`Feb 28, 2017 3:44:54 PM`) or as ISO-8601 with an offset.
/// Zone-less values are ordered as if they were UTC. Ordering and equality
/// only look at the instant, the offset flag only affects rendering.
#[derive(Debug, Clone, Copy)]
pub struct Timestamp {
    instant: DateTime<FixedOffset>,
    has_offset: bool,
}

impl Timestamp {
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();

        if let Ok(instant) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(Self {
                instant,
                has_offset: true,
            });
        }

        for format in ZONED_FORMATS {
            if let Ok(instant) = DateTime::parse_from_str(trimmed, format) {
                return Ok(Self {
                    instant,
                    has_offset: true,
                });
            }
        }

        for format in NAIVE_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
                return Ok(Self {
                    instant: naive.and_utc().fixed_offset(),
                    has_offset: false,
                });
            }
        }

        Err(ConvertError::invalid_timestamp(
            text,
            "unrecognized date-time format",
        ))
    }

    pub fn instant(&self) -> DateTime<FixedOffset> {
        self.instant
    }

    pub fn to_utc(&self) -> DateTime<Utc> {
        self.instant.with_timezone(&Utc)
    }
}

impl PartialEq for Timestamp {
    fn eq(&self, other: &Self) -> bool {
        self.instant == other.instant
    }
}

impl Eq for Timestamp {}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        self.instant.cmp(&other.instant)
    }
}

/// Microseconds are printed only when present.
impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let format = match (self.instant.nanosecond() / 1_000 != 0, self.has_offset) {
            (true, true) => "%Y-%m-%d %H:%M:%S%.6f%:z",
            (true, false) => "%Y-%m-%d %H:%M:%S%.6f",
            (false, true) => "%Y-%m-%d %H:%M:%S%:z",
            (false, false) => "%Y-%m-%d %H:%M:%S",
        };
        if self.has_offset {
            write!(f, "{}", self.instant.format(format))
        } else {
            write!(f, "{}", self.instant.naive_local().format(format))
        }
    }
}

/// Mutable record threaded through every paragraph handler of one conversion.
#[derive(Debug, Clone)]
pub struct ConversionState {
    pub user: String,
    pub date_created: Option<Timestamp>,
    pub date_updated: Option<Timestamp>,
    /// Default code language inferred from the last seen editor mode.
    pub language: Option<String>,
    /// Number of images written so far; the next image gets `image_index + 1`.
    pub image_index: u32,
    pub buffer: MarkdownBuffer,
}

impl Default for ConversionState {
    fn default() -> Self {
        Self {
            user: DEFAULT_USER.to_string(),
            date_created: None,
            date_updated: None,
            language: None,
            image_index: 0,
            buffer: MarkdownBuffer::default(),
        }
    }
}

impl ConversionState {
    /// Keep the oldest creation date.
    pub fn process_date_created(&mut self, text: &str) -> Result<()> {
        let date = Timestamp::parse(text)?;
        match self.date_created {
            Some(current) if date >= current => {}
            _ => self.date_created = Some(date),
        }
        Ok(())
    }

    /// Keep the most recent update date.
    pub fn process_date_updated(&mut self, text: &str) -> Result<()> {
        let date = Timestamp::parse(text)?;
        match self.date_updated {
            Some(current) if date <= current => {}
            _ => self.date_updated = Some(date),
        }
        Ok(())
    }

    pub fn date_created_label(&self) -> String {
        date_label(self.date_created.as_ref())
    }

    pub fn date_updated_label(&self) -> String {
        date_label(self.date_updated.as_ref())
    }

    pub fn next_image_index(&mut self) -> u32 {
        self.image_index += 1;
        self.image_index
    }
}

fn date_label(date: Option<&Timestamp>) -> String {
    date.map(ToString::to_string)
        .unwrap_or_else(|| UNSET_DATE.to_string())
}
