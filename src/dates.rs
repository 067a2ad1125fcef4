use chrono::{DateTime, Days, NaiveDate, NaiveDateTime, TimeZone};
use tracing::{debug, info};

use crate::error::EpssError;
use crate::remote::ScoreSource;

/// First day EPSS scores were published in the current daily format.
pub const DEFAULT_MIN_DATE: NaiveDate = match NaiveDate::from_ymd_opt(2022, 7, 15) {
    Some(date) => date,
    None => panic!("invalid default min date"),
};

/// Anything that can be normalised to a plain calendar date.
pub trait IntoDate {
    fn into_date(self) -> crate::Result<NaiveDate>;
}

impl IntoDate for NaiveDate {
    fn into_date(self) -> crate::Result<NaiveDate> {
        Ok(self)
    }
}

impl IntoDate for NaiveDateTime {
    fn into_date(self) -> crate::Result<NaiveDate> {
        Ok(self.date())
    }
}

impl<Tz: TimeZone> IntoDate for DateTime<Tz> {
    fn into_date(self) -> crate::Result<NaiveDate> {
        Ok(self.date_naive())
    }
}

impl IntoDate for &str {
    fn into_date(self) -> crate::Result<NaiveDate> {
        NaiveDate::parse_from_str(self.trim(), "%Y-%m-%d")
            .map_err(|_| EpssError::InvalidDateFormat(self.to_string()))
    }
}

impl IntoDate for String {
    fn into_date(self) -> crate::Result<NaiveDate> {
        self.as_str().into_date()
    }
}

impl IntoDate for &String {
    fn into_date(self) -> crate::Result<NaiveDate> {
        self.as_str().into_date()
    }
}

pub fn parse_date(input: impl IntoDate) -> crate::Result<NaiveDate> {
    input.into_date()
}

/// Every date in `[min_date, max_date]`, ascending. Empty when `min_date > max_date`.
pub fn enumerate_dates(
    min_date: NaiveDate,
    max_date: NaiveDate,
) -> impl Iterator<Item = NaiveDate> + Clone {
    min_date.iter_days().take_while(move |date| *date <= max_date)
}

/// Latest published date, read from the redirect behind the "current" snapshot.
pub fn resolve_max_date(source: &dyn ScoreSource) -> crate::Result<NaiveDate> {
    source.current_date()
}

/// Earliest published date.
///
/// Without `check` this is `floor`. With `check`, walks back one day at a
/// time from the latest date until the provider has no snapshot and returns
/// the last day that had one.
pub fn resolve_min_date(
    source: &dyn ScoreSource,
    floor: NaiveDate,
    check: bool,
) -> crate::Result<NaiveDate> {
    if !check {
        return Ok(floor);
    }

    let max_date = resolve_max_date(source)?;
    if !source.snapshot_exists(max_date)? {
        return Err(EpssError::UpstreamNotFound {
            date: max_date,
            url: source.download_url(max_date),
        });
    }

    let mut earliest = max_date;
    while let Some(previous) = earliest.checked_sub_days(Days::new(1)) {
        if !source.snapshot_exists(previous)? {
            break;
        }
        earliest = previous;
    }

    info!("Earliest available EPSS snapshot: {}", earliest);
    Ok(earliest)
}

/// Fills missing bounds (`floor` and the provider's latest date) and checks ordering.
pub fn resolve_date_range(
    source: &dyn ScoreSource,
    floor: NaiveDate,
    min_date: Option<NaiveDate>,
    max_date: Option<NaiveDate>,
) -> crate::Result<(NaiveDate, NaiveDate)> {
    let min_date = match min_date {
        Some(date) => date,
        None => resolve_min_date(source, floor, false)?,
    };
    let max_date = match max_date {
        Some(date) => date,
        None => resolve_max_date(source)?,
    };
    check_range(min_date, max_date)?;

    debug!("Resolved date range {} to {}", min_date, max_date);
    Ok((min_date, max_date))
}

pub fn check_range(min_date: NaiveDate, max_date: NaiveDate) -> crate::Result<()> {
    if min_date > max_date {
        return Err(EpssError::InvalidRange {
            min: min_date,
            max: max_date,
        });
    }
    Ok(())
}
