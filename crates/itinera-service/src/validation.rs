//! Input validation for itinerary writes and list queries.
//!
//! Inputs arrive loosely typed (every field optional, dates as strings) so
//! that a bad request yields a list of field errors instead of a generic
//! decoding failure. Every problem found is reported, not just the first.

use itinera_core::{Activity, ItineraryPatch, ListQuery, SortField, UserId};
use jiff::civil::{Date, DateTime};
use jiff::tz::TimeZone;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

pub const TITLE_MAX_CHARS: usize = 100;
pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;

/// A single rejected field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityInput {
    pub time: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
}

/// Client-supplied itinerary fields, used for both create and update.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryInput {
    pub title: Option<String>,
    pub destination: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub activities: Option<Vec<ActivityInput>>,
}

/// Validated fields for a new itinerary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItinerary {
    pub title: String,
    pub destination: String,
    pub start_date: Timestamp,
    pub end_date: Timestamp,
    pub activities: Vec<Activity>,
}

/// Parses an RFC 3339 timestamp, a civil date-time or a plain date.
/// Values without an offset are read as UTC.
pub fn parse_date(raw: &str) -> Option<Timestamp> {
    let raw = raw.trim();
    if let Ok(ts) = raw.parse::<Timestamp>() {
        return Some(ts);
    }
    if let Ok(dt) = raw.parse::<DateTime>() {
        return dt.to_zoned(TimeZone::UTC).ok().map(|z| z.timestamp());
    }
    raw.parse::<Date>()
        .ok()?
        .to_zoned(TimeZone::UTC)
        .ok()
        .map(|z| z.timestamp())
}

/// The error reported when an itinerary would end before it starts.
pub fn dates_out_of_order() -> FieldError {
    FieldError::new("endDate", "End date must be after start date")
}

/// Checks that an itinerary's date range is well ordered.
pub fn check_date_range(start: Timestamp, end: Timestamp) -> Result<(), FieldError> {
    if end <= start {
        return Err(dates_out_of_order());
    }
    Ok(())
}

fn title(raw: &str, errors: &mut Vec<FieldError>) -> Option<String> {
    let trimmed = raw.trim();
    let len = trimmed.chars().count();
    if len == 0 || len > TITLE_MAX_CHARS {
        errors.push(FieldError::new(
            "title",
            "Title must be between 1 and 100 characters",
        ));
        return None;
    }
    Some(trimmed.to_string())
}

fn non_blank(
    raw: &str,
    field: &str,
    message: &str,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        errors.push(FieldError::new(field, message));
        return None;
    }
    Some(trimmed.to_string())
}

fn date(
    raw: Option<&str>,
    field: &str,
    message: &str,
    errors: &mut Vec<FieldError>,
) -> Option<Timestamp> {
    match raw.and_then(parse_date) {
        Some(ts) => Some(ts),
        None => {
            errors.push(FieldError::new(field, message));
            None
        }
    }
}

fn activities(raw: Vec<ActivityInput>, errors: &mut Vec<FieldError>) -> Option<Vec<Activity>> {
    let before = errors.len();
    let mut out = Vec::with_capacity(raw.len());

    for (i, input) in raw.into_iter().enumerate() {
        let time = non_blank(
            input.time.as_deref().unwrap_or_default(),
            &format!("activities[{i}].time"),
            "Activity time is required",
            errors,
        );
        let description = non_blank(
            input.description.as_deref().unwrap_or_default(),
            &format!("activities[{i}].description"),
            "Activity description is required",
            errors,
        );
        let location = non_blank(
            input.location.as_deref().unwrap_or_default(),
            &format!("activities[{i}].location"),
            "Activity location is required",
            errors,
        );

        if let (Some(time), Some(description), Some(location)) = (time, description, location) {
            out.push(Activity {
                time,
                description,
                location,
            });
        }
    }

    (errors.len() == before).then_some(out)
}

impl ItineraryInput {
    /// Validates a create request; title, destination and both dates are required.
    pub fn into_new(self) -> Result<NewItinerary, Vec<FieldError>> {
        let mut errors = Vec::new();

        let title = title(self.title.as_deref().unwrap_or_default(), &mut errors);
        let destination = non_blank(
            self.destination.as_deref().unwrap_or_default(),
            "destination",
            "Destination is required",
            &mut errors,
        );
        let start_date = date(
            self.start_date.as_deref(),
            "startDate",
            "Start date must be a valid date",
            &mut errors,
        );
        let end_date = date(
            self.end_date.as_deref(),
            "endDate",
            "End date must be a valid date",
            &mut errors,
        );
        let activities = activities(self.activities.unwrap_or_default(), &mut errors);

        if let (Some(start), Some(end)) = (start_date, end_date) {
            if let Err(e) = check_date_range(start, end) {
                errors.push(e);
            }
        }

        match (title, destination, start_date, end_date, activities) {
            (Some(title), Some(destination), Some(start_date), Some(end_date), Some(activities))
                if errors.is_empty() =>
            {
                Ok(NewItinerary {
                    title,
                    destination,
                    start_date,
                    end_date,
                    activities,
                })
            }
            _ => Err(errors),
        }
    }

    /// Validates an update request; only the supplied fields are checked.
    ///
    /// The merged date range is checked by the store as it applies the patch.
    pub fn into_patch(self) -> Result<ItineraryPatch, Vec<FieldError>> {
        let mut errors = Vec::new();

        let patch = ItineraryPatch {
            title: self.title.as_deref().and_then(|raw| title(raw, &mut errors)),
            destination: self.destination.as_deref().and_then(|raw| {
                non_blank(raw, "destination", "Destination cannot be empty", &mut errors)
            }),
            start_date: self.start_date.as_deref().and_then(|raw| {
                date(
                    Some(raw),
                    "startDate",
                    "Start date must be a valid date",
                    &mut errors,
                )
            }),
            end_date: self.end_date.as_deref().and_then(|raw| {
                date(
                    Some(raw),
                    "endDate",
                    "End date must be a valid date",
                    &mut errors,
                )
            }),
            activities: self
                .activities
                .and_then(|raw| activities(raw, &mut errors)),
        };

        if errors.is_empty() {
            Ok(patch)
        } else {
            Err(errors)
        }
    }
}

/// Raw list query parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub sort: Option<String>,
    pub destination: Option<String>,
}

impl ListParams {
    pub fn into_query(self, owner: UserId) -> Result<ListQuery, Vec<FieldError>> {
        let mut errors = Vec::new();

        let page = match self.page.as_deref().map(str::trim) {
            None => Some(DEFAULT_PAGE),
            Some(raw) => match raw.parse::<u32>() {
                Ok(page) if page >= 1 => Some(page),
                _ => {
                    errors.push(FieldError::new("page", "Page must be a positive integer"));
                    None
                }
            },
        };

        let limit = match self.limit.as_deref().map(str::trim) {
            None => Some(DEFAULT_LIMIT),
            Some(raw) => match raw.parse::<u32>() {
                Ok(limit) if (1..=MAX_LIMIT).contains(&limit) => Some(limit),
                _ => {
                    errors.push(FieldError::new("limit", "Limit must be between 1 and 100"));
                    None
                }
            },
        };

        let sort = match self.sort.as_deref() {
            None => Some(SortField::default()),
            Some(raw) => match raw.parse::<SortField>() {
                Ok(sort) => Some(sort),
                Err(_) => {
                    errors.push(FieldError::new(
                        "sort",
                        "Sort must be createdAt, startDate, or title",
                    ));
                    None
                }
            },
        };

        let destination = match self.destination.as_deref() {
            None => None,
            Some(raw) => non_blank(
                raw,
                "destination",
                "Destination filter cannot be empty",
                &mut errors,
            ),
        };

        match (page, limit, sort) {
            (Some(page), Some(limit), Some(sort)) if errors.is_empty() => Ok(ListQuery {
                owner,
                destination,
                sort,
                page,
                limit,
            }),
            _ => Err(errors),
        }
    }
}
