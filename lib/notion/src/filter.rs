//! The due-post filter stack.
//!
//! Rules are small pure functions applied left-to-right over the parse
//! stage's output, in the documented order:
//!
//! 1. status is exactly `Programmato`;
//! 2. type tag is one of the publishable tags;
//! 3. the release date is present and parseable;
//! 4. the release date falls inside the transfer window
//!    (`[today, today + horizon]`, date granularity);
//! 5. the release timestamp is not in the future (the due test).
//!
//! The window floor is "today", so a post left over from a prior day never
//! re-enters the pipeline. That matches the store-side editorial workflow,
//! where stale scheduled rows are reviewed by hand.

use crate::parse::RawPost;
use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, TimeZone};
use telepost_core::{Post, PostStatus, PostType};
use tracing::{debug, warn};

/// Type tags this system publishes; everything else is dropped.
pub const PUBLISHABLE_TYPE_TAGS: [&str; 2] = ["Telegram_testo", "Telegram_poll"];

/// Days ahead of today that bound the transfer window.
pub const DEFAULT_HORIZON_DAYS: i64 = 30;

/// The sliding evaluation window anchored at a reference instant.
#[derive(Debug, Clone, Copy)]
pub struct DueWindow {
    now: DateTime<Local>,
    first_day: NaiveDate,
    last_day: NaiveDate,
}

impl DueWindow {
    /// Builds the default 30-day window anchored at `now`.
    #[must_use]
    pub fn starting(now: DateTime<Local>) -> Self {
        Self::with_horizon(now, DEFAULT_HORIZON_DAYS)
    }

    /// Builds a window spanning `[now.date(), now.date() + horizon_days]`.
    #[must_use]
    pub fn with_horizon(now: DateTime<Local>, horizon_days: i64) -> Self {
        Self {
            now,
            first_day: now.date_naive(),
            last_day: (now + Duration::days(horizon_days)).date_naive(),
        }
    }

    /// Date-granularity containment check; bounds transfer cost only.
    #[must_use]
    pub fn contains(&self, at: DateTime<Local>) -> bool {
        let day = at.date_naive();
        day >= self.first_day && day <= self.last_day
    }

    /// Full-timestamp due test: the release instant has passed.
    #[must_use]
    pub fn is_due(&self, at: DateTime<Local>) -> bool {
        at <= self.now
    }
}

/// Rule 1: the store-observed status is exactly `Programmato`.
#[must_use]
pub fn has_scheduled_status(raw: &RawPost) -> bool {
    raw.status
        .as_deref()
        .is_some_and(|status| PostStatus::from_store(status) == PostStatus::Scheduled)
}

/// Rule 2: the literal type tag is one this system publishes.
#[must_use]
pub fn has_publishable_type(raw: &RawPost) -> bool {
    raw.type_tag
        .as_deref()
        .is_some_and(|tag| PUBLISHABLE_TYPE_TAGS.contains(&tag))
}

/// Rule 3: normalizes the store's release date to the reference timezone.
///
/// Accepts RFC 3339 timestamps, offset-less timestamps (interpreted in the
/// reference timezone), and bare dates, which mean end of that day.
#[must_use]
pub fn parse_publish_at(value: &str) -> Option<DateTime<Local>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(value) {
        return Some(at.with_timezone(&Local));
    }

    if value.contains('T') {
        let naive = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
        return Local.from_local_datetime(&naive).earliest();
    }

    let day = NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()?;
    Local
        .from_local_datetime(&day.and_hms_opt(23, 59, 59)?)
        .earliest()
}

/// Applies the whole filter stack, preserving retrieval order.
#[must_use]
pub fn select_due(raws: Vec<RawPost>, window: &DueWindow) -> Vec<Post> {
    raws.into_iter()
        .filter_map(|raw| select_one(raw, window))
        .collect()
}

fn select_one(raw: RawPost, window: &DueWindow) -> Option<Post> {
    if !has_scheduled_status(&raw) {
        debug!(id = %raw.id, status = ?raw.status, "skipping post, not scheduled");
        return None;
    }

    if !has_publishable_type(&raw) {
        debug!(id = %raw.id, tag = ?raw.type_tag, "skipping post, type not publishable");
        return None;
    }

    let Some(publish_at_raw) = raw.publish_at.as_deref() else {
        debug!(id = %raw.id, "skipping post, no release date");
        return None;
    };

    let Some(publish_at) = parse_publish_at(publish_at_raw) else {
        warn!(id = %raw.id, value = publish_at_raw, "skipping post, unparseable release date");
        return None;
    };

    if !window.contains(publish_at) {
        debug!(id = %raw.id, %publish_at, "skipping post, outside transfer window");
        return None;
    }

    if !window.is_due(publish_at) {
        debug!(id = %raw.id, %publish_at, "skipping post, release time in the future");
        return None;
    }

    let status = raw.status.as_deref().map(PostStatus::from_store)?;
    let post_type = raw
        .type_tag
        .as_deref()
        .map(PostType::from_tag)
        .unwrap_or(PostType::Text);

    Some(Post {
        id: raw.id,
        title: raw.title,
        body: raw.body,
        post_type,
        image_url: raw.image_url,
        poll_question: raw.poll_question,
        poll_options: raw.poll_options,
        channel: raw.channel,
        publish_at,
        status,
    })
}
