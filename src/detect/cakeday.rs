//! Cake day wishes.
//!
//! An author gets a wish when all of these hold:
//!
//! 1. No wish has been recorded for them this year
//! 2. The account is at least one calendar year old
//! 3. Today's UTC date is the anniversary of the account's creation date
//!
//! The wish is recorded only after the reply succeeds, so redelivery of the
//! same post after a successful wish is a no-op. A crash between the reply
//! and the record can produce a duplicate wish on redelivery; nothing can
//! produce a third.

use chrono::{DateTime, Datelike, Utc};
use tracing::{debug, info, instrument};

use super::templates::wish_text;
use super::{DetectorContext, Result};
use crate::source::ContentSource;
use crate::store::UserAnniversaryRecord;
use crate::types::{Post, ReplyRef, Username};

/// Why no wish was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CakedaySkip {
    /// A wish for this year is already recorded.
    AlreadyWished,

    /// The account was created this year (or, with a skewed clock, later).
    FirstYear,

    /// Today is not the account's anniversary.
    NotAnniversary,
}

/// Result of considering one post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CakedayOutcome {
    Skipped(CakedaySkip),
    Wished { age: u32, reply: ReplyRef },
}

/// Decides whether `record`'s owner should be wished at `now`.
///
/// Returns the age in years to congratulate, or the reason not to.
pub fn assess_cakeday(
    record: &UserAnniversaryRecord,
    now: DateTime<Utc>,
) -> std::result::Result<u32, CakedaySkip> {
    let year = now.year();

    if record.has_wished(year) {
        return Err(CakedaySkip::AlreadyWished);
    }

    let created_year = record.creation_year();
    if created_year >= year {
        return Err(CakedaySkip::FirstYear);
    }

    if record.anniversary_in(year) != Some(now.date_naive()) {
        return Err(CakedaySkip::NotAnniversary);
    }

    Ok((year - created_year) as u32)
}

/// Wishes `author` a happy cake day in reply to `post` if today is the day.
///
/// # Errors
///
/// - Store errors, including `DataInconsistency` when `created_at` disagrees
///   with the stored creation time
/// - Posting failures; the wish is then not recorded
#[instrument(skip(ctx, source, post), fields(post = %post.id, user = %author))]
pub async fn consider_cakeday<S: ContentSource>(
    ctx: &DetectorContext,
    source: &S,
    post: &Post,
    author: &Username,
    created_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<CakedayOutcome> {
    let record = ctx.store.get_or_create(author, created_at)?;

    let age = match assess_cakeday(&record, now) {
        Ok(age) => age,
        Err(skip) => {
            if skip == CakedaySkip::AlreadyWished {
                debug!(year = now.year(), "Already wished this year");
            }
            return Ok(CakedayOutcome::Skipped(skip));
        }
    };

    info!(created_at = %record.created_at, age, "Found cake day for {}", author);

    let text = wish_text(age, ctx.chooser.as_ref());
    let reply = source.reply(post, &text).await?;
    ctx.store.record_wish(author, now.year())?;

    info!("Link: {}", reply.url());
    Ok(CakedayOutcome::Wished { age, reply })
}
