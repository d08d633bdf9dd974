//! Acknowledging thank-you replies to our wishes.
//!
//! A reply is acknowledged when it closes the triangle
//! `user post -> bot wish -> user thank-you` on the user's cake day, reads as
//! an unambiguously positive thank-you, and has not been answered by the bot
//! already. Checks run cheapest first; the parent, grandparent and reply
//! lookups each cost a request.

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, trace};

use super::templates::acknowledgment_text;
use super::{DetectorContext, Result};
use crate::source::ContentSource;
use crate::types::{Polarity, Post, ReplyRef, Username};

/// Minimum positive proportion for a thank-you to count.
pub const POSITIVE_THRESHOLD: f64 = 0.4;

/// Why a post was not acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThanksSkip {
    /// It is not the author's cake day (any more).
    NotCakeday,

    /// Submissions can't be replies to a wish.
    NotComment,

    /// The text doesn't contain "thank".
    NoThanks,

    /// Sentiment is not clearly positive, or has any negativity.
    NotPositive,

    /// The parent wasn't written by the bot.
    ParentNotBot,

    /// The bot's comment wasn't a reply to this same author.
    NotOwnThread,

    /// The bot already replied to this post.
    AlreadyAcknowledged,
}

/// Result of considering one post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThanksOutcome {
    Skipped(ThanksSkip),
    Acknowledged { reply: ReplyRef },
}

/// Returns true if `body` contains "thank" in any case.
pub fn mentions_thanks(body: &str) -> bool {
    body.to_lowercase().contains("thank")
}

/// Returns true if `polarity` is positive enough and free of negativity.
pub fn is_grateful(polarity: &Polarity) -> bool {
    polarity.positive > POSITIVE_THRESHOLD && polarity.negative == 0.0
}

fn authored_by(post: &Post, user: &Username) -> bool {
    post.author
        .as_ref()
        .is_some_and(|author| author.same_account(user))
}

/// Replies to `post` with an acknowledgment if it thanks the bot for a wish.
///
/// # Errors
///
/// - Store errors, including `DataInconsistency` when `created_at` disagrees
///   with the stored creation time
/// - Lookup or posting failures from the source
#[instrument(skip(ctx, source, post), fields(post = %post.id, user = %author))]
pub async fn consider_thanks<S: ContentSource>(
    ctx: &DetectorContext,
    source: &S,
    post: &Post,
    author: &Username,
    created_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<ThanksOutcome> {
    let skip = |reason: ThanksSkip| -> Result<ThanksOutcome> {
        trace!(?reason, "Not a thank-you");
        Ok(ThanksOutcome::Skipped(reason))
    };

    let record = ctx.store.get_or_create(author, created_at)?;
    if !record.is_cakeday(now.date_naive()) {
        return skip(ThanksSkip::NotCakeday);
    }

    if !post.is_comment() {
        return skip(ThanksSkip::NotComment);
    }

    if !mentions_thanks(&post.body) {
        return skip(ThanksSkip::NoThanks);
    }

    let polarity = ctx.sentiment.polarity(&post.body);
    if !is_grateful(&polarity) {
        debug!(
            positive = polarity.positive,
            negative = polarity.negative,
            "Thank-you not positive enough"
        );
        return skip(ThanksSkip::NotPositive);
    }

    let Some(parent) = source.parent(post).await? else {
        return skip(ThanksSkip::ParentNotBot);
    };
    if !authored_by(&parent, &ctx.bot) {
        return skip(ThanksSkip::ParentNotBot);
    }

    let Some(grandparent) = source.parent(&parent).await? else {
        return skip(ThanksSkip::NotOwnThread);
    };
    if !authored_by(&grandparent, author) {
        return skip(ThanksSkip::NotOwnThread);
    }

    let replies = source.replies(post).await?;
    if replies.iter().any(|reply| authored_by(reply, &ctx.bot)) {
        debug!("Thank-you already acknowledged");
        return skip(ThanksSkip::AlreadyAcknowledged);
    }

    info!("Replying to thank you message from {}", author);
    let text = acknowledgment_text(ctx.chooser.as_ref());
    let reply = source.reply(post, text).await?;

    info!("Link: {}", reply.url());
    Ok(ThanksOutcome::Acknowledged { reply })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::DetectError;
    use crate::source::SentimentScorer;
    use crate::store::RecordStore;
    use crate::test_utils::{FakeSource, FixedChooser, FixedScorer, comment, submission, utc};
    use crate::types::PostId;
    use std::sync::Arc;
    use tempfile::{TempDir, tempdir};

    const CREATED: (i32, u32, u32) = (2015, 3, 14);

    fn created() -> DateTime<Utc> {
        utc(CREATED.0, CREATED.1, CREATED.2, 10, 0)
    }

    fn now() -> DateTime<Utc> {
        utc(2024, 3, 14, 12, 0)
    }

    fn context(scorer: impl SentimentScorer + 'static) -> (DetectorContext, TempDir) {
        let dir = tempdir().unwrap();
        let store = RecordStore::open(dir.path().join("cakedays.json")).unwrap();
        let ctx = DetectorContext::new(
            Arc::new(store),
            Arc::new(scorer),
            Arc::new(FixedChooser(0)),
            Username::from("CaDaBot"),
        );
        (ctx, dir)
    }

    fn grateful() -> FixedScorer {
        FixedScorer::new(0.6, 0.0)
    }

    /// alice posts t3_post, the bot wishes her in t1_wish, she replies t1_thanks.
    fn conversation(source: &FakeSource, body: &str) -> Post {
        source.add_post(submission("t3_post", "alice", utc(2024, 3, 14, 9, 0)));
        source.add_post(comment(
            "t1_wish",
            "CaDaBot",
            utc(2024, 3, 14, 9, 5),
            "Happy 9^th cake day! 😄",
            "t3_post",
            "t3_post",
        ));
        let thanks = comment(
            "t1_thanks",
            "alice",
            utc(2024, 3, 14, 11, 0),
            body,
            "t1_wish",
            "t3_post",
        );
        source.add_post(thanks.clone());
        thanks
    }

    async fn consider(ctx: &DetectorContext, source: &FakeSource, post: &Post) -> ThanksOutcome {
        consider_thanks(ctx, source, post, &Username::from("alice"), created(), now())
            .await
            .unwrap()
    }

    #[test]
    fn thanks_matches_any_case() {
        assert!(mentions_thanks("Thanks!"));
        assert!(mentions_thanks("THANK YOU"));
        assert!(mentions_thanks("thank you so much"));
        assert!(!mentions_thanks("cheers mate"));
    }

    #[test]
    fn gratitude_requires_positive_and_no_negative() {
        assert!(is_grateful(&FixedScorer::new(0.6, 0.0).0));
        assert!(!is_grateful(&FixedScorer::new(0.4, 0.0).0));
        assert!(!is_grateful(&FixedScorer::new(0.9, 0.01).0));
    }

    #[tokio::test]
    async fn acknowledges_exactly_once() {
        let (ctx, _dir) = context(grateful());
        let source = FakeSource::new("cakeday");
        let post = conversation(&source, "thank you so much");

        let first = consider(&ctx, &source, &post).await;
        let second = consider(&ctx, &source, &post).await;

        assert!(matches!(first, ThanksOutcome::Acknowledged { .. }));
        assert_eq!(
            second,
            ThanksOutcome::Skipped(ThanksSkip::AlreadyAcknowledged)
        );
        assert_eq!(
            source.sent(),
            vec![(
                PostId::from("t1_thanks"),
                "You're welcome! See you next year! 😄".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn acknowledges_with_vader_scorer() {
        let (ctx, _dir) = context(crate::source::VaderScorer::new());
        let source = FakeSource::new("cakeday");
        let post = conversation(&source, "Thanks!");

        let outcome = consider(&ctx, &source, &post).await;
        assert!(matches!(outcome, ThanksOutcome::Acknowledged { .. }));
    }

    #[tokio::test]
    async fn skipped_when_not_cakeday() {
        let (ctx, _dir) = context(grateful());
        let source = FakeSource::new("cakeday");
        let post = conversation(&source, "thank you so much");

        let outcome = consider_thanks(
            &ctx,
            &source,
            &post,
            &Username::from("alice"),
            created(),
            utc(2024, 3, 15, 0, 30),
        )
        .await
        .unwrap();

        assert_eq!(outcome, ThanksOutcome::Skipped(ThanksSkip::NotCakeday));
        assert!(source.sent().is_empty());
    }

    #[tokio::test]
    async fn skipped_for_submissions() {
        let (ctx, _dir) = context(grateful());
        let source = FakeSource::new("cakeday");
        let mut post = submission("t3_other", "alice", utc(2024, 3, 14, 11, 0));
        post.body = "thank you all".to_string();

        assert_eq!(
            consider(&ctx, &source, &post).await,
            ThanksOutcome::Skipped(ThanksSkip::NotComment)
        );
    }

    #[tokio::test]
    async fn skipped_without_thanks() {
        let (ctx, _dir) = context(grateful());
        let source = FakeSource::new("cakeday");
        let post = conversation(&source, "much appreciated");

        assert_eq!(
            consider(&ctx, &source, &post).await,
            ThanksOutcome::Skipped(ThanksSkip::NoThanks)
        );
    }

    #[tokio::test]
    async fn skipped_when_positive_is_exactly_threshold() {
        let (ctx, _dir) = context(FixedScorer::new(POSITIVE_THRESHOLD, 0.0));
        let source = FakeSource::new("cakeday");
        let post = conversation(&source, "thank you so much");

        assert_eq!(
            consider(&ctx, &source, &post).await,
            ThanksOutcome::Skipped(ThanksSkip::NotPositive)
        );
        assert!(source.sent().is_empty());
    }

    #[tokio::test]
    async fn skipped_with_any_negativity() {
        let (ctx, _dir) = context(FixedScorer::new(0.7, 0.05));
        let source = FakeSource::new("cakeday");
        let post = conversation(&source, "thanks I guess");

        assert_eq!(
            consider(&ctx, &source, &post).await,
            ThanksOutcome::Skipped(ThanksSkip::NotPositive)
        );
    }

    #[tokio::test]
    async fn skipped_when_parent_is_not_bot() {
        let (ctx, _dir) = context(grateful());
        let source = FakeSource::new("cakeday");
        source.add_post(submission("t3_post", "alice", utc(2024, 3, 14, 9, 0)));
        source.add_post(comment(
            "t1_wish",
            "carol",
            utc(2024, 3, 14, 9, 5),
            "happy cake day",
            "t3_post",
            "t3_post",
        ));
        let post = comment(
            "t1_thanks",
            "alice",
            utc(2024, 3, 14, 11, 0),
            "thank you",
            "t1_wish",
            "t3_post",
        );

        assert_eq!(
            consider(&ctx, &source, &post).await,
            ThanksOutcome::Skipped(ThanksSkip::ParentNotBot)
        );
    }

    #[tokio::test]
    async fn skipped_when_bot_wished_someone_else() {
        let (ctx, _dir) = context(grateful());
        let source = FakeSource::new("cakeday");
        source.add_post(submission("t3_post", "dave", utc(2024, 3, 14, 9, 0)));
        source.add_post(comment(
            "t1_wish",
            "CaDaBot",
            utc(2024, 3, 14, 9, 5),
            "Happy 2^nd cake day! 😄",
            "t3_post",
            "t3_post",
        ));
        let post = comment(
            "t1_thanks",
            "alice",
            utc(2024, 3, 14, 11, 0),
            "thank you",
            "t1_wish",
            "t3_post",
        );

        assert_eq!(
            consider(&ctx, &source, &post).await,
            ThanksOutcome::Skipped(ThanksSkip::NotOwnThread)
        );
    }

    #[tokio::test]
    async fn bot_name_comparison_ignores_case() {
        let (ctx, _dir) = context(grateful());
        let source = FakeSource::new("cakeday");
        let post = conversation(&source, "thank you so much");
        source.add_reply(
            "t1_thanks",
            comment(
                "t1_old",
                "cadabot",
                utc(2024, 3, 14, 11, 5),
                "You're welcome!",
                "t1_thanks",
                "t3_post",
            ),
        );

        assert_eq!(
            consider(&ctx, &source, &post).await,
            ThanksOutcome::Skipped(ThanksSkip::AlreadyAcknowledged)
        );
        assert!(source.sent().is_empty());
    }

    #[tokio::test]
    async fn other_replies_do_not_block() {
        let (ctx, _dir) = context(grateful());
        let source = FakeSource::new("cakeday");
        let post = conversation(&source, "thank you so much");
        source.add_reply(
            "t1_thanks",
            comment(
                "t1_friend",
                "erin",
                utc(2024, 3, 14, 11, 5),
                "happy cake day!",
                "t1_thanks",
                "t3_post",
            ),
        );

        let outcome = consider(&ctx, &source, &post).await;
        assert!(matches!(outcome, ThanksOutcome::Acknowledged { .. }));
    }

    #[tokio::test]
    async fn failed_lookup_is_an_error() {
        let (ctx, _dir) = context(grateful());
        let source = FakeSource::new("cakeday");
        // Parent never registered with the source.
        let post = comment(
            "t1_thanks",
            "alice",
            utc(2024, 3, 14, 11, 0),
            "thank you",
            "t1_missing",
            "t3_post",
        );

        let err = consider_thanks(&ctx, &source, &post, &Username::from("alice"), created(), now())
            .await
            .unwrap_err();
        assert!(matches!(err, DetectError::Source(_)));
    }
}
