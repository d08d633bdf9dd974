//! Shared test fakes and builders.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use chrono::{DateTime, TimeZone, Utc};
use tokio_util::sync::CancellationToken;

use crate::clock::Clock;
use crate::detect::TemplateChooser;
use crate::source::{self, ContentSource, SentimentScorer, SourceError};
use crate::types::{
    AuthorStatus, Community, Polarity, Post, PostId, PostKind, ReplyRef, Username,
};

pub fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

pub fn submission(id: &str, author: &str, created_at: DateTime<Utc>) -> Post {
    Post {
        id: PostId::from(id),
        kind: PostKind::Submission,
        author: Some(Username::from(author)),
        created_at,
        body: String::new(),
        parent: None,
        link: PostId::from(id),
        permalink: format!("/r/test/comments/{}/", PostId::from(id).bare()),
    }
}

pub fn comment(
    id: &str,
    author: &str,
    created_at: DateTime<Utc>,
    body: &str,
    parent: &str,
    link: &str,
) -> Post {
    Post {
        id: PostId::from(id),
        kind: PostKind::Comment,
        author: Some(Username::from(author)),
        created_at,
        body: body.to_string(),
        parent: Some(PostId::from(parent)),
        link: PostId::from(link),
        permalink: format!(
            "/r/test/comments/{}/_/{}/",
            PostId::from(link).bare(),
            PostId::from(id).bare()
        ),
    }
}

/// Removes the author, as the feed reports deleted content.
pub fn deleted(mut post: Post) -> Post {
    post.author = None;
    post
}

enum ScriptedPoll {
    Items(Vec<Post>, Vec<Post>),
    Failure(String),
}

#[derive(Default)]
struct FakeState {
    polls: VecDeque<ScriptedPoll>,
    poll_count: usize,
    authors: HashMap<Username, AuthorStatus>,
    posts: HashMap<PostId, Post>,
    replies: HashMap<PostId, Vec<Post>>,
    sent: Vec<(PostId, String)>,
    next_reply: u64,
    fail_replies: bool,
    when_exhausted: Option<CancellationToken>,
}

/// Scripted [`ContentSource`].
///
/// Each poll (a submissions fetch) consumes one scripted entry; the matching
/// comments fetch returns the comments of the same entry. Once the script
/// runs out, polls return nothing and, if configured, cancel a token so
/// worker loops under test stop on their own.
pub struct FakeSource {
    community: Community,
    bot: Username,
    state: Mutex<FakeState>,
    pending_comments: Mutex<VecDeque<Vec<Post>>>,
}

impl FakeSource {
    pub fn new(community: &str) -> Self {
        FakeSource {
            community: Community::from(community),
            bot: Username::from("CaDaBot"),
            state: Mutex::new(FakeState::default()),
            pending_comments: Mutex::new(VecDeque::new()),
        }
    }

    pub fn push_poll(&self, submissions: Vec<Post>, comments: Vec<Post>) {
        let mut state = self.state.lock().unwrap();
        for post in submissions.iter().chain(comments.iter()) {
            state.posts.insert(post.id.clone(), post.clone());
        }
        state
            .polls
            .push_back(ScriptedPoll::Items(submissions, comments));
    }

    pub fn push_failure(&self, message: &str) {
        self.state
            .lock()
            .unwrap()
            .polls
            .push_back(ScriptedPoll::Failure(message.to_string()));
    }

    /// Cancels `token` on the first poll past the end of the script.
    pub fn cancel_when_exhausted(&self, token: CancellationToken) {
        self.state.lock().unwrap().when_exhausted = Some(token);
    }

    pub fn set_author(&self, name: &str, status: AuthorStatus) {
        self.state
            .lock()
            .unwrap()
            .authors
            .insert(Username::from(name), status);
    }

    pub fn set_created(&self, name: &str, created_at: DateTime<Utc>) {
        self.set_author(name, AuthorStatus::Active { created_at });
    }

    /// Registers a post for parent lookups without putting it in a feed.
    pub fn add_post(&self, post: Post) {
        self.state
            .lock()
            .unwrap()
            .posts
            .insert(post.id.clone(), post);
    }

    /// Registers an existing reply under `parent`.
    pub fn add_reply(&self, parent: &str, reply: Post) {
        let mut state = self.state.lock().unwrap();
        state.posts.insert(reply.id.clone(), reply.clone());
        state
            .replies
            .entry(PostId::from(parent))
            .or_default()
            .push(reply);
    }

    pub fn fail_replies(&self) {
        self.state.lock().unwrap().fail_replies = true;
    }

    pub fn poll_count(&self) -> usize {
        self.state.lock().unwrap().poll_count
    }

    /// Every reply posted so far, as `(target, text)`.
    pub fn sent(&self) -> Vec<(PostId, String)> {
        self.state.lock().unwrap().sent.clone()
    }
}

impl ContentSource for FakeSource {
    fn community(&self) -> &Community {
        &self.community
    }

    async fn recent_submissions(&self, _limit: usize) -> source::Result<Vec<Post>> {
        let mut state = self.state.lock().unwrap();
        state.poll_count += 1;
        let mut pending = self.pending_comments.lock().unwrap();

        match state.polls.pop_front() {
            Some(ScriptedPoll::Items(subs, comments)) => {
                pending.push_back(comments);
                Ok(subs)
            }
            Some(ScriptedPoll::Failure(message)) => Err(SourceError::Unavailable(message)),
            None => {
                if let Some(token) = &state.when_exhausted {
                    token.cancel();
                }
                pending.push_back(Vec::new());
                Ok(Vec::new())
            }
        }
    }

    async fn recent_comments(&self, _limit: usize) -> source::Result<Vec<Post>> {
        // Yield so the submissions fetch in the same poll always runs first.
        tokio::task::yield_now().await;
        let next = self.pending_comments.lock().unwrap().pop_front();
        Ok(next.unwrap_or_default())
    }

    async fn author_status(&self, author: &Username) -> source::Result<AuthorStatus> {
        let state = self.state.lock().unwrap();
        state
            .authors
            .get(author)
            .copied()
            .ok_or_else(|| SourceError::Unavailable(format!("unknown author {author}")))
    }

    async fn parent(&self, post: &Post) -> source::Result<Option<Post>> {
        let Some(parent_id) = &post.parent else {
            return Ok(None);
        };
        let state = self.state.lock().unwrap();
        state
            .posts
            .get(parent_id)
            .cloned()
            .map(Some)
            .ok_or_else(|| SourceError::Unavailable(format!("unknown post {parent_id}")))
    }

    async fn replies(&self, post: &Post) -> source::Result<Vec<Post>> {
        let state = self.state.lock().unwrap();
        Ok(state.replies.get(&post.id).cloned().unwrap_or_default())
    }

    async fn reply(&self, post: &Post, text: &str) -> source::Result<ReplyRef> {
        let mut state = self.state.lock().unwrap();
        if state.fail_replies {
            return Err(SourceError::Rejected("RATELIMIT".to_string()));
        }

        state.next_reply += 1;
        let id = PostId::new(format!("t1_reply{}", state.next_reply));
        let reply = Post {
            id: id.clone(),
            kind: PostKind::Comment,
            author: Some(self.bot.clone()),
            created_at: post.created_at,
            body: text.to_string(),
            parent: Some(post.id.clone()),
            link: post.link.clone(),
            permalink: format!(
                "/r/{}/comments/{}/_/{}/",
                self.community.as_str(),
                post.link.bare(),
                id.bare()
            ),
        };

        state.sent.push((post.id.clone(), text.to_string()));
        state.posts.insert(id.clone(), reply.clone());
        state.replies.entry(post.id.clone()).or_default().push(reply.clone());

        Ok(ReplyRef {
            id,
            permalink: reply.permalink,
        })
    }
}

/// A scorer that returns the same polarity for every text.
pub struct FixedScorer(pub Polarity);

impl FixedScorer {
    pub fn new(positive: f64, negative: f64) -> Self {
        FixedScorer(Polarity {
            positive,
            negative,
            neutral: (1.0 - positive - negative).max(0.0),
            compound: positive - negative,
        })
    }
}

impl SentimentScorer for FixedScorer {
    fn polarity(&self, _text: &str) -> Polarity {
        self.0
    }
}

/// A chooser that always picks the same index (clamped to the options).
pub struct FixedChooser(pub usize);

impl TemplateChooser for FixedChooser {
    fn choose(&self, len: usize) -> usize {
        self.0.min(len.saturating_sub(1))
    }
}

/// A clock that returns each scripted instant once, then keeps returning the
/// last one.
pub struct SteppingClock(Mutex<VecDeque<DateTime<Utc>>>);

impl SteppingClock {
    pub fn new(instants: impl IntoIterator<Item = DateTime<Utc>>) -> Self {
        SteppingClock(Mutex::new(instants.into_iter().collect()))
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Utc> {
        let mut instants = self.0.lock().unwrap();
        if instants.len() > 1 {
            instants.pop_front().unwrap()
        } else {
            *instants.front().unwrap()
        }
    }
}
