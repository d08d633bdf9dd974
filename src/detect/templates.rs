//! Reply texts.

use super::TemplateChooser;
use super::ordinal::superscript_ordinal;

/// Emoji appended to a cake day wish.
pub const WISH_EMOJIS: &[&str] = &["😄", "😃", "🍰"];

/// Replies to a thank-you.
pub const ACKNOWLEDGMENTS: &[&str] = &[
    "You're welcome! See you next year! 😄",
    "You're welcome! 🙂 Have a great day!",
    "You're welcome! May the karma gods shine favourably upon you ✨",
];

/// Builds the wish for an account turning `age` years old.
pub fn wish_text(age: u32, chooser: &dyn TemplateChooser) -> String {
    let emoji = WISH_EMOJIS[chooser.choose(WISH_EMOJIS.len())];
    format!("Happy {} cake day! {}", superscript_ordinal(age), emoji)
}

/// Picks an acknowledgment for a thank-you reply.
pub fn acknowledgment_text(chooser: &dyn TemplateChooser) -> &'static str {
    ACKNOWLEDGMENTS[chooser.choose(ACKNOWLEDGMENTS.len())]
}
