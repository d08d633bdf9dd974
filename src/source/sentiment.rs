//! VADER sentiment scoring.
//!
//! The thank-you threshold (`positive > 0.4`, `negative == 0`) is calibrated
//! against VADER's proportions, so production scoring goes through the
//! `vader_sentiment` analyzer rather than a home-grown lexicon.

use vader_sentiment::SentimentIntensityAnalyzer;

use crate::types::Polarity;

use super::SentimentScorer;

/// [`SentimentScorer`] backed by the VADER lexicon and rules.
pub struct VaderScorer {
    analyzer: SentimentIntensityAnalyzer<'static>,
}

impl VaderScorer {
    pub fn new() -> Self {
        VaderScorer {
            analyzer: SentimentIntensityAnalyzer::new(),
        }
    }
}

impl Default for VaderScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for VaderScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaderScorer").finish_non_exhaustive()
    }
}

impl SentimentScorer for VaderScorer {
    fn polarity(&self, text: &str) -> Polarity {
        let scores = self.analyzer.polarity_scores(text);
        let score = |key: &str| scores.get(key).copied().unwrap_or(0.0);

        Polarity {
            positive: score("pos"),
            negative: score("neg"),
            neutral: score("neu"),
            compound: score("compound"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(text: &str) -> Polarity {
        VaderScorer::new().polarity(text)
    }

    #[test]
    fn plain_thanks_is_fully_positive() {
        let p = score("Thanks!");
        assert_eq!(p.positive, 1.0);
        assert_eq!(p.negative, 0.0);
        assert!(p.compound > 0.0);
    }

    #[test]
    fn everyday_thank_yous_clear_threshold() {
        for text in [
            "Thanks a lot, that made me smile",
            "thank you kindly friend",
            "Thank you! Cheers :)",
        ] {
            let p = score(text);
            assert!(p.positive > 0.4, "{text:?}: positive = {}", p.positive);
            assert_eq!(p.negative, 0.0, "{text:?}");
        }
    }

    #[test]
    fn any_negative_word_registers() {
        let p = score("thanks but this bot is stupid");
        assert!(p.negative > 0.0);
    }

    #[test]
    fn negation_flips_valence() {
        let p = score("not happy");
        assert!(p.compound < 0.0);
    }

    #[test]
    fn proportions_sum_to_one() {
        let p = score("thanks, that is a nice but sad day");
        let sum = p.positive + p.negative + p.neutral;
        assert!((sum - 1.0).abs() < 0.01, "sum = {sum}");
    }
}
