//! Weighted engagement scoring.

/// Likes at or above this count make a post a "hit" on the dashboard.
/// A display threshold only; unrelated to the weighted score.
pub const HIT_LIKES_THRESHOLD: i64 = 100;

/// Weights applied to raw engagement counts. Comments and shares are
/// weighted higher than likes because they signal deeper engagement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreWeights {
    pub likes: i64,
    pub comments: i64,
    pub shares: i64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            likes: 1,
            comments: 2,
            shares: 3,
        }
    }
}

impl ScoreWeights {
    pub fn score(&self, likes: i64, comments: i64, shares: i64) -> i64 {
        likes * self.likes + comments * self.comments + shares * self.shares
    }
}

/// Score with the default weights: `likes + 2*comments + 3*shares`.
pub fn engagement_score(likes: i64, comments: i64, shares: i64) -> i64 {
    ScoreWeights::default().score(likes, comments, shares)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_formula() {
        assert_eq!(engagement_score(0, 0, 0), 0);
        assert_eq!(engagement_score(10, 5, 2), 10 + 10 + 6);
        assert_eq!(engagement_score(1, 0, 0), 1);
        assert_eq!(engagement_score(0, 1, 0), 2);
        assert_eq!(engagement_score(0, 0, 1), 3);
    }

    #[test]
    fn monotonic_in_each_argument() {
        let base = engagement_score(4, 4, 4);
        assert!(engagement_score(5, 4, 4) > base);
        assert!(engagement_score(4, 5, 4) > base);
        assert!(engagement_score(4, 4, 5) > base);
    }

    #[test]
    fn custom_weights_override_defaults() {
        let weights = ScoreWeights {
            likes: 1,
            comments: 4,
            shares: 6,
        };
        assert_eq!(weights.score(1, 1, 1), 11);
    }
}
