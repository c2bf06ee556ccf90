//! Catalog movie as seen by the purchase flow.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{MovieId, Money};

/// A movie listing. Only the fields the paywall needs are modelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    pub fee: Money,
}

impl Movie {
    pub fn new(id: MovieId, title: impl Into<String>, fee: Money) -> Self {
        Self {
            id,
            title: title.into(),
            fee,
        }
    }

    /// Free movies are never locked and cannot be purchased.
    pub fn is_free(&self) -> bool {
        self.fee.is_free()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_fee_movie_is_free() {
        let movie = Movie::new(MovieId::new(), "Shorts", Money::etb(0));
        assert!(movie.is_free());
    }

    #[test]
    fn paid_movie_is_not_free() {
        let movie = Movie::new(MovieId::new(), "Feature", Money::etb(999));
        assert!(!movie.is_free());
    }
}
