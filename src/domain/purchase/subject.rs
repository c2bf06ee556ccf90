//! What a transaction pays for.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::entitlement::SubscriptionPlan;
use crate::domain::foundation::MovieId;

/// Kind of thing being purchased.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectType {
    Movie,
    Subscription,
}

impl SubjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubjectType::Movie => "movie",
            SubjectType::Subscription => "subscription",
        }
    }
}

impl fmt::Display for SubjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The purchased item: one movie, or one subscription plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "subjectType", content = "subjectId", rename_all = "lowercase")]
pub enum PurchaseSubject {
    Movie(MovieId),
    Subscription(SubscriptionPlan),
}

impl PurchaseSubject {
    pub fn subject_type(&self) -> SubjectType {
        match self {
            PurchaseSubject::Movie(_) => SubjectType::Movie,
            PurchaseSubject::Subscription(_) => SubjectType::Subscription,
        }
    }

    /// Movie id or plan name, as persisted in the `subject_id` column.
    pub fn subject_id(&self) -> String {
        match self {
            PurchaseSubject::Movie(id) => id.to_string(),
            PurchaseSubject::Subscription(plan) => plan.as_str().to_string(),
        }
    }

    pub fn movie_id(&self) -> Option<MovieId> {
        match self {
            PurchaseSubject::Movie(id) => Some(*id),
            PurchaseSubject::Subscription(_) => None,
        }
    }

    pub fn plan(&self) -> Option<SubscriptionPlan> {
        match self {
            PurchaseSubject::Movie(_) => None,
            PurchaseSubject::Subscription(plan) => Some(*plan),
        }
    }
}

impl fmt::Display for PurchaseSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.subject_type(), self.subject_id())
    }
}
