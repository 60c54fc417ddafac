//! Author activity over sliding windows
//!
//! Counts what the author created in the last 10 and 60 minutes, both on the
//! surface under evaluation and across the whole primary-content portfolio.
//! Counts include the piece being evaluated when its row is already committed,
//! which is exactly the perspective the flood thresholds are tuned for.

use super::{ContentProvider, ContentType, ModerationError};
use chrono::{Duration, NaiveDateTime};
use futures::future::{try_join, try_join_all};
use serde::{Deserialize, Serialize};

/// Creation counts for one author at one instant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivitySignals {
    /// Rows of the evaluated surface created in the last 10 minutes
    pub same_surface_last_10m: u64,
    pub same_surface_last_60m: u64,
    /// Rows across all primary surfaces; mirrors same_surface for interactions
    pub portfolio_last_10m: u64,
    pub portfolio_last_60m: u64,
}

/// Gather all four counts concurrently.
///
/// Authorless content (imports, system posts) produces zero counts rather
/// than an error; the text rules still apply to it.
pub(crate) async fn collect_activity_signals(
    content: &dyn ContentProvider,
    content_type: ContentType,
    actor_user_id: Option<i32>,
    now: NaiveDateTime,
) -> Result<ActivitySignals, ModerationError> {
    let actor = match actor_user_id {
        Some(id) => id,
        None => return Ok(ActivitySignals::default()),
    };
    let since_10m = now - Duration::minutes(10);
    let since_60m = now - Duration::minutes(60);

    if content_type.is_interaction() {
        // Interactions count only their own surface; portfolio tracking is a
        // primary-content concept.
        let (last_10m, last_60m) = futures::try_join!(
            content.count_created_since(content_type, actor, since_10m),
            content.count_created_since(content_type, actor, since_60m),
        )?;
        return Ok(ActivitySignals {
            same_surface_last_10m: last_10m,
            same_surface_last_60m: last_60m,
            portfolio_last_10m: last_10m,
            portfolio_last_60m: last_60m,
        });
    }

    let same_surface = try_join(
        content.count_created_since(content_type, actor, since_10m),
        content.count_created_since(content_type, actor, since_60m),
    );
    let portfolio_10m = try_join_all(
        ContentType::BASE
            .iter()
            .map(|surface| content.count_created_since(*surface, actor, since_10m)),
    );
    let portfolio_60m = try_join_all(
        ContentType::BASE
            .iter()
            .map(|surface| content.count_created_since(*surface, actor, since_60m)),
    );
    let ((same_10m, same_60m), portfolio_10m, portfolio_60m) =
        futures::try_join!(same_surface, portfolio_10m, portfolio_60m)?;

    Ok(ActivitySignals {
        same_surface_last_10m: same_10m,
        same_surface_last_60m: same_60m,
        portfolio_last_10m: portfolio_10m.into_iter().sum(),
        portfolio_last_60m: portfolio_60m.into_iter().sum(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moderation::memory::MemoryContentProvider;
    use chrono::Utc;

    #[tokio::test]
    async fn missing_author_yields_zeroes() {
        let content = MemoryContentProvider::new();
        let now = Utc::now().naive_utc();
        let signals = collect_activity_signals(&content, ContentType::Article, None, now)
            .await
            .unwrap();
        assert_eq!(signals, ActivitySignals::default());
    }

    #[tokio::test]
    async fn windows_are_strictly_after_the_boundary() {
        let content = MemoryContentProvider::new();
        let now = Utc::now().naive_utc();

        // Two recent articles, one older than 10m, one older than 60m
        content.record_creation(ContentType::Article, 7, now - Duration::minutes(1));
        content.record_creation(ContentType::Article, 7, now - Duration::minutes(9));
        content.record_creation(ContentType::Article, 7, now - Duration::minutes(30));
        content.record_creation(ContentType::Article, 7, now - Duration::minutes(90));

        let signals = collect_activity_signals(&content, ContentType::Article, Some(7), now)
            .await
            .unwrap();
        assert_eq!(signals.same_surface_last_10m, 2);
        assert_eq!(signals.same_surface_last_60m, 3);
    }

    #[tokio::test]
    async fn portfolio_sums_primary_surfaces() {
        let content = MemoryContentProvider::new();
        let now = Utc::now().naive_utc();

        content.record_creation(ContentType::Article, 7, now - Duration::minutes(2));
        content.record_creation(ContentType::Video, 7, now - Duration::minutes(3));
        content.record_creation(ContentType::Book, 7, now - Duration::minutes(4));
        // Interactions never count toward the portfolio
        content.record_creation(ContentType::Comment, 7, now - Duration::minutes(1));
        // A different author entirely
        content.record_creation(ContentType::Article, 8, now - Duration::minutes(1));

        let signals = collect_activity_signals(&content, ContentType::Article, Some(7), now)
            .await
            .unwrap();
        assert_eq!(signals.same_surface_last_10m, 1);
        assert_eq!(signals.portfolio_last_10m, 3);
        assert_eq!(signals.portfolio_last_60m, 3);
    }

    #[tokio::test]
    async fn interactions_mirror_same_surface_into_portfolio() {
        let content = MemoryContentProvider::new();
        let now = Utc::now().naive_utc();

        for minutes in 1..=9 {
            content.record_creation(ContentType::Comment, 7, now - Duration::minutes(minutes));
        }
        content.record_creation(ContentType::Article, 7, now - Duration::minutes(2));

        let signals = collect_activity_signals(&content, ContentType::Comment, Some(7), now)
            .await
            .unwrap();
        assert_eq!(signals.same_surface_last_10m, 9);
        // The article is ignored: comment evaluations look at comments only
        assert_eq!(signals.portfolio_last_10m, 9);
        assert_eq!(signals.portfolio_last_60m, 9);
    }
}
