use arena_core::repository::InteractionRepository;
use arena_core::{CoreError, CoreResult};
use arena_interaction::{
    Actor, Aggregator, DedupGuard, Interaction, InteractionDetail, InteractionError, InteractionKind,
    InteractionSummary, ReviewBody,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

use crate::{is_foreign_key_violation, is_unique_violation, storage};

pub struct PgInteractionRepository {
    pool: PgPool,
}

impl PgInteractionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const INTERACTION_SELECT: &str = r#"
    SELECT i.id, i.listing_id, i.kind, i.user_id, i.ip_address, i.created_at, r.message, r.score
    FROM interactions i
    LEFT JOIN reviews r ON r.interaction_id = i.id
"#;

#[derive(sqlx::FromRow)]
struct InteractionRow {
    id: Uuid,
    listing_id: i64,
    kind: String,
    user_id: Option<Uuid>,
    ip_address: Option<String>,
    created_at: DateTime<Utc>,
    message: Option<String>,
    score: Option<i16>,
}

impl InteractionRow {
    fn into_interaction(self) -> anyhow::Result<Interaction> {
        let actor = match (self.user_id, self.ip_address) {
            (Some(user_id), _) => Actor::User(user_id),
            (None, Some(ip)) => Actor::Address(ip.parse()?),
            (None, None) => anyhow::bail!("interaction {} has no actor", self.id),
        };

        let detail = match InteractionKind::parse(&self.kind) {
            Some(InteractionKind::Vote) => InteractionDetail::Vote,
            Some(InteractionKind::Click) => InteractionDetail::Click,
            Some(InteractionKind::Review) => match (self.message, self.score) {
                (Some(message), Some(score)) => InteractionDetail::Review(ReviewBody { message, score }),
                _ => anyhow::bail!("review {} has no body", self.id),
            },
            None => anyhow::bail!("interaction {} has unknown kind '{}'", self.id, self.kind),
        };

        Ok(Interaction {
            id: self.id,
            listing_id: self.listing_id,
            actor,
            detail,
            created_at: self.created_at,
        })
    }
}

/// Per-listing counts over `($1, $2]` plus all-time review statistics.
/// Review messages are never read here.
const SUMMARY_SELECT: &str = r#"
    SELECT i.listing_id,
           COUNT(*) FILTER (WHERE i.kind = 'vote' AND i.created_at > $1 AND i.created_at <= $2) AS votes_count,
           COUNT(*) FILTER (WHERE i.kind = 'click' AND i.created_at > $1 AND i.created_at <= $2) AS clicks_count,
           COUNT(r.score) AS reviews_count,
           AVG(r.score)::FLOAT8 AS average_score
    FROM interactions i
    LEFT JOIN reviews r ON r.interaction_id = i.id
    WHERE (i.kind = 'review' OR (i.created_at > $1 AND i.created_at <= $2))
"#;

#[derive(sqlx::FromRow)]
struct SummaryRow {
    listing_id: i64,
    votes_count: i64,
    clicks_count: i64,
    reviews_count: i64,
    average_score: Option<f64>,
}

impl From<SummaryRow> for InteractionSummary {
    fn from(row: SummaryRow) -> Self {
        InteractionSummary {
            listing_id: row.listing_id,
            votes_count: row.votes_count.max(0) as u64,
            clicks_count: row.clicks_count.max(0) as u64,
            reviews_count: row.reviews_count.max(0) as u64,
            average_score: row.average_score.filter(|_| row.reviews_count > 0),
        }
    }
}

fn into_interactions(rows: Vec<InteractionRow>) -> CoreResult<Vec<Interaction>> {
    rows.into_iter()
        .map(|row| row.into_interaction().map_err(CoreError::Storage))
        .collect()
}

/// `(user_id, ip_address)` column values; exactly one is set.
fn actor_columns(actor: &Actor) -> (Option<Uuid>, Option<String>) {
    (actor.user_id(), actor.address().map(|ip| ip.to_string()))
}

/// Serializes writers on one (listing, actor) pair until the transaction ends.
async fn lock_pair(conn: &mut PgConnection, listing_id: i64, actor: &Actor) -> CoreResult<()> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, $2))")
        .bind(actor.to_string())
        .bind(listing_id)
        .execute(&mut *conn)
        .await
        .map_err(storage)?;
    Ok(())
}

async fn insert(conn: &mut PgConnection, interaction: &Interaction) -> CoreResult<()> {
    let (user_id, ip_address) = actor_columns(&interaction.actor);

    let inserted = sqlx::query(
        "INSERT INTO interactions (id, listing_id, kind, user_id, ip_address, created_at) VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(interaction.id)
    .bind(interaction.listing_id)
    .bind(interaction.kind().as_str())
    .bind(user_id)
    .bind(ip_address)
    .bind(interaction.created_at)
    .execute(&mut *conn)
    .await;

    match inserted {
        Err(e) if is_foreign_key_violation(&e) => {
            return Err(CoreError::NotFound(format!("listing {}", interaction.listing_id)));
        }
        // Only the review author index is unique besides the primary key.
        Err(e) if is_unique_violation(&e) => {
            return Err(InteractionError::Duplicate {
                kind: interaction.kind(),
                listing_id: interaction.listing_id,
                actor: interaction.actor,
            }
            .into());
        }
        Err(e) => return Err(storage(e)),
        Ok(_) => {}
    }

    if let Some(body) = interaction.review_body() {
        sqlx::query("INSERT INTO reviews (interaction_id, message, score) VALUES ($1, $2, $3)")
            .bind(interaction.id)
            .bind(&body.message)
            .bind(body.score)
            .execute(&mut *conn)
            .await
            .map_err(storage)?;
    }

    Ok(())
}

#[async_trait]
impl InteractionRepository for PgInteractionRepository {
    async fn record_vote(
        &self,
        listing_id: i64,
        actor: Actor,
        guard: &DedupGuard,
        now: DateTime<Utc>,
    ) -> CoreResult<Interaction> {
        let mut tx = self.pool.begin().await.map_err(storage)?;
        lock_pair(&mut tx, listing_id, &actor).await?;

        let (user_id, ip_address) = actor_columns(&actor);
        let sql = format!(
            "{INTERACTION_SELECT} WHERE i.listing_id = $1 AND i.kind = 'vote' \
             AND i.user_id IS NOT DISTINCT FROM $2 AND i.ip_address IS NOT DISTINCT FROM $3 \
             AND i.created_at > $4"
        );
        let rows = sqlx::query_as::<_, InteractionRow>(&sql)
            .bind(listing_id)
            .bind(user_id)
            .bind(ip_address)
            .bind(guard.cooldown_start(now))
            .fetch_all(&mut *tx)
            .await
            .map_err(storage)?;

        guard.check_vote(listing_id, &actor, &into_interactions(rows)?, now)?;

        let vote = Interaction::vote(listing_id, actor, now);
        insert(&mut tx, &vote).await?;
        tx.commit().await.map_err(storage)?;

        debug!(listing_id, %actor, "vote stored");
        Ok(vote)
    }

    async fn record_click(&self, listing_id: i64, actor: Actor, now: DateTime<Utc>) -> CoreResult<Interaction> {
        let mut conn = self.pool.acquire().await.map_err(storage)?;
        let click = Interaction::click(listing_id, actor, now);
        insert(&mut conn, &click).await?;
        Ok(click)
    }

    async fn publish_review(
        &self,
        listing_id: i64,
        user_id: Uuid,
        body: ReviewBody,
        guard: &DedupGuard,
        now: DateTime<Utc>,
    ) -> CoreResult<Interaction> {
        let actor = Actor::User(user_id);
        let mut tx = self.pool.begin().await.map_err(storage)?;
        lock_pair(&mut tx, listing_id, &actor).await?;

        let sql = format!("{INTERACTION_SELECT} WHERE i.listing_id = $1 AND i.kind = 'review' AND i.user_id = $2");
        let rows = sqlx::query_as::<_, InteractionRow>(&sql)
            .bind(listing_id)
            .bind(user_id)
            .fetch_all(&mut *tx)
            .await
            .map_err(storage)?;

        guard.check_review(listing_id, user_id, &into_interactions(rows)?)?;

        let review = Interaction::review(listing_id, user_id, body, now);
        insert(&mut tx, &review).await?;
        tx.commit().await.map_err(storage)?;

        debug!(listing_id, %user_id, "review stored");
        Ok(review)
    }

    async fn find_review(&self, review_id: Uuid) -> CoreResult<Option<Interaction>> {
        let sql = format!("{INTERACTION_SELECT} WHERE i.id = $1 AND i.kind = 'review'");
        let row = sqlx::query_as::<_, InteractionRow>(&sql)
            .bind(review_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;

        row.map(|r| r.into_interaction().map_err(CoreError::Storage)).transpose()
    }

    async fn update_review(&self, review_id: Uuid, body: &ReviewBody) -> CoreResult<Interaction> {
        let done = sqlx::query("UPDATE reviews SET message = $1, score = $2 WHERE interaction_id = $3")
            .bind(&body.message)
            .bind(body.score)
            .bind(review_id)
            .execute(&self.pool)
            .await
            .map_err(storage)?;

        if done.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("review {review_id}")));
        }

        self.find_review(review_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("review {review_id}")))
    }

    async fn delete_review(&self, review_id: Uuid) -> CoreResult<()> {
        let done = sqlx::query("DELETE FROM interactions WHERE id = $1 AND kind = 'review'")
            .bind(review_id)
            .execute(&self.pool)
            .await
            .map_err(storage)?;

        if done.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("review {review_id}")));
        }
        Ok(())
    }

    async fn list_reviews(&self, listing_id: i64) -> CoreResult<Vec<Interaction>> {
        let sql = format!(
            "{INTERACTION_SELECT} WHERE i.listing_id = $1 AND i.kind = 'review' ORDER BY i.created_at DESC"
        );
        let rows = sqlx::query_as::<_, InteractionRow>(&sql)
            .bind(listing_id)
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;

        into_interactions(rows)
    }

    async fn summarize_listing(
        &self,
        listing_id: i64,
        aggregator: &Aggregator,
        now: DateTime<Utc>,
    ) -> CoreResult<InteractionSummary> {
        let sql = format!("{SUMMARY_SELECT} AND i.listing_id = $3 GROUP BY i.listing_id");
        let row = sqlx::query_as::<_, SummaryRow>(&sql)
            .bind(aggregator.cutoff(now))
            .bind(now)
            .bind(listing_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;

        Ok(row
            .map(InteractionSummary::from)
            .unwrap_or_else(|| InteractionSummary::empty(listing_id)))
    }

    async fn summarize_all(
        &self,
        aggregator: &Aggregator,
        now: DateTime<Utc>,
    ) -> CoreResult<HashMap<i64, InteractionSummary>> {
        let sql = format!("{SUMMARY_SELECT} GROUP BY i.listing_id");
        let rows = sqlx::query_as::<_, SummaryRow>(&sql)
            .bind(aggregator.cutoff(now))
            .bind(now)
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;

        Ok(rows
            .into_iter()
            .map(|row| (row.listing_id, InteractionSummary::from(row)))
            .collect())
    }
}
