use arena_catalog::{Listing, ListingConfigs, ListingStatistics, Mode, NewListing, Tag};
use arena_core::repository::ListingRepository;
use arena_core::{CoreError, CoreResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::{is_unique_violation, storage};

pub struct PgListingRepository {
    pool: PgPool,
}

impl PgListingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_one(&self, clause: &str, key: ListingKey<'_>) -> CoreResult<Option<Listing>> {
        let sql = format!("{LISTING_SELECT} WHERE {clause} GROUP BY l.id, m.name");
        let query = sqlx::query_as::<_, ListingRow>(&sql);
        let query = match key {
            ListingKey::Id(id) => query.bind(id),
            ListingKey::Slug(slug) => query.bind(slug),
        };

        let row = query.fetch_optional(&self.pool).await.map_err(storage)?;
        row.map(Listing::try_from).transpose()
    }
}

enum ListingKey<'a> {
    Id(i64),
    Slug(&'a str),
}

// Tags are folded into one array per listing; listings without tags get '{}'.
const LISTING_SELECT: &str = r#"
    SELECT l.id, l.slug, l.name, l.website, l.description, l.banner_url, l.episode,
           l.configs, l.statistics, l.owner_id, m.name AS mode, l.created_at,
           COALESCE(array_agg(t.name ORDER BY t.name) FILTER (WHERE t.name IS NOT NULL), '{}'::text[]) AS tags
    FROM listings l
    JOIN modes m ON m.id = l.mode_id
    LEFT JOIN listing_tag lt ON lt.listing_id = l.id
    LEFT JOIN tags t ON t.id = lt.tag_id
"#;

// Internal struct for type-safe querying
#[derive(sqlx::FromRow)]
struct ListingRow {
    id: i64,
    slug: String,
    name: String,
    website: String,
    description: String,
    banner_url: Option<String>,
    episode: f64,
    configs: Json<ListingConfigs>,
    statistics: Json<ListingStatistics>,
    owner_id: Uuid,
    mode: String,
    created_at: DateTime<Utc>,
    tags: Vec<String>,
}

impl TryFrom<ListingRow> for Listing {
    type Error = CoreError;

    fn try_from(row: ListingRow) -> Result<Self, Self::Error> {
        let mode = row
            .mode
            .parse::<Mode>()
            .map_err(|e| CoreError::Storage(e.into()))?;

        Ok(Listing {
            id: row.id,
            slug: row.slug,
            name: row.name,
            website: row.website,
            description: row.description,
            banner_url: row.banner_url,
            episode: row.episode,
            configs: row.configs.0,
            statistics: row.statistics.0,
            owner_id: row.owner_id,
            mode,
            tags: row.tags.iter().map(|t| Tag::new(t)).collect(),
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl ListingRepository for PgListingRepository {
    async fn create_listing(&self, submission: NewListing) -> CoreResult<Listing> {
        let mut tx = self.pool.begin().await.map_err(storage)?;

        // The id is drawn first so the rank can be written with the row.
        let id: i64 = sqlx::query_scalar("SELECT nextval(pg_get_serial_sequence('listings', 'id'))")
            .fetch_one(&mut *tx)
            .await
            .map_err(storage)?;
        let listing = submission.into_listing(id, Utc::now());

        let inserted = sqlx::query(
            r#"
            INSERT INTO listings (id, slug, name, website, description, banner_url, episode, configs, statistics, owner_id, mode_id, created_at)
            SELECT $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, m.id, $12
            FROM modes m WHERE m.name = $11
            "#,
        )
        .bind(listing.id)
        .bind(&listing.slug)
        .bind(&listing.name)
        .bind(&listing.website)
        .bind(&listing.description)
        .bind(&listing.banner_url)
        .bind(listing.episode)
        .bind(Json(&listing.configs))
        .bind(Json(&listing.statistics))
        .bind(listing.owner_id)
        .bind(listing.mode.name())
        .bind(listing.created_at)
        .execute(&mut *tx)
        .await;

        match inserted {
            Err(e) if is_unique_violation(&e) => {
                return Err(CoreError::Conflict(format!("slug '{}' is already taken", listing.slug)));
            }
            Err(e) => return Err(storage(e)),
            Ok(done) if done.rows_affected() == 0 => {
                return Err(CoreError::Storage(anyhow::anyhow!(
                    "mode '{}' is not seeded",
                    listing.mode.name()
                )));
            }
            Ok(_) => {}
        }

        for tag in &listing.tags {
            let tag_id: i32 = sqlx::query_scalar(
                "INSERT INTO tags (name) VALUES ($1) ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name RETURNING id",
            )
            .bind(tag.as_str())
            .fetch_one(&mut *tx)
            .await
            .map_err(storage)?;

            sqlx::query("INSERT INTO listing_tag (listing_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
                .bind(listing.id)
                .bind(tag_id)
                .execute(&mut *tx)
                .await
                .map_err(storage)?;
        }

        tx.commit().await.map_err(storage)?;
        debug!(listing_id = listing.id, slug = %listing.slug, "listing stored");
        Ok(listing)
    }

    async fn find_by_slug(&self, slug: &str) -> CoreResult<Option<Listing>> {
        self.fetch_one("l.slug = $1", ListingKey::Slug(slug)).await
    }

    async fn list_listings(&self) -> CoreResult<Vec<Listing>> {
        let sql = format!("{LISTING_SELECT} GROUP BY l.id, m.name ORDER BY l.id");
        let rows = sqlx::query_as::<_, ListingRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;

        rows.into_iter().map(Listing::try_from).collect()
    }

    async fn update_configs(&self, listing_id: i64, configs: &ListingConfigs) -> CoreResult<Listing> {
        let done = sqlx::query("UPDATE listings SET configs = $1 WHERE id = $2")
            .bind(Json(configs))
            .bind(listing_id)
            .execute(&self.pool)
            .await
            .map_err(storage)?;

        if done.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("listing {listing_id}")));
        }

        self.fetch_one("l.id = $1", ListingKey::Id(listing_id))
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("listing {listing_id}")))
    }

    async fn delete_listing(&self, listing_id: i64) -> CoreResult<()> {
        // interactions, reviews and listing_tag rows cascade
        let done = sqlx::query("DELETE FROM listings WHERE id = $1")
            .bind(listing_id)
            .execute(&self.pool)
            .await
            .map_err(storage)?;

        if done.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("listing {listing_id}")));
        }
        Ok(())
    }
}
