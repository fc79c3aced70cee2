use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, types::Json, PgConnection, PgPool, Postgres, Row};

use crate::{
    domain::{
        errors::{TrackerError, TrackerResult},
        models::{
            AuditInfo, EventEnvelope, Feature, NewFeature, NewProduct, NewRelease, OutboxRecord,
            Product, Release,
        },
        value_objects::Code,
    },
    ports::repositories::{
        FeatureRepository, OutboxRepository, ProductRepository, ReleaseRepository, Transaction,
        TransactionManager, TransactionMode,
    },
};

const PRODUCT_COLUMNS: &str = r#"
    SELECT id, code, name, description, image_url, disabled,
           created_by, created_at, updated_by, updated_at
    FROM products
"#;

const RELEASE_COLUMNS: &str = r#"
    SELECT r.id, r.code, r.product_id, p.code AS product_code, r.description, r.status,
           r.released_at, r.created_by, r.created_at, r.updated_by, r.updated_at
    FROM releases r
    JOIN products p ON p.id = r.product_id
"#;

const FEATURE_COLUMNS: &str = r#"
    SELECT f.id, f.code, f.product_id, p.code AS product_code, f.release_id,
           r.code AS release_code, f.title, f.description, f.status, f.assigned_to,
           f.created_by, f.created_at, f.updated_by, f.updated_at
    FROM features f
    JOIN releases r ON r.id = f.release_id
    JOIN products p ON p.id = f.product_id
"#;

/// PostgreSQL storage backend
#[derive(Clone)]
pub struct SqlStore {
    pool: PgPool,
}

impl SqlStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Initialize database tables
    pub async fn migrate(&self) -> Result<(), sqlx::Error> {
        sqlx::raw_sql(
            r#"
            CREATE TABLE IF NOT EXISTS products (
                id BIGSERIAL PRIMARY KEY,
                code VARCHAR(50) NOT NULL UNIQUE,
                name VARCHAR NOT NULL,
                description TEXT,
                image_url VARCHAR,
                disabled BOOLEAN NOT NULL DEFAULT false,
                created_by VARCHAR NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                updated_by VARCHAR,
                updated_at TIMESTAMPTZ
            );

            CREATE TABLE IF NOT EXISTS releases (
                id BIGSERIAL PRIMARY KEY,
                code VARCHAR(50) NOT NULL UNIQUE,
                product_id BIGINT NOT NULL REFERENCES products(id),
                description TEXT,
                status VARCHAR(20) NOT NULL,
                released_at TIMESTAMPTZ,
                created_by VARCHAR NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                updated_by VARCHAR,
                updated_at TIMESTAMPTZ
            );

            CREATE INDEX IF NOT EXISTS idx_releases_product ON releases(product_id);

            CREATE TABLE IF NOT EXISTS features (
                id BIGSERIAL PRIMARY KEY,
                code VARCHAR(50) NOT NULL UNIQUE,
                product_id BIGINT NOT NULL REFERENCES products(id),
                release_id BIGINT NOT NULL REFERENCES releases(id),
                title VARCHAR(500) NOT NULL,
                description TEXT,
                status VARCHAR(20) NOT NULL,
                assigned_to VARCHAR,
                created_by VARCHAR NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                updated_by VARCHAR,
                updated_at TIMESTAMPTZ
            );

            CREATE INDEX IF NOT EXISTS idx_features_release ON features(release_id);

            CREATE TABLE IF NOT EXISTS feature_event_outbox (
                id BIGSERIAL PRIMARY KEY,
                event_id UUID NOT NULL UNIQUE,
                payload JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                dispatched_at TIMESTAMPTZ
            );

            CREATE INDEX IF NOT EXISTS idx_outbox_pending
                ON feature_event_outbox(id) WHERE dispatched_at IS NULL;

            CREATE INDEX IF NOT EXISTS idx_outbox_dispatched
                ON feature_event_outbox(dispatched_at) WHERE dispatched_at IS NOT NULL;
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl TransactionManager for SqlStore {
    async fn begin(&self, mode: TransactionMode) -> TrackerResult<Box<dyn Transaction>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(infrastructure("beginning transaction"))?;

        if mode == TransactionMode::ReadOnly {
            sqlx::query("SET TRANSACTION READ ONLY")
                .execute(&mut *tx)
                .await
                .map_err(infrastructure("setting transaction read only"))?;
        }

        Ok(Box::new(SqlTransaction { tx: Some(tx), mode }))
    }
}

/// Transaction over [`SqlStore`]
pub struct SqlTransaction {
    tx: Option<sqlx::Transaction<'static, Postgres>>,
    mode: TransactionMode,
}

impl SqlTransaction {
    fn conn(&mut self) -> TrackerResult<&mut PgConnection> {
        self.tx
            .as_deref_mut()
            .ok_or(TrackerError::TransactionClosed)
    }

    fn writable_conn(&mut self) -> TrackerResult<&mut PgConnection> {
        if self.mode == TransactionMode::ReadOnly {
            return Err(TrackerError::ReadOnlyTransaction);
        }
        self.conn()
    }
}

fn infrastructure(context: &'static str) -> impl FnOnce(sqlx::Error) -> TrackerError {
    move |e| TrackerError::Infrastructure {
        message: format!("Database error {}: {}", context, e),
        detail: Some(e.to_string()),
    }
}

/// Map unique violations to `Conflict`, everything else to `Infrastructure`
fn insert_error(entity: &'static str, code: &Code) -> impl FnOnce(sqlx::Error) -> TrackerError {
    let code = code.to_string();
    move |e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            TrackerError::Conflict { entity, code }
        }
        _ => TrackerError::Infrastructure {
            message: format!("Database error inserting {}: {}", entity, e),
            detail: Some(e.to_string()),
        },
    }
}

fn column<'r, T>(row: &'r PgRow, name: &str) -> TrackerResult<T>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(name)
        .map_err(infrastructure("decoding row"))
}

fn code_column(row: &PgRow, name: &str) -> TrackerResult<Code> {
    Ok(Code::new(column::<String>(row, name)?)?)
}

fn audit_from_row(row: &PgRow) -> TrackerResult<AuditInfo> {
    Ok(AuditInfo {
        created_by: column(row, "created_by")?,
        created_at: column(row, "created_at")?,
        updated_by: column(row, "updated_by")?,
        updated_at: column(row, "updated_at")?,
    })
}

fn product_from_row(row: &PgRow) -> TrackerResult<Product> {
    Ok(Product {
        id: column(row, "id")?,
        code: code_column(row, "code")?,
        name: column(row, "name")?,
        description: column(row, "description")?,
        image_url: column(row, "image_url")?,
        disabled: column(row, "disabled")?,
        audit: audit_from_row(row)?,
    })
}

fn release_from_row(row: &PgRow) -> TrackerResult<Release> {
    Ok(Release {
        id: column(row, "id")?,
        code: code_column(row, "code")?,
        product_id: column(row, "product_id")?,
        product_code: code_column(row, "product_code")?,
        description: column(row, "description")?,
        status: column::<String>(row, "status")?.parse()?,
        released_at: column(row, "released_at")?,
        audit: audit_from_row(row)?,
    })
}

fn feature_from_row(row: &PgRow) -> TrackerResult<Feature> {
    Ok(Feature {
        id: column(row, "id")?,
        code: code_column(row, "code")?,
        product_id: column(row, "product_id")?,
        product_code: code_column(row, "product_code")?,
        release_id: column(row, "release_id")?,
        release_code: code_column(row, "release_code")?,
        title: column(row, "title")?,
        description: column(row, "description")?,
        status: column::<String>(row, "status")?.parse()?,
        assigned_to: column(row, "assigned_to")?,
        audit: audit_from_row(row)?,
    })
}

fn outbox_from_row(row: &PgRow) -> TrackerResult<OutboxRecord> {
    let Json(envelope) = column::<Json<EventEnvelope>>(row, "payload")?;
    Ok(OutboxRecord {
        id: column(row, "id")?,
        envelope,
        created_at: column(row, "created_at")?,
        dispatched_at: column(row, "dispatched_at")?,
    })
}

#[async_trait]
impl Transaction for SqlTransaction {
    fn products(&mut self) -> &mut dyn ProductRepository {
        self
    }

    fn releases(&mut self) -> &mut dyn ReleaseRepository {
        self
    }

    fn features(&mut self) -> &mut dyn FeatureRepository {
        self
    }

    fn outbox(&mut self) -> &mut dyn OutboxRepository {
        self
    }

    async fn commit(&mut self) -> TrackerResult<()> {
        let tx = self.tx.take().ok_or(TrackerError::TransactionClosed)?;
        tx.commit()
            .await
            .map_err(infrastructure("committing transaction"))
    }

    async fn rollback(&mut self) -> TrackerResult<()> {
        let tx = self.tx.take().ok_or(TrackerError::TransactionClosed)?;
        tx.rollback()
            .await
            .map_err(infrastructure("rolling back transaction"))
    }
}

#[async_trait]
impl ProductRepository for SqlTransaction {
    async fn find_all(&mut self) -> TrackerResult<Vec<Product>> {
        let rows = sqlx::query(&format!("{} ORDER BY id", PRODUCT_COLUMNS))
            .fetch_all(self.conn()?)
            .await
            .map_err(infrastructure("listing products"))?;

        rows.iter().map(product_from_row).collect()
    }

    async fn find_by_code(&mut self, code: &str) -> TrackerResult<Option<Product>> {
        let row = sqlx::query(&format!("{} WHERE code = $1", PRODUCT_COLUMNS))
            .bind(code)
            .fetch_optional(self.conn()?)
            .await
            .map_err(infrastructure("retrieving product"))?;

        row.as_ref().map(product_from_row).transpose()
    }

    async fn insert(&mut self, product: NewProduct) -> TrackerResult<Product> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO products (code, name, description, image_url, disabled, created_by, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(product.code.as_str())
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.image_url)
        .bind(product.disabled)
        .bind(&product.audit.created_by)
        .bind(product.audit.created_at)
        .fetch_one(self.writable_conn()?)
        .await
        .map_err(insert_error("Product", &product.code))?;

        Ok(product.with_id(id))
    }

    async fn update(&mut self, product: &Product) -> TrackerResult<()> {
        sqlx::query(
            r#"
            UPDATE products
            SET name = $2, description = $3, image_url = $4, disabled = $5,
                updated_by = $6, updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.image_url)
        .bind(product.disabled)
        .bind(&product.audit.updated_by)
        .bind(product.audit.updated_at)
        .execute(self.writable_conn()?)
        .await
        .map_err(infrastructure("updating product"))?;

        Ok(())
    }
}

#[async_trait]
impl ReleaseRepository for SqlTransaction {
    async fn find_by_code(&mut self, code: &str) -> TrackerResult<Option<Release>> {
        let row = sqlx::query(&format!("{} WHERE r.code = $1", RELEASE_COLUMNS))
            .bind(code)
            .fetch_optional(self.conn()?)
            .await
            .map_err(infrastructure("retrieving release"))?;

        row.as_ref().map(release_from_row).transpose()
    }

    async fn find_by_product_code(&mut self, product_code: &str) -> TrackerResult<Vec<Release>> {
        let rows = sqlx::query(&format!(
            "{} WHERE p.code = $1 ORDER BY r.id",
            RELEASE_COLUMNS
        ))
        .bind(product_code)
        .fetch_all(self.conn()?)
        .await
        .map_err(infrastructure("listing releases"))?;

        rows.iter().map(release_from_row).collect()
    }

    async fn exists_by_code(&mut self, code: &str) -> TrackerResult<bool> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM releases WHERE code = $1)")
            .bind(code)
            .fetch_one(self.conn()?)
            .await
            .map_err(infrastructure("checking release existence"))
    }

    async fn insert(&mut self, release: NewRelease) -> TrackerResult<Release> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO releases (code, product_id, description, status, created_by, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(release.code.as_str())
        .bind(release.product_id)
        .bind(&release.description)
        .bind(release.status.as_str())
        .bind(&release.audit.created_by)
        .bind(release.audit.created_at)
        .fetch_one(self.writable_conn()?)
        .await
        .map_err(insert_error("Release", &release.code))?;

        Ok(release.with_id(id))
    }

    async fn update(&mut self, release: &Release) -> TrackerResult<()> {
        sqlx::query(
            r#"
            UPDATE releases
            SET description = $2, status = $3, released_at = $4, updated_by = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(release.id)
        .bind(&release.description)
        .bind(release.status.as_str())
        .bind(release.released_at)
        .bind(&release.audit.updated_by)
        .bind(release.audit.updated_at)
        .execute(self.writable_conn()?)
        .await
        .map_err(infrastructure("updating release"))?;

        Ok(())
    }

    async fn delete_by_code(&mut self, code: &str) -> TrackerResult<()> {
        sqlx::query("DELETE FROM releases WHERE code = $1")
            .bind(code)
            .execute(self.writable_conn()?)
            .await
            .map_err(infrastructure("deleting release"))?;

        Ok(())
    }
}

#[async_trait]
impl FeatureRepository for SqlTransaction {
    async fn find_by_code(&mut self, code: &str) -> TrackerResult<Option<Feature>> {
        let row = sqlx::query(&format!("{} WHERE f.code = $1", FEATURE_COLUMNS))
            .bind(code)
            .fetch_optional(self.conn()?)
            .await
            .map_err(infrastructure("retrieving feature"))?;

        row.as_ref().map(feature_from_row).transpose()
    }

    async fn find_by_release_code(&mut self, release_code: &str) -> TrackerResult<Vec<Feature>> {
        let rows = sqlx::query(&format!(
            "{} WHERE r.code = $1 ORDER BY f.id",
            FEATURE_COLUMNS
        ))
        .bind(release_code)
        .fetch_all(self.conn()?)
        .await
        .map_err(infrastructure("listing features"))?;

        rows.iter().map(feature_from_row).collect()
    }

    async fn exists_by_code(&mut self, code: &str) -> TrackerResult<bool> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM features WHERE code = $1)")
            .bind(code)
            .fetch_one(self.conn()?)
            .await
            .map_err(infrastructure("checking feature existence"))
    }

    async fn insert(&mut self, feature: NewFeature) -> TrackerResult<Feature> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO features (
                code, product_id, release_id, title, description, status, assigned_to,
                created_by, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(feature.code.as_str())
        .bind(feature.product_id)
        .bind(feature.release_id)
        .bind(&feature.title)
        .bind(&feature.description)
        .bind(feature.status.as_str())
        .bind(&feature.assigned_to)
        .bind(&feature.audit.created_by)
        .bind(feature.audit.created_at)
        .fetch_one(self.writable_conn()?)
        .await
        .map_err(insert_error("Feature", &feature.code))?;

        Ok(feature.with_id(id))
    }

    async fn update(&mut self, feature: &Feature) -> TrackerResult<()> {
        sqlx::query(
            r#"
            UPDATE features
            SET title = $2, description = $3, status = $4, assigned_to = $5,
                updated_by = $6, updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(feature.id)
        .bind(&feature.title)
        .bind(&feature.description)
        .bind(feature.status.as_str())
        .bind(&feature.assigned_to)
        .bind(&feature.audit.updated_by)
        .bind(feature.audit.updated_at)
        .execute(self.writable_conn()?)
        .await
        .map_err(infrastructure("updating feature"))?;

        Ok(())
    }

    async fn delete_by_code(&mut self, code: &str) -> TrackerResult<()> {
        sqlx::query("DELETE FROM features WHERE code = $1")
            .bind(code)
            .execute(self.writable_conn()?)
            .await
            .map_err(infrastructure("deleting feature"))?;

        Ok(())
    }

    async fn delete_by_release_code(&mut self, release_code: &str) -> TrackerResult<u64> {
        let result = sqlx::query(
            "DELETE FROM features WHERE release_id IN (SELECT id FROM releases WHERE code = $1)",
        )
        .bind(release_code)
        .execute(self.writable_conn()?)
        .await
        .map_err(infrastructure("deleting release features"))?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl OutboxRepository for SqlTransaction {
    async fn append(&mut self, envelope: &EventEnvelope) -> TrackerResult<OutboxRecord> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO feature_event_outbox (event_id, payload, created_at)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(envelope.event_id)
        .bind(Json(envelope))
        .bind(envelope.occurred_at)
        .fetch_one(self.writable_conn()?)
        .await
        .map_err(infrastructure("appending outbox record"))?;

        Ok(OutboxRecord {
            id,
            envelope: envelope.clone(),
            created_at: envelope.occurred_at,
            dispatched_at: None,
        })
    }

    async fn find_pending(&mut self, limit: usize) -> TrackerResult<Vec<OutboxRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, payload, created_at, dispatched_at
            FROM feature_event_outbox
            WHERE dispatched_at IS NULL
            ORDER BY id
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(self.conn()?)
        .await
        .map_err(infrastructure("listing pending outbox records"))?;

        rows.iter().map(outbox_from_row).collect()
    }

    async fn mark_dispatched(&mut self, id: i64, at: DateTime<Utc>) -> TrackerResult<()> {
        sqlx::query("UPDATE feature_event_outbox SET dispatched_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(self.writable_conn()?)
            .await
            .map_err(infrastructure("marking outbox record dispatched"))?;

        Ok(())
    }

    async fn purge_dispatched(&mut self, before: DateTime<Utc>) -> TrackerResult<u64> {
        let result = sqlx::query(
            "DELETE FROM feature_event_outbox WHERE dispatched_at IS NOT NULL AND dispatched_at < $1",
        )
        .bind(before)
        .execute(self.writable_conn()?)
        .await
        .map_err(infrastructure("purging dispatched outbox records"))?;

        Ok(result.rows_affected())
    }
}
