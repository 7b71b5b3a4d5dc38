use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{debug, info};
use uuid::Uuid;

use super::repo_types::{UniqueField, User};

const USER_COLUMNS: &str = "id, email, username, first_name, last_name, password_hash, \
     is_email_verified, provider, google_id, avatar, business_name, phone_number, \
     address, city, country, password_changed_at, roles, active, refresh_token, \
     created_at, updated_at";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("duplicate {0}")]
    Duplicate(UniqueField),

    #[error("record {0} already exists")]
    DuplicateId(Uuid),

    #[error("record not found")]
    NotFound,

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Persistence for user records.
///
/// Implementations own unique-index enforcement on email and username: of two
/// racing writes with the same value exactly one succeeds, and the loser
/// leaves nothing behind.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert(&self, user: &User) -> Result<User, StoreError>;
    async fn update(&self, user: &User) -> Result<User, StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    /// Releases any connections held by the store.
    async fn close(&self) {}
}

/// `users` table in PostgreSQL.
#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let db = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self { db })
    }

    pub fn pool(&self) -> &PgPool {
        &self.db
    }

    async fn find_one(&self, column: &str, value: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(value)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }
}

/// Column behind each user-facing unique index. Other constraints
/// (primary key included) are not a uniqueness error the caller can act on.
fn unique_field_for(constraint: Option<&str>) -> Option<UniqueField> {
    match constraint? {
        "users_email_key" => Some(UniqueField::Email),
        "users_username_key" => Some(UniqueField::Username),
        _ => None,
    }
}

/// Maps unique-constraint failures onto the column that collided.
fn map_write_error(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            if let Some(field) = unique_field_for(db_err.constraint()) {
                return StoreError::Duplicate(field);
            }
        }
    }
    StoreError::Database(e)
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn insert(&self, user: &User) -> Result<User, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO users ({USER_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11,
                    $12, $13, $14, $15, $16, $17, $18, $19, $20, $21)
            RETURNING {USER_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, User>(&sql)
            .bind(user.id)
            .bind(&user.email)
            .bind(&user.username)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.password_hash)
            .bind(user.is_email_verified)
            .bind(&user.provider)
            .bind(&user.google_id)
            .bind(&user.avatar)
            .bind(&user.business_name)
            .bind(&user.phone_number)
            .bind(&user.address)
            .bind(&user.city)
            .bind(&user.country)
            .bind(user.password_changed_at)
            .bind(&user.roles)
            .bind(user.active)
            .bind(&user.refresh_token)
            .bind(user.created_at)
            .bind(user.updated_at)
            .fetch_one(&self.db)
            .await
            .map_err(map_write_error)?;
        debug!(user_id = %row.id, "user row inserted");
        Ok(row)
    }

    async fn update(&self, user: &User) -> Result<User, StoreError> {
        let sql = format!(
            r#"
            UPDATE users SET
                email = $2, username = $3, first_name = $4, last_name = $5,
                password_hash = $6, is_email_verified = $7, provider = $8,
                google_id = $9, avatar = $10, business_name = $11, phone_number = $12,
                address = $13, city = $14, country = $15, password_changed_at = $16,
                roles = $17, active = $18, refresh_token = $19, updated_at = $20
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, User>(&sql)
            .bind(user.id)
            .bind(&user.email)
            .bind(&user.username)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.password_hash)
            .bind(user.is_email_verified)
            .bind(&user.provider)
            .bind(&user.google_id)
            .bind(&user.avatar)
            .bind(&user.business_name)
            .bind(&user.phone_number)
            .bind(&user.address)
            .bind(&user.city)
            .bind(&user.country)
            .bind(user.password_changed_at)
            .bind(&user.roles)
            .bind(user.active)
            .bind(&user.refresh_token)
            .bind(user.updated_at)
            .fetch_optional(&self.db)
            .await
            .map_err(map_write_error)?;
        row.ok_or(StoreError::NotFound)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.find_one("email", email).await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        self.find_one("username", username).await
    }

    async fn close(&self) {
        self.db.close().await;
        info!("database pool closed");
    }
}
