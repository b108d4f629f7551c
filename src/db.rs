use anyhow::{Context, Result};
use directories::ProjectDirs;
use sqlx::{any::AnyConnectOptions, AnyPool, ConnectOptions, migrate::Migrator};
use sqlx::any::AnyPoolOptions;
use std::path::Path;
use std::{path::PathBuf, str::FromStr};
use std::sync::Once;
use tracing::{debug, warn};

use crate::dao::{self, BenefitRow, CategoryRow, CourseRow, FeatureRow, LessonRow, SectionRow, TestimonialRow};
use crate::source::CatalogSource;
use crate::storage::{ProgressStore, Storage};
use crate::types::{NotesMap, ProgressMap};

// Ensure drivers are installed exactly once for sqlx::any
static INSTALL_DRIVERS: Once = Once::new();

// Embed SQL migrations from the migrations/ directory
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

#[derive(Clone)]
pub struct Database {
    pool: AnyPool,
}

impl Database {
    // Create a connection pool. If database_url is None, use a sensible default
    // (SQLite file in the user's data directory).
    pub async fn connect(database_url: Option<&str>) -> Result<Self> {
        // Register compiled-in drivers for sqlx::any
        INSTALL_DRIVERS.call_once(sqlx::any::install_default_drivers);

        let url = match database_url {
            Some(u) if !u.trim().is_empty() => u.to_string(),
            _ => default_sqlite_url()?,
        };
        debug!(%url, "connecting to database");

        let opts = AnyConnectOptions::from_str(&url)
            .with_context(|| format!("invalid database URL: {url}"))?;
        // Quiet by default; callers can enable SQLX_LOG if they want
        let opts = opts.disable_statement_logging();

        let pool = AnyPoolOptions::new()
            .max_connections(10)
            .connect_with(opts)
            .await
            .with_context(|| format!("failed to connect to database: {url}"))?;

        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await.context("running migrations")
    }

    pub fn pool(&self) -> &AnyPool { &self.pool }

    pub async fn clear_cache_prefix(&self, prefix: Option<&str>) -> Result<u64> {
        let result = if let Some(p) = prefix {
            let like = format!("{}%", p);
            sqlx::query("DELETE FROM cache WHERE key LIKE ?")
                .bind(like)
                .execute(&self.pool)
                .await?
        } else {
            sqlx::query("DELETE FROM cache")
                .execute(&self.pool)
                .await?
        };
        debug!(removed = result.rows_affected(), ?prefix, "cleared cache");
        Ok(result.rows_affected())
    }

    /// (total, expired) cache rows.
    pub async fn cache_counts(&self, now: i64) -> Result<(u64, u64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cache").fetch_one(&self.pool).await?;
        let expired: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cache WHERE expires_at <= ?")
            .bind(now)
            .fetch_one(&self.pool)
            .await?;
        Ok((total as u64, expired as u64))
    }

    pub async fn vacuum(&self) -> Result<()> {
        // Best-effort: works on SQLite
        if let Err(e) = sqlx::query("VACUUM").execute(&self.pool).await {
            warn!(error = %e, "vacuum failed");
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Storage for Database {
    async fn get_cache(&self, key: &str, now: i64) -> Result<Option<String>> {
        let row = sqlx::query_scalar::<_, String>(
            "SELECT payload FROM cache WHERE key = ? AND expires_at > ?",
        )
        .bind(key)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn put_cache(&self, key: &str, payload: &str, expires_at: i64) -> Result<()> {
        sqlx::query(
            "INSERT INTO cache(key, payload, expires_at) VALUES (?, ?, ?)\n             ON CONFLICT(key) DO UPDATE SET payload=excluded.payload, expires_at=excluded.expires_at",
        )
        .bind(key)
        .bind(payload)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl ProgressStore for Database {
    async fn load_progress(&self, user_id: &str, course_id: &str) -> Result<(ProgressMap, NotesMap)> {
        let progress = dao::list_completed_lessons(&self.pool, user_id, course_id)
            .await?
            .into_iter()
            .map(|lesson_id| (lesson_id, true))
            .collect();
        let notes = dao::list_notes(&self.pool, user_id, course_id).await?.into_iter().collect();
        Ok((progress, notes))
    }

    async fn save_progress(&self, user_id: &str, course_id: &str, progress: &ProgressMap, notes: &NotesMap) -> Result<()> {
        // Only completions are stored; completion is never undone.
        let completed: Vec<String> = progress.iter().filter(|(_, done)| **done).map(|(id, _)| id.clone()).collect();
        dao::mark_lessons_completed(&self.pool, user_id, course_id, &completed).await?;
        let notes: Vec<(String, String)> = notes.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        dao::upsert_notes(&self.pool, user_id, course_id, &notes).await?;
        debug!(user_id, course_id, completed = completed.len(), notes = notes.len(), "saved progress");
        Ok(())
    }
}

#[async_trait::async_trait]
impl CatalogSource for Database {
    fn name(&self) -> &str { "local" }

    async fn fetch_courses(&self) -> Result<Vec<CourseRow>> { dao::list_courses(&self.pool).await }

    async fn fetch_course(&self, course_id: &str) -> Result<Option<CourseRow>> { dao::get_course(&self.pool, course_id).await }

    async fn fetch_categories(&self) -> Result<Vec<CategoryRow>> { dao::list_categories(&self.pool).await }

    async fn fetch_curriculum(&self, course_id: &str) -> Result<(Vec<SectionRow>, Vec<LessonRow>)> {
        let sections = dao::list_sections(&self.pool, course_id).await?;
        let lessons = dao::list_lessons_for_course(&self.pool, course_id).await?;
        Ok((sections, lessons))
    }

    async fn fetch_testimonials(&self, course_id: Option<&str>) -> Result<Vec<TestimonialRow>> {
        match course_id {
            Some(id) => dao::list_testimonials_for_course(&self.pool, id).await,
            None => dao::list_testimonials(&self.pool).await,
        }
    }

    async fn fetch_features(&self) -> Result<Vec<FeatureRow>> { dao::list_features(&self.pool).await }

    async fn fetch_benefits(&self) -> Result<Vec<BenefitRow>> { dao::list_benefits(&self.pool).await }
}

/// `sqlx` URL for a SQLite file, created on first connect.
pub fn sqlite_url_for(path: &Path) -> String {
    // Encode spaces in the path for a valid sqlite URL
    let path_str = path.to_string_lossy().replace(' ', "%20");
    format!("sqlite://{path_str}?mode=rwc")
}

fn default_sqlite_url() -> Result<String> {
    let proj = ProjectDirs::from("dev", "coursehub", "coursehub")
        .context("unable to determine data directory for default sqlite path")?;
    let mut path: PathBuf = proj.data_dir().to_path_buf();
    std::fs::create_dir_all(&path).with_context(|| format!("creating data dir: {}", path.display()))?;
    path.push("coursehub.db");
    Ok(sqlite_url_for(&path))
}
