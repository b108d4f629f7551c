pub mod admin;
pub mod catalog;
pub mod config;
pub mod curriculum;
pub mod dao;
pub mod db;
pub mod mapping;
pub mod progress;
pub mod remote;
pub mod seed;
pub mod source;
pub mod storage;
pub mod types;

// --- Library API for embedding ---

/// Convenience re-exports for embedders.
pub mod prelude {
    pub use crate::admin::{CategoryShare, MonthlyRevenue, PurchaseStats, UserAccount};
    pub use crate::catalog::{apply_filters, filter_by_category, filter_by_search, sort_courses};
    pub use crate::config::Config;
    pub use crate::curriculum::{aggregate_curriculum, CurriculumStats};
    pub use crate::mapping::normalize;
    pub use crate::progress::{compute_progress, LearningSession};
    pub use crate::types::{Category, CourseSummary, CurriculumSection, FilterState, Lesson, Level, SortKey, Testimonial};
    pub use crate::{AdminOverview, CatalogPage, CourseDetail, CourseHub, HomePage, NewCourse, PurchasedCourse};
}

use std::collections::HashSet;
use std::future::Future;

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::admin::{CategoryShare, MonthlyRevenue, PurchaseStats, UserAccount};
use crate::config::{Config, DEFAULT_CATALOG_TTL_SECS};
use crate::curriculum::CurriculumStats;
use crate::dao::{BenefitRow, CategoryRow, CourseUpdate, FeatureRow, LessonInsert, ProfileRow, PurchaseRow, SectionRow, TestimonialRow};
use crate::db::Database;
use crate::progress::LearningSession;
use crate::remote::RestClient;
use crate::source::CatalogSource;
use crate::storage::{ProgressStore, Storage};
use crate::types::{Benefit, Category, CourseSummary, CurriculumSection, Feature, FilterState, Level, Testimonial, ALL};

/// Featured and bestseller sections show this many courses.
pub const HOME_SECTION_LIMIT: usize = 4;
/// The home page course grid shows at most this many courses.
pub const HOME_COURSES_LIMIT: usize = 8;

// --- Page models ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogPage {
    pub filter: FilterState,
    /// Every category present in the unfiltered catalog.
    pub categories: Vec<String>,
    pub courses: Vec<CourseSummary>,
    pub total_courses: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HomePage {
    pub categories: Vec<Category>,
    pub courses: Vec<CourseSummary>,
    pub featured: Vec<CourseSummary>,
    pub bestsellers: Vec<CourseSummary>,
    pub testimonials: Vec<Testimonial>,
    pub features: Vec<Feature>,
    pub benefits: Vec<Benefit>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseDetail {
    pub course: CourseSummary,
    pub curriculum: Vec<CurriculumSection>,
    pub stats: CurriculumStats,
    pub testimonials: Vec<Testimonial>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchasedCourse {
    pub purchase: PurchaseRow,
    /// `None` when the course has since been deleted.
    pub course: Option<CourseSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminOverview {
    pub total_courses: usize,
    pub total_users: usize,
    pub purchases: PurchaseStats,
    pub revenue_by_month: Vec<MonthlyRevenue>,
    pub categories: Vec<CategoryShare>,
    pub top_courses: Vec<CourseSummary>,
    pub cache_entries: u64,
    pub expired_cache_entries: u64,
}

/// Course as entered in the admin editor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewCourse {
    pub title: String,
    pub description: String,
    pub instructor: String,
    pub image_url: String,
    pub price: f64,
    pub original_price: Option<f64>,
    /// Category by name; created when it does not exist yet.
    pub category: Option<String>,
    pub level: Level,
    pub duration: String,
    pub bestseller: bool,
    pub featured: bool,
}

/// Async library entry point. Owns the database and, optionally, a remote catalog backend.
///
/// Catalog reads go to the remote backend when one is attached (cached in the
/// local `cache` table), otherwise to the local database. Writes, purchases and
/// learner progress always use the local database.
pub struct CourseHub {
    db: Database,
    remote: Option<RestClient>,
    catalog_ttl_secs: i64,
    refresh: bool,
}

impl CourseHub {
    /// Initialize database and (optionally) run migrations.
    pub async fn connect(database_url: Option<&str>, run_migrations: bool) -> Result<Self> {
        let db = Database::connect(database_url).await?;
        if run_migrations {
            db.run_migrations().await?;
        }
        Ok(Self { db, remote: None, catalog_ttl_secs: DEFAULT_CATALOG_TTL_SECS, refresh: false })
    }

    pub async fn from_config(cfg: &Config) -> Result<Self> {
        let mut hub = Self::connect(cfg.database_url.as_deref(), cfg.run_migrations).await?;
        hub.catalog_ttl_secs = cfg.catalog_ttl_secs;
        if let Some(url) = cfg.backend_url.as_deref() {
            let key = cfg.api_key.as_deref().context("backend_url is set but api_key is missing")?;
            hub.remote = Some(RestClient::new(url, key)?);
            info!(backend = url, "using remote catalog backend");
        }
        Ok(hub)
    }

    pub fn with_remote(mut self, client: RestClient) -> Self {
        self.remote = Some(client);
        self
    }

    /// Bypass cached remote payloads on the next reads.
    pub fn set_refresh(&mut self, refresh: bool) { self.refresh = refresh; }

    pub fn database(&self) -> &Database { &self.db }

    /// Lifetime of cached remote payloads; set from `Config::catalog_ttl_secs`.
    pub fn catalog_ttl_secs(&self) -> i64 { self.catalog_ttl_secs }

    fn source(&self) -> &dyn CatalogSource {
        match &self.remote {
            Some(r) => r,
            None => &self.db,
        }
    }

    /// Read through the cache table for remote sources; local reads go straight to the database.
    async fn cached<T, F, Fut>(&self, key: &str, fetch: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if self.remote.is_none() {
            return fetch().await;
        }
        let key = format!("{}|{}", self.source().name(), key);
        let now = current_epoch();
        if !self.refresh {
            if let Some(payload) = self.db.get_cache(&key, now).await.ok().flatten() {
                match serde_json::from_str(&payload) {
                    Ok(v) => return Ok(v),
                    Err(e) => debug!(%key, error = %e, "discarding unreadable cache entry"),
                }
            }
        }
        let value = fetch().await?;
        if let Ok(payload) = serde_json::to_string(&value) {
            let _ = self.db.put_cache(&key, &payload, now + self.catalog_ttl_secs).await;
        }
        Ok(value)
    }

    // --- Catalog reads ---

    /// Every course, normalized, newest first.
    pub async fn courses(&self) -> Result<Vec<CourseSummary>> {
        let src = self.source();
        let rows = self.cached("courses", || src.fetch_courses()).await.context("fetching courses")?;
        Ok(mapping::normalize_all(&rows))
    }

    pub async fn categories(&self) -> Result<Vec<Category>> {
        let src = self.source();
        let rows = self.cached("categories", || src.fetch_categories()).await.context("fetching categories")?;
        Ok(rows.iter().map(mapping::category_from_row).collect())
    }

    pub async fn testimonials(&self, course_id: Option<&str>) -> Result<Vec<Testimonial>> {
        let src = self.source();
        let key = format!("testimonials|{}", course_id.unwrap_or(ALL));
        let rows = self.cached(&key, || src.fetch_testimonials(course_id)).await.context("fetching testimonials")?;
        Ok(rows.iter().map(mapping::testimonial_from_row).collect())
    }

    pub async fn features(&self) -> Result<Vec<Feature>> {
        let src = self.source();
        let rows = self.cached("features", || src.fetch_features()).await.context("fetching features")?;
        Ok(rows.iter().map(mapping::feature_from_row).collect())
    }

    pub async fn benefits(&self) -> Result<Vec<Benefit>> {
        let src = self.source();
        let rows = self.cached("benefits", || src.fetch_benefits()).await.context("fetching benefits")?;
        Ok(rows.iter().map(mapping::benefit_from_row).collect())
    }

    pub async fn curriculum(&self, course_id: &str) -> Result<Vec<CurriculumSection>> {
        let src = self.source();
        let key = format!("curriculum|{course_id}");
        let (sections, lessons) = self
            .cached(&key, || src.fetch_curriculum(course_id))
            .await
            .with_context(|| format!("fetching curriculum for {course_id}"))?;
        Ok(mapping::curriculum_from_rows(&sections, &lessons))
    }

    /// The browse page: category, then search, then sort.
    pub async fn catalog_page(&self, filter: &FilterState) -> Result<CatalogPage> {
        let all = self.courses().await?;
        let total_courses = all.len();
        let categories = catalog::categories_in(&all);
        let courses = catalog::apply_filters(all, filter);
        debug!(total_courses, shown = courses.len(), ?filter, "catalog page");
        Ok(CatalogPage { filter: filter.clone(), categories, courses, total_courses })
    }

    /// Landing page sections, fetched concurrently. A section whose fetch fails renders empty.
    pub async fn home_page(&self, category: &str) -> HomePage {
        let (categories, courses, testimonials, features, benefits) = futures::join!(
            self.categories(),
            self.courses(),
            self.testimonials(None),
            self.features(),
            self.benefits(),
        );
        let courses = or_empty("courses", courses);
        HomePage {
            categories: or_empty("categories", categories),
            featured: catalog::featured(&courses, HOME_SECTION_LIMIT),
            bestsellers: catalog::bestsellers(&courses, HOME_SECTION_LIMIT),
            courses: catalog::filter_by_category(courses, category).into_iter().take(HOME_COURSES_LIMIT).collect(),
            testimonials: or_empty("testimonials", testimonials),
            features: or_empty("features", features),
            benefits: or_empty("benefits", benefits),
        }
    }

    /// One course as the catalog source sees it, normalized.
    async fn course(&self, course_id: &str) -> Result<Option<CourseSummary>> {
        let src = self.source();
        let key = format!("course|{course_id}");
        let row = self.cached(&key, || src.fetch_course(course_id)).await.context("fetching course")?;
        Ok(row.as_ref().map(mapping::normalize))
    }

    /// Course page: summary, curriculum with totals, and the course's testimonials.
    pub async fn course_detail(&self, course_id: &str) -> Result<Option<CourseDetail>> {
        let Some(course) = self.course(course_id).await? else {
            return Ok(None);
        };
        let (curriculum, testimonials) = futures::join!(self.curriculum(course_id), self.testimonials(Some(course_id)));
        let sections = or_empty("curriculum", curriculum);
        let stats = curriculum::aggregate_curriculum(&sections);
        Ok(Some(CourseDetail {
            course,
            curriculum: sections,
            stats,
            testimonials: or_empty("testimonials", testimonials),
        }))
    }

    // --- Learning ---

    /// Restore a learner's session; starts on the first lesson.
    pub async fn open_session(&self, user_id: &str, course_id: &str, curriculum: &[CurriculumSection]) -> Result<LearningSession> {
        let (mut progress, mut notes) = self.db.load_progress(user_id, course_id).await?;
        // Drop state for lessons that are no longer part of the course.
        let known: HashSet<&str> = crate::progress::lessons_in_order(curriculum).map(|l| l.id.as_str()).collect();
        progress.retain(|id, _| known.contains(id.as_str()));
        notes.retain(|id, _| known.contains(id.as_str()));
        Ok(LearningSession::new(course_id, curriculum).with_state(progress, notes))
    }

    pub async fn save_session(&self, user_id: &str, session: &LearningSession) -> Result<()> {
        self.db
            .save_progress(user_id, &session.course_id, &session.progress, &session.notes)
            .await
            .with_context(|| format!("saving progress for {user_id} in {}", session.course_id))
    }

    // --- Purchases ---

    pub async fn has_purchased(&self, user_id: &str, course_id: &str) -> Result<bool> {
        dao::has_user_purchased_course(self.db.pool(), user_id, course_id).await
    }

    /// Record a completed purchase at the course's current catalog price.
    pub async fn purchase(&self, user_id: &str, course_id: &str) -> Result<PurchaseRow> {
        let Some(course) = self.course(course_id).await? else {
            bail!("course not found: {course_id}");
        };
        let row = PurchaseRow {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            course_id: course_id.to_string(),
            purchase_date: chrono::Utc::now().to_rfc3339(),
            amount: course.price,
            status: Some(admin::STATUS_COMPLETED.to_string()),
        };
        if !dao::record_purchase(self.db.pool(), &row).await? {
            bail!("{user_id} already owns {course_id}");
        }
        info!(user_id, course_id, amount = row.amount, "purchase recorded");
        Ok(row)
    }

    pub async fn purchases_for(&self, user_id: &str) -> Result<Vec<PurchasedCourse>> {
        let purchases = dao::list_user_purchases(self.db.pool(), user_id).await?;
        let mut out = Vec::with_capacity(purchases.len());
        for purchase in purchases {
            let course = self.course(&purchase.course_id).await?;
            out.push(PurchasedCourse { purchase, course });
        }
        Ok(out)
    }

    pub async fn set_purchase_status(&self, purchase_id: &str, status: &str) -> Result<bool> {
        Ok(dao::update_purchase_status(self.db.pool(), purchase_id, status).await? > 0)
    }

    // --- Admin ---

    pub async fn admin_overview(&self) -> Result<AdminOverview> {
        let courses = self.courses().await?;
        let profiles = dao::list_profiles(self.db.pool()).await?;
        let purchases = dao::list_all_purchases(self.db.pool()).await?;
        let (cache_entries, expired_cache_entries) = self.db.cache_counts(current_epoch()).await?;
        Ok(AdminOverview {
            total_courses: courses.len(),
            total_users: profiles.len(),
            purchases: admin::purchase_stats(&purchases),
            revenue_by_month: admin::revenue_by_month(&purchases),
            categories: admin::category_distribution(&courses),
            top_courses: admin::top_courses(&courses, 5),
            cache_entries,
            expired_cache_entries,
        })
    }

    pub async fn admin_courses(&self, query: &str) -> Result<Vec<CourseSummary>> {
        Ok(admin::search_admin_courses(&self.courses().await?, query))
    }

    pub async fn admin_users(&self, query: &str, role: &str) -> Result<Vec<UserAccount>> {
        let profiles = dao::list_profiles(self.db.pool()).await?;
        let counts = dao::count_purchases_by_user(self.db.pool()).await?;
        Ok(admin::filter_users(&admin::accounts_from_profiles(&profiles, &counts), query, role))
    }

    /// Look up a category by name, creating it when missing. Returns its id.
    pub async fn ensure_category(&self, name: &str) -> Result<String> {
        if let Some(id) = dao::find_category_id_by_name(self.db.pool(), name).await? {
            return Ok(id);
        }
        let id = uuid::Uuid::new_v4().to_string();
        dao::upsert_category(self.db.pool(), &CategoryRow { id: id.clone(), name: name.to_string() }).await?;
        debug!(%id, name, "created category");
        Ok(id)
    }

    pub async fn delete_category(&self, category_id: &str) -> Result<bool> {
        Ok(dao::delete_category(self.db.pool(), category_id).await? > 0)
    }

    /// Create a course and return its id.
    pub async fn add_course(&self, new: NewCourse) -> Result<String> {
        if new.title.trim().is_empty() {
            bail!("course title must not be empty");
        }
        check_price("price", new.price)?;
        if let Some(p) = new.original_price {
            check_price("original price", p)?;
        }
        let category_id = match new.category.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            Some(name) => Some(self.ensure_category(name).await?),
            None => None,
        };
        let id = uuid::Uuid::new_v4().to_string();
        let summary = CourseSummary {
            id: id.clone(),
            title: new.title,
            description: new.description,
            image_url: new.image_url,
            instructor: new.instructor,
            price: new.price,
            original_price: new.original_price.filter(|p| *p != 0.0),
            rating: 0.0,
            students_count: 0,
            category: new.category.unwrap_or_default(),
            level: new.level,
            duration: new.duration,
            bestseller: new.bestseller,
            featured: new.featured,
            created_at: None,
        };
        let insert = mapping::course_insert_from_summary(id.clone(), category_id, &summary);
        dao::insert_course(self.db.pool(), &insert).await.context("inserting course")?;
        info!(%id, title = %summary.title, "course created");
        Ok(id)
    }

    pub async fn update_course(&self, course_id: &str, update: &CourseUpdate) -> Result<bool> {
        if let Some(Some(p)) = update.price {
            check_price("price", p)?;
        }
        if let Some(Some(p)) = update.original_price {
            check_price("original price", p)?;
        }
        Ok(dao::update_course(self.db.pool(), course_id, update).await? > 0)
    }

    /// Delete a course with its sections and lessons.
    pub async fn delete_course(&self, course_id: &str) -> Result<bool> {
        let removed = dao::delete_course(self.db.pool(), course_id).await? > 0;
        if removed {
            info!(course_id, "course deleted");
        }
        Ok(removed)
    }

    /// Append a section at the end of a course's curriculum. Returns its id.
    pub async fn add_section(&self, course_id: &str, title: &str) -> Result<String> {
        let existing = dao::list_sections(self.db.pool(), course_id).await?;
        let order_index = existing.iter().map(|s| s.order_index).max().unwrap_or(0) + 1;
        let id = uuid::Uuid::new_v4().to_string();
        dao::upsert_section(self.db.pool(), &SectionRow {
            id: id.clone(),
            course_id: course_id.to_string(),
            title: title.to_string(),
            order_index,
        })
        .await?;
        Ok(id)
    }

    pub async fn delete_section(&self, section_id: &str) -> Result<bool> {
        Ok(dao::delete_section(self.db.pool(), section_id).await? > 0)
    }

    /// Append a lesson to a section. Returns its id.
    pub async fn add_lesson(&self, section_id: &str, title: &str, duration: &str, is_free: bool) -> Result<String> {
        let existing = dao::list_lessons(self.db.pool(), section_id).await?;
        let order_index = existing.iter().map(|l| l.order_index).max().unwrap_or(0) + 1;
        let id = uuid::Uuid::new_v4().to_string();
        dao::upsert_lessons(self.db.pool(), &[LessonInsert {
            id: id.clone(),
            section_id: section_id.to_string(),
            title: title.to_string(),
            duration: Some(duration.to_string()).filter(|d| !d.is_empty()),
            is_free: Some(is_free),
            order_index,
            video_url: None,
            content: None,
        }])
        .await?;
        Ok(id)
    }

    pub async fn delete_lesson(&self, lesson_id: &str) -> Result<bool> {
        Ok(dao::delete_lesson(self.db.pool(), lesson_id).await? > 0)
    }

    pub async fn add_testimonial(&self, t: &Testimonial, course_id: Option<&str>) -> Result<String> {
        let id = if t.id.is_empty() { uuid::Uuid::new_v4().to_string() } else { t.id.clone() };
        dao::insert_testimonial(self.db.pool(), &TestimonialRow {
            id: id.clone(),
            name: t.name.clone(),
            role: Some(t.role.clone()).filter(|r| !r.is_empty()),
            content: t.content.clone(),
            rating: Some(t.rating),
            avatar_url: Some(t.avatar_url.clone()).filter(|a| !a.is_empty()),
            course_id: course_id.map(str::to_string),
        })
        .await?;
        Ok(id)
    }

    pub async fn delete_testimonial(&self, testimonial_id: &str) -> Result<bool> {
        Ok(dao::delete_testimonial(self.db.pool(), testimonial_id).await? > 0)
    }

    pub async fn save_feature(&self, feature: &FeatureRow) -> Result<()> { dao::upsert_feature(self.db.pool(), feature).await }

    pub async fn delete_feature(&self, feature_id: &str) -> Result<bool> {
        Ok(dao::delete_feature(self.db.pool(), feature_id).await? > 0)
    }

    pub async fn save_benefit(&self, benefit: &BenefitRow) -> Result<()> { dao::upsert_benefit(self.db.pool(), benefit).await }

    pub async fn delete_benefit(&self, benefit_id: &str) -> Result<bool> {
        Ok(dao::delete_benefit(self.db.pool(), benefit_id).await? > 0)
    }

    pub async fn profile(&self, user_id: &str) -> Result<Option<UserAccount>> {
        let Some(p) = dao::get_profile(self.db.pool(), user_id).await? else { return Ok(None) };
        let enrolled = dao::list_user_purchases(self.db.pool(), user_id).await?.len() as u64;
        Ok(Some(UserAccount::from_profile(&p, enrolled)))
    }

    pub async fn save_profile(&self, profile: &ProfileRow) -> Result<()> {
        dao::upsert_profile(self.db.pool(), profile).await.with_context(|| format!("saving profile {}", profile.id))
    }

    // --- Maintenance ---

    /// Load the demo catalog into an empty database.
    pub async fn seed_demo_catalog(&self) -> Result<bool> { seed::seed_demo_catalog(self.db.pool()).await }

    /// Clear cache entries by key prefix, or all if None.
    pub async fn clear_cache_prefix(&self, prefix: Option<&str>) -> Result<u64> { self.db.clear_cache_prefix(prefix).await }

    pub async fn vacuum_db(&self) -> Result<()> { self.db.vacuum().await }
}

fn check_price(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        bail!("{field} must be a non-negative amount, got {value}");
    }
    Ok(())
}

fn or_empty<T: Default>(what: &str, res: Result<T>) -> T {
    res.unwrap_or_else(|e| {
        warn!(section = what, error = %format!("{e:#}"), "fetch failed; rendering empty");
        T::default()
    })
}

fn current_epoch() -> i64 {
    std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap_or_default().as_secs() as i64
}
