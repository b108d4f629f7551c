use anyhow::Result;
use serde::{Deserialize, Serialize};
use sqlx::any::AnyRow;
use sqlx::{Any, AnyPool, FromRow, QueryBuilder, Row};

// --- Rows as persisted. Optional columns stay optional here; defaults are applied in mapping. ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CourseRow {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub instructor_id: Option<String>,
    pub instructor_name: Option<String>,
    pub price: Option<f64>,
    pub original_price: Option<f64>,
    pub rating: Option<f64>,
    pub students_count: Option<i64>,
    pub category_id: Option<String>,
    /// Joined from `categories.name`.
    pub category_name: Option<String>,
    pub level: Option<String>,
    pub duration: Option<String>,
    pub bestseller: Option<bool>,
    pub featured: Option<bool>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

// The `any` driver cannot decode SQL NULL into `Option<T>`. Nullable columns are selected through
// COALESCE (text to '', numbers to -1) and the sentinel is turned back into `None` here.
// Flags are stored as INTEGER 0/1 so they decode the same way through every `any` driver.
const NULL_NUM: i64 = -1;

fn opt_text(row: &AnyRow, col: &str) -> Result<Option<String>, sqlx::Error> {
    let v: String = row.try_get(col)?;
    Ok(Some(v).filter(|s| !s.is_empty()))
}

fn opt_int(row: &AnyRow, col: &str) -> Result<Option<i64>, sqlx::Error> {
    let v: i64 = row.try_get(col)?;
    Ok(Some(v).filter(|n| *n != NULL_NUM))
}

fn opt_real(row: &AnyRow, col: &str) -> Result<Option<f64>, sqlx::Error> {
    let v: f64 = row.try_get(col)?;
    Ok(Some(v).filter(|n| *n != NULL_NUM as f64))
}

fn opt_flag(row: &AnyRow, col: &str) -> Result<Option<bool>, sqlx::Error> {
    Ok(opt_int(row, col)?.map(|v| v != 0))
}

impl<'r> FromRow<'r, AnyRow> for CourseRow {
    fn from_row(row: &'r AnyRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            description: opt_text(row, "description")?,
            image_url: opt_text(row, "image_url")?,
            instructor_id: opt_text(row, "instructor_id")?,
            instructor_name: opt_text(row, "instructor_name")?,
            price: opt_real(row, "price")?,
            original_price: opt_real(row, "original_price")?,
            rating: opt_real(row, "rating")?,
            students_count: opt_int(row, "students_count")?,
            category_id: opt_text(row, "category_id")?,
            category_name: opt_text(row, "category_name")?,
            level: opt_text(row, "level")?,
            duration: opt_text(row, "duration")?,
            bestseller: opt_flag(row, "bestseller")?,
            featured: opt_flag(row, "featured")?,
            created_at: opt_text(row, "created_at")?,
            updated_at: opt_text(row, "updated_at")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CategoryRow {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SectionRow {
    pub id: String,
    pub course_id: String,
    pub title: String,
    pub order_index: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonRow {
    pub id: String,
    pub section_id: String,
    pub title: String,
    pub duration: Option<String>,
    pub is_free: Option<bool>,
    pub order_index: i64,
    pub video_url: Option<String>,
    pub content: Option<String>,
}

impl<'r> FromRow<'r, AnyRow> for LessonRow {
    fn from_row(row: &'r AnyRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            section_id: row.try_get("section_id")?,
            title: row.try_get("title")?,
            duration: opt_text(row, "duration")?,
            is_free: opt_flag(row, "is_free")?,
            order_index: row.try_get("order_index")?,
            video_url: opt_text(row, "video_url")?,
            content: opt_text(row, "content")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseRow {
    pub id: String,
    pub user_id: String,
    pub course_id: String,
    pub purchase_date: String, // RFC 3339
    pub amount: f64,
    pub status: Option<String>,
}

impl<'r> FromRow<'r, AnyRow> for PurchaseRow {
    fn from_row(row: &'r AnyRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            course_id: row.try_get("course_id")?,
            purchase_date: row.try_get("purchase_date")?,
            amount: row.try_get("amount")?,
            status: opt_text(row, "status")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestimonialRow {
    pub id: String,
    pub name: String,
    pub role: Option<String>,
    pub content: String,
    pub rating: Option<i64>,
    pub avatar_url: Option<String>,
    pub course_id: Option<String>,
}

impl<'r> FromRow<'r, AnyRow> for TestimonialRow {
    fn from_row(row: &'r AnyRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            role: opt_text(row, "role")?,
            content: row.try_get("content")?,
            rating: opt_int(row, "rating")?,
            avatar_url: opt_text(row, "avatar_url")?,
            course_id: opt_text(row, "course_id")?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRow {
    pub id: String,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub phone: Option<String>,
    pub role: Option<String>,
    pub status: Option<String>,
    pub created_at: Option<String>,
}

impl<'r> FromRow<'r, AnyRow> for ProfileRow {
    fn from_row(row: &'r AnyRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            full_name: opt_text(row, "full_name")?,
            email: opt_text(row, "email")?,
            avatar_url: opt_text(row, "avatar_url")?,
            bio: opt_text(row, "bio")?,
            phone: opt_text(row, "phone")?,
            role: opt_text(row, "role")?,
            status: opt_text(row, "status")?,
            created_at: opt_text(row, "created_at")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct FeatureRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct BenefitRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub color: String,
}

// --- Write payloads ---

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CourseInsert {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub instructor_name: Option<String>,
    pub price: Option<f64>,
    pub original_price: Option<f64>,
    pub rating: Option<f64>,
    pub students_count: Option<i64>,
    pub category_id: Option<String>,
    pub level: Option<String>,
    pub duration: Option<String>,
    pub bestseller: Option<bool>,
    pub featured: Option<bool>,
    pub created_at: String,
}

/// Partial update; `None` leaves a column untouched, `Some(None)` clears it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CourseUpdate {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub image_url: Option<Option<String>>,
    pub instructor_name: Option<Option<String>>,
    pub price: Option<Option<f64>>,
    pub original_price: Option<Option<f64>>,
    pub category_id: Option<Option<String>>,
    pub level: Option<Option<String>>,
    pub duration: Option<Option<String>>,
    pub bestseller: Option<bool>,
    pub featured: Option<bool>,
}

impl CourseUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.image_url.is_none()
            && self.instructor_name.is_none()
            && self.price.is_none()
            && self.original_price.is_none()
            && self.category_id.is_none()
            && self.level.is_none()
            && self.duration.is_none()
            && self.bestseller.is_none()
            && self.featured.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonInsert {
    pub id: String,
    pub section_id: String,
    pub title: String,
    pub duration: Option<String>,
    pub is_free: Option<bool>,
    pub order_index: i64,
    pub video_url: Option<String>,
    pub content: Option<String>,
}

const COURSE_SELECT: &str = "SELECT c.id, c.title,\n        COALESCE(c.description, '') AS description, COALESCE(c.image_url, '') AS image_url,\n        COALESCE(c.instructor_id, '') AS instructor_id, COALESCE(c.instructor_name, '') AS instructor_name,\n        COALESCE(c.price, -1.0) AS price, COALESCE(c.original_price, -1.0) AS original_price,\n        COALESCE(c.rating, -1.0) AS rating, COALESCE(c.students_count, -1) AS students_count,\n        COALESCE(c.category_id, '') AS category_id, COALESCE(cat.name, '') AS category_name,\n        COALESCE(c.level, '') AS level, COALESCE(c.duration, '') AS duration,\n        COALESCE(c.bestseller, -1) AS bestseller, COALESCE(c.featured, -1) AS featured,\n        c.created_at, c.updated_at\n FROM courses c LEFT JOIN categories cat ON cat.id = c.category_id";

const LESSON_COLUMNS: &str = "l.id, l.section_id, l.title, COALESCE(l.duration, '') AS duration, COALESCE(l.is_free, -1) AS is_free,\n        l.order_index, COALESCE(l.video_url, '') AS video_url, COALESCE(l.content, '') AS content";

const TESTIMONIAL_SELECT: &str = "SELECT id, name, COALESCE(role, '') AS role, content, COALESCE(rating, -1) AS rating,\n        COALESCE(avatar_url, '') AS avatar_url, COALESCE(course_id, '') AS course_id FROM testimonials";

const PROFILE_SELECT: &str = "SELECT id, COALESCE(full_name, '') AS full_name, COALESCE(email, '') AS email,\n        COALESCE(avatar_url, '') AS avatar_url, COALESCE(bio, '') AS bio, COALESCE(phone, '') AS phone,\n        COALESCE(role, '') AS role, COALESCE(status, '') AS status, created_at FROM profiles";

fn now_rfc3339() -> String { chrono::Utc::now().to_rfc3339() }

// --- Courses ---

pub async fn list_courses(pool: &AnyPool) -> Result<Vec<CourseRow>> {
    let sql = format!("{COURSE_SELECT} ORDER BY c.created_at DESC");
    Ok(sqlx::query_as::<_, CourseRow>(&sql).fetch_all(pool).await?)
}

pub async fn get_course(pool: &AnyPool, course_id: &str) -> Result<Option<CourseRow>> {
    let sql = format!("{COURSE_SELECT} WHERE c.id = ? LIMIT 1");
    Ok(sqlx::query_as::<_, CourseRow>(&sql).bind(course_id).fetch_optional(pool).await?)
}

pub async fn insert_course(pool: &AnyPool, c: &CourseInsert) -> Result<()> {
    sqlx::query(
        "INSERT INTO courses(\n            id, title, description, image_url, instructor_name, price, original_price, rating,\n            students_count, category_id, level, duration, bestseller, featured, created_at, updated_at\n         ) VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&c.id)
    .bind(&c.title)
    .bind(&c.description)
    .bind(&c.image_url)
    .bind(&c.instructor_name)
    .bind(c.price)
    .bind(c.original_price)
    .bind(c.rating)
    .bind(c.students_count)
    .bind(&c.category_id)
    .bind(&c.level)
    .bind(&c.duration)
    .bind(c.bestseller.map(i64::from))
    .bind(c.featured.map(i64::from))
    .bind(&c.created_at)
    .bind(&c.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn update_course(pool: &AnyPool, course_id: &str, u: &CourseUpdate) -> Result<u64> {
    if u.is_empty() {
        return Ok(0);
    }
    let mut qb: QueryBuilder<Any> = QueryBuilder::new("UPDATE courses SET updated_at = ");
    qb.push_bind(now_rfc3339());
    if let Some(v) = &u.title { qb.push(", title = ").push_bind(v.clone()); }
    if let Some(v) = &u.description { qb.push(", description = ").push_bind(v.clone()); }
    if let Some(v) = &u.image_url { qb.push(", image_url = ").push_bind(v.clone()); }
    if let Some(v) = &u.instructor_name { qb.push(", instructor_name = ").push_bind(v.clone()); }
    if let Some(v) = u.price { qb.push(", price = ").push_bind(v); }
    if let Some(v) = u.original_price { qb.push(", original_price = ").push_bind(v); }
    if let Some(v) = &u.category_id { qb.push(", category_id = ").push_bind(v.clone()); }
    if let Some(v) = &u.level { qb.push(", level = ").push_bind(v.clone()); }
    if let Some(v) = &u.duration { qb.push(", duration = ").push_bind(v.clone()); }
    if let Some(v) = u.bestseller { qb.push(", bestseller = ").push_bind(i64::from(v)); }
    if let Some(v) = u.featured { qb.push(", featured = ").push_bind(i64::from(v)); }
    qb.push(" WHERE id = ").push_bind(course_id.to_string());
    let res = qb.build().execute(pool).await?;
    Ok(res.rows_affected())
}

pub async fn delete_course(pool: &AnyPool, course_id: &str) -> Result<u64> {
    let mut tx = pool.begin().await?;
    for table in ["lesson_progress", "lesson_notes"] {
        sqlx::query(&format!("DELETE FROM {table} WHERE course_id = ?"))
            .bind(course_id)
            .execute(&mut *tx)
            .await?;
    }
    sqlx::query("DELETE FROM course_lessons WHERE section_id IN (SELECT id FROM course_sections WHERE course_id = ?)")
        .bind(course_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM course_sections WHERE course_id = ?")
        .bind(course_id)
        .execute(&mut *tx)
        .await?;
    let res = sqlx::query("DELETE FROM courses WHERE id = ?")
        .bind(course_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(res.rows_affected())
}

// --- Curriculum ---

pub async fn list_sections(pool: &AnyPool, course_id: &str) -> Result<Vec<SectionRow>> {
    let rows = sqlx::query_as::<_, SectionRow>(
        "SELECT id, course_id, title, order_index FROM course_sections WHERE course_id = ? ORDER BY order_index ASC",
    )
    .bind(course_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn list_lessons(pool: &AnyPool, section_id: &str) -> Result<Vec<LessonRow>> {
    let sql = format!("SELECT {LESSON_COLUMNS} FROM course_lessons l WHERE l.section_id = ? ORDER BY l.order_index ASC");
    Ok(sqlx::query_as::<_, LessonRow>(&sql).bind(section_id).fetch_all(pool).await?)
}

/// All lessons of a course in one round-trip, ordered by section then lesson index.
pub async fn list_lessons_for_course(pool: &AnyPool, course_id: &str) -> Result<Vec<LessonRow>> {
    let sql = format!(
        "SELECT {LESSON_COLUMNS}\n         FROM course_lessons l JOIN course_sections s ON s.id = l.section_id\n         WHERE s.course_id = ? ORDER BY s.order_index ASC, l.order_index ASC"
    );
    Ok(sqlx::query_as::<_, LessonRow>(&sql).bind(course_id).fetch_all(pool).await?)
}

pub async fn upsert_section(pool: &AnyPool, s: &SectionRow) -> Result<()> {
    let now = now_rfc3339();
    sqlx::query(
        "INSERT INTO course_sections(id, course_id, title, order_index, created_at, updated_at) VALUES(?, ?, ?, ?, ?, ?)\n         ON CONFLICT(id) DO UPDATE SET title=excluded.title, order_index=excluded.order_index, updated_at=excluded.updated_at",
    )
    .bind(&s.id)
    .bind(&s.course_id)
    .bind(&s.title)
    .bind(s.order_index)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn delete_section(pool: &AnyPool, section_id: &str) -> Result<u64> {
    let mut tx = pool.begin().await?;
    for table in ["lesson_progress", "lesson_notes"] {
        sqlx::query(&format!(
            "DELETE FROM {table} WHERE lesson_id IN (SELECT id FROM course_lessons WHERE section_id = ?)"
        ))
        .bind(section_id)
        .execute(&mut *tx)
        .await?;
    }
    sqlx::query("DELETE FROM course_lessons WHERE section_id = ?")
        .bind(section_id)
        .execute(&mut *tx)
        .await?;
    let res = sqlx::query("DELETE FROM course_sections WHERE id = ?")
        .bind(section_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(res.rows_affected())
}

pub async fn upsert_lessons(pool: &AnyPool, lessons: &[LessonInsert]) -> Result<()> {
    let now = now_rfc3339();
    let mut tx = pool.begin().await?;
    for l in lessons {
        sqlx::query(
            "INSERT INTO course_lessons(id, section_id, title, duration, is_free, order_index, video_url, content, created_at, updated_at)\n             VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?)\n             ON CONFLICT(id) DO UPDATE SET\n               title=excluded.title, duration=excluded.duration, is_free=excluded.is_free,\n               order_index=excluded.order_index, video_url=excluded.video_url, content=excluded.content,\n               updated_at=excluded.updated_at",
        )
        .bind(&l.id)
        .bind(&l.section_id)
        .bind(&l.title)
        .bind(&l.duration)
        .bind(l.is_free.map(i64::from))
        .bind(l.order_index)
        .bind(&l.video_url)
        .bind(&l.content)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}

/// Delete a lesson together with every learner's completion and notes for it.
pub async fn delete_lesson(pool: &AnyPool, lesson_id: &str) -> Result<u64> {
    let mut tx = pool.begin().await?;
    for table in ["lesson_progress", "lesson_notes"] {
        sqlx::query(&format!("DELETE FROM {table} WHERE lesson_id = ?"))
            .bind(lesson_id)
            .execute(&mut *tx)
            .await?;
    }
    let res = sqlx::query("DELETE FROM course_lessons WHERE id = ?")
        .bind(lesson_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(res.rows_affected())
}

// --- Categories ---

pub async fn list_categories(pool: &AnyPool) -> Result<Vec<CategoryRow>> {
    let rows = sqlx::query_as::<_, CategoryRow>("SELECT id, name FROM categories ORDER BY name ASC")
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn find_category_id_by_name(pool: &AnyPool, name: &str) -> Result<Option<String>> {
    let id = sqlx::query_scalar::<_, String>("SELECT id FROM categories WHERE name = ? LIMIT 1")
        .bind(name)
        .fetch_optional(pool)
        .await?;
    Ok(id)
}

pub async fn upsert_category(pool: &AnyPool, c: &CategoryRow) -> Result<()> {
    let now = now_rfc3339();
    sqlx::query(
        "INSERT INTO categories(id, name, created_at, updated_at) VALUES(?, ?, ?, ?)\n         ON CONFLICT(id) DO UPDATE SET name=excluded.name, updated_at=excluded.updated_at",
    )
    .bind(&c.id)
    .bind(&c.name)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn delete_category(pool: &AnyPool, category_id: &str) -> Result<u64> {
    let mut tx = pool.begin().await?;
    // Courses keep existing without a category rather than disappearing.
    sqlx::query("UPDATE courses SET category_id = NULL WHERE category_id = ?")
        .bind(category_id)
        .execute(&mut *tx)
        .await?;
    let res = sqlx::query("DELETE FROM categories WHERE id = ?")
        .bind(category_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(res.rows_affected())
}

// --- Testimonials & landing content ---

pub async fn list_testimonials(pool: &AnyPool) -> Result<Vec<TestimonialRow>> {
    let sql = format!("{TESTIMONIAL_SELECT} ORDER BY created_at DESC");
    Ok(sqlx::query_as::<_, TestimonialRow>(&sql).fetch_all(pool).await?)
}

pub async fn list_testimonials_for_course(pool: &AnyPool, course_id: &str) -> Result<Vec<TestimonialRow>> {
    let sql = format!("{TESTIMONIAL_SELECT} WHERE course_id = ? ORDER BY created_at DESC");
    Ok(sqlx::query_as::<_, TestimonialRow>(&sql).bind(course_id).fetch_all(pool).await?)
}

pub async fn insert_testimonial(pool: &AnyPool, t: &TestimonialRow) -> Result<()> {
    let now = now_rfc3339();
    sqlx::query(
        "INSERT INTO testimonials(id, name, role, content, rating, avatar_url, course_id, created_at, updated_at)\n         VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&t.id)
    .bind(&t.name)
    .bind(&t.role)
    .bind(&t.content)
    .bind(t.rating)
    .bind(&t.avatar_url)
    .bind(&t.course_id)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn delete_testimonial(pool: &AnyPool, testimonial_id: &str) -> Result<u64> {
    let res = sqlx::query("DELETE FROM testimonials WHERE id = ?")
        .bind(testimonial_id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}

pub async fn list_features(pool: &AnyPool) -> Result<Vec<FeatureRow>> {
    let rows = sqlx::query_as::<_, FeatureRow>("SELECT id, title, description, icon FROM features ORDER BY created_at ASC")
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn upsert_feature(pool: &AnyPool, f: &FeatureRow) -> Result<()> {
    let now = now_rfc3339();
    sqlx::query(
        "INSERT INTO features(id, title, description, icon, created_at, updated_at) VALUES(?, ?, ?, ?, ?, ?)\n         ON CONFLICT(id) DO UPDATE SET title=excluded.title, description=excluded.description, icon=excluded.icon, updated_at=excluded.updated_at",
    )
    .bind(&f.id)
    .bind(&f.title)
    .bind(&f.description)
    .bind(&f.icon)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn delete_feature(pool: &AnyPool, feature_id: &str) -> Result<u64> {
    let res = sqlx::query("DELETE FROM features WHERE id = ?").bind(feature_id).execute(pool).await?;
    Ok(res.rows_affected())
}

pub async fn list_benefits(pool: &AnyPool) -> Result<Vec<BenefitRow>> {
    let rows = sqlx::query_as::<_, BenefitRow>("SELECT id, title, description, color FROM benefits ORDER BY created_at ASC")
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn upsert_benefit(pool: &AnyPool, b: &BenefitRow) -> Result<()> {
    let now = now_rfc3339();
    sqlx::query(
        "INSERT INTO benefits(id, title, description, color, created_at, updated_at) VALUES(?, ?, ?, ?, ?, ?)\n         ON CONFLICT(id) DO UPDATE SET title=excluded.title, description=excluded.description, color=excluded.color, updated_at=excluded.updated_at",
    )
    .bind(&b.id)
    .bind(&b.title)
    .bind(&b.description)
    .bind(&b.color)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn delete_benefit(pool: &AnyPool, benefit_id: &str) -> Result<u64> {
    let res = sqlx::query("DELETE FROM benefits WHERE id = ?").bind(benefit_id).execute(pool).await?;
    Ok(res.rows_affected())
}

// --- Profiles ---

pub async fn get_profile(pool: &AnyPool, user_id: &str) -> Result<Option<ProfileRow>> {
    let sql = format!("{PROFILE_SELECT} WHERE id = ? LIMIT 1");
    Ok(sqlx::query_as::<_, ProfileRow>(&sql).bind(user_id).fetch_optional(pool).await?)
}

pub async fn list_profiles(pool: &AnyPool) -> Result<Vec<ProfileRow>> {
    let sql = format!("{PROFILE_SELECT} ORDER BY created_at ASC");
    Ok(sqlx::query_as::<_, ProfileRow>(&sql).fetch_all(pool).await?)
}

pub async fn upsert_profile(pool: &AnyPool, p: &ProfileRow) -> Result<()> {
    let now = now_rfc3339();
    sqlx::query(
        "INSERT INTO profiles(id, full_name, email, avatar_url, bio, phone, role, status, created_at, updated_at)\n         VALUES(?, ?, ?, ?, ?, ?, COALESCE(?, 'student'), COALESCE(?, 'active'), COALESCE(?, ?), ?)\n         ON CONFLICT(id) DO UPDATE SET\n           full_name=excluded.full_name, email=excluded.email, avatar_url=excluded.avatar_url,\n           bio=excluded.bio, phone=excluded.phone, role=excluded.role, status=excluded.status,\n           updated_at=excluded.updated_at",
    )
    .bind(&p.id)
    .bind(&p.full_name)
    .bind(&p.email)
    .bind(&p.avatar_url)
    .bind(&p.bio)
    .bind(&p.phone)
    .bind(&p.role)
    .bind(&p.status)
    .bind(&p.created_at)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;
    Ok(())
}

/// Number of purchases per user, used by the admin user table.
pub async fn count_purchases_by_user(pool: &AnyPool) -> Result<Vec<(String, i64)>> {
    let rows = sqlx::query_as::<_, (String, i64)>("SELECT user_id, COUNT(*) FROM purchases GROUP BY user_id")
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

// --- Purchases ---

const PURCHASE_SELECT: &str = "SELECT id, user_id, course_id, purchase_date, amount, COALESCE(status, '') AS status FROM purchases";

pub async fn list_user_purchases(pool: &AnyPool, user_id: &str) -> Result<Vec<PurchaseRow>> {
    let sql = format!("{PURCHASE_SELECT} WHERE user_id = ? ORDER BY purchase_date DESC");
    Ok(sqlx::query_as::<_, PurchaseRow>(&sql).bind(user_id).fetch_all(pool).await?)
}

pub async fn list_all_purchases(pool: &AnyPool) -> Result<Vec<PurchaseRow>> {
    let sql = format!("{PURCHASE_SELECT} ORDER BY purchase_date ASC");
    Ok(sqlx::query_as::<_, PurchaseRow>(&sql).fetch_all(pool).await?)
}

pub async fn has_user_purchased_course(pool: &AnyPool, user_id: &str, course_id: &str) -> Result<bool> {
    let id = sqlx::query_scalar::<_, String>(
        "SELECT id FROM purchases WHERE user_id = ? AND course_id = ? AND status = 'completed' LIMIT 1",
    )
    .bind(user_id)
    .bind(course_id)
    .fetch_optional(pool)
    .await?;
    Ok(id.is_some())
}

pub async fn insert_purchase(pool: &AnyPool, p: &PurchaseRow) -> Result<()> {
    let now = now_rfc3339();
    sqlx::query(
        "INSERT INTO purchases(id, user_id, course_id, purchase_date, amount, status, created_at, updated_at)\n         VALUES(?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&p.id)
    .bind(&p.user_id)
    .bind(&p.course_id)
    .bind(&p.purchase_date)
    .bind(p.amount)
    .bind(&p.status)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;
    Ok(())
}

/// Record a completed purchase and bump the course's student counter in one transaction.
/// Returns `false`, writing nothing, when the user already owns the course. Courses that only
/// exist on a remote backend have no local counter to bump.
pub async fn record_purchase(pool: &AnyPool, p: &PurchaseRow) -> Result<bool> {
    let now = now_rfc3339();
    let mut tx = pool.begin().await?;
    let res = sqlx::query(
        "INSERT INTO purchases(id, user_id, course_id, purchase_date, amount, status, created_at, updated_at)\n         SELECT ?, ?, ?, ?, ?, ?, ?, ?\n         WHERE NOT EXISTS (SELECT 1 FROM purchases WHERE user_id = ? AND course_id = ? AND status = 'completed')",
    )
    .bind(&p.id)
    .bind(&p.user_id)
    .bind(&p.course_id)
    .bind(&p.purchase_date)
    .bind(p.amount)
    .bind(&p.status)
    .bind(&now)
    .bind(&now)
    .bind(&p.user_id)
    .bind(&p.course_id)
    .execute(&mut *tx)
    .await?;
    if res.rows_affected() == 0 {
        tx.rollback().await?;
        return Ok(false);
    }
    sqlx::query("UPDATE courses SET students_count = COALESCE(students_count, 0) + 1 WHERE id = ?")
        .bind(&p.course_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(true)
}

pub async fn update_purchase_status(pool: &AnyPool, purchase_id: &str, status: &str) -> Result<u64> {
    let res = sqlx::query("UPDATE purchases SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status)
        .bind(now_rfc3339())
        .bind(purchase_id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}

// --- Learner progress & notes ---

pub async fn list_completed_lessons(pool: &AnyPool, user_id: &str, course_id: &str) -> Result<Vec<String>> {
    let rows = sqlx::query_scalar::<_, String>(
        "SELECT lesson_id FROM lesson_progress WHERE user_id = ? AND course_id = ?",
    )
    .bind(user_id)
    .bind(course_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn mark_lessons_completed(pool: &AnyPool, user_id: &str, course_id: &str, lesson_ids: &[String]) -> Result<()> {
    let now = now_rfc3339();
    let mut tx = pool.begin().await?;
    for lesson_id in lesson_ids {
        sqlx::query(
            "INSERT INTO lesson_progress(user_id, course_id, lesson_id, completed_at) VALUES(?, ?, ?, ?)\n             ON CONFLICT(user_id, lesson_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(course_id)
        .bind(lesson_id)
        .bind(&now)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}

pub async fn list_notes(pool: &AnyPool, user_id: &str, course_id: &str) -> Result<Vec<(String, String)>> {
    let rows = sqlx::query_as::<_, (String, String)>(
        "SELECT lesson_id, body FROM lesson_notes WHERE user_id = ? AND course_id = ?",
    )
    .bind(user_id)
    .bind(course_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn upsert_notes(pool: &AnyPool, user_id: &str, course_id: &str, notes: &[(String, String)]) -> Result<()> {
    let now = now_rfc3339();
    let mut tx = pool.begin().await?;
    for (lesson_id, body) in notes {
        sqlx::query(
            "INSERT INTO lesson_notes(user_id, course_id, lesson_id, body, updated_at) VALUES(?, ?, ?, ?, ?)\n             ON CONFLICT(user_id, lesson_id) DO UPDATE SET body=excluded.body, updated_at=excluded.updated_at",
        )
        .bind(user_id)
        .bind(course_id)
        .bind(lesson_id)
        .bind(body)
        .bind(&now)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}
