use anyhow::Result;
use async_trait::async_trait;

use crate::dao::{BenefitRow, CategoryRow, CourseRow, FeatureRow, LessonRow, SectionRow, TestimonialRow};

/// Read side of a marketplace backend.
///
/// Rows come back raw; normalization happens in `mapping`.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Short identifier, used in cache keys and logs.
    fn name(&self) -> &str;

    /// All courses, newest first, with the category name joined in.
    async fn fetch_courses(&self) -> Result<Vec<CourseRow>>;
    async fn fetch_course(&self, course_id: &str) -> Result<Option<CourseRow>>;
    async fn fetch_categories(&self) -> Result<Vec<CategoryRow>>;
    /// Sections and their lessons for one course.
    async fn fetch_curriculum(&self, course_id: &str) -> Result<(Vec<SectionRow>, Vec<LessonRow>)>;
    /// All testimonials, or only those attached to `course_id`.
    async fn fetch_testimonials(&self, course_id: Option<&str>) -> Result<Vec<TestimonialRow>>;
    async fn fetch_features(&self) -> Result<Vec<FeatureRow>>;
    async fn fetch_benefits(&self) -> Result<Vec<BenefitRow>>;
}
