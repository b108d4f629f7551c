use chrono::{DateTime, NaiveDateTime, Utc};

use crate::dao::{BenefitRow, CategoryRow, CourseInsert, CourseRow, FeatureRow, LessonRow, SectionRow, TestimonialRow};
use crate::types::{Benefit, Category, CourseSummary, CurriculumSection, Feature, Lesson, Level, Testimonial};

/// Raw course row -> display record. Every absent field gets its default; never fails.
pub fn normalize(raw: &CourseRow) -> CourseSummary {
    CourseSummary {
        id: raw.id.clone(),
        title: raw.title.clone(),
        description: raw.description.clone().unwrap_or_default(),
        image_url: raw.image_url.clone().unwrap_or_default(),
        instructor: raw.instructor_name.clone().unwrap_or_default(),
        price: raw.price.unwrap_or(0.0),
        // A zero original price carries no discount information.
        original_price: raw.original_price.filter(|p| *p != 0.0),
        rating: raw.rating.unwrap_or(0.0),
        students_count: raw.students_count.map(|n| n.max(0) as u64).unwrap_or(0),
        category: raw.category_name.clone().unwrap_or_default(),
        level: raw.level.as_deref().filter(|l| !l.is_empty()).map(Level::from).unwrap_or_default(),
        duration: raw.duration.clone().unwrap_or_default(),
        bestseller: raw.bestseller.unwrap_or(false),
        featured: raw.featured.unwrap_or(false),
        created_at: raw.created_at.as_deref().and_then(parse_timestamp),
    }
}

pub fn normalize_all(rows: &[CourseRow]) -> Vec<CourseSummary> {
    rows.iter().map(normalize).collect()
}

/// RFC 3339, or the `YYYY-MM-DD HH:MM:SS` form SQL `CURRENT_TIMESTAMP` produces (read as UTC).
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|n| n.and_utc())
}

pub fn lesson_from_row(row: &LessonRow) -> Lesson {
    Lesson {
        id: row.id.clone(),
        title: row.title.clone(),
        duration: row.duration.clone().unwrap_or_default(),
        is_free: row.is_free.unwrap_or(false),
        order_index: row.order_index,
        video_url: row.video_url.clone(),
        content: row.content.clone(),
    }
}

/// Group lesson rows under their sections. Both come out ordered by `order_index`;
/// lessons whose section is not in `sections` are dropped.
pub fn curriculum_from_rows(sections: &[SectionRow], lessons: &[LessonRow]) -> Vec<CurriculumSection> {
    let mut out: Vec<CurriculumSection> = sections
        .iter()
        .map(|s| CurriculumSection {
            id: s.id.clone(),
            title: s.title.clone(),
            order_index: s.order_index,
            lessons: lessons.iter().filter(|l| l.section_id == s.id).map(lesson_from_row).collect(),
        })
        .collect();
    out.sort_by_key(|s| s.order_index);
    for s in &mut out {
        s.lessons.sort_by_key(|l| l.order_index);
    }
    out
}

pub fn category_from_row(row: &CategoryRow) -> Category {
    Category { id: row.id.clone(), name: row.name.clone() }
}

pub fn testimonial_from_row(row: &TestimonialRow) -> Testimonial {
    Testimonial {
        id: row.id.clone(),
        name: row.name.clone(),
        role: row.role.clone().unwrap_or_default(),
        content: row.content.clone(),
        rating: row.rating.unwrap_or(5),
        avatar_url: row.avatar_url.clone().unwrap_or_default(),
    }
}

pub fn feature_from_row(row: &FeatureRow) -> Feature {
    Feature { title: row.title.clone(), description: row.description.clone(), icon: row.icon.clone() }
}

pub fn benefit_from_row(row: &BenefitRow) -> Benefit {
    Benefit { title: row.title.clone(), description: row.description.clone(), color: row.color.clone() }
}

/// Insert payload for a course authored in the admin editor.
pub fn course_insert_from_summary(id: String, category_id: Option<String>, c: &CourseSummary) -> CourseInsert {
    CourseInsert {
        id,
        title: c.title.clone(),
        description: Some(c.description.clone()).filter(|s| !s.is_empty()),
        image_url: Some(c.image_url.clone()).filter(|s| !s.is_empty()),
        instructor_name: Some(c.instructor.clone()).filter(|s| !s.is_empty()),
        price: Some(c.price),
        original_price: c.original_price,
        rating: Some(c.rating),
        students_count: Some(c.students_count as i64),
        category_id,
        level: Some(c.level.label().to_string()),
        duration: Some(c.duration.clone()).filter(|s| !s.is_empty()),
        bestseller: Some(c.bestseller),
        featured: Some(c.featured),
        created_at: c.created_at.unwrap_or_else(Utc::now).to_rfc3339(),
    }
}
