//! Catalog query pipeline: category filter, text search, sort.
//!
//! Each stage takes the collection by value and hands back a collection in
//! the same relative order. A stage with nothing to do returns its input
//! untouched, same allocation included.

use std::cmp::Ordering;

use tracing::debug;

use crate::types::{CourseSummary, FilterState, SortKey, ALL};

/// Keep courses whose category equals `category` exactly. `"all"` passes everything through.
pub fn filter_by_category(mut courses: Vec<CourseSummary>, category: &str) -> Vec<CourseSummary> {
    if category == ALL {
        return courses;
    }
    courses.retain(|c| c.category == category);
    courses
}

/// Keep courses whose title or description contains `query`, ignoring case.
/// An empty query passes everything through.
pub fn filter_by_search(mut courses: Vec<CourseSummary>, query: &str) -> Vec<CourseSummary> {
    if query.is_empty() {
        return courses;
    }
    let needle = query.to_lowercase();
    courses.retain(|c| matches_query(c, &needle));
    courses
}

fn matches_query(c: &CourseSummary, needle: &str) -> bool {
    c.title.to_lowercase().contains(needle) || c.description.to_lowercase().contains(needle)
}

/// Sort by a wire-named key. Unknown keys leave the order as it was.
pub fn sort_courses(courses: Vec<CourseSummary>, sort: &str) -> Vec<CourseSummary> {
    match sort.parse::<SortKey>() {
        Ok(key) => sort_by_key(courses, key),
        Err(_) => {
            debug!(sort, "unrecognized sort key; keeping input order");
            courses
        }
    }
}

/// Stable sort: courses that compare equal keep their input order.
pub fn sort_by_key(mut courses: Vec<CourseSummary>, key: SortKey) -> Vec<CourseSummary> {
    courses.sort_by(comparator(key));
    courses
}

pub fn comparator(key: SortKey) -> fn(&CourseSummary, &CourseSummary) -> Ordering {
    match key {
        SortKey::Popular => |a, b| b.students_count.cmp(&a.students_count),
        // None < Some, so undated courses end up after every dated one.
        SortKey::Newest => |a, b| b.created_at.cmp(&a.created_at),
        SortKey::PriceLow => |a, b| a.price.total_cmp(&b.price),
        SortKey::PriceHigh => |a, b| b.price.total_cmp(&a.price),
        SortKey::Rating => |a, b| b.rating.total_cmp(&a.rating),
    }
}

/// Category, then search, then sort.
pub fn apply_filters(courses: Vec<CourseSummary>, filter: &FilterState) -> Vec<CourseSummary> {
    let courses = filter_by_category(courses, &filter.category);
    let courses = filter_by_search(courses, &filter.query);
    sort_courses(courses, &filter.sort)
}

/// Featured courses, newest first, at most `limit`.
pub fn featured(courses: &[CourseSummary], limit: usize) -> Vec<CourseSummary> {
    flagged(courses, limit, |c| c.featured)
}

/// Bestsellers, newest first, at most `limit`.
pub fn bestsellers(courses: &[CourseSummary], limit: usize) -> Vec<CourseSummary> {
    flagged(courses, limit, |c| c.bestseller)
}

fn flagged(courses: &[CourseSummary], limit: usize, pred: impl Fn(&CourseSummary) -> bool) -> Vec<CourseSummary> {
    let picked: Vec<CourseSummary> = courses.iter().filter(|c| pred(c)).cloned().collect();
    let mut picked = sort_by_key(picked, SortKey::Newest);
    picked.truncate(limit);
    picked
}

/// Distinct non-empty category names in first-seen order.
pub fn categories_in(courses: &[CourseSummary]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for c in courses {
        if !c.category.is_empty() && !seen.iter().any(|s| s == &c.category) {
            seen.push(c.category.clone());
        }
    }
    seen
}
