//! Property tests for the catalog query pipeline and progress math.

use coursehub::catalog::{apply_filters, filter_by_category, filter_by_search, sort_courses};
use coursehub::curriculum::parse_duration_minutes;
use coursehub::progress::compute_progress;
use coursehub::types::{CourseSummary, FilterState, Level, ProgressMap, ALL};
use proptest::prelude::*;

const CATEGORIES: &[&str] = &["Development", "Design", "Business", "development", ""];

fn course_strategy() -> impl Strategy<Value = (usize, String, f64, f64, u64)> {
    (
        0..CATEGORIES.len(),
        "[a-zA-Z ]{0,12}",
        0.0f64..500.0,
        0.0f64..5.0,
        // Narrow range so ties are common.
        0u64..4,
    )
}

fn catalog() -> impl Strategy<Value = Vec<CourseSummary>> {
    prop::collection::vec(course_strategy(), 0..40).prop_map(|specs| {
        specs
            .into_iter()
            .enumerate()
            .map(|(i, (cat, title, price, rating, students))| CourseSummary {
                id: i.to_string(),
                title,
                description: format!("course number {i}"),
                image_url: String::new(),
                instructor: String::new(),
                price,
                original_price: None,
                rating,
                students_count: students,
                category: CATEGORIES[cat].to_string(),
                level: Level::Beginner,
                duration: String::new(),
                bestseller: false,
                featured: false,
                created_at: None,
            })
            .collect()
    })
}

fn ids(courses: &[CourseSummary]) -> Vec<usize> {
    courses.iter().map(|c| c.id.parse().unwrap()).collect()
}

proptest! {
    #[test]
    fn prop_all_category_is_identity(courses in catalog()) {
        let before = courses.clone();
        let ptr = courses.as_ptr();
        let out = filter_by_category(courses, ALL);
        prop_assert_eq!(out.as_ptr(), ptr);
        prop_assert_eq!(out, before);
    }

    #[test]
    fn prop_empty_query_is_identity(courses in catalog()) {
        let before = courses.clone();
        let ptr = courses.as_ptr();
        let out = filter_by_search(courses, "");
        prop_assert_eq!(out.as_ptr(), ptr);
        prop_assert_eq!(out, before);
    }

    #[test]
    fn prop_category_filter_is_exact_ordered_subset(courses in catalog(), cat in 0..CATEGORIES.len()) {
        let wanted = CATEGORIES[cat];
        let expected: Vec<usize> = courses.iter().filter(|c| c.category == wanted).map(|c| c.id.parse().unwrap()).collect();
        let out = filter_by_category(courses, wanted);
        prop_assert!(out.iter().all(|c| c.category == wanted));
        prop_assert_eq!(ids(&out), expected);
    }

    #[test]
    fn prop_search_is_idempotent(courses in catalog(), query in "[a-zA-Z]{0,3}") {
        let once = filter_by_search(courses, &query);
        let twice = filter_by_search(once.clone(), &query);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_sort_keeps_every_course(courses in catalog(), key in prop::sample::select(vec!["popular", "newest", "price-low", "price-high", "rating", "bogus"])) {
        let mut before = ids(&courses);
        let mut after = ids(&sort_courses(courses, key));
        before.sort_unstable();
        after.sort_unstable();
        prop_assert_eq!(before, after);
    }

    #[test]
    fn prop_popular_sort_is_stable(courses in catalog()) {
        let out = sort_courses(courses, "popular");
        for w in out.windows(2) {
            prop_assert!(w[0].students_count >= w[1].students_count);
            if w[0].students_count == w[1].students_count {
                let (a, b): (usize, usize) = (w[0].id.parse().unwrap(), w[1].id.parse().unwrap());
                prop_assert!(a < b, "ties must keep input order");
            }
        }
    }

    #[test]
    fn prop_price_sorts_are_monotone(courses in catalog()) {
        let low = sort_courses(courses.clone(), "price-low");
        prop_assert!(low.windows(2).all(|w| w[0].price <= w[1].price));
        let high = sort_courses(courses, "price-high");
        prop_assert!(high.windows(2).all(|w| w[0].price >= w[1].price));
    }

    #[test]
    fn prop_unknown_sort_keeps_order(courses in catalog(), key in "[A-Z][a-z]{0,8}") {
        let before = ids(&courses);
        prop_assert_eq!(ids(&sort_courses(courses, &key)), before);
    }

    #[test]
    fn prop_default_filter_only_sorts(courses in catalog()) {
        let expected = ids(&sort_courses(courses.clone(), "popular"));
        prop_assert_eq!(ids(&apply_filters(courses, &FilterState::default())), expected);
    }

    #[test]
    fn prop_progress_is_a_percentage(total in 1usize..50, done in prop::collection::vec(any::<bool>(), 0..50)) {
        let progress: ProgressMap = done.iter().take(total).enumerate().map(|(i, d)| (format!("l{i}"), *d)).collect();
        let pct = compute_progress(&progress, total);
        prop_assert!((0.0..=100.0).contains(&pct));
        let completed = done.iter().take(total).filter(|d| **d).count();
        prop_assert!((pct - 100.0 * completed as f64 / total as f64).abs() < 1e-9);
    }

    #[test]
    fn prop_duration_reads_leading_integer(n in 0u32..100_000, suffix in " ?(mins?|minutes)?") {
        prop_assert_eq!(parse_duration_minutes(&format!("{n}{suffix}")), n);
    }
}
