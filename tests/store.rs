//! End-to-end checks against a seeded SQLite file.

use coursehub::dao::CourseUpdate;
use coursehub::db::sqlite_url_for;
use coursehub::types::{FilterState, Level, ALL};
use coursehub::{CourseHub, NewCourse};
use tempfile::TempDir;

async fn seeded_hub() -> (TempDir, CourseHub) {
    let tmp = tempfile::tempdir().unwrap();
    let url = sqlite_url_for(&tmp.path().join("hub.db"));
    let hub = CourseHub::connect(Some(&url), true).await.unwrap();
    assert!(hub.seed_demo_catalog().await.unwrap());
    (tmp, hub)
}

#[tokio::test]
async fn seeding_twice_is_a_no_op() {
    let (_tmp, hub) = seeded_hub().await;
    assert!(!hub.seed_demo_catalog().await.unwrap());
    assert_eq!(hub.courses().await.unwrap().len(), 5);
}

#[tokio::test]
async fn catalog_page_filters_searches_and_sorts() {
    let (_tmp, hub) = seeded_hub().await;

    let all = hub.catalog_page(&FilterState::default()).await.unwrap();
    assert_eq!(all.total_courses, 5);
    assert_eq!(all.courses.len(), 5);
    assert_eq!(all.courses[0].id, "course-web", "most students first");
    assert!(all.categories.contains(&"Development".to_string()));

    let dev = hub
        .catalog_page(&FilterState { category: "Development".into(), query: String::new(), sort: "price-low".into() })
        .await
        .unwrap();
    let ids: Vec<_> = dev.courses.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, ["course-web", "course-rust"]);

    let search = hub
        .catalog_page(&FilterState { category: ALL.into(), query: "OWNERSHIP".into(), sort: "rating".into() })
        .await
        .unwrap();
    assert_eq!(search.courses.len(), 1);
    assert_eq!(search.courses[0].id, "course-rust");

    let newest = hub.catalog_page(&FilterState { sort: "newest".into(), ..FilterState::default() }).await.unwrap();
    assert_eq!(newest.courses[0].id, "course-rust");
    assert_eq!(newest.courses[4].id, "course-finance");

    let lowercase = hub
        .catalog_page(&FilterState { category: "development".into(), ..FilterState::default() })
        .await
        .unwrap();
    assert!(lowercase.courses.is_empty(), "category match is case-sensitive");
}

#[tokio::test]
async fn course_detail_has_curriculum_totals() {
    let (_tmp, hub) = seeded_hub().await;
    let detail = hub.course_detail("course-rust").await.unwrap().unwrap();

    assert_eq!(detail.course.level, Level::Intermediate);
    assert_eq!(detail.course.discount_percent(), Some(55));
    assert_eq!(detail.stats.section_count, 2);
    assert_eq!(detail.stats.lesson_count, 3);
    assert_eq!(detail.stats.free_preview_count, 2);
    assert_eq!(detail.stats.total_minutes, 40);
    assert_eq!(detail.stats.formatted, "0h 40m");
    assert_eq!(detail.curriculum[0].title, "Getting Started");
    assert_eq!(detail.curriculum[0].lessons[1].id, "les-rust-2");

    assert_eq!(detail.testimonials.len(), 1);
    assert_eq!(detail.testimonials[0].rating, 5, "missing rating defaults to 5");

    assert!(hub.course_detail("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn home_page_sections() {
    let (_tmp, hub) = seeded_hub().await;
    let home = hub.home_page("Design").await;

    assert_eq!(home.categories.len(), 4);
    assert_eq!(home.courses.len(), 1);
    let featured: Vec<_> = home.featured.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(featured, ["course-rust", "course-ui", "course-finance"]);
    let bestsellers: Vec<_> = home.bestsellers.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(bestsellers, ["course-rust", "course-web"]);
    assert_eq!(home.testimonials.len(), 3);
    assert_eq!(home.features.len(), 3);
    assert_eq!(home.benefits.len(), 3);
}

#[tokio::test]
async fn learning_session_survives_a_round_trip() {
    let (_tmp, hub) = seeded_hub().await;
    let curriculum = hub.curriculum("course-rust").await.unwrap();

    let mut session = hub.open_session("user-student", "course-rust", &curriculum).await.unwrap();
    assert_eq!(session.current_lesson.as_deref(), Some("les-rust-1"));
    assert_eq!(session.completed_count(), 0);

    session.mark_completed("les-rust-1");
    session.mark_completed("les-rust-3");
    session.save_notes("les-rust-3", "borrowck is my friend");
    hub.save_session("user-student", &session).await.unwrap();

    let restored = hub.open_session("user-student", "course-rust", &curriculum).await.unwrap();
    assert_eq!(restored.progress, session.progress);
    assert_eq!(restored.notes, session.notes);
    assert!((restored.percentage(3) - 200.0 / 3.0).abs() < 1e-9);

    let other = hub.open_session("user-admin", "course-rust", &curriculum).await.unwrap();
    assert_eq!(other.completed_count(), 0);
}

#[tokio::test]
async fn purchases_and_admin_figures() {
    let (_tmp, hub) = seeded_hub().await;

    assert!(hub.has_purchased("user-student", "course-rust").await.unwrap());
    assert!(!hub.has_purchased("user-student", "course-web").await.unwrap(), "pending does not count");
    assert!(hub.purchase("user-student", "course-rust").await.is_err());
    assert!(hub.purchase("user-student", "nope").await.is_err());

    let bought = hub.purchase("user-admin", "course-growth").await.unwrap();
    assert_eq!(bought.amount, 39.99);
    assert!(hub.has_purchased("user-admin", "course-growth").await.unwrap());
    let growth = hub.course_detail("course-growth").await.unwrap().unwrap();
    assert_eq!(growth.course.students_count, 641);

    let mine = hub.purchases_for("user-student").await.unwrap();
    assert_eq!(mine.len(), 2);
    assert!(mine.iter().all(|p| p.course.is_some()));

    let overview = hub.admin_overview().await.unwrap();
    assert_eq!(overview.total_courses, 5);
    assert_eq!(overview.total_users, 3);
    assert_eq!(overview.purchases.total_purchases, 4);
    assert_eq!(overview.purchases.completed_purchases, 3);
    assert!((overview.purchases.total_revenue - (89.99 + 49.99 + 39.99)).abs() < 1e-9);
    assert_eq!(overview.categories[0].category, "Development");
    assert_eq!(overview.categories[0].percent, 40);
    assert_eq!(overview.top_courses[0].id, "course-web");

    let students = hub.admin_users("", "student").await.unwrap();
    assert_eq!(students.len(), 1);
    assert_eq!(students[0].enrolled_courses, 2);
    assert_eq!(hub.admin_users("EXAMPLE.COM", ALL).await.unwrap().len(), 2);

    assert_eq!(hub.admin_courses("design").await.unwrap().len(), 1);
}

#[tokio::test]
async fn admin_course_lifecycle() {
    let (_tmp, hub) = seeded_hub().await;

    let id = hub
        .add_course(NewCourse {
            title: "Data Engineering with SQL".into(),
            price: 25.0,
            original_price: Some(0.0),
            category: Some("Data".into()),
            level: Level::Advanced,
            ..NewCourse::default()
        })
        .await
        .unwrap();
    assert!(hub.add_course(NewCourse::default()).await.is_err(), "empty title is rejected");

    let section = hub.add_section(&id, "Warehouses").await.unwrap();
    hub.add_lesson(&section, "Star schemas", "30 mins", true).await.unwrap();
    hub.add_lesson(&section, "Slowly changing dimensions", "45 mins", false).await.unwrap();

    let detail = hub.course_detail(&id).await.unwrap().unwrap();
    assert_eq!(detail.course.category, "Data");
    assert_eq!(detail.course.original_price, None);
    assert_eq!(detail.stats.formatted, "1h 15m");
    assert_eq!(detail.curriculum[0].lessons[0].title, "Star schemas");
    assert!(hub.categories().await.unwrap().iter().any(|c| c.name == "Data"));

    let update = CourseUpdate { price: Some(Some(19.0)), featured: Some(true), ..CourseUpdate::default() };
    assert!(hub.update_course(&id, &update).await.unwrap());
    let detail = hub.course_detail(&id).await.unwrap().unwrap();
    assert_eq!(detail.course.price, 19.0);
    assert!(detail.course.featured);

    assert!(hub.delete_course(&id).await.unwrap());
    assert!(!hub.delete_course(&id).await.unwrap());
    assert!(hub.course_detail(&id).await.unwrap().is_none());
    assert!(hub.curriculum(&id).await.unwrap().is_empty());
}

#[tokio::test]
async fn remote_reads_are_served_from_cache() {
    use coursehub::dao::CourseRow;
    use coursehub::remote::RestClient;
    use coursehub::storage::Storage;

    let tmp = tempfile::tempdir().unwrap();
    let url = sqlite_url_for(&tmp.path().join("hub.db"));
    let mut hub = CourseHub::connect(Some(&url), true)
        .await
        .unwrap()
        // Nothing listens on the discard port; any real request fails.
        .with_remote(RestClient::new("http://127.0.0.1:9", "anon-key").unwrap());

    let rows = vec![CourseRow { id: "r1".into(), title: "Cached course".into(), price: Some(12.0), ..CourseRow::default() }];
    let expires = chrono::Utc::now().timestamp() + 600;
    hub.database()
        .put_cache("127.0.0.1|courses", &serde_json::to_string(&rows).unwrap(), expires)
        .await
        .unwrap();

    let courses = hub.courses().await.unwrap();
    assert_eq!(courses.len(), 1);
    assert_eq!(courses[0].title, "Cached course");

    // Fetch failures degrade to empty sections instead of failing the page.
    let home = hub.home_page(ALL).await;
    assert_eq!(home.courses.len(), 1);
    assert!(home.categories.is_empty());

    hub.set_refresh(true);
    assert!(hub.courses().await.is_err());
}

#[tokio::test]
async fn null_optional_columns_read_back_as_none() {
    use coursehub::dao;

    let (_tmp, hub) = seeded_hub().await;
    let pool = hub.database().pool();
    let now = "2024-06-01T00:00:00Z";
    sqlx::query("INSERT INTO courses(id, title, created_at, updated_at) VALUES('bare', 'Bare course', ?, ?)")
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO course_sections(id, course_id, title, order_index, created_at, updated_at) VALUES('bare-s', 'bare', 'Intro', 1, ?, ?)")
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO course_lessons(id, section_id, title, order_index, created_at, updated_at) VALUES('bare-l', 'bare-s', 'Welcome', 1, ?, ?)")
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO testimonials(id, name, content, created_at, updated_at) VALUES('bare-t', 'Ann', 'Great', ?, ?)")
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO purchases(id, user_id, course_id, purchase_date, amount, created_at, updated_at) VALUES('bare-p', 'user-admin', 'bare', ?, 0, ?, ?)")
        .bind(now)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .unwrap();

    let row = dao::get_course(pool, "bare").await.unwrap().unwrap();
    assert_eq!(row.description, None);
    assert_eq!(row.instructor_id, None);
    assert_eq!(row.price, None);
    assert_eq!(row.students_count, None);
    assert_eq!(row.bestseller, None);
    assert_eq!(row.category_name, None);

    let lessons = dao::list_lessons_for_course(pool, "bare").await.unwrap();
    assert_eq!(lessons.len(), 1);
    assert_eq!(lessons[0].video_url, None);
    assert_eq!(lessons[0].is_free, None);

    let detail = hub.course_detail("bare").await.unwrap().unwrap();
    assert_eq!(detail.course.price, 0.0);
    assert_eq!(detail.course.description, "");
    assert_eq!(detail.stats.lesson_count, 1);

    let t = dao::list_testimonials(pool).await.unwrap().into_iter().find(|t| t.id == "bare-t").unwrap();
    assert_eq!((t.role, t.rating, t.course_id), (None, None, None));

    let p = dao::list_user_purchases(pool, "user-admin").await.unwrap();
    assert_eq!(p[0].status, None);
    assert_eq!(hub.admin_users("", ALL).await.unwrap().len(), 3);
}

#[tokio::test]
async fn remote_courses_can_be_bought() {
    use coursehub::dao::CourseRow;
    use coursehub::remote::RestClient;
    use coursehub::storage::Storage;

    let tmp = tempfile::tempdir().unwrap();
    let url = sqlite_url_for(&tmp.path().join("hub.db"));
    let hub = CourseHub::connect(Some(&url), true)
        .await
        .unwrap()
        .with_remote(RestClient::new("http://127.0.0.1:9", "anon-key").unwrap());

    let row = CourseRow { id: "r1".into(), title: "Cached course".into(), price: Some(12.0), ..CourseRow::default() };
    let expires = chrono::Utc::now().timestamp() + 600;
    hub.database()
        .put_cache("127.0.0.1|course|r1", &serde_json::to_string(&Some(row)).unwrap(), expires)
        .await
        .unwrap();

    let bought = hub.purchase("user-student", "r1").await.unwrap();
    assert_eq!(bought.amount, 12.0);
    assert!(hub.has_purchased("user-student", "r1").await.unwrap());
    assert!(hub.purchase("user-student", "r1").await.is_err());

    let mine = hub.purchases_for("user-student").await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].course.as_ref().map(|c| c.title.as_str()), Some("Cached course"));
}

#[tokio::test]
async fn concurrent_purchases_record_one_enrollment() {
    let (_tmp, hub) = seeded_hub().await;

    let (a, b) = tokio::join!(hub.purchase("user-admin", "course-ui"), hub.purchase("user-admin", "course-ui"));
    assert_eq!(u8::from(a.is_ok()) + u8::from(b.is_ok()), 1);

    let ui = hub.course_detail("course-ui").await.unwrap().unwrap();
    assert_eq!(ui.course.students_count, 981);
    let owned = hub.purchases_for("user-admin").await.unwrap();
    assert_eq!(owned.iter().filter(|p| p.purchase.course_id == "course-ui").count(), 1);
}

#[tokio::test]
async fn deleted_lessons_drop_learner_state() {
    use coursehub::storage::ProgressStore;

    let (_tmp, hub) = seeded_hub().await;
    let curriculum = hub.curriculum("course-rust").await.unwrap();

    let mut session = hub.open_session("user-student", "course-rust", &curriculum).await.unwrap();
    session.mark_completed("les-rust-1");
    session.mark_completed("les-rust-2");
    session.save_notes("les-rust-2", "lifetimes");
    hub.save_session("user-student", &session).await.unwrap();

    assert!(hub.delete_lesson("les-rust-2").await.unwrap());
    let (progress, notes) = hub.database().load_progress("user-student", "course-rust").await.unwrap();
    assert_eq!(progress.keys().collect::<Vec<_>>(), ["les-rust-1"]);
    assert!(notes.is_empty());

    let curriculum = hub.curriculum("course-rust").await.unwrap();
    let restored = hub.open_session("user-student", "course-rust", &curriculum).await.unwrap();
    assert_eq!(restored.completed_count(), 1);
    assert!((restored.percentage(2) - 50.0).abs() < 1e-9);

    // State for lessons missing from the curriculum handed in is not surfaced.
    let later_sections = &curriculum[1..];
    let partial = hub.open_session("user-student", "course-rust", later_sections).await.unwrap();
    assert_eq!(partial.completed_count(), 0);

    assert!(hub.delete_course("course-rust").await.unwrap());
    let (progress, _) = hub.database().load_progress("user-student", "course-rust").await.unwrap();
    assert!(progress.is_empty());
}

#[tokio::test]
async fn course_prices_must_be_non_negative() {
    let (_tmp, hub) = seeded_hub().await;

    for price in [-10.0, f64::NAN, f64::INFINITY] {
        let new = NewCourse { title: "Bad price".into(), price, ..NewCourse::default() };
        assert!(hub.add_course(new).await.is_err(), "price {price} accepted");
    }
    let new = NewCourse { title: "Bad original".into(), price: 5.0, original_price: Some(-1.0), ..NewCourse::default() };
    assert!(hub.add_course(new).await.is_err());
    assert_eq!(hub.courses().await.unwrap().len(), 5);

    let update = CourseUpdate { price: Some(Some(-1.0)), ..CourseUpdate::default() };
    assert!(hub.update_course("course-rust", &update).await.is_err());
    let update = CourseUpdate { original_price: Some(Some(f64::NAN)), ..CourseUpdate::default() };
    assert!(hub.update_course("course-rust", &update).await.is_err());
    let free = CourseUpdate { price: Some(Some(0.0)), ..CourseUpdate::default() };
    assert!(hub.update_course("course-rust", &free).await.unwrap());
}

#[tokio::test]
async fn home_page_caps_the_course_grid() {
    let (_tmp, hub) = seeded_hub().await;
    for i in 0..5 {
        hub.add_course(NewCourse { title: format!("Extra {i}"), price: 10.0, ..NewCourse::default() }).await.unwrap();
    }
    assert_eq!(hub.courses().await.unwrap().len(), 10);
    assert_eq!(hub.home_page(ALL).await.courses.len(), coursehub::HOME_COURSES_LIMIT);
}

#[tokio::test]
async fn catalog_ttl_comes_from_config() {
    use coursehub::config::{Config, DEFAULT_CATALOG_TTL_SECS};

    let tmp = tempfile::tempdir().unwrap();
    let url = sqlite_url_for(&tmp.path().join("hub.db"));
    let hub = CourseHub::connect(Some(&url), true).await.unwrap();
    assert_eq!(hub.catalog_ttl_secs(), DEFAULT_CATALOG_TTL_SECS);

    let cfg = Config { database_url: Some(url), catalog_ttl_secs: 42, ..Config::default() };
    let hub = CourseHub::from_config(&cfg).await.unwrap();
    assert_eq!(hub.catalog_ttl_secs(), 42);
}
