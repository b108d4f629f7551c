//! Demo catalog for local development and the `seed` command.

use anyhow::{Context, Result};
use sqlx::AnyPool;
use tracing::info;

use crate::dao::{self, BenefitRow, CategoryRow, CourseInsert, FeatureRow, LessonInsert, ProfileRow, PurchaseRow, SectionRow, TestimonialRow};

struct DemoCourse {
    id: &'static str,
    title: &'static str,
    description: &'static str,
    instructor: &'static str,
    category_id: &'static str,
    price: f64,
    original_price: Option<f64>,
    rating: f64,
    students: i64,
    level: &'static str,
    duration: &'static str,
    bestseller: bool,
    featured: bool,
    created_at: &'static str,
}

const CATEGORIES: &[(&str, &str)] = &[
    ("cat-dev", "Development"),
    ("cat-design", "Design"),
    ("cat-business", "Business"),
    ("cat-marketing", "Marketing"),
];

const COURSES: &[DemoCourse] = &[
    DemoCourse {
        id: "course-rust",
        title: "Rust for Systems Programmers",
        description: "Ownership, traits and async Rust from the ground up.",
        instructor: "Alan Turing",
        category_id: "cat-dev",
        price: 89.99,
        original_price: Some(199.99),
        rating: 4.8,
        students: 1520,
        level: "Intermediate",
        duration: "24 hours",
        bestseller: true,
        featured: true,
        created_at: "2024-03-01T09:00:00Z",
    },
    DemoCourse {
        id: "course-web",
        title: "Modern Web Development",
        description: "HTML, CSS and JavaScript for building real sites.",
        instructor: "Grace Hopper",
        category_id: "cat-dev",
        price: 59.99,
        original_price: Some(129.99),
        rating: 4.6,
        students: 3200,
        level: "Beginner",
        duration: "32 hours",
        bestseller: true,
        featured: false,
        created_at: "2024-01-15T09:00:00Z",
    },
    DemoCourse {
        id: "course-ui",
        title: "UI Design Fundamentals",
        description: "Layout, color and typography for product interfaces.",
        instructor: "Susan Kare",
        category_id: "cat-design",
        price: 49.99,
        original_price: None,
        rating: 4.7,
        students: 980,
        level: "Beginner",
        duration: "12 hours",
        bestseller: false,
        featured: true,
        created_at: "2024-02-10T09:00:00Z",
    },
    DemoCourse {
        id: "course-growth",
        title: "Growth Marketing Playbook",
        description: "Acquisition funnels, experiments and retention.",
        instructor: "Mary Wells",
        category_id: "cat-marketing",
        price: 39.99,
        original_price: Some(79.99),
        rating: 4.3,
        students: 640,
        level: "All Levels",
        duration: "8 hours",
        bestseller: false,
        featured: false,
        created_at: "2023-11-20T09:00:00Z",
    },
    DemoCourse {
        id: "course-finance",
        title: "Startup Finance Essentials",
        description: "Runway, unit economics and fundraising basics.",
        instructor: "Ada Lovelace",
        category_id: "cat-business",
        price: 0.0,
        original_price: None,
        rating: 4.1,
        students: 410,
        level: "Advanced",
        duration: "6 hours",
        bestseller: false,
        featured: true,
        created_at: "2023-09-05T09:00:00Z",
    },
];

// (section id, course id, title, order, [(lesson id, title, duration, free)])
type DemoSection = (&'static str, &'static str, &'static str, i64, &'static [(&'static str, &'static str, &'static str, bool)]);

const SECTIONS: &[DemoSection] = &[
    ("sec-rust-1", "course-rust", "Getting Started", 1, &[
        ("les-rust-1", "Why Rust", "5 mins", true),
        ("les-rust-2", "Installing the toolchain", "15 mins", true),
    ]),
    ("sec-rust-2", "course-rust", "Ownership", 2, &[("les-rust-3", "Moves and borrows", "20 mins", false)]),
    ("sec-web-1", "course-web", "The Browser", 1, &[
        ("les-web-1", "How pages load", "10 mins", true),
        ("les-web-2", "Semantic HTML", "25 mins", false),
    ]),
];

/// Load the demo catalog. Returns false without touching anything when the
/// database already has courses.
pub async fn seed_demo_catalog(pool: &AnyPool) -> Result<bool> {
    if !dao::list_courses(pool).await?.is_empty() {
        info!("catalog already populated; skipping seed");
        return Ok(false);
    }

    for (id, name) in CATEGORIES {
        dao::upsert_category(pool, &CategoryRow { id: id.to_string(), name: name.to_string() }).await?;
    }

    for c in COURSES {
        let insert = CourseInsert {
            id: c.id.into(),
            title: c.title.into(),
            description: Some(c.description.into()),
            image_url: Some(format!("https://images.example.com/{}.jpg", c.id)),
            instructor_name: Some(c.instructor.into()),
            price: Some(c.price),
            original_price: c.original_price,
            rating: Some(c.rating),
            students_count: Some(c.students),
            category_id: Some(c.category_id.into()),
            level: Some(c.level.into()),
            duration: Some(c.duration.into()),
            bestseller: Some(c.bestseller),
            featured: Some(c.featured),
            created_at: c.created_at.into(),
        };
        dao::insert_course(pool, &insert).await.with_context(|| format!("seeding course {}", c.id))?;
    }

    for (section_id, course_id, title, order, lessons) in SECTIONS {
        dao::upsert_section(pool, &SectionRow {
            id: section_id.to_string(),
            course_id: course_id.to_string(),
            title: title.to_string(),
            order_index: *order,
        })
        .await?;
        let rows: Vec<LessonInsert> = lessons
            .iter()
            .enumerate()
            .map(|(i, (id, title, duration, free))| LessonInsert {
                id: id.to_string(),
                section_id: section_id.to_string(),
                title: title.to_string(),
                duration: Some(duration.to_string()),
                is_free: Some(*free),
                order_index: i as i64 + 1,
                video_url: None,
                content: Some(format!("{title} lesson notes.")),
            })
            .collect();
        dao::upsert_lessons(pool, &rows).await?;
    }

    let testimonials = [
        ("t-1", "Priya Shah", Some("Backend Engineer"), "The ownership chapter finally made it click.", None, Some("course-rust")),
        ("t-2", "Tom Becker", Some("Student"), "Clear, practical and well paced.", Some(4), Some("course-web")),
        ("t-3", "Lena Ortiz", None, "Great instructors across the board.", Some(5), None),
    ];
    for (id, name, role, content, rating, course_id) in testimonials {
        dao::insert_testimonial(pool, &TestimonialRow {
            id: id.into(),
            name: name.into(),
            role: role.map(str::to_string),
            content: content.into(),
            rating,
            avatar_url: None,
            course_id: course_id.map(str::to_string),
        })
        .await?;
    }

    let features = [
        ("f-1", "Expert Instructors", "Learn from working practitioners.", "users"),
        ("f-2", "Lifetime Access", "Revisit lessons whenever you need them.", "infinity"),
        ("f-3", "Certificates", "Show what you finished.", "award"),
    ];
    for (id, title, description, icon) in features {
        dao::upsert_feature(pool, &FeatureRow { id: id.into(), title: title.into(), description: description.into(), icon: icon.into() }).await?;
    }

    let benefits = [
        ("b-1", "Learn at your pace", "Short lessons that fit around work.", "blue"),
        ("b-2", "Hands-on projects", "Every section ends with something to build.", "green"),
        ("b-3", "Community", "Ask questions and review each other's work.", "purple"),
    ];
    for (id, title, description, color) in benefits {
        dao::upsert_benefit(pool, &BenefitRow { id: id.into(), title: title.into(), description: description.into(), color: color.into() }).await?;
    }

    let profiles = [
        ("user-admin", "Ada Admin", "ada@coursehub.dev", "admin"),
        ("user-student", "Sam Student", "sam@example.com", "student"),
        ("user-instructor", "Alan Turing", "alan@example.com", "instructor"),
    ];
    for (id, name, email, role) in profiles {
        dao::upsert_profile(pool, &ProfileRow {
            id: id.into(),
            full_name: Some(name.into()),
            email: Some(email.into()),
            role: Some(role.into()),
            ..Default::default()
        })
        .await?;
    }

    let purchases = [
        ("p-1", "user-student", "course-rust", "2024-03-05T12:00:00Z", 89.99, "completed"),
        ("p-2", "user-student", "course-web", "2024-04-01T12:00:00Z", 59.99, "pending"),
        ("p-3", "user-instructor", "course-ui", "2024-04-12T12:00:00Z", 49.99, "completed"),
    ];
    for (id, user_id, course_id, date, amount, status) in purchases {
        dao::insert_purchase(pool, &PurchaseRow {
            id: id.into(),
            user_id: user_id.into(),
            course_id: course_id.into(),
            purchase_date: date.into(),
            amount,
            status: Some(status.into()),
        })
        .await?;
    }

    info!(courses = COURSES.len(), categories = CATEGORIES.len(), "seeded demo catalog");
    Ok(true)
}
