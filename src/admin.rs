//! Back-office views: user and course search, sales figures, catalog mix.
//!
//! Everything here is a pure reduction over rows the caller already fetched.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dao::{ProfileRow, PurchaseRow};
use crate::mapping::parse_timestamp;
use crate::types::{CourseSummary, ALL};

pub const STATUS_COMPLETED: &str = "completed";
pub const UNCATEGORIZED: &str = "Uncategorized";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub status: String,
    pub joined: Option<DateTime<Utc>>,
    pub enrolled_courses: u64,
}

impl UserAccount {
    pub fn from_profile(p: &ProfileRow, enrolled_courses: u64) -> Self {
        Self {
            id: p.id.clone(),
            name: p.full_name.clone().unwrap_or_default(),
            email: p.email.clone().unwrap_or_default(),
            role: p.role.clone().unwrap_or_else(|| "student".to_string()),
            status: p.status.clone().unwrap_or_else(|| "active".to_string()),
            joined: p.created_at.as_deref().and_then(parse_timestamp),
            enrolled_courses,
        }
    }
}

/// Profiles joined with their purchase counts (users without purchases get 0).
pub fn accounts_from_profiles(profiles: &[ProfileRow], purchase_counts: &[(String, i64)]) -> Vec<UserAccount> {
    let counts: HashMap<&str, i64> = purchase_counts.iter().map(|(id, n)| (id.as_str(), *n)).collect();
    profiles
        .iter()
        .map(|p| UserAccount::from_profile(p, counts.get(p.id.as_str()).copied().unwrap_or(0).max(0) as u64))
        .collect()
}

/// Name or email contains `query` (case-insensitive), and role equals `role`
/// unless it is `"all"`.
pub fn filter_users(users: &[UserAccount], query: &str, role: &str) -> Vec<UserAccount> {
    let q = query.to_lowercase();
    users
        .iter()
        .filter(|u| q.is_empty() || u.name.to_lowercase().contains(&q) || u.email.to_lowercase().contains(&q))
        .filter(|u| role == ALL || u.role == role)
        .cloned()
        .collect()
}

/// Title or category contains `query`, case-insensitive.
pub fn search_admin_courses(courses: &[CourseSummary], query: &str) -> Vec<CourseSummary> {
    let q = query.to_lowercase();
    courses
        .iter()
        .filter(|c| c.title.to_lowercase().contains(&q) || c.category.to_lowercase().contains(&q))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PurchaseStats {
    pub total_purchases: u64,
    pub completed_purchases: u64,
    /// Sum over completed purchases only.
    pub total_revenue: f64,
}

fn is_completed(p: &PurchaseRow) -> bool { p.status.as_deref() == Some(STATUS_COMPLETED) }

pub fn purchase_stats(purchases: &[PurchaseRow]) -> PurchaseStats {
    purchases.iter().fold(PurchaseStats::default(), |mut acc, p| {
        acc.total_purchases += 1;
        if is_completed(p) {
            acc.completed_purchases += 1;
            acc.total_revenue += p.amount;
        }
        acc
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyRevenue {
    /// `YYYY-MM`
    pub month: String,
    pub revenue: f64,
    pub purchases: u64,
}

pub fn revenue_by_month(purchases: &[PurchaseRow]) -> Vec<MonthlyRevenue> {
    let mut months: BTreeMap<(i32, u32), (f64, u64)> = BTreeMap::new();
    for p in purchases.iter().filter(|p| is_completed(p)) {
        let Some(at) = parse_timestamp(&p.purchase_date) else {
            debug!(purchase = %p.id, date = %p.purchase_date, "skipping purchase with unreadable date");
            continue;
        };
        let slot = months.entry((at.year(), at.month())).or_default();
        slot.0 += p.amount;
        slot.1 += 1;
    }
    months
        .into_iter()
        .map(|((y, m), (revenue, purchases))| MonthlyRevenue { month: format!("{y:04}-{m:02}"), revenue, purchases })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryShare {
    pub category: String,
    pub courses: u64,
    /// Whole percent of all courses.
    pub percent: u32,
}

pub fn category_distribution(courses: &[CourseSummary]) -> Vec<CategoryShare> {
    let mut counts: HashMap<&str, u64> = HashMap::new();
    for c in courses {
        let name = if c.category.is_empty() { UNCATEGORIZED } else { c.category.as_str() };
        *counts.entry(name).or_default() += 1;
    }
    let total = courses.len() as f64;
    let mut shares: Vec<CategoryShare> = counts
        .into_iter()
        .map(|(name, n)| CategoryShare {
            category: name.to_string(),
            courses: n,
            percent: (n as f64 * 100.0 / total).round() as u32,
        })
        .collect();
    shares.sort_by(|a, b| b.courses.cmp(&a.courses).then_with(|| a.category.cmp(&b.category)));
    shares
}

/// Most-enrolled first; ties keep catalog order.
pub fn top_courses(courses: &[CourseSummary], n: usize) -> Vec<CourseSummary> {
    let mut out = courses.to_vec();
    out.sort_by(|a, b| b.students_count.cmp(&a.students_count));
    out.truncate(n);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Level;

    fn user(id: &str, name: &str, email: &str, role: &str) -> UserAccount {
        UserAccount {
            id: id.into(),
            name: name.into(),
            email: email.into(),
            role: role.into(),
            status: "active".into(),
            joined: None,
            enrolled_courses: 0,
        }
    }

    fn course(id: &str, category: &str, students: u64) -> CourseSummary {
        CourseSummary {
            id: id.into(),
            title: format!("Course {id}"),
            description: String::new(),
            image_url: String::new(),
            instructor: String::new(),
            price: 10.0,
            original_price: None,
            rating: 4.0,
            students_count: students,
            category: category.into(),
            level: Level::Beginner,
            duration: String::new(),
            bestseller: false,
            featured: false,
            created_at: None,
        }
    }

    fn purchase(id: &str, date: &str, amount: f64, status: Option<&str>) -> PurchaseRow {
        PurchaseRow {
            id: id.into(),
            user_id: "u1".into(),
            course_id: "c1".into(),
            purchase_date: date.into(),
            amount,
            status: status.map(str::to_string),
        }
    }

    #[test]
    fn role_all_does_not_filter() {
        let users = vec![
            user("1", "Ada Lovelace", "ada@example.com", "admin"),
            user("2", "Grace Hopper", "grace@navy.mil", "student"),
            user("3", "Alan Turing", "alan@example.com", "instructor"),
        ];
        assert_eq!(filter_users(&users, "", ALL).len(), 3);
        let ids: Vec<_> = filter_users(&users, "EXAMPLE", ALL).into_iter().map(|u| u.id).collect();
        assert_eq!(ids, ["1", "3"]);
        let ids: Vec<_> = filter_users(&users, "example", "admin").into_iter().map(|u| u.id).collect();
        assert_eq!(ids, ["1"]);
        assert!(filter_users(&users, "grace", "admin").is_empty());
    }

    #[test]
    fn admin_search_matches_title_or_category() {
        let courses = vec![course("a", "Design", 1), course("b", "Development", 2)];
        assert_eq!(search_admin_courses(&courses, "design").len(), 1);
        assert_eq!(search_admin_courses(&courses, "COURSE B")[0].id, "b");
        assert_eq!(search_admin_courses(&courses, "").len(), 2);
    }

    #[test]
    fn revenue_counts_completed_only() {
        let ps = vec![
            purchase("p1", "2024-01-05T10:00:00Z", 50.0, Some("completed")),
            purchase("p2", "2024-01-20T10:00:00Z", 30.0, Some("pending")),
            purchase("p3", "2024-02-01 09:00:00", 20.0, Some("completed")),
            purchase("p4", "2023-12-31T23:00:00Z", 5.0, None),
        ];
        let stats = purchase_stats(&ps);
        assert_eq!(stats.total_purchases, 4);
        assert_eq!(stats.completed_purchases, 2);
        assert_eq!(stats.total_revenue, 70.0);

        let months = revenue_by_month(&ps);
        assert_eq!(months.len(), 2);
        assert_eq!(months[0], MonthlyRevenue { month: "2024-01".into(), revenue: 50.0, purchases: 1 });
        assert_eq!(months[1].month, "2024-02");
    }

    #[test]
    fn distribution_is_largest_first_then_by_name() {
        let courses = vec![course("1", "Dev", 0), course("2", "Art", 0), course("3", "Dev", 0), course("4", "", 0)];
        let shares = category_distribution(&courses);
        assert_eq!(shares[0], CategoryShare { category: "Dev".into(), courses: 2, percent: 50 });
        assert_eq!(shares[1].category, "Art");
        assert_eq!(shares[2].category, UNCATEGORIZED);
        assert_eq!(shares[2].percent, 25);
        assert!(category_distribution(&[]).is_empty());
    }

    #[test]
    fn top_courses_by_enrollment() {
        let courses = vec![course("a", "x", 10), course("b", "x", 30), course("c", "x", 10)];
        let ids: Vec<_> = top_courses(&courses, 2).into_iter().map(|c| c.id).collect();
        assert_eq!(ids, ["b", "a"]);
    }

    #[test]
    fn accounts_pick_up_purchase_counts() {
        let profiles = vec![
            ProfileRow { id: "u1".into(), full_name: Some("Ada".into()), ..Default::default() },
            ProfileRow { id: "u2".into(), role: Some("admin".into()), ..Default::default() },
        ];
        let accounts = accounts_from_profiles(&profiles, &[("u1".into(), 3)]);
        assert_eq!(accounts[0].enrolled_courses, 3);
        assert_eq!(accounts[0].role, "student");
        assert_eq!(accounts[1].enrolled_courses, 0);
        assert_eq!(accounts[1].role, "admin");
        assert_eq!(accounts[1].name, "");
    }
}
