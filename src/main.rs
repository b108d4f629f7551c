mod cli;

use anyhow::{bail, Result};
use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use cli::{AdminCommands, CacheCommands, Cli, Commands};
use coursehub::config::Config;
use coursehub::progress::find_lesson;
use coursehub::types::{CourseSummary, FilterState, Level, SortKey};
use coursehub::{CourseHub, NewCourse};

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

async fn run(cli: Cli) -> Result<()> {
    let mut cfg = Config::load(cli.config.as_deref())?;
    if let Some(url) = cli.database {
        cfg.database_url = Some(url);
    }
    let mut hub = CourseHub::from_config(&cfg).await?;
    hub.set_refresh(cli.refresh);

    match cli.command {
        Commands::Courses { category, search, sort, json } => {
            if sort.parse::<SortKey>().is_err() {
                eprintln!("unknown sort '{sort}', keeping catalog order");
            }
            let page = hub.catalog_page(&FilterState { category, query: search, sort }).await?;
            if json {
                return print_json(&page);
            }
            println!("Showing {} of {} courses", page.courses.len(), page.total_courses);
            for c in &page.courses {
                print_course(c);
            }
        }
        Commands::Home { category, json } => {
            let home = hub.home_page(&category).await;
            if json {
                return print_json(&home);
            }
            let names: Vec<&str> = home.categories.iter().map(|c| c.name.as_str()).collect();
            println!("Categories: {}", names.join(", "));
            println!("\nFeatured");
            home.featured.iter().for_each(print_course);
            println!("\nBestsellers");
            home.bestsellers.iter().for_each(print_course);
            println!("\nCourses in {category}: {}", home.courses.len());
            if !home.testimonials.is_empty() {
                println!("\nWhat learners say");
                for t in &home.testimonials {
                    println!("  {} ({}) {}/5: {}", t.name, t.role, t.rating, t.content);
                }
            }
            for f in &home.features {
                println!("* {}: {}", f.title, f.description);
            }
        }
        Commands::Course { id, json } => {
            let Some(detail) = hub.course_detail(&id).await? else { bail!("course not found: {id}") };
            if json {
                return print_json(&detail);
            }
            let c = &detail.course;
            println!("{}\n  by {} | {} | {}", c.title, c.instructor, c.level, c.category);
            match (c.original_price, c.discount_percent()) {
                (Some(original), Some(pct)) => println!("  ${:.2} (was ${original:.2}, {pct}% off)", c.price),
                _ => println!("  ${:.2}", c.price),
            }
            let s = &detail.stats;
            println!(
                "\n{} sections, {} lessons ({} free previews), {} total length",
                s.section_count, s.lesson_count, s.free_preview_count, s.formatted
            );
            for section in &detail.curriculum {
                println!("  {}", section.title);
                for l in &section.lessons {
                    let free = if l.is_free { " [preview]" } else { "" };
                    println!("    - {} ({}){free}", l.title, l.duration);
                }
            }
            for t in &detail.testimonials {
                println!("\n  \"{}\" - {}, {}/5", t.content, t.name, t.rating);
            }
        }
        Commands::Progress { course_id, user, complete, note } => {
            let Some(detail) = hub.course_detail(&course_id).await? else { bail!("course not found: {course_id}") };
            let curriculum = detail.curriculum;
            let mut session = hub.open_session(&user, &course_id, &curriculum).await?;
            let mut changed = false;
            for lesson in &complete {
                if find_lesson(&curriculum, lesson).is_none() {
                    bail!("lesson {lesson} is not part of {course_id}");
                }
                changed |= session.mark_completed(lesson);
                session.select(&curriculum, lesson);
            }
            for pair in note.chunks(2) {
                if let [lesson, text] = pair {
                    if find_lesson(&curriculum, lesson).is_none() {
                        bail!("lesson {lesson} is not part of {course_id}");
                    }
                    session.save_notes(lesson, text.clone());
                    changed = true;
                }
            }
            if changed {
                hub.save_session(&user, &session).await?;
            }
            let total = detail.stats.lesson_count;
            println!(
                "{}: {}/{} lessons completed ({:.0}%)",
                detail.course.title,
                session.completed_count(),
                total,
                session.percentage(total)
            );
            for section in &curriculum {
                println!("  {}", section.title);
                for l in &section.lessons {
                    let mark = if session.is_completed(&l.id) { "x" } else { " " };
                    let here = if session.current_lesson.as_deref() == Some(l.id.as_str()) { " <" } else { "" };
                    println!("    [{mark}] {} {}{here}", l.id, l.title);
                    let notes = session.notes_for(&l.id);
                    if !notes.is_empty() {
                        println!("        notes: {notes}");
                    }
                }
            }
        }
        Commands::Buy { course_id, user } => {
            let p = hub.purchase(&user, &course_id).await?;
            println!("purchased {} for ${:.2} ({})", p.course_id, p.amount, p.id);
        }
        Commands::Purchases { user } => {
            let list = hub.purchases_for(&user).await?;
            if list.is_empty() {
                println!("no purchases for {user}");
            }
            for item in list {
                let title = item.course.as_ref().map(|c| c.title.as_str()).unwrap_or("(deleted course)");
                let status = item.purchase.status.as_deref().unwrap_or("unknown");
                println!("{}  {title}  ${:.2}  {status}", item.purchase.purchase_date, item.purchase.amount);
            }
        }
        Commands::Admin { command } => run_admin(&hub, command).await?,
        Commands::Seed => {
            if hub.seed_demo_catalog().await? {
                println!("demo catalog loaded");
            } else {
                println!("catalog already has courses; nothing to do");
            }
        }
        Commands::Cache { command: CacheCommands::Clear { prefix } } => {
            let removed = hub.clear_cache_prefix(prefix.as_deref()).await?;
            println!("removed {removed} cache entries");
        }
        Commands::Vacuum => hub.vacuum_db().await?,
    }
    Ok(())
}

async fn run_admin(hub: &CourseHub, command: AdminCommands) -> Result<()> {
    match command {
        AdminCommands::Stats { json } => {
            let o = hub.admin_overview().await?;
            if json {
                return print_json(&o);
            }
            println!("Courses: {}  Users: {}", o.total_courses, o.total_users);
            println!(
                "Purchases: {} ({} completed)  Revenue: ${:.2}",
                o.purchases.total_purchases, o.purchases.completed_purchases, o.purchases.total_revenue
            );
            for m in &o.revenue_by_month {
                println!("  {}  ${:.2}  ({} sales)", m.month, m.revenue, m.purchases);
            }
            println!("Categories:");
            for s in &o.categories {
                println!("  {:<20} {:>3} courses  {:>3}%", s.category, s.courses, s.percent);
            }
            println!("Top courses:");
            o.top_courses.iter().for_each(print_course);
            println!("Cache: {} entries ({} expired)", o.cache_entries, o.expired_cache_entries);
        }
        AdminCommands::Courses { search } => {
            for c in hub.admin_courses(&search).await? {
                print_course(&c);
            }
        }
        AdminCommands::Users { search, role } => {
            for u in hub.admin_users(&search, &role).await? {
                println!("{}  {} <{}>  {}  {}  {} courses", u.id, u.name, u.email, u.role, u.status, u.enrolled_courses);
            }
        }
        AdminCommands::AddCourse { title, description, instructor, price, original_price, category, level, duration, bestseller, featured } => {
            let id = hub
                .add_course(NewCourse {
                    title,
                    description,
                    instructor,
                    image_url: String::new(),
                    price,
                    original_price,
                    category,
                    level: Level::from(level),
                    duration,
                    bestseller,
                    featured,
                })
                .await?;
            println!("{id}");
        }
        AdminCommands::DeleteCourse { id } => {
            if !hub.delete_course(&id).await? {
                bail!("course not found: {id}");
            }
            println!("deleted {id}");
        }
    }
    Ok(())
}

fn print_course(c: &CourseSummary) {
    let flags = match (c.bestseller, c.featured) {
        (true, true) => " [bestseller, featured]",
        (true, false) => " [bestseller]",
        (false, true) => " [featured]",
        _ => "",
    };
    println!(
        "{:<16} {:<40} {:<12} ${:>7.2}  {:.1}*  {:>6} students{flags}",
        c.id, c.title, c.category, c.price, c.rating, c.students_count
    );
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
