use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Browse and manage an online course catalog
#[derive(Parser)]
#[command(name = "coursehub")]
#[command(about = "Browse the course catalog, track learning progress and run the admin back-office", long_about = None)]
pub struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Database URL, e.g. sqlite://hub.db?mode=rwc
    #[arg(long, global = true)]
    pub database: Option<String>,
    /// Ignore cached backend responses
    #[arg(long, global = true)]
    pub refresh: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List courses with category, search and sort applied
    Courses {
        #[arg(short, long, default_value = "all")]
        category: String,
        #[arg(short, long, default_value = "")]
        search: String,
        /// popular, newest, price-low, price-high or rating
        #[arg(long, default_value = "popular")]
        sort: String,
        #[arg(long)]
        json: bool,
    },
    /// Landing page: featured, bestsellers, testimonials
    Home {
        #[arg(short, long, default_value = "all")]
        category: String,
        #[arg(long)]
        json: bool,
    },
    /// Course details and curriculum totals
    Course {
        id: String,
        #[arg(long)]
        json: bool,
    },
    /// Show or update a learner's progress through a course
    Progress {
        course_id: String,
        #[arg(short, long)]
        user: String,
        /// Mark a lesson completed (repeatable)
        #[arg(long, value_name = "LESSON")]
        complete: Vec<String>,
        /// Save notes for a lesson (repeatable)
        #[arg(long, num_args = 2, value_names = ["LESSON", "TEXT"])]
        note: Vec<String>,
    },
    /// Buy a course for a user
    Buy {
        course_id: String,
        #[arg(short, long)]
        user: String,
    },
    /// A user's purchases
    Purchases {
        #[arg(short, long)]
        user: String,
    },
    /// Back-office commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },
    /// Load the demo catalog into an empty database
    Seed,
    /// Manage cached backend responses
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
    /// Compact the database file
    Vacuum,
}

#[derive(Subcommand)]
pub enum AdminCommands {
    /// Sales, catalog mix and cache figures
    Stats {
        #[arg(long)]
        json: bool,
    },
    /// Search courses by title or category
    Courses {
        #[arg(short, long, default_value = "")]
        search: String,
    },
    /// Search users by name or email
    Users {
        #[arg(short, long, default_value = "")]
        search: String,
        #[arg(short, long, default_value = "all")]
        role: String,
    },
    AddCourse {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "")]
        instructor: String,
        #[arg(long, default_value_t = 0.0)]
        price: f64,
        #[arg(long)]
        original_price: Option<f64>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long, default_value = "Beginner")]
        level: String,
        #[arg(long, default_value = "")]
        duration: String,
        #[arg(long)]
        bestseller: bool,
        #[arg(long)]
        featured: bool,
    },
    DeleteCourse {
        id: String,
    },
}

#[derive(Subcommand)]
pub enum CacheCommands {
    /// Remove cached entries, optionally only keys starting with PREFIX
    Clear {
        #[arg(long)]
        prefix: Option<String>,
    },
}
