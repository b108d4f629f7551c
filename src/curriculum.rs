use serde::{Deserialize, Serialize};

use crate::types::CurriculumSection;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurriculumStats {
    pub section_count: usize,
    pub lesson_count: usize,
    pub free_preview_count: usize,
    pub total_minutes: u32,
    /// `"{hours}h {minutes}m"`
    pub formatted: String,
}

/// Minutes from a free-text duration label: the leading integer, so
/// `"15 mins"` is 15. Labels without one count as 0.
///
/// This is the only place that knows the label convention.
pub fn parse_duration_minutes(label: &str) -> u32 {
    let s = label.trim_start();
    let s = s.strip_prefix('+').unwrap_or(s);
    s.bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0u32, |acc, d| acc.saturating_mul(10).saturating_add(u32::from(d - b'0')))
}

pub fn format_minutes(total: u32) -> String {
    format!("{}h {}m", total / 60, total % 60)
}

pub fn aggregate_curriculum(sections: &[CurriculumSection]) -> CurriculumStats {
    let lessons = sections.iter().flat_map(|s| s.lessons.iter());
    let (lesson_count, free_preview_count, total_minutes) = lessons.fold((0usize, 0usize, 0u32), |(n, free, mins), l| {
        (n + 1, free + usize::from(l.is_free), mins.saturating_add(parse_duration_minutes(&l.duration)))
    });
    CurriculumStats {
        section_count: sections.len(),
        lesson_count,
        free_preview_count,
        total_minutes,
        formatted: format_minutes(total_minutes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Lesson;

    fn section(id: &str, durations: &[&str]) -> CurriculumSection {
        CurriculumSection {
            id: id.into(),
            title: id.into(),
            order_index: 0,
            lessons: durations
                .iter()
                .enumerate()
                .map(|(i, d)| Lesson {
                    id: format!("{id}-{i}"),
                    title: String::new(),
                    duration: d.to_string(),
                    is_free: i == 0,
                    order_index: i as i64,
                    video_url: None,
                    content: None,
                })
                .collect(),
        }
    }

    #[test]
    fn leading_integer_is_parsed() {
        assert_eq!(parse_duration_minutes("15 mins"), 15);
        assert_eq!(parse_duration_minutes("  7min"), 7);
        assert_eq!(parse_duration_minutes("+3 mins"), 3);
        assert_eq!(parse_duration_minutes("1:30"), 1);
        assert_eq!(parse_duration_minutes("mins 15"), 0);
        assert_eq!(parse_duration_minutes(""), 0);
        assert_eq!(parse_duration_minutes("-5 mins"), 0);
        assert_eq!(parse_duration_minutes("99999999999 mins"), u32::MAX);
    }

    #[test]
    fn two_sections_forty_minutes() {
        let stats = aggregate_curriculum(&[section("s1", &["5 mins", "15 mins"]), section("s2", &["20 mins"])]);
        assert_eq!(stats.section_count, 2);
        assert_eq!(stats.lesson_count, 3);
        assert_eq!(stats.free_preview_count, 2);
        assert_eq!(stats.total_minutes, 40);
        assert_eq!(stats.formatted, "0h 40m");
    }

    #[test]
    fn formats_hours_and_minutes() {
        assert_eq!(format_minutes(125), "2h 5m");
        assert_eq!(format_minutes(60), "1h 0m");
        let stats = aggregate_curriculum(&[section("s", &["60 mins", "65 mins", "n/a"])]);
        assert_eq!(stats.total_minutes, 125);
        assert_eq!(stats.formatted, "2h 5m");
    }

    #[test]
    fn empty_curriculum_is_zero() {
        let stats = aggregate_curriculum(&[]);
        assert_eq!(stats.lesson_count, 0);
        assert_eq!(stats.formatted, "0h 0m");
    }
}
