use serde::{Deserialize, Serialize};

use crate::types::{CurriculumSection, Lesson, NotesMap, ProgressMap};

/// Percent of `total_lessons` marked complete. Zero lessons is 0%.
pub fn compute_progress(progress: &ProgressMap, total_lessons: usize) -> f64 {
    if total_lessons == 0 {
        return 0.0;
    }
    100.0 * completed_count(progress) as f64 / total_lessons as f64
}

pub fn completed_count(progress: &ProgressMap) -> usize {
    progress.values().filter(|done| **done).count()
}

/// One-way: a completed lesson stays completed. Returns true if this call changed anything.
pub fn mark_completed(progress: &mut ProgressMap, lesson_id: &str) -> bool {
    match progress.get(lesson_id) {
        Some(true) => false,
        _ => {
            progress.insert(lesson_id.to_string(), true);
            true
        }
    }
}

/// Per-learner state while working through one course.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LearningSession {
    pub course_id: String,
    pub current_lesson: Option<String>,
    pub progress: ProgressMap,
    pub notes: NotesMap,
}

impl LearningSession {
    /// Opens on the first lesson of the first section, if there is one.
    pub fn new(course_id: impl Into<String>, curriculum: &[CurriculumSection]) -> Self {
        Self {
            course_id: course_id.into(),
            current_lesson: lessons_in_order(curriculum).next().map(|l| l.id.clone()),
            progress: ProgressMap::new(),
            notes: NotesMap::new(),
        }
    }

    pub fn with_state(mut self, progress: ProgressMap, notes: NotesMap) -> Self {
        self.progress = progress;
        self.notes = notes;
        self
    }

    /// Switch to `lesson_id`. Ids not in the curriculum are ignored.
    pub fn select(&mut self, curriculum: &[CurriculumSection], lesson_id: &str) -> bool {
        if lessons_in_order(curriculum).any(|l| l.id == lesson_id) {
            self.current_lesson = Some(lesson_id.to_string());
            true
        } else {
            false
        }
    }

    pub fn current<'a>(&self, curriculum: &'a [CurriculumSection]) -> Option<(&'a CurriculumSection, &'a Lesson)> {
        let id = self.current_lesson.as_deref()?;
        find_lesson(curriculum, id)
    }

    pub fn next_lesson<'a>(&self, curriculum: &'a [CurriculumSection]) -> Option<&'a Lesson> {
        let id = self.current_lesson.as_deref()?;
        let mut it = lessons_in_order(curriculum).skip_while(|l| l.id != id);
        it.next()?;
        it.next()
    }

    pub fn previous_lesson<'a>(&self, curriculum: &'a [CurriculumSection]) -> Option<&'a Lesson> {
        let id = self.current_lesson.as_deref()?;
        let mut prev = None;
        for l in lessons_in_order(curriculum) {
            if l.id == id {
                return prev;
            }
            prev = Some(l);
        }
        None
    }

    /// Move to the next lesson; stays put at the end.
    pub fn advance(&mut self, curriculum: &[CurriculumSection]) -> bool {
        match self.next_lesson(curriculum) {
            Some(l) => {
                self.current_lesson = Some(l.id.clone());
                true
            }
            None => false,
        }
    }

    pub fn go_back(&mut self, curriculum: &[CurriculumSection]) -> bool {
        match self.previous_lesson(curriculum) {
            Some(l) => {
                self.current_lesson = Some(l.id.clone());
                true
            }
            None => false,
        }
    }

    pub fn mark_completed(&mut self, lesson_id: &str) -> bool {
        mark_completed(&mut self.progress, lesson_id)
    }

    pub fn is_completed(&self, lesson_id: &str) -> bool {
        self.progress.get(lesson_id).copied().unwrap_or(false)
    }

    pub fn save_notes(&mut self, lesson_id: &str, text: impl Into<String>) {
        self.notes.insert(lesson_id.to_string(), text.into());
    }

    pub fn notes_for(&self, lesson_id: &str) -> &str {
        self.notes.get(lesson_id).map(String::as_str).unwrap_or("")
    }

    pub fn completed_count(&self) -> usize { completed_count(&self.progress) }

    pub fn percentage(&self, total_lessons: usize) -> f64 { compute_progress(&self.progress, total_lessons) }
}

pub fn lessons_in_order(curriculum: &[CurriculumSection]) -> impl Iterator<Item = &Lesson> {
    curriculum.iter().flat_map(|s| s.lessons.iter())
}

pub fn find_lesson<'a>(curriculum: &'a [CurriculumSection], lesson_id: &str) -> Option<(&'a CurriculumSection, &'a Lesson)> {
    curriculum
        .iter()
        .find_map(|s| s.lessons.iter().find(|l| l.id == lesson_id).map(|l| (s, l)))
}
