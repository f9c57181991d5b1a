//! Completion rollups.
//!
//! Ratios are pure functions of a [`Catalogue`] and a [`Document`] and are
//! recomputed on every call. The rollup policy is uniform at every level:
//!
//! | Level | Ratio |
//! |-------|-------|
//! | subsection | completed tasks ÷ tasks (0 when empty) |
//! | section | unweighted mean of its subsection ratios (0 when empty) |
//! | overall | unweighted mean of the section ratios (0 when empty) |
//!
//! A six-task subsection therefore weighs as much as a ten-task one inside
//! its section. Raw task counts are available through [`TaskCounts`] for
//! display, but are never turned into a second, competing ratio.

use serde::Serialize;

use crate::catalogue::{Catalogue, Section, Subsection};
use crate::models::Document;

/// Completed and total task counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TaskCounts {
    pub completed: usize,
    pub total: usize,
}

impl TaskCounts {
    fn add(self, other: TaskCounts) -> TaskCounts {
        TaskCounts {
            completed: self.completed + other.completed,
            total: self.total + other.total,
        }
    }
}

/// Read-only view pairing a catalogue with a document.
#[derive(Debug, Clone, Copy)]
pub struct Progress<'a> {
    catalogue: &'a Catalogue,
    document: &'a Document,
}

impl<'a> Progress<'a> {
    pub fn new(catalogue: &'a Catalogue, document: &'a Document) -> Self {
        Self {
            catalogue,
            document,
        }
    }

    pub fn is_complete(&self, composite_key: &str) -> bool {
        self.document.is_complete(composite_key)
    }

    pub fn subsection_counts(&self, subsection: &Subsection) -> TaskCounts {
        let completed = subsection
            .task_keys()
            .filter(|k| self.document.is_complete(k))
            .count();
        TaskCounts {
            completed,
            total: subsection.tasks.len(),
        }
    }

    /// Fraction of the subsection's tasks that are done, in `[0, 1]`.
    pub fn subsection_ratio(&self, subsection: &Subsection) -> f64 {
        let counts = self.subsection_counts(subsection);
        if counts.total == 0 {
            return 0.0;
        }
        counts.completed as f64 / counts.total as f64
    }

    /// Unweighted mean of the section's subsection ratios, in `[0, 1]`.
    pub fn section_ratio(&self, section: &Section) -> f64 {
        mean(section.subsections.iter().map(|s| self.subsection_ratio(s)))
    }

    /// Unweighted mean of all section ratios, in `[0, 1]`.
    pub fn overall_ratio(&self) -> f64 {
        mean(self.catalogue.sections.iter().map(|s| self.section_ratio(s)))
    }

    pub fn section_counts(&self, section: &Section) -> TaskCounts {
        section
            .subsections
            .iter()
            .map(|s| self.subsection_counts(s))
            .fold(TaskCounts::default(), TaskCounts::add)
    }

    pub fn total_counts(&self) -> TaskCounts {
        self.catalogue
            .sections
            .iter()
            .map(|s| self.section_counts(s))
            .fold(TaskCounts::default(), TaskCounts::add)
    }

    /// Build the full report tree.
    pub fn report(&self) -> ProgressReport {
        let sections = self
            .catalogue
            .sections
            .iter()
            .map(|section| SectionReport {
                key: section.key.clone(),
                title: section.title.clone(),
                ratio: self.section_ratio(section),
                counts: self.section_counts(section),
                subsections: section
                    .subsections
                    .iter()
                    .map(|sub| self.subsection_report(sub))
                    .collect(),
            })
            .collect();

        ProgressReport {
            overall: self.overall_ratio(),
            counts: self.total_counts(),
            sections,
        }
    }

    fn subsection_report(&self, sub: &Subsection) -> SubsectionReport {
        SubsectionReport {
            key: sub.key.clone(),
            title: sub.title.clone(),
            ratio: self.subsection_ratio(sub),
            counts: self.subsection_counts(sub),
            tasks: sub
                .tasks
                .iter()
                .map(|task| {
                    let key = sub.task_key(task);
                    TaskReport {
                        done: self.document.is_complete(&key),
                        key,
                        label: task.label.clone(),
                    }
                })
                .collect(),
        }
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

/// Serializable snapshot of every ratio, for display surfaces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressReport {
    pub overall: f64,
    pub counts: TaskCounts,
    pub sections: Vec<SectionReport>,
}

impl ProgressReport {
    pub fn section(&self, key: &str) -> Option<&SectionReport> {
        self.sections.iter().find(|s| s.key == key)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionReport {
    pub key: String,
    pub title: String,
    pub ratio: f64,
    pub counts: TaskCounts,
    pub subsections: Vec<SubsectionReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubsectionReport {
    pub key: String,
    pub title: String,
    pub ratio: f64,
    pub counts: TaskCounts,
    pub tasks: Vec<TaskReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskReport {
    pub key: String,
    pub label: String,
    pub done: bool,
}
