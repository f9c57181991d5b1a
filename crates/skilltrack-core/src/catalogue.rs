//! The read-only catalogue of trackable tasks.
//!
//! A catalogue is an ordered tree: sections contain subsections, and
//! subsections contain tasks. Each task is stored in the progress
//! [`Document`](crate::models::Document) under the composite key
//! `<subsection_key>_<task_key>`, so composite keys must be unique across
//! the whole catalogue. [`Catalogue::validate`] enforces that.

use std::collections::HashSet;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// A single checkbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub key: String,
    pub label: String,
}

/// A named group of tasks, e.g. "Linux Fundamentals".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subsection {
    pub key: String,
    pub title: String,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl Subsection {
    /// The flat document key for one of this subsection's tasks.
    pub fn task_key(&self, task: &Task) -> String {
        format!("{}_{}", self.key, task.key)
    }

    /// All composite keys in catalogue order.
    pub fn task_keys(&self) -> impl Iterator<Item = String> + '_ {
        self.tasks.iter().map(|t| self.task_key(t))
    }
}

/// A top-level group of subsections, e.g. "Foundations".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub key: String,
    pub title: String,
    #[serde(default)]
    pub subsections: Vec<Subsection>,
}

/// The whole catalogue.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalogue {
    #[serde(default)]
    pub sections: Vec<Section>,
}

/// A task located in the catalogue by its composite key.
#[derive(Debug, Clone, Copy)]
pub struct TaskRef<'a> {
    pub section: &'a Section,
    pub subsection: &'a Subsection,
    pub task: &'a Task,
}

impl Catalogue {
    pub fn new(sections: Vec<Section>) -> Self {
        Self { sections }
    }

    pub fn section(&self, key: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.key == key)
    }

    pub fn subsection(&self, key: &str) -> Option<(&Section, &Subsection)> {
        self.sections.iter().find_map(|section| {
            section
                .subsections
                .iter()
                .find(|sub| sub.key == key)
                .map(|sub| (section, sub))
        })
    }

    /// Look up a task by its composite key.
    pub fn find_task(&self, composite_key: &str) -> Option<TaskRef<'_>> {
        self.sections.iter().find_map(|section| {
            section.subsections.iter().find_map(|subsection| {
                subsection
                    .tasks
                    .iter()
                    .find(|task| subsection.task_key(task) == composite_key)
                    .map(|task| TaskRef {
                        section,
                        subsection,
                        task,
                    })
            })
        })
    }

    pub fn contains_task(&self, composite_key: &str) -> bool {
        self.find_task(composite_key).is_some()
    }

    /// Every composite key, in catalogue order.
    pub fn task_keys(&self) -> Vec<String> {
        self.sections
            .iter()
            .flat_map(|s| s.subsections.iter())
            .flat_map(|sub| sub.task_keys())
            .collect()
    }

    pub fn task_count(&self) -> usize {
        self.sections
            .iter()
            .flat_map(|s| s.subsections.iter())
            .map(|sub| sub.tasks.len())
            .sum()
    }

    /// Check structural invariants.
    ///
    /// Fails on empty keys, on a section or subsection key used twice, and
    /// on two tasks that map to the same composite document key (for example
    /// subsection `a_b` task `c` and subsection `a` task `b_c`).
    pub fn validate(&self) -> Result<()> {
        let mut section_keys = HashSet::new();
        let mut subsection_keys = HashSet::new();
        let mut task_keys = HashSet::new();

        for section in &self.sections {
            if section.key.is_empty() {
                bail!("section '{}' has an empty key", section.title);
            }
            if !section_keys.insert(section.key.as_str()) {
                bail!("duplicate section key '{}'", section.key);
            }
            for sub in &section.subsections {
                if sub.key.is_empty() {
                    bail!("subsection '{}' in '{}' has an empty key", sub.title, section.key);
                }
                if !subsection_keys.insert(sub.key.as_str()) {
                    bail!("duplicate subsection key '{}'", sub.key);
                }
                for task in &sub.tasks {
                    if task.key.is_empty() {
                        bail!("task '{}' in '{}' has an empty key", task.label, sub.key);
                    }
                    let composite = sub.task_key(task);
                    if !task_keys.insert(composite.clone()) {
                        bail!(
                            "task key '{}' is defined more than once (last seen in '{}')",
                            composite,
                            sub.key
                        );
                    }
                }
            }
        }
        Ok(())
    }
}
