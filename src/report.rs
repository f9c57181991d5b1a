//! Terminal rendering for `trk status`, `trk show` and `trk notes`.
//!
//! Renderers build a `String` so the commands stay thin and the layout can
//! be tested without capturing stdout.

use std::fmt::Write;

use anyhow::{bail, Result};
use skilltrack_core::{NoteField, Notes, ProgressReport, SectionReport, SubsectionReport, TaskCounts};

use crate::location::Location;

/// `0.425` → `"42.5%"`.
pub fn percent(ratio: f64) -> String {
    format!("{:.1}%", ratio * 100.0)
}

fn counts(c: TaskCounts) -> String {
    format!("{}/{}", c.completed, c.total)
}

/// The overview printed by `trk status`.
pub fn render_status(report: &ProgressReport, location: &Location) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Learning Progress");
    let _ = writeln!(out, "=================");
    let _ = writeln!(out);
    let _ = writeln!(out, "  Storage:     {}", location);
    let _ = writeln!(out, "  Overall:     {}", percent(report.overall));
    let _ = writeln!(out, "  Completed:   {} tasks", counts(report.counts));

    if !report.sections.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "  {:<32} {:>8} {:>9}", "SECTION", "PROGRESS", "TASKS");
        let _ = writeln!(out, "  {}", "-".repeat(51));
        for section in &report.sections {
            let _ = writeln!(
                out,
                "  {:<32} {:>8} {:>9}",
                section.title,
                percent(section.ratio),
                counts(section.counts)
            );
        }
    }
    out
}

/// The checklist printed by `trk show`, optionally narrowed to one section
/// or one subsection key.
pub fn render_checklist(report: &ProgressReport, filter: Option<&str>) -> Result<String> {
    let mut out = String::new();

    let Some(key) = filter else {
        for (i, section) in report.sections.iter().enumerate() {
            if i > 0 {
                let _ = writeln!(out);
            }
            write_section(&mut out, section, section.subsections.iter());
        }
        return Ok(out);
    };

    if let Some(section) = report.section(key) {
        write_section(&mut out, section, section.subsections.iter());
        return Ok(out);
    }

    for section in &report.sections {
        if let Some(sub) = section.subsections.iter().find(|s| s.key == key) {
            write_section(&mut out, section, std::iter::once(sub));
            return Ok(out);
        }
    }

    bail!("Unknown section or subsection: {}", key)
}

fn write_section<'a>(
    out: &mut String,
    section: &SectionReport,
    subsections: impl Iterator<Item = &'a SubsectionReport>,
) {
    let _ = writeln!(
        out,
        "{}  {}  ({} tasks)",
        section.title,
        percent(section.ratio),
        counts(section.counts)
    );
    for sub in subsections {
        let _ = writeln!(
            out,
            "  {}  {:.0}%  ({})",
            sub.title,
            sub.ratio * 100.0,
            counts(sub.counts)
        );
        for task in &sub.tasks {
            let mark = if task.done { "x" } else { " " };
            let _ = writeln!(out, "    [{}] {}  ({})", mark, task.label, task.key);
        }
    }
}

/// The three note fields printed by `trk notes`.
pub fn render_notes(notes: &Notes) -> String {
    let mut out = String::new();
    for field in NoteField::ALL {
        let text = notes.get(field);
        let _ = writeln!(out, "{}:", field.as_str());
        if text.is_empty() {
            let _ = writeln!(out, "  (empty)");
        } else {
            for line in text.lines() {
                let _ = writeln!(out, "  {}", line);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use skilltrack_core::{Catalogue, Document, Progress, Section, Subsection, Task};

    fn catalogue() -> Catalogue {
        let sub = |key: &str, title: &str, tasks: &[&str]| Subsection {
            key: key.into(),
            title: title.into(),
            tasks: tasks
                .iter()
                .map(|t| Task {
                    key: t.to_string(),
                    label: format!("Learn {}", t),
                })
                .collect(),
        };
        Catalogue::new(vec![
            Section {
                key: "foundations".into(),
                title: "Foundations".into(),
                subsections: vec![
                    sub("linux", "Linux Fundamentals", &["permissions", "cron_jobs"]),
                    sub("docker", "Docker", &["dockerfile"]),
                ],
            },
            Section {
                key: "sre".into(),
                title: "SRE".into(),
                subsections: vec![sub("slo", "SLOs", &["slis"])],
            },
        ])
    }

    fn report(done: &[&str]) -> ProgressReport {
        let cat = catalogue();
        let mut doc = Document::new();
        for key in done {
            doc.set_complete(*key, true);
        }
        Progress::new(&cat, &doc).report()
    }

    #[test]
    fn percent_has_one_decimal() {
        assert_eq!(percent(0.0), "0.0%");
        assert_eq!(percent(0.125), "12.5%");
        assert_eq!(percent(1.0), "100.0%");
    }

    #[test]
    fn status_lists_sections_and_counts() {
        let out = render_status(&report(&["linux_permissions"]), &Location::Local);
        assert!(out.contains("Overall:     12.5%"), "{}", out);
        assert!(out.contains("Completed:   1/4 tasks"), "{}", out);
        assert!(out.contains("Foundations"));
        assert!(out.contains("25.0%"));
        assert!(out.contains("1/3"));
    }

    #[test]
    fn checklist_marks_done_tasks() {
        let out = render_checklist(&report(&["docker_dockerfile"]), None).unwrap();
        assert!(out.contains("[x] Learn dockerfile  (docker_dockerfile)"));
        assert!(out.contains("[ ] Learn permissions  (linux_permissions)"));
        assert!(out.contains("SRE  0.0%"));
    }

    #[test]
    fn checklist_filters_by_section_or_subsection() {
        let r = report(&[]);
        let section = render_checklist(&r, Some("sre")).unwrap();
        assert!(section.contains("SLOs"));
        assert!(!section.contains("Foundations"));

        let sub = render_checklist(&r, Some("docker")).unwrap();
        assert!(sub.contains("Docker"));
        assert!(!sub.contains("Linux Fundamentals"));

        assert!(render_checklist(&r, Some("nope")).is_err());
    }

    #[test]
    fn notes_show_placeholders() {
        let notes = Notes {
            in_progress: "Helm\nArgoCD".into(),
            ..Notes::default()
        };
        let out = render_notes(&notes);
        assert!(out.starts_with("to_learn:\n  (empty)\n"));
        assert!(out.contains("in_progress:\n  Helm\n  ArgoCD\n"));
    }
}
