use std::fmt::Write;

use anyhow::{Context, Result};
use serde::Deserialize;
use tagweave_engine::{BlockKey, Selection, Session, Tag, TagSet};

/// A recorded sequence of annotation operations.
#[derive(Debug, Default, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Select(Selection),
    /// Start editing the highlight covering `offset` in `block`
    Edit {
        block: BlockKey,
        offset: usize,
    },
    Apply {
        tags: TagSet,
    },
    Delete,
    Cancel,
    CreateTag(Tag),
}

impl Script {
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("invalid annotation script")
    }
}

impl Step {
    fn describe(&self) -> String {
        match self {
            Step::Select(sel) => format!(
                "select {}:{}..{}:{}",
                sel.start_block, sel.start_offset, sel.end_block, sel.end_offset
            ),
            Step::Edit { block, offset } => format!("edit {block}:{offset}"),
            Step::Apply { tags } => format!("apply {}", join(tags)),
            Step::Delete => "delete".to_string(),
            Step::Cancel => "cancel".to_string(),
            Step::CreateTag(tag) => format!("create_tag {}", tag.name),
        }
    }

    fn run(&self, session: &mut Session) -> tagweave_engine::Result<&'static str> {
        match self {
            Step::Select(selection) => Ok(if session.select(selection)? {
                "selected"
            } else {
                "ignored (empty selection)"
            }),
            Step::Edit { block, offset } => {
                let id = session.snapshot().annotation_at(block, *offset).ok_or_else(|| {
                    tagweave_engine::AnnotationError::InvalidSelection(format!(
                        "no highlight at {block}:{offset}"
                    ))
                })?;
                session.begin_edit(id)?;
                Ok("editing")
            }
            Step::Apply { tags } => session.apply(tags).map(|_| "applied"),
            Step::Delete => session.delete().map(|_| "deleted"),
            Step::Cancel => {
                session.cancel();
                Ok("cancelled")
            }
            Step::CreateTag(tag) => session.create_tag(tag.clone()).map(|_| "created"),
        }
    }
}

/// Run every step, reporting failures and carrying on.
pub fn replay(session: &mut Session, script: &Script) -> Vec<String> {
    script
        .steps
        .iter()
        .enumerate()
        .map(|(index, step)| {
            let outcome = match step.run(session) {
                Ok(outcome) => outcome.to_string(),
                Err(err) => {
                    log::warn!("step {} failed: {err}", index + 1);
                    format!("error: {err}")
                }
            };
            format!("{:>3}. {} -> {}", index + 1, step.describe(), outcome)
        })
        .collect()
}

pub fn render_highlights(session: &Session) -> String {
    let mut out = String::new();
    for segment in session.highlights() {
        let style = session.highlight_style(&segment.tags);
        let _ = writeln!(
            out,
            "{} [{}, {}) {:?} {{{}}} {}{}",
            segment.block,
            segment.interval.start,
            segment.interval.end,
            segment.text,
            style.label,
            style.color,
            if style.nested { " nested" } else { "" }
        );
    }
    out
}

pub fn render_counts(session: &Session) -> String {
    let mut out = String::new();
    for (tag, count) in session.tag_counts() {
        let _ = writeln!(out, "{tag}: {count}");
    }
    out
}

fn join(tags: &TagSet) -> String {
    tags.iter().cloned().collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tagweave_engine::TagRegistry;

    const SCRIPT: &str = r##"
[[steps]]
op = "create_tag"
name = "project.alpha"
color = "#00796b"

[[steps]]
op = "select"
start_block = "b0"
start_offset = 0
end_block = "b0"
end_offset = 9

[[steps]]
op = "apply"
tags = ["important"]

[[steps]]
op = "apply"
tags = ["orphan"]

[[steps]]
op = "select"
start_block = "b0"
start_offset = 4
end_block = "b0"
end_offset = 15

[[steps]]
op = "apply"
tags = ["project.alpha"]

[[steps]]
op = "edit"
block = "b0"
offset = 0

[[steps]]
op = "apply"
tags = ["review"]
"##;

    fn run_script() -> (Session, Vec<String>) {
        let mut session = Session::from_text("The quick brown fox", TagRegistry::with_defaults());
        let script = Script::parse(SCRIPT).unwrap();
        let report = replay(&mut session, &script);
        (session, report)
    }

    #[test]
    fn test_replay_reports_each_step() {
        let (_, report) = run_script();

        assert_eq!(
            report,
            vec![
                "  1. create_tag project.alpha -> created",
                "  2. select b0:0..b0:9 -> selected",
                "  3. apply important -> applied",
                "  4. apply orphan -> error: nothing to apply tags to: no selection and no highlight under edit",
                "  5. select b0:4..b0:15 -> selected",
                "  6. apply project.alpha -> applied",
                "  7. edit b0:0 -> editing",
                "  8. apply review -> applied",
            ]
        );
    }

    #[test]
    fn test_render_highlights_with_styles() {
        let (session, _) = run_script();

        insta::assert_snapshot!(render_highlights(&session), @r#"
        b0 [0, 4) "The " {important, review} #D32F2F nested
        b0 [4, 9) "quick" {important, project.alpha} #D32F2F nested
        b0 [9, 15) " brown" {project.alpha} #00796b
        "#);
    }

    #[test]
    fn test_render_counts() {
        let (session, _) = run_script();

        assert_eq!(
            render_counts(&session),
            "important: 2\nproject.alpha: 2\nreview: 1\n"
        );
    }

    #[test]
    fn test_unknown_op_is_rejected() {
        let result = Script::parse("[[steps]]\nop = \"teleport\"\n");

        assert!(result.is_err());
    }

    #[test]
    fn test_edit_without_highlight_reports_error() {
        let mut session = Session::from_text("plain", TagRegistry::with_defaults());
        let script = Script {
            steps: vec![
                Step::Edit {
                    block: BlockKey::from("b0"),
                    offset: 2,
                },
                Step::Delete,
            ],
        };

        let report = replay(&mut session, &script);

        assert_eq!(
            report,
            vec![
                "  1. edit b0:2 -> error: invalid selection: no highlight at b0:2",
                "  2. delete -> error: nothing to apply tags to: no selection and no highlight under edit",
            ]
        );
    }
}
