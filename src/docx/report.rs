// src/docx/report.rs

use super::{Block, Document, ParagraphKind, Run, Table, markdown::parse_markdown};
use crate::{
    ai::prompts::format_marks,
    models::result::{CheckResult, SolutionResult},
};

const TITLE_COLOR: &str = "1A237E";
const SECTION_COLOR: &str = "1565C0";
const TOPIC_COLOR: &str = "4A148C";
const TIPS_COLOR: &str = "E65100";

fn title(doc: &mut Document, text: &str) {
    doc.push(Block::Heading {
        level: 1,
        runs: vec![Run::bold(text).sized(32).colored(TITLE_COLOR)],
    });
}

/// Section heading followed by the parsed markdown body. Skipped when the body is blank.
fn markdown_section(doc: &mut Document, heading: &str, color: &'static str, body: &str) {
    if body.trim().is_empty() {
        return;
    }
    doc.push(Block::Heading {
        level: 2,
        runs: vec![Run::bold(heading).sized(26).colored(color)],
    });
    doc.blocks.extend(parse_markdown(body));
}

fn bullet_section(doc: &mut Document, heading: &str, items: &[String]) {
    let items: Vec<&String> = items.iter().filter(|i| !i.trim().is_empty()).collect();
    if items.is_empty() {
        return;
    }
    doc.push(Block::Heading {
        level: 2,
        runs: vec![Run::bold(heading).sized(26).colored(SECTION_COLOR)],
    });
    for item in items {
        doc.push(Block::Paragraph {
            kind: ParagraphKind::Bullet,
            runs: super::markdown::inline_runs(item.trim()),
        });
    }
}

fn table_section(doc: &mut Document, heading: &str, table: Table) {
    if table.rows.is_empty() {
        return;
    }
    doc.push(Block::Heading {
        level: 2,
        runs: vec![Run::bold(heading).sized(26).colored(SECTION_COLOR)],
    });
    doc.push(Block::Table(table));
    doc.push(Block::Spacer);
}

/// Lays out a solution: title, topic line, then one section per non-empty field.
pub fn solution_document(solution: &SolutionResult) -> Document {
    let mut doc = Document::default();
    title(&mut doc, "CBSE Class 12 Accountancy Solution");

    if !solution.topic.trim().is_empty() {
        doc.push(Block::Paragraph {
            kind: ParagraphKind::Body,
            runs: vec![
                Run::bold("Topic: ").sized(24),
                Run::plain(solution.topic.trim()).sized(24).colored(TOPIC_COLOR),
            ],
        });
    }

    markdown_section(&mut doc, "Explanation", SECTION_COLOR, &solution.explanation);
    markdown_section(&mut doc, "Solution", SECTION_COLOR, &solution.solution);
    markdown_section(&mut doc, "Working Notes", SECTION_COLOR, &solution.working_notes);
    markdown_section(&mut doc, "CBSE Exam Tips", TIPS_COLOR, &solution.tips);
    markdown_section(&mut doc, "Marks Breakdown", TIPS_COLOR, &solution.marks_breakdown);

    doc
}

/// Lays out an answer evaluation with its mistakes and marking breakdown as tables.
pub fn evaluation_document(result: &CheckResult) -> Document {
    let mut doc = Document::default();
    title(&mut doc, "CBSE Class 12 Accountancy Evaluation");

    doc.push(Block::Paragraph {
        kind: ParagraphKind::Centered,
        runs: vec![
            Run::bold("Score: ").sized(28),
            Run::plain(format!(
                "{} / {} ({}%)",
                format_marks(result.score),
                format_marks(result.max_marks),
                format_marks(result.percentage)
            ))
            .sized(28)
            .colored(TOPIC_COLOR),
        ],
    });

    markdown_section(&mut doc, "Overall Feedback", SECTION_COLOR, &result.overall_feedback);
    bullet_section(&mut doc, "What You Got Right", &result.correct_parts);

    table_section(
        &mut doc,
        "Mistakes",
        Table {
            header: vec!["Mistake".into(), "Correction".into(), "Marks Lost".into()],
            rows: result
                .mistakes
                .iter()
                .map(|m| {
                    vec![
                        m.description.clone(),
                        m.correction.clone(),
                        format_marks(m.marks_lost),
                    ]
                })
                .collect(),
        },
    );

    table_section(
        &mut doc,
        "Marking Breakdown",
        Table {
            header: vec![
                "Step".into(),
                "Available".into(),
                "Awarded".into(),
                "Comment".into(),
            ],
            rows: result
                .marking_breakdown
                .iter()
                .map(|s| {
                    vec![
                        s.step.clone(),
                        format_marks(s.marks_available),
                        format_marks(s.marks_awarded),
                        s.comment.clone(),
                    ]
                })
                .collect(),
        },
    );

    bullet_section(&mut doc, "Improvement Tips", &result.improvement_tips);
    doc
}
