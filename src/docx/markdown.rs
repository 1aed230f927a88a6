// src/docx/markdown.rs

use std::sync::LazyLock;

use regex::Regex;

use super::{Block, ParagraphKind, Run, Table};

static SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\|?[\s\-:|]+\|?$").expect("valid separator regex"));

static INLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*[^*]+\*\*|\*[^*]+\*").expect("valid inline regex"));

/// `|---|:--:|` style lines between a table header and its rows.
pub fn is_separator(line: &str) -> bool {
    line.contains('-') && SEPARATOR.is_match(line)
}

/// Splits a pipe row into trimmed cells, dropping the empty edge cells.
pub fn split_cells(line: &str) -> Vec<String> {
    let inner = line.strip_prefix('|').unwrap_or(line);
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    inner
        .split('|')
        .map(|cell| cell.trim().replace("**", ""))
        .collect()
}

/// Converts markdown text into document blocks in one pass.
///
/// A line is a table row when it starts with `|`, or when a table is open
/// (after a separator or another row) and the line contains `|`. Any other
/// line closes the pending table before it is emitted.
pub fn parse_markdown(text: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut in_table = false;

    for line in text.lines() {
        let trimmed = line.trim();

        if is_separator(trimmed) {
            in_table = true;
            continue;
        }

        if trimmed.starts_with('|') || (in_table && trimmed.contains('|')) {
            in_table = true;
            rows.push(split_cells(trimmed));
            continue;
        }

        flush_table(&mut rows, &mut blocks);
        in_table = false;

        if trimmed.is_empty() {
            continue;
        }
        blocks.push(line_block(trimmed));
    }

    flush_table(&mut rows, &mut blocks);
    blocks
}

fn flush_table(rows: &mut Vec<Vec<String>>, blocks: &mut Vec<Block>) {
    if rows.is_empty() {
        return;
    }
    let mut drained = std::mem::take(rows).into_iter();
    let header = drained.next().unwrap_or_default();
    blocks.push(Block::Table(Table {
        header,
        rows: drained.collect(),
    }));
}

fn line_block(line: &str) -> Block {
    let hashes = line.chars().take_while(|&c| c == '#').count();
    if (1..=4).contains(&hashes) {
        if let Some(rest) = line[hashes..].strip_prefix(' ') {
            return Block::Heading {
                level: hashes as u8,
                runs: inline_runs(rest.trim())
                    .into_iter()
                    .map(|mut r| {
                        r.bold = true;
                        r
                    })
                    .collect(),
            };
        }
    }

    if let Some(item) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
        return Block::Paragraph {
            kind: ParagraphKind::Bullet,
            runs: inline_runs(item.trim()),
        };
    }

    Block::paragraph(inline_runs(line))
}

/// Splits `**bold**` and `*italic*` spans into styled runs.
pub fn inline_runs(text: &str) -> Vec<Run> {
    let mut runs = Vec::new();
    let mut last = 0;

    for m in INLINE.find_iter(text) {
        if m.start() > last {
            runs.push(Run::plain(&text[last..m.start()]));
        }
        let token = m.as_str();
        if let Some(inner) = token.strip_prefix("**").and_then(|t| t.strip_suffix("**")) {
            runs.push(Run::bold(inner));
        } else {
            runs.push(Run::plain(&token[1..token.len() - 1]).italic());
        }
        last = m.end();
    }

    if last < text.len() {
        runs.push(Run::plain(&text[last..]));
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables(blocks: &[Block]) -> Vec<&Table> {
        blocks
            .iter()
            .filter_map(|b| match b {
                Block::Table(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn journal_table_has_header_and_data_rows() {
        let md = "\
| Date | Particulars | L.F. | Debit (₹) | Credit (₹) |
|------|-------------|------|-----------|------------|
| 2024-04-01 | Cash A/c Dr. | | 1,000 | |
| | To Sales A/c | | | 1,000 |";

        let blocks = parse_markdown(md);
        let found = tables(&blocks);

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].header, vec!["Date", "Particulars", "L.F.", "Debit (₹)", "Credit (₹)"]);
        assert_eq!(found[0].rows.len(), 2);
        assert_eq!(found[0].rows[1][1], "To Sales A/c");
    }

    #[test]
    fn non_table_line_flushes_without_losing_rows() {
        let md = "| A | B |\n|---|---|\n| 1 | 2 |\n| 3 | 4 |\nNarration: being goods sold\n| X | Y |";

        let blocks = parse_markdown(md);

        assert_eq!(blocks.len(), 3);
        match &blocks[0] {
            Block::Table(t) => assert_eq!(t.rows, vec![vec!["1", "2"], vec!["3", "4"]]),
            other => panic!("expected table, got {:?}", other),
        }
        assert_eq!(
            blocks[1],
            Block::paragraph(vec![Run::plain("Narration: being goods sold")])
        );
        match &blocks[2] {
            Block::Table(t) => {
                assert_eq!(t.header, vec!["X", "Y"]);
                assert!(t.rows.is_empty());
            }
            other => panic!("expected table, got {:?}", other),
        }
    }

    #[test]
    fn rows_without_leading_pipe_continue_an_open_table() {
        let md = "| Account | Amount |\n| :--- | ---: |\nCapital | 5,000\nDrawings | 500";
        let blocks = parse_markdown(md);
        let found = tables(&blocks);

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].rows, vec![vec!["Capital", "5,000"], vec!["Drawings", "500"]]);
    }

    #[test]
    fn column_count_is_widest_row() {
        let md = "| A | B |\n|---|---|\n| 1 | 2 | 3 |\n| 4 |";
        let blocks = parse_markdown(md);
        let table = tables(&blocks)[0];

        assert_eq!(table.column_count(), 3);
        assert_eq!(Table::cell(&table.rows[1], 2), "");
    }

    #[test]
    fn blank_line_closes_table() {
        let md = "| A |\n|---|\n| 1 |\n\n| B |\n|---|\n| 2 |";
        assert_eq!(tables(&parse_markdown(md)).len(), 2);
    }

    #[test]
    fn headings_bullets_and_inline_styles() {
        let blocks = parse_markdown("## Working Note 1\n- **Goodwill** is *premium*\nPlain text");

        assert_eq!(
            blocks[0],
            Block::Heading {
                level: 2,
                runs: vec![Run::bold("Working Note 1")]
            }
        );
        assert_eq!(
            blocks[1],
            Block::Paragraph {
                kind: ParagraphKind::Bullet,
                runs: vec![
                    Run::bold("Goodwill"),
                    Run::plain(" is "),
                    Run::plain("premium").italic()
                ]
            }
        );
        assert_eq!(blocks[2], Block::paragraph(vec![Run::plain("Plain text")]));
    }

    #[test]
    fn separator_detection() {
        assert!(is_separator("|---|:---:|"));
        assert!(is_separator("---|---"));
        assert!(!is_separator("| a | b |"));
        assert!(!is_separator("|   |"));
    }

    #[test]
    fn bold_markers_are_stripped_from_cells() {
        assert_eq!(split_cells("| **Total** | 1,000 |"), vec!["Total", "1,000"]);
    }
}
