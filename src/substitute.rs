//! `{{FIELD}}` replacement in body paragraphs.
//!
//! Matching is run-local: a token is replaced only inside the run whose text
//! contains it whole. Tokens split across runs by earlier rich-text editing
//! stay in place unless [`SubstitutionMode::MergeRuns`] is selected, which
//! first folds the runs covering a split token into the first of them.

use crate::docx::Document;
use crate::docx::document::{paragraph_text, run_text, runs, runs_mut, set_run_text};
use crate::docx::xml::XmlElement;
use clap::ValueEnum;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{([^{}]+)\}\}").expect("placeholder pattern compiles"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubstitutionMode {
    #[default]
    #[value(alias = "run_local")]
    #[serde(alias = "run-local")]
    RunLocal,
    #[value(alias = "merge_runs")]
    #[serde(alias = "merge-runs")]
    MergeRuns,
}

pub fn placeholder(key: &str) -> String {
    format!("{{{{{key}}}}}")
}

/// Replace every `{{key}}` in the body paragraphs of `document` with its
/// value. Returns the number of runs whose text changed.
pub fn substitute_placeholders(
    document: &mut Document,
    values: &IndexMap<String, String>,
    mode: SubstitutionMode,
) -> usize {
    let mut replaced = 0;
    for paragraph in document.paragraphs_mut() {
        if mode == SubstitutionMode::MergeRuns {
            merge_split_tokens(paragraph, values);
        }
        replaced += substitute_paragraph(paragraph, values);
    }
    replaced
}

fn substitute_paragraph(paragraph: &mut XmlElement, values: &IndexMap<String, String>) -> usize {
    let mut replaced = 0;
    for (key, value) in values {
        let token = placeholder(key);
        if !paragraph_text(paragraph).contains(&token) {
            continue;
        }
        for run in runs_mut(paragraph) {
            let text = run_text(run);
            if text.contains(&token) {
                set_run_text(run, &text.replace(&token, value));
                replaced += 1;
            }
        }
    }
    replaced
}

/// Fold runs so that every token of a known key present in the paragraph
/// text lies within a single run. Returns the number of merges performed.
fn merge_split_tokens(paragraph: &mut XmlElement, values: &IndexMap<String, String>) -> usize {
    let text = paragraph_text(paragraph);
    let tokens: Vec<String> = values
        .keys()
        .map(|key| placeholder(key))
        .filter(|token| text.contains(token))
        .collect();
    if tokens.is_empty() {
        return 0;
    }

    let mut merges = 0;
    loop {
        let texts: Vec<String> = runs(paragraph).into_iter().map(run_text).collect();
        let Some((first, last)) = find_split_token(&texts, &tokens) else {
            break;
        };
        let joined = texts[first..=last].concat();
        for (idx, run) in runs_mut(paragraph).into_iter().enumerate() {
            if idx == first {
                set_run_text(run, &joined);
            } else if idx > first && idx <= last {
                set_run_text(run, "");
            }
        }
        merges += 1;
    }
    if merges > 0 {
        tracing::debug!(merges, "merged runs around split placeholders");
    }
    merges
}

/// First token occurrence spanning more than one run, as an inclusive run range.
fn find_split_token(texts: &[String], tokens: &[String]) -> Option<(usize, usize)> {
    let mut starts = Vec::with_capacity(texts.len());
    let mut offset = 0;
    for text in texts {
        starts.push(offset);
        offset += text.len();
    }
    let run_at = |pos: usize| starts.partition_point(|start| *start <= pos).saturating_sub(1);

    let full = texts.concat();
    tokens.iter().find_map(|token| {
        full.match_indices(token.as_str()).find_map(|(pos, _)| {
            let first = run_at(pos);
            let last = run_at(pos + token.len() - 1);
            (first != last).then_some((first, last))
        })
    })
}

/// Placeholder keys still present in body paragraphs, in document order.
pub fn unresolved_placeholders(document: &Document) -> Vec<String> {
    document
        .paragraphs()
        .flat_map(|paragraph| {
            let text = paragraph_text(paragraph);
            PLACEHOLDER
                .captures_iter(&text)
                .map(|caps| caps[1].to_string())
                .collect::<Vec<_>>()
        })
        .collect()
}
