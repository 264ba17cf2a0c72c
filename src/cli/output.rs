//! Output formatting helpers for CLI commands

use crate::rag::RagResponse;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use serde_json::json;

/// Format an answer with its grounding table and usage line.
pub fn format_response_text(response: &RagResponse) -> String {
    let mut out = String::new();
    out.push_str(&response.text);
    out.push_str("\n\n");

    if response.used_candidates.is_empty() {
        out.push_str(&"No FAQ entries used".yellow().to_string());
    } else {
        out.push_str(&format_candidates_table(response));
    }
    out.push('\n');

    let model = if response.model.is_empty() {
        "-".dimmed().to_string()
    } else {
        response.model.clone()
    };
    out.push_str(&format!(
        "model: {}  tokens: {} prompt + {} completion = {}",
        model, response.prompt_tokens, response.completion_tokens, response.total_tokens
    ));
    out
}

/// Format used candidates as a table
pub fn format_candidates_table(response: &RagResponse) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["ID", "Score", "Question", "Answer"]);

    for c in &response.used_candidates {
        let score = format!("{:.4}", c.score);
        let score = if c.score >= 0.8 {
            score.green().to_string()
        } else if c.score >= 0.5 {
            score.yellow().to_string()
        } else {
            score.red().to_string()
        };

        table.add_row(vec![
            Cell::new(c.id),
            Cell::new(score),
            Cell::new(&c.q),
            Cell::new(&c.a),
        ]);
    }

    table.to_string()
}

/// Format the response as JSON
pub fn format_response_json(response: &RagResponse) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&json!({ "response": response }))
}
