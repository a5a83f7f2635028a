//! Gloss CLI - drives annotate/synthesize rounds against a running
//! gloss-api server.

mod cli;

use anyhow::{bail, Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use serde_json::{json, Value};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Command::Annotate {
            file,
            guideline,
            task,
            round,
        } => {
            let examples = read_lines(&file)?;
            let guideline = std::fs::read_to_string(&guideline)
                .with_context(|| format!("reading guideline {}", guideline))?;

            let mut body = json!({
                "examples": examples,
                "annotation_guideline": guideline,
                "task_id": task,
            });
            if let Some(round) = round {
                body["reannotate_round"] = json!(round);
            }

            let response = post_json(&client, &cli.server, "/annotate", &body).await?;
            let annotations = response["annotations"]
                .as_array()
                .map(|a| a.len())
                .unwrap_or(0);
            println!("Annotated {} examples for task '{}'", annotations, task);
            print_edge_case_summary(&response);
        }

        Command::AnnotateOne {
            text,
            guideline,
            task,
        } => {
            let guideline = std::fs::read_to_string(&guideline)?;
            let body = json!({
                "examples": [text],
                "annotation_guideline": guideline,
                "task_id": task,
            });
            let response = post_json(&client, &cli.server, "/annotate_one", &body).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }

        Command::Synthesize {
            results,
            guideline,
            task,
            round,
        } => {
            let snapshot: Value = serde_json::from_str(
                &std::fs::read_to_string(&results)
                    .with_context(|| format!("reading results {}", results))?,
            )?;
            let Some(annotations) = snapshot["annotations"].as_array() else {
                bail!("{} has no `annotations` array", results);
            };
            let guideline_text = std::fs::read_to_string(&guideline)?;

            let mut body = json!({
                "annotation_result": annotations,
                "annotation_guideline": guideline_text,
                "task_id": task,
            });
            if let Some(round) = round {
                body["reannotate_round"] = json!(round);
            }

            let response = post_json(&client, &cli.server, "/cluster", &body).await?;
            print_improved_guideline(&guideline_text, &response);
        }
    }

    Ok(())
}

fn read_lines(path: &str) -> Result<Vec<String>> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("reading examples {}", path))?;
    let lines: Vec<String> = contents
        .lines()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect();
    if lines.is_empty() {
        bail!("{} contains no examples", path);
    }
    Ok(lines)
}

async fn post_json(
    client: &reqwest::Client,
    server: &str,
    path: &str,
    body: &Value,
) -> Result<Value> {
    let url = format!("{}{}", server.trim_end_matches('/'), path);
    let response = client.post(&url).json(body).send().await?;
    let status = response.status();
    let text = response.text().await?;
    if !status.is_success() {
        bail!("{} returned {}: {}", url, status, text);
    }
    serde_json::from_str(&text).with_context(|| format!("parsing response from {}", url))
}

fn print_edge_case_summary(response: &Value) {
    let Some(annotations) = response["annotations"].as_array() else {
        return;
    };
    let edge_cases = annotations
        .iter()
        .filter(|a| a["new_edge_case"].as_bool().unwrap_or(false))
        .count();
    println!("New edge cases flagged: {}", edge_cases);
}

/// Print the guideline with the synthesized rules appended as a numbered
/// "Edge Case Handling" section, ready for the next annotation round.
fn print_improved_guideline(guideline: &str, response: &Value) {
    let Some(suggestions) = response["suggestions"].as_object() else {
        println!("No suggestions returned.");
        return;
    };
    if suggestions.is_empty() {
        println!("No edge-case categories synthesized.");
        return;
    }

    println!("{}", guideline.trim_end());
    println!();
    println!("Edge Case Handling:");
    for (i, (_, rule)) in suggestions.iter().enumerate() {
        if let Some(rule) = rule.as_str() {
            println!("{}. {}", i + 1, rule);
        }
    }

    if let Some(dropped) = response["dropped_rules"].as_u64() {
        if dropped > 0 {
            eprintln!("(note: {} rules were not covered by any category)", dropped);
        }
    }
}
