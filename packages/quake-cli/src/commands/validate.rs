use crate::cli::ValidateArgs;
use crate::exit_codes;
use crate::output;
use quake_rs::{parse_line, ParseOutcome, SkipReason};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tokio::time::Instant;

/// Skipped lines listed individually in the report
const MAX_REPORTED_SKIPS: usize = 20;

#[derive(Serialize)]
struct SkippedLine {
    line: usize,
    reason: String,
}

#[derive(Serialize, Default)]
struct ValidateOutput {
    file: String,
    lines: usize,
    samples: usize,
    empty: usize,
    skipped: usize,
    skip_counts: BTreeMap<&'static str, usize>,
    first_skipped: Vec<SkippedLine>,
    error: Option<String>,
}

fn reason_key(reason: &SkipReason) -> &'static str {
    match reason {
        SkipReason::Empty => "empty",
        SkipReason::Undecodable => "undecodable",
        SkipReason::FieldCount(_) => "field_count",
        SkipReason::NotNumeric(_) => "not_numeric",
    }
}

/// Run every line of `content` through the stream parser
fn scan(content: &[u8], result: &mut ValidateOutput) {
    let now = Instant::now();
    let mut lines: Vec<&[u8]> = content.split(|&b| b == b'\n').collect();
    if lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }

    for (index, raw) in lines.into_iter().enumerate() {
        result.lines += 1;
        match parse_line(raw, now) {
            ParseOutcome::Sample(_) => result.samples += 1,
            ParseOutcome::Skip(SkipReason::Empty) => result.empty += 1,
            ParseOutcome::Skip(reason) => {
                result.skipped += 1;
                *result.skip_counts.entry(reason_key(&reason)).or_default() += 1;
                if result.first_skipped.len() < MAX_REPORTED_SKIPS {
                    result.first_skipped.push(SkippedLine {
                        line: index + 1,
                        reason: reason.to_string(),
                    });
                }
            }
        }
    }
}

pub fn execute(args: ValidateArgs) -> i32 {
    let path = Path::new(&args.file);
    let mut result = ValidateOutput {
        file: args.file.clone(),
        ..ValidateOutput::default()
    };

    match std::fs::read(path) {
        Ok(content) => {
            scan(&content, &mut result);
            if result.samples == 0 {
                result.error = Some(format!("No valid x,y,z readings in {}", args.file));
            }
        }
        Err(e) => result.error = Some(format!("Cannot read {}: {}", args.file, e)),
    }

    if args.json {
        if let Err(e) = output::emit(&result, false, None) {
            eprintln!("Error: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
    } else if let Some(ref err) = result.error {
        eprintln!("Error: {}", err);
    } else {
        println!(
            "File '{}': {} readings, {} skipped, {} empty ({} lines)",
            args.file, result.samples, result.skipped, result.empty, result.lines
        );
        for skipped in &result.first_skipped {
            println!("  line {}: {}", skipped.line, skipped.reason);
        }
    }

    if result.error.is_some() {
        exit_codes::INPUT_ERROR
    } else {
        exit_codes::SUCCESS
    }
}
