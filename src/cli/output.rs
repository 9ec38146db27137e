use crate::hocr::selector::{BboxResult, BoundingBox};
use crate::hocr::annotations::format_confidence;
use crate::{SpellcheckReport, Suggestion};
use anyhow::Result;
use colored::*;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    file: String,
    #[serde(flatten)]
    report: &'a SpellcheckReport,
}

#[derive(Debug, Serialize)]
struct JsonBoxes<'a> {
    query: Option<&'a str>,
    boxes: &'a [BoundingBox],
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct JsonWord<'a> {
    word: &'a str,
    path: &'a str,
    suggestions: &'a [Suggestion],
}

fn format_suggestions(suggestions: &[Suggestion], colored_output: bool) -> String {
    let separator = if colored_output {
        ", ".dimmed().to_string()
    } else {
        ", ".to_string()
    };
    suggestions
        .iter()
        .map(|s| {
            let confidence = format!("({})", format_confidence(s.confidence));
            if colored_output {
                format!("{} {}", s.text.green(), confidence.dimmed())
            } else {
                format!("{} {}", s.text, confidence)
            }
        })
        .collect::<Vec<_>>()
        .join(&separator)
}

fn print_file_header(file_path: &Path, colored_output: bool) {
    let file_name = file_path.display().to_string();
    if colored_output {
        println!("\n{}", file_name.bold().underline());
    } else {
        println!("\n{}", file_name);
    }
}

pub fn print_report(
    file_path: &Path,
    report: &SpellcheckReport,
    colored_output: bool,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Text => {
            print_text_report(file_path, report, colored_output);
            Ok(())
        }
        OutputFormat::Json => {
            let output = JsonReport {
                file: file_path.display().to_string(),
                report,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
    }
}

fn print_text_report(file_path: &Path, report: &SpellcheckReport, colored_output: bool) {
    if report.corrections.is_empty() {
        return;
    }

    print_file_header(file_path, colored_output);

    for correction in &report.corrections {
        if colored_output {
            println!(
                "  {} {}",
                correction.path.blue().bold(),
                correction.word.red().bold()
            );
            println!(
                "    {} {}",
                "→".dimmed(),
                format_suggestions(&correction.suggestions, colored_output)
            );
        } else {
            println!("  {} {}", correction.path, correction.word);
            println!(
                "    → {}",
                format_suggestions(&correction.suggestions, colored_output)
            );
        }
    }
}

pub fn print_bboxes(
    file_path: &Path,
    result: &BboxResult,
    colored_output: bool,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let output: Vec<JsonBoxes> = match result {
                BboxResult::Ungrouped(boxes) => vec![JsonBoxes {
                    query: None,
                    boxes,
                    error: None,
                }],
                BboxResult::Grouped(groups) => groups
                    .iter()
                    .map(|g| match &g.boxes {
                        Ok(boxes) => JsonBoxes {
                            query: Some(g.query.as_str()),
                            boxes,
                            error: None,
                        },
                        Err(e) => JsonBoxes {
                            query: Some(g.query.as_str()),
                            boxes: &[],
                            error: Some(e.to_string()),
                        },
                    })
                    .collect(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => {
            print_file_header(file_path, colored_output);
            match result {
                BboxResult::Ungrouped(boxes) => {
                    for bbox in boxes {
                        println!("  {}", bbox);
                    }
                }
                BboxResult::Grouped(groups) => {
                    for group in groups {
                        if colored_output {
                            println!("  {}", group.query.cyan().bold());
                        } else {
                            println!("  {}", group.query);
                        }
                        match &group.boxes {
                            Ok(boxes) => {
                                for bbox in boxes {
                                    println!("    {}", bbox);
                                }
                            }
                            Err(e) if colored_output => println!("    {}", e.to_string().red()),
                            Err(e) => println!("    {}", e),
                        }
                    }
                }
            }
        }
    }
    Ok(())
}

/// Print the alternatives stored on each word: `(word, path, suggestions)`.
pub fn print_stored_suggestions(
    file_path: &Path,
    words: &[(String, String, Vec<Suggestion>)],
    colored_output: bool,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let output: Vec<JsonWord> = words
                .iter()
                .map(|(word, path, suggestions)| JsonWord {
                    word,
                    path,
                    suggestions,
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => {
            print_file_header(file_path, colored_output);
            for (word, path, suggestions) in words {
                let listed = if suggestions.is_empty() {
                    "-".to_string()
                } else {
                    format_suggestions(suggestions, colored_output)
                };
                if colored_output {
                    println!("  {} {} {}", path.blue(), word.bold(), listed);
                } else {
                    println!("  {} {} {}", path, word, listed);
                }
            }
        }
    }
    Ok(())
}

pub fn print_check_summary(
    report: &SpellcheckReport,
    files: &[impl AsRef<Path>],
    colored: bool,
    dry_run: bool,
) {
    println!();
    let file_word = if files.len() == 1 { "file" } else { "files" };
    if report.words_annotated == 0 {
        let message = format!(
            "✓ No suggestions for {} words in {} {}",
            report.words_checked,
            files.len(),
            file_word
        );
        if colored {
            println!("{}", message.green().bold());
        } else {
            println!("{}", message);
        }
        return;
    }

    let word_word = if report.words_checked == 1 { "word" } else { "words" };
    let verb = if dry_run { "found" } else { "written" };
    if colored {
        println!(
            "{} {} suggestions {} for {} of {} {} in {} {}",
            "✓".green().bold(),
            report.suggestions_inserted.to_string().green().bold(),
            verb,
            report.words_annotated.to_string().yellow().bold(),
            report.words_checked,
            word_word,
            files.len(),
            file_word
        );
    } else {
        println!(
            "✓ {} suggestions {} for {} of {} {} in {} {}",
            report.suggestions_inserted,
            verb,
            report.words_annotated,
            report.words_checked,
            word_word,
            files.len(),
            file_word
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_format_suggestions_plain() {
        let suggestions = vec![Suggestion::new("word", 0.9), Suggestion::new("ward", 1.0)];
        assert_eq!(
            format_suggestions(&suggestions, false),
            "word (0.9), ward (1.0)"
        );
    }
}
