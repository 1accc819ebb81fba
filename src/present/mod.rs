//! Terminal rendering for the dashboards. Everything here is write-only:
//! the pipeline and stats modules produce the data, these functions draw it.


use console::style;

use crate::pipeline::Retrieved;
use crate::stats::AgeSummary;
use crate::store::records::{Article, PatientCase};
use crate::store::sqlite::PatientStats;

/// Widest a frequency bar is allowed to grow, in cells.
const BAR_WIDTH: usize = 40;

#[inline]
pub fn print_answer(answer: &str) {
    println!();
    println!("{}", style("Answer").bold().cyan());
    println!("{}", answer.trim());
}

#[inline]
pub fn print_no_matches() {
    println!();
    println!(
        "{}",
        style("No similar records found. Try rephrasing the question.").yellow()
    );
}

#[inline]
pub fn print_articles(records: &[Retrieved<Article>]) {
    println!();
    println!(
        "{}",
        style(format!("Retrieved articles ({})", records.len()))
            .bold()
            .yellow()
    );
    for (rank, retrieved) in records.iter().enumerate() {
        println!(
            "  {}. {} {}",
            rank + 1,
            style(&retrieved.record.title).cyan(),
            style(format!("(distance {:.4})", retrieved.distance)).dim()
        );
        println!("     {}", truncated(&retrieved.record.summary, 100));
    }
}

#[inline]
pub fn print_cases(records: &[Retrieved<PatientCase>]) {
    println!();
    println!(
        "{}",
        style(format!("Similar cases ({})", records.len()))
            .bold()
            .yellow()
    );
    for (rank, retrieved) in records.iter().enumerate() {
        let case = &retrieved.record;
        println!(
            "  {}. {} (age {}) {}",
            rank + 1,
            style(&case.name).cyan(),
            case.age,
            style(format!("(distance {:.4})", retrieved.distance)).dim()
        );
        println!("     Diagnosis: {}", case.diagnosis);
        println!("     Symptoms:  {}", case.symptoms);
        println!("     Notes:     {}", truncated(&case.doctor_notes, 100));
    }
}

#[inline]
pub fn print_patient_stats(stats: &PatientStats) {
    println!();
    println!("{}", style("Corpus").bold().yellow());
    println!(
        "  Total patients: {}",
        style(stats.total_patients).cyan()
    );
    println!(
        "  Critical cases: {}",
        style(stats.critical_cases).red()
    );
}

/// Horizontal bar chart for grouped counts, widest group first.
#[inline]
pub fn print_grouped_counts(title: &str, counts: &[(String, i64)]) {
    if counts.is_empty() {
        return;
    }
    let label_width = counts.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
    let max = counts.iter().map(|(_, n)| *n).max().unwrap_or(0);

    println!();
    println!("{}", style(title).bold().yellow());
    for (label, count) in counts {
        println!(
            "  {:label_width$}  {} {}",
            label,
            style(bar(*count as usize, max as usize)).cyan(),
            style(count).dim()
        );
    }
}

/// Word-cloud stand-in: the dominant terms as a weighted bar list.
#[inline]
pub fn print_term_frequencies(title: &str, terms: &[(String, usize)]) {
    if terms.is_empty() {
        return;
    }
    let label_width = terms.iter().map(|(term, _)| term.len()).max().unwrap_or(0);
    let max = terms.iter().map(|(_, n)| *n).max().unwrap_or(0);

    println!();
    println!("{}", style(title).bold().yellow());
    for (term, count) in terms {
        println!(
            "  {:label_width$}  {} {}",
            term,
            style(bar(*count, max)).cyan(),
            style(count).dim()
        );
    }
}

/// Box-chart stand-in: age spread per diagnosis group.
#[inline]
pub fn print_age_summaries(summaries: &[AgeSummary]) {
    if summaries.is_empty() {
        return;
    }
    println!();
    println!("{}", style("Age by diagnosis").bold().yellow());
    for summary in summaries {
        println!(
            "  {} ({} case{}): min {}, median {:.1}, max {}",
            style(&summary.diagnosis).cyan(),
            summary.count,
            if summary.count == 1 { "" } else { "s" },
            summary.min,
            summary.median,
            summary.max
        );
    }
}

/// Scale `count` against `max` onto a `BAR_WIDTH`-cell bar. Any nonzero
/// count draws at least one cell.
fn bar(count: usize, max: usize) -> String {
    if max == 0 || count == 0 {
        return String::new();
    }
    let cells = (count * BAR_WIDTH).div_ceil(max).min(BAR_WIDTH);
    "█".repeat(cells)
}

fn truncated(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_chars).collect();
        format!("{}…", head.trim_end())
    }
}
