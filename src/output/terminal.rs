// Colored terminal output for policies and moderation decisions.
//
// main.rs delegates all display formatting here.

use colored::Colorize;

use super::truncate_chars;
use crate::moderation::ModerationDecision;
use crate::policy::Policy;

/// Display the live moderation policy.
pub fn display_policy(policy: &Policy) {
    println!(
        "\n{}",
        format!("=== Moderation Policy (v{}) ===", policy.version).bold()
    );
    println!();

    println!("  {:<28} {}", "Moderation".dimmed(), on_off(policy.enabled));
    println!("  {:<28} {}", "Strict mode".dimmed(), on_off(policy.strict_mode));
    println!(
        "  {:<28} {}",
        "Keyword rules".dimmed(),
        on_off(policy.keyword_moderation_enabled)
    );
    println!(
        "  {:<28} {}",
        "Educational override".dimmed(),
        on_off(policy.auto_approve_educational)
    );
    println!(
        "  {:<28} {}",
        "External scoring".dimmed(),
        on_off(policy.external_scoring_enabled)
    );
    println!(
        "  {:<28} {:.2}",
        "Toxicity threshold".dimmed(),
        policy.toxicity_threshold
    );

    println!();
    println!(
        "  {} {}",
        "Banned:".dimmed(),
        join_words(policy.banned_words.iter())
    );
    println!(
        "  {} {}",
        "Educational:".dimmed(),
        join_words(policy.educational_words.iter())
    );

    println!();
    println!(
        "  Last updated {} by {}",
        policy.last_updated.format("%Y-%m-%d %H:%M:%S UTC"),
        policy.updated_by.as_deref().unwrap_or("(default)")
    );
    println!();
}

/// Display one dry-run result.
pub fn display_decision(text: &str, decision: &ModerationDecision) {
    let verdict = if decision.approved {
        "APPROVED".green().bold()
    } else {
        "REJECTED".red().bold()
    };

    println!("  {}  \"{}\"", verdict, truncate_chars(text, 60));
    if let Some(ref reason) = decision.reason {
        println!("            {} {}", "reason:".dimmed(), reason);
    }
    if let Some(confidence) = decision.confidence {
        println!("            {} {:.2}", "toxicity:".dimmed(), confidence);
    }
}

fn on_off(value: bool) -> colored::ColoredString {
    if value {
        "on".green()
    } else {
        "off".yellow()
    }
}

fn join_words<'a>(words: impl Iterator<Item = &'a String>) -> String {
    let joined: Vec<&str> = words.map(String::as_str).collect();
    if joined.is_empty() {
        "(none)".to_string()
    } else {
        joined.join(", ")
    }
}
