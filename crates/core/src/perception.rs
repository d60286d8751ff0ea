use anyhow::Result;
use regex::Regex;

use crate::logger;
use crate::types::{ColorName, Facts};

/// Turns a user request into facts. The deterministic `LocalFacts` reads the
/// structured prompt; a language-model backed source can be plugged in here.
pub trait FactsSource {
    fn extract(&self, prompt: &str) -> Result<Facts>;
}

/// Structured request handed to a `FactsSource`.
pub fn build_prompt(text: &str, color: ColorName) -> String {
    let allowed: Vec<&str> = ColorName::ALL.iter().map(|c| c.as_str()).collect();
    format!(
        "User wants to write text in MS Paint.\n\
         \n\
         Preferences (must be respected):\n\
         - text: {}\n\
         - color: {}\n\
         \n\
         Allowed colors: {}\n\
         \n\
         Task: Extract clean facts (text + color) and return strict JSON.",
        text,
        color,
        allowed.join(", ")
    )
}

fn strip_quotes(s: &str) -> &str {
    let s = s.trim();
    let quoted = s.len() >= 2
        && ((s.starts_with('"') && s.ends_with('"')) || (s.starts_with('\'') && s.ends_with('\'')));
    if quoted {
        s[1..s.len() - 1].trim()
    } else {
        s
    }
}

fn capture<'t>(pattern: &str, haystack: &'t str) -> Option<&'t str> {
    let re = Regex::new(pattern).ok()?;
    re.captures(haystack).and_then(|c| c.get(1)).map(|m| m.as_str())
}

/// Pull `- text:` / `- color:` lines out of `prompt`. A missing or
/// unsupported color falls back to the first allowed color mentioned
/// anywhere, then to the first allowed color; missing text falls back to
/// the whole prompt.
pub fn extract_facts(prompt: &str) -> Facts {
    let text = capture(r"(?m)^-\s*text:\s*(.+)$", prompt)
        .map(strip_quotes)
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    let color = capture(r"(?m)^-\s*color:\s*([a-zA-Z]+)\b", prompt).and_then(|c| c.parse::<ColorName>().ok());
    let color = color.unwrap_or_else(|| {
        let low = prompt.to_lowercase();
        let mentioned = ColorName::ALL.iter().copied().find(|c| low.contains(c.as_str()));
        logger::warn(&format!("no valid color line, using {:?}", mentioned));
        mentioned.unwrap_or(ColorName::ALL[0])
    });

    let text = text.unwrap_or_else(|| prompt.trim().to_string());
    logger::info(&format!("facts: color={} text_len={}", color, text.chars().count()));
    Facts { text, color }
}

/// Deterministic extraction, no external service.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFacts;

impl FactsSource for LocalFacts {
    fn extract(&self, prompt: &str) -> Result<Facts> {
        Ok(extract_facts(prompt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_round_trips_through_local_parser() {
        let prompt = build_prompt("Hello, Paint!", ColorName::Purple);
        let facts = LocalFacts.extract(&prompt).unwrap();
        assert_eq!(facts, Facts { text: "Hello, Paint!".into(), color: ColorName::Purple });
    }

    #[test]
    fn quotes_are_stripped() {
        let facts = extract_facts("- text: \"quoted words\"\n- color: Green");
        assert_eq!(facts.text, "quoted words");
        assert_eq!(facts.color, ColorName::Green);
    }

    #[test]
    fn unsupported_color_falls_back_to_a_mentioned_one() {
        let facts = extract_facts("- text: hi\n- color: teal\nsomething yellow");
        assert_eq!(facts.color, ColorName::Yellow);
    }

    #[test]
    fn free_form_prompt_keeps_whole_text() {
        let facts = extract_facts("  write something nice  ");
        assert_eq!(facts.text, "write something nice");
        assert_eq!(facts.color, ColorName::Red);
    }
}
