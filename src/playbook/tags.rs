// src/playbook/tags.rs

//! Regex-based tag extraction.
//!
//! Playbooks are scanned as text rather than parsed, so tags inside includes
//! or odd formatting can be over- or under-matched. Handles:
//!
//! ```yaml
//! tags: deploy
//! tags: deploy, web
//! tags: [deploy, "web"]
//! tags:
//!   - deploy
//!   - web
//! ```

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

/// Tag that only runs when asked for explicitly; never offered as a choice.
const NEVER_TAG: &str = "never";

static TAGS_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[ \t]*(?:-[ \t]*)?tags[ \t]*:[ \t]*(.*)$").expect("valid tags regex")
});

static LIST_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[ \t]*-[ \t]*(\S.*)$").expect("valid list item regex")
});

/// Extract the sorted, de-duplicated set of tags mentioned in `content`.
pub fn extract_tags(content: &str) -> BTreeSet<String> {
    let mut tags = BTreeSet::new();
    let mut lines = content.lines().peekable();

    while let Some(line) = lines.next() {
        let Some(caps) = TAGS_LINE.captures(line) else {
            continue;
        };
        let rest = caps.get(1).map_or("", |m| m.as_str()).trim();

        if rest.is_empty() {
            // Block list on the following lines.
            while let Some(next) = lines.peek() {
                match LIST_ITEM.captures(next) {
                    Some(item) => {
                        add_tags(&mut tags, item.get(1).map_or("", |m| m.as_str()));
                        lines.next();
                    }
                    None => break,
                }
            }
        } else {
            add_tags(&mut tags, rest);
        }
    }

    tags
}

fn add_tags(tags: &mut BTreeSet<String>, raw: &str) {
    let raw = strip_comment(raw);
    let raw = raw.trim().trim_start_matches('[').trim_end_matches(']');

    for part in raw.split(',') {
        let tag = part.trim().trim_matches('"').trim_matches('\'').trim();
        if tag.is_empty() || tag == NEVER_TAG || tag.contains("{{") {
            continue;
        }
        tags.insert(tag.to_string());
    }
}

fn strip_comment(raw: &str) -> &str {
    match raw.find(" #") {
        Some(idx) => &raw[..idx],
        None => raw,
    }
}
