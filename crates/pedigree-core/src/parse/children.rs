use super::narrative::{AGE_SEX_PATTERN, description_from_age_sex, parse_qualifiers};
use super::{Description, is_stopword, parse_compact_body, parse_count};
use regex::Regex;
use std::sync::OnceLock;

/// One named member of a children list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildItem {
    pub name: String,
    pub description: Description,
}

/// Location of a children-list introducer ("have three children —") inside a clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct ChildrenIntro {
    pub start: usize,
    pub end: usize,
    pub count: Option<u32>,
}

fn intro_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(?:(?:have|has|had)\s+(?:(?P<count>\d+|[a-z]+)\s+)?(?:children|child|kids|sons|son|daughters|daughter|boys|girls)(?:\s*(?:[—–:,]|--?)\s*|\s+)|(?:their\s+)?(?:children|kids|sons|daughters)\s*(?:[—–:,]|--?)\s*)",
        )
        .expect("children intro regex must compile")
    })
}

fn item_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<name>\p{Lu}[\p{L}'’\-]*)\s*(?:\((?P<body>[^()]*)\))?\s*(?P<rest>.*)$")
            .expect("child item regex must compile")
    })
}

fn appositive_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"(?i)^,?\s*{AGE_SEX_PATTERN}(?P<tail>.*)$"))
            .expect("appositive regex must compile")
    })
}

pub(super) fn find_children_intro(text: &str) -> Option<ChildrenIntro> {
    let caps = intro_re().captures(text)?;
    let whole = caps.get(0)?;
    let count = caps.name("count").and_then(|m| parse_count(m.as_str()));
    Some(ChildrenIntro {
        start: whole.start(),
        end: whole.end(),
        count,
    })
}

/// Parses the members of a children list. Items are separated by commas, semicolons, or `and`
/// outside parentheses; compact (`Noah (15 M, affected)`), appositive
/// (`Emily, a 15-year-old female with diabetes`), and bare (`Tom`) items are accepted.
pub fn parse_children_list(list: &str) -> Vec<ChildItem> {
    let mut items: Vec<String> = Vec::new();
    for segment in split_top_level(list) {
        let starts_with_name = segment
            .split(|c: char| !(c.is_alphabetic() || c == '\'' || c == '’' || c == '-'))
            .next()
            .is_some_and(|w| {
                w.chars().next().is_some_and(char::is_uppercase) && !is_stopword(w)
            });
        match items.last_mut() {
            Some(prev) if !starts_with_name => {
                prev.push_str(", ");
                prev.push_str(segment);
            }
            _ => items.push(segment.to_string()),
        }
    }

    items
        .iter()
        .filter_map(|item| parse_child_item(item))
        .collect()
}

fn parse_child_item(item: &str) -> Option<ChildItem> {
    let caps = item_re().captures(item.trim())?;
    let name = caps.name("name")?.as_str();
    if is_stopword(name) {
        return None;
    }

    let mut description = Description::default();
    if let Some(body) = caps.name("body") {
        if let Some(desc) = parse_compact_body(body.as_str()) {
            description = desc;
        }
    }

    let rest = caps.name("rest").map(|m| m.as_str()).unwrap_or("");
    if let Some(app) = appositive_re().captures(rest) {
        let from_age_sex = description_from_age_sex(
            app.name("age").map(|m| m.as_str()),
            app.name("sex").map(|m| m.as_str()),
        );
        description.age = description.age.or(from_age_sex.age);
        description.sex = description.sex.or(from_age_sex.sex);
        let tail = app.name("tail").map(|m| m.as_str()).unwrap_or("");
        merge_qualifiers(&mut description, parse_qualifiers(tail));
    } else if !rest.trim().is_empty() {
        merge_qualifiers(&mut description, parse_qualifiers(rest));
    }

    Some(ChildItem {
        name: name.to_string(),
        description,
    })
}

fn merge_qualifiers(into: &mut Description, q: Description) {
    if into.status.is_none() {
        into.status = q.status;
    }
    into.deceased |= q.deceased;
    into.conditions.extend(q.conditions);
}

/// Splits at `,`, `;`, `&`, and the word `and`, all outside parentheses. Empty segments are
/// dropped.
fn split_top_level(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    let bytes = text.as_bytes();
    let mut i = 0usize;

    let mut push = |from: usize, to: usize| {
        let seg = text[from..to].trim().trim_end_matches('.').trim();
        if !seg.is_empty() {
            out.push(seg);
        }
    };

    while i < bytes.len() {
        match bytes[i] {
            b'(' => depth += 1,
            b')' => depth = depth.saturating_sub(1),
            b',' | b';' | b'&' if depth == 0 => {
                push(start, i);
                start = i + 1;
            }
            b'a' | b'A' if depth == 0 && is_and_word(bytes, i) => {
                push(start, i);
                i += 3;
                start = i;
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    push(start, text.len());
    out
}

fn is_and_word(bytes: &[u8], i: usize) -> bool {
    let Some(word) = bytes.get(i..i + 3) else {
        return false;
    };
    if !word.eq_ignore_ascii_case(b"and") {
        return false;
    }
    let before_ok = i == 0 || !bytes[i - 1].is_ascii_alphanumeric();
    let after_ok = bytes.get(i + 3).is_none_or(|b| !b.is_ascii_alphanumeric());
    before_ok && after_ok
}
