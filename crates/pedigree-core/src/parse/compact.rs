//! Compact grammar: `David (40 M, carrier) and Emma (38 F, carrier) have three children — Noah
//! (15 M, affected), Ava (12 F, carrier), and Liam (9 M, unaffected).`

use super::children::{find_children_intro, parse_children_list};
use super::{Clause, Description, ParseContext, is_stopword, parse_compact_body};
use regex::Regex;
use std::sync::OnceLock;

fn token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?P<name>\p{Lu}[\p{L}'’\-]*)\s*\((?P<body>[^()]*)\)")
            .expect("compact token regex must compile")
    })
}

fn word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\p{Lu}[\p{L}'’\-]*").expect("word regex must compile"))
}

#[derive(Debug, Clone)]
enum MentionKind {
    Described(Description),
    Bare { known: bool },
    Pronoun,
}

#[derive(Debug, Clone)]
struct Mention<'a> {
    start: usize,
    end: usize,
    name: &'a str,
    kind: MentionKind,
}

fn compact_tokens(text: &str) -> Vec<Mention<'_>> {
    token_re()
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let name = caps.name("name")?.as_str();
            if is_stopword(name) {
                return None;
            }
            let desc = parse_compact_body(caps.name("body")?.as_str())?;
            Some(Mention {
                start: whole.start(),
                end: whole.end(),
                name,
                kind: MentionKind::Described(desc),
            })
        })
        .collect()
}

fn normalize_connective(between: &str) -> String {
    between
        .trim()
        .trim_start_matches(',')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// `,` or `;` alone between two mentions: they are items of one list.
fn is_list_separator(between: &str) -> bool {
    matches!(between.trim(), "," | ";")
}

/// A bare `and`/`&`, which only pairs two people outside a list. `, and` always closes a list.
fn is_conjunction(between: &str) -> bool {
    matches!(normalize_connective(between).as_str(), "and" | "&")
}

fn is_partner_connective(between: &str) -> bool {
    if between.trim_start().starts_with(',') && is_conjunction(between) {
        return false;
    }
    matches!(
        normalize_connective(between).as_str(),
        "and"
            | "&"
            | "married"
            | "married to"
            | "is married to"
            | "was married to"
            | "who married"
            | "who is married to"
            | "wed"
            | "and his wife"
            | "and her husband"
            | "and his partner"
            | "and her partner"
            | "and partner"
            | "is the husband of"
            | "is the wife of"
            | "is the partner of"
    )
}

pub(super) fn parse_compact_clause(clause: &Clause<'_>, ctx: &mut ParseContext) -> bool {
    let text = clause.text.trim_end_matches(['.', '!', '?']);
    let intro = find_children_intro(text);
    let (head, list) = match intro {
        Some(intro) => (&text[..intro.start], &text[intro.end..]),
        None => (text, ""),
    };

    let mut mentions = compact_tokens(head);
    let list_is_compact = !list.is_empty() && !compact_tokens(list).is_empty();
    if mentions.is_empty() && !list_is_compact {
        return false;
    }

    for m in word_re().find_iter(head) {
        if mentions
            .iter()
            .any(|t| m.start() < t.end && t.start < m.end())
        {
            continue;
        }
        let word = m.as_str();
        let kind = match word {
            "He" | "She" if ctx.subject().is_some() => MentionKind::Pronoun,
            w if is_stopword(w) => continue,
            w => MentionKind::Bare {
                known: ctx.is_known(w),
            },
        };
        mentions.push(Mention {
            start: m.start(),
            end: m.end(),
            name: word,
            kind,
        });
    }
    mentions.sort_by_key(|m| m.start);

    let between = |a: usize, b: usize| &head[mentions[a].end..mentions[b].start];
    let in_list = |i: usize| i > 0 && is_list_separator(between(i - 1, i));

    let mut pairs = Vec::new();
    let mut i = 0;
    while i + 1 < mentions.len() {
        let gap = between(i, i + 1);
        if is_partner_connective(gap) && !(in_list(i) && is_conjunction(gap)) {
            pairs.push((i, i + 1));
            i += 2;
        } else {
            i += 1;
        }
    }

    let paired = |idx: usize| pairs.iter().any(|&(a, b)| a == idx || b == idx);
    let mut ids: Vec<Option<String>> = Vec::with_capacity(mentions.len());
    for (idx, m) in mentions.iter().enumerate() {
        let id = match &m.kind {
            MentionKind::Described(desc) => Some(ctx.declare(m.name, desc.clone())),
            MentionKind::Bare { known: true } => Some(ctx.mention(m.name)),
            MentionKind::Bare { known: false } if paired(idx) => Some(ctx.mention(m.name)),
            MentionKind::Bare { known: false } => None,
            MentionKind::Pronoun => ctx.subject().map(str::to_string),
        };
        ids.push(id);
    }

    let mut couple = None;
    for &(a, b) in &pairs {
        if let (Some(a), Some(b)) = (&ids[a], &ids[b]) {
            ctx.partner(a, b);
            couple = Some(vec![a.clone(), b.clone()]);
        }
    }

    let named: Vec<String> = ids.iter().flatten().cloned().collect();
    if let Some(first) = named.first() {
        ctx.set_subject(first);
    }

    if let Some(intro) = intro {
        let items = parse_children_list(list);
        let parents = match (couple, named.last()) {
            (Some(couple), _) => couple,
            (None, Some(last)) => vec![last.clone()],
            (None, None) => ctx.implied_parents(),
        };
        ctx.add_children(items, &parents, intro.count);
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connectives_are_normalized() {
        assert!(is_partner_connective("  and "));
        assert!(is_partner_connective(", married to "));
        assert!(is_partner_connective(" MARRIED "));
        assert!(!is_partner_connective(" visited "));
    }

    #[test]
    fn comma_and_closes_a_list_instead_of_pairing() {
        assert!(!is_partner_connective(", and "));
        assert!(is_partner_connective(", married to "));
        assert!(is_list_separator(" , "));
    }

    #[test]
    fn list_members_are_never_paired() {
        let parsed =
            crate::parse::parse("Noah (15 M, affected), Ava (12 F, carrier) and Liam (9 M, unaffected).")
                .unwrap();
        assert!(parsed.unresolved.is_empty());
        assert_eq!(parsed.individuals.len(), 3);
        assert!(parsed.relationships.is_empty());
    }

    #[test]
    fn compact_tokens_skip_unrecognized_bodies() {
        let tokens = compact_tokens("Anna (see notes) and Ben (30 M)");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].name, "Ben");
    }
}
