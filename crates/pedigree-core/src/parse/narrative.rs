//! Narrative grammar: `John is a 45-year-old male with diabetes. He is married to Sarah, a
//! 42-year-old female who is a carrier. They have two children: Emily, ... and Mark, ...`

use super::children::parse_children_list;
use super::{Clause, Description, ParseContext, parse_compact_body, parse_count};
use crate::model::{Sex, Status};
use regex::Regex;
use std::sync::OnceLock;

const NAME: &str = r"\p{Lu}[\p{L}'’\-]*";

/// `a 45-year-old male`; exposes the `age` and `sex` groups.
pub(super) const AGE_SEX_PATTERN: &str = r"(?i:an?)\s+(?P<age>\d+)[-\s](?i:years?)[-\s](?i:old)\s+(?P<sex>(?i:male|female|man|woman|boy|girl))\b";

fn declaration_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            r"^(?P<name>{NAME})\s+(?i:is|was)\s+{AGE_SEX_PATTERN}(?P<tail>.*)$"
        ))
        .expect("narrative declaration regex must compile")
    })
}

fn married_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            r"^(?P<subj>{NAME})\s+(?:(?i:is|was)\s+)?(?i:married|wed)(?:\s+(?i:to))?\s+(?P<name>{NAME})(?:\s*\((?P<body>[^()]*)\))?(?:\s*,\s*{AGE_SEX_PATTERN})?(?P<tail>.*)$"
        ))
        .expect("narrative marriage regex must compile")
    })
}

fn children_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?P<subj>.+?)\s+(?i:have|has|had)\s+(?:(?P<count>\w+)\s+)?(?i:children|child|kids|sons|son|daughters|daughter)(?:\s*(?:[—–:,]|--?)\s*|\s+)(?P<list>.+)$",
        )
        .expect("narrative children regex must compile")
    })
}

fn couple_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"^(?P<a>{NAME})\s+(?:(?i:and)|&)\s+(?P<b>{NAME})$"))
            .expect("narrative couple regex must compile")
    })
}

fn status_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            r"^(?P<subj>{NAME})\s+(?P<tail>(?:(?i:is|was)\s+.+|(?i:died|passed\s+away).*))$"
        ))
        .expect("narrative status regex must compile")
    })
}

fn deceased_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:deceased|died|dead|passed\s+away|late)\b")
            .expect("deceased regex must compile")
    })
}

fn carrier_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\bcarriers?\b(?:\s+(?:for|of)\s+(?:an?\s+|the\s+)?(?P<cond>[^,;]+))?")
            .expect("carrier regex must compile")
    })
}

fn condition_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(?:with|who\s+has|suffering\s+from|diagnosed\s+with)\s+(?:an?\s+)?(?P<cond>[^,;]+)",
        )
        .expect("condition regex must compile")
    })
}

fn affected_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?P<un>un)?affected\b|\b(?P<healthy>healthy)\b")
            .expect("affected regex must compile")
    })
}

pub(super) fn description_from_age_sex(age: Option<&str>, sex: Option<&str>) -> Description {
    Description {
        age: age.and_then(|a| a.parse().ok()),
        sex: sex.and_then(Sex::from_token),
        ..Description::default()
    }
}

fn clean_condition(raw: &str) -> Option<String> {
    let mut cond = raw.trim();
    for stop in [" who ", " and is ", " but "] {
        if let Some(idx) = cond.to_ascii_lowercase().find(stop) {
            cond = &cond[..idx];
        }
    }
    let cond = cond.trim().trim_end_matches('.').trim();
    (!cond.is_empty()).then(|| cond.to_string())
}

/// Reads status qualifiers from a narrative tail such as `with diabetes`,
/// `who is a carrier for color blindness`, or `who died in 2001`.
pub(super) fn parse_qualifiers(tail: &str) -> Description {
    let mut desc = Description {
        deceased: deceased_re().is_match(tail),
        ..Description::default()
    };

    if let Some(caps) = condition_re().captures(tail) {
        let raw = caps.name("cond").map(|m| m.as_str()).unwrap_or("");
        let lower = raw.trim().to_ascii_lowercase();
        if lower.starts_with("no ") || lower.starts_with("no known") {
            desc.status = Some(Status::Unaffected);
        } else if let Some(cond) = clean_condition(raw) {
            desc.status = Some(Status::Affected);
            desc.conditions.push(cond);
        }
    }

    if desc.status.is_none() {
        if let Some(caps) = carrier_re().captures(tail) {
            desc.status = Some(Status::Carrier);
            if let Some(cond) = caps.name("cond").and_then(|m| clean_condition(m.as_str())) {
                desc.conditions.push(cond);
            }
        }
    }

    if desc.status.is_none() {
        if let Some(caps) = affected_re().captures(tail) {
            desc.status = if caps.name("un").is_some() || caps.name("healthy").is_some() {
                Some(Status::Unaffected)
            } else {
                Some(Status::Affected)
            };
        }
    }

    desc
}

fn resolve_subject(ctx: &mut ParseContext, word: &str) -> Option<String> {
    match word {
        "He" | "She" => ctx.subject().map(str::to_string),
        "They" | "It" | "This" | "The" => None,
        name => Some(ctx.mention(name)),
    }
}

pub(super) fn parse_narrative_clause(clause: &Clause<'_>, ctx: &mut ParseContext) -> bool {
    let text = clause.text.trim_end_matches(['.', '!', '?']).trim();

    if let Some(caps) = declaration_re().captures(text) {
        let name = &caps["name"];
        let mut desc = description_from_age_sex(
            caps.name("age").map(|m| m.as_str()),
            caps.name("sex").map(|m| m.as_str()),
        );
        let q = parse_qualifiers(caps.name("tail").map(|m| m.as_str()).unwrap_or(""));
        desc.status = q.status;
        desc.deceased = q.deceased;
        desc.conditions = q.conditions;
        let id = ctx.declare(name, desc);
        ctx.set_subject(&id);
        return true;
    }

    if let Some(caps) = married_re().captures(text) {
        let Some(subject) = resolve_subject(ctx, &caps["subj"]) else {
            return false;
        };
        let mut desc = description_from_age_sex(
            caps.name("age").map(|m| m.as_str()),
            caps.name("sex").map(|m| m.as_str()),
        );
        if let Some(body) = caps.name("body").and_then(|b| parse_compact_body(b.as_str())) {
            desc = body;
        }
        let q = parse_qualifiers(caps.name("tail").map(|m| m.as_str()).unwrap_or(""));
        desc.status = desc.status.or(q.status);
        desc.deceased |= q.deceased;
        desc.conditions.extend(q.conditions);
        let partner = ctx.mention_described(&caps["name"], desc);
        ctx.partner(&subject, &partner);
        return true;
    }

    if let Some(caps) = children_re().captures(text) {
        let subj = caps["subj"].trim();
        let parents = match subj {
            "They" | "The couple" | "Together they" => ctx.implied_parents(),
            "He" | "She" => ctx
                .subject()
                .map(|s| vec![s.to_string()])
                .unwrap_or_default(),
            other => match couple_re().captures(other) {
                Some(c) => {
                    let a = ctx.mention(&c["a"]);
                    let b = ctx.mention(&c["b"]);
                    ctx.partner(&a, &b);
                    vec![a, b]
                }
                None if other.chars().next().is_some_and(char::is_uppercase)
                    && !other.contains(' ') =>
                {
                    vec![ctx.mention(other)]
                }
                None => return false,
            },
        };
        let items = parse_children_list(&caps["list"]);
        if items.is_empty() {
            return false;
        }
        let count = caps.name("count").and_then(|m| parse_count(m.as_str()));
        ctx.add_children(items, &parents, count);
        return true;
    }

    if let Some(caps) = status_re().captures(text) {
        let q = parse_qualifiers(&caps["tail"]);
        if q.is_empty() {
            return false;
        }
        let subj = &caps["subj"];
        let id = match subj {
            "He" | "She" => ctx.subject().map(str::to_string),
            name => ctx.resolve(name).map(str::to_string),
        };
        let Some(id) = id else {
            return false;
        };
        return ctx.describe(&id, q);
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualifiers_with_condition_mark_affected() {
        let d = parse_qualifiers(" with diabetes");
        assert_eq!(d.status, Some(Status::Affected));
        assert_eq!(d.conditions, ["diabetes"]);
    }

    #[test]
    fn qualifiers_carrier_for_condition() {
        let d = parse_qualifiers(" who is a carrier for color blindness");
        assert_eq!(d.status, Some(Status::Carrier));
        assert_eq!(d.conditions, ["color blindness"]);
    }

    #[test]
    fn qualifiers_deceased_composes_with_status() {
        let d = parse_qualifiers(" who was affected and died in 2001");
        assert_eq!(d.status, Some(Status::Affected));
        assert!(d.deceased);
    }

    #[test]
    fn qualifiers_unaffected_is_not_affected() {
        let d = parse_qualifiers(" who is unaffected");
        assert_eq!(d.status, Some(Status::Unaffected));
    }
}
