//! Method-name parser.
//!
//! `<subject>By<predicate>[OrderBy<orders>]` where the subject selects the
//! derivation kind and the predicate is OR-sections of AND-parts.

use crate::{
    entity::EntityModel,
    error::{ErrorOrigin, InternalError},
    query::{
        part::{Part, PartType},
        sort::{Direction, Order, Sort},
    },
};
use thiserror::Error as ThisError;

const DISTINCT: &str = "Distinct";
const ORDER_BY: &str = "OrderBy";
const ALL_IGNORE_CASE: [&str; 2] = ["AllIgnoreCase", "AllIgnoringCase"];
const IGNORE_CASE: [&str; 2] = ["IgnoreCase", "IgnoringCase"];

///
/// TreeError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum TreeError {
    #[error("method '{method}' does not start with a known query subject")]
    UnknownSubject { method: String },

    #[error("method '{method}' has an empty predicate clause")]
    EmptyClause { method: String },

    #[error("no property '{property}' on entity '{entity}'")]
    UnknownProperty { property: String, entity: String },

    #[error("method '{method}' declares more than one OrderBy clause")]
    MultipleOrderBy { method: String },

    #[error("invalid OrderBy clause '{clause}'")]
    InvalidOrderBy { clause: String },

    #[error("invalid result limit in subject '{subject}'")]
    InvalidLimit { subject: String },
}

impl From<TreeError> for InternalError {
    fn from(err: TreeError) -> Self {
        Self::configuration(ErrorOrigin::Tree, err.to_string())
    }
}

///
/// SubjectKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SubjectKind {
    Find,
    Count,
    Exists,
    Delete,
}

impl SubjectKind {
    const PREFIXES: [(&'static str, Self); 10] = [
        ("find", Self::Find),
        ("read", Self::Find),
        ("get", Self::Find),
        ("query", Self::Find),
        ("search", Self::Find),
        ("stream", Self::Find),
        ("count", Self::Count),
        ("exists", Self::Exists),
        ("delete", Self::Delete),
        ("remove", Self::Delete),
    ];
}

///
/// OrPart
/// One OR-section: AND-connected parts in declaration order.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OrPart {
    parts: Vec<Part>,
}

impl OrPart {
    #[must_use]
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }
}

///
/// PartTree
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PartTree {
    source: String,
    kind: SubjectKind,
    distinct: bool,
    max_results: Option<u32>,
    sections: Vec<OrPart>,
    sort: Sort,
}

impl PartTree {
    /// Parse a method name against an entity model.
    pub fn parse(method: &str, model: &EntityModel) -> Result<Self, TreeError> {
        let (kind, rest) = split_prefix(method).ok_or_else(|| TreeError::UnknownSubject {
            method: method.to_string(),
        })?;
        let (subject, predicate) = split_subject(rest);

        let distinct = subject.contains(DISTINCT);
        let max_results = parse_limit(subject)?;

        let mut clauses = split_on_keyword(predicate, ORDER_BY);
        if clauses.len() > 2 {
            return Err(TreeError::MultipleOrderBy {
                method: method.to_string(),
            });
        }
        let order_clause = if clauses.len() == 2 { clauses.pop() } else { None };
        let body = clauses.pop().unwrap_or_default();

        let sort = match order_clause {
            Some(clause) => parse_order_by(clause, model)?,
            None => Sort::unsorted(),
        };

        let (body, all_ignore_case) = strip_any_suffix(body, &ALL_IGNORE_CASE);
        let sections = if body.is_empty() {
            Vec::new()
        } else {
            parse_predicate(method, body, all_ignore_case, model)?
        };

        Ok(Self {
            source: method.to_string(),
            kind,
            distinct,
            max_results,
            sections,
            sort,
        })
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub const fn kind(&self) -> SubjectKind {
        self.kind
    }

    #[must_use]
    pub const fn is_delete(&self) -> bool {
        matches!(self.kind, SubjectKind::Delete)
    }

    #[must_use]
    pub const fn is_count(&self) -> bool {
        matches!(self.kind, SubjectKind::Count)
    }

    #[must_use]
    pub const fn is_exists(&self) -> bool {
        matches!(self.kind, SubjectKind::Exists)
    }

    #[must_use]
    pub const fn is_distinct(&self) -> bool {
        self.distinct
    }

    #[must_use]
    pub const fn is_limiting(&self) -> bool {
        self.max_results.is_some()
    }

    #[must_use]
    pub const fn max_results(&self) -> Option<u32> {
        self.max_results
    }

    #[must_use]
    pub fn sections(&self) -> &[OrPart] {
        &self.sections
    }

    /// All parts across every OR-section, in declaration order.
    pub fn parts(&self) -> impl Iterator<Item = &Part> {
        self.sections.iter().flat_map(|section| section.parts.iter())
    }

    #[must_use]
    pub fn part_count(&self) -> usize {
        self.sections.iter().map(|section| section.parts.len()).sum()
    }

    /// Static sort from the `OrderBy` suffix.
    #[must_use]
    pub const fn sort(&self) -> &Sort {
        &self.sort
    }
}

//
// Parsing helpers
//

fn starts_upper(s: &str) -> bool {
    s.chars().next().is_some_and(|c| c.is_uppercase() || !c.is_ascii())
}

fn split_prefix(method: &str) -> Option<(SubjectKind, &str)> {
    SubjectKind::PREFIXES.iter().find_map(|(prefix, kind)| {
        let rest = method.strip_prefix(prefix)?;
        (rest.is_empty() || starts_upper(rest)).then_some((*kind, rest))
    })
}

// Split at the first `By` that is not part of `OrderBy`. Without one, the
// whole remainder is subject text unless an `OrderBy` follows.
fn split_subject(rest: &str) -> (&str, &str) {
    let mut from = 0;
    while let Some(offset) = rest[from..].find("By") {
        let at = from + offset;
        let after = &rest[at + 2..];
        let in_order_by = rest[..at].ends_with("Order");

        if !in_order_by && (after.is_empty() || starts_upper(after)) {
            return (&rest[..at], after);
        }
        if in_order_by && starts_upper(after) {
            let start = at - "Order".len();
            return (&rest[..start], &rest[start..]);
        }
        from = at + 2;
    }

    (rest, "")
}

fn parse_limit(subject: &str) -> Result<Option<u32>, TreeError> {
    let subject_text = subject.strip_prefix(DISTINCT).unwrap_or(subject);
    let Some(after) = subject_text
        .strip_prefix("First")
        .or_else(|| subject_text.strip_prefix("Top"))
    else {
        return Ok(None);
    };

    let digits: String = after.chars().take_while(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return Ok(Some(1));
    }

    match digits.parse::<u32>() {
        Ok(n) if n > 0 => Ok(Some(n)),
        _ => Err(TreeError::InvalidLimit {
            subject: subject.to_string(),
        }),
    }
}

// Split on `keyword` where it is followed by an upper-case letter.
fn split_on_keyword<'a>(s: &'a str, keyword: &str) -> Vec<&'a str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut from = 0;

    while let Some(offset) = s[from..].find(keyword) {
        let at = from + offset;
        let after = &s[at + keyword.len()..];
        if starts_upper(after) {
            out.push(&s[start..at]);
            start = at + keyword.len();
        }
        from = at + keyword.len();
    }
    out.push(&s[start..]);

    out
}

fn strip_any_suffix<'a>(s: &'a str, suffixes: &[&str]) -> (&'a str, bool) {
    suffixes
        .iter()
        .find_map(|suffix| s.strip_suffix(suffix))
        .map_or((s, false), |stripped| (stripped, true))
}

fn parse_predicate(
    method: &str,
    body: &str,
    all_ignore_case: bool,
    model: &EntityModel,
) -> Result<Vec<OrPart>, TreeError> {
    split_on_keyword(body, "Or")
        .into_iter()
        .map(|section| {
            let parts = split_on_keyword(section, "And")
                .into_iter()
                .map(|clause| parse_part(method, clause, all_ignore_case, model))
                .collect::<Result<Vec<_>, _>>()?;

            Ok(OrPart { parts })
        })
        .collect()
}

fn parse_part(
    method: &str,
    clause: &str,
    all_ignore_case: bool,
    model: &EntityModel,
) -> Result<Part, TreeError> {
    let (stripped, ignore_case) = strip_any_suffix(clause, &IGNORE_CASE);
    if stripped.is_empty() {
        return Err(TreeError::EmptyClause {
            method: method.to_string(),
        });
    }

    let candidates = PartType::candidates(stripped);
    for (part_type, expression) in &candidates {
        if let Some(property) = model.resolve_property(expression) {
            return Ok(Part::new(
                property,
                *part_type,
                ignore_case || all_ignore_case,
                clause.to_string(),
            ));
        }
    }

    let expression = candidates.first().map_or(stripped, |(_, expression)| *expression);
    Err(TreeError::UnknownProperty {
        property: expression.to_string(),
        entity: model.path.to_string(),
    })
}

fn parse_order_by(clause: &str, model: &EntityModel) -> Result<Sort, TreeError> {
    let invalid = || TreeError::InvalidOrderBy {
        clause: clause.to_string(),
    };
    if clause.is_empty() {
        return Err(invalid());
    }

    let mut orders = Vec::new();
    let mut rest = clause;
    while !rest.is_empty() {
        let (item, tail) = next_order_item(rest);
        let (expression, direction) = if let Some(p) = item.strip_suffix("Desc") {
            (p, Direction::Desc)
        } else {
            (item.strip_suffix("Asc").unwrap_or(item), Direction::Asc)
        };
        if expression.is_empty() {
            return Err(invalid());
        }

        let property =
            model
                .resolve_property(expression)
                .ok_or_else(|| TreeError::UnknownProperty {
                    property: expression.to_string(),
                    entity: model.path.to_string(),
                })?;
        orders.push(Order::new(property, direction));
        rest = tail;
    }

    Ok(Sort::by(orders))
}

// One order item ends after `Asc`/`Desc` followed by an upper-case letter,
// or at the end of the clause.
fn next_order_item(s: &str) -> (&str, &str) {
    let mut from = 0;
    while from < s.len() {
        let next = ["Asc", "Desc"]
            .iter()
            .filter_map(|dir| s[from..].find(dir).map(|offset| (from + offset, dir.len())))
            .min_by_key(|(at, _)| *at);
        let Some((at, len)) = next else {
            break;
        };

        let end = at + len;
        if starts_upper(&s[end..]) {
            return (&s[..end], &s[end..]);
        }
        from = end;
    }

    (s, "")
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{ADDRESS_MODEL, COURSE_MODEL};

    fn parse(method: &str) -> PartTree {
        PartTree::parse(method, &ADDRESS_MODEL).expect("method should parse")
    }

    #[test]
    fn simple_equality_has_one_section_one_part() {
        let tree = parse("findByCity");
        assert_eq!(tree.kind(), SubjectKind::Find);
        assert_eq!(tree.part_count(), 1);

        let part = tree.parts().next().unwrap();
        assert_eq!(part.property(), "city");
        assert_eq!(part.part_type(), PartType::SimpleProperty);
    }

    #[test]
    fn or_sections_group_and_parts() {
        let tree = parse("findByCityAndStreetOrPostalCode");
        assert_eq!(tree.sections().len(), 2);
        assert_eq!(tree.sections()[0].parts().len(), 2);
        assert_eq!(tree.sections()[1].parts().len(), 1);
        assert_eq!(tree.sections()[1].parts()[0].property(), "postalCode");
    }

    #[test]
    fn subject_prefixes_select_kind() {
        assert!(parse("deleteByCity").is_delete());
        assert!(parse("removeByCity").is_delete());
        assert!(parse("existsByCity").is_exists());
        assert!(parse("countByCity").is_count());
        assert_eq!(parse("streamAllByCity").kind(), SubjectKind::Find);
    }

    #[test]
    fn limiting_subjects_record_max_results() {
        assert_eq!(parse("findFirstByCity").max_results(), Some(1));
        assert_eq!(parse("findTop3ByCity").max_results(), Some(3));
        assert_eq!(parse("findDistinctFirst2ByCity").max_results(), Some(2));
        assert!(parse("findDistinctFirst2ByCity").is_distinct());
        assert!(!parse("findByCity").is_limiting());
    }

    #[test]
    fn order_by_suffix_builds_static_sort() {
        let tree = parse("findByCityOrderByStreetDescPostalCode");
        assert_eq!(
            tree.sort().orders(),
            &[Order::desc("street"), Order::asc("postalCode")]
        );
        assert_eq!(tree.part_count(), 1);
    }

    #[test]
    fn order_by_without_predicate_is_accepted() {
        let tree = parse("findAllOrderByCityAsc");
        assert_eq!(tree.part_count(), 0);
        assert_eq!(tree.sort().orders(), &[Order::asc("city")]);
    }

    #[test]
    fn ignore_case_flags_apply_per_part_and_globally() {
        let tree = parse("findByCityIgnoreCaseAndStreet");
        let flags: Vec<bool> = tree.parts().map(Part::ignore_case).collect();
        assert_eq!(flags, vec![true, false]);

        let tree = parse("findByCityAndStreetAllIgnoreCase");
        assert!(tree.parts().all(Part::ignore_case));
    }

    #[test]
    fn keywords_resolve_against_declared_fields() {
        let tree = PartTree::parse("findByDepartmentIn", &COURSE_MODEL).unwrap();
        let part = tree.parts().next().unwrap();
        assert_eq!(part.property(), "department");
        assert_eq!(part.part_type(), PartType::In);
    }

    #[test]
    fn unknown_property_is_rejected() {
        let err = PartTree::parse("findByCountry", &ADDRESS_MODEL).unwrap_err();
        assert!(matches!(err, TreeError::UnknownProperty { ref property, .. } if property == "Country"));
        assert!(InternalError::from(err).is_configuration());
    }

    #[test]
    fn unknown_subject_and_empty_clause_are_rejected() {
        assert!(matches!(
            PartTree::parse("fetchByCity", &ADDRESS_MODEL),
            Err(TreeError::UnknownSubject { .. })
        ));
        assert!(matches!(
            PartTree::parse("findByCityAndIgnoreCase", &ADDRESS_MODEL),
            Err(TreeError::EmptyClause { .. })
        ));
    }
}
