//! Projection grammar parser (component C8, spec §4.5).
//!
//! Grounded on `postrust_core::api_request::query_params::parse_select`'s
//! nom style (small combinator functions composed with `alt`/`separated_list0`)
//! — extended with the `[size=,page=,sort=]` bracket grammar, whose
//! per-option-list shape mirrors the teacher's `order` parser
//! (`col.asc.nullsfirst,col2.desc`) rather than anything in `parse_select`
//! itself, since the teacher has no bracketed-option grammar of its own.

use crate::types::{sort_term, CollectionOptions, PathSegment, ProjectionField};
use filterql_core::{Error, Result};
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, digit1},
    combinator::{map_res, opt},
    multi::separated_list1,
    sequence::{preceded, separated_pair},
    IResult,
};

const MIN_SIZE: u32 = 1;
const MAX_SIZE: u32 = 10_000;

/// Parse every entry in `projection` independently (spec §3 `projection: set<string>`).
/// Conflict detection across entries that share a collection path is deferred
/// to the plan builder (§4.5 "... reject with a conflict error at
/// plan-building time").
pub fn parse_projection(projection: &[String]) -> Result<Vec<ProjectionField>> {
    projection.iter().map(|entry| parse_entry(entry)).collect()
}

fn parse_entry(entry: &str) -> Result<ProjectionField> {
    let trimmed = entry.trim();
    if trimmed.is_empty() {
        return Err(Error::projection_definition("projection entry must not be blank"));
    }

    let components = split_top_level_dots(trimmed);

    if components.len() == 1 {
        let (rest, segment) = parse_segment(components[0])
            .map_err(|_| Error::projection_definition(format!("invalid projection segment '{}'", components[0])))?;
        if !rest.is_empty() {
            return Err(Error::projection_definition(format!(
                "unexpected trailing input '{rest}' in projection entry '{entry}'"
            )));
        }
        return Ok(match segment.options {
            Some(_) => ProjectionField {
                prefix: vec![segment],
                fields: Vec::new(),
            },
            None => ProjectionField {
                prefix: Vec::new(),
                fields: vec![segment.name],
            },
        });
    }

    let (last, head) = components.split_last().expect("len checked above");
    let mut prefix = Vec::with_capacity(head.len());
    for raw in head {
        let (rest, segment) = parse_segment(raw)
            .map_err(|_| Error::projection_definition(format!("invalid projection segment '{raw}'")))?;
        if !rest.is_empty() {
            return Err(Error::projection_definition(format!("unexpected trailing input '{rest}' after segment '{raw}'")));
        }
        prefix.push(segment);
    }

    let (rest, last_segment) = parse_segment(last)
        .map_err(|_| Error::projection_definition(format!("invalid projection segment '{last}'")))?;

    if last_segment.options.is_some() {
        if !rest.is_empty() {
            return Err(Error::projection_definition(format!(
                "unexpected trailing input '{rest}' after segment '{last}'"
            )));
        }
        prefix.push(last_segment);
        return Ok(ProjectionField { prefix, fields: Vec::new() });
    }

    // no bracketed options on the terminal component: it's a comma-expanded
    // leaf field list (spec §4.5 "comma-compressed sibling expansion").
    let fields = parse_field_list(last)
        .map_err(|_| Error::projection_definition(format!("invalid field list '{last}'")))?;

    Ok(ProjectionField { prefix, fields })
}

/// Split on `.` characters that are not nested inside a `[...]` bracket.
fn split_top_level_dots(s: &str) -> Vec<&str> {
    let mut depth = 0i32;
    let mut parts = Vec::new();
    let mut start = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth -= 1,
            '.' if depth == 0 => {
                parts.push(&s[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

/// `segment = IDENT , [ collection-options ]`
fn parse_segment(input: &str) -> IResult<&str, PathSegment> {
    let (input, name) = parse_ident(input)?;
    let (input, options) = opt(parse_collection_options)(input)?;
    Ok((
        input,
        PathSegment {
            name: name.to_string(),
            options,
        },
    ))
}

fn parse_ident(input: &str) -> IResult<&str, &str> {
    nom::bytes::complete::take_while1(|c: char| c.is_alphanumeric() || c == '_')(input)
}

/// `collection-options = "[" , option , { "," , option } , "]"`
fn parse_collection_options(input: &str) -> IResult<&str, CollectionOptions> {
    let (input, _) = char('[')(input)?;
    let (input, opts) = separated_list1(char(','), parse_option)(input)?;
    let (input, _) = char(']')(input)?;

    let mut result = CollectionOptions::default();
    for opt in opts {
        match opt {
            OptionTerm::Size(n) => result.size = n.clamp(MIN_SIZE, MAX_SIZE),
            OptionTerm::Page(n) => result.page = n,
            OptionTerm::Sort(terms) => result.sort = terms,
        }
    }
    Ok((input, result))
}

enum OptionTerm {
    Size(u32),
    Page(u32),
    Sort(Vec<filterql_core::SortBy>),
}

/// `option = "size=" INT | "page=" INT | "sort=" sort-spec { "," sort-spec }`
fn parse_option(input: &str) -> IResult<&str, OptionTerm> {
    alt((parse_size_option, parse_page_option, parse_sort_option))(input)
}

fn parse_uint(input: &str) -> IResult<&str, u32> {
    map_res(digit1, |s: &str| s.parse::<u32>())(input)
}

fn parse_size_option(input: &str) -> IResult<&str, OptionTerm> {
    let (input, n) = preceded(tag("size="), parse_uint)(input)?;
    Ok((input, OptionTerm::Size(n)))
}

fn parse_page_option(input: &str) -> IResult<&str, OptionTerm> {
    let (input, n) = preceded(tag("page="), parse_uint)(input)?;
    Ok((input, OptionTerm::Page(n)))
}

/// `sort=` is both a comma-separated list itself and embedded in the outer
/// comma-separated option list, so this parser treats `sort=` as the final
/// option term in a bracket: everything between it and the closing `]`
/// belongs to the sort-spec list, not to a sibling option.
fn parse_sort_option(input: &str) -> IResult<&str, OptionTerm> {
    let (input, _) = tag("sort=")(input)?;
    let end = input.find(']').unwrap_or(input.len());
    let (sort_text, rest) = input.split_at(end);

    let mut terms = Vec::new();
    for spec in sort_text.split(',') {
        let (_, (field, dir)) =
            separated_pair(parse_ident, char(':'), alt((tag("asc"), tag("ASC"), tag("desc"), tag("DESC"))))(spec)
                .map_err(|_| nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Tag)))?;
        let term = sort_term(field, dir)
            .map_err(|_| nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Tag)))?;
        terms.push(term);
    }
    Ok((rest, OptionTerm::Sort(terms)))
}

fn parse_field_list(input: &str) -> IResult<&str, Vec<String>> {
    let (rest, names) = separated_list1(char(','), parse_ident)(input)?;
    Ok((rest, names.into_iter().map(|s| s.to_string()).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_scalar_field() {
        let fields = parse_projection(&["name".to_string()]).unwrap();
        assert_eq!(fields.len(), 1);
        assert!(fields[0].prefix.is_empty());
        assert_eq!(fields[0].fields, vec!["name"]);
    }

    #[test]
    fn sibling_comma_expansion() {
        let fields = parse_projection(&["a.b,c,d".to_string()]).unwrap();
        assert_eq!(fields[0].prefix, vec![PathSegment::new("a")]);
        assert_eq!(fields[0].fields, vec!["b", "c", "d"]);
    }

    #[test]
    fn nested_collection_options() {
        let entry = "authors[size=10].books[size=5,sort=year:desc].title,year";
        let fields = parse_projection(&[entry.to_string()]).unwrap();
        let f = &fields[0];
        assert_eq!(f.prefix.len(), 2);
        assert_eq!(f.prefix[0].name, "authors");
        assert_eq!(f.prefix[0].options.as_ref().unwrap().size, 10);
        assert_eq!(f.prefix[1].name, "books");
        let books_opts = f.prefix[1].options.as_ref().unwrap();
        assert_eq!(books_opts.size, 5);
        assert_eq!(books_opts.sort.len(), 1);
        assert_eq!(f.fields, vec!["title", "year"]);
    }

    #[test]
    fn terminal_collection_with_no_field_list_means_defaults() {
        let fields = parse_projection(&["authors[page=2]".to_string()]).unwrap();
        assert_eq!(fields[0].prefix.len(), 1);
        assert!(fields[0].fields.is_empty());
    }

    #[test]
    fn size_is_clamped_to_the_page_budget() {
        let fields = parse_projection(&["authors[size=50000]".to_string()]).unwrap();
        assert_eq!(fields[0].prefix[0].options.as_ref().unwrap().size, 10_000);
    }

    #[test]
    fn rejects_blank_entries() {
        assert!(parse_projection(&["".to_string()]).is_err());
        assert!(parse_projection(&["  ".to_string()]).is_err());
    }

    #[test]
    fn rejects_malformed_segment() {
        assert!(parse_projection(&["a[size=]".to_string()]).is_err());
    }
}
