//! Page-selection expressions in the syntax the viewer accepts:
//! comma-separated single pages (`5`), closed ranges (`1-3`), and
//! open-ended ranges (`7-`), all 1-based and inclusive.

use std::fmt;

use thiserror::Error;

/// Errors raised while parsing a page-selection expression.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PageRangeError {
    #[error("invalid page token `{0}`")]
    Syntax(String),
    #[error("page range {start}-{end} is out of order")]
    Order { start: u32, end: u32 },
}

/// One inclusive span of pages; `end: None` runs to the last page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSpan {
    pub start: u32,
    pub end: Option<u32>,
}

impl fmt::Display for PageSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end {
            Some(end) if end == self.start => write!(f, "{}", self.start),
            Some(end) => write!(f, "{}-{}", self.start, end),
            None => write!(f, "{}-", self.start),
        }
    }
}

/// Parsed page selection. `All` is the sentinel for an empty or omitted
/// expression and leaves page selection to the viewer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PageSelection {
    #[default]
    All,
    Ranges(Vec<PageSpan>),
}

impl PageSelection {
    /// Parses a comma-separated page expression. Whitespace around tokens is
    /// ignored; a blank expression selects all pages. Spans are kept in
    /// input order without merging or deduplication, the viewer interprets
    /// overlaps itself.
    pub fn parse(expr: &str) -> Result<Self, PageRangeError> {
        if expr.trim().is_empty() {
            return Ok(PageSelection::All);
        }
        let mut spans = Vec::new();
        for token in expr.split(',') {
            spans.push(parse_span(token.trim())?);
        }
        Ok(PageSelection::Ranges(spans))
    }

    /// Serializes back to the viewer's textual syntax; `None` for [`All`],
    /// which has no textual form.
    pub fn directive(&self) -> Option<String> {
        match self {
            PageSelection::All => None,
            PageSelection::Ranges(spans) => Some(
                spans
                    .iter()
                    .map(PageSpan::to_string)
                    .collect::<Vec<_>>()
                    .join(","),
            ),
        }
    }
}

fn parse_span(token: &str) -> Result<PageSpan, PageRangeError> {
    match token.split_once('-') {
        None => {
            let page = parse_page(token)?;
            Ok(PageSpan {
                start: page,
                end: Some(page),
            })
        }
        Some((start, "")) => Ok(PageSpan {
            start: parse_page_part(start, token)?,
            end: None,
        }),
        Some((start, end)) => {
            let start = parse_page_part(start, token)?;
            let end = parse_page_part(end, token)?;
            if end < start {
                return Err(PageRangeError::Order { start, end });
            }
            Ok(PageSpan {
                start,
                end: Some(end),
            })
        }
    }
}

fn parse_page(token: &str) -> Result<u32, PageRangeError> {
    parse_page_part(token, token)
}

fn parse_page_part(text: &str, token: &str) -> Result<u32, PageRangeError> {
    match text.parse::<u32>() {
        Ok(page) if page >= 1 => Ok(page),
        _ => Err(PageRangeError::Syntax(token.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_singles_ranges_and_open_ends() {
        let parsed = PageSelection::parse("1-3,5,7-").expect("expression should parse");
        assert_eq!(
            parsed,
            PageSelection::Ranges(vec![
                PageSpan {
                    start: 1,
                    end: Some(3)
                },
                PageSpan {
                    start: 5,
                    end: Some(5)
                },
                PageSpan {
                    start: 7,
                    end: None
                },
            ])
        );
    }

    #[test]
    fn blank_expression_selects_all_pages() {
        assert_eq!(PageSelection::parse("").unwrap(), PageSelection::All);
        assert_eq!(PageSelection::parse("   ").unwrap(), PageSelection::All);
        assert_eq!(PageSelection::All.directive(), None);
    }

    #[test]
    fn whitespace_around_tokens_is_ignored() {
        assert_eq!(
            PageSelection::parse(" 1-3 , 5 ").unwrap(),
            PageSelection::parse("1-3,5").unwrap()
        );
    }

    #[test]
    fn reversed_range_reports_both_bounds() {
        assert_eq!(
            PageSelection::parse("5-3"),
            Err(PageRangeError::Order { start: 5, end: 3 })
        );
    }

    #[test]
    fn malformed_tokens_name_the_offender() {
        assert_eq!(
            PageSelection::parse("1,x,3"),
            Err(PageRangeError::Syntax("x".into()))
        );
        assert_eq!(
            PageSelection::parse("0"),
            Err(PageRangeError::Syntax("0".into()))
        );
        assert_eq!(
            PageSelection::parse("-5"),
            Err(PageRangeError::Syntax("-5".into()))
        );
        assert_eq!(
            PageSelection::parse("1-2-3"),
            Err(PageRangeError::Syntax("1-2-3".into()))
        );
    }

    #[test]
    fn directive_round_trips_without_normalizing() {
        let expr = "3-1000,2,2,9-";
        let parsed = PageSelection::parse(expr).unwrap();
        assert_eq!(parsed.directive().as_deref(), Some(expr));
    }
}
