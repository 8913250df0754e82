//! Expansion of link hrefs into absolute URLs.
//!
//! # Design
//! `UriTemplateResolver` is an RFC 6570 expander for string values (levels 1
//! to 3, with prefix modifiers). It only fills placeholders: parameters that
//! no expression names are ignored, never appended as extra query pairs.
//! Expressions whose variables are all unset expand to nothing.
//!
//! The resolver is a pure function of its inputs and holds no state apart
//! from an optional base URL used for relative hrefs.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use url::Url;

use crate::error::{Error, Result};
use crate::http::Parameters;
use crate::link::Link;

/// Characters left as-is by simple expansion.
const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Characters left as-is by `+` and `#` expansion and in literals.
const UNRESERVED_OR_RESERVED: &AsciiSet = &UNRESERVED
    .remove(b':')
    .remove(b'/')
    .remove(b'?')
    .remove(b'#')
    .remove(b'[')
    .remove(b']')
    .remove(b'@')
    .remove(b'!')
    .remove(b'$')
    .remove(b'&')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b'+')
    .remove(b',')
    .remove(b';')
    .remove(b'=');

/// Turns a [`Link`] plus per-call parameters into a URL ready for transport.
pub trait LinkResolver: Send + Sync {
    fn resolve(&self, link: &Link, parameters: &Parameters) -> Result<Url>;
}

/// RFC 6570 based [`LinkResolver`].
#[derive(Debug, Clone, Default)]
pub struct UriTemplateResolver {
    base: Option<Url>,
}

impl UriTemplateResolver {
    /// A resolver that only accepts absolute hrefs.
    pub fn new() -> Self {
        Self::default()
    }

    /// A resolver that joins relative hrefs onto `base`.
    pub fn with_base(base: Url) -> Self {
        Self { base: Some(base) }
    }

    pub fn base(&self) -> Option<&Url> {
        self.base.as_ref()
    }

    /// Expand `template` without parsing the result as a URL.
    pub fn expand(template: &str, parameters: &Parameters) -> Result<String> {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(i) = rest.find(['{', '}']) {
            push_encoded(&rest[..i], true, &mut out);
            if rest.as_bytes()[i] == b'}' {
                return Err(Error::invalid_link(template, "unmatched '}'"));
            }
            let after = &rest[i + 1..];
            let end = after
                .find('}')
                .ok_or_else(|| Error::invalid_link(template, "unterminated expression"))?;
            expand_expression(&after[..end], parameters, &mut out)
                .map_err(|reason| Error::invalid_link(template, reason))?;
            rest = &after[end + 1..];
        }
        push_encoded(rest, true, &mut out);
        Ok(out)
    }
}

impl LinkResolver for UriTemplateResolver {
    fn resolve(&self, link: &Link, parameters: &Parameters) -> Result<Url> {
        let href = link.href.as_str();
        if href.trim().is_empty() {
            return Err(Error::invalid_link(href, "href is empty"));
        }
        if href.trim() != href {
            return Err(Error::invalid_link(href, "href has surrounding whitespace"));
        }
        let expanded = Self::expand(href, parameters)?;
        match Url::parse(&expanded) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => match &self.base {
                Some(base) => base
                    .join(&expanded)
                    .map_err(|e| Error::invalid_link(&link.href, e.to_string())),
                None => Err(Error::invalid_link(
                    &link.href,
                    "relative href and no base URL",
                )),
            },
            Err(e) => Err(Error::invalid_link(&link.href, e.to_string())),
        }
    }
}

/// Expansion rules for one expression operator (RFC 6570 appendix A).
struct Operator {
    first: &'static str,
    sep: &'static str,
    named: bool,
    if_empty: &'static str,
    allow_reserved: bool,
}

impl Operator {
    const fn new(
        first: &'static str,
        sep: &'static str,
        named: bool,
        if_empty: &'static str,
        allow_reserved: bool,
    ) -> Self {
        Self {
            first,
            sep,
            named,
            if_empty,
            allow_reserved,
        }
    }

    /// Split the operator off `expr`, returning it with the variable list.
    fn parse(expr: &str) -> Result<(Operator, &str), String> {
        let Some(c) = expr.chars().next() else {
            return Err("empty expression".to_string());
        };
        let op = match c {
            '+' => Operator::new("", ",", false, "", true),
            '#' => Operator::new("#", ",", false, "", true),
            '.' => Operator::new(".", ".", false, "", false),
            '/' => Operator::new("/", "/", false, "", false),
            ';' => Operator::new(";", ";", true, "", false),
            '?' => Operator::new("?", "&", true, "=", false),
            '&' => Operator::new("&", "&", true, "=", false),
            '=' | ',' | '!' | '@' | '|' => {
                return Err(format!("unsupported operator '{c}'"));
            }
            _ => return Ok((Operator::new("", ",", false, "", false), expr)),
        };
        Ok((op, &expr[c.len_utf8()..]))
    }
}

struct VarSpec<'a> {
    name: &'a str,
    prefix: Option<usize>,
}

impl<'a> VarSpec<'a> {
    fn parse(spec: &'a str) -> Result<Self, String> {
        // Explode only changes list and map values, which are not supported.
        let spec = spec.strip_suffix('*').unwrap_or(spec);
        let (name, prefix) = match spec.split_once(':') {
            Some((name, len)) => {
                let len = len
                    .parse::<usize>()
                    .ok()
                    .filter(|n| (1..10_000).contains(n))
                    .ok_or_else(|| format!("invalid prefix length in '{spec}'"))?;
                (name, Some(len))
            }
            None => (spec, None),
        };
        let valid = !name.is_empty()
            && name
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'%'));
        if !valid {
            return Err(format!("invalid variable name '{name}'"));
        }
        Ok(Self { name, prefix })
    }
}

fn expand_expression(expr: &str, parameters: &Parameters, out: &mut String) -> Result<(), String> {
    let (op, vars) = Operator::parse(expr)?;
    if vars.is_empty() {
        return Err("empty expression".to_string());
    }

    let mut first = true;
    for spec in vars.split(',') {
        let var = VarSpec::parse(spec)?;
        let Some(value) = parameters.get(var.name) else {
            continue;
        };
        out.push_str(if first { op.first } else { op.sep });
        first = false;

        let value = match var.prefix {
            Some(n) => value
                .char_indices()
                .nth(n)
                .map_or(value.as_str(), |(i, _)| &value[..i]),
            None => value.as_str(),
        };
        if op.named {
            out.push_str(var.name);
            if value.is_empty() {
                out.push_str(op.if_empty);
                continue;
            }
            out.push('=');
        }
        push_encoded(value, op.allow_reserved, out);
    }
    Ok(())
}

/// Percent-encode `value` onto `out`. Reserved mode keeps reserved
/// characters and existing `%XX` triplets.
fn push_encoded(value: &str, allow_reserved: bool, out: &mut String) {
    if !allow_reserved {
        out.extend(utf8_percent_encode(value, UNRESERVED));
        return;
    }
    let mut rest = value;
    while let Some(i) = rest.find('%') {
        out.extend(utf8_percent_encode(&rest[..i], UNRESERVED_OR_RESERVED));
        match rest.get(i..i + 3) {
            Some(triplet) if triplet[1..].bytes().all(|b| b.is_ascii_hexdigit()) => {
                out.push_str(triplet);
                rest = &rest[i + 3..];
            }
            _ => {
                out.push_str("%25");
                rest = &rest[i + 1..];
            }
        }
    }
    out.extend(utf8_percent_encode(rest, UNRESERVED_OR_RESERVED));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Parameters {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn resolve(href: &str, pairs: &[(&str, &str)]) -> Result<Url> {
        UriTemplateResolver::new().resolve(&Link::new(href), &params(pairs))
    }

    #[test]
    fn plain_href_is_returned_unchanged() {
        let url = resolve("https://api.example.com/", &[]).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/");
    }

    #[test]
    fn placeholder_is_substituted_and_encoded() {
        let url = resolve("https://api.example.com/orders/{id}", &[("id", "a b/c")]).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/orders/a%20b%2Fc");
    }

    #[test]
    fn missing_parameter_collapses_to_empty() {
        let url = resolve("https://api.example.com/orders/{id}", &[]).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/orders/");
        let url = resolve("https://api.example.com/orders{?page,size}", &[]).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/orders");
    }

    #[test]
    fn query_expansion_skips_unset_variables() {
        let url = resolve(
            "https://api.example.com/orders{?page,size,sort}",
            &[("page", "2"), ("sort", "desc")],
        )
        .unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/orders?page=2&sort=desc");
    }

    #[test]
    fn unmatched_parameters_are_ignored() {
        let url = resolve("https://api.example.com/orders", &[("page", "2")]).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/orders");
    }

    #[test]
    fn relative_href_joins_base() {
        let resolver =
            UriTemplateResolver::with_base(Url::parse("https://api.example.com/v1/").unwrap());
        let url = resolver
            .resolve(&Link::new("orders/{id}"), &params(&[("id", "7")]))
            .unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v1/orders/7");
        let url = resolver.resolve(&Link::new("/root"), &Parameters::new()).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/root");
    }

    #[test]
    fn relative_href_without_base_is_invalid() {
        let err = resolve("/orders", &[]).unwrap_err();
        assert!(matches!(err, Error::InvalidLink { ref href, .. } if href == "/orders"));
    }

    #[test]
    fn empty_href_is_invalid() {
        assert!(matches!(resolve("  ", &[]), Err(Error::InvalidLink { .. })));
    }

    #[test]
    fn padded_href_is_invalid() {
        for href in [" https://x.test/", "https://x.test/\n", "\t/orders"] {
            let err = resolve(href, &[]).unwrap_err();
            assert!(
                matches!(err, Error::InvalidLink { href: ref h, .. } if h == href),
                "{href:?}: {err:?}"
            );
        }
    }

    #[test]
    fn malformed_templates_are_invalid() {
        for href in [
            "https://x.test/{id",
            "https://x.test/id}",
            "https://x.test/{}",
            "https://x.test/{?}",
            "https://x.test/{=id}",
            "https://x.test/{a b}",
            "https://x.test/{id:0}",
        ] {
            assert!(
                matches!(resolve(href, &[("id", "1")]), Err(Error::InvalidLink { .. })),
                "{href} should be rejected"
            );
        }
    }

    #[test]
    fn prefix_counts_characters_not_bytes() {
        let out = UriTemplateResolver::expand("{name:2}", &params(&[("name", "ééé")])).unwrap();
        assert_eq!(out, "%C3%A9%C3%A9");
    }

    #[test]
    fn reserved_expansion_keeps_existing_escapes() {
        let out =
            UriTemplateResolver::expand("{+path}", &params(&[("path", "/a%20b/100%")])).unwrap();
        assert_eq!(out, "/a%20b/100%25");
    }

    #[test]
    fn parameters_are_not_mutated() {
        let p = params(&[("id", "1")]);
        let before = p.clone();
        resolve("https://x.test/{id}", &[("id", "1")]).unwrap();
        UriTemplateResolver::new()
            .resolve(&Link::new("https://x.test/{id}"), &p)
            .unwrap();
        assert_eq!(p, before);
    }
}
