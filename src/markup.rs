//! Tokenize schema markup with PEST and replay it as start/end element events.
//!
//! The grammar (`grammar.pest`) accepts the XML subset schema documents use.
//! Character data, comments and processing instructions are dropped; what
//! remains is a depth-first stream of element events delivered to a
//! [`MarkupHandler`], in document order, the way a SAX parser would.

use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser as PestParser;

#[derive(PestParser)]
#[grammar = "grammar.pest"]
struct MarkupParser;

/// Element attribute with entity references already decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// Receives element events. Returning an error stops the walk.
pub trait MarkupHandler {
    type Error;

    fn start_element(&mut self, name: &str, attributes: &[Attribute], line: usize) -> Result<(), Self::Error>;

    fn end_element(&mut self, name: &str, line: usize) -> Result<(), Self::Error>;
}

/// Failure to tokenize or structurally match the markup.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MarkupError {
    #[error("syntax: {0}")]
    Syntax(String),
    #[error("line {line}: end tag </{found}> does not match <{expected}>")]
    MismatchedEndTag {
        expected: String,
        found: String,
        line: usize,
    },
    #[error("line {line}: duplicate attribute `{attribute}` on <{element}>")]
    DuplicateAttribute {
        element: String,
        attribute: String,
        line: usize,
    },
    #[error("line {line}: {message}")]
    Entity { message: String, line: usize },
}

/// Error from [`walk`]: either the markup itself or the handler.
#[derive(Debug)]
pub enum WalkError<E> {
    Markup(MarkupError),
    Handler(E),
}

impl<E> From<MarkupError> for WalkError<E> {
    fn from(e: MarkupError) -> Self {
        WalkError::Markup(e)
    }
}

/// Parse `source` and feed every element to `handler`.
pub fn walk<H: MarkupHandler>(source: &str, handler: &mut H) -> Result<(), WalkError<H::Error>> {
    let mut pairs = MarkupParser::parse(Rule::document, source)
        .map_err(|e| MarkupError::Syntax(e.to_string()))?;
    let document = pairs
        .next()
        .ok_or_else(|| MarkupError::Syntax("empty document".to_string()))?;
    for inner in document.into_inner() {
        if inner.as_rule() == Rule::element {
            walk_element(inner, handler)?;
        }
    }
    Ok(())
}

/// Collect the event stream into owned form; handy for tests and tooling.
pub fn events(source: &str) -> Result<Vec<OwnedEvent>, MarkupError> {
    let mut collector = Collector::default();
    match walk(source, &mut collector) {
        Ok(()) => Ok(collector.events),
        Err(WalkError::Markup(e)) => Err(e),
        Err(WalkError::Handler(never)) => match never {},
    }
}

/// Element event in owned form.
#[derive(Debug, Clone, PartialEq)]
pub enum OwnedEvent {
    Start { name: String, attributes: Vec<Attribute> },
    End { name: String },
}

#[derive(Default)]
struct Collector {
    events: Vec<OwnedEvent>,
}

impl MarkupHandler for Collector {
    type Error = std::convert::Infallible;

    fn start_element(&mut self, name: &str, attributes: &[Attribute], _line: usize) -> Result<(), Self::Error> {
        self.events.push(OwnedEvent::Start {
            name: name.to_string(),
            attributes: attributes.to_vec(),
        });
        Ok(())
    }

    fn end_element(&mut self, name: &str, _line: usize) -> Result<(), Self::Error> {
        self.events.push(OwnedEvent::End { name: name.to_string() });
        Ok(())
    }
}

fn walk_element<H: MarkupHandler>(pair: Pair<Rule>, handler: &mut H) -> Result<(), WalkError<H::Error>> {
    let mut parts = pair.into_inner();
    let tag = parts
        .next()
        .ok_or_else(|| MarkupError::Syntax("element without tag".to_string()))?;
    let line = tag.as_span().start_pos().line_col().0;
    match tag.as_rule() {
        Rule::empty_element => {
            let (name, attributes) = build_tag(tag)?;
            handler
                .start_element(&name, &attributes, line)
                .map_err(WalkError::Handler)?;
            handler.end_element(&name, line).map_err(WalkError::Handler)?;
        }
        Rule::start_tag => {
            let (name, attributes) = build_tag(tag)?;
            handler
                .start_element(&name, &attributes, line)
                .map_err(WalkError::Handler)?;
            for part in parts {
                match part.as_rule() {
                    Rule::content => {
                        for child in part.into_inner() {
                            if child.as_rule() == Rule::element {
                                walk_element(child, handler)?;
                            }
                        }
                    }
                    Rule::end_tag => {
                        let end_line = part.as_span().start_pos().line_col().0;
                        let found = part.into_inner().next().map(|p| p.as_str()).unwrap_or("");
                        if found != name {
                            return Err(MarkupError::MismatchedEndTag {
                                expected: name,
                                found: found.to_string(),
                                line: end_line,
                            }
                            .into());
                        }
                        handler.end_element(&name, end_line).map_err(WalkError::Handler)?;
                    }
                    _ => {}
                }
            }
        }
        other => return Err(MarkupError::Syntax(format!("unexpected {:?}", other)).into()),
    }
    Ok(())
}

fn build_tag(pair: Pair<Rule>) -> Result<(String, Vec<Attribute>), MarkupError> {
    let line = pair.as_span().start_pos().line_col().0;
    let mut name = String::new();
    let mut attributes: Vec<Attribute> = Vec::new();
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::name => name = inner.as_str().to_string(),
            Rule::attribute => {
                let mut it = inner.into_inner();
                let attr_name = it
                    .next()
                    .ok_or_else(|| MarkupError::Syntax("attribute: name".to_string()))?
                    .as_str()
                    .to_string();
                let raw = it.next().map(|p| p.as_str()).unwrap_or("");
                let value = decode_entities(raw).map_err(|message| MarkupError::Entity { message, line })?;
                if attributes.iter().any(|a| a.name == attr_name) {
                    return Err(MarkupError::DuplicateAttribute {
                        element: name,
                        attribute: attr_name,
                        line,
                    });
                }
                attributes.push(Attribute { name: attr_name, value });
            }
            _ => {}
        }
    }
    Ok((name, attributes))
}

/// Replace the predefined XML entities and numeric character references.
pub fn decode_entities(raw: &str) -> Result<String, String> {
    if !raw.contains('&') {
        return Ok(raw.to_string());
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let semi = after
            .find(';')
            .ok_or_else(|| format!("unterminated entity reference in `{}`", raw))?;
        let entity = &after[..semi];
        match entity {
            "lt" => out.push('<'),
            "gt" => out.push('>'),
            "amp" => out.push('&'),
            "quot" => out.push('"'),
            "apos" => out.push('\''),
            _ => {
                let code = if let Some(hex) = entity.strip_prefix("#x").or_else(|| entity.strip_prefix("#X")) {
                    u32::from_str_radix(hex, 16).ok()
                } else if let Some(dec) = entity.strip_prefix('#') {
                    dec.parse::<u32>().ok()
                } else {
                    None
                };
                let c = code
                    .and_then(char::from_u32)
                    .ok_or_else(|| format!("unknown entity `&{};`", entity))?;
                out.push(c);
            }
        }
        rest = &after[semi + 1..];
    }
    out.push_str(rest);
    Ok(out)
}
