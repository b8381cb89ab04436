use crate::canonical::extract_route;

/// One piece of a parsed template: either literal text or a specifier
/// (`spec.md` §4.6).
#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Literal(String),
    Specifier(char),
}

/// A parsed output template, ready to render repeatedly without
/// re-parsing the format string on every query.
#[derive(Debug, Clone)]
pub struct Template {
    pieces: Vec<Piece>,
}

/// Inputs available to the renderer for one statement (`spec.md` §4.6).
pub struct RenderInput<'a> {
    pub client_addr: &'a str,
    pub client_ip: &'a str,
    pub query: &'a str,
    /// Raw request body, used to extract the route comment for `#r`.
    pub raw_body: &'a str,
}

impl Template {
    /// Parses `template` into alternating literal and specifier pieces.
    /// Unknown `#x` escapes are kept as the literal two-character string
    /// `#x`; `##` becomes a literal `#`.
    pub fn parse(template: &str) -> Self {
        let mut pieces = Vec::new();
        let mut literal = String::new();
        let mut chars = template.chars().peekable();
        while let Some(c) = chars.next() {
            if c != '#' {
                literal.push(c);
                continue;
            }
            match chars.next() {
                Some('#') => literal.push('#'),
                Some(spec @ ('s' | 'i' | 'q' | 'r')) => {
                    if !literal.is_empty() {
                        pieces.push(Piece::Literal(std::mem::take(&mut literal)));
                    }
                    pieces.push(Piece::Specifier(spec));
                }
                Some(other) => {
                    literal.push('#');
                    literal.push(other);
                }
                None => literal.push('#'),
            }
        }
        if !literal.is_empty() {
            pieces.push(Piece::Literal(literal));
        }
        Self { pieces }
    }

    /// Renders the template against `input`.
    pub fn render(&self, input: &RenderInput<'_>) -> String {
        let mut out = String::new();
        for piece in &self.pieces {
            match piece {
                Piece::Literal(s) => out.push_str(s),
                Piece::Specifier('s') => out.push_str(input.client_addr),
                Piece::Specifier('i') => out.push_str(input.client_ip),
                Piece::Specifier('q') => out.push_str(input.query),
                Piece::Specifier('r') => match extract_route(input.raw_body) {
                    Some(route) => out.push_str(&route),
                    None => {
                        out.push_str("(unknown) ");
                        out.push_str(input.query);
                    }
                },
                Piece::Specifier(other) => {
                    // unreachable: parse() only emits known specifiers
                    out.push('#');
                    out.push(*other);
                }
            }
        }
        out
    }
}
