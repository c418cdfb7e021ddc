//! Compilation and rendering of a single template string.
//!
//! Directives are delimited by `{{` and `}}`. A bare directive names a field
//! of the record being rendered; command directives start with `$`:
//!
//! * `{{$if:field}} ... {{$else}} ... {{$fi}}` branches on the field being
//!   non-blank (the `$else` clause is optional, and conditionals nest)
//! * `{{$list:field:conj}}` renders a multi-valued field as an English list
//!   joined with the given conjunction (default `and`)
//! * `{{$include:group:field}}` inserts the global text stored by the named
//!   group under the key found in the field
//! * `{{$choice:name}}` rotates through the named choice list

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::parsing::{FieldStream, Record, MULTI_VALUE_DELIMITER};
use crate::template::{GlobalStore, TemplateError};

enum Segment {
    Literal(String),
    Field(usize),
    If {
        cond: usize,
        then: Vec<Segment>,
        otherwise: Vec<Segment>,
    },
    List {
        field: usize,
        conjunction: String,
    },
    Include {
        group: String,
        key: usize,
    },
    Choice {
        list: String,
        cursor: AtomicUsize,
    },
}

/// A compiled template producing one line of text per record.
pub struct LineTemplate {
    segments: Vec<Segment>,
}

enum Token {
    Text(String),
    Directive(String),
}

/// Where a nested segment sequence stopped.
enum Stop {
    End,
    Else,
    Fi,
}

impl LineTemplate {
    /// Compile a template string, resolving field references against the
    /// stream the template will render.
    pub fn compile(stream: &mut FieldStream, text: &str) -> Result<Self, TemplateError> {
        let tokens = lex(text)?;
        let mut iter = tokens.into_iter();
        let (segments, stop) = parse(&mut iter, stream, false)?;
        if !matches!(stop, Stop::End) {
            return Err(TemplateError::BadDirective("$fi".to_string()));
        }
        Ok(Self { segments })
    }

    /// Render one record. Returns `None` when the rendering is empty or
    /// whitespace-only, suppressing the record.
    pub fn render(&self, record: &Record, globals: &GlobalStore) -> Option<String> {
        let mut out = String::new();
        render_into(&self.segments, record, globals, &mut out);
        if out.trim().is_empty() {
            None
        } else {
            Some(out)
        }
    }
}

fn render_into(segments: &[Segment], record: &Record, globals: &GlobalStore, out: &mut String) {
    for segment in segments {
        match segment {
            Segment::Literal(text) => out.push_str(text),
            Segment::Field(idx) => out.push_str(record.get(*idx)),
            Segment::If {
                cond,
                then,
                otherwise,
            } => {
                let branch = if record.get(*cond).is_empty() {
                    otherwise
                } else {
                    then
                };
                render_into(branch, record, globals, out);
            }
            Segment::List { field, conjunction } => {
                let items: Vec<&str> = record
                    .get(*field)
                    .split(MULTI_VALUE_DELIMITER)
                    .filter(|s| !s.is_empty())
                    .collect();
                if !items.is_empty() {
                    out.push_str(&english_list(&items, conjunction));
                }
            }
            Segment::Include { group, key } => {
                if let Some(text) = globals.text(group, record.get(*key)) {
                    out.push_str(text);
                }
            }
            Segment::Choice { list, cursor } => {
                if let Some(values) = globals.choice_list(list) {
                    let idx = cursor.fetch_add(1, Ordering::Relaxed) % values.len();
                    out.push_str(&values[idx]);
                }
            }
        }
    }
}

/// Join items into English prose: `a`, `a and b`, `a, b, and c`.
fn english_list(items: &[&str], conjunction: &str) -> String {
    match items {
        [] => String::new(),
        [only] => (*only).to_string(),
        [first, second] => format!("{first} {conjunction} {second}"),
        [rest @ .., last] => format!("{}, {conjunction} {last}", rest.join(", ")),
    }
}

fn lex(text: &str) -> Result<Vec<Token>, TemplateError> {
    let mut tokens = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find("{{") {
        if start > 0 {
            tokens.push(Token::Text(rest[..start].to_string()));
        }
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            return Err(TemplateError::UnterminatedDirective(after.to_string()));
        };
        tokens.push(Token::Directive(after[..end].trim().to_string()));
        rest = &after[end + 2..];
    }
    if !rest.is_empty() {
        tokens.push(Token::Text(rest.to_string()));
    }
    Ok(tokens)
}

fn parse(
    tokens: &mut impl Iterator<Item = Token>,
    stream: &mut FieldStream,
    in_if: bool,
) -> Result<(Vec<Segment>, Stop), TemplateError> {
    let mut segments = Vec::new();
    while let Some(token) = tokens.next() {
        let directive = match token {
            Token::Text(text) => {
                segments.push(Segment::Literal(text));
                continue;
            }
            Token::Directive(d) => d,
        };

        if let Some(command) = directive.strip_prefix('$') {
            let mut parts = command.split(':');
            let name = parts.next().unwrap_or_default();
            match name {
                "if" => {
                    let field = parts
                        .next()
                        .ok_or_else(|| TemplateError::BadDirective(directive.clone()))?;
                    let cond = stream.find_field(field)?;
                    let (then, stop) = parse(tokens, stream, true)?;
                    let otherwise = match stop {
                        Stop::Else => {
                            let (otherwise, stop) = parse(tokens, stream, true)?;
                            if !matches!(stop, Stop::Fi) {
                                return Err(TemplateError::UnterminatedDirective(directive));
                            }
                            otherwise
                        }
                        Stop::Fi => Vec::new(),
                        Stop::End => {
                            return Err(TemplateError::UnterminatedDirective(directive));
                        }
                    };
                    segments.push(Segment::If {
                        cond,
                        then,
                        otherwise,
                    });
                }
                "else" => {
                    if !in_if {
                        return Err(TemplateError::BadDirective(directive));
                    }
                    return Ok((segments, Stop::Else));
                }
                "fi" => {
                    if !in_if {
                        return Err(TemplateError::BadDirective(directive));
                    }
                    return Ok((segments, Stop::Fi));
                }
                "list" => {
                    let field = parts
                        .next()
                        .ok_or_else(|| TemplateError::BadDirective(directive.clone()))?;
                    let conjunction = parts.next().unwrap_or("and").to_string();
                    segments.push(Segment::List {
                        field: stream.find_field(field)?,
                        conjunction,
                    });
                }
                "include" => {
                    let (Some(group), Some(field)) = (parts.next(), parts.next()) else {
                        return Err(TemplateError::BadDirective(directive));
                    };
                    segments.push(Segment::Include {
                        group: group.to_string(),
                        key: stream.find_field(field)?,
                    });
                }
                "choice" => {
                    let list = parts
                        .next()
                        .ok_or_else(|| TemplateError::BadDirective(directive.clone()))?;
                    segments.push(Segment::Choice {
                        list: list.to_string(),
                        cursor: AtomicUsize::new(0),
                    });
                }
                _ => return Err(TemplateError::BadDirective(directive)),
            }
        } else {
            segments.push(Segment::Field(stream.find_field(&directive)?));
        }
    }
    if in_if {
        // Ran out of tokens inside a conditional.
        Err(TemplateError::UnterminatedDirective("$if".to_string()))
    } else {
        Ok((segments, Stop::End))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::TabbedStream;
    use std::io::{BufRead, Cursor};

    fn stream_of(text: &str) -> FieldStream {
        let reader: Box<dyn BufRead + Send> = Box::new(Cursor::new(text.to_string()));
        FieldStream::Tabbed(TabbedStream::from_reader("test".to_string(), reader).unwrap())
    }

    fn next_record(stream: &mut FieldStream) -> Record {
        stream.next().unwrap().unwrap()
    }

    #[test]
    fn test_field_substitution() {
        let mut stream = stream_of("name\tcontigs\nalpha\t3\n");
        let template =
            LineTemplate::compile(&mut stream, "The genome {{name}} has {{contigs}} contigs.")
                .unwrap();
        let record = next_record(&mut stream);
        let globals = GlobalStore::default();
        assert_eq!(
            template.render(&record, &globals).unwrap(),
            "The genome alpha has 3 contigs."
        );
    }

    #[test]
    fn test_whitespace_only_render_suppressed() {
        let mut stream = stream_of("name\tnote\nalpha\t\n");
        let template = LineTemplate::compile(&mut stream, "{{note}} {{$if:note}}noted{{$fi}}").unwrap();
        let record = next_record(&mut stream);
        let globals = GlobalStore::default();
        assert!(template.render(&record, &globals).is_none());
    }

    #[test]
    fn test_literal_only_template_renders() {
        let mut stream = stream_of("name\nalpha\n");
        let template = LineTemplate::compile(&mut stream, "fixed text").unwrap();
        let record = next_record(&mut stream);
        let globals = GlobalStore::default();
        assert_eq!(template.render(&record, &globals).unwrap(), "fixed text");
    }

    #[test]
    fn test_if_else() {
        let mut stream = stream_of("name\tplasmids\nalpha\t2\nbeta\t\n");
        let template = LineTemplate::compile(
            &mut stream,
            "{{name}}{{$if:plasmids}} has {{plasmids}} plasmids{{$else}} has no plasmids{{$fi}}.",
        )
        .unwrap();
        let globals = GlobalStore::default();

        let first = next_record(&mut stream);
        assert_eq!(
            template.render(&first, &globals).unwrap(),
            "alpha has 2 plasmids."
        );
        let second = next_record(&mut stream);
        assert_eq!(
            template.render(&second, &globals).unwrap(),
            "beta has no plasmids."
        );
    }

    #[test]
    fn test_nested_if() {
        let mut stream = stream_of("a\tb\nx\ty\n");
        let template = LineTemplate::compile(
            &mut stream,
            "{{$if:a}}{{a}}{{$if:b}}/{{b}}{{$fi}}{{$fi}}",
        )
        .unwrap();
        let record = next_record(&mut stream);
        let globals = GlobalStore::default();
        assert_eq!(template.render(&record, &globals).unwrap(), "x/y");
    }

    #[test]
    fn test_list_joins_english_style() {
        let mut stream = stream_of("id\troles\np1\tone::two::three\np2\tone\np3\tone::two\n");
        let template =
            LineTemplate::compile(&mut stream, "roles: {{$list:roles:and}}").unwrap();
        let globals = GlobalStore::default();

        let three = next_record(&mut stream);
        assert_eq!(
            template.render(&three, &globals).unwrap(),
            "roles: one, two, and three"
        );
        let one = next_record(&mut stream);
        assert_eq!(template.render(&one, &globals).unwrap(), "roles: one");
        let two = next_record(&mut stream);
        assert_eq!(
            template.render(&two, &globals).unwrap(),
            "roles: one and two"
        );
    }

    #[test]
    fn test_include_pulls_global_text() {
        let mut globals = GlobalStore::default();
        globals.store_text("genome.json", "g1", "stored text for g1");

        let mut stream = stream_of("genome_id\ng1\ng2\n");
        let template =
            LineTemplate::compile(&mut stream, "{{$include:genome.json:genome_id}}").unwrap();

        let hit = next_record(&mut stream);
        assert_eq!(
            template.render(&hit, &globals).unwrap(),
            "stored text for g1"
        );
        let miss = next_record(&mut stream);
        assert!(template.render(&miss, &globals).is_none());
    }

    #[test]
    fn test_choice_rotates_deterministically() {
        let mut globals = GlobalStore::default();
        globals.insert_choices("names", vec!["Ann".to_string(), "Bob".to_string()]);

        let mut stream = stream_of("id\np1\np2\np3\n");
        let template =
            LineTemplate::compile(&mut stream, "{{$choice:names}} studied {{id}}.").unwrap();

        let mut rendered = Vec::new();
        while let Some(record) = stream.next() {
            rendered.push(template.render(&record.unwrap(), &globals).unwrap());
        }
        assert_eq!(
            rendered,
            vec![
                "Ann studied p1.",
                "Bob studied p2.",
                "Ann studied p3."
            ]
        );
    }

    #[test]
    fn test_bad_directives_rejected() {
        let mut stream = stream_of("a\nx\n");
        assert!(matches!(
            LineTemplate::compile(&mut stream, "{{$bogus:a}}"),
            Err(TemplateError::BadDirective(_))
        ));
        assert!(matches!(
            LineTemplate::compile(&mut stream, "{{$if:a}} unclosed"),
            Err(TemplateError::UnterminatedDirective(_))
        ));
        assert!(matches!(
            LineTemplate::compile(&mut stream, "open {{a"),
            Err(TemplateError::UnterminatedDirective(_))
        ));
        assert!(matches!(
            LineTemplate::compile(&mut stream, "{{$fi}}"),
            Err(TemplateError::BadDirective(_))
        ));
    }
}
