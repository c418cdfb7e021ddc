//! Parsing of template files into group specifications.
//!
//! The group structure is purely lexical: headers start with `#`, comments
//! with `##`, and everything else is template body text belonging to the most
//! recent header.

use crate::template::TemplateError;

/// A `#choices <file> <col>...` declaration: load value lists from the named
/// columns of a record file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoicesSpec {
    pub file: String,
    pub columns: Vec<String>,
}

/// A `#linked <main_key> [<link_key>] <file>` declaration and its body lines.
///
/// The second key is optional; when absent the linked file joins on a column
/// with the same name as the main key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedSpec {
    pub file: String,
    pub main_key: String,
    pub link_key: String,
    pub lines: Vec<String>,
}

/// One `#main <file> <key>` group with its body lines and linked groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSpec {
    pub file: String,
    pub key: String,
    pub main_lines: Vec<String>,
    pub linked: Vec<LinkedSpec>,
}

/// A fully parsed template file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateFile {
    pub choices: Vec<ChoicesSpec>,
    pub groups: Vec<GroupSpec>,
}

#[derive(Clone, Copy)]
enum Section {
    Preamble,
    Main,
    Linked,
}

/// Parse the text of a template file into its group structure.
///
/// `#choices` records may only appear before the first `#main`; whether they
/// are allowed at all depends on the caller (global templates only).
pub fn parse_template_file(text: &str) -> Result<TemplateFile, TemplateError> {
    let mut parsed = TemplateFile::default();
    let mut section = Section::Preamble;

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with("##") {
            continue;
        }
        if let Some(rest) = line.strip_prefix("#main") {
            finish_group(&mut parsed, &section)?;
            let mut tokens = rest.split_whitespace();
            let (Some(file), Some(key)) = (tokens.next(), tokens.next()) else {
                return Err(TemplateError::BadMainHeader(line.to_string()));
            };
            parsed.groups.push(GroupSpec {
                file: file.to_string(),
                key: key.to_string(),
                main_lines: Vec::new(),
                linked: Vec::new(),
            });
            section = Section::Main;
        } else if let Some(rest) = line.strip_prefix("#linked") {
            let Some(group) = parsed.groups.last_mut() else {
                return Err(TemplateError::MissingMain);
            };
            if group.main_lines.is_empty() {
                return Err(TemplateError::EmptyMain(group.file.clone()));
            }
            check_linked(group)?;
            // Header is <main_key> [<link_key>] <file>: the file name is the
            // last token.
            let tokens: Vec<&str> = rest.split_whitespace().collect();
            let (main_key, link_key, file) = match tokens.as_slice() {
                [key, file] => (*key, *key, *file),
                [main_key, link_key, file] => (*main_key, *link_key, *file),
                _ => return Err(TemplateError::BadLinkedHeader(line.to_string())),
            };
            group.linked.push(LinkedSpec {
                file: file.to_string(),
                main_key: main_key.to_string(),
                link_key: link_key.to_string(),
                lines: Vec::new(),
            });
            section = Section::Linked;
        } else if let Some(rest) = line.strip_prefix("#choices") {
            if !matches!(section, Section::Preamble) {
                return Err(TemplateError::MisplacedChoices);
            }
            let mut tokens = rest.split_whitespace();
            let Some(file) = tokens.next() else {
                return Err(TemplateError::BadChoicesHeader(line.to_string()));
            };
            let columns: Vec<String> = tokens.map(String::from).collect();
            if columns.is_empty() {
                return Err(TemplateError::BadChoicesHeader(line.to_string()));
            }
            parsed.choices.push(ChoicesSpec {
                file: file.to_string(),
                columns,
            });
        } else {
            let group = match (&section, parsed.groups.last_mut()) {
                (Section::Preamble, _) | (_, None) => return Err(TemplateError::MissingMain),
                (_, Some(group)) => group,
            };
            match section {
                Section::Linked => match group.linked.last_mut() {
                    Some(link) => link.lines.push(line.to_string()),
                    None => return Err(TemplateError::MissingMain),
                },
                _ => group.main_lines.push(line.to_string()),
            }
        }
    }

    finish_group(&mut parsed, &section)?;
    if parsed.groups.is_empty() {
        return Err(TemplateError::EmptyFile);
    }
    Ok(parsed)
}

/// Validate the group being closed: a main section needs body lines and a
/// trailing linked section must not be empty.
fn finish_group(parsed: &mut TemplateFile, section: &Section) -> Result<(), TemplateError> {
    let Some(group) = parsed.groups.last() else {
        return Ok(());
    };
    match section {
        Section::Preamble => Ok(()),
        Section::Main => {
            if group.main_lines.is_empty() {
                Err(TemplateError::EmptyMain(group.file.clone()))
            } else {
                Ok(())
            }
        }
        Section::Linked => check_linked(group),
    }
}

fn check_linked(group: &GroupSpec) -> Result<(), TemplateError> {
    if let Some(link) = group.linked.last() {
        if link.lines.is_empty() {
            return Err(TemplateError::EmptyLinked(link.file.clone()));
        }
    }
    Ok(())
}

/// Concatenate body lines into one template string. Each line is trimmed and
/// joined with a single space, except that a line starting with `{{` glues
/// directly to the previous one.
pub fn join_lines(lines: &[String]) -> String {
    let mut out = String::new();
    for line in lines {
        let line = line.trim();
        if !out.is_empty() && !line.starts_with("{{") {
            out.push(' ');
        }
        out.push_str(line);
    }
    out
}
