//! Record formatting
//!
//! Templates use printf-style placeholders: `%(name)s`, `%(levelname)-8s`,
//! `%(funcName)15s`. `%%` is a literal percent sign. Templates are parsed once
//! at registration so that rendering never fails.

use crate::error::{LogError, Result};
use crate::names::FormatterName;
use crate::record::Record;

/// Template for the built-in `simple_formatter`
pub const SIMPLE_TEMPLATE: &str = "%(asctime)s - %(name)s - %(levelname)s - %(message)s";

/// Template for the built-in `detail_formatter`
pub const DETAIL_TEMPLATE: &str =
    "%(asctime)s - [%(filename)s:%(lineno)s - %(funcName)15s() ]: %(levelname)-8s %(message)s";

const DEFAULT_DATEFMT: &str = "%Y-%m-%d %H:%M:%S,%3f";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    AscTime,
    Name,
    LevelName,
    LevelNo,
    Message,
    FileName,
    PathName,
    LineNo,
    FuncName,
    Module,
    ThreadName,
}

impl Field {
    fn parse(key: &str) -> Option<Self> {
        let field = match key {
            "asctime" => Field::AscTime,
            "name" => Field::Name,
            "levelname" => Field::LevelName,
            "levelno" => Field::LevelNo,
            "message" => Field::Message,
            "filename" => Field::FileName,
            "pathname" => Field::PathName,
            "lineno" => Field::LineNo,
            "funcName" => Field::FuncName,
            "module" => Field::Module,
            "threadName" => Field::ThreadName,
            _ => return None,
        };
        Some(field)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field {
        field: Field,
        width: usize,
        left_align: bool,
    },
}

/// A named, immutable template that renders records to text
#[derive(Debug, Clone)]
pub struct Formatter {
    name: FormatterName,
    template: String,
    datefmt: Option<String>,
    segments: Vec<Segment>,
}

impl Formatter {
    /// Parse a template into a formatter
    pub fn new(name: impl Into<FormatterName>, template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        let segments = parse_template(&template)?;
        Ok(Self {
            name: name.into(),
            template,
            datefmt: None,
            segments,
        })
    }

    /// Override the strftime format used for `%(asctime)s`
    pub fn with_datefmt(mut self, datefmt: impl Into<String>) -> Self {
        self.datefmt = Some(datefmt.into());
        self
    }

    pub fn name(&self) -> &FormatterName {
        &self.name
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Render a record
    pub fn format(&self, record: &Record) -> String {
        let mut out = String::with_capacity(self.template.len() + record.message.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field {
                    field,
                    width,
                    left_align,
                } => {
                    let value = self.field_value(*field, record);
                    if *left_align {
                        out.push_str(&format!("{:<width$}", value, width = *width));
                    } else {
                        out.push_str(&format!("{:>width$}", value, width = *width));
                    }
                }
            }
        }
        out
    }

    fn field_value(&self, field: Field, record: &Record) -> String {
        match field {
            Field::AscTime => record
                .timestamp
                .format(self.datefmt.as_deref().unwrap_or(DEFAULT_DATEFMT))
                .to_string(),
            Field::Name => {
                if record.logger.is_empty() {
                    "root".to_string()
                } else {
                    record.logger.clone()
                }
            }
            Field::LevelName => record.level.as_str().to_string(),
            Field::LevelNo => record.level.as_u8().to_string(),
            Field::Message => record.message.clone(),
            Field::FileName => record.file_name().unwrap_or("?").to_string(),
            Field::PathName => record.file.clone().unwrap_or_else(|| "?".to_string()),
            Field::LineNo => record.line.unwrap_or(0).to_string(),
            Field::FuncName => record.function.clone().unwrap_or_else(|| "?".to_string()),
            Field::Module => record.module().unwrap_or("?").to_string(),
            Field::ThreadName => record
                .thread
                .clone()
                .unwrap_or_else(|| "unnamed".to_string()),
        }
    }
}

/// Widest padding a placeholder may ask for
const MAX_FIELD_WIDTH: usize = 1024;

fn parse_template(template: &str) -> Result<Vec<Segment>> {
    let invalid = |reason: &str| LogError::InvalidTemplate {
        template: template.to_string(),
        reason: reason.to_string(),
    };

    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            literal.push(c);
            continue;
        }
        match chars.next() {
            Some('%') => literal.push('%'),
            Some('(') => {
                let mut key = String::new();
                loop {
                    match chars.next() {
                        Some(')') => break,
                        Some(ch) => key.push(ch),
                        None => return Err(invalid("unterminated placeholder")),
                    }
                }
                let field = Field::parse(&key)
                    .ok_or_else(|| invalid(&format!("unknown field {:?}", key)))?;

                let left_align = chars.next_if_eq(&'-').is_some();
                let mut width = 0usize;
                while let Some(digit) = chars.next_if(|ch| ch.is_ascii_digit()) {
                    width = width
                        .checked_mul(10)
                        .and_then(|w| w.checked_add(digit.to_digit(10).unwrap_or(0) as usize))
                        .filter(|w| *w <= MAX_FIELD_WIDTH)
                        .ok_or_else(|| invalid("field width too large"))?;
                }
                match chars.next() {
                    Some('s') | Some('d') | Some('r') => {}
                    Some(other) => {
                        return Err(invalid(&format!("unsupported conversion {:?}", other)))
                    }
                    None => return Err(invalid("missing conversion")),
                }

                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Field {
                    field,
                    width,
                    left_align,
                });
            }
            _ => return Err(invalid("'%' must start a placeholder or be doubled")),
        }
    }

    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}
