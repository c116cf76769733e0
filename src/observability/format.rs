//! Percent-style record templates.
//!
//! A template such as `%(asctime)s - %(levelname)-8s - %(message)s` is
//! compiled once into a list of segments and rendered per record.
//!
//! # Syntax
//! ```text
//! %(field)[flags][width][.precision]type
//!   flags      '-' left align, '0' zero pad
//!   type       s | r | d | i | f
//! %%           literal percent sign
//! ```

use chrono::format::{Item, StrftimeItems};
use thiserror::Error;

use crate::observability::record::LogRecord;

/// Default `asctime` layout when a formatter has no `datefmt`.
const DEFAULT_DATEFMT: &str = "%Y-%m-%d %H:%M:%S";

/// Errors raised while compiling a template.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unterminated field name at offset {0}")]
    Unterminated(usize),

    #[error("unknown field '{0}'")]
    UnknownField(String),

    #[error("missing conversion type after field '{0}'")]
    MissingConversion(String),

    #[error("unsupported conversion '{conversion}' for field '{field}'")]
    BadConversion { field: String, conversion: char },

    #[error("stray '%' at offset {0}")]
    StrayPercent(usize),

    #[error("invalid date format '{0}'")]
    InvalidDateFormat(String),
}

/// Record attributes a template may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    LevelNo,
    LevelName,
    PathName,
    FileName,
    Module,
    LineNo,
    FuncName,
    Created,
    Msecs,
    AscTime,
    Message,
    Process,
    Thread,
    ThreadName,
}

impl Field {
    fn parse(name: &str) -> Option<Field> {
        let field = match name {
            "name" => Field::Name,
            "levelno" => Field::LevelNo,
            "levelname" => Field::LevelName,
            "pathname" => Field::PathName,
            "filename" => Field::FileName,
            "module" => Field::Module,
            "lineno" => Field::LineNo,
            "funcName" => Field::FuncName,
            "created" => Field::Created,
            "msecs" => Field::Msecs,
            "asctime" => Field::AscTime,
            "message" => Field::Message,
            "process" => Field::Process,
            "thread" => Field::Thread,
            "threadName" => Field::ThreadName,
            _ => return None,
        };
        Some(field)
    }

    fn is_numeric(&self) -> bool {
        matches!(
            self,
            Field::LevelNo
                | Field::LineNo
                | Field::Created
                | Field::Msecs
                | Field::Process
                | Field::Thread
        )
    }
}

/// Conversion type of a placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conversion {
    Str,
    Repr,
    Int,
    Float,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Placeholder {
    field: Field,
    left_align: bool,
    zero_pad: bool,
    width: Option<usize>,
    precision: Option<usize>,
    conversion: Conversion,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(Placeholder),
}

enum Value {
    Text(String),
    Int(i64),
    Float(f64),
}

/// A compiled template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    /// Compile `source`.
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let chars: Vec<char> = source.chars().collect();
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut i = 0;

        while i < chars.len() {
            if chars[i] != '%' {
                literal.push(chars[i]);
                i += 1;
                continue;
            }
            match chars.get(i + 1) {
                Some('%') => {
                    literal.push('%');
                    i += 2;
                }
                Some('(') => {
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    let (placeholder, next) = parse_placeholder(&chars, i)?;
                    segments.push(Segment::Field(placeholder));
                    i = next;
                }
                _ => return Err(TemplateError::StrayPercent(i)),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self { segments })
    }

    /// True if the template references `%(asctime)s`.
    pub fn uses_time(&self) -> bool {
        self.segments
            .iter()
            .any(|s| matches!(s, Segment::Field(p) if p.field == Field::AscTime))
    }

    /// Render `record`, formatting `asctime` with `datefmt` when given.
    pub fn render(&self, record: &LogRecord, datefmt: Option<&str>) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field(p) => {
                    let value = field_value(p.field, record, datefmt);
                    out.push_str(&apply(p, value));
                }
            }
        }
        out
    }
}

fn parse_placeholder(chars: &[char], start: usize) -> Result<(Placeholder, usize), TemplateError> {
    let name_start = start + 2;
    let close = chars[name_start..]
        .iter()
        .position(|c| *c == ')')
        .map(|p| p + name_start)
        .ok_or(TemplateError::Unterminated(start))?;
    let name: String = chars[name_start..close].iter().collect();
    let field = Field::parse(&name).ok_or_else(|| TemplateError::UnknownField(name.clone()))?;

    let mut i = close + 1;
    let mut left_align = false;
    let mut zero_pad = false;
    while let Some(c) = chars.get(i) {
        match c {
            '-' => left_align = true,
            '0' => zero_pad = true,
            _ => break,
        }
        i += 1;
    }

    let width = read_number(chars, &mut i);
    let precision = if chars.get(i) == Some(&'.') {
        i += 1;
        Some(read_number(chars, &mut i).unwrap_or(0))
    } else {
        None
    };

    let conversion = match chars.get(i) {
        Some('s') => Conversion::Str,
        Some('r') => Conversion::Repr,
        Some('d') | Some('i') => Conversion::Int,
        Some('f') => Conversion::Float,
        Some(other) => {
            return Err(TemplateError::BadConversion { field: name, conversion: *other });
        }
        None => return Err(TemplateError::MissingConversion(name)),
    };
    if matches!(conversion, Conversion::Int | Conversion::Float) && !field.is_numeric() {
        return Err(TemplateError::BadConversion { field: name, conversion: chars[i] });
    }

    Ok((
        Placeholder { field, left_align, zero_pad, width, precision, conversion },
        i + 1,
    ))
}

fn read_number(chars: &[char], i: &mut usize) -> Option<usize> {
    let start = *i;
    while chars.get(*i).is_some_and(|c| c.is_ascii_digit()) {
        *i += 1;
    }
    if *i == start {
        return None;
    }
    chars[start..*i].iter().collect::<String>().parse().ok()
}

fn field_value(field: Field, record: &LogRecord, datefmt: Option<&str>) -> Value {
    match field {
        Field::Name => Value::Text(record.logger.clone()),
        Field::LevelNo => Value::Int(record.level.0 as i64),
        Field::LevelName => Value::Text(record.level.name()),
        Field::PathName => Value::Text(record.pathname.clone()),
        Field::FileName => Value::Text(record.filename().to_string()),
        Field::Module => Value::Text(record.module().to_string()),
        Field::LineNo => Value::Int(record.lineno as i64),
        Field::FuncName => Value::Text(record.func_name.clone()),
        Field::Created => Value::Float(record.created.timestamp_millis() as f64 / 1000.0),
        Field::Msecs => Value::Int(record.created.timestamp_subsec_millis() as i64),
        Field::AscTime => Value::Text(format_time(record, datefmt)),
        Field::Message => Value::Text(record.message.clone()),
        Field::Process => Value::Int(record.process as i64),
        Field::Thread => Value::Int(record.thread_id as i64),
        Field::ThreadName => Value::Text(record.thread_name.clone()),
    }
}

fn format_time(record: &LogRecord, datefmt: Option<&str>) -> String {
    match datefmt {
        Some(fmt) => record.created.format(fmt).to_string(),
        None => format!(
            "{},{:03}",
            record.created.format(DEFAULT_DATEFMT),
            record.created.timestamp_subsec_millis()
        ),
    }
}

fn apply(p: &Placeholder, value: Value) -> String {
    let text = match (p.conversion, value) {
        (Conversion::Int, Value::Int(n)) => min_digits(n, p.precision),
        (Conversion::Int, Value::Float(f)) => min_digits(f.trunc() as i64, p.precision),
        (Conversion::Float, Value::Int(n)) => format!("{:.*}", p.precision.unwrap_or(6), n as f64),
        (Conversion::Float, Value::Float(f)) => format!("{:.*}", p.precision.unwrap_or(6), f),
        (Conversion::Repr, Value::Text(s)) => truncate(format!("'{}'", s), p.precision),
        (_, Value::Text(s)) => truncate(s, p.precision),
        (_, Value::Int(n)) => n.to_string(),
        (_, Value::Float(f)) => f.to_string(),
    };
    pad(text, p)
}

/// `n` with at least `precision` digits, sign excluded.
fn min_digits(n: i64, precision: Option<usize>) -> String {
    let digits = n.unsigned_abs().to_string();
    let digits = match precision {
        Some(p) if digits.len() < p => format!("{}{}", "0".repeat(p - digits.len()), digits),
        _ => digits,
    };
    if n < 0 {
        format!("-{}", digits)
    } else {
        digits
    }
}

fn truncate(text: String, precision: Option<usize>) -> String {
    match precision {
        Some(n) if text.chars().count() > n => text.chars().take(n).collect(),
        _ => text,
    }
}

fn pad(text: String, p: &Placeholder) -> String {
    let width = match p.width {
        Some(w) => w,
        None => return text,
    };
    let len = text.chars().count();
    if len >= width {
        return text;
    }
    let fill = width - len;
    if p.left_align {
        format!("{}{}", text, " ".repeat(fill))
    } else if p.zero_pad && p.conversion != Conversion::Str && p.conversion != Conversion::Repr {
        match text.strip_prefix('-') {
            Some(digits) => format!("-{}{}", "0".repeat(fill), digits),
            None => format!("{}{}", "0".repeat(fill), text),
        }
    } else {
        format!("{}{}", " ".repeat(fill), text)
    }
}

/// Check a strftime-style `datefmt` for directives chrono cannot render.
pub fn check_datefmt(datefmt: &str) -> Result<(), String> {
    match StrftimeItems::new(datefmt).position(|item| matches!(item, Item::Error)) {
        Some(_) => Err(format!("invalid date format '{}'", datefmt)),
        None => Ok(()),
    }
}

/// A named formatter ready for use by handlers.
#[derive(Debug, Clone)]
pub struct Formatter {
    pub name: String,
    template: Template,
    datefmt: Option<String>,
}

impl Formatter {
    pub fn new(name: &str, format: &str, datefmt: Option<&str>) -> Result<Self, TemplateError> {
        if let Some(fmt) = datefmt {
            check_datefmt(fmt).map_err(|_| TemplateError::InvalidDateFormat(fmt.to_string()))?;
        }
        Ok(Self {
            name: name.to_string(),
            template: Template::parse(format)?,
            datefmt: datefmt.map(str::to_string),
        })
    }

    pub fn format(&self, record: &LogRecord) -> String {
        self.template.render(record, self.datefmt.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Level;
    use chrono::TimeZone;

    fn record() -> LogRecord {
        let mut record = LogRecord::new("master", Level::WARNING, "disk almost full")
            .with_location("src/engine/controller.rs", 88)
            .with_func_name("prune");
        record.created = chrono::Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        record
    }

    #[test]
    fn test_render_basic_fields() {
        let t = Template::parse("%(levelname)s: %(message)s").unwrap();
        assert_eq!(t.render(&record(), None), "WARNING: disk almost full");

        let t = Template::parse("%(module)s.%(funcName)s:%(lineno)d [%(name)s]").unwrap();
        assert_eq!(t.render(&record(), None), "controller.prune:88 [master]");
    }

    #[test]
    fn test_render_time() {
        let t = Template::parse("%(asctime)s").unwrap();
        assert!(t.uses_time());
        assert_eq!(t.render(&record(), Some("%d-%b-%Y")), "09-Mar-2024");
        assert_eq!(t.render(&record(), None), "2024-03-09 14:05:07,000");
    }

    #[test]
    fn test_width_and_flags() {
        let t = Template::parse("[%(levelname)-8s][%(levelno)5d][%(lineno)05d][%(name).3s]").unwrap();
        assert_eq!(t.render(&record(), None), "[WARNING ][   30][00088][mas]");
    }

    #[test]
    fn test_percent_escape() {
        let t = Template::parse("100%% %(message)r").unwrap();
        assert_eq!(t.render(&record(), None), "100% 'disk almost full'");
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            Template::parse("%(nope)s"),
            Err(TemplateError::UnknownField("nope".into()))
        );
        assert_eq!(Template::parse("%(message"), Err(TemplateError::Unterminated(0)));
        assert_eq!(
            Template::parse("%(message)"),
            Err(TemplateError::MissingConversion("message".into()))
        );
        assert!(matches!(
            Template::parse("%(message)d"),
            Err(TemplateError::BadConversion { .. })
        ));
        assert_eq!(Template::parse("50% off"), Err(TemplateError::StrayPercent(2)));
    }

    #[test]
    fn test_check_datefmt() {
        assert!(check_datefmt("%Y-%m-%d %H:%M:%S").is_ok());
        assert!(check_datefmt("%Q").is_err());
    }

    #[test]
    fn test_formatter_rejects_bad_datefmt() {
        assert_eq!(
            Formatter::new("stamped", "%(asctime)s %(message)s", Some("%Q")).unwrap_err(),
            TemplateError::InvalidDateFormat("%Q".into())
        );
        let formatter = Formatter::new("stamped", "%(asctime)s", Some("%d/%m/%Y")).unwrap();
        assert_eq!(formatter.format(&record()), "09/03/2024");
    }

    #[test]
    fn test_integer_precision_sets_minimum_digits() {
        let t = Template::parse("%(levelno).3d|%(lineno)6.4d|%(levelno)-5.3d|").unwrap();
        assert_eq!(t.render(&record(), None), "030|  0088|030  |");

        assert_eq!(min_digits(-7, Some(3)), "-007");
        assert_eq!(min_digits(12345, Some(3)), "12345");
        assert_eq!(min_digits(42, None), "42");
    }
}
