//! Text conversion of runtime values: `str()`, `repr()` and format specs

use super::types::{IterState, Val, MAX_SEQUENCE_LEN};

/// `str(value)`
pub fn to_str(value: &Val) -> String {
    match value {
        Val::Str(s) => s.clone(),
        Val::Exception(exc) => exc.text(),
        other => repr(other),
    }
}

/// `repr(value)`
pub fn repr(value: &Val) -> String {
    match value {
        Val::None => "None".to_string(),
        Val::Bool(true) => "True".to_string(),
        Val::Bool(false) => "False".to_string(),
        Val::Int(n) => n.to_string(),
        Val::Float(f) => float_repr(*f),
        Val::Str(s) => quote(s),
        Val::List(items) => format!("[{}]", joined(items)),
        Val::Tuple(items) if items.len() == 1 => format!("({},)", repr(&items[0])),
        Val::Tuple(items) => format!("({})", joined(items)),
        Val::Dict(items) => {
            let body: Vec<String> = items
                .iter()
                .map(|(k, v)| format!("{}: {}", repr(k), repr(v)))
                .collect();
            format!("{{{}}}", body.join(", "))
        }
        Val::Range(r) if r.step == 1 => format!("range({}, {})", r.start, r.stop),
        Val::Range(r) => format!("range({}, {}, {})", r.start, r.stop, r.step),
        Val::Iter(state) => match state.as_ref() {
            IterState::Seq { .. } => "<iterator object>".to_string(),
            IterState::Range { .. } => "<range_iterator object>".to_string(),
        },
        Val::Function(f) => format!("<function {}>", f.name),
        Val::Builtin(name) => format!("<built-in {}>", name),
        Val::Exception(exc) => {
            format!("{}({})", exc.kind, joined(&exc.args))
        }
        Val::Generator(g) if g.is_async() => format!("<async_generator object {}>", g.name()),
        Val::Generator(g) => format!("<generator object {}>", g.name()),
        Val::Termination(payload) => format!("Termination({})", repr(payload)),
    }
}

fn joined(items: &[Val]) -> String {
    items.iter().map(repr).collect::<Vec<_>>().join(", ")
}

fn quote(s: &str) -> String {
    let delimiter = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(delimiter);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == delimiter => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 || c as u32 == 0x7f => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push(delimiter);
    out
}

/// Shortest round-trip text, switching to exponent form where the host does
pub fn float_repr(f: f64) -> String {
    if f.is_nan() {
        return "nan".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let magnitude = f.abs();
    if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        return exponent_form(&format!("{:e}", f));
    }
    let text = format!("{}", f);
    if text.contains('.') {
        text
    } else {
        format!("{}.0", text)
    }
}

/// `1e16` -> `1e+16`, `1e-5` -> `1e-05`
fn exponent_form(text: &str) -> String {
    match text.split_once('e') {
        Some((mantissa, exp)) => {
            let (sign, digits) = match exp.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exp),
            };
            format!("{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => text.to_string(),
    }
}

/* ===================== Format Specs ===================== */

#[derive(Debug, Default)]
struct Spec {
    fill: Option<char>,
    align: Option<char>,
    sign: Option<char>,
    zero: bool,
    width: usize,
    grouping: bool,
    precision: Option<usize>,
    kind: Option<char>,
}

/// A width or precision; anything past the size cap is refused before padding
fn parse_count(digits: &[char]) -> Result<usize, String> {
    let too_many = || "Too many decimal digits in format string".to_string();
    let count: usize = digits.iter().collect::<String>().parse().map_err(|_| too_many())?;
    if count > MAX_SEQUENCE_LEN {
        return Err(too_many());
    }
    Ok(count)
}

fn parse_spec(spec: &str) -> Result<Spec, String> {
    let chars: Vec<char> = spec.chars().collect();
    let mut parsed = Spec::default();
    let mut i = 0;

    let is_align = |c: char| matches!(c, '<' | '>' | '^' | '=');
    if chars.len() >= 2 && is_align(chars[1]) {
        parsed.fill = Some(chars[0]);
        parsed.align = Some(chars[1]);
        i = 2;
    } else if chars.first().map_or(false, |&c| is_align(c)) {
        parsed.align = Some(chars[0]);
        i = 1;
    }
    if let Some(&c) = chars.get(i) {
        if matches!(c, '+' | '-' | ' ') {
            parsed.sign = Some(c);
            i += 1;
        }
    }
    if chars.get(i) == Some(&'0') {
        parsed.zero = true;
        i += 1;
    }
    let start = i;
    while chars.get(i).map_or(false, char::is_ascii_digit) {
        i += 1;
    }
    if i > start {
        parsed.width = parse_count(&chars[start..i])?;
    }
    if chars.get(i) == Some(&',') {
        parsed.grouping = true;
        i += 1;
    }
    if chars.get(i) == Some(&'.') {
        i += 1;
        let start = i;
        while chars.get(i).map_or(false, char::is_ascii_digit) {
            i += 1;
        }
        if i == start {
            return Err("Format specifier missing precision".to_string());
        }
        parsed.precision = Some(parse_count(&chars[start..i])?);
    }
    if let Some(&c) = chars.get(i) {
        parsed.kind = Some(c);
        i += 1;
    }
    if i != chars.len() {
        return Err(format!("Invalid format specifier '{}'", spec));
    }
    Ok(parsed)
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// `format(value, spec)`; the error is a `ValueError` message
pub fn format_value(value: &Val, spec: &str) -> Result<String, String> {
    if spec.is_empty() {
        return Ok(to_str(value));
    }
    let spec = parse_spec(spec)?;

    let number = match value {
        Val::Int(n) => Some(*n as f64),
        Val::Bool(b) => Some(*b as i64 as f64),
        Val::Float(f) => Some(*f),
        _ => None,
    };

    let (negative, body) = match (spec.kind, value, number) {
        (Some('d'), Val::Int(n), _) | (None, Val::Int(n), _) => {
            let digits = n.unsigned_abs().to_string();
            let digits = if spec.grouping { group_thousands(&digits) } else { digits };
            (*n < 0, digits)
        }
        (Some('x'), Val::Int(n), _) => (*n < 0, format!("{:x}", n.unsigned_abs())),
        (Some('X'), Val::Int(n), _) => (*n < 0, format!("{:X}", n.unsigned_abs())),
        (Some('o'), Val::Int(n), _) => (*n < 0, format!("{:o}", n.unsigned_abs())),
        (Some('b'), Val::Int(n), _) => (*n < 0, format!("{:b}", n.unsigned_abs())),
        (Some('f') | Some('F'), _, Some(f)) => {
            let text = format!("{:.*}", spec.precision.unwrap_or(6), f.abs());
            let text = if spec.grouping {
                match text.split_once('.') {
                    Some((int, frac)) => format!("{}.{}", group_thousands(int), frac),
                    None => group_thousands(&text),
                }
            } else {
                text
            };
            (f.is_sign_negative() && f != 0.0, text)
        }
        (Some('e') | Some('E'), _, Some(f)) => {
            let text = exponent_form(&format!("{:.*e}", spec.precision.unwrap_or(6), f.abs()));
            let text = if spec.kind == Some('E') { text.to_uppercase() } else { text };
            (f < 0.0, text)
        }
        (Some('%'), _, Some(f)) => (f < 0.0, format!("{:.*}%", spec.precision.unwrap_or(6), f.abs() * 100.0)),
        (Some('g') | None, _, Some(f)) => match spec.precision {
            Some(p) => (f < 0.0, format!("{}", round_significant(f.abs(), p.max(1)))),
            None => (f < 0.0, float_repr(f.abs())),
        },
        (Some('s') | None, Val::Str(s), _) => {
            let text = match spec.precision {
                Some(p) => s.chars().take(p).collect(),
                None => s.clone(),
            };
            (false, text)
        }
        (None, other, _) => (false, to_str(other)),
        (Some(kind), other, _) => {
            return Err(format!(
                "Unknown format code '{}' for object of type '{}'",
                kind,
                other.type_name()
            ))
        }
    };

    let sign = match (negative, spec.sign) {
        (true, _) => "-",
        (false, Some('+')) => "+",
        (false, Some(' ')) => " ",
        _ => "",
    };

    let numeric = number.is_some();
    let align = spec
        .align
        .unwrap_or(if spec.zero && numeric { '=' } else if numeric { '>' } else { '<' });
    let fill = spec.fill.unwrap_or(if spec.zero && spec.align.is_none() { '0' } else { ' ' });
    let len = sign.chars().count() + body.chars().count();
    let pad = spec.width.saturating_sub(len);
    let padding = |n: usize| fill.to_string().repeat(n);

    Ok(match align {
        '<' => format!("{}{}{}", sign, body, padding(pad)),
        '^' => format!("{}{}{}{}", padding(pad / 2), sign, body, padding(pad - pad / 2)),
        '=' => format!("{}{}{}", sign, padding(pad), body),
        _ => format!("{}{}{}", padding(pad), sign, body),
    })
}

fn round_significant(f: f64, digits: usize) -> f64 {
    if f == 0.0 {
        return 0.0;
    }
    let magnitude = f.log10().floor() as i32;
    let factor = 10f64.powi(digits as i32 - 1 - magnitude);
    (f * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_repr_matches_host() {
        assert_eq!(float_repr(1.0), "1.0");
        assert_eq!(float_repr(0.1), "0.1");
        assert_eq!(float_repr(-2.5), "-2.5");
        assert_eq!(float_repr(1e16), "1e+16");
        assert_eq!(float_repr(1e-5), "1e-05");
    }

    #[test]
    fn test_repr_of_containers() {
        let value = Val::List(vec![Val::Int(1), Val::str("a'b"), Val::Tuple(vec![Val::None])]);
        assert_eq!(repr(&value), "[1, \"a'b\", (None,)]");
        assert_eq!(to_str(&Val::str("plain")), "plain");
    }

    #[test]
    fn test_format_specs() {
        assert_eq!(format_value(&Val::Float(3.14159), ".2f").unwrap(), "3.14");
        assert_eq!(format_value(&Val::Int(42), ">5").unwrap(), "   42");
        assert_eq!(format_value(&Val::Int(42), "05d").unwrap(), "00042");
        assert_eq!(format_value(&Val::Int(1234567), ",").unwrap(), "1,234,567");
        assert_eq!(format_value(&Val::str("ab"), "*^6").unwrap(), "**ab**");
        assert_eq!(format_value(&Val::Int(255), "x").unwrap(), "ff");
        assert!(format_value(&Val::str("x"), "d").is_err());
    }

    #[test]
    fn test_huge_width_is_refused_before_padding() {
        let err = format_value(&Val::Int(3), ">99999999999").unwrap_err();
        assert_eq!(err, "Too many decimal digits in format string");
        assert!(format_value(&Val::Float(1.5), ".99999999999999999999f").is_err());
        assert_eq!(format_value(&Val::Float(1.5), ".").unwrap_err(), "Format specifier missing precision");
    }
}
