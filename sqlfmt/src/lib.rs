//! `printf`-style placeholder substitution for SQL text.
//!
//! A placeholder has the shape
//! `%[<index>][<flags>][<width>][.<precision>][<modifier>]<type>`:
//!
//! - `[<index>]` selects the (zero-based) argument and moves the argument
//!   cursor there; otherwise arguments are consumed in order.
//! - flags: `-` (left-align), `+` (force sign), `0` (zero-pad), ` ` (space
//!   before positive numbers), `#` (`0x`/`0X`/`0` prefixes).
//! - modifiers: `l`, `L` and `h` are accepted and ignored; `?` lets integer
//!   conversions accept any integer argument.
//! - types: `b`, `c`, `d`, `i`, `u`, `o`, `x`, `X`, `f`, `e`, `E`, `s`, `z`.
//!
//! `%%` is a literal percent sign. Formatting never fails: a missing
//! argument, an argument of the wrong kind, a malformed placeholder or a
//! width or precision above [`MAX_WIDTH`] renders as [`ERRFMT`].

use std::{iter::Peekable, str::Chars};

use tracing::trace;

mod arg;
pub use arg::*;

/// Rendered in place of a placeholder that can't be formatted.
pub const ERRFMT: &str = "[ERRFMT]";

/// Largest accepted width or precision. Wider placeholders render
/// [`ERRFMT`].
pub const MAX_WIDTH: usize = 1024;

/// Formats `template`, substituting its placeholders with `args`.
pub fn format(template: &str, args: &[Arg]) -> String {
    let mut out = String::with_capacity(template.len());
    format_into(&mut out, template, args);
    out
}

/// Same as [`format`], but appending to `out`.
pub fn format_into(out: &mut String, template: &str, args: &[Arg]) {
    let mut chars = template.chars().peekable();
    let mut cursor = 0;

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        if chars.next_if_eq(&'%').is_some() {
            out.push('%');
            continue;
        }
        if chars.peek().is_none() {
            out.push('%');
            break;
        }

        let Some(spec) = Spec::parse(&mut chars, &mut cursor) else {
            out.push_str(ERRFMT);
            break;
        };
        match args.get(cursor).and_then(|arg| spec.render(arg)) {
            Some(rendered) => out.push_str(&rendered),
            None => {
                trace!(cursor, conv = %spec.conv, "unformattable placeholder");
                out.push_str(ERRFMT);
            }
        }
        cursor += 1;
    }
}

#[derive(Default)]
struct Flags {
    left: bool,
    plus: bool,
    zero: bool,
    space: bool,
    alt: bool,
}

/// A parsed placeholder.
struct Spec {
    flags: Flags,
    width: usize,
    precision: Option<usize>,
    any_int: bool,
    conv: char,
}

impl Spec {
    /// Parses a placeholder following the `%`. Returns `None` if the template
    /// ends before the conversion type.
    fn parse(chars: &mut Peekable<Chars<'_>>, cursor: &mut usize) -> Option<Spec> {
        if chars.next_if_eq(&'[').is_some() {
            let index = read_number(chars);
            chars.next_if_eq(&']')?;
            *cursor = index;
        }

        let mut flags = Flags::default();
        while let Some(flag) = chars.next_if(|&c| matches!(c, '-' | '+' | '0' | ' ' | '#')) {
            match flag {
                '-' => flags.left = true,
                '+' => flags.plus = true,
                '0' => flags.zero = true,
                ' ' => flags.space = true,
                _ => flags.alt = true,
            }
        }

        let width = read_number(chars);
        let precision = chars
            .next_if_eq(&'.')
            .map(|_| read_number(chars));

        let mut any_int = false;
        while let Some(modifier) = chars.next_if(|&c| matches!(c, 'l' | 'L' | 'h' | '?')) {
            any_int |= modifier == '?';
        }

        let conv = chars.next()?;
        Some(Spec {
            flags,
            width,
            precision,
            any_int,
            conv,
        })
    }

    /// Renders `arg`, or returns `None` if it doesn't fit the conversion.
    fn render(&self, arg: &Arg) -> Option<String> {
        if self.width > MAX_WIDTH || self.precision.is_some_and(|p| p > MAX_WIDTH) {
            return None;
        }
        let (sign, prefix, body) = match (self.conv, arg) {
            ('b', Arg::Bool(b)) => ("", "", b.to_string()),
            ('c', Arg::Char(c)) => ("", "", c.to_string()),
            ('s', Arg::Str(s)) => ("", "", s.clone()),
            ('d' | 'i', _) => {
                let value = self.signed(arg)?;
                (self.sign(value < 0), "", value.unsigned_abs().to_string())
            }
            ('u' | 'z', _) => ("", "", self.unsigned(arg)?.to_string()),
            ('o', _) => {
                let value = self.unsigned(arg)?;
                let prefix = if self.flags.alt && value != 0 { "0" } else { "" };
                ("", prefix, format!("{value:o}"))
            }
            ('x', _) => {
                let value = self.unsigned(arg)?;
                ("", if self.flags.alt { "0x" } else { "" }, format!("{value:x}"))
            }
            ('X', _) => {
                let value = self.unsigned(arg)?;
                ("", if self.flags.alt { "0X" } else { "" }, format!("{value:X}"))
            }
            ('f', Arg::Float(v)) => {
                let precision = self.precision.unwrap_or(6);
                (self.sign(v.is_sign_negative()), "", format!("{:.*}", precision, v.abs()))
            }
            ('e' | 'E', Arg::Float(v)) => {
                let precision = self.precision.unwrap_or(6);
                let body = exponent(v.abs(), precision, self.conv == 'E');
                (self.sign(v.is_sign_negative()), "", body)
            }
            _ => return None,
        };

        let numeric = !matches!(self.conv, 'b' | 'c' | 's');
        let len = sign.len() + prefix.len() + body.chars().count();
        let fill = self.width.saturating_sub(len);

        let mut out = String::new();
        if self.flags.left {
            out.push_str(sign);
            out.push_str(prefix);
            out.push_str(&body);
            out.extend(std::iter::repeat(' ').take(fill));
        } else if self.flags.zero && numeric {
            out.push_str(sign);
            out.push_str(prefix);
            out.extend(std::iter::repeat('0').take(fill));
            out.push_str(&body);
        } else {
            out.extend(std::iter::repeat(' ').take(fill));
            out.push_str(sign);
            out.push_str(prefix);
            out.push_str(&body);
        }
        Some(out)
    }

    fn sign(&self, negative: bool) -> &'static str {
        if negative {
            "-"
        } else if self.flags.plus {
            "+"
        } else if self.flags.space {
            " "
        } else {
            ""
        }
    }

    fn signed(&self, arg: &Arg) -> Option<i64> {
        match arg {
            Arg::Int(v) => Some(*v),
            Arg::UInt(v) if self.any_int => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    fn unsigned(&self, arg: &Arg) -> Option<u64> {
        match arg {
            Arg::UInt(v) => Some(*v),
            Arg::Int(v) if self.any_int => u64::try_from(*v).ok(),
            _ => None,
        }
    }
}

/// Reads a (possibly empty, thus zero) decimal number.
fn read_number(chars: &mut Peekable<Chars<'_>>) -> usize {
    let mut n: usize = 0;
    while let Some(digit) = chars.next_if(char::is_ascii_digit) {
        let digit = digit.to_digit(10).unwrap_or(0) as usize;
        n = n.saturating_mul(10).saturating_add(digit);
    }
    n
}

/// Formats `v` as `d.ddde±xx`, with at least two exponent digits.
fn exponent(v: f64, precision: usize, upper: bool) -> String {
    let formatted = format!("{:.*e}", precision, v);
    let Some((mantissa, exp)) = formatted.split_once('e') else {
        // NaN and infinity have no exponent.
        return formatted;
    };
    let exp: i32 = exp.parse().unwrap_or(0);
    let sign = if exp < 0 { '-' } else { '+' };
    let e = if upper { 'E' } else { 'e' };
    format!("{mantissa}{e}{sign}{:02}", exp.unsigned_abs())
}
