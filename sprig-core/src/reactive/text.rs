//! Text Conversion
//!
//! Conversions between values and their textual form, and the signals that
//! apply them: [`as_text`] for display, [`as_duplex_text`] for text fields
//! bound to typed values, and [`printf`] for formatted output.
//!
//! # Parsing
//!
//! Parsing failures are validation errors with messages suitable for
//! showing to the person who typed the text:
//!
//! - "This input expects an integer."
//! - "This input expects a number."
//! - "This integer is outside the supported range."
//!
//! Surrounding whitespace is ignored.

use std::cell::RefCell;
use std::num::IntErrorKind;
use std::rc::Rc;

use crate::error::{Error, Result, ValidationError};
use crate::flow::Context;
use crate::id::{make_id, ByRef, CapturedId, IdPair, SimpleId};

use super::apply::TextArgs;
use super::signal::{ReadSignal, Signal, WriteSignal};

pub const EXPECTS_INTEGER: &str = "This input expects an integer.";
pub const EXPECTS_NUMBER: &str = "This input expects a number.";
pub const INTEGER_OUT_OF_RANGE: &str = "This integer is outside the supported range.";

/// Values that have a textual form.
pub trait ToText {
    fn to_text(&self) -> String;

    /// The textual form with `precision` digits after the decimal point.
    /// Types without a fractional part ignore the precision.
    fn to_text_with_precision(&self, precision: usize) -> String {
        let _ = precision;
        self.to_text()
    }
}

/// Values that can be parsed from text.
pub trait FromText: Sized {
    fn from_text(text: &str) -> Result<Self>;
}

macro_rules! integer_text {
    ($($t:ty),*) => {
        $(
            impl ToText for $t {
                fn to_text(&self) -> String {
                    self.to_string()
                }
            }

            impl FromText for $t {
                fn from_text(text: &str) -> Result<Self> {
                    text.trim().parse::<$t>().map_err(|error| {
                        let message = match error.kind() {
                            IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => {
                                INTEGER_OUT_OF_RANGE
                            }
                            _ => EXPECTS_INTEGER,
                        };
                        ValidationError::new(message).into()
                    })
                }
            }
        )*
    };
}

macro_rules! float_text {
    ($($t:ty),*) => {
        $(
            impl ToText for $t {
                fn to_text(&self) -> String {
                    self.to_string()
                }

                fn to_text_with_precision(&self, precision: usize) -> String {
                    format!("{:.*}", precision, self)
                }
            }

            impl FromText for $t {
                fn from_text(text: &str) -> Result<Self> {
                    text.trim()
                        .parse::<$t>()
                        .map_err(|_| Error::validation(EXPECTS_NUMBER))
                }
            }
        )*
    };
}

integer_text!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);
float_text!(f32, f64);

impl ToText for String {
    fn to_text(&self) -> String {
        self.clone()
    }
}

impl FromText for String {
    fn from_text(text: &str) -> Result<Self> {
        Ok(text.to_owned())
    }
}

impl ToText for &str {
    fn to_text(&self) -> String {
        (*self).to_owned()
    }
}

impl ToText for bool {
    fn to_text(&self) -> String {
        self.to_string()
    }
}

impl FromText for bool {
    fn from_text(text: &str) -> Result<Self> {
        match text.trim() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(Error::validation("This input expects true or false.")),
        }
    }
}

// ----------------------------------------------------------------------------
// as_text
// ----------------------------------------------------------------------------

/// A read-only text signal.
#[derive(Debug, Clone)]
pub struct TextSignal {
    text: Option<String>,
}

impl Signal for TextSignal {
    type Value = String;
}

impl ReadSignal for TextSignal {
    type Id<'a> = Option<ByRef<'a, String>> where Self: 'a;

    fn has_value(&self) -> bool {
        self.text.is_some()
    }

    fn value_id(&self) -> Self::Id<'_> {
        self.text.as_ref().map(ByRef)
    }

    fn with<R>(&self, f: impl FnOnce(&String) -> R) -> Result<R> {
        self.text.as_ref().map(f).ok_or(Error::NoValue)
    }
}

/// The textual form of `signal`'s value. The conversion is cached at the
/// call site and redone only when the value id changes.
pub fn as_text<S>(ctx: &Context<'_>, signal: &S) -> Result<TextSignal>
where
    S: ReadSignal,
    S::Value: ToText,
{
    let (data, _) = ctx.get_keyed_data::<String>();
    let mut data = data.borrow_mut();
    if !signal.has_value() {
        data.invalidate();
        return Ok(TextSignal { text: None });
    }
    data.refresh_key(&signal.value_id());
    if !data.is_valid() {
        data.set(signal.with(ToText::to_text)?);
    }
    Ok(TextSignal {
        text: data.get().cloned(),
    })
}

// ----------------------------------------------------------------------------
// as_duplex_text
// ----------------------------------------------------------------------------

#[derive(Default)]
struct DuplexTextData {
    input: CapturedId,
    text: Option<String>,
    version: u64,
}

/// A text view of a typed signal that parses what is written to it.
pub struct DuplexText<S> {
    inner: S,
    data: Rc<RefCell<DuplexTextData>>,
}

/// A text signal bound to `signal`.
///
/// Reads give the textual form of the value. Writes parse the text and
/// write the parsed value; on success the text becomes the canonical form
/// of the new value, on failure the validation error is returned and
/// nothing is written.
pub fn as_duplex_text<S>(ctx: &Context<'_>, signal: S) -> Result<DuplexText<S>>
where
    S: ReadSignal,
    S::Value: ToText,
{
    let (data, _) = ctx.get_cached_data::<RefCell<DuplexTextData>>();
    {
        let mut data = data.borrow_mut();
        if signal.has_value() {
            let id = signal.value_id();
            if !data.input.matches(&id) {
                data.input.capture(&id);
                data.text = Some(signal.with(ToText::to_text)?);
                data.version += 1;
            }
        } else if data.input.is_initialized() {
            data.input.clear();
            data.text = None;
            data.version += 1;
        }
    }
    Ok(DuplexText {
        inner: signal,
        data,
    })
}

impl<S: Signal> Signal for DuplexText<S> {
    type Value = String;
}

impl<S: Signal> ReadSignal for DuplexText<S> {
    type Id<'a> = SimpleId<u64> where Self: 'a;

    fn has_value(&self) -> bool {
        self.data.borrow().text.is_some()
    }

    fn value_id(&self) -> SimpleId<u64> {
        SimpleId(self.data.borrow().version)
    }

    fn with<R>(&self, f: impl FnOnce(&String) -> R) -> Result<R> {
        self.data.borrow().text.as_ref().map(f).ok_or(Error::NoValue)
    }
}

impl<S> WriteSignal for DuplexText<S>
where
    S: ReadSignal + WriteSignal,
    S::Value: FromText + ToText,
{
    fn ready_to_write(&self) -> bool {
        self.inner.ready_to_write()
    }

    fn write(&self, text: String) -> Result<()> {
        let value = S::Value::from_text(&text)?;
        let canonical = value.to_text();
        self.inner.write(value)?;

        let mut data = self.data.borrow_mut();
        data.text = Some(canonical);
        data.version += 1;
        if self.inner.has_value() {
            data.input.capture(&self.inner.value_id());
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// printf
// ----------------------------------------------------------------------------

/// The signal returned by [`printf`].
#[derive(Debug, Clone)]
pub struct FormattedText {
    output: Option<Result<String>>,
}

impl Signal for FormattedText {
    type Value = String;
}

impl ReadSignal for FormattedText {
    type Id<'a> = Option<ByRef<'a, String>> where Self: 'a;

    fn has_value(&self) -> bool {
        self.output.is_some()
    }

    fn value_id(&self) -> Self::Id<'_> {
        match &self.output {
            Some(Ok(text)) => Some(ByRef(text)),
            _ => None,
        }
    }

    fn with<R>(&self, f: impl FnOnce(&String) -> R) -> Result<R> {
        match &self.output {
            Some(Ok(text)) => Ok(f(text)),
            Some(Err(error)) => Err(error.clone()),
            None => Err(Error::NoValue),
        }
    }
}

fn format_error(message: impl Into<String>) -> Error {
    Error::PrintfFormat(message.into())
}

/// Substitute `args` into `format`.
///
/// Placeholders are `{}` (next argument), `{N}` (argument N) and either
/// with a precision, `{:.P}` / `{N:.P}`. `{{` and `}}` stand for literal
/// braces. Every argument must be used.
pub fn format_args_text<A: TextArgs>(format: &str, args: &A) -> Result<String> {
    let mut output = String::with_capacity(format.len());
    let mut used = vec![false; A::LEN];
    let mut next_index = 0;
    let mut chars = format.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                output.push('{');
            }
            '{' => {
                let mut spec = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(c) => spec.push(c),
                        None => return Err(format_error("unterminated placeholder")),
                    }
                }
                let (index_part, precision_part) = match spec.split_once(':') {
                    Some((index, precision)) => (index, Some(precision)),
                    None => (spec.as_str(), None),
                };
                let index = if index_part.is_empty() {
                    next_index += 1;
                    next_index - 1
                } else {
                    index_part
                        .trim()
                        .parse::<usize>()
                        .map_err(|_| format_error(format!("bad placeholder {{{spec}}}")))?
                };
                let precision = match precision_part {
                    None => None,
                    Some(precision) => Some(
                        precision
                            .strip_prefix('.')
                            .and_then(|digits| digits.parse::<usize>().ok())
                            .ok_or_else(|| format_error(format!("bad precision in {{{spec}}}")))?,
                    ),
                };
                let slot = used.get_mut(index).ok_or_else(|| {
                    format_error(format!(
                        "placeholder refers to argument {index} but only {} given",
                        A::LEN
                    ))
                })?;
                *slot = true;
                output.push_str(&args.render(index, precision)?);
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                output.push('}');
            }
            '}' => return Err(format_error("unmatched '}'")),
            c => output.push(c),
        }
    }

    if let Some(unused) = used.iter().position(|used| !used) {
        return Err(format_error(format!("argument {unused} is never used")));
    }
    Ok(output)
}

/// Format `args` according to `format`, caching the result at the call
/// site. Format errors are reported when the result is read.
///
/// ```rust,ignore
/// let label = printf(ctx, "{} of {}", (done, total))?;
/// ```
pub fn printf<A: TextArgs>(ctx: &Context<'_>, format: &str, args: A) -> FormattedText {
    let (data, _) = ctx.get_keyed_data::<Result<String>>();
    let mut data = data.borrow_mut();
    if !args.all_have_values() {
        data.invalidate();
        return FormattedText { output: None };
    }
    data.refresh_key(&IdPair(make_id(format.to_owned()), args.combined_id()));
    if !data.is_valid() {
        let output = format_args_text(format, &args);
        if let Err(error) = &output {
            tracing::debug!(%error, format, "printf failed");
        }
        data.set(output);
    }
    FormattedText {
        output: data.get().cloned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{direct, empty, value};
    use crate::system::System;

    #[test]
    fn integers_parse_with_helpful_errors() {
        assert_eq!(i32::from_text(" 17 ").unwrap(), 17);
        let message = |text: &str| match u8::from_text(text) {
            Err(Error::Validation(error)) => error.message().to_owned(),
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(message("a17"), EXPECTS_INTEGER);
        assert_eq!(message("300"), INTEGER_OUT_OF_RANGE);
        assert_eq!(message("-1"), EXPECTS_INTEGER);
    }

    #[test]
    fn floats_parse_and_print() {
        assert_eq!(f64::from_text("2.5").unwrap(), 2.5);
        assert!(matches!(f64::from_text("two"), Err(Error::Validation(_))));
        assert_eq!(1.23456f64.to_text_with_precision(2), "1.23");
        assert_eq!(7i32.to_text_with_precision(2), "7");
    }

    #[test]
    fn formats_are_substituted() {
        let args = (value(3), value(4.5), value("x"));
        assert_eq!(format_args_text("{} {:.2} {}", &args).unwrap(), "3 4.50 x");
        assert_eq!(format_args_text("{2}{1}{0}", &args).unwrap(), "x4.53");
        assert_eq!(
            format_args_text("{{{0}}} {1} {2}", &args).unwrap(),
            "{3} 4.5 x"
        );
    }

    #[test]
    fn bad_formats_are_errors() {
        let args = (value(1),);
        for format in ["{", "}", "{} {}", "{x}", "{:2}", "none"] {
            assert!(
                matches!(format_args_text(format, &args), Err(Error::PrintfFormat(_))),
                "{format} should fail"
            );
        }
    }

    #[test]
    fn duplex_text_validates_writes() {
        let x = Rc::new(RefCell::new(1));
        let outcome = Rc::new(RefCell::new(Vec::new()));
        let (cell, log) = (x.clone(), outcome.clone());
        let mut system = System::new(move |ctx| {
            let text = as_duplex_text(ctx, direct(&*cell))?;
            if text.read()? == "1" {
                log.borrow_mut().push(text.write("17".into()).is_ok());
                log.borrow_mut().push(text.read()? == "17");
                let rejected = text.write("a17".into());
                log.borrow_mut().push(matches!(rejected, Err(Error::Validation(_))));
            }
            Ok(())
        });
        system.refresh().unwrap();
        assert_eq!(*outcome.borrow(), vec![true, true, true]);
        assert_eq!(*x.borrow(), 17);
    }

    #[test]
    fn printf_reports_errors_on_read() {
        let mut system = System::new(|ctx| {
            let ok = printf(ctx, "{} apples", (value(3),));
            assert_eq!(ok.read()?, "3 apples");
            let broken = printf(ctx, "{} {}", (value(3),));
            assert!(broken.has_value());
            assert!(matches!(broken.read(), Err(Error::PrintfFormat(_))));
            let waiting = printf(ctx, "{}", (empty::<i32>(),));
            assert!(!waiting.has_value());
            let shown = as_text(ctx, &value(2.5))?;
            assert_eq!(shown.read()?, "2.5");
            Ok(())
        });
        system.refresh().unwrap();
    }
}
