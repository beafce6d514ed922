//! Helper library available to section templates
//!
//! Argument order follows the pipeline convention: the value being transformed
//! comes last (`{{indent 4 Values.body}}`, `{{default "x" Values.name}}`).

use std::fmt::Write as _;

use handlebars::{
    handlebars_helper, Context, Handlebars, Helper, HelperResult, Output, RenderContext,
    RenderError, RenderErrorReason,
};
use serde_json::Value as JsonValue;

pub(super) fn register(handlebars: &mut Handlebars<'static>) {
    // strings
    handlebars.register_helper("upper", Box::new(upper_helper));
    handlebars.register_helper("lower", Box::new(lower_helper));
    handlebars.register_helper("title", Box::new(title_helper));
    handlebars.register_helper("trim", Box::new(trim_helper));
    handlebars.register_helper("trimPrefix", Box::new(trim_prefix_helper));
    handlebars.register_helper("trimSuffix", Box::new(trim_suffix_helper));
    handlebars.register_helper("quote", Box::new(quote_helper));
    handlebars.register_helper("squote", Box::new(squote_helper));
    handlebars.register_helper("replace", Box::new(replace_helper));
    handlebars.register_helper("repeat", Box::new(repeat_helper));
    handlebars.register_helper("indent", Box::new(indent_helper));
    handlebars.register_helper("nindent", Box::new(nindent_helper));
    handlebars.register_helper("join", Box::new(join_helper));
    handlebars.register_helper("contains", Box::new(contains_helper));
    handlebars.register_helper("default", Box::new(default_helper));

    // serialization
    handlebars.register_helper("toJson", Box::new(to_json_helper));
    handlebars.register_helper("toYaml", Box::new(to_yaml_helper));

    // math
    handlebars.register_helper("add", Box::new(add_helper));
    handlebars.register_helper("sub", Box::new(sub_helper));
    handlebars.register_helper("mul", Box::new(mul_helper));
    handlebars.register_helper("max", Box::new(max_helper));
    handlebars.register_helper("min", Box::new(min_helper));
    handlebars.register_helper("div", Box::new(div_helper));

    // date
    handlebars.register_helper("now", Box::new(now_helper));
}

/// Text form of a template value. Null (a missing value in lenient mode) is empty.
fn text(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => String::new(),
        JsonValue::String(s) => s.clone(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

fn is_empty(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => true,
        JsonValue::Bool(b) => !b,
        JsonValue::Number(n) => n.as_f64() == Some(0.0),
        JsonValue::String(s) => s.is_empty(),
        JsonValue::Array(items) => items.is_empty(),
        JsonValue::Object(map) => map.is_empty(),
    }
}

/// Upper bound on the text a single `repeat` or `indent` may produce.
const MAX_REPEAT_BYTES: usize = 1 << 20;

/// Repetition count of a template value. Missing, negative and non-numeric
/// values count as zero.
fn count(value: &JsonValue) -> usize {
    match Num::from_json(value) {
        Num::Int(i) => usize::try_from(i).unwrap_or(0),
        Num::Float(f) if f > 0.0 => f as usize,
        Num::Float(_) => 0,
    }
}

fn repeat(helper: &str, unit: &str, times: usize) -> Result<String, RenderError> {
    match unit.len().checked_mul(times) {
        Some(len) if len <= MAX_REPEAT_BYTES => Ok(unit.repeat(times)),
        _ => Err(RenderErrorReason::Other(format!(
            "{}: {} repetitions of {} bytes exceeds the {} byte limit",
            helper,
            times,
            unit.len(),
            MAX_REPEAT_BYTES
        ))
        .into()),
    }
}

fn indent(helper: &str, width: &JsonValue, value: &JsonValue) -> Result<String, RenderError> {
    let pad = repeat(helper, " ", count(width))?;
    Ok(format!("{}{}", pad, text(value).replace('\n', &format!("\n{}", pad))))
}

fn param<'a>(h: &'a Helper<'_>, index: usize) -> &'a JsonValue {
    h.param(index).map(|p| p.value()).unwrap_or(&JsonValue::Null)
}

fn title(value: &JsonValue) -> String {
    let mut out = String::new();
    let mut at_word_start = true;
    for ch in text(value).chars() {
        if at_word_start && ch.is_alphabetic() {
            out.extend(ch.to_uppercase());
        } else {
            out.push(ch);
        }
        at_word_start = ch.is_whitespace();
    }
    out
}

fn join(sep: &JsonValue, list: &JsonValue) -> String {
    match list {
        JsonValue::Array(items) => items.iter().map(text).collect::<Vec<_>>().join(&text(sep)),
        other => text(other),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn from_json(value: &JsonValue) -> Num {
        match value {
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Num::Int(i),
                None => Num::Float(n.as_f64().unwrap_or(0.0)),
            },
            JsonValue::String(s) => {
                let s = s.trim();
                if let Ok(i) = s.parse::<i64>() {
                    Num::Int(i)
                } else {
                    Num::Float(s.parse::<f64>().unwrap_or(0.0))
                }
            }
            JsonValue::Bool(b) => Num::Int(*b as i64),
            _ => Num::Int(0),
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Num::Int(i) => i as f64,
            Num::Float(f) => f,
        }
    }
}

/// Integer math when both operands are integers and the result fits, float
/// math otherwise.
fn arith(
    a: &JsonValue,
    b: &JsonValue,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> JsonValue {
    let (a, b) = (Num::from_json(a), Num::from_json(b));
    if let (Num::Int(x), Num::Int(y)) = (a, b) {
        if let Some(result) = int_op(x, y) {
            return JsonValue::from(result);
        }
    }
    JsonValue::from(float_op(a.as_f64(), b.as_f64()))
}

handlebars_helper!(upper_helper: |v: Json| text(v).to_uppercase());
handlebars_helper!(lower_helper: |v: Json| text(v).to_lowercase());
handlebars_helper!(title_helper: |v: Json| title(v));
handlebars_helper!(trim_helper: |v: Json| text(v).trim().to_string());
handlebars_helper!(trim_prefix_helper: |prefix: Json, v: Json| {
    let s = text(v);
    s.strip_prefix(text(prefix).as_str()).map(str::to_string).unwrap_or(s)
});
handlebars_helper!(trim_suffix_helper: |suffix: Json, v: Json| {
    let s = text(v);
    s.strip_suffix(text(suffix).as_str()).map(str::to_string).unwrap_or(s)
});
handlebars_helper!(quote_helper: |v: Json| JsonValue::String(text(v)).to_string());
handlebars_helper!(squote_helper: |v: Json| format!("'{}'", text(v)));
handlebars_helper!(replace_helper: |old: Json, new: Json, v: Json| text(v).replace(&text(old), &text(new)));
handlebars_helper!(join_helper: |sep: Json, list: Json| join(sep, list));
handlebars_helper!(contains_helper: |needle: Json, v: Json| text(v).contains(&text(needle)));
handlebars_helper!(default_helper: |fallback: Json, v: Json| {
    if is_empty(v) { fallback.clone() } else { v.clone() }
});

handlebars_helper!(to_json_helper: |v: Json| serde_json::to_string(v).unwrap_or_default());
handlebars_helper!(to_yaml_helper: |v: Json| {
    serde_yaml::to_string(v)
        .map(|s| s.trim_end_matches('\n').to_string())
        .unwrap_or_default()
});

handlebars_helper!(add_helper: |a: Json, b: Json| arith(a, b, i64::checked_add, |x, y| x + y));
handlebars_helper!(sub_helper: |a: Json, b: Json| arith(a, b, i64::checked_sub, |x, y| x - y));
handlebars_helper!(mul_helper: |a: Json, b: Json| arith(a, b, i64::checked_mul, |x, y| x * y));
handlebars_helper!(max_helper: |a: Json, b: Json| arith(a, b, |x, y| Some(x.max(y)), f64::max));
handlebars_helper!(min_helper: |a: Json, b: Json| arith(a, b, |x, y| Some(x.min(y)), f64::min));

fn repeat_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let rendered = repeat("repeat", &text(param(h, 1)), count(param(h, 0)))?;
    out.write(&rendered)?;
    Ok(())
}

fn indent_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    out.write(&indent("indent", param(h, 0), param(h, 1))?)?;
    Ok(())
}

fn nindent_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    out.write("\n")?;
    out.write(&indent("nindent", param(h, 0), param(h, 1))?)?;
    Ok(())
}

fn div_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let a = param(h, 0);
    let b = param(h, 1);

    let divisor = Num::from_json(b);
    if divisor.as_f64() == 0.0 {
        return Err(RenderErrorReason::Other("div: division by zero".to_string()).into());
    }
    let result = arith(a, b, i64::checked_div, |x, y| x / y);
    out.write(&text(&result))?;
    Ok(())
}

fn now_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let now = chrono::Utc::now();
    let rendered = match h.param(0).and_then(|p| p.value().as_str()) {
        Some(format) => {
            let mut s = String::new();
            write!(s, "{}", now.format(format)).map_err(|_| {
                RenderErrorReason::Other(format!("now: invalid date format {:?}", format))
            })?;
            s
        }
        None => now.to_rfc3339(),
    };
    out.write(&rendered)?;
    Ok(())
}
