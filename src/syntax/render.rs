//! Capture-to-markup rendering
//!
//! Turns an unsorted, possibly overlapping set of captures into properly nested
//! `<span>` elements with a single sweep over sorted boundary events:
//!
//! ```text
//! captures: keyword[0,3) keyword.error[1,2)
//! events:   0:start(kw) 1:start(err) 2:end(err) 3:end(kw)
//! output:   <kw>a</kw><kw><err>b</err></kw><kw>c</kw>
//! ```
//!
//! Every text run between two boundaries is wrapped once per open capture, outermost
//! first, so overlapping captures never produce crossed tags.

use std::collections::HashMap;

use super::highlights::{class_name_for, Capture};
use crate::html::{escape_html, push_escaped};
use crate::theme::{Channel, ThemeDefinition};

/// At equal positions, ends sort before starts so adjacent tokens close before the next
/// one opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum EventKind {
    End,
    Start,
}

#[derive(Debug, Clone, Copy)]
struct Event {
    pos: usize,
    kind: EventKind,
    /// Index of the capture instance; identity for removal from the open stack
    capture: usize,
}

/// Span attributes for a capture name: `class="..."` plus `style="color: ..."` when the
/// theme resolves a foreground.
fn span_attributes(name: &str, theme: &ThemeDefinition) -> String {
    let class = escape_html(&class_name_for(name));
    match theme.color(name, Channel::Foreground) {
        Some(color) => format!(r#"class="{}" style="color: {}""#, class, escape_html(color)),
        None => format!(r#"class="{class}""#),
    }
}

/// Clamp an offset into the source, landing on a char boundary at or before it.
fn clamp_offset(source: &str, offset: usize) -> usize {
    let mut offset = offset.min(source.len());
    while offset > 0 && !source.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

/// Escape `text` and wrap it in one span per renderable open capture, outermost first.
fn push_wrapped(
    out: &mut String,
    text: &str,
    stack: &[usize],
    captures: &[Capture],
    attributes: &HashMap<&str, Option<String>>,
) {
    if text.is_empty() {
        return;
    }

    let mut depth = 0;
    for &idx in stack {
        let Some(Some(attr)) = attributes.get(captures[idx].name.as_str()) else {
            continue;
        };
        out.push_str("<span ");
        out.push_str(attr);
        out.push('>');
        depth += 1;
    }

    push_escaped(out, text);

    for _ in 0..depth {
        out.push_str("</span>");
    }
}

/// Render `source` as inline markup using `captures` and the theme's colors.
///
/// With no captures the result is the escaped source. Zero-width captures never wrap
/// text. Offsets past the end of the source are clamped.
pub fn render_captures(source: &str, captures: &[Capture], theme: &ThemeDefinition) -> String {
    if captures.is_empty() {
        return escape_html(source);
    }

    // None marks hidden captures: they stay on the stack but never wrap text
    let mut attributes: HashMap<&str, Option<String>> = HashMap::new();
    for capture in captures {
        attributes.entry(capture.name.as_str()).or_insert_with(|| {
            (!capture.is_hidden()).then(|| span_attributes(&capture.name, theme))
        });
    }

    let mut events = Vec::with_capacity(captures.len() * 2);
    for (idx, capture) in captures.iter().enumerate() {
        let start = clamp_offset(source, capture.start);
        let end = clamp_offset(source, capture.end);
        if start >= end {
            continue;
        }
        events.push(Event {
            pos: start,
            kind: EventKind::Start,
            capture: idx,
        });
        events.push(Event {
            pos: end,
            kind: EventKind::End,
            capture: idx,
        });
    }
    // Stable: same-kind events at one position keep capture order
    events.sort_by_key(|e| (e.pos, e.kind));

    let mut out = String::with_capacity(source.len() * 2);
    let mut stack: Vec<usize> = Vec::new();
    let mut cursor = 0;

    for event in &events {
        if event.pos > cursor {
            push_wrapped(
                &mut out,
                &source[cursor..event.pos],
                &stack,
                captures,
                &attributes,
            );
            cursor = event.pos;
        }

        match event.kind {
            EventKind::Start => stack.push(event.capture),
            EventKind::End => {
                // Not necessarily the top: overlapping captures close out of order
                if let Some(pos) = stack.iter().rposition(|&idx| idx == event.capture) {
                    stack.remove(pos);
                }
            }
        }
    }

    if cursor < source.len() {
        push_wrapped(&mut out, &source[cursor..], &stack, captures, &attributes);
    }

    out
}
