//! Target path grammar.
//!
//! ```text
//! path    := NONE | SELP | XFADER | device | track [ "/" rest ]
//! track   := '"' name '"' | name | RING(n)
//! rest    := ARM | MUTE | SOLO | SEL | PLAY | STOP
//!          | MON (IN|AUTO|OFF) | XFADE (A|B|OFF)
//!          | VOL | PAN | CUE | XFADER | PANL | PANR
//!          | SEND letter | device
//! device  := DEV(spec) [ param ]
//! param   := CH(name) (SEND letter | PAN | VOL)
//!          | PAN | VOL | CUE | XFADER | PANL | PANR | SEL
//!          | SEND letter | '"' name '"' | CS | B<n> P<n> | P<n>
//! ```
//!
//! Keywords are case-insensitive. Violations are reported through
//! [`TargetDescriptor::error`] and never panic.

use crate::descriptor::{CrossfadeAssign, MonitorState, ParameterType, TargetDescriptor};

/// Parse a target path into a descriptor.
pub fn parse(input: &str) -> TargetDescriptor {
    let mut desc = TargetDescriptor::new(input);
    let s = input.trim();

    match s.to_ascii_uppercase().as_str() {
        "" | "NONE" => return desc,
        "SELP" => {
            desc.parameter_type = Some(ParameterType::Selp);
            return desc;
        }
        "XFADER" => {
            desc.parameter_type = Some(ParameterType::Xfader);
            return desc;
        }
        _ => {}
    }

    if strip_prefix_ci(s, "DEV(").is_some() {
        parse_device(s, &mut desc);
        return desc;
    }

    let Some(split) = split_index(s) else {
        parse_bare_track(s, &mut desc);
        return desc;
    };

    let track = s[..split].trim();
    let rest = s[split + 1..].trim();

    if let Some(inner) = ring_inner(track) {
        match inner.trim().parse::<u32>() {
            Ok(n) => desc.ring_track = Some(n),
            Err(_) => {
                desc.fail(format!("invalid ring offset: {inner}"));
                return desc;
            }
        }
    } else if track.is_empty() {
        desc.fail("missing track before '/'");
        return desc;
    } else {
        assign_track(track, &mut desc);
    }

    parse_rest(rest, &mut desc);
    desc
}

/// A whole path without `/`: a track name, a quoted name or `ring(n)`.
///
/// A lone letter stays a track name here; return-track letters only apply
/// before a `/`.
fn parse_bare_track(s: &str, desc: &mut TargetDescriptor) {
    if let Some(inner) = ring_inner(s)
        && let Ok(n) = inner.parse::<u32>()
    {
        desc.ring_track = Some(n);
        return;
    }
    desc.track = Some(unquote(s).to_string());
}

/// Store the track selector of a `<track> / <rest>` path, treating a single
/// unquoted letter as a return track.
fn assign_track(token: &str, desc: &mut TargetDescriptor) {
    if let Some(name) = quoted(token) {
        desc.track = Some(name.to_string());
    } else if is_send_letter(token) {
        desc.send_track = Some(token.to_string());
    } else {
        desc.track = Some(token.to_string());
    }
}

/// Everything after the track selector.
fn parse_rest(rest: &str, desc: &mut TargetDescriptor) {
    let words: Vec<&str> = rest.split_whitespace().collect();
    let Some(first) = words.first() else {
        desc.fail("missing target after '/'");
        return;
    };

    match rest.to_ascii_uppercase().as_str() {
        "ARM" => {
            desc.parameter_type = Some(ParameterType::Arm);
            desc.arm = true;
            return;
        }
        "MUTE" => {
            desc.parameter_type = Some(ParameterType::Mute);
            desc.mute = true;
            return;
        }
        "SOLO" => {
            desc.parameter_type = Some(ParameterType::Solo);
            desc.solo = true;
            return;
        }
        "SEL" => {
            desc.parameter_type = Some(ParameterType::Sel);
            desc.track_select = true;
            return;
        }
        "PLAY" => {
            desc.parameter_type = Some(ParameterType::Play);
            desc.play = true;
            return;
        }
        "STOP" => {
            desc.parameter_type = Some(ParameterType::Stop);
            desc.stop = true;
            return;
        }
        _ => {}
    }

    if first.eq_ignore_ascii_case("MON") {
        match (words.len(), words.get(1).and_then(|w| MonitorState::from_keyword(w))) {
            (2, Some(state)) => {
                desc.parameter_type = Some(ParameterType::Mon);
                desc.monitor = Some(state);
            }
            _ => desc.fail(format!("expected MON IN|AUTO|OFF: {rest}")),
        }
        return;
    }

    if first.eq_ignore_ascii_case("XFADE") {
        match (
            words.len(),
            words.get(1).and_then(|w| CrossfadeAssign::from_keyword(w)),
        ) {
            (2, Some(side)) => {
                desc.parameter_type = Some(ParameterType::Xfade);
                desc.x_fade_assign = Some(side);
            }
            _ => desc.fail(format!("expected XFADE A|B|OFF: {rest}")),
        }
        return;
    }

    if let Some(ty) = ParameterType::mixer_keyword(rest) {
        desc.parameter_type = Some(ty);
        return;
    }

    if first.eq_ignore_ascii_case("SEND") {
        parse_send(&words, ParameterType::Send, desc);
        return;
    }

    if strip_prefix_ci(rest, "DEV(").is_some() {
        parse_device(rest, desc);
        return;
    }

    desc.fail(format!("unrecognized target: {rest}"));
}

/// `DEV(spec) [param]`, where `s` starts with `DEV(`.
fn parse_device(s: &str, desc: &mut TargetDescriptor) {
    let Some(body) = strip_prefix_ci(s, "DEV(") else {
        desc.fail(format!("expected DEV(...): {s}"));
        return;
    };
    let Some(end) = closing_paren(body) else {
        desc.fail(format!("unterminated DEV(...): {s}"));
        return;
    };
    let spec = body[..end].trim();
    if spec.is_empty() {
        desc.fail(format!("empty device selector: {s}"));
        return;
    }
    parse_device_spec(spec, desc);
    if desc.error.is_some() {
        return;
    }
    parse_parameter_part(body[end + 1..].trim(), desc);
}

/// The inside of `DEV(...)`: a single device selector or a dotted chain path.
fn parse_device_spec(spec: &str, desc: &mut TargetDescriptor) {
    let segments = split_unquoted(spec, '.');
    if segments.len() == 1 {
        desc.device = Some(unquote(spec).to_string());
        return;
    }

    let mut path = Vec::with_capacity(segments.len());
    for (i, segment) in segments.iter().enumerate() {
        let segment = unquote(segment.trim());
        if segment.is_empty() {
            desc.fail(format!("empty segment in device path: {spec}"));
            return;
        }
        if i >= 2 && segment.eq_ignore_ascii_case("SEL") {
            desc.fail(format!(
                "SEL is only supported in position 1 or 2 of a device path: {spec}"
            ));
            return;
        }
        path.push(segment.to_string());
    }
    desc.chain_map = Some(path);
}

/// Whatever follows `DEV(...)`.
fn parse_parameter_part(part: &str, desc: &mut TargetDescriptor) {
    if part.is_empty() {
        return;
    }

    if let Some(body) = strip_prefix_ci(part, "CH(") {
        let Some(end) = closing_paren(body) else {
            desc.fail(format!("unterminated CH(...): {part}"));
            return;
        };
        desc.chain = Some(unquote(body[..end].trim()).to_string());
        let tail = body[end + 1..].trim();
        let words: Vec<&str> = tail.split_whitespace().collect();
        match words.first() {
            Some(w) if w.eq_ignore_ascii_case("SEND") => {
                parse_send(&words, ParameterType::ChainSend, desc);
            }
            _ if tail.eq_ignore_ascii_case("PAN") => {
                desc.parameter_type = Some(ParameterType::Pan);
            }
            _ if tail.eq_ignore_ascii_case("VOL") => {
                desc.parameter_type = Some(ParameterType::Vol);
            }
            _ => desc.fail(format!("expected SEND, PAN or VOL after CH(...): {part}")),
        }
        return;
    }

    if let Some(ty) = ParameterType::mixer_keyword(part) {
        desc.parameter_type = Some(ty);
        return;
    }
    if part.eq_ignore_ascii_case("SEL") {
        desc.parameter_type = Some(ParameterType::Sel);
        return;
    }
    if part.eq_ignore_ascii_case("CS") {
        desc.parameter_type = Some(ParameterType::Cs);
        return;
    }
    if let Some(name) = quoted(part) {
        desc.parameter_name = Some(name.to_string());
        return;
    }

    let words: Vec<&str> = part.split_whitespace().collect();
    match words.as_slice() {
        [send, ..] if send.eq_ignore_ascii_case("SEND") => {
            parse_send(&words, ParameterType::Send, desc);
        }
        [bank, param] => match (numbered(bank, 'B'), numbered(param, 'P')) {
            (Some(b), Some(p)) => {
                desc.bank = Some(b);
                desc.parameter_number = Some(p);
            }
            _ => desc.fail(format!("expected B<n> P<n>: {part}")),
        },
        [param] => match numbered(param, 'P') {
            Some(p) => desc.parameter_number = Some(p),
            None => desc.fail(format!("unrecognized parameter: {part}")),
        },
        _ => desc.fail(format!("unrecognized parameter: {part}")),
    }
}

/// `SEND <letter>`, with `words[0]` already known to be `SEND`.
fn parse_send(words: &[&str], ty: ParameterType, desc: &mut TargetDescriptor) {
    desc.parameter_type = Some(ty);
    match words {
        [_, letter] if is_send_letter(letter) => desc.send = Some((*letter).to_string()),
        _ => desc.fail(format!("SEND expects a single letter: {}", words.join(" "))),
    }
}

/// `B12` / `P3` style tokens; numbering is 1-based.
fn numbered(word: &str, prefix: char) -> Option<u32> {
    let mut chars = word.chars();
    let first = chars.next()?;
    if !first.eq_ignore_ascii_case(&prefix) {
        return None;
    }
    chars.as_str().parse::<u32>().ok().filter(|n| *n >= 1)
}

/// True for a single ASCII letter.
fn is_send_letter(s: &str) -> bool {
    let mut chars = s.chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if c.is_ascii_alphabetic())
}

/// The argument of `ring(...)`, when `s` has that shape.
fn ring_inner(s: &str) -> Option<&str> {
    strip_prefix_ci(s, "RING(")?.strip_suffix(')')
}

/// Case-insensitive ASCII prefix strip.
fn strip_prefix_ci<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let n = prefix.len();
    if s.len() >= n && s.is_char_boundary(n) && s[..n].eq_ignore_ascii_case(prefix) {
        Some(&s[n..])
    } else {
        None
    }
}

/// The inner text of a `"..."` token.
fn quoted(s: &str) -> Option<&str> {
    s.strip_prefix('"')?.strip_suffix('"')
}

/// Strip surrounding quotes when present.
fn unquote(s: &str) -> &str {
    quoted(s).unwrap_or(s)
}

/// Byte index of the first `/` outside double quotes.
fn split_index(s: &str) -> Option<usize> {
    let mut in_quotes = false;
    for (i, c) in s.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            '/' if !in_quotes => return Some(i),
            _ => {}
        }
    }
    None
}

/// Byte index of the first `)` outside double quotes.
fn closing_paren(s: &str) -> Option<usize> {
    let mut in_quotes = false;
    for (i, c) in s.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ')' if !in_quotes => return Some(i),
            _ => {}
        }
    }
    None
}

/// Split on `sep` wherever it occurs outside double quotes.
fn split_unquoted(s: &str, sep: char) -> Vec<&str> {
    let mut out = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        if c == '"' {
            in_quotes = !in_quotes;
        } else if c == sep && !in_quotes {
            out.push(&s[start..i]);
            start = i + c.len_utf8();
        }
    }
    out.push(&s[start..]);
    out
}
