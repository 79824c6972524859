//! Template formatting engine.
//!
//! Renders one [`Event`] through a [`TemplateNode`] tree into an
//! [`OutputNode`] tree. Substitution is an ordered list of passes over the
//! node text; unless noted otherwise each pass replaces only the first
//! occurrence of its token, matching the behaviour templates have always
//! had:
//!
//! 1. Legacy literals `/Summary`, `/Link`, `/Hangout`, `/Location`,
//!    `/Start Time`, `/End Time` (kept for backward compatibility; never
//!    link-wrapped).
//! 2. `{summary}` (privacy-aware, optionally wrapped as a markdown link),
//!    `{link}`, `{hangout}`, `{confLink}`, `{location}`.
//! 3. `{attendees}` / `{attendees:FMT}` — FMT defaults to `NAME`; every
//!    occurrence of the literal `NAME` is substituted per attendee.
//! 4. `{start}` / `{start:FMT}` and `{end}` / `{end:FMT}` — FMT defaults to
//!    `hh:mm a`; all-day boundaries always render as `All Day`.
//! 5. `{calendar}`, `{duration}`, `{custom}`.
//!
//! Date format strings use date-fns style tokens; the supported subset is
//! `yyyy MM dd EEEE HH H hh h mm ss a`. Unknown characters pass through
//! untouched.
//!
//! The engine is pure: no I/O, deterministic output for a given
//! (event, template, flags, formatter) tuple.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::event::{Event, Visibility};
use crate::node::{OutputNode, TemplateNode};
use crate::time::EventTime;

/// Default date format for `{start}` and `{end}`.
pub const DEFAULT_DATE_FORMAT: &str = "hh:mm a";

/// Rendering for all-day event boundaries, regardless of format string.
const ALL_DAY_TEXT: &str = "All Day";

/// Placeholder summary for events without one.
const NO_SUMMARY_TEXT: &str = "No Summary";

/// Summary shown for events with private visibility.
const PRIVATE_SUMMARY_TEXT: &str = "busy";

static ATTENDEES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{attendees:?(.*?)\}").expect("valid regex"));
static START_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{start:?(.*?)\}").expect("valid regex"));
static END_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{end:?(.*?)\}").expect("valid regex"));

/// A caller-supplied strategy for the `{custom}` placeholder.
///
/// When no formatter is supplied, `{custom}` is left verbatim in the output
/// (this is not an error).
pub trait CustomFormatter {
    /// Produces the replacement text for `{custom}`.
    fn render(&self, event: &Event) -> String;
}

impl<F> CustomFormatter for F
where
    F: Fn(&Event) -> String,
{
    fn render(&self, event: &Event) -> String {
        self(event)
    }
}

/// Renders events through template trees.
#[derive(Debug, Clone, Copy)]
pub struct TemplateEngine {
    include_link: bool,
}

impl TemplateEngine {
    /// Creates an engine.
    ///
    /// `include_link` wraps `{summary}` (and the default line's summary) as a
    /// markdown link to the event URL when one exists. Legacy tokens are
    /// unaffected.
    pub fn new(include_link: bool) -> Self {
        Self { include_link }
    }

    /// Formats one event through a template tree.
    ///
    /// Each child template is formatted independently against the same event
    /// and appended in order.
    pub fn format(
        &self,
        event: &Event,
        template: &TemplateNode,
        custom: Option<&dyn CustomFormatter>,
    ) -> OutputNode {
        OutputNode {
            text: self.substitute(event, &template.text, custom),
            children: template
                .children
                .iter()
                .map(|child| self.format(event, child, custom))
                .collect(),
        }
    }

    /// Applies the substitution passes to one template text.
    fn substitute(
        &self,
        event: &Event,
        text: &str,
        custom: Option<&dyn CustomFormatter>,
    ) -> String {
        let summary_text = resolve_summary(event);
        let summary = self.linked_summary(event, &summary_text);

        if text.is_empty() {
            return format!(
                "{} ({} - {}){}",
                summary,
                resolve_date(&event.start, None),
                resolve_date(&event.end, None),
                conf_link_suffix(event)
            );
        }

        let html_link = event.html_link.as_deref().unwrap_or("");
        let hangout_link = event.hangout_link.as_deref().unwrap_or("");
        let location = event.location.as_deref().unwrap_or("");

        let mut out = text.to_string();

        // Legacy tokens. Deliberately use the unlinked summary.
        out = out.replacen("/Summary", &summary_text, 1);
        out = out.replacen("/Link", html_link, 1);
        out = out.replacen("/Hangout", hangout_link, 1);
        out = out.replacen("/Location", location, 1);
        out = out.replacen("/Start Time", &resolve_date(&event.start, None), 1);
        out = out.replacen("/End Time", &resolve_date(&event.end, None), 1);

        out = out.replacen("{summary}", &summary, 1);
        out = out.replacen("{link}", html_link, 1);
        out = out.replacen("{hangout}", hangout_link, 1);
        out = out.replacen("{confLink}", &conf_link_suffix(event), 1);
        out = out.replacen("{location}", location, 1);

        out = ATTENDEES_RE
            .replace(&out, |caps: &Captures| {
                resolve_attendees(event, caps.get(1).map_or("", |m| m.as_str()))
            })
            .into_owned();
        out = START_RE
            .replace(&out, |caps: &Captures| {
                resolve_date(&event.start, caps.get(1).map(|m| m.as_str()))
            })
            .into_owned();
        out = END_RE
            .replace(&out, |caps: &Captures| {
                resolve_date(&event.end, caps.get(1).map(|m| m.as_str()))
            })
            .into_owned();

        out = out.replacen("{calendar}", &event.calendar_id, 1);
        out = out.replacen("{duration}", &event.duration_minutes().to_string(), 1);

        if let Some(formatter) = custom {
            out = out.replacen("{custom}", &formatter.render(event), 1);
        }

        out
    }

    /// Wraps the summary text as a markdown link when configured and possible.
    fn linked_summary(&self, event: &Event, summary_text: &str) -> String {
        match event.html_link.as_deref() {
            Some(link) if self.include_link && !link.is_empty() => {
                format!("[{}]({})", summary_text, link)
            }
            _ => summary_text.to_string(),
        }
    }
}

/// The summary text before any link wrapping: "busy" for private events,
/// a placeholder for empty summaries.
fn resolve_summary(event: &Event) -> String {
    if event.visibility == Some(Visibility::Private) {
        PRIVATE_SUMMARY_TEXT.to_string()
    } else if event.summary.is_empty() {
        NO_SUMMARY_TEXT.to_string()
    } else {
        event.summary.clone()
    }
}

/// The `{confLink}` suffix: a Meet fragment when a hangout link exists, then
/// a Zoom fragment when the location contains `zoom.us`.
fn conf_link_suffix(event: &Event) -> String {
    let meet = event
        .hangout_link
        .as_deref()
        .filter(|l| !l.is_empty())
        .map(|l| format!(" - [Meet]({})", l))
        .unwrap_or_default();
    let zoom = event
        .location
        .as_deref()
        .filter(|l| l.contains("zoom.us"))
        .map(|l| format!(" - [Zoom]({})", l))
        .unwrap_or_default();
    format!("{}{}", meet, zoom)
}

/// Renders one event boundary with a date-fns-style format string.
///
/// All-day boundaries render as the literal `All Day` regardless of format.
fn resolve_date(time: &EventTime, format: Option<&str>) -> String {
    match time {
        EventTime::AllDay => ALL_DAY_TEXT.to_string(),
        EventTime::DateTime(dt) => {
            let pattern = match format {
                Some(f) if !f.is_empty() => f,
                _ => DEFAULT_DATE_FORMAT,
            };
            dt.format(&datefns_to_strftime(pattern)).to_string()
        }
    }
}

/// Joins all attendees with `", "`, rendering each from the given format by
/// substituting every occurrence of the literal `NAME`.
fn resolve_attendees(event: &Event, format: &str) -> String {
    let format = if format.is_empty() { "NAME" } else { format };
    event
        .attendees
        .iter()
        .map(|a| format.replace("NAME", a.render_name()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Translates the supported date-fns tokens to a chrono strftime pattern.
///
/// Longest token wins; anything unrecognized passes through literally
/// (with `%` escaped so chrono never sees a stray specifier).
fn datefns_to_strftime(pattern: &str) -> String {
    const TOKENS: &[(&str, &str)] = &[
        ("yyyy", "%Y"),
        ("EEEE", "%A"),
        ("HH", "%H"),
        ("hh", "%I"),
        ("MM", "%m"),
        ("mm", "%M"),
        ("ss", "%S"),
        ("dd", "%d"),
        ("H", "%-H"),
        ("h", "%-I"),
        ("a", "%p"),
    ];

    let mut out = String::with_capacity(pattern.len() * 2);
    let mut rest = pattern;
    'scan: while !rest.is_empty() {
        for (token, strftime) in TOKENS {
            if rest.starts_with(token) {
                out.push_str(strftime);
                rest = &rest[token.len()..];
                continue 'scan;
            }
        }
        let ch = rest.chars().next().expect("non-empty remainder");
        if ch == '%' {
            out.push_str("%%");
        } else {
            out.push(ch);
        }
        rest = &rest[ch.len_utf8()..];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Attendee, Transparency};
    use crate::node::TemplateNode;

    fn timed(s: &str) -> EventTime {
        EventTime::from_rfc3339(s).unwrap()
    }

    fn retreat_event() -> Event {
        Event::new(
            "Meditation retreat",
            timed("2021-09-01T08:00:00Z"),
            timed("2021-09-01T08:30:00Z"),
        )
        .with_hangout_link("https://meet-link")
        .with_transparency(Transparency::Transparent)
        .with_calendar_id("calendar@example.com")
    }

    fn render(event: &Event, template: &str, include_link: bool) -> String {
        TemplateEngine::new(include_link)
            .format(event, &TemplateNode::leaf(template), None)
            .text
    }

    mod default_line {
        use super::*;

        #[test]
        fn empty_template_renders_default() {
            assert_eq!(
                render(&retreat_event(), "", false),
                "Meditation retreat (08:00 AM - 08:30 AM) - [Meet](https://meet-link)"
            );
        }

        #[test]
        fn default_line_links_summary() {
            let event = retreat_event().with_html_link("https://html-link");
            assert_eq!(
                render(&event, "", true),
                "[Meditation retreat](https://html-link) (08:00 AM - 08:30 AM) - [Meet](https://meet-link)"
            );
        }

        #[test]
        fn default_line_appends_zoom_fragment() {
            let event = retreat_event().with_location("https://zoom.us/j/123");
            assert_eq!(
                render(&event, "", false),
                "Meditation retreat (08:00 AM - 08:30 AM) - [Meet](https://meet-link) - [Zoom](https://zoom.us/j/123)"
            );
        }

        #[test]
        fn all_day_renders_literal() {
            let event = Event::new("Holiday", EventTime::AllDay, EventTime::AllDay);
            assert_eq!(render(&event, "", false), "Holiday (All Day - All Day)");
        }
    }

    mod identity {
        use super::*;

        #[test]
        fn no_placeholders_unchanged() {
            let text = "plain text with no tokens at all";
            assert_eq!(render(&retreat_event(), text, false), text);
        }

        #[test]
        fn include_link_is_noop_without_link() {
            let event = retreat_event();
            assert_eq!(
                render(&event, "{summary}", false),
                render(&event, "{summary}", true)
            );
        }
    }

    mod modern_tokens {
        use super::*;

        #[test]
        fn summary_with_link() {
            let event = retreat_event().with_html_link("https://html-link");
            assert_eq!(
                render(&event, "{summary}", true),
                "[Meditation retreat](https://html-link)"
            );
            assert_eq!(render(&event, "{summary}", false), "Meditation retreat");
        }

        #[test]
        fn private_visibility_masks_summary() {
            let event = retreat_event().with_visibility(Visibility::Private);
            assert_eq!(render(&event, "{summary}", false), "busy");
        }

        #[test]
        fn empty_summary_placeholder() {
            let event = Event::new(
                "",
                timed("2021-09-01T08:00:00Z"),
                timed("2021-09-01T08:30:00Z"),
            );
            assert_eq!(render(&event, "{summary}", false), "No Summary");
        }

        #[test]
        fn raw_field_tokens() {
            let event = retreat_event()
                .with_html_link("https://html-link")
                .with_location("Room 22");
            assert_eq!(
                render(&event, "{link} {hangout} {location}", false),
                "https://html-link https://meet-link Room 22"
            );
        }

        #[test]
        fn missing_fields_render_empty() {
            let event = Event::new(
                "x",
                timed("2021-09-01T08:00:00Z"),
                timed("2021-09-01T08:30:00Z"),
            );
            assert_eq!(render(&event, "<{link}><{hangout}><{location}>", false), "<><><>");
        }

        #[test]
        fn conf_link_meet_then_zoom() {
            let event = retreat_event().with_location("https://zoom.us/j/99");
            assert_eq!(
                render(&event, "{summary}{confLink}", false),
                "Meditation retreat - [Meet](https://meet-link) - [Zoom](https://zoom.us/j/99)"
            );
        }

        #[test]
        fn calendar_tag() {
            assert_eq!(
                render(&retreat_event(), "{calendar}", false),
                "calendar@example.com"
            );
        }

        #[test]
        fn duration_in_minutes() {
            assert_eq!(render(&retreat_event(), "{duration}", false), "30");
        }

        #[test]
        fn duration_all_day_is_1440() {
            let event = Event::new("Holiday", EventTime::AllDay, EventTime::AllDay);
            assert_eq!(render(&event, "{duration}", false), "1440");
        }

        #[test]
        fn first_occurrence_only() {
            assert_eq!(
                render(&retreat_event(), "{duration} {duration}", false),
                "30 {duration}"
            );
        }
    }

    mod attendees {
        use super::*;

        #[test]
        fn default_format_joins_names() {
            let event = retreat_event()
                .with_attendee(Attendee::new("me@x.com"))
                .with_attendee(Attendee::new("other@x.com").with_display_name("Other"));
            assert_eq!(render(&event, "{attendees}", false), "me@x.com, Other");
        }

        #[test]
        fn custom_format_substitutes_every_name() {
            let event = retreat_event()
                .with_attendee(Attendee::new("me@x.com"))
                .with_attendee(Attendee::new("other@x.com"));
            assert_eq!(
                render(&event, "{attendees:[[NAME]]}", false),
                "[[me@x.com]], [[other@x.com]]"
            );
        }

        #[test]
        fn empty_attendee_list_is_empty() {
            assert_eq!(render(&retreat_event(), "{attendees}", false), "");
        }
    }

    mod dates {
        use super::*;

        #[test]
        fn default_format_is_12_hour() {
            assert_eq!(
                render(&retreat_event(), "{start} - {end}", false),
                "08:00 AM - 08:30 AM"
            );
        }

        #[test]
        fn explicit_format() {
            assert_eq!(
                render(&retreat_event(), "{start:HH:mm}", false),
                "08:00"
            );
            assert_eq!(
                render(&retreat_event(), "{start:yyyy-MM-dd}", false),
                "2021-09-01"
            );
        }

        #[test]
        fn unpadded_hour_token() {
            assert_eq!(render(&retreat_event(), "{start:h:mm a}", false), "8:00 AM");
        }

        #[test]
        fn renders_in_source_offset() {
            let event = Event::new(
                "x",
                timed("2021-09-01T09:30:00+01:00"),
                timed("2021-09-01T10:00:00+01:00"),
            );
            assert_eq!(render(&event, "{start}", false), "09:30 AM");
        }

        #[test]
        fn all_day_ignores_format() {
            let event = Event::new("Holiday", EventTime::AllDay, EventTime::AllDay);
            assert_eq!(render(&event, "{start:yyyy-MM-dd}", false), "All Day");
        }
    }

    mod legacy_tokens {
        use super::*;

        #[test]
        fn legacy_literals() {
            let event = retreat_event()
                .with_html_link("https://html-link")
                .with_location("Room 22");
            assert_eq!(
                render(&event, "/Summary | /Link | /Hangout | /Location", false),
                "Meditation retreat | https://html-link | https://meet-link | Room 22"
            );
            assert_eq!(
                render(&event, "/Start Time - /End Time", false),
                "08:00 AM - 08:30 AM"
            );
        }

        #[test]
        fn legacy_summary_never_linked() {
            let event = retreat_event().with_html_link("https://html-link");
            assert_eq!(render(&event, "/Summary", true), "Meditation retreat");
        }
    }

    mod custom {
        use super::*;

        #[test]
        fn left_verbatim_without_formatter() {
            assert_eq!(render(&retreat_event(), "{custom}", false), "{custom}");
        }

        #[test]
        fn formatter_output_substituted() {
            let formatter = |event: &Event| format!("<{}>", event.summary);
            let out = TemplateEngine::new(false).format(
                &retreat_event(),
                &TemplateNode::leaf("{custom}"),
                Some(&formatter),
            );
            assert_eq!(out.text, "<Meditation retreat>");
        }
    }

    mod recursion {
        use super::*;

        #[test]
        fn children_formatted_in_order() {
            let template = TemplateNode::with_children(
                "{summary}",
                vec![
                    TemplateNode::leaf("{start} - {end}"),
                    TemplateNode::leaf("{attendees}"),
                ],
            );
            let event = retreat_event().with_attendee(Attendee::new("me@x.com"));
            let out = TemplateEngine::new(false).format(&event, &template, None);

            assert_eq!(out.text, "Meditation retreat");
            assert_eq!(out.children.len(), 2);
            assert_eq!(out.children[0].text, "08:00 AM - 08:30 AM");
            assert_eq!(out.children[1].text, "me@x.com");
        }
    }

    mod pattern_translation {
        use super::*;

        #[test]
        fn token_table() {
            assert_eq!(datefns_to_strftime("hh:mm a"), "%I:%M %p");
            assert_eq!(datefns_to_strftime("yyyy-MM-dd HH:mm:ss"), "%Y-%m-%d %H:%M:%S");
            assert_eq!(datefns_to_strftime("EEEE h a"), "%A %-I %p");
        }

        #[test]
        fn escapes_percent() {
            assert_eq!(datefns_to_strftime("100%"), "100%%");
        }
    }
}
