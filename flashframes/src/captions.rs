//! WebVTT caption cues and looking up the caption shown around a point in time.

use std::sync::OnceLock;

use regex::Regex;

/// How far away from a cue a timestamp may be and still get its text.
pub const NEAREST_CUE_TOLERANCE_SECS: f64 = 3.0;

#[derive(Clone, Debug, PartialEq)]
pub struct CaptionCue {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl CaptionCue {
    pub fn contains(&self, secs: f64) -> bool {
        self.start <= secs && secs <= self.end
    }

    /// Distance to the closest of the two boundaries.
    pub fn boundary_distance(&self, secs: f64) -> f64 {
        (self.start - secs).abs().min((self.end - secs).abs())
    }
}

fn timing_regex() -> &'static Regex {
    static TIMING: OnceLock<Regex> = OnceLock::new();
    TIMING.get_or_init(|| {
        Regex::new(
            r"(\d{2}):(\d{2}):(\d{2})\.(\d{3})\s*-->\s*(\d{2}):(\d{2}):(\d{2})\.(\d{3})",
        )
        .expect("the regex is valid")
    })
}

fn tag_regex() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| Regex::new(r"<[^>]*>").expect("the regex is valid"))
}

/// Parses the cues of a WebVTT document, in document order. Anything that is not a cue
/// (header, notes, malformed timings) is skipped, as are cues without any text.
pub fn parse_vtt(vtt: &str) -> Vec<CaptionCue> {
    let mut cues = Vec::new();
    let mut lines = vtt.lines();

    while let Some(line) = lines.next() {
        let Some((start, end)) = parse_timing(line) else {
            continue;
        };

        let text: Vec<String> = lines
            .by_ref()
            .map(str::trim)
            .take_while(|line| !line.is_empty())
            .map(clean_text)
            .filter(|line| !line.is_empty())
            .collect();

        if text.is_empty() {
            log::trace!("Dropping the empty cue at {start}-{end}");
            continue;
        }

        cues.push(CaptionCue {
            start,
            end,
            text: text.join(" "),
        });
    }

    cues
}

fn parse_timing(line: &str) -> Option<(f64, f64)> {
    let caps = timing_regex().captures(line)?;
    let field = |i: usize| -> Option<f64> { caps.get(i)?.as_str().parse::<f64>().ok() };
    let seconds = |first: usize| -> Option<f64> {
        Some(
            field(first)? * 3600.0
                + field(first + 1)? * 60.0
                + field(first + 2)?
                + field(first + 3)? / 1000.0,
        )
    };
    Some((seconds(1)?, seconds(5)?))
}

fn clean_text(line: &str) -> String {
    tag_regex()
        .replace_all(line, "")
        .replace("&nbsp;", " ")
        .trim()
        .to_string()
}

/// The text of the first cue containing `secs`, or else of the cue with the closest
/// boundary if that is closer than [`NEAREST_CUE_TOLERANCE_SECS`]. Earlier cues win ties.
pub fn match_caption(cues: &[CaptionCue], secs: f64) -> Option<&str> {
    if let Some(cue) = cues.iter().find(|cue| cue.contains(secs)) {
        return Some(cue.text.as_str());
    }

    let mut nearest: Option<(&CaptionCue, f64)> = None;
    for cue in cues {
        let dist = cue.boundary_distance(secs);
        match nearest {
            Some((_, best)) if best <= dist => (),
            _ => nearest = Some((cue, dist)),
        }
    }

    nearest
        .filter(|(_, dist)| *dist < NEAREST_CUE_TOLERANCE_SECS)
        .map(|(cue, _)| cue.text.as_str())
}
