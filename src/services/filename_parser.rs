//! Release-name parser.
//!
//! Scene and web release names pack a whole manifest into one string:
//! `Aquaman.2018.2160p.WEB-DL.DD+2.0.HDR.HEVC-MOMA.mkv`. This module pulls
//! that manifest apart with an ordered table of regex rules, tracks which
//! spans of the name each rule consumed, and derives the title from the
//! longest untouched prefix. Leftover fragments are either reclassified
//! (release group, episode name) or surfaced as `excess`.
//!
//! Rule order is part of the contract: earlier rules consume text that later
//! rules would otherwise misread, and the title span is bounded by the
//! earliest consumed index. Underscores are normalized to spaces before any
//! rule runs.

use once_cell::sync::Lazy;
use regex::Regex;

/// How a rule's cleaned capture is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleKind {
    Text,
    Integer,
    Flag,
}

struct Rule {
    name: &'static str,
    pattern: Regex,
    kind: RuleKind,
    /// The release year tends to follow the title, which may itself contain
    /// a year ("2001 A Space Odyssey (1968)"), so for the year rule the
    /// rightmost occurrence wins.
    rightmost: bool,
}

impl Rule {
    fn new(name: &'static str, pattern: &str, kind: RuleKind, rightmost: bool) -> Self {
        // Word-bounded and case-insensitive by default; season/episode/website
        // match mid-token or anchored shapes and opt out of the boundaries.
        let bounded = match name {
            "season" | "episode" | "website" => format!("(?i){pattern}"),
            _ => format!(r"(?i)\b{pattern}\b"),
        };
        Self {
            name,
            pattern: Regex::new(&bounded).expect("invalid filename rule"),
            kind,
            rightmost,
        }
    }
}

const QUALITY_PATTERN: &str = r"((?:PPV\.)?[HP]DTV|(?:HD)?CAM|B[DR]Rip|(?:HD-?)?TS|(?:PPV )?WEB-?DL(?: DVDRip)?|HDRip|DVDRip|DVDRIP|CamRip|W[EB]BRip|(?:UHD\.-?)?BluRay|DvDScr|hdtv|telesync)";
const CODEC_PATTERN: &str = r"(HEVC|xvid|[hx]\.?26[45])";

static RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    use RuleKind::*;
    vec![
        Rule::new("season", r"(s?([0-9]{1,2}))[ex]", Integer, false),
        Rule::new(
            "episode",
            r"((?:[ex]|- )([0-9]{2})(?:[^0-9]|$))",
            Integer,
            false,
        ),
        Rule::new(
            "year",
            r"([\[\(]?((?:19[0-9]|20[0-9])[0-9])[\]\)]?)",
            Integer,
            true,
        ),
        Rule::new("resolution", r"([0-9]{3,4}p)", Text, false),
        Rule::new("quality", QUALITY_PATTERN, Text, false),
        Rule::new("codec", CODEC_PATTERN, Text, false),
        Rule::new(
            "audio",
            r"(MP3|DD(?:[P|+]?)[2|5|7]\.?[0|1]|Dual[\- ]Audio|LiNE|DTS|AAC[.-]LC|AAC(?:\.?2\.0)?|AC3(?:\.5\.1)?)",
            Text,
            false,
        ),
        Rule::new("group", r"(- ?([^-]+(?:-=\{[^-]+-?$)?))$", Text, false),
        Rule::new("region", r"R[0-9]", Text, false),
        Rule::new("extended", r"(EXTENDED(:?.CUT)?)", Flag, false),
        Rule::new("hardcoded", r"HC", Flag, false),
        Rule::new("proper", r"PROPER", Flag, false),
        Rule::new("repack", r"REPACK", Flag, false),
        Rule::new("container", r"(MKV|AVI|MP4)", Text, false),
        Rule::new("widescreen", r"WS", Flag, false),
        Rule::new("website", r"^(\[ ?([^\]]+?) ?\])", Text, false),
        Rule::new("language", r"(rus\.eng|ita\.eng)", Text, false),
        Rule::new("sbs", r"(?:Half-)?SBS", Text, false),
        Rule::new("unrated", r"UNRATED", Flag, false),
        Rule::new("size", r"(\d+(?:\.\d+)?(?:GB|MB))", Text, false),
        Rule::new("3d", r"3[D|d]", Flag, false),
        Rule::new("hdr", r"HDR", Flag, false),
    ]
});

/// Quality check applied case-sensitively when vetting group captures;
/// "hdtv" and friends are matched loosely everywhere else.
static GROUP_QUALITY_CHECK: Lazy<Regex> =
    Lazy::new(|| Regex::new(QUALITY_PATTERN).expect("invalid quality pattern"));
static GROUP_CODEC_CHECK: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!("(?i){CODEC_PATTERN}")).expect("invalid codec pattern"));
/// A "group" capture with three or more words is an episode title, not a
/// release group.
static MULTI_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^ ]+ [^ ]+ .+").expect("regex"));

static TITLE_TRAILER: Lazy<Regex> = Lazy::new(|| Regex::new(r"([\[\(_]|- )$").expect("regex"));
static EXCESS_EDGES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(^[-\. ()]+)|([-\. ]+$)").expect("regex"));
static EXCESS_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.\.+| +").expect("regex"));

/// Everything a release name can carry. Absent attributes stay `None`;
/// presence-only markers are plain bools.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedName {
    pub title: String,
    pub season: Option<i32>,
    pub episode: Option<i32>,
    pub episode_name: Option<String>,
    pub year: Option<i32>,
    pub resolution: Option<String>,
    pub quality: Option<String>,
    pub codec: Option<String>,
    pub audio: Option<String>,
    pub group: Option<String>,
    pub region: Option<String>,
    pub container: Option<String>,
    pub website: Option<String>,
    pub language: Option<String>,
    pub sbs: Option<String>,
    pub size: Option<String>,
    pub extended: bool,
    pub hardcoded: bool,
    pub proper: bool,
    pub repack: bool,
    pub widescreen: bool,
    pub unrated: bool,
    pub three_d: bool,
    pub hdr: bool,
    pub excess: Vec<String>,
}

/// Parse one release name. Pure and deterministic: parsing the same name
/// twice yields identical results.
pub fn parse(filename: &str) -> ParsedName {
    let name = filename.replace('_', " ");

    let mut out = ParsedName::default();
    let mut excess_raw = name.clone();
    let mut group_raw = String::new();
    let mut title_start = 0usize;
    let mut title_end: Option<usize> = None;
    let mut episode_template: Option<String> = None;

    for rule in RULES.iter() {
        let caps = if rule.rightmost {
            rule.pattern.captures_iter(&name).last()
        } else {
            rule.pattern.captures(&name)
        };
        let Some(caps) = caps else { continue };

        let explicit_groups = rule.pattern.captures_len() - 1;
        let raw = if explicit_groups == 0 {
            caps.get(0)
        } else {
            caps.get(1)
        }
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();
        let clean = if explicit_groups >= 2 {
            caps.get(2).map(|m| m.as_str()).unwrap_or("").to_string()
        } else {
            raw.clone()
        };

        let mut key = rule.name;
        if key == "group" {
            // Codec and quality tokens routinely trail the last hyphen and
            // masquerade as a release group.
            if GROUP_CODEC_CHECK.is_match(&clean) || GROUP_QUALITY_CHECK.is_match(&clean) {
                continue;
            }
            if MULTI_WORD.is_match(&clean) {
                key = "episodeName";
            }
        }
        if key == "episode" {
            episode_template = Some(name.replace(&raw, "{episode}"));
        }

        // Track the consumed span: a rule matching at the very start pushes
        // the title past it, any other match caps where the title can end.
        if let Some(index) = name.find(&raw) {
            if index == 0 {
                title_start = raw.len();
            } else if title_end.is_none_or(|end| index < end) {
                title_end = Some(index);
            }
        }

        if key == "group" {
            group_raw = raw.clone();
        }
        if !raw.is_empty() {
            excess_raw = excess_raw.replace(&raw, "");
        }

        match (key, rule.kind) {
            ("season", _) => out.season = clean.parse().ok(),
            ("episode", _) => out.episode = clean.parse().ok(),
            ("year", _) => out.year = clean.parse().ok(),
            ("resolution", _) => out.resolution = Some(clean),
            ("quality", _) => out.quality = Some(clean),
            ("codec", _) => out.codec = Some(clean),
            ("audio", _) => out.audio = Some(clean),
            ("group", _) => out.group = Some(clean),
            ("episodeName", _) => out.episode_name = Some(clean),
            ("region", _) => out.region = Some(clean),
            ("container", _) => out.container = Some(clean),
            ("website", _) => out.website = Some(clean),
            ("language", _) => out.language = Some(clean),
            ("sbs", _) => out.sbs = Some(clean),
            ("size", _) => out.size = Some(clean),
            ("extended", RuleKind::Flag) => out.extended = true,
            ("hardcoded", RuleKind::Flag) => out.hardcoded = true,
            ("proper", RuleKind::Flag) => out.proper = true,
            ("repack", RuleKind::Flag) => out.repack = true,
            ("widescreen", RuleKind::Flag) => out.widescreen = true,
            ("unrated", RuleKind::Flag) => out.unrated = true,
            ("3d", RuleKind::Flag) => out.three_d = true,
            ("hdr", RuleKind::Flag) => out.hdr = true,
            _ => {}
        }
    }

    // Title: the prefix left untouched by every rule, cut at the first
    // opening paren, with separator noise cleaned up.
    let raw_title = match title_end {
        Some(end) => name
            .get(title_start..end)
            .unwrap_or("")
            .split('(')
            .next()
            .unwrap_or("")
            .to_string(),
        None => name.clone(),
    };
    let mut title = raw_title
        .strip_prefix(" -")
        .unwrap_or(&raw_title)
        .to_string();
    if !title.contains(' ') && title.contains('.') {
        title = title.replace('.', " ");
    }
    title = TITLE_TRAILER.replace(&title, "").into_owned();
    out.title = title.trim().to_string();
    if !raw_title.is_empty() {
        excess_raw = excess_raw.replace(&raw_title, "");
    }

    // Excess: whatever no rule consumed, split into tokens.
    let stripped = EXCESS_EDGES.replace_all(&excess_raw, "");
    let despecialed = stripped.replace(['(', ')', '/'], " ");
    let mut tokens: Vec<String> = EXCESS_SPLIT
        .split(&despecialed)
        .filter(|t| !t.is_empty() && *t != "-")
        .map(|t| t.trim_matches('-').to_string())
        .collect();

    // A trailing token that reads as "<token><group raw>" at the end of the
    // name is the real release group, hyphens and all.
    if let Some(last) = tokens.last() {
        let group_pattern = format!("{last}{group_raw}");
        if name.len() >= group_pattern.len()
            && name.find(&group_pattern) == Some(name.len() - group_pattern.len())
        {
            let popped = tokens.pop().unwrap_or_default();
            out.group = Some(format!("{popped}{group_raw}"));
        }
    }

    // Leading tokens that sit right after the episode marker in the original
    // name form the episode title. Consume consecutive tokens as long as
    // each lines up, separators allowed between them.
    if let Some(template) = &episode_template
        && let Some(pos) = template.find("{episode}")
    {
        let mut rest = &template[pos + "{episode}".len()..];
        let mut fragment: Vec<String> = Vec::new();
        while let Some(token) = tokens.first() {
            let candidate = rest.trim_start_matches(['-', '.', ' ']);
            match candidate.strip_prefix(token.as_str()) {
                Some(after) => {
                    rest = after;
                    fragment.push(tokens.remove(0));
                }
                None => break,
            }
        }
        if !fragment.is_empty() {
            let joined = fragment.join(" ").replace(['.', '_'], " ");
            out.episode_name = Some(joined.trim().to_string());
        }
    }

    out.excess = tokens;
    out
}
