//! Option Token Resolver: rewrites option mentions into placeholder tokens.
//!
//! Downstream analysis is option-identity-agnostic; every recognized option
//! substring is replaced by a token from a finite, deterministic pool before
//! any parsing happens, and the substitution map carries the way back.

use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

/// Number of numbered placeholder slots. Options beyond the pool degrade to
/// the generic placeholder and lose their identity.
pub const SLOT_POOL_SIZE: usize = 8;

const CURRENT_TOKEN: &str = "param_current";
const EXTERNAL_TOKEN: &str = "param_external";
const GENERIC_TOKEN: &str = "option";

/// A placeholder drawn from the finite substitution pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Placeholder {
    /// The option this sentence describes, or one of its aliases.
    Current,
    /// Numbered slot, unique per distinct surface form within one call.
    Slot(usize),
    /// An option that does not belong to the program under analysis.
    External,
    /// Pool exhausted; identity lost.
    Generic,
}

impl Placeholder {
    pub fn token(self) -> String {
        match self {
            Placeholder::Current => CURRENT_TOKEN.to_string(),
            Placeholder::Slot(slot) => format!("param{}", slot + 1),
            Placeholder::External => EXTERNAL_TOKEN.to_string(),
            Placeholder::Generic => GENERIC_TOKEN.to_string(),
        }
    }

    /// Whether this placeholder still identifies a program option the
    /// traverser should track.
    pub fn is_tracked(self) -> bool {
        matches!(self, Placeholder::Current | Placeholder::Slot(_))
    }
}

/// Whether a token text is a tracked option placeholder.
pub fn is_option_token(text: &str) -> bool {
    if text == CURRENT_TOKEN {
        return true;
    }
    (0..SLOT_POOL_SIZE).any(|slot| text == Placeholder::Slot(slot).token())
}

/// Surface-form to placeholder mapping for one sentence.
#[derive(Debug, Clone, Default)]
pub struct SubstitutionMap {
    entries: BTreeMap<String, Placeholder>,
}

impl SubstitutionMap {
    pub fn is_empty(&self) -> bool {
        !self.entries.values().any(|placeholder| placeholder.is_tracked())
    }

    pub fn insert(&mut self, surface: &str, placeholder: Placeholder) {
        self.entries.insert(surface.to_string(), placeholder);
    }

    pub fn placeholder_for(&self, surface: &str) -> Option<Placeholder> {
        self.entries.get(surface).copied()
    }

    /// Surface form behind a tracked placeholder token text.
    pub fn surface_for(&self, token_text: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, placeholder)| placeholder.is_tracked() && placeholder.token() == token_text)
            .map(|(surface, _)| surface.as_str())
    }

    /// Tracked placeholder token texts in this map.
    pub fn tracked_tokens(&self) -> BTreeSet<String> {
        self.entries
            .values()
            .filter(|placeholder| placeholder.is_tracked())
            .map(|placeholder| placeholder.token())
            .collect()
    }

    /// Keep only entries whose placeholder token still occurs in `text`
    /// (used when a compound sentence is split into sub-sentences).
    pub fn restricted_to(&self, text: &str) -> SubstitutionMap {
        let words: BTreeSet<&str> = text.split_whitespace().collect();
        let entries = self
            .entries
            .iter()
            .filter(|(_, placeholder)| words.contains(placeholder.token().as_str()))
            .map(|(surface, placeholder)| (surface.clone(), *placeholder))
            .collect();
        SubstitutionMap { entries }
    }

    /// True if some surface already resolves to the current option.
    pub fn has_current(&self) -> bool {
        self.entries
            .values()
            .any(|placeholder| *placeholder == Placeholder::Current)
    }

    /// Register `surface` under the self-reference placeholder. Used when the
    /// described option is not mentioned literally in a sub-sentence.
    pub fn ensure_current(&mut self, surface: &str) {
        if !self.has_current() {
            self.insert(surface, Placeholder::Current);
        }
    }

    pub fn current_token(&self) -> String {
        Placeholder::Current.token()
    }
}

/// Result of rewriting one sentence.
#[derive(Debug, Clone)]
pub struct ResolveOutcome {
    pub sentence: String,
    pub map: SubstitutionMap,
}

/// Replace every recognized option mention in `sentence` with a placeholder
/// token. `current_surfaces` holds the described option plus its aliases;
/// `vocabulary`, when given, restricts which mentions count as belonging to
/// the program (everything else becomes an external reference). Longest
/// surface forms are substituted first so `--keep` never shadows `--keep-all`.
pub fn resolve_options(
    sentence: &str,
    current_surfaces: &BTreeSet<String>,
    vocabulary: Option<&[String]>,
) -> ResolveOutcome {
    let mentions = find_option_mentions(sentence);

    // Slot numbers follow first appearance; substitution runs longest-first.
    let mut ordered: Vec<&String> = mentions.iter().map(|(surface, _)| surface).collect();
    ordered.sort_by_key(|surface| mentions[*surface]);

    let mut map = SubstitutionMap::default();
    let mut next_slot = 0usize;
    for surface in ordered {
        let placeholder = if current_surfaces.contains(surface) {
            Placeholder::Current
        } else if let Some(vocabulary) = vocabulary {
            if !in_vocabulary(surface, vocabulary) {
                Placeholder::External
            } else {
                assign_slot(&mut next_slot, surface)
            }
        } else {
            assign_slot(&mut next_slot, surface)
        };
        map.insert(surface, placeholder);
    }

    let mut rewritten = sentence.to_string();
    let mut by_length: Vec<(&String, Placeholder)> = map
        .entries
        .iter()
        .map(|(surface, placeholder)| (surface, *placeholder))
        .collect();
    by_length.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(b.0)));
    for (surface, placeholder) in by_length {
        rewritten = substitute_surface(&rewritten, surface, &placeholder.token());
    }

    ResolveOutcome {
        sentence: rewritten,
        map,
    }
}

fn assign_slot(next_slot: &mut usize, surface: &str) -> Placeholder {
    if *next_slot < SLOT_POOL_SIZE {
        let placeholder = Placeholder::Slot(*next_slot);
        *next_slot += 1;
        placeholder
    } else {
        warn!(surface, "placeholder pool exhausted, degrading to generic token");
        Placeholder::Generic
    }
}

/// Distinct option mentions with the byte offset of their first appearance.
fn find_option_mentions(sentence: &str) -> BTreeMap<String, usize> {
    // Compiled per call; the pattern is a fixed literal and sentences are
    // short, so this stays off any hot path.
    let Ok(pattern) = Regex::new(r"--?[A-Za-z0-9][^\s]*") else {
        return BTreeMap::new();
    };
    let mut mentions = BTreeMap::new();
    for found in pattern.find_iter(sentence) {
        if found.start() > 0 {
            let before = &sentence[..found.start()];
            if before
                .chars()
                .next_back()
                .is_some_and(|ch| ch.is_alphanumeric() || ch == '-')
            {
                continue;
            }
        }
        let surface = found
            .as_str()
            .trim_end_matches(['.', ',', ';', ':', '!', '?', '\'', '"', ')', ']']);
        if surface.len() < 2 {
            continue;
        }
        mentions
            .entry(surface.to_string())
            .or_insert(found.start());
    }
    mentions
}

/// Whether `surface` belongs to the program vocabulary; a trailing `*` makes
/// it a wildcard matched by prefix.
fn in_vocabulary(surface: &str, vocabulary: &[String]) -> bool {
    if let Some(prefix) = surface.strip_suffix('*') {
        vocabulary.iter().any(|option| option.starts_with(prefix))
    } else {
        vocabulary.iter().any(|option| option == surface)
    }
}

/// Replace whole-word occurrences of `surface`, never a prefix of a longer
/// option form.
fn substitute_surface(sentence: &str, surface: &str, token: &str) -> String {
    let mut out = String::with_capacity(sentence.len());
    let mut idx = 0;
    while let Some(rel) = sentence[idx..].find(surface) {
        let start = idx + rel;
        let end = start + surface.len();
        let before_ok = sentence[..start]
            .chars()
            .next_back()
            .is_none_or(|ch| !(ch.is_alphanumeric() || ch == '-'));
        let after_ok = sentence[end..]
            .chars()
            .next()
            .is_none_or(|ch| !(ch.is_alphanumeric() || ch == '-' || ch == '*'));
        out.push_str(&sentence[idx..start]);
        if before_ok && after_ok {
            out.push_str(token);
        } else {
            out.push_str(surface);
        }
        idx = end;
    }
    out.push_str(&sentence[idx..]);
    out
}

/// Strip the value field off an option surface: `-a=xxx`, `-a[xxx]`,
/// `-a<xxx>`, and `-a xxx` all reduce to `-a`.
pub fn strip_value_field(option: &str) -> &str {
    let trimmed = option.trim();
    trimmed
        .split(['=', '[', '<', ' '])
        .next()
        .unwrap_or(trimmed)
}

/// Expand a wildcard option (`--keep-*`) against the vocabulary by prefix.
pub fn expand_wildcard(surface: &str, vocabulary: &[String]) -> Vec<String> {
    let Some(prefix) = surface.strip_suffix('*') else {
        return vec![surface.to_string()];
    };
    vocabulary
        .iter()
        .filter(|option| option.starts_with(prefix))
        .cloned()
        .collect()
}

/// Alias registry: canonical option identifier to its alias surfaces.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    by_canonical: BTreeMap<String, Vec<String>>,
    to_canonical: BTreeMap<String, String>,
}

impl AliasTable {
    pub fn new(aliases: BTreeMap<String, Vec<String>>) -> Self {
        let mut to_canonical = BTreeMap::new();
        for (canonical, alias_list) in &aliases {
            for alias in alias_list {
                to_canonical.insert(alias.clone(), canonical.clone());
            }
        }
        Self {
            by_canonical: aliases,
            to_canonical,
        }
    }

    /// Canonical identifier for an option or alias surface.
    pub fn canonical<'a>(&'a self, surface: &'a str) -> &'a str {
        self.to_canonical
            .get(surface)
            .map_or(surface, String::as_str)
    }

    /// The canonical surface plus every alias of the option `surface` names.
    pub fn surfaces_of(&self, surface: &str) -> BTreeSet<String> {
        let canonical = self.canonical(surface);
        let mut out = BTreeSet::new();
        out.insert(canonical.to_string());
        if let Some(alias_list) = self.by_canonical.get(canonical) {
            out.extend(alias_list.iter().cloned());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surfaces(option: &str) -> BTreeSet<String> {
        let mut set = BTreeSet::new();
        set.insert(option.to_string());
        set
    }

    fn vocab(options: &[&str]) -> Vec<String> {
        options.iter().map(|opt| (*opt).to_string()).collect()
    }

    #[test]
    fn current_option_gets_the_self_token() {
        let outcome = resolve_options(
            "-a conflicts with -b .",
            &surfaces("-a"),
            Some(&vocab(&["-a", "-b"])),
        );
        assert_eq!(outcome.sentence, "param_current conflicts with param1 .");
        assert_eq!(
            outcome.map.placeholder_for("-a"),
            Some(Placeholder::Current)
        );
        assert_eq!(
            outcome.map.placeholder_for("-b"),
            Some(Placeholder::Slot(0))
        );
    }

    #[test]
    fn longest_surface_form_wins_substitution() {
        let outcome = resolve_options(
            "--keep-all implies --keep .",
            &surfaces("--keep-all"),
            Some(&vocab(&["--keep", "--keep-all"])),
        );
        assert_eq!(outcome.sentence, "param_current implies param1 .");
    }

    #[test]
    fn foreign_options_become_external_references() {
        let outcome = resolve_options(
            "-a needs -z from elsewhere .",
            &surfaces("-a"),
            Some(&vocab(&["-a"])),
        );
        assert_eq!(outcome.sentence, "param_current needs param_external from elsewhere .");
        assert_eq!(
            outcome.map.placeholder_for("-z"),
            Some(Placeholder::External)
        );
        // Only the current option remains tracked.
        assert_eq!(outcome.map.tracked_tokens().len(), 1);
    }

    #[test]
    fn pool_exhaustion_degrades_to_generic() {
        let options: Vec<String> = (0..SLOT_POOL_SIZE + 2)
            .map(|idx| format!("--opt{idx}"))
            .collect();
        let sentence = options.join(" and ");
        let outcome = resolve_options(&sentence, &BTreeSet::new(), Some(&options));
        let generic = outcome
            .map
            .entries
            .values()
            .filter(|placeholder| **placeholder == Placeholder::Generic)
            .count();
        assert_eq!(generic, 2);
    }

    #[test]
    fn wildcard_mentions_match_by_prefix() {
        let outcome = resolve_options(
            "--keep-* only matters here .",
            &BTreeSet::new(),
            Some(&vocab(&["--keep-going", "--keep-order"])),
        );
        assert_eq!(
            outcome.map.placeholder_for("--keep-*"),
            Some(Placeholder::Slot(0))
        );
        assert_eq!(
            expand_wildcard("--keep-*", &vocab(&["--keep-going", "--keep-order", "--other"])),
            vec!["--keep-going".to_string(), "--keep-order".to_string()]
        );
    }

    #[test]
    fn restricted_map_follows_sub_sentence_tokens() {
        let outcome = resolve_options(
            "-a needs -b and -c needs -d .",
            &surfaces("-a"),
            Some(&vocab(&["-a", "-b", "-c", "-d"])),
        );
        let restricted = outcome
            .map
            .restricted_to("param_current needs param1");
        assert!(restricted.surface_for("param1").is_some());
        assert!(restricted.surface_for("param2").is_none());
        assert!(restricted.has_current());
    }

    #[test]
    fn strip_value_field_variants() {
        assert_eq!(strip_value_field("-a=xxx"), "-a");
        assert_eq!(strip_value_field("-a[=xxx]"), "-a");
        assert_eq!(strip_value_field("-a <file>"), "-a");
        assert_eq!(strip_value_field(" --long "), "--long");
    }

    #[test]
    fn alias_table_round_trips() {
        let mut aliases = BTreeMap::new();
        aliases.insert("-a".to_string(), vec!["--all".to_string()]);
        let table = AliasTable::new(aliases);
        assert_eq!(table.canonical("--all"), "-a");
        assert_eq!(table.canonical("-a"), "-a");
        assert_eq!(table.canonical("-x"), "-x");
        let surfaces = table.surfaces_of("--all");
        assert!(surfaces.contains("-a") && surfaces.contains("--all"));
    }
}
