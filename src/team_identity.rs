use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Canonical display name for a team. Two raw spellings that resolve to the same
/// `TeamIdentity` are treated as the same club everywhere in the crate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamIdentity(String);

impl TeamIdentity {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for TeamIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TeamIdentity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// One row of the alias CSV. The column names written by `write_alias_csv` are
/// `normalized_name,canonical_name`; hand-maintained files may use `alias,canonical`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasRow {
    #[serde(rename = "normalized_name", alias = "alias")]
    pub alias: String,
    #[serde(rename = "canonical_name", alias = "canonical")]
    pub canonical: String,
}

/// Resolves raw team names to canonical identities through a many-to-one alias table.
///
/// The table is keyed by `normalize_key`, so case, accents and punctuation never
/// matter on lookup, while the stored canonical keeps its display casing.
#[derive(Debug, Clone, Default)]
pub struct TeamResolver {
    aliases: HashMap<String, String>,
}

impl TeamResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = AliasRow>,
    {
        let mut entries: Vec<(String, String)> = Vec::new();
        for row in rows {
            let key = normalize_key(&row.alias);
            let canonical = collapse_whitespace(row.canonical.trim());
            if key.is_empty() || canonical.is_empty() {
                debug!(alias = %row.alias, "skipping empty alias row");
                continue;
            }
            entries.push((key, canonical));
        }

        // Each canonical spelling owns its own key; the first canonical seen for a
        // key is the root every other entry with that key is redirected to.
        let mut roots: HashMap<String, String> = HashMap::new();
        for (_, canonical) in &entries {
            roots
                .entry(normalize_key(canonical))
                .or_insert_with(|| canonical.clone());
        }

        let mut aliases = HashMap::with_capacity(entries.len() + roots.len());
        for (key, canonical) in entries {
            let root = roots
                .get(&normalize_key(&canonical))
                .cloned()
                .unwrap_or(canonical);
            aliases.entry(key).or_insert(root);
        }
        for (key, root) in roots {
            aliases.insert(key, root);
        }

        Self { aliases }
    }

    pub fn from_csv_reader<R: Read>(rdr: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(rdr);
        let mut rows = Vec::new();
        for row in reader.deserialize::<AliasRow>() {
            rows.push(row.context("decode alias row")?);
        }
        Ok(Self::from_rows(rows))
    }

    pub fn from_csv_path(path: &Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("open alias table {}", path.display()))?;
        let resolver = Self::from_csv_reader(file)
            .with_context(|| format!("read alias table {}", path.display()))?;
        info!(
            path = %path.display(),
            aliases = resolver.len(),
            "loaded team alias table"
        );
        Ok(resolver)
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    /// Never fails: names missing from the table pass through title-cased.
    pub fn resolve(&self, raw: &str) -> TeamIdentity {
        let key = normalize_key(raw);
        if let Some(canonical) = self.aliases.get(&key) {
            return TeamIdentity(canonical.clone());
        }
        let fallback = title_case(&collapse_whitespace(raw.trim()));
        if let Some(canonical) = self.aliases.get(&normalize_key(&fallback)) {
            return TeamIdentity(canonical.clone());
        }
        TeamIdentity(fallback)
    }

    /// Adds every observed spelling whose key is still unknown; the first spelling
    /// seen for a key becomes its canonical form, keeping its casing unless it is all
    /// one case. Existing entries are never changed.
    pub fn learn_observed<'a, I>(&mut self, names: I) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut added = 0usize;
        for name in names {
            let key = normalize_key(name);
            if key.is_empty() || self.aliases.contains_key(&key) {
                continue;
            }
            let canonical = display_spelling(name);
            let canonical_key = normalize_key(&canonical);
            let canonical = match self.aliases.get(&canonical_key) {
                Some(existing) => existing.clone(),
                None => {
                    self.aliases.insert(canonical_key, canonical.clone());
                    canonical
                }
            };
            self.aliases.insert(key, canonical);
            added += 1;
        }
        if added > 0 {
            debug!(added, "learned team spellings from dataset");
        }
        added
    }

    /// Alias rows sorted by key, for writing back to disk.
    pub fn rows(&self) -> Vec<AliasRow> {
        let mut rows: Vec<AliasRow> = self
            .aliases
            .iter()
            .map(|(alias, canonical)| AliasRow {
                alias: alias.clone(),
                canonical: canonical.clone(),
            })
            .collect();
        rows.sort_by(|a, b| a.alias.cmp(&b.alias));
        rows
    }
}

/// Builds `normalized -> canonical` rows from observed names, first spelling wins.
pub fn build_alias_rows<'a, I>(names: I) -> Vec<AliasRow>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut resolver = TeamResolver::new();
    resolver.learn_observed(names);
    resolver.rows()
}

pub fn write_alias_csv<W: Write>(rows: &[AliasRow], out: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    for row in rows {
        writer.serialize(row).context("write alias row")?;
    }
    writer.flush().context("flush alias csv")?;
    Ok(())
}

/// Lookup key: accents stripped, lowercase, punctuation-insensitive, single spaces.
pub fn normalize_key(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.trim().nfd() {
        if is_combining_mark(ch) {
            continue;
        }
        if matches!(ch, '.' | '\'' | '\u{2019}') {
            continue;
        }
        if ch.is_alphanumeric() {
            out.extend(ch.to_lowercase());
        } else {
            out.push(' ');
        }
    }
    collapse_whitespace(&out)
}

fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Mixed-case spellings ("AFC Bournemouth") are kept as written; all-lower or
/// all-upper ones are title-cased.
fn display_spelling(raw: &str) -> String {
    let collapsed = collapse_whitespace(raw.trim());
    let has_upper = collapsed.chars().any(char::is_uppercase);
    let has_lower = collapsed.chars().any(char::is_lowercase);
    if has_upper && has_lower {
        collapsed
    } else {
        title_case(&collapsed)
    }
}

fn title_case(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for (i, word) in raw.split(' ').enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            out.push(single_char_case(first, true));
        }
        for ch in chars {
            out.push(single_char_case(ch, false));
        }
    }
    out
}

// Case mappings that expand to several chars (e.g. 'ß' -> "SS") are left alone so
// title-casing stays idempotent.
fn single_char_case(ch: char, upper: bool) -> char {
    let mapped: Vec<char> = if upper {
        ch.to_uppercase().collect()
    } else {
        ch.to_lowercase().collect()
    };
    match mapped.as_slice() {
        [single] => *single,
        _ => ch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> TeamResolver {
        TeamResolver::from_rows(vec![
            AliasRow {
                alias: "Man Utd".to_string(),
                canonical: "Manchester United".to_string(),
            },
            AliasRow {
                alias: "Manchester United FC".to_string(),
                canonical: "Manchester United".to_string(),
            },
            AliasRow {
                alias: "Atlético Madrid".to_string(),
                canonical: "Atlético Madrid".to_string(),
            },
            AliasRow {
                alias: "Atleti".to_string(),
                canonical: "Atlético Madrid".to_string(),
            },
        ])
    }

    #[test]
    fn normalize_key_strips_accents_case_and_punctuation() {
        assert_eq!(normalize_key("  Atlético   MADRID "), "atletico madrid");
        assert_eq!(normalize_key("A.F.C. Bournemouth"), "afc bournemouth");
        assert_eq!(normalize_key("Brighton & Hove Albion"), "brighton hove albion");
        assert_eq!(normalize_key(""), "");
    }

    #[test]
    fn aliases_collapse_to_display_casing() {
        let r = resolver();
        assert_eq!(r.resolve("man utd").as_str(), "Manchester United");
        assert_eq!(r.resolve("MANCHESTER UNITED F.C.").as_str(), "Manchester United");
        assert_eq!(r.resolve("atletico madrid").as_str(), "Atlético Madrid");
        assert_eq!(r.resolve(" ATLETI ").as_str(), "Atlético Madrid");
    }

    #[test]
    fn canonical_names_resolve_to_themselves() {
        let r = resolver();
        assert_eq!(
            r.resolve("Manchester United").as_str(),
            "Manchester United"
        );
    }

    #[test]
    fn unknown_names_are_title_cased() {
        let r = resolver();
        assert_eq!(r.resolve("  queens   park rangers").as_str(), "Queens Park Rangers");
        assert_eq!(r.resolve("").as_str(), "");
    }

    #[test]
    fn learn_observed_keeps_first_spelling() {
        let mut r = TeamResolver::new();
        let added = r.learn_observed(["real betis", "Real Bétis", "REAL BETIS"]);
        assert_eq!(added, 1);
        assert_eq!(r.resolve("Real Bétis").as_str(), "Real Betis");
    }

    #[test]
    fn learned_mixed_case_spelling_is_kept() {
        let mut r = TeamResolver::new();
        r.learn_observed(["AFC  Bournemouth", "afc bournemouth", "RB Leipzig", "PSV EINDHOVEN"]);
        assert_eq!(r.resolve("afc bournemouth").as_str(), "AFC Bournemouth");
        assert_eq!(r.resolve("AFC Bournemouth").as_str(), "AFC Bournemouth");
        assert_eq!(r.resolve("rb leipzig").as_str(), "RB Leipzig");
        assert_eq!(r.resolve("psv eindhoven").as_str(), "Psv Eindhoven");
    }

    #[test]
    fn title_case_leaves_expanding_chars() {
        assert_eq!(title_case("ßtadt"), "ßtadt");
        assert_eq!(title_case(&title_case("ßtadt")), title_case("ßtadt"));
    }
}
