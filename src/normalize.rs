//! Name canonicalization for clubs, teams, and players.
//!
//! The portal prints names inconsistently across pages ("TC Köln-Süd 2",
//! "TC Koeln Sued II", "Köln-Süd, TC 2"), so every comparison runs on a
//! folded key: lowercase, diacritics flattened to ASCII, punctuation
//! replaced by spaces, whitespace collapsed.

/// Build a comparison key from a free-text name.
pub fn normalize_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            'ä' | 'Ä' => out.push_str("ae"),
            'ö' | 'Ö' => out.push_str("oe"),
            'ü' | 'Ü' => out.push_str("ue"),
            'ß' => out.push_str("ss"),
            'á' | 'à' | 'â' | 'Á' | 'À' | 'Â' => out.push('a'),
            'é' | 'è' | 'ê' | 'ë' | 'É' | 'È' | 'Ê' | 'Ë' => out.push('e'),
            'í' | 'ì' | 'î' | 'ï' | 'Í' | 'Ì' | 'Î' | 'Ï' => out.push('i'),
            'ó' | 'ò' | 'ô' | 'Ó' | 'Ò' | 'Ô' => out.push('o'),
            'ú' | 'ù' | 'û' | 'Ú' | 'Ù' | 'Û' => out.push('u'),
            'ç' | 'Ç' => out.push('c'),
            'ñ' | 'Ñ' => out.push('n'),
            c if c.is_alphanumeric() => {
                for lower in c.to_lowercase() {
                    out.push(lower);
                }
            }
            // Punctuation and everything else becomes a word boundary
            _ => out.push(' '),
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A team label split into its club-name prefix and ordinal suffix.
///
/// Keys are already normalized. `suffix` is `None` when the label names the
/// club's only team ("TG Rodenkirchen" without a trailing numeral).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamLabel {
    pub club: String,
    pub suffix: Option<u32>,
}

impl TeamLabel {
    /// The team's ordinal, defaulting to 1 for suffix-less labels.
    pub fn ordinal(&self) -> u32 {
        self.suffix.unwrap_or(1)
    }
}

/// Split a trailing Arabic or Roman numeral from a team label.
///
/// "TC Köln-Süd 2" → club "tc koeln sued", suffix 2.
/// "SV Sürth II" → club "sv suerth", suffix 2.
pub fn split_team_label(raw: &str) -> TeamLabel {
    let key = normalize_name(raw);
    let mut words: Vec<&str> = key.split(' ').filter(|w| !w.is_empty()).collect();

    let suffix = match words.last() {
        Some(last) if words.len() > 1 => {
            if let Ok(n) = last.parse::<u32>() {
                Some(n)
            } else {
                roman_to_arabic(last)
            }
        }
        _ => None,
    };

    if suffix.is_some() {
        words.pop();
    }

    TeamLabel {
        club: words.join(" "),
        suffix,
    }
}

/// Candidate keys for matching a team label, most specific first:
/// club plus suffix, then the club name alone.
pub fn candidate_keys(label: &TeamLabel) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(suffix) = label.suffix {
        keys.push(format!("{} {}", label.club, suffix));
    }
    if !label.club.is_empty() && !keys.contains(&label.club) {
        keys.push(label.club.clone());
    }
    keys
}

/// Convert a Roman numeral to its value. Covers I through XII, which is
/// more teams than any club in the federation fields.
fn roman_to_arabic(s: &str) -> Option<u32> {
    let value = match s {
        "i" => 1,
        "ii" => 2,
        "iii" => 3,
        "iv" => 4,
        "v" => 5,
        "vi" => 6,
        "vii" => 7,
        "viii" => 8,
        "ix" => 9,
        "x" => 10,
        "xi" => 11,
        "xii" => 12,
        _ => return None,
    };
    Some(value)
}

/// Normalize a player name as printed on meeting reports.
///
/// "Müller, Hans" and "Müller, H." both need to land close enough for the
/// matcher's substring rule, so the comma ordering is kept as-is and only
/// character folding applies.
pub fn normalize_player_name(raw: &str) -> String {
    normalize_name(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_umlauts() {
        assert_eq!(normalize_name("TC Köln-Süd"), "tc koeln sued");
        assert_eq!(normalize_name("SV Sürth"), "sv suerth");
        assert_eq!(normalize_name("TC Weiß-Blau"), "tc weiss blau");
    }

    #[test]
    fn test_normalize_collapses_whitespace() {
        assert_eq!(normalize_name("  TG   Rodenkirchen  "), "tg rodenkirchen");
        assert_eq!(normalize_name("Köln,  TC"), "koeln tc");
    }

    #[test]
    fn test_split_arabic_suffix() {
        let label = split_team_label("TC Köln-Süd 2");
        assert_eq!(label.club, "tc koeln sued");
        assert_eq!(label.suffix, Some(2));
        assert_eq!(label.ordinal(), 2);
    }

    #[test]
    fn test_split_roman_suffix() {
        let label = split_team_label("SV Sürth II");
        assert_eq!(label.club, "sv suerth");
        assert_eq!(label.suffix, Some(2));
    }

    #[test]
    fn test_split_no_suffix() {
        let label = split_team_label("TG Rodenkirchen");
        assert_eq!(label.club, "tg rodenkirchen");
        assert_eq!(label.suffix, None);
        assert_eq!(label.ordinal(), 1);
    }

    #[test]
    fn test_bare_numeral_is_not_a_suffix() {
        // A label that is only "2" has no club part to split off
        let label = split_team_label("2");
        assert_eq!(label.club, "2");
        assert_eq!(label.suffix, None);
    }

    #[test]
    fn test_candidate_keys_order() {
        let label = split_team_label("TC Köln-Süd 2");
        let keys = candidate_keys(&label);
        assert_eq!(keys, vec!["tc koeln sued 2".to_string(), "tc koeln sued".to_string()]);
    }

    #[test]
    fn test_candidate_keys_without_suffix() {
        let label = split_team_label("TG Rodenkirchen");
        assert_eq!(candidate_keys(&label), vec!["tg rodenkirchen".to_string()]);
    }

    #[test]
    fn test_roman_bounds() {
        assert_eq!(roman_to_arabic("xii"), Some(12));
        assert_eq!(roman_to_arabic("xiii"), None);
        assert_eq!(roman_to_arabic("mix"), None);
    }

    #[test]
    fn test_player_name_abbreviation_is_prefix() {
        let full = normalize_player_name("Müller, Hans");
        let abbrev = normalize_player_name("Müller, H.");
        assert!(full.starts_with(&abbrev));
    }
}
