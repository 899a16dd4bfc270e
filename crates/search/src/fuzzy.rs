use crate::text::normalize;
use ratebook_protocol::IndexRecord;

/// Separator used when an ancestor breadcrumb is flattened into one field.
pub const PATH_SEPARATOR: &str = " / ";

/// Matches starting within this many characters of the path earn a bonus.
const POSITION_WINDOW: usize = 24;
const MAX_POSITION_BONUS: f64 = 0.05;

/// Edit distance with unit insertion, deletion and substitution costs.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            curr[j + 1] = substitution.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Similarity of one normalized token against one normalized value, in `0..=1`.
///
/// A prefix match scores exactly `1.0`; otherwise the edit distance is scaled
/// by the longer of the two lengths.
pub fn token_score(token: &str, value: &str) -> f64 {
    if token.is_empty() {
        return 0.0;
    }
    if value.starts_with(token) {
        return 1.0;
    }
    let longest = token.chars().count().max(value.chars().count());
    let distance = levenshtein(token, value);
    #[allow(clippy::cast_precision_loss)]
    let ratio = distance as f64 / longest as f64;
    (1.0 - ratio).max(0.0)
}

/// Pre-normalized fields of one candidate entry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScoringFields {
    pub name: String,
    pub code: String,
    pub path: String,
}

impl ScoringFields {
    pub fn new(name: &str, code: &str, path_names: &[String]) -> Self {
        Self {
            name: normalize(name),
            code: normalize(code),
            path: normalize(&path_names.join(PATH_SEPARATOR)),
        }
    }

    pub fn from_record(record: &IndexRecord) -> Self {
        Self::new(&record.name, &record.code, &record.path_names)
    }
}

/// Every token must occur in at least one field for the entry to be scored.
pub fn matches_all_tokens(tokens: &[String], fields: &ScoringFields) -> bool {
    !tokens.is_empty()
        && tokens.iter().all(|token| {
            fields.name.contains(token.as_str())
                || fields.code.contains(token.as_str())
                || fields.path.contains(token.as_str())
        })
}

fn position_bonus(token: &str, path: &str) -> f64 {
    if token.is_empty() {
        return 0.0;
    }
    let Some(byte_idx) = path.find(token) else {
        return 0.0;
    };
    let position = path[..byte_idx].chars().count();
    if position >= POSITION_WINDOW {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let decay = 1.0 - position as f64 / POSITION_WINDOW as f64;
    MAX_POSITION_BONUS * decay
}

/// Mean per-token score of an entry plus a small bonus for tokens found near
/// the start of its path, capped at `1.0`.
pub fn entry_score(tokens: &[String], fields: &ScoringFields, path_weight: f64) -> f64 {
    if tokens.is_empty() {
        return 0.0;
    }
    let mut total = 0.0;
    let mut bonus = 0.0;
    for token in tokens {
        let direct = token_score(token, &fields.name).max(token_score(token, &fields.code));
        let via_path = token_score(token, &fields.path) * path_weight;
        total += direct.max(via_path);
        bonus += position_bonus(token, &fields.path);
    }
    #[allow(clippy::cast_precision_loss)]
    let mean = total / tokens.len() as f64;
    (mean + bonus).min(1.0)
}
