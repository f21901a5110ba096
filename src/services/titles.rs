//! Canonical movie title normalization.
//!
//! Both sides of every fuzzy comparison (parsed filename titles and source
//! candidate titles) go through the same canonical form so that scores stay
//! symmetric: marketing prefixes dropped, unicode folded to ASCII, release
//! year appended when known.

use deunicode::deunicode;

/// Build the canonical form of a movie title used for scoring and for
/// rendering target paths: `"Das Boot" + 1981` -> `"Das Boot (1981)"`.
///
/// "IMAX" decorations are stripped first since the same film is listed both
/// with and without them depending on the source.
pub fn canonical_movie_title(title: &str, year: Option<i32>) -> String {
    let stripped = title.replace("IMAX: ", "").replace("IMAX", "");
    let folded = deunicode(stripped.trim());
    match year {
        Some(year) => format!("{folded} ({year})"),
        None => folded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn appends_year_when_present() {
        assert_eq!(
            canonical_movie_title("These Daughters of Mine", Some(2015)),
            "These Daughters of Mine (2015)"
        );
    }

    #[test]
    fn no_year_no_parens() {
        assert_eq!(canonical_movie_title("Heat", None), "Heat");
    }

    #[test]
    fn transliterates_diacritics() {
        assert_eq!(
            canonical_movie_title("Moje córki krowy", Some(2015)),
            "Moje corki krowy (2015)"
        );
        assert_eq!(
            canonical_movie_title("Mine døtre kuene", None),
            "Mine dotre kuene"
        );
    }

    #[test]
    fn strips_imax_decorations() {
        assert_eq!(
            canonical_movie_title("IMAX: Hubble", Some(2010)),
            "Hubble (2010)"
        );
        assert_eq!(
            canonical_movie_title("Island of Lemurs IMAX", Some(2014)),
            "Island of Lemurs (2014)"
        );
    }
}
