use regex::Regex;
use std::sync::OnceLock;

const LIGATURES: [(char, &str); 5] = [
    ('\u{fb00}', "ff"),
    ('\u{fb01}', "fi"),
    ('\u{fb02}', "fl"),
    ('\u{fb03}', "ffi"),
    ('\u{fb04}', "ffl"),
];

fn dehyphenation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\p{L})-\n(\p{L})").expect("pattern compiles"))
}

fn space_run_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[ \t]+").expect("pattern compiles"))
}

fn newline_run_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n{3,}").expect("pattern compiles"))
}

pub fn normalize(raw: &str) -> String {
    let mut text = raw.replace("\r\n", "\n").replace('\r', "\n");
    text = text.replace('\u{a0}', " ");
    text = text.replace('\u{ad}', "");

    for (ligature, expansion) in LIGATURES {
        if text.contains(ligature) {
            text = text.replace(ligature, expansion);
        }
    }

    // A single replace_all pass cannot rejoin back-to-back wrap artifacts
    // ("exa-\nmp-\nle"), so repeat until the text stops changing.
    loop {
        let joined = dehyphenation_re()
            .replace_all(&text, "${1}${2}")
            .into_owned();
        if joined == text {
            break;
        }
        text = joined;
    }

    text = space_run_re().replace_all(&text, " ").into_owned();
    text = newline_run_re().replace_all(&text, "\n\n").into_owned();
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::normalize;

    #[test]
    fn line_endings_are_unified() {
        assert_eq!(normalize("a\r\nb\rc\nd"), "a\nb\nc\nd");
    }

    #[test]
    fn ligatures_expand_to_ascii() {
        assert_eq!(normalize("e\u{fb03}cient \u{fb01}le"), "efficient file");
    }

    #[test]
    fn soft_hyphens_and_nbsp_are_removed() {
        assert_eq!(normalize("co\u{ad}operate\u{a0}now"), "cooperate now");
    }

    #[test]
    fn wrap_hyphens_are_rejoined() {
        assert_eq!(normalize("exa-\nmple"), "example");
        assert_eq!(normalize("exa-\nmp-\nle"), "example");
    }

    #[test]
    fn hyphen_before_non_letter_is_kept() {
        assert_eq!(normalize("range -\n5 to 5"), "range -\n5 to 5");
        assert_eq!(normalize("a dash - like this"), "a dash - like this");
    }

    #[test]
    fn whitespace_runs_collapse() {
        assert_eq!(normalize("a  \t b"), "a b");
        assert_eq!(normalize("a\n\n\n\n\nb"), "a\n\nb");
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   \n\t "), "");
    }

    #[test]
    fn normalize_is_idempotent() {
        let samples = [
            "exa-\nmple text\r\nwith\u{a0}odd  spacing\n\n\n\nand more",
            "# Heading\n\nBody with \u{fb02}uid liga-\ntures.",
            "",
            "plain text",
        ];
        for sample in samples {
            let once = normalize(sample);
            assert_eq!(normalize(&once), once);
        }
    }
}
