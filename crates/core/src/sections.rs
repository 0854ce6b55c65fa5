use crate::models::Section;

pub fn extract_sections(text: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut open: Option<(String, u8, Vec<&str>)> = None;

    for line in text.lines() {
        match parse_heading(line) {
            Some((title, level)) => {
                if let Some(section) = close_section(open.take()) {
                    sections.push(section);
                }
                open = Some((title, level, Vec::new()));
            }
            None => {
                if let Some((_, _, body)) = open.as_mut() {
                    body.push(line);
                }
            }
        }
    }

    if let Some(section) = close_section(open) {
        sections.push(section);
    }

    sections
}

fn parse_heading(line: &str) -> Option<(String, u8)> {
    let marker_count = line.chars().take_while(|c| *c == '#').count();
    if !(1..=6).contains(&marker_count) {
        return None;
    }

    let rest = &line[marker_count..];
    let title = rest.strip_prefix(' ')?.trim();
    if title.is_empty() {
        return None;
    }

    Some((title.to_string(), marker_count as u8))
}

fn close_section(open: Option<(String, u8, Vec<&str>)>) -> Option<Section> {
    open.map(|(title, level, body)| Section {
        title,
        content: body.join("\n").trim().to_string(),
        level,
    })
}

#[cfg(test)]
mod tests {
    use super::extract_sections;

    #[test]
    fn text_without_headings_yields_no_sections() {
        assert!(extract_sections("just some prose\nacross two lines").is_empty());
        assert!(extract_sections("").is_empty());
    }

    #[test]
    fn headings_open_and_close_sections() {
        let text = "# First\nalpha\nbeta\n## Second\ngamma";
        let sections = extract_sections(text);

        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].title, "First");
        assert_eq!(sections[0].level, 1);
        assert_eq!(sections[0].content, "alpha\nbeta");
        assert_eq!(sections[1].title, "Second");
        assert_eq!(sections[1].level, 2);
        assert_eq!(sections[1].content, "gamma");
    }

    #[test]
    fn final_open_section_is_flushed() {
        let sections = extract_sections("### Tail\nlast line");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].title, "Tail");
        assert_eq!(sections[0].level, 3);
        assert_eq!(sections[0].content, "last line");
    }

    #[test]
    fn marker_run_without_space_is_not_a_heading() {
        assert!(extract_sections("#NoSpace\ntext").is_empty());
        assert!(extract_sections("####### Seven markers\ntext").is_empty());
    }

    #[test]
    fn prose_before_first_heading_is_dropped() {
        let sections = extract_sections("preamble\n# Real\nbody");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].title, "Real");
        assert_eq!(sections[0].content, "body");
    }
}
